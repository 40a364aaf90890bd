//! Traversal: an explicit cursor protocol plus borrow-checked iterators.
//!
//! Order is ascending bucket index and, within a bucket, most recently
//! inserted first. A `Cursor` is plain data and does not borrow the table;
//! mutating the table (insert, remove, resize) after `iter_start` and then
//! continuing with the same cursor is a usage error. It stays memory-safe
//! (stale slots resolve to nothing) but the sequence it yields is
//! unspecified. `Iter` and `IterMut` borrow the table and rule that out.

use crate::bucket::{Buckets, Entry, Slot};
use crate::capabilities::Capabilities;
use crate::chain_map::ChainMap;
use crate::error::MapError;
use slotmap::SecondaryMap;

/// Position within the bucket array: the current bucket and the next entry
/// of its chain still to be yielded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Cursor {
    pub(crate) bucket: usize,
    pub(crate) next: Option<Slot>,
    pub(crate) done: bool,
}

impl Cursor {
    /// True once the cursor has run past the last entry.
    pub fn is_exhausted(&self) -> bool {
        self.done
    }
}

impl<C: Capabilities> ChainMap<C> {
    /// Position a cursor on the first non-empty bucket. An empty table
    /// yields `EndOfMap`.
    pub fn iter_start(&self) -> Result<Cursor, MapError> {
        let bucket = self.buckets.first_occupied().ok_or(MapError::EndOfMap)?;
        Ok(Cursor {
            bucket,
            next: self.buckets.heads[bucket],
            done: false,
        })
    }

    /// Yield the pair under the cursor and advance it. The references point
    /// into the table. `EndOfMap` once exhausted, on every later call too.
    pub fn iter_next(&self, cursor: &mut Cursor) -> Result<(&C::Key, &C::Value), MapError> {
        self.buckets
            .advance(cursor)
            .map(|e| (&e.key, &e.value))
            .ok_or(MapError::EndOfMap)
    }

    pub fn iter(&self) -> Iter<'_, C::Key, C::Value> {
        Iter {
            buckets: &self.buckets,
            cursor: Cursor {
                bucket: 0,
                next: self.buckets.heads[0],
                done: false,
            },
            remaining: self.len(),
        }
    }

    /// Like `iter`, with mutable access to values. Keys stay immutable.
    pub fn iter_mut(&mut self) -> IterMut<'_, C::Key, C::Value> {
        let remaining = self.len();
        let heads = &self.buckets.heads;
        let pending: SecondaryMap<Slot, &mut Entry<C::Key, C::Value>> =
            self.buckets.slots.iter_mut().collect();
        IterMut {
            heads,
            bucket: 0,
            next: heads[0],
            pending,
            remaining,
        }
    }
}

impl<'a, C: Capabilities> IntoIterator for &'a ChainMap<C> {
    type Item = (&'a C::Key, &'a C::Value);
    type IntoIter = Iter<'a, C::Key, C::Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over `(&K, &V)` in bucket order.
pub struct Iter<'a, K, V> {
    buckets: &'a Buckets<K, V>,
    cursor: Cursor,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let e = self.buckets.advance(&mut self.cursor)?;
        self.remaining -= 1;
        Some((&e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)` in bucket order.
///
/// Chains are linked through the arena, so the arena's entries are first
/// split into disjoint `&mut` borrows keyed by slot and then handed out in
/// chain order.
pub struct IterMut<'a, K, V> {
    heads: &'a [Option<Slot>],
    bucket: usize,
    next: Option<Slot>,
    pending: SecondaryMap<Slot, &'a mut Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.next.take().and_then(|s| self.pending.remove(s)) {
                let Entry {
                    key, value, next, ..
                } = entry;
                self.next = *next;
                self.remaining -= 1;
                return Some((&*key, value));
            }
            self.bucket += 1;
            self.next = *self.heads.get(self.bucket)?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

#[cfg(test)]
mod tests {
    use crate::capabilities::StdCapabilities;
    use crate::chain_map::ChainMap;
    use crate::config::MapConfig;
    use crate::error::MapError;
    use std::collections::BTreeMap;

    fn small(buckets: usize) -> ChainMap<StdCapabilities<u32, u32, IdentityState>> {
        ChainMap::with_config(
            StdCapabilities::with_hasher(IdentityState),
            MapConfig {
                initial_buckets: buckets,
                max_load_factor: 100.0,
                ..MapConfig::default()
            },
        )
        .unwrap()
    }

    /// Hashes a `u32` key to itself so bucket placement is predictable.
    #[derive(Clone, Default)]
    struct IdentityState;
    struct IdentityHasher(u64);
    impl core::hash::BuildHasher for IdentityState {
        type Hasher = IdentityHasher;
        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher(0)
        }
    }
    impl core::hash::Hasher for IdentityHasher {
        fn write(&mut self, _bytes: &[u8]) {
            unreachable!("only u32 keys are hashed");
        }
        fn write_u32(&mut self, n: u32) {
            self.0 = u64::from(n);
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn empty_table_start_is_end_of_map() {
        let m = small(4);
        assert!(matches!(m.iter_start(), Err(MapError::EndOfMap)));
        assert_eq!(m.iter().count(), 0);
    }

    /// Invariant: ascending bucket order; newest first inside a bucket.
    #[test]
    fn cursor_visits_buckets_in_order_newest_first() {
        let mut m = small(4);
        for k in [1u32, 5, 2, 9, 3] {
            m.insert(&k, &(k * 10)).unwrap();
        }
        // bucket 1: 9 5 1, bucket 2: 2, bucket 3: 3
        let mut cur = m.iter_start().unwrap();
        let mut seen = Vec::new();
        while let Ok((k, v)) = m.iter_next(&mut cur) {
            assert_eq!(*v, *k * 10);
            seen.push(*k);
        }
        assert_eq!(seen, vec![9, 5, 1, 2, 3]);
        assert!(cur.is_exhausted());
    }

    /// Invariant: exhaustion is sticky.
    #[test]
    fn end_of_map_repeats() {
        let mut m = small(3);
        m.insert(&2, &0).unwrap();
        let mut cur = m.iter_start().unwrap();
        assert_eq!(m.iter_next(&mut cur).unwrap(), (&2, &0));
        for _ in 0..3 {
            assert!(matches!(m.iter_next(&mut cur), Err(MapError::EndOfMap)));
        }
    }

    #[test]
    fn iter_agrees_with_cursor() {
        let mut m = small(5);
        for k in 0..40u32 {
            m.insert(&k, &k).unwrap();
        }
        let mut cur = m.iter_start().unwrap();
        let mut via_cursor = Vec::new();
        while let Ok((k, _)) = m.iter_next(&mut cur) {
            via_cursor.push(*k);
        }
        let via_iter: Vec<u32> = m.iter().map(|(k, _)| *k).collect();
        assert_eq!(via_cursor, via_iter);
        assert_eq!(m.iter().len(), 40);
    }

    /// Invariant: `iter_mut` reaches every value exactly once, in the same
    /// order as `iter`.
    #[test]
    fn iter_mut_modifies_every_value() {
        let mut m = small(6);
        for k in 0..25u32 {
            m.insert(&k, &k).unwrap();
        }
        let order: Vec<u32> = m.iter().map(|(k, _)| *k).collect();
        let mut mut_order = Vec::new();
        for (k, v) in m.iter_mut() {
            *v *= 10;
            mut_order.push(*k);
        }
        assert_eq!(order, mut_order);
        let snapshot: BTreeMap<u32, u32> = (&m).into_iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(snapshot.len(), 25);
        for (k, v) in snapshot {
            assert_eq!(v, k * 10);
        }
    }

    /// A cursor kept across a mutation never reads freed memory.
    #[test]
    fn stale_cursor_is_memory_safe() {
        let mut m = small(2);
        for k in 0..6u32 {
            m.insert(&k, &k).unwrap();
        }
        let mut cur = m.iter_start().unwrap();
        m.iter_next(&mut cur).unwrap();
        m.remove(&2).unwrap();
        m.resize(3.0).unwrap();
        let mut n = 0;
        while m.iter_next(&mut cur).is_ok() {
            n += 1;
            assert!(n <= m.len());
        }
    }
}
