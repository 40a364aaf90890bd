//! Bucket array and chain storage.
//!
//! Entries live in a generational arena; a chain is a singly linked list of
//! arena keys threaded through `Entry::next`, and the bucket array holds the
//! key of each chain's head. Pushing to a chain is O(1), scanning it is
//! O(chain), and resizing re-threads links without moving or cloning entries.
//!
//! Nothing in this module calls caller code: each entry carries the hash that
//! was computed when it was inserted, and `relink` indexes by that.

use crate::cursor::Cursor;
use crate::error::MapError;
use slotmap::{DefaultKey, SlotMap};

pub(crate) type Slot = DefaultKey;

/// Largest bucket array the allocator could be asked for.
pub(crate) const MAX_BUCKETS: usize =
    isize::MAX as usize / core::mem::size_of::<Option<Slot>>();

#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
    pub(crate) next: Option<Slot>,
}

/// Position of a matching entry within its chain.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Link {
    pub(crate) prev: Option<Slot>,
    pub(crate) slot: Slot,
}

pub(crate) struct Buckets<K, V> {
    pub(crate) heads: Vec<Option<Slot>>,
    pub(crate) slots: SlotMap<Slot, Entry<K, V>>,
}

fn alloc_heads(count: usize) -> Result<Vec<Option<Slot>>, MapError> {
    if count > MAX_BUCKETS {
        return Err(MapError::Overflow);
    }
    let mut heads = Vec::new();
    heads
        .try_reserve_exact(count)
        .map_err(|_| MapError::OutOfMemory)?;
    heads.resize(count, None);
    Ok(heads)
}

impl<K, V> Buckets<K, V> {
    pub(crate) fn with_buckets(count: usize) -> Result<Self, MapError> {
        debug_assert!(count >= 1);
        Ok(Self {
            heads: alloc_heads(count)?,
            slots: SlotMap::with_key(),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.heads.len()
    }

    pub(crate) fn index_for(&self, hash: u64) -> usize {
        (hash % self.heads.len() as u64) as usize
    }

    pub(crate) fn chain(&self, index: usize) -> Chain<'_, K, V> {
        Chain {
            slots: &self.slots,
            cur: self.heads.get(index).copied().flatten(),
        }
    }

    pub(crate) fn entry(&self, slot: Slot) -> Option<&Entry<K, V>> {
        self.slots.get(slot)
    }

    pub(crate) fn entry_mut(&mut self, slot: Slot) -> Option<&mut Entry<K, V>> {
        self.slots.get_mut(slot)
    }

    /// Walk chain `index`, returning the first entry for which `matches`
    /// answers true. `matches` may abort the walk with an error.
    pub(crate) fn find<F>(&self, index: usize, mut matches: F) -> Result<Option<Link>, MapError>
    where
        F: FnMut(&K) -> Result<bool, MapError>,
    {
        let mut prev = None;
        for (slot, entry) in self.chain(index) {
            if matches(&entry.key)? {
                return Ok(Some(Link { prev, slot }));
            }
            prev = Some(slot);
        }
        Ok(None)
    }

    /// Store a new entry at the head of chain `index`.
    pub(crate) fn push_front(&mut self, index: usize, key: K, value: V, hash: u64) -> Slot {
        let next = self.heads[index];
        let slot = self.slots.insert(Entry {
            key,
            value,
            hash,
            next,
        });
        self.heads[index] = Some(slot);
        slot
    }

    /// Detach the entry at `link` from chain `index` and take it out of the arena.
    pub(crate) fn unlink(&mut self, index: usize, link: Link) -> Option<Entry<K, V>> {
        let entry = self.slots.remove(link.slot)?;
        match link.prev {
            None => self.heads[index] = entry.next,
            Some(prev) => {
                if let Some(p) = self.slots.get_mut(prev) {
                    p.next = entry.next;
                }
            }
        }
        Some(entry)
    }

    /// Replace the bucket array with one of `new_count` buckets and re-thread
    /// every chain into it. Only the allocation can fail, and on failure the
    /// existing array is left untouched.
    ///
    /// Each moved entry is pushed to the head of its new chain, so chain
    /// order after a resize is not the order before it.
    pub(crate) fn relink(&mut self, new_count: usize) -> Result<(), MapError> {
        let mut fresh = alloc_heads(new_count)?;
        for head in self.heads.iter_mut() {
            let mut cur = head.take();
            while let Some(slot) = cur {
                let Some(entry) = self.slots.get_mut(slot) else {
                    break;
                };
                cur = entry.next;
                let index = (entry.hash % new_count as u64) as usize;
                entry.next = fresh[index];
                fresh[index] = Some(slot);
            }
        }
        self.heads = fresh;
        Ok(())
    }

    /// Yield the entry under `cursor` and step past it, moving on to later
    /// buckets when its chain runs out. Returns `None` once every bucket is
    /// exhausted and keeps returning `None` afterwards.
    pub(crate) fn advance(&self, cursor: &mut Cursor) -> Option<&Entry<K, V>> {
        if cursor.done {
            return None;
        }
        loop {
            if let Some(entry) = cursor.next.take().and_then(|s| self.slots.get(s)) {
                cursor.next = entry.next;
                return Some(entry);
            }
            if cursor.bucket + 1 >= self.heads.len() {
                cursor.done = true;
                return None;
            }
            cursor.bucket += 1;
            cursor.next = self.heads[cursor.bucket];
        }
    }

    /// Index of the first non-empty bucket.
    pub(crate) fn first_occupied(&self) -> Option<usize> {
        self.heads.iter().position(Option::is_some)
    }

    /// Empty the table, handing every stored pair to the caller.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
        self.heads.iter_mut().for_each(|h| *h = None);
        self.slots.drain().map(|(_, e)| (e.key, e.value))
    }

    #[cfg(test)]
    pub(crate) fn reachable(&self) -> usize {
        (0..self.heads.len()).map(|i| self.chain(i).count()).sum()
    }
}

/// Borrowing walk over one chain, head first.
pub(crate) struct Chain<'a, K, V> {
    slots: &'a SlotMap<Slot, Entry<K, V>>,
    cur: Option<Slot>,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (Slot, &'a Entry<K, V>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cur?;
        let entry = self.slots.get(slot)?;
        self.cur = entry.next;
        Some((slot, entry))
    }
}
