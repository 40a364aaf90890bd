//! ChainMap: public operations over the bucket storage.

use crate::bucket::{Buckets, Link, MAX_BUCKETS};
use crate::capabilities::Capabilities;
use crate::config::{self, MapConfig};
use crate::error::{ErrorSink, LogSink, MapError, Operation};
use crate::reentrancy::ReentryDetector;
use log::{debug, trace};

/// Outcome of a successful `insert`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Insertion {
    /// The key was new; a fresh entry was added.
    Inserted,
    /// The key existed; its value was replaced and the stored key kept.
    Replaced,
}

/// Where a key lives, or would live, in the bucket array.
struct Probe {
    index: usize,
    hash: u64,
    found: Option<Link>,
}

/// Separate-chaining hash table. All key/value behaviour is delegated to
/// the capability set `C`.
///
/// Not thread-safe: the table is `!Send`/`!Sync` and assumes exclusive
/// access. References returned by lookup and iteration live only until the
/// next mutation, which the borrow checker enforces.
pub struct ChainMap<C: Capabilities> {
    caps: C,
    pub(crate) buckets: Buckets<C::Key, C::Value>,
    config: MapConfig,
    sink: Box<dyn ErrorSink>,
    reentrancy: ReentryDetector,
}

impl<C: Capabilities> ChainMap<C> {
    /// Create an empty table with default factors and 10 buckets.
    pub fn new(caps: C) -> Result<Self, MapError> {
        Self::with_config(caps, MapConfig::default())
    }

    pub fn with_config(caps: C, config: MapConfig) -> Result<Self, MapError> {
        config.validate()?;
        Ok(Self {
            caps,
            buckets: Buckets::with_buckets(config.initial_buckets)?,
            config,
            sink: Box::new(LogSink),
            reentrancy: ReentryDetector::new(),
        })
    }

    /// Update the grow/shrink triggers and the grow factor. Rejected input
    /// leaves the current configuration in place.
    pub fn configure(
        &mut self,
        max_load_factor: f64,
        min_load_factor: f64,
        grow_factor: f64,
    ) -> Result<(), MapError> {
        config::check_load_factors(max_load_factor, min_load_factor, grow_factor)?;
        self.config.max_load_factor = max_load_factor;
        self.config.min_load_factor = min_load_factor;
        self.config.grow_factor = grow_factor;
        Ok(())
    }

    pub fn set_shrink_factor(&mut self, shrink_factor: f64) -> Result<(), MapError> {
        config::check_shrink_factor(shrink_factor)?;
        self.config.shrink_factor = shrink_factor;
        Ok(())
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Route internally detected failures somewhere other than the `log` facade.
    pub fn set_error_sink<E: ErrorSink + 'static>(&mut self, sink: E) {
        self.sink = Box::new(sink);
    }

    pub fn capabilities(&self) -> &C {
        &self.caps
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.len() == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.bucket_count()
    }

    pub fn load_factor(&self) -> f64 {
        self.buckets.len() as f64 / self.buckets.bucket_count() as f64
    }

    fn locate(&self, key: &C::Key) -> Result<Probe, MapError> {
        let hash = self.caps.hash(key);
        let index = self.buckets.index_for(hash);
        let found = self.buckets.find(index, |stored| {
            match self.caps.compare(stored, key) {
                0 => Ok(true),
                -1 | 1 => Ok(false),
                other => {
                    trace!("compare returned {} in bucket {}", other, index);
                    let err = MapError::Unknown("compare returned a value outside -1..=1");
                    self.sink.report(&err, "capability compare broke its contract");
                    Err(err)
                }
            }
        })?;
        Ok(Probe { index, hash, found })
    }

    /// Insert `key -> value`, or replace the value if an equal key is
    /// present. The table stores clones made through the capability set;
    /// the arguments stay owned by the caller.
    ///
    /// On `Err(MapError::Rebalance { .. })` the insert itself took effect and
    /// only the follow-up grow failed.
    pub fn insert(&mut self, key: &C::Key, value: &C::Value) -> Result<Insertion, MapError> {
        let _g = self.reentrancy.enter();
        let probe = self.locate(key)?;

        if let Some(link) = probe.found {
            let fresh = self.caps.clone_value(value)?;
            let Some(entry) = self.buckets.entry_mut(link.slot) else {
                self.caps.free_value(fresh);
                return Err(MapError::Unknown("chain references a vacant slot"));
            };
            let old = core::mem::replace(&mut entry.value, fresh);
            self.caps.free_value(old);
            return Ok(Insertion::Replaced);
        }

        let k = self.caps.clone_key(key)?;
        let v = match self.caps.clone_value(value) {
            Ok(v) => v,
            Err(e) => {
                self.caps.free_key(k);
                return Err(e.into());
            }
        };
        self.buckets.push_front(probe.index, k, v, probe.hash);

        if self.load_factor() > self.config.max_load_factor {
            self.rebalance(Operation::Insert, self.config.grow_factor)?;
        }
        Ok(Insertion::Inserted)
    }

    /// Borrow the value stored for `key`. No clone is made.
    pub fn get(&self, key: &C::Key) -> Result<&C::Value, MapError> {
        let _g = self.reentrancy.enter();
        let link = self.locate(key)?.found.ok_or(MapError::NotFound)?;
        self.buckets
            .entry(link.slot)
            .map(|e| &e.value)
            .ok_or(MapError::NotFound)
    }

    /// Mutably borrow the value stored for `key`, e.g. to bump a counter in place.
    pub fn get_mut(&mut self, key: &C::Key) -> Result<&mut C::Value, MapError> {
        let _g = self.reentrancy.enter();
        let link = self.locate(key)?.found.ok_or(MapError::NotFound)?;
        self.buckets
            .entry_mut(link.slot)
            .map(|e| &mut e.value)
            .ok_or(MapError::NotFound)
    }

    pub fn contains_key(&self, key: &C::Key) -> Result<bool, MapError> {
        let _g = self.reentrancy.enter();
        Ok(self.locate(key)?.found.is_some())
    }

    /// Remove the entry for `key`, freeing its stored key and value.
    ///
    /// On `Err(MapError::Rebalance { .. })` the entry is gone and only the
    /// follow-up shrink failed.
    pub fn remove(&mut self, key: &C::Key) -> Result<(), MapError> {
        let _g = self.reentrancy.enter();
        let probe = self.locate(key)?;
        let link = probe.found.ok_or(MapError::NotFound)?;
        let entry = self
            .buckets
            .unlink(probe.index, link)
            .ok_or(MapError::NotFound)?;
        self.caps.free_key(entry.key);
        self.caps.free_value(entry.value);

        if self.load_factor() < self.config.min_load_factor && self.bucket_count() > 1 {
            self.rebalance(Operation::Remove, self.config.shrink_factor)?;
        }
        Ok(())
    }

    /// Rebuild the bucket array at `floor(bucket_count * factor)` buckets.
    /// Entries are re-threaded, never cloned. Fails without touching the
    /// table if the factor is not positive, the result would be zero
    /// buckets, or the new array cannot be allocated. A target equal to the
    /// current count leaves the chains as they are.
    pub fn resize(&mut self, factor: f64) -> Result<(), MapError> {
        let target = self.scaled_count(factor)?;
        self.relink_to(target)
    }

    fn scaled_count(&self, factor: f64) -> Result<usize, MapError> {
        if !(factor > 0.0) {
            return Err(MapError::InvalidArgument("resize factor must be > 0"));
        }
        let target = (self.bucket_count() as f64 * factor).floor();
        if target < 1.0 {
            return Err(MapError::InvalidArgument("resize would leave no buckets"));
        }
        if target > MAX_BUCKETS as f64 {
            return Err(MapError::Overflow);
        }
        Ok(target as usize)
    }

    fn relink_to(&mut self, new_count: usize) -> Result<(), MapError> {
        if new_count == self.bucket_count() {
            return Ok(());
        }
        debug!(
            "resizing {} -> {} buckets ({} entries)",
            self.bucket_count(),
            new_count,
            self.len()
        );
        self.buckets.relink(new_count)
    }

    fn rebalance(&mut self, op: Operation, factor: f64) -> Result<(), MapError> {
        let target = match op {
            // floor(n * f) stays at n for small tables; a grow adds at least one.
            Operation::Insert => self
                .scaled_count(factor)
                .map(|n| n.max(self.bucket_count() + 1)),
            Operation::Remove => self.scaled_count(factor),
        };
        target.and_then(|n| self.relink_to(n)).map_err(|source| {
            let err = MapError::Rebalance {
                op,
                source: Box::new(source),
            };
            self.sink
                .report(&err, "capacity rebalance after a completed mutation failed");
            err
        })
    }

    /// Render every bucket's chain through the capability `stringify`.
    pub fn render(&self) -> Result<String, MapError> {
        let _g = self.reentrancy.enter();
        let mut out = String::from("Map contents:\n");
        for index in 0..self.buckets.bucket_count() {
            out.push_str(&format!("Buckets {}: ", index));
            for (_, entry) in self.buckets.chain(index) {
                match self.caps.stringify(&entry.key, &entry.value) {
                    Some(s) => out.push_str(&s),
                    None => {
                        let err = MapError::Unknown("stringify failed");
                        self.sink.report(&err, "capability stringify returned nothing");
                        return Err(err);
                    }
                }
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Write `render()` to stdout.
    pub fn print(&self) -> Result<(), MapError> {
        print!("{}", self.render()?);
        Ok(())
    }

    /// Tear the table down, running `free_key`/`free_value` on every entry.
    /// Dropping the table does the same; this just makes the point explicit.
    pub fn destroy(self) {
        drop(self);
    }

    fn release_entries(&mut self) {
        for (key, value) in self.buckets.drain() {
            self.caps.free_key(key);
            self.caps.free_value(value);
        }
    }
}

impl<C: Capabilities> Drop for ChainMap<C> {
    fn drop(&mut self) {
        if !self.is_empty() {
            debug!("releasing {} entries", self.len());
        }
        self.release_entries();
    }
}
