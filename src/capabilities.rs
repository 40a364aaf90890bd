//! Capability set: the caller-supplied operations that make the table
//! generic over key and value types.
//!
//! The table never touches keys or values except through these methods.
//! Implementations must not mutate the table they are invoked from.

use crate::error::AllocError;
use core::fmt::Debug;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use hashbrown::hash_map::DefaultHashBuilder;

pub trait Capabilities {
    type Key;
    type Value;

    /// Produce the owned copy the table stores for a newly inserted key.
    fn clone_key(&self, key: &Self::Key) -> Result<Self::Key, AllocError>;

    /// Produce the owned copy the table stores for a value.
    fn clone_value(&self, value: &Self::Value) -> Result<Self::Value, AllocError>;

    fn hash(&self, key: &Self::Key) -> u64;

    /// Render one pair for `print`. `None` signals failure.
    fn stringify(&self, key: &Self::Key, value: &Self::Value) -> Option<String>;

    /// Three-way ordering: `-1`, `0` or `1`. Anything else is a contract
    /// violation and fails the calling operation with `Unknown`.
    fn compare(&self, a: &Self::Key, b: &Self::Key) -> i32;

    fn free_key(&self, key: Self::Key);

    fn free_value(&self, value: Self::Value);
}

/// Capability set for ordinary Rust types: `Clone` copies, `Ord` compares,
/// `Debug` renders and dropping frees.
pub struct StdCapabilities<K, V, S = DefaultHashBuilder> {
    hasher: S,
    _pd: PhantomData<fn(K, V)>,
}

impl<K, V> StdCapabilities<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K, V> Default for StdCapabilities<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> StdCapabilities<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            _pd: PhantomData,
        }
    }
}

impl<K, V, S> Capabilities for StdCapabilities<K, V, S>
where
    K: Hash + Ord + Clone + Debug,
    V: Clone + Debug,
    S: BuildHasher,
{
    type Key = K;
    type Value = V;

    fn clone_key(&self, key: &K) -> Result<K, AllocError> {
        Ok(key.clone())
    }

    fn clone_value(&self, value: &V) -> Result<V, AllocError> {
        Ok(value.clone())
    }

    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    fn stringify(&self, key: &K, value: &V) -> Option<String> {
        Some(format!("(Key: {:?}, Value: {:?})", key, value))
    }

    fn compare(&self, a: &K, b: &K) -> i32 {
        a.cmp(b) as i32
    }

    fn free_key(&self, key: K) {
        drop(key);
    }

    fn free_value(&self, value: V) {
        drop(value);
    }
}
