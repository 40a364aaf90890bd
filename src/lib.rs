//! chain-map: a single-threaded, separate-chaining hash table that is
//! generic over caller-supplied key/value capabilities.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one table engine reusable across unrelated key/value types,
//!   with every type-specific behaviour (hash, compare, clone, free,
//!   stringify) supplied through a `Capabilities` implementation.
//! - Layers:
//!   - Buckets<K, V>: structural storage. Entries live in a generational
//!     arena; each bucket holds the arena key of its chain head and each
//!     entry links to the next. Never calls caller code.
//!   - ChainMap<C>: public operations. Hashes and compares through `C`,
//!     clones on insert, frees on replace/remove/drop, and rebalances
//!     capacity against the configured load factors.
//!   - Cursor / Iter / IterMut: traversal in bucket order.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync`, no locks, no atomics.
//! - `bucket_count() >= 1` at all times.
//! - `len()` equals the number of entries reachable through the chains.
//! - New entries are pushed to the head of their chain.
//!
//! Hashing and resize
//! - Each entry stores the `u64` hash computed when it was inserted.
//!   Resizing re-threads entries by that stored hash, so it calls no caller
//!   code and, once the new bucket array is allocated, cannot fail.
//! - Grow when `len / bucket_count > max_load_factor`; shrink when it drops
//!   below `min_load_factor` and more than one bucket remains.
//! - A grow adds at least one bucket; a resize to the current count is a no-op.
//!
//! Error reporting
//! - Every operation returns `Result<_, MapError>`.
//! - When an insert or remove succeeds but the follow-up resize fails, the
//!   error is `MapError::Rebalance`, which says the mutation did happen.
//! - Contract breaks by caller callbacks (compare outside `-1..=1`,
//!   stringify failing) and rebalance failures are also sent to the table's
//!   `ErrorSink`, which defaults to the `log` facade.
//!
//! Reentrancy policy
//! - Capability callbacks must not touch the table they were called from.
//!   Debug builds detect a nested entry and panic.

mod bucket;
pub mod capabilities;
pub mod chain_map;
mod chain_map_proptest;
pub mod config;
pub mod cursor;
pub mod error;
mod reentrancy;

// Public surface
pub use capabilities::{Capabilities, StdCapabilities};
pub use chain_map::{ChainMap, Insertion};
pub use config::MapConfig;
pub use cursor::{Cursor, Iter, IterMut};
pub use error::{AllocError, ErrorSink, LogSink, MapError, Operation};
