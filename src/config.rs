//! Tunable factors governing automatic grow/shrink.

use crate::error::MapError;

/// Bucket count of a freshly created table.
pub const DEFAULT_INITIAL_BUCKETS: usize = 10;
/// Load factor above which an insert grows the table.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 2.0;
/// Load factor below which a removal shrinks the table.
pub const DEFAULT_MIN_LOAD_FACTOR: f64 = 0.5;
/// Multiplier applied to the bucket count on grow.
pub const DEFAULT_GROW_FACTOR: f64 = 2.0;
/// Multiplier applied to the bucket count on shrink.
pub const DEFAULT_SHRINK_FACTOR: f64 = 0.5;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MapConfig {
    pub initial_buckets: usize,
    /// Grow once `len / bucket_count` exceeds this.
    pub max_load_factor: f64,
    /// Shrink once `len / bucket_count` drops below this.
    pub min_load_factor: f64,
    pub grow_factor: f64,
    pub shrink_factor: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_buckets: DEFAULT_INITIAL_BUCKETS,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            min_load_factor: DEFAULT_MIN_LOAD_FACTOR,
            grow_factor: DEFAULT_GROW_FACTOR,
            shrink_factor: DEFAULT_SHRINK_FACTOR,
        }
    }
}

impl MapConfig {
    pub fn validate(&self) -> Result<(), MapError> {
        if self.initial_buckets == 0 {
            return Err(MapError::InvalidArgument("initial_buckets must be at least 1"));
        }
        check_load_factors(self.max_load_factor, self.min_load_factor, self.grow_factor)?;
        check_shrink_factor(self.shrink_factor)
    }
}

// NaN fails every comparison below, so it is rejected too.
pub(crate) fn check_load_factors(max: f64, min: f64, grow: f64) -> Result<(), MapError> {
    if !(max > 0.0) {
        return Err(MapError::InvalidArgument("max_load_factor must be > 0"));
    }
    if !(min >= 0.0) {
        return Err(MapError::InvalidArgument("min_load_factor must be >= 0"));
    }
    if !(grow > 1.0) {
        return Err(MapError::InvalidArgument("grow_factor must be > 1"));
    }
    if !(min < max) {
        return Err(MapError::InvalidArgument(
            "min_load_factor must be < max_load_factor",
        ));
    }
    Ok(())
}

pub(crate) fn check_shrink_factor(shrink: f64) -> Result<(), MapError> {
    if shrink > 0.0 && shrink < 1.0 {
        Ok(())
    } else {
        Err(MapError::InvalidArgument("shrink_factor must be in (0, 1)"))
    }
}
