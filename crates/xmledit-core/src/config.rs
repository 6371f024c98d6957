//! Engine configuration.
//!
//! Both structs are plain data with sensible defaults. They derive `serde` traits so hosts can
//! keep them in their own settings files; every field is optional on input.

use serde::{Deserialize, Serialize};

/// Default number of character cells a new content buffer reserves.
pub const DEFAULT_INITIAL_CAPACITY: usize = 100;

/// Default capacity below which the gap buffer doubles when it grows.
pub const DEFAULT_GROWTH_THRESHOLD: usize = 1024 * 1024;

/// Gap buffer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Character cells reserved up front.
    pub initial_capacity: usize,
    /// Below this capacity the buffer doubles on growth; above it, it grows by a tenth.
    pub growth_threshold: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            growth_threshold: DEFAULT_GROWTH_THRESHOLD,
        }
    }
}

impl ContentConfig {
    /// Config with a specific initial capacity and the default growth policy.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    /// Capacity to grow to from `capacity` so that at least `required` cells fit.
    pub(crate) fn grown_capacity(&self, capacity: usize, required: usize) -> usize {
        let grown = if capacity < self.growth_threshold {
            capacity.saturating_mul(2)
        } else {
            capacity.saturating_add(capacity / 10)
        };
        grown.max(required).max(1)
    }
}

/// Document-level options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Content buffer tuning.
    pub content: ContentConfig,
    /// Declared character encoding, if known.
    pub encoding: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_doubles_below_threshold() {
        let config = ContentConfig::default();
        assert_eq!(config.grown_capacity(100, 101), 200);
        assert_eq!(config.grown_capacity(100, 500), 500);
        assert_eq!(config.grown_capacity(0, 1), 1);
    }

    #[test]
    fn test_growth_is_ten_percent_above_threshold() {
        let config = ContentConfig {
            initial_capacity: 10,
            growth_threshold: 1000,
        };
        assert_eq!(config.grown_capacity(2000, 2001), 2200);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: DocumentConfig =
            serde_json::from_str(r#"{"content":{"initial_capacity":8}}"#).unwrap();
        assert_eq!(config.content.initial_capacity, 8);
        assert_eq!(config.content.growth_threshold, DEFAULT_GROWTH_THRESHOLD);
        assert_eq!(config.encoding, None);
    }
}
