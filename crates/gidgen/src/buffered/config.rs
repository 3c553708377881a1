#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

/// Default number of records per buffer.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Largest capacity a buffer's bounded channel accepts.
pub const MAX_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Default refill threshold, as a percentage of the capacity.
pub const DEFAULT_THRESHOLD_PERCENT: u8 = 10;

/// Sizing of the two buffers of a [`BufferedGenerator`].
///
/// `threshold` is the number of records still unread in the active buffer at
/// the moment the *other* buffer is asked to refill. The larger it is, the
/// more lead time the refill worker gets.
///
/// Invalid values are coerced rather than rejected:
/// - a zero capacity becomes [`DEFAULT_CAPACITY`]
/// - a capacity above [`MAX_CAPACITY`] becomes [`MAX_CAPACITY`]
/// - a missing or out-of-range percentage becomes
///   [`DEFAULT_THRESHOLD_PERCENT`]
/// - the threshold is kept within `[1, capacity - 1]`
///
/// A capacity of 1 has no valid threshold in that range; it uses a threshold
/// of 0, which requests the next refill right after the single record is read.
///
/// # Example
///
/// ```
/// use gidgen::BufferConfig;
///
/// let config = BufferConfig::default();
/// assert_eq!(config.capacity(), 1000);
/// assert_eq!(config.threshold(), 100);
///
/// let config = BufferConfig::new(5, None);
/// assert_eq!(config.threshold(), 1);
/// ```
///
/// [`BufferedGenerator`]: crate::BufferedGenerator
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "BufferConfigRepr", into = "BufferConfigRepr")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferConfig {
    capacity: usize,
    threshold: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, None)
    }
}

impl BufferConfig {
    /// Creates a configuration whose threshold is `threshold_percent` of
    /// `capacity`, floored to at least 1.
    pub fn new(capacity: usize, threshold_percent: Option<u8>) -> Self {
        let capacity = match capacity {
            0 => DEFAULT_CAPACITY,
            c => c.min(MAX_CAPACITY),
        };
        let percent = match threshold_percent {
            Some(p) if p > 0 && p < 100 => usize::from(p),
            _ => usize::from(DEFAULT_THRESHOLD_PERCENT),
        };
        let threshold = (capacity / 100 * percent + capacity % 100 * percent / 100).max(1);
        Self {
            capacity,
            threshold: clamp_threshold(capacity, threshold),
        }
    }

    /// Reconfigures the capacity. The threshold is reset to the default
    /// percentage of the new capacity.
    #[must_use]
    pub fn with_capacity(self, capacity: usize) -> Self {
        Self::new(capacity, None)
    }

    /// Sets an absolute threshold, clamped like any other.
    #[must_use]
    pub fn with_threshold(self, threshold: usize) -> Self {
        Self {
            capacity: self.capacity,
            threshold: clamp_threshold(self.capacity, threshold),
        }
    }

    /// Records per buffer.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Unread records left in the active buffer when the other one is asked
    /// to refill.
    pub const fn threshold(&self) -> usize {
        self.threshold
    }
}

const fn clamp_threshold(capacity: usize, threshold: usize) -> usize {
    if capacity <= 1 {
        0
    } else if threshold == 0 {
        1
    } else if threshold >= capacity {
        capacity - 1
    } else {
        threshold
    }
}

#[cfg(feature = "serde")]
#[derive(Clone, Copy, Serialize, Deserialize)]
struct BufferConfigRepr {
    #[serde(default)]
    capacity: usize,
    #[serde(default)]
    threshold: Option<usize>,
}

#[cfg(feature = "serde")]
impl From<BufferConfigRepr> for BufferConfig {
    fn from(repr: BufferConfigRepr) -> Self {
        let config = Self::new(repr.capacity, None);
        match repr.threshold {
            Some(threshold) => config.with_threshold(threshold),
            None => config,
        }
    }
}

#[cfg(feature = "serde")]
impl From<BufferConfig> for BufferConfigRepr {
    fn from(config: BufferConfig) -> Self {
        Self {
            capacity: config.capacity,
            threshold: Some(config.threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BufferConfig::default();
        assert_eq!(config.capacity(), DEFAULT_CAPACITY);
        assert_eq!(config.threshold(), 100);
    }

    #[test]
    fn invalid_values_are_coerced() {
        assert_eq!(BufferConfig::new(0, None), BufferConfig::default());
        assert_eq!(BufferConfig::new(200, Some(0)).threshold(), 20);
        assert_eq!(BufferConfig::new(200, Some(100)).threshold(), 20);
        assert_eq!(BufferConfig::new(200, Some(50)).threshold(), 100);
        assert_eq!(BufferConfig::new(10, Some(20)).threshold(), 2);
        assert_eq!(BufferConfig::new(3, Some(99)).threshold(), 2);
    }

    #[test]
    fn capacity_is_capped_at_channel_limit() {
        let config = BufferConfig::new(usize::MAX, None);
        assert_eq!(config.capacity(), MAX_CAPACITY);
        assert_eq!(config.threshold(), MAX_CAPACITY / 10);
        assert!(config.threshold() < config.capacity());
        assert_eq!(BufferConfig::default().with_capacity(usize::MAX), config);
    }

    #[test]
    fn threshold_floor_is_one() {
        assert_eq!(BufferConfig::new(5, None).threshold(), 1);
        assert_eq!(BufferConfig::new(2, None).threshold(), 1);
        assert_eq!(BufferConfig::new(1, None).threshold(), 0);
    }

    #[test]
    fn reconfiguring_capacity_resets_threshold() {
        let config = BufferConfig::new(100, Some(50)).with_capacity(40);
        assert_eq!(config.capacity(), 40);
        assert_eq!(config.threshold(), 4);
    }

    #[test]
    fn absolute_threshold_is_clamped() {
        let config = BufferConfig::new(10, None);
        assert_eq!(config.with_threshold(2).threshold(), 2);
        assert_eq!(config.with_threshold(0).threshold(), 1);
        assert_eq!(config.with_threshold(10).threshold(), 9);
        assert_eq!(config.with_threshold(99).capacity(), 10);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let config = BufferConfig::new(10, None).with_threshold(3);
        let json = serde_json::to_string(&config).expect("serialize");
        assert_eq!(json, r#"{"capacity":10,"threshold":3}"#);
        assert_eq!(
            serde_json::from_str::<BufferConfig>(&json).expect("deserialize"),
            config
        );

        let loaded: BufferConfig = serde_json::from_str(r#"{"capacity":500}"#).expect("deserialize");
        assert_eq!(loaded, BufferConfig::new(500, None));

        let loaded: BufferConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(loaded, BufferConfig::default());
    }
}
