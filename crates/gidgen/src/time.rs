use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A trait for time sources that return a wall-clock or monotonic timestamp.
///
/// This abstraction allows a [`SnowflakeNode`] to read the real system clock,
/// a monotonic timer, or a mocked time source in tests.
///
/// The unit is **milliseconds since the Unix epoch**. The custom epoch of a
/// [`SnowflakeConfig`] is subtracted by the node, not by the time source.
///
/// # Example
///
/// ```
/// use gidgen::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource<i64> for FixedTime {
///     fn current_millis(&self) -> i64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
///
/// [`SnowflakeNode`]: crate::SnowflakeNode
/// [`SnowflakeConfig`]: crate::SnowflakeConfig
pub trait TimeSource<T> {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> T;
}

/// The system wall clock.
///
/// Reads `SystemTime::now()` on every call, so it follows NTP adjustments and
/// can move backward. A [`SnowflakeNode`] does not treat a backward step
/// specially; see [`SnowflakeNode::next_id`].
///
/// [`SnowflakeNode`]: crate::SnowflakeNode
/// [`SnowflakeNode::next_id`]: crate::SnowflakeNode::next_id
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl TimeSource<i64> for WallClock {
    fn current_millis(&self) -> i64 {
        unix_millis(SystemTime::now())
    }
}

/// A monotonic time source aligned to the Unix epoch.
///
/// The wall-clock time is sampled once at construction. Every later reading
/// adds the elapsed [`Instant`] time to that anchor, so the returned value
/// never goes backward even if the system clock is adjusted externally.
///
/// Use it with [`SnowflakeConfig::spawn_node_with_clock`] when ids must stay
/// strictly increasing across clock corrections.
///
/// [`SnowflakeConfig::spawn_node_with_clock`]:
///     crate::SnowflakeConfig::spawn_node_with_clock
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    anchor_millis: i64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Anchors a new monotonic clock at the current wall-clock time.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            anchor_millis: unix_millis(SystemTime::now()),
        }
    }
}

impl TimeSource<i64> for MonotonicClock {
    fn current_millis(&self) -> i64 {
        let elapsed = i64::try_from(self.start.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.anchor_millis.saturating_add(elapsed)
    }
}

// A system clock set before 1970 reads as 0.
fn unix_millis(now: SystemTime) -> i64 {
    now.duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_is_after_2019() {
        // 2019-02-28, the default snowflake epoch
        assert!(WallClock.current_millis() > 1_551_377_400_197);
    }

    #[test]
    fn monotonic_clock_never_goes_backward() {
        let clock = MonotonicClock::new();
        let mut last = clock.current_millis();
        for _ in 0..10_000 {
            let now = clock.current_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn monotonic_clock_tracks_wall_clock() {
        let clock = MonotonicClock::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let drift = (clock.current_millis() - WallClock.current_millis()).abs();
        assert!(drift < 1_000, "drift too large: {drift}ms");
    }
}
