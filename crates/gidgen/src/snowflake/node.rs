use parking_lot::Mutex;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{SnowflakeConfig, TimeSource, WallClock};

/// Mutable clock/sequence state of one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnowflakeNodeState {
    pub last_timestamp_ms: i64,
    pub sequence: i64,
}

/// A lock-based Snowflake ID generator for one node.
///
/// Every call to [`Self::next_id`] takes the node's own lock, so concurrent
/// callers on the same node are serialized while separate nodes never
/// contend. Nodes are created with [`SnowflakeConfig::spawn_node`].
///
/// # Example
///
/// ```
/// use gidgen::SnowflakeConfig;
///
/// let config = SnowflakeConfig::default();
/// let node = config.spawn_node(Some(5));
///
/// let a = node.next_id();
/// let b = node.next_id();
/// assert!(b > a);
/// assert_eq!(node.extract_node(a), 5);
/// ```
#[derive(Debug)]
pub struct SnowflakeNode<C = WallClock> {
    config: SnowflakeConfig,
    node_id: i64,
    state: Mutex<SnowflakeNodeState>,
    clock: C,
}

impl<C> SnowflakeNode<C>
where
    C: TimeSource<i64>,
{
    pub(crate) fn new(config: SnowflakeConfig, node_id: i64, clock: C) -> Self {
        Self {
            config,
            node_id,
            state: Mutex::new(SnowflakeNodeState {
                last_timestamp_ms: 0,
                sequence: 0,
            }),
            clock,
        }
    }

    /// Generates the next id for this node.
    ///
    /// Within one millisecond the sequence increments; once it wraps the call
    /// spins until the clock moves past the last timestamp. Any other reading,
    /// including one *earlier* than the last timestamp, resets the sequence to
    /// zero and packs that reading as is.
    ///
    /// A backward clock step can therefore produce an id lower than one
    /// already issued, or repeat one. Use a [`MonotonicClock`] when that must
    /// not happen.
    ///
    /// [`MonotonicClock`]: crate::MonotonicClock
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> i64 {
        let mut state = self.state.lock();
        let mut now = self.clock.current_millis();

        if now == state.last_timestamp_ms {
            state.sequence = (state.sequence + 1) & self.config.seq_mask();
            if state.sequence == 0 {
                now = self.cold_wait_next_millis(state.last_timestamp_ms);
            }
        } else {
            state.sequence = 0;
        }

        state.last_timestamp_ms = now;
        self.config.compose(now, self.node_id, state.sequence)
    }

    #[cold]
    #[inline(never)]
    fn cold_wait_next_millis(&self, last_timestamp_ms: i64) -> i64 {
        #[cfg(feature = "tracing")]
        tracing::trace!(node_id = self.node_id, "sequence exhausted, spinning");

        let mut now = self.clock.current_millis();
        while now <= last_timestamp_ms {
            core::hint::spin_loop();
            now = self.clock.current_millis();
        }
        now
    }

    /// The node id packed into every id, after clamping.
    pub const fn node_id(&self) -> i64 {
        self.node_id
    }

    /// The layout this node packs ids with.
    pub const fn config(&self) -> &SnowflakeConfig {
        &self.config
    }

    /// A copy of the current clock/sequence state.
    pub fn state(&self) -> SnowflakeNodeState {
        *self.state.lock()
    }

    /// Returns the absolute millisecond timestamp encoded in `id`.
    pub const fn extract_timestamp(&self, id: i64) -> i64 {
        self.config.extract_timestamp(id)
    }

    /// Returns the node id encoded in `id`.
    pub const fn extract_node(&self, id: i64) -> i64 {
        self.config.extract_node(id)
    }

    /// Returns the sequence encoded in `id`.
    pub const fn extract_sequence(&self, id: i64) -> i64 {
        self.config.extract_sequence(id)
    }
}
