#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{SnowflakeNode, TimeSource, WallClock};

/// Default epoch: Thursday, February 28, 2019 18:10:00.197 UTC
pub const DEFAULT_EPOCH: i64 = 1_551_377_400_197;

/// Default width of the node field.
pub const DEFAULT_NODE_BITS: u8 = 10;

/// Default width of the sequence field.
pub const DEFAULT_SEQ_BITS: u8 = 12;

// node + sequence must leave at least one timestamp bit below the sign bit.
const FIELD_BITS_LIMIT: u8 = 63;

/// Bit layout and epoch shared by every node spawned from it.
///
/// The default layout packs ~41 bits of timestamp, 10 bits of node id and 12
/// bits of sequence below the sign bit:
///
/// ```text
///  Bit Index:  63           63 62            22 21             12 11             0
///              +--------------+----------------+-----------------+---------------+
///  Field:      | reserved (1) | timestamp (41) |    node (10)    | sequence (12) |
///              +--------------+----------------+-----------------+---------------+
///              |<----------- MSB ---------- 64 bits ----------- LSB ------------>|
/// ```
///
/// Setters never fail. An out-of-range value falls back to the field's
/// default, and the derived masks and shifts are recomputed on every set.
///
/// # Example
///
/// ```
/// use gidgen::SnowflakeConfig;
///
/// let mut config = SnowflakeConfig::default();
/// config.set_node_bits(8).set_seq_bits(14);
/// assert_eq!(config.node_max(), 255);
/// assert_eq!(config.seq_mask(), 16_383);
/// assert_eq!(config.time_shift(), 22);
///
/// // zero bits are invalid, so the default is restored
/// config.set_node_bits(0);
/// assert_eq!(config.node_bits(), 10);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "SnowflakeConfigRepr", into = "SnowflakeConfigRepr")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SnowflakeConfig {
    epoch: i64,
    node_bits: u8,
    seq_bits: u8,
    node_max: i64,
    node_mask: i64,
    seq_mask: i64,
    time_shift: u8,
    node_shift: u8,
}

impl Default for SnowflakeConfig {
    fn default() -> Self {
        let mut config = Self {
            epoch: DEFAULT_EPOCH,
            node_bits: DEFAULT_NODE_BITS,
            seq_bits: DEFAULT_SEQ_BITS,
            node_max: 0,
            node_mask: 0,
            seq_mask: 0,
            time_shift: 0,
            node_shift: 0,
        };
        config.recompute();
        config
    }
}

impl SnowflakeConfig {
    /// Creates a configuration from explicit values, coercing each invalid
    /// value to its default exactly like the setters do.
    pub fn new(epoch: i64, node_bits: u8, seq_bits: u8) -> Self {
        let mut config = Self::default();
        config.set_epoch(epoch);
        if fits(node_bits, seq_bits) {
            config.node_bits = node_bits;
            config.seq_bits = seq_bits;
            config.recompute();
        } else {
            config.set_seq_bits(seq_bits).set_node_bits(node_bits);
        }
        config
    }

    /// Sets the reference timestamp, in milliseconds since the Unix epoch.
    ///
    /// A non-positive epoch falls back to [`DEFAULT_EPOCH`].
    pub fn set_epoch(&mut self, epoch: i64) -> &mut Self {
        self.epoch = if epoch <= 0 { DEFAULT_EPOCH } else { epoch };
        self
    }

    /// Sets the width of the node field.
    ///
    /// Zero, or a width that leaves no room for the timestamp next to the
    /// current sequence width, falls back to [`DEFAULT_NODE_BITS`]. If the
    /// default still does not fit, the sequence width is reset as well.
    pub fn set_node_bits(&mut self, node_bits: u8) -> &mut Self {
        self.node_bits = if fits(node_bits, self.seq_bits) {
            node_bits
        } else {
            DEFAULT_NODE_BITS
        };
        if !fits(self.node_bits, self.seq_bits) {
            self.seq_bits = DEFAULT_SEQ_BITS;
        }
        self.recompute();
        self
    }

    /// Sets the width of the sequence field.
    ///
    /// Same fallback rules as [`Self::set_node_bits`], mirrored.
    pub fn set_seq_bits(&mut self, seq_bits: u8) -> &mut Self {
        self.seq_bits = if fits(seq_bits, self.node_bits) {
            seq_bits
        } else {
            DEFAULT_SEQ_BITS
        };
        if !fits(self.seq_bits, self.node_bits) {
            self.node_bits = DEFAULT_NODE_BITS;
        }
        self.recompute();
        self
    }

    fn recompute(&mut self) {
        self.node_max = (1_i64 << self.node_bits) - 1;
        self.node_mask = self.node_max << self.seq_bits;
        self.seq_mask = (1_i64 << self.seq_bits) - 1;
        self.time_shift = self.node_bits + self.seq_bits;
        self.node_shift = self.seq_bits;
    }

    /// Reference timestamp, in milliseconds since the Unix epoch.
    pub const fn epoch(&self) -> i64 {
        self.epoch
    }

    /// Width of the node field.
    pub const fn node_bits(&self) -> u8 {
        self.node_bits
    }

    /// Width of the sequence field.
    pub const fn seq_bits(&self) -> u8 {
        self.seq_bits
    }

    /// Largest valid node id, `2^node_bits - 1`.
    pub const fn node_max(&self) -> i64 {
        self.node_max
    }

    /// Mask selecting the node field in a packed id.
    pub const fn node_mask(&self) -> i64 {
        self.node_mask
    }

    /// Largest sequence value, `2^seq_bits - 1`.
    pub const fn seq_mask(&self) -> i64 {
        self.seq_mask
    }

    /// Bit offset of the timestamp field, `node_bits + seq_bits`.
    pub const fn time_shift(&self) -> u8 {
        self.time_shift
    }

    /// Bit offset of the node field, `seq_bits`.
    pub const fn node_shift(&self) -> u8 {
        self.node_shift
    }

    /// Spawns a node that reads the system wall clock.
    ///
    /// `node_id` is clamped to `[0, node_max]`: a missing or out-of-range
    /// value becomes 0.
    pub fn spawn_node(&self, node_id: Option<i64>) -> SnowflakeNode<WallClock> {
        self.spawn_node_with_clock(node_id, WallClock)
    }

    /// Spawns a node that reads time from `clock`.
    pub fn spawn_node_with_clock<C>(&self, node_id: Option<i64>, clock: C) -> SnowflakeNode<C>
    where
        C: TimeSource<i64>,
    {
        let node_id = match node_id {
            Some(id) if (0..=self.node_max).contains(&id) => id,
            _ => 0,
        };
        SnowflakeNode::new(*self, node_id, clock)
    }

    /// Packs an absolute millisecond timestamp, a node id and a sequence into
    /// one id.
    ///
    /// Node id and sequence are masked to their field widths. A timestamp
    /// before the epoch or too far after it produces a well-defined but
    /// meaningless id.
    pub const fn compose(&self, timestamp_ms: i64, node_id: i64, sequence: i64) -> i64 {
        (timestamp_ms.wrapping_sub(self.epoch) << self.time_shift)
            | ((node_id & self.node_max) << self.node_shift)
            | (sequence & self.seq_mask)
    }

    /// Returns the absolute millisecond timestamp encoded in `id`.
    pub const fn extract_timestamp(&self, id: i64) -> i64 {
        (id >> self.time_shift).wrapping_add(self.epoch)
    }

    /// Returns the node id encoded in `id`.
    pub const fn extract_node(&self, id: i64) -> i64 {
        (id & self.node_mask) >> self.node_shift
    }

    /// Returns the sequence encoded in `id`.
    pub const fn extract_sequence(&self, id: i64) -> i64 {
        id & self.seq_mask
    }
}

const fn fits(bits: u8, other: u8) -> bool {
    bits > 0 && (bits as u16 + other as u16) < FIELD_BITS_LIMIT as u16
}

/// Wire shape of a [`SnowflakeConfig`]; derived fields are rebuilt on load.
#[cfg(feature = "serde")]
#[derive(Clone, Copy, Serialize, Deserialize)]
struct SnowflakeConfigRepr {
    #[serde(default = "default_epoch")]
    epoch: i64,
    #[serde(default = "default_node_bits")]
    node_bits: u8,
    #[serde(default = "default_seq_bits")]
    seq_bits: u8,
}

#[cfg(feature = "serde")]
const fn default_epoch() -> i64 {
    DEFAULT_EPOCH
}

#[cfg(feature = "serde")]
const fn default_node_bits() -> u8 {
    DEFAULT_NODE_BITS
}

#[cfg(feature = "serde")]
const fn default_seq_bits() -> u8 {
    DEFAULT_SEQ_BITS
}

#[cfg(feature = "serde")]
impl From<SnowflakeConfigRepr> for SnowflakeConfig {
    fn from(repr: SnowflakeConfigRepr) -> Self {
        Self::new(repr.epoch, repr.node_bits, repr.seq_bits)
    }
}

#[cfg(feature = "serde")]
impl From<SnowflakeConfig> for SnowflakeConfigRepr {
    fn from(config: SnowflakeConfig) -> Self {
        Self {
            epoch: config.epoch,
            node_bits: config.node_bits,
            seq_bits: config.seq_bits,
        }
    }
}
