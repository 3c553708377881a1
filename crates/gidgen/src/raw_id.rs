use core::{fmt, hash::Hash};

/// A primitive scalar that a [`BufferedGenerator`] can issue.
///
/// Implemented for [`u64`] and [`i64`] so one generator covers both the
/// unsigned and the signed flavour of upstream id sources.
///
/// [`BufferedGenerator`]: crate::BufferedGenerator
pub trait RawId:
    Copy + Default + Ord + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Zero value (the watermark of an empty store)
    const ZERO: Self;

    /// Converts the fallback counter into this id type.
    ///
    /// The counter starts at 1 and only grows, so for signed ids the
    /// conversion saturates at the maximum instead of wrapping negative.
    fn from_counter(counter: u64) -> Self;
}

impl RawId for u64 {
    const ZERO: Self = 0;

    fn from_counter(counter: u64) -> Self {
        counter
    }
}

impl RawId for i64 {
    const ZERO: Self = 0;

    fn from_counter(counter: u64) -> Self {
        Self::try_from(counter).unwrap_or(Self::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_conversion() {
        assert_eq!(u64::from_counter(7), 7);
        assert_eq!(i64::from_counter(7), 7);
        assert_eq!(u64::from_counter(u64::MAX), u64::MAX);
        assert_eq!(i64::from_counter(u64::MAX), i64::MAX);
    }
}
