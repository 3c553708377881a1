/// Which of the two buffers of a [`BufferedGenerator`] a record or signal
/// refers to.
///
/// [`BufferedGenerator`]: crate::BufferedGenerator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Buffer {
    Front,
    Back,
}

impl Buffer {
    /// The buffer that is not `self`.
    pub const fn other(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Front => 0,
            Self::Back => 1,
        }
    }
}

/// One slot produced by a refill pass.
///
/// A pass over a buffer of `capacity` slots marks position 0 as the head and
/// position `capacity - 1` as the tail. With a capacity of 1 the single record
/// is both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IdRecord<T> {
    pub id: T,
    pub is_head: bool,
    pub is_tail: bool,
}

impl<T> IdRecord<T> {
    /// Builds the record written at `index` of a pass over `capacity` slots.
    pub const fn at(id: T, index: usize, capacity: usize) -> Self {
        Self {
            id,
            is_head: index == 0,
            is_tail: index + 1 == capacity,
        }
    }
}
