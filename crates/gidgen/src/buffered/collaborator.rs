use parking_lot::Mutex;

use crate::RawId;

/// An upstream producer of raw ids.
///
/// A [`BufferedGenerator`] calls it once per slot during a refill pass, from
/// its background worker. Refill passes are serialized, but the source is
/// shared with whatever else holds it, so implementations must be
/// thread-safe.
///
/// Any `Fn() -> T` closure is a source:
///
/// ```
/// use gidgen::IdSource;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let counter = AtomicU64::new(100);
/// let source = move || counter.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(source.next_id(), 100);
/// assert_eq!(source.next_id(), 101);
/// ```
///
/// [`BufferedGenerator`]: crate::BufferedGenerator
pub trait IdSource<T>: Send + Sync {
    /// Returns a fresh raw id.
    fn next_id(&self) -> T;
}

impl<T, F> IdSource<T> for F
where
    F: Fn() -> T + Send + Sync,
{
    fn next_id(&self) -> T {
        self()
    }
}

/// Durable storage for the watermark: the highest id known to be persisted.
///
/// The generator, not the store, keeps the watermark from decreasing: it
/// always loads before saving and only saves a larger id. There is no
/// transaction between the two calls. A failing save is the store's own
/// concern and is invisible to the generator.
pub trait IdStore<T>: Send + Sync {
    /// Returns the persisted watermark, or zero if none was ever saved.
    fn load_prev_id(&self) -> T;

    /// Persists `id` as the new watermark, overwriting the previous one.
    fn save_prev_id(&self, id: T);
}

/// An [`IdStore`] kept in process memory.
///
/// It survives a generator, not the process, which is enough to share a
/// watermark between successive generators in one process and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    prev_id: Mutex<T>,
}

impl<T: RawId> MemoryStore<T> {
    pub fn new() -> Self {
        Self::with_prev_id(T::ZERO)
    }

    /// Creates a store that already holds `prev_id`.
    pub fn with_prev_id(prev_id: T) -> Self {
        Self {
            prev_id: Mutex::new(prev_id),
        }
    }

    /// The currently stored watermark.
    pub fn prev_id(&self) -> T {
        *self.prev_id.lock()
    }
}

impl<T: RawId> IdStore<T> for MemoryStore<T> {
    fn load_prev_id(&self) -> T {
        *self.prev_id.lock()
    }

    fn save_prev_id(&self, id: T) {
        *self.prev_id.lock() = id;
    }
}
