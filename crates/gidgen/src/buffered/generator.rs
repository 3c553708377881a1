use std::sync::Arc;

use portable_atomic::{AtomicBool, Ordering};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
#[cfg(feature = "tracing")]
use tracing::instrument;

use super::worker::{Shared, refill_loop};
use crate::{Buffer, BufferConfig, Error, IdRecord, IdSource, IdStore, RawId, Result};

/// A point-in-time copy of a [`BufferedGenerator`]'s consumer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorState<T> {
    /// The buffer currently being drained.
    pub active_buffer: Buffer,
    /// Records read from the active buffer since its last refill.
    pub position: usize,
    /// The persisted watermark as last seen by the consumer.
    pub watermark: T,
    /// Ids at or below this value are skipped: the watermark loaded by
    /// `start()`, raised by every buffer tail read since.
    pub floor: T,
    /// The last id handed out, zero before the first.
    pub last_issued: T,
    /// Slots produced by all refill passes so far (the fallback counter).
    pub total_index: u64,
}

/// Consumer side, guarded by the issuance lock.
struct Issuance<T> {
    buffers: [mpsc::Receiver<IdRecord<T>>; 2],
    active: Buffer,
    position: usize,
    watermark: T,
    floor: T,
    last_issued: T,
}

/// A double-buffered, prefetching id generator.
///
/// Two buffers of `capacity` records alternate: the caller drains the active
/// one while a background Tokio task refills the other. When only
/// `threshold` records remain in the active buffer, the other buffer is
/// asked to refill, so under steady load [`Self::next`] never waits on the
/// source.
///
/// Ids come from the configured [`IdSource`], or from an internal counter
/// starting at 1. With an [`IdStore`], the generator persists a watermark at
/// the tail of every buffer. Every id at or below the watermark loaded in
/// [`Self::start`], or at or below the tail of a buffer already drained, is
/// skipped.
///
/// ## Lifecycle
/// 1. [`Self::new`] spawns the refill worker.
/// 2. [`Self::configure_source`] / [`Self::configure_store`] (optional).
/// 3. [`Self::start`] loads the watermark and requests the first refill.
/// 4. [`Self::next`] any number of times, from any number of tasks.
///
/// Dropping the generator stops its worker.
///
/// ## Caveat
/// A source that never produces an id above the current floor makes
/// [`Self::next`] skip forever. A source that repeats an id within one
/// buffer hands the repeat out; only buffer tails move the floor.
///
/// # Example
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> gidgen::Result<()> {
/// use std::sync::Arc;
/// use gidgen::{BufferConfig, BufferedGenerator, MemoryStore};
///
/// let store = Arc::new(MemoryStore::with_prev_id(500_u64));
///
/// let generator: BufferedGenerator<u64> = BufferedGenerator::new(BufferConfig::new(100, None));
/// generator.configure_store(store.clone())?;
/// generator.start().await?;
///
/// // ids up to the stored watermark are never handed out again
/// assert_eq!(generator.next().await?, 501);
/// # Ok(())
/// # }
/// ```
pub struct BufferedGenerator<T: RawId = u64> {
    config: BufferConfig,
    shared: Arc<Shared<T>>,
    signals: [mpsc::Sender<()>; 2],
    issuance: Mutex<Issuance<T>>,
    started: AtomicBool,
    worker: JoinHandle<()>,
}

impl<T: RawId> BufferedGenerator<T> {
    /// Creates a generator with two empty buffers and spawns its refill
    /// worker.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a Tokio runtime.
    pub fn new(config: BufferConfig) -> Self {
        let capacity = config.capacity();
        let shared = Arc::new(Shared::new(capacity));

        let (front_tx, front_rx) = mpsc::channel(capacity);
        let (back_tx, back_rx) = mpsc::channel(capacity);
        let (front_signal, front_signal_rx) = mpsc::channel(1);
        let (back_signal, back_signal_rx) = mpsc::channel(1);

        let worker = tokio::spawn(refill_loop(
            Arc::clone(&shared),
            [front_signal_rx, back_signal_rx],
            [front_tx, back_tx],
        ));

        Self {
            config,
            shared,
            signals: [front_signal, back_signal],
            issuance: Mutex::new(Issuance {
                buffers: [front_rx, back_rx],
                active: Buffer::Front,
                position: 0,
                watermark: T::ZERO,
                floor: T::ZERO,
                last_issued: T::ZERO,
            }),
            started: AtomicBool::new(false),
            worker,
        }
    }

    /// Sets the upstream id source. Must happen before [`Self::start`].
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] after [`Self::start`]
    /// - [`Error::AlreadyConfigured`] if a source was already set
    pub fn configure_source(&self, source: Arc<dyn IdSource<T>>) -> Result<()> {
        self.ensure_not_started()?;
        self.shared
            .source
            .set(source)
            .map_err(|_| Error::AlreadyConfigured("source"))
    }

    /// Sets the watermark store. Must happen before [`Self::start`].
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] after [`Self::start`]
    /// - [`Error::AlreadyConfigured`] if a store was already set
    pub fn configure_store(&self, store: Arc<dyn IdStore<T>>) -> Result<()> {
        self.ensure_not_started()?;
        self.shared
            .store
            .set(store)
            .map_err(|_| Error::AlreadyConfigured("store"))
    }

    fn ensure_not_started(&self) -> Result<()> {
        if self.started.load(Ordering::Acquire) {
            return Err(Error::AlreadyStarted);
        }
        Ok(())
    }

    /// Loads the stored watermark, if any, and requests the first refill of
    /// the front buffer. Returns without waiting for that refill.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] on a second call.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub async fn start(&self) -> Result<()> {
        // Held until the first refill is requested, so no caller can block
        // on the empty front buffer ahead of it.
        let mut issuance = self.issuance.lock().await;
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyStarted);
        }

        if let Some(store) = self.shared.store.get() {
            let prev = store.load_prev_id();
            issuance.watermark = prev;
            issuance.floor = prev;

            #[cfg(feature = "tracing")]
            tracing::debug!(watermark = %prev, "loaded watermark");
        }

        self.request_refill(Buffer::Front);
        Ok(())
    }

    /// Returns the next id.
    ///
    /// Calls are serialized: concurrent callers queue on the issuance lock and
    /// receive ids in buffer order. Waits while the active buffer is empty,
    /// which under correct sizing only happens right after [`Self::start`].
    ///
    /// # Errors
    ///
    /// - [`Error::NotStarted`] before [`Self::start`]
    /// - [`Error::WorkerStopped`] if the refill worker is gone
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub async fn next(&self) -> Result<T> {
        if !self.started.load(Ordering::Acquire) {
            return Err(Error::NotStarted);
        }

        let capacity = self.config.capacity();
        let threshold = self.config.threshold();
        let mut issuance = self.issuance.lock().await;
        let mut skipped = 0_usize;

        loop {
            let active = issuance.active;
            let record = issuance.buffers[active.index()]
                .recv()
                .await
                .ok_or(Error::WorkerStopped)?;

            issuance.position += 1;
            if capacity - issuance.position == threshold {
                self.request_refill(active.other());
            }

            let skip = record.id <= issuance.floor;

            if record.is_tail {
                issuance.position = 0;
                issuance.active = active.other();
                if let Some(watermark) = self.shared.advance_watermark(record.id) {
                    issuance.watermark = issuance.watermark.max(watermark);
                }
                // Only consumed tails raise the floor. The stored watermark
                // already holds tails of buffers nobody has read yet.
                issuance.floor = issuance.floor.max(record.id);

                #[cfg(feature = "tracing")]
                tracing::trace!(
                    from = ?active,
                    to = ?active.other(),
                    floor = %issuance.floor,
                    "buffer flipped"
                );
            }

            if skip {
                skipped += 1;
                if skipped % capacity == 0 {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        skipped,
                        floor = %issuance.floor,
                        "source has not passed the watermark yet"
                    );
                }
                continue;
            }

            issuance.last_issued = record.id;
            return Ok(record.id);
        }
    }

    /// Asks the worker to refill `buffer` without waiting. A no-op while a
    /// refill of that buffer is already pending or in flight.
    fn request_refill(&self, buffer: Buffer) {
        if !self.shared.mark_pending(buffer) {
            #[cfg(feature = "tracing")]
            tracing::trace!(?buffer, "refill already pending");
            return;
        }

        if let Err(_e) = self.signals[buffer.index()].try_send(()) {
            #[cfg(feature = "tracing")]
            tracing::error!(?buffer, "failed to signal refill worker: {_e}");
        }
    }

    /// A copy of the consumer state. Waits for any in-progress [`Self::next`].
    pub async fn state(&self) -> GeneratorState<T> {
        let issuance = self.issuance.lock().await;
        GeneratorState {
            active_buffer: issuance.active,
            position: issuance.position,
            watermark: issuance.watermark,
            floor: issuance.floor,
            last_issued: issuance.last_issued,
            total_index: self.shared.total_index(),
        }
    }

    pub const fn config(&self) -> &BufferConfig {
        &self.config
    }
}

impl<T: RawId> Drop for BufferedGenerator<T> {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
