use std::sync::{Arc, OnceLock};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};

use crate::{Buffer, Error, IdRecord, IdSource, IdStore, RawId, Result};

/// State reachable from both the foreground generator and its refill worker.
///
/// The collaborators are write-once and frozen by `start()`. The fallback
/// counter is only advanced while the refill lock is held.
pub(crate) struct Shared<T> {
    pub(crate) capacity: usize,
    pub(crate) source: OnceLock<Arc<dyn IdSource<T>>>,
    pub(crate) store: OnceLock<Arc<dyn IdStore<T>>>,
    refill_lock: Mutex<()>,
    total_index: AtomicU64,
    pending: [AtomicBool; 2],
}

impl<T: RawId> Shared<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            source: OnceLock::new(),
            store: OnceLock::new(),
            refill_lock: Mutex::new(()),
            total_index: AtomicU64::new(0),
            pending: [AtomicBool::new(false), AtomicBool::new(false)],
        }
    }

    /// Marks a refill of `buffer` as requested. Returns `false` if one was
    /// already pending or in flight.
    pub(crate) fn mark_pending(&self, buffer: Buffer) -> bool {
        !self.pending[buffer.index()].swap(true, Ordering::AcqRel)
    }

    fn clear_pending(&self, buffer: Buffer) {
        self.pending[buffer.index()].store(false, Ordering::Release);
    }

    pub(crate) fn total_index(&self) -> u64 {
        self.total_index.load(Ordering::Acquire)
    }

    /// Re-reads the stored watermark and persists `id` if it is larger.
    ///
    /// Returns the watermark in effect afterwards, or `None` without a store.
    pub(crate) fn advance_watermark(&self, id: T) -> Option<T> {
        let store = self.store.get()?;
        let prev = store.load_prev_id();
        if id > prev {
            store.save_prev_id(id);

            #[cfg(feature = "tracing")]
            tracing::debug!(%id, %prev, "watermark advanced");

            Some(id)
        } else {
            Some(prev)
        }
    }

    /// Writes one full pass of `capacity` records into `buffer`.
    ///
    /// The tail's id is persisted as soon as it is produced, before it is
    /// read by anyone, and the buffer's pending flag is cleared just before
    /// the tail is sent. Waits whenever the buffer is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerStopped`] if the generator owning the buffer has
    /// been dropped.
    pub(crate) async fn refill(
        &self,
        target: Buffer,
        buffer: &mpsc::Sender<IdRecord<T>>,
    ) -> Result<()> {
        let _guard = self.refill_lock.lock().await;

        #[cfg(feature = "tracing")]
        tracing::trace!(?target, capacity = self.capacity, "refill pass started");

        for index in 0..self.capacity {
            let counter = self.total_index.fetch_add(1, Ordering::AcqRel) + 1;
            let id = match self.source.get() {
                Some(source) => source.next_id(),
                None => T::from_counter(counter),
            };

            let record = IdRecord::at(id, index, self.capacity);
            if record.is_tail {
                self.advance_watermark(id);
                // No request for `target` can arrive before its tail is read.
                self.clear_pending(target);
            }

            buffer
                .send(record)
                .await
                .map_err(|_| Error::WorkerStopped)?;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(?target, "refill pass finished");

        Ok(())
    }
}

/// Refill worker owned by one [`BufferedGenerator`].
///
/// Waits on one signal channel per buffer and runs exactly one refill pass
/// for every signal it receives. The pending flag of a buffer stays set until
/// its pass reaches the tail, so requests raised while a pass is in flight
/// are coalesced into it.
///
/// Runs until the generator is dropped: both signal channels closing, or a
/// buffer's receiver going away mid-pass, ends the loop.
///
/// [`BufferedGenerator`]: crate::BufferedGenerator
pub(crate) async fn refill_loop<T: RawId>(
    shared: Arc<Shared<T>>,
    signals: [mpsc::Receiver<()>; 2],
    buffers: [mpsc::Sender<IdRecord<T>>; 2],
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("refill worker started");

    let [mut front_signal, mut back_signal] = signals;

    loop {
        let target = tokio::select! {
            Some(()) = front_signal.recv() => Buffer::Front,
            Some(()) = back_signal.recv() => Buffer::Back,
            else => break,
        };

        if let Err(_e) = shared.refill(target, &buffers[target.index()]).await {
            #[cfg(feature = "tracing")]
            tracing::debug!(?target, "refill pass aborted: {_e}");
            break;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("refill worker stopped");
}
