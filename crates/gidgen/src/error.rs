/// A result type defaulting to the crate [`enum@Error`].
///
/// ID issuance itself never fails on correct usage. The fallible surface is
/// limited to the lifecycle of a [`BufferedGenerator`].
///
/// [`BufferedGenerator`]: crate::BufferedGenerator
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `gidgen` can emit.
///
/// Invalid configuration values are coerced to documented defaults rather
/// than rejected, so every variant here describes a lifecycle misuse or a
/// refill worker that is no longer running.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// `next()` was called before `start()`.
    #[error("generator has not been started")]
    NotStarted,

    /// `start()` was called twice, or a collaborator was configured after
    /// `start()`.
    #[error("generator has already been started")]
    AlreadyStarted,

    /// A collaborator slot was configured twice. Carries the slot name
    /// (`"source"` or `"store"`).
    #[error("{0} is already configured")]
    AlreadyConfigured(&'static str),

    /// The background refill worker has exited, so the active buffer can
    /// never be refilled. This happens when the runtime hosting the worker
    /// shuts down.
    #[error("refill worker stopped")]
    WorkerStopped,
}
