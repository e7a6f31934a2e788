//! Error types shared by every `devkit` module.
//!
//! ## Error Cases
//! - `InvalidBatchSize`, `InvalidPoolSize`, `InvalidRepeats`, `InvalidDelay`:
//!   configuration rejected eagerly, before any work is submitted.
//! - `Spawn`, `PoolShutdown`: the worker pool could not be created or no
//!   longer accepts jobs.
//! - `Handler`, `HandlerPanicked`: a unit handler failed; surfaced at the
//!   point where its result is consumed.
//! - `AlreadyInitialized`, `NotInitialized`, `InvalidRootName`, `Subscriber`,
//!   `LogFile`: misuse or setup failures of the logging facade.

/// Boxed error returned by user-supplied handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for `devkit`.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Batches must hold at least one item.
    #[error("Invalid batch size: {size} (must be greater than 0)")]
    InvalidBatchSize { size: usize },

    /// A pool needs at least one worker thread.
    #[error("Invalid pool size: {workers} (must be greater than 0)")]
    InvalidPoolSize { workers: usize },

    /// The operating system refused to spawn a worker thread.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The pool was shut down and no longer accepts jobs, or it dropped a job
    /// without reporting back.
    #[error("Worker pool is shut down")]
    PoolShutdown,

    /// A unit handler returned an error.
    ///
    /// `unit` is the zero-based submission index of the failed batch or item.
    #[error("Handler failed for unit {unit}: {source}")]
    Handler {
        unit: usize,
        #[source]
        source: BoxError,
    },

    /// A unit handler panicked on a worker thread.
    #[error("Handler panicked for unit {unit}: {message}")]
    HandlerPanicked { unit: usize, message: String },

    /// Repeated timing needs at least one run to report on.
    #[error("Invalid repeat count: 0 (must be greater than 0)")]
    InvalidRepeats,

    /// The lower bound of a random delay exceeds its upper bound.
    #[error("Invalid delay range: {min:?} > {max:?}")]
    InvalidDelay {
        min: core::time::Duration,
        max: core::time::Duration,
    },

    /// Logging was initialized twice.
    #[error("Logging has already been initialized")]
    AlreadyInitialized,

    /// A logger was requested before logging was initialized.
    #[error("Logging hasn't been initialized")]
    NotInitialized,

    /// The root logger name is too short.
    #[error("Invalid root logger name: {name:?} (must be longer than 2 characters)")]
    InvalidRootName { name: String },

    /// The global `tracing` subscriber could not be installed.
    #[error("Failed to install log subscriber: {reason}")]
    Subscriber { reason: String },

    /// The log file could not be opened.
    #[error("Failed to open log file: {0}")]
    LogFile(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn handler_error_preserves_source() {
        let source = std::io::Error::other("disk on fire");
        let err = Error::Handler {
            unit: 3,
            source: Box::new(source),
        };

        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Handler failed for unit 3: disk on fire");
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::InvalidBatchSize { size: 0 }.to_string(),
            "Invalid batch size: 0 (must be greater than 0)"
        );
        assert_eq!(Error::PoolShutdown.to_string(), "Worker pool is shut down");
        assert_eq!(
            Error::NotInitialized.to_string(),
            "Logging hasn't been initialized"
        );
    }
}
