use super::Job;
use crossbeam_channel::Receiver;
use std::panic::{self, AssertUnwindSafe};

/// Worker thread body: runs [`Job`]s from the shared queue until it is closed
/// and drained.
///
/// A panicking job is contained here so the pool keeps its fixed capacity.
/// Jobs that need to report panics (the dispatcher's do) catch them
/// themselves.
///
/// # Arguments
///
/// - `worker_id`: Index of the worker inside its pool (used for tracing).
/// - `rx`: Receiving end of the pool's job queue, shared by all workers.
pub(super) fn worker_loop(worker_id: usize, rx: Receiver<Job>) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    while let Ok(job) = rx.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            #[cfg(feature = "tracing")]
            tracing::error!("Worker {worker_id} contained a panicking job");
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
    #[cfg(not(feature = "tracing"))]
    let _ = worker_id;
}
