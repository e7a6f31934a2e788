//! Fixed-size pool of persistent worker threads.
//!
//! This module defines [`ThreadPool`], a set of OS threads that pull boxed
//! jobs from one shared multi-consumer queue. The pool's capacity is fixed at
//! construction; it never grows or shrinks.
//!
//! A process-wide default pool is available through [`default_pool`]. It is
//! created lazily by its [`PoolContext`] on first use and lives until the
//! process exits or it is replaced. Callers that need deterministic shutdown
//! should own a [`ThreadPool`] and call [`ThreadPool::shutdown`].

mod context;
mod worker;

pub use context::{PoolContext, default_pool, global_context};

use crate::{Error, Result};
use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use std::thread::{self, JoinHandle};
use worker::worker_loop;

/// Number of workers in the default pool.
pub const DEFAULT_WORKERS: usize = 8;

/// Thread name prefix used by [`ThreadPool::new`].
pub const DEFAULT_THREAD_NAME: &str = "devkit-worker";

/// A unit of work executed by one worker thread.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A bounded set of persistent worker threads.
///
/// Jobs are queued on an unbounded channel and picked up by whichever worker
/// is free. Submission is thread-safe, so a pool can be shared across threads
/// by reference or behind an [`Arc`](std::sync::Arc).
///
/// # Example
///
/// ```
/// use devkit::ThreadPool;
/// use std::sync::mpsc;
///
/// let pool = ThreadPool::new(2).unwrap();
/// let (tx, rx) = mpsc::channel();
/// for i in 0..4 {
///     let tx = tx.clone();
///     pool.execute(move || tx.send(i * i).unwrap()).unwrap();
/// }
/// drop(tx);
///
/// let mut squares: Vec<i32> = rx.iter().collect();
/// squares.sort();
/// assert_eq!(squares, vec![0, 1, 4, 9]);
/// pool.shutdown();
/// ```
pub struct ThreadPool {
    sender: RwLock<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    workers: usize,
    name: String,
}

impl ThreadPool {
    /// Spawns a pool of `workers` threads named `devkit-worker-{i}`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `workers` is zero ([`Error::InvalidPoolSize`]).
    /// - A worker thread cannot be spawned ([`Error::Spawn`]).
    pub fn new(workers: usize) -> Result<Self> {
        Self::with_name(workers, DEFAULT_THREAD_NAME)
    }

    /// Spawns a pool of `workers` threads named `{name}-{i}`.
    ///
    /// # Errors
    ///
    /// Same as [`ThreadPool::new`]. Threads spawned before a failure are shut
    /// down again before returning.
    pub fn with_name(workers: usize, name: impl Into<String>) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidPoolSize { workers });
        }

        let name = name.into();
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let rx = rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("{name}-{worker_id}"))
                .spawn(move || worker_loop(worker_id, rx));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    drop(tx);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(Error::Spawn(e));
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Started pool {name} with {workers} workers");

        Ok(Self {
            sender: RwLock::new(Some(tx)),
            handles: Mutex::new(handles),
            workers,
            name,
        })
    }

    /// Returns the fixed number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the thread name prefix of this pool.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether [`ThreadPool::shutdown`] has been called.
    pub fn is_shutdown(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Queues `job` for execution on the next free worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolShutdown`] if the pool no longer accepts jobs.
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.sender.read();
        let sender = guard.as_ref().ok_or(Error::PoolShutdown)?;
        sender
            .send(Box::new(job))
            .map_err(|_| Error::PoolShutdown)
    }

    /// Stops accepting jobs, lets the queued ones finish and joins the worker
    /// threads.
    ///
    /// Calling this more than once is a no-op. When called from one of the
    /// pool's own workers, that worker is not joined.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.write().take() else {
            return;
        };
        drop(sender);

        #[cfg(feature = "tracing")]
        tracing::debug!("Shutting down pool {}", self.name);

        let current = thread::current().id();
        let handles = core::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                #[cfg(feature = "tracing")]
                tracing::error!("A worker of pool {} panicked", self.name);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Pool {} shut down", self.name);
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl core::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("name", &self.name)
            .field("workers", &self.workers)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
