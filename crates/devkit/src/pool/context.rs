use super::{DEFAULT_WORKERS, ThreadPool};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;

static GLOBAL: PoolContext = PoolContext::new(DEFAULT_WORKERS);

/// Owner of a lazily created, shared [`ThreadPool`].
///
/// The pool is spawned on the first call to [`PoolContext::pool`] and reused
/// by every later call until it is swapped with [`PoolContext::replace`].
/// Handles returned before a replacement keep the old pool alive until they
/// are dropped.
pub struct PoolContext {
    pool: Mutex<Option<Arc<ThreadPool>>>,
    workers: usize,
}

impl PoolContext {
    /// Creates an empty context that will spawn `workers` threads on first
    /// use.
    pub const fn new(workers: usize) -> Self {
        Self {
            pool: Mutex::new(None),
            workers,
        }
    }

    /// Returns the shared pool, spawning it on first use.
    ///
    /// # Errors
    ///
    /// Propagates [`ThreadPool::new`] failures. Nothing is cached on error, so
    /// the next call tries again.
    pub fn pool(&self) -> Result<Arc<ThreadPool>> {
        let mut slot = self.pool.lock();
        if let Some(pool) = slot.as_ref() {
            return Ok(Arc::clone(pool));
        }

        let pool = Arc::new(ThreadPool::new(self.workers)?);
        *slot = Some(Arc::clone(&pool));
        Ok(pool)
    }

    /// Installs `pool` as the shared pool and returns the previous one, if it
    /// had been created.
    pub fn replace(&self, pool: ThreadPool) -> Option<Arc<ThreadPool>> {
        self.pool.lock().replace(Arc::new(pool))
    }

    /// Returns whether the shared pool has been created.
    pub fn is_initialized(&self) -> bool {
        self.pool.lock().is_some()
    }

    /// Returns the worker count used when the pool is created lazily.
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for PoolContext {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

/// Returns the process-wide [`PoolContext`].
pub fn global_context() -> &'static PoolContext {
    &GLOBAL
}

/// Returns the process-wide default pool of [`DEFAULT_WORKERS`] threads,
/// creating it on first use.
///
/// # Errors
///
/// Returns an error if the pool has to be created and spawning fails.
pub fn default_pool() -> Result<Arc<ThreadPool>> {
    GLOBAL.pool()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_lazily_and_reuses() {
        let context = PoolContext::new(3);
        assert!(!context.is_initialized());

        let first = context.pool().unwrap();
        let second = context.pool().unwrap();

        assert!(context.is_initialized());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.workers(), 3);
    }

    #[test]
    fn replace_swaps_pool() {
        let context = PoolContext::new(2);
        assert!(context.replace(ThreadPool::new(1).unwrap()).is_none());

        let replaced = context.pool().unwrap();
        assert_eq!(replaced.workers(), 1);

        let previous = context.replace(ThreadPool::new(5).unwrap()).unwrap();
        assert!(Arc::ptr_eq(&previous, &replaced));
        assert_eq!(context.pool().unwrap().workers(), 5);
    }

    #[test]
    fn failed_creation_is_not_cached() {
        let context = PoolContext::new(0);
        assert!(context.pool().is_err());
        assert!(!context.is_initialized());
    }

    #[test]
    fn default_pool_has_default_workers() {
        let pool = default_pool().unwrap();
        assert_eq!(pool.workers(), DEFAULT_WORKERS);
        assert!(Arc::ptr_eq(&pool, &default_pool().unwrap()));
    }
}
