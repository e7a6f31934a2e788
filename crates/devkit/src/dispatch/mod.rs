//! Batch and per-item dispatch over a [`ThreadPool`].
//!
//! Every operation hands units of work (batches of items, or single items) to
//! the pool, runs a handler once per unit on the workers and passes each
//! result to a result handler on the calling thread. The calling thread blocks
//! until every result has been handled or a unit failed.
//!
//! ## Operation matrix
//!
//! |                       | per batch                           | per item                     |
//! |-----------------------|-------------------------------------|------------------------------|
//! | result, ordered       | [`batch_handle`]                    | [`handle`]                   |
//! | result, unordered     | [`batch_handle_unordered`]          | [`handle_unordered`]         |
//! | unit + result, ordered| [`batch_handle_with_batch`]         | [`handle_with_item`]         |
//! | unit + result, unord. | [`batch_handle_with_batch_unordered`] | [`handle_with_item_unordered`] |
//!
//! Ordered operations call the result handler in submission order even when
//! later units finish first; unordered ones call it in completion order.
//! Result handlers never run concurrently with each other.
//!
//! ## Failures
//!
//! Handlers return `Result<U, E>`. An `Err` or a panic inside a handler is
//! reported as [`Error::Handler`](crate::Error::Handler) or
//! [`Error::HandlerPanicked`](crate::Error::HandlerPanicked) once the dispatcher
//! reaches that unit's result. No further units are submitted after a
//! failure, results already handled stay handled, and nothing is retried.
//!
//! Every free function takes an optional pool; `None` uses
//! [`default_pool`](crate::default_pool). [`Dispatcher`] offers the same
//! operations bound to one pool.

mod engine;

pub use engine::{Delivery, IN_FLIGHT_PER_WORKER};

use crate::{BoxError, Result, ThreadPool, batch_ranges, default_pool};
use core::ops::Range;
use std::sync::Arc;

/// Dispatch operations bound to one [`ThreadPool`].
#[derive(Clone, Copy, Debug)]
pub struct Dispatcher<'p> {
    pool: &'p ThreadPool,
}

impl<'p> Dispatcher<'p> {
    pub const fn new(pool: &'p ThreadPool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &'p ThreadPool {
        self.pool
    }

    /// Processes `items` in batches of `batch_size` with `batch_handler` and
    /// passes the results to `result_handler` in batch order.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `batch_size` is zero.
    /// - The pool is shut down.
    /// - `batch_handler` fails or panics for some batch.
    pub fn batch_handle<T, U, E, B, R>(
        &self,
        items: impl Into<Arc<[T]>>,
        batch_size: usize,
        batch_handler: B,
        mut result_handler: R,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        B: Fn(&[T]) -> core::result::Result<U, E> + Send + Sync + 'static,
        R: FnMut(U),
    {
        self.batches(
            items.into(),
            batch_size,
            Delivery::Ordered,
            batch_handler,
            |_, result| result_handler(result),
        )
    }

    /// Like [`Dispatcher::batch_handle`], but results are handled in
    /// completion order.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::batch_handle`].
    pub fn batch_handle_unordered<T, U, E, B, R>(
        &self,
        items: impl Into<Arc<[T]>>,
        batch_size: usize,
        batch_handler: B,
        mut result_handler: R,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        B: Fn(&[T]) -> core::result::Result<U, E> + Send + Sync + 'static,
        R: FnMut(U),
    {
        self.batches(
            items.into(),
            batch_size,
            Delivery::Unordered,
            batch_handler,
            |_, result| result_handler(result),
        )
    }

    /// Like [`Dispatcher::batch_handle`], but `result_handler` also receives
    /// the batch that produced each result.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::batch_handle`].
    pub fn batch_handle_with_batch<T, U, E, B, R>(
        &self,
        items: impl Into<Arc<[T]>>,
        batch_size: usize,
        batch_handler: B,
        result_handler: R,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        B: Fn(&[T]) -> core::result::Result<U, E> + Send + Sync + 'static,
        R: FnMut(&[T], U),
    {
        self.batches(
            items.into(),
            batch_size,
            Delivery::Ordered,
            batch_handler,
            result_handler,
        )
    }

    /// Like [`Dispatcher::batch_handle_with_batch`], but results are handled
    /// in completion order.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::batch_handle`].
    pub fn batch_handle_with_batch_unordered<T, U, E, B, R>(
        &self,
        items: impl Into<Arc<[T]>>,
        batch_size: usize,
        batch_handler: B,
        result_handler: R,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        B: Fn(&[T]) -> core::result::Result<U, E> + Send + Sync + 'static,
        R: FnMut(&[T], U),
    {
        self.batches(
            items.into(),
            batch_size,
            Delivery::Unordered,
            batch_handler,
            result_handler,
        )
    }

    /// Processes every item with `item_handler` and passes the results to
    /// `result_handler` in item order.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool is shut down or `item_handler` fails or
    /// panics for some item.
    pub fn handle<T, U, E, H, R>(
        &self,
        items: impl Into<Arc<[T]>>,
        item_handler: H,
        mut result_handler: R,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
        R: FnMut(U),
    {
        self.each(
            items.into(),
            Delivery::Ordered,
            item_handler,
            |_, result| result_handler(result),
        )
    }

    /// Like [`Dispatcher::handle`], but results are handled in completion
    /// order.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::handle`].
    pub fn handle_unordered<T, U, E, H, R>(
        &self,
        items: impl Into<Arc<[T]>>,
        item_handler: H,
        mut result_handler: R,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
        R: FnMut(U),
    {
        self.each(
            items.into(),
            Delivery::Unordered,
            item_handler,
            |_, result| result_handler(result),
        )
    }

    /// Like [`Dispatcher::handle`], but `result_handler` also receives the
    /// item that produced each result.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::handle`].
    pub fn handle_with_item<T, U, E, H, R>(
        &self,
        items: impl Into<Arc<[T]>>,
        item_handler: H,
        result_handler: R,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
        R: FnMut(&T, U),
    {
        self.each(items.into(), Delivery::Ordered, item_handler, result_handler)
    }

    /// Like [`Dispatcher::handle_with_item`], but results are handled in
    /// completion order.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::handle`].
    pub fn handle_with_item_unordered<T, U, E, H, R>(
        &self,
        items: impl Into<Arc<[T]>>,
        item_handler: H,
        result_handler: R,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
        R: FnMut(&T, U),
    {
        self.each(
            items.into(),
            Delivery::Unordered,
            item_handler,
            result_handler,
        )
    }

    /// Processes every item with `item_handler` and returns the results in
    /// item order.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::handle`].
    pub fn map<T, U, E, H>(&self, items: impl Into<Arc<[T]>>, item_handler: H) -> Result<Vec<U>>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
    {
        let items = items.into();
        let mut results = Vec::with_capacity(items.len());
        self.each(items, Delivery::Ordered, item_handler, |_, result| {
            results.push(result)
        })?;
        Ok(results)
    }

    fn batches<T, U, E, B, R>(
        &self,
        items: Arc<[T]>,
        batch_size: usize,
        delivery: Delivery,
        batch_handler: B,
        mut result_handler: R,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        B: Fn(&[T]) -> core::result::Result<U, E> + Send + Sync + 'static,
        R: FnMut(&[T], U),
    {
        let units = batch_ranges(items.len(), batch_size)?;
        engine::run(
            self.pool,
            items,
            units,
            delivery,
            move |items: &[T], range: Range<usize>| batch_handler(&items[range]),
            |items: &[T], range: Range<usize>, result| result_handler(&items[range], result),
        )
    }

    fn each<T, U, E, H, R>(
        &self,
        items: Arc<[T]>,
        delivery: Delivery,
        item_handler: H,
        mut result_handler: R,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        E: Into<BoxError> + 'static,
        H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
        R: FnMut(&T, U),
    {
        let units = (0..items.len()).map(|i| i..i + 1).collect();
        engine::run(
            self.pool,
            items,
            units,
            delivery,
            move |items: &[T], range: Range<usize>| item_handler(&items[range.start]),
            |items: &[T], range: Range<usize>, result| result_handler(&items[range.start], result),
        )
    }
}

/// Runs `f` with a dispatcher on `pool`, or on the default pool if `None`.
fn with_pool<O>(
    pool: Option<&ThreadPool>,
    f: impl FnOnce(Dispatcher<'_>) -> Result<O>,
) -> Result<O> {
    match pool {
        Some(pool) => f(Dispatcher::new(pool)),
        None => {
            let pool = default_pool()?;
            f(Dispatcher::new(&pool))
        }
    }
}

/// Breaks `items` into batches of `batch_size`, processes each batch on the
/// pool with `batch_handler` and post-processes the results with
/// `result_handler` in batch order.
///
/// The last batch may hold fewer than `batch_size` items.
///
/// # Example
///
/// ```
/// use core::convert::Infallible;
///
/// let mut sums = Vec::new();
/// devkit::batch_handle(
///     (0..71u64).collect::<Vec<_>>(),
///     7,
///     |batch: &[u64]| Ok::<_, Infallible>(batch.iter().sum::<u64>()),
///     |sum| sums.push(sum),
///     None,
/// )
/// .unwrap();
///
/// assert_eq!(sums, vec![21, 70, 119, 168, 217, 266, 315, 364, 413, 462, 70]);
/// ```
///
/// # Errors
///
/// See [`Dispatcher::batch_handle`].
pub fn batch_handle<T, U, E, B, R>(
    items: impl Into<Arc<[T]>>,
    batch_size: usize,
    batch_handler: B,
    result_handler: R,
    pool: Option<&ThreadPool>,
) -> Result<()>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    B: Fn(&[T]) -> core::result::Result<U, E> + Send + Sync + 'static,
    R: FnMut(U),
{
    with_pool(pool, |d| {
        d.batch_handle(items, batch_size, batch_handler, result_handler)
    })
}

/// Like [`batch_handle`], but results are handled in completion order.
///
/// # Errors
///
/// See [`Dispatcher::batch_handle`].
pub fn batch_handle_unordered<T, U, E, B, R>(
    items: impl Into<Arc<[T]>>,
    batch_size: usize,
    batch_handler: B,
    result_handler: R,
    pool: Option<&ThreadPool>,
) -> Result<()>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    B: Fn(&[T]) -> core::result::Result<U, E> + Send + Sync + 'static,
    R: FnMut(U),
{
    with_pool(pool, |d| {
        d.batch_handle_unordered(items, batch_size, batch_handler, result_handler)
    })
}

/// Like [`batch_handle`], but `result_handler` receives `(batch, result)`.
///
/// # Errors
///
/// See [`Dispatcher::batch_handle`].
pub fn batch_handle_with_batch<T, U, E, B, R>(
    items: impl Into<Arc<[T]>>,
    batch_size: usize,
    batch_handler: B,
    result_handler: R,
    pool: Option<&ThreadPool>,
) -> Result<()>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    B: Fn(&[T]) -> core::result::Result<U, E> + Send + Sync + 'static,
    R: FnMut(&[T], U),
{
    with_pool(pool, |d| {
        d.batch_handle_with_batch(items, batch_size, batch_handler, result_handler)
    })
}

/// Like [`batch_handle_with_batch`], but results are handled in completion
/// order.
///
/// # Errors
///
/// See [`Dispatcher::batch_handle`].
pub fn batch_handle_with_batch_unordered<T, U, E, B, R>(
    items: impl Into<Arc<[T]>>,
    batch_size: usize,
    batch_handler: B,
    result_handler: R,
    pool: Option<&ThreadPool>,
) -> Result<()>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    B: Fn(&[T]) -> core::result::Result<U, E> + Send + Sync + 'static,
    R: FnMut(&[T], U),
{
    with_pool(pool, |d| {
        d.batch_handle_with_batch_unordered(items, batch_size, batch_handler, result_handler)
    })
}

/// Processes every item on the pool with `item_handler` and post-processes
/// the results with `result_handler` in item order.
///
/// # Errors
///
/// See [`Dispatcher::handle`].
pub fn handle<T, U, E, H, R>(
    items: impl Into<Arc<[T]>>,
    item_handler: H,
    result_handler: R,
    pool: Option<&ThreadPool>,
) -> Result<()>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
    R: FnMut(U),
{
    with_pool(pool, |d| d.handle(items, item_handler, result_handler))
}

/// Like [`handle`], but results are handled in completion order.
///
/// # Errors
///
/// See [`Dispatcher::handle`].
pub fn handle_unordered<T, U, E, H, R>(
    items: impl Into<Arc<[T]>>,
    item_handler: H,
    result_handler: R,
    pool: Option<&ThreadPool>,
) -> Result<()>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
    R: FnMut(U),
{
    with_pool(pool, |d| {
        d.handle_unordered(items, item_handler, result_handler)
    })
}

/// Like [`handle`], but `result_handler` receives `(item, result)`.
///
/// # Example
///
/// ```
/// use core::convert::Infallible;
///
/// let mut pairs = Vec::new();
/// devkit::handle_with_item(
///     vec![1, 2, 3],
///     |x: &i32| Ok::<_, Infallible>(x * x),
///     |x, square| pairs.push((*x, square)),
///     None,
/// )
/// .unwrap();
///
/// assert_eq!(pairs, vec![(1, 1), (2, 4), (3, 9)]);
/// ```
///
/// # Errors
///
/// See [`Dispatcher::handle`].
pub fn handle_with_item<T, U, E, H, R>(
    items: impl Into<Arc<[T]>>,
    item_handler: H,
    result_handler: R,
    pool: Option<&ThreadPool>,
) -> Result<()>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
    R: FnMut(&T, U),
{
    with_pool(pool, |d| {
        d.handle_with_item(items, item_handler, result_handler)
    })
}

/// Like [`handle_with_item`], but results are handled in completion order.
///
/// # Errors
///
/// See [`Dispatcher::handle`].
pub fn handle_with_item_unordered<T, U, E, H, R>(
    items: impl Into<Arc<[T]>>,
    item_handler: H,
    result_handler: R,
    pool: Option<&ThreadPool>,
) -> Result<()>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
    R: FnMut(&T, U),
{
    with_pool(pool, |d| {
        d.handle_with_item_unordered(items, item_handler, result_handler)
    })
}

/// Processes every item on the pool with `item_handler` and returns the
/// results in item order.
///
/// # Errors
///
/// See [`Dispatcher::handle`].
pub fn map<T, U, E, H>(
    items: impl Into<Arc<[T]>>,
    item_handler: H,
    pool: Option<&ThreadPool>,
) -> Result<Vec<U>>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    H: Fn(&T) -> core::result::Result<U, E> + Send + Sync + 'static,
{
    with_pool(pool, |d| d.map(items, item_handler))
}
