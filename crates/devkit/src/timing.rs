//! Execution timing helpers.
//!
//! - [`timed_context`]: scope guard reporting the time until it is dropped.
//! - [`timed_method`]: wraps a callable so every call is timed.
//! - [`repeated_timed_method`]: wraps a callable so every call runs it several
//!   times and reports [`ExecutionStats`].
//! - [`fuzz`]: sleeps for a random duration, to shake out ordering
//!   assumptions in tests.
//!
//! Elapsed times are handed to caller-supplied handlers. [`print_elapsed`]
//! is the conventional handler and prints `Completed in {secs} seconds`.

use crate::{Error, Result};
use core::fmt;
use core::time::Duration;
use rand::Rng;
use std::time::Instant;

/// Lower bound of the conventional [`fuzz`] range.
pub const FUZZ_MIN_DELAY: Duration = Duration::from_millis(100);

/// Upper bound of the conventional [`fuzz`] range.
pub const FUZZ_MAX_DELAY: Duration = Duration::from_millis(1100);

/// Scope guard returned by [`timed_context`].
#[must_use = "the elapsed time is reported when the guard is dropped"]
pub struct TimedContext<H>
where
    H: FnOnce(Duration),
{
    start: Instant,
    handler: Option<H>,
}

impl<H> TimedContext<H>
where
    H: FnOnce(Duration),
{
    /// Time elapsed since the guard was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<H> Drop for TimedContext<H>
where
    H: FnOnce(Duration),
{
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler(self.start.elapsed());
        }
    }
}

/// Starts timing the enclosing scope. `handler` receives the elapsed time
/// when the returned guard is dropped.
///
/// ```
/// use devkit::timing::{format_elapsed, timed_context};
///
/// let mut report = String::new();
/// {
///     let _timer = timed_context(|elapsed| report = format_elapsed(elapsed));
///     std::thread::sleep(std::time::Duration::from_millis(1));
/// }
/// assert!(report.starts_with("Completed in "));
/// ```
pub fn timed_context<H>(handler: H) -> TimedContext<H>
where
    H: FnOnce(Duration),
{
    TimedContext {
        start: Instant::now(),
        handler: Some(handler),
    }
}

/// Wraps `method` so that each call is timed and the elapsed time passed to
/// `handler`. Multiple arguments are passed as a tuple.
pub fn timed_method<A, O, M, H>(mut method: M, mut handler: H) -> impl FnMut(A) -> O
where
    M: FnMut(A) -> O,
    H: FnMut(Duration),
{
    move |args| {
        let _timer = timed_context(|elapsed| handler(elapsed));
        method(args)
    }
}

/// Formats `elapsed` as `Completed in {secs} seconds`, rounded to four
/// decimals.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("Completed in {:.4} seconds", elapsed.as_secs_f64())
}

/// Prints [`format_elapsed`] to stdout.
pub fn print_elapsed(elapsed: Duration) {
    println!("{}", format_elapsed(elapsed));
}

/// Summary of repeated executions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionStats {
    pub identifier: Option<String>,
    pub runs: usize,
    pub shortest: Duration,
    pub average: Duration,
    pub longest: Duration,
    pub total: Duration,
}

impl ExecutionStats {
    /// Aggregates `samples`, or returns `None` if there are none.
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        let shortest = samples.iter().min().copied()?;
        let longest = samples.iter().max().copied()?;
        let total: Duration = samples.iter().sum();
        let runs = samples.len();
        let average = total / u32::try_from(runs).unwrap_or(u32::MAX);

        Some(Self {
            identifier: None,
            runs,
            shortest,
            average,
            longest,
            total,
        })
    }

    /// Labels the report with `identifier`.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

impl fmt::Display for ExecutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = match &self.identifier {
            Some(identifier) => {
                writeln!(f, "Execution statistics of {identifier}:")?;
                "  - "
            }
            None => "",
        };
        let secs = |d: Duration| d.as_secs_f64();

        writeln!(
            f,
            "{indent}Shortest execution time: {:.4} seconds.",
            secs(self.shortest)
        )?;
        writeln!(
            f,
            "{indent}Average execution time: {:.4} seconds.",
            secs(self.average)
        )?;
        writeln!(
            f,
            "{indent}Longest execution time: {:.4} seconds.",
            secs(self.longest)
        )?;
        write!(
            f,
            "{indent}Total execution time: {:.4} seconds.",
            secs(self.total)
        )
    }
}

/// Wraps `method` so that each call runs it `repeats` times, reports the
/// rendered [`ExecutionStats`] through `printer` and returns the result of
/// the last run.
///
/// ```
/// use devkit::timing::repeated_timed_method;
///
/// let mut report = String::new();
/// let mut calls = 0;
/// let mut square = repeated_timed_method(
///     |x: u64| {
///         calls += 1;
///         x * x
///     },
///     3,
///     Some("square"),
///     |stats: &str| report = stats.to_owned(),
/// )
/// .unwrap();
///
/// assert_eq!(square(7), 49);
/// drop(square);
/// assert_eq!(calls, 3);
/// assert!(report.starts_with("Execution statistics of square:"));
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidRepeats`] if `repeats` is zero.
pub fn repeated_timed_method<A, O, M, P>(
    mut method: M,
    repeats: usize,
    identifier: Option<&str>,
    mut printer: P,
) -> Result<impl FnMut(A) -> O + use<A, O, M, P>>
where
    A: Clone,
    M: FnMut(A) -> O,
    P: FnMut(&str),
{
    if repeats == 0 {
        return Err(Error::InvalidRepeats);
    }
    let identifier = identifier.map(str::to_owned);

    Ok(move |args: A| {
        let mut samples = Vec::with_capacity(repeats);
        for _ in 1..repeats {
            let start = Instant::now();
            method(args.clone());
            samples.push(start.elapsed());
        }

        let start = Instant::now();
        let result = method(args);
        samples.push(start.elapsed());

        if let Some(stats) = ExecutionStats::from_samples(&samples) {
            let stats = match &identifier {
                Some(identifier) => stats.with_identifier(identifier.as_str()),
                None => stats,
            };
            printer(&stats.to_string());
        }
        result
    })
}

/// Sleeps for a random duration in `[min, max]` and returns it.
///
/// # Errors
///
/// Returns [`Error::InvalidDelay`] if `min > max`.
pub fn fuzz(min: Duration, max: Duration) -> Result<Duration> {
    if min > max {
        return Err(Error::InvalidDelay { min, max });
    }

    let delay = rand::rng().random_range(min..=max);
    #[cfg(feature = "tracing")]
    tracing::trace!("Fuzzing for {delay:?}");
    std::thread::sleep(delay);
    Ok(delay)
}
