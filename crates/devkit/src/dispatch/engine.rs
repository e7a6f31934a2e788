use crate::{BoxError, Error, Result, ThreadPool};
use core::any::Any;
use core::ops::Range;
use crossbeam_channel::Sender;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Maximum number of submitted but not yet delivered units per worker.
///
/// This bounds both the pool queue and the re-sequencing buffer of ordered
/// deliveries to `workers * IN_FLIGHT_PER_WORKER` entries.
pub const IN_FLIGHT_PER_WORKER: usize = 2;

/// Order in which results reach the result handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// Results are handled in submission order.
    Ordered,
    /// Results are handled as soon as their unit completes.
    Unordered,
}

type Completion<U> = (usize, Result<U>);

/// Reports the outcome of one unit back to the dispatching thread.
///
/// If the job is dropped without reporting (for example because the pool
/// refused it), the dispatcher still hears about it.
struct Reporter<U> {
    tx: Option<Sender<Completion<U>>>,
    unit: usize,
}

impl<U> Reporter<U> {
    fn report(mut self, outcome: Result<U>) {
        if let Some(tx) = self.tx.take() {
            // The dispatcher stops listening after the first failure.
            let _ = tx.send((self.unit, outcome));
        }
    }
}

impl<U> Drop for Reporter<U> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.try_send((self.unit, Err(Error::PoolShutdown)));
        }
    }
}

/// Runs `work` once per unit on `pool` and feeds the results to `sink` on the
/// calling thread.
///
/// Units are index ranges into `items`. At most
/// `pool.workers() * IN_FLIGHT_PER_WORKER` units are in flight at a time; for
/// [`Delivery::Ordered`] finished results wait in a buffer of the same bound
/// until every earlier unit has been handed to `sink`.
///
/// The first failure stops further submissions. Ordered runs still deliver
/// all units before the failed one, then return its error; unordered runs
/// return the error as soon as it arrives.
pub(crate) fn run<T, U, E, W, S>(
    pool: &ThreadPool,
    items: Arc<[T]>,
    units: Vec<Range<usize>>,
    delivery: Delivery,
    work: W,
    mut sink: S,
) -> Result<()>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    W: Fn(&[T], Range<usize>) -> core::result::Result<U, E> + Send + Sync + 'static,
    S: FnMut(&[T], Range<usize>, U),
{
    let total = units.len();
    if total == 0 {
        return Ok(());
    }

    let window = pool.workers().saturating_mul(IN_FLIGHT_PER_WORKER).max(1);
    let work = Arc::new(work);
    let (tx, rx) = crossbeam_channel::bounded::<Completion<U>>(window);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "Dispatching {total} units ({delivery:?}) on pool {} with window {window}",
        pool.name()
    );

    let mut buffered: BTreeMap<usize, Result<U>> = BTreeMap::new();
    let mut next_submit = 0;
    let mut next_deliver = 0;
    let mut delivered = 0;
    let mut in_flight = 0;
    let mut failed = false;

    while delivered < total {
        while !failed && next_submit < total && in_flight + buffered.len() < window {
            let reporter = Reporter {
                tx: Some(tx.clone()),
                unit: next_submit,
            };
            submit(
                pool,
                Arc::clone(&items),
                Arc::clone(&work),
                next_submit,
                units[next_submit].clone(),
                reporter,
            )?;
            next_submit += 1;
            in_flight += 1;
        }

        let (unit, outcome) = rx.recv().map_err(|_| Error::PoolShutdown)?;
        in_flight -= 1;

        match delivery {
            Delivery::Unordered => {
                let value = outcome.inspect_err(|_e| {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Unit {unit} failed: {_e}");
                })?;
                sink(&items[..], units[unit].clone(), value);
                delivered += 1;
            }
            Delivery::Ordered => {
                if outcome.is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "Unit {unit} failed, draining {} earlier units",
                        unit - next_deliver
                    );
                    failed = true;
                }
                buffered.insert(unit, outcome);

                while let Some(outcome) = buffered.remove(&next_deliver) {
                    let value = outcome?;
                    sink(&items[..], units[next_deliver].clone(), value);
                    next_deliver += 1;
                    delivered += 1;
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Delivered {delivered} units");

    Ok(())
}

fn submit<T, U, E, W>(
    pool: &ThreadPool,
    items: Arc<[T]>,
    work: Arc<W>,
    unit: usize,
    range: Range<usize>,
    reporter: Reporter<U>,
) -> Result<()>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    E: Into<BoxError> + 'static,
    W: Fn(&[T], Range<usize>) -> core::result::Result<U, E> + Send + Sync + 'static,
{
    pool.execute(move || {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| (*work)(&items[..], range))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::Handler {
                unit,
                source: e.into(),
            }),
            Err(payload) => Err(Error::HandlerPanicked {
                unit,
                message: panic_message(payload.as_ref()),
            }),
        };
        reporter.report(outcome);
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
