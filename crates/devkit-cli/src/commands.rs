use crate::config::{RunConfig, Task};
use core::convert::Infallible;
use devkit::timing::repeated_timed_method;
use devkit::{Delivery, Dispatcher, ThreadPool};
use std::io::Write;

/// Runs the configured task on a fresh pool and writes its output lines and
/// timing statistics to `out`.
pub fn run(config: &RunConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let pool = ThreadPool::with_name(config.workers, "devkit-cli")?;
    let dispatcher = Dispatcher::new(&pool);

    let mut stats = None;
    let mut timed = repeated_timed_method(
        |()| execute(&dispatcher, &config.task),
        config.repeats,
        Some(label(&config.task)),
        |report: &str| stats = Some(report.to_owned()),
    )?;
    let lines = timed(())?;
    drop(timed);

    for line in lines {
        writeln!(out, "{line}")?;
    }
    if let Some(stats) = stats {
        writeln!(out, "{stats}")?;
    }

    pool.shutdown();
    Ok(())
}

fn label(task: &Task) -> &'static str {
    match task {
        Task::Batch { .. } => "batch",
        Task::Square { .. } => "square",
    }
}

fn sum(batch: &[u64]) -> Result<u64, Infallible> {
    Ok(batch.iter().sum())
}

fn square(x: &u64) -> Result<u64, Infallible> {
    Ok(x * x)
}

fn execute(dispatcher: &Dispatcher<'_>, task: &Task) -> devkit::Result<Vec<String>> {
    let mut lines = Vec::new();

    match *task {
        Task::Batch {
            items,
            batch_size,
            delivery,
        } => {
            let items: Vec<u64> = (0..items).collect();
            let print = |batch: &[u64], total: u64| {
                if let (Some(first), Some(last)) = (batch.first(), batch.last()) {
                    lines.push(format!("{first}-{last}: {total}"));
                }
            };
            match delivery {
                Delivery::Ordered => {
                    dispatcher.batch_handle_with_batch(items, batch_size, sum, print)?
                }
                Delivery::Unordered => {
                    dispatcher.batch_handle_with_batch_unordered(items, batch_size, sum, print)?
                }
            }
        }
        Task::Square { items, delivery } => {
            let items: Vec<u64> = (0..items).collect();
            let print = |item: &u64, result: u64| lines.push(format!("{item} {result}"));
            match delivery {
                Delivery::Ordered => dispatcher.handle_with_item(items, square, print)?,
                Delivery::Unordered => dispatcher.handle_with_item_unordered(items, square, print)?,
            }
        }
    }

    Ok(lines)
}
