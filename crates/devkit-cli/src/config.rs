use anyhow::bail;
use clap::{Parser, Subcommand};
use devkit::logging::LoggingOptions;
use devkit::{DEFAULT_WORKERS, Delivery};

/// Command line arguments of the `devkit` binary.
///
/// Global settings can also be given through environment variables (or a
/// `.env` file in the working directory).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "devkit",
    version,
    about = "Runs batch and per-item dispatch demos on a worker pool and reports timings"
)]
pub struct CliArgs {
    /// Number of worker threads in the pool.
    ///
    /// Environment variable: `DEVKIT_WORKERS`
    #[arg(long, global = true, env = "DEVKIT_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Root logger name. Must be longer than two characters.
    ///
    /// Environment variable: `DEVKIT_LOG_NAME`
    #[arg(long, global = true, env = "DEVKIT_LOG_NAME", default_value_t = String::from("devkit"))]
    pub log_name: String,

    /// Also write logs to `<log-name>.log`.
    ///
    /// Environment variable: `DEVKIT_LOG_FILE`
    #[arg(long, global = true, env = "DEVKIT_LOG_FILE", default_value_t = false)]
    pub log_file: bool,

    /// Do not log to the console.
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sums the integers `0..items` in batches and prints one line per batch.
    Batch {
        /// Number of integers to process.
        #[arg(long, default_value_t = 1000)]
        items: u64,

        /// Number of integers per batch.
        #[arg(long, default_value_t = 100)]
        batch_size: usize,

        /// Print batches as they complete instead of in input order.
        #[arg(long, default_value_t = false)]
        unordered: bool,

        /// Number of timed runs.
        #[arg(long, default_value_t = 1)]
        repeats: usize,
    },
    /// Squares the integers `0..items` one by one and prints `item result`
    /// lines.
    Square {
        /// Number of integers to process.
        #[arg(long, default_value_t = 10)]
        items: u64,

        /// Print results as they complete instead of in input order.
        #[arg(long, default_value_t = false)]
        unordered: bool,

        /// Number of timed runs.
        #[arg(long, default_value_t = 1)]
        repeats: usize,
    },
}

/// Work selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Batch {
        items: u64,
        batch_size: usize,
        delivery: Delivery,
    },
    Square {
        items: u64,
        delivery: Delivery,
    },
}

/// Validated settings of one `devkit` run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub workers: usize,
    pub log_name: String,
    pub logging: LoggingOptions,
    pub repeats: usize,
    pub task: Task,
}

fn delivery(unordered: bool) -> Delivery {
    if unordered {
        Delivery::Unordered
    } else {
        Delivery::Ordered
    }
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.workers == 0 {
            bail!("DEVKIT_WORKERS must be greater than 0");
        }

        if args.log_name.chars().count() <= 2 {
            bail!(
                "DEVKIT_LOG_NAME ({:?}) must be longer than 2 characters",
                args.log_name
            );
        }

        let (task, repeats) = match args.command {
            Command::Batch {
                items,
                batch_size,
                unordered,
                repeats,
            } => {
                if batch_size == 0 {
                    bail!("--batch-size must be greater than 0");
                }
                let task = Task::Batch {
                    items,
                    batch_size,
                    delivery: delivery(unordered),
                };
                (task, repeats)
            }
            Command::Square {
                items,
                unordered,
                repeats,
            } => {
                let task = Task::Square {
                    items,
                    delivery: delivery(unordered),
                };
                (task, repeats)
            }
        };

        if repeats == 0 {
            bail!("--repeats must be greater than 0");
        }

        Ok(Self {
            workers: args.workers,
            logging: LoggingOptions {
                console: !args.quiet,
                file: args.log_file,
                log_dir: None,
            },
            log_name: args.log_name,
            repeats,
            task,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<RunConfig> {
        let args = CliArgs::try_parse_from(std::iter::once("devkit").chain(args.iter().copied()))?;
        RunConfig::try_from(args)
    }

    #[test]
    fn parses_batch_command() {
        let config = parse(&[
            "--workers",
            "3",
            "batch",
            "--items",
            "70",
            "--batch-size",
            "7",
            "--unordered",
        ])
        .unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.repeats, 1);
        assert_eq!(
            config.task,
            Task::Batch {
                items: 70,
                batch_size: 7,
                delivery: Delivery::Unordered,
            }
        );
        assert!(config.logging.console);
        assert!(!config.logging.file);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let config = parse(&["square", "--items", "3", "--quiet", "--log-name", "demo"]).unwrap();

        assert_eq!(config.log_name, "demo");
        assert!(!config.logging.console);
        assert_eq!(
            config.task,
            Task::Square {
                items: 3,
                delivery: Delivery::Ordered,
            }
        );
    }

    #[test]
    fn rejects_invalid_settings() {
        assert!(parse(&["--workers", "0", "square"]).is_err());
        assert!(parse(&["--log-name", "ab", "square"]).is_err());
        assert!(parse(&["batch", "--batch-size", "0"]).is_err());
        assert!(parse(&["square", "--repeats", "0"]).is_err());
        assert!(parse(&["batch", "--items", "-1"]).is_err());
    }
}
