#![doc = include_str!("../README.md")]

mod commands;
mod config;

use clap::Parser;
use config::{CliArgs, RunConfig};
use devkit::logging;

// Using mimalloc for cheaper allocations when many workers format results
// at once.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    logging::initialize(&config.log_name, config.logging.clone())?;
    let logger = logging::get_logger("cli")?;
    logger.info(format_args!(
        "Running {:?} on {} workers ({} repeats)",
        config.task, config.workers, config.repeats
    ));

    let stdout = std::io::stdout();
    let result = commands::run(&config, &mut stdout.lock());
    if let Err(e) = &result {
        logger.error(e);
    }
    result
}
