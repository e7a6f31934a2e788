//! Process-wide logging facade.
//!
//! Logging is initialized exactly once with a root logger name. Afterwards
//! [`Logger`] handles can be derived from the root; they emit `tracing` events
//! tagged with their dotted name (`root.child.grandchild`).
//!
//! Initialization installs a `tracing-subscriber` registry with an
//! [`EnvFilter`] (default level `debug`, overridable through `RUST_LOG`) and
//! up to two fmt layers:
//!
//! - a console layer writing to stderr (on by default);
//! - a file layer appending to `<root_name>.log` (off by default).
//!
//! When neither layer is requested no subscriber is installed, so another
//! one set up by the application keeps receiving the events.

use crate::{Error, Result};
use core::fmt;
use parking_lot::Mutex;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static GLOBAL: Logging = Logging::new();

/// Level used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "debug";

/// Handlers installed by [`Logging::initialize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Log to stderr.
    pub console: bool,
    /// Log to `<root_name>.log`.
    pub file: bool,
    /// Directory of the log file; the working directory if `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            console: true,
            file: false,
            log_dir: None,
        }
    }
}

/// Holder of the root logger name.
///
/// Most code uses the process-wide instance through [`initialize`],
/// [`root_logger`] and [`get_logger`].
#[derive(Debug, Default)]
pub struct Logging {
    root: Mutex<Option<String>>,
}

impl Logging {
    pub const fn new() -> Self {
        Self {
            root: Mutex::new(None),
        }
    }

    /// Sets the root logger name and installs the requested handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - This instance was already initialized ([`Error::AlreadyInitialized`]).
    /// - `root_name` has two characters or fewer ([`Error::InvalidRootName`]).
    /// - The log file cannot be opened ([`Error::LogFile`]).
    /// - Another global subscriber is already installed ([`Error::Subscriber`]).
    pub fn initialize(&self, root_name: &str, options: LoggingOptions) -> Result<()> {
        let mut root = self.root.lock();
        if root.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        if root_name.chars().count() <= 2 {
            return Err(Error::InvalidRootName {
                name: root_name.to_owned(),
            });
        }

        if options.console || options.file {
            install_subscriber(root_name, &options)?;
        }

        *root = Some(root_name.to_owned());
        tracing::debug!(logger = root_name, "Logging initialized with {options:?}");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.root.lock().is_some()
    }

    /// Returns the root logger.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before [`Logging::initialize`].
    pub fn root_logger(&self) -> Result<Logger> {
        self.root
            .lock()
            .as_deref()
            .map(Logger::new)
            .ok_or(Error::NotInitialized)
    }

    /// Returns the logger `name` below the root logger.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before [`Logging::initialize`].
    pub fn get_logger(&self, name: &str) -> Result<Logger> {
        Ok(self.root_logger()?.child(name))
    }
}

fn install_subscriber(root_name: &str, options: &LoggingOptions) -> Result<()> {
    let console = options.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_thread_names(true)
            .with_timer(ChronoLocal::rfc_3339())
    });

    let file = if options.file {
        let path = options
            .log_dir
            .clone()
            .unwrap_or_default()
            .join(format!("{root_name}.log"));
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .map_err(Error::LogFile)?;

        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_timer(ChronoLocal::rfc_3339())
                .with_writer(std::sync::Mutex::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| Error::Subscriber {
            reason: e.to_string(),
        })
}

/// Named handle emitting `tracing` events.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Logger {
    name: String,
}

impl Logger {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the logger `name` below this one.
    pub fn child(&self, name: &str) -> Self {
        Self {
            name: format!("{}.{name}", self.name),
        }
    }

    pub fn debug(&self, message: impl fmt::Display) {
        tracing::debug!(logger = %self.name, "{message}");
    }

    pub fn info(&self, message: impl fmt::Display) {
        tracing::info!(logger = %self.name, "{message}");
    }

    pub fn warn(&self, message: impl fmt::Display) {
        tracing::warn!(logger = %self.name, "{message}");
    }

    pub fn error(&self, message: impl fmt::Display) {
        tracing::error!(logger = %self.name, "{message}");
    }
}

/// Returns the process-wide [`Logging`] instance.
pub fn global() -> &'static Logging {
    &GLOBAL
}

/// Initializes the process-wide logging. See [`Logging::initialize`].
///
/// # Errors
///
/// See [`Logging::initialize`].
pub fn initialize(root_name: &str, options: LoggingOptions) -> Result<()> {
    GLOBAL.initialize(root_name, options)
}

/// Returns the process-wide root logger.
///
/// # Errors
///
/// Returns [`Error::NotInitialized`] before [`initialize`].
pub fn root_logger() -> Result<Logger> {
    GLOBAL.root_logger()
}

/// Returns the process-wide logger `name` below the root logger.
///
/// # Errors
///
/// Returns [`Error::NotInitialized`] before [`initialize`].
pub fn get_logger(name: &str) -> Result<Logger> {
    GLOBAL.get_logger(name)
}

/// Logs `message` at DEBUG level on the root logger.
///
/// # Errors
///
/// Returns [`Error::NotInitialized`] before [`initialize`].
pub fn debug(message: impl fmt::Display) -> Result<()> {
    root_logger().map(|logger| logger.debug(message))
}

/// Logs `message` at INFO level on the root logger.
///
/// # Errors
///
/// Returns [`Error::NotInitialized`] before [`initialize`].
pub fn info(message: impl fmt::Display) -> Result<()> {
    root_logger().map(|logger| logger.info(message))
}

/// Logs `message` at WARN level on the root logger.
///
/// # Errors
///
/// Returns [`Error::NotInitialized`] before [`initialize`].
pub fn warn(message: impl fmt::Display) -> Result<()> {
    root_logger().map(|logger| logger.warn(message))
}

/// Logs `message` at ERROR level on the root logger.
///
/// # Errors
///
/// Returns [`Error::NotInitialized`] before [`initialize`].
pub fn error(message: impl fmt::Display) -> Result<()> {
    root_logger().map(|logger| logger.error(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent() -> LoggingOptions {
        LoggingOptions {
            console: false,
            file: false,
            log_dir: None,
        }
    }

    #[test]
    fn loggers_need_initialization() {
        let logging = Logging::new();
        assert!(matches!(logging.root_logger(), Err(Error::NotInitialized)));
        assert!(matches!(
            logging.get_logger("worker"),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn initializes_exactly_once() {
        let logging = Logging::new();
        logging.initialize("devkit", silent()).unwrap();
        assert!(logging.is_initialized());

        assert!(matches!(
            logging.initialize("devkit", silent()),
            Err(Error::AlreadyInitialized)
        ));
        assert!(matches!(
            logging.initialize("other", silent()),
            Err(Error::AlreadyInitialized)
        ));
    }

    #[test]
    fn rejects_short_root_names() {
        let logging = Logging::new();
        for name in ["", "a", "ab"] {
            assert!(matches!(
                logging.initialize(name, silent()),
                Err(Error::InvalidRootName { .. })
            ));
        }
        assert!(!logging.is_initialized());
        logging.initialize("abc", silent()).unwrap();
    }

    #[test]
    fn derives_child_names() {
        let logging = Logging::new();
        logging.initialize("app", silent()).unwrap();

        let root = logging.root_logger().unwrap();
        assert_eq!(root.name(), "app");

        let db = logging.get_logger("db").unwrap();
        assert_eq!(db.name(), "app.db");
        assert_eq!(db.child("pool").name(), "app.db.pool");

        // No subscriber installed: events are discarded.
        db.info("connected");
        db.error(format_args!("lost {} connections", 2));
    }

    #[test]
    fn default_options_log_to_console_only() {
        let options = LoggingOptions::default();
        assert!(options.console);
        assert!(!options.file);
        assert!(options.log_dir.is_none());
    }
}
