//! Batch and per-item dispatch over a fixed pool of worker threads, plus
//! execution timing helpers and a process-wide logging facade.
//!
//! ```
//! use core::convert::Infallible;
//! use devkit::{Dispatcher, ThreadPool};
//!
//! let pool = ThreadPool::new(4).unwrap();
//! let mut lines = Vec::new();
//!
//! Dispatcher::new(&pool)
//!     .handle_with_item(
//!         vec![1, 2, 3],
//!         |x: &i32| Ok::<_, Infallible>(x * x),
//!         |x, square| lines.push(format!("{x} {square}")),
//!     )
//!     .unwrap();
//!
//! assert_eq!(lines, ["1 1", "2 4", "3 9"]);
//! ```

mod batch;
mod dispatch;
mod error;
#[cfg(feature = "logging")]
pub mod logging;
mod pool;
pub mod timing;

pub use crate::batch::*;
pub use crate::dispatch::*;
pub use crate::error::*;
pub use crate::pool::*;
