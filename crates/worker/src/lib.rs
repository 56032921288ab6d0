//! Worker pool and task primitives for graph construction.
//!
//! This crate knows nothing about addresses or nodes. It provides:
//! * [`Task`]: a unit of work that is either run or cancelled, exactly once
//! * [`WorkerPool`]: fixed-size OS thread pool draining one shared FIFO queue
//! * [`PoolConfig`]: serde-backed pool sizing and thread naming
//! * [`TaskClass`]: classification used for logging and counters

#![warn(missing_docs)]

mod class;
mod config;
mod error;
mod panic;
mod pool;
mod spawn;
mod stats;

pub use class::TaskClass;
pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use panic::panic_message;
pub use pool::WorkerPool;
pub use stats::PoolStats;

/// A unit of work accepted by a [`WorkerPool`].
///
/// Exactly one of [`Task::run`] or [`Task::cancel`] is invoked per task.
pub trait Task: Send + 'static {
	/// Executes the work on a worker thread.
	fn run(self: Box<Self>);

	/// Abandons the work without running it.
	///
	/// Called for tasks still queued when the pool shuts down, and for tasks
	/// submitted after shutdown.
	fn cancel(self: Box<Self>);

	/// Classification used for logging and counters.
	fn class(&self) -> TaskClass {
		TaskClass::Build
	}
}
