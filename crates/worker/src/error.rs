//! Error types for pool construction.

use thiserror::Error;

/// Errors that can occur when configuring or starting a [`crate::WorkerPool`].
#[derive(Debug, Error)]
pub enum PoolError {
	/// A thread count of zero was requested.
	#[error("a valid number of threads (unset or >= 1) must be specified")]
	InvalidThreadCount,

	/// The OS refused to spawn a worker thread.
	#[error("failed to spawn worker thread: {0}")]
	Spawn(#[from] std::io::Error),

	/// A TOML pool configuration could not be parsed.
	#[error("invalid pool configuration: {0}")]
	Config(#[from] toml::de::Error),
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
