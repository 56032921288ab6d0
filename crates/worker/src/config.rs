//! Pool sizing and thread naming.

use serde::Deserialize;

use crate::{PoolError, Result};

/// Configuration for a [`crate::WorkerPool`].
///
/// ```toml
/// threads = 4
/// thread_name = "graph-worker"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
	/// Number of worker threads. `None` uses the available parallelism.
	pub threads: Option<usize>,
	/// Prefix for worker thread names; threads are named `<prefix>-<index>`.
	pub thread_name: String,
}

fn default_thread_name() -> String {
	"strata-worker".to_string()
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			threads: None,
			thread_name: default_thread_name(),
		}
	}
}

impl PoolConfig {
	/// Parses a configuration from a TOML fragment.
	pub fn from_toml_str(src: &str) -> Result<Self> {
		Ok(toml::from_str(src)?)
	}

	/// Sets an explicit thread count.
	#[must_use]
	pub fn with_threads(mut self, threads: usize) -> Self {
		self.threads = Some(threads);
		self
	}

	/// Sets the worker thread name prefix.
	#[must_use]
	pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
		self.thread_name = name.into();
		self
	}

	/// Returns the effective thread count.
	///
	/// # Errors
	///
	/// Returns [`PoolError::InvalidThreadCount`] for an explicit count of zero.
	pub fn resolved_threads(&self) -> Result<usize> {
		match self.threads {
			Some(0) => Err(PoolError::InvalidThreadCount),
			Some(n) => Ok(n),
			None => Ok(std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)),
		}
	}
}
