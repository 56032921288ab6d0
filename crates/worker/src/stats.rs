use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
	/// Tasks accepted into the queue.
	pub submitted: u64,
	/// Tasks whose `run` returned normally.
	pub completed: u64,
	/// Tasks whose `run` panicked.
	pub panicked: u64,
	/// Tasks cancelled instead of run.
	pub cancelled: u64,
}

/// Live counters shared between the pool handle and its workers.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
	submitted: AtomicU64,
	completed: AtomicU64,
	panicked: AtomicU64,
	cancelled: AtomicU64,
}

impl PoolCounters {
	pub(crate) fn submitted(&self) {
		self.submitted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn completed(&self) {
		self.completed.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn panicked(&self) {
		self.panicked.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn cancelled(&self) {
		self.cancelled.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn snapshot(&self) -> PoolStats {
		PoolStats {
			submitted: self.submitted.load(Ordering::Relaxed),
			completed: self.completed.load(Ordering::Relaxed),
			panicked: self.panicked.load(Ordering::Relaxed),
			cancelled: self.cancelled.load(Ordering::Relaxed),
		}
	}
}
