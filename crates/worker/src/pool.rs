//! Fixed-size worker pool draining one shared FIFO queue.
//!
//! Workers block on a multi-consumer channel, so an idle pool costs no CPU
//! and a non-empty queue always wakes a worker. Panics in [`Task::run`] are
//! caught at the worker boundary; the worker survives and keeps draining.
//!
//! # Shutdown
//!
//! [`WorkerPool::shutdown`] marks the pool closed, drops the submission side
//! of the queue and cancels every task still queued. Tasks already running
//! are not interrupted. Tasks submitted afterwards are cancelled on the
//! submitting thread.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::panic::panic_message;
use crate::spawn::{spawn_named_thread, trace_dispatch};
use crate::stats::PoolCounters;
use crate::{PoolConfig, PoolStats, Result, Task};

#[cfg(test)]
mod tests;

type BoxedTask = Box<dyn Task>;

/// State shared between the pool handle and its worker threads.
#[derive(Debug, Default)]
struct Shared {
	quit: AtomicBool,
	counters: PoolCounters,
}

struct PoolInner {
	/// Submission side; `None` once shut down.
	sender: Mutex<Option<Sender<BoxedTask>>>,
	/// Kept for draining queued tasks at shutdown.
	receiver: Receiver<BoxedTask>,
	shared: Arc<Shared>,
	threads: Mutex<Vec<JoinHandle<()>>>,
	size: usize,
}

/// Cloneable handle to a fixed-size pool of worker threads.
///
/// Dropping the last handle shuts the pool down.
#[derive(Clone)]
pub struct WorkerPool {
	inner: Arc<PoolInner>,
}

impl std::fmt::Debug for WorkerPool {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkerPool")
			.field("size", &self.inner.size)
			.field("closed", &self.is_closed())
			.field("stats", &self.stats())
			.finish()
	}
}

impl WorkerPool {
	/// Starts a pool sized and named by `config`.
	///
	/// # Errors
	///
	/// Fails on an explicit thread count of zero, or when a worker thread
	/// cannot be spawned (already spawned workers are released).
	pub fn new(config: &PoolConfig) -> Result<Self> {
		let size = config.resolved_threads()?;
		let (sender, receiver) = crossbeam_channel::unbounded::<BoxedTask>();
		let shared = Arc::new(Shared::default());

		let mut threads = Vec::with_capacity(size);
		for index in 0..size {
			let rx = receiver.clone();
			let shared = Arc::clone(&shared);
			let name = format!("{}-{index}", config.thread_name);
			match spawn_named_thread(name, index, move || worker_loop(index, &rx, &shared)) {
				Ok(handle) => threads.push(handle),
				Err(err) => {
					// Disconnects the queue so already spawned workers exit.
					drop(sender);
					return Err(err.into());
				}
			}
		}

		tracing::debug!(threads = size, prefix = %config.thread_name, "worker.pool.start");
		Ok(Self {
			inner: Arc::new(PoolInner {
				sender: Mutex::new(Some(sender)),
				receiver,
				shared,
				threads: Mutex::new(threads),
				size,
			}),
		})
	}

	/// Starts a pool with an explicit thread count and default naming.
	pub fn with_threads(threads: usize) -> Result<Self> {
		Self::new(&PoolConfig::default().with_threads(threads))
	}

	/// Number of worker threads.
	pub fn size(&self) -> usize {
		self.inner.size
	}

	/// Returns true once [`Self::shutdown`] has been called.
	pub fn is_closed(&self) -> bool {
		self.inner.shared.quit.load(Ordering::Acquire)
	}

	/// Queues a task for execution on some worker.
	pub fn submit<T: Task>(&self, task: T) {
		self.submit_boxed(Box::new(task));
	}

	/// Queues an already boxed task.
	pub fn submit_boxed(&self, task: BoxedTask) {
		let sender = self.inner.sender.lock().clone();
		let Some(sender) = sender else {
			cancel_task(&self.inner.shared, task);
			return;
		};
		match sender.send(task) {
			Ok(()) => self.inner.shared.counters.submitted(),
			Err(crossbeam_channel::SendError(task)) => cancel_task(&self.inner.shared, task),
		}
	}

	/// Closes the pool and cancels every queued task.
	///
	/// Returns the number of tasks cancelled by this call. Idempotent.
	pub fn shutdown(&self) -> usize {
		self.inner.shutdown()
	}

	/// Waits for worker threads to exit after [`Self::shutdown`].
	///
	/// A worker calling this skips joining itself.
	pub fn join(&self) {
		let current = std::thread::current().id();
		let handles = std::mem::take(&mut *self.inner.threads.lock());
		for handle in handles {
			if handle.thread().id() == current {
				continue;
			}
			if handle.join().is_err() {
				tracing::warn!("worker.pool.join_failed");
			}
		}
	}

	/// Returns a snapshot of pool counters.
	pub fn stats(&self) -> PoolStats {
		self.inner.shared.counters.snapshot()
	}
}

impl PoolInner {
	fn shutdown(&self) -> usize {
		self.shared.quit.store(true, Ordering::Release);
		let sender = self.sender.lock().take();
		if sender.is_none() {
			return 0;
		}
		drop(sender);

		let mut cancelled = 0;
		for task in self.receiver.try_iter() {
			cancel_task(&self.shared, task);
			cancelled += 1;
		}
		tracing::debug!(cancelled, "worker.pool.shutdown");
		cancelled
	}
}

impl Drop for PoolInner {
	fn drop(&mut self) {
		self.shutdown();
	}
}

fn worker_loop(index: usize, rx: &Receiver<BoxedTask>, shared: &Shared) {
	while let Ok(task) = rx.recv() {
		if shared.quit.load(Ordering::Acquire) {
			cancel_task(shared, task);
			continue;
		}

		let class = task.class();
		trace_dispatch(index, class);
		match std::panic::catch_unwind(AssertUnwindSafe(move || task.run())) {
			Ok(()) => shared.counters.completed(),
			Err(payload) => {
				shared.counters.panicked();
				tracing::error!(
					worker = index,
					worker_class = class.as_str(),
					panic = %panic_message(&*payload),
					"worker.task.panicked"
				);
			}
		}
	}
	tracing::trace!(worker = index, "worker.exit");
}

fn cancel_task(shared: &Shared, task: BoxedTask) {
	shared.counters.cancelled();
	let class = task.class();
	if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(move || task.cancel())) {
		tracing::error!(
			worker_class = class.as_str(),
			panic = %panic_message(&*payload),
			"worker.task.cancel_panicked"
		);
	}
}
