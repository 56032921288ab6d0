use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::bounded;
use pretty_assertions::assert_eq;

use super::*;
use crate::{PoolError, TaskClass};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Closure-backed task for exercising the pool.
struct FnTask {
	run: Box<dyn FnOnce() + Send>,
	cancel: Box<dyn FnOnce() + Send>,
}

impl FnTask {
	fn new(run: impl FnOnce() + Send + 'static) -> Self {
		Self {
			run: Box::new(run),
			cancel: Box::new(|| {}),
		}
	}

	fn on_cancel(mut self, cancel: impl FnOnce() + Send + 'static) -> Self {
		self.cancel = Box::new(cancel);
		self
	}
}

impl Task for FnTask {
	fn run(self: Box<Self>) {
		(self.run)();
	}

	fn cancel(self: Box<Self>) {
		(self.cancel)();
	}

	fn class(&self) -> TaskClass {
		TaskClass::Discovery
	}
}

#[test]
fn runs_every_submitted_task() {
	let pool = WorkerPool::with_threads(4).unwrap();
	let (tx, rx) = bounded(64);
	for i in 0..64 {
		let tx = tx.clone();
		pool.submit(FnTask::new(move || tx.send(i).unwrap()));
	}

	let mut seen: Vec<i32> = (0..64).map(|_| rx.recv_timeout(TIMEOUT).unwrap()).collect();
	seen.sort_unstable();
	assert_eq!(seen, (0..64).collect::<Vec<_>>());
	assert_eq!(pool.size(), 4);
}

#[test]
fn single_worker_preserves_fifo_order() {
	let pool = WorkerPool::with_threads(1).unwrap();
	let (tx, rx) = bounded(8);
	for i in 0..8 {
		let tx = tx.clone();
		pool.submit(FnTask::new(move || tx.send(i).unwrap()));
	}
	let seen: Vec<i32> = (0..8).map(|_| rx.recv_timeout(TIMEOUT).unwrap()).collect();
	assert_eq!(seen, (0..8).collect::<Vec<_>>());
}

#[test]
fn worker_survives_panicking_task() {
	let pool = WorkerPool::with_threads(1).unwrap();
	let (tx, rx) = bounded(1);
	pool.submit(FnTask::new(|| panic!("task blew up")));
	pool.submit(FnTask::new(move || tx.send(()).unwrap()));

	rx.recv_timeout(TIMEOUT).expect("second task should still run");
	let stats = pool.stats();
	assert_eq!(stats.panicked, 1);
	assert_eq!(stats.submitted, 2);
}

#[test]
fn shutdown_cancels_queued_but_not_running_tasks() {
	let pool = WorkerPool::with_threads(1).unwrap();
	let (started_tx, started_rx) = bounded(1);
	let (gate_tx, gate_rx) = bounded::<()>(1);
	let (done_tx, done_rx) = bounded(1);

	pool.submit(FnTask::new(move || {
		started_tx.send(()).unwrap();
		gate_rx.recv().unwrap();
		done_tx.send(()).unwrap();
	}));
	started_rx.recv_timeout(TIMEOUT).unwrap();

	let cancelled = Arc::new(AtomicUsize::new(0));
	let ran = Arc::new(AtomicUsize::new(0));
	for _ in 0..3 {
		let cancelled = Arc::clone(&cancelled);
		let ran = Arc::clone(&ran);
		pool.submit(
			FnTask::new(move || {
				ran.fetch_add(1, Ordering::SeqCst);
			})
			.on_cancel(move || {
				cancelled.fetch_add(1, Ordering::SeqCst);
			}),
		);
	}

	assert_eq!(pool.shutdown(), 3);
	assert_eq!(pool.shutdown(), 0, "shutdown is idempotent");
	gate_tx.send(()).unwrap();
	done_rx.recv_timeout(TIMEOUT).expect("running task completes");
	pool.join();

	assert_eq!(cancelled.load(Ordering::SeqCst), 3);
	assert_eq!(ran.load(Ordering::SeqCst), 0);
	assert_eq!(pool.stats().completed, 1);
}

#[test]
fn submit_after_shutdown_cancels_immediately() {
	let pool = WorkerPool::with_threads(2).unwrap();
	pool.shutdown();
	assert!(pool.is_closed());

	let cancelled = Arc::new(AtomicUsize::new(0));
	let c = Arc::clone(&cancelled);
	pool.submit(FnTask::new(|| unreachable!("must not run")).on_cancel(move || {
		c.fetch_add(1, Ordering::SeqCst);
	}));
	assert_eq!(cancelled.load(Ordering::SeqCst), 1);
	assert_eq!(pool.stats().cancelled, 1);
}

#[test]
fn workers_use_configured_thread_names() {
	let pool = WorkerPool::new(&PoolConfig::default().with_threads(1).with_thread_name("graph-test")).unwrap();
	let (tx, rx) = bounded(1);
	pool.submit(FnTask::new(move || {
		let name = std::thread::current().name().map(str::to_owned);
		tx.send(name).unwrap();
	}));
	assert_eq!(rx.recv_timeout(TIMEOUT).unwrap().as_deref(), Some("graph-test-0"));
}

#[test]
fn zero_threads_is_rejected() {
	assert!(matches!(WorkerPool::with_threads(0), Err(PoolError::InvalidThreadCount)));
}
