//! One-shot broadcast with callback queues and blocking waits.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use strata_worker::panic_message;

pub(crate) type Callback<T> = Box<dyn FnOnce(&Arc<T>) + Send>;

struct SignalState<T> {
	fired: bool,
	pending: Vec<Callback<T>>,
}

/// Fires at most once. Callbacks registered before firing run in
/// registration order on the firing thread. Once fired, every registration
/// runs immediately on the registering thread, including registrations made
/// while the firing thread is still draining the queue.
pub(crate) struct Signal<T> {
	name: &'static str,
	fired: AtomicBool,
	state: Mutex<SignalState<T>>,
	cond: Condvar,
}

impl<T> Signal<T> {
	pub(crate) fn new(name: &'static str) -> Self {
		Self {
			name,
			fired: AtomicBool::new(false),
			state: Mutex::new(SignalState {
				fired: false,
				pending: Vec::new(),
			}),
			cond: Condvar::new(),
		}
	}

	#[cfg(test)]
	pub(crate) fn is_fired(&self) -> bool {
		self.fired.load(Ordering::Acquire)
	}

	pub(crate) fn register(&self, target: &Arc<T>, callback: Callback<T>) {
		if self.fired.load(Ordering::Acquire) {
			self.invoke(target, callback);
			return;
		}
		let mut state = self.state.lock();
		if !state.fired {
			state.pending.push(callback);
			return;
		}
		drop(state);
		self.invoke(target, callback);
	}

	/// Returns false if the signal had already fired.
	pub(crate) fn fire(&self, target: &Arc<T>) -> bool {
		let batch = {
			let mut state = self.state.lock();
			if state.fired {
				return false;
			}
			state.fired = true;
			self.fired.store(true, Ordering::Release);
			self.cond.notify_all();
			std::mem::take(&mut state.pending)
		};
		for callback in batch {
			self.invoke(target, callback);
		}
		true
	}

	pub(crate) fn wait(&self) {
		let mut state = self.state.lock();
		while !state.fired {
			self.cond.wait(&mut state);
		}
	}

	/// Returns true if the signal fired before `timeout` elapsed.
	pub(crate) fn wait_for(&self, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		let mut state = self.state.lock();
		while !state.fired {
			if self.cond.wait_until(&mut state, deadline).timed_out() {
				return state.fired;
			}
		}
		true
	}

	fn invoke(&self, target: &Arc<T>, callback: Callback<T>) {
		if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(target))) {
			tracing::warn!(signal = self.name, panic = %panic_message(&*payload), "graph.callback.panicked");
		}
	}
}
