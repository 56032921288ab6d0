//! Per-address build state.

mod signal;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use self::signal::Signal;
use crate::builder::Builder;
use crate::context::{Context, ContextId};
use crate::dependency::Dependency;
use crate::error::GraphError;
use crate::join;
use crate::value::{Address, Value};

/// Lifecycle state of a node.
///
/// Transitions only move forward: `Starting` leads to `DependenciesKnown`,
/// `NoBuilderAvailable` or `Failed`; `DependenciesKnown` leads to `Built` or
/// `Failed`. The last three states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeState {
	/// Created; dependencies not discovered yet.
	Starting = 0,
	/// No layer supplies a builder for the address.
	NoBuilderAvailable = 1,
	/// The full dependency list is recorded.
	DependenciesKnown = 2,
	/// A value is stored.
	Built = 3,
	/// A failure cause is stored.
	Failed = 4,
}

impl NodeState {
	const fn from_raw(raw: u8) -> Self {
		match raw {
			0 => Self::Starting,
			1 => Self::NoBuilderAvailable,
			2 => Self::DependenciesKnown,
			3 => Self::Built,
			_ => Self::Failed,
		}
	}

	/// Returns true for `Built`, `Failed` and `NoBuilderAvailable`.
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::NoBuilderAvailable | Self::Built | Self::Failed)
	}

	/// Stable lowercase name for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Starting => "starting",
			Self::NoBuilderAvailable => "no_builder",
			Self::DependenciesKnown => "dependencies_known",
			Self::Built => "built",
			Self::Failed => "failed",
		}
	}
}

/// Terminal result of a node.
#[derive(Debug, Clone)]
pub enum Outcome {
	/// The builder produced a value.
	Built(Value),
	/// The node failed with the recorded cause.
	Failed(Arc<GraphError>),
	/// No layer supplies a builder.
	NoBuilder,
}

impl Outcome {
	fn state(&self) -> NodeState {
		match self {
			Self::Built(_) => NodeState::Built,
			Self::Failed(_) => NodeState::Failed,
			Self::NoBuilder => NodeState::NoBuilderAvailable,
		}
	}
}

/// The unit of work for one address within one context.
///
/// Nodes are created by [`Context::resolve`] and shared as `Arc<Node<A>>`.
/// Every accessor is safe to call from any thread at any time.
pub struct Node<A: Address> {
	address: A,
	context: Weak<Context<A>>,
	context_id: ContextId,
	state: AtomicU8,
	builder: OnceLock<Arc<dyn Builder<A>>>,
	requested: OnceLock<Vec<Dependency<A>>>,
	outcome: OnceLock<Outcome>,
	build_requested: AtomicBool,
	dependencies_known: Signal<Node<A>>,
	built: Signal<Node<A>>,
	/// Nodes this node is currently blocked on.
	pub(crate) waiting_on: Mutex<Vec<Arc<Node<A>>>>,
}

impl<A: Address> Node<A> {
	pub(crate) fn new(address: A, context: Weak<Context<A>>, context_id: ContextId) -> Arc<Self> {
		Arc::new(Self {
			address,
			context,
			context_id,
			state: AtomicU8::new(NodeState::Starting as u8),
			builder: OnceLock::new(),
			requested: OnceLock::new(),
			outcome: OnceLock::new(),
			build_requested: AtomicBool::new(false),
			dependencies_known: Signal::new("dependencies_known"),
			built: Signal::new("built"),
			waiting_on: Mutex::new(Vec::new()),
		})
	}

	/// The address this node builds.
	pub fn address(&self) -> &A {
		&self.address
	}

	/// The owning context, unless it was dropped.
	pub fn context(&self) -> Option<Arc<Context<A>>> {
		self.context.upgrade()
	}

	/// Identifier of the owning context.
	pub fn context_id(&self) -> ContextId {
		self.context_id
	}

	/// Current state.
	pub fn state(&self) -> NodeState {
		NodeState::from_raw(self.state.load(Ordering::Acquire))
	}

	/// The builder installed during discovery or adopted from a parent layer.
	pub fn builder(&self) -> Option<Arc<dyn Builder<A>>> {
		self.builder.get().cloned()
	}

	/// The accumulated dependency list, once known.
	pub fn requested_dependencies(&self) -> Option<&[Dependency<A>]> {
		self.requested.get().map(Vec::as_slice)
	}

	/// Terminal outcome, once settled.
	pub fn outcome(&self) -> Option<&Outcome> {
		self.outcome.get()
	}

	/// The built value, if the node was built.
	pub fn value(&self) -> Option<&Value> {
		match self.outcome.get() {
			Some(Outcome::Built(value)) => Some(value),
			_ => None,
		}
	}

	/// The failure cause, if the node failed.
	pub fn failure(&self) -> Option<&Arc<GraphError>> {
		match self.outcome.get() {
			Some(Outcome::Failed(err)) => Some(err),
			_ => None,
		}
	}

	/// Returns true once a build has been requested.
	pub fn is_build_requested(&self) -> bool {
		self.build_requested.load(Ordering::Acquire)
	}

	/// Blocks until dependencies are known or the node settled without them.
	pub fn wait_dependencies_known(&self) -> NodeState {
		self.dependencies_known.wait();
		self.state()
	}

	/// Like [`Node::wait_dependencies_known`], giving up after `timeout`.
	///
	/// Returns true if the node progressed past `Starting` in time.
	pub fn wait_dependencies_known_timeout(&self, timeout: Duration) -> bool {
		self.dependencies_known.wait_for(timeout)
	}

	/// Blocks until the node reaches a terminal state.
	pub fn wait_built(&self) -> NodeState {
		self.built.wait();
		self.state()
	}

	/// Like [`Node::wait_built`], giving up after `timeout`.
	///
	/// Returns true if the node settled in time.
	pub fn wait_built_timeout(&self, timeout: Duration) -> bool {
		self.built.wait_for(timeout)
	}

	/// Resolves once dependencies are known or the node settled without them.
	pub async fn dependencies_known(self: &Arc<Self>) -> NodeState {
		let (tx, rx) = tokio::sync::oneshot::channel();
		self.on_dependencies_known(move |node| {
			let _ = tx.send(node.state());
		});
		rx.await.unwrap_or_else(|_| self.state())
	}

	/// Resolves once the node reaches a terminal state.
	pub async fn built(self: &Arc<Self>) -> NodeState {
		let (tx, rx) = tokio::sync::oneshot::channel();
		self.on_built(move |node| {
			let _ = tx.send(node.state());
		});
		rx.await.unwrap_or_else(|_| self.state())
	}

	/// Runs `callback` once the node leaves `Starting`.
	///
	/// If that already happened, the callback runs immediately on the calling
	/// thread. Otherwise it runs on whichever thread performs the transition,
	/// after all earlier registrations.
	pub fn on_dependencies_known(self: &Arc<Self>, callback: impl FnOnce(&Arc<Node<A>>) + Send + 'static) {
		self.dependencies_known.register(self, Box::new(callback));
	}

	/// Runs `callback` once the node reaches a terminal state.
	pub fn on_built(self: &Arc<Self>, callback: impl FnOnce(&Arc<Node<A>>) + Send + 'static) {
		self.built.register(self, Box::new(callback));
	}

	/// Requests construction of the value. Idempotent.
	///
	/// Once dependencies are known, every dependency is built through its
	/// resolution context and the build task is handed to the owning context's
	/// scheduler.
	pub fn request_build(self: &Arc<Self>) {
		if self
			.build_requested
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			return;
		}
		tracing::trace!(address = ?self.address, context = %self.context_id, "graph.node.build_requested");
		self.on_dependencies_known(join::start_build);
	}

	pub(crate) fn install_builder(&self, builder: Arc<dyn Builder<A>>) {
		let _ = self.builder.set(builder);
	}

	/// Records the final dependency list and leaves `Starting`.
	pub(crate) fn set_requested(self: &Arc<Self>, dependencies: Vec<Dependency<A>>) {
		let count = dependencies.len();
		if self.requested.set(dependencies).is_err() {
			return;
		}
		if self
			.state
			.compare_exchange(
				NodeState::Starting as u8,
				NodeState::DependenciesKnown as u8,
				Ordering::AcqRel,
				Ordering::Acquire,
			)
			.is_err()
		{
			return;
		}
		tracing::trace!(address = ?self.address, context = %self.context_id, count, "graph.node.dependencies_known");
		self.dependencies_known.fire(self);
	}

	pub(crate) fn set_built(self: &Arc<Self>, value: Value) -> bool {
		self.settle(Outcome::Built(value))
	}

	pub(crate) fn set_no_builder(self: &Arc<Self>) -> bool {
		self.settle(Outcome::NoBuilder)
	}

	pub(crate) fn fail(self: &Arc<Self>, error: GraphError) -> bool {
		self.fail_shared(Arc::new(error))
	}

	pub(crate) fn fail_shared(self: &Arc<Self>, error: Arc<GraphError>) -> bool {
		self.settle(Outcome::Failed(error))
	}

	/// Claims the terminal slot and wakes both signals. Returns false if the
	/// node had already settled.
	fn settle(self: &Arc<Self>, outcome: Outcome) -> bool {
		let target = outcome.state();
		if self.outcome.set(outcome).is_err() {
			return false;
		}
		let previous = NodeState::from_raw(self.state.swap(target as u8, Ordering::AcqRel));
		self.waiting_on.lock().clear();
		match self.outcome.get() {
			Some(Outcome::Failed(err)) => {
				tracing::debug!(address = ?self.address, context = %self.context_id, from = previous.as_str(), error = %err, "graph.node.failed");
			}
			Some(Outcome::NoBuilder) => {
				tracing::debug!(address = ?self.address, context = %self.context_id, "graph.node.no_builder");
			}
			_ => {
				tracing::trace!(address = ?self.address, context = %self.context_id, "graph.node.built");
			}
		}
		self.dependencies_known.fire(self);
		self.built.fire(self);
		true
	}
}

impl<A: Address> fmt::Debug for Node<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Node")
			.field("address", &self.address)
			.field("context", &self.context_id)
			.field("state", &self.state())
			.finish_non_exhaustive()
	}
}
