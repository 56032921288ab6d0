//! Pluggable execution of discovery and build tasks.

use std::fmt;
use std::sync::Arc;

use strata_worker::{Task, TaskClass, WorkerPool};

use crate::builder::Builder;
use crate::context::Context;
use crate::dependency::BuiltDependencies;
use crate::discovery;
use crate::error::{GraphError, Result};
use crate::guard;
use crate::join::Edge;
use crate::node::Node;
use crate::value::{Address, Value};

/// Receives tasks the engine wants executed.
///
/// Implementations may run a task on any thread, hold it, complete it through
/// the [`BuildTask`] bypass, or cancel it. Every task must eventually be run,
/// cancelled or completed externally, or its node never settles.
pub trait Scheduler<A: Address>: Send + Sync {
	/// Accepts one task.
	fn register_task(&self, task: GraphTask<A>);
}

/// A task handed to a [`Scheduler`].
pub enum GraphTask<A: Address> {
	/// First-round discovery for a builder that asked to discover off-thread.
	Discover(DiscoveryTask<A>),
	/// Construction of a node whose dependencies are all built.
	Build(BuildTask<A>),
}

impl<A: Address> GraphTask<A> {
	/// Executes the task on the current thread.
	pub fn run(self) {
		match self {
			Self::Discover(task) => task.run(),
			Self::Build(task) => task.run(),
		}
	}

	/// Fails the task's node with [`GraphError::Cancelled`].
	pub fn cancel(self) {
		match self {
			Self::Discover(task) => task.cancel(),
			Self::Build(task) => task.cancel(),
		}
	}

	/// The node this task settles.
	pub fn node(&self) -> &Arc<Node<A>> {
		match self {
			Self::Discover(task) => &task.node,
			Self::Build(task) => &task.node,
		}
	}

	/// Address of the task's node.
	pub fn address(&self) -> &A {
		self.node().address()
	}

	/// Classification for logging and counters.
	pub fn class(&self) -> TaskClass {
		match self {
			Self::Discover(_) => TaskClass::Discovery,
			Self::Build(_) => TaskClass::Build,
		}
	}

	/// Returns the build task, or gives the task back if it is a discovery.
	pub fn into_build(self) -> std::result::Result<BuildTask<A>, Self> {
		match self {
			Self::Build(task) => Ok(task),
			other => Err(other),
		}
	}
}

impl<A: Address> fmt::Debug for GraphTask<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GraphTask")
			.field("class", &self.class())
			.field("address", self.address())
			.finish()
	}
}

impl<A: Address> Task for GraphTask<A> {
	fn run(self: Box<Self>) {
		GraphTask::run(*self);
	}

	fn cancel(self: Box<Self>) {
		GraphTask::cancel(*self);
	}

	fn class(&self) -> TaskClass {
		GraphTask::class(self)
	}
}

/// Off-thread first-round discovery.
pub struct DiscoveryTask<A: Address> {
	node: Arc<Node<A>>,
	builder: Arc<dyn Builder<A>>,
}

impl<A: Address> DiscoveryTask<A> {
	pub(crate) fn new(node: Arc<Node<A>>, builder: Arc<dyn Builder<A>>) -> Self {
		Self { node, builder }
	}

	/// Runs the discovery round on the current thread.
	pub fn run(self) {
		match self.node.context() {
			Some(cx) => discovery::first_round(&cx, &self.node, &self.builder),
			None => {
				self.node.fail(GraphError::ContextDropped);
			}
		}
	}

	/// Fails the node with [`GraphError::Cancelled`].
	pub fn cancel(self) {
		self.node.fail(GraphError::Cancelled);
	}
}

/// Construction of one node, with all dependencies built.
///
/// Besides [`BuildTask::run`] and [`BuildTask::cancel`], a scheduler may settle
/// the node directly with [`BuildTask::set_result`] or
/// [`BuildTask::set_exception`] without invoking the builder.
pub struct BuildTask<A: Address> {
	node: Arc<Node<A>>,
	edges: Vec<Edge<A>>,
}

impl<A: Address> BuildTask<A> {
	pub(crate) fn new(node: Arc<Node<A>>, edges: Vec<Edge<A>>) -> Self {
		Self { node, edges }
	}

	/// The node being built.
	pub fn node(&self) -> &Arc<Node<A>> {
		&self.node
	}

	/// Address being built.
	pub fn address(&self) -> &A {
		self.node.address()
	}

	/// The builder that [`BuildTask::run`] would invoke.
	pub fn builder(&self) -> Option<Arc<dyn Builder<A>>> {
		self.node.builder()
	}

	/// The context the build runs in.
	pub fn context(&self) -> Option<Arc<Context<A>>> {
		self.node.context()
	}

	/// Built dependency values keyed by local name.
	pub fn dependencies(&self) -> Result<BuiltDependencies<A>> {
		discovery::collect_built(&self.edges)
	}

	/// Invokes the builder and settles the node with its result.
	pub fn run(self) {
		let result = self.invoke();
		match result {
			Ok(value) => {
				self.node.set_built(value);
			}
			Err(err) => {
				self.node.fail(err);
			}
		}
	}

	fn invoke(&self) -> Result<Value> {
		let builder = self.node.builder().ok_or(GraphError::BuilderMissing)?;
		let cx = self.node.context().ok_or(GraphError::ContextDropped)?;
		let built = self.dependencies()?;
		guard::builder_call(|| builder.build(&cx, self.node.address(), &built))
	}

	/// Fails the node with [`GraphError::Cancelled`].
	pub fn cancel(self) {
		self.node.fail(GraphError::Cancelled);
	}

	/// Settles the node as built with `value`, bypassing the builder.
	pub fn set_result(self, value: Value) {
		self.node.set_built(value);
	}

	/// Settles the node as failed with `error`, bypassing the builder.
	pub fn set_exception(self, error: impl Into<anyhow::Error>) {
		self.node.fail(GraphError::External(error.into()));
	}
}

impl<A: Address> Scheduler<A> for WorkerPool {
	fn register_task(&self, task: GraphTask<A>) {
		self.submit(task);
	}
}

/// Runs every task immediately on the registering thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineScheduler;

impl<A: Address> Scheduler<A> for InlineScheduler {
	fn register_task(&self, task: GraphTask<A>) {
		task.run();
	}
}

/// Scheduler backed by a closure.
///
/// Useful for intercepting tasks, for example to complete builds through the
/// bypass or to forward them to another executor.
pub struct FnScheduler<F>(F);

impl<F> FnScheduler<F> {
	/// Wraps `f`.
	pub fn new(f: F) -> Self {
		Self(f)
	}
}

impl<A, F> Scheduler<A> for FnScheduler<F>
where
	A: Address,
	F: Fn(GraphTask<A>) + Send + Sync,
{
	fn register_task(&self, task: GraphTask<A>) {
		(self.0)(task);
	}
}

impl<F> fmt::Debug for FnScheduler<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnScheduler").finish_non_exhaustive()
	}
}
