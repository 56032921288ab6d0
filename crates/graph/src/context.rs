//! Layered address-to-node maps.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::builder::{Builder, Provider};
use crate::discovery;
use crate::error::GraphError;
use crate::guard;
use crate::node::{Node, NodeState};
use crate::scheduler::Scheduler;
use crate::value::Address;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique context identifier, used in logs and pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
	pub(crate) fn next() -> Self {
		Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
	}

	/// Raw numeric value.
	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ContextId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ctx#{}", self.0)
	}
}

/// One layer of the build hierarchy.
///
/// A context owns at most one node per address. Addresses its provider does not
/// cover are delegated to the parent layer: the parent discovers the builder
/// and dependency list once, and the child builds its own node from them so
/// live dependencies pick up the child's overrides.
pub struct Context<A: Address> {
	id: ContextId,
	this: Weak<Context<A>>,
	parent: Option<Arc<Context<A>>>,
	provider: Arc<dyn Provider<A>>,
	scheduler: Arc<dyn Scheduler<A>>,
	nodes: Mutex<FxHashMap<A, Arc<Node<A>>>>,
}

impl<A: Address> Context<A> {
	/// Creates a root layer.
	pub fn root(provider: Arc<dyn Provider<A>>, scheduler: Arc<dyn Scheduler<A>>) -> Arc<Self> {
		Self::create(None, provider, scheduler)
	}

	/// Creates a layer below `parent` with its own scheduler.
	pub fn with_parent(
		parent: &Arc<Self>,
		provider: Arc<dyn Provider<A>>,
		scheduler: Arc<dyn Scheduler<A>>,
	) -> Arc<Self> {
		Self::create(Some(Arc::clone(parent)), provider, scheduler)
	}

	/// Creates a layer below this one that shares its scheduler.
	pub fn child(self: &Arc<Self>, provider: Arc<dyn Provider<A>>) -> Arc<Self> {
		Self::with_parent(self, provider, Arc::clone(&self.scheduler))
	}

	fn create(
		parent: Option<Arc<Self>>,
		provider: Arc<dyn Provider<A>>,
		scheduler: Arc<dyn Scheduler<A>>,
	) -> Arc<Self> {
		let cx = Arc::new_cyclic(|this| Self {
			id: ContextId::next(),
			this: this.clone(),
			parent,
			provider,
			scheduler,
			nodes: Mutex::new(FxHashMap::default()),
		});
		tracing::debug!(context = %cx.id, parent = ?cx.parent.as_ref().map(|p| p.id), "graph.context.created");
		cx
	}

	/// Identifier of this layer.
	pub fn id(&self) -> ContextId {
		self.id
	}

	/// The layer this one delegates to.
	pub fn parent(&self) -> Option<&Arc<Self>> {
		self.parent.as_ref()
	}

	/// Scheduler that runs this layer's build tasks.
	pub fn scheduler(&self) -> &Arc<dyn Scheduler<A>> {
		&self.scheduler
	}

	/// Provider consulted for this layer's builders.
	pub fn provider(&self) -> &Arc<dyn Provider<A>> {
		&self.provider
	}

	/// Returns the node for `address`, creating it and starting discovery on
	/// first use.
	///
	/// Concurrent calls for one address observe the same node and discovery
	/// starts once. Discovery never runs while the node map is locked.
	pub fn resolve(&self, address: &A) -> Arc<Node<A>> {
		let node = {
			let mut nodes = self.nodes.lock();
			if let Some(node) = nodes.get(address) {
				return Arc::clone(node);
			}
			let node = Node::new(address.clone(), self.this.clone(), self.id);
			nodes.insert(address.clone(), Arc::clone(&node));
			node
		};
		tracing::trace!(address = ?address, context = %self.id, "graph.node.created");
		self.populate(&node);
		node
	}

	/// Resolves `address` and requests its build.
	///
	/// Synchronous discovery recurses down the dependency chain on the calling
	/// thread, one level per dependency. Chains of a few thousand levels can
	/// exhaust a default 2 MiB thread stack; build very deep graphs from a
	/// thread with a larger stack, or have their builders opt into
	/// asynchronous discovery.
	pub fn build(&self, address: &A) -> Arc<Node<A>> {
		let node = self.resolve(address);
		node.request_build();
		node
	}

	/// The node for `address` if it was already created in this layer.
	pub fn cached(&self, address: &A) -> Option<Arc<Node<A>>> {
		self.nodes.lock().get(address).cloned()
	}

	/// Number of nodes created in this layer.
	pub fn len(&self) -> usize {
		self.nodes.lock().len()
	}

	/// Returns true if no node was created in this layer.
	pub fn is_empty(&self) -> bool {
		self.nodes.lock().is_empty()
	}

	fn populate(&self, node: &Arc<Node<A>>) {
		let Some(cx) = self.this.upgrade() else {
			node.fail(GraphError::ContextDropped);
			return;
		};
		let builder = match guard::user_call(|| self.provider.builder(node.address())) {
			Ok(builder) => builder,
			Err(err) => {
				node.fail(err);
				return;
			}
		};
		match (builder, &self.parent) {
			(Some(builder), _) => {
				node.install_builder(Arc::clone(&builder));
				discovery::discover(&cx, node, builder);
			}
			(None, Some(parent)) => {
				let local = Arc::clone(node);
				parent
					.resolve(node.address())
					.on_dependencies_known(move |upstream| adopt(&local, upstream));
			}
			(None, None) => {
				node.set_no_builder();
			}
		}
	}
}

/// Copies the parent layer's discovery result onto a delegated node.
fn adopt<A: Address>(local: &Arc<Node<A>>, upstream: &Arc<Node<A>>) {
	match upstream.state() {
		NodeState::Failed => {
			let cause = upstream
				.failure()
				.cloned()
				.unwrap_or_else(|| Arc::new(GraphError::ContextDropped));
			local.fail(GraphError::ParentDependencyFailed(cause));
		}
		NodeState::NoBuilderAvailable => {
			local.set_no_builder();
		}
		NodeState::Starting | NodeState::DependenciesKnown | NodeState::Built => {
			let builder: Option<Arc<dyn Builder<A>>> = upstream.builder();
			match builder {
				Some(builder) => {
					local.install_builder(builder);
					let dependencies = upstream.requested_dependencies().map(<[_]>::to_vec).unwrap_or_default();
					local.set_requested(dependencies);
				}
				None => {
					local.fail(GraphError::BuilderMissing);
				}
			}
		}
	}
}

impl<A: Address> fmt::Debug for Context<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("id", &self.id)
			.field("parent", &self.parent.as_ref().map(|p| p.id))
			.field("nodes", &self.len())
			.finish_non_exhaustive()
	}
}
