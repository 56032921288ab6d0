//! Countdown join over a set of dependency nodes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::builder::Builder;
use crate::cycle;
use crate::discovery;
use crate::error::GraphError;
use crate::node::{Node, NodeState};
use crate::scheduler::{BuildTask, GraphTask};
use crate::value::Address;

/// A declared dependency paired with the node it resolved to.
pub(crate) type Edge<A> = (crate::dependency::Dependency<A>, Arc<Node<A>>);

/// What runs once every dependency settled successfully.
#[derive(Clone)]
pub(crate) enum Continuation<A: Address> {
	/// Ask the builder for another discovery round, on the completing thread.
	Discover(Arc<dyn Builder<A>>),
	/// Hand a build task to the owning context's scheduler.
	Build,
}

/// Waits for every edge's node to settle, then runs the continuation once.
///
/// The counter starts at the edge count and each built callback decrements
/// it; only the callback that reaches zero proceeds. If any dependency ended
/// without a value, the owner fails and the continuation never runs.
pub(crate) struct DependencyJoin<A: Address> {
	owner: Arc<Node<A>>,
	edges: Vec<Edge<A>>,
	remaining: AtomicUsize,
	continuation: Continuation<A>,
}

impl<A: Address> DependencyJoin<A> {
	pub(crate) fn start(owner: &Arc<Node<A>>, edges: Vec<Edge<A>>, continuation: Continuation<A>) {
		if edges.is_empty() {
			proceed(owner, &edges, &continuation);
			return;
		}
		if cycle::enter_wait(owner, &edges) {
			tracing::warn!(address = ?owner.address(), context = %owner.context_id(), "graph.cycle_detected");
			owner.fail(GraphError::CycleDetected {
				address: format!("{:?}", owner.address()),
			});
			return;
		}
		let join = Arc::new(Self {
			owner: Arc::clone(owner),
			remaining: AtomicUsize::new(edges.len()),
			edges,
			continuation,
		});
		for (_, node) in &join.edges {
			let join = Arc::clone(&join);
			node.on_built(move |_| join.arrive());
		}
	}

	fn arrive(&self) {
		if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
			return;
		}
		cycle::leave_wait(&self.owner);
		proceed(&self.owner, &self.edges, &self.continuation);
	}
}

fn proceed<A: Address>(owner: &Arc<Node<A>>, edges: &[Edge<A>], continuation: &Continuation<A>) {
	if owner.state().is_terminal() {
		return;
	}
	let failed: Vec<String> = edges
		.iter()
		.filter(|(_, node)| node.state() != NodeState::Built)
		.map(|(dependency, _)| dependency.name().to_owned())
		.collect();
	if !failed.is_empty() {
		owner.fail(GraphError::DependencyFailed { names: failed });
		return;
	}
	match continuation {
		Continuation::Discover(builder) => discovery::next_round(owner, builder, edges),
		Continuation::Build => submit_build(owner, edges.to_vec()),
	}
}

fn submit_build<A: Address>(owner: &Arc<Node<A>>, edges: Vec<Edge<A>>) {
	let Some(cx) = owner.context() else {
		owner.fail(GraphError::ContextDropped);
		return;
	};
	cx.scheduler()
		.register_task(GraphTask::Build(BuildTask::new(Arc::clone(owner), edges)));
}

/// Deps-known callback installed by [`Node::request_build`].
pub(crate) fn start_build<A: Address>(node: &Arc<Node<A>>) {
	if node.state() != NodeState::DependenciesKnown {
		return;
	}
	let Some(cx) = node.context() else {
		node.fail(GraphError::ContextDropped);
		return;
	};
	let dependencies = node.requested_dependencies().map(<[_]>::to_vec).unwrap_or_default();
	match discovery::resolve_all(&cx, dependencies) {
		Ok(edges) => DependencyJoin::start(node, edges, Continuation::Build),
		Err(err) => {
			node.fail(err);
		}
	}
}
