//! Dependency discovery: synchronous, scheduled and recursive rounds.

use std::sync::Arc;

use crate::builder::Builder;
use crate::context::Context;
use crate::dependency::{self, BuiltDependencies, Dependency, DependencySet};
use crate::error::{GraphError, Result};
use crate::guard;
use crate::join::{Continuation, DependencyJoin, Edge};
use crate::node::Node;
use crate::scheduler::{DiscoveryTask, GraphTask};
use crate::value::Address;

/// Starts discovery for a freshly created node that has a local builder.
pub(crate) fn discover<A: Address>(cx: &Arc<Context<A>>, node: &Arc<Node<A>>, builder: Arc<dyn Builder<A>>) {
	match guard::user_call(|| builder.discover_asynchronously(node.address())) {
		Ok(true) => {
			tracing::trace!(address = ?node.address(), context = %cx.id(), "graph.discovery.scheduled");
			cx.scheduler()
				.register_task(GraphTask::Discover(DiscoveryTask::new(Arc::clone(node), builder)));
		}
		Ok(false) => first_round(cx, node, &builder),
		Err(err) => {
			node.fail(err);
		}
	}
}

/// Runs the builder's first discovery round on the current thread.
pub(crate) fn first_round<A: Address>(cx: &Arc<Context<A>>, node: &Arc<Node<A>>, builder: &Arc<dyn Builder<A>>) {
	match guard::builder_call(|| builder.dependencies(cx, node.address())) {
		Ok(round) => accept_round(cx, node, builder, Vec::new(), round),
		Err(err) => {
			node.fail(err);
		}
	}
}

/// Runs a follow-up round once everything declared so far is built.
pub(crate) fn next_round<A: Address>(node: &Arc<Node<A>>, builder: &Arc<dyn Builder<A>>, edges: &[Edge<A>]) {
	let Some(cx) = node.context() else {
		node.fail(GraphError::ContextDropped);
		return;
	};
	let outcome = collect_built(edges)
		.and_then(|built| guard::builder_call(|| builder.additional_dependencies(&cx, node.address(), &built)));
	match outcome {
		Ok(round) => {
			let known = edges.iter().map(|(dependency, _)| dependency.clone()).collect();
			accept_round(&cx, node, builder, known, round);
		}
		Err(err) => {
			node.fail(err);
		}
	}
}

fn accept_round<A: Address>(
	cx: &Arc<Context<A>>,
	node: &Arc<Node<A>>,
	builder: &Arc<dyn Builder<A>>,
	known: Vec<Dependency<A>>,
	round: Option<DependencySet<A>>,
) {
	let (added, recursive) = round.map(DependencySet::into_parts).unwrap_or_default();
	let combined = match dependency::merge(known, added) {
		Ok(combined) => combined,
		Err(err) => {
			node.fail(err);
			return;
		}
	};
	if !recursive {
		node.set_requested(combined);
		return;
	}
	tracing::trace!(address = ?node.address(), context = %cx.id(), count = combined.len(), "graph.discovery.recursive");
	match resolve_all(cx, combined) {
		Ok(edges) => DependencyJoin::start(node, edges, Continuation::Discover(Arc::clone(builder))),
		Err(err) => {
			node.fail(err);
		}
	}
}

/// Builds every dependency through its resolution context.
pub(crate) fn resolve_all<A: Address>(cx: &Arc<Context<A>>, dependencies: Vec<Dependency<A>>) -> Result<Vec<Edge<A>>> {
	dependencies
		.into_iter()
		.map(|dependency| {
			let target = dependency.resolution_context(cx)?;
			let node = target.build(dependency.address());
			Ok((dependency, node))
		})
		.collect()
}

/// Gathers built values in declaration order.
pub(crate) fn collect_built<A: Address>(edges: &[Edge<A>]) -> Result<BuiltDependencies<A>> {
	let mut built = BuiltDependencies::default();
	let mut missing = Vec::new();
	for (dependency, node) in edges {
		match node.value() {
			Some(value) => built.insert(dependency, value.clone())?,
			None => missing.push(dependency.name().to_owned()),
		}
	}
	if missing.is_empty() {
		Ok(built)
	} else {
		Err(GraphError::DependencyFailed { names: missing })
	}
}
