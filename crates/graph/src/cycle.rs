//! Wait-for graph used to fail joins that would never complete.
//!
//! A node records the nodes it is blocked on for as long as one of its joins
//! is pending. Before registering a new join, the owner walks those edges
//! from its dependencies; reaching the owner again means the join would wait
//! on itself.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::join::Edge;
use crate::node::Node;
use crate::value::Address;

/// Records the owner's wait edges and reports whether they close a cycle.
///
/// Edges are published before the walk so two joins racing to close the same
/// cycle cannot both miss it. At most one node lock is held at a time.
pub(crate) fn enter_wait<A: Address>(owner: &Arc<Node<A>>, edges: &[Edge<A>]) -> bool {
	{
		let mut waiting = owner.waiting_on.lock();
		waiting.clear();
		waiting.extend(edges.iter().map(|(_, node)| Arc::clone(node)));
	}
	let target = Arc::as_ptr(owner);
	let mut visited: FxHashSet<*const Node<A>> = FxHashSet::default();
	let mut stack: Vec<Arc<Node<A>>> = edges.iter().map(|(_, node)| Arc::clone(node)).collect();
	while let Some(node) = stack.pop() {
		if Arc::as_ptr(&node) == target {
			return true;
		}
		if !visited.insert(Arc::as_ptr(&node)) {
			continue;
		}
		stack.extend(node.waiting_on.lock().iter().cloned());
	}
	false
}

/// Clears the owner's wait edges once its join completes.
pub(crate) fn leave_wait<A: Address>(owner: &Arc<Node<A>>) {
	owner.waiting_on.lock().clear();
}
