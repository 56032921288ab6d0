#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use strata_graph::builders::{FixedProvider, FnBuilder};
use strata_graph::{BuiltDependencies, DependencySet, InlineScheduler, Node, NodeState, Scheduler, Value, WorkerPool};

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Scheduler flavours exercised by the scenario suites.
#[derive(Debug, Clone, Copy)]
pub enum Kind {
	Pool,
	Inline,
}

impl Kind {
	pub fn scheduler(self) -> Arc<dyn Scheduler<i32>> {
		match self {
			Self::Pool => Arc::new(WorkerPool::with_threads(4).expect("worker pool")),
			Self::Inline => Arc::new(InlineScheduler),
		}
	}
}

/// Provider preloaded with string values.
pub fn values(entries: &[(i32, &str)]) -> Arc<FixedProvider<i32>> {
	let provider = FixedProvider::new();
	for (address, value) in entries {
		provider.insert_value(*address, Value::new((*value).to_owned()));
	}
	Arc::new(provider)
}

/// Builder depending on `deps` (named after their address) that renders
/// `address-dep-dep...` in declaration order.
pub fn joined(deps: &[i32]) -> Arc<FnBuilder<i32>> {
	let deps = deps.to_vec();
	Arc::new(FnBuilder::<i32>::new(
		move |_, _| {
			let mut set = DependencySet::new();
			for dep in &deps {
				set.push(dep.to_string(), *dep)?;
			}
			Ok(Some(set))
		},
		|_, address, built| Ok(Value::new(render(address, built))),
	))
}

pub fn render(address: &i32, built: &BuiltDependencies<i32>) -> String {
	let mut out = address.to_string();
	for (_, dependency) in built.iter() {
		out.push('-');
		out.push_str(dependency.value().downcast_ref::<String>().map_or("?", String::as_str));
	}
	out
}

/// Waits for `node` to settle and returns its state.
pub fn settle(node: &Arc<Node<i32>>) -> NodeState {
	assert!(node.wait_built_timeout(TIMEOUT), "node {:?} did not settle", node.address());
	node.state()
}

/// Waits for `node` to settle and returns its string value.
pub fn text(node: &Arc<Node<i32>>) -> String {
	assert_eq!(settle(node), NodeState::Built, "node {:?} failed: {:?}", node.address(), node.failure());
	node.value()
		.and_then(|value| value.downcast_ref::<String>())
		.cloned()
		.expect("string value")
}
