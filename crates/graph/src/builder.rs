use std::sync::Arc;

use crate::context::Context;
use crate::dependency::{BuiltDependencies, DependencySet};
use crate::value::{Address, Value};

/// Result type returned by builder callbacks.
pub type BuildResult<T> = anyhow::Result<T>;

/// Knows how to discover an address's dependencies and construct its value.
///
/// Builders are shared across contexts: a child layer that does not override
/// an address reuses its parent's builder, invoked with the child context.
pub trait Builder<A: Address>: Send + Sync {
	/// First discovery round. `None` means no dependencies.
	fn dependencies(&self, cx: &Arc<Context<A>>, address: &A) -> BuildResult<Option<DependencySet<A>>>;

	/// Follow-up discovery round, called after everything declared so far was
	/// built when the previous round was recursive.
	fn additional_dependencies(
		&self,
		cx: &Arc<Context<A>>,
		address: &A,
		built: &BuiltDependencies<A>,
	) -> BuildResult<Option<DependencySet<A>>> {
		let _ = (cx, address, built);
		Ok(None)
	}

	/// Constructs the value once every dependency is built.
	fn build(&self, cx: &Arc<Context<A>>, address: &A, dependencies: &BuiltDependencies<A>) -> BuildResult<Value>;

	/// Whether the first discovery round runs on the scheduler instead of the
	/// calling thread.
	fn discover_asynchronously(&self, address: &A) -> bool {
		let _ = address;
		false
	}
}

/// Maps an address to the builder responsible for it in one context layer.
pub trait Provider<A: Address>: Send + Sync {
	/// Returns the builder for `address`, or `None` to defer to the parent layer.
	fn builder(&self, address: &A) -> Option<Arc<dyn Builder<A>>>;
}
