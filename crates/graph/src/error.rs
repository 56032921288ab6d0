use std::sync::Arc;

/// Failure cause recorded on a node.
///
/// Causes are stored as `Arc<GraphError>` so one failure can be observed from
/// every waiter and wrapped by dependents without cloning the underlying
/// error.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
	/// One or more dependencies ended without a value.
	#[error("dependencies failed: {}", names.join(", "))]
	DependencyFailed {
		/// Local names of the dependencies that were not built, in declaration order.
		names: Vec<String>,
	},
	/// The parent layer failed to discover dependencies for a delegated address.
	#[error("parent dependencies failed")]
	ParentDependencyFailed(#[source] Arc<GraphError>),
	/// A builder returned an error.
	#[error("builder failed: {0}")]
	Builder(#[source] anyhow::Error),
	/// A builder, provider or task panicked.
	#[error("panicked: {0}")]
	Panicked(String),
	/// Failure injected through the external bypass.
	#[error("external failure: {0}")]
	External(#[source] anyhow::Error),
	/// The task was cancelled before it ran.
	#[error("operation cancelled")]
	Cancelled,
	/// Waiting on the dependency would deadlock.
	#[error("dependency cycle through {address}")]
	CycleDetected {
		/// Debug rendering of the node that closed the cycle.
		address: String,
	},
	/// The owning context was dropped while work for it was still pending.
	#[error("context dropped before the node settled")]
	ContextDropped,
	/// A node reached its build step without an installed builder.
	#[error("no builder installed")]
	BuilderMissing,
	/// Two dependencies share one local name.
	#[error("duplicate dependency name: {0}")]
	DuplicateDependency(String),
	/// A builder asked for a dependency it never declared.
	#[error("missing dependency: {0}")]
	MissingDependency(String),
	/// A built dependency holds a different type than requested.
	#[error("dependency {name} is not a {expected}")]
	TypeMismatch {
		/// Local dependency name.
		name: String,
		/// Requested type name.
		expected: &'static str,
	},
}

/// Result alias for graph operations.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn dependency_failure_lists_names() {
		let err = GraphError::DependencyFailed {
			names: vec!["0".into(), "fixed".into()],
		};
		assert_eq!(err.to_string(), "dependencies failed: 0, fixed");
	}

	#[test]
	fn parent_failure_exposes_cause() {
		let cause = Arc::new(GraphError::Cancelled);
		let err = GraphError::ParentDependencyFailed(Arc::clone(&cause));
		let source = std::error::Error::source(&err).map(ToString::to_string);
		assert_eq!(source.as_deref(), Some("operation cancelled"));
	}
}
