use std::any::Any;
use std::sync::Arc;

use crate::builder::{BuildResult, Builder};
use crate::context::Context;
use crate::dependency::{BuiltDependencies, DependencySet};
use crate::value::{Address, Value};

/// Builder that returns a preexisting value and declares no dependencies.
#[derive(Debug, Clone)]
pub struct FixedBuilder {
	value: Value,
}

impl FixedBuilder {
	/// Wraps a concrete value.
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self { value: Value::new(value) }
	}

	/// Wraps an already type-erased value.
	pub fn from_value(value: Value) -> Self {
		Self { value }
	}

	/// The value every build returns.
	pub fn value(&self) -> &Value {
		&self.value
	}
}

impl<A: Address> Builder<A> for FixedBuilder {
	fn dependencies(&self, _cx: &Arc<Context<A>>, _address: &A) -> BuildResult<Option<DependencySet<A>>> {
		Ok(None)
	}

	fn build(&self, _cx: &Arc<Context<A>>, _address: &A, _dependencies: &BuiltDependencies<A>) -> BuildResult<Value> {
		Ok(self.value.clone())
	}
}
