use std::fmt;
use std::sync::Arc;

use crate::builder::{BuildResult, Builder};
use crate::context::Context;
use crate::dependency::{BuiltDependencies, DependencySet};
use crate::value::{Address, Value};

type DependenciesFn<A> = dyn Fn(&Arc<Context<A>>, &A) -> BuildResult<Option<DependencySet<A>>> + Send + Sync;
type AdditionalFn<A> =
	dyn Fn(&Arc<Context<A>>, &A, &BuiltDependencies<A>) -> BuildResult<Option<DependencySet<A>>> + Send + Sync;
type BuildFn<A> = dyn Fn(&Arc<Context<A>>, &A, &BuiltDependencies<A>) -> BuildResult<Value> + Send + Sync;
type AsyncPredicate<A> = dyn Fn(&A) -> bool + Send + Sync;

/// Builder assembled from closures.
///
/// ```ignore
/// let builder = FnBuilder::<u32>::new(
/// 	|_, _| {
/// 		let mut set = DependencySet::new();
/// 		set.push("0", 0)?;
/// 		Ok(Some(set))
/// 	},
/// 	|_, address, deps| Ok(Value::new(format!("{address}-{}", deps.value::<String>("0")?))),
/// );
/// ```
pub struct FnBuilder<A: Address> {
	dependencies: Box<DependenciesFn<A>>,
	additional: Option<Box<AdditionalFn<A>>>,
	build: Box<BuildFn<A>>,
	asynchronous: Option<Box<AsyncPredicate<A>>>,
}

impl<A: Address> FnBuilder<A> {
	/// Creates a builder from a first-round discovery closure and a build closure.
	pub fn new(
		dependencies: impl Fn(&Arc<Context<A>>, &A) -> BuildResult<Option<DependencySet<A>>> + Send + Sync + 'static,
		build: impl Fn(&Arc<Context<A>>, &A, &BuiltDependencies<A>) -> BuildResult<Value> + Send + Sync + 'static,
	) -> Self {
		Self {
			dependencies: Box::new(dependencies),
			additional: None,
			build: Box::new(build),
			asynchronous: None,
		}
	}

	/// Creates a dependency-free builder.
	pub fn leaf(build: impl Fn(&Arc<Context<A>>, &A) -> BuildResult<Value> + Send + Sync + 'static) -> Self {
		Self::new(|_, _| Ok(None), move |cx, address, _| build(cx, address))
	}

	/// Installs the follow-up discovery closure used by recursive rounds.
	pub fn with_additional(
		mut self,
		additional: impl Fn(&Arc<Context<A>>, &A, &BuiltDependencies<A>) -> BuildResult<Option<DependencySet<A>>>
		+ Send
		+ Sync
		+ 'static,
	) -> Self {
		self.additional = Some(Box::new(additional));
		self
	}

	/// Runs first-round discovery on the scheduler for addresses matching `predicate`.
	pub fn with_async_discovery(mut self, predicate: impl Fn(&A) -> bool + Send + Sync + 'static) -> Self {
		self.asynchronous = Some(Box::new(predicate));
		self
	}
}

impl<A: Address> Builder<A> for FnBuilder<A> {
	fn dependencies(&self, cx: &Arc<Context<A>>, address: &A) -> BuildResult<Option<DependencySet<A>>> {
		(self.dependencies)(cx, address)
	}

	fn additional_dependencies(
		&self,
		cx: &Arc<Context<A>>,
		address: &A,
		built: &BuiltDependencies<A>,
	) -> BuildResult<Option<DependencySet<A>>> {
		match &self.additional {
			Some(additional) => additional(cx, address, built),
			None => Ok(None),
		}
	}

	fn build(&self, cx: &Arc<Context<A>>, address: &A, dependencies: &BuiltDependencies<A>) -> BuildResult<Value> {
		(self.build)(cx, address, dependencies)
	}

	fn discover_asynchronously(&self, address: &A) -> bool {
		self.asynchronous.as_ref().is_some_and(|predicate| predicate(address))
	}
}

impl<A: Address> fmt::Debug for FnBuilder<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnBuilder")
			.field("recursive", &self.additional.is_some())
			.field("async_discovery", &self.asynchronous.is_some())
			.finish_non_exhaustive()
	}
}
