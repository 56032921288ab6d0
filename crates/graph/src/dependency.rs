use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;

use crate::context::{Context, ContextId};
use crate::error::{GraphError, Result};
use crate::value::{Address, Value};

/// A named edge from a node to the address it needs.
///
/// Live dependencies resolve through whichever context performs the build, so
/// overrides in a child layer apply. Pinned dependencies always resolve through
/// the context captured when the dependency was declared.
#[derive(Clone)]
pub struct Dependency<A: Address> {
	name: String,
	address: A,
	pinned: Option<Pin<A>>,
}

#[derive(Clone)]
struct Pin<A: Address> {
	context: Weak<Context<A>>,
	id: ContextId,
}

impl<A: Address> Dependency<A> {
	/// Declares a live dependency.
	pub fn live(name: impl Into<String>, address: A) -> Self {
		Self {
			name: name.into(),
			address,
			pinned: None,
		}
	}

	/// Declares a dependency pinned to `context`.
	///
	/// The pin does not keep the context alive. If it is dropped before the
	/// dependency resolves, the dependent fails with [`GraphError::ContextDropped`].
	pub fn pinned(name: impl Into<String>, address: A, context: &Arc<Context<A>>) -> Self {
		Self {
			name: name.into(),
			address,
			pinned: Some(Pin {
				context: Arc::downgrade(context),
				id: context.id(),
			}),
		}
	}

	/// Local name, unique within one node's dependency list.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Target address.
	pub fn address(&self) -> &A {
		&self.address
	}

	/// Returns true if the dependency ignores the building context.
	pub fn is_pinned(&self) -> bool {
		self.pinned.is_some()
	}

	/// Identifier of the pinned context, if any.
	pub fn pinned_context_id(&self) -> Option<ContextId> {
		self.pinned.as_ref().map(|pin| pin.id)
	}

	/// Picks the context this dependency resolves through when built from `building`.
	pub(crate) fn resolution_context(&self, building: &Arc<Context<A>>) -> Result<Arc<Context<A>>> {
		match &self.pinned {
			None => Ok(Arc::clone(building)),
			Some(pin) => pin.context.upgrade().ok_or(GraphError::ContextDropped),
		}
	}
}

impl<A: Address> fmt::Debug for Dependency<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dependency")
			.field("name", &self.name)
			.field("address", &self.address)
			.field("pinned", &self.pinned_context_id())
			.finish()
	}
}

/// The dependencies one discovery round declares.
///
/// Names are unique within a set. When `recursive` is set, the engine builds
/// every dependency declared so far and asks the builder for more.
#[derive(Debug, Clone)]
pub struct DependencySet<A: Address> {
	dependencies: Vec<Dependency<A>>,
	recursive: bool,
}

impl<A: Address> Default for DependencySet<A> {
	fn default() -> Self {
		Self::new()
	}
}

impl<A: Address> DependencySet<A> {
	/// Creates an empty, non-recursive set.
	pub fn new() -> Self {
		Self {
			dependencies: Vec::new(),
			recursive: false,
		}
	}

	/// Sets whether another discovery round follows this one.
	pub fn with_recursive(mut self, recursive: bool) -> Self {
		self.recursive = recursive;
		self
	}

	/// Adds a live dependency.
	pub fn push(&mut self, name: impl Into<String>, address: A) -> Result<&mut Self> {
		self.insert(Dependency::live(name, address))
	}

	/// Adds a dependency pinned to `context`.
	pub fn push_pinned(&mut self, name: impl Into<String>, address: A, context: &Arc<Context<A>>) -> Result<&mut Self> {
		self.insert(Dependency::pinned(name, address, context))
	}

	/// Adds a prepared dependency, rejecting duplicate names.
	pub fn insert(&mut self, dependency: Dependency<A>) -> Result<&mut Self> {
		if self.dependencies.iter().any(|existing| existing.name == dependency.name) {
			return Err(GraphError::DuplicateDependency(dependency.name));
		}
		self.dependencies.push(dependency);
		Ok(self)
	}

	/// Returns true if another discovery round follows this one.
	pub fn is_recursive(&self) -> bool {
		self.recursive
	}

	/// Number of declared dependencies.
	pub fn len(&self) -> usize {
		self.dependencies.len()
	}

	/// Returns true if nothing was declared.
	pub fn is_empty(&self) -> bool {
		self.dependencies.is_empty()
	}

	/// Declared dependencies in order.
	pub fn iter(&self) -> impl Iterator<Item = &Dependency<A>> {
		self.dependencies.iter()
	}

	pub(crate) fn into_parts(self) -> (Vec<Dependency<A>>, bool) {
		(self.dependencies, self.recursive)
	}
}

/// Appends `added` to `known`, rejecting names already present.
pub(crate) fn merge<A: Address>(mut known: Vec<Dependency<A>>, added: Vec<Dependency<A>>) -> Result<Vec<Dependency<A>>> {
	for dependency in added {
		if known.iter().any(|existing| existing.name == dependency.name) {
			return Err(GraphError::DuplicateDependency(dependency.name));
		}
		known.push(dependency);
	}
	Ok(known)
}

/// One built dependency as seen by a builder.
#[derive(Debug, Clone)]
pub struct BuiltDependency<A: Address> {
	name: String,
	address: A,
	value: Value,
	pinned: Option<ContextId>,
}

impl<A: Address> BuiltDependency<A> {
	/// Local name the dependency was declared under.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Address the value was built for.
	pub fn address(&self) -> &A {
		&self.address
	}

	/// The built value.
	pub fn value(&self) -> &Value {
		&self.value
	}

	/// Pinned context identifier, if the dependency was pinned.
	pub fn pinned_context_id(&self) -> Option<ContextId> {
		self.pinned
	}
}

/// Built values handed to a builder, keyed by local dependency name.
///
/// Iteration follows declaration order across all discovery rounds.
#[derive(Debug, Clone)]
pub struct BuiltDependencies<A: Address> {
	entries: IndexMap<String, BuiltDependency<A>>,
}

impl<A: Address> Default for BuiltDependencies<A> {
	fn default() -> Self {
		Self { entries: IndexMap::new() }
	}
}

impl<A: Address> BuiltDependencies<A> {
	pub(crate) fn insert(&mut self, dependency: &Dependency<A>, value: Value) -> Result<()> {
		if self.entries.contains_key(dependency.name()) {
			return Err(GraphError::DuplicateDependency(dependency.name().to_owned()));
		}
		self.entries.insert(
			dependency.name().to_owned(),
			BuiltDependency {
				name: dependency.name().to_owned(),
				address: dependency.address().clone(),
				value,
				pinned: dependency.pinned_context_id(),
			},
		);
		Ok(())
	}

	/// Looks up a dependency by name.
	pub fn get(&self, name: &str) -> Option<&BuiltDependency<A>> {
		self.entries.get(name)
	}

	/// Looks up a dependency by name, failing if it was never declared.
	pub fn require(&self, name: &str) -> Result<&Value> {
		self.entries
			.get(name)
			.map(BuiltDependency::value)
			.ok_or_else(|| GraphError::MissingDependency(name.to_owned()))
	}

	/// Borrows a dependency's value as a `T`.
	pub fn value<T: Any>(&self, name: &str) -> Result<&T> {
		self.require(name)?.downcast_ref::<T>().ok_or_else(|| GraphError::TypeMismatch {
			name: name.to_owned(),
			expected: std::any::type_name::<T>(),
		})
	}

	/// Number of built dependencies.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if no dependencies were declared.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Local names in declaration order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	/// `(name, dependency)` pairs in declaration order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &BuiltDependency<A>)> {
		self.entries.iter().map(|(name, dependency)| (name.as_str(), dependency))
	}
}
