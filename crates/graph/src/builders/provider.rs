use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::FixedBuilder;
use crate::builder::{Builder, Provider};
use crate::value::{Address, Value};

/// Table-backed provider.
///
/// Fixed values take precedence over builders registered for the same
/// address. Entries may be added after the provider is installed in a
/// context; addresses already resolved keep their first outcome.
pub struct FixedProvider<A: Address> {
	values: RwLock<FxHashMap<A, Arc<FixedBuilder>>>,
	builders: RwLock<FxHashMap<A, Arc<dyn Builder<A>>>>,
}

impl<A: Address> Default for FixedProvider<A> {
	fn default() -> Self {
		Self {
			values: RwLock::new(FxHashMap::default()),
			builders: RwLock::new(FxHashMap::default()),
		}
	}
}

impl<A: Address> FixedProvider<A> {
	/// Creates an empty provider.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a fixed value.
	pub fn with_value<T: Any + Send + Sync>(self, address: A, value: T) -> Self {
		self.insert_value(address, Value::new(value));
		self
	}

	/// Registers a builder.
	pub fn with_builder(self, address: A, builder: impl Builder<A> + 'static) -> Self {
		self.insert_builder(address, Arc::new(builder));
		self
	}

	/// Registers a fixed value on a shared provider.
	pub fn insert_value(&self, address: A, value: Value) {
		self.values.write().insert(address, Arc::new(FixedBuilder::from_value(value)));
	}

	/// Registers a builder on a shared provider.
	pub fn insert_builder(&self, address: A, builder: Arc<dyn Builder<A>>) {
		self.builders.write().insert(address, builder);
	}

	/// The fixed value registered for `address`, if any.
	pub fn fixed_value(&self, address: &A) -> Option<Value> {
		self.values.read().get(address).map(|fixed| fixed.value().clone())
	}

	/// Returns true if any entry exists for `address`.
	pub fn contains(&self, address: &A) -> bool {
		self.values.read().contains_key(address) || self.builders.read().contains_key(address)
	}
}

impl<A: Address> Provider<A> for FixedProvider<A> {
	fn builder(&self, address: &A) -> Option<Arc<dyn Builder<A>>> {
		if let Some(fixed) = self.values.read().get(address) {
			return Some(Arc::clone(fixed) as Arc<dyn Builder<A>>);
		}
		self.builders.read().get(address).cloned()
	}
}

impl<A: Address> fmt::Debug for FixedProvider<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FixedProvider")
			.field("values", &self.values.read().len())
			.field("builders", &self.builders.read().len())
			.finish()
	}
}

/// Provider backed by a lookup closure.
pub struct FnProvider<A: Address> {
	lookup: Box<dyn Fn(&A) -> Option<Arc<dyn Builder<A>>> + Send + Sync>,
}

impl<A: Address> FnProvider<A> {
	/// Wraps a lookup closure.
	pub fn new(lookup: impl Fn(&A) -> Option<Arc<dyn Builder<A>>> + Send + Sync + 'static) -> Self {
		Self { lookup: Box::new(lookup) }
	}

	/// Provider that never supplies a builder.
	pub fn empty() -> Self {
		Self::new(|_| None)
	}
}

impl<A: Address> Provider<A> for FnProvider<A> {
	fn builder(&self, address: &A) -> Option<Arc<dyn Builder<A>>> {
		(self.lookup)(address)
	}
}

impl<A: Address> fmt::Debug for FnProvider<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnProvider").finish_non_exhaustive()
	}
}
