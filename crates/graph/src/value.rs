use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Key identifying one buildable item.
///
/// Blanket-implemented for every type with the required bounds, so plain
/// integers, strings and tuples work as addresses directly.
pub trait Address: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Address for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Type-erased, cheaply clonable built value.
///
/// One context may hold values of unrelated types; consumers recover the
/// concrete type with [`Value::downcast_ref`] or [`Value::downcast`].
#[derive(Clone)]
pub struct Value {
	inner: Arc<dyn Any + Send + Sync>,
	type_name: &'static str,
}

impl Value {
	/// Wraps a concrete value.
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self::from_arc(Arc::new(value))
	}

	/// Wraps an already shared value without copying it.
	pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
		Self {
			inner: value,
			type_name: std::any::type_name::<T>(),
		}
	}

	/// Returns true if the stored value is a `T`.
	pub fn is<T: Any>(&self) -> bool {
		self.inner.is::<T>()
	}

	/// Borrows the stored value as a `T`.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.inner.downcast_ref::<T>()
	}

	/// Returns a shared handle to the stored value as a `T`.
	pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		Arc::clone(&self.inner).downcast::<T>().ok()
	}

	/// Name of the stored type, for diagnostics.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Returns true if both handles point at the same allocation.
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Arc::ptr_eq(&a.inner, &b.inner)
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Value").field(&self.type_name).finish()
	}
}
