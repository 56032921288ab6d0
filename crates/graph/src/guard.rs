//! Panic containment around user callbacks.

use std::panic::{AssertUnwindSafe, catch_unwind};

use strata_worker::panic_message;

use crate::error::GraphError;

/// Runs builder code, mapping both returned errors and panics to a failure cause.
pub(crate) fn builder_call<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, GraphError> {
	match catch_unwind(AssertUnwindSafe(f)) {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(err)) => Err(GraphError::Builder(err)),
		Err(payload) => Err(GraphError::Panicked(panic_message(&*payload))),
	}
}

/// Runs infallible user code, mapping a panic to a failure cause.
pub(crate) fn user_call<T>(f: impl FnOnce() -> T) -> Result<T, GraphError> {
	catch_unwind(AssertUnwindSafe(f)).map_err(|payload| GraphError::Panicked(panic_message(&*payload)))
}
