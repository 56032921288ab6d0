//! Asynchronous dependency-graph construction over layered contexts.
//!
//! Callers ask a [`Context`] for an address. The context finds a [`Builder`]
//! through its [`Provider`] (or its parent layer), discovers the builder's
//! dependencies, builds those first and finally hands a [`BuildTask`] to the
//! context's [`Scheduler`]. Every address is built at most once per context,
//! however many dependents request it concurrently.
//!
//! # Layers
//!
//! A child context overrides some addresses and delegates the rest. A
//! delegated address reuses the parent's builder and dependency list, but its
//! value is built in the child, so [live](Dependency::live) dependencies see
//! the child's overrides while [pinned](Dependency::pinned) ones keep resolving
//! through the context they were declared against.
//!
//! # Observing progress
//!
//! [`Node`] exposes its [`NodeState`], blocking and async waits, and one-shot
//! callbacks for the two milestones: dependencies known, and built or failed.

#![warn(missing_docs)]

mod builder;
pub mod builders;
mod context;
mod cycle;
mod dependency;
mod discovery;
mod error;
mod guard;
mod join;
mod node;
mod scheduler;
mod value;

pub use builder::{BuildResult, Builder, Provider};
pub use context::{Context, ContextId};
pub use dependency::{BuiltDependencies, BuiltDependency, Dependency, DependencySet};
pub use error::{GraphError, Result};
pub use node::{Node, NodeState, Outcome};
pub use scheduler::{BuildTask, DiscoveryTask, FnScheduler, GraphTask, InlineScheduler, Scheduler};
pub use strata_worker::{PoolConfig, TaskClass, WorkerPool};
pub use value::{Address, Value};
