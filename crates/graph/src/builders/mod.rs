//! Ready-made [`Builder`](crate::Builder) and [`Provider`](crate::Provider) implementations.

mod fixed;
mod func;
mod provider;

pub use fixed::FixedBuilder;
pub use func::FnBuilder;
pub use provider::{FixedProvider, FnProvider};
