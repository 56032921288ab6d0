/// Execution classes used for worker logging and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Dependency discovery deferred off the requesting thread.
	Discovery,
	/// Final value construction once every dependency is built.
	Build,
}

impl TaskClass {
	/// Stable lowercase name used in log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Discovery => "discovery",
			Self::Build => "build",
		}
	}
}
