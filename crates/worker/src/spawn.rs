use crate::TaskClass;

/// Spawns a dedicated named OS thread for one pool worker.
pub(crate) fn spawn_named_thread<F>(name: String, index: usize, f: F) -> std::io::Result<std::thread::JoinHandle<()>>
where
	F: FnOnce() + Send + 'static,
{
	tracing::trace!(worker = index, thread = %name, "worker.spawn_named_thread");
	std::thread::Builder::new().name(name).spawn(f)
}

/// Logs the class of a task about to run.
pub(crate) fn trace_dispatch(index: usize, class: TaskClass) {
	tracing::trace!(worker = index, worker_class = class.as_str(), "worker.dispatch");
}
