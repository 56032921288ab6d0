mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::{Kind, TIMEOUT, joined, text, values};
use pretty_assertions::assert_eq;
use rstest::rstest;
use strata_graph::builders::{FnBuilder, FnProvider};
use strata_graph::{Builder, Context, DependencySet, NodeState, Value, WorkerPool};

fn counted_leaf(counter: &Arc<AtomicUsize>) -> Arc<FnBuilder<i32>> {
	let counter = Arc::clone(counter);
	Arc::new(FnBuilder::<i32>::leaf(move |_, address| {
		counter.fetch_add(1, Ordering::SeqCst);
		Ok(Value::new(address.to_string()))
	}))
}

/// Must create exactly one node per address per context under contention.
///
/// - Enforced in: `Context::resolve`
/// - Failure symptom: duplicate builds and dependents holding diverging values.
#[test]
fn concurrent_resolves_share_one_node() {
	let discoveries = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&discoveries);
	let provider = values(&[]);
	provider.insert_builder(
		1,
		Arc::new(FnBuilder::<i32>::new(
			move |_, _| {
				counter.fetch_add(1, Ordering::SeqCst);
				Ok(None)
			},
			|_, _, _| Ok(Value::new(String::from("1"))),
		)),
	);
	let cx = Context::root(provider, Kind::Pool.scheduler());
	let barrier = Barrier::new(8);

	let nodes: Vec<_> = thread::scope(|scope| {
		let handles: Vec<_> = (0..8)
			.map(|_| {
				scope.spawn(|| {
					barrier.wait();
					cx.build(&1)
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().expect("resolver thread")).collect()
	});

	assert!(nodes.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
	assert_eq!(text(&nodes[0]), "1");
	assert_eq!(discoveries.load(Ordering::SeqCst), 1);
	assert_eq!(cx.len(), 1);
}

#[rstest]
#[case::pool(Kind::Pool)]
#[case::inline(Kind::Inline)]
fn shared_dependency_builds_once(#[case] kind: Kind) {
	let builds = Arc::new(AtomicUsize::new(0));
	let provider = values(&[]);
	provider.insert_builder(0, counted_leaf(&builds));
	provider.insert_builder(1, joined(&[0]));
	provider.insert_builder(2, joined(&[0]));
	provider.insert_builder(3, joined(&[1, 2]));
	let cx = Context::root(provider, kind.scheduler());

	assert_eq!(text(&cx.build(&3)), "3-1-0-2-0");
	assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn repeated_build_requests_run_the_builder_once() {
	let builds = Arc::new(AtomicUsize::new(0));
	let provider = values(&[]);
	provider.insert_builder(1, counted_leaf(&builds));
	let cx = Context::root(provider, Kind::Pool.scheduler());
	let node = cx.resolve(&1);

	thread::scope(|scope| {
		for _ in 0..8 {
			scope.spawn(|| node.request_build());
		}
	});

	assert_eq!(text(&node), "1");
	assert!(node.is_build_requested());
	assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn layers_build_delegated_addresses_independently() {
	let builds = Arc::new(AtomicUsize::new(0));
	let provider = values(&[]);
	provider.insert_builder(1, counted_leaf(&builds));
	let parent = Context::root(provider, Kind::Pool.scheduler());
	let children: Vec<_> = (0..4).map(|_| parent.child(values(&[]))).collect();

	for child in &children {
		assert_eq!(text(&child.build(&1)), "1");
	}
	assert_eq!(builds.load(Ordering::SeqCst), children.len());
	assert_eq!(parent.cached(&1).map(|n| n.state()), Some(NodeState::DependenciesKnown));
}

#[test]
fn wide_fan_in_completes_exactly_once() {
	let provider = values(&[]);
	let width = 64;
	for address in 0..width {
		provider.insert_value(address, Value::new(address.to_string()));
	}
	let finished = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&finished);
	provider.insert_builder(
		1000,
		Arc::new(FnBuilder::<i32>::new(
			move |_, _| {
				let mut set = DependencySet::new();
				for address in 0..width {
					set.push(format!("dep{address}"), address)?;
				}
				Ok(Some(set))
			},
			move |_, _, built| {
				counter.fetch_add(1, Ordering::SeqCst);
				Ok(Value::new(built.len()))
			},
		)),
	);
	let cx = Context::root(provider, Kind::Pool.scheduler());

	let node = cx.build(&1000);
	assert!(node.wait_built_timeout(common::TIMEOUT));
	assert_eq!(node.value().and_then(|v| v.downcast_ref::<usize>()), Some(&64));
	assert_eq!(finished.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_waits_observe_pool_builds() {
	let provider = values(&[(0, "0")]);
	provider.insert_builder(1, joined(&[0]));
	let cx = Context::root(provider, Kind::Pool.scheduler());

	let node = cx.build(&1);
	assert_eq!(node.built().await, NodeState::Built);
	assert_eq!(node.dependencies_known().await, NodeState::Built);
	assert_eq!(text(&node), "1-0");
}

type Named = (&'static str, i32);

fn named_builder(address: &Named) -> Option<Arc<dyn Builder<Named>>> {
	match address.0 {
		"leaf" => Some(Arc::new(FnBuilder::<Named>::leaf(|_, address| Ok(Value::new(address.1))))),
		"sum" => Some(Arc::new(FnBuilder::<Named>::new(
			|_, address| {
				let mut set = DependencySet::new();
				for i in 0..address.1 {
					set.push(format!("leaf{i}"), ("leaf", i))?;
				}
				Ok(Some(set))
			},
			|_, _, built| {
				let mut total = 0;
				for (_, dependency) in built.iter() {
					total += dependency.value().downcast_ref::<i32>().copied().unwrap_or_default();
				}
				Ok(Value::new(total))
			},
		))),
		_ => None,
	}
}

#[test]
fn function_provider_builds_composite_addresses() {
	let cx = Context::root(
		Arc::new(FnProvider::new(named_builder)),
		Arc::new(WorkerPool::with_threads(4).expect("worker pool")),
	);

	let sum = cx.build(&("sum", 20));
	assert!(sum.wait_built_timeout(TIMEOUT));
	assert_eq!(sum.value().and_then(|v| v.downcast_ref::<i32>()), Some(&190));
	assert_eq!(cx.cached(&("leaf", 19)).map(|n| n.state()), Some(NodeState::Built));

	let missing = cx.build(&("missing", 0));
	assert!(missing.wait_built_timeout(TIMEOUT));
	assert_eq!(missing.state(), NodeState::NoBuilderAvailable);
}

/// Builds `0 <- 1 <- ... <- address`, each level adding one to its predecessor.
fn chain(asynchronous: bool) -> Arc<FnProvider<i32>> {
	let builder: Arc<dyn Builder<i32>> = Arc::new(
		FnBuilder::<i32>::new(
			|_, address| {
				if *address == 0 {
					return Ok(None);
				}
				let mut set = DependencySet::new();
				set.push("prev", *address - 1)?;
				Ok(Some(set))
			},
			|_, address, built| {
				let prev = if *address == 0 { -1 } else { *built.value::<i32>("prev")? };
				Ok(Value::new(prev + 1))
			},
		)
		.with_async_discovery(move |_| asynchronous),
	);
	Arc::new(FnProvider::new(move |_| Some(Arc::clone(&builder))))
}

#[rstest]
#[case::synchronous(false, 256)]
#[case::asynchronous(true, 5_000)]
fn deep_chains_build_on_the_pool(#[case] asynchronous: bool, #[case] depth: i32) {
	let cx = Context::root(chain(asynchronous), Kind::Pool.scheduler());

	let node = cx.build(&depth);
	assert!(node.wait_built_timeout(TIMEOUT), "chain of {depth} did not settle");
	assert_eq!(node.value().and_then(|v| v.downcast_ref::<i32>()), Some(&depth));
	assert_eq!(cx.len(), depth as usize + 1);
}
