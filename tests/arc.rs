use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use flow::arc::{
	create_async_flow, create_flow, AsyncFlow, Flow, Observable, ReadAsyncFlow, Subscription,
};
use flow::{observer, AsyncState, Cause};
use futures::executor::block_on;
use futures::FutureExt;
use mockall::Sequence;
use parking_lot::Mutex;

mod mock;

use mock::SharedListener;

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::TRACE)
		.with_test_writer()
		.try_init();
}

#[test]
fn flows_are_send_and_sync() {
	fn assert_send_sync<T: Send + Sync>() {}

	assert_send_sync::<Flow<Vec<u8>>>();
	assert_send_sync::<AsyncFlow<String>>();
	assert_send_sync::<ReadAsyncFlow<String>>();
	assert_send_sync::<flow::arc::DataFuture<String>>();
	assert_send_sync::<flow::arc::Subscription>();
}

#[test]
fn observers_run_in_registration_order() {
	let flow = Flow::new(0u64);
	let listener = SharedListener::new();
	let mut seq = Sequence::new();

	for tag in 1..=3u64 {
		listener
			.get()
			.expect_heard()
			.with(mockall::predicate::eq(tag))
			.times(1)
			.in_sequence(&mut seq)
			.return_const(());
	}
	for tag in 1..=3u64 {
		flow.subscribe(observer!((listener) => listener.heard(tag)));
	}

	flow.emit(1).unwrap();
	listener.checkpoint();
}

#[test]
fn emitting_the_same_value_notifies_every_time() {
	let flow = Flow::new(7u64);
	let listener = SharedListener::new();
	let weak = flow.downgrade();

	flow.subscribe(observer!((weak, listener) => {
		if let Some(flow) = weak.upgrade() {
			listener.heard(flow.get_snapshot());
		}
	}));

	listener.expect_value(7, 2);
	flow.emit(7).unwrap();
	flow.emit(7).unwrap();
	listener.checkpoint();
}

#[test]
fn observers_added_during_a_pass_wait_for_the_next_emit() {
	let flow = Flow::new(0u64);
	let listener = SharedListener::new();
	let added = Arc::new(AtomicBool::new(false));
	let weak = flow.downgrade();

	flow.subscribe(observer!((weak, listener, added) => {
		let Some(flow) = weak.upgrade() else { return };
		if !added.swap(true, Ordering::SeqCst) {
			flow.subscribe(observer!((weak, listener) => {
				if let Some(flow) = weak.upgrade() {
					listener.heard(flow.get_snapshot());
				}
			}));
		}
	}));

	listener.expect_value(1, 0);
	flow.emit(1).unwrap();
	listener.checkpoint();

	listener.expect_value(2, 1);
	flow.emit(2).unwrap();
	listener.checkpoint();

	assert_eq!(flow.observer_count(), 2);
}

#[test]
fn cancelling_a_later_observer_skips_it_in_the_current_pass() {
	let flow = Flow::new(0u64);
	let calls = Arc::new(Mutex::new(Vec::new()));
	let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

	flow.subscribe(observer!((calls, victim) => {
		calls.lock().push("canceller");
		if let Some(subscription) = victim.lock().as_ref() {
			subscription.cancel();
		}
	}));

	let subscription = flow.subscribe(observer!((calls) => calls.lock().push("victim")));
	*victim.lock() = Some(subscription);

	flow.emit(1).unwrap();
	flow.emit(2).unwrap();

	assert_eq!(*calls.lock(), vec!["canceller", "canceller"]);
	assert_eq!(flow.observer_count(), 1);
}

#[test]
fn pending_callers_share_one_future_until_a_later_pass_resolves() {
	let flow = AsyncFlow::<u32>::pending();

	let a = flow.as_future();
	let b = flow.as_read_only().as_future();
	assert!(a.ptr_eq(&b));
	assert_eq!(flow.observer_count(), 1);

	flow.emit(AsyncState::Pending).unwrap();
	assert!(!a.is_settled());
	assert!(flow.as_future().ptr_eq(&a));

	flow.resolve(7).unwrap();
	assert_eq!(b.clone().now_or_never().map(Result::ok), Some(Some(7)));
	assert!(flow.as_future().ptr_eq(&a));
	assert_eq!(flow.observer_count(), 0);
}

#[test]
fn pending_then_success_end_to_end() {
	let flow = AsyncFlow::<u64>::pending();
	let listener = SharedListener::new();
	let weak = flow.downgrade();

	flow.subscribe(observer!((weak, listener) => {
		let Some(flow) = weak.upgrade() else { return };
		let value = match flow.get_snapshot() {
			AsyncState::Pending => 0,
			AsyncState::Success { data } => data,
			AsyncState::Error { .. } => u64::MAX,
		};
		listener.heard(value);
	}));

	let future = flow.as_future();

	listener.expect_value(0, 1);
	flow.emit(AsyncState::Pending).unwrap();
	listener.checkpoint();
	assert!(!future.is_settled());

	listener.expect_value(42, 1);
	let producer = thread::spawn({
		let flow = flow.clone();
		move || flow.emit(AsyncState::success(42)).unwrap()
	});

	assert_eq!(block_on(future.clone()).ok(), Some(42));
	producer.join().unwrap();
	listener.checkpoint();

	assert!(flow.as_future().ptr_eq(&future));
}

struct Tracked(Arc<AtomicBool>);

impl Drop for Tracked {
	fn drop(&mut self) {
		self.0.store(true, Ordering::SeqCst);
	}
}

#[test]
fn observers_holding_a_weak_handle_let_the_flow_drop() {
	let dropped = Arc::new(AtomicBool::new(false));
	let flow = Flow::new(Tracked(dropped.clone()));
	let weak = flow.downgrade();
	let reads = Arc::new(AtomicUsize::new(0));

	let subscription = flow.subscribe(observer!((weak, reads) => {
		if let Some(flow) = weak.upgrade() {
			flow.with_snapshot(|_| reads.fetch_add(1, Ordering::SeqCst));
		}
	}));

	flow.emit(Tracked(Arc::new(AtomicBool::new(false)))).unwrap();
	assert_eq!(reads.load(Ordering::SeqCst), 1);
	assert!(dropped.load(Ordering::SeqCst));

	let current = Arc::new(AtomicBool::new(false));
	flow.emit(Tracked(current.clone())).unwrap();
	thread::spawn(move || std::mem::drop(flow)).join().unwrap();

	assert!(current.load(Ordering::SeqCst));
	assert!(weak.upgrade().is_none());
	assert!(!subscription.is_active());
}

#[test]
fn future_resolves_from_another_thread() {
	init_tracing();

	let flow = AsyncFlow::<u64>::pending();
	let future = flow.as_future();

	let producer = thread::spawn({
		let flow = flow.clone();
		move || {
			flow.emit(AsyncState::Pending).unwrap();
			flow.resolve(42).unwrap();
		}
	});

	assert_eq!(block_on(future).ok(), Some(42));
	producer.join().unwrap();

	assert!(flow.as_future().is_settled());
	assert_eq!(flow.observer_count(), 0);
}

#[test]
fn concurrent_emits_are_serialized() {
	const THREADS: usize = 4;
	const EMITS: usize = 50;

	let flow = create_flow(0usize);
	let running = Arc::new(AtomicUsize::new(0));
	let overlaps = Arc::new(AtomicUsize::new(0));
	let calls = Arc::new(AtomicUsize::new(0));

	flow.subscribe(observer!((running, overlaps, calls) => {
		if running.fetch_add(1, Ordering::SeqCst) != 0 {
			overlaps.fetch_add(1, Ordering::SeqCst);
		}
		calls.fetch_add(1, Ordering::SeqCst);
		running.fetch_sub(1, Ordering::SeqCst);
	}));

	let barrier = Arc::new(Barrier::new(THREADS));
	let workers: Vec<_> = (0..THREADS)
		.map(|n| {
			let flow = flow.clone();
			let barrier = barrier.clone();
			thread::spawn(move || {
				barrier.wait();
				for i in 0..EMITS {
					flow.emit(n * EMITS + i).unwrap();
				}
			})
		})
		.collect();

	for worker in workers {
		worker.join().unwrap();
	}

	assert_eq!(calls.load(Ordering::SeqCst), THREADS * EMITS);
	assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn nested_emit_on_the_emitting_thread() {
	let flow = Flow::new(0u64);
	let seen = Arc::new(Mutex::new(Vec::new()));
	let weak = flow.downgrade();

	flow.subscribe(observer!((weak, seen) => {
		let Some(flow) = weak.upgrade() else { return };
		let value = flow.get_snapshot();
		seen.lock().push(value);
		if value < 3 {
			flow.emit(value + 1).unwrap();
		}
	}));

	flow.emit(1).unwrap();

	assert_eq!(*seen.lock(), vec![1, 2, 3]);
	assert_eq!(flow.get_snapshot(), 3);
}

#[test]
fn partial_failure_reports_every_cause() {
	let flow = Flow::new(0u64);
	let listener = SharedListener::new();
	let first = Cause::new("fail1");
	let second = Cause::new("fail2");

	flow.subscribe(observer!((listener) => listener.heard(1)));
	flow.subscribe(observer!((first) => Err::<(), _>(first.clone())));
	flow.subscribe(observer!((listener) => listener.heard(2)));
	flow.subscribe(observer!((second) => Err::<(), _>(second.clone())));

	listener.expect_value(1, 1);
	listener.expect_value(2, 1);

	let failures = flow.emit(5).unwrap_err().into_failures();
	listener.checkpoint();

	assert_eq!(failures.len(), 2);
	assert!(failures[0].ptr_eq(&first));
	assert!(failures[1].ptr_eq(&second));
	assert_eq!(flow.get_snapshot(), 5);
}

#[test]
fn cancelling_from_another_thread() {
	let flow = Flow::new(0u64);
	let calls = Arc::new(AtomicUsize::new(0));

	let subscription = flow.subscribe(observer!((calls) => {
		calls.fetch_add(1, Ordering::SeqCst);
	}));

	flow.emit(1).unwrap();
	thread::spawn(move || subscription.cancel()).join().unwrap();
	flow.emit(2).unwrap();

	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(flow.observer_count(), 0);
}

#[test]
fn epochs_match_the_single_threaded_flow() {
	let cause = Cause::new("denied");
	let flow = create_async_flow::<u32>(AsyncState::error(cause.clone()));

	let rejected = flow.as_future();
	match rejected.peek() {
		Some(Err(err)) => assert!(err.ptr_eq(&cause)),
		other => panic!("expected a rejection, got {:?}", other),
	}

	flow.reject(cause.clone()).unwrap();
	assert!(flow.as_future().ptr_eq(&rejected));

	flow.reset().unwrap();
	let pending = flow.as_future();
	assert!(!pending.ptr_eq(&rejected));
	assert!(flow.as_read_only().as_future().ptr_eq(&pending));

	flow.resolve(1).unwrap();
	assert_eq!(flow.data_snapshot().map(Result::ok), Some(Some(1)));
}

#[test]
fn read_only_view_across_threads() {
	let flow = Flow::new(String::from("start"));
	let view = flow.as_read_only();

	let reader = thread::spawn(move || {
		let total = Arc::new(AtomicUsize::new(0));
		let weak = view.downgrade();
		view.subscribe(observer!((weak, total) => {
			if let Some(view) = weak.upgrade() {
				total.fetch_add(view.with_snapshot(String::len), Ordering::SeqCst);
			}
		}));
		(view, total)
	});

	let (view, total) = reader.join().unwrap();
	flow.emit(String::from("four")).unwrap();

	assert_eq!(total.load(Ordering::SeqCst), 4);
	assert_eq!(Observable::get_snapshot(&view), "four");
}
