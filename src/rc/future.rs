use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use smallvec::SmallVec;

use crate::Cause;

/// Single-resolution future handed out by [`AsyncFlow::as_future`](super::AsyncFlow::as_future).
///
/// Clones share one settlement slot: every clone resolves with a clone of the
/// same output, and [`DataFuture::ptr_eq`] tells whether two handles are the
/// same future.
pub struct DataFuture<T> {
	slot: Rc<RefCell<Slot<T>>>,
}

enum Slot<T> {
	Waiting(SmallVec<[Waker; 1]>),
	Settled(Result<T, Cause>),
}

impl<T> Clone for DataFuture<T> {
	fn clone(&self) -> Self {
		Self {
			slot: self.slot.clone(),
		}
	}
}

impl<T> DataFuture<T> {
	pub(crate) fn new() -> Self {
		DataFuture {
			slot: Rc::new(RefCell::new(Slot::Waiting(SmallVec::new()))),
		}
	}

	pub(crate) fn settled(result: Result<T, Cause>) -> Self {
		DataFuture {
			slot: Rc::new(RefCell::new(Slot::Settled(result))),
		}
	}

	/// Settles the future once; later calls are ignored and return `false`.
	pub(crate) fn settle(&self, result: Result<T, Cause>) -> bool {
		let wakers = {
			let mut slot = self.slot.borrow_mut();
			if let Slot::Settled(_) = &*slot {
				return false;
			}

			match std::mem::replace(&mut *slot, Slot::Settled(result)) {
				Slot::Waiting(wakers) => wakers,
				Slot::Settled(_) => SmallVec::new(),
			}
		};

		for waker in wakers {
			waker.wake();
		}

		true
	}

	#[inline]
	pub fn ptr_eq(&self, other: &DataFuture<T>) -> bool {
		Rc::ptr_eq(&self.slot, &other.slot)
	}

	pub fn is_settled(&self) -> bool {
		matches!(&*self.slot.borrow(), Slot::Settled(_))
	}

	/// The settled output, without registering interest.
	pub fn peek(&self) -> Option<Result<T, Cause>>
	where
		T: Clone,
	{
		match &*self.slot.borrow() {
			Slot::Settled(result) => Some(result.clone()),
			Slot::Waiting(_) => None,
		}
	}
}

impl<T> Future for DataFuture<T>
where
	T: Clone,
{
	type Output = Result<T, Cause>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let mut slot = self.slot.borrow_mut();
		match &mut *slot {
			Slot::Settled(result) => Poll::Ready(result.clone()),
			Slot::Waiting(wakers) => {
				if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
					wakers.push(cx.waker().clone());
				}
				Poll::Pending
			}
		}
	}
}

impl<T> std::fmt::Debug for DataFuture<T>
where
	T: std::fmt::Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &*self.slot.borrow() {
			Slot::Settled(result) => f.debug_tuple("DataFuture").field(result).finish(),
			Slot::Waiting(_) => f.write_str("DataFuture(<pending>)"),
		}
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::LocalPool;
	use futures::task::LocalSpawnExt;
	use futures::FutureExt;

	use super::*;

	#[test]
	fn settles_once() {
		let future = DataFuture::new();
		assert!(future.clone().now_or_never().is_none());

		assert!(future.settle(Ok(1)));
		assert!(!future.settle(Ok(2)));

		assert_eq!(future.now_or_never().map(|r| r.ok()), Some(Some(1)));
	}

	#[test]
	fn wakes_every_waiting_clone() {
		let future = DataFuture::<u32>::new();
		let seen = Rc::new(RefCell::new(Vec::new()));
		let mut pool = LocalPool::new();

		for _ in 0..3 {
			let future = future.clone();
			let seen = seen.clone();
			pool.spawner()
				.spawn_local(async move {
					if let Ok(value) = future.await {
						seen.borrow_mut().push(value);
					}
				})
				.unwrap();
		}

		pool.run_until_stalled();
		assert!(seen.borrow().is_empty());

		future.settle(Ok(5));
		pool.run_until_stalled();
		assert_eq!(*seen.borrow(), vec![5, 5, 5]);
	}

	#[test]
	fn rejection_keeps_cause() {
		let cause = Cause::new("boom");
		let future = DataFuture::<u32>::settled(Err(cause.clone()));

		match future.peek() {
			Some(Err(err)) => assert!(err.ptr_eq(&cause)),
			_ => panic!("expected a rejection"),
		}
	}
}
