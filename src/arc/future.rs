use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::Cause;

/// Single-resolution future handed out by [`AsyncFlow::as_future`](super::AsyncFlow::as_future).
///
/// `Send` when `T` is, so it can be awaited on another thread or runtime
/// than the one that emits.
pub struct DataFuture<T> {
	slot: Arc<Mutex<Slot<T>>>,
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
			slot: Arc::new(Mutex::new(Slot::Waiting(SmallVec::new()))),
		}
	}

	pub(crate) fn settled(result: Result<T, Cause>) -> Self {
		DataFuture {
			slot: Arc::new(Mutex::new(Slot::Settled(result))),
		}
	}

	pub(crate) fn settle(&self, result: Result<T, Cause>) -> bool {
		let wakers = {
			let mut slot = self.slot.lock();
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
		Arc::ptr_eq(&self.slot, &other.slot)
	}

	pub fn is_settled(&self) -> bool {
		matches!(&*self.slot.lock(), Slot::Settled(_))
	}

	pub fn peek(&self) -> Option<Result<T, Cause>>
	where
		T: Clone,
	{
		match &*self.slot.lock() {
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
		let mut slot = self.slot.lock();
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
		match &*self.slot.lock() {
			Slot::Settled(result) => f.debug_tuple("DataFuture").field(result).finish(),
			Slot::Waiting(_) => f.write_str("DataFuture(<pending>)"),
		}
	}
}
