use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use futures::FutureExt;

use crate::rc::flow::FlowBody;
use crate::rc::future::DataFuture;
use crate::rc::registry::Subscription;
use crate::rc::{AsyncObservable, Observable};
use crate::state::ends_epoch;
use crate::{AsyncState, Cause, EmitError, Outcome};

/// A flow over [`AsyncState`] that can also be awaited.
///
/// [`AsyncFlow::as_future`] hands out one [`DataFuture`] per resolution
/// epoch. The cached future is dropped only when the state leaves
/// `Success` or `Error` for a different status, so re-emitting the same
/// status keeps the future that callers may already hold.
pub struct AsyncFlow<T> {
	body: Rc<AsyncFlowBody<T>>,
}

pub(crate) struct AsyncFlowBody<T> {
	flow: FlowBody<AsyncState<T>>,
	cached: RefCell<Option<DataFuture<T>>>,
	this: Weak<AsyncFlowBody<T>>,
}

impl<T> Clone for AsyncFlow<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for AsyncFlow<T>
where
	T: Clone + 'static,
{
	fn default() -> Self {
		AsyncFlow::pending()
	}
}

impl<T> AsyncFlow<T>
where
	T: Clone + 'static,
{
	pub fn new(state: AsyncState<T>) -> Self {
		AsyncFlow {
			body: Rc::new_cyclic(|this| AsyncFlowBody {
				flow: FlowBody::new(state),
				cached: RefCell::new(None),
				this: this.clone(),
			}),
		}
	}

	pub fn pending() -> Self {
		AsyncFlow::new(AsyncState::Pending)
	}

	#[inline]
	pub fn emit(&self, state: AsyncState<T>) -> Result<(), EmitError> {
		self.body.emit(state)
	}

	#[inline]
	pub fn resolve(&self, data: T) -> Result<(), EmitError> {
		self.emit(AsyncState::Success { data })
	}

	#[inline]
	pub fn reject(&self, cause: impl Into<Cause>) -> Result<(), EmitError> {
		self.emit(AsyncState::error(cause))
	}

	#[inline]
	pub fn reset(&self) -> Result<(), EmitError> {
		self.emit(AsyncState::Pending)
	}

	#[inline]
	pub fn as_future(&self) -> DataFuture<T> {
		self.body.as_future()
	}

	#[inline]
	pub fn data_snapshot(&self) -> Option<Result<T, Cause>> {
		self.body.as_future().now_or_never()
	}

	#[inline]
	pub fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + 'static,
		R: Outcome,
	{
		self.body.flow.subscribe(observer)
	}

	#[inline]
	pub fn get_snapshot(&self) -> AsyncState<T> {
		self.body.flow.get_snapshot()
	}

	#[inline]
	pub fn with_snapshot<R>(&self, func: impl FnOnce(&AsyncState<T>) -> R) -> R {
		self.body.flow.with_snapshot(func)
	}

	#[inline]
	pub fn observer_count(&self) -> usize {
		self.body.flow.observer_count()
	}

	pub fn as_read_only(&self) -> ReadAsyncFlow<T> {
		ReadAsyncFlow {
			body: self.body.clone(),
		}
	}

	/// See [`Flow::downgrade`](crate::rc::Flow::downgrade).
	pub fn downgrade(&self) -> WeakAsyncFlow<T> {
		WeakAsyncFlow {
			body: Rc::downgrade(&self.body),
		}
	}
}

impl<T> AsyncFlowBody<T>
where
	T: Clone + 'static,
{
	fn emit(&self, state: AsyncState<T>) -> Result<(), EmitError> {
		let prev = self.flow.with_snapshot(AsyncState::status);
		let next = state.status();

		if ends_epoch(prev, next) && self.cached.borrow_mut().take().is_some() {
			tracing::debug!(?prev, ?next, "future cache invalidated");
		}

		self.flow.emit(state)
	}

	fn as_future(&self) -> DataFuture<T> {
		if let Some(future) = &*self.cached.borrow() {
			return future.clone();
		}

		let future = match self.flow.with_snapshot(AsyncState::to_result) {
			Some(result) => DataFuture::settled(result),
			None => self.wait_for_resolution(),
		};

		*self.cached.borrow_mut() = Some(future.clone());
		future
	}

	/// An unsettled future that settles on the first resolved state seen by
	/// a later notification pass.
	fn wait_for_resolution(&self) -> DataFuture<T> {
		let future = DataFuture::new();
		let handle: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

		let subscription = self.flow.subscribe({
			let this = self.this.clone();
			let future = future.clone();
			let handle = handle.clone();
			move || {
				let Some(this) = this.upgrade() else {
					return;
				};

				let Some(result) = this.flow.with_snapshot(AsyncState::to_result) else {
					return;
				};

				if future.settle(result) {
					tracing::debug!("future settled");
				}

				if let Some(subscription) = handle.borrow_mut().take() {
					subscription.cancel();
				}
			}
		});

		*handle.borrow_mut() = Some(subscription);
		future
	}
}

/// Read-only view of an [`AsyncFlow`].
pub struct ReadAsyncFlow<T> {
	body: Rc<AsyncFlowBody<T>>,
}

impl<T> Clone for ReadAsyncFlow<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> ReadAsyncFlow<T>
where
	T: Clone + 'static,
{
	#[inline]
	pub fn as_future(&self) -> DataFuture<T> {
		self.body.as_future()
	}

	#[inline]
	pub fn data_snapshot(&self) -> Option<Result<T, Cause>> {
		self.body.as_future().now_or_never()
	}

	#[inline]
	pub fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + 'static,
		R: Outcome,
	{
		self.body.flow.subscribe(observer)
	}

	#[inline]
	pub fn get_snapshot(&self) -> AsyncState<T> {
		self.body.flow.get_snapshot()
	}

	#[inline]
	pub fn with_snapshot<R>(&self, func: impl FnOnce(&AsyncState<T>) -> R) -> R {
		self.body.flow.with_snapshot(func)
	}

	#[inline]
	pub fn observer_count(&self) -> usize {
		self.body.flow.observer_count()
	}

	pub fn downgrade(&self) -> WeakReadAsyncFlow<T> {
		WeakReadAsyncFlow {
			body: Rc::downgrade(&self.body),
		}
	}
}

/// Non-owning handle to an [`AsyncFlow`].
pub struct WeakAsyncFlow<T> {
	body: Weak<AsyncFlowBody<T>>,
}

impl<T> Clone for WeakAsyncFlow<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> WeakAsyncFlow<T> {
	pub fn upgrade(&self) -> Option<AsyncFlow<T>> {
		self.body.upgrade().map(|body| AsyncFlow { body })
	}
}

/// Non-owning handle to a [`ReadAsyncFlow`].
pub struct WeakReadAsyncFlow<T> {
	body: Weak<AsyncFlowBody<T>>,
}

impl<T> Clone for WeakReadAsyncFlow<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> WeakReadAsyncFlow<T> {
	pub fn upgrade(&self) -> Option<ReadAsyncFlow<T>> {
		self.body.upgrade().map(|body| ReadAsyncFlow { body })
	}
}

impl<T> From<AsyncFlow<T>> for ReadAsyncFlow<T> {
	fn from(flow: AsyncFlow<T>) -> Self {
		ReadAsyncFlow { body: flow.body }
	}
}

impl<T: Clone + 'static> Observable<AsyncState<T>> for AsyncFlow<T> {
	fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + 'static,
		R: Outcome,
	{
		AsyncFlow::subscribe(self, observer)
	}

	fn with_snapshot<R>(&self, func: impl FnOnce(&AsyncState<T>) -> R) -> R {
		AsyncFlow::with_snapshot(self, func)
	}
}

impl<T: Clone + 'static> AsyncObservable<T> for AsyncFlow<T> {
	fn as_future(&self) -> DataFuture<T> {
		AsyncFlow::as_future(self)
	}
}

impl<T: Clone + 'static> Observable<AsyncState<T>> for ReadAsyncFlow<T> {
	fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + 'static,
		R: Outcome,
	{
		ReadAsyncFlow::subscribe(self, observer)
	}

	fn with_snapshot<R>(&self, func: impl FnOnce(&AsyncState<T>) -> R) -> R {
		ReadAsyncFlow::with_snapshot(self, func)
	}
}

impl<T: Clone + 'static> AsyncObservable<T> for ReadAsyncFlow<T> {
	fn as_future(&self) -> DataFuture<T> {
		ReadAsyncFlow::as_future(self)
	}
}

impl<T> Debug for AsyncFlow<T>
where
	T: Debug + Clone + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.with_snapshot(|state| state.fmt(f))
	}
}

impl<T> Debug for ReadAsyncFlow<T>
where
	T: Debug + Clone + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.with_snapshot(|state| state.fmt(f))
	}
}
