use std::fmt::Debug;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::Mutex;

use crate::arc::flow::FlowBody;
use crate::arc::future::DataFuture;
use crate::arc::registry::Subscription;
use crate::arc::{AsyncObservable, Observable};
use crate::state::ends_epoch;
use crate::{AsyncState, Cause, EmitError, Outcome};

/// Thread-safe [`AsyncFlow`](crate::rc::AsyncFlow).
///
/// `emit` and `as_future` share the flow's emit gate, so a future is never
/// built from a state that another thread is in the middle of replacing.
pub struct AsyncFlow<T> {
	body: Arc<AsyncFlowBody<T>>,
}

pub(crate) struct AsyncFlowBody<T> {
	flow: FlowBody<AsyncState<T>>,
	cached: Mutex<Option<DataFuture<T>>>,
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
	T: Clone + Send + Sync + 'static,
{
	fn default() -> Self {
		AsyncFlow::pending()
	}
}

impl<T> AsyncFlow<T>
where
	T: Clone + Send + Sync + 'static,
{
	pub fn new(state: AsyncState<T>) -> Self {
		AsyncFlow {
			body: Arc::new_cyclic(|this| AsyncFlowBody {
				flow: FlowBody::new(state),
				cached: Mutex::new(None),
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
		F: Fn() -> R + Send + Sync + 'static,
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

	/// See [`Flow::downgrade`](crate::arc::Flow::downgrade).
	pub fn downgrade(&self) -> WeakAsyncFlow<T> {
		WeakAsyncFlow {
			body: Arc::downgrade(&self.body),
		}
	}
}

impl<T> AsyncFlowBody<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn emit(&self, state: AsyncState<T>) -> Result<(), EmitError> {
		let _gate = self.flow.gate();

		let prev = self.flow.with_snapshot(AsyncState::status);
		let next = state.status();

		if ends_epoch(prev, next) && self.cached.lock().take().is_some() {
			tracing::debug!(?prev, ?next, "future cache invalidated");
		}

		self.flow.emit(state)
	}

	fn as_future(&self) -> DataFuture<T> {
		let _gate = self.flow.gate();
		let mut cached = self.cached.lock();

		if let Some(future) = &*cached {
			return future.clone();
		}

		let future = match self.flow.with_snapshot(AsyncState::to_result) {
			Some(result) => DataFuture::settled(result),
			None => self.wait_for_resolution(),
		};

		*cached = Some(future.clone());
		future
	}

	fn wait_for_resolution(&self) -> DataFuture<T> {
		let future = DataFuture::new();
		let handle: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

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

				if let Some(subscription) = handle.lock().take() {
					subscription.cancel();
				}
			}
		});

		*handle.lock() = Some(subscription);
		future
	}
}

/// Read-only view of an [`arc::AsyncFlow`](AsyncFlow).
pub struct ReadAsyncFlow<T> {
	body: Arc<AsyncFlowBody<T>>,
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
	T: Clone + Send + Sync + 'static,
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
		F: Fn() -> R + Send + Sync + 'static,
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
			body: Arc::downgrade(&self.body),
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

impl<T: Clone + Send + Sync + 'static> Observable<AsyncState<T>> for AsyncFlow<T> {
	fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + Send + Sync + 'static,
		R: Outcome,
	{
		AsyncFlow::subscribe(self, observer)
	}

	fn with_snapshot<R>(&self, func: impl FnOnce(&AsyncState<T>) -> R) -> R {
		AsyncFlow::with_snapshot(self, func)
	}
}

impl<T: Clone + Send + Sync + 'static> AsyncObservable<T> for AsyncFlow<T> {
	fn as_future(&self) -> DataFuture<T> {
		AsyncFlow::as_future(self)
	}
}

impl<T: Clone + Send + Sync + 'static> Observable<AsyncState<T>> for ReadAsyncFlow<T> {
	fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + Send + Sync + 'static,
		R: Outcome,
	{
		ReadAsyncFlow::subscribe(self, observer)
	}

	fn with_snapshot<R>(&self, func: impl FnOnce(&AsyncState<T>) -> R) -> R {
		ReadAsyncFlow::with_snapshot(self, func)
	}
}

impl<T: Clone + Send + Sync + 'static> AsyncObservable<T> for ReadAsyncFlow<T> {
	fn as_future(&self) -> DataFuture<T> {
		ReadAsyncFlow::as_future(self)
	}
}

impl<T> Debug for AsyncFlow<T>
where
	T: Debug + Clone + Send + Sync + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.with_snapshot(|state| state.fmt(f))
	}
}

impl<T> Debug for ReadAsyncFlow<T>
where
	T: Debug + Clone + Send + Sync + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.with_snapshot(|state| state.fmt(f))
	}
}
