//! Flows that can be shared between threads.
//!
//! Same semantics as [`crate::rc`]; values and observers must be
//! `Send + Sync`, and each flow serializes its emits.

mod async_flow;
mod flow;
mod future;
mod registry;

pub use async_flow::{AsyncFlow, ReadAsyncFlow, WeakAsyncFlow, WeakReadAsyncFlow};
pub use flow::{Flow, ReadFlow, WeakFlow, WeakReadFlow};
pub use future::DataFuture;
pub use registry::Subscription;

use crate::{AsyncState, Cause, Outcome};

pub trait Observable<T>: Send + Sync {
	fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + Send + Sync + 'static,
		R: Outcome;

	fn with_snapshot<R>(&self, func: impl FnOnce(&T) -> R) -> R;

	fn get_snapshot(&self) -> T
	where
		T: Clone,
	{
		self.with_snapshot(T::clone)
	}
}

pub trait AsyncObservable<T>: Observable<AsyncState<T>> {
	fn as_future(&self) -> DataFuture<T>;

	fn data_snapshot(&self) -> Option<Result<T, Cause>>
	where
		T: Clone,
	{
		futures::FutureExt::now_or_never(self.as_future())
	}
}

pub fn create_flow<T: Send + Sync + 'static>(value: T) -> Flow<T> {
	Flow::new(value)
}

pub fn create_async_flow<T: Clone + Send + Sync + 'static>(state: AsyncState<T>) -> AsyncFlow<T> {
	AsyncFlow::new(state)
}
