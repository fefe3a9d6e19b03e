//! Single-threaded flows built on `Rc` and `RefCell`.

mod async_flow;
mod flow;
mod future;
mod registry;

pub use async_flow::{AsyncFlow, ReadAsyncFlow, WeakAsyncFlow, WeakReadAsyncFlow};
pub use flow::{Flow, ReadFlow, WeakFlow, WeakReadFlow};
pub use future::DataFuture;
pub use registry::Subscription;

use crate::{AsyncState, Cause, Outcome};

/// Read side of a flow: observe it and read its current value.
pub trait Observable<T> {
	/// Registers `observer`, to be called after every `emit`.
	///
	/// Observers take no arguments and read the new value through the flow.
	/// Registering the same closure twice creates two registrations.
	fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + 'static,
		R: Outcome;

	fn with_snapshot<R>(&self, func: impl FnOnce(&T) -> R) -> R;

	fn get_snapshot(&self) -> T
	where
		T: Clone,
	{
		self.with_snapshot(T::clone)
	}
}

/// Read side of an async flow.
pub trait AsyncObservable<T>: Observable<AsyncState<T>> {
	fn as_future(&self) -> DataFuture<T>;

	/// Output of the current future if it has already settled.
	fn data_snapshot(&self) -> Option<Result<T, Cause>>
	where
		T: Clone,
	{
		futures::FutureExt::now_or_never(self.as_future())
	}
}

pub fn create_flow<T: 'static>(value: T) -> Flow<T> {
	Flow::new(value)
}

pub fn create_async_flow<T: Clone + 'static>(state: AsyncState<T>) -> AsyncFlow<T> {
	AsyncFlow::new(state)
}
