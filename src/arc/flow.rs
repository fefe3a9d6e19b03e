use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::arc::registry::{notify, Registry, Subscription};
use crate::arc::Observable;
use crate::{EmitError, Outcome};

/// Thread-safe [`Flow`](crate::rc::Flow).
///
/// Emits on one flow are serialized: a second thread calling `emit` waits
/// until the running pass returns. An observer may still emit on the same
/// flow from the emitting thread; that nested pass completes before the
/// outer one resumes.
pub struct Flow<T> {
	body: Arc<FlowBody<T>>,
}

pub(crate) struct FlowBody<T> {
	value: RwLock<T>,
	registry: Arc<Mutex<Registry>>,
	gate: ReentrantMutex<()>,
}

impl<T> Clone for Flow<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for Flow<T>
where
	T: Default + Send + Sync + 'static,
{
	fn default() -> Self {
		Flow::new(Default::default())
	}
}

impl<T> Flow<T>
where
	T: Send + Sync + 'static,
{
	pub fn new(value: T) -> Self {
		Flow {
			body: Arc::new(FlowBody::new(value)),
		}
	}

	/// Stores `value` and notifies every registered observer.
	///
	/// Deadlocks if called from inside [`Flow::with_snapshot`].
	#[inline]
	pub fn emit(&self, value: T) -> Result<(), EmitError> {
		self.body.emit(value)
	}

	#[inline]
	pub fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + Send + Sync + 'static,
		R: Outcome,
	{
		self.body.subscribe(observer)
	}

	#[inline]
	pub fn get_snapshot(&self) -> T
	where
		T: Clone,
	{
		self.body.get_snapshot()
	}

	#[inline]
	pub fn with_snapshot<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		self.body.with_snapshot(func)
	}

	#[inline]
	pub fn observer_count(&self) -> usize {
		self.body.observer_count()
	}

	pub fn as_read_only(&self) -> ReadFlow<T> {
		ReadFlow {
			body: self.body.clone(),
		}
	}

	/// A handle that does not keep the flow alive.
	pub fn downgrade(&self) -> WeakFlow<T> {
		WeakFlow {
			body: Arc::downgrade(&self.body),
		}
	}
}

impl<T> FlowBody<T> {
	pub(crate) fn new(value: T) -> Self {
		FlowBody {
			value: RwLock::new(value),
			registry: Arc::new(Mutex::new(Registry::new())),
			gate: ReentrantMutex::new(()),
		}
	}

	/// Held for the whole of an emit. Re-entrant on the owning thread.
	pub(crate) fn gate(&self) -> ReentrantMutexGuard<'_, ()> {
		self.gate.lock()
	}

	pub(crate) fn emit(&self, value: T) -> Result<(), EmitError> {
		let _gate = self.gate();

		let prev = std::mem::replace(&mut *self.value.write(), value);
		std::mem::drop(prev);

		let snapshot = self.registry.lock().snapshot();
		tracing::trace!(observers = snapshot.len(), "emit");

		notify(snapshot)
	}

	pub(crate) fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + Send + Sync + 'static,
		R: Outcome,
	{
		let id = self
			.registry
			.lock()
			.insert(Box::new(move || observer().into_result()));

		Subscription::new(&self.registry, id)
	}

	pub(crate) fn get_snapshot(&self) -> T
	where
		T: Clone,
	{
		self.value.read().clone()
	}

	pub(crate) fn with_snapshot<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		func(&*self.value.read())
	}

	pub(crate) fn observer_count(&self) -> usize {
		self.registry.lock().len()
	}
}

/// Read-only view of an [`arc::Flow`](Flow).
pub struct ReadFlow<T> {
	body: Arc<FlowBody<T>>,
}

impl<T> Clone for ReadFlow<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> ReadFlow<T>
where
	T: Send + Sync + 'static,
{
	#[inline]
	pub fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + Send + Sync + 'static,
		R: Outcome,
	{
		self.body.subscribe(observer)
	}

	#[inline]
	pub fn get_snapshot(&self) -> T
	where
		T: Clone,
	{
		self.body.get_snapshot()
	}

	#[inline]
	pub fn with_snapshot<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		self.body.with_snapshot(func)
	}

	#[inline]
	pub fn observer_count(&self) -> usize {
		self.body.observer_count()
	}

	pub fn downgrade(&self) -> WeakReadFlow<T> {
		WeakReadFlow {
			body: Arc::downgrade(&self.body),
		}
	}
}

/// Non-owning handle to a [`Flow`].
pub struct WeakFlow<T> {
	body: Weak<FlowBody<T>>,
}

impl<T> Clone for WeakFlow<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> WeakFlow<T> {
	pub fn upgrade(&self) -> Option<Flow<T>> {
		self.body.upgrade().map(|body| Flow { body })
	}
}

/// Non-owning handle to a [`ReadFlow`].
pub struct WeakReadFlow<T> {
	body: Weak<FlowBody<T>>,
}

impl<T> Clone for WeakReadFlow<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> WeakReadFlow<T> {
	pub fn upgrade(&self) -> Option<ReadFlow<T>> {
		self.body.upgrade().map(|body| ReadFlow { body })
	}
}

impl<T> From<Flow<T>> for ReadFlow<T> {
	fn from(flow: Flow<T>) -> Self {
		ReadFlow { body: flow.body }
	}
}

impl<T: Send + Sync + 'static> Observable<T> for Flow<T> {
	fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + Send + Sync + 'static,
		R: Outcome,
	{
		Flow::subscribe(self, observer)
	}

	fn with_snapshot<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		Flow::with_snapshot(self, func)
	}
}

impl<T: Send + Sync + 'static> Observable<T> for ReadFlow<T> {
	fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + Send + Sync + 'static,
		R: Outcome,
	{
		ReadFlow::subscribe(self, observer)
	}

	fn with_snapshot<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		ReadFlow::with_snapshot(self, func)
	}
}

impl<T> Debug for Flow<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.value.read().fmt(f)
	}
}

impl<T> Debug for ReadFlow<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.value.read().fmt(f)
	}
}
