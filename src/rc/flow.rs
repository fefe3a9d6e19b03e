use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::rc::registry::{notify, Registry, Subscription};
use crate::rc::Observable;
use crate::{EmitError, Outcome};

/// Holder of a current value that notifies observers on every `emit`.
pub struct Flow<T> {
	body: Rc<FlowBody<T>>,
}

pub(crate) struct FlowBody<T> {
	value: RefCell<T>,
	registry: Rc<RefCell<Registry>>,
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
	T: Default + 'static,
{
	fn default() -> Self {
		Flow::new(Default::default())
	}
}

impl<T> Flow<T>
where
	T: 'static,
{
	pub fn new(value: T) -> Self {
		Flow {
			body: Rc::new(FlowBody::new(value)),
		}
	}

	/// Stores `value` and notifies every registered observer.
	///
	/// Observers run synchronously in registration order against the set of
	/// registrations present when the pass starts. A failing observer does
	/// not stop the pass; all failures come back together as an
	/// [`EmitError`]. The value is stored either way.
	///
	/// Panics if called from inside [`Flow::with_snapshot`].
	#[inline]
	pub fn emit(&self, value: T) -> Result<(), EmitError> {
		self.body.emit(value)
	}

	#[inline]
	pub fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + 'static,
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

	/// A view over the same value that cannot emit.
	pub fn as_read_only(&self) -> ReadFlow<T> {
		ReadFlow {
			body: self.body.clone(),
		}
	}

	/// A handle that does not keep the flow alive.
	///
	/// Observers reading the flow they are registered on should capture
	/// this rather than a clone: a clone held by one of its own observers
	/// keeps the flow alive for as long as the observer is registered.
	pub fn downgrade(&self) -> WeakFlow<T> {
		WeakFlow {
			body: Rc::downgrade(&self.body),
		}
	}
}

impl<T> FlowBody<T> {
	pub(crate) fn new(value: T) -> Self {
		FlowBody {
			value: RefCell::new(value),
			registry: Rc::new(RefCell::new(Registry::new())),
		}
	}

	pub(crate) fn emit(&self, value: T) -> Result<(), EmitError> {
		let prev = std::mem::replace(&mut *self.value.borrow_mut(), value);
		std::mem::drop(prev);

		let snapshot = self.registry.borrow().snapshot();
		tracing::trace!(observers = snapshot.len(), "emit");

		notify(snapshot)
	}

	pub(crate) fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + 'static,
		R: Outcome,
	{
		let id = self
			.registry
			.borrow_mut()
			.insert(Box::new(move || observer().into_result()));

		Subscription::new(&self.registry, id)
	}

	pub(crate) fn get_snapshot(&self) -> T
	where
		T: Clone,
	{
		self.value.borrow().clone()
	}

	pub(crate) fn with_snapshot<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		func(&*self.value.borrow())
	}

	pub(crate) fn observer_count(&self) -> usize {
		self.registry.borrow().len()
	}
}

/// Read-only view of a [`Flow`].
///
/// Shares the flow's value and observers; anything emitted through the
/// flow is visible here.
pub struct ReadFlow<T> {
	body: Rc<FlowBody<T>>,
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
	T: 'static,
{
	#[inline]
	pub fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + 'static,
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
			body: Rc::downgrade(&self.body),
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

impl<T: 'static> Observable<T> for Flow<T> {
	fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + 'static,
		R: Outcome,
	{
		Flow::subscribe(self, observer)
	}

	fn with_snapshot<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		Flow::with_snapshot(self, func)
	}
}

impl<T: 'static> Observable<T> for ReadFlow<T> {
	fn subscribe<F, R>(&self, observer: F) -> Subscription
	where
		F: Fn() -> R + 'static,
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
		self.body.value.borrow().fmt(f)
	}
}

impl<T> Debug for ReadFlow<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.value.borrow().fmt(f)
	}
}
