use std::any::Any;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// Opaque failure payload.
///
/// A `Cause` is reference counted: cloning it shares the same payload, and
/// [`Cause::ptr_eq`] tells whether two causes are the very same failure.
/// Causes travel unchanged through [`AsyncState::Error`](crate::AsyncState),
/// rejected futures and [`EmitError`](crate::EmitError).
#[derive(Clone)]
pub struct Cause {
	payload: Arc<dyn Any + Send + Sync>,
	describe: fn(&(dyn Any + Send + Sync), &mut std::fmt::Formatter<'_>) -> std::fmt::Result,
}

impl Cause {
	/// Wraps an arbitrary value.
	pub fn new<V>(value: V) -> Self
	where
		V: Any + Send + Sync + Debug,
	{
		Cause {
			payload: Arc::new(value),
			describe: describe::<V>,
		}
	}

	#[inline]
	pub fn ptr_eq(&self, other: &Cause) -> bool {
		Arc::ptr_eq(&self.payload, &other.payload)
	}

	#[inline]
	pub fn is<V: Any>(&self) -> bool {
		self.payload.is::<V>()
	}

	#[inline]
	pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
		self.payload.downcast_ref::<V>()
	}

	/// The shared payload itself.
	pub fn payload(&self) -> &Arc<dyn Any + Send + Sync> {
		&self.payload
	}
}

fn describe<V: Any + Debug>(
	payload: &(dyn Any + Send + Sync),
	f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
	match payload.downcast_ref::<V>() {
		Some(value) => value.fmt(f),
		None => f.write_str(std::any::type_name::<V>()),
	}
}

impl<E> From<E> for Cause
where
	E: std::error::Error + Send + Sync + 'static,
{
	fn from(error: E) -> Self {
		Cause::new(error)
	}
}

impl Debug for Cause {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("Cause(")?;
		(self.describe)(&*self.payload, f)?;
		f.write_str(")")
	}
}

impl Display for Cause {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if let Some(message) = self.downcast_ref::<&'static str>() {
			return f.write_str(message);
		}

		if let Some(message) = self.downcast_ref::<String>() {
			return f.write_str(message);
		}

		(self.describe)(&*self.payload, f)
	}
}
