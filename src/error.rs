use crate::Cause;

/// Raised by `emit` when one or more observers failed during the pass.
///
/// The emitted value is kept regardless; this only reports the failures, in
/// the order the observers were notified.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} observer(s) failed during notification", .failures.len())]
pub struct EmitError {
	failures: Vec<Cause>,
}

impl EmitError {
	pub(crate) fn from_failures(failures: Vec<Cause>) -> Result<(), EmitError> {
		if failures.is_empty() {
			Ok(())
		} else {
			Err(EmitError { failures })
		}
	}

	pub fn failures(&self) -> &[Cause] {
		&self.failures
	}

	pub fn into_failures(self) -> Vec<Cause> {
		self.failures
	}

	pub fn len(&self) -> usize {
		self.failures.len()
	}

	pub fn is_empty(&self) -> bool {
		self.failures.is_empty()
	}
}

/// Return type of an observer callback.
///
/// Observers either cannot fail (`()`) or report failures through a
/// `Result` whose error converts into a [`Cause`].
pub trait Outcome {
	fn into_result(self) -> Result<(), Cause>;
}

impl Outcome for () {
	#[inline]
	fn into_result(self) -> Result<(), Cause> {
		Ok(())
	}
}

impl<E> Outcome for Result<(), E>
where
	E: Into<Cause>,
{
	#[inline]
	fn into_result(self) -> Result<(), Cause> {
		self.map_err(Into::into)
	}
}
