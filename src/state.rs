use crate::Cause;

/// Status of an [`AsyncState`] without its payload.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Status {
	Pending,
	Success,
	Error,
}

impl Status {
	#[inline]
	pub fn is_resolved(self) -> bool {
		!matches!(self, Status::Pending)
	}
}

/// State held by an async flow.
#[derive(Debug, Clone)]
pub enum AsyncState<T> {
	Pending,
	Success { data: T },
	Error { cause: Cause },
}

// `derive(Default)` would require `T: Default`.
impl<T> Default for AsyncState<T> {
	fn default() -> Self {
		AsyncState::Pending
	}
}

impl<T> AsyncState<T> {
	pub fn success(data: T) -> Self {
		AsyncState::Success { data }
	}

	pub fn error(cause: impl Into<Cause>) -> Self {
		AsyncState::Error {
			cause: cause.into(),
		}
	}

	pub fn status(&self) -> Status {
		match self {
			AsyncState::Pending => Status::Pending,
			AsyncState::Success { .. } => Status::Success,
			AsyncState::Error { .. } => Status::Error,
		}
	}

	#[inline]
	pub fn is_pending(&self) -> bool {
		matches!(self, AsyncState::Pending)
	}

	#[inline]
	pub fn is_resolved(&self) -> bool {
		!self.is_pending()
	}

	pub fn data(&self) -> Option<&T> {
		match self {
			AsyncState::Success { data } => Some(data),
			_ => None,
		}
	}

	pub fn cause(&self) -> Option<&Cause> {
		match self {
			AsyncState::Error { cause } => Some(cause),
			_ => None,
		}
	}

	/// Settled output of this state, `None` while pending.
	pub fn to_result(&self) -> Option<Result<T, Cause>>
	where
		T: Clone,
	{
		match self {
			AsyncState::Pending => None,
			AsyncState::Success { data } => Some(Ok(data.clone())),
			AsyncState::Error { cause } => Some(Err(cause.clone())),
		}
	}
}

/// Whether moving from `prev` to `next` ends the current resolution epoch.
///
/// Only leaving a resolved status does: `Pending -> *`, `Success -> Success`
/// and `Error -> Error` keep whatever future was handed out.
pub(crate) fn ends_epoch(prev: Status, next: Status) -> bool {
	prev.is_resolved() && prev != next
}
