//! Reactive value containers.
//!
//! A [`rc::Flow`] holds a current value and synchronously notifies its
//! observers on every `emit`. A [`rc::AsyncFlow`] holds an [`AsyncState`] and
//! can be awaited through a cached [`rc::DataFuture`]. The [`arc`] module
//! provides the same types for values shared across threads.

pub mod arc;
pub mod macros;
pub mod rc;

mod cause;
mod error;
mod state;

pub use cause::Cause;
pub use error::{EmitError, Outcome};
pub use state::{AsyncState, Status};

/// Inline capacity of the observer list copied at the start of each pass.
pub(crate) const SNAPSHOT_INLINE: usize = 4;
