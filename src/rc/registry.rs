use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::{Cause, EmitError};

pub(crate) type Callback = Box<dyn Fn() -> Result<(), Cause>>;

/// Registrations copied out of the registry when a pass starts.
pub(crate) type Snapshot = SmallVec<[Rc<Entry>; crate::SNAPSHOT_INLINE]>;

pub(crate) struct Entry {
	id: u64,
	active: Cell<bool>,
	callback: Callback,
}

impl Entry {
	fn invoke(&self) -> Result<(), Cause> {
		(self.callback)()
	}
}

/// Insertion-ordered set of observers.
///
/// Ids grow monotonically, so iterating the map yields registration order.
#[derive(Default)]
pub(crate) struct Registry {
	next_id: u64,
	entries: BTreeMap<u64, Rc<Entry>>,
}

impl Registry {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn insert(&mut self, callback: Callback) -> u64 {
		let id = self.next_id;
		self.next_id += 1;

		self.entries.insert(
			id,
			Rc::new(Entry {
				id,
				active: Cell::new(true),
				callback,
			}),
		);

		id
	}

	pub(crate) fn remove(&mut self, id: u64) -> bool {
		match self.entries.remove(&id) {
			Some(entry) => {
				// a pass may still hold this entry in its snapshot
				entry.active.set(false);
				true
			}
			None => false,
		}
	}

	pub(crate) fn contains(&self, id: u64) -> bool {
		self.entries.contains_key(&id)
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}

	pub(crate) fn snapshot(&self) -> Snapshot {
		self.entries.values().cloned().collect()
	}
}

/// Runs one notification pass over `snapshot`.
///
/// Entries cancelled before they are reached are skipped. Failures are
/// collected and reported once every remaining entry has run.
pub(crate) fn notify(snapshot: Snapshot) -> Result<(), EmitError> {
	let mut failures = Vec::new();

	for entry in snapshot {
		if !entry.active.get() {
			continue;
		}

		if let Err(cause) = entry.invoke() {
			tracing::warn!(observer = entry.id, %cause, "observer failed");
			failures.push(cause);
		}
	}

	EmitError::from_failures(failures)
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle keeps the observer registered; call
/// [`Subscription::cancel`] to remove it.
pub struct Subscription {
	registry: Weak<RefCell<Registry>>,
	id: u64,
}

impl Subscription {
	pub(crate) fn new(registry: &Rc<RefCell<Registry>>, id: u64) -> Self {
		Subscription {
			registry: Rc::downgrade(registry),
			id,
		}
	}

	/// Removes exactly this registration. Repeated calls are no-ops.
	pub fn cancel(&self) {
		if let Some(registry) = self.registry.upgrade() {
			if registry.borrow_mut().remove(self.id) {
				tracing::trace!(observer = self.id, "observer cancelled");
			}
		}
	}

	pub fn is_active(&self) -> bool {
		match self.registry.upgrade() {
			Some(registry) => registry.borrow().contains(self.id),
			None => false,
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.is_active())
			.finish()
	}
}
