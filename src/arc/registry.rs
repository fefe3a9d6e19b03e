use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::{Cause, EmitError};

pub(crate) type Callback = Box<dyn Fn() -> Result<(), Cause> + Send + Sync>;

pub(crate) type Snapshot = SmallVec<[Arc<Entry>; crate::SNAPSHOT_INLINE]>;

pub(crate) struct Entry {
	id: u64,
	active: AtomicBool,
	callback: Callback,
}

#[derive(Default)]
pub(crate) struct Registry {
	next_id: u64,
	entries: BTreeMap<u64, Arc<Entry>>,
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
			Arc::new(Entry {
				id,
				active: AtomicBool::new(true),
				callback,
			}),
		);

		id
	}

	pub(crate) fn remove(&mut self, id: u64) -> bool {
		match self.entries.remove(&id) {
			Some(entry) => {
				entry.active.store(false, Ordering::Release);
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

/// Runs one notification pass. The registry lock is not held while
/// observers run.
pub(crate) fn notify(snapshot: Snapshot) -> Result<(), EmitError> {
	let mut failures = Vec::new();

	for entry in snapshot {
		if !entry.active.load(Ordering::Acquire) {
			continue;
		}

		if let Err(cause) = (entry.callback)() {
			tracing::warn!(observer = entry.id, %cause, "observer failed");
			failures.push(cause);
		}
	}

	EmitError::from_failures(failures)
}

/// Handle returned by `subscribe`; may be sent to and cancelled from any
/// thread.
pub struct Subscription {
	registry: Weak<Mutex<Registry>>,
	id: u64,
}

impl Subscription {
	pub(crate) fn new(registry: &Arc<Mutex<Registry>>, id: u64) -> Self {
		Subscription {
			registry: Arc::downgrade(registry),
			id,
		}
	}

	pub fn cancel(&self) {
		if let Some(registry) = self.registry.upgrade() {
			if registry.lock().remove(self.id) {
				tracing::trace!(observer = self.id, "observer cancelled");
			}
		}
	}

	pub fn is_active(&self) -> bool {
		match self.registry.upgrade() {
			Some(registry) => registry.lock().contains(self.id),
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
