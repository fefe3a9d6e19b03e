use std::sync::{Arc, Mutex, MutexGuard};

use mockall::*;

#[automock]
pub trait Listener {
	/// Called by an observer with whatever it read from the flow.
	fn heard(&self, value: u64);
}

/// A `MockListener` that observers on any thread can share.
#[derive(Clone)]
pub struct SharedListener(Arc<Mutex<MockListener>>);

impl SharedListener {
	pub fn new() -> SharedListener {
		SharedListener(Arc::new(Mutex::new(MockListener::new())))
	}

	pub fn get(&self) -> MutexGuard<'_, MockListener> {
		self.0.lock().unwrap()
	}

	/// Expects exactly `times` calls with `value`.
	pub fn expect_value(&self, value: u64, times: usize) {
		self.get()
			.expect_heard()
			.with(predicate::eq(value))
			.times(times)
			.return_const(());
	}

	pub fn heard(&self, value: u64) {
		self.get().heard(value)
	}

	pub fn checkpoint(&self) {
		self.get().checkpoint()
	}
}
