// std
use std::time::{Duration as StdDuration, Instant};
// self
use crate::_prelude::*;

/// Gate that lets an action run at most once per time window.
///
/// Calls arriving inside the window are dropped, not queued. Safe to share across threads;
/// under a tight concurrent loop exactly one caller wins each window.
#[derive(Debug)]
pub struct Debounce {
	window: StdDuration,
	last_run: Mutex<Option<Instant>>,
}
impl Debounce {
	/// Window used by [`Debounce::default`].
	pub const DEFAULT_WINDOW: StdDuration = StdDuration::from_millis(300);

	/// Creates a gate with the provided window.
	pub fn new(window: StdDuration) -> Self {
		Self { window, last_run: Mutex::new(None) }
	}

	/// Runs `action` unless another action ran within the window; returns its output if it ran.
	pub fn try_run<R>(&self, action: impl FnOnce() -> R) -> Option<R> {
		if !self.claim() {
			return None;
		}

		Some(action())
	}

	/// Returns `true` while the gate is closed.
	pub fn is_debouncing(&self) -> bool {
		self.last_run.lock().is_some_and(|at| at.elapsed() < self.window)
	}

	fn claim(&self) -> bool {
		let mut last_run = self.last_run.lock();
		let now = Instant::now();

		if last_run.is_some_and(|at| now.duration_since(at) < self.window) {
			return false;
		}

		*last_run = Some(now);

		true
	}
}
impl Default for Debounce {
	fn default() -> Self {
		Self::new(Self::DEFAULT_WINDOW)
	}
}
