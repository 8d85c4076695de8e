//! Concurrency gates: [`SingleFlight`] coalesces overlapping async operations and [`Debounce`]
//! rate-limits synchronous actions.
//!
//! A [`SingleFlight`] keeps one "generation" slot behind a mutex. The first caller stores a
//! shared future in the slot; every caller that arrives while that future is still pending
//! attaches to it instead of starting its own execution. Dropping a waiting caller never
//! cancels the stored future, so remaining or later callers still observe its result.

mod debounce;

pub use debounce::Debounce;

// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::_prelude::*;

type Flight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// Coalesces concurrent invocations of an async operation into one execution per generation.
pub struct SingleFlight<T, E>
where
	T: 'static + Clone + Send + Sync,
	E: 'static + Clone + Send + Sync,
{
	slot: Mutex<Slot<T, E>>,
}
impl<T, E> SingleFlight<T, E>
where
	T: 'static + Clone + Send + Sync,
	E: 'static + Clone + Send + Sync,
{
	/// Creates an idle runner.
	pub fn new() -> Self {
		Self { slot: Mutex::new(Slot { generation: 0, in_flight: None }) }
	}

	/// Runs `operation`, or attaches to the execution already in flight.
	///
	/// `operation` is only invoked when no pending execution exists. Every caller attached to
	/// a generation receives a clone of the same result, success or failure.
	pub async fn run<F, Fut>(&self, operation: F) -> Result<T, E>
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = Result<T, E>>,
	{
		let (generation, flight) = self.join_or_start(operation);
		let result = flight.await;

		self.finish(generation);

		result
	}

	/// Number of executions started so far.
	pub fn generation(&self) -> u64 {
		self.slot.lock().generation
	}

	/// Returns `true` while an execution is pending.
	pub fn is_running(&self) -> bool {
		self.slot.lock().in_flight.as_ref().is_some_and(|(_, flight)| flight.peek().is_none())
	}

	fn join_or_start<F, Fut>(&self, operation: F) -> (u64, Flight<T, E>)
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = Result<T, E>>,
	{
		let mut slot = self.slot.lock();

		match &slot.in_flight {
			Some((generation, flight)) if flight.peek().is_none() =>
				return (*generation, flight.clone()),
			_ => {},
		}

		slot.generation += 1;

		let generation = slot.generation;
		let flight = operation().boxed().shared();

		slot.in_flight = Some((generation, flight.clone()));

		(generation, flight)
	}

	fn finish(&self, generation: u64) {
		let mut slot = self.slot.lock();

		if slot.in_flight.as_ref().is_some_and(|(current, _)| *current == generation) {
			slot.in_flight = None;
		}
	}
}
impl<T, E> Default for SingleFlight<T, E>
where
	T: 'static + Clone + Send + Sync,
	E: 'static + Clone + Send + Sync,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<T, E> Debug for SingleFlight<T, E>
where
	T: 'static + Clone + Send + Sync,
	E: 'static + Clone + Send + Sync,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let slot = self.slot.lock();

		f.debug_struct("SingleFlight")
			.field("generation", &slot.generation)
			.field("in_flight", &slot.in_flight.is_some())
			.finish()
	}
}

struct Slot<T, E>
where
	T: 'static + Clone + Send + Sync,
	E: 'static + Clone + Send + Sync,
{
	generation: u64,
	in_flight: Option<(u64, Flight<T, E>)>,
}
