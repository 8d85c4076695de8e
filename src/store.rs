//! Secure key-value storage contract and built-in store implementations.
//!
//! The pipeline persists exactly one serialized blob per strategy (under
//! [`DEFAULT_TOKEN_KEY`] unless configured otherwise). Platform keychains implement
//! [`SecureStore`] directly; [`MemoryStore`] and [`FileStore`] cover tests and desktop apps.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Key under which OAuth 2.0 strategies persist their token record by default.
pub const DEFAULT_TOKEN_KEY: &str = "tokens";

/// Boxed future returned by asynchronous [`SecureStore`] reads.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Opaque secure key-value store holding serialized string blobs.
///
/// Implementations serialize concurrent writes themselves; the pipeline performs a plain
/// read-modify-persist cycle without any additional lock.
pub trait SecureStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the value stored under `key`.
	fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

	/// Returns the value stored under `key`, if any.
	fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Asynchronous variant of [`SecureStore::get`] for backends with slow reads.
	fn get_async<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { self.get(key) })
	}

	/// Removes the value stored under `key`; missing keys are not an error.
	fn delete(&self, key: &str) -> Result<(), StoreError>;
}
impl<S> SecureStore for Arc<S>
where
	S: ?Sized + SecureStore,
{
	fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
		(**self).put(key, value)
	}

	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		(**self).get(key)
	}

	fn get_async<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		(**self).get_async(key)
	}

	fn delete(&self, key: &str) -> Result<(), StoreError> {
		(**self).delete(key)
	}
}

/// Error type produced by [`SecureStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
