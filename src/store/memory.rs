//! Thread-safe in-memory [`SecureStore`] implementation for tests and ephemeral sessions.

// self
use crate::{
	_prelude::*,
	store::{SecureStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, String>>>;

/// Storage backend that keeps blobs in-process; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns `true` when no key holds a value.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl SecureStore for MemoryStore {
	fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
		self.0.write().insert(key.to_owned(), value.to_owned());

		Ok(())
	}

	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.0.read().get(key).cloned())
	}

	fn get_async<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(map.read().get(&key).cloned()) })
	}

	fn delete(&self, key: &str) -> Result<(), StoreError> {
		self.0.write().remove(key);

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn clones_share_entries() {
		let store = MemoryStore::default();
		let clone = store.clone();

		store.put("tokens", "a").expect("Put should succeed.");
		clone.put("tokens", "b").expect("Put should succeed.");

		assert_eq!(store.get("tokens").expect("Get should succeed."), Some("b".into()));

		clone.delete("tokens").expect("Delete should succeed.");
		clone.delete("tokens").expect("Deleting a missing key should succeed.");

		assert!(store.is_empty());
	}
}
