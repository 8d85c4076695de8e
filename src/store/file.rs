//! File-backed [`SecureStore`] for desktop deployments and command-line tools.

// std
use std::{
	fs::{self, File, OpenOptions},
	io::{self, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{SecureStore, StoreError},
};

/// Persists blobs to a JSON object file after each mutation.
///
/// Writes go to a sibling `.tmp` file that is synced and renamed over the target, so a crash
/// never leaves a half-written snapshot behind. On unix the file is readable by its owner only
/// (`0600`). The contents are not encrypted; wrap a platform keychain for stronger guarantees.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<BTreeMap<String, String>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
		if !path.exists() {
			return Ok(BTreeMap::new());
		}

		let bytes = fs::read(path).map_err(backend("read", path))?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(BTreeMap::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Token store {} is not a JSON object of strings: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
			Some(parent) => fs::create_dir_all(parent).map_err(backend("create", parent)),
			None => Ok(()),
		}
	}

	/// Writes the whole map to `<path>.tmp`, syncs it, then renames it over `path`.
	fn persist_locked(&self, blobs: &BTreeMap<String, String>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(blobs)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;
		let staging = self.path.with_extension("tmp");
		let mut file = create_private(&staging).map_err(backend("create", &staging))?;

		file.write_all(&serialized).map_err(backend("write", &staging))?;
		file.sync_all().map_err(backend("sync", &staging))?;
		drop(file);

		fs::rename(&staging, &self.path).map_err(backend("replace", &self.path))
	}
}
impl SecureStore for FileStore {
	fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		guard.insert(key.to_owned(), value.to_owned());

		self.persist_locked(&guard)
	}

	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.inner.read().get(key).cloned())
	}

	fn delete(&self, key: &str) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		if guard.remove(key).is_none() {
			return Ok(());
		}

		self.persist_locked(&guard)
	}
}

fn create_private(path: &Path) -> io::Result<File> {
	let mut options = OpenOptions::new();

	options.write(true).create(true).truncate(true);

	#[cfg(unix)]
	{
		use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

		options.mode(0o600);

		let file = options.open(path)?;

		// A leftover staging file keeps its old mode; `mode` only applies on creation.
		file.set_permissions(fs::Permissions::from_mode(0o600))?;

		Ok(file)
	}
	#[cfg(not(unix))]
	{
		options.open(path)
	}
}

fn backend(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> StoreError {
	let path = path.display().to_string();

	move |e| StoreError::Backend { message: format!("Failed to {action} {path}: {e}") }
}
