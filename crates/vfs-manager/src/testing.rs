//! In-memory doubles that let the Manager's full public surface be exercised
//! without a real filesystem, network, or archive reader (§9.6).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use vfs_keystore::{KeyStore, KeystoreError, ObjectBindings};

use crate::write::{FsAbstraction, WriteStream};
use crate::ManagerError;

/// A [`KeyStore`] double that always answers with a fixed key, so tests can
/// exercise the decryption path without touching real key material.
pub struct FixedKeyStore {
    key: Mutex<Vec<u8>>,
    temporary: Mutex<Option<Vec<u8>>>,
}

impl FixedKeyStore {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        FixedKeyStore {
            key: Mutex::new(key.into()),
            temporary: Mutex::new(None),
        }
    }
}

impl KeyStore for FixedKeyStore {
    fn set_temporary_key(&self, key: Vec<u8>) {
        *self.temporary.lock().expect("keystore mutex poisoned") = Some(key);
    }

    fn current_key(&self) -> Result<Vec<u8>, KeystoreError> {
        if let Some(key) = self.temporary.lock().expect("keystore mutex poisoned").clone() {
            return Ok(key);
        }
        Ok(self.key.lock().expect("keystore mutex poisoned").clone())
    }

    fn clear_temporary_key(&self) {
        *self.temporary.lock().expect("keystore mutex poisoned") = None;
    }
}

/// An in-memory [`ObjectBindings`] double.
#[derive(Default)]
pub struct InMemoryBindings {
    by_oid: Mutex<HashMap<u32, String>>,
}

impl ObjectBindings for InMemoryBindings {
    fn register(&self, oid: u32, name: &str) -> Result<(), KeystoreError> {
        self.by_oid.lock().expect("bindings mutex poisoned").insert(oid, name.to_string());
        Ok(())
    }

    fn get_object(&self, oid: u32) -> Option<String> {
        self.by_oid.lock().expect("bindings mutex poisoned").get(&oid).cloned()
    }

    fn get_object_id(&self, name: &str) -> Option<u32> {
        self.by_oid
            .lock()
            .expect("bindings mutex poisoned")
            .iter()
            .find(|(_, v)| v.as_str() == name)
            .map(|(k, _)| *k)
    }
}

/// An in-memory [`FsAbstraction`] double: named byte buffers in a shared map,
/// so write-side dispatch is testable without touching disk.
#[derive(Default)]
pub struct InMemoryFsAbstraction {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryFsAbstraction {
    pub fn contents(&self, native_path: &str) -> Option<Vec<u8>> {
        self.files.lock().expect("fs mutex poisoned").get(native_path).cloned()
    }
}

impl FsAbstraction for InMemoryFsAbstraction {
    fn create(&self, native_path: &str, _mode: u32) -> Result<Box<dyn WriteStream>, ManagerError> {
        self.files.lock().expect("fs mutex poisoned").insert(native_path.to_string(), Vec::new());
        Ok(Box::new(InMemoryWriteStream {
            files: Arc::clone(&self.files),
            path: native_path.to_string(),
        }))
    }

    fn open_write(&self, native_path: &str, update: bool) -> Result<Box<dyn WriteStream>, ManagerError> {
        let mut files = self.files.lock().expect("fs mutex poisoned");
        if !update {
            files.entry(native_path.to_string()).or_default();
        } else if !files.contains_key(native_path) {
            return Err(ManagerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                native_path.to_string(),
            )));
        }
        drop(files);
        Ok(Box::new(InMemoryWriteStream {
            files: Arc::clone(&self.files),
            path: native_path.to_string(),
        }))
    }

    fn remove(&self, native_path: &str, force: bool) -> Result<(), ManagerError> {
        let removed = self.files.lock().expect("fs mutex poisoned").remove(native_path);
        if removed.is_none() && !force {
            return Err(ManagerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                native_path.to_string(),
            )));
        }
        Ok(())
    }
}

struct InMemoryWriteStream {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    path: String,
}

impl WriteStream for InMemoryWriteStream {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<usize, ManagerError> {
        let mut files = self.files.lock().expect("fs mutex poisoned");
        let data = files.entry(self.path.clone()).or_default();
        let offset = offset as usize;
        if data.len() < offset + buf.len() {
            data.resize(offset + buf.len(), 0);
        }
        data[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }
}
