//! Object-id <-> object-name bindings (§3: "Persisted via a bindings file the
//! keystore manages"). The on-disk format is opaque to the core per §6; this
//! implementation uses one `<oid>\t<name>` line per binding, loaded fully
//! into memory and rewritten whole on every registration since bindings
//! churn is rare compared to opens.

use std::collections::HashMap;
use std::fs;
use std::path::{Path as FsPath, PathBuf};
use std::sync::RwLock;

use crate::error::KeystoreError;

/// The object-id/name bindings collaborator surface the Manager's
/// `RegisterObject`/`GetObject`/`GetObjectId` delegate to (§4.4).
pub trait ObjectBindings: Send + Sync {
    fn register(&self, oid: u32, name: &str) -> Result<(), KeystoreError>;
    fn get_object(&self, oid: u32) -> Option<String>;
    fn get_object_id(&self, name: &str) -> Option<u32>;
}

/// A bindings file at a fixed path, fully cached in memory and rewritten on
/// every successful registration.
pub struct FileObjectBindings {
    path: PathBuf,
    by_oid: RwLock<HashMap<u32, String>>,
}

impl FileObjectBindings {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, KeystoreError> {
        let path = path.into();
        let by_oid = if path.exists() {
            Self::load(&path)?
        } else {
            HashMap::new()
        };
        Ok(FileObjectBindings {
            path,
            by_oid: RwLock::new(by_oid),
        })
    }

    fn load(path: &FsPath) -> Result<HashMap<u32, String>, KeystoreError> {
        let text = fs::read_to_string(path).map_err(|source| KeystoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut map = HashMap::new();
        for line in text.lines() {
            if let Some((oid_text, name)) = line.split_once('\t') {
                if let Ok(oid) = oid_text.parse::<u32>() {
                    map.insert(oid, name.to_string());
                }
            }
        }
        Ok(map)
    }

    fn persist(&self, map: &HashMap<u32, String>) -> Result<(), KeystoreError> {
        let mut text = String::new();
        for (oid, name) in map {
            text.push_str(&oid.to_string());
            text.push('\t');
            text.push_str(name);
            text.push('\n');
        }
        fs::write(&self.path, text).map_err(|source| KeystoreError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl ObjectBindings for FileObjectBindings {
    fn register(&self, oid: u32, name: &str) -> Result<(), KeystoreError> {
        let mut map = self.by_oid.write().expect("bindings lock poisoned");
        map.insert(oid, name.to_string());
        self.persist(&map)
    }

    fn get_object(&self, oid: u32) -> Option<String> {
        self.by_oid.read().expect("bindings lock poisoned").get(&oid).cloned()
    }

    fn get_object_id(&self, name: &str) -> Option<u32> {
        self.by_oid
            .read()
            .expect("bindings lock poisoned")
            .iter()
            .find(|(_, v)| v.as_str() == name)
            .map(|(k, _)| *k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_round_trips_through_both_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let bindings = FileObjectBindings::open(dir.path().join("bindings.txt")).unwrap();

        bindings.register(42, "ncbi-file:/data/x.sra").unwrap();
        assert_eq!(bindings.get_object(42).as_deref(), Some("ncbi-file:/data/x.sra"));
        assert_eq!(bindings.get_object_id("ncbi-file:/data/x.sra"), Some(42));
    }

    #[test]
    fn reopening_loads_persisted_bindings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.txt");
        {
            let bindings = FileObjectBindings::open(&path).unwrap();
            bindings.register(7, "SRR001656").unwrap();
        }
        let reopened = FileObjectBindings::open(&path).unwrap();
        assert_eq!(reopened.get_object(7).as_deref(), Some("SRR001656"));
    }

    #[test]
    fn unknown_oid_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let bindings = FileObjectBindings::open(dir.path().join("bindings.txt")).unwrap();
        assert_eq!(bindings.get_object(99), None);
    }
}
