//! Key acquisition (component G): resolves the encryption key used by the
//! open pipeline's decryption stage, per the priority chain in §4.5.

pub mod bindings;
pub mod error;

use std::fs;
use std::io::Read;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Mutex;

pub use bindings::{FileObjectBindings, ObjectBindings};
pub use error::KeystoreError;
use tracing::debug;
use vfs_path::Path;

/// Maximum key length §4.5 allows: embedded `\n`/`\r` in a stored password
/// file terminate the key at the first such byte before this limit applies.
pub const MAX_KEY_LEN: usize = 4096;

/// The keystore collaborator (§3, §9.1): produces the "current" key from
/// whatever sources it's configured with, and holds a one-shot temporary key
/// slot that per-path hints (`pwpath`/`pwfd`) populate.
pub trait KeyStore: Send + Sync {
    fn set_temporary_key(&self, key: Vec<u8>);
    fn current_key(&self) -> Result<Vec<u8>, KeystoreError>;
    fn clear_temporary_key(&self);
}

/// Truncates `key` at the first `\n` or `\r` byte, then enforces the 4096
/// byte ceiling.
pub fn normalize_key(mut key: Vec<u8>) -> Result<Vec<u8>, KeystoreError> {
    if let Some(cut) = key.iter().position(|&b| b == b'\n' || b == b'\r') {
        key.truncate(cut);
    }
    if key.len() > MAX_KEY_LEN {
        return Err(KeystoreError::TooLarge(key.len()));
    }
    Ok(key)
}

/// Default file/env-based [`KeyStore`]. Consults, in order: a temporary key
/// set by the caller (from a per-path hint), an area-specific repository key
/// file, the `VDB_PWFILE` environment variable, a process-wide password
/// override, and finally a configured global password file path.
pub struct FileEnvKeyStore {
    temporary: Mutex<Option<Vec<u8>>>,
    repo_key_file: Option<PathBuf>,
    pw_env_override: Option<Vec<u8>>,
    global_pwfile: Option<PathBuf>,
}

impl FileEnvKeyStore {
    pub fn new() -> Self {
        FileEnvKeyStore {
            temporary: Mutex::new(None),
            repo_key_file: None,
            pw_env_override: None,
            global_pwfile: None,
        }
    }

    pub fn with_repo_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.repo_key_file = Some(path.into());
        self
    }

    pub fn with_pw_env_override(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.pw_env_override = Some(key.into());
        self
    }

    pub fn with_global_pwfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_pwfile = Some(path.into());
        self
    }

    fn read_file(path: &FsPath) -> Result<Vec<u8>, KeystoreError> {
        fs::read(path).map_err(|source| KeystoreError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

impl Default for FileEnvKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for FileEnvKeyStore {
    fn set_temporary_key(&self, key: Vec<u8>) {
        *self.temporary.lock().expect("keystore mutex poisoned") = Some(key);
    }

    fn current_key(&self) -> Result<Vec<u8>, KeystoreError> {
        if let Some(key) = self.temporary.lock().expect("keystore mutex poisoned").clone() {
            return Ok(key);
        }

        if let Some(path) = &self.repo_key_file {
            if path.exists() {
                debug!(path = %path.display(), "reading key from repository key file");
                return Self::read_file(path);
            }
        }

        if let Ok(path) = std::env::var("VDB_PWFILE") {
            debug!(path = %path, "reading key from VDB_PWFILE");
            return Self::read_file(FsPath::new(&path));
        }

        if let Some(key) = &self.pw_env_override {
            debug!("using process-wide password override");
            return Ok(key.clone());
        }

        if let Some(path) = &self.global_pwfile {
            debug!(path = %path.display(), "reading key from global configured pwfile");
            return Self::read_file(path);
        }

        Err(KeystoreError::NotFound)
    }

    fn clear_temporary_key(&self) {
        *self.temporary.lock().expect("keystore mutex poisoned") = None;
    }
}

/// Reads the byte string at numeric file descriptor `fd`. Used for `pwfd`
/// path hints (§4.5 step 2). The descriptor is assumed already open and
/// owned by the caller; it is duplicated before reading so this call does
/// not close it out from under the caller.
fn read_fd(fd: i32) -> Result<Vec<u8>, KeystoreError> {
    use nix::unistd::dup;
    use std::os::unix::io::BorrowedFd;

    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    let dup_fd = dup(borrowed).map_err(|errno| KeystoreError::Io {
        path: format!("fd:{fd}"),
        source: std::io::Error::from_raw_os_error(errno as i32),
    })?;
    let mut file = fs::File::from(dup_fd);
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(|source| KeystoreError::Io {
        path: format!("fd:{fd}"),
        source,
    })?;
    Ok(buf)
}

/// `GetKryptoPassword`'s acquisition half (§4.5): runs the full priority
/// chain for `path` and returns a normalized key (newline-terminated,
/// length-checked), unconditionally clearing the keystore's temporary slot
/// before returning.
pub fn acquire_key(path: &Path, keystore: &dyn KeyStore) -> Result<Vec<u8>, KeystoreError> {
    let result = acquire_key_inner(path, keystore);
    keystore.clear_temporary_key();
    result
}

fn acquire_key_inner(path: &Path, keystore: &dyn KeyStore) -> Result<Vec<u8>, KeystoreError> {
    if let Some(pwpath) = path.pwpath() {
        let bytes = FileEnvKeyStore::read_file(FsPath::new(pwpath))?;
        keystore.set_temporary_key(bytes.clone());
        return normalize_key(bytes);
    }

    if let Some(fd) = path.pwfd() {
        let bytes = read_fd(fd)?;
        keystore.set_temporary_key(bytes.clone());
        return normalize_key(bytes);
    }

    let key = keystore.current_key()?;
    normalize_key(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn normalize_key_truncates_at_first_newline() {
        let key = normalize_key(b"secret\nextra-garbage".to_vec()).unwrap();
        assert_eq!(key, b"secret");
    }

    #[test]
    fn normalize_key_rejects_oversized_key() {
        let key = vec![b'a'; MAX_KEY_LEN + 1];
        assert!(matches!(normalize_key(key), Err(KeystoreError::TooLarge(_))));
    }

    #[test]
    fn pwpath_hint_takes_priority_and_sets_temporary_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "hinted-key\n").unwrap();
        let path_str = format!("ncbi-file:/data/x.sra?pwfile={}", file.path().display());
        let path = Path::parse(&path_str).unwrap();

        let keystore = FileEnvKeyStore::new().with_global_pwfile("/should/not/be/used");
        let key = acquire_key(&path, &keystore).unwrap();
        assert_eq!(key, b"hinted-key");
    }

    #[test]
    fn falls_back_to_global_pwfile_when_no_hint_present() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "global-key").unwrap();
        let path = Path::parse("ncbi-file:/data/x.sra?enc").unwrap();

        let keystore = FileEnvKeyStore::new().with_global_pwfile(file.path());
        let key = acquire_key(&path, &keystore).unwrap();
        assert_eq!(key, b"global-key");
    }

    #[test]
    fn no_source_available_is_not_found() {
        let path = Path::parse("ncbi-file:/data/x.sra?enc").unwrap();
        let keystore = FileEnvKeyStore::new();
        assert!(matches!(acquire_key(&path, &keystore), Err(KeystoreError::NotFound)));
    }

    /// `pwpath` and `pwfd` share a single query key (§4.2); a numeric value
    /// must be claimed by `pwfd`, not treated as a literal filename.
    #[cfg(unix)]
    #[test]
    fn numeric_pwfile_value_is_read_as_a_descriptor_not_a_path() {
        use std::io::Write as _;
        use std::os::unix::io::AsRawFd;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "fd-key").unwrap();
        let fd = file.as_file().as_raw_fd();

        let path_str = format!("ncbi-file:/data/x.sra?pwfile={fd}");
        let path = Path::parse(&path_str).unwrap();
        assert_eq!(path.pwpath(), None);
        assert_eq!(path.pwfd(), Some(fd));

        let keystore = FileEnvKeyStore::new();
        let key = acquire_key(&path, &keystore).unwrap();
        assert_eq!(key, b"fd-key");
    }
}
