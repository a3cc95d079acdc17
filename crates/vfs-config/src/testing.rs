//! Isolated `Config` plus scratch directories per test, mirroring the
//! grounding workspace's own `testing.rs` `TestEnvironment`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use tempfile::TempDir;

use crate::Config;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// An isolated scratch environment: a temp directory holding a fake project
/// root, cache root, and password file location, plus a `Config` pointed at
/// them so tests never touch the real `~/.ncbi`.
pub struct TestEnvironment {
    _temp_dir: TempDir,
    pub project_root: PathBuf,
    pub cache_root: PathBuf,
    pub pwfile_path: PathBuf,
    pub test_id: u32,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new().expect("create temp dir");
        let root = temp_dir.path();

        let project_root = root.join("project");
        let cache_root = root.join("cache");
        std::fs::create_dir_all(&project_root).expect("create project root");
        std::fs::create_dir_all(&cache_root).expect("create cache root");

        let pwfile_path = root.join("pwfile");

        Self {
            _temp_dir: temp_dir,
            project_root,
            cache_root,
            pwfile_path,
            test_id,
        }
    }

    /// A `Config` pointed entirely at this environment's scratch paths.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.cache.root = self.cache_root.clone();
        config.krypto.pwfile = Some(self.pwfile_path.clone());
        config
    }

    /// Writes `content` to the environment's password file.
    pub fn write_pwfile(&self, content: &[u8]) {
        std::fs::write(&self.pwfile_path, content).expect("write pwfile");
    }

    pub fn create_file(&self, relative_path: &str, content: &[u8]) -> PathBuf {
        let path = self.project_root.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, content).expect("write test file");
        path
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environments_have_unique_ids_and_paths() {
        let a = TestEnvironment::new();
        let b = TestEnvironment::new();
        assert_ne!(a.test_id, b.test_id);
        assert_ne!(a.project_root, b.project_root);
    }

    #[test]
    fn config_points_at_scratch_paths() {
        let env = TestEnvironment::new();
        let config = env.config();
        assert_eq!(config.cache.root, env.cache_root);
        assert_eq!(config.krypto.pwfile, Some(env.pwfile_path.clone()));
    }

    #[test]
    fn write_pwfile_is_readable() {
        let env = TestEnvironment::new();
        env.write_pwfile(b"secret");
        assert_eq!(std::fs::read(&env.pwfile_path).unwrap(), b"secret");
    }
}
