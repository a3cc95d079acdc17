//! Layered configuration store for the VFS core.
//!
//! Loads, in priority order: built-in defaults, `~/.ncbi/vfs.toml` (global),
//! `<project>/.ncbi/vfs.toml` (project-local, overriding global), then
//! environment variables (highest priority). Owns the `krypto/pwfile` key
//! consumed by [`vfs-keystore`](../vfs_keystore) plus the default cache root
//! the open pipeline's cache-tee stage writes sparse files into.
//!
//! The core has no daemon, IPC, or mount surface of its own — unlike the
//! grounding workspace this crate's layering is modeled on, there is no
//! socket path or registry directory to resolve here.

pub mod logging;
pub mod testing;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Root configuration structure. Mirrors the three-tier resolution order
/// (defaults -> global -> project -> env) the grounding workspace's own
/// config crate uses, generalized to this domain's two concerns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub config_version: u32,
    pub krypto: KryptoConfig,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            krypto: KryptoConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// §6: "Configuration keys consumed: `krypto/pwfile`".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct KryptoConfig {
    /// Path to the global password file the keystore falls back to when no
    /// per-path hint, repository key file, or `VDB_PWFILE` is available.
    pub pwfile: Option<PathBuf>,
}

/// Default cache-tee root and block size (§6, §4.6: "block size 128 KiB").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub root: PathBuf,
    pub block_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
            block_size: 128 * 1024,
        }
    }
}

fn default_cache_root() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".ncbi/cache"))
        .unwrap_or_else(|| PathBuf::from("/tmp/ncbi-vfs-cache"))
}

impl Config {
    /// Loads config relative to the current directory as project root.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_for_project(Path::new("."))
    }

    /// Loads config for a specific project root. Resolution order: defaults
    /// -> global (`~/.ncbi/vfs.toml`) -> project (`<root>/.ncbi/vfs.toml`)
    /// -> environment variables.
    pub fn load_for_project(project_root: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                config = Self::read_toml(&global_path)?;
            }
        }

        let project_path = project_root.join(".ncbi/vfs.toml");
        if project_path.exists() {
            let project_config = Self::read_toml(&project_path)?;
            config.merge(project_config);
        }

        config.apply_env_overrides();
        Ok(config)
    }

    fn read_toml(path: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })
    }

    /// `~/.ncbi/vfs.toml`
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".ncbi/vfs.toml"))
    }

    /// Project-local values override global ones field by field; a field left
    /// at its default in `other` does not clobber a non-default value already
    /// loaded from the global file.
    fn merge(&mut self, other: Config) {
        if other.krypto.pwfile.is_some() {
            self.krypto.pwfile = other.krypto.pwfile;
        }
        let default_cache = CacheConfig::default();
        if other.cache.root != default_cache.root {
            self.cache.root = other.cache.root;
        }
        if other.cache.block_size != default_cache.block_size {
            self.cache.block_size = other.cache.block_size;
        }
    }

    /// Environment variables take precedence over both config files.
    ///
    /// `VDB_PWFILE` (§6) is the one env var the core itself specifies; the
    /// keystore's own priority chain (§4.5) re-reads it directly rather than
    /// through this config, since it must override the config value even
    /// when no `Config` is in scope. `VFS_CACHE_ROOT` follows the same
    /// per-field override convention the grounding workspace uses for its
    /// storage root.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("VDB_PWFILE") {
            self.krypto.pwfile = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("VFS_CACHE_ROOT") {
            self.cache.root = PathBuf::from(path);
        }
        if let Ok(size) = std::env::var("VFS_CACHE_BLOCK_SIZE") {
            if let Ok(n) = size.parse() {
                self.cache.block_size = n;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_cache_root_and_block_size() {
        let config = Config::default();
        assert_eq!(config.cache.block_size, 128 * 1024);
        assert!(config.krypto.pwfile.is_none());
    }

    #[test]
    fn toml_roundtrip_preserves_pwfile() {
        let mut config = Config::default();
        config.krypto.pwfile = Some(PathBuf::from("/etc/ncbi/pwfile"));
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.krypto.pwfile, config.krypto.pwfile);
    }

    #[test]
    fn partial_toml_uses_defaults_for_missing_sections() {
        let parsed: Config = toml::from_str("[krypto]\npwfile = \"/a/b\"\n").unwrap();
        assert_eq!(parsed.krypto.pwfile, Some(PathBuf::from("/a/b")));
        assert_eq!(parsed.cache.block_size, 128 * 1024);
    }

    #[test]
    fn project_override_replaces_global_pwfile_only() {
        let mut base = Config::default();
        base.krypto.pwfile = Some(PathBuf::from("/global/pwfile"));
        base.cache.block_size = 4096;

        let mut overlay = Config::default();
        overlay.krypto.pwfile = Some(PathBuf::from("/project/pwfile"));

        base.merge(overlay);
        assert_eq!(base.krypto.pwfile, Some(PathBuf::from("/project/pwfile")));
        assert_eq!(base.cache.block_size, 4096);
    }

    #[test]
    fn env_override_wins_over_everything() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut config = Config::default();
        std::env::set_var("VDB_PWFILE", "/env/pwfile");
        config.apply_env_overrides();
        std::env::remove_var("VDB_PWFILE");
        assert_eq!(config.krypto.pwfile, Some(PathBuf::from("/env/pwfile")));
    }

    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
}
