//! The Manager (component E, §4.4): the process-wide singleton that
//! composes the resolver facade, keystore, cipher registry, archive
//! readers, and object-id bindings into the public surface callers use —
//! `OpenFileRead`/`OpenDirectoryRead` and their `_decrypt` variants,
//! write-side dispatch, `ResolvePath`/`ResolvePathRelative`,
//! `GetKryptoPassword`/`UpdateKryptoPassword`, and object bindings.

pub mod ciphers;
pub mod error;
pub mod password;
pub mod pipeline;
pub mod testing;
pub mod write;

pub use ciphers::CipherRegistry;
pub use error::ManagerError;
pub use pipeline::OpenFlags;

use std::sync::{Arc, Mutex, Weak};

use once_cell::sync::Lazy;
use tracing::debug;

use vfs_archive::{ArchiveReader, DirectoryView};
use vfs_config::Config;
use vfs_keystore::{FileEnvKeyStore, KeyStore, ObjectBindings};
use vfs_path::Path;
use vfs_resolve::{Resolution, ResolveFlags, ResolverOracle};
use vfs_stream::{RandomAccess, RemoteTransport};
use write::{FsAbstraction, LocalFsAbstraction, WriteStream};

static SINGLETON: Lazy<Mutex<Weak<Manager>>> = Lazy::new(|| Mutex::new(Weak::new()));

/// Collaborators and configuration the Manager is assembled from. Every
/// field has a sensible local default except the archive readers, which
/// this crate never implements for real (§1) — leaving them unset means
/// `OpenDirectoryRead` surfaces a clear error instead of silently no-oping.
pub struct ManagerBuilder {
    cwd: Option<Path>,
    config: Config,
    oracle: Option<Arc<dyn ResolverOracle + Send + Sync>>,
    keystore: Option<Arc<dyn KeyStore>>,
    ciphers: CipherRegistry,
    transport: Option<Arc<dyn RemoteTransport>>,
    sra_reader: Option<Arc<dyn ArchiveReader>>,
    tar_reader: Option<Arc<dyn ArchiveReader>>,
    bindings: Option<Arc<dyn ObjectBindings>>,
    fs: Option<Arc<dyn FsAbstraction>>,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        ManagerBuilder {
            cwd: None,
            config: Config::default(),
            oracle: None,
            keystore: None,
            ciphers: CipherRegistry::new(),
            transport: None,
            sra_reader: None,
            tar_reader: None,
            bindings: None,
            fs: None,
        }
    }
}

impl ManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cwd(mut self, cwd: Path) -> Self {
        self.cwd = Some(cwd);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn ResolverOracle + Send + Sync>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_keystore(mut self, keystore: Arc<dyn KeyStore>) -> Self {
        self.keystore = Some(keystore);
        self
    }

    pub fn with_ciphers(mut self, ciphers: CipherRegistry) -> Self {
        self.ciphers = ciphers;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn RemoteTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_sra_reader(mut self, reader: Arc<dyn ArchiveReader>) -> Self {
        self.sra_reader = Some(reader);
        self
    }

    pub fn with_tar_reader(mut self, reader: Arc<dyn ArchiveReader>) -> Self {
        self.tar_reader = Some(reader);
        self
    }

    pub fn with_bindings(mut self, bindings: Arc<dyn ObjectBindings>) -> Self {
        self.bindings = Some(bindings);
        self
    }

    pub fn with_fs_abstraction(mut self, fs: Arc<dyn FsAbstraction>) -> Self {
        self.fs = Some(fs);
        self
    }

    fn build(self) -> Result<Manager, ManagerError> {
        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => {
                let text = std::env::current_dir()?
                    .to_str()
                    .ok_or(ManagerError::InvalidPath)?
                    .to_string();
                Path::parse(&text)?
            }
        };

        let keystore: Arc<dyn KeyStore> = match self.keystore {
            Some(ks) => ks,
            None => {
                let mut ks = FileEnvKeyStore::new();
                if let Some(pwfile) = &self.config.krypto.pwfile {
                    ks = ks.with_global_pwfile(pwfile.clone());
                }
                Arc::new(ks)
            }
        };

        Ok(Manager {
            cwd,
            config: self.config,
            oracle: self.oracle,
            keystore,
            ciphers: self.ciphers,
            transport: self.transport,
            sra_reader: self.sra_reader,
            tar_reader: self.tar_reader,
            bindings: self.bindings,
            fs: self.fs.unwrap_or_else(|| Arc::new(LocalFsAbstraction)),
        })
    }
}

/// The process-wide singleton (§4.4). Every public operation the open
/// pipeline, resolver facade, and key acquisition expose is reached through
/// a `Manager` value.
pub struct Manager {
    cwd: Path,
    config: Config,
    oracle: Option<Arc<dyn ResolverOracle + Send + Sync>>,
    keystore: Arc<dyn KeyStore>,
    ciphers: CipherRegistry,
    transport: Option<Arc<dyn RemoteTransport>>,
    sra_reader: Option<Arc<dyn ArchiveReader>>,
    tar_reader: Option<Arc<dyn ArchiveReader>>,
    bindings: Option<Arc<dyn ObjectBindings>>,
    fs: Arc<dyn FsAbstraction>,
}

impl Manager {
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    /// Returns the sole process-wide instance, constructing it from
    /// `builder` if this is the first call since the last instance was
    /// released. A later call's `builder` is ignored once an instance is
    /// already live — matching §4.4's "a second construction ... returns an
    /// additional reference to the same instance."
    pub fn instance(builder: ManagerBuilder) -> Result<Arc<Manager>, ManagerError> {
        let mut slot = SINGLETON.lock().expect("manager singleton mutex poisoned");
        if let Some(existing) = slot.upgrade() {
            debug!("returning existing Manager instance");
            return Ok(existing);
        }
        let manager = Arc::new(builder.build()?);
        *slot = Arc::downgrade(&manager);
        debug!("constructed new Manager instance");
        Ok(manager)
    }

    fn pipeline_ctx(&self) -> pipeline::PipelineContext<'_> {
        pipeline::PipelineContext {
            oracle: self.oracle.as_deref(),
            keystore: self.keystore.as_ref(),
            ciphers: &self.ciphers,
            transport: self.transport.clone(),
            sra_reader: self.sra_reader.as_deref(),
            tar_reader: self.tar_reader.as_deref(),
            base_dir: &self.cwd,
        }
    }

    pub fn get_cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    pub fn get_resolver(&self) -> Option<&(dyn ResolverOracle + Send + Sync)> {
        self.oracle.as_deref()
    }

    pub fn open_file_read(&self, path: &Path) -> Result<Arc<dyn RandomAccess>, ManagerError> {
        pipeline::open_file_read(&self.pipeline_ctx(), path, OpenFlags::default())
    }

    pub fn open_file_read_decrypt(&self, path: &Path) -> Result<Arc<dyn RandomAccess>, ManagerError> {
        pipeline::open_file_read(&self.pipeline_ctx(), path, OpenFlags { force_decrypt: true })
    }

    pub fn open_directory_read(&self, path: &Path) -> Result<Box<dyn DirectoryView>, ManagerError> {
        pipeline::open_directory_read(&self.pipeline_ctx(), path, OpenFlags::default())
    }

    pub fn open_directory_read_decrypt(&self, path: &Path) -> Result<Box<dyn DirectoryView>, ManagerError> {
        pipeline::open_directory_read(&self.pipeline_ctx(), path, OpenFlags { force_decrypt: true })
    }

    /// `OpenFileWrite(path, update)`: `update` opens an existing file for
    /// read-write without truncating; otherwise the file must already exist
    /// and is opened as-is for positional writes.
    pub fn open_file_write(&self, path: &Path, update: bool) -> Result<Box<dyn WriteStream>, ManagerError> {
        write::check_locally_addressable(path)?;
        let native = write::native_path(path, &self.cwd)?;
        let inner = self.fs.open_write(&native, update)?;
        self.maybe_wrap_encrypting(path, inner)
    }

    /// `CreateFile(path, access, mode)`: creates (truncating if it already
    /// exists) a new file with the given POSIX `mode`.
    pub fn create_file(&self, path: &Path, mode: u32) -> Result<Box<dyn WriteStream>, ManagerError> {
        write::check_locally_addressable(path)?;
        let native = write::native_path(path, &self.cwd)?;
        let inner = self.fs.create(&native, mode)?;
        self.maybe_wrap_encrypting(path, inner)
    }

    /// `Remove(path, force)`.
    pub fn remove(&self, path: &Path, force: bool) -> Result<(), ManagerError> {
        write::check_locally_addressable(path)?;
        let native = write::native_path(path, &self.cwd)?;
        self.fs.remove(&native, force)
    }

    fn maybe_wrap_encrypting(
        &self,
        path: &Path,
        inner: Box<dyn WriteStream>,
    ) -> Result<Box<dyn WriteStream>, ManagerError> {
        if !path.is_encrypted() {
            return Ok(inner);
        }
        // A newly written envelope has no existing magic to detect a format
        // from, so the AES family is the default for encrypted writes; WGA
        // is read-only support in this core (§9 Design Notes).
        let format = vfs_crypto::EnvelopeFormat::Aes;
        let cipher = self
            .ciphers
            .get(format)
            .ok_or(ManagerError::Crypto(vfs_crypto::CryptoError::InvalidKey))?;
        let key = vfs_keystore::acquire_key(path, self.keystore.as_ref())?;
        Ok(Box::new(write::EncryptingWriteStream::new(inner, cipher, key, format)))
    }

    pub fn resolve_path(&self, flags: ResolveFlags, path: &Path) -> Result<Resolution, ManagerError> {
        let oracle = self
            .oracle
            .as_deref()
            .ok_or_else(|| ManagerError::UnsupportedScheme("no resolver oracle configured".to_string()))?;
        Ok(vfs_resolve::resolve_path(oracle, flags, path)?)
    }

    pub fn resolve_path_relative(&self, flags: ResolveFlags, path: &Path) -> Result<Resolution, ManagerError> {
        let oracle = self
            .oracle
            .as_deref()
            .ok_or_else(|| ManagerError::UnsupportedScheme("no resolver oracle configured".to_string()))?;
        Ok(vfs_resolve::resolve_path_relative(oracle, flags, &self.cwd, path)?)
    }

    pub fn get_krypto_password(&self, buf: &mut [u8]) -> Result<usize, ManagerError> {
        password::get_krypto_password(self.keystore.as_ref(), buf)
    }

    pub fn update_krypto_password(&self, new_password: &[u8]) -> Result<(), ManagerError> {
        let pwfile = self
            .config
            .krypto
            .pwfile
            .as_ref()
            .ok_or(ManagerError::InvalidArgument("krypto/pwfile is not configured"))?;
        password::update_krypto_password(pwfile, new_password)
    }

    pub fn register_object(&self, oid: u32, path: &Path) -> Result<(), ManagerError> {
        let bindings = self.require_bindings()?;
        Ok(bindings.register(oid, &path.to_canonical_string())?)
    }

    pub fn get_object(&self, oid: u32) -> Result<Option<Path>, ManagerError> {
        let bindings = self.require_bindings()?;
        match bindings.get_object(oid) {
            Some(text) => Ok(Some(Path::parse(&text)?)),
            None => Ok(None),
        }
    }

    pub fn get_object_id(&self, path: &Path) -> Result<Option<u32>, ManagerError> {
        let bindings = self.require_bindings()?;
        Ok(bindings.get_object_id(&path.to_canonical_string()))
    }

    fn require_bindings(&self) -> Result<&Arc<dyn ObjectBindings>, ManagerError> {
        self.bindings
            .as_ref()
            .ok_or_else(|| ManagerError::UnsupportedScheme("no object bindings store configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use testing::{FixedKeyStore, InMemoryBindings, InMemoryFsAbstraction};
    use vfs_archive::testing::{InMemoryDir, InMemoryReader};
    use vfs_crypto::{EnvelopeFormat, NullCipher};
    use vfs_path::PathType;
    use vfs_resolve::oracle::testing::InMemoryOracle;
    use vfs_stream::remote::testing::InMemoryTransport;

    fn builder_with_cwd() -> ManagerBuilder {
        Manager::builder().with_cwd(Path::parse("/work").unwrap())
    }

    #[test]
    fn open_file_read_opens_a_local_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("data.txt");
        std::fs::write(&file_path, b"hello vfs").unwrap();

        let manager = builder_with_cwd().build().unwrap();
        let path = Path::parse(file_path.to_str().unwrap()).unwrap();
        let stream = manager.open_file_read(&path).unwrap();

        let mut buf = [0u8; 9];
        stream.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello vfs");
    }

    #[test]
    fn open_file_read_resolves_a_bare_relative_name_against_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.txt"), b"hello vfs").unwrap();

        let cwd = Path::parse(dir.path().to_str().unwrap()).unwrap();
        let manager = Manager::builder().with_cwd(cwd).build().unwrap();

        // "data.txt" has no slash and no digit run, so the parser classifies
        // it as a bare `Name`, not `RelPath` — it must still resolve against
        // the configured base directory rather than the process cwd.
        let path = Path::parse("data.txt").unwrap();
        assert_eq!(path.path_type(), PathType::Name);
        let stream = manager.open_file_read(&path).unwrap();

        let mut buf = [0u8; 9];
        stream.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello vfs");
    }

    #[test]
    fn create_file_resolves_a_bare_relative_name_against_cwd() {
        let fs_abstraction = StdArc::new(InMemoryFsAbstraction::default());
        let manager = builder_with_cwd().with_fs_abstraction(fs_abstraction.clone()).build().unwrap();

        let path = Path::parse("report.txt").unwrap();
        assert_eq!(path.path_type(), PathType::Name);
        let mut writer = manager.create_file(&path, 0o644).unwrap();
        writer.write_at(0, b"created").unwrap();
        drop(writer);

        assert_eq!(fs_abstraction.contents("/work/report.txt").unwrap(), b"created");
    }

    #[test]
    fn encrypted_local_open_decrypts_through_configured_cipher() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("secret.sra");

        let cipher: StdArc<dyn vfs_crypto::Cipher> = StdArc::new(NullCipher::new(EnvelopeFormat::Aes));
        let key = b"shared-secret".to_vec();
        let mut ciphertext = b"plaintext payload".to_vec();
        cipher.decrypt(&key, 0, &mut ciphertext).unwrap();
        let mut envelope = b"NCBInenc".to_vec();
        envelope.extend_from_slice(&ciphertext);
        std::fs::write(&file_path, &envelope).unwrap();

        let keystore = StdArc::new(FixedKeyStore::new(key));
        let ciphers = CipherRegistry::new().register(cipher);
        let manager = builder_with_cwd()
            .with_keystore(keystore)
            .with_ciphers(ciphers)
            .build()
            .unwrap();

        let path = Path::parse(&format!("{}?enc", file_path.to_str().unwrap())).unwrap();
        let stream = manager.open_file_read(&path).unwrap();
        let mut buf = vec![0u8; "plaintext payload".len()];
        stream.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"plaintext payload");
    }

    #[test]
    fn open_directory_read_dispatches_to_sra_reader() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("run.sra");
        let mut data = vfs_archive::magic::SRA_KAR_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 64]);
        std::fs::write(&file_path, &data).unwrap();

        let sra = InMemoryReader::sra(InMemoryDir::default().with_file("root.vdbcache", b"x".to_vec()));
        let tar = InMemoryReader::tar(InMemoryDir::default(), 0x99);
        let manager = builder_with_cwd()
            .with_sra_reader(StdArc::new(sra))
            .with_tar_reader(StdArc::new(tar))
            .build()
            .unwrap();

        let path = Path::parse(file_path.to_str().unwrap()).unwrap();
        let view = manager.open_directory_read(&path).unwrap();
        assert!(view.entries().contains(&"root.vdbcache".to_string()));
    }

    #[test]
    fn directory_open_without_archive_readers_is_a_clear_error() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("run.sra");
        std::fs::write(&file_path, b"whatever").unwrap();

        let manager = builder_with_cwd().build().unwrap();
        let path = Path::parse(file_path.to_str().unwrap()).unwrap();
        assert!(manager.open_directory_read(&path).is_err());
    }

    #[test]
    fn remote_open_reads_through_transport_and_caches_to_disk() {
        let cache_dir = tempfile::tempdir().unwrap();
        let cache_path = cache_dir.path().join("cache.bin");

        let transport = StdArc::new(InMemoryTransport::default());
        transport.set("https://example.org/run", b"remote payload".to_vec());

        let mut oracle = InMemoryOracle::default();
        oracle.set_cache("https://example.org/run", cache_path.to_str().unwrap());

        let manager = builder_with_cwd()
            .with_transport(transport)
            .with_oracle(StdArc::new(oracle))
            .build()
            .unwrap();

        let path = Path::parse("https://example.org/run").unwrap();
        let stream = manager.open_file_read(&path).unwrap();
        let mut buf = vec![0u8; "remote payload".len()];
        stream.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"remote payload");
        assert!(cache_path.exists());
    }

    #[test]
    fn write_then_read_back_round_trips_through_fs_abstraction() {
        let fs_abstraction = StdArc::new(InMemoryFsAbstraction::default());
        let manager = builder_with_cwd().with_fs_abstraction(fs_abstraction.clone()).build().unwrap();

        let path = Path::parse("/work/report.txt").unwrap();
        let mut writer = manager.create_file(&path, 0o644).unwrap();
        writer.write_at(0, b"created").unwrap();
        drop(writer);

        assert_eq!(fs_abstraction.contents("/work/report.txt").unwrap(), b"created");
    }

    #[test]
    fn remove_of_missing_file_without_force_errors() {
        let fs_abstraction = StdArc::new(InMemoryFsAbstraction::default());
        let manager = builder_with_cwd().with_fs_abstraction(fs_abstraction).build().unwrap();
        let path = Path::parse("/work/missing.txt").unwrap();
        assert!(manager.remove(&path, false).is_err());
        assert!(manager.remove(&path, true).is_ok());
    }

    #[test]
    fn object_bindings_round_trip_through_the_manager() {
        let bindings = StdArc::new(InMemoryBindings::default());
        let manager = builder_with_cwd().with_bindings(bindings).build().unwrap();

        let path = Path::parse("ncbi-file:/data/x.sra").unwrap();
        manager.register_object(42, &path).unwrap();
        assert_eq!(manager.get_object(42).unwrap().unwrap().to_canonical_string(), path.to_canonical_string());
        assert_eq!(manager.get_object_id(&path).unwrap(), Some(42));
    }

    #[test]
    fn singleton_instance_is_idempotent() {
        let first = Manager::instance(Manager::builder().with_cwd(Path::parse("/singleton-a").unwrap())).unwrap();
        let second = Manager::instance(Manager::builder().with_cwd(Path::parse("/singleton-b").unwrap())).unwrap();
        assert!(StdArc::ptr_eq(&first, &second));
        assert_eq!(first.get_cwd().path(), second.get_cwd().path());
    }
}
