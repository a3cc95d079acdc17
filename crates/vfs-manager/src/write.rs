//! Write-side dispatch (§4.4: `OpenFileWrite`/`CreateFile`/`Remove`). The
//! underlying filesystem abstraction is an external collaborator (§1) —
//! this module only resolves the Path, checks it's locally addressable,
//! and hands native-path writes to whatever [`FsAbstraction`] the Manager
//! was built with, wrapping the result in the encryption stage when the
//! Path's `encrypted` option is set.

use std::fs;
use std::sync::Arc;

use vfs_crypto::{Cipher, EnvelopeFormat};
use vfs_path::{Path, SchemeType};

use crate::error::ManagerError;

/// The filesystem-abstraction collaborator (§1: "the underlying filesystem
/// abstraction (`open`, `resolve`, `path-type`)"). A real implementation may
/// add quota checks, locking, or a different backing store; this crate only
/// needs create/open-for-write/remove over a native path string.
pub trait FsAbstraction: Send + Sync {
    fn create(&self, native_path: &str, mode: u32) -> Result<Box<dyn WriteStream>, ManagerError>;
    fn open_write(&self, native_path: &str, update: bool) -> Result<Box<dyn WriteStream>, ManagerError>;
    fn remove(&self, native_path: &str, force: bool) -> Result<(), ManagerError>;
}

/// An open, positional write destination. Mirrors [`vfs_stream::RandomAccess`]
/// on the read side: every stage writes at an explicit offset rather than
/// through a shared cursor, so concurrent writers to disjoint regions don't
/// contend.
pub trait WriteStream: Send {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<usize, ManagerError>;
}

/// The default [`FsAbstraction`]: plain local files via `std::fs`.
#[derive(Default)]
pub struct LocalFsAbstraction;

impl FsAbstraction for LocalFsAbstraction {
    fn create(&self, native_path: &str, mode: u32) -> Result<Box<dyn WriteStream>, ManagerError> {
        let mut options = fs::OpenOptions::new();
        options.read(true).write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        let file = options.open(native_path)?;
        Ok(Box::new(LocalWriteStream(file)))
    }

    fn open_write(&self, native_path: &str, update: bool) -> Result<Box<dyn WriteStream>, ManagerError> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(!update)
            .truncate(false)
            .open(native_path)?;
        Ok(Box::new(LocalWriteStream(file)))
    }

    fn remove(&self, native_path: &str, force: bool) -> Result<(), ManagerError> {
        match fs::remove_file(native_path) {
            Ok(()) => Ok(()),
            Err(e) if force && e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ManagerError::Io(e)),
        }
    }
}

struct LocalWriteStream(fs::File);

impl WriteStream for LocalWriteStream {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<usize, ManagerError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.0.write_all_at(buf, offset)?;
            Ok(buf.len())
        }
        #[cfg(not(unix))]
        {
            use std::io::{Seek, SeekFrom, Write};
            self.0.seek(SeekFrom::Start(offset))?;
            self.0.write_all(buf)?;
            Ok(buf.len())
        }
    }
}

/// Wraps a [`WriteStream`] so every write is transformed through `cipher`
/// before reaching the backing store, and the envelope magic is written once
/// up front. Sound only because the recognized envelope families use a
/// counter-mode stream cipher: XOR-ing a keystream against plaintext is its
/// own inverse, so the same [`Cipher::decrypt`] call that the read side uses
/// to recover plaintext is exactly the transform that produces ciphertext
/// here — there's no separate "encrypt" operation to define.
pub struct EncryptingWriteStream {
    inner: Box<dyn WriteStream>,
    cipher: Arc<dyn Cipher>,
    key: Vec<u8>,
    header_len: u64,
    header_written: bool,
    format: EnvelopeFormat,
}

impl EncryptingWriteStream {
    pub fn new(inner: Box<dyn WriteStream>, cipher: Arc<dyn Cipher>, key: Vec<u8>, format: EnvelopeFormat) -> Self {
        EncryptingWriteStream {
            inner,
            cipher,
            key,
            header_len: vfs_crypto::envelope_header_len(format),
            header_written: false,
            format,
        }
    }
}

impl WriteStream for EncryptingWriteStream {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<usize, ManagerError> {
        if !self.header_written {
            let magic = vfs_crypto::envelope_magic(self.format);
            self.inner.write_at(0, magic)?;
            self.header_written = true;
        }
        let mut data = buf.to_vec();
        self.cipher
            .decrypt(&self.key, offset, &mut data)
            .map_err(vfs_stream::StreamError::from)?;
        self.inner.write_at(self.header_len + offset, &data)
    }
}

pub(crate) fn check_locally_addressable(path: &Path) -> Result<(), ManagerError> {
    match path.scheme_type() {
        SchemeType::None | SchemeType::File | SchemeType::NcbiFile | SchemeType::NcbiVfs => Ok(()),
        SchemeType::Invalid => Err(ManagerError::InvalidPath),
        other => Err(ManagerError::UnsupportedScheme(format!("{other:?} is not writable"))),
    }
}

pub(crate) fn native_path(path: &Path, base_dir: &Path) -> Result<String, ManagerError> {
    let joined = vfs_resolve::join_relative(base_dir, path)?;
    Ok(joined.path().to_string())
}
