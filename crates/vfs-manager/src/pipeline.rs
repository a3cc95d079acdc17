//! The open pipeline (component F, §4.6): dispatches a resolved [`Path`] by
//! `scheme_type` to a local, remote, or (on request) directory-shaped open,
//! inserting buffering, cache-tee, and decryption stages along the way.

use std::fs;
use std::sync::Arc;

use tracing::debug;
use vfs_archive::{ArchiveReader, DirectoryView, MountPoint};
use vfs_crypto::PROBE_PREFIX_LEN;
use vfs_keystore::KeyStore;
use vfs_path::{Path, SchemeType};
use vfs_resolve::ResolverOracle;
use vfs_stream::{
    BufferedStream, CacheTeeStream, DecryptedStream, FdStream, LocalFileStream, NullStream,
    RandomAccess, RemoteStream, RemoteTransport, StdinStream,
};

use crate::ciphers::CipherRegistry;
use crate::error::ManagerError;

/// Read-side buffer size placed above a local stream, or above a remote
/// stream with no cache location (§4.6: "256 MiB" / "128 MiB").
const LOCAL_BUFFER_SIZE: usize = 256 * 1024 * 1024;
const REMOTE_BUFFER_SIZE: usize = 128 * 1024 * 1024;

/// Caller-facing open flags (§4.4/§4.6): `force_decrypt` is the manager's
/// `OpenFileReadDecrypt`/`OpenDirectoryReadDecrypt` variant of a plain open.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    pub force_decrypt: bool,
}

/// Everything the pipeline needs from the Manager to dispatch an open,
/// gathered into one borrow so `open_file_read`/`open_directory_read` don't
/// need a dozen parameters apiece.
pub struct PipelineContext<'a> {
    pub oracle: Option<&'a dyn ResolverOracle>,
    pub keystore: &'a dyn KeyStore,
    pub ciphers: &'a CipherRegistry,
    pub transport: Option<Arc<dyn RemoteTransport>>,
    pub sra_reader: Option<&'a dyn ArchiveReader>,
    pub tar_reader: Option<&'a dyn ArchiveReader>,
    pub base_dir: &'a Path,
}

pub fn open_file_read(
    ctx: &PipelineContext<'_>,
    path: &Path,
    flags: OpenFlags,
) -> Result<Arc<dyn RandomAccess>, ManagerError> {
    Ok(open_file_read_tracking(ctx, path, flags)?.0)
}

/// As [`open_file_read`], but also reports whether the encryption probe
/// matched — the directory-open path needs this to distinguish "wrong
/// password" from "unknown format" (§4.6 step 2 / §7).
pub fn open_file_read_tracking(
    ctx: &PipelineContext<'_>,
    path: &Path,
    flags: OpenFlags,
) -> Result<(Arc<dyn RandomAccess>, bool), ManagerError> {
    match path.scheme_type() {
        SchemeType::Invalid => Err(ManagerError::InvalidPath),
        SchemeType::NotSupported => {
            Err(ManagerError::UnsupportedScheme(path.scheme().to_string()))
        }
        SchemeType::NcbiLegrefseq => Err(ManagerError::LegrefseqNotAFile),
        SchemeType::NcbiAcc => {
            let oracle = ctx.oracle.ok_or_else(|| {
                ManagerError::UnsupportedScheme("ncbi-acc (no resolver configured)".to_string())
            })?;
            let resolution =
                vfs_resolve::resolve_path(oracle, vfs_resolve::ResolveFlags::default(), path)?;
            open_file_read_tracking(ctx, &resolution.path, flags)
        }
        SchemeType::None | SchemeType::File | SchemeType::NcbiFile | SchemeType::NcbiVfs => {
            open_local(ctx, path, flags)
        }
        SchemeType::Http | SchemeType::Https | SchemeType::Ftp | SchemeType::Fasp => {
            open_remote(ctx, path, flags)
        }
        SchemeType::NcbiObj => Err(ManagerError::UnsupportedScheme(
            "ncbi-obj (resolve via object bindings before opening)".to_string(),
        )),
    }
}

/// §4.6 "OpenDirectoryRead(path)": opens `path` as a file, then transforms it
/// into a directory view by archive-magic dispatch, descending into the
/// fragment subdirectory if one was given.
pub fn open_directory_read(
    ctx: &PipelineContext<'_>,
    path: &Path,
    flags: OpenFlags,
) -> Result<Box<dyn DirectoryView>, ManagerError> {
    let is_remote = path.scheme_type().is_remote();

    let (stream, was_decrypted) = open_file_read_tracking(ctx, path, flags)?;

    let stream = if is_remote {
        // A remote directory-open wraps the cached/streamed file in a
        // synthetic single-entry mount point first, so the archive reader
        // sees a conventional named path rather than a bare stream (§4.6).
        let name = mount_point_name(path);
        let mount = MountPoint::new(name.clone(), stream);
        mount.open_file(&name)?
    } else {
        stream
    };

    let sra_reader = ctx
        .sra_reader
        .ok_or_else(|| ManagerError::UnsupportedScheme("no SRA/KAR archive reader configured".to_string()))?;
    let tar_reader = ctx
        .tar_reader
        .ok_or_else(|| ManagerError::UnsupportedScheme("no TAR archive reader configured".to_string()))?;
    let root = vfs_archive::open_as_directory(stream, sra_reader, tar_reader, was_decrypted)?;

    if path.fragment().is_empty() {
        Ok(root)
    } else {
        Ok(vfs_archive::open_fragment_subdirectory(root, path.fragment())?)
    }
}

fn mount_point_name(path: &Path) -> String {
    let text = path.path();
    match text.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => text.to_string(),
    }
}

fn open_local(
    ctx: &PipelineContext<'_>,
    path: &Path,
    flags: OpenFlags,
) -> Result<(Arc<dyn RandomAccess>, bool), ManagerError> {
    let native = resolve_native_path(ctx, path)?;

    if native == "/dev/stdin" {
        return Ok((Arc::new(StdinStream::new()), false));
    }
    if native == "/dev/null" {
        return Ok((Arc::new(NullStream), false));
    }
    if let Some(n) = native.strip_prefix("/dev/fd/") {
        let fd: i32 = n
            .parse()
            .map_err(|_| ManagerError::NotARegularFile(native.clone()))?;
        return Ok((Arc::new(FdStream::open(fd)?), false));
    }

    check_regular_file(&native)?;
    let file = fs::File::open(&native)?;
    let raw: Arc<dyn RandomAccess> = Arc::new(LocalFileStream::open(file)?);

    let (stream, was_decrypted) = apply_encryption_probe(ctx, path, raw, flags)?;
    Ok((Arc::new(BufferedStream::new(stream, LOCAL_BUFFER_SIZE)), was_decrypted))
}

fn resolve_native_path(ctx: &PipelineContext<'_>, path: &Path) -> Result<String, ManagerError> {
    let joined = vfs_resolve::join_relative(ctx.base_dir, path)?;
    Ok(joined.path().to_string())
}

#[cfg(unix)]
fn check_regular_file(native: &str) -> Result<(), ManagerError> {
    use std::os::unix::fs::FileTypeExt;

    let meta = fs::metadata(native)?;
    let ft = meta.file_type();
    if ft.is_file() {
        Ok(())
    } else if ft.is_dir()
        || ft.is_char_device()
        || ft.is_block_device()
        || ft.is_fifo()
        || ft.is_socket()
    {
        Err(ManagerError::NotARegularFile(native.to_string()))
    } else {
        Err(ManagerError::NotARegularFile(native.to_string()))
    }
}

#[cfg(not(unix))]
fn check_regular_file(native: &str) -> Result<(), ManagerError> {
    let meta = fs::metadata(native)?;
    if meta.file_type().is_file() {
        Ok(())
    } else {
        Err(ManagerError::NotARegularFile(native.to_string()))
    }
}

fn open_remote(
    ctx: &PipelineContext<'_>,
    path: &Path,
    flags: OpenFlags,
) -> Result<(Arc<dyn RandomAccess>, bool), ManagerError> {
    let transport = ctx
        .transport
        .clone()
        .ok_or_else(|| ManagerError::UnsupportedScheme("remote transport not configured".to_string()))?;
    let uri = path.to_canonical_string();

    let remote: Arc<dyn RandomAccess> = Arc::new(RemoteStream::new(transport, uri.clone()));

    let cache_location = match ctx.oracle {
        Some(oracle) => oracle.cache(path)?,
        None => None,
    };

    let pre: Arc<dyn RandomAccess> = match cache_location {
        Some(cache_path) => {
            let cache_file = fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(cache_path.path())?;
            debug!(cache = %cache_path.path(), "tee-ing remote reads into local cache");
            Arc::new(CacheTeeStream::new(remote, cache_file)?)
        }
        None => Arc::new(BufferedStream::new(remote, REMOTE_BUFFER_SIZE)),
    };

    apply_encryption_probe(ctx, path, pre, flags)
}

fn apply_encryption_probe(
    ctx: &PipelineContext<'_>,
    path: &Path,
    raw: Arc<dyn RandomAccess>,
    flags: OpenFlags,
) -> Result<(Arc<dyn RandomAccess>, bool), ManagerError> {
    if !(path.is_encrypted() || flags.force_decrypt) {
        return Ok((raw, false));
    }

    let size = raw.size()?;
    let probe_len = (PROBE_PREFIX_LEN as u64).min(size) as usize;
    let mut prefix = vec![0u8; probe_len];
    if probe_len > 0 {
        raw.read_at(0, &mut prefix)?;
    }

    match vfs_crypto::detect_envelope(&prefix) {
        Some(format) => {
            let cipher = ctx
                .ciphers
                .get(format)
                .ok_or(ManagerError::Crypto(vfs_crypto::CryptoError::InvalidKey))?;
            let key = vfs_keystore::acquire_key(path, ctx.keystore)?;
            let header_len = vfs_crypto::envelope_header_len(format);
            let decrypted: Arc<dyn RandomAccess> =
                Arc::new(DecryptedStream::new(raw, cipher, key, header_len));
            Ok((decrypted, true))
        }
        // §7: the probe never raises on "not an envelope" — it silently
        // returns the raw stream.
        None => Ok((raw, false)),
    }
}
