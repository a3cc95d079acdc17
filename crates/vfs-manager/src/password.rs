//! `GetKryptoPassword`/`UpdateKryptoPassword` (§4.4): the one place the
//! Manager writes to disk outside the cache-tee stage, so it follows the
//! single-writer staging discipline §5 calls for: write to `*.tmp`, rename
//! over the old file to get atomicity from the filesystem.

use std::fs;
use std::path::{Path as FsPath, PathBuf};

use tracing::{debug, warn};

use crate::error::ManagerError;

/// Directory mode ceiling §4.4 requires: "verify directory mode does not
/// permit world/group read beyond `0750`" (owner rwx, group r-x, other none).
#[cfg(unix)]
const MAX_DIR_MODE: u32 = 0o750;

/// Reads the currently configured krypto password file, normalizes it (first
/// `\n`/`\r` terminates the key, 4096 byte ceiling), and copies as much as
/// fits into `buf`. Returns the number of bytes written, truncation
/// signalled the same way the path serializer's `Read*` family does: an
/// error and zero bytes copied.
pub fn get_krypto_password(
    keystore: &dyn vfs_keystore::KeyStore,
    buf: &mut [u8],
) -> Result<usize, ManagerError> {
    let key = vfs_keystore::normalize_key(keystore.current_key()?)?;
    if key.len() > buf.len() {
        return Err(ManagerError::Stream(vfs_stream::StreamError::PastEnd {
            offset: buf.len() as u64,
            size: key.len() as u64,
        }));
    }
    buf[..key.len()].copy_from_slice(&key);
    Ok(key.len())
}

/// Atomically rewrites the global krypto password file with `new_password`.
///
/// If the file already holds a different key, the old file's tail (anything
/// past its first key line — typically retained historical keys so files
/// encrypted under an older password can still be decrypted) is preserved
/// beneath the new one. If the stored key is unchanged, this is a no-op.
pub fn update_krypto_password(pwfile: &FsPath, new_password: &[u8]) -> Result<(), ManagerError> {
    check_directory_mode(pwfile)?;

    let existing = fs::read(pwfile).ok();
    let old_key = existing.as_deref().map(first_line);

    if old_key == Some(new_password) {
        debug!(path = %pwfile.display(), "krypto password unchanged, skipping rewrite");
        return Ok(());
    }

    let mut new_content = new_password.to_vec();
    if let Some(old_bytes) = &existing {
        let tail = tail_after_first_line(old_bytes);
        if !tail.is_empty() {
            new_content.push(b'\n');
            new_content.extend_from_slice(tail);
        }
    }

    let tmp_path: PathBuf = {
        let mut p = pwfile.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };

    fs::write(&tmp_path, &new_content)?;
    fs::rename(&tmp_path, pwfile)?;
    debug!(path = %pwfile.display(), "krypto password file rewritten atomically");
    Ok(())
}

fn first_line(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == b'\n' || b == b'\r') {
        Some(i) => &bytes[..i],
        None => bytes,
    }
}

fn tail_after_first_line(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == b'\n' || b == b'\r') {
        Some(i) => {
            let mut rest = &bytes[i..];
            while rest.first() == Some(&b'\n') || rest.first() == Some(&b'\r') {
                rest = &rest[1..];
            }
            rest
        }
        None => &[],
    }
}

#[cfg(unix)]
fn check_directory_mode(pwfile: &FsPath) -> Result<(), ManagerError> {
    use std::os::unix::fs::PermissionsExt;

    let dir = pwfile.parent().unwrap_or_else(|| FsPath::new("."));
    if !dir.exists() {
        return Ok(());
    }
    let mode = fs::metadata(dir)?.permissions().mode() & 0o777;
    if mode & !MAX_DIR_MODE != 0 {
        warn!(
            dir = %dir.display(),
            mode = format!("{mode:o}"),
            "krypto password directory permits access beyond 0750"
        );
        return Err(ManagerError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!(
                "directory {} has mode {:o}, which exceeds the 0750 ceiling",
                dir.display(),
                mode
            ),
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_directory_mode(_pwfile: &FsPath) -> Result<(), ManagerError> {
    Ok(())
}
