/// The Manager's composed error type: every collaborator error it touches,
/// plus the scheme-dispatch failures that belong to the open pipeline itself
/// (§7: `rcPath, rcInvalid` / `rcPath, rcUnsupported`).
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("path is invalid and cannot be opened")]
    InvalidPath,
    #[error("scheme {0:?} is not supported by the open pipeline")]
    UnsupportedScheme(String),
    #[error("direct file-open of an x-ncbi-legrefseq path is not meaningful; open as a directory instead")]
    LegrefseqNotAFile,
    #[error("{0:?} is not a regular file (directory, device, or special file)")]
    NotARegularFile(String),
    #[error("argument {0} must not be null/empty")]
    InvalidArgument(&'static str),
    #[error(transparent)]
    Path(#[from] vfs_path::PathError),
    #[error(transparent)]
    Resolve(#[from] vfs_resolve::ResolveError),
    #[error(transparent)]
    Keystore(#[from] vfs_keystore::KeystoreError),
    #[error(transparent)]
    Crypto(#[from] vfs_crypto::CryptoError),
    #[error(transparent)]
    Stream(#[from] vfs_stream::StreamError),
    #[error(transparent)]
    Archive(#[from] vfs_archive::ArchiveError),
    #[error(transparent)]
    Config(#[from] vfs_config::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
