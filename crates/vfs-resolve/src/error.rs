/// Errors the resolver facade can raise, per §7's Resolution kind plus the
/// one `rcNotFound` I/O case the facade itself recovers from.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("accession {0:?} not available locally or remotely")]
    NotAvailable(String),
    #[error("resolver oracle does not support this operation")]
    Unsupported,
    #[error("path not found: {0:?}")]
    PathNotFound(String),
    #[error("resolver oracle returned both a local and a remote path for {0:?}")]
    AmbiguousResolution(String),
    #[error(transparent)]
    Path(#[from] vfs_path::PathError),
}
