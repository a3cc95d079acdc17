/// Errors from archive-format detection and directory mounting, per §7's
/// I/O kind (`directory` target) plus the `sra` resolution-kind tuples.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("stream does not support random access, required to mount a directory view")]
    NoRandomAccess,
    /// §4.6 step 2: "fail with a message distinguishing 'wrong password' (if
    /// the stream was encrypted) from 'unknown format'".
    #[error("{}", if *likely_wrong_password { "unrecognized archive format (stream was decrypted: likely wrong password)" } else { "unrecognized archive format" })]
    UnknownFormat { likely_wrong_password: bool },
    #[error("no subdirectory named {0:?} in this archive")]
    SubdirectoryNotFound(String),
    #[error("no file named {0:?} in this archive")]
    FileNotFound(String),
    #[error(transparent)]
    Stream(#[from] vfs_stream::StreamError),
}
