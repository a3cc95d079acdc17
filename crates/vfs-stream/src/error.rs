/// Errors from stream composition and I/O, per §7's I/O kind.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream does not support random access")]
    NoRandomAccess,
    #[error(transparent)]
    Crypto(#[from] vfs_crypto::CryptoError),
    #[error("remote transport error: {0}")]
    Transport(String),
    #[error("read past end of stream at offset {offset} (size {size})")]
    PastEnd { offset: u64, size: u64 },
}
