/// Errors from key acquisition and the keystore collaborator, per §7's
/// Crypto kind (`encryptionKey` target).
#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    #[error("no encryption key is available from any configured source")]
    NotFound,
    #[error("key exceeds the 4096 byte limit ({0} bytes)")]
    TooLarge(usize),
    #[error("failed to read key material from {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
