/// Errors from the cipher collaborator, per §7's Crypto kind.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key is invalid or empty")]
    InvalidKey,
    #[error("ciphertext is malformed or truncated")]
    Incorrect,
    #[error("output buffer too small for plaintext")]
    BufferInsufficient,
}
