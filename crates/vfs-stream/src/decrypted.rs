//! Decryption stage: wraps a raw (still-enveloped) stream, skips the magic
//! header, and decrypts ciphertext through a [`vfs_crypto::Cipher`] on every
//! read (§4.6 step 4).

use std::sync::Arc;

use vfs_crypto::Cipher;

use crate::error::StreamError;
use crate::RandomAccess;

pub struct DecryptedStream {
    inner: Arc<dyn RandomAccess>,
    cipher: Arc<dyn Cipher>,
    key: Vec<u8>,
    header_len: u64,
}

impl DecryptedStream {
    pub fn new(
        inner: Arc<dyn RandomAccess>,
        cipher: Arc<dyn Cipher>,
        key: Vec<u8>,
        header_len: u64,
    ) -> Self {
        DecryptedStream {
            inner,
            cipher,
            key,
            header_len,
        }
    }
}

impl RandomAccess for DecryptedStream {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
        let n = self.inner.read_at(self.header_len + offset, buf)?;
        self.cipher
            .decrypt(&self.key, offset, &mut buf[..n])
            .map_err(StreamError::from)?;
        Ok(n)
    }

    fn size(&self) -> Result<u64, StreamError> {
        let raw = self.inner.size()?;
        let ciphertext_len = raw.saturating_sub(self.header_len);
        Ok(self.cipher.plaintext_len(ciphertext_len))
    }

    fn supports_random_access(&self) -> bool {
        self.inner.supports_random_access()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfs_crypto::{EnvelopeFormat, NullCipher};

    struct FixedSource(Vec<u8>);
    impl RandomAccess for FixedSource {
        fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
            if offset >= self.0.len() as u64 {
                return Ok(0);
            }
            let start = offset as usize;
            let n = buf.len().min(self.0.len() - start);
            buf[..n].copy_from_slice(&self.0[start..start + n]);
            Ok(n)
        }
        fn size(&self) -> Result<u64, StreamError> {
            Ok(self.0.len() as u64)
        }
    }

    #[test]
    fn decrypted_stream_skips_header_and_round_trips() {
        let cipher: Arc<dyn Cipher> = Arc::new(NullCipher::new(EnvelopeFormat::Aes));
        let key = b"topsecret".to_vec();

        let plaintext = b"the quick brown fox".to_vec();
        let mut ciphertext = plaintext.clone();
        cipher.decrypt(&key, 0, &mut ciphertext).unwrap();

        let mut envelope = b"NCBInenc".to_vec();
        envelope.extend_from_slice(&ciphertext);

        let inner: Arc<dyn RandomAccess> = Arc::new(FixedSource(envelope));
        let decrypted = DecryptedStream::new(inner, cipher, key, 8);

        assert_eq!(decrypted.size().unwrap(), plaintext.len() as u64);
        let mut buf = vec![0u8; plaintext.len()];
        decrypted.read_at(0, &mut buf).unwrap();
        assert_eq!(buf, plaintext);
    }
}
