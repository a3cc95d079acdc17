//! A small registry mapping an [`EnvelopeFormat`] to the [`Cipher`] that
//! decrypts it, so the open pipeline can look one up once the encryption
//! probe (§4.6 step 4) has identified which envelope family a prefix matched.

use std::collections::HashMap;
use std::sync::Arc;

use vfs_crypto::{Cipher, EnvelopeFormat};

#[derive(Default, Clone)]
pub struct CipherRegistry {
    ciphers: HashMap<EnvelopeFormat, Arc<dyn Cipher>>,
}

impl CipherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.ciphers.insert(cipher.format(), cipher);
        self
    }

    pub fn get(&self, format: EnvelopeFormat) -> Option<Arc<dyn Cipher>> {
        self.ciphers.get(&format).cloned()
    }
}
