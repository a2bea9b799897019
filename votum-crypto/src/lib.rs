//! Local implementation of the vote key-service capability
//!
//! A stand-in for an external KMS: keys are registered under a
//! resource name and payloads are sealed with ChaCha20-Poly1305.
//! Output layout is `nonce (12) || tag (16) || ciphertext`, treated as
//! opaque bytes by callers.

use std::collections::HashMap;

use cryptoxide::chacha20poly1305::ChaCha20Poly1305;
use rand::RngCore;
use thiserror::Error;

use votum_core::kms::{KeyService, KeyServiceError};

pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("key material is not valid hex")]
    Hex(#[from] hex::FromHexError),

    #[error("key material must be {KEY_LEN} bytes, got {0}")]
    Length(usize),
}

/// Named-key registry implementing the `KeyService` capability
#[derive(Default)]
pub struct LocalKeyService {
    keys: HashMap<String, [u8; KEY_LEN]>,
}

impl LocalKeyService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, name: impl Into<String>, material: [u8; KEY_LEN]) -> Self {
        self.keys.insert(name.into(), material);
        self
    }

    /// Registers hex-encoded key material under a resource name
    pub fn with_hex_key(
        self,
        name: impl Into<String>,
        material: &str,
    ) -> Result<Self, MaterialError> {
        let bytes = hex::decode(material)?;

        let material: [u8; KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| MaterialError::Length(bytes.len()))?;

        Ok(self.with_key(name, material))
    }

    /// Inverse of `encrypt`, available for audit tooling and tests;
    /// the ingestion pipeline never calls it
    pub fn open(&self, key_name: &str, sealed: &[u8]) -> Result<Vec<u8>, KeyServiceError> {
        let key = self.lookup(key_name)?;

        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(KeyServiceError::Service("ciphertext too short".into()));
        }

        let (nonce, rest) = sealed.split_at(NONCE_LEN);
        let (tag, body) = rest.split_at(TAG_LEN);

        let mut cipher = ChaCha20Poly1305::new(key, nonce, &[]);
        let mut plaintext = vec![0u8; body.len()];

        if !cipher.decrypt(body, &mut plaintext, tag) {
            return Err(KeyServiceError::Service("authentication failed".into()));
        }

        Ok(plaintext)
    }

    fn lookup(&self, key_name: &str) -> Result<&[u8; KEY_LEN], KeyServiceError> {
        self.keys
            .get(key_name)
            .ok_or_else(|| KeyServiceError::UnknownKey(key_name.to_owned()))
    }

    fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Vec<u8> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut cipher = ChaCha20Poly1305::new(key, &nonce, &[]);
        let mut body = vec![0u8; plaintext.len()];
        let mut tag = [0u8; TAG_LEN];
        cipher.encrypt(plaintext, &mut body, &mut tag);

        let mut sealed = Vec::with_capacity(NONCE_LEN + TAG_LEN + body.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&tag);
        sealed.extend_from_slice(&body);

        sealed
    }
}

impl KeyService for LocalKeyService {
    async fn encrypt(&self, key_name: &str, plaintext: &[u8]) -> Result<Vec<u8>, KeyServiceError> {
        let key = self.lookup(key_name)?;
        Ok(Self::seal(key, plaintext))
    }
}
