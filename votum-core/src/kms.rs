//! Key-management capability consumed by the pipeline

use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyServiceError {
    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("key service rejected the request: {0}")]
    Service(String),
}

/// Turns a plaintext candidate selection into opaque ciphertext bytes.
/// The pipeline never interprets the output; it only persists a
/// storage-safe encoding of it.
#[trait_variant::make(Send)]
pub trait KeyService {
    async fn encrypt(&self, key_name: &str, plaintext: &[u8]) -> Result<Vec<u8>, KeyServiceError>;
}

impl<T> KeyService for Arc<T>
where
    T: KeyService + Send + Sync,
{
    async fn encrypt(&self, key_name: &str, plaintext: &[u8]) -> Result<Vec<u8>, KeyServiceError> {
        (**self).encrypt(key_name, plaintext).await
    }
}
