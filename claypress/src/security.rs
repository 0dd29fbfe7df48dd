//! Hook for encrypting the file while it is written. The algorithms live
//! behind the trait; this crate only decides what gets encrypted and with
//! which object key.

use crate::pdf::{Document, ObjectKey};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SecurityError(pub String);

/// Encrypts stream payloads and strings. The object key feeds the per-object
/// key derivation.
pub trait SecurityHandler {
    /// Called once before the first object is written.
    fn prepare_for_encryption(&mut self, document: &Document) -> Result<(), SecurityError>;

    fn encrypt_stream(&self, data: &[u8], key: ObjectKey) -> Result<Vec<u8>, SecurityError>;

    fn encrypt_string(&self, data: &[u8], key: ObjectKey) -> Result<Vec<u8>, SecurityError>;

    fn decrypt_string(&self, data: &[u8], key: ObjectKey) -> Result<Vec<u8>, SecurityError>;
}
