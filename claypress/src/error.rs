use crate::{pdf::ObjectKey, security::SecurityError};

#[derive(Debug, thiserror::Error)]
pub enum CbError {
    #[error("I/O error while writing: {0}")]
    Io(#[from] std::io::Error),
    /// A reference points to an object that never received an identity.
    #[error("reference {0} can't be resolved to a written object")]
    UnresolvedReference(ObjectKey),
    /// No object number is left to mint a new identity.
    #[error("object numbers are exhausted")]
    IdentityExhausted,
    /// Streams can only be written as indirect objects.
    #[error("stream can't be written as a direct object")]
    DirectStream,
    #[error("document has no root object")]
    MissingRoot,
    #[error("document requests encryption but no security handler is set")]
    MissingSecurityHandler,
    #[error("security handler failed: {0}")]
    Security(#[from] SecurityError),
    /// Two written objects claimed the same object number.
    #[error("object {0} is listed twice in the cross-reference section")]
    DuplicateXrefEntry(u32),
}

pub type Result<T> = std::result::Result<T, CbError>;
