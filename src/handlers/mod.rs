//! Security handlers for PDF encryption/decryption

mod standard;

pub use standard::StandardSecurityHandler;

use log::debug;

use crate::error::{PdfGuardError, PdfGuardResult};
use crate::pdf::Dictionary;
use crate::security::DerivedKey;
use crate::EncryptionAlgorithm;

/// Security handler named by an encryption dictionary's `/Filter`
#[derive(Debug, Clone)]
pub enum SecurityHandler {
    /// Standard password-based security handler
    Standard(StandardSecurityHandler),
}

impl SecurityHandler {
    /// Pick the handler for an encryption dictionary
    pub fn from_dict(dict: &Dictionary) -> PdfGuardResult<Self> {
        match dict.get_name("Filter") {
            Some(b"Standard") => Ok(SecurityHandler::Standard(StandardSecurityHandler::from_dict(dict)?)),
            Some(other) => Err(PdfGuardError::UnsupportedSecurityHandler(
                String::from_utf8_lossy(other).into_owned(),
            )),
            None => Err(PdfGuardError::malformed("encryption dictionary without /Filter")),
        }
    }

    /// Authenticate with password
    pub fn authenticate_password(&self, password: &str, document_id: &[u8]) -> PdfGuardResult<DerivedKey> {
        debug!("Attempting password authentication");
        match self {
            SecurityHandler::Standard(handler) => handler.derive_keys(password, document_id),
        }
    }

    /// Get encryption algorithm
    pub fn algorithm(&self) -> EncryptionAlgorithm {
        match self {
            SecurityHandler::Standard(handler) => handler.algorithm(),
        }
    }

    /// Create dictionary representation
    pub fn to_dict(&self) -> Dictionary {
        match self {
            SecurityHandler::Standard(handler) => handler.to_dict(),
        }
    }
}
