//! PDF password protection for Rust
//!
//! Applies, removes and inspects Standard Security Handler encryption
//! (RC4 40/128-bit, AES-128 and AES-256) on PDF files held in memory.
//! The default is AES-256 with revision 6.
//!
//! ```no_run
//! use pdf_guard::PdfGuard;
//!
//! # fn main() -> pdf_guard::PdfGuardResult<()> {
//! let guard = PdfGuard::new();
//! let plain = std::fs::read("report.pdf")?;
//! let protected = guard.protect(&plain, "secret")?;
//! assert!(guard.is_protected(&protected)?);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

mod crypto;
mod error;
mod handlers;
pub mod host;
mod inspector;
mod options;
pub mod pdf;
mod rewriter;
mod security;

pub use crypto::{CryptMethod, CryptoEngine, Direction, PayloadKind, SecureRandom};
pub use error::{ErrorKind, PdfGuardError, PdfGuardResult};
pub use host::InspectionPolicy;
pub use inspector::EncryptionInfo;
pub use options::ProtectionOptions;
pub use pdf::Document;
pub use rewriter::Rewriter;
pub use security::{DerivedKey, PasswordRole};

use handlers::SecurityHandler;
use log::debug;

/// Supported encryption algorithms for PDF encryption
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncryptionAlgorithm {
    /// RC4 encryption with 40-bit key (PDF 1.3)
    RC4_40,
    /// RC4 encryption with 128-bit key (PDF 1.4)
    RC4_128,
    /// AES encryption with 128-bit key (PDF 1.6)
    AES_128,
    /// AES encryption with 256-bit key (PDF 2.0)
    #[default]
    AES_256,
}

impl EncryptionAlgorithm {
    /// `/V` entry
    pub fn version(&self) -> u8 {
        match self {
            EncryptionAlgorithm::RC4_40 => 1,
            EncryptionAlgorithm::RC4_128 => 2,
            EncryptionAlgorithm::AES_128 => 4,
            EncryptionAlgorithm::AES_256 => 5,
        }
    }

    /// `/R` entry
    pub fn revision(&self) -> u8 {
        match self {
            EncryptionAlgorithm::RC4_40 => 2,
            EncryptionAlgorithm::RC4_128 => 3,
            EncryptionAlgorithm::AES_128 => 4,
            EncryptionAlgorithm::AES_256 => 6,
        }
    }

    /// File key length in bytes
    pub fn key_length(&self) -> usize {
        match self {
            EncryptionAlgorithm::RC4_40 => 5,
            EncryptionAlgorithm::RC4_128 | EncryptionAlgorithm::AES_128 => 16,
            EncryptionAlgorithm::AES_256 => 32,
        }
    }

    /// Lowest header version that can carry this algorithm
    pub fn min_version(&self) -> &'static str {
        match self {
            EncryptionAlgorithm::RC4_40 => "1.1",
            EncryptionAlgorithm::RC4_128 => "1.4",
            EncryptionAlgorithm::AES_128 => "1.6",
            EncryptionAlgorithm::AES_256 => "2.0",
        }
    }

    pub(crate) fn crypt_method(&self) -> CryptMethod {
        match self {
            EncryptionAlgorithm::RC4_40 | EncryptionAlgorithm::RC4_128 => CryptMethod::Rc4,
            EncryptionAlgorithm::AES_128 => CryptMethod::AesV2,
            EncryptionAlgorithm::AES_256 => CryptMethod::AesV3,
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionAlgorithm::RC4_40 => write!(f, "RC4-40"),
            EncryptionAlgorithm::RC4_128 => write!(f, "RC4-128"),
            EncryptionAlgorithm::AES_128 => write!(f, "AES-128"),
            EncryptionAlgorithm::AES_256 => write!(f, "AES-256"),
        }
    }
}

/// PDF permissions flags (bits of `/P`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PDFPermissions(u32);

impl PDFPermissions {
    /// No permissions
    pub const NONE: u32 = 0;
    /// Print the document
    pub const PRINT: u32 = 1 << 2;
    /// Modify the document
    pub const MODIFY: u32 = 1 << 3;
    /// Copy text and graphics
    pub const COPY: u32 = 1 << 4;
    /// Add or modify annotations
    pub const ANNOTATE: u32 = 1 << 5;
    /// Fill form fields
    pub const FILL_FORMS: u32 = 1 << 8;
    /// Extract text and graphics for accessibility
    pub const EXTRACT: u32 = 1 << 9;
    /// Assemble the document
    pub const ASSEMBLE: u32 = 1 << 10;
    /// Print in high quality
    pub const PRINT_HIGH: u32 = 1 << 11;
    /// All permissions
    pub const ALL: u32 = 0x0F3C;

    /// Bits that must be set in `/P`
    const RESERVED: u32 = 0xFFFF_F0C0;

    /// Create new permissions from raw bits
    pub fn new(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    /// Get raw permission bits
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Check if specific permission is granted
    pub fn has_permission(&self, permission: u32) -> bool {
        (self.0 & permission) == permission
    }

    /// Signed `/P` value with the reserved bits set
    pub fn p_value(&self) -> i32 {
        (self.0 | Self::RESERVED) as i32
    }

    /// Permissions granted by a signed `/P` value; reserved bits are dropped
    pub fn from_p_value(p: i32) -> Self {
        Self::new(p as u32)
    }
}

/// Main PDF protection interface
#[derive(Clone)]
pub struct PdfGuard {
    engine: Arc<CryptoEngine>,
}

impl Default for PdfGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfGuard {
    /// Create a new PdfGuard instance
    pub fn new() -> Self {
        Self {
            engine: Arc::new(CryptoEngine::new()),
        }
    }

    /// Protect with AES-256, owner password equal to `password`, no permissions
    pub fn protect(&self, pdf_data: &[u8], password: &str) -> PdfGuardResult<Vec<u8>> {
        self.protect_with(pdf_data, &ProtectionOptions::with_password(password))
    }

    /// Protect with the algorithm, passwords and permissions in `options`
    pub fn protect_with(&self, pdf_data: &[u8], options: &ProtectionOptions) -> PdfGuardResult<Vec<u8>> {
        let doc = Document::parse(pdf_data)?;
        Rewriter::new(&self.engine).protect(&doc, options, &mut rand::thread_rng())
    }

    /// Remove protection, given either the owner or the user password
    pub fn unprotect(&self, pdf_data: &[u8], password: &str) -> PdfGuardResult<Vec<u8>> {
        let doc = Document::parse(pdf_data)?;
        Rewriter::new(&self.engine).unprotect(&doc, password)
    }

    /// True when the trailer carries an `/Encrypt` entry
    pub fn is_protected(&self, pdf_data: &[u8]) -> PdfGuardResult<bool> {
        inspector::is_protected(&Document::parse(pdf_data)?)
    }

    /// Get encryption information from PDF
    pub fn encryption_info(&self, pdf_data: &[u8]) -> PdfGuardResult<Option<EncryptionInfo>> {
        inspector::encryption_info(&Document::parse(pdf_data)?)
    }

    /// Which password `password` is, without rewriting anything
    pub fn verify_password(&self, pdf_data: &[u8], password: &str) -> PdfGuardResult<PasswordRole> {
        let doc = Document::parse(pdf_data)?;
        let dict = doc.encryption_dictionary()?.ok_or(PdfGuardError::NotProtected)?;
        let handler = SecurityHandler::from_dict(&dict)?;
        let key = handler.authenticate_password(password, doc.document_id().unwrap_or_default())?;
        debug!("Password verified as {}", key.role());
        Ok(key.role())
    }
}
