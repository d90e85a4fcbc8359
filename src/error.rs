//! Error types for the PDF protection engine

use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for PDF protection operations
#[derive(Error, Debug)]
pub enum PdfGuardError {
    /// The byte sequence is not a readable PDF container
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// Cross-reference offsets do not resolve to the objects they name
    #[error("Broken cross-reference: {0}")]
    BrokenXref(String),

    /// Encryption dictionary uses a V/R pair this engine does not implement
    #[error("Unsupported encryption revision: {0}")]
    UnsupportedEncryptionRevision(i64),

    /// Encryption dictionary names a security handler other than Standard
    #[error("Unsupported security handler: {0}")]
    UnsupportedSecurityHandler(String),

    /// Password matched neither the owner nor the user verification hash
    #[error("Wrong password")]
    WrongPassword,

    /// Document already carries an encryption dictionary
    #[error("Document is already protected")]
    AlreadyProtected,

    /// Document has no encryption dictionary to remove
    #[error("Document is not protected")]
    NotProtected,

    /// Cipher input was malformed (bad padding, short block, bad key size)
    #[error("Cryptographic operation failed: {0}")]
    CryptoError(String),

    /// File system failure in the host helper layer
    #[error("IO error: {0}")]
    IoBoundary(#[from] io::Error),
}

/// Result type for PDF protection operations
pub type PdfGuardResult<T> = Result<T, PdfGuardError>;

/// Coarse error classification handed to hosts for transport mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedContainer,
    BrokenXref,
    UnsupportedEncryptionRevision,
    WrongPassword,
    AlreadyProtected,
    NotProtected,
    IoBoundary,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorKind::MalformedContainer => "MALFORMED_CONTAINER",
            ErrorKind::BrokenXref => "BROKEN_XREF",
            ErrorKind::UnsupportedEncryptionRevision => "UNSUPPORTED_ENCRYPTION_REVISION",
            ErrorKind::WrongPassword => "WRONG_PASSWORD",
            ErrorKind::AlreadyProtected => "ALREADY_PROTECTED",
            ErrorKind::NotProtected => "NOT_PROTECTED",
            ErrorKind::IoBoundary => "IO_BOUNDARY",
        };
        f.write_str(code)
    }
}

impl PdfGuardError {
    /// Create a new malformed container error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedContainer(msg.into())
    }

    /// Create a new broken cross-reference error
    pub fn broken_xref(msg: impl Into<String>) -> Self {
        Self::BrokenXref(msg.into())
    }

    /// Create a new crypto error
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::CryptoError(msg.into())
    }

    /// Classify this error for the host
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedContainer(_) | Self::CryptoError(_) => ErrorKind::MalformedContainer,
            Self::BrokenXref(_) => ErrorKind::BrokenXref,
            Self::UnsupportedEncryptionRevision(_) | Self::UnsupportedSecurityHandler(_) => {
                ErrorKind::UnsupportedEncryptionRevision
            }
            Self::WrongPassword => ErrorKind::WrongPassword,
            Self::AlreadyProtected => ErrorKind::AlreadyProtected,
            Self::NotProtected => ErrorKind::NotProtected,
            Self::IoBoundary(_) => ErrorKind::IoBoundary,
        }
    }

    /// Check if error means the container could not be read
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MalformedContainer | ErrorKind::BrokenXref
        )
    }

    /// Check if error is authentication related
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::WrongPassword)
    }
}

impl From<cbc::cipher::InvalidLength> for PdfGuardError {
    fn from(err: cbc::cipher::InvalidLength) -> Self {
        Self::CryptoError(format!("invalid key or IV length: {}", err))
    }
}

impl From<cbc::cipher::block_padding::UnpadError> for PdfGuardError {
    fn from(err: cbc::cipher::block_padding::UnpadError) -> Self {
        Self::CryptoError(format!("invalid AES padding: {}", err))
    }
}
