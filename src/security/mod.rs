//! Standard Security Handler key derivation and authentication

pub(crate) mod authentication;
pub(crate) mod key_derivation;
pub(crate) mod object_encryption;

use std::fmt;

use zeroize::Zeroizing;

use crate::crypto::{CryptMethod, PayloadKind};

/// Which password unlocked the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRole {
    Owner,
    User,
}

impl fmt::Display for PasswordRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordRole::Owner => write!(f, "owner"),
            PasswordRole::User => write!(f, "user"),
        }
    }
}

/// File encryption key plus what is needed to apply it
///
/// The key bytes are wiped on drop and never printed.
#[derive(Clone)]
pub struct DerivedKey {
    bytes: Zeroizing<Vec<u8>>,
    revision: u8,
    string_method: CryptMethod,
    stream_method: CryptMethod,
    encrypt_metadata: bool,
    role: PasswordRole,
}

impl DerivedKey {
    pub(crate) fn new(
        bytes: Zeroizing<Vec<u8>>,
        revision: u8,
        string_method: CryptMethod,
        stream_method: CryptMethod,
        encrypt_metadata: bool,
        role: PasswordRole,
    ) -> Self {
        Self {
            bytes,
            revision,
            string_method,
            stream_method,
            encrypt_metadata,
            role,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn revision(&self) -> u8 {
        self.revision
    }

    pub fn role(&self) -> PasswordRole {
        self.role
    }

    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// Cipher for strings or streams
    pub fn method_for(&self, kind: PayloadKind) -> CryptMethod {
        match kind {
            PayloadKind::String => self.string_method,
            PayloadKind::Stream => self.stream_method,
        }
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .field("len", &self.bytes.len())
            .field("revision", &self.revision)
            .field("string_method", &self.string_method)
            .field("stream_method", &self.stream_method)
            .field("encrypt_metadata", &self.encrypt_metadata)
            .field("role", &self.role)
            .finish()
    }
}
