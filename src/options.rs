//! Settings for a protect call

use std::fmt;

use zeroize::Zeroizing;

use crate::{EncryptionAlgorithm, PDFPermissions};

/// How a document gets protected
///
/// Defaults to AES-256 (revision 6), no permissions granted, metadata
/// encrypted and the owner password equal to the user password.
#[derive(Clone)]
pub struct ProtectionOptions {
    algorithm: EncryptionAlgorithm,
    user_password: Zeroizing<String>,
    owner_password: Option<Zeroizing<String>>,
    permissions: PDFPermissions,
    encrypt_metadata: bool,
}

impl Default for ProtectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtectionOptions {
    /// Options with an empty user password
    pub fn new() -> Self {
        Self {
            algorithm: EncryptionAlgorithm::default(),
            user_password: Zeroizing::new(String::new()),
            owner_password: None,
            permissions: PDFPermissions::default(),
            encrypt_metadata: true,
        }
    }

    pub fn with_password(password: &str) -> Self {
        Self {
            user_password: Zeroizing::new(password.to_owned()),
            ..Self::new()
        }
    }

    pub fn with_algorithm(mut self, algorithm: EncryptionAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_owner_password(mut self, password: &str) -> Self {
        self.owner_password = Some(Zeroizing::new(password.to_owned()));
        self
    }

    pub fn with_permissions(mut self, permissions: PDFPermissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Leave `/Type /Metadata` streams unencrypted (revision 4 and later)
    pub fn with_encrypt_metadata(mut self, encrypt_metadata: bool) -> Self {
        self.encrypt_metadata = encrypt_metadata;
        self
    }

    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    pub fn user_password(&self) -> &str {
        self.user_password.as_str()
    }

    /// Owner password, falling back to the user password when unset or empty
    pub fn owner_password(&self) -> &str {
        match &self.owner_password {
            Some(owner) if !owner.is_empty() => owner.as_str(),
            _ => self.user_password.as_str(),
        }
    }

    pub fn permissions(&self) -> PDFPermissions {
        self.permissions
    }

    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }
}

impl fmt::Debug for ProtectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectionOptions")
            .field("algorithm", &self.algorithm)
            .field("user_password", &"[REDACTED]")
            .field("owner_password", &self.owner_password.as_ref().map(|_| "[REDACTED]"))
            .field("permissions", &self.permissions)
            .field("encrypt_metadata", &self.encrypt_metadata)
            .finish()
    }
}
