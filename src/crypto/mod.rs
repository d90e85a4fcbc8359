//! PDF cryptographic engine implementation

pub(crate) mod aes;
mod engine;
mod random;
pub(crate) mod rc4;

pub use engine::CryptoEngine;
pub use random::SecureRandom;

use crate::error::PdfGuardResult;

/// Cipher applied to strings or streams, as named by a crypt filter `/CFM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CryptMethod {
    /// `/None`: payload left as is
    Identity,
    /// `/V2`: RC4 with a per-object key
    Rc4,
    /// `/AESV2`: AES-128-CBC with a per-object key
    AesV2,
    /// `/AESV3`: AES-256-CBC with the file key
    AesV3,
}

impl CryptMethod {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"None" | b"Identity" => Some(Self::Identity),
            b"V2" => Some(Self::Rc4),
            b"AESV2" => Some(Self::AesV2),
            b"AESV3" => Some(Self::AesV3),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "None",
            Self::Rc4 => "V2",
            Self::AesV2 => "AESV2",
            Self::AesV3 => "AESV3",
        }
    }
}

/// Which kind of payload is being transformed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    String,
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// Trait for PDF payload encryption/decryption
pub(crate) trait CryptoProvider: Send + Sync {
    fn encrypt(&self, key: &[u8], data: &[u8], rng: &mut dyn SecureRandom) -> PdfGuardResult<Vec<u8>>;
    fn decrypt(&self, key: &[u8], data: &[u8]) -> PdfGuardResult<Vec<u8>>;
}
