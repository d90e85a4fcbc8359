//! RC4 encryption provider implementation

use rc4::consts::U256;
use rc4::{KeyInit, Rc4, StreamCipher};

use super::{CryptoProvider, SecureRandom};
use crate::error::{PdfGuardError, PdfGuardResult};

/// Apply the RC4 keystream for `key` to `data`
///
/// Key scheduling reads the key cyclically, so repeating a key of any
/// length up to 256 bytes yields the same keystream as the key itself.
pub(crate) fn rc4_apply(key: &[u8], data: &[u8]) -> PdfGuardResult<Vec<u8>> {
    if key.is_empty() || key.len() > 256 {
        return Err(PdfGuardError::crypto(format!("invalid RC4 key length {}", key.len())));
    }
    let expanded: Vec<u8> = key.iter().copied().cycle().take(256).collect();
    let mut cipher = Rc4::<U256>::new_from_slice(&expanded)
        .map_err(|_| PdfGuardError::crypto("invalid RC4 key"))?;

    let mut output = data.to_vec();
    cipher.apply_keystream(&mut output);
    Ok(output)
}

/// RC4 encryption provider
#[derive(Debug, Default)]
pub struct RC4Provider;

impl RC4Provider {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for RC4Provider {
    fn encrypt(&self, key: &[u8], data: &[u8], _rng: &mut dyn SecureRandom) -> PdfGuardResult<Vec<u8>> {
        rc4_apply(key, data)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> PdfGuardResult<Vec<u8>> {
        rc4_apply(key, data)
    }
}
