//! AES encryption provider implementation

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::{Aes128, Aes256};
use rand::RngCore;

use super::{CryptoProvider, SecureRandom};
use crate::error::{PdfGuardError, PdfGuardResult};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const BLOCK_SIZE: usize = 16;
const ZERO_IV: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

/// AES-CBC provider: payloads carry a random 16-byte IV followed by
/// PKCS#7-padded ciphertext
pub(crate) struct AESProvider {
    key_length: usize,
}

impl AESProvider {
    pub fn new(key_length: usize) -> Self {
        Self { key_length }
    }

    fn check_key(&self, key: &[u8]) -> PdfGuardResult<()> {
        if key.len() != self.key_length {
            return Err(PdfGuardError::crypto(format!(
                "AES-{} needs a {}-byte key, got {}",
                self.key_length * 8,
                self.key_length,
                key.len()
            )));
        }
        Ok(())
    }
}

impl CryptoProvider for AESProvider {
    fn encrypt(&self, key: &[u8], data: &[u8], rng: &mut dyn SecureRandom) -> PdfGuardResult<Vec<u8>> {
        self.check_key(key)?;

        let mut iv = [0u8; BLOCK_SIZE];
        rng.fill_bytes(&mut iv);

        let ciphertext = match self.key_length {
            16 => Aes128CbcEnc::new_from_slices(key, &iv)?.encrypt_padded_vec_mut::<Pkcs7>(data),
            _ => Aes256CbcEnc::new_from_slices(key, &iv)?.encrypt_padded_vec_mut::<Pkcs7>(data),
        };

        let mut output = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
        output.extend_from_slice(&iv);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> PdfGuardResult<Vec<u8>> {
        self.check_key(key)?;

        // Empty payloads, with or without an IV, stand for empty plaintext.
        if data.len() <= BLOCK_SIZE {
            if data.is_empty() || data.len() == BLOCK_SIZE {
                return Ok(Vec::new());
            }
            return Err(PdfGuardError::crypto(format!(
                "AES payload of {} bytes is shorter than its IV",
                data.len()
            )));
        }
        let (iv, ciphertext) = data.split_at(BLOCK_SIZE);
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(PdfGuardError::crypto(format!(
                "AES ciphertext length {} is not a multiple of the block size",
                ciphertext.len()
            )));
        }

        let plaintext = match self.key_length {
            16 => Aes128CbcDec::new_from_slices(key, iv)?.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)?,
            _ => Aes256CbcDec::new_from_slices(key, iv)?.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)?,
        };
        Ok(plaintext)
    }
}

fn check_aligned(data: &[u8]) -> PdfGuardResult<()> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(PdfGuardError::crypto(format!(
            "unpadded AES input of {} bytes is not block aligned",
            data.len()
        )));
    }
    Ok(())
}

/// AES-256-CBC with a zero IV and no padding, used for `/OE` and `/UE`
pub(crate) fn aes256_cbc_no_iv_encrypt(key: &[u8], data: &[u8]) -> PdfGuardResult<Vec<u8>> {
    check_aligned(data)?;
    Ok(Aes256CbcEnc::new_from_slices(key, &ZERO_IV)?.encrypt_padded_vec_mut::<NoPadding>(data))
}

pub(crate) fn aes256_cbc_no_iv_decrypt(key: &[u8], data: &[u8]) -> PdfGuardResult<Vec<u8>> {
    check_aligned(data)?;
    Ok(Aes256CbcDec::new_from_slices(key, &ZERO_IV)?.decrypt_padded_vec_mut::<NoPadding>(data)?)
}

/// AES-128-CBC without padding, the inner step of the revision 6 hash
pub(crate) fn aes128_cbc_encrypt_no_pad(key: &[u8], iv: &[u8], data: &[u8]) -> PdfGuardResult<Vec<u8>> {
    check_aligned(data)?;
    Ok(Aes128CbcEnc::new_from_slices(key, iv)?.encrypt_padded_vec_mut::<NoPadding>(data))
}

/// Single-block AES-256 (ECB), used for `/Perms`
pub(crate) fn aes256_ecb_encrypt_block(key: &[u8], block: &[u8; BLOCK_SIZE]) -> PdfGuardResult<[u8; BLOCK_SIZE]> {
    let cipher = Aes256::new_from_slice(key)?;
    let mut buf = aes::Block::clone_from_slice(block);
    cipher.encrypt_block(&mut buf);

    let mut out = [0u8; BLOCK_SIZE];
    out.copy_from_slice(&buf);
    Ok(out)
}

pub(crate) fn aes256_ecb_decrypt_block(key: &[u8], block: &[u8]) -> PdfGuardResult<[u8; BLOCK_SIZE]> {
    if block.len() != BLOCK_SIZE {
        return Err(PdfGuardError::crypto("AES block must be 16 bytes"));
    }
    let cipher = Aes256::new_from_slice(key)?;
    let mut buf = aes::Block::clone_from_slice(block);
    cipher.decrypt_block(&mut buf);

    let mut out = [0u8; BLOCK_SIZE];
    out.copy_from_slice(&buf);
    Ok(out)
}
