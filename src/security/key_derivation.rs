//! Password hashing and file key algorithms of the Standard Security Handler

use md5::{Digest, Md5};
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use crate::crypto::aes::aes128_cbc_encrypt_no_pad;
use crate::crypto::rc4::rc4_apply;
use crate::error::PdfGuardResult;

/// Padding string used to extend passwords to 32 bytes (revisions 2 to 4)
pub(crate) const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41,
    0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80,
    0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Revision 5/6 passwords are limited to 127 bytes
const MAX_R6_PASSWORD: usize = 127;

pub(crate) fn pad_password(password: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut padded = Zeroizing::new([0u8; 32]);
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

fn md5(data: &[u8]) -> [u8; 16] {
    Md5::digest(data).into()
}

/// Algorithm 2: file encryption key from a password (revisions 2 to 4)
pub(crate) fn compute_file_key(
    password: &[u8],
    o_value: &[u8],
    permissions: u32,
    document_id: &[u8],
    key_length: usize,
    revision: u8,
    encrypt_metadata: bool,
) -> Zeroizing<Vec<u8>> {
    let padded = pad_password(password);

    let mut hasher = Md5::new();
    hasher.update(&padded[..]);
    hasher.update(o_value);
    hasher.update(permissions.to_le_bytes());
    hasher.update(document_id);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFFu8; 4]);
    }
    let mut hash: [u8; 16] = hasher.finalize().into();

    let n = if revision == 2 { 5 } else { key_length.min(16) };
    if revision >= 3 {
        for _ in 0..50 {
            hash = md5(&hash[..n]);
        }
    }
    Zeroizing::new(hash[..n].to_vec())
}

/// Algorithm 3 steps 1-4: RC4 key derived from the owner password
pub(crate) fn owner_rc4_key(owner_password: &[u8], key_length: usize, revision: u8) -> Zeroizing<Vec<u8>> {
    let padded = pad_password(owner_password);
    let mut hash = md5(&padded[..]);
    if revision >= 3 {
        for _ in 0..50 {
            hash = md5(&hash);
        }
    }
    let n = if revision == 2 { 5 } else { key_length.min(16) };
    Zeroizing::new(hash[..n].to_vec())
}

/// RC4 pass used by O and U: once for revision 2, then 19 more passes
/// with the key XORed by the pass number for revision 3 and later
fn rc4_passes(key: &[u8], data: &[u8], revision: u8, reverse: bool) -> PdfGuardResult<Vec<u8>> {
    if revision == 2 {
        return rc4_apply(key, data);
    }

    let mut output = data.to_vec();
    let pass = |i: u8, output: &mut Vec<u8>| -> PdfGuardResult<()> {
        let round_key: Zeroizing<Vec<u8>> = Zeroizing::new(key.iter().map(|b| b ^ i).collect());
        *output = rc4_apply(&round_key, &output[..])?;
        Ok(())
    };
    if reverse {
        for i in (0..=19u8).rev() {
            pass(i, &mut output)?;
        }
    } else {
        for i in 0..=19u8 {
            pass(i, &mut output)?;
        }
    }
    Ok(output)
}

/// Algorithm 3: the `/O` entry
pub(crate) fn compute_o_value(
    owner_password: &[u8],
    user_password: &[u8],
    key_length: usize,
    revision: u8,
) -> PdfGuardResult<Vec<u8>> {
    let key = owner_rc4_key(owner_password, key_length, revision);
    let padded_user = pad_password(user_password);
    rc4_passes(&key, &padded_user[..], revision, false)
}

/// Algorithm 7 steps 1-2: recover the padded user password from `/O`
pub(crate) fn recover_user_password(
    owner_password: &[u8],
    o_value: &[u8],
    key_length: usize,
    revision: u8,
) -> PdfGuardResult<Zeroizing<Vec<u8>>> {
    let key = owner_rc4_key(owner_password, key_length, revision);
    let recovered = rc4_passes(&key, &o_value[..32.min(o_value.len())], revision, true)?;
    Ok(Zeroizing::new(recovered))
}

/// Algorithms 4 and 5: the `/U` entry for a file key
pub(crate) fn compute_u_value(file_key: &[u8], document_id: &[u8], revision: u8) -> PdfGuardResult<Vec<u8>> {
    if revision == 2 {
        return rc4_apply(file_key, &PADDING);
    }

    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(document_id);
    let hash = hasher.finalize();

    let mut u_value = rc4_passes(file_key, &hash, revision, false)?;
    // Only the first 16 bytes are significant; the rest is arbitrary padding.
    u_value.resize(32, 0);
    Ok(u_value)
}

/// Revision 5 password hash: one SHA-256 round
pub(crate) fn hash_r5(password: &[u8], salt: &[u8], user_key: &[u8]) -> [u8; 32] {
    let password = &password[..password.len().min(MAX_R6_PASSWORD)];
    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    hasher.update(user_key);
    hasher.finalize().into()
}

/// Algorithm 2.B: revision 6 password hash
///
/// `user_key` is empty for user password checks and the 48-byte `/U`
/// string for owner password checks.
pub(crate) fn hash_r6(password: &[u8], salt: &[u8], user_key: &[u8]) -> PdfGuardResult<[u8; 32]> {
    let password = &password[..password.len().min(MAX_R6_PASSWORD)];

    let mut k: Zeroizing<Vec<u8>> = Zeroizing::new(hash_r5(password, salt, user_key).to_vec());
    let mut round: i32 = 0;
    let mut last_byte: u8 = 0;

    while round < 64 || i32::from(last_byte) > round - 32 {
        let mut block = Zeroizing::new(Vec::with_capacity(password.len() + k.len() + user_key.len()));
        block.extend_from_slice(password);
        block.extend_from_slice(&k);
        block.extend_from_slice(user_key);
        let k1 = Zeroizing::new(block.repeat(64));

        let e = Zeroizing::new(aes128_cbc_encrypt_no_pad(&k[..16], &k[16..32], &k1)?);

        // The first 16 bytes as a big-endian number mod 3 equal their byte sum mod 3.
        let selector = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
        k = Zeroizing::new(match selector {
            0 => Sha256::digest(&e[..]).to_vec(),
            1 => Sha384::digest(&e[..]).to_vec(),
            _ => Sha512::digest(&e[..]).to_vec(),
        });

        last_byte = e[e.len() - 1];
        round += 1;
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&k[..32]);
    Ok(out)
}

/// Password hash for revision 5 or 6
pub(crate) fn hash_password(revision: u8, password: &[u8], salt: &[u8], user_key: &[u8]) -> PdfGuardResult<[u8; 32]> {
    if revision == 5 {
        Ok(hash_r5(password, salt, user_key))
    } else {
        hash_r6(password, salt, user_key)
    }
}

/// Compare without early exit on the first differing byte
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
