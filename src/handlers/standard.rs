//! Standard Security Handler implementation according to PDF specification

use std::fmt;

use log::debug;
use rand::RngCore;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::crypto::aes::{aes256_cbc_no_iv_encrypt, aes256_ecb_encrypt_block};
use crate::crypto::{CryptMethod, SecureRandom};
use crate::error::{PdfGuardError, PdfGuardResult};
use crate::options::ProtectionOptions;
use crate::pdf::{Dictionary, Object};
use crate::security::key_derivation::{compute_file_key, compute_o_value, compute_u_value, hash_r6};
use crate::security::{DerivedKey, PasswordRole};
use crate::{EncryptionAlgorithm, PDFPermissions};

/// Name of the single crypt filter written for V4/V5 dictionaries
const STD_CF: &str = "StdCF";

/// Standard security handler for password-based encryption
#[derive(Clone, ZeroizeOnDrop)]
pub struct StandardSecurityHandler {
    #[zeroize(skip)]
    pub(crate) version: u8,
    #[zeroize(skip)]
    pub(crate) revision: u8,
    /// File key length in bytes
    #[zeroize(skip)]
    pub(crate) key_length: usize,
    /// Raw `/P` value, reserved bits included
    #[zeroize(skip)]
    pub(crate) permissions: u32,
    #[zeroize(skip)]
    pub(crate) encrypt_metadata: bool,
    #[zeroize(skip)]
    pub(crate) string_method: CryptMethod,
    #[zeroize(skip)]
    pub(crate) stream_method: CryptMethod,
    pub(crate) o_value: Vec<u8>,
    pub(crate) u_value: Vec<u8>,
    pub(crate) oe_value: Option<Vec<u8>>,
    pub(crate) ue_value: Option<Vec<u8>>,
    pub(crate) perms_value: Option<Vec<u8>>,
}

impl fmt::Debug for StandardSecurityHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardSecurityHandler")
            .field("version", &self.version)
            .field("revision", &self.revision)
            .field("key_length", &self.key_length)
            .field("permissions", &format_args!("{:#010X}", self.permissions))
            .field("encrypt_metadata", &self.encrypt_metadata)
            .field("string_method", &self.string_method)
            .field("stream_method", &self.stream_method)
            .finish()
    }
}

impl StandardSecurityHandler {
    /// Read a `/Filter /Standard` encryption dictionary
    pub fn from_dict(dict: &Dictionary) -> PdfGuardResult<Self> {
        let filter = dict
            .get_name("Filter")
            .ok_or_else(|| PdfGuardError::malformed("encryption dictionary without /Filter"))?;
        if filter != b"Standard" {
            return Err(PdfGuardError::UnsupportedSecurityHandler(
                String::from_utf8_lossy(filter).into_owned(),
            ));
        }

        let version = dict.get_integer("V").unwrap_or(0);
        if ![1, 2, 4, 5].contains(&version) {
            return Err(PdfGuardError::UnsupportedEncryptionRevision(version));
        }
        let revision = dict
            .get_integer("R")
            .ok_or_else(|| PdfGuardError::malformed("encryption dictionary without /R"))?;
        if !(2..=6).contains(&revision) {
            return Err(PdfGuardError::UnsupportedEncryptionRevision(revision));
        }
        let revision = revision as u8;

        let (string_method, stream_method, key_length) = match version {
            1 => (CryptMethod::Rc4, CryptMethod::Rc4, 5),
            2 => (CryptMethod::Rc4, CryptMethod::Rc4, rc4_key_length(dict)?),
            _ => {
                let string_method = crypt_filter_method(dict, "StrF")?;
                let stream_method = crypt_filter_method(dict, "StmF")?;
                let key_length = if version == 5 {
                    32
                } else if string_method == CryptMethod::Rc4 || stream_method == CryptMethod::Rc4 {
                    rc4_key_length(dict)?
                } else {
                    16
                };
                (string_method, stream_method, key_length)
            }
        };

        let (hash_len, min_len) = if revision >= 5 { (48, 48) } else { (32, 32) };
        let o_value = read_fixed(dict, "O", min_len, hash_len)?;
        let u_value = read_fixed(dict, "U", min_len, hash_len)?;

        let permissions = dict
            .get_integer("P")
            .ok_or_else(|| PdfGuardError::malformed("encryption dictionary without /P"))? as u32;

        let (oe_value, ue_value, perms_value) = if revision >= 5 {
            (
                Some(read_fixed(dict, "OE", 32, 32)?),
                Some(read_fixed(dict, "UE", 32, 32)?),
                dict.get_string("Perms")
                    .filter(|p| p.len() >= 16)
                    .map(|p| p[..16].to_vec()),
            )
        } else {
            (None, None, None)
        };

        let handler = Self {
            version: version as u8,
            revision,
            key_length,
            permissions,
            encrypt_metadata: dict.get_bool("EncryptMetadata").unwrap_or(true),
            string_method,
            stream_method,
            o_value,
            u_value,
            oe_value,
            ue_value,
            perms_value,
        };
        debug!("Loaded encryption dictionary {:?}", handler);
        Ok(handler)
    }

    /// Build a fresh handler for `options` and its file encryption key
    pub fn create(
        options: &ProtectionOptions,
        document_id: &[u8],
        rng: &mut dyn SecureRandom,
    ) -> PdfGuardResult<(Self, DerivedKey)> {
        let algorithm = options.algorithm();
        let method = algorithm.crypt_method();
        let revision = algorithm.revision();

        let mut handler = Self {
            version: algorithm.version(),
            revision,
            key_length: algorithm.key_length(),
            permissions: options.permissions().p_value() as u32,
            // Revisions before 4 always encrypt metadata.
            encrypt_metadata: revision < 4 || options.encrypt_metadata(),
            string_method: method,
            stream_method: method,
            o_value: Vec::new(),
            u_value: Vec::new(),
            oe_value: None,
            ue_value: None,
            perms_value: None,
        };

        let user = options.user_password().as_bytes();
        let owner = options.owner_password().as_bytes();
        let file_key = if revision >= 5 {
            handler.generate_r6_values(user, owner, rng)?
        } else {
            handler.generate_legacy_values(user, owner, document_id)?
        };
        debug!("Created {} security handler {:?}", algorithm, handler);

        let key = DerivedKey::new(
            file_key,
            revision,
            method,
            method,
            handler.encrypt_metadata,
            PasswordRole::Owner,
        );
        Ok((handler, key))
    }

    /// Algorithms 8, 9 and 10
    fn generate_r6_values(
        &mut self,
        user_password: &[u8],
        owner_password: &[u8],
        rng: &mut dyn SecureRandom,
    ) -> PdfGuardResult<Zeroizing<Vec<u8>>> {
        let mut file_key = Zeroizing::new(vec![0u8; 32]);
        rng.fill_bytes(&mut file_key[..]);

        // user validation, user key, owner validation, owner key salts
        let mut salts = [0u8; 32];
        rng.fill_bytes(&mut salts);

        let mut u_value = hash_r6(user_password, &salts[0..8], &[])?.to_vec();
        u_value.extend_from_slice(&salts[0..16]);
        let ue_key = Zeroizing::new(hash_r6(user_password, &salts[8..16], &[])?);
        let ue_value = aes256_cbc_no_iv_encrypt(&ue_key[..], &file_key)?;

        let mut o_value = hash_r6(owner_password, &salts[16..24], &u_value)?.to_vec();
        o_value.extend_from_slice(&salts[16..32]);
        let oe_key = Zeroizing::new(hash_r6(owner_password, &salts[24..32], &u_value)?);
        let oe_value = aes256_cbc_no_iv_encrypt(&oe_key[..], &file_key)?;

        let mut perms = [0u8; 16];
        perms[0..4].copy_from_slice(&self.permissions.to_le_bytes());
        perms[4..8].copy_from_slice(&[0xFF; 4]);
        perms[8] = if self.encrypt_metadata { b'T' } else { b'F' };
        perms[9..12].copy_from_slice(b"adb");
        rng.fill_bytes(&mut perms[12..16]);
        let perms_value = aes256_ecb_encrypt_block(&file_key, &perms)?;

        self.o_value = o_value;
        self.u_value = u_value;
        self.oe_value = Some(oe_value);
        self.ue_value = Some(ue_value);
        self.perms_value = Some(perms_value.to_vec());
        Ok(file_key)
    }

    /// Algorithms 2, 3, 4 and 5
    fn generate_legacy_values(
        &mut self,
        user_password: &[u8],
        owner_password: &[u8],
        document_id: &[u8],
    ) -> PdfGuardResult<Zeroizing<Vec<u8>>> {
        self.o_value = compute_o_value(owner_password, user_password, self.key_length, self.revision)?;
        let file_key = compute_file_key(
            user_password,
            &self.o_value,
            self.permissions,
            document_id,
            self.key_length,
            self.revision,
            self.encrypt_metadata,
        );
        self.u_value = compute_u_value(&file_key, document_id, self.revision)?;
        Ok(file_key)
    }

    /// Create dictionary representation
    pub fn to_dict(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("Standard"));
        dict.set("V", self.version as i64);
        dict.set("R", self.revision as i64);
        dict.set("Length", (self.key_length * 8) as i64);
        dict.set("P", self.permissions as i32 as i64);
        dict.set("O", Object::string(self.o_value.clone()));
        dict.set("U", Object::string(self.u_value.clone()));

        if self.version >= 4 {
            let mut std_cf = Dictionary::new();
            std_cf.set("Type", Object::name("CryptFilter"));
            std_cf.set("CFM", Object::name(self.stream_method.name()));
            std_cf.set("AuthEvent", Object::name("DocOpen"));
            std_cf.set("Length", self.key_length as i64);

            let mut filters = Dictionary::new();
            filters.set(STD_CF, std_cf);
            dict.set("CF", filters);
            dict.set("StmF", Object::name(STD_CF));
            dict.set("StrF", Object::name(STD_CF));
            if !self.encrypt_metadata {
                dict.set("EncryptMetadata", false);
            }
        }

        if let (Some(oe), Some(ue)) = (&self.oe_value, &self.ue_value) {
            dict.set("OE", Object::string(oe.clone()));
            dict.set("UE", Object::string(ue.clone()));
        }
        if let Some(perms) = &self.perms_value {
            dict.set("Perms", Object::string(perms.clone()));
        }
        dict
    }

    /// Algorithm family this dictionary describes
    pub fn algorithm(&self) -> EncryptionAlgorithm {
        match (self.version, self.stream_method) {
            (5, _) | (_, CryptMethod::AesV3) => EncryptionAlgorithm::AES_256,
            (_, CryptMethod::AesV2) => EncryptionAlgorithm::AES_128,
            _ if self.key_length <= 5 => EncryptionAlgorithm::RC4_40,
            _ => EncryptionAlgorithm::RC4_128,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn revision(&self) -> u8 {
        self.revision
    }

    pub fn key_length_bits(&self) -> u32 {
        (self.key_length * 8) as u32
    }

    pub fn permissions(&self) -> PDFPermissions {
        PDFPermissions::from_p_value(self.permissions as i32)
    }

    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }
}

/// `/Length` in bits for RC4 dictionaries, 40 to 128 in steps of 8
fn rc4_key_length(dict: &Dictionary) -> PdfGuardResult<usize> {
    let bits = dict.get_integer("Length").unwrap_or(40);
    if !(40..=128).contains(&bits) || bits % 8 != 0 {
        return Err(PdfGuardError::malformed(format!("invalid RC4 key length {}", bits)));
    }
    Ok((bits / 8) as usize)
}

/// Resolve `/StmF` or `/StrF` through `/CF` to a crypt method
fn crypt_filter_method(dict: &Dictionary, key: &str) -> PdfGuardResult<CryptMethod> {
    let name = dict.get_name(key).unwrap_or(b"Identity");
    if name == b"Identity" {
        return Ok(CryptMethod::Identity);
    }

    let name = std::str::from_utf8(name)
        .map_err(|_| PdfGuardError::malformed(format!("invalid /{} name", key)))?;
    let filter = dict
        .get_dictionary("CF")
        .and_then(|cf| cf.get_dictionary(name))
        .ok_or_else(|| PdfGuardError::malformed(format!("crypt filter {} is not defined in /CF", name)))?;

    let method = filter.get_name("CFM").unwrap_or(b"None");
    CryptMethod::from_name(method).ok_or_else(|| {
        PdfGuardError::UnsupportedSecurityHandler(format!(
            "crypt filter method {}",
            String::from_utf8_lossy(method)
        ))
    })
}

/// Read a string entry of at least `min_len` bytes, keeping the first `keep`
fn read_fixed(dict: &Dictionary, key: &str, min_len: usize, keep: usize) -> PdfGuardResult<Vec<u8>> {
    let value = dict
        .get_string(key)
        .ok_or_else(|| PdfGuardError::malformed(format!("encryption dictionary without /{}", key)))?;
    if value.len() < min_len {
        return Err(PdfGuardError::malformed(format!(
            "/{} is {} bytes, expected at least {}",
            key,
            value.len(),
            min_len
        )));
    }
    Ok(value[..keep].to_vec())
}
