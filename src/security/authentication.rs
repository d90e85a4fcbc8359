use log::{debug, warn};
use zeroize::Zeroizing;

use super::key_derivation::{
    compute_file_key, compute_u_value, constant_time_eq, hash_password, recover_user_password,
};
use super::{DerivedKey, PasswordRole};
use crate::crypto::aes::{aes256_cbc_no_iv_decrypt, aes256_ecb_decrypt_block};
use crate::error::{PdfGuardError, PdfGuardResult};
use crate::handlers::StandardSecurityHandler;

type FileKey = Zeroizing<Vec<u8>>;

impl StandardSecurityHandler {
    /// Derive the file encryption key from `password`
    ///
    /// The owner password is tried first, then the user password.
    pub fn derive_keys(&self, password: &str, document_id: &[u8]) -> PdfGuardResult<DerivedKey> {
        let password = password.as_bytes();

        let (file_key, role) = if let Some(key) = self.authenticate_owner(password, document_id)? {
            (key, PasswordRole::Owner)
        } else if let Some(key) = self.authenticate_user(password, document_id)? {
            (key, PasswordRole::User)
        } else {
            debug!("Password rejected for revision {}", self.revision);
            return Err(PdfGuardError::WrongPassword);
        };
        debug!("Authenticated with the {} password", role);

        if self.revision >= 5 {
            self.check_perms(&file_key)?;
        }

        Ok(DerivedKey::new(
            file_key,
            self.revision,
            self.string_method,
            self.stream_method,
            self.encrypt_metadata,
            role,
        ))
    }

    /// Algorithm 7 (revisions 2-4) or 12 (revisions 5-6)
    pub(crate) fn authenticate_owner(&self, password: &[u8], document_id: &[u8]) -> PdfGuardResult<Option<FileKey>> {
        if self.revision >= 5 {
            let udata = &self.u_value[..48];
            let validation_salt = &self.o_value[32..40];
            let key_salt = &self.o_value[40..48];

            let hash = hash_password(self.revision, password, validation_salt, udata)?;
            if !constant_time_eq(&hash, &self.o_value[..32]) {
                return Ok(None);
            }
            let intermediate = Zeroizing::new(hash_password(self.revision, password, key_salt, udata)?);
            return self.unwrap_file_key(&intermediate[..], self.oe_value.as_deref()).map(Some);
        }

        let user_password = recover_user_password(password, &self.o_value, self.key_length, self.revision)?;
        self.authenticate_user(&user_password, document_id)
    }

    /// Algorithm 6 (revisions 2-4) or 11 (revisions 5-6)
    pub(crate) fn authenticate_user(&self, password: &[u8], document_id: &[u8]) -> PdfGuardResult<Option<FileKey>> {
        if self.revision >= 5 {
            let validation_salt = &self.u_value[32..40];
            let key_salt = &self.u_value[40..48];

            let hash = hash_password(self.revision, password, validation_salt, &[])?;
            if !constant_time_eq(&hash, &self.u_value[..32]) {
                return Ok(None);
            }
            let intermediate = Zeroizing::new(hash_password(self.revision, password, key_salt, &[])?);
            return self.unwrap_file_key(&intermediate[..], self.ue_value.as_deref()).map(Some);
        }

        let file_key = compute_file_key(
            password,
            &self.o_value,
            self.permissions,
            document_id,
            self.key_length,
            self.revision,
            self.encrypt_metadata,
        );
        let expected = compute_u_value(&file_key, document_id, self.revision)?;

        // Revision 3 and later only define the first 16 bytes of /U.
        let significant = if self.revision == 2 { 32 } else { 16 };
        if constant_time_eq(&expected[..significant], &self.u_value[..significant]) {
            Ok(Some(file_key))
        } else {
            Ok(None)
        }
    }

    fn unwrap_file_key(&self, intermediate: &[u8], wrapped: Option<&[u8]>) -> PdfGuardResult<FileKey> {
        let wrapped = wrapped.ok_or_else(|| PdfGuardError::malformed("missing /OE or /UE"))?;
        Ok(Zeroizing::new(aes256_cbc_no_iv_decrypt(intermediate, wrapped)?))
    }

    /// Algorithm 13: compare the decrypted `/Perms` block with `/P`
    ///
    /// A mismatch is logged; the password has already been verified.
    fn check_perms(&self, file_key: &[u8]) -> PdfGuardResult<()> {
        let perms = match &self.perms_value {
            Some(perms) => perms,
            None => {
                debug!("No /Perms entry to check");
                return Ok(());
            }
        };

        let block = Zeroizing::new(aes256_ecb_decrypt_block(file_key, perms)?);
        let p_matches = block[0..4] == self.permissions.to_le_bytes();
        let metadata_flag = if self.encrypt_metadata { b'T' } else { b'F' };
        if &block[9..12] != b"adb" || !p_matches || block[8] != metadata_flag {
            warn!("/Perms does not match the encryption dictionary");
        }
        Ok(())
    }
}
