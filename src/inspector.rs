//! Protection queries that read only the trailer and encryption dictionary

use log::debug;

use crate::error::PdfGuardResult;
use crate::handlers::StandardSecurityHandler;
use crate::pdf::Document;
use crate::{EncryptionAlgorithm, PDFPermissions};

/// True when the trailer's `/Encrypt` resolves to a dictionary
pub fn is_protected(doc: &Document) -> PdfGuardResult<bool> {
    let protected = doc.encryption_dictionary()?.is_some();
    debug!("Document protected: {}", protected);
    Ok(protected)
}

/// Information about PDF encryption
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionInfo {
    /// Security handler name from `/Filter`
    pub filter: String,
    pub version: i64,
    pub revision: i64,
    pub key_length_bits: u32,
    /// `None` when the dictionary is not one this engine can open
    pub algorithm: Option<EncryptionAlgorithm>,
    pub permissions: Option<PDFPermissions>,
    pub encrypt_metadata: bool,
}

/// Describe the encryption dictionary without deriving any key
pub fn encryption_info(doc: &Document) -> PdfGuardResult<Option<EncryptionInfo>> {
    let dict = match doc.encryption_dictionary()? {
        Some(dict) => dict,
        None => return Ok(None),
    };

    let filter = dict
        .get_name("Filter")
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .unwrap_or_default();
    let version = dict.get_integer("V").unwrap_or(0);
    let revision = dict.get_integer("R").unwrap_or(0);

    let info = match StandardSecurityHandler::from_dict(&dict) {
        Ok(handler) => EncryptionInfo {
            filter,
            version,
            revision,
            key_length_bits: handler.key_length_bits(),
            algorithm: Some(handler.algorithm()),
            permissions: Some(handler.permissions()),
            encrypt_metadata: handler.encrypt_metadata(),
        },
        Err(err) => {
            debug!("Encryption dictionary not readable by the standard handler: {}", err);
            EncryptionInfo {
                filter,
                version,
                revision,
                key_length_bits: dict.get_integer("Length").unwrap_or(40).max(0) as u32,
                algorithm: None,
                permissions: dict.get_integer("P").map(|p| PDFPermissions::from_p_value(p as i32)),
                encrypt_metadata: dict.get_bool("EncryptMetadata").unwrap_or(true),
            }
        }
    };
    Ok(Some(info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PdfGuardError;
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn pdf_with_trailer(extra: &str, extra_objects: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let catalog = out.len();
        out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let second = out.len();
        out.extend_from_slice(format!("2 0 obj\n{}\nendobj\n", extra_objects).as_bytes());
        let xref = out.len();
        out.extend_from_slice(
            format!(
                "xref\n0 3\n0000000000 65535 f \n{:010} 00000 n \n{:010} 00000 n \n\
                 trailer\n<< /Size 3 /Root 1 0 R {} >>\nstartxref\n{}\n%%EOF\n",
                catalog, second, extra, xref
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn test_plain_document() -> PdfGuardResult<()> {
        let doc = Document::parse(&pdf_with_trailer("", "<< >>"))?;
        assert!(!is_protected(&doc)?);
        assert_eq!(encryption_info(&doc)?, None);
        Ok(())
    }

    #[test]
    fn test_indirect_encrypt_dictionary() -> PdfGuardResult<()> {
        let dict = "<< /Filter /Standard /V 2 /R 3 /Length 128 /P -3904 \
                    /O <0000000000000000000000000000000000000000000000000000000000000000> \
                    /U <0000000000000000000000000000000000000000000000000000000000000000> >>";
        let doc = Document::parse(&pdf_with_trailer("/Encrypt 2 0 R", dict))?;
        assert!(is_protected(&doc)?);

        let info = encryption_info(&doc)?.unwrap();
        assert_eq!(info.filter, "Standard");
        assert_eq!(info.revision, 3);
        assert_eq!(info.key_length_bits, 128);
        assert_eq!(info.algorithm, Some(EncryptionAlgorithm::RC4_128));
        Ok(())
    }

    #[test]
    fn test_unknown_handler_is_still_protected() -> PdfGuardResult<()> {
        let doc = Document::parse(&pdf_with_trailer("/Encrypt << /Filter /Adobe.PubSec /V 4 /R 4 >>", "<< >>"))?;
        assert!(is_protected(&doc)?);
        let info = encryption_info(&doc)?.unwrap();
        assert_eq!(info.filter, "Adobe.PubSec");
        assert_eq!(info.algorithm, None);
        Ok(())
    }

    #[test]
    fn test_encrypt_pointing_at_non_dictionary() -> PdfGuardResult<()> {
        let doc = Document::parse(&pdf_with_trailer("/Encrypt 2 0 R", "42"))?;
        assert!(matches!(is_protected(&doc), Err(PdfGuardError::MalformedContainer(_))));
        Ok(())
    }
}
