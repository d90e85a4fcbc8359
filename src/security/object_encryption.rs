//! Applying the document cipher to every string and stream of an object

use crate::crypto::{CryptoEngine, PayloadKind, SecureRandom};
use crate::error::PdfGuardResult;
use crate::pdf::{Object, ObjectId, Stream};
use crate::security::DerivedKey;

/// Encrypt all strings and stream data reachable inside `object`
pub(crate) fn encrypt_object(
    engine: &CryptoEngine,
    key: &DerivedKey,
    id: ObjectId,
    object: &mut Object,
    rng: &mut dyn SecureRandom,
) -> PdfGuardResult<()> {
    apply(object, key, &mut |payload: &[u8], kind: PayloadKind| {
        engine.encrypt(payload, key, id, kind, &mut *rng)
    })
}

/// Decrypt all strings and stream data reachable inside `object`
pub(crate) fn decrypt_object(
    engine: &CryptoEngine,
    key: &DerivedKey,
    id: ObjectId,
    object: &mut Object,
) -> PdfGuardResult<()> {
    apply(object, key, &mut |payload: &[u8], kind: PayloadKind| engine.decrypt(payload, key, id, kind))
}

type Transform<'a> = dyn FnMut(&[u8], PayloadKind) -> PdfGuardResult<Vec<u8>> + 'a;

fn apply(object: &mut Object, key: &DerivedKey, transform: &mut Transform<'_>) -> PdfGuardResult<()> {
    match object {
        Object::String(bytes) => {
            *bytes = transform(bytes, PayloadKind::String)?;
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                apply(item, key, transform)?;
            }
        }
        Object::Dictionary(dict) => {
            for value in dict.values_mut() {
                apply(value, key, transform)?;
            }
        }
        Object::Stream(stream) => {
            for value in stream.dict.values_mut() {
                apply(value, key, transform)?;
            }
            if stream_content_is_encrypted(stream, key) {
                let content = transform(stream.content(), PayloadKind::Stream)?;
                stream.set_content(content);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Streams with their own `/Crypt` filter and, when metadata stays in
/// the clear, `/Metadata` streams keep their content untouched
fn stream_content_is_encrypted(stream: &Stream, key: &DerivedKey) -> bool {
    if stream.has_crypt_filter() {
        return false;
    }
    !(stream.dict.has_type("Metadata") && !key.encrypt_metadata())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CryptMethod;
    use crate::pdf::Dictionary;
    use crate::security::PasswordRole;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;
    use zeroize::Zeroizing;

    fn aes_key(encrypt_metadata: bool) -> DerivedKey {
        DerivedKey::new(
            Zeroizing::new(vec![7u8; 16]),
            4,
            CryptMethod::AesV2,
            CryptMethod::AesV2,
            encrypt_metadata,
            PasswordRole::Owner,
        )
    }

    fn sample_object() -> Object {
        let mut inner = Dictionary::new();
        inner.set("Title", Object::string("Quarterly report"));
        inner.set("Count", 3i64);

        let mut dict = Dictionary::new();
        dict.set("Info", inner);
        dict.set("Names", vec![Object::string("a"), Object::name("Plain"), Object::string("b")]);
        Object::Dictionary(dict)
    }

    #[test]
    fn test_nested_strings_round_trip() -> PdfGuardResult<()> {
        let engine = CryptoEngine::new();
        let key = aes_key(true);
        let id = ObjectId::new(4, 0);
        let mut rng = StdRng::seed_from_u64(21);

        let original = sample_object();
        let mut object = original.clone();
        encrypt_object(&engine, &key, id, &mut object, &mut rng)?;
        assert_ne!(object, original);

        let dict = object.as_dictionary().unwrap();
        assert_eq!(dict.get_array("Names").unwrap()[1], Object::name("Plain"));
        assert_eq!(dict.get_dictionary("Info").unwrap().get_integer("Count"), Some(3));

        decrypt_object(&engine, &key, id, &mut object)?;
        assert_eq!(object, original);
        Ok(())
    }

    #[test]
    fn test_stream_content_and_dictionary() -> PdfGuardResult<()> {
        let engine = CryptoEngine::new();
        let key = aes_key(true);
        let id = ObjectId::new(5, 0);
        let mut rng = StdRng::seed_from_u64(22);

        let mut dict = Dictionary::new();
        dict.set("Subject", Object::string("hidden"));
        let mut object = Object::Stream(Stream::new(dict, b"BT /F1 12 Tf ET".to_vec()));
        encrypt_object(&engine, &key, id, &mut object, &mut rng)?;

        let stream = object.as_stream().unwrap();
        assert_ne!(stream.content(), &b"BT /F1 12 Tf ET"[..]);
        assert_eq!(stream.dict.get_integer("Length"), Some(stream.content().len() as i64));
        assert_ne!(stream.dict.get_string("Subject"), Some(&b"hidden"[..]));

        decrypt_object(&engine, &key, id, &mut object)?;
        assert_eq!(object.as_stream().unwrap().content(), &b"BT /F1 12 Tf ET"[..]);
        Ok(())
    }

    #[test]
    fn test_metadata_stream_left_clear() -> PdfGuardResult<()> {
        let engine = CryptoEngine::new();
        let mut rng = StdRng::seed_from_u64(23);

        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Metadata"));
        dict.set("Subtype", Object::name("XML"));
        let xmp = b"<x:xmpmeta/>".to_vec();

        let mut object = Object::Stream(Stream::new(dict.clone(), xmp.clone()));
        encrypt_object(&engine, &aes_key(false), ObjectId::new(6, 0), &mut object, &mut rng)?;
        assert_eq!(object.as_stream().unwrap().content(), &xmp[..]);

        let mut object = Object::Stream(Stream::new(dict, xmp.clone()));
        encrypt_object(&engine, &aes_key(true), ObjectId::new(6, 0), &mut object, &mut rng)?;
        assert_ne!(object.as_stream().unwrap().content(), &xmp[..]);
        Ok(())
    }
}
