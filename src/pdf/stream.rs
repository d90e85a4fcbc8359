//! PDF stream object implementation

use log::trace;

use super::filter::{Filter, PredictorParams};
use super::{Dictionary, Object};
use crate::error::{PdfGuardError, PdfGuardResult};

/// PDF stream object
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Stream dictionary
    pub dict: Dictionary,
    /// Raw (still filtered) stream data
    content: Vec<u8>,
}

impl Stream {
    /// Create new stream object, `/Length` is kept in sync with the content
    pub fn new(mut dict: Dictionary, content: Vec<u8>) -> Self {
        dict.set("Length", content.len() as i64);
        Self { dict, content }
    }

    /// Raw stream bytes as stored in the file
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Update stream data
    pub fn set_content(&mut self, content: Vec<u8>) {
        self.dict.set("Length", content.len() as i64);
        self.content = content;
    }

    /// Filters named by `/Filter`, in application order
    pub fn filters(&self) -> PdfGuardResult<Vec<Filter>> {
        match self.dict.get("Filter") {
            None => Ok(Vec::new()),
            Some(Object::Name(name)) => Ok(vec![Filter::from_name(name)?]),
            Some(Object::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Object::Name(name) => Filter::from_name(name),
                    other => Err(PdfGuardError::malformed(format!(
                        "filter entry must be a name, found {}",
                        other.type_name()
                    ))),
                })
                .collect(),
            Some(other) => Err(PdfGuardError::malformed(format!(
                "/Filter must be a name or array, found {}",
                other.type_name()
            ))),
        }
    }

    /// True when the stream names the `/Crypt` filter and so manages its own encryption
    pub fn has_crypt_filter(&self) -> bool {
        match self.dict.get("Filter") {
            Some(Object::Name(name)) => name.as_slice() == b"Crypt",
            Some(Object::Array(items)) => items
                .iter()
                .any(|item| item.as_name() == Some(&b"Crypt"[..])),
            _ => false,
        }
    }

    /// Decode stream data through its filter chain
    pub fn decoded_content(&self) -> PdfGuardResult<Vec<u8>> {
        self.decode_bytes(&self.content)
    }

    /// Decode arbitrary bytes (e.g. freshly decrypted content) with this stream's filters
    pub fn decode_bytes(&self, data: &[u8]) -> PdfGuardResult<Vec<u8>> {
        let filters = self.filters()?;
        trace!("Decoding stream with {} filters", filters.len());

        let mut data = data.to_vec();
        for (i, filter) in filters.iter().enumerate() {
            let params = self.filter_params(i).map(PredictorParams::from_dict);
            data = filter.decode(&data, params.as_ref())?;
        }
        Ok(data)
    }

    /// `/DecodeParms` for the filter at `index`
    fn filter_params(&self, index: usize) -> Option<&Dictionary> {
        match self.dict.get("DecodeParms") {
            Some(Object::Dictionary(d)) if index == 0 => Some(d),
            Some(Object::Array(items)) => items.get(index).and_then(|item| match item {
                Object::Dictionary(d) => Some(d),
                _ => None,
            }),
            _ => None,
        }
    }

    pub fn write_to(&self, output: &mut Vec<u8>) {
        self.dict.write_to(output);
        output.extend_from_slice(b"\nstream\n");
        output.extend_from_slice(&self.content);
        output.extend_from_slice(b"\nendstream");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    use test_log::test;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_length_tracks_content() {
        let mut stream = Stream::new(Dictionary::new(), b"Hello World".to_vec());
        assert_eq!(stream.dict.get_integer("Length"), Some(11));

        stream.set_content(b"Updated".to_vec());
        assert_eq!(stream.dict.get_integer("Length"), Some(7));
        assert_eq!(stream.content(), b"Updated");
    }

    #[test]
    fn test_flate_decode() -> PdfGuardResult<()> {
        let original = b"Test data for deflate compression";
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("FlateDecode"));
        let stream = Stream::new(dict, deflate(original));

        assert_eq!(stream.decoded_content()?, original);
        Ok(())
    }

    #[test]
    fn test_unfiltered_passthrough() -> PdfGuardResult<()> {
        let stream = Stream::new(Dictionary::new(), b"raw".to_vec());
        assert_eq!(stream.decoded_content()?, b"raw");
        Ok(())
    }

    #[test]
    fn test_crypt_filter_detection() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Array(vec![Object::name("Crypt")]));
        assert!(Stream::new(dict, Vec::new()).has_crypt_filter());
        assert!(!Stream::new(Dictionary::new(), Vec::new()).has_crypt_filter());
    }

    #[test]
    fn test_unsupported_filter() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("JBIG2Decode"));
        let stream = Stream::new(dict, vec![1, 2, 3]);
        assert!(matches!(
            stream.decoded_content(),
            Err(PdfGuardError::MalformedContainer(_))
        ));
    }
}
