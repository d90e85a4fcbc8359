//! PDF document parser implementation

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace, warn};

use super::lexer::{find_subsequence, rfind_subsequence, LengthResolver, Lexer};
use super::xref::{parse_xref_stream, parse_xref_table, ObjectIndex, XrefEntry};
use super::{Dictionary, Object, ObjectId, Stream};
use crate::error::{PdfGuardError, PdfGuardResult};

const PDF_MAGIC: &[u8] = b"%PDF-";
const HEADER_SEARCH_WINDOW: usize = 1024;
const STARTXREF_MARKER: &[u8] = b"startxref";
const MAX_LENGTH_INDIRECTION: usize = 8;

/// Trailer keys that describe one cross-reference section rather than the document
const SECTION_KEYS: [&[u8]; 9] = [
    b"Prev",
    b"XRefStm",
    b"Type",
    b"W",
    b"Index",
    b"Length",
    b"Filter",
    b"DecodeParms",
    b"Size",
];

/// An object produced by [`Document::materialize`]
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedObject {
    pub object: Object,
    /// True when the object was unpacked from an object stream
    pub compressed: bool,
}

/// Parsed PDF container
///
/// Holds the raw bytes, the merged cross-reference index and trailer.
/// Objects are parsed on demand.
#[derive(Debug, Clone)]
pub struct Document {
    data: Vec<u8>,
    version: String,
    index: ObjectIndex,
    trailer: Dictionary,
    root: ObjectId,
}

struct XrefSection {
    entries: Vec<(u32, XrefEntry)>,
    trailer: Dictionary,
}

impl Document {
    /// Parse a PDF container
    pub fn parse(data: &[u8]) -> PdfGuardResult<Self> {
        debug!("Parsing PDF container of {} bytes", data.len());

        let version = read_header_version(data)?;
        let start = find_startxref(data)?;

        let mut index = ObjectIndex::new();
        let mut trailer = Dictionary::new();
        let mut max_size = 0i64;
        let mut visited = HashSet::new();
        let mut next = Some(start);

        while let Some(offset) = next.take() {
            if !visited.insert(offset) {
                warn!("Cross-reference chain revisits offset {}, stopping", offset);
                break;
            }
            let section = read_section(data, offset)?;
            trace!(
                "Section at offset {} holds {} entries",
                offset,
                section.entries.len()
            );

            for (number, entry) in section.entries {
                index.insert_if_absent(number, entry);
            }
            max_size = max_size.max(section.trailer.get_integer("Size").unwrap_or(0));
            for (key, value) in section.trailer.iter() {
                if !SECTION_KEYS.contains(&key) && trailer.get_bytes(key).is_none() {
                    trailer.set_bytes(key.to_vec(), value.clone());
                }
            }

            next = section
                .trailer
                .get_integer("Prev")
                .and_then(|prev| usize::try_from(prev).ok());
        }
        trailer.set("Size", max_size.max(index.max_number() as i64 + 1));

        let root = match trailer.get("Root") {
            Some(Object::Reference(id)) => *id,
            Some(other) => {
                return Err(PdfGuardError::malformed(format!(
                    "trailer /Root must be a reference, found {}",
                    other.type_name()
                )))
            }
            None => return Err(PdfGuardError::malformed("trailer has no /Root")),
        };
        if !index.contains(root) {
            return Err(PdfGuardError::broken_xref(format!(
                "/Root {} is not in the cross-reference index",
                root
            )));
        }
        if let Some(Object::Reference(id)) = trailer.get("Encrypt") {
            if !index.contains(*id) {
                return Err(PdfGuardError::broken_xref(format!(
                    "/Encrypt {} is not in the cross-reference index",
                    id
                )));
            }
        }

        let document = Self {
            data: data.to_vec(),
            version,
            index,
            trailer,
            root,
        };
        // The catalog must actually sit where the index says.
        if let Some(XrefEntry::InUse { .. }) = document.index.get(root.number) {
            document.load_object(root)?;
        }

        debug!(
            "Parsed PDF {} with {} indexed objects",
            document.version,
            document.index.len()
        );
        Ok(document)
    }

    /// Header version, e.g. `1.7`
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Merged trailer dictionary (newest section wins)
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn index(&self) -> &ObjectIndex {
        &self.index
    }

    pub fn root_id(&self) -> ObjectId {
        self.root
    }

    /// `/Info` reference, when it resolves to an indexed object
    pub fn info_id(&self) -> Option<ObjectId> {
        self.trailer
            .get_reference("Info")
            .filter(|id| self.index.contains(*id))
    }

    /// First element of the trailer `/ID` array
    pub fn document_id(&self) -> Option<&[u8]> {
        self.trailer
            .get_array("ID")
            .and_then(|id| id.first())
            .and_then(Object::as_string)
    }

    /// True when the trailer carries an `/Encrypt` entry
    pub fn is_encrypted(&self) -> bool {
        self.trailer.contains_key("Encrypt")
    }

    /// Object number of an indirect encryption dictionary
    pub fn encryption_reference(&self) -> Option<ObjectId> {
        self.trailer.get_reference("Encrypt")
    }

    /// Resolve the encryption dictionary, inline or indirect
    pub fn encryption_dictionary(&self) -> PdfGuardResult<Option<Dictionary>> {
        let dict = match self.trailer.get("Encrypt") {
            None => return Ok(None),
            Some(Object::Dictionary(dict)) => dict.clone(),
            Some(Object::Reference(id)) => match self.load_object(*id)? {
                Object::Dictionary(dict) => dict,
                other => {
                    return Err(PdfGuardError::malformed(format!(
                        "/Encrypt {} is a {}, not a dictionary",
                        id,
                        other.type_name()
                    )))
                }
            },
            Some(other) => {
                return Err(PdfGuardError::malformed(format!(
                    "/Encrypt must be a dictionary, found {}",
                    other.type_name()
                )))
            }
        };
        Ok(Some(dict))
    }

    /// Parse one indirect object
    ///
    /// Members of object streams are decoded without decryption, so in an
    /// encrypted document they can only be read through [`Document::materialize`].
    pub fn load_object(&self, id: ObjectId) -> PdfGuardResult<Object> {
        self.load_object_at_depth(id, 0)
    }

    fn load_object_at_depth(&self, id: ObjectId, depth: usize) -> PdfGuardResult<Object> {
        match self.index.get(id.number) {
            Some(XrefEntry::InUse { offset, generation }) if generation == id.generation => {
                self.load_direct(id, offset, depth)
            }
            Some(XrefEntry::Compressed { stream, index }) if id.generation == 0 => {
                let container = ObjectId::new(stream, 0);
                let container_stream = self.load_object_stream(container, depth + 1)?;
                let members = unpack_object_stream(&container_stream, container_stream.decoded_content()?)?;
                match members.into_iter().nth(index as usize) {
                    Some((number, object)) if number == id.number => Ok(object),
                    _ => Err(PdfGuardError::broken_xref(format!(
                        "object {} is not at index {} of object stream {}",
                        id, index, stream
                    ))),
                }
            }
            _ => Err(PdfGuardError::broken_xref(format!(
                "object {} is not in the cross-reference index",
                id
            ))),
        }
    }

    fn load_direct(&self, id: ObjectId, offset: usize, depth: usize) -> PdfGuardResult<Object> {
        if offset >= self.data.len() {
            return Err(PdfGuardError::broken_xref(format!(
                "object {} offset {} is past the end of the file",
                id, offset
            )));
        }

        let found = Lexer::at(&self.data, offset)
            .read_object_header()
            .map_err(|_| PdfGuardError::broken_xref(format!("no object header at offset {} for {}", offset, id)))?;
        if found != id {
            return Err(PdfGuardError::broken_xref(format!(
                "offset {} holds object {}, expected {}",
                offset, found, id
            )));
        }

        let resolve = |length_id: ObjectId| -> Option<i64> {
            if depth >= MAX_LENGTH_INDIRECTION {
                return None;
            }
            self.load_object_at_depth(length_id, depth + 1)
                .ok()
                .and_then(|obj| obj.as_integer())
        };
        let (_, object) = Lexer::at(&self.data, offset).parse_indirect_object(Some(&resolve as LengthResolver<'_>))?;
        Ok(object)
    }

    fn load_object_stream(&self, id: ObjectId, depth: usize) -> PdfGuardResult<Stream> {
        if depth > MAX_LENGTH_INDIRECTION {
            return Err(PdfGuardError::broken_xref("object streams nest too deeply"));
        }
        match self.load_object_at_depth(id, depth)? {
            Object::Stream(stream) if stream.dict.has_type("ObjStm") => Ok(stream),
            other => Err(PdfGuardError::broken_xref(format!(
                "object {} is a {}, not an object stream",
                id,
                other.type_name()
            ))),
        }
    }

    /// Load every live object exactly once
    ///
    /// Object streams are expanded into their members; `stream_decryptor`
    /// receives each container and returns its raw, still-filtered content
    /// (decrypted when the document is encrypted). Cross-reference and
    /// object stream containers themselves are omitted.
    pub fn materialize<F>(&self, stream_decryptor: F) -> PdfGuardResult<BTreeMap<ObjectId, MaterializedObject>>
    where
        F: Fn(ObjectId, &Stream) -> PdfGuardResult<Vec<u8>>,
    {
        let mut objects = BTreeMap::new();
        let mut containers: HashMap<u32, Vec<(u32, Object)>> = HashMap::new();

        for (number, entry) in self.index.iter() {
            match entry {
                XrefEntry::Free => {}
                XrefEntry::InUse { offset, generation } => {
                    let id = ObjectId::new(number, generation);
                    let object = self.load_direct(id, offset, 0)?;
                    if let Object::Stream(stream) = &object {
                        if stream.dict.has_type("XRef") || stream.dict.has_type("ObjStm") {
                            trace!("Skipping container object {}", id);
                            continue;
                        }
                    }
                    objects.insert(id, MaterializedObject { object, compressed: false });
                }
                XrefEntry::Compressed { stream, index } => {
                    if !containers.contains_key(&stream) {
                        let container_id = ObjectId::new(stream, 0);
                        let container = self.load_object_stream(container_id, 1)?;
                        let raw = stream_decryptor(container_id, &container)?;
                        let decoded = container.decode_bytes(&raw)?;
                        let members = unpack_object_stream(&container, decoded)?;
                        trace!("Object stream {} holds {} objects", stream, members.len());
                        containers.insert(stream, members);
                    }

                    let member = containers
                        .get(&stream)
                        .and_then(|members| members.get(index as usize))
                        .filter(|(member_number, _)| *member_number == number)
                        .map(|(_, object)| object.clone())
                        .ok_or_else(|| {
                            PdfGuardError::broken_xref(format!(
                                "object {} is not at index {} of object stream {}",
                                number, index, stream
                            ))
                        })?;
                    objects.insert(
                        ObjectId::new(number, 0),
                        MaterializedObject { object: member, compressed: true },
                    );
                }
            }
        }

        debug!("Materialized {} objects", objects.len());
        Ok(objects)
    }
}

fn read_header_version(data: &[u8]) -> PdfGuardResult<String> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let start = find_subsequence(window, PDF_MAGIC)
        .ok_or_else(|| PdfGuardError::malformed("missing %PDF- header"))?
        + PDF_MAGIC.len();

    let version: Vec<u8> = data[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .copied()
        .collect();
    match version.as_slice() {
        [major, b'.', minor, ..] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            Ok(String::from_utf8_lossy(&version).into_owned())
        }
        _ => Err(PdfGuardError::malformed("invalid PDF header version")),
    }
}

fn find_startxref(data: &[u8]) -> PdfGuardResult<usize> {
    let pos = rfind_subsequence(data, STARTXREF_MARKER)
        .ok_or_else(|| PdfGuardError::malformed("no startxref marker, trailer cannot be located"))?;
    let offset = Lexer::at(data, pos + STARTXREF_MARKER.len())
        .read_unsigned()
        .ok_or_else(|| PdfGuardError::malformed("startxref is not followed by an offset"))?;
    usize::try_from(offset).map_err(|_| PdfGuardError::broken_xref("startxref offset out of range"))
}

/// Read one cross-reference section: a classic table (plus its hybrid
/// `/XRefStm`) or a cross-reference stream
fn read_section(data: &[u8], offset: usize) -> PdfGuardResult<XrefSection> {
    if offset >= data.len() {
        return Err(PdfGuardError::broken_xref(format!(
            "cross-reference offset {} is past the end of the file",
            offset
        )));
    }

    let mut lexer = Lexer::at(data, offset);
    if lexer.peek_token() == b"xref" {
        lexer.read_token();
        let (entries, trailer) = parse_xref_table(&mut lexer)?;

        let entries = match trailer.get_integer("XRefStm").and_then(|o| usize::try_from(o).ok()) {
            Some(stm_offset) => {
                trace!("Hybrid file, reading /XRefStm at {}", stm_offset);
                merge_hybrid(entries, read_xref_stream(data, stm_offset)?.entries)
            }
            None => entries,
        };
        return Ok(XrefSection { entries, trailer });
    }

    read_xref_stream(data, offset)
}

/// Combine a hybrid section's table with its `/XRefStm` entries
///
/// Table entries win only when in use; a free table slot yields to the
/// stream, which is where compressed objects are listed.
fn merge_hybrid(table: Vec<(u32, XrefEntry)>, stream: Vec<(u32, XrefEntry)>) -> Vec<(u32, XrefEntry)> {
    let mut merged = BTreeMap::new();
    for (number, entry) in table {
        merged.entry(number).or_insert(entry);
    }
    for (number, entry) in stream {
        match merged.get(&number) {
            Some(XrefEntry::InUse { .. }) => {}
            _ => {
                merged.insert(number, entry);
            }
        }
    }
    merged.into_iter().collect()
}

fn read_xref_stream(data: &[u8], offset: usize) -> PdfGuardResult<XrefSection> {
    if offset >= data.len() {
        return Err(PdfGuardError::broken_xref(format!(
            "cross-reference stream offset {} is past the end of the file",
            offset
        )));
    }

    let not_a_section = || {
        PdfGuardError::broken_xref(format!(
            "offset {} is neither an xref table nor a cross-reference stream",
            offset
        ))
    };
    let (id, object) = Lexer::at(data, offset)
        .parse_indirect_object(None)
        .map_err(|_| not_a_section())?;

    match object {
        Object::Stream(stream) if stream.dict.has_type("XRef") => {
            trace!("Cross-reference stream {}", id);
            let entries = parse_xref_stream(&stream)?;
            Ok(XrefSection {
                entries,
                trailer: stream.dict,
            })
        }
        _ => Err(not_a_section()),
    }
}

/// Split a decoded `/Type /ObjStm` body into `(number, object)` pairs
fn unpack_object_stream(stream: &Stream, decoded: Vec<u8>) -> PdfGuardResult<Vec<(u32, Object)>> {
    let count = stream
        .dict
        .get_integer("N")
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| PdfGuardError::malformed("object stream without /N"))?;
    let first = stream
        .dict
        .get_integer("First")
        .and_then(|f| usize::try_from(f).ok())
        .ok_or_else(|| PdfGuardError::malformed("object stream without /First"))?;

    // Each header pair takes at least four bytes.
    if count > decoded.len() / 4 {
        return Err(PdfGuardError::malformed(format!(
            "object stream /N {} does not fit in {} decoded bytes",
            count,
            decoded.len()
        )));
    }

    let mut header = Lexer::new(&decoded);
    let mut slots = Vec::with_capacity(count);
    for _ in 0..count {
        let number = header.read_unsigned().and_then(|n| u32::try_from(n).ok());
        let offset = header.read_unsigned().and_then(|o| usize::try_from(o).ok());
        match (number, offset) {
            (Some(number), Some(offset)) => slots.push((number, offset)),
            _ => return Err(PdfGuardError::malformed("invalid object stream header")),
        }
    }

    slots
        .into_iter()
        .map(|(number, offset)| {
            let pos = first.saturating_add(offset);
            if pos >= decoded.len() {
                return Err(PdfGuardError::malformed(format!(
                    "object stream member {} lies outside the stream",
                    number
                )));
            }
            let object = Lexer::at(&decoded, pos).parse_object()?;
            Ok((number, object))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    /// Lay out numbered object bodies and a classic xref table
    fn build_pdf(objects: &[(u32, &str)], trailer: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = BTreeMap::new();
        for (number, body) in objects {
            offsets.insert(*number, out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", number, body).as_bytes());
        }
        let size = offsets.keys().max().map_or(1, |m| m + 1);
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        for n in 0..size {
            match offsets.get(&n) {
                Some(offset) => out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes()),
                None => out.extend_from_slice(b"0000000000 65535 f \n"),
            }
        }
        out.extend_from_slice(format!("trailer\n{}\nstartxref\n{}\n%%EOF\n", trailer, xref).as_bytes());
        out
    }

    fn simple_pdf() -> Vec<u8> {
        build_pdf(
            &[
                (1, "<< /Type /Catalog /Pages 2 0 R >>"),
                (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
                (3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>"),
                (4, "<< /Length 5 0 R >>\nstream\nBT ET\nendstream"),
                (5, "5"),
            ],
            "<< /Size 6 /Root 1 0 R >>",
        )
    }

    #[test]
    fn test_parse_classic_document() -> PdfGuardResult<()> {
        let doc = Document::parse(&simple_pdf())?;

        assert_eq!(doc.version(), "1.4");
        assert_eq!(doc.root_id(), ObjectId::new(1, 0));
        assert_eq!(doc.index().live_ids().len(), 5);
        assert!(!doc.is_encrypted());
        assert_eq!(doc.encryption_dictionary()?, None);

        match doc.load_object(ObjectId::new(4, 0))? {
            Object::Stream(stream) => assert_eq!(stream.content(), b"BT ET"),
            other => panic!("Expected stream, got {}", other.type_name()),
        }
        Ok(())
    }

    #[test]
    fn test_missing_header() {
        let result = Document::parse(b"Not a PDF file");
        assert!(matches!(result, Err(PdfGuardError::MalformedContainer(_))));
    }

    #[test]
    fn test_missing_startxref() {
        let result = Document::parse(b"%PDF-1.4\n1 0 obj\n<< >>\nendobj\n%%EOF\n");
        assert!(matches!(result, Err(PdfGuardError::MalformedContainer(_))));
    }

    #[test]
    fn test_startxref_past_end() {
        let result = Document::parse(b"%PDF-1.4\nstartxref\n99999\n%%EOF\n");
        assert!(matches!(result, Err(PdfGuardError::BrokenXref(_))));
    }

    #[test]
    fn test_startxref_pointing_at_garbage() {
        let result = Document::parse(b"%PDF-1.4\nhello world\nstartxref\n9\n%%EOF\n");
        assert!(matches!(result, Err(PdfGuardError::BrokenXref(_))));
    }

    #[test]
    fn test_root_offset_mismatch() {
        let mut pdf = simple_pdf();
        // Point object 1 at object 2's offset.
        let text = String::from_utf8_lossy(&pdf).into_owned();
        let entry_1 = text.find("00000 n").map(|p| p - 11).unwrap();
        let offset_2 = text.find("2 0 obj").unwrap();
        pdf[entry_1..entry_1 + 10].copy_from_slice(format!("{:010}", offset_2).as_bytes());

        assert!(matches!(
            Document::parse(&pdf),
            Err(PdfGuardError::BrokenXref(_))
        ));
    }

    #[test]
    fn test_missing_root() {
        let pdf = build_pdf(&[(1, "<< >>")], "<< /Size 2 >>");
        assert!(matches!(
            Document::parse(&pdf),
            Err(PdfGuardError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_incremental_update_last_writer_wins() -> PdfGuardResult<()> {
        let mut pdf = build_pdf(
            &[(1, "<< /Type /Catalog >>"), (2, "(old)")],
            "<< /Size 3 /Root 1 0 R /Info 2 0 R >>",
        );
        let first_xref = String::from_utf8_lossy(&pdf)
            .rfind("xref\n0")
            .unwrap();

        let updated = pdf.len();
        pdf.extend_from_slice(b"2 0 obj\n(new)\nendobj\n");
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "xref\n2 1\n{:010} 00000 n \ntrailer\n<< /Size 3 /Root 1 0 R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
                updated, first_xref, xref
            )
            .as_bytes(),
        );

        let doc = Document::parse(&pdf)?;
        assert_eq!(doc.load_object(ObjectId::new(2, 0))?, Object::string("new"));
        // Keys only present in the older trailer still merge in.
        assert_eq!(doc.info_id(), Some(ObjectId::new(2, 0)));
        Ok(())
    }

    #[test]
    fn test_prev_cycle_terminates() -> PdfGuardResult<()> {
        let pdf = simple_pdf();
        let xref = String::from_utf8_lossy(&pdf).rfind("xref\n0").unwrap();
        let text = String::from_utf8_lossy(&pdf).replace(
            "<< /Size 6 /Root 1 0 R >>",
            &format!("<< /Size 6 /Root 1 0 R /Prev {} >>", xref),
        );

        let doc = Document::parse(text.as_bytes())?;
        assert_eq!(doc.index().live_ids().len(), 5);
        Ok(())
    }

    #[test]
    fn test_inline_encrypt_dictionary() -> PdfGuardResult<()> {
        let pdf = build_pdf(
            &[(1, "<< /Type /Catalog >>")],
            "<< /Size 2 /Root 1 0 R /Encrypt << /Filter /Standard /V 1 /R 2 >> >>",
        );
        let doc = Document::parse(&pdf)?;
        assert!(doc.is_encrypted());
        let dict = doc.encryption_dictionary()?.unwrap();
        assert_eq!(dict.get_integer("R"), Some(2));
        Ok(())
    }

    #[test]
    fn test_dangling_encrypt_reference() {
        let pdf = build_pdf(
            &[(1, "<< /Type /Catalog >>")],
            "<< /Size 2 /Root 1 0 R /Encrypt 7 0 R >>",
        );
        assert!(matches!(
            Document::parse(&pdf),
            Err(PdfGuardError::BrokenXref(_))
        ));
    }

    #[test]
    fn test_materialize_skips_free_entries() -> PdfGuardResult<()> {
        let doc = Document::parse(&simple_pdf())?;
        let objects = doc.materialize(|_, stream| Ok(stream.content().to_vec()))?;

        assert_eq!(objects.len(), 5);
        assert!(objects.values().all(|o| !o.compressed));
        assert_eq!(
            objects.get(&ObjectId::new(5, 0)).map(|o| &o.object),
            Some(&Object::Integer(5))
        );
        Ok(())
    }

    #[test]
    fn test_hybrid_stream_fills_free_table_slots() {
        let table = vec![
            (0, XrefEntry::Free),
            (1, XrefEntry::Free),
            (2, XrefEntry::InUse { offset: 40, generation: 0 }),
        ];
        let stream = vec![
            (1, XrefEntry::Compressed { stream: 3, index: 0 }),
            (2, XrefEntry::Compressed { stream: 3, index: 1 }),
            (5, XrefEntry::Compressed { stream: 3, index: 2 }),
        ];

        assert_eq!(
            merge_hybrid(table, stream),
            vec![
                (0, XrefEntry::Free),
                (1, XrefEntry::Compressed { stream: 3, index: 0 }),
                (2, XrefEntry::InUse { offset: 40, generation: 0 }),
                (5, XrefEntry::Compressed { stream: 3, index: 2 }),
            ]
        );
    }

    #[test]
    fn test_object_stream_count_larger_than_body() {
        let body = b"10 0 (ten)".to_vec();
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("ObjStm"));
        dict.set("N", i64::MAX);
        dict.set("First", 5i64);
        let stream = Stream::new(dict, body.clone());

        assert!(matches!(
            unpack_object_stream(&stream, body),
            Err(PdfGuardError::MalformedContainer(_))
        ));
    }

    /// Catalog plus an ASCIIHex cross-reference stream carrying `decode_parms`
    fn xref_stream_with_parms(decode_parms: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.5\n".to_vec();
        let catalog = out.len();
        out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let xref = out.len();
        let rows = format!("0000000000FF 01{:08X}00 01{:08X}00>", catalog, xref);
        out.extend_from_slice(
            format!(
                "2 0 obj\n<< /Type /XRef /Size 3 /W [1 4 1] /Root 1 0 R /Filter /ASCIIHexDecode \
                 /DecodeParms {} /Length {} >>\nstream\n{}\nendstream\nendobj\nstartxref\n{}\n%%EOF\n",
                decode_parms,
                rows.len(),
                rows,
                xref
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn test_hostile_predictor_parameters() -> PdfGuardResult<()> {
        let doc = Document::parse(&xref_stream_with_parms("<< >>"))?;
        assert_eq!(doc.root_id(), ObjectId::new(1, 0));

        for parms in [
            "<< /Predictor 12 /Columns 9223372036854775807 >>",
            "<< /Predictor 12 /Columns 1099511627776 >>",
            "<< /Predictor 2 /Colors 4611686018427387904 /BitsPerComponent 16 >>",
        ] {
            assert!(
                matches!(
                    Document::parse(&xref_stream_with_parms(parms)),
                    Err(PdfGuardError::MalformedContainer(_))
                ),
                "{}",
                parms
            );
        }
        Ok(())
    }

    #[test]
    fn test_unpack_object_stream() -> PdfGuardResult<()> {
        let body = b"10 0 11 6 (ten) << /Eleven true >>".to_vec();
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("ObjStm"));
        dict.set("N", 2i64);
        dict.set("First", 10i64);
        let stream = Stream::new(dict, body.clone());

        let members = unpack_object_stream(&stream, body)?;
        assert_eq!(members[0], (10, Object::string("ten")));
        assert_eq!(members[1].0, 11);
        assert_eq!(
            members[1].1.as_dictionary().and_then(|d| d.get_bool("Eleven")),
            Some(true)
        );
        Ok(())
    }
}
