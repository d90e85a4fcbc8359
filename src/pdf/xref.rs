//! PDF cross-reference index: classic tables and cross-reference streams

use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder};
use log::trace;

use super::lexer::Lexer;
use super::{Dictionary, Object, ObjectId, Stream};
use crate::error::{PdfGuardError, PdfGuardResult};

/// Location of one object number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Object number is free (deleted or never used)
    Free,
    /// Object stored directly at a byte offset
    InUse { offset: usize, generation: u16 },
    /// Object stored inside an object stream
    Compressed { stream: u32, index: u32 },
}

/// Mapping from object number to location, read-only once parsing completes
#[derive(Debug, Clone, Default)]
pub struct ObjectIndex {
    entries: BTreeMap<u32, XrefEntry>,
}

impl ObjectIndex {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Record an entry unless a newer section already defined this number
    pub(crate) fn insert_if_absent(&mut self, number: u32, entry: XrefEntry) {
        self.entries.entry(number).or_insert(entry);
    }

    pub fn get(&self, number: u32) -> Option<XrefEntry> {
        self.entries.get(&number).copied()
    }

    /// True when `id` names a live (non-free) object of the indexed generation
    pub fn contains(&self, id: ObjectId) -> bool {
        match self.get(id.number) {
            Some(XrefEntry::InUse { generation, .. }) => generation == id.generation,
            Some(XrefEntry::Compressed { .. }) => id.generation == 0,
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, XrefEntry)> + '_ {
        self.entries.iter().map(|(n, e)| (*n, *e))
    }

    /// Identifiers of all live objects, ascending
    pub fn live_ids(&self) -> Vec<ObjectId> {
        self.iter()
            .filter_map(|(number, entry)| match entry {
                XrefEntry::InUse { generation, .. } => Some(ObjectId::new(number, generation)),
                XrefEntry::Compressed { .. } => Some(ObjectId::new(number, 0)),
                XrefEntry::Free => None,
            })
            .collect()
    }

    pub fn max_number(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a classic `xref` table; the lexer sits just after the `xref` keyword.
/// Returns the entries and the following trailer dictionary.
pub(crate) fn parse_xref_table(
    lexer: &mut Lexer<'_>,
) -> PdfGuardResult<(Vec<(u32, XrefEntry)>, Dictionary)> {
    let mut entries = Vec::new();

    loop {
        if lexer.peek_token() == b"trailer" {
            lexer.read_token();
            break;
        }
        if lexer.is_eof() {
            return Err(PdfGuardError::broken_xref("xref table without trailer"));
        }

        let start = lexer
            .read_unsigned()
            .ok_or_else(|| PdfGuardError::broken_xref("invalid xref subsection start"))?;
        let count = lexer
            .read_unsigned()
            .ok_or_else(|| PdfGuardError::broken_xref("invalid xref subsection count"))?;
        trace!("Xref subsection {} +{}", start, count);

        for i in 0..count {
            let offset = lexer
                .read_unsigned()
                .ok_or_else(|| PdfGuardError::broken_xref("invalid xref entry offset"))?;
            let generation = lexer
                .read_unsigned()
                .ok_or_else(|| PdfGuardError::broken_xref("invalid xref entry generation"))?;
            let kind = lexer.read_token();

            let number = u32::try_from(start + i)
                .map_err(|_| PdfGuardError::broken_xref("object number out of range"))?;
            let entry = match kind {
                b"n" if offset > 0 => XrefEntry::InUse {
                    offset: offset as usize,
                    generation: generation.min(u16::MAX as u64) as u16,
                },
                b"n" | b"f" => XrefEntry::Free,
                other => {
                    return Err(PdfGuardError::broken_xref(format!(
                        "invalid xref entry type '{}'",
                        String::from_utf8_lossy(other)
                    )))
                }
            };
            entries.push((number, entry));
        }
    }

    match lexer.parse_object() {
        Ok(Object::Dictionary(trailer)) => Ok((entries, trailer)),
        Ok(other) => Err(PdfGuardError::malformed(format!(
            "trailer must be a dictionary, found {}",
            other.type_name()
        ))),
        Err(e) => Err(e),
    }
}

/// Decode the entries of a `/Type /XRef` stream
pub(crate) fn parse_xref_stream(stream: &Stream) -> PdfGuardResult<Vec<(u32, XrefEntry)>> {
    let dict = &stream.dict;
    let widths: Vec<usize> = dict
        .get_array("W")
        .ok_or_else(|| PdfGuardError::broken_xref("xref stream without /W"))?
        .iter()
        .map(|w| w.as_integer().and_then(|v| usize::try_from(v).ok()))
        .collect::<Option<_>>()
        .ok_or_else(|| PdfGuardError::broken_xref("invalid /W entry"))?;
    if widths.len() != 3 || widths.iter().any(|&w| w > 8) {
        return Err(PdfGuardError::broken_xref("xref stream /W must hold three widths of at most 8"));
    }

    let size = dict
        .get_integer("Size")
        .ok_or_else(|| PdfGuardError::broken_xref("xref stream without /Size"))?;
    let ranges: Vec<(u64, u64)> = match dict.get_array("Index") {
        Some(index) => index
            .chunks(2)
            .map(|pair| match pair {
                [start, count] => Some((
                    u64::try_from(start.as_integer()?).ok()?,
                    u64::try_from(count.as_integer()?).ok()?,
                )),
                _ => None,
            })
            .collect::<Option<_>>()
            .ok_or_else(|| PdfGuardError::broken_xref("invalid /Index entry"))?,
        None => vec![(0, u64::try_from(size).unwrap_or(0))],
    };

    let data = stream.decoded_content()?;
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(PdfGuardError::broken_xref("xref stream rows are empty"));
    }
    let mut rows = data.chunks_exact(row_len);
    let mut entries = Vec::new();

    for (start, count) in ranges {
        for i in 0..count {
            let row = rows
                .next()
                .ok_or_else(|| PdfGuardError::broken_xref("xref stream shorter than /Index"))?;
            let (f1, rest) = row.split_at(widths[0]);
            let (f2, f3) = rest.split_at(widths[1]);

            // A zero-width type field defaults to type 1.
            let kind = if widths[0] == 0 { 1 } else { read_field(f1) };
            let number = u32::try_from(start + i)
                .map_err(|_| PdfGuardError::broken_xref("object number out of range"))?;
            let entry = match kind {
                0 => XrefEntry::Free,
                1 => XrefEntry::InUse {
                    offset: read_field(f2) as usize,
                    generation: read_field(f3).min(u16::MAX as u64) as u16,
                },
                2 => XrefEntry::Compressed {
                    stream: read_field(f2) as u32,
                    index: read_field(f3) as u32,
                },
                // Unknown types are reserved and read as null references.
                _ => XrefEntry::Free,
            };
            entries.push((number, entry));
        }
    }

    Ok(entries)
}

fn read_field(bytes: &[u8]) -> u64 {
    if bytes.is_empty() {
        0
    } else {
        BigEndian::read_uint(bytes, bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test]
    fn test_classic_table() -> PdfGuardResult<()> {
        let data = b"0 3\n0000000000 65535 f \n0000000015 00000 n \n0000000079 00001 n\r\n\
                     trailer\n<< /Size 3 /Root 1 0 R >>";
        let mut lexer = Lexer::new(data);
        let (entries, trailer) = parse_xref_table(&mut lexer)?;

        assert_eq!(
            entries,
            vec![
                (0, XrefEntry::Free),
                (1, XrefEntry::InUse { offset: 15, generation: 0 }),
                (2, XrefEntry::InUse { offset: 79, generation: 1 }),
            ]
        );
        assert_eq!(trailer.get_integer("Size"), Some(3));
        Ok(())
    }

    #[test]
    fn test_multiple_subsections() -> PdfGuardResult<()> {
        let data = b"0 1\n0000000000 65535 f \n4 1\n0000000200 00000 n \ntrailer << >>";
        let (entries, _) = parse_xref_table(&mut Lexer::new(data))?;
        assert_eq!(entries[1], (4, XrefEntry::InUse { offset: 200, generation: 0 }));
        Ok(())
    }

    #[test]
    fn test_table_without_trailer() {
        let data = b"0 1\n0000000000 65535 f \n";
        assert!(matches!(
            parse_xref_table(&mut Lexer::new(data)),
            Err(PdfGuardError::BrokenXref(_))
        ));
    }

    #[test]
    fn test_xref_stream_entries() -> PdfGuardResult<()> {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XRef"));
        dict.set("Size", 3i64);
        dict.set("W", Object::Array(vec![1i64.into(), 2i64.into(), 1i64.into()]));
        let rows = vec![
            0, 0, 0, 255, // free
            1, 0, 15, 0, // offset 15
            2, 0, 5, 3, // in object stream 5, index 3
        ];
        let entries = parse_xref_stream(&Stream::new(dict, rows))?;

        assert_eq!(
            entries,
            vec![
                (0, XrefEntry::Free),
                (1, XrefEntry::InUse { offset: 15, generation: 0 }),
                (2, XrefEntry::Compressed { stream: 5, index: 3 }),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_index_last_writer_wins() {
        let mut index = ObjectIndex::new();
        index.insert_if_absent(3, XrefEntry::InUse { offset: 500, generation: 0 });
        index.insert_if_absent(3, XrefEntry::InUse { offset: 100, generation: 0 });
        index.insert_if_absent(4, XrefEntry::Free);

        assert_eq!(index.get(3), Some(XrefEntry::InUse { offset: 500, generation: 0 }));
        assert_eq!(index.live_ids(), vec![ObjectId::new(3, 0)]);
        assert!(index.contains(ObjectId::new(3, 0)));
        assert!(!index.contains(ObjectId::new(3, 1)));
        assert!(!index.contains(ObjectId::new(4, 0)));
        assert_eq!(index.max_number(), 4);
    }
}
