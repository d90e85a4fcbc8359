//! Serialization of a rewritten PDF container

use std::collections::BTreeMap;

use log::{debug, trace};

use super::{Dictionary, Object, ObjectId};

/// Binary marker line that tells transfer tools the file is not text
const BINARY_COMMENT: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

/// Writes a complete PDF file with a classic cross-reference table
#[derive(Debug)]
pub struct DocumentWriter {
    output: Vec<u8>,
    offsets: BTreeMap<u32, (usize, u16)>,
}

impl DocumentWriter {
    /// Start a new file with the given header version
    pub fn new(version: &str) -> Self {
        let mut output = Vec::new();
        output.extend_from_slice(format!("%PDF-{}\n", version).as_bytes());
        output.extend_from_slice(BINARY_COMMENT);
        Self {
            output,
            offsets: BTreeMap::new(),
        }
    }

    /// Append an indirect object and record its offset
    pub fn write_object(&mut self, id: ObjectId, object: &Object) {
        trace!("Writing object {} at offset {}", id, self.output.len());
        self.offsets
            .insert(id.number, (self.output.len(), id.generation));
        self.output
            .extend_from_slice(format!("{} {} obj\n", id.number, id.generation).as_bytes());
        object.write_to(&mut self.output);
        self.output.extend_from_slice(b"\nendobj\n");
    }

    /// Highest object number written so far
    pub fn max_number(&self) -> u32 {
        self.offsets.keys().next_back().copied().unwrap_or(0)
    }

    /// Write the cross-reference table and trailer, returning the file bytes
    pub fn finish(mut self, mut trailer: Dictionary) -> Vec<u8> {
        let size = self.max_number() + 1;
        trailer.set("Size", size as i64);

        let xref_offset = self.output.len();
        self.output
            .extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        for number in 0..size {
            let entry = match self.offsets.get(&number) {
                Some((offset, generation)) => format!("{:010} {:05} n \n", offset, generation),
                None if number == 0 => "0000000000 65535 f \n".to_string(),
                None => "0000000000 00000 f \n".to_string(),
            };
            self.output.extend_from_slice(entry.as_bytes());
        }

        self.output.extend_from_slice(b"trailer\n");
        trailer.write_to(&mut self.output);
        self.output
            .extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());

        debug!(
            "Wrote {} objects, {} bytes",
            self.offsets.len(),
            self.output.len()
        );
        self.output
    }
}
