//! In-memory PDF fixtures shared by the integration tests

#![allow(dead_code)]

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_guard::pdf::{Object, ObjectId};
use pdf_guard::{Document, PdfGuardResult};

/// Classic file: header, objects, xref table, trailer
pub fn classic_pdf(objects: &[(u32, &str)], trailer: &str) -> Vec<u8> {
    let mut out = b"%PDF-1.7\n".to_vec();
    let offsets = write_objects(&mut out, objects);
    let size = objects.iter().map(|(n, _)| n + 1).max().unwrap_or(1);
    write_xref_table(&mut out, &offsets, &format!("/Size {} {}", size, trailer));
    out
}

/// Append an incremental update section that chains to the previous one
pub fn incremental_update(base: &[u8], objects: &[(u32, &str)], trailer: &str) -> Vec<u8> {
    let prev = last_startxref(base);
    let mut out = base.to_vec();
    let offsets = write_objects(&mut out, objects);
    write_xref_table(&mut out, &offsets, &format!("{} /Prev {}", trailer, prev));
    out
}

/// Cross-reference stream file whose catalog and info dictionary live in an
/// object stream
///
/// 1: catalog and 2: info (compressed in 3), 3: object stream,
/// 4: content stream, 5: pages, 6: xref stream
pub fn xref_stream_pdf(title: &str, content: &[u8]) -> Vec<u8> {
    let (mut out, offsets) = compressed_body(title, content);

    let xref_offset = out.len();
    let mut rows = vec![xref_row(0, 0, 65535), xref_row(2, 3, 0), xref_row(2, 3, 1)];
    rows.extend(offsets.iter().map(|(_, offset)| xref_row(1, *offset as u32, 0)));
    rows.push(xref_row(1, xref_offset as u32, 0));
    let rows = deflate(&rows.concat());

    out.extend_from_slice(
        format!(
            "6 0 obj\n<< /Type /XRef /Size 7 /W [1 4 2] /Root 1 0 R /Info 2 0 R \
             /Filter /FlateDecode /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rows);
    out.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());
    out
}

/// Hybrid-reference file with the same objects as [`xref_stream_pdf`]
///
/// The classic table lists every number, marking the compressed catalog and
/// info dictionary free; the `/XRefStm` stream 6 locates them in stream 3.
pub fn hybrid_pdf(title: &str, content: &[u8]) -> Vec<u8> {
    let (mut out, mut offsets) = compressed_body(title, content);

    let stm_offset = out.len();
    let rows = deflate(&[xref_row(2, 3, 0), xref_row(2, 3, 1)].concat());
    out.extend_from_slice(
        format!(
            "6 0 obj\n<< /Type /XRef /Size 7 /Index [1 2] /W [1 4 2] \
             /Filter /FlateDecode /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rows);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    offsets.push((6, stm_offset));

    let xref_offset = out.len();
    out.extend_from_slice(b"xref\n0 7\n0000000000 65535 f \n0000000000 00000 f \n0000000000 00000 f \n");
    for (_, offset) in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size 7 /Root 1 0 R /Info 2 0 R /XRefStm {} >>\nstartxref\n{}\n%%EOF\n",
            stm_offset, xref_offset
        )
        .as_bytes(),
    );
    out
}

/// Objects 3 (object stream holding 1 and 2), 4 and 5, with their offsets
fn compressed_body(title: &str, content: &[u8]) -> (Vec<u8>, Vec<(u32, usize)>) {
    let members = [
        (1u32, "<< /Type /Catalog /Pages 5 0 R /Lang (en-GB) >>".to_string()),
        (2u32, format!("<< /Title ({}) /Producer (fixture) >>", title)),
    ];
    let mut header = String::new();
    let mut body = String::new();
    for (number, text) in &members {
        header.push_str(&format!("{} {} ", number, body.len()));
        body.push_str(text);
        body.push('\n');
    }
    let objstm = deflate(format!("{}{}", header, body).as_bytes());

    let mut out = b"%PDF-1.5\n".to_vec();
    let mut offsets = Vec::new();

    offsets.push((3u32, out.len()));
    out.extend_from_slice(
        format!(
            "3 0 obj\n<< /Type /ObjStm /N 2 /First {} /Filter /FlateDecode /Length {} >>\nstream\n",
            header.len(),
            objstm.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&objstm);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    offsets.push((4, out.len()));
    out.extend_from_slice(format!("4 0 obj\n<< /Length {} >>\nstream\n", content.len()).as_bytes());
    out.extend_from_slice(content);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    offsets.push((5, out.len()));
    out.extend_from_slice(b"5 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    (out, offsets)
}

/// One `/W [1 4 2]` cross-reference stream row
fn xref_row(kind: u8, field: u32, extra: u16) -> Vec<u8> {
    let mut row = vec![kind];
    row.extend_from_slice(&field.to_be_bytes());
    row.extend_from_slice(&extra.to_be_bytes());
    row
}

/// Catalog, pages and one content stream, with strings in each dictionary
pub fn three_object_pdf() -> Vec<u8> {
    classic_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R /Lang (en-US) >>"),
            (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 /Label (all pages) >>"),
            (3, "<< /Length 43 /Note (page three) >>\nstream\nBT /F1 24 Tf 72 720 Td (Hello, world) Tj ET\nendstream"),
        ],
        "/Root 1 0 R",
    )
}

/// Every string and stream payload inside `object`, in traversal order
pub fn payloads(object: &Object) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    collect_payloads(object, &mut out);
    out
}

fn collect_payloads(object: &Object, out: &mut Vec<Vec<u8>>) {
    match object {
        Object::String(bytes) => out.push(bytes.clone()),
        Object::Array(items) => items.iter().for_each(|item| collect_payloads(item, out)),
        Object::Dictionary(dict) => dict.values().for_each(|value| collect_payloads(value, out)),
        Object::Stream(stream) => {
            stream.dict.values().for_each(|value| collect_payloads(value, out));
            out.push(stream.content().to_vec());
        }
        _ => {}
    }
}

/// Payloads of object `number` (generation 0)
pub fn object_payloads(doc: &Document, number: u32) -> PdfGuardResult<Vec<Vec<u8>>> {
    Ok(payloads(&doc.load_object(ObjectId::new(number, 0))?))
}

fn write_objects(out: &mut Vec<u8>, objects: &[(u32, &str)]) -> Vec<(u32, usize)> {
    objects
        .iter()
        .map(|(number, body)| {
            let offset = out.len();
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", number, body).as_bytes());
            (*number, offset)
        })
        .collect()
}

/// One subsection per object plus the free head entry
fn write_xref_table(out: &mut Vec<u8>, offsets: &[(u32, usize)], trailer: &str) {
    let xref_offset = out.len();
    out.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \n");
    for (number, offset) in offsets {
        out.extend_from_slice(format!("{} 1\n{:010} 00000 n \n", number, offset).as_bytes());
    }
    out.extend_from_slice(format!("trailer\n<< {} >>\nstartxref\n{}\n%%EOF\n", trailer, xref_offset).as_bytes());
}

fn last_startxref(data: &[u8]) -> usize {
    let text = String::from_utf8_lossy(data);
    text.rsplit("startxref")
        .next()
        .and_then(|tail| tail.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
