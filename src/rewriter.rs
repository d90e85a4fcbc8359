//! Full-document rewrite with encryption applied or removed

use std::collections::{BTreeMap, HashSet};

use log::{debug, trace, warn};
use rand::RngCore;

use crate::crypto::{CryptoEngine, PayloadKind, SecureRandom};
use crate::error::{PdfGuardError, PdfGuardResult};
use crate::handlers::{SecurityHandler, StandardSecurityHandler};
use crate::options::ProtectionOptions;
use crate::pdf::{Dictionary, Document, DocumentWriter, MaterializedObject, Object, ObjectId};
use crate::security::object_encryption::{decrypt_object, encrypt_object};

const DOCUMENT_ID_LEN: usize = 16;

type Objects = BTreeMap<ObjectId, MaterializedObject>;

/// Produces a new file from a parsed [`Document`]
///
/// Object numbers are preserved. Object streams are flattened into plain
/// indirect objects and the output always uses a classic cross-reference
/// table.
pub struct Rewriter<'a> {
    engine: &'a CryptoEngine,
}

impl<'a> Rewriter<'a> {
    pub fn new(engine: &'a CryptoEngine) -> Self {
        Self { engine }
    }

    /// Encrypt every string and stream and attach a fresh encryption dictionary
    pub fn protect(
        &self,
        doc: &Document,
        options: &ProtectionOptions,
        rng: &mut dyn SecureRandom,
    ) -> PdfGuardResult<Vec<u8>> {
        if doc.is_encrypted() {
            return Err(PdfGuardError::AlreadyProtected);
        }
        debug!("Protecting document with {}", options.algorithm());

        let mut document_id = [0u8; DOCUMENT_ID_LEN];
        rng.fill_bytes(&mut document_id);
        let (handler, key) = StandardSecurityHandler::create(options, &document_id, rng)?;

        let mut objects = doc.materialize(|_, stream| Ok(stream.content().to_vec()))?;
        let encrypted = walk(doc, &mut objects, &mut |id: ObjectId, entry: &mut MaterializedObject| {
            encrypt_object(self.engine, &key, id, &mut entry.object, &mut *rng)
        })?;
        trace!("Encrypted {} objects", encrypted);

        let last_number = objects
            .keys()
            .next_back()
            .map_or(0, |id| id.number)
            .max(doc.index().max_number());
        let encrypt_id = ObjectId::new(last_number + 1, 0);

        let version = newer_version(doc.version(), options.algorithm().min_version());
        let mut writer = DocumentWriter::new(version);
        for (id, entry) in &objects {
            writer.write_object(*id, &entry.object);
        }
        writer.write_object(encrypt_id, &Object::Dictionary(handler.to_dict()));

        let mut trailer = base_trailer(doc, &objects);
        trailer.set("Encrypt", encrypt_id);
        trailer.set(
            "ID",
            vec![Object::string(document_id.to_vec()), Object::string(document_id.to_vec())],
        );

        let output = writer.finish(trailer);
        debug!("Protected output is {} bytes", output.len());
        Ok(output)
    }

    /// Decrypt every string and stream and drop the encryption dictionary
    pub fn unprotect(&self, doc: &Document, password: &str) -> PdfGuardResult<Vec<u8>> {
        let dict = doc.encryption_dictionary()?.ok_or(PdfGuardError::NotProtected)?;
        let handler = SecurityHandler::from_dict(&dict)?;
        let document_id = doc.document_id().unwrap_or_default();
        let key = handler.authenticate_password(password, document_id)?;
        debug!("Removing {} protection", handler.algorithm());

        let mut objects = doc.materialize(|id, stream| {
            self.engine.decrypt(stream.content(), &key, id, PayloadKind::Stream)
        })?;
        if let Some(encrypt_id) = doc.encryption_reference() {
            objects.remove(&encrypt_id);
        }

        // Members of object streams were decrypted with their container.
        walk(doc, &mut objects, &mut |id: ObjectId, entry: &mut MaterializedObject| {
            if entry.compressed {
                return Ok(());
            }
            decrypt_object(self.engine, &key, id, &mut entry.object)
        })?;

        let mut writer = DocumentWriter::new(doc.version());
        for (id, entry) in &objects {
            writer.write_object(*id, &entry.object);
        }

        let mut trailer = base_trailer(doc, &objects);
        if let Some(id) = doc.trailer().get("ID") {
            trailer.set("ID", id.clone());
        }

        let output = writer.finish(trailer);
        debug!("Unprotected output is {} bytes", output.len());
        Ok(output)
    }
}

type Visit<'a> = dyn FnMut(ObjectId, &mut MaterializedObject) -> PdfGuardResult<()> + 'a;

/// Visit each object once, starting from the trailer's `/Root` and `/Info`
///
/// Returns the number of objects visited.
fn walk(doc: &Document, objects: &mut Objects, visit: &mut Visit<'_>) -> PdfGuardResult<usize> {
    let mut stack: Vec<ObjectId> = objects.keys().rev().copied().collect();
    if let Some(info) = doc.info_id() {
        stack.push(info);
    }
    stack.push(doc.root_id());

    let mut visited = HashSet::new();
    let mut count = 0;
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let entry = match objects.get_mut(&id) {
            Some(entry) => entry,
            None => {
                warn!("Reference to missing object {} left as is", id);
                continue;
            }
        };
        visit(id, entry)?;
        count += 1;

        let mut references = Vec::new();
        entry.object.collect_references(&mut references);
        stack.extend(references.into_iter().rev().filter(|r| !visited.contains(r)));
    }
    Ok(count)
}

/// `/Root` and `/Info` carried over from the source trailer
fn base_trailer(doc: &Document, objects: &Objects) -> Dictionary {
    let mut trailer = Dictionary::new();
    trailer.set("Root", doc.root_id());
    if let Some(info) = doc.info_id().filter(|id| objects.contains_key(id)) {
        trailer.set("Info", info);
    }
    trailer
}

/// The later of two `major.minor` header versions
fn newer_version<'v>(current: &'v str, required: &'v str) -> &'v str {
    fn parse(version: &str) -> (u32, u32) {
        let mut parts = version.split('.').map(|p| p.parse().unwrap_or(0));
        (parts.next().unwrap_or(0), parts.next().unwrap_or(0))
    }
    if parse(required) > parse(current) {
        required
    } else {
        current
    }
}
