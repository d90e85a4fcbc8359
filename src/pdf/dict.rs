//! PDF dictionary implementation

use super::object::{write_name, Object, ObjectId};

/// PDF dictionary object, entries kept in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(Vec<u8>, Object)>,
}

impl Dictionary {
    /// Create new dictionary
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Get value by key
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.get_bytes(key.as_bytes())
    }

    pub(crate) fn get_bytes(&self, key: &[u8]) -> Option<&Object> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v)
    }

    /// Get mutable value by key
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.as_slice() == key.as_bytes())
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Get integer value
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Object::as_integer)
    }

    /// Get name value
    pub fn get_name(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(Object::as_name)
    }

    /// Get string value
    pub fn get_string(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(Object::as_string)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Object::as_bool)
    }

    pub fn get_array(&self, key: &str) -> Option<&[Object]> {
        self.get(key).and_then(Object::as_array)
    }

    pub fn get_dictionary(&self, key: &str) -> Option<&Dictionary> {
        match self.get(key) {
            Some(Object::Dictionary(d)) => Some(d),
            _ => None,
        }
    }

    /// Get reference value
    pub fn get_reference(&self, key: &str) -> Option<ObjectId> {
        self.get(key).and_then(Object::as_reference)
    }

    /// Check `/Type` against a name
    pub fn has_type(&self, name: &str) -> bool {
        self.get_name("Type") == Some(name.as_bytes())
    }

    /// Set value, replacing an existing entry in place
    pub fn set(&mut self, key: &str, value: impl Into<Object>) {
        self.set_bytes(key.as_bytes().to_vec(), value.into());
    }

    pub(crate) fn set_bytes(&mut self, key: Vec<u8>, value: Object) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Object> {
        let pos = self
            .entries
            .iter()
            .position(|(k, _)| k.as_slice() == key.as_bytes())?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Object)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &Object> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write dictionary to output
    pub fn write_to(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(b"<<");
        for (key, value) in &self.entries {
            write_name(key, output);
            output.push(b' ');
            value.write_to(output);
            output.push(b'\n');
        }
        output.extend_from_slice(b">>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dictionary_accessors() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Example"));
        dict.set("IntItem", 12i64);
        dict.set("StringItem", Object::string("test"));
        dict.set("Flag", false);
        dict.set("Ref", ObjectId::new(1, 0));

        assert!(dict.has_type("Example"));
        assert_eq!(dict.get_integer("IntItem"), Some(12));
        assert_eq!(dict.get_string("StringItem"), Some(&b"test"[..]));
        assert_eq!(dict.get_bool("Flag"), Some(false));
        assert_eq!(dict.get_reference("Ref"), Some(ObjectId::new(1, 0)));
        assert_eq!(dict.get_name("Missing"), None);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut dict = Dictionary::new();
        dict.set("A", 1i64);
        dict.set("B", 2i64);
        dict.set("A", 3i64);

        let keys: Vec<&[u8]> = dict.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![&b"A"[..], &b"B"[..]]);
        assert_eq!(dict.get_integer("A"), Some(3));
    }

    #[test]
    fn test_remove() {
        let mut dict = Dictionary::new();
        dict.set("Encrypt", ObjectId::new(9, 0));
        assert!(dict.remove("Encrypt").is_some());
        assert!(dict.is_empty());
        assert!(dict.remove("Encrypt").is_none());
    }

    #[test]
    fn test_write_nested() {
        let mut inner = Dictionary::new();
        inner.set("Key", 123i64);
        let mut dict = Dictionary::new();
        dict.set("Nested", inner);

        let mut out = Vec::new();
        dict.write_to(&mut out);
        assert_eq!(String::from_utf8(out).unwrap(), "<</Nested <</Key 123\n>>\n>>");
    }
}
