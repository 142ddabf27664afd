use serde_json::{Map, Value};

/// A schemaless document as stored by the engine.
pub type Document = Map<String, Value>;

/// Synthetic address field carried by every document docset writes.
pub const KEY_FIELD: &str = "_key";

/// Engine-assigned identity field. Never part of a caller-visible result.
pub const ID_FIELD: &str = "_id";

/// Member field of a sorted-set entry.
pub const VALUE_FIELD: &str = "value";

/// Score field of a sorted-set entry.
pub const RANK_FIELD: &str = "rank";

/// The `_key` of a document, if it carries a string key.
pub fn document_key(doc: &Document) -> Option<&str> {
    doc.get(KEY_FIELD).and_then(Value::as_str)
}

/// Set `_key` on a document unless it already has a non-empty one.
pub fn stamp_key(doc: &mut Document, key: &str) {
    let has_key = match doc.get(KEY_FIELD) {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    };
    if !has_key {
        doc.insert(KEY_FIELD.to_string(), Value::String(key.to_string()));
    }
}

/// Reshape a document to exactly `fields`.
///
/// Fields missing from the source are present in the output as `null`. An
/// empty field list returns the document unchanged.
pub fn shape_fields<S: AsRef<str>>(doc: Document, fields: &[S]) -> Document {
    if fields.is_empty() || doc.is_empty() {
        return doc;
    }
    fields
        .iter()
        .map(|f| {
            let f = f.as_ref();
            (f.to_string(), doc.get(f).cloned().unwrap_or(Value::Null))
        })
        .collect()
}
