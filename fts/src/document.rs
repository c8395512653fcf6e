//! The document/field data model the writer and stored-fields codec operate
//! over. `spec.md` treats field *kinds* (tokenizer choice, HTML extraction)
//! as an external collaborator, but the variant tags themselves — whether a
//! field is tokenized text, an untokenized keyword, or stored-only bytes —
//! are the minimum surface `addDocument` and the `.fdx`/`.fdt` codec need.

use bytes::Bytes;

/// One field's value, tagged by how the writer and query rewriter treat it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Tokenized, indexed text (split into terms by an `Analyzer`).
    Text(String),
    /// A single untokenized term, indexed as-is.
    Keyword(String),
    /// Stored only, never indexed; returned verbatim by `getDocument`.
    Stored(Bytes),
    /// Stored only, opaque bytes (e.g. a thumbnail); never indexed.
    Binary(Bytes),
}

/// A named field value plus the Lucene-style store/index axes
/// (`Field.Store`/`Field.Index`): a field can be indexed-only, stored-only,
/// or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
    pub store: bool,
    pub index: bool,
}

impl Field {
    pub fn text(name: impl Into<String>, value: impl Into<String>, store: bool) -> Self {
        Field {
            name: name.into(),
            value: FieldValue::Text(value.into()),
            store,
            index: true,
        }
    }

    pub fn keyword(name: impl Into<String>, value: impl Into<String>, store: bool) -> Self {
        Field {
            name: name.into(),
            value: FieldValue::Keyword(value.into()),
            store,
            index: true,
        }
    }

    pub fn stored(name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Field {
            name: name.into(),
            value: FieldValue::Stored(value.into()),
            store: true,
            index: false,
        }
    }

    pub fn binary(name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Field {
            name: name.into(),
            value: FieldValue::Binary(value.into()),
            store: true,
            index: false,
        }
    }

    /// Whether this field contributes a norm byte (tokenized/indexed text
    /// fields accrue a length-normalization factor; keyword and stored-only
    /// fields do not, matching Lucene's `Field.setOmitNorms` default for
    /// untokenized fields being left to the caller — here we norm exactly
    /// the fields a default `Analyzer` would tokenize).
    pub fn is_tokenized(&self) -> bool {
        matches!(self.value, FieldValue::Text(_))
    }

    pub fn text_value(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Text(s) | FieldValue::Keyword(s) => Some(s),
            _ => None,
        }
    }

    /// Rough in-memory footprint of this field's value, used only to decide
    /// when the writer's buffer has grown past `ram_buffer_size_mb` — not a
    /// precise accounting of the eventual on-disk encoding.
    pub fn estimated_size_bytes(&self) -> usize {
        let value_len = match &self.value {
            FieldValue::Text(s) | FieldValue::Keyword(s) => s.len(),
            FieldValue::Stored(b) | FieldValue::Binary(b) => b.len(),
        };
        self.name.len() + value_len
    }
}

/// An open bag of fields. At write time this accumulates in the writer's
/// buffer until flushed into a segment; at read time `getDocument` returns
/// one populated from the stored-fields stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub fields: Vec<Field>,
}

impl Document {
    pub fn new() -> Self {
        Document { fields: Vec::new() }
    }

    pub fn add(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Field> {
        self.fields.iter().filter(move |f| f.name == name)
    }

    pub fn estimated_size_bytes(&self) -> usize {
        self.fields.iter().map(Field::estimated_size_bytes).sum()
    }
}
