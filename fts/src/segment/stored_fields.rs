//! Stored-field directory (`.fdx`) and data (`.fdt`) streams (`spec.md`
//! §4.5, §6): `.fdx` is one 8-byte pointer per document into `.fdt`; `.fdt`
//! holds, per document, a VInt field count followed by each stored field's
//! number, a type tag (text vs. binary) and its length-prefixed bytes.
//!
//! This crate always writes a segment's own dedicated doc store (no
//! `docStoreOffset` redirection to a shared store across segments — that is
//! an optional Lucene optimization the `segments_N` format still has a slot
//! for, via the sentinel `0xFFFFFFFF`, but this writer never produces a
//! non-sentinel value).

use bytes::Bytes;

use crate::directory::Directory;
use crate::error::{LuceneError, LuceneResult};
use crate::store::{IndexInput, IndexOutput, SeekFrom};

const TAG_TEXT: u8 = 0;
const TAG_BINARY: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Text(String),
    Binary(Bytes),
}

/// One document's stored fields, by field number.
#[derive(Debug, Clone, Default)]
pub struct StoredDocument {
    pub fields: Vec<(i32, StoredValue)>,
}

/// Writes `.fdt`/`.fdx` in document order; documents must be added in
/// ascending local-doc-id order (the writer doesn't reorder).
pub struct StoredFieldsWriter<'a> {
    fdt_out: &'a mut dyn IndexOutput,
    pointers: Vec<i64>,
}

impl<'a> StoredFieldsWriter<'a> {
    pub fn new(fdt_out: &'a mut dyn IndexOutput) -> Self {
        StoredFieldsWriter { fdt_out, pointers: Vec::new() }
    }

    pub fn add_document(&mut self, doc: &StoredDocument) -> LuceneResult<()> {
        self.pointers.push(self.fdt_out.tell() as i64);
        self.fdt_out.write_vint(doc.fields.len() as i32)?;
        for (field_num, value) in &doc.fields {
            self.fdt_out.write_vint(*field_num)?;
            match value {
                StoredValue::Text(s) => {
                    self.fdt_out.write_byte(TAG_TEXT)?;
                    self.fdt_out.write_string(s)?;
                }
                StoredValue::Binary(b) => {
                    self.fdt_out.write_byte(TAG_BINARY)?;
                    self.fdt_out.write_binary(b)?;
                }
            }
        }
        Ok(())
    }

    pub fn finish(self, dir: &dyn Directory, segment: &str) -> LuceneResult<()> {
        let mut fdx_out = dir.create(&format!("{segment}.fdx"))?;
        for pointer in &self.pointers {
            fdx_out.write_long(*pointer)?;
        }
        fdx_out.close()
    }
}

/// Reads one document's stored fields by local doc id.
pub struct StoredFieldsReader {
    fdx: Box<dyn IndexInput>,
    fdt: Box<dyn IndexInput>,
}

impl StoredFieldsReader {
    pub fn open(dir: &dyn Directory, segment: &str) -> LuceneResult<Self> {
        let fdx = dir.open(&format!("{segment}.fdx"), true)?;
        let fdt = dir.open(&format!("{segment}.fdt"), true)?;
        Ok(StoredFieldsReader { fdx, fdt })
    }

    /// Builds a reader directly from already-opened `.fdx`/`.fdt` streams,
    /// used when the segment is packed into a compound file and the caller
    /// has to go through the compound reader rather than the directory.
    pub fn from_streams(fdx: Box<dyn IndexInput>, fdt: Box<dyn IndexInput>) -> Self {
        StoredFieldsReader { fdx, fdt }
    }

    pub fn doc(&mut self, local_doc: i32) -> LuceneResult<StoredDocument> {
        self.fdx.seek(SeekFrom::Start((local_doc as u64) * 8))?;
        let pointer = self.fdx.read_long()?;
        self.fdt.seek(SeekFrom::Start(pointer as u64))?;

        let field_count = self.fdt.read_vint()?;
        if field_count < 0 {
            return Err(LuceneError::invalid_format("negative stored field count"));
        }
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let field_num = self.fdt.read_vint()?;
            let tag = self.fdt.read_byte()?;
            let value = match tag {
                TAG_TEXT => StoredValue::Text(self.fdt.read_string()?),
                TAG_BINARY => StoredValue::Binary(Bytes::from(self.fdt.read_binary()?)),
                other => {
                    return Err(LuceneError::invalid_format(format!(
                        "unknown stored field type tag {other}"
                    )))
                }
            };
            fields.push((field_num, value));
        }
        Ok(StoredDocument { fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::RamDirectory;

    #[test]
    fn round_trips_text_and_binary_fields() {
        let dir = RamDirectory::new();
        {
            let mut fdt_out = dir.create("_0.fdt").unwrap();
            let mut w = StoredFieldsWriter::new(fdt_out.as_mut());
            w.add_document(&StoredDocument {
                fields: vec![(0, StoredValue::Text("hello world".into()))],
            })
            .unwrap();
            w.add_document(&StoredDocument {
                fields: vec![
                    (0, StoredValue::Text("second doc".into())),
                    (2, StoredValue::Binary(Bytes::from_static(b"\x00\x01\x02"))),
                ],
            })
            .unwrap();
            w.finish(&dir, "_0").unwrap();
            fdt_out.close().unwrap();
        }

        let mut reader = StoredFieldsReader::open(&dir, "_0").unwrap();
        let doc0 = reader.doc(0).unwrap();
        assert_eq!(doc0.fields[0].1, StoredValue::Text("hello world".into()));

        let doc1 = reader.doc(1).unwrap();
        assert_eq!(doc1.fields.len(), 2);
        assert_eq!(doc1.fields[1].1, StoredValue::Binary(Bytes::from_static(b"\x00\x01\x02")));
    }
}
