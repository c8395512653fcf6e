//! Builds one fresh segment's on-disk files from a batch of buffered
//! `Document`s (`spec.md` §4.7's flush step): analyzes every indexed
//! field, accumulates posting lists and field-length norms in memory, then
//! writes `.fnm`/`.tis`/`.tii`/`.frq`/`.prx`/`.nrm`/`.fdx`/`.fdt` in one
//! pass.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::analysis::{Analyzer, KeywordAnalyzer};
use crate::directory::Directory;
use crate::document::{Document, FieldValue};
use crate::error::LuceneResult;
use crate::segment::field_infos::FieldInfos;
use crate::segment::info::SegmentInfo;
use crate::segment::norms::SegmentNorms;
use crate::segment::postings::{PostingEntry, PostingsWriter};
use crate::segment::stored_fields::{StoredDocument, StoredFieldsWriter, StoredValue};
use crate::segment::term_dict::{Term, TermDictWriter, TermInfo, DEFAULT_INDEX_INTERVAL, DEFAULT_SKIP_INTERVAL};
use crate::similarity::encode_field_norm;

/// Analyzes and flushes `docs` as a new segment named `name`, returning its
/// `SegmentInfo` (never compound; the caller packs it afterward if
/// configured to).
pub fn build_segment(
    dir: &Arc<dyn Directory>,
    analyzer: &dyn Analyzer,
    docs: &[Document],
    name: &str,
) -> LuceneResult<SegmentInfo> {
    let mut field_infos = FieldInfos::new();
    for doc in docs {
        for f in &doc.fields {
            field_infos.add(&f.name, f.index);
        }
    }

    let mut postings_map: BTreeMap<(i32, String), Vec<PostingEntry>> = BTreeMap::new();
    let mut field_lengths: Vec<HashMap<i32, usize>> = vec![HashMap::new(); docs.len()];
    let mut stored_docs: Vec<StoredDocument> = Vec::with_capacity(docs.len());

    for (doc_id, doc) in docs.iter().enumerate() {
        let mut stored = StoredDocument::default();
        let mut field_positions: HashMap<i32, i32> = HashMap::new();
        for f in &doc.fields {
            let field_number = field_infos.by_name(&f.name).unwrap().number;

            if f.store {
                match &f.value {
                    FieldValue::Text(s) | FieldValue::Keyword(s) => {
                        stored.fields.push((field_number, StoredValue::Text(s.clone())));
                    }
                    FieldValue::Stored(b) | FieldValue::Binary(b) => {
                        stored.fields.push((field_number, StoredValue::Binary(b.clone())));
                    }
                }
            }

            if f.index {
                let tokens = match &f.value {
                    FieldValue::Text(s) => analyzer.analyze(&f.name, s),
                    FieldValue::Keyword(s) => KeywordAnalyzer.analyze(&f.name, s),
                    FieldValue::Stored(_) | FieldValue::Binary(_) => Vec::new(),
                };
                let position = field_positions.entry(field_number).or_insert(0);
                for tok in &tokens {
                    let key = (field_number, tok.text.clone());
                    let postings = postings_map.entry(key).or_default();
                    match postings.last_mut() {
                        Some(last) if last.doc_id == doc_id as i32 => last.positions.push(*position),
                        _ => postings.push(PostingEntry { doc_id: doc_id as i32, positions: vec![*position] }),
                    }
                    *position += tok.position_increment as i32;
                }
                *field_lengths[doc_id].entry(field_number).or_insert(0) += tokens.len();
            }
        }
        stored_docs.push(stored);
    }

    let mut frq_out = dir.create(&format!("{name}.frq"))?;
    let mut prx_out = dir.create(&format!("{name}.prx"))?;
    let mut entries = Vec::with_capacity(postings_map.len());
    {
        let mut writer = PostingsWriter::new(frq_out.as_mut(), prx_out.as_mut());
        for ((field, text), postings) in &postings_map {
            let (freq_pointer, prox_pointer) = writer.write_term(postings)?;
            entries.push((
                Term::new(*field, text.clone()),
                TermInfo { doc_freq: postings.len() as i32, freq_pointer, prox_pointer, skip_offset: 0 },
            ));
        }
    }
    frq_out.close()?;
    prx_out.close()?;

    TermDictWriter::write(dir.as_ref(), name, &entries, DEFAULT_INDEX_INTERVAL, DEFAULT_SKIP_INTERVAL)?;

    let mut norms = SegmentNorms::new();
    let indexed_numbers: Vec<i32> = field_infos.iter().filter(|f| f.indexed).map(|f| f.number).collect();
    for &field_number in &indexed_numbers {
        let bytes: Vec<u8> = (0..docs.len())
            .map(|doc_id| {
                let len = field_lengths[doc_id].get(&field_number).copied().unwrap_or(0);
                encode_field_norm(len, 1.0)
            })
            .collect();
        norms.set_field(field_number, bytes);
    }
    if !indexed_numbers.is_empty() {
        norms.write(dir.as_ref(), name, &indexed_numbers)?;
    }

    let mut fdt_out = dir.create(&format!("{name}.fdt"))?;
    {
        let mut writer = StoredFieldsWriter::new(fdt_out.as_mut());
        for doc in &stored_docs {
            writer.add_document(doc)?;
        }
        writer.finish(dir.as_ref(), name)?;
    }
    fdt_out.close()?;

    field_infos.write(dir.as_ref(), name)?;

    Ok(SegmentInfo::new(name, docs.len() as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::WhitespaceAnalyzer;
    use crate::directory::RamDirectory;
    use crate::document::Field;
    use crate::segment::reader::SegmentReader;

    #[test]
    fn builds_a_readable_segment() {
        let dir: Arc<dyn Directory> = Arc::new(RamDirectory::new());
        let docs = vec![
            Document::new().add(Field::text("body", "foo bar", true)),
            Document::new().add(Field::text("body", "foo baz", true)),
        ];
        let info = build_segment(&dir, &WhitespaceAnalyzer, &docs, "_0").unwrap();
        assert_eq!(info.doc_count, 2);

        let reader = SegmentReader::open(dir.clone(), info).unwrap();
        let field = reader.field_infos.by_name("body").unwrap().number;
        assert_eq!(reader.doc_freq(&Term::new(field, "foo")), 2);
        assert_eq!(reader.doc_freq(&Term::new(field, "bar")), 1);

        let doc0 = reader.document(0).unwrap();
        assert_eq!(doc0.fields[0].1, StoredValue::Text("foo bar".into()));
    }
}
