//! Combines several segments into one (`spec.md` §4.6/§4.7): unions field
//! schemas, renumbers fields and local doc ids, drops deleted documents,
//! and re-emits every per-segment file family for the merged name. Used
//! both by background merges and by `optimize()`'s repeated full merges.

use std::collections::HashMap;
use std::sync::Arc;

use crate::compound::CompoundFileWriter;
use crate::directory::Directory;
use crate::error::LuceneResult;
use crate::segment::field_infos::FieldInfos;
use crate::segment::info::{CompoundStatus, SegmentInfo};
use crate::segment::norms::SegmentNorms;
use crate::segment::postings::PostingsWriter;
use crate::segment::reader::SegmentReader;
use crate::segment::stored_fields::{StoredFieldsWriter, StoredDocument};
use crate::segment::term_dict::{Term, TermDictWriter};
use crate::segment::term_merger::{SegmentMergeQueue, SegmentTermCursor};

const SEGMENT_EXTENSIONS: &[&str] = &["fnm", "tis", "tii", "frq", "prx", "nrm", "fdx", "fdt"];

/// Merges `segments` (in the order they should be concatenated — earlier
/// segments keep lower merged doc ids) into a freshly named segment,
/// dropping every document either segment had marked deleted. Returns the
/// new segment's `SegmentInfo` (never itself marked compound; the caller
/// packs it afterward if `use_compound_file` is set).
pub fn merge_segments(
    dir: &Arc<dyn Directory>,
    segments: &[&SegmentReader],
    target_name: &str,
) -> LuceneResult<SegmentInfo> {
    let mut merged_fields = FieldInfos::new();
    for seg in segments {
        for f in seg.field_infos.iter() {
            merged_fields.add(&f.name, f.indexed);
        }
    }

    let remap: Vec<HashMap<i32, i32>> = segments
        .iter()
        .map(|seg| {
            seg.field_infos
                .iter()
                .map(|f| (f.number, merged_fields.by_name(&f.name).unwrap().number))
                .collect()
        })
        .collect();

    let mut live_doc_maps: Vec<HashMap<i32, i32>> = Vec::with_capacity(segments.len());
    let mut running = 0i32;
    for seg in segments {
        let mut map = HashMap::new();
        for local in 0..seg.doc_count() {
            if !seg.is_deleted(local) {
                map.insert(local, running);
                running += 1;
            }
        }
        live_doc_maps.push(map);
    }
    let merged_doc_count = running;

    merge_postings(dir, segments, &remap, &live_doc_maps, &merged_fields, target_name)?;
    merge_norms(dir, segments, &remap, &live_doc_maps, &merged_fields, merged_doc_count, target_name)?;
    merge_stored_fields(dir, segments, &remap, target_name)?;
    merged_fields.write(dir.as_ref(), target_name)?;

    Ok(SegmentInfo::new(target_name, merged_doc_count))
}

fn merge_postings(
    dir: &Arc<dyn Directory>,
    segments: &[&SegmentReader],
    remap: &[HashMap<i32, i32>],
    live_doc_maps: &[HashMap<i32, i32>],
    merged_fields: &FieldInfos,
    target_name: &str,
) -> LuceneResult<()> {
    let per_seg_terms: Vec<Vec<(Term, crate::segment::term_dict::TermInfo)>> = segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let mut v: Vec<_> = seg
                .terms()
                .map(|(t, info)| (Term::new(remap[i][&t.field], t.text.clone()), *info))
                .collect();
            v.sort_by(|a, b| a.0.cmp(&b.0));
            v
        })
        .collect();

    let cursors: Vec<SegmentTermCursor> = per_seg_terms
        .iter()
        .enumerate()
        .map(|(i, v)| SegmentTermCursor::new(i, Box::new(v.iter().map(|(t, info)| (t, info)))))
        .collect();
    let mut queue = SegmentMergeQueue::new(cursors);

    let mut frq_out = dir.create(&format!("{target_name}.frq"))?;
    let mut prx_out = dir.create(&format!("{target_name}.prx"))?;
    let mut entries = Vec::new();
    {
        let mut writer = PostingsWriter::new(frq_out.as_mut(), prx_out.as_mut());
        while let Some(merged) = queue.next() {
            let mut by_seg: Vec<_> = merged.postings;
            by_seg.sort_by_key(|(ord, _)| *ord);

            let mut postings = Vec::new();
            for (seg_ord, info) in &by_seg {
                let seg = segments[*seg_ord];
                let raw = seg.term_positions_for_info(info)?;
                for entry in raw {
                    if let Some(&merged_doc) = live_doc_maps[*seg_ord].get(&entry.doc_id) {
                        postings.push(crate::segment::postings::PostingEntry {
                            doc_id: merged_doc,
                            positions: entry.positions,
                        });
                    }
                }
            }
            if postings.is_empty() {
                continue;
            }
            let (freq_pointer, prox_pointer) = writer.write_term(&postings)?;
            entries.push((
                merged.term,
                crate::segment::term_dict::TermInfo {
                    doc_freq: postings.len() as i32,
                    freq_pointer,
                    prox_pointer,
                    skip_offset: 0,
                },
            ));
        }
    }
    frq_out.close()?;
    prx_out.close()?;

    let _ = merged_fields;
    TermDictWriter::write(
        dir.as_ref(),
        target_name,
        &entries,
        crate::segment::term_dict::DEFAULT_INDEX_INTERVAL,
        crate::segment::term_dict::DEFAULT_SKIP_INTERVAL,
    )
}

fn merge_norms(
    dir: &Arc<dyn Directory>,
    segments: &[&SegmentReader],
    _remap: &[HashMap<i32, i32>],
    live_doc_maps: &[HashMap<i32, i32>],
    merged_fields: &FieldInfos,
    merged_doc_count: i32,
    target_name: &str,
) -> LuceneResult<()> {
    let mut merged_norms = SegmentNorms::new();
    let indexed: Vec<_> = merged_fields.iter().filter(|f| f.indexed).collect();
    for field in &indexed {
        let mut bytes = vec![0u8; merged_doc_count.max(0) as usize];
        for (i, seg) in segments.iter().enumerate() {
            let Some(seg_field) = seg.field_infos.by_name(&field.name) else { continue };
            for (&local, &merged_doc) in &live_doc_maps[i] {
                bytes[merged_doc as usize] = seg.norm(seg_field.number, local);
            }
        }
        merged_norms.set_field(field.number, bytes);
    }
    let numbers: Vec<i32> = indexed.iter().map(|f| f.number).collect();
    if numbers.is_empty() {
        return Ok(());
    }
    merged_norms.write(dir.as_ref(), target_name, &numbers)
}

fn merge_stored_fields(
    dir: &Arc<dyn Directory>,
    segments: &[&SegmentReader],
    remap: &[HashMap<i32, i32>],
    target_name: &str,
) -> LuceneResult<()> {
    let mut fdt_out = dir.create(&format!("{target_name}.fdt"))?;
    {
        let mut writer = StoredFieldsWriter::new(fdt_out.as_mut());
        for (i, seg) in segments.iter().enumerate() {
            for local in 0..seg.doc_count() {
                if seg.is_deleted(local) {
                    continue;
                }
                let doc = seg.document(local)?;
                let remapped = StoredDocument {
                    fields: doc.fields.into_iter().map(|(num, val)| (remap[i][&num], val)).collect(),
                };
                writer.add_document(&remapped)?;
            }
        }
        writer.finish(dir.as_ref(), target_name)?;
    }
    fdt_out.close()
}

/// Packs a freshly written segment's loose files into a `.cfs`, deleting
/// the loose files afterward (`spec.md` §4.3, §4.7's `useCompoundFile`).
pub fn pack_compound(dir: &dyn Directory, segment: &str) -> LuceneResult<()> {
    let mut files = Vec::new();
    for ext in SEGMENT_EXTENSIONS {
        let name = format!("{segment}.{ext}");
        if !dir.exists(&name) {
            continue;
        }
        let mut input = dir.open(&name, false)?;
        let len = input.size() as usize;
        let bytes = input.read_bytes(len)?;
        files.push((name, bytes));
    }
    CompoundFileWriter::write(dir, &format!("{segment}.cfs"), &files)?;
    for (name, _) in &files {
        dir.delete(name)?;
    }
    Ok(())
}

/// Deletes every loose and compound file belonging to `segment`, used once
/// a merge's inputs have been superseded (`spec.md` §4.7 commit protocol).
pub fn delete_segment_files(dir: &dyn Directory, info: &SegmentInfo) -> LuceneResult<()> {
    if info.is_compound != CompoundStatus::NotCompound {
        let _ = dir.delete(&format!("{}.cfs", info.name));
    }
    for ext in SEGMENT_EXTENSIONS {
        let _ = dir.delete(&format!("{}.{ext}", info.name));
    }
    if let Some(del_name) = info.del_file_name() {
        let _ = dir.delete(&del_name);
    }
    Ok(())
}
