//! Opens a segment's term dictionary, posting lists, norms, stored fields,
//! and deletion bitvector; answers per-segment term lookups, postings,
//! positions, freq, and doc-store accessors (`spec.md` §4.5).

use std::sync::Arc;

use crate::compound::CompoundFileReader;
use crate::directory::Directory;
use crate::error::LuceneResult;
use crate::segment::deletions::DeletionBitVector;
use crate::segment::field_infos::FieldInfos;
use crate::segment::info::{CompoundStatus, SegmentInfo};
use crate::segment::norms::SegmentNorms;
use crate::segment::postings::{DocFreqEntry, PostingEntry, PostingsReader};
use crate::segment::stored_fields::{StoredDocument, StoredFieldsReader};
use crate::segment::term_dict::{Term, TermDictReader, TermInfo};
use crate::store::IndexInput;

/// A uniform way to fetch a segment sub-file whether the segment is packed
/// into a `.cfs` or left as loose per-extension files
/// (`spec.md` §4.5's compound-status byte).
enum Backing {
    Compound(CompoundFileReader),
    Loose,
}

impl Backing {
    fn open(&self, dir: &dyn Directory, sub_name: &str) -> LuceneResult<Box<dyn IndexInput>> {
        match self {
            Backing::Compound(cfr) => cfr.open_sub_file(sub_name),
            Backing::Loose => dir.open(sub_name, false),
        }
    }

    fn open_shared(&self, dir: &dyn Directory, sub_name: &str) -> LuceneResult<Box<dyn IndexInput>> {
        match self {
            Backing::Compound(cfr) => cfr.open_sub_file(sub_name),
            Backing::Loose => dir.open(sub_name, true),
        }
    }
}

pub struct SegmentReader {
    pub info: SegmentInfo,
    dir: Arc<dyn Directory>,
    backing: Backing,
    pub field_infos: FieldInfos,
    term_dict: TermDictReader,
    norms: SegmentNorms,
    deletions: Option<DeletionBitVector>,
}

impl SegmentReader {
    pub fn open(dir: Arc<dyn Directory>, info: SegmentInfo) -> LuceneResult<Self> {
        let cfs_name = format!("{}.cfs", info.name);
        let backing = match info.is_compound {
            CompoundStatus::NotCompound => Backing::Loose,
            CompoundStatus::Compound => Backing::Compound(CompoundFileReader::open(dir.as_ref(), &cfs_name)?),
            CompoundStatus::Unknown => {
                if dir.exists(&cfs_name) {
                    Backing::Compound(CompoundFileReader::open(dir.as_ref(), &cfs_name)?)
                } else {
                    Backing::Loose
                }
            }
        };

        let mut fnm_in = backing.open_shared(dir.as_ref(), &format!("{}.fnm", info.name))?;
        let field_infos = FieldInfos::read_from(fnm_in.as_mut())?;

        let mut tis_in = backing.open_shared(dir.as_ref(), &format!("{}.tis", info.name))?;
        let term_dict = TermDictReader::read_from(tis_in.as_mut())?;

        let indexed_numbers: Vec<i32> = field_infos.iter().filter(|f| f.indexed).map(|f| f.number).collect();
        let norms = if indexed_numbers.is_empty() {
            SegmentNorms::new()
        } else {
            let mut nrm_in = backing.open_shared(dir.as_ref(), &format!("{}.nrm", info.name))?;
            read_norms(nrm_in.as_mut(), &indexed_numbers, info.doc_count)?
        };

        let deletions = if let Some(del_name) = info.del_file_name() {
            Some(DeletionBitVector::read(dir.as_ref(), &del_name)?)
        } else {
            None
        };

        Ok(SegmentReader {
            info,
            dir,
            backing,
            field_infos,
            term_dict,
            norms,
            deletions,
        })
    }

    pub fn doc_count(&self) -> i32 {
        self.info.doc_count
    }

    pub fn num_docs(&self) -> i32 {
        self.info.doc_count - self.deletions.as_ref().map_or(0, |d| d.deleted_count() as i32)
    }

    pub fn has_deletions(&self) -> bool {
        self.deletions.as_ref().is_some_and(|d| d.has_deletions())
    }

    pub fn is_deleted(&self, local_doc: i32) -> bool {
        self.deletions.as_ref().is_some_and(|d| d.is_deleted(local_doc))
    }

    pub fn delete(&mut self, local_doc: i32) -> bool {
        if self.deletions.is_none() {
            self.deletions = Some(DeletionBitVector::new(self.info.doc_count as usize));
        }
        self.deletions.as_mut().unwrap().delete(local_doc)
    }

    pub fn deletions(&self) -> Option<&DeletionBitVector> {
        self.deletions.as_ref()
    }

    /// Persists the current in-memory deletion bitvector as a new
    /// `.del<gen+1>` file and bumps `info.del_gen`; called by the writer at
    /// commit time (`spec.md` §4.5).
    pub fn flush_deletions(&mut self) -> LuceneResult<()> {
        let Some(bits) = &self.deletions else { return Ok(()) };
        let next_gen = self.info.del_gen.max(-1) + 1;
        let name = if next_gen == 0 {
            format!("{}.del", self.info.name)
        } else {
            format!("{}_{}.del", self.info.name, crate::segment::info::to_base36(next_gen))
        };
        bits.write(self.dir.as_ref(), &name)?;
        self.info.del_gen = next_gen;
        Ok(())
    }

    pub fn has_term(&self, term: &Term) -> bool {
        self.term_dict.contains(term)
    }

    pub fn term_info(&self, term: &Term) -> Option<TermInfo> {
        self.term_dict.get_term_info(term)
    }

    pub fn doc_freq(&self, term: &Term) -> i32 {
        self.term_dict.get_term_info(term).map_or(0, |i| i.doc_freq)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Term, &TermInfo)> {
        self.term_dict.iter()
    }

    pub fn terms_with_prefix(&self, field: i32, prefix: &str) -> Vec<&Term> {
        self.term_dict.terms_with_prefix(field, prefix)
    }

    pub fn terms_range(&self, field: i32, from: Option<&str>, to: Option<&str>) -> Vec<&Term> {
        self.term_dict.range(field, from, to)
    }

    pub fn fuzzy_candidates(&self, field: i32, text: &str, max_edits: u32) -> LuceneResult<Vec<&Term>> {
        self.term_dict.fuzzy_candidates(field, text, max_edits)
    }

    /// Norm byte for `field` at `local_doc`, decoded via `similarity`.
    pub fn norm(&self, field: i32, local_doc: i32) -> u8 {
        self.norms.byte(field, local_doc).unwrap_or(0)
    }

    pub fn term_docs(&self, term: &Term) -> LuceneResult<Vec<DocFreqEntry>> {
        let Some(info) = self.term_info(term) else { return Ok(Vec::new()) };
        let mut freq_in = self.backing.open(self.dir.as_ref(), &format!("{}.frq", self.info.name))?;
        let mut entries = PostingsReader::read_doc_freqs(freq_in.as_mut(), info.freq_pointer, info.doc_freq)?;
        entries.retain(|e| !self.is_deleted(e.doc_id));
        Ok(entries)
    }

    pub fn term_positions(&self, term: &Term) -> LuceneResult<Vec<PostingEntry>> {
        let Some(info) = self.term_info(term) else { return Ok(Vec::new()) };
        let mut entries = self.term_positions_for_info(&info)?;
        entries.retain(|e| !self.is_deleted(e.doc_id));
        Ok(entries)
    }

    /// Reads postings directly from an already-resolved `TermInfo`,
    /// bypassing the term dictionary lookup; used by the segment merger,
    /// which already has the `TermInfo` from its own merge-queue walk and
    /// doesn't want to re-look-up the term by text. Does not filter
    /// deletions — the merger decides liveness itself via its doc-id map.
    pub fn term_positions_for_info(&self, info: &TermInfo) -> LuceneResult<Vec<PostingEntry>> {
        let mut freq_in = self.backing.open(self.dir.as_ref(), &format!("{}.frq", self.info.name))?;
        let mut prox_in = self.backing.open(self.dir.as_ref(), &format!("{}.prx", self.info.name))?;
        PostingsReader::read_doc_positions(
            freq_in.as_mut(),
            prox_in.as_mut(),
            info.freq_pointer,
            info.prox_pointer,
            info.doc_freq,
        )
    }

    pub fn document(&self, local_doc: i32) -> LuceneResult<StoredDocument> {
        let fdx = self.backing.open(self.dir.as_ref(), &format!("{}.fdx", self.info.name))?;
        let fdt = self.backing.open(self.dir.as_ref(), &format!("{}.fdt", self.info.name))?;
        let mut reader = StoredFieldsReader::from_streams(fdx, fdt);
        reader.doc(local_doc)
    }
}

fn read_norms(input: &mut dyn IndexInput, field_numbers: &[i32], doc_count: i32) -> LuceneResult<SegmentNorms> {
    use crate::error::LuceneError;
    let magic = input.read_bytes(3)?;
    if magic != *b"NRM" {
        return Err(LuceneError::invalid_format("bad .nrm magic"));
    }
    let _version = input.read_byte()?;
    let mut norms = SegmentNorms::new();
    for &field in field_numbers {
        let bytes = input.read_bytes(doc_count as usize)?;
        norms.set_field(field, bytes);
    }
    Ok(norms)
}
