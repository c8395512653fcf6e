//! Segment-level file formats and the segment reader (`spec.md` §4.4–§4.6,
//! §6): field schema, term dictionary, postings, norms, stored fields,
//! deletions, the `segments_N` file, and the priority-queue term merger.

pub mod deletions;
pub mod field_infos;
pub mod info;
pub mod norms;
pub mod postings;
pub mod reader;
pub mod stored_fields;
pub mod term_dict;
pub mod term_merger;

pub use deletions::DeletionBitVector;
pub use field_infos::{FieldInfo, FieldInfos};
pub use info::{CompoundStatus, SegmentInfo, SegmentInfos};
pub use norms::SegmentNorms;
pub use postings::{DocFreqEntry, PostingEntry, PostingsReader, PostingsWriter};
pub use reader::SegmentReader;
pub use stored_fields::{StoredDocument, StoredFieldsReader, StoredFieldsWriter, StoredValue};
pub use term_dict::{Term, TermDictReader, TermDictWriter, TermInfo};
pub use term_merger::{MergedTerm, SegmentMergeQueue, SegmentTermCursor};
