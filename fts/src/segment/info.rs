//! `segments_N` file: the insertion-ordered, generation-tagged list of live
//! segments (`spec.md` §3, §6). Iteration order defines global document-id
//! assignment (`global_id = sum of preceding segments' docCount + local
//! id`).

use crate::directory::Directory;
use crate::error::{LuceneError, LuceneResult};
use crate::store::{IndexInput, IndexOutput};

/// Format markers written into the first 4 bytes of a `segments_N` file.
pub const FORMAT_PRE_2_1: i32 = -1; // 0xFFFFFFFF
pub const FORMAT_2_1: i32 = -3; // 0xFFFFFFFD
pub const FORMAT_2_3: i32 = -4; // 0xFFFFFFFC

const NO_DOC_STORE_OFFSET: i32 = -1; // 0xFFFFFFFF

/// `0xFF` = not compound, `0x01` = compound, `0x00` = unknown (probe both).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundStatus {
    NotCompound,
    Compound,
    Unknown,
}

impl CompoundStatus {
    fn to_byte(self) -> u8 {
        match self {
            CompoundStatus::NotCompound => 0xFF,
            CompoundStatus::Compound => 0x01,
            CompoundStatus::Unknown => 0x00,
        }
    }
    fn from_byte(b: u8) -> Self {
        match b {
            0xFF => CompoundStatus::NotCompound,
            0x01 => CompoundStatus::Compound,
            _ => CompoundStatus::Unknown,
        }
    }
}

/// One live segment's entry in a `segments_N` file.
#[derive(Debug, Clone)]
pub struct SegmentInfo {
    pub name: String,
    pub doc_count: i32,
    /// `-1` means no `.del<gen>` file exists for this segment.
    pub del_gen: i64,
    /// `spec.md` §4.5's doc-store sharing slot; this writer never shares a
    /// doc store across segments, so this is always `None`.
    pub doc_store_segment: Option<String>,
    pub doc_store_is_compound: bool,
    pub has_single_norm_file: bool,
    pub is_compound: CompoundStatus,
}

impl SegmentInfo {
    pub fn new(name: impl Into<String>, doc_count: i32) -> Self {
        SegmentInfo {
            name: name.into(),
            doc_count,
            del_gen: -1,
            doc_store_segment: None,
            doc_store_is_compound: false,
            has_single_norm_file: true,
            is_compound: CompoundStatus::NotCompound,
        }
    }

    pub fn has_deletions(&self) -> bool {
        self.del_gen >= 0
    }

    pub fn del_file_name(&self) -> Option<String> {
        if self.del_gen < 0 {
            None
        } else if self.del_gen == 0 {
            Some(format!("{}.del", self.name))
        } else {
            Some(format!("{}_{}.del", self.name, to_base36(self.del_gen)))
        }
    }
}

/// The full `segments_N` payload: format marker, version counter, the
/// monotone segment-name counter, and the ordered live-segment list.
#[derive(Debug, Clone)]
pub struct SegmentInfos {
    pub generation: i64,
    pub format: i32,
    pub version: i64,
    pub name_counter: i32,
    pub segments: Vec<SegmentInfo>,
}

impl SegmentInfos {
    pub fn empty() -> Self {
        SegmentInfos {
            generation: -1,
            format: FORMAT_2_3,
            version: 0,
            name_counter: 0,
            segments: Vec::new(),
        }
    }

    pub fn total_doc_count(&self) -> i32 {
        self.segments.iter().map(|s| s.doc_count).sum()
    }

    pub fn next_segment_name(&mut self) -> String {
        let name = format!("_{}", to_base36(self.name_counter as i64));
        self.name_counter += 1;
        name
    }

    pub fn file_name(generation: i64) -> String {
        if generation <= 0 {
            "segments".to_string()
        } else {
            format!("segments_{}", to_base36(generation))
        }
    }

    pub fn write(&self, dir: &dyn Directory) -> LuceneResult<()> {
        let file_name = Self::file_name(self.generation);
        let mut out = dir.create(&file_name)?;
        out.write_int(self.format)?;
        out.write_long(self.version)?;
        out.write_int(self.name_counter)?;
        out.write_int(self.segments.len() as i32)?;
        for seg in &self.segments {
            out.write_string(&seg.name)?;
            out.write_int(seg.doc_count)?;
            if self.format != FORMAT_PRE_2_1 {
                out.write_long(seg.del_gen)?;
            }
            if self.format == FORMAT_2_3 {
                // This writer never shares a doc store across segments, so
                // the offset is always the "none" sentinel and the
                // following shared-doc-store fields are never emitted.
                out.write_int(NO_DOC_STORE_OFFSET)?;
                out.write_byte(seg.has_single_norm_file as u8)?;
            }
            out.write_int(-1)?; // numField: always 0xFFFFFFFF, per-field norm files unsupported
            out.write_byte(seg.is_compound.to_byte())?;
        }
        out.close()
    }

    pub fn read(dir: &dyn Directory, generation: i64) -> LuceneResult<Self> {
        let file_name = Self::file_name(generation);
        let mut input = dir.open(&file_name, true)?;
        let format = input.read_int()?;
        if format != FORMAT_PRE_2_1 && format != FORMAT_2_1 && format != FORMAT_2_3 {
            return Err(LuceneError::invalid_format(format!(
                "unrecognized segments file format marker {format:#x}"
            )));
        }
        let version = if format == FORMAT_PRE_2_1 { 0 } else { input.read_long()? };
        let name_counter = if format == FORMAT_PRE_2_1 { 0 } else { input.read_int()? };
        let seg_count = input.read_int()?;
        if seg_count < 0 {
            return Err(LuceneError::invalid_format("negative segment count"));
        }
        let mut segments = Vec::with_capacity(seg_count as usize);
        for _ in 0..seg_count {
            let name = input.read_string()?;
            let doc_count = input.read_int()?;
            let mut info = SegmentInfo::new(name, doc_count);
            if format != FORMAT_PRE_2_1 {
                info.del_gen = input.read_long()?;
            }
            if format == FORMAT_2_3 {
                let doc_store_offset = input.read_int()?;
                if doc_store_offset != NO_DOC_STORE_OFFSET {
                    info.doc_store_segment = Some(input.read_string()?);
                    info.doc_store_is_compound = input.read_byte()? != 0;
                }
                info.has_single_norm_file = input.read_byte()? != 0;
            }
            let num_field = input.read_int()?;
            if num_field != -1 {
                return Err(LuceneError::runtime(format!(
                    "Separate norm files are not supported. Optimize index to use it with numField={num_field}"
                )));
            }
            info.is_compound = CompoundStatus::from_byte(input.read_byte()?);
            segments.push(info);
        }
        Ok(SegmentInfos { generation, format, version, name_counter, segments })
    }
}

/// Base-36 encoding used for segment name suffixes and `segments_N`
/// generation suffixes.
pub fn to_base36(mut n: i64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    let negative = n < 0;
    if negative {
        n = -n;
    }
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}

pub fn from_base36(s: &str) -> LuceneResult<i64> {
    i64::from_str_radix(s, 36)
        .map_err(|_| LuceneError::invalid_format(format!("invalid base-36 generation suffix {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::RamDirectory;

    #[test]
    fn base36_round_trips() {
        for n in [0i64, 1, 35, 36, 37, 1000, 999999] {
            let s = to_base36(n);
            assert_eq!(from_base36(&s).unwrap(), n);
        }
    }

    #[test]
    fn round_trips_segments_file() {
        let dir = RamDirectory::new();
        let mut infos = SegmentInfos::empty();
        infos.generation = 1;
        let name = infos.next_segment_name();
        let mut seg = SegmentInfo::new(name, 5);
        seg.del_gen = 0;
        infos.segments.push(seg);
        infos.version = 42;
        infos.write(&dir).unwrap();

        let back = SegmentInfos::read(&dir, 1).unwrap();
        assert_eq!(back.version, 42);
        assert_eq!(back.segments.len(), 1);
        assert_eq!(back.segments[0].doc_count, 5);
        assert!(back.segments[0].has_deletions());
    }

    #[test]
    fn rejects_separate_norm_files() {
        // Hand-craft a segments file with numField != -1 to exercise the
        // hard failure `spec.md` §4.5 requires.
        let dir = RamDirectory::new();
        {
            let mut out = dir.create("segments_1").unwrap();
            out.write_int(FORMAT_2_3).unwrap();
            out.write_long(1).unwrap();
            out.write_int(1).unwrap();
            out.write_int(1).unwrap();
            out.write_string("_0").unwrap();
            out.write_int(3).unwrap();
            out.write_long(-1).unwrap();
            out.write_int(NO_DOC_STORE_OFFSET).unwrap();
            out.write_byte(1).unwrap();
            out.write_int(2).unwrap(); // numField != -1
            out.write_byte(0xFF).unwrap();
            out.close().unwrap();
        }
        let err = SegmentInfos::read(&dir, 1).unwrap_err();
        assert!(matches!(err, LuceneError::Runtime(_)));
    }
}
