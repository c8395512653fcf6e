//! Virtual filesystem layered onto a single `.cfs` file (`spec.md` §4.3):
//! `VInt numFiles`, then `numFiles` header records `{ long dataOffset,
//! String subName }` in write order, then concatenated sub-file bodies.
//! This is the pre-5.0 Lucene layout (no separate entries file, no
//! checksum footer); `bigxu-rucene`'s `Lucene50CompoundReader` is used only
//! as a structural reference for "a `Directory`-shaped reader over one
//! bounded sub-range per logical file", not copied byte for byte.

use std::collections::HashMap;

use crate::directory::Directory;
use crate::error::{LuceneError, LuceneResult};
use crate::store::{IndexInput, IndexOutput};

struct Entry {
    offset: u64,
    length: u64,
}

/// Reader over one segment's `.cfs` file; maps each logical sub-file name
/// to a bounded, independently-cursored slice.
pub struct CompoundFileReader {
    entries: HashMap<String, Entry>,
    file_len: u64,
    input: Box<dyn IndexInput>,
}

impl CompoundFileReader {
    pub fn open(dir: &dyn Directory, cfs_name: &str) -> LuceneResult<Self> {
        let mut input = dir.open(cfs_name, true)?;
        let file_len = input.size();
        let num_files = input.read_vint()? as usize;
        let mut names = Vec::with_capacity(num_files);
        let mut offsets = Vec::with_capacity(num_files);
        for _ in 0..num_files {
            let offset = input.read_long()? as u64;
            let name = input.read_string()?;
            offsets.push(offset);
            names.push(name);
        }
        let mut entries = HashMap::with_capacity(num_files);
        for i in 0..num_files {
            let offset = offsets[i];
            let next = if i + 1 < num_files { offsets[i + 1] } else { file_len };
            if next < offset {
                return Err(LuceneError::invalid_format(
                    "compound file sub-entry offsets are not monotonically increasing",
                ));
            }
            entries.insert(names[i].clone(), Entry { offset, length: next - offset });
        }
        Ok(CompoundFileReader { entries, file_len, input })
    }

    pub fn file_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, sub_name: &str) -> bool {
        self.entries.contains_key(sub_name)
    }

    pub fn open_sub_file(&self, sub_name: &str) -> LuceneResult<Box<dyn IndexInput>> {
        let entry = self
            .entries
            .get(sub_name)
            .ok_or_else(|| LuceneError::runtime(format!("no sub-file named {sub_name} in compound")))?;
        self.input.slice(entry.offset, entry.length)
    }

    pub fn sub_file_length(&self, sub_name: &str) -> LuceneResult<u64> {
        self.entries
            .get(sub_name)
            .map(|e| e.length)
            .ok_or_else(|| LuceneError::runtime(format!("no sub-file named {sub_name} in compound")))
    }

    pub fn len(&self) -> u64 {
        self.file_len
    }
}

/// Writer receiving a list of `(subName, bytes)` pairs, writing the header
/// then the concatenated bodies and recording exact offsets. Sub-file
/// bodies are handed over already materialized in memory (the segment
/// writer builds each `.frq`/`.prx`/`.tis`/... buffer before packing), which
/// matches how this crate's `writer` module stages a flush.
pub struct CompoundFileWriter;

impl CompoundFileWriter {
    /// `files` must already be sorted the way the caller wants them to
    /// appear in the header (alphabetical-of-write order per `spec.md`
    /// §4.3); this function does not re-sort them.
    pub fn write(
        dir: &dyn Directory,
        cfs_name: &str,
        files: &[(String, Vec<u8>)],
    ) -> LuceneResult<()> {
        let mut out = dir.create(cfs_name)?;
        out.write_vint(files.len() as i32)?;
        // The header itself has variable length depending on name lengths,
        // so first compute each body's start offset by summing the header
        // record sizes, then rewrite with those offsets substituted.
        let mut header_len = 0u64;
        for (name, _) in files {
            header_len += 8; // long dataOffset
            header_len += vint_len(name.len() as i32) as u64 + name.len() as u64;
        }
        let mut running = header_len;
        let mut offsets = Vec::with_capacity(files.len());
        for (_, body) in files {
            offsets.push(running);
            running += body.len() as u64;
        }
        for (i, (name, _)) in files.iter().enumerate() {
            out.write_long(offsets[i] as i64)?;
            out.write_string(name)?;
        }
        for (_, body) in files {
            out.write_bytes(body)?;
        }
        out.close()
    }
}

fn vint_len(mut v: i32) -> usize {
    let mut n = 1;
    loop {
        if (v & !0x7f) == 0 {
            return n;
        }
        v = ((v as u32) >> 7) as i32;
        n += 1;
    }
}

/// A `Directory` facade over one open compound file, used by the segment
/// reader so it can address `.fnm`/`.tis`/`.frq`/... uniformly whether the
/// segment is packed or loose (`spec.md` §4.5's compound-status byte).
pub struct CompoundDirectoryView<'a> {
    reader: &'a CompoundFileReader,
}

impl<'a> CompoundDirectoryView<'a> {
    pub fn new(reader: &'a CompoundFileReader) -> Self {
        CompoundDirectoryView { reader }
    }

    pub fn open(&self, sub_name: &str) -> LuceneResult<Box<dyn IndexInput>> {
        self.reader.open_sub_file(sub_name)
    }

    pub fn length(&self, sub_name: &str) -> LuceneResult<u64> {
        self.reader.sub_file_length(sub_name)
    }

    pub fn exists(&self, sub_name: &str) -> bool {
        self.reader.contains(sub_name)
    }
}
