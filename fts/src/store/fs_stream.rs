use std::fs::File;
use std::io::{self, Read, Seek, Write};
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;

use super::{IndexInput, IndexOutput, SeekFrom};
use crate::error::{LuceneError, LuceneResult};

fn to_std_seek(pos: SeekFrom) -> io::SeekFrom {
    match pos {
        SeekFrom::Start(n) => io::SeekFrom::Start(n),
        SeekFrom::Current(n) => io::SeekFrom::Current(n),
        SeekFrom::End(n) => io::SeekFrom::End(n),
    }
}

/// A readable stream over an mmapped file, optionally restricted to a
/// sub-range (used when a compound file slices one `.cfs` into per-entry
/// sub-streams).
pub struct FsIndexInput {
    mmap: Arc<Mmap>,
    base: usize,
    len: usize,
    pos: usize,
}

impl FsIndexInput {
    pub fn open(file: &File) -> LuceneResult<Self> {
        let mmap = unsafe { Mmap::map(file)? };
        let len = mmap.len();
        Ok(Self {
            mmap: Arc::new(mmap),
            base: 0,
            len,
            pos: 0,
        })
    }

    pub fn from_mmap(mmap: Arc<Mmap>) -> Self {
        let len = mmap.len();
        Self {
            mmap,
            base: 0,
            len,
            pos: 0,
        }
    }

    /// A fresh, independently-cursored slice `[offset, offset+length)` of
    /// this stream's underlying bytes. Non-shared readers must return a
    /// stream with its own cursor so concurrent phrase/positional decoding
    /// over the same compound-file sub-range doesn't race.
    pub fn slice_typed(&self, offset: u64, length: u64) -> LuceneResult<Self> {
        let offset = offset as usize;
        let length = length as usize;
        if self.base + offset + length > self.base + self.len {
            return Err(LuceneError::invalid_argument(format!(
                "slice [{offset}, {offset}+{length}) out of bounds (len={})",
                self.len
            )));
        }
        Ok(Self {
            mmap: Arc::clone(&self.mmap),
            base: self.base + offset,
            len: length,
            pos: 0,
        })
    }

    fn bytes(&self) -> &[u8] {
        &self.mmap[self.base..self.base + self.len]
    }
}

impl IndexInput for FsIndexInput {
    fn seek(&mut self, pos: SeekFrom) -> LuceneResult<u64> {
        let new_pos: i64 = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::Current(n) => self.pos as i64 + n,
            SeekFrom::End(n) => self.len as i64 + n,
        };
        if new_pos < 0 || new_pos as usize > self.len {
            return Err(LuceneError::invalid_argument("seek out of bounds"));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn size(&self) -> u64 {
        self.len as u64
    }

    fn read_byte(&mut self) -> LuceneResult<u8> {
        if self.pos >= self.len {
            return Err(LuceneError::runtime("read past end of stream"));
        }
        let b = self.bytes()[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> LuceneResult<Vec<u8>> {
        if self.pos + n > self.len {
            return Err(LuceneError::runtime("short read"));
        }
        let out = self.bytes()[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(out)
    }

    fn read_int(&mut self) -> LuceneResult<i32> {
        let bytes = self.read_bytes(4)?;
        Ok((&bytes[..]).read_i32::<BigEndian>()?)
    }

    fn read_long(&mut self) -> LuceneResult<i64> {
        let bytes = self.read_bytes(8)?;
        Ok((&bytes[..]).read_i64::<BigEndian>()?)
    }

    fn slice(&self, offset: u64, length: u64) -> LuceneResult<Box<dyn IndexInput>> {
        Ok(Box::new(self.slice_typed(offset, length)?))
    }
}

/// A writable stream over a plain (non-mmapped) file handle, buffered the
/// same way the teacher's doc store buffers writes with `io::BufWriter`.
pub struct FsIndexOutput {
    writer: io::BufWriter<File>,
    pos: u64,
}

impl FsIndexOutput {
    pub fn create(file: File) -> Self {
        Self {
            writer: io::BufWriter::new(file),
            pos: 0,
        }
    }
}

impl IndexOutput for FsIndexOutput {
    fn write_byte(&mut self, b: u8) -> LuceneResult<()> {
        self.writer.write_all(&[b])?;
        self.pos += 1;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> LuceneResult<()> {
        self.writer.write_all(bytes)?;
        self.pos += bytes.len() as u64;
        Ok(())
    }

    fn write_int(&mut self, v: i32) -> LuceneResult<()> {
        self.writer.write_i32::<BigEndian>(v)?;
        self.pos += 4;
        Ok(())
    }

    fn write_long(&mut self, v: i64) -> LuceneResult<()> {
        self.writer.write_i64::<BigEndian>(v)?;
        self.pos += 8;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn flush(&mut self) -> LuceneResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    fn lock(&mut self) -> LuceneResult<()> {
        use fs4::FileExt;
        self.writer.get_ref().lock_exclusive()?;
        Ok(())
    }

    fn unlock(&mut self) -> LuceneResult<()> {
        use fs4::FileExt;
        self.writer.get_ref().unlock()?;
        Ok(())
    }
}

/// Helper used by callers that need plain `std::io::Read + Seek` over an
/// `IndexInput`'s remaining bytes (e.g. feeding `fst::Map::new`).
pub fn seek_to_start(file: &mut File) -> io::Result<()> {
    file.seek(io::SeekFrom::Start(0))?;
    Ok(())
}
