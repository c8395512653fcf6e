use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::RwLock;
use std::sync::Arc;

use super::{IndexInput, IndexOutput, SeekFrom};
use crate::error::{LuceneError, LuceneResult};

/// A readable stream over an owned, shared byte buffer. Presents the
/// identical API as `FsIndexInput` so the binary-codec round-trip property
/// (`spec.md` §8) holds for both backends.
#[derive(Clone)]
pub struct RamIndexInput {
    buf: Arc<RwLock<Vec<u8>>>,
    base: usize,
    len: usize,
    pos: usize,
}

impl RamIndexInput {
    pub fn new(buf: Arc<RwLock<Vec<u8>>>) -> Self {
        let len = buf.read().len();
        Self {
            buf,
            base: 0,
            len,
            pos: 0,
        }
    }

    pub fn slice(&self, offset: u64, length: u64) -> LuceneResult<Self> {
        let offset = offset as usize;
        let length = length as usize;
        if offset + length > self.len {
            return Err(LuceneError::invalid_argument("slice out of bounds"));
        }
        Ok(Self {
            buf: Arc::clone(&self.buf),
            base: self.base + offset,
            len: length,
            pos: 0,
        })
    }
}

impl IndexInput for RamIndexInput {
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
        let guard = self.buf.read();
        if self.pos >= self.len {
            return Err(LuceneError::runtime("read past end of stream"));
        }
        let b = guard[self.base + self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> LuceneResult<Vec<u8>> {
        let guard = self.buf.read();
        if self.pos + n > self.len {
            return Err(LuceneError::runtime("short read"));
        }
        let out = guard[self.base + self.pos..self.base + self.pos + n].to_vec();
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
        Ok(Box::new(RamIndexInput::slice(self, offset, length)?))
    }
}

/// A writable stream appending to a shared, owned byte buffer.
pub struct RamIndexOutput {
    buf: Arc<RwLock<Vec<u8>>>,
}

impl RamIndexOutput {
    pub fn new(buf: Arc<RwLock<Vec<u8>>>) -> Self {
        Self { buf }
    }
}

impl IndexOutput for RamIndexOutput {
    fn write_byte(&mut self, b: u8) -> LuceneResult<()> {
        self.buf.write().push(b);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> LuceneResult<()> {
        self.buf.write().extend_from_slice(bytes);
        Ok(())
    }

    fn write_int(&mut self, v: i32) -> LuceneResult<()> {
        let mut guard = self.buf.write();
        guard.write_i32::<BigEndian>(v)?;
        Ok(())
    }

    fn write_long(&mut self, v: i64) -> LuceneResult<()> {
        let mut guard = self.buf.write();
        guard.write_i64::<BigEndian>(v)?;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.buf.read().len() as u64
    }

    fn flush(&mut self) -> LuceneResult<()> {
        Ok(())
    }
}
