//! Binary file streams: seekable readers/writers over bytes with Lucene's
//! numeric codecs (byte, big-endian int32/int64, VInt, length-prefixed
//! modified-UTF-8 string, length-prefixed binary blob).

mod codec;
mod fs_stream;
mod ram_stream;

pub use codec::{read_modified_utf8, write_modified_utf8};
pub use fs_stream::{FsIndexInput, FsIndexOutput};
pub use ram_stream::{RamIndexInput, RamIndexOutput};

use crate::error::LuceneResult;

/// Origin for a `seek` call, mirroring `fseek`'s `whence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u64),
    Current(i64),
    End(i64),
}

/// A readable, seekable stream over Lucene-encoded bytes.
pub trait IndexInput {
    fn seek(&mut self, pos: SeekFrom) -> LuceneResult<u64>;
    fn tell(&self) -> u64;
    fn size(&self) -> u64;

    fn read_byte(&mut self) -> LuceneResult<u8>;
    fn read_bytes(&mut self, n: usize) -> LuceneResult<Vec<u8>>;

    /// Big-endian 4-byte signed integer.
    fn read_int(&mut self) -> LuceneResult<i32>;
    /// Big-endian 8-byte signed integer. On hosts where `i64` math would
    /// otherwise truncate, the full 8 bytes are always consumed regardless
    /// of whether the high dword is discarded by the caller.
    fn read_long(&mut self) -> LuceneResult<i64>;

    /// Variable-length integer: 7 bits per byte, little-endian, MSB is the
    /// continuation bit.
    fn read_vint(&mut self) -> LuceneResult<i32> {
        let mut shift = 0u32;
        let mut result: i32 = 0;
        loop {
            let b = self.read_byte()?;
            result |= ((b & 0x7f) as i32) << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 35 {
                return Err(crate::error::LuceneError::InvalidFileFormat(
                    "VInt is too long; did we read from invalid data?".to_string(),
                ));
            }
        }
    }

    /// VInt-length-prefixed modified-UTF-8 string.
    fn read_string(&mut self) -> LuceneResult<String> {
        let byte_len = self.read_vint()? as usize;
        let bytes = self.read_bytes(byte_len)?;
        read_modified_utf8(&bytes)
    }

    /// VInt-length-prefixed raw binary blob.
    fn read_binary(&mut self) -> LuceneResult<Vec<u8>> {
        let byte_len = self.read_vint()? as usize;
        self.read_bytes(byte_len)
    }

    /// A fresh, independently-cursored view of `[offset, offset+length)` of
    /// this stream's bytes. Compound-file sub-streams and concurrent
    /// positional decoding both require a reader whose cursor doesn't race
    /// with the stream it was sliced from.
    fn slice(&self, offset: u64, length: u64) -> LuceneResult<Box<dyn IndexInput>>;
}

/// A writable, seekable stream producing Lucene-encoded bytes.
pub trait IndexOutput {
    fn write_byte(&mut self, b: u8) -> LuceneResult<()>;
    fn write_bytes(&mut self, bytes: &[u8]) -> LuceneResult<()>;

    fn write_int(&mut self, v: i32) -> LuceneResult<()>;
    fn write_long(&mut self, v: i64) -> LuceneResult<()>;

    fn write_vint(&mut self, mut v: i32) -> LuceneResult<()> {
        loop {
            if (v & !0x7f) == 0 {
                self.write_byte(v as u8)?;
                return Ok(());
            }
            self.write_byte(((v & 0x7f) | 0x80) as u8)?;
            v = ((v as u32) >> 7) as i32;
        }
    }

    fn write_string(&mut self, s: &str) -> LuceneResult<()> {
        let encoded = write_modified_utf8(s);
        self.write_vint(encoded.len() as i32)?;
        self.write_bytes(&encoded)
    }

    fn write_binary(&mut self, bytes: &[u8]) -> LuceneResult<()> {
        self.write_vint(bytes.len() as i32)?;
        self.write_bytes(bytes)
    }

    fn tell(&self) -> u64;
    fn flush(&mut self) -> LuceneResult<()>;

    /// Advisory lock/unlock of the underlying byte range. No-ops for
    /// in-memory streams.
    fn lock(&mut self) -> LuceneResult<()> {
        Ok(())
    }
    fn unlock(&mut self) -> LuceneResult<()> {
        Ok(())
    }
    fn close(&mut self) -> LuceneResult<()> {
        self.flush()
    }
}
