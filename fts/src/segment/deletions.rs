//! Deletion bitvector (`.del<gen>`, `spec.md` §6): bit-packed MSB-first,
//! one bit per local doc, `1` = deleted. Deletion mutation flips a bit and
//! bumps the segment's `delGen`; the writer materializes `.del<gen>` only
//! on commit.

use crate::directory::Directory;
use crate::error::LuceneResult;
use crate::store::{IndexInput, IndexOutput};

#[derive(Debug, Clone)]
pub struct DeletionBitVector {
    bits: Vec<u8>,
    doc_count: usize,
    deleted_count: usize,
}

impl DeletionBitVector {
    pub fn new(doc_count: usize) -> Self {
        DeletionBitVector {
            bits: vec![0u8; (doc_count + 7) / 8],
            doc_count,
            deleted_count: 0,
        }
    }

    pub fn is_deleted(&self, local_doc: i32) -> bool {
        let i = local_doc as usize;
        if i >= self.doc_count {
            return false;
        }
        let byte = self.bits[i / 8];
        let mask = 0x80u8 >> (i % 8);
        byte & mask != 0
    }

    /// Returns `true` if this call newly marked the doc deleted (idempotent
    /// on a doc already deleted).
    pub fn delete(&mut self, local_doc: i32) -> bool {
        let i = local_doc as usize;
        assert!(i < self.doc_count, "local doc id out of range");
        let mask = 0x80u8 >> (i % 8);
        let byte = &mut self.bits[i / 8];
        if *byte & mask != 0 {
            return false;
        }
        *byte |= mask;
        self.deleted_count += 1;
        true
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    pub fn has_deletions(&self) -> bool {
        self.deleted_count > 0
    }

    pub fn write(&self, dir: &dyn Directory, file_name: &str) -> LuceneResult<()> {
        let mut out = dir.create(file_name)?;
        out.write_vint(self.doc_count as i32)?;
        out.write_bytes(&self.bits)?;
        out.close()
    }

    pub fn read(dir: &dyn Directory, file_name: &str) -> LuceneResult<Self> {
        let mut input = dir.open(file_name, true)?;
        let doc_count = input.read_vint()? as usize;
        let bits = input.read_bytes((doc_count + 7) / 8)?;
        let deleted_count = bits.iter().map(|b| b.count_ones() as usize).sum();
        Ok(DeletionBitVector { bits, doc_count, deleted_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::RamDirectory;

    #[test]
    fn flips_bits_and_persists() {
        let mut dv = DeletionBitVector::new(10);
        assert!(!dv.is_deleted(2));
        assert!(dv.delete(2));
        assert!(dv.is_deleted(2));
        assert!(!dv.delete(2));
        assert_eq!(dv.deleted_count(), 1);

        let dir = RamDirectory::new();
        dv.write(&dir, "_0.del1").unwrap();
        let back = DeletionBitVector::read(&dir, "_0.del1").unwrap();
        assert!(back.is_deleted(2));
        assert_eq!(back.deleted_count(), 1);
        assert_eq!(back.doc_count(), 10);
    }
}
