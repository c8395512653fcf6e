//! Per-term posting lists: `.frq` (doc ids + term frequencies) and `.prx`
//! (per-document term positions), delta-encoded as `spec.md` §3 and §6
//! describe. Follows Lucene's own frequency-stream packing: when a
//! document's term frequency is exactly 1, the doc-id delta and the "freq
//! is 1" flag share one VInt (`(delta << 1) | 1`); otherwise the delta is
//! shifted with the low bit clear and a separate VInt frequency follows.

use crate::error::LuceneResult;
use crate::store::{IndexInput, IndexOutput};

/// One posting: a document (by local id within the segment being written)
/// and the positions at which the term occurs in that document. `freq` is
/// `positions.len()`.
pub struct PostingEntry {
    pub doc_id: i32,
    pub positions: Vec<i32>,
}

/// Appends one term's posting list to a segment's open `.frq`/`.prx`
/// streams, returning the byte offsets the caller should record as the new
/// term's `freq_pointer`/`prox_pointer` in its `TermInfo`.
pub struct PostingsWriter<'a> {
    freq_out: &'a mut dyn IndexOutput,
    prox_out: &'a mut dyn IndexOutput,
}

impl<'a> PostingsWriter<'a> {
    pub fn new(freq_out: &'a mut dyn IndexOutput, prox_out: &'a mut dyn IndexOutput) -> Self {
        PostingsWriter { freq_out, prox_out }
    }

    /// `postings` must be sorted ascending by `doc_id` with no duplicates.
    pub fn write_term(&mut self, postings: &[PostingEntry]) -> LuceneResult<(i64, i64)> {
        let freq_pointer = self.freq_out.tell() as i64;
        let prox_pointer = self.prox_out.tell() as i64;

        let mut last_doc = 0i32;
        for posting in postings {
            let delta = posting.doc_id - last_doc;
            last_doc = posting.doc_id;
            let freq = posting.positions.len() as i32;
            if freq == 1 {
                self.freq_out.write_vint((delta << 1) | 1)?;
            } else {
                self.freq_out.write_vint(delta << 1)?;
                self.freq_out.write_vint(freq)?;
            }

            let mut last_pos = 0i32;
            for &pos in &posting.positions {
                self.prox_out.write_vint(pos - last_pos)?;
                last_pos = pos;
            }
        }
        Ok((freq_pointer, prox_pointer))
    }
}

/// Decoded posting entries for one term, without positions (cheaper for
/// pure existence/scoring queries that don't need phrase matching).
pub struct DocFreqEntry {
    pub doc_id: i32,
    pub freq: i32,
}

pub struct PostingsReader;

impl PostingsReader {
    /// Reads `doc_freq` postings starting at `freq_pointer`, returning
    /// (local doc id, term freq) pairs. `input` must be an independent
    /// cursor over the segment's `.frq` stream (non-shared, per the
    /// directory's contract).
    pub fn read_doc_freqs(
        input: &mut dyn IndexInput,
        freq_pointer: i64,
        doc_freq: i32,
    ) -> LuceneResult<Vec<DocFreqEntry>> {
        input.seek(crate::store::SeekFrom::Start(freq_pointer as u64))?;
        let mut out = Vec::with_capacity(doc_freq as usize);
        let mut doc = 0i32;
        for _ in 0..doc_freq {
            let code = input.read_vint()?;
            let delta = code >> 1;
            doc += delta;
            let freq = if code & 1 != 0 { 1 } else { input.read_vint()? };
            out.push(DocFreqEntry { doc_id: doc, freq });
        }
        Ok(out)
    }

    /// Reads `doc_freq` postings with full position lists, reading `.frq`
    /// and `.prx` in lockstep (the two streams advance together: each
    /// document's freq determines how many position deltas to consume next
    /// from `.prx`).
    pub fn read_doc_positions(
        freq_input: &mut dyn IndexInput,
        prox_input: &mut dyn IndexInput,
        freq_pointer: i64,
        prox_pointer: i64,
        doc_freq: i32,
    ) -> LuceneResult<Vec<PostingEntry>> {
        freq_input.seek(crate::store::SeekFrom::Start(freq_pointer as u64))?;
        prox_input.seek(crate::store::SeekFrom::Start(prox_pointer as u64))?;
        let mut out = Vec::with_capacity(doc_freq as usize);
        let mut doc = 0i32;
        for _ in 0..doc_freq {
            let code = freq_input.read_vint()?;
            let delta = code >> 1;
            doc += delta;
            let freq = if code & 1 != 0 { 1 } else { freq_input.read_vint()? };

            let mut positions = Vec::with_capacity(freq as usize);
            let mut pos = 0i32;
            for _ in 0..freq {
                pos += prox_input.read_vint()?;
                positions.push(pos);
            }
            out.push(PostingEntry { doc_id: doc, positions });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Directory, RamDirectory};

    #[test]
    fn round_trips_doc_ids_freqs_and_positions() {
        let dir = RamDirectory::new();
        let postings = vec![
            PostingEntry { doc_id: 0, positions: vec![2] },
            PostingEntry { doc_id: 3, positions: vec![0, 5] },
            PostingEntry { doc_id: 4, positions: vec![1] },
        ];

        let (freq_ptr, prox_ptr) = {
            let mut freq_out = dir.create("_0.frq").unwrap();
            let mut prox_out = dir.create("_0.prx").unwrap();
            let mut w = PostingsWriter::new(freq_out.as_mut(), prox_out.as_mut());
            let ptrs = w.write_term(&postings).unwrap();
            freq_out.close().unwrap();
            prox_out.close().unwrap();
            ptrs
        };

        let mut freq_in = dir.open("_0.frq", false).unwrap();
        let decoded = PostingsReader::read_doc_freqs(freq_in.as_mut(), freq_ptr, 3).unwrap();
        let ids: Vec<i32> = decoded.iter().map(|e| e.doc_id).collect();
        let freqs: Vec<i32> = decoded.iter().map(|e| e.freq).collect();
        assert_eq!(ids, vec![0, 3, 4]);
        assert_eq!(freqs, vec![1, 2, 1]);

        let mut freq_in = dir.open("_0.frq", false).unwrap();
        let mut prox_in = dir.open("_0.prx", false).unwrap();
        let full = PostingsReader::read_doc_positions(freq_in.as_mut(), prox_in.as_mut(), freq_ptr, prox_ptr, 3).unwrap();
        assert_eq!(full[1].positions, vec![0, 5]);
    }
}
