//! Binary heap over each per-segment term cursor's `(field, text)` key
//! (`spec.md` §4.6). Used by whole-index term enumeration, by scoring that
//! must union postings across segments, and by segment merging.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::term_dict::{Term, TermInfo};

/// One segment's position in the merge: an ascending cursor over that
/// segment's `(Term, TermInfo)` pairs plus the segment's base global doc id
/// (needed by callers that union postings, not by the merger itself).
pub struct SegmentTermCursor<'a> {
    pub segment_ordinal: usize,
    iter: Box<dyn Iterator<Item = (&'a Term, &'a TermInfo)> + 'a>,
    current: Option<(Term, TermInfo)>,
}

impl<'a> SegmentTermCursor<'a> {
    pub fn new(segment_ordinal: usize, mut iter: Box<dyn Iterator<Item = (&'a Term, &'a TermInfo)> + 'a>) -> Self {
        let current = iter.next().map(|(t, i)| (t.clone(), *i));
        SegmentTermCursor { segment_ordinal, iter, current }
    }

    fn advance(&mut self) {
        self.current = self.iter.next().map(|(t, i)| (t.clone(), *i));
    }
}

struct HeapEntry<'a> {
    term: Term,
    cursor: SegmentTermCursor<'a>,
}

impl<'a> PartialEq for HeapEntry<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term
    }
}
impl<'a> Eq for HeapEntry<'a> {}
impl<'a> PartialOrd for HeapEntry<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<'a> Ord for HeapEntry<'a> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.term.cmp(&other.term)
    }
}

/// One output record: the least term across all open cursors, plus every
/// `(segment_ordinal, TermInfo)` pair sharing that term (i.e. the same
/// global term appearing in more than one segment).
pub struct MergedTerm {
    pub term: Term,
    pub postings: Vec<(usize, TermInfo)>,
}

/// Merges several ascending per-segment term streams into one globally
/// sorted stream, grouping same-term entries from different segments.
pub struct SegmentMergeQueue<'a> {
    heap: BinaryHeap<Reverse<HeapEntry<'a>>>,
}

impl<'a> SegmentMergeQueue<'a> {
    pub fn new(cursors: Vec<SegmentTermCursor<'a>>) -> Self {
        let mut heap = BinaryHeap::with_capacity(cursors.len());
        for cursor in cursors {
            if let Some((term, _)) = cursor.current.clone() {
                heap.push(Reverse(HeapEntry { term, cursor }));
            }
        }
        SegmentMergeQueue { heap }
    }

    /// Pops the least term across all cursors and every other cursor
    /// currently positioned on the same term, advancing each popped cursor
    /// and re-inserting it if it has more terms.
    pub fn next(&mut self) -> Option<MergedTerm> {
        let Reverse(first) = self.heap.pop()?;
        let least_term = first.term.clone();
        let mut postings = Vec::new();
        let mut reinsert = Vec::new();

        let mut consume = |mut entry: HeapEntry<'a>, postings: &mut Vec<(usize, TermInfo)>, reinsert: &mut Vec<HeapEntry<'a>>| {
            if let Some((_, info)) = entry.cursor.current.take() {
                postings.push((entry.cursor.segment_ordinal, info));
            }
            entry.cursor.advance();
            if let Some((next_term, _)) = entry.cursor.current.clone() {
                entry.term = next_term;
                reinsert.push(entry);
            }
        };

        consume(first, &mut postings, &mut reinsert);
        while let Some(Reverse(top)) = self.heap.peek() {
            if top.term != least_term {
                break;
            }
            let Reverse(entry) = self.heap.pop().unwrap();
            consume(entry, &mut postings, &mut reinsert);
        }

        for entry in reinsert {
            self.heap.push(Reverse(entry));
        }

        Some(MergedTerm { term: least_term, postings })
    }
}

impl<'a> Iterator for SegmentMergeQueue<'a> {
    type Item = MergedTerm;
    fn next(&mut self) -> Option<MergedTerm> {
        SegmentMergeQueue::next(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(ord: usize, terms: Vec<(Term, TermInfo)>) -> SegmentTermCursor<'static> {
        let leaked: &'static Vec<(Term, TermInfo)> = Box::leak(Box::new(terms));
        SegmentTermCursor::new(ord, Box::new(leaked.iter().map(|(t, i)| (t, i))))
    }

    fn info(freq: i32) -> TermInfo {
        TermInfo { doc_freq: freq, freq_pointer: 0, prox_pointer: 0, skip_offset: 0 }
    }

    #[test]
    fn merges_and_groups_shared_terms() {
        let a = cursor(0, vec![(Term::new(0, "apple"), info(1)), (Term::new(0, "cherry"), info(1))]);
        let b = cursor(1, vec![(Term::new(0, "banana"), info(2)), (Term::new(0, "cherry"), info(3))]);

        let mut merger = SegmentMergeQueue::new(vec![a, b]);
        let mut out = Vec::new();
        while let Some(m) = merger.next() {
            out.push((m.term.text.clone(), m.postings.len()));
        }
        assert_eq!(
            out,
            vec![
                ("apple".to_string(), 1),
                ("banana".to_string(), 1),
                ("cherry".to_string(), 2),
            ]
        );
    }
}
