//! Log-byte-size merge policy (`spec.md` §4.7): segments are bucketed by
//! `floor(log_mergeFactor(size))`, i.e. every segment in a bucket has a size
//! in `[mergeFactor^k, mergeFactor^(k+1))` for that bucket's `k`; a bucket
//! merges once it has accumulated `mergeFactor` contiguous same-bucket
//! segments, bounded by `maxMergeDocs`.

/// One candidate merge: the indices (into the caller's segment list, in
/// segment order) that should be combined into a single new segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpec {
    pub segment_indices: Vec<usize>,
}

/// A segment's log-size bucket: `floor(log_mergeFactor(count))`, with an
/// empty segment pinned to bucket 0 so it doesn't wrongly pair with a
/// `mergeFactor^0 == 1`-sized one.
fn size_bucket(count: usize, merge_factor: usize) -> i64 {
    if count == 0 {
        return 0;
    }
    ((count as f64).ln() / (merge_factor as f64).ln()).floor() as i64
}

/// Finds merges among `doc_counts` (parallel to the caller's segment list,
/// in insertion order). Scans in order and accumulates a run of adjacent
/// segments that share the same `size_bucket`; once a run reaches
/// `merge_factor` segments (and stays under `max_merge_docs`), it's emitted
/// as a merge and a fresh run starts after it. A size-bucket change or a
/// `max_merge_docs` overflow both break the current run, the same way a
/// differently-sized segment breaks the log-byte-size policy's contiguous
/// grouping in real Lucene.
pub fn find_merges(doc_counts: &[i32], merge_factor: usize, max_merge_docs: usize) -> Vec<MergeSpec> {
    if merge_factor < 2 {
        return Vec::new();
    }
    let mut merges = Vec::new();
    let mut run: Vec<usize> = Vec::new();
    let mut run_total: usize = 0;
    let mut run_bucket: Option<i64> = None;

    for (i, &count) in doc_counts.iter().enumerate() {
        let count = count.max(0) as usize;
        let bucket = size_bucket(count, merge_factor);
        if !run.is_empty() && (run_total + count > max_merge_docs || Some(bucket) != run_bucket) {
            run.clear();
            run_total = 0;
        }
        run_bucket = Some(bucket);
        run.push(i);
        run_total += count;
        if run.len() == merge_factor {
            merges.push(MergeSpec { segment_indices: std::mem::take(&mut run) });
            run_total = 0;
            run_bucket = None;
        }
    }
    merges
}

/// Repeatedly merges everything down to one segment, used by `optimize()`.
/// Returns the sequence of merges to apply; the caller re-evaluates sizes
/// between rounds since each merge changes the segment list, so this only
/// computes round one — `optimize` calls it in a loop until one segment (or
/// none) remains.
pub fn full_merge(segment_count: usize) -> Option<MergeSpec> {
    if segment_count < 2 {
        None
    } else {
        Some(MergeSpec { segment_indices: (0..segment_count).collect() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_into_merge_factor_sized_buckets() {
        let counts = vec![1, 1, 1, 1, 1, 1, 1];
        let merges = find_merges(&counts, 3, usize::MAX);
        assert_eq!(merges.len(), 2);
        assert_eq!(merges[0].segment_indices, vec![0, 1, 2]);
        assert_eq!(merges[1].segment_indices, vec![3, 4, 5]);
    }

    #[test]
    fn respects_max_merge_docs() {
        let counts = vec![5, 5, 5, 5];
        let merges = find_merges(&counts, 4, 12);
        // 4 segments would sum to 20 docs, over the cap of 12, so the run
        // resets before accumulating all four.
        assert!(merges.is_empty());
    }

    #[test]
    fn full_merge_spans_every_segment() {
        assert_eq!(full_merge(1), None);
        assert_eq!(full_merge(3).unwrap().segment_indices, vec![0, 1, 2]);
    }

    #[test]
    fn does_not_merge_across_size_buckets() {
        // A single 100-doc segment sits in a much higher log3 bucket than
        // the three tiny ones that follow it; only the tiny run merges.
        let counts = vec![100, 1, 1, 1];
        let merges = find_merges(&counts, 3, usize::MAX);
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].segment_indices, vec![1, 2, 3]);
    }
}
