//! Coordinate algebra between node space and thread space.
//!
//! Every transform here is total over valid inputs; the pinch arguments
//! for both edge welds and path welds are derived through these functions
//! rather than inline arithmetic at the call sites.

use crate::pinch::ThreadHandle;

/// Where a node's bases live: a thread, the thread offset of node base 0,
/// and whether the node runs against the thread direction.
///
/// The embedder always produces (thread, 0, forward), but the triple is
/// kept so other layouts can pack several nodes onto one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingEntry {
    pub thread: ThreadHandle,
    pub offset: i64,
    pub is_reverse: bool,
}

impl EmbeddingEntry {
    pub fn new(thread: ThreadHandle, offset: i64, is_reverse: bool) -> Self {
        EmbeddingEntry {
            thread,
            offset,
            is_reverse,
        }
    }
}

/// Thread offset of a chosen end of an embedded node, plus an `is_end`
/// flag recording that the side is the node's high end rather than its
/// low end.
///
/// The low end (node offset 0) sits at the embedding offset; the high
/// end sits `length - 1` thread steps away in the embedding direction.
pub fn node_end_on_thread(
    entry: &EmbeddingEntry,
    node_length: usize,
    use_high_end: bool,
) -> (i64, bool) {
    let mut offset = entry.offset;
    let mut is_end = false;
    if use_high_end {
        let step = if entry.is_reverse { -1 } else { 1 };
        offset += (node_length as i64 - 1) * step;
        is_end = !is_end;
    }
    (offset, is_end)
}

/// Thread range of an overlap against one mapping.
///
/// `offset_in_node` and `mapping_reverse` come from the mapping's
/// position; `overlap_start` is the path-space start of the overlap and
/// `path_pos` the path-space start of the mapping. Returns the inclusive
/// start of the overlap on the thread (converted from a back-walked
/// endpoint when the walk runs against the thread) and whether the walk
/// is thread-reverse.
pub fn overlap_on_thread(
    entry: &EmbeddingEntry,
    offset_in_node: usize,
    mapping_reverse: bool,
    overlap_start: usize,
    path_pos: usize,
    overlap_length: usize,
) -> (i64, bool) {
    let walk_reverse = entry.is_reverse != mapping_reverse;
    let node_step = if entry.is_reverse { -1 } else { 1 };
    let walk_step = if walk_reverse { -1 } else { 1 };

    let mut offset = entry.offset + offset_in_node as i64 * node_step;
    offset += (overlap_start as i64 - path_pos as i64) * walk_step;
    if walk_reverse {
        // the walk lands on the last overlapped base; convert to the
        // start of a start-inclusive, end-exclusive range
        offset -= overlap_length as i64 - 1;
    }
    (offset, walk_reverse)
}

/// Parity of the four orientation flags of a two-sided weld: true when
/// the two thread ranges are relatively reversed.
pub fn relatively_reversed(
    a_thread_reverse: bool,
    a_mapping_reverse: bool,
    b_thread_reverse: bool,
    b_mapping_reverse: bool,
) -> bool {
    let flips = [
        a_thread_reverse,
        a_mapping_reverse,
        b_thread_reverse,
        b_mapping_reverse,
    ];
    flips.iter().filter(|&&f| f).count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pinch::PinchThreadSet;

    fn entry(offset: i64, is_reverse: bool) -> EmbeddingEntry {
        let mut ts = PinchThreadSet::new(16);
        let t = ts.add_thread(0, 16);
        EmbeddingEntry::new(t, offset, is_reverse)
    }

    #[test]
    fn test_node_end_low_and_high() {
        let e = entry(0, false);
        assert_eq!(node_end_on_thread(&e, 4, false), (0, false));
        assert_eq!(node_end_on_thread(&e, 4, true), (3, true));
    }

    #[test]
    fn test_node_end_reverse_embedding() {
        // node base 0 at thread offset 5, running backwards
        let e = entry(5, true);
        assert_eq!(node_end_on_thread(&e, 4, false), (5, false));
        assert_eq!(node_end_on_thread(&e, 4, true), (2, true));
    }

    #[test]
    fn test_overlap_forward_walk() {
        // forward mapping at node offset 1, mapping starts at path pos 10,
        // overlap covers path [12, 15)
        let e = entry(0, false);
        let (start, rev) = overlap_on_thread(&e, 1, false, 12, 10, 3);
        assert!(!rev);
        assert_eq!(start, 3);
    }

    #[test]
    fn test_overlap_reverse_walk() {
        // reverse mapping starting at node offset 7 walks toward offset 0;
        // two path bases in, a 3-base overlap ends at node offset 3
        let e = entry(0, false);
        let (start, rev) = overlap_on_thread(&e, 7, true, 12, 10, 3);
        assert!(rev);
        assert_eq!(start, 3);
    }

    #[test]
    fn test_overlap_walks_cover_the_same_bases() {
        // the same three node bases reached through a forward and a
        // reverse mapping give the same thread range
        let e = entry(0, false);
        let (fwd_start, fwd_rev) = overlap_on_thread(&e, 2, false, 0, 0, 3);
        let (rev_start, rev_rev) = overlap_on_thread(&e, 4, true, 0, 0, 3);
        assert_eq!(fwd_start, rev_start);
        assert_ne!(fwd_rev, rev_rev);
    }

    #[test]
    fn test_relative_orientation_parity() {
        assert!(!relatively_reversed(false, false, false, false));
        assert!(relatively_reversed(true, false, false, false));
        assert!(!relatively_reversed(true, true, false, false));
        assert!(relatively_reversed(true, true, true, false));
        assert!(!relatively_reversed(true, true, true, true));
    }
}
