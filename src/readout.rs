//! Reading the pinched quotient back out as a variation graph.
//!
//! After the trivial boundaries are joined, every chain with at least one
//! node-thread member becomes one output node; staples contribute no
//! nodes of their own. The cuts that survive the join become edges, with
//! orientations taken from how each segment walks its chain.

use std::collections::HashMap;

use log::debug;

use crate::embed::ThreadSequences;
use crate::pinch::{PinchThreadSet, Segment};
use crate::pos::rc_base;
use crate::variation_graph::{Edge, Handle, VariationGraph};

/// Chain-direction base a segment member contributes at one position
fn member_base(seq: &[u8], thread_offset: usize, reversed: bool) -> u8 {
    let base = seq[thread_offset];
    if reversed {
        rc_base(base)
    } else {
        base
    }
}

fn is_n(base: u8) -> bool {
    base == b'N' || base == b'n'
}

/// Convert the quotient of the thread set into a variation graph.
/// Joins trivial boundaries first if the caller has not already.
pub fn read_out(threads: &mut PinchThreadSet, sequences: &ThreadSequences) -> VariationGraph {
    threads.join_trivial_boundaries();
    let quotient = threads.quotient().expect("quotient was just computed");
    let segments: Vec<Segment> = quotient.segments().to_vec();

    // Chain sequences assembled across all node-thread members, with a
    // preference at every position for a base that is not an N
    let mut chain_bases: HashMap<usize, Vec<u8>> = HashMap::new();
    for segment in &segments {
        let name = threads.thread_name(segment.thread);
        let Some(seq) = sequences.get(&name) else {
            continue; // staple
        };
        let chain_len = quotient.chain(segment.chain).length;
        let bases = chain_bases
            .entry(segment.chain)
            .or_insert_with(|| vec![0u8; chain_len]);
        for i in 0..segment.length {
            let pos = if segment.reversed {
                segment.chain_start - i
            } else {
                segment.chain_start + i
            };
            let base = member_base(seq, segment.start + i, segment.reversed);
            if bases[pos] == 0 || (is_n(bases[pos]) && !is_n(base)) {
                bases[pos] = base;
            }
        }
    }

    let mut graph = VariationGraph::new();

    // Pass 1: the first node-thread segment of each chain leads it and
    // yields the output node
    let mut node_for_chain: HashMap<usize, usize> = HashMap::new();
    let mut next_node_id = 1;
    for segment in &segments {
        let name = threads.thread_name(segment.thread);
        if !sequences.contains_key(&name) {
            continue;
        }
        if node_for_chain.contains_key(&segment.chain) {
            continue;
        }
        let id = next_node_id;
        next_node_id += 1;
        node_for_chain.insert(segment.chain, id);
        let bases = chain_bases
            .get(&segment.chain)
            .expect("leader chain has collected bases")
            .clone();
        graph.add_node(id, bases);
    }
    debug!("read out {} nodes from {} segments", graph.node_count(), segments.len());

    // Pass 2: every surviving cut between two segments of one thread is
    // an adjacency between their chains
    for window in segments.windows(2) {
        let (here, next) = (&window[0], &window[1]);
        if here.thread != next.thread {
            continue;
        }
        let (Some(&from_node), Some(&to_node)) = (
            node_for_chain.get(&here.chain),
            node_for_chain.get(&next.chain),
        ) else {
            continue;
        };
        // leaving against the chain direction means leaving through the
        // chain's start, which the edge records as a reverse visit
        let from = Handle::new(from_node, here.reversed);
        let to = Handle::new(to_node, next.reversed);
        graph.add_edge(Edge::new(from, to));
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{EmbeddedGraph, IdAllocator, ThreadSequences};
    use crate::variation_graph::Edge as VgEdge;

    fn embed_one(graph: &VariationGraph) -> (PinchThreadSet, ThreadSequences) {
        let capacity = graph.total_sequence_length() + 2 * graph.edge_count();
        let mut ts = PinchThreadSet::new(capacity);
        let mut seqs = ThreadSequences::new();
        let mut ids = IdAllocator::new();
        EmbeddedGraph::new(graph, &mut ts, &mut seqs, &mut ids, "g").unwrap();
        (ts, seqs)
    }

    #[test]
    fn test_lone_thread_reads_out_unchanged() {
        let mut g = VariationGraph::new();
        g.add_node(7, b"ACGT".to_vec());
        let (mut ts, seqs) = embed_one(&g);

        let out = read_out(&mut ts, &seqs);
        assert_eq!(out.node_count(), 1);
        assert_eq!(out.edge_count(), 0);
        assert_eq!(out.nodes[&1].sequence, b"ACGT");
    }

    #[test]
    fn test_stapled_run_fuses_into_one_node() {
        let mut g = VariationGraph::new();
        g.add_node(1, b"AC".to_vec());
        g.add_node(2, b"GT".to_vec());
        g.add_edge(VgEdge::from_flags(1, 2, false, false));
        let (mut ts, seqs) = embed_one(&g);

        let out = read_out(&mut ts, &seqs);
        assert_eq!(out.node_count(), 1);
        assert_eq!(out.edge_count(), 0);
        assert_eq!(out.nodes[&1].sequence, b"ACGT");
    }

    #[test]
    fn test_branch_point_keeps_nodes_and_edges() {
        let mut g = VariationGraph::new();
        g.add_node(1, b"A".to_vec());
        g.add_node(2, b"C".to_vec());
        g.add_node(3, b"G".to_vec());
        g.add_edge(VgEdge::from_flags(1, 2, false, false));
        g.add_edge(VgEdge::from_flags(1, 3, false, false));
        let (mut ts, seqs) = embed_one(&g);

        let out = read_out(&mut ts, &seqs);
        assert_eq!(out.node_count(), 3);
        assert_eq!(out.edge_count(), 2);
        let seqs_out: Vec<&[u8]> = {
            let mut v: Vec<&[u8]> = out.nodes.values().map(|n| n.sequence.as_slice()).collect();
            v.sort();
            v
        };
        assert_eq!(seqs_out, vec![b"A".as_slice(), b"C".as_slice(), b"G".as_slice()]);
    }

    #[test]
    fn test_welded_threads_become_one_node() {
        let mut ts = PinchThreadSet::new(8);
        let mut seqs = ThreadSequences::new();
        let a = ts.add_thread(0, 4);
        let b = ts.add_thread(1, 4);
        seqs.insert(0, b"ACGT".to_vec());
        seqs.insert(1, b"ACGT".to_vec());
        ts.pinch(a, b, 0, 0, 4, true);

        let out = read_out(&mut ts, &seqs);
        assert_eq!(out.node_count(), 1);
        assert_eq!(out.nodes[&1].sequence, b"ACGT");
    }

    #[test]
    fn test_antiparallel_weld_reads_along_the_leader() {
        let mut ts = PinchThreadSet::new(8);
        let mut seqs = ThreadSequences::new();
        let a = ts.add_thread(0, 4);
        let b = ts.add_thread(1, 4);
        seqs.insert(0, b"AAAC".to_vec());
        seqs.insert(1, b"GTTT".to_vec()); // reverse complement of AAAC
        ts.pinch(a, b, 0, 0, 4, false);

        let out = read_out(&mut ts, &seqs);
        assert_eq!(out.node_count(), 1);
        assert_eq!(out.edge_count(), 0);
        assert_eq!(out.nodes[&1].sequence, b"AAAC");
    }

    #[test]
    fn test_all_n_member_loses_to_a_called_base() {
        let mut ts = PinchThreadSet::new(4);
        let mut seqs = ThreadSequences::new();
        let a = ts.add_thread(0, 2);
        let b = ts.add_thread(1, 2);
        seqs.insert(0, b"NN".to_vec());
        seqs.insert(1, b"AC".to_vec());
        ts.pinch(a, b, 0, 0, 2, true);

        let out = read_out(&mut ts, &seqs);
        assert_eq!(out.node_count(), 1);
        assert_eq!(out.nodes[&1].sequence, b"AC");
    }

    #[test]
    fn test_self_loop_survives_readout() {
        // a circular node: edge from its end back to its start
        let mut g = VariationGraph::new();
        g.add_node(1, b"ACGT".to_vec());
        g.add_edge(VgEdge::from_flags(1, 1, false, false));
        let (mut ts, seqs) = embed_one(&g);

        let out = read_out(&mut ts, &seqs);
        assert_eq!(out.node_count(), 1);
        assert_eq!(out.edge_count(), 1);
        let edge = out.edges.iter().next().unwrap();
        assert_eq!(edge.from.node_id(), edge.to.node_id());
    }
}
