//! K-mer enumeration over a variation graph and the occurrence index
//! built from it.
//!
//! Walks start on the forward strand of every node at every offset and
//! extend across edges until k bases are collected. Reverse-strand starts
//! are not enumerated; uniqueness is judged jointly over a k-mer and its
//! reverse complement, so one strand is enough signal.

use std::collections::HashMap;

use crate::variation_graph::{reverse_complement, Edit, Handle, Mapping, VariationGraph};

/// One k-mer occurrence: the oriented node walk spelling it and the
/// strand offset of its first base within the first node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerOccurrence {
    pub handles: Vec<Handle>,
    pub offset: usize,
}

/// Oriented successor lists, materialized once per graph so walks do not
/// rescan the edge set
pub struct GraphWalker {
    adjacency: HashMap<Handle, Vec<Handle>>,
}

impl GraphWalker {
    pub fn new(graph: &VariationGraph) -> Self {
        let mut adjacency: HashMap<Handle, Vec<Handle>> = HashMap::new();
        for edge in &graph.edges {
            adjacency.entry(edge.from).or_default().push(edge.to);
            adjacency
                .entry(edge.to.flip())
                .or_default()
                .push(edge.from.flip());
        }
        for targets in adjacency.values_mut() {
            targets.sort_unstable();
            targets.dedup();
        }
        GraphWalker { adjacency }
    }

    pub fn successors(&self, handle: Handle) -> &[Handle] {
        self.adjacency
            .get(&handle)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

fn oriented_sequence(graph: &VariationGraph, handle: Handle) -> Vec<u8> {
    let node = &graph.nodes[&handle.node_id()];
    if handle.is_reverse() {
        reverse_complement(&node.sequence)
    } else {
        node.sequence.clone()
    }
}

/// Enumerate every k-mer walk of the graph, bounded at `edge_max` choice
/// points per walk, calling `visit` with the k-mer and its occurrence
pub fn enumerate_kmers<F>(graph: &VariationGraph, k: usize, edge_max: usize, mut visit: F)
where
    F: FnMut(&str, &KmerOccurrence),
{
    let walker = GraphWalker::new(graph);

    let mut node_ids: Vec<usize> = graph.nodes.keys().copied().collect();
    node_ids.sort_unstable();

    for id in node_ids {
        enumerate_kmers_from_node(graph, &walker, id, k, edge_max, &mut visit);
    }
}

/// Enumerate the k-mer walks whose first base lies on the forward strand
/// of one node. This is the unit of work the parallel observation phase
/// hands to its workers.
pub fn enumerate_kmers_from_node<F>(
    graph: &VariationGraph,
    walker: &GraphWalker,
    node_id: usize,
    k: usize,
    edge_max: usize,
    visit: &mut F,
) where
    F: FnMut(&str, &KmerOccurrence),
{
    if k == 0 {
        return;
    }
    let handle = Handle::forward(node_id);
    let seq = oriented_sequence(graph, handle);
    for start in 0..seq.len() {
        let mut prefix = Vec::with_capacity(k);
        let take = (seq.len() - start).min(k);
        prefix.extend_from_slice(&seq[start..start + take]);
        let mut walk = vec![handle];
        extend_walk(graph, walker, k, edge_max, start, &mut prefix, &mut walk, visit);
    }
}

/// Depth-first extension of a partial walk. `prefix` holds the bases
/// collected so far; branching beyond the choice-point budget is pruned.
#[allow(clippy::too_many_arguments)]
fn extend_walk<F>(
    graph: &VariationGraph,
    walker: &GraphWalker,
    k: usize,
    edge_budget: usize,
    start_offset: usize,
    prefix: &mut Vec<u8>,
    walk: &mut Vec<Handle>,
    visit: &mut F,
) where
    F: FnMut(&str, &KmerOccurrence),
{
    if prefix.len() == k {
        let kmer = String::from_utf8_lossy(prefix).to_string();
        visit(
            &kmer,
            &KmerOccurrence {
                handles: walk.clone(),
                offset: start_offset,
            },
        );
        return;
    }

    let tip = *walk.last().expect("walk is never empty");
    let successors = walker.successors(tip);
    let budget = if successors.len() > 1 {
        if edge_budget == 0 {
            return;
        }
        edge_budget - 1
    } else {
        edge_budget
    };

    for &next in successors {
        let seq = oriented_sequence(graph, next);
        let take = seq.len().min(k - prefix.len());
        let before = prefix.len();
        prefix.extend_from_slice(&seq[..take]);
        walk.push(next);
        extend_walk(graph, walker, k, budget, start_offset, prefix, walk, visit);
        walk.pop();
        prefix.truncate(before);
    }
}

/// Map from k-mer string to its occurrence list
pub struct KmerIndex {
    k: usize,
    map: HashMap<String, Vec<KmerOccurrence>>,
}

impl KmerIndex {
    /// Build the index with one enumeration pass
    pub fn build(graph: &VariationGraph, k: usize, edge_max: usize) -> Self {
        let mut map: HashMap<String, Vec<KmerOccurrence>> = HashMap::new();
        enumerate_kmers(graph, k, edge_max, |kmer, occurrence| {
            map.entry(kmer.to_string()).or_default().push(occurrence.clone());
        });
        KmerIndex { k, map }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn occurrence_count(&self, kmer: &str) -> usize {
        self.map.get(kmer).map(|v| v.len()).unwrap_or(0)
    }

    pub fn occurrences(&self, kmer: &str) -> &[KmerOccurrence] {
        self.map.get(kmer).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Byte proxy for the size of a k-mer's match list, for the budget
    /// check before uniqueness counting
    pub fn approximate_match_bytes(&self, kmer: &str) -> usize {
        self.occurrence_count(kmer) * (self.k + std::mem::size_of::<KmerOccurrence>())
    }
}

/// The minimal mapping path spanning one k-mer occurrence: one perfect
/// mapping per visited node, each covering what the walk takes from it
pub fn minimal_mapping_path(
    graph: &VariationGraph,
    occurrence: &KmerOccurrence,
    k: usize,
) -> Vec<Mapping> {
    let mut mappings = Vec::with_capacity(occurrence.handles.len());
    let mut remaining = k;
    let mut strand_offset = occurrence.offset;
    for &handle in &occurrence.handles {
        let node_length = graph
            .node_length(handle.node_id())
            .expect("occurrence visits a known node");
        let take = (node_length - strand_offset).min(remaining);
        // store the offset from the start of the underlying node
        let offset = if handle.is_reverse() {
            node_length - strand_offset - 1
        } else {
            strand_offset
        };
        mappings.push(
            Mapping::new(handle.node_id(), offset, handle.is_reverse())
                .with_edit(Edit::perfect(take)),
        );
        remaining -= take;
        strand_offset = 0;
        if remaining == 0 {
            break;
        }
    }
    mappings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variation_graph::Edge;

    fn chain_graph() -> VariationGraph {
        let mut g = VariationGraph::new();
        g.add_node(1, b"AC".to_vec());
        g.add_node(2, b"GT".to_vec());
        g.add_edge(Edge::from_flags(1, 2, false, false));
        g
    }

    #[test]
    fn test_enumeration_crosses_edges() {
        let g = chain_graph();
        let mut seen = Vec::new();
        enumerate_kmers(&g, 3, 10, |kmer, occ| {
            seen.push((kmer.to_string(), occ.handles.clone(), occ.offset));
        });
        // ACG from node 1 offset 0, CGT from node 1 offset 1
        assert!(seen
            .iter()
            .any(|(k, h, o)| k == "ACG" && h.len() == 2 && *o == 0));
        assert!(seen
            .iter()
            .any(|(k, h, o)| k == "CGT" && h.len() == 2 && *o == 1));
        // GT alone is too short for a 3-mer continuation
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_branching_respects_edge_budget() {
        let mut g = VariationGraph::new();
        g.add_node(1, b"A".to_vec());
        g.add_node(2, b"C".to_vec());
        g.add_node(3, b"G".to_vec());
        g.add_edge(Edge::from_flags(1, 2, false, false));
        g.add_edge(Edge::from_flags(1, 3, false, false));

        let mut with_budget = 0;
        enumerate_kmers(&g, 2, 10, |_, _| with_budget += 1);
        assert_eq!(with_budget, 2); // AC and AG

        let mut without_budget = 0;
        enumerate_kmers(&g, 2, 0, |_, _| without_budget += 1);
        assert_eq!(without_budget, 0);
    }

    #[test]
    fn test_index_counts() {
        let g = chain_graph();
        let index = KmerIndex::build(&g, 2, 10);
        assert_eq!(index.occurrence_count("AC"), 1);
        assert_eq!(index.occurrence_count("CG"), 1);
        assert_eq!(index.occurrence_count("GT"), 1);
        assert_eq!(index.occurrence_count("TT"), 0);
        assert!(index.approximate_match_bytes("AC") > 0);
    }

    #[test]
    fn test_minimal_path_spans_the_walk() {
        let g = chain_graph();
        let occ = KmerOccurrence {
            handles: vec![Handle::forward(1), Handle::forward(2)],
            offset: 1,
        };
        let path = minimal_mapping_path(&g, &occ, 3);
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].position.offset, 1);
        assert_eq!(path[0].from_length(2), 1);
        assert_eq!(path[1].position.offset, 0);
        assert_eq!(path[1].from_length(2), 2);
    }

    #[test]
    fn test_minimal_path_reverse_offset_conversion() {
        let mut g = VariationGraph::new();
        g.add_node(5, b"ACGT".to_vec());
        let occ = KmerOccurrence {
            handles: vec![Handle::reverse(5)],
            offset: 1,
        };
        let path = minimal_mapping_path(&g, &occ, 2);
        // strand offset 1 on the reverse strand is forward offset 2
        assert_eq!(path[0].position.offset, 2);
        assert!(path[0].position.is_reverse);
        assert_eq!(path[0].from_length(4), 2);
    }
}
