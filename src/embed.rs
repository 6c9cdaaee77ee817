//! Embedding of a variation graph into the pinch thread set.
//!
//! Every node gets a dedicated thread carrying its bases; every edge gets
//! a two-base staple thread whose ends are welded to the node ends the
//! edge attaches. The embedding map records where each node's bases live
//! so the path and k-mer mergers can translate node coordinates into
//! thread coordinates.

use std::collections::HashMap;

use log::debug;

use crate::coords::{node_end_on_thread, EmbeddingEntry};
use crate::error::{CoreGraphError, Result};
use crate::pinch::PinchThreadSet;
use crate::variation_graph::{Edge, VariationGraph};

/// Side table from thread name to bases. Only node threads appear here;
/// a thread with no entry is a staple.
pub type ThreadSequences = HashMap<u64, Vec<u8>>;

/// Source of fresh thread names, shared by all graphs embedded into one
/// thread set
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator::default()
    }

    pub fn fresh(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// A variation graph co-embedded with others in one pinch thread set
pub struct EmbeddedGraph<'a> {
    graph: &'a VariationGraph,
    name: String,
    embedding: HashMap<usize, EmbeddingEntry>,
}

impl<'a> EmbeddedGraph<'a> {
    /// Embed `graph` into `threads`, filling `sequences` with the node
    /// threads' bases. `name` labels the graph in diagnostics.
    pub fn new(
        graph: &'a VariationGraph,
        threads: &mut PinchThreadSet,
        sequences: &mut ThreadSequences,
        ids: &mut IdAllocator,
        name: &str,
    ) -> Result<Self> {
        let mut embedding = HashMap::new();

        // one thread per node, node base 0 at thread offset 0, forward
        let mut node_ids: Vec<usize> = graph.nodes.keys().copied().collect();
        node_ids.sort_unstable();
        for id in node_ids {
            let node = &graph.nodes[&id];
            let thread_name = ids.fresh();
            let thread = threads.add_thread(thread_name, node.length());
            sequences.insert(thread_name, node.sequence.clone());
            embedding.insert(id, EmbeddingEntry::new(thread, 0, false));
        }

        let embedded = EmbeddedGraph {
            graph,
            name: name.to_string(),
            embedding,
        };

        // one staple per edge, each end welded to the node end it touches
        let mut edges: Vec<Edge> = graph.edges.iter().copied().collect();
        edges.sort_unstable();
        for edge in edges {
            let staple = threads.add_thread(ids.fresh(), 2);

            let from_entry = embedded.entry(edge.from.node_id())?;
            let to_entry = embedded.entry(edge.to.node_id())?;
            let from_len = graph
                .node_length(edge.from.node_id())
                .ok_or(CoreGraphError::MissingEmbedding {
                    node_id: edge.from.node_id(),
                })?;
            let to_len = graph
                .node_length(edge.to.node_id())
                .ok_or(CoreGraphError::MissingEmbedding {
                    node_id: edge.to.node_id(),
                })?;

            // outward-facing sides: the from-side faces out of the node
            // end the edge leaves, the to-side faces into the node end
            // the edge enters
            let (from_off, from_is_end) =
                node_end_on_thread(&from_entry, from_len, !edge.from_start());
            let (to_off, to_is_end) = node_end_on_thread(&to_entry, to_len, edge.to_end());

            // staple base 0 and base 1 face outwards in opposite
            // directions, hence the asymmetric orientation flags
            threads.pinch(staple, from_entry.thread, 0, from_off as usize, 1, from_is_end);
            threads.pinch(staple, to_entry.thread, 1, to_off as usize, 1, !to_is_end);
        }

        debug!(
            "{}: embedded {} nodes and {} staples",
            embedded.name,
            embedded.graph.node_count(),
            embedded.graph.edge_count()
        );
        Ok(embedded)
    }

    pub fn graph(&self) -> &VariationGraph {
        self.graph
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The embedding triple for a node id
    pub fn entry(&self, node_id: usize) -> Result<EmbeddingEntry> {
        self.embedding
            .get(&node_id)
            .copied()
            .ok_or(CoreGraphError::MissingEmbedding { node_id })
    }

    /// Whether every node of the underlying graph is visited by at least
    /// one named path
    pub fn is_covered_by_paths(&self) -> bool {
        self.graph.paths_cover_all_nodes()
    }
}
