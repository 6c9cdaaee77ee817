//! The merge pipeline: embed both graphs, pinch on shared paths and on
//! mutually-unique k-mers, then read the quotient back out.

use log::{info, warn};

use crate::embed::{EmbeddedGraph, IdAllocator, ThreadSequences};
use crate::error::{CoreGraphError, Result};
use crate::kmer::KmerIndex;
use crate::kmer_pinch::pinch_unique_kmers;
use crate::path_pinch::pinch_with;
use crate::pinch::PinchThreadSet;
use crate::readout::read_out;
use crate::variation_graph::VariationGraph;

/// What to merge on
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Merge on k-mers of this size in addition to paths
    pub kmer_size: Option<usize>,
    /// Choice-point budget per k-mer walk
    pub edge_max: usize,
    /// Skip path merging entirely; requires a k-mer size
    pub kmers_only: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            kmer_size: None,
            edge_max: usize::MAX,
            kmers_only: false,
        }
    }
}

/// Merge two variation graphs into one, fusing the bases the shared
/// signal proves equivalent
pub fn merge_graphs(
    a: &VariationGraph,
    b: &VariationGraph,
    options: &MergeOptions,
) -> Result<VariationGraph> {
    if options.kmers_only && options.kmer_size.is_none() {
        return Err(CoreGraphError::Usage(
            "k-mers-only merging requires a k-mer size".to_string(),
        ));
    }

    let capacity = a.total_sequence_length()
        + b.total_sequence_length()
        + 2 * (a.edge_count() + b.edge_count());
    let mut threads = PinchThreadSet::new(capacity);
    let mut sequences = ThreadSequences::new();
    let mut ids = IdAllocator::new();

    let embedded_a = EmbeddedGraph::new(a, &mut threads, &mut sequences, &mut ids, "graph 1")?;
    let embedded_b = EmbeddedGraph::new(b, &mut threads, &mut sequences, &mut ids, "graph 2")?;
    for embedded in [&embedded_a, &embedded_b] {
        if !embedded.is_covered_by_paths() {
            warn!(
                "{} has nodes no named path touches; they can only merge on k-mers",
                embedded.name()
            );
        }
    }

    if !options.kmers_only {
        pinch_with(&embedded_a, &embedded_b, &mut threads)?;
    }

    if let Some(k) = options.kmer_size {
        info!("building {}-mer indexes", k);
        let index_a = KmerIndex::build(a, k, options.edge_max);
        let index_b = KmerIndex::build(b, k, options.edge_max);
        pinch_unique_kmers(
            &embedded_a,
            &index_a,
            &embedded_b,
            &index_b,
            k,
            options.edge_max,
            &mut threads,
        )?;
    }

    threads.join_trivial_boundaries();
    let merged = read_out(&mut threads, &sequences);
    info!(
        "merged {} + {} nodes into {}",
        a.node_count(),
        b.node_count(),
        merged.node_count()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kmers_only_without_kmer_size_is_a_usage_error() {
        let a = VariationGraph::new();
        let b = VariationGraph::new();
        let options = MergeOptions {
            kmers_only: true,
            ..MergeOptions::default()
        };
        let err = merge_graphs(&a, &b, &options).unwrap_err();
        assert!(matches!(err, CoreGraphError::Usage(_)));
    }
}
