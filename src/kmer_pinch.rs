//! Merging on mutually-unique k-mers.
//!
//! Each graph is scanned for k-mers that occur exactly once in it, also
//! counting reverse-complement occurrences so a k-mer equal or mirrored
//! elsewhere in the same graph never qualifies. Observation runs on the
//! rayon pool with a mutex-guarded dedup map per graph; the merge step
//! then pairs unique k-mers across the two graphs (falling back to the
//! reverse complement) and pinches their minimal mapping paths.

use std::collections::HashMap;
use std::sync::Mutex;

use log::{info, warn};
use rayon::prelude::*;

use crate::embed::EmbeddedGraph;
use crate::error::Result;
use crate::kmer::{
    enumerate_kmers_from_node, minimal_mapping_path, GraphWalker, KmerIndex, KmerOccurrence,
};
use crate::path_pinch::pinch_paths;
use crate::pinch::PinchThreadSet;
use crate::variation_graph::{paths_equal, reverse_complement, Mapping, VariationGraph};

/// Upper bound on the index match-list size a k-mer may have and still
/// be considered for uniqueness
pub const MAX_UNIQUE_KMER_BYTES: usize = 1024;

/// K-mers that survived observation, each with its minimal mapping path.
/// An empty path is the ambiguity sentinel: seen with two different
/// placements, never to be used.
type UniqueKmerPaths = HashMap<String, Vec<Mapping>>;

fn reverse_complement_str(kmer: &str) -> String {
    String::from_utf8(reverse_complement(kmer.as_bytes())).unwrap_or_default()
}

/// One observation: accept or reject a k-mer occurrence and record its
/// minimal path in the dedup map
fn observe(
    graph: &VariationGraph,
    index: &KmerIndex,
    k: usize,
    kmer: &str,
    occurrence: &KmerOccurrence,
    unique: &Mutex<UniqueKmerPaths>,
) {
    if index.approximate_match_bytes(kmer) > MAX_UNIQUE_KMER_BYTES {
        return;
    }
    let rc = reverse_complement_str(kmer);
    if index.occurrence_count(kmer) + index.occurrence_count(&rc) > 1 {
        return;
    }

    let path = minimal_mapping_path(graph, occurrence, k);

    enum Seen {
        New,
        Kept,
        Conflicting,
    }

    let mut map = unique.lock().unwrap();
    let seen = match map.get(kmer) {
        None => Seen::New,
        // already ambiguous, or the same placement seen again
        Some(existing) if existing.is_empty() || paths_equal(existing, &path) => Seen::Kept,
        Some(_) => Seen::Conflicting,
    };
    match seen {
        Seen::New => {
            map.insert(kmer.to_string(), path);
        }
        Seen::Kept => {}
        Seen::Conflicting => {
            // two placements for one k-mer: poison it, and its mirror
            map.insert(kmer.to_string(), Vec::new());
            if map.contains_key(&rc) {
                map.insert(rc, Vec::new());
            }
        }
    }
}

/// Scan one graph for unique k-mers. Workers enumerate independently and
/// serialize only on the dedup map.
fn observe_unique_kmers(
    graph: &VariationGraph,
    index: &KmerIndex,
    k: usize,
    edge_max: usize,
) -> UniqueKmerPaths {
    let walker = GraphWalker::new(graph);
    let unique: Mutex<UniqueKmerPaths> = Mutex::new(HashMap::new());

    let mut node_ids: Vec<usize> = graph.nodes.keys().copied().collect();
    node_ids.sort_unstable();

    node_ids.par_iter().for_each(|&id| {
        enumerate_kmers_from_node(graph, &walker, id, k, edge_max, &mut |kmer, occurrence| {
            observe(graph, index, k, kmer, occurrence, &unique);
        });
    });

    unique.into_inner().unwrap()
}

/// Pinch the two graphs together on every k-mer unique to both
pub fn pinch_unique_kmers(
    a: &EmbeddedGraph,
    index_a: &KmerIndex,
    b: &EmbeddedGraph,
    index_b: &KmerIndex,
    k: usize,
    edge_max: usize,
    threads: &mut PinchThreadSet,
) -> Result<()> {
    let unique_a = observe_unique_kmers(a.graph(), index_a, k, edge_max);
    let unique_b = observe_unique_kmers(b.graph(), index_b, k, edge_max);
    info!(
        "{} unique {}-mers in {}, {} in {}",
        unique_a.len(),
        k,
        a.name(),
        unique_b.len(),
        b.name()
    );

    let mut kmers: Vec<&String> = unique_a.keys().collect();
    kmers.sort();

    let mut pinched = 0usize;
    for kmer in kmers {
        let path_a = &unique_a[kmer];
        if path_a.is_empty() {
            continue;
        }

        // same-strand match first, then the reverse complement walked
        // backwards through the peer graph
        let path_b = match unique_b.get(kmer.as_str()) {
            Some(path) if !path.is_empty() => path.clone(),
            _ => {
                let rc = reverse_complement_str(kmer);
                match unique_b.get(&rc) {
                    Some(path) if !path.is_empty() => match b.graph().reverse_path(path) {
                        Some(reversed) => reversed,
                        None => continue,
                    },
                    _ => continue,
                }
            }
        };

        pinch_paths(a, path_a, b, &path_b, threads, kmer)?;
        pinched += 1;
    }

    if pinched == 0 {
        warn!(
            "{} and {} share no unique {}-mers; nothing to pinch on k-mers",
            a.name(),
            b.name(),
            k
        );
    } else {
        info!("pinched {} shared unique {}-mers", pinched, k);
    }
    Ok(())
}
