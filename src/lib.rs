//! coregraph merges two variation graphs into a single "core" graph.
//!
//! Each input graph is embedded into a set of pinch threads: one thread
//! per node carrying its bases, plus a two-base staple thread per edge
//! welding the node ends it attaches. Bases proven equivalent, either by
//! a named path present in both inputs or by a k-mer unique to both, are
//! pinched into common blocks; the quotient is then read back out as a
//! variation graph in which the shared segments have fused.

pub mod coords;
pub mod embed;
pub mod error;
pub mod gfa;
pub mod kmer;
pub mod kmer_pinch;
pub mod merge;
pub mod path_pinch;
pub mod pinch;
pub mod pos;
pub mod readout;
pub mod variation_graph;

pub use error::{CoreGraphError, Result};
pub use merge::{merge_graphs, MergeOptions};
