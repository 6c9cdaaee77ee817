//! Lock-step pinching of paths shared between two embedded graphs.
//!
//! Two copies of a path that spell the same sequence are walked in
//! parallel; every overlap between a mapping on one side and a mapping on
//! the other is translated into thread coordinates and pinched. Only
//! lengths are validated here; the sequences are asserted equal by the
//! path names, not checked base by base.

use std::collections::BTreeSet;

use log::{info, warn};

use crate::coords::{overlap_on_thread, relatively_reversed};
use crate::embed::EmbeddedGraph;
use crate::error::{CoreGraphError, Result};
use crate::pinch::PinchThreadSet;
use crate::variation_graph::{Mapping, VariationGraph};

/// Sum of the effective from-lengths of a path's mappings, enforcing
/// that every mapping is a perfect match
fn path_length(graph: &VariationGraph, name: &str, mappings: &[Mapping]) -> Result<usize> {
    let mut total = 0;
    for mapping in mappings {
        if !mapping.is_perfect() {
            return Err(CoreGraphError::NonPerfectMapping {
                path: name.to_string(),
                node_id: mapping.position.node_id,
            });
        }
        let node_length = graph
            .node_length(mapping.position.node_id)
            .ok_or(CoreGraphError::MissingEmbedding {
                node_id: mapping.position.node_id,
            })?;
        total += mapping.from_length(node_length);
    }
    Ok(total)
}

/// Pinch every path name shared by the two embedded graphs
pub fn pinch_with(
    a: &EmbeddedGraph,
    b: &EmbeddedGraph,
    threads: &mut PinchThreadSet,
) -> Result<()> {
    let ours: BTreeSet<&str> = a.graph().path_names().collect();
    let shared: Vec<&str> = b
        .graph()
        .path_names()
        .filter(|name| ours.contains(name))
        .collect();

    if shared.is_empty() {
        warn!(
            "{} and {} share no path names; nothing to pinch on paths",
            a.name(),
            b.name()
        );
        return Ok(());
    }

    for name in shared {
        let path_a = a.graph().path_by_name(name).expect("name came from a");
        let path_b = b.graph().path_by_name(name).expect("name came from b");

        let len_a = path_length(a.graph(), name, &path_a.mappings)?;
        let len_b = path_length(b.graph(), name, &path_b.mappings)?;
        if len_a != len_b {
            return Err(CoreGraphError::PathLengthMismatch {
                name: name.to_string(),
                len_a,
                len_b,
            });
        }

        info!("pinching path '{}' ({} bases)", name, len_a);
        pinch_paths(a, &path_a.mappings, b, &path_b.mappings, threads, name)?;
    }
    Ok(())
}

/// Walk two mapping lists covering the same bases and pinch every
/// overlap. Also driven by the k-mer merger with synthesized paths, so
/// the label is whatever names the pair in errors.
pub fn pinch_paths(
    a: &EmbeddedGraph,
    mappings_a: &[Mapping],
    b: &EmbeddedGraph,
    mappings_b: &[Mapping],
    threads: &mut PinchThreadSet,
    label: &str,
) -> Result<()> {
    let mut i = 0;
    let mut j = 0;
    let mut pos_a = 0usize;
    let mut pos_b = 0usize;

    while i < mappings_a.len() && j < mappings_b.len() {
        let ma = &mappings_a[i];
        let mb = &mappings_b[j];

        let node_len_a = a
            .graph()
            .node_length(ma.position.node_id)
            .ok_or(CoreGraphError::MissingEmbedding {
                node_id: ma.position.node_id,
            })?;
        let node_len_b = b
            .graph()
            .node_length(mb.position.node_id)
            .ok_or(CoreGraphError::MissingEmbedding {
                node_id: mb.position.node_id,
            })?;
        let end_a = pos_a + ma.from_length(node_len_a);
        let end_b = pos_b + mb.from_length(node_len_b);

        let overlap_start = pos_a.max(pos_b);
        let overlap_end = end_a.min(end_b);
        if overlap_end > overlap_start {
            let overlap_length = overlap_end - overlap_start;

            let entry_a = a.entry(ma.position.node_id)?;
            let entry_b = b.entry(mb.position.node_id)?;
            let (off_a, _) = overlap_on_thread(
                &entry_a,
                ma.position.offset,
                ma.position.is_reverse,
                overlap_start,
                pos_a,
                overlap_length,
            );
            let (off_b, _) = overlap_on_thread(
                &entry_b,
                mb.position.offset,
                mb.position.is_reverse,
                overlap_start,
                pos_b,
                overlap_length,
            );
            let reversed = relatively_reversed(
                entry_a.is_reverse,
                ma.position.is_reverse,
                entry_b.is_reverse,
                mb.position.is_reverse,
            );

            threads.pinch(
                entry_a.thread,
                entry_b.thread,
                off_a as usize,
                off_b as usize,
                overlap_length,
                !reversed,
            );
        }

        // advance whichever mapping ends first; both when they tie
        let min_end = end_a.min(end_b);
        if end_a == min_end {
            i += 1;
            pos_a = end_a;
        }
        if end_b == min_end {
            j += 1;
            pos_b = end_b;
        }
    }

    if i != mappings_a.len() || j != mappings_b.len() {
        return Err(CoreGraphError::PathMisalignment {
            name: label.to_string(),
        });
    }
    Ok(())
}
