//! GFA 1.0 reader and writer.
//!
//! The merger speaks the subset of GFA that variation graphs need: S
//! records with literal sequence, L records with trivial (`0M` or `*`)
//! overlaps, and P records whose steps visit whole nodes. Node names must
//! be decimal integers.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path as FsPath;

use crate::error::{CoreGraphError, Result};
use crate::variation_graph::{Edge, Mapping, Path, VariationGraph};

fn bad_record(path: &str, line_no: usize, reason: &str) -> CoreGraphError {
    CoreGraphError::InputRead {
        path: path.to_string(),
        reason: format!("line {}: {}", line_no, reason),
    }
}

/// Load a variation graph from a GFA file
pub fn read_gfa(path: &str) -> Result<VariationGraph> {
    let file = File::open(FsPath::new(path)).map_err(|e| CoreGraphError::InputRead {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    parse_gfa(BufReader::new(file), path)
}

/// Parse GFA records from a reader. `label` names the source in errors.
pub fn parse_gfa<R: BufRead>(reader: R, label: &str) -> Result<VariationGraph> {
    let mut graph = VariationGraph::new();
    // P records may reference nodes declared later, so they are replayed
    // after all S records are in.
    let mut pending_paths: Vec<(usize, String, String)> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| CoreGraphError::InputRead {
            path: label.to_string(),
            reason: e.to_string(),
        })?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        match fields[0] {
            "S" => {
                if fields.len() < 3 {
                    return Err(bad_record(label, line_no, "S record needs name and sequence"));
                }
                let id: usize = fields[1]
                    .parse()
                    .map_err(|_| bad_record(label, line_no, "S record name is not an integer"))?;
                if fields[2] == "*" || fields[2].is_empty() {
                    return Err(bad_record(label, line_no, "S record without literal sequence"));
                }
                graph.add_node(id, fields[2].as_bytes().to_vec());
            }
            "L" => {
                if fields.len() < 5 {
                    return Err(bad_record(label, line_no, "L record needs four link fields"));
                }
                let from: usize = fields[1]
                    .parse()
                    .map_err(|_| bad_record(label, line_no, "L record from-name is not an integer"))?;
                let to: usize = fields[3]
                    .parse()
                    .map_err(|_| bad_record(label, line_no, "L record to-name is not an integer"))?;
                let from_start = match fields[2] {
                    "+" => false,
                    "-" => true,
                    _ => return Err(bad_record(label, line_no, "L record orientation must be + or -")),
                };
                let to_end = match fields[4] {
                    "+" => false,
                    "-" => true,
                    _ => return Err(bad_record(label, line_no, "L record orientation must be + or -")),
                };
                if let Some(overlap) = fields.get(5) {
                    if *overlap != "0M" && *overlap != "*" {
                        return Err(bad_record(label, line_no, "only 0M or * overlaps are supported"));
                    }
                }
                graph.add_edge(Edge::from_flags(from, to, from_start, to_end));
            }
            "P" => {
                if fields.len() < 3 {
                    return Err(bad_record(label, line_no, "P record needs a name and steps"));
                }
                pending_paths.push((line_no, fields[1].to_string(), fields[2].to_string()));
            }
            // headers and anything newer than GFA 1.0 are skipped
            _ => {}
        }
    }

    for (line_no, name, steps) in pending_paths {
        let mut path = Path::new(name);
        for step in steps.split(',') {
            if step.is_empty() {
                continue;
            }
            let (id_str, orient) = step.split_at(step.len() - 1);
            let is_reverse = match orient {
                "+" => false,
                "-" => true,
                _ => return Err(bad_record(label, line_no, "path step must end in + or -")),
            };
            let id: usize = id_str
                .parse()
                .map_err(|_| bad_record(label, line_no, "path step name is not an integer"))?;
            let node_length = graph
                .node_length(id)
                .ok_or_else(|| bad_record(label, line_no, "path step visits an unknown node"))?;
            path.mappings.push(Mapping::full_node(id, node_length, is_reverse));
        }
        graph.add_path(path);
    }

    Ok(graph)
}

/// Write a variation graph as GFA 1.0
pub fn write_gfa<W: Write>(graph: &VariationGraph, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "H\tVN:Z:1.0")?;

    let mut ids: Vec<usize> = graph.nodes.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        let node = &graph.nodes[&id];
        writeln!(writer, "S\t{}\t{}", id, String::from_utf8_lossy(&node.sequence))?;
    }

    let mut edges: Vec<Edge> = graph.edges.iter().copied().collect();
    edges.sort_unstable();
    for edge in edges {
        writeln!(
            writer,
            "L\t{}\t{}\t{}\t{}\t0M",
            edge.from.node_id(),
            edge.from.orientation_char(),
            edge.to.node_id(),
            edge.to.orientation_char()
        )?;
    }

    for path in &graph.paths {
        let steps = path
            .mappings
            .iter()
            .map(|m| {
                format!(
                    "{}{}",
                    m.position.node_id,
                    if m.position.is_reverse { '-' } else { '+' }
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "P\t{}\t{}\t*", path.name, steps)?;
    }

    Ok(())
}
