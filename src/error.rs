use thiserror::Error;

/// Everything that can abort a merge run.
///
/// Input and usage problems are detected before any pinching starts;
/// the structural errors surface from the merge phases and terminate
/// the process with a nonzero exit code. Nothing is retried and no
/// partial graph is written.
#[derive(Debug, Error)]
pub enum CoreGraphError {
    /// An input graph could not be opened or parsed
    #[error("failed to read input graph {path}: {reason}")]
    InputRead { path: String, reason: String },

    /// A shared path name spells sequences of different total length
    #[error("path '{name}' has length {len_a} in one graph but {len_b} in the other")]
    PathLengthMismatch {
        name: String,
        len_a: usize,
        len_b: usize,
    },

    /// Two copies of a shared path did not end at the same base
    #[error("path '{name}' is misaligned: iterators did not finish together")]
    PathMisalignment { name: String },

    /// A mapping inside a merged path carries a non-perfect edit
    #[error("mapping on node {node_id} in path '{path}' is not a perfect match")]
    NonPerfectMapping { path: String, node_id: usize },

    /// A mapping refers to a node the embedding has never seen
    #[error("no embedding entry for node {node_id}")]
    MissingEmbedding { node_id: usize },

    /// Invalid command line
    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, CoreGraphError>;
