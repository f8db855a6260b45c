//! Error types for bitvote

use thiserror::Error;

/// Bitvote error type
#[derive(Debug, Error)]
pub enum BitvoteError {
    /// A width does not match the declared layout of a layer or state
    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Network that cannot compute anything (zero widths, dangling wiring)
    #[error("Degenerate network: {0}")]
    DegenerateNetwork(String),

    /// Layer id not present in the network
    #[error("Unknown layer: {0}")]
    UnknownLayer(usize),

    /// Word index outside a state
    #[error("Word {index} out of range for width {width}")]
    WordOutOfRange { index: usize, width: usize },

    /// Input injection into a layer that reads from another layer
    #[error("Layer {0} is not externally fed")]
    NotExternal(usize),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BitvoteError>;

impl BitvoteError {
    pub(crate) fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected,
            actual,
        }
    }
}
