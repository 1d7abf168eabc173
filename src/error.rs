use std::fmt;

use crate::graph::VertexId;
use crate::smiles::SmilesError;

/// Errors that abort the layout of a single molecule.
///
/// Geometric heuristics never produce errors; only malformed input does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The SMILES front-end rejected the input.
    Smiles(SmilesError),
    /// The parse tree contains no atoms.
    EmptyGraph,
    /// A ring-closure marker was opened but never closed.
    UnclosedRing { id: u16 },
    /// The two ends of a ring closure specify different bond symbols.
    RingBondConflict { id: u16 },
    /// A chirality tag sits on an atom whose neighbour count has no
    /// tetrahedral interpretation.
    UnsupportedChirality { vertex: VertexId, neighbours: usize },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smiles(e) => write!(f, "{}", e),
            Self::EmptyGraph => write!(f, "molecule has no atoms"),
            Self::UnclosedRing { id } => write!(f, "unclosed ring {}", id),
            Self::RingBondConflict { id } => {
                write!(f, "conflicting bond types on ring closure {}", id)
            }
            Self::UnsupportedChirality { vertex, neighbours } => write!(
                f,
                "chirality on atom {} with {} neighbours is not supported",
                vertex, neighbours
            ),
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Smiles(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SmilesError> for LayoutError {
    fn from(e: SmilesError) -> Self {
        Self::Smiles(e)
    }
}
