pub mod draw;
pub mod element;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod options;
pub mod rings;
pub mod smiles;

pub use draw::{DrawCommand, TextDirection};
pub use error::LayoutError;
pub use geometry::{Line, Vector2};
pub use graph::{Atom, Descriptor, Edge, Graph, PseudoElement, Ring, RingConnection, Vertex, Wedge};
pub use layout::{overlap_score, Layout, OverlapScore, Relaxation};
pub use options::{AtomVisualization, Options, Theme};
pub use smiles::{parse_smiles, ParseTree, SmilesError};

/// Parses `smiles` and lays it out in one go.
pub fn layout_smiles(smiles: &str, options: Options) -> Result<Layout, LayoutError> {
    let tree = parse_smiles(smiles)?;
    Layout::new(&tree, options)
}

#[cfg(test)]
mod tests;
