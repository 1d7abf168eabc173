use crate::smiles::BondSymbol;

use super::{EdgeId, VertexId};

/// Stereo wedge drawn on a bond, seen from its stereocenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wedge {
    /// Solid wedge; the far atom points towards the viewer.
    Up,
    /// Hashed wedge; the far atom points away from the viewer.
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: VertexId,
    pub target: VertexId,
    pub bond: BondSymbol,
    pub wedge: Option<Wedge>,
    /// The stereocenter a wedge starts from.
    pub wedge_apex: Option<VertexId>,
    /// Draw all strands symmetric about the bond axis.
    pub center: bool,
}

impl Edge {
    pub fn new(id: EdgeId, source: VertexId, target: VertexId, bond: BondSymbol) -> Self {
        Self {
            id,
            source,
            target,
            bond,
            wedge: None,
            wedge_apex: None,
            center: false,
        }
    }

    pub fn weight(&self) -> u8 {
        self.bond.order()
    }

    pub fn other(&self, vertex: VertexId) -> VertexId {
        if self.source == vertex {
            self.target
        } else {
            self.source
        }
    }
}
