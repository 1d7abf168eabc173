use super::{Graph, RingId, VertexId};

/// How two rings touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// One shared bond.
    Fused,
    /// One shared atom.
    Spiro,
    /// Anything that forces the two rings into one bridged system.
    Bridged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConnection {
    pub id: usize,
    pub first: RingId,
    pub second: RingId,
    /// Shared vertices, in the order they appear in `first`.
    pub vertices: Vec<VertexId>,
}

impl RingConnection {
    pub fn new(id: usize, first: RingId, second: RingId, vertices: Vec<VertexId>) -> Self {
        Self {
            id,
            first,
            second,
            vertices,
        }
    }

    pub fn involves(&self, ring: RingId) -> bool {
        self.first == ring || self.second == ring
    }

    pub fn joins(&self, a: RingId, b: RingId) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }

    pub fn other(&self, ring: RingId) -> RingId {
        if self.first == ring {
            self.second
        } else {
            self.first
        }
    }

    /// Replaces whichever ring is not `keep` with `ring`.
    pub fn update_other(&mut self, ring: RingId, keep: RingId) {
        if self.first == keep {
            self.second = ring;
        } else {
            self.first = ring;
        }
    }

    pub fn is_bridge(&self, graph: &Graph) -> bool {
        if self.vertices.len() > 2 {
            return true;
        }
        if self
            .vertices
            .iter()
            .any(|&v| graph.vertices[v].atom.rings.len() > 2)
        {
            return true;
        }
        self.vertices.len() == 2 && graph.edge_between(self.vertices[0], self.vertices[1]).is_none()
    }

    pub fn kind(&self, graph: &Graph) -> ConnectionKind {
        if self.is_bridge(graph) {
            ConnectionKind::Bridged
        } else if self.vertices.len() == 1 {
            ConnectionKind::Spiro
        } else {
            ConnectionKind::Fused
        }
    }
}
