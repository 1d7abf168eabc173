use crate::geometry::Vector2;

use super::{Atom, EdgeId, RingId, VertexId};

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub atom: Atom,
    /// Spanning-tree parent; `None` for the root of a fragment.
    pub parent: Option<VertexId>,
    /// Children in creation order, ring-closure partners included.
    pub children: Vec<VertexId>,
    pub spanning_tree_children: Vec<VertexId>,
    /// Neighbours in the order their edges were created.
    pub neighbours: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
    pub position: Vector2,
    pub previous_position: Vector2,
    pub positioned: bool,
    /// Relative angle this vertex was placed at; `0.0` means unset.
    pub angle: f64,
    /// Neighbours in the order the input lists them, which is the frame
    /// a chirality tag refers to.
    pub chirality_order: Vec<VertexId>,
    pub flippable: bool,
    pub flip_center: Option<VertexId>,
    pub flip_rings: Vec<RingId>,
}

impl Vertex {
    pub fn new(id: VertexId, atom: Atom) -> Self {
        Self {
            id,
            atom,
            parent: None,
            children: Vec::new(),
            spanning_tree_children: Vec::new(),
            neighbours: Vec::new(),
            edges: Vec::new(),
            position: Vector2::ZERO,
            previous_position: Vector2::ZERO,
            positioned: false,
            angle: 0.0,
            chirality_order: Vec::new(),
            flippable: false,
            flip_center: None,
            flip_rings: Vec::new(),
        }
    }

    pub fn neighbour_count(&self) -> usize {
        self.neighbours.len()
    }

    /// Terminal atoms have a single bond, or carry a folded label.
    pub fn is_terminal(&self) -> bool {
        self.atom.has_attached_pseudo_elements() || self.neighbours.len() <= 1
    }

    pub fn neighbours_except(&self, exclude: VertexId) -> Vec<VertexId> {
        self.neighbours
            .iter()
            .copied()
            .filter(|&n| n != exclude)
            .collect()
    }

    /// Parent and spanning-tree children, minus `exclude`.
    pub fn spanning_tree_neighbours(&self, exclude: Option<VertexId>) -> Vec<VertexId> {
        self.spanning_tree_children
            .iter()
            .copied()
            .chain(self.parent)
            .filter(|&n| Some(n) != exclude)
            .collect()
    }

    /// Direction of the bond this vertex was reached through.
    pub fn incoming_angle(&self) -> f64 {
        (self.position - self.previous_position).angle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanning_neighbours_skip_excluded() {
        let mut v = Vertex::new(1, Atom::hydrogen());
        v.parent = Some(0);
        v.spanning_tree_children = vec![2, 3];
        assert_eq!(v.spanning_tree_neighbours(Some(2)), vec![3, 0]);
        assert_eq!(v.spanning_tree_neighbours(None), vec![2, 3, 0]);
    }
}
