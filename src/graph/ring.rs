use std::f64::consts::PI;

use crate::geometry::{self, Vector2};

use super::{RingId, VertexId};

#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub id: RingId,
    /// Boundary vertices, in cycle order for perceived rings.
    pub members: Vec<VertexId>,
    /// Vertices enclosed by a bridged ring's boundary.
    pub insiders: Vec<VertexId>,
    /// Rings sharing at least one vertex with this one.
    pub neighbours: Vec<RingId>,
    pub positioned: bool,
    pub center: Vector2,
    /// Constituent rings of a bridged ring.
    pub rings: Vec<RingId>,
    pub is_bridged: bool,
    pub is_part_of_bridged: bool,
    pub is_spiro: bool,
    pub is_fused: bool,
    pub central_angle: f64,
    /// The ring-closure bond that spawned this cycle, when there is one.
    pub closure: Option<(VertexId, VertexId)>,
    pub flipped: bool,
}

impl Ring {
    pub fn new(id: RingId, members: Vec<VertexId>) -> Self {
        let central_angle = geometry::central_angle(members.len().max(1));
        Self {
            id,
            members,
            insiders: Vec::new(),
            neighbours: Vec::new(),
            positioned: false,
            center: Vector2::ZERO,
            rings: Vec::new(),
            is_bridged: false,
            is_part_of_bridged: false,
            is_spiro: false,
            is_fused: false,
            central_angle,
            closure: None,
            flipped: false,
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        self.members.contains(&vertex)
    }

    /// Interior angle at each polygon corner.
    pub fn angle(&self) -> f64 {
        PI - self.central_angle
    }

    pub fn circumradius(&self, bond_length: f64) -> f64 {
        geometry::poly_circumradius(bond_length, self.size())
    }

    pub fn apothem(&self, bond_length: f64) -> f64 {
        geometry::apothem_from_side_length(bond_length, self.size())
    }

    /// Members followed by insiders.
    pub fn all_vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.members.iter().chain(self.insiders.iter()).copied()
    }
}
