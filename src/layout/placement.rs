//! Depth-first coordinate assignment.
//!
//! Each connected component is entered at one vertex and grown outwards:
//! chain atoms are placed by angular branching rules, rings are inscribed as
//! regular polygons, fused and spiro neighbours are placed from the ring that
//! reaches them first, and bridged rings are handed to the force relaxation.

use std::f64::consts::PI;

use tracing::{debug, trace};

use crate::geometry::{self, Vector2};
use crate::graph::{Graph, RingId, VertexId};
use crate::smiles::BondSymbol;

use super::force::{self, ForceConfig, Relaxation};

/// 60 degrees, the default zig-zag turn.
const TURN: f64 = 1.0472;

pub(crate) struct Placer<'a> {
    graph: &'a mut Graph,
    bond_length: f64,
    force: ForceConfig,
    component: Vec<VertexId>,
    double_bond_config: Option<BondSymbol>,
    double_bond_config_count: usize,
    relaxations: Vec<Relaxation>,
}

impl<'a> Placer<'a> {
    pub fn new(graph: &'a mut Graph, bond_length: f64) -> Self {
        Self {
            graph,
            bond_length,
            force: ForceConfig::new(bond_length),
            component: Vec::new(),
            double_bond_config: None,
            double_bond_config_count: 0,
            relaxations: Vec::new(),
        }
    }

    /// Places every component, laying fragments out left to right.
    pub fn place_all(mut self) -> Vec<Relaxation> {
        let components = self.graph.components();
        let mut right_edge: Option<(f64, f64)> = None;
        for component in components {
            self.place_component(component.clone());
            let Some(bounds) = self.bounds(&component) else {
                continue;
            };
            match right_edge {
                None => right_edge = Some((bounds.1.x, (bounds.0.y + bounds.1.y) / 2.0)),
                Some((max_x, mid_y)) => {
                    let offset = Vector2::new(
                        max_x + self.bond_length - bounds.0.x,
                        mid_y - (bounds.0.y + bounds.1.y) / 2.0,
                    );
                    self.translate(&component, offset);
                    right_edge = Some((bounds.1.x + offset.x, mid_y));
                }
            }
        }
        self.relaxations
    }

    fn place_component(&mut self, component: Vec<VertexId>) {
        self.component = component;
        self.double_bond_config = None;
        self.double_bond_config_count = 0;
        let Some(start) = self.start_vertex() else {
            return;
        };
        trace!(start, "placing component");
        self.create_next_bond(start, None, 0.0, false);

        // Anything the walk could not reach from the start vertex.
        loop {
            let pending = self.component.iter().copied().find(|&v| {
                let vertex = &self.graph.vertices[v];
                vertex.atom.is_drawn && !vertex.positioned
            });
            let Some(v) = pending else { break };
            let anchor = self.graph.vertices[v]
                .neighbours
                .iter()
                .copied()
                .find(|&n| {
                    self.graph.vertices[n].positioned && self.graph.vertices[n].atom.is_drawn
                });
            match anchor {
                Some(p) => {
                    let angle = self.graph.vertices[p].incoming_angle() + TURN;
                    self.create_next_bond(v, Some(p), angle, false);
                }
                None => {
                    let center = self.graph.center_of_mass(&self.component);
                    let vertex = &mut self.graph.vertices[v];
                    vertex.previous_position = center;
                    vertex.position = center + Vector2::new(self.bond_length, 0.0);
                    vertex.positioned = true;
                }
            }
            if !self.graph.vertices[v].positioned {
                self.graph.vertices[v].positioned = true;
            }
        }
    }

    /// A boundary vertex of a bridged ring if there is one, else the first
    /// drawn vertex.
    fn start_vertex(&self) -> Option<VertexId> {
        let drawn = |v: &VertexId| self.graph.vertices[*v].atom.is_drawn;
        let bridged = |v: &VertexId| self.graph.vertices[*v].atom.bridged_ring.is_some();
        self.component
            .iter()
            .copied()
            .filter(drawn)
            .find(|v| bridged(v) && self.graph.vertices[*v].atom.original_rings.len() == 1)
            .or_else(|| self.component.iter().copied().filter(drawn).find(bridged))
            .or_else(|| self.component.iter().copied().find(drawn))
    }

    fn bounds(&self, component: &[VertexId]) -> Option<(Vector2, Vector2)> {
        let mut iter = component
            .iter()
            .map(|&v| &self.graph.vertices[v])
            .filter(|v| v.positioned && v.atom.is_drawn)
            .map(|v| v.position);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| {
            (
                Vector2::new(min.x.min(p.x), min.y.min(p.y)),
                Vector2::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }

    fn translate(&mut self, component: &[VertexId], offset: Vector2) {
        for &v in component {
            let vertex = &mut self.graph.vertices[v];
            vertex.position += offset;
            vertex.previous_position += offset;
        }
        for ring in self.graph.rings.iter_mut() {
            if ring.members.first().map_or(false, |m| component.contains(m)) {
                ring.center += offset;
            }
        }
    }

    /// Positions `vertex` relative to `previous` and continues the walk.
    ///
    /// `angle` is the absolute bond direction for chain continuation;
    /// `origin_shortest` is set when the branch we came from is shorter than
    /// both branches leaving the previous vertex.
    fn create_next_bond(
        &mut self,
        vertex: VertexId,
        previous: Option<VertexId>,
        angle: f64,
        origin_shortest: bool,
    ) {
        if self.graph.vertices[vertex].positioned {
            return;
        }
        let config_set = self.track_double_bond_config(vertex, previous);
        let bl = self.bond_length;

        match previous {
            None => {
                let v = &mut self.graph.vertices[vertex];
                v.previous_position = Vector2::new(bl, 0.0).rotated(geometry::to_rad(-60.0));
                v.position = Vector2::new(bl, 0.0);
                v.angle = geometry::to_rad(-60.0);
                // A bridged ring start is left to the force relaxation.
                v.positioned = v.atom.bridged_ring.is_none();
            }
            Some(p) if !self.graph.vertices[p].atom.rings.is_empty() => {
                let position = self.position_from_ring(vertex, p);
                let prev = self.graph.vertices[p].position;
                let v = &mut self.graph.vertices[vertex];
                v.previous_position = prev;
                v.position = position;
                v.positioned = true;
            }
            Some(p) => {
                let prev = self.graph.vertices[p].position;
                let v = &mut self.graph.vertices[vertex];
                v.position = prev + Vector2::new(bl, 0.0).rotated(angle);
                v.previous_position = prev;
                v.positioned = true;
            }
        }

        let atom = &self.graph.vertices[vertex].atom;
        if let Some(ring) = atom.bridged_ring.or_else(|| atom.rings.first().copied()) {
            if !self.graph.rings[ring].positioned {
                let v = &self.graph.vertices[vertex];
                let radius = self.graph.rings[ring].circumradius(bl);
                let center = v.position + (v.position - v.previous_position).normalized() * radius;
                self.create_ring(ring, center, Some(vertex), None);
            }
            return;
        }

        let neighbours: Vec<VertexId> = self.graph.vertices[vertex]
            .neighbours
            .iter()
            .copied()
            .filter(|&n| Some(n) != previous && self.graph.vertices[n].atom.is_drawn)
            .collect();
        let previous_angle = self.graph.vertices[vertex].incoming_angle();

        match neighbours.len() {
            0 => {}
            1 => self.branch_one(
                vertex,
                previous,
                neighbours[0],
                previous_angle,
                config_set,
                origin_shortest,
            ),
            2 => self.branch_two(vertex, previous, [neighbours[0], neighbours[1]], previous_angle),
            3 => self.branch_three(
                vertex,
                previous,
                [neighbours[0], neighbours[1], neighbours[2]],
                previous_angle,
            ),
            4 => self.branch_four(vertex, &neighbours, previous_angle),
            _ => {
                let k = neighbours.len();
                for (i, &n) in neighbours.iter().enumerate() {
                    let a = -PI + (i + 1) as f64 * 2.0 * PI / (k + 1) as f64;
                    self.graph.vertices[n].angle = a;
                    self.create_next_bond(n, Some(vertex), previous_angle + a, false);
                }
            }
        }
    }

    /// Counts `/` and `\` bonds along the walk and records the first one of
    /// each pair as the reference configuration.
    fn track_double_bond_config(&mut self, vertex: VertexId, previous: Option<VertexId>) -> bool {
        let Some(p) = previous else { return false };
        let Some(e) = self.graph.edge_between(vertex, p) else {
            return false;
        };
        let bond = self.graph.edges[e].bond;
        if !matches!(bond, BondSymbol::Up | BondSymbol::Down) {
            return false;
        }
        self.double_bond_config_count += 1;
        if self.double_bond_config_count % 2 == 0 || self.double_bond_config.is_some() {
            return false;
        }
        let mut config = bond;
        if self.graph.vertices[p].parent.is_none()
            && self.graph.vertices[vertex].atom.branch_bond.is_some()
        {
            config = flip(config);
        }
        self.double_bond_config = Some(config);
        true
    }

    /// Leaves a ring atom pointing away from its ring neighbours. A fusion
    /// atom instead continues the shared bond straight on.
    fn position_from_ring(&self, vertex: VertexId, previous: VertexId) -> Vector2 {
        let bl = self.bond_length;
        let prev = &self.graph.vertices[previous];
        if prev.atom.bridged_ring.is_none() && prev.atom.rings.len() > 1 {
            let joined = prev.neighbours.iter().copied().find(|&n| {
                let other = &self.graph.vertices[n];
                n != vertex
                    && other.positioned
                    && prev.atom.rings.iter().all(|r| other.atom.rings.contains(r))
            });
            if let Some(j) = joined {
                return self.graph.vertices[j].position.rotated_around(PI, prev.position);
            }
        }
        let mut sum = Vector2::ZERO;
        for &n in &prev.neighbours {
            let other = &self.graph.vertices[n];
            if other.positioned && self.graph.are_in_same_ring(n, previous) {
                sum += other.position - prev.position;
            }
        }
        let mut dir = (-sum).normalized();
        if dir == Vector2::ZERO {
            let ring = prev.atom.rings[0];
            dir = (prev.position - self.graph.rings[ring].center).normalized();
        }
        if dir == Vector2::ZERO {
            dir = geometry::nudge(vertex, 1.0).normalized();
        }
        prev.position + dir * bl
    }

    fn branch_one(
        &mut self,
        vertex: VertexId,
        previous: Option<VertexId>,
        next: VertexId,
        previous_angle: f64,
        config_set: bool,
        origin_shortest: bool,
    ) {
        let bond_in = previous
            .and_then(|p| self.graph.edge_between(p, vertex))
            .map(|e| self.graph.edges[e].bond);
        let bond_out = self
            .graph
            .edge_between(vertex, next)
            .map(|e| self.graph.edges[e].bond);
        let triple = bond_in == Some(BondSymbol::Triple) || bond_out == Some(BondSymbol::Triple);
        let cumulated = bond_in == Some(BondSymbol::Double)
            && bond_out == Some(BondSymbol::Double)
            && previous.map_or(false, |p| self.graph.vertices[p].atom.rings.is_empty());

        if triple || cumulated {
            if let Some(e) = previous.and_then(|p| self.graph.edge_between(p, vertex)) {
                self.graph.edges[e].center = true;
            }
            if let Some(e) = self.graph.edge_between(vertex, next) {
                self.graph.edges[e].center = true;
            }
            if cumulated {
                self.graph.vertices[vertex].atom.draw_explicit = true;
            }
            self.graph.vertices[next].angle = 0.0;
            self.create_next_bond(next, Some(vertex), previous_angle, false);
            return;
        }

        if previous.map_or(false, |p| !self.graph.vertices[p].atom.rings.is_empty()) {
            // Coming out of a ring: turn away from what is already drawn.
            let position = self.graph.vertices[vertex].position;
            let center = self.graph.center_of_mass(&self.component);
            let a = position + Vector2::from_angle(previous_angle + TURN) * self.bond_length;
            let b = position + Vector2::from_angle(previous_angle - TURN) * self.bond_length;
            let turn = if a.distance_sq(center) < b.distance_sq(center) {
                -TURN
            } else {
                TURN
            };
            self.graph.vertices[next].angle = turn;
            self.create_next_bond(next, Some(vertex), previous_angle + turn, false);
            return;
        }

        let mut a = self.graph.vertices[vertex].angle;
        if previous.map_or(false, |p| self.graph.vertices[p].neighbour_count() > 3) {
            a = if a > 0.0 {
                a.min(TURN)
            } else if a < 0.0 {
                a.max(-TURN)
            } else {
                TURN
            };
        } else if a == 0.0 {
            a = self.graph.last_angle(vertex);
            if a == 0.0 {
                a = TURN;
            }
        }

        if previous.is_some() && !config_set {
            if let Some(bond @ (BondSymbol::Up | BondSymbol::Down)) = bond_out {
                if let Some(config) = self.double_bond_config {
                    if config != bond {
                        a = -a;
                    }
                }
                self.double_bond_config = None;
            }
        }

        let turn = if origin_shortest { a } else { -a };
        self.graph.vertices[next].angle = turn;
        self.create_next_bond(next, Some(vertex), previous_angle + turn, false);
    }

    fn branch_two(
        &mut self,
        vertex: VertexId,
        previous: Option<VertexId>,
        neighbours: [VertexId; 2],
        previous_angle: f64,
    ) {
        let mut a = self.graph.vertices[vertex].angle;
        if a == 0.0 {
            a = TURN;
        }
        let [l, r] = neighbours;
        let depth_l = self.graph.tree_depth(l, Some(vertex));
        let depth_r = self.graph.tree_depth(r, Some(vertex));
        self.graph.vertices[l].atom.subtree_depth = depth_l;
        self.graph.vertices[r].atom.subtree_depth = depth_r;
        let depth_origin = match previous {
            Some(p) => {
                let d = self.graph.tree_depth(p, Some(vertex));
                self.graph.vertices[p].atom.subtree_depth = d;
                d
            }
            None => 0,
        };

        let carbon = |v: VertexId| self.graph.vertices[v].atom.element == "C";
        // Longer carbon chains take the cis slot.
        let (cis, trans) = if carbon(r) && !carbon(l) && depth_r > 1 && depth_l < 5 {
            (r, l)
        } else if !carbon(r) && carbon(l) && depth_l > 1 && depth_r < 5 {
            (l, r)
        } else if depth_l > depth_r {
            (r, l)
        } else {
            (l, r)
        };
        let origin_shortest = depth_origin < depth_l && depth_origin < depth_r;

        let (mut trans_angle, mut cis_angle) = (a, -a);
        if let Some(config) = self.double_bond_config {
            if self.graph.vertices[trans].atom.branch_bond == Some(config) {
                std::mem::swap(&mut trans_angle, &mut cis_angle);
            }
        }
        self.graph.vertices[trans].angle = trans_angle;
        self.graph.vertices[cis].angle = cis_angle;
        self.create_next_bond(trans, Some(vertex), previous_angle + trans_angle, origin_shortest);
        self.create_next_bond(cis, Some(vertex), previous_angle + cis_angle, origin_shortest);
    }

    fn branch_three(
        &mut self,
        vertex: VertexId,
        previous: Option<VertexId>,
        neighbours: [VertexId; 3],
        previous_angle: f64,
    ) {
        let depths: Vec<usize> = neighbours
            .iter()
            .map(|&n| self.graph.tree_depth(n, Some(vertex)))
            .collect();
        for (i, &n) in neighbours.iter().enumerate() {
            self.graph.vertices[n].atom.subtree_depth = depths[i];
        }
        // The deepest subtree goes straight on.
        let (s, l, r) = if depths[1] > depths[0] && depths[1] > depths[2] {
            (neighbours[1], neighbours[0], neighbours[2])
        } else if depths[2] > depths[0] && depths[2] > depths[1] {
            (neighbours[2], neighbours[0], neighbours[1])
        } else {
            (neighbours[0], neighbours[1], neighbours[2])
        };

        let ringless = |v: VertexId| self.graph.vertices[v].atom.rings.is_empty();
        let cross = previous.map_or(false, ringless)
            && ringless(s)
            && ringless(l)
            && ringless(r)
            && self.graph.tree_depth(l, Some(vertex)) == 1
            && self.graph.tree_depth(r, Some(vertex)) == 1
            && self.graph.tree_depth(s, Some(vertex)) > 1;

        let (sa, la, ra) = if cross {
            let own = self.graph.vertices[vertex].angle;
            if own >= 0.0 {
                (-own, geometry::to_rad(30.0), geometry::to_rad(90.0))
            } else {
                (-own, geometry::to_rad(-30.0), geometry::to_rad(-90.0))
            }
        } else {
            (0.0, geometry::to_rad(90.0), geometry::to_rad(-90.0))
        };
        for (n, a) in [(s, sa), (l, la), (r, ra)] {
            self.graph.vertices[n].angle = a;
            self.create_next_bond(n, Some(vertex), previous_angle + a, false);
        }
    }

    fn branch_four(&mut self, vertex: VertexId, neighbours: &[VertexId], previous_angle: f64) {
        let depths: Vec<usize> = neighbours
            .iter()
            .map(|&n| self.graph.tree_depth(n, Some(vertex)))
            .collect();
        for (i, &n) in neighbours.iter().enumerate() {
            self.graph.vertices[n].atom.subtree_depth = depths[i];
        }
        let mut order: Vec<VertexId> = neighbours.to_vec();
        let longest = (0..depths.len())
            .find(|&i| (0..depths.len()).all(|j| j == i || depths[i] > depths[j]))
            .unwrap_or(0);
        order.swap(0, longest);
        let angles = [
            geometry::to_rad(-36.0),
            geometry::to_rad(36.0),
            geometry::to_rad(-108.0),
            geometry::to_rad(108.0),
        ];
        for (&n, a) in order.iter().zip(angles) {
            self.graph.vertices[n].angle = a;
            self.create_next_bond(n, Some(vertex), previous_angle + a, false);
        }
    }

    /// Inscribes `ring` around `center` starting at `start`, then places
    /// neighbouring rings and ring substituents.
    fn create_ring(
        &mut self,
        ring: RingId,
        center: Vector2,
        start: Option<VertexId>,
        previous: Option<VertexId>,
    ) {
        if self.graph.rings[ring].positioned {
            return;
        }
        let bl = self.bond_length;
        let size = self.graph.rings[ring].size();
        let central = geometry::central_angle(size.max(1));
        self.graph.rings[ring].central_angle = central;
        let members = self.graph.rings[ring].members.clone();
        let Some(&first) = members.first() else {
            return;
        };
        let start_id = start.filter(|s| members.contains(s)).unwrap_or(first);
        let mut center = center;

        if self.graph.rings[ring].is_bridged {
            let relaxation = force::relax_bridged_ring(
                self.graph,
                ring,
                center,
                start_id,
                previous,
                &self.force,
            );
            self.relaxations.push(relaxation);
            center = self.centroid(&members);
            for sub in self.graph.rings[ring].rings.clone() {
                let sub_members = self.graph.rings[sub].members.clone();
                let sub_center = self.centroid(&sub_members);
                let sub_ring = &mut self.graph.rings[sub];
                sub_ring.center = sub_center;
                sub_ring.positioned = true;
            }
        } else {
            let radius = self.graph.rings[ring].circumradius(bl);
            let mut a = start.map_or(0.0, |s| (self.graph.vertices[s].position - center).angle());
            for v in self.graph.ring_walk(ring, start_id, previous) {
                let vertex = &mut self.graph.vertices[v];
                if !vertex.positioned {
                    vertex.position = center + Vector2::from_angle(a) * radius;
                }
                a += central;
                vertex.angle = a;
                vertex.positioned = true;
            }
            for (i, &m) in members.iter().enumerate() {
                let vertex = &mut self.graph.vertices[m];
                if !vertex.positioned {
                    vertex.position = center + Vector2::from_angle(i as f64 * central) * radius;
                    vertex.positioned = true;
                }
            }
        }

        self.graph.rings[ring].positioned = true;
        self.graph.rings[ring].center = center;
        trace!(ring, size, "placed ring");

        for neighbour in self.graph.ordered_ring_neighbours(ring) {
            if self.graph.rings[neighbour].positioned {
                continue;
            }
            let shared: Vec<VertexId> = self
                .graph
                .shared_vertices(ring, neighbour)
                .map(<[VertexId]>::to_vec)
                .unwrap_or_default();
            match shared.as_slice() {
                &[a, b] => {
                    let pos_a = self.graph.vertices[a].position;
                    let pos_b = self.graph.vertices[b].position;
                    let midpoint = Vector2::midpoint(pos_a, pos_b);
                    let apothem = self.graph.rings[neighbour].apothem(bl);
                    let [n0, n1] = Vector2::unit_normals(pos_a, pos_b);
                    let c0 = midpoint + n0 * apothem;
                    let c1 = midpoint + n1 * apothem;
                    let next_center = if center.distance_sq(c1) > center.distance_sq(c0) {
                        c1
                    } else {
                        c0
                    };
                    if (pos_a - next_center).clockwise(pos_b - next_center) == -1 {
                        self.create_ring(neighbour, next_center, Some(a), Some(b));
                    } else {
                        self.create_ring(neighbour, next_center, Some(b), Some(a));
                    }
                }
                &[a] => {
                    let pos_a = self.graph.vertices[a].position;
                    let radius = self.graph.rings[neighbour].circumradius(bl);
                    let mut dir = (pos_a - center).normalized();
                    if dir == Vector2::ZERO {
                        dir = geometry::nudge(neighbour, 1.0).normalized();
                    }
                    self.create_ring(neighbour, pos_a + dir * radius, Some(a), None);
                }
                _ => {}
            }
        }

        let all: Vec<VertexId> = self.graph.rings[ring].all_vertices().collect();
        for m in all {
            let neighbours = self.graph.vertices[m].neighbours.clone();
            for n in neighbours {
                let other = &mut self.graph.vertices[n];
                if other.positioned || !other.atom.is_drawn {
                    continue;
                }
                other.atom.is_connected_to_ring = true;
                self.create_next_bond(n, Some(m), 0.0, false);
            }
        }
    }

    fn centroid(&self, vertices: &[VertexId]) -> Vector2 {
        if vertices.is_empty() {
            return Vector2::ZERO;
        }
        let sum = vertices
            .iter()
            .fold(Vector2::ZERO, |acc, &v| acc + self.graph.vertices[v].position);
        sum / vertices.len() as f64
    }
}

fn flip(bond: BondSymbol) -> BondSymbol {
    match bond {
        BondSymbol::Up => BondSymbol::Down,
        BondSymbol::Down => BondSymbol::Up,
        other => other,
    }
}

/// Puts every hidden vertex one bond length away from its attachment,
/// opposite the attachment's other bonds.
pub(crate) fn position_hidden(graph: &mut Graph, bond_length: f64) {
    let mut placed_per_anchor = vec![0usize; graph.vertices.len()];
    for v in 0..graph.vertices.len() {
        if graph.vertices[v].atom.is_drawn || graph.vertices[v].positioned {
            continue;
        }
        let Some(&anchor) = graph.vertices[v].neighbours.first() else {
            graph.vertices[v].positioned = true;
            continue;
        };
        let anchor_pos = graph.vertices[anchor].position;
        let others: Vec<Vector2> = graph.vertices[anchor]
            .neighbours
            .iter()
            .filter(|&&n| n != v && graph.vertices[n].atom.is_drawn)
            .map(|&n| graph.vertices[n].position)
            .collect();
        let mut dir = if others.is_empty() {
            (anchor_pos - graph.vertices[anchor].previous_position).normalized()
        } else {
            let mean = others.iter().fold(Vector2::ZERO, |acc, &p| acc + p) / others.len() as f64;
            (anchor_pos - mean).normalized()
        };
        if dir == Vector2::ZERO {
            dir = Vector2::new(1.0, 0.0);
        }
        let turn = placed_per_anchor[anchor] as f64 * geometry::to_rad(30.0);
        placed_per_anchor[anchor] += 1;
        let vertex = &mut graph.vertices[v];
        vertex.previous_position = anchor_pos;
        vertex.position = anchor_pos + dir.rotated(turn) * bond_length;
        vertex.positioned = true;
    }
    debug!("positioned hidden vertices");
}
