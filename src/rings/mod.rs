//! Ring perception: SSSR rings become [`Ring`]s, touching rings get
//! [`RingConnection`]s, and every group of bridge-connected rings is merged
//! into one synthetic bridged ring for placement.

pub mod sssr;

use tracing::debug;

use crate::graph::{ConnectionKind, Graph, Ring, RingConnection, RingId, VertexId};

impl Graph {
    /// Perceives rings, classifies their connections and merges bridged
    /// systems. The pre-merge state is kept for [`Graph::restore_rings`].
    pub(crate) fn perceive_rings(&mut self) {
        for members in sssr::find_rings(self) {
            let id = self.rings.len();
            let mut ring = Ring::new(id, members);
            ring.closure = self.closure_of(&ring.members);
            for &v in &ring.members {
                self.vertices[v].atom.rings.push(id);
            }
            self.rings.push(ring);
            self.active_rings.push(id);
        }

        for i in 0..self.rings.len() {
            for j in i + 1..self.rings.len() {
                let shared: Vec<VertexId> = self.rings[i]
                    .members
                    .iter()
                    .copied()
                    .filter(|&v| self.rings[j].contains(v))
                    .collect();
                if !shared.is_empty() {
                    self.add_ring_connection(i, j, shared);
                }
            }
        }

        for id in 0..self.rings.len() {
            self.rings[id].neighbours = self.ring_neighbours(id);
            let anchor = self.rings[id].members[0];
            self.vertices[anchor].atom.anchored_rings.push(id);
        }

        for c in 0..self.ring_connections.len() {
            let (first, second) = (self.ring_connections[c].first, self.ring_connections[c].second);
            match self.ring_connections[c].kind(self) {
                ConnectionKind::Fused => {
                    self.rings[first].is_fused = true;
                    self.rings[second].is_fused = true;
                }
                ConnectionKind::Spiro => {
                    self.rings[first].is_spiro = true;
                    self.rings[second].is_spiro = true;
                }
                ConnectionKind::Bridged => {}
            }
        }

        self.original_rings = self.active_rings.clone();
        self.original_ring_connections = self.ring_connections.clone();
        for vertex in &mut self.vertices {
            vertex.atom.original_rings = vertex.atom.rings.clone();
        }

        while let Some(id) = self
            .active_rings
            .iter()
            .copied()
            .filter(|&r| !self.rings[r].is_bridged && self.is_part_of_bridged_ring(r))
            .last()
        {
            let involved = self.bridged_ring_rings(id);
            self.create_bridged_ring(&involved);
            self.active_rings.retain(|r| !involved.contains(r));
        }

        debug!(
            rings = self.original_rings.len(),
            active = self.active_rings.len(),
            "perceived rings"
        );
    }

    /// Brings back the perceived rings after placement, so that ring sizes
    /// and aromaticity refer to the real rings again.
    pub(crate) fn restore_rings(&mut self) {
        self.active_rings = self.original_rings.clone();
        self.ring_connections = self.original_ring_connections.clone();
        for vertex in &mut self.vertices {
            vertex.atom.rings = vertex.atom.original_rings.clone();
        }
    }

    /// All members of the ring were written in lowercase.
    pub fn is_ring_aromatic(&self, ring: RingId) -> bool {
        let ring = &self.rings[ring];
        !ring.members.is_empty()
            && ring
                .members
                .iter()
                .all(|&v| self.vertices[v].atom.aromatic)
    }

    /// Shared vertices between two rings, if they touch.
    pub fn shared_vertices(&self, a: RingId, b: RingId) -> Option<&[VertexId]> {
        self.ring_connections
            .iter()
            .find(|c| c.joins(a, b))
            .map(|c| c.vertices.as_slice())
    }

    /// Neighbouring rings ordered by how many vertices they share,
    /// largest first.
    pub fn ordered_ring_neighbours(&self, ring: RingId) -> Vec<RingId> {
        let mut connections: Vec<&RingConnection> = self
            .ring_connections
            .iter()
            .filter(|c| c.involves(ring))
            .collect();
        connections.sort_by(|a, b| b.vertices.len().cmp(&a.vertices.len()));
        let mut out: Vec<RingId> = Vec::new();
        for c in connections {
            let other = c.other(ring);
            if !out.contains(&other) {
                out.push(other);
            }
        }
        out
    }

    fn add_ring_connection(&mut self, first: RingId, second: RingId, vertices: Vec<VertexId>) {
        let id = self.next_connection_id;
        self.next_connection_id += 1;
        self.ring_connections
            .push(RingConnection::new(id, first, second, vertices));
    }

    fn ring_neighbours(&self, ring: RingId) -> Vec<RingId> {
        let mut out = Vec::new();
        for c in self.ring_connections.iter().filter(|c| c.involves(ring)) {
            let other = c.other(ring);
            if !out.contains(&other) {
                out.push(other);
            }
        }
        out
    }

    /// The ring-closure edge among consecutive members, if the cycle has one.
    fn closure_of(&self, members: &[VertexId]) -> Option<(VertexId, VertexId)> {
        let n = members.len();
        (0..n)
            .map(|i| (members[i], members[(i + 1) % n]))
            .find(|&(a, b)| {
                self.vertices[a].parent != Some(b) && self.vertices[b].parent != Some(a)
            })
            .map(|(a, b)| (a.min(b), a.max(b)))
    }

    fn is_part_of_bridged_ring(&self, ring: RingId) -> bool {
        self.ring_connections
            .iter()
            .any(|c| c.involves(ring) && c.is_bridge(self))
    }

    fn is_bridge_between(&self, a: RingId, b: RingId) -> bool {
        self.ring_connections
            .iter()
            .any(|c| c.joins(a, b) && c.is_bridge(self))
    }

    /// Every ring reachable from `ring` through bridge connections.
    fn bridged_ring_rings(&self, ring: RingId) -> Vec<RingId> {
        fn visit(graph: &Graph, ring: RingId, involved: &mut Vec<RingId>) {
            involved.push(ring);
            for &n in &graph.rings[ring].neighbours {
                if n != ring && !involved.contains(&n) && graph.is_bridge_between(ring, n) {
                    visit(graph, n, involved);
                }
            }
        }
        let mut involved = Vec::new();
        visit(self, ring, &mut involved);
        involved
    }

    fn create_bridged_ring(&mut self, ids: &[RingId]) -> RingId {
        let mut vertices: Vec<VertexId> = Vec::new();
        let mut neighbours: Vec<RingId> = Vec::new();
        for &id in ids {
            self.rings[id].is_part_of_bridged = true;
            for &m in &self.rings[id].members {
                if !vertices.contains(&m) {
                    vertices.push(m);
                }
            }
            for &n in &self.rings[id].neighbours {
                if !ids.contains(&n) && !neighbours.contains(&n) {
                    neighbours.push(n);
                }
            }
        }

        let mut members = Vec::new();
        let mut leftovers = Vec::new();
        for &v in &vertices {
            let rings = &self.vertices[v].atom.rings;
            let in_set = rings.iter().filter(|r| ids.contains(r)).count();
            if rings.len() == 1 || in_set == 1 {
                members.push(v);
            } else {
                leftovers.push(v);
            }
        }

        // A vertex shared by several constituents still lies on the outer
        // boundary when one of its bonds belongs to a single ring.
        let mut insiders = Vec::new();
        for v in leftovers {
            let on_ring = self.vertices[v]
                .edges
                .iter()
                .any(|&e| self.edge_ring_count(e) == 1);
            if on_ring {
                self.vertices[v].atom.is_bridge_node = true;
                members.push(v);
            } else {
                self.vertices[v].atom.is_bridge = true;
                insiders.push(v);
            }
        }
        // In a cage every bond lies in two rings and nothing qualifies as
        // boundary, so the whole cage becomes the boundary.
        if members.is_empty() {
            for &v in &insiders {
                let atom = &mut self.vertices[v].atom;
                atom.is_bridge = false;
                atom.is_bridge_node = true;
            }
            members = std::mem::take(&mut insiders);
        }

        let id = self.rings.len();
        let mut ring = Ring::new(id, members);
        ring.is_bridged = true;
        ring.insiders = insiders;
        ring.neighbours = neighbours.clone();
        ring.rings = ids.to_vec();
        let all: Vec<VertexId> = ring.all_vertices().collect();
        let anchor = ring.members.first().copied();
        self.rings.push(ring);
        self.active_rings.push(id);

        for v in all {
            let atom = &mut self.vertices[v].atom;
            atom.bridged_ring = Some(id);
            atom.rings.retain(|r| !ids.contains(r));
            atom.rings.push(id);
        }
        if let Some(anchor) = anchor {
            self.vertices[anchor].atom.anchored_rings.push(id);
        }

        self.ring_connections
            .retain(|c| !(ids.contains(&c.first) && ids.contains(&c.second)));

        for &n in &neighbours {
            let mut merged: Option<usize> = None;
            let mut i = 0;
            while i < self.ring_connections.len() {
                let c = &self.ring_connections[i];
                let touches = (c.first == n && ids.contains(&c.second))
                    || (c.second == n && ids.contains(&c.first));
                if !touches {
                    i += 1;
                    continue;
                }
                match merged {
                    None => {
                        self.ring_connections[i].update_other(id, n);
                        merged = Some(i);
                        i += 1;
                    }
                    Some(target) => {
                        let extra = self.ring_connections.remove(i).vertices;
                        let shared = &mut self.ring_connections[target].vertices;
                        for v in extra {
                            if !shared.contains(&v) {
                                shared.push(v);
                            }
                        }
                    }
                }
            }
            let ring = &mut self.rings[n];
            ring.neighbours.retain(|r| !ids.contains(r));
            if !ring.neighbours.contains(&id) {
                ring.neighbours.push(id);
            }
        }

        debug!(
            ring = id,
            constituents = ?ids,
            members = self.rings[id].members.len(),
            insiders = self.rings[id].insiders.len(),
            "merged bridged ring"
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn perceived(smiles: &str) -> Graph {
        let mut g = Graph::from_tree(&parse_smiles(smiles).unwrap(), false).unwrap();
        g.perceive_rings();
        g
    }

    #[test]
    fn ring_free_graph() {
        let g = perceived("CC(C)CCO");
        assert_eq!(g.rings().count(), 0);
        assert!(g.ring_connections().is_empty());
        assert!(g.vertices().iter().all(|v| v.atom.bridged_ring.is_none()));
    }

    #[test]
    fn benzene_ring() {
        let g = perceived("c1ccccc1");
        assert_eq!(g.rings().count(), 1);
        assert!(g.is_ring_aromatic(0));
        assert_eq!(g.ring(0).closure, Some((0, 5)));
        assert_eq!(g.vertex(0).atom.anchored_rings, vec![0]);
    }

    #[test]
    fn naphthalene_is_fused() {
        let g = perceived("c1ccc2ccccc2c1");
        assert_eq!(g.rings().count(), 2);
        assert_eq!(g.ring_connections().len(), 1);
        let c = &g.ring_connections()[0];
        assert_eq!(c.vertices.len(), 2);
        assert_eq!(c.kind(&g), ConnectionKind::Fused);
        assert!(g.rings().all(|r| r.is_fused && !r.is_bridged));
    }

    #[test]
    fn spiro_rings_are_not_merged() {
        let g = perceived("C1CCC2(CC1)CCCC2");
        assert_eq!(g.rings().count(), 2);
        assert_eq!(g.ring_connections()[0].kind(&g), ConnectionKind::Spiro);
        assert_eq!(g.ring_connections()[0].vertices, vec![3]);
        assert!(g.rings().all(|r| r.is_spiro));
    }

    #[test]
    fn norbornane_is_merged() {
        let g = perceived("C1CC2CC1CC2");
        let active: Vec<&Ring> = g.rings().collect();
        assert_eq!(active.len(), 1);
        let bridged = active[0];
        assert!(bridged.is_bridged);
        assert_eq!(bridged.rings.len(), 2);
        assert_eq!(bridged.members.len(), 6);
        assert_eq!(bridged.insiders, vec![3]);
        assert!(g.vertex(3).atom.is_bridge);
        assert!(g.vertex(2).atom.is_bridge_node);
        assert!(g.vertices().iter().all(|v| v.atom.rings == vec![bridged.id]));
        assert_eq!(g.vertex(3).atom.original_rings.len(), 2);
    }

    #[test]
    fn cage_has_no_insiders() {
        let g = perceived("C12C3C4C1C5C2C3C45");
        let bridged: Vec<&Ring> = g.rings().filter(|r| r.is_bridged).collect();
        assert_eq!(bridged.len(), 1);
        assert_eq!(bridged[0].members.len(), 8);
        assert!(bridged[0].insiders.is_empty());
        assert!(g.vertices().iter().all(|v| !v.atom.is_bridge));
    }

    #[test]
    fn restore_brings_back_constituents() {
        let mut g = perceived("C1CC2CC1CC2");
        g.restore_rings();
        assert_eq!(g.rings().count(), 2);
        assert!(g.rings().all(|r| r.is_part_of_bridged));
        assert_eq!(g.vertex(3).atom.rings.len(), 2);
    }

    #[test]
    fn fused_neighbour_is_redirected_to_bridged_ring() {
        // benzonorbornene
        let g = perceived("c1ccc2c(c1)C1CCC2C1");
        assert_eq!(g.rings().count(), 2);
        let bridged = g.rings().find(|r| r.is_bridged).unwrap();
        let benzene = g.rings().find(|r| !r.is_bridged).unwrap();
        assert_eq!(bridged.insiders, vec![10]);
        assert_eq!(g.ring_connections().len(), 1);
        assert!(g.ring_connections()[0].joins(bridged.id, benzene.id));
        assert_eq!(g.shared_vertices(bridged.id, benzene.id), Some(&[3, 4][..]));
        assert!(benzene.neighbours.contains(&bridged.id));
    }
}
