//! The molecular graph: vertices, edges, rings and ring connections stored in
//! flat arenas and addressed by dense integer ids.

mod atom;
mod edge;
mod ring;
mod ring_connection;
mod vertex;

use std::collections::{BTreeMap, HashMap};

use petgraph::unionfind::UnionFind;
use tracing::debug;

use crate::error::LayoutError;
use crate::geometry::Vector2;
use crate::smiles::{BondSymbol, Chirality, ParseNode, ParseTree};

pub use atom::{Atom, Descriptor, PseudoElement};
pub use edge::{Edge, Wedge};
pub use ring::Ring;
pub use ring_connection::{ConnectionKind, RingConnection};
pub use vertex::Vertex;

pub type VertexId = usize;
pub type EdgeId = usize;
pub type RingId = usize;

const UNFILLED: VertexId = usize::MAX;

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) edges: Vec<Edge>,
    edge_lookup: HashMap<(VertexId, VertexId), EdgeId>,
    /// Every ring ever created, indexed by id.
    pub(crate) rings: Vec<Ring>,
    /// Ids of the rings currently in play.
    pub(crate) active_rings: Vec<RingId>,
    pub(crate) ring_connections: Vec<RingConnection>,
    pub(crate) original_rings: Vec<RingId>,
    pub(crate) original_ring_connections: Vec<RingConnection>,
    pub(crate) next_connection_id: usize,
}

impl Graph {
    /// Builds the graph by a depth-first walk over the parse tree.
    ///
    /// With `isomeric`, hydrogens declared on chiral bracket atoms become
    /// explicit vertices so the stereocenter has four real neighbours.
    pub fn from_tree(tree: &ParseTree, isomeric: bool) -> Result<Self, LayoutError> {
        if tree.atom_count() == 0 {
            return Err(LayoutError::EmptyGraph);
        }
        let mut builder = Builder {
            graph: Graph::default(),
            isomeric,
            open_rings: BTreeMap::new(),
        };
        for root in &tree.fragments {
            builder.add_chain(root, None, false)?;
        }
        if let Some((&id, _)) = builder.open_rings.iter().next() {
            return Err(LayoutError::UnclosedRing { id });
        }
        let graph = builder.graph;
        debug!(
            vertices = graph.vertices.len(),
            edges = graph.edges.len(),
            "built molecular graph"
        );
        Ok(graph)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    pub fn ring(&self, id: RingId) -> &Ring {
        &self.rings[id]
    }

    /// The rings currently in play.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        self.active_rings.iter().map(move |&id| &self.rings[id])
    }

    pub fn ring_connections(&self) -> &[RingConnection] {
        &self.ring_connections
    }

    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.edge_lookup.get(&(a.min(b), a.max(b))).copied()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.vertices.iter().filter(|v| v.atom.element != "H").count()
    }

    pub(crate) fn add_edge(&mut self, a: VertexId, b: VertexId, bond: BondSymbol) -> EdgeId {
        let id = self.edges.len();
        self.edges.push(Edge::new(id, a, b, bond));
        self.edge_lookup.insert((a.min(b), a.max(b)), id);
        self.vertices[a].edges.push(id);
        self.vertices[b].edges.push(id);
        self.vertices[a].neighbours.push(b);
        self.vertices[b].neighbours.push(a);
        id
    }

    /// Connected components in ascending order of their smallest vertex.
    pub fn components(&self) -> Vec<Vec<VertexId>> {
        let mut uf = UnionFind::<usize>::new(self.vertices.len());
        for edge in &self.edges {
            uf.union(edge.source, edge.target);
        }
        let mut groups: BTreeMap<usize, Vec<VertexId>> = BTreeMap::new();
        let mut order = Vec::new();
        for v in 0..self.vertices.len() {
            let root = uf.find(v);
            let group = groups.entry(root).or_default();
            if group.is_empty() {
                order.push(root);
            }
            group.push(v);
        }
        order
            .into_iter()
            .filter_map(|root| groups.remove(&root))
            .collect()
    }

    pub fn are_in_same_ring(&self, a: VertexId, b: VertexId) -> bool {
        let rings_b = &self.vertices[b].atom.rings;
        self.vertices[a].atom.rings.iter().any(|r| rings_b.contains(r))
    }

    pub fn common_rings(&self, a: VertexId, b: VertexId) -> Vec<RingId> {
        let rings_b = &self.vertices[b].atom.rings;
        self.vertices[a]
            .atom
            .rings
            .iter()
            .copied()
            .filter(|r| rings_b.contains(r))
            .collect()
    }

    /// Number of active rings containing both ends of an edge.
    pub fn edge_ring_count(&self, edge: EdgeId) -> usize {
        let e = &self.edges[edge];
        self.common_rings(e.source, e.target).len()
    }

    /// Depth of the spanning subtree rooted at `vertex` when entered from
    /// `parent`.
    pub fn tree_depth(&self, vertex: VertexId, parent: Option<VertexId>) -> usize {
        let Some(parent) = parent else {
            return 0;
        };
        let mut max = 0;
        let mut stack = vec![(vertex, parent, 1usize)];
        while let Some((v, from, depth)) = stack.pop() {
            max = max.max(depth);
            for n in self.vertices[v].spanning_tree_neighbours(Some(from)) {
                stack.push((n, v, depth + 1));
            }
        }
        max
    }

    /// Every vertex reachable from `vertex` without passing through
    /// `parent`, in depth-first order.
    pub fn subtree(&self, vertex: VertexId, parent: VertexId) -> Vec<VertexId> {
        let mut visited = vec![false; self.vertices.len()];
        visited[parent] = true;
        let mut out = Vec::new();
        let mut stack = vec![vertex];
        while let Some(v) = stack.pop() {
            if visited[v] {
                continue;
            }
            visited[v] = true;
            out.push(v);
            for &n in self.vertices[v].neighbours.iter().rev() {
                if !visited[n] {
                    stack.push(n);
                }
            }
        }
        out
    }

    /// Rotates a subtree, and the ring centers anchored in it, around
    /// `center`.
    pub fn rotate_subtree(
        &mut self,
        vertex: VertexId,
        parent: VertexId,
        angle: f64,
        center: Vector2,
    ) {
        for v in self.subtree(vertex, parent) {
            let pos = self.vertices[v].position.rotated_around(angle, center);
            self.vertices[v].position = pos;
            for i in 0..self.vertices[v].atom.anchored_rings.len() {
                let r = self.vertices[v].atom.anchored_rings[i];
                self.rings[r].center = self.rings[r].center.rotated_around(angle, center);
            }
        }
    }

    /// Walks a ring from `start`, always stepping to a neighbour that
    /// carries the ring id and is not where we came from.
    pub fn ring_walk(
        &self,
        ring: RingId,
        start: VertexId,
        previous: Option<VertexId>,
    ) -> Vec<VertexId> {
        let limit = self.rings[ring].size().max(1) + self.rings[ring].insiders.len();
        let mut out = Vec::new();
        let mut current = Some(start);
        let mut prev = previous;
        while let Some(v) = current {
            if out.len() >= limit {
                break;
            }
            out.push(v);
            let next = self.vertices[v]
                .neighbours
                .iter()
                .copied()
                .find(|&n| Some(n) != prev && self.vertices[n].atom.rings.contains(&ring));
            prev = Some(v);
            current = next.filter(|&n| n != start);
        }
        out
    }

    /// Angle of the closest ancestor whose angle is set.
    pub fn last_angle(&self, vertex: VertexId) -> f64 {
        let mut current = Some(vertex);
        while let Some(v) = current {
            let angle = self.vertices[v].angle;
            if angle != 0.0 {
                return angle;
            }
            current = self.vertices[v].parent;
        }
        0.0
    }

    /// Mean position of every positioned vertex in `vertices`.
    pub fn center_of_mass(&self, vertices: &[VertexId]) -> Vector2 {
        let mut total = Vector2::ZERO;
        let mut count = 0;
        for &v in vertices {
            if self.vertices[v].positioned {
                total += self.vertices[v].position;
                count += 1;
            }
        }
        if count == 0 {
            total
        } else {
            total / count as f64
        }
    }

    /// Bond order sum used for implicit hydrogen counting.
    pub fn bond_order_sum(&self, vertex: VertexId) -> u8 {
        self.vertices[vertex]
            .edges
            .iter()
            .map(|&e| self.edges[e].weight())
            .sum()
    }

    /// Hydrogens to print next to a label.
    pub fn implicit_hydrogens(&self, vertex: VertexId) -> u8 {
        let atom = &self.vertices[vertex].atom;
        if let Some(bracket) = &atom.bracket {
            let expanded = self.vertices[vertex]
                .neighbours
                .iter()
                .filter(|&&n| {
                    let atom = &self.vertices[n].atom;
                    atom.element == "H" && atom.bracket.is_none()
                })
                .count() as u8;
            return bracket.hydrogens.saturating_sub(expanded);
        }
        let aromatic = u8::from(atom.aromatic);
        atom.max_bonds()
            .saturating_sub(self.bond_order_sum(vertex))
            .saturating_sub(aromatic)
    }

    /// One line per active ring: `id: [members]`.
    pub fn ring_dump(&self) -> String {
        let mut out = String::new();
        for ring in self.rings() {
            out.push_str(&format!("{}: {:?}\n", ring.id, ring.members));
        }
        out
    }
}

struct OpenRing {
    vertex: VertexId,
    slot: usize,
    bond: Option<BondSymbol>,
}

struct Builder {
    graph: Graph,
    isomeric: bool,
    open_rings: BTreeMap<u16, OpenRing>,
}

impl Builder {
    /// Adds a node and its `next` successors, recursing only into branches.
    fn add_chain(
        &mut self,
        node: &ParseNode,
        parent: Option<VertexId>,
        branch: bool,
    ) -> Result<(), LayoutError> {
        let mut node = node;
        let mut parent = parent;
        let mut branch = branch;
        loop {
            let id = self.add_vertex(node, parent)?;
            if branch {
                self.graph.vertices[id].atom.branch_bond = node.bond;
                branch = false;
            }
            for child in &node.branches {
                self.add_chain(child, Some(id), true)?;
            }
            match node.next.as_deref() {
                Some(next) => {
                    node = next;
                    parent = Some(id);
                }
                None => return Ok(()),
            }
        }
    }

    fn add_vertex(
        &mut self,
        node: &ParseNode,
        parent: Option<VertexId>,
    ) -> Result<VertexId, LayoutError> {
        let graph = &mut self.graph;
        let id = graph.vertices.len();
        let bond = match (node.bond, parent) {
            (Some(b), _) => b,
            (None, Some(p)) if node.atom.aromatic && graph.vertices[p].atom.aromatic => {
                BondSymbol::Aromatic
            }
            _ => BondSymbol::Single,
        };
        let mut atom = Atom::new(&node.atom, bond);
        atom.ring_closures = node.ring_closures.clone();
        graph.vertices.push(Vertex::new(id, atom));

        if let Some(p) = parent {
            graph.vertices[id].parent = Some(p);
            graph.vertices[p].children.push(id);
            graph.vertices[p].spanning_tree_children.push(id);
            graph.vertices[p].chirality_order.push(id);
            graph.vertices[id].chirality_order.push(p);
            graph.add_edge(p, id, bond);
        }

        let chiral = node
            .atom
            .bracket
            .as_ref()
            .map_or(false, |b| b.chirality != Chirality::None);
        if self.isomeric && chiral {
            self.expand_hydrogens(id);
        }

        for closure in &node.ring_closures {
            self.close_or_open(id, closure.id, closure.bond)?;
        }
        Ok(id)
    }

    fn expand_hydrogens(&mut self, id: VertexId) {
        let graph = &mut self.graph;
        graph.vertices[id].atom.is_stereo_center = true;
        let count = graph.vertices[id].atom.bracket.as_ref().map_or(0, |b| b.hydrogens);
        for _ in 0..count {
            let h = graph.vertices.len();
            let mut vertex = Vertex::new(h, Atom::hydrogen());
            vertex.parent = Some(id);
            vertex.chirality_order.push(id);
            graph.vertices.push(vertex);
            graph.vertices[id].children.push(h);
            graph.vertices[id].spanning_tree_children.push(h);
            graph.vertices[id].chirality_order.push(h);
            graph.add_edge(id, h, BondSymbol::Single);
        }
    }

    fn close_or_open(
        &mut self,
        id: VertexId,
        ring: u16,
        bond: Option<BondSymbol>,
    ) -> Result<(), LayoutError> {
        let graph = &mut self.graph;
        let Some(open) = self.open_rings.remove(&ring) else {
            let slot = graph.vertices[id].chirality_order.len();
            graph.vertices[id].chirality_order.push(UNFILLED);
            self.open_rings.insert(ring, OpenRing { vertex: id, slot, bond });
            return Ok(());
        };
        let bond = match (open.bond, bond) {
            (Some(a), Some(b)) if a != b && !is_directional_pair(a, b) => {
                return Err(LayoutError::RingBondConflict { id: ring });
            }
            (Some(a), _) | (None, Some(a)) => a,
            (None, None) => {
                if graph.vertices[open.vertex].atom.aromatic && graph.vertices[id].atom.aromatic {
                    BondSymbol::Aromatic
                } else {
                    BondSymbol::Single
                }
            }
        };
        graph.vertices[open.vertex].chirality_order[open.slot] = id;
        graph.vertices[open.vertex].children.push(id);
        graph.vertices[id].chirality_order.push(open.vertex);
        graph.add_edge(open.vertex, id, bond);
        Ok(())
    }
}

/// `/` on one end and `\` on the other describe the same bond.
fn is_directional_pair(a: BondSymbol, b: BondSymbol) -> bool {
    matches!(
        (a, b),
        (BondSymbol::Up, BondSymbol::Down) | (BondSymbol::Down, BondSymbol::Up)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn graph(s: &str) -> Graph {
        Graph::from_tree(&parse_smiles(s).unwrap(), true).unwrap()
    }

    #[test]
    fn ethanol_shape() {
        let g = graph("CCO");
        assert_eq!(g.vertices().len(), 3);
        assert_eq!(g.edges().len(), 2);
        assert_eq!(g.vertex(1).parent, Some(0));
        assert_eq!(g.vertex(1).neighbours, vec![0, 2]);
        assert!(g.edge_between(0, 2).is_none());
    }

    #[test]
    fn ring_closure_edge() {
        let g = graph("C1CCCCC1");
        assert_eq!(g.edges().len(), 6);
        let e = g.edge_between(0, 5).unwrap();
        assert_eq!(g.edge(e).bond, BondSymbol::Single);
        assert_eq!(g.vertex(0).children, vec![1, 5]);
        assert_eq!(g.vertex(0).spanning_tree_children, vec![1]);
    }

    #[test]
    fn aromatic_closure_bond() {
        let g = graph("c1ccccc1");
        let e = g.edge_between(0, 5).unwrap();
        assert_eq!(g.edge(e).bond, BondSymbol::Aromatic);
    }

    #[test]
    fn closure_bond_from_either_end() {
        let g = graph("C=1CCCCC1");
        assert_eq!(g.edge(g.edge_between(0, 5).unwrap()).bond, BondSymbol::Double);
        let g = graph("C1CCCCC=1");
        assert_eq!(g.edge(g.edge_between(0, 5).unwrap()).bond, BondSymbol::Double);
    }

    #[test]
    fn unclosed_ring_is_reported() {
        let tree = parse_smiles("C1CC").unwrap();
        assert_eq!(
            Graph::from_tree(&tree, true).unwrap_err(),
            LayoutError::UnclosedRing { id: 1 }
        );
    }

    #[test]
    fn conflicting_closure_bonds() {
        let tree = parse_smiles("C=1CCCCC#1").unwrap();
        assert_eq!(
            Graph::from_tree(&tree, true).unwrap_err(),
            LayoutError::RingBondConflict { id: 1 }
        );
    }

    #[test]
    fn chiral_hydrogens_expand_in_isomeric_mode() {
        let g = graph("F[C@H](Cl)Br");
        assert_eq!(g.vertices().len(), 5);
        assert_eq!(g.vertex(2).atom.element, "H");
        assert_eq!(g.vertex(1).chirality_order, vec![0, 2, 3, 4]);
        assert!(g.vertex(1).atom.is_stereo_center);

        let flat = Graph::from_tree(&parse_smiles("F[C@H](Cl)Br").unwrap(), false).unwrap();
        assert_eq!(flat.vertices().len(), 4);
    }

    #[test]
    fn chirality_order_lists_ring_closures_before_branches() {
        let g = graph("[C@@]1(F)(Cl)CCC1");
        // closure partner (vertex 5) takes the slot of the digit
        assert_eq!(g.vertex(0).chirality_order, vec![5, 1, 2, 3]);
    }

    #[test]
    fn components_split_on_dots() {
        let g = graph("CC.O");
        assert_eq!(g.components(), vec![vec![0, 1], vec![2]]);
        let g = graph("C1.C1");
        assert_eq!(g.components().len(), 1);
    }

    #[test]
    fn tree_depth_and_subtree() {
        let g = graph("CC(C)CCC");
        assert_eq!(g.tree_depth(3, Some(1)), 3);
        assert_eq!(g.tree_depth(2, Some(1)), 1);
        assert_eq!(g.subtree(3, 1), vec![3, 4, 5]);
    }

    #[test]
    fn implicit_hydrogen_counts() {
        let g = graph("CC=O");
        assert_eq!(g.implicit_hydrogens(0), 3);
        assert_eq!(g.implicit_hydrogens(1), 1);
        assert_eq!(g.implicit_hydrogens(2), 0);
        let g = graph("c1ccccc1");
        assert_eq!(g.implicit_hydrogens(0), 1);
        let g = graph("[NH4+]");
        assert_eq!(g.implicit_hydrogens(0), 4);
    }
}
