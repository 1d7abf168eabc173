//! Force-directed relaxation for bridged ring systems.
//!
//! A bridged ring has no regular-polygon embedding, so its boundary starts
//! on a circle, its interior vertices start near the middle, and a synthetic
//! center node per constituent ring holds the constituents in shape. Every
//! pair of nodes is joined by a weighted spring: bonded atoms want one bond
//! length, other atom pairs want a length that grows with their path
//! distance, and centers want their members on the constituent's
//! circumcircle. Each step moves a node to the weighted mean of where its
//! springs would put it (stress majorization), capped by a cooling
//! temperature. Bond springs stiffen for the last iterations so the final
//! bonds come out at the bond length. Vertices positioned before the
//! relaxation act as anchors and never move.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::geometry::{self, Vector2};
use crate::graph::{Graph, RingId, VertexId};

/// Outcome of relaxing one bridged ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Relaxation {
    pub ring: RingId,
    pub iterations: usize,
    /// Largest single-step displacement of a vertex over the settle window.
    pub max_displacement: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct ForceConfig {
    pub iterations: usize,
    /// Lowest step cap, as a fraction of the bond length.
    pub c: f64,
    /// Step cap at the first iteration; cools linearly down to the floor.
    pub max_move: f64,
    /// Weight of a spring between atoms `p` bonds apart is this over `p²`.
    pub path_weight: f64,
    /// Weight of the springs on ring-center nodes.
    pub center_weight: f64,
    /// Bond springs get `stiffness` times their weight from this iteration.
    pub stiffen_after: usize,
    pub stiffness: f64,
    /// Trailing iterations over which displacement is reported.
    pub settle_window: usize,
    pub bond_length: f64,
}

impl ForceConfig {
    pub fn new(bond_length: f64) -> Self {
        Self {
            iterations: 600,
            c: 0.005,
            max_move: bond_length / 2.0,
            path_weight: 0.1,
            center_weight: 0.02,
            stiffen_after: 400,
            stiffness: 30.0,
            settle_window: 50,
            bond_length,
        }
    }

    fn temperature(&self, iteration: usize) -> f64 {
        let cooled = self.max_move * (1.0 - iteration as f64 / self.iterations as f64);
        cooled.max(self.c * self.bond_length)
    }

    /// Rest length between atoms `path` bonds apart; two bonds apart gives
    /// the 120° distance.
    fn path_length(&self, path: usize) -> f64 {
        if path <= 1 {
            self.bond_length
        } else {
            self.bond_length * (1.5 * path as f64).sqrt()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Vertex(VertexId),
    /// Center of one constituent ring.
    Center,
}

#[derive(Debug, Clone, Copy)]
struct Spring {
    other: usize,
    length: f64,
    weight: f64,
    bond: bool,
}

struct System {
    nodes: Vec<Node>,
    positions: Vec<Vector2>,
    fixed: Vec<bool>,
    /// Springs leaving each node.
    springs: Vec<Vec<Spring>>,
    vertex_nodes: usize,
}

impl System {
    fn connect(&mut self, a: usize, b: usize, length: f64, weight: f64, bond: bool) {
        self.springs[a].push(Spring {
            other: b,
            length,
            weight,
            bond,
        });
        self.springs[b].push(Spring {
            other: a,
            length,
            weight,
            bond,
        });
    }

    /// Where the springs of `i` would put it, as a weighted mean.
    fn target(&self, i: usize, stiff: bool, stiffness: f64) -> Option<Vector2> {
        let mut sum = Vector2::ZERO;
        let mut total = 0.0;
        for spring in &self.springs[i] {
            let weight = if stiff && spring.bond {
                spring.weight * stiffness
            } else {
                spring.weight
            };
            let other = self.positions[spring.other];
            let (dir, _) = direction(self.positions[i], other, i * 31 + spring.other);
            sum += (other + dir * spring.length) * weight;
            total += weight;
        }
        (total > 0.0).then(|| sum / total)
    }
}

/// Lays out the members, insiders and constituent centers of `ring`.
///
/// `start` and `previous` orient the initial boundary walk the same way a
/// plain ring would be walked.
pub(crate) fn relax_bridged_ring(
    graph: &mut Graph,
    ring: RingId,
    center: Vector2,
    start: VertexId,
    previous: Option<VertexId>,
    config: &ForceConfig,
) -> Relaxation {
    let mut system = build_system(graph, ring, center, start, previous, config);
    let n = system.nodes.len();
    let window_start = config.iterations.saturating_sub(config.settle_window);
    let mut max_displacement: f64 = 0.0;

    for iteration in 0..config.iterations {
        let temperature = config.temperature(iteration);
        let stiff = iteration >= config.stiffen_after;
        for i in 0..n {
            if system.fixed[i] {
                continue;
            }
            let Some(target) = system.target(i, stiff, config.stiffness) else {
                continue;
            };
            let mut step = target - system.positions[i];
            let length = step.length();
            if !length.is_finite() {
                continue;
            }
            if length > temperature {
                step = step * (temperature / length);
            }
            system.positions[i] += step;
            if iteration >= window_start && i < system.vertex_nodes {
                max_displacement = max_displacement.max(step.length());
            }
        }
        if iteration % 100 == 0 {
            trace!(ring, iteration, temperature, "relaxing bridged ring");
        }
    }

    for (i, node) in system.nodes.iter().enumerate() {
        if let Node::Vertex(v) = *node {
            let vertex = &mut graph.vertices[v];
            if !system.fixed[i] {
                vertex.position = system.positions[i];
            }
            vertex.positioned = true;
        }
    }

    debug!(ring, nodes = n, max_displacement, "relaxed bridged ring");
    Relaxation {
        ring,
        iterations: config.iterations,
        max_displacement,
    }
}

fn build_system(
    graph: &Graph,
    ring: RingId,
    center: Vector2,
    start: VertexId,
    previous: Option<VertexId>,
    config: &ForceConfig,
) -> System {
    let bl = config.bond_length;
    let boundary = boundary_order(graph, ring, start, previous);
    let insiders = graph.rings[ring].insiders.clone();
    let constituents = graph.rings[ring].rings.clone();

    let mut nodes = Vec::new();
    let mut positions = Vec::new();
    let mut fixed = Vec::new();

    let radius = geometry::poly_circumradius(bl, boundary.len().max(3));
    let step = geometry::central_angle(boundary.len().max(1));
    let start_angle = (graph.vertices[start].position - center).angle();
    for (i, &v) in boundary.iter().enumerate() {
        let vertex = &graph.vertices[v];
        nodes.push(Node::Vertex(v));
        if vertex.positioned {
            positions.push(vertex.position);
            fixed.push(true);
        } else {
            positions.push(center + Vector2::from_angle(start_angle + i as f64 * step) * radius);
            fixed.push(false);
        }
    }

    for (i, &v) in insiders.iter().enumerate() {
        nodes.push(Node::Vertex(v));
        if graph.vertices[v].positioned {
            positions.push(graph.vertices[v].position);
            fixed.push(true);
            continue;
        }
        let anchors: Vec<Vector2> = graph.vertices[v]
            .neighbours
            .iter()
            .filter_map(|n| boundary.iter().position(|b| b == n))
            .map(|idx| positions[idx])
            .collect();
        let base = if anchors.is_empty() {
            center
        } else {
            anchors.iter().fold(Vector2::ZERO, |acc, &p| acc + p) / anchors.len() as f64
        };
        positions.push(base + geometry::nudge(i + 1, bl));
        fixed.push(false);
    }

    let vertex_nodes = nodes.len();
    let index_of = |v: VertexId, nodes: &[Node]| {
        nodes[..vertex_nodes]
            .iter()
            .position(|&node| node == Node::Vertex(v))
    };

    let mut constituent_members = Vec::new();
    for (c, &r) in constituents.iter().enumerate() {
        let members: Vec<usize> = graph.rings[r]
            .members
            .iter()
            .filter_map(|&m| index_of(m, &nodes))
            .collect();
        let centroid = if members.is_empty() {
            center
        } else {
            members.iter().fold(Vector2::ZERO, |acc, &m| acc + positions[m]) / members.len() as f64
        };
        nodes.push(Node::Center);
        positions.push(centroid + geometry::nudge(c, bl));
        fixed.push(false);
        constituent_members.push(members);
    }

    let n = nodes.len();
    let mut system = System {
        nodes,
        positions,
        fixed,
        springs: vec![Vec::new(); n],
        vertex_nodes,
    };

    let paths = path_lengths(graph, &system.nodes[..vertex_nodes]);
    for a in 0..vertex_nodes {
        for b in a + 1..vertex_nodes {
            let Some(path) = paths[a][b] else { continue };
            let weight = if path == 1 {
                1.0
            } else {
                config.path_weight / (path * path) as f64
            };
            system.connect(a, b, config.path_length(path), weight, path == 1);
        }
    }
    for (c, members) in constituent_members.iter().enumerate() {
        let size = graph.rings[constituents[c]].size().max(3);
        // Circumradius rather than apothem: members sit on the corners.
        let target = geometry::poly_circumradius(bl, size);
        for &m in members {
            system.connect(vertex_nodes + c, m, target, config.center_weight, false);
        }
    }
    for a in 0..constituents.len() {
        for b in a + 1..constituents.len() {
            let touching = graph.rings[constituents[a]]
                .members
                .iter()
                .any(|&m| graph.rings[constituents[b]].contains(m));
            if touching {
                let target = graph.rings[constituents[a]].apothem(bl)
                    + graph.rings[constituents[b]].apothem(bl);
                system.connect(
                    vertex_nodes + a,
                    vertex_nodes + b,
                    target,
                    config.center_weight,
                    false,
                );
            }
        }
    }
    system
}

/// Bond counts of the shortest paths between vertex nodes, walking only
/// through the nodes themselves.
fn path_lengths(graph: &Graph, nodes: &[Node]) -> Vec<Vec<Option<usize>>> {
    let index_of = |v: VertexId| nodes.iter().position(|&node| node == Node::Vertex(v));
    let mut paths = vec![vec![None; nodes.len()]; nodes.len()];
    for (source, row) in paths.iter_mut().enumerate() {
        row[source] = Some(0);
        let mut queue = VecDeque::from([source]);
        while let Some(current) = queue.pop_front() {
            let Node::Vertex(v) = nodes[current] else { continue };
            let depth = row[current].unwrap_or(0);
            for &w in &graph.vertices[v].neighbours {
                if let Some(next) = index_of(w) {
                    if row[next].is_none() {
                        row[next] = Some(depth + 1);
                        queue.push_back(next);
                    }
                }
            }
        }
    }
    paths
}

/// Boundary members in walking order, starting at `start` and leaving away
/// from `previous`. Members the walk cannot reach are appended.
fn boundary_order(
    graph: &Graph,
    ring: RingId,
    start: VertexId,
    previous: Option<VertexId>,
) -> Vec<VertexId> {
    let members = &graph.rings[ring].members;
    let first = if members.contains(&start) {
        start
    } else {
        members[0]
    };
    let mut order = vec![first];
    let mut current = first;
    let mut came_from = previous;
    while order.len() < members.len() {
        let next = graph.vertices[current].neighbours.iter().copied().find(|n| {
            members.contains(n) && Some(*n) != came_from && !order.contains(n)
        });
        match next {
            Some(n) => {
                came_from = Some(current);
                current = n;
                order.push(n);
            }
            None => break,
        }
    }
    for &m in members {
        if !order.contains(&m) {
            order.push(m);
        }
    }
    order
}

/// Unit vector from `b` towards `a` and their distance. Coincident points
/// get a deterministic direction.
fn direction(a: Vector2, b: Vector2, seed: usize) -> (Vector2, f64) {
    let delta = a - b;
    let d = delta.length();
    if d < 1e-9 {
        return (geometry::nudge(seed, 1.0).normalized(), 0.0);
    }
    (delta / d, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn norbornane() -> Graph {
        let mut g = Graph::from_tree(&parse_smiles("C1CC2CC1CC2").unwrap(), false).unwrap();
        g.perceive_rings();
        g
    }

    #[test]
    fn temperature_cools_to_floor() {
        let config = ForceConfig::new(15.0);
        assert_eq!(config.temperature(0), 7.5);
        assert!(config.temperature(599) >= 0.005 * 15.0);
        assert!(config.temperature(300) < config.temperature(100));
    }

    #[test]
    fn boundary_walk_covers_members() {
        let g = norbornane();
        let bridged = g.rings().next().unwrap().id;
        let order = boundary_order(&g, bridged, 0, None);
        assert_eq!(order.len(), 6);
        assert_eq!(order[0], 0);
        for pair in order.windows(2) {
            assert!(g.edge_between(pair[0], pair[1]).is_some());
        }
    }

    fn assert_bonds_near(g: &Graph, ring: RingId, bond_length: f64) {
        let vertices: Vec<VertexId> = g.rings[ring].all_vertices().collect();
        for e in g.edges() {
            if !vertices.contains(&e.source) || !vertices.contains(&e.target) {
                continue;
            }
            let d = g.vertex(e.source).position.distance(g.vertex(e.target).position);
            assert!(
                (d - bond_length).abs() < 0.1 * bond_length,
                "bond {}-{} has length {}",
                e.source,
                e.target,
                d
            );
        }
    }

    #[test]
    fn path_lengths_follow_bonds() {
        let g = norbornane();
        let nodes: Vec<Node> = (0..7).map(Node::Vertex).collect();
        let paths = path_lengths(&g, &nodes);
        assert_eq!(paths[0][0], Some(0));
        assert_eq!(paths[0][1], Some(1));
        assert_eq!(paths[0][2], Some(2));
        assert_eq!(paths[1][5], Some(3));
        assert_eq!(paths[3][6], Some(2));
    }

    #[test]
    fn relaxation_settles_and_keeps_anchor() {
        let mut g = norbornane();
        let bridged = g.rings().next().unwrap().id;
        g.vertices[0].position = Vector2::new(15.0, 0.0);
        g.vertices[0].positioned = true;
        let config = ForceConfig::new(15.0);
        let result = relax_bridged_ring(
            &mut g,
            bridged,
            Vector2::new(30.0, 0.0),
            0,
            None,
            &config,
        );
        assert_eq!(result.iterations, 600);
        assert!(result.max_displacement < 1e-2 * 15.0, "{}", result.max_displacement);
        assert_eq!(g.vertex(0).position, Vector2::new(15.0, 0.0));
        assert!(g.vertices().iter().all(|v| v.positioned && v.position.is_finite()));
        assert_bonds_near(&g, bridged, 15.0);
        let insider = g.vertex(3).position;
        assert!(insider.distance(g.vertex(1).position) > 7.5);
    }

    #[test]
    fn free_relaxation_settles() {
        let mut g = Graph::from_tree(&parse_smiles("C1CC2CCC1CC2").unwrap(), false).unwrap();
        g.perceive_rings();
        let bridged = g.rings().find(|r| r.is_bridged).unwrap().id;
        let config = ForceConfig::new(15.0);
        let center = Vector2::new(30.0, 0.0);
        let result = relax_bridged_ring(&mut g, bridged, center, 0, None, &config);
        assert!(result.max_displacement < 1e-2 * 15.0, "{}", result.max_displacement);
        assert_bonds_near(&g, bridged, 15.0);
    }
}
