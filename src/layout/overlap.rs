//! Overlap scoring and the passes that reduce it.
//!
//! The score sums `(bl - d) / bl` over every pair of drawn vertices closer
//! than one bond length. The primary pass fixes the structural clash of two
//! substituents on one ring atom; the score-driven passes rotate subtrees
//! around rotatable bonds, nudge terminal atoms and flip substituents across
//! their ring.

use std::f64::consts::PI;

use tracing::{debug, trace};

use crate::geometry::{self, Vector2};
use crate::graph::{Graph, VertexId};
use crate::options::Options;
use crate::smiles::BondSymbol;

/// Subtree scores above this trigger a rotation around a bond.
const ROTATION_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapScore {
    pub total: f64,
    /// Per-vertex score, indexed by vertex id.
    pub vertex_scores: Vec<f64>,
    /// `(vertex, score)` for every vertex, worst first.
    pub sorted: Vec<(VertexId, f64)>,
}

pub fn overlap_score(graph: &Graph, bond_length: f64) -> OverlapScore {
    let n = graph.vertices.len();
    let mut vertex_scores = vec![0.0; n];
    let mut total = 0.0;
    let threshold = bond_length * (1.0 - 1e-9);
    for i in 0..n {
        let a = &graph.vertices[i];
        if !a.atom.is_drawn {
            continue;
        }
        for j in i + 1..n {
            let b = &graph.vertices[j];
            if !b.atom.is_drawn {
                continue;
            }
            let d = a.position.distance(b.position);
            if d < threshold {
                let weighted = (bond_length - d) / bond_length;
                total += weighted;
                vertex_scores[i] += weighted;
                vertex_scores[j] += weighted;
            }
        }
    }
    let mut sorted: Vec<(VertexId, f64)> = vertex_scores.iter().copied().enumerate().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
    OverlapScore {
        total,
        vertex_scores,
        sorted,
    }
}

/// Mean score of the clashing vertices in the subtree at `root`, entered
/// from `parent`, and the centroid of those vertices.
pub(crate) fn subtree_overlap_score(
    graph: &Graph,
    root: VertexId,
    parent: VertexId,
    vertex_scores: &[f64],
    sensitivity: f64,
) -> (f64, Vector2) {
    let mut score = 0.0;
    let mut center = Vector2::ZERO;
    let mut count = 0usize;
    for v in graph.subtree(root, parent) {
        if !graph.vertices[v].atom.is_drawn {
            continue;
        }
        let s = vertex_scores[v];
        if s > sensitivity {
            score += s;
            count += 1;
        }
        center += graph.vertices[v].position;
    }
    if count == 0 {
        return (0.0, center);
    }
    (score / count as f64, center / count as f64)
}

/// Neighbours of `vertex` that share no ring with it and are not bridge atoms.
fn non_ring_neighbours(graph: &Graph, vertex: VertexId) -> Vec<VertexId> {
    graph.vertices[vertex]
        .neighbours
        .iter()
        .copied()
        .filter(|&n| {
            let other = &graph.vertices[n];
            other.atom.is_drawn && !other.atom.is_bridge && graph.common_rings(vertex, n).is_empty()
        })
        .collect()
}

/// Spreads apart substituents that a ring placement put on top of each
/// other.
pub(crate) fn resolve_primary_overlaps(graph: &mut Graph, options: &Options) {
    let mut done = vec![false; graph.vertices.len()];
    let mut overlaps: Vec<(VertexId, Vec<usize>, Vec<VertexId>)> = Vec::new();

    for ring in graph.rings() {
        for &m in &ring.members {
            if done[m] {
                continue;
            }
            done[m] = true;
            let substituents = non_ring_neighbours(graph, m);
            if substituents.len() > 1
                || (substituents.len() == 1 && graph.vertices[m].atom.rings.len() == 2)
            {
                overlaps.push((m, graph.vertices[m].atom.rings.clone(), substituents));
            }
        }
    }

    for (common, rings, substituents) in overlaps {
        let center = graph.vertices[common].position;
        match substituents.as_slice() {
            &[a, b] => {
                let angle = (2.0 * PI - graph.rings[rings[0]].angle()) / 6.0;
                graph.rotate_subtree(a, common, angle, center);
                graph.rotate_subtree(b, common, -angle, center);
                let first = pair_score(graph, a, b, common, options);

                graph.rotate_subtree(a, common, -2.0 * angle, center);
                graph.rotate_subtree(b, common, 2.0 * angle, center);
                let second = pair_score(graph, a, b, common, options);
                if second > first {
                    graph.rotate_subtree(a, common, 2.0 * angle, center);
                    graph.rotate_subtree(b, common, -2.0 * angle, center);
                }
                for s in [a, b] {
                    if graph.vertices[s].neighbour_count() == 1 {
                        let vertex = &mut graph.vertices[s];
                        vertex.flippable = true;
                        vertex.flip_center = Some(common);
                        vertex.flip_rings = rings.clone();
                    }
                }
                trace!(common, a, b, "spread substituent pair");
            }
            &[s] if rings.len() == 2 => {
                let to_a = (graph.rings[rings[0]].center - center).normalized();
                let to_b = (graph.rings[rings[1]].center - center).normalized();
                let target = -(to_a + to_b);
                if target.length() < 1e-9 {
                    continue;
                }
                let current = graph.vertices[s].position - center;
                let angle = target.angle() - current.angle();
                if angle.abs() > 1e-9 {
                    graph.rotate_subtree(s, common, angle, center);
                    trace!(common, s, angle = geometry::to_deg(angle), "bisected substituent");
                }
            }
            _ => {}
        }
    }
}

fn pair_score(graph: &Graph, a: VertexId, b: VertexId, common: VertexId, options: &Options) -> f64 {
    let score = overlap_score(graph, options.bond_length);
    let sensitivity = options.overlap_sensitivity;
    let (sa, _) = subtree_overlap_score(graph, a, common, &score.vertex_scores, sensitivity);
    let (sb, _) = subtree_overlap_score(graph, b, common, &score.vertex_scores, sensitivity);
    sa + sb
}

/// Single bonds outside rings joining two non-terminal atoms.
pub(crate) fn is_edge_rotatable(graph: &Graph, edge: usize) -> bool {
    let e = &graph.edges[edge];
    if e.bond != BondSymbol::Single {
        return false;
    }
    let a = &graph.vertices[e.source];
    let b = &graph.vertices[e.target];
    if a.neighbour_count() + b.neighbour_count() < 5 {
        return false;
    }
    if a.is_terminal() || b.is_terminal() {
        return false;
    }
    !graph.are_in_same_ring(e.source, e.target)
}

/// Rotates the smaller side of every rotatable bond whose subtree clashes,
/// keeping the rotation only when the total score does not grow. Returns
/// the score after the last accepted change.
pub(crate) fn resolve_rotatable_edges(
    graph: &mut Graph,
    options: &Options,
    total: &mut f64,
) -> OverlapScore {
    let bl = options.bond_length;
    let mut score = overlap_score(graph, bl);
    for e in 0..graph.edges.len() {
        if !is_edge_rotatable(graph, e) {
            continue;
        }
        let (source, target) = (graph.edges[e].source, graph.edges[e].target);
        let depth_source = graph.tree_depth(source, Some(target));
        let depth_target = graph.tree_depth(target, Some(source));
        // `b` roots the smaller side.
        let (a, b) = if depth_source > depth_target {
            (source, target)
        } else {
            (target, source)
        };
        let (subtree, _) =
            subtree_overlap_score(graph, b, a, &score.vertex_scores, options.overlap_sensitivity);
        if subtree <= ROTATION_THRESHOLD {
            continue;
        }

        let pos_a = graph.vertices[a].position;
        let pos_b = graph.vertices[b].position;
        let neighbours: Vec<VertexId> = graph.vertices[b]
            .neighbours_except(a)
            .into_iter()
            .filter(|&n| graph.vertices[n].atom.is_drawn)
            .collect();
        let rotation = match neighbours.as_slice() {
            &[n] => {
                let angle = graph.vertices[n]
                    .position
                    .rotate_away_from_angle(pos_a, pos_b, geometry::to_rad(120.0));
                vec![(n, angle)]
            }
            &[n, m] => {
                let in_ring = |v: VertexId| !graph.vertices[v].atom.rings.is_empty();
                if in_ring(n) || in_ring(m) {
                    continue;
                }
                let turn = geometry::to_rad(120.0);
                vec![
                    (n, graph.vertices[n].position.rotate_away_from_angle(pos_a, pos_b, turn)),
                    (m, graph.vertices[m].position.rotate_away_from_angle(pos_a, pos_b, turn)),
                ]
            }
            _ => continue,
        };

        for &(n, angle) in &rotation {
            graph.rotate_subtree(n, b, angle, pos_b);
        }
        let new_total = overlap_score(graph, bl).total;
        if new_total > *total {
            for &(n, angle) in &rotation {
                graph.rotate_subtree(n, b, -angle, pos_b);
            }
        } else {
            trace!(edge = e, from = *total, to = new_total, "rotated around bond");
            *total = new_total;
        }
        score = overlap_score(graph, bl);
    }
    score
}

/// Works through clashing vertices worst first. The scores are not
/// refreshed between fixes within one pass.
pub(crate) fn resolve_secondary_overlaps(
    graph: &mut Graph,
    options: &Options,
    sorted: &[(VertexId, f64)],
) {
    for &(v, score) in sorted {
        if score <= options.overlap_sensitivity {
            continue;
        }
        if !graph.vertices[v].atom.is_drawn || !graph.vertices[v].is_terminal() {
            continue;
        }
        if options.ring_flips && graph.vertices[v].flippable && flip(graph, v) {
            continue;
        }
        let Some(anchor) = attachment(graph, v) else {
            continue;
        };
        let Some(closest) = closest_vertex(graph, v) else {
            continue;
        };
        let away = if graph.vertices[closest].is_terminal() {
            attachment(graph, closest)
                .map_or(graph.vertices[closest].position, |c| graph.vertices[c].position)
        } else {
            graph.vertices[closest].position
        };
        let center = graph.vertices[anchor].position;
        let vertex = &mut graph.vertices[v];
        vertex.position = vertex
            .position
            .rotated_away_from(away, center, geometry::to_rad(20.0));
        trace!(vertex = v, closest, "nudged terminal vertex");
    }
}

/// Mirrors a flippable substituent across the axis through one of its
/// rings' centers and its attachment atom. Each ring is flipped once.
fn flip(graph: &mut Graph, v: VertexId) -> bool {
    let Some(center_vertex) = graph.vertices[v].flip_center else {
        return false;
    };
    let ring = graph.vertices[v]
        .flip_rings
        .iter()
        .copied()
        .filter(|&r| !graph.rings[r].flipped)
        .max_by_key(|&r| graph.rings[r].size());
    let Some(ring) = ring else {
        return false;
    };
    let axis_from = graph.rings[ring].center;
    let axis_to = graph.vertices[center_vertex].position;
    let vertex = &mut graph.vertices[v];
    vertex.position = vertex.position.reflected_across(axis_from, axis_to);
    graph.rings[ring].flipped = true;
    trace!(vertex = v, ring, "flipped substituent");
    true
}

/// The drawn neighbour a terminal vertex hangs from.
fn attachment(graph: &Graph, v: VertexId) -> Option<VertexId> {
    graph.vertices[v]
        .neighbours
        .iter()
        .copied()
        .find(|&n| graph.vertices[n].atom.is_drawn)
}

fn closest_vertex(graph: &Graph, v: VertexId) -> Option<VertexId> {
    let position = graph.vertices[v].position;
    graph
        .vertices
        .iter()
        .filter(|o| o.id != v && o.atom.is_drawn && o.positioned)
        .min_by(|a, b| {
            a.position
                .distance_sq(position)
                .total_cmp(&b.position.distance_sq(position))
        })
        .map(|o| o.id)
}

/// Score-driven passes: rotations around bonds, then terminal nudges and
/// ring flips. Returns the final total.
pub(crate) fn resolve_overlaps(graph: &mut Graph, options: &Options) -> f64 {
    let bl = options.bond_length;
    let mut score = overlap_score(graph, bl);
    let mut total = score.total;
    if total == 0.0 {
        return total;
    }
    for _ in 0..options.overlap_resolution_iterations {
        score = resolve_rotatable_edges(graph, options, &mut total);
    }
    resolve_secondary_overlaps(graph, options, &score.sorted);
    let total = overlap_score(graph, bl).total;
    debug!(total, "resolved overlaps");
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::placement::Placer;
    use crate::smiles::parse_smiles;

    fn placed(smiles: &str) -> Graph {
        let mut g = Graph::from_tree(&parse_smiles(smiles).unwrap(), false).unwrap();
        g.perceive_rings();
        Placer::new(&mut g, 15.0).place_all();
        g.restore_rings();
        g
    }

    #[test]
    fn score_counts_close_pairs() {
        let mut g = placed("CC");
        assert_eq!(overlap_score(&g, 15.0).total, 0.0);
        g.vertices[1].position = g.vertices[0].position + Vector2::new(7.5, 0.0);
        let score = overlap_score(&g, 15.0);
        assert!((score.total - 0.5).abs() < 1e-9);
        assert!((score.vertex_scores[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn hidden_vertices_do_not_score() {
        let mut g = placed("CC");
        g.vertices[1].position = g.vertices[0].position;
        g.vertices[1].atom.is_drawn = false;
        assert_eq!(overlap_score(&g, 15.0).total, 0.0);
    }

    #[test]
    fn rotatable_edges() {
        let g = placed("CC(C)CC(C)C");
        let e = g.edge_between(3, 4).unwrap();
        assert!(is_edge_rotatable(&g, e));
        let terminal = g.edge_between(0, 1).unwrap();
        assert!(!is_edge_rotatable(&g, terminal));
        let ring = placed("C1CCCCC1CC(C)C");
        let inside = ring.edge_between(0, 1).unwrap();
        assert!(!is_edge_rotatable(&ring, inside));
    }

    #[test]
    fn geminal_substituents_are_spread() {
        let mut g = placed("C1CCCCC1(C)C");
        let options = Options::default();
        let before = g.vertex(6).position.distance(g.vertex(7).position);
        resolve_primary_overlaps(&mut g, &options);
        let after = g.vertex(6).position.distance(g.vertex(7).position);
        assert!(after > before);
        assert!(after > 15.0);
        assert!(g.vertex(6).flippable);
        assert_eq!(g.vertex(6).flip_center, Some(5));
    }

    #[test]
    fn resolution_without_overlap_changes_nothing() {
        let mut g = placed("CC(C)CCO");
        let options = Options::default();
        let before: Vec<Vector2> = g.vertices().iter().map(|v| v.position).collect();
        assert_eq!(resolve_overlaps(&mut g, &options), 0.0);
        let after: Vec<Vector2> = g.vertices().iter().map(|v| v.position).collect();
        assert_eq!(before, after);
    }

    /// An unplaced graph whose positions the test sets by hand.
    fn unplaced(smiles: &str) -> Graph {
        Graph::from_tree(&parse_smiles(smiles).unwrap(), false).unwrap()
    }

    fn set_positions(g: &mut Graph, positions: &[(f64, f64)]) {
        for (v, &(x, y)) in positions.iter().enumerate() {
            g.vertices[v].position = Vector2::new(x, y);
            g.vertices[v].positioned = true;
        }
    }

    fn turn(a: Vector2, b: Vector2) -> f64 {
        ((a.x * b.x + a.y * b.y) / (a.length() * b.length())).acos()
    }

    /// Methyl 0 on vertex 1 sits inside the cluster formed by 2, 3 and 4.
    fn crowded_methyl(smiles: &str) -> Graph {
        let mut g = unplaced(smiles);
        set_positions(
            &mut g,
            &[(3.0, 3.0), (-15.0, 0.0), (0.0, 0.0), (6.0, 0.0), (0.0, 6.0)],
        );
        g
    }

    #[test]
    fn rotation_is_kept_when_the_score_drops() {
        let mut g = crowded_methyl("CCC(C)C");
        let options = Options::default();
        let before = overlap_score(&g, 15.0);
        let mut total = before.total;
        let pivot = g.vertex(1).position;
        let expected = g.vertex(0).position.rotated_around(geometry::to_rad(120.0), pivot);

        let after = resolve_rotatable_edges(&mut g, &options, &mut total);

        assert!(total < before.total);
        assert!((after.total - total).abs() < 1e-9);
        assert!(g.vertex(0).position.distance(expected) < 1e-9);
        assert!(g.vertex(0).position.distance(g.vertex(2).position) > 15.0);
        assert_eq!(after.vertex_scores[0], 0.0);
    }

    #[test]
    fn rotation_is_reverted_when_the_score_grows() {
        let mut g = unplaced("CCC(C)C.C.C.C");
        let original = crowded_methyl("CCC(C)C");
        let pivot = original.vertex(1).position;
        let landing = original.vertex(0).position.rotated_around(geometry::to_rad(120.0), pivot);
        let mut positions: Vec<(f64, f64)> =
            original.vertices().iter().map(|v| (v.position.x, v.position.y)).collect();
        positions.extend([(landing.x, landing.y); 3]);
        set_positions(&mut g, &positions);

        let options = Options::default();
        let start = g.vertex(0).position;
        let mut total = overlap_score(&g, 15.0).total;
        let before = total;
        resolve_rotatable_edges(&mut g, &options, &mut total);

        assert_eq!(total, before);
        assert!(g.vertex(0).position.distance(start) < 1e-9);
    }

    #[test]
    fn two_branches_swap_sides() {
        // 0 and 2 hang off 1 and are squeezed against the bond to 3.
        let mut g = unplaced("CC(C)CCC");
        set_positions(
            &mut g,
            &[
                (7.5, 2.0),
                (0.0, 0.0),
                (7.5, -2.0),
                (15.0, 0.0),
                (22.5, 13.0),
                (37.5, 13.0),
            ],
        );
        let options = Options::default();
        let mut total = overlap_score(&g, 15.0).total;
        let before = total;
        let length = g.vertex(0).position.distance(g.vertex(1).position);

        resolve_rotatable_edges(&mut g, &options, &mut total);

        assert!(total < before);
        let (up, down) = (g.vertex(0).position, g.vertex(2).position);
        assert!(up.x < 0.0 && up.y > 0.0, "{:?}", up);
        assert!(down.x < 0.0 && down.y < 0.0, "{:?}", down);
        assert!((up.distance(g.vertex(1).position) - length).abs() < 1e-9);
        assert!(up.distance(g.vertex(3).position) > 15.0);
        assert!(down.distance(g.vertex(3).position) > 15.0);
    }

    #[test]
    fn each_ring_flips_once() {
        let mut g = placed("C1CCCCC1(C)C");
        let options = Options::default();
        resolve_primary_overlaps(&mut g, &options);
        let ring = g.vertex(6).flip_rings[0];
        let axis = (g.ring(ring).center, g.vertex(5).position);
        let mirrored_6 = g.vertex(6).position.reflected_across(axis.0, axis.1);
        let start_7 = g.vertex(7).position;
        let mirrored_7 = start_7.reflected_across(axis.0, axis.1);

        resolve_secondary_overlaps(&mut g, &options, &[(6, 1.0), (7, 1.0)]);

        assert!(g.ring(ring).flipped);
        assert!(g.vertex(6).position.distance(mirrored_6) < 1e-9);
        let moved_7 = g.vertex(7).position;
        assert!(moved_7.distance(mirrored_7) > 1e-6);
        let center = g.vertex(5).position;
        let angle = turn(start_7 - center, moved_7 - center);
        assert!((angle - geometry::to_rad(20.0)).abs() < 1e-9);
    }

    fn fused_methyl() -> (Graph, usize, usize) {
        // Methyl 0 on the fusion atom 1 of a six- and a five-membered ring.
        let mut g = placed("CC12CCCCC1CCC2");
        let six = g.rings().find(|r| r.size() == 6).unwrap().id;
        let five = g.rings().find(|r| r.size() == 5).unwrap().id;
        let methyl = &mut g.vertices[0];
        methyl.flippable = true;
        methyl.flip_center = Some(1);
        methyl.flip_rings = vec![five, six];
        (g, six, five)
    }

    #[test]
    fn flip_prefers_the_larger_ring() {
        let (mut g, six, five) = fused_methyl();
        let expected = g
            .vertex(0)
            .position
            .reflected_across(g.ring(six).center, g.vertex(1).position);
        resolve_secondary_overlaps(&mut g, &Options::default(), &[(0, 1.0)]);
        assert!(g.ring(six).flipped);
        assert!(!g.ring(five).flipped);
        assert!(g.vertex(0).position.distance(expected) < 1e-9);
    }

    #[test]
    fn disabled_flips_fall_back_to_a_nudge() {
        let (mut g, six, five) = fused_methyl();
        let options = Options {
            ring_flips: false,
            ..Options::default()
        };
        let center = g.vertex(1).position;
        let start = g.vertex(0).position;
        resolve_secondary_overlaps(&mut g, &options, &[(0, 1.0)]);
        assert!(!g.ring(six).flipped && !g.ring(five).flipped);
        let moved = g.vertex(0).position;
        assert!((moved.distance(center) - start.distance(center)).abs() < 1e-9);
        assert!((turn(start - center, moved - center) - geometry::to_rad(20.0)).abs() < 1e-9);
    }

    #[test]
    fn terminal_nudge_rotates_around_attachment() {
        let mut g = placed("CC(C)CCO");
        let options = Options::default();
        let anchor = g.vertex(1).position;
        let length = g.vertex(0).position.distance(anchor);
        resolve_secondary_overlaps(&mut g, &options, &[(0, 1.0)]);
        assert!((g.vertex(0).position.distance(anchor) - length).abs() < 1e-9);
    }
}
