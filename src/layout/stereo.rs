//! Stereocenters: CIP-style priorities, R/S descriptors and the wedge that
//! shows them in the flat drawing.

use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;

use tracing::trace;

use crate::error::LayoutError;
use crate::graph::{Descriptor, Graph, VertexId, Wedge};
use crate::smiles::{BondSymbol, Chirality};

/// How far priority exploration walks away from the stereocenter.
const MAX_DEPTH: usize = 10;

/// One of the four substituent slots around a tetrahedral center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ligand {
    Vertex(VertexId),
    LonePair,
}

/// Every chiral atom must have a tetrahedral neighbourhood.
pub(crate) fn validate_chirality(graph: &Graph) -> Result<(), LayoutError> {
    for vertex in graph.vertices() {
        if vertex.atom.chirality() == Chirality::None {
            continue;
        }
        let neighbours = vertex.neighbour_count();
        if neighbours != 3 && neighbours != 4 {
            return Err(LayoutError::UnsupportedChirality {
                vertex: vertex.id,
                neighbours,
            });
        }
    }
    Ok(())
}

/// Sphere-by-sphere atomic numbers seen from `center` through `start`.
/// Each entry packs the atom a branch leaves from and the atom it reaches,
/// repeated by bond order, so heavier and more saturated paths sort first.
fn priority(graph: &Graph, center: VertexId, start: VertexId) -> Vec<Vec<u32>> {
    let mut levels = vec![vec![u32::from(graph.vertices[start].atom.atomic_number())]];
    let mut visited: HashSet<VertexId> = [center, start].into_iter().collect();
    let mut frontier = vec![start];
    for _ in 0..MAX_DEPTH {
        let mut level = Vec::new();
        let mut next = Vec::new();
        for &u in &frontier {
            let from = u32::from(graph.vertices[u].atom.atomic_number()) * 1000;
            for &e in &graph.vertices[u].edges {
                let edge = &graph.edges[e];
                let w = edge.other(u);
                if !visited.insert(w) {
                    continue;
                }
                let entry = from + u32::from(graph.vertices[w].atom.atomic_number());
                level.extend(std::iter::repeat(entry).take(usize::from(edge.weight())));
                next.push(w);
            }
            let hydrogens = graph.implicit_hydrogens(u);
            level.extend(std::iter::repeat(from + 1).take(usize::from(hydrogens)));
        }
        if level.is_empty() {
            break;
        }
        level.sort_unstable_by(|a, b| b.cmp(a));
        levels.push(level);
        frontier = next;
    }
    levels
}

/// Ligands in the order the chirality tag refers to, with a lone pair
/// standing in for the missing fourth substituent.
fn ligands(graph: &Graph, center: VertexId) -> Vec<Ligand> {
    let vertex = &graph.vertices[center];
    let mut ligands: Vec<Ligand> = vertex
        .chirality_order
        .iter()
        .map(|&n| Ligand::Vertex(n))
        .collect();
    if ligands.len() == 3 {
        let at = usize::from(vertex.parent.is_some());
        ligands.insert(at, Ligand::LonePair);
    }
    ligands
}

/// Ligands from highest to lowest priority.
fn ranked(graph: &Graph, center: VertexId, ligands: &[Ligand]) -> Vec<Ligand> {
    let mut keyed: Vec<(usize, Ligand, Option<Vec<Vec<u32>>>)> = ligands
        .iter()
        .enumerate()
        .map(|(i, &l)| match l {
            Ligand::Vertex(n) => (i, l, Some(priority(graph, center, n))),
            Ligand::LonePair => (i, l, None),
        })
        .collect();
    keyed.sort_by(|a, b| match (&a.2, &b.2) {
        (Some(pa), Some(pb)) => pb.cmp(pa).then(a.0.cmp(&b.0)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });
    keyed.into_iter().map(|(_, l, _)| l).collect()
}

/// Whether `to` is an even permutation of `from`.
fn is_even_permutation(from: &[Ligand], to: &[Ligand]) -> bool {
    let mut order: Vec<usize> = to
        .iter()
        .filter_map(|l| from.iter().position(|f| f == l))
        .collect();
    let mut swaps = 0;
    for i in 0..order.len() {
        while order[i] != i {
            let j = order[i];
            order.swap(i, j);
            swaps += 1;
        }
    }
    swaps % 2 == 0
}

fn descriptor_from_tag(
    chirality: Chirality,
    from: &[Ligand],
    ranked: &[Ligand],
) -> Option<Descriptor> {
    let lowest = *ranked.last()?;
    let target = [lowest, ranked[0], ranked[1], ranked[2]];
    let even = is_even_permutation(from, &target);
    let counter_clockwise = match chirality {
        Chirality::CounterClockwise => true,
        Chirality::Clockwise => false,
        Chirality::None => return None,
    };
    Some(if even == counter_clockwise {
        Descriptor::R
    } else {
        Descriptor::S
    })
}

fn is_single_type(bond: BondSymbol) -> bool {
    matches!(bond, BondSymbol::Single | BondSymbol::Up | BondSymbol::Down)
}

/// The neighbour whose bond carries the wedge.
fn wedge_partner(graph: &Graph, center: VertexId, ranked: &[Ligand]) -> Option<VertexId> {
    ranked
        .iter()
        .enumerate()
        .filter_map(|(rank, &l)| match l {
            Ligand::Vertex(n) => Some((rank, n)),
            Ligand::LonePair => None,
        })
        .filter(|&(_, n)| graph.vertices[n].atom.is_drawn)
        .filter_map(|(rank, n)| {
            let edge = graph.edge_between(center, n)?;
            let edge = &graph.edges[edge];
            if edge.wedge.is_some() {
                return None;
            }
            Some((
                (
                    !is_single_type(edge.bond),
                    graph.vertices[n].atom.is_stereo_center,
                    graph.are_in_same_ring(center, n),
                    Reverse(rank),
                    graph.tree_depth(n, Some(center)),
                ),
                n,
            ))
        })
        .min_by_key(|(key, _)| *key)
        .map(|(_, n)| n)
}

type Point3 = [f64; 3];

fn triple_product(a: Point3, b: Point3, c: Point3) -> f64 {
    a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0])
}

/// The descriptor the drawing shows when `wedged` points at the viewer.
/// Hidden ligands sit behind the center. `None` when the picture is flat.
fn drawn_descriptor(
    graph: &Graph,
    center: VertexId,
    ranked: &[Ligand],
    wedged: VertexId,
) -> Option<Descriptor> {
    let origin = graph.vertices[center].position;
    let point = |l: Ligand| -> Point3 {
        match l {
            Ligand::Vertex(n) if graph.vertices[n].atom.is_drawn => {
                let d = (graph.vertices[n].position - origin).normalized();
                let z = if n == wedged { 1.0 } else { 0.0 };
                // screen y grows downwards
                [d.x, -d.y, z]
            }
            _ => [0.0, 0.0, -1.0],
        }
    };
    let lowest = point(*ranked.last()?);
    let rel = |l: Ligand| {
        let p = point(l);
        [p[0] - lowest[0], p[1] - lowest[1], p[2] - lowest[2]]
    };
    let det = triple_product(rel(ranked[0]), rel(ranked[1]), rel(ranked[2]));
    if det.abs() < 1e-9 {
        return None;
    }
    Some(if det < 0.0 { Descriptor::R } else { Descriptor::S })
}

/// Assigns a descriptor to every stereocenter and wedges one of its bonds
/// so the drawing shows that configuration.
pub(crate) fn annotate(graph: &mut Graph) {
    for center in 0..graph.vertices.len() {
        let chirality = graph.vertices[center].atom.chirality();
        if chirality == Chirality::None || !graph.vertices[center].atom.is_drawn {
            continue;
        }
        let ligands = ligands(graph, center);
        if ligands.len() != 4 {
            continue;
        }
        let ranked = ranked(graph, center, &ligands);
        let Some(descriptor) = descriptor_from_tag(chirality, &ligands, &ranked) else {
            continue;
        };
        graph.vertices[center].atom.descriptor = Some(descriptor);

        let Some(partner) = wedge_partner(graph, center, &ranked) else {
            continue;
        };
        let wedge = match drawn_descriptor(graph, center, &ranked, partner) {
            Some(shown) if shown != descriptor => Wedge::Down,
            _ => Wedge::Up,
        };
        if let Some(e) = graph.edge_between(center, partner) {
            let edge = &mut graph.edges[e];
            edge.wedge = Some(wedge);
            edge.wedge_apex = Some(center);
        }
        trace!(center, partner, ?descriptor, ?wedge, "wedged stereocenter");
    }
}
