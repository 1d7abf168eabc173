//! Hydrogen hiding and the folding of terminal heteroatoms into compact
//! labels such as `CF3` or `SO3H`.

use tracing::trace;

use crate::graph::{Graph, VertexId};

/// Hides explicit hydrogens and marks the atoms they hang from.
///
/// Hydrogens on a stereocenter that sits in two or more rings stay visible.
/// Hydrogens bonded to another hydrogen, or to nothing, are always drawn.
pub(crate) fn hide_hydrogens(graph: &mut Graph, explicit: bool) {
    for h in 0..graph.vertices.len() {
        if graph.vertices[h].atom.element != "H" {
            continue;
        }
        let Some(&neighbour) = graph.vertices[h].neighbours.first() else {
            continue;
        };
        if graph.vertices[neighbour].atom.element == "H" {
            continue;
        }
        graph.vertices[neighbour].atom.has_hydrogen = true;
        let anchor = &graph.vertices[neighbour].atom;
        let keep = explicit || (anchor.is_stereo_center && anchor.original_rings.len() >= 2);
        if !keep {
            graph.vertices[h].atom.is_drawn = false;
        }
    }
}

fn is_candidate(graph: &Graph, vertex: VertexId) -> bool {
    let v = &graph.vertices[vertex];
    if v.neighbour_count() < 3 || !v.atom.rings.is_empty() || v.atom.element == "P" {
        return false;
    }
    let all_nitrogen = v.neighbour_count() == 3
        && v.neighbours.iter().all(|&n| graph.vertices[n].atom.element == "N");
    !(v.atom.element == "C" && all_nitrogen)
}

/// Collapses atoms carrying two or more terminal heteroatoms into a single
/// label on that atom.
pub(crate) fn init_pseudo_elements(graph: &mut Graph) {
    for vertex in 0..graph.vertices.len() {
        if !graph.vertices[vertex].atom.is_drawn || !is_candidate(graph, vertex) {
            continue;
        }
        let neighbours = graph.vertices[vertex].neighbours.clone();
        let terminal: Vec<VertexId> = neighbours
            .iter()
            .copied()
            .filter(|&n| {
                let atom = &graph.vertices[n].atom;
                graph.vertices[n].neighbour_count() == 1
                    && atom.element != "C"
                    && atom.element != "H"
            })
            .collect();
        let inner: Vec<VertexId> = neighbours
            .iter()
            .copied()
            .filter(|&n| graph.vertices[n].neighbour_count() > 1)
            .collect();
        if terminal.len() < 2 || inner.len() > 1 {
            continue;
        }
        let previous = neighbours
            .iter()
            .find(|&&n| !terminal.contains(&n))
            .map(|&n| graph.vertices[n].atom.element.clone());
        for n in terminal {
            let hydrogens = match &graph.vertices[n].atom.bracket {
                Some(bracket) => bracket.hydrogens,
                None => graph.vertices[n]
                    .atom
                    .max_bonds()
                    .saturating_sub(graph.bond_order_sum(n)),
            };
            let element = graph.vertices[n].atom.element.clone();
            let charge = graph.vertices[n].atom.charge();
            graph.vertices[n].atom.is_drawn = false;
            graph.vertices[vertex]
                .atom
                .attach_pseudo_element(&element, previous.as_deref(), hydrogens, charge);
        }
        trace!(
            vertex,
            labels = graph.vertices[vertex].atom.pseudo_elements.len(),
            "folded terminal atoms"
        );
    }
}
