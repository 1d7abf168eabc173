//! The layout session: owns one molecule's graph and runs it through ring
//! perception, placement, overlap resolution, stereo and label folding.

mod force;
mod overlap;
mod placement;
mod pseudo;
mod stereo;

use tracing::debug;

use crate::draw::{self, DrawCommand};
use crate::error::LayoutError;
use crate::graph::{Graph, RingId};
use crate::options::{AtomVisualization, Options};
use crate::smiles::ParseTree;

pub use force::Relaxation;
pub use overlap::{overlap_score, OverlapScore};

/// A positioned molecule.
#[derive(Debug, Clone)]
pub struct Layout {
    graph: Graph,
    options: Options,
    total_overlap_score: f64,
    relaxations: Vec<Relaxation>,
}

impl Layout {
    pub fn new(tree: &ParseTree, options: Options) -> Result<Self, LayoutError> {
        let mut graph = Graph::from_tree(tree, options.isomeric)?;
        if options.isomeric {
            stereo::validate_chirality(&graph)?;
        }
        graph.perceive_rings();
        pseudo::hide_hydrogens(&mut graph, options.explicit_hydrogens);

        let relaxations = placement::Placer::new(&mut graph, options.bond_length).place_all();
        placement::position_hidden(&mut graph, options.bond_length);
        graph.restore_rings();

        overlap::resolve_primary_overlaps(&mut graph, &options);
        overlap::resolve_overlaps(&mut graph, &options);

        if options.isomeric {
            stereo::annotate(&mut graph);
        }
        if options.compact_drawing && options.atom_visualization == AtomVisualization::Default {
            pseudo::init_pseudo_elements(&mut graph);
        }

        let total_overlap_score = overlap_score(&graph, options.bond_length).total;
        debug!(
            vertices = graph.vertices().len(),
            rings = graph.rings().count(),
            total_overlap_score,
            "layout finished"
        );
        Ok(Self {
            graph,
            options,
            total_overlap_score,
            relaxations,
        })
    }

    /// Runs the score-driven overlap passes again. A layout without any
    /// overlap is left untouched.
    pub fn resolve_overlaps(&mut self) -> f64 {
        self.total_overlap_score = overlap::resolve_overlaps(&mut self.graph, &self.options);
        self.total_overlap_score
    }

    pub fn draw_commands(&self) -> Vec<DrawCommand> {
        draw::draw_commands(&self.graph, &self.options)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn total_overlap_score(&self) -> f64 {
        self.total_overlap_score
    }

    /// One entry per bridged ring system relaxed during placement.
    pub fn relaxations(&self) -> &[Relaxation] {
        &self.relaxations
    }

    pub fn ring_count(&self) -> usize {
        self.graph.rings().count()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.graph.heavy_atom_count()
    }

    /// Synthetic rings created by merging bridged systems.
    pub fn bridged_rings(&self) -> Vec<RingId> {
        self.graph
            .rings
            .iter()
            .filter(|r| r.is_bridged)
            .map(|r| r.id)
            .collect()
    }

    pub fn fused_rings(&self) -> Vec<RingId> {
        self.graph.rings().filter(|r| r.is_fused).map(|r| r.id).collect()
    }

    pub fn spiro_rings(&self) -> Vec<RingId> {
        self.graph.rings().filter(|r| r.is_spiro).map(|r| r.id).collect()
    }

    pub fn ring_dump(&self) -> String {
        self.graph.ring_dump()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn layout(smiles: &str) -> Layout {
        Layout::new(&parse_smiles(smiles).unwrap(), Options::default()).unwrap()
    }

    #[test]
    fn every_drawn_vertex_is_positioned() {
        for smiles in ["CCO", "c1ccccc1O", "C1CC2CCC1C2", "CC(C)(C)c1ccc2ccccc2c1", "O.O"] {
            let l = layout(smiles);
            for v in l.graph().vertices() {
                assert!(v.positioned, "{} vertex {}", smiles, v.id);
                assert!(v.position.is_finite());
            }
        }
    }

    #[test]
    fn introspection() {
        let l = layout("c1ccc2ccccc2c1");
        assert_eq!(l.ring_count(), 2);
        assert_eq!(l.heavy_atom_count(), 10);
        assert_eq!(l.fused_rings().len(), 2);
        assert!(l.spiro_rings().is_empty());
        assert!(l.bridged_rings().is_empty());
        assert_eq!(l.ring_dump().lines().count(), 2);
    }

    #[test]
    fn chirality_errors_surface() {
        let err = Layout::new(&parse_smiles("[C@H2]").unwrap(), Options::default()).unwrap_err();
        assert!(matches!(err, LayoutError::UnsupportedChirality { .. }));
        let flat = Options {
            isomeric: false,
            ..Options::default()
        };
        assert!(Layout::new(&parse_smiles("[C@H2]").unwrap(), flat).is_ok());
    }

    #[test]
    fn stereocenter_gets_one_wedge() {
        let l = layout("C[C@H](N)C(=O)O");
        let wedges: Vec<_> = l.graph().edges().iter().filter(|e| e.wedge.is_some()).collect();
        assert_eq!(wedges.len(), 1);
        assert_eq!(wedges[0].wedge_apex, Some(1));
        assert_eq!(l.graph().vertex(1).atom.descriptor, Some(crate::graph::Descriptor::S));
    }
}
