use serde::Serialize;

use crate::element;
use crate::smiles::{AtomSpec, BondSymbol, BracketAtom, Chirality, RingClosure};

use super::RingId;

/// CIP descriptor assigned to a drawn stereocenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Descriptor {
    R,
    S,
}

/// A terminal neighbour folded into its parent's label, e.g. the three
/// fluorines of `CF3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PseudoElement {
    pub element: String,
    pub previous_element: Option<String>,
    pub hydrogens: u8,
    pub charge: i8,
    pub count: usize,
}

/// Chemical payload of a vertex plus the ring and drawing bookkeeping the
/// layout engine attaches to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: String,
    /// Written in lowercase in the input.
    pub aromatic: bool,
    pub bracket: Option<BracketAtom>,
    /// Bond leading into this atom from its parent.
    pub bond_type: BondSymbol,
    /// Bond written at the start of the branch this atom opens, if any.
    pub branch_bond: Option<BondSymbol>,
    pub ring_closures: Vec<RingClosure>,
    /// Active ring ids. After bridged-ring merging this holds the merged id.
    pub rings: Vec<RingId>,
    /// Ring ids as perceived, before any merging.
    pub original_rings: Vec<RingId>,
    pub bridged_ring: Option<RingId>,
    /// Rings whose centers move with this atom during subtree rotations.
    pub anchored_rings: Vec<RingId>,
    pub is_bridge: bool,
    pub is_bridge_node: bool,
    pub is_connected_to_ring: bool,
    pub is_drawn: bool,
    /// Force a label even for plain carbon (e.g. the middle of an allene).
    pub draw_explicit: bool,
    pub is_stereo_center: bool,
    pub has_hydrogen: bool,
    pub descriptor: Option<Descriptor>,
    pub subtree_depth: usize,
    pub pseudo_elements: Vec<PseudoElement>,
}

impl Atom {
    pub fn new(spec: &AtomSpec, bond_type: BondSymbol) -> Self {
        Self {
            element: spec.element.clone(),
            aromatic: spec.aromatic,
            bracket: spec.bracket.clone(),
            bond_type,
            branch_bond: None,
            ring_closures: Vec::new(),
            rings: Vec::new(),
            original_rings: Vec::new(),
            bridged_ring: None,
            anchored_rings: Vec::new(),
            is_bridge: false,
            is_bridge_node: false,
            is_connected_to_ring: false,
            is_drawn: true,
            draw_explicit: false,
            is_stereo_center: false,
            has_hydrogen: false,
            descriptor: None,
            subtree_depth: 1,
            pseudo_elements: Vec::new(),
        }
    }

    /// An expanded hydrogen.
    pub fn hydrogen() -> Self {
        Self::new(&AtomSpec::new("H"), BondSymbol::Single)
    }

    pub fn atomic_number(&self) -> u8 {
        element::atomic_number(&self.element).unwrap_or(0)
    }

    pub fn max_bonds(&self) -> u8 {
        element::max_bonds(&self.element).unwrap_or(0)
    }

    pub fn is_hetero(&self) -> bool {
        self.element != "C" && self.element != "H"
    }

    pub fn charge(&self) -> i8 {
        self.bracket.as_ref().map_or(0, |b| b.charge)
    }

    pub fn isotope(&self) -> Option<u16> {
        self.bracket.as_ref().and_then(|b| b.isotope)
    }

    pub fn chirality(&self) -> Chirality {
        self.bracket.as_ref().map_or(Chirality::None, |b| b.chirality)
    }

    pub fn has_attached_pseudo_elements(&self) -> bool {
        !self.pseudo_elements.is_empty()
    }

    /// Folds a terminal neighbour into this atom's label. Identical
    /// neighbours are counted rather than repeated.
    pub fn attach_pseudo_element(
        &mut self,
        element: &str,
        previous_element: Option<&str>,
        hydrogens: u8,
        charge: i8,
    ) {
        if let Some(existing) = self
            .pseudo_elements
            .iter_mut()
            .find(|p| p.element == element && p.hydrogens == hydrogens && p.charge == charge)
        {
            existing.count += 1;
            return;
        }
        self.pseudo_elements.push(PseudoElement {
            element: element.to_owned(),
            previous_element: previous_element.map(str::to_owned),
            hydrogens,
            charge,
            count: 1,
        });
    }
}
