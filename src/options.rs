//! Construction-time configuration of a layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How atoms are depicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AtomVisualization {
    /// Element labels for heteroatoms and special carbons.
    #[default]
    Default,
    /// A ball instead of every label that would otherwise be drawn.
    Balls,
    /// A ball for every atom.
    AllBalls,
}

/// Element colours and the background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Theme {
    pub colors: BTreeMap<String, String>,
    pub background: String,
    /// Colour for elements missing from `colors`.
    pub default_color: String,
}

impl Theme {
    pub fn light() -> Self {
        let colors = [
            ("C", "#222"),
            ("O", "#e74c3c"),
            ("N", "#3498db"),
            ("F", "#27ae60"),
            ("Cl", "#16a085"),
            ("Br", "#d35400"),
            ("I", "#8e44ad"),
            ("P", "#d35400"),
            ("S", "#f1c40f"),
            ("B", "#e67e22"),
            ("Si", "#e67e22"),
            ("H", "#aaa"),
        ]
        .into_iter()
        .map(|(e, c)| (e.to_owned(), c.to_owned()))
        .collect();
        Self {
            colors,
            background: "#fff".to_owned(),
            default_color: "#222".to_owned(),
        }
    }

    pub fn dark() -> Self {
        let mut theme = Self::light();
        theme.colors.insert("C".to_owned(), "#fff".to_owned());
        theme.colors.insert("H".to_owned(), "#fff".to_owned());
        theme.background = "#141414".to_owned();
        theme.default_color = "#fff".to_owned();
        theme
    }

    pub fn color(&self, element: &str) -> &str {
        self.colors
            .get(element)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    pub bond_length: f64,
    /// Length of the inner strand of a double bond as a fraction of
    /// `bond_length`.
    pub short_bond_length: f64,
    pub bond_spacing: f64,
    pub bond_thickness: f64,
    pub font_size_large: f64,
    pub font_size_small: f64,
    pub padding: f64,
    /// Honour chirality and expand stereo hydrogens.
    pub isomeric: bool,
    /// Label terminal carbons ("CH3").
    pub terminal_carbons: bool,
    /// Draw every hydrogen vertex.
    pub explicit_hydrogens: bool,
    /// Collapse terminal groups into pseudo elements ("CF3").
    pub compact_drawing: bool,
    /// Allow the overlap resolver to mirror terminal substituents.
    pub ring_flips: bool,
    /// Emit vertex-id annotations.
    pub debug: bool,
    pub atom_visualization: AtomVisualization,
    /// Per-vertex overlap score above which a vertex counts as clashing.
    pub overlap_sensitivity: f64,
    pub overlap_resolution_iterations: usize,
    pub theme: Theme,
}

impl Options {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// `bond_spacing / 2`, used for symmetric double bonds.
    pub fn half_bond_spacing(&self) -> f64 {
        self.bond_spacing / 2.0
    }
}

impl Default for Options {
    fn default() -> Self {
        let bond_length = 15.0;
        Self {
            bond_length,
            short_bond_length: 0.85,
            bond_spacing: 0.18 * bond_length,
            bond_thickness: 0.6,
            font_size_large: 5.0,
            font_size_small: 3.0,
            padding: 20.0,
            isomeric: true,
            terminal_carbons: false,
            explicit_hydrogens: false,
            compact_drawing: true,
            ring_flips: true,
            debug: false,
            atom_visualization: AtomVisualization::Default,
            overlap_sensitivity: 0.42,
            overlap_resolution_iterations: 1,
            theme: Theme::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts = Options::from_json(r#"{"bondLength": 30.0, "terminalCarbons": true}"#).unwrap();
        assert_eq!(opts.bond_length, 30.0);
        assert!(opts.terminal_carbons);
        assert!(opts.isomeric);
        assert_eq!(opts.theme, Theme::light());
    }

    #[test]
    fn visualization_names() {
        let opts = Options::from_json(r#"{"atomVisualization": "allBalls"}"#).unwrap();
        assert_eq!(opts.atom_visualization, AtomVisualization::AllBalls);
    }

    #[test]
    fn theme_fallback_color() {
        let theme = Theme::light();
        assert_eq!(theme.color("O"), "#e74c3c");
        assert_eq!(theme.color("Fe"), "#222");
    }
}
