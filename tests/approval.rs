use serde::Deserialize;

use moldraw::{layout_smiles, DrawCommand, Layout, Options};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn layout(smiles: &str) -> Layout {
    layout_smiles(smiles, Options::default())
        .unwrap_or_else(|e| panic!("layout failed for {smiles:?}: {e}"))
}

fn labels(commands: &[DrawCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Text { element, .. } => Some(element.clone()),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 1. Structure and emitted labels
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LayoutEntry {
    smiles: String,
    vertices: usize,
    edges: usize,
    rings: usize,
    heavy_atoms: usize,
    bridged: usize,
    fused: usize,
    spiro: usize,
    aromatic_circles: usize,
    labels: Vec<String>,
}

#[test]
fn approval_layouts() {
    let data: Vec<LayoutEntry> =
        serde_json::from_str(include_str!("approval_data/layouts.json")).unwrap();

    let mut failures = Vec::new();
    for entry in &data {
        let l = layout(&entry.smiles);
        let commands = l.draw_commands();
        let circles = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::AromaticRing { .. }))
            .count();

        let actual = (
            l.graph().vertices().len(),
            l.graph().edges().len(),
            l.ring_count(),
            l.heavy_atom_count(),
            l.bridged_rings().len(),
            l.fused_rings().len(),
            l.spiro_rings().len(),
            circles,
        );
        let expected = (
            entry.vertices,
            entry.edges,
            entry.rings,
            entry.heavy_atoms,
            entry.bridged,
            entry.fused,
            entry.spiro,
            entry.aromatic_circles,
        );
        if actual != expected {
            failures.push(format!(
                "[structure] {}: expected {:?}, got {:?}",
                entry.smiles, expected, actual
            ));
        }

        let got = labels(&commands);
        if got != entry.labels {
            failures.push(format!(
                "[labels] {}: expected {:?}, got {:?}",
                entry.smiles, entry.labels, got
            ));
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} approval failures:\n{}",
            failures.len(),
            failures.join("\n")
        );
    }
}

// ---------------------------------------------------------------------------
// 2. Geometry sanity over a drug-like set
// ---------------------------------------------------------------------------

const DRUGS: &[&str] = &[
    "CC(=O)Oc1ccccc1C(=O)O",
    "Cn1cnc2c1c(=O)n(C)c(=O)n2C",
    "CC(C)Cc1ccc(cc1)C(C)C(=O)O",
    "C1CC2CCC1C2",
    "C1CC2CC1C=C2",
    "C12C3C4C1C5C2C3C45",
    "OC(=O)C1=CC=CC=C1",
    "CC(C)(C)c1ccc(O)cc1",
    "FC(F)(F)C(F)(F)C(F)(F)F",
];

#[test]
fn approval_bond_lengths() {
    let mut failures = Vec::new();
    for smiles in DRUGS {
        let l = layout(smiles);
        let g = l.graph();
        for v in g.vertices() {
            if !v.positioned || !v.position.is_finite() {
                failures.push(format!("[position] {smiles}: vertex {} not placed", v.id));
            }
        }
        for e in g.edges() {
            let d = g.vertex(e.source).position.distance(g.vertex(e.target).position);
            if !(5.0..25.0).contains(&d) {
                failures.push(format!(
                    "[bond] {smiles}: edge {}-{} has length {d:.2}",
                    e.source, e.target
                ));
            }
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} approval failures:\n{}",
            failures.len(),
            failures.join("\n")
        );
    }
}

#[test]
fn approval_commands_serialise() {
    for smiles in DRUGS {
        let commands = layout(smiles).draw_commands();
        let json = serde_json::to_string(&commands).unwrap();
        assert!(json.starts_with(r#"[{"type":"background""#), "{smiles}");
    }
}
