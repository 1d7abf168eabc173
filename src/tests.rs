use crate::graph::ConnectionKind;
use crate::*;

fn layout(smiles: &str) -> Layout {
    layout_smiles(smiles, Options::default()).unwrap()
}

fn texts(commands: &[DrawCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Text { element, .. } => Some(element.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn ring_free_molecule_has_no_rings() {
    let l = layout("CC(C)CC(=O)OCC");
    assert_eq!(l.ring_count(), 0);
    assert!(l.bridged_rings().is_empty());
    assert!(l.graph().ring_connections().is_empty());
    assert!(l.graph().vertices().iter().all(|v| v.atom.rings.is_empty()));
}

#[test]
fn simple_cycles_sit_on_their_circumcircle() {
    for (smiles, n) in [
        ("C1CC1", 3),
        ("C1CCC1", 4),
        ("C1CCCC1", 5),
        ("C1CCCCC1", 6),
        ("C1CCCCCCC1", 8),
    ] {
        let l = layout(smiles);
        assert_eq!(l.ring_count(), 1, "{}", smiles);
        let ring = l.graph().rings().next().unwrap();
        assert_eq!(ring.members.len(), n);
        let radius = geometry::poly_circumradius(15.0, n);
        for &m in &ring.members {
            let d = l.graph().vertex(m).position.distance(ring.center);
            assert!((d - radius).abs() < 1e-6, "{}: {} vs {}", smiles, d, radius);
        }
    }
}

#[test]
fn naphthalene_is_fused_not_merged() {
    let l = layout("c1ccc2ccccc2c1");
    assert_eq!(l.ring_count(), 2);
    assert!(l.bridged_rings().is_empty());
    let connections = l.graph().ring_connections();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].kind(l.graph()), ConnectionKind::Fused);
    assert_eq!(connections[0].vertices.len(), 2);
}

#[test]
fn spiro_centers_lie_on_opposite_sides() {
    let l = layout("C1CCC12CCC2");
    assert_eq!(l.ring_count(), 2);
    assert_eq!(l.spiro_rings().len(), 2);
    assert!(l.bridged_rings().is_empty());
    let shared = l.graph().vertex(3).position;
    let centers: Vec<Vector2> = l.graph().rings().map(|r| r.center).collect();
    let (a, b) = (centers[0] - shared, centers[1] - shared);
    assert!(a.x * b.x + a.y * b.y < 0.0);
    assert!(a.cross(b).abs() < 1e-6);
}

#[test]
fn norbornane_is_merged_and_relaxed() {
    let tree = parse_smiles("C1CC2CCC1C2").unwrap();
    let mut graph = Graph::from_tree(&tree, true).unwrap();
    graph.perceive_rings();
    let bridged: Vec<&Ring> = graph.rings().filter(|r| r.is_bridged).collect();
    assert_eq!(bridged.len(), 1);
    assert_eq!(graph.rings().count(), 1);
    let ring = bridged[0];
    assert!(!ring.insiders.is_empty());
    assert_eq!(ring.members.len() + ring.insiders.len(), 7);

    let l = layout("C1CC2CCC1C2");
    assert_eq!(l.bridged_rings().len(), 1);
    let relaxation = &l.relaxations()[0];
    assert_eq!(relaxation.iterations, 600);
    assert!(relaxation.max_displacement < 1e-2 * 15.0);
    assert_bonds_near_length(&l);
}

fn assert_bonds_near_length(l: &Layout) {
    let g = l.graph();
    for e in g.edges() {
        let d = g.vertex(e.source).position.distance(g.vertex(e.target).position);
        assert!(d.is_finite());
        assert!((d - 15.0).abs() < 0.1 * 15.0, "edge {} has length {}", e.id, d);
    }
}

#[test]
fn bridged_systems_keep_their_bond_lengths() {
    for smiles in ["C1CC2CC1CC2", "C1CC2CCC1CC2", "C1C2CC3CC1CC(C2)C3"] {
        let l = layout(smiles);
        assert_eq!(l.relaxations().len(), 1, "{}", smiles);
        assert!(l.relaxations()[0].max_displacement < 1e-2 * 15.0, "{}", smiles);
        assert_bonds_near_length(&l);
    }
}

#[test]
fn cubane_is_relaxed_as_a_cage() {
    let l = layout("C12C3C4C1C5C2C3C45");
    assert_eq!(l.bridged_rings().len(), 1);
    assert_eq!(l.relaxations().len(), 1);
    assert!(l.relaxations()[0].max_displacement < 1e-2 * 15.0);
    assert!(l.graph().vertices().iter().all(|v| v.positioned));
    assert_bonds_near_length(&l);
}

#[test]
fn resolving_a_clean_layout_changes_nothing() {
    let mut l = layout("CCCCCCO");
    assert_eq!(l.total_overlap_score(), 0.0);
    let before: Vec<Vector2> = l.graph().vertices().iter().map(|v| v.position).collect();
    assert_eq!(l.resolve_overlaps(), 0.0);
    let after: Vec<Vector2> = l.graph().vertices().iter().map(|v| v.position).collect();
    assert_eq!(before, after);
}

#[test]
fn ethanol() {
    let l = layout("CCO");
    let g = l.graph();
    assert_eq!(g.vertices().len(), 3);
    assert_eq!(g.edges().len(), 2);
    assert_eq!(l.ring_count(), 0);
    assert_eq!(g.vertex(0).position, Vector2::new(15.0, 0.0));
    assert!((g.vertex(1).position.distance(g.vertex(0).position) - 15.0).abs() < 1e-9);
    assert_eq!(texts(&l.draw_commands()), vec!["O"]);

    let with_carbons = layout_smiles(
        "CCO",
        Options {
            terminal_carbons: true,
            ..Options::default()
        },
    )
    .unwrap();
    assert_eq!(texts(&with_carbons.draw_commands()), vec!["C", "O"]);
}

#[test]
fn benzene_is_aromatic() {
    let l = layout("c1ccccc1");
    assert_eq!(l.ring_count(), 1);
    let ring = l.graph().rings().next().unwrap();
    assert_eq!(ring.size(), 6);
    assert!(ring.members.iter().all(|&m| l.graph().vertex(m).atom.aromatic));
    assert!(l.graph().is_ring_aromatic(ring.id));
    let circles = l
        .draw_commands()
        .into_iter()
        .filter(|c| matches!(c, DrawCommand::AromaticRing { .. }))
        .count();
    assert_eq!(circles, 1);
}

#[test]
fn unclosed_ring_is_an_error() {
    assert_eq!(
        layout_smiles("C1CC", Options::default()).unwrap_err(),
        LayoutError::UnclosedRing { id: 1 }
    );
}

#[test]
fn malformed_input_is_an_error() {
    assert!(matches!(
        layout_smiles("C(C", Options::default()),
        Err(LayoutError::Smiles(_))
    ));
    assert!(matches!(
        layout_smiles("", Options::default()),
        Err(LayoutError::Smiles(SmilesError::EmptyInput))
    ));
}

#[test]
fn layout_is_reproducible() {
    let smiles =
        "CC(C)c1c(C(=O)Nc2ccccc2)c(-c2ccccc2)c(-c2ccc(F)cc2)n1CC[C@@H](O)C[C@@H](O)CC(=O)O";
    let a = layout(smiles);
    let b = layout(smiles);
    let positions = |l: &Layout| -> Vec<Vector2> {
        l.graph().vertices().iter().map(|v| v.position).collect()
    };
    assert_eq!(positions(&a), positions(&b));
    assert_eq!(a.draw_commands(), b.draw_commands());
}

#[test]
fn fragments_are_laid_out_side_by_side() {
    let l = layout("CCO.[Na+]");
    let g = l.graph();
    let max_x = (0..3).map(|v| g.vertex(v).position.x).fold(f64::MIN, f64::max);
    assert!(g.vertex(3).position.x > max_x);
    let commands = l.draw_commands();
    let sodium = commands.iter().find_map(|c| match c {
        DrawCommand::Text { element, charge, .. } if element == "Na" => Some(*charge),
        _ => None,
    });
    assert_eq!(sodium, Some(1));
}

#[test]
fn options_load_from_json() {
    let options = Options::from_json(r#"{"bondLength": 30.0, "terminalCarbons": true}"#).unwrap();
    let l = layout_smiles("CC", options).unwrap();
    assert_eq!(l.graph().vertex(0).position, Vector2::new(30.0, 0.0));
    assert_eq!(texts(&l.draw_commands()), vec!["C", "C"]);
}

#[test]
fn debug_annotations() {
    let options = Options {
        debug: true,
        ..Options::default()
    };
    let l = layout_smiles("C1CCCCC1", options).unwrap();
    let debug: Vec<String> = l
        .draw_commands()
        .into_iter()
        .filter_map(|c| match c {
            DrawCommand::DebugText { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(debug.len(), 7);
    assert!(debug.contains(&"v: 0".to_owned()));
    assert!(debug.contains(&"r: 0".to_owned()));
}
