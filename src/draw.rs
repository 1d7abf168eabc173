//! Turns a positioned graph into renderer-neutral draw commands.
//!
//! Commands carry plain geometry and styling hints; turning them into SVG,
//! canvas calls or pixels is up to the consumer.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use serde::Serialize;

use crate::geometry::{self, Line, Vector2};
use crate::graph::{Edge, Graph, PseudoElement, Vertex, Wedge};
use crate::options::{AtomVisualization, Options};
use crate::smiles::BondSymbol;

/// Which way a label grows from its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TextDirection {
    Right,
    Left,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DrawCommand {
    Background {
        color: String,
    },
    Line {
        line: Line,
        dashed: bool,
    },
    /// Solid wedge widening from `line.from`.
    Wedge {
        line: Line,
    },
    /// Hashed wedge widening from `line.from`.
    DashedWedge {
        line: Line,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        position: Vector2,
        element: String,
        hydrogens: u8,
        direction: TextDirection,
        is_terminal: bool,
        charge: i8,
        isotope: Option<u16>,
        pseudo_elements: Vec<PseudoElement>,
        color: String,
    },
    Ball {
        position: Vector2,
        element: String,
        color: String,
    },
    /// Circle inscribed in an aromatic ring.
    AromaticRing {
        center: Vector2,
        radius: f64,
    },
    DebugText {
        position: Vector2,
        text: String,
    },
}

pub fn draw_commands(graph: &Graph, options: &Options) -> Vec<DrawCommand> {
    let mut out = vec![DrawCommand::Background {
        color: options.theme.background.clone(),
    }];
    for edge in graph.edges() {
        draw_edge(graph, options, edge, &mut out);
    }
    draw_aromatic_rings(graph, options, &mut out);
    for vertex in graph.vertices() {
        draw_vertex(graph, options, vertex, &mut out);
    }
    if options.debug {
        for ring in graph.rings() {
            out.push(DrawCommand::DebugText {
                position: ring.center,
                text: format!("r: {}", ring.id),
            });
        }
    }
    out
}

fn line_between(a: &Vertex, b: &Vertex) -> Line {
    Line::new(a.position, b.position, &a.atom.element, &b.atom.element)
}

fn plain(line: Line) -> DrawCommand {
    DrawCommand::Line { line, dashed: false }
}

fn drawn_neighbours(graph: &Graph, vertex: &Vertex, except: usize) -> Vec<usize> {
    vertex
        .neighbours
        .iter()
        .copied()
        .filter(|&n| n != except && graph.vertices[n].atom.is_drawn)
        .collect()
}

fn draw_edge(graph: &Graph, options: &Options, edge: &Edge, out: &mut Vec<DrawCommand>) {
    let a = &graph.vertices[edge.source];
    let b = &graph.vertices[edge.target];
    if !a.atom.is_drawn || !b.atom.is_drawn {
        return;
    }
    let line = line_between(a, b);
    let [n0, n1] = Vector2::unit_normals(a.position, b.position);
    let spacing = options.bond_spacing;

    if let (Some(wedge), Some(apex)) = (edge.wedge, edge.wedge_apex) {
        let other = &graph.vertices[edge.other(apex)];
        let line = line_between(&graph.vertices[apex], other);
        out.push(match wedge {
            Wedge::Up => DrawCommand::Wedge { line },
            Wedge::Down => DrawCommand::DashedWedge { line },
        });
        return;
    }

    match edge.bond {
        BondSymbol::Double => draw_double(graph, options, edge, line, [n0, n1], out),
        BondSymbol::Triple => {
            let offset = spacing / 1.5;
            out.push(plain(line.translated(n0 * offset)));
            out.push(plain(line.translated(n1 * offset)));
            out.push(plain(line));
        }
        BondSymbol::Aromatic => {
            let ring = graph
                .common_rings(edge.source, edge.target)
                .into_iter()
                .find(|&r| graph.rings[r].is_part_of_bridged && graph.is_ring_aromatic(r));
            if let Some(r) = ring {
                let mut inner = inner_line(&line, [n0, n1], graph.rings[r].center, spacing);
                inner.shorten(line.length() * (1.0 - options.short_bond_length));
                out.push(DrawCommand::Line {
                    line: inner,
                    dashed: true,
                });
            }
            out.push(plain(line));
        }
        _ => out.push(plain(line)),
    }
}

/// `line` moved by `spacing` towards `towards`.
fn inner_line(line: &Line, normals: [Vector2; 2], towards: Vector2, spacing: f64) -> Line {
    let mid = Vector2::midpoint(line.from, line.to);
    let closer = (mid + normals[0]).distance_sq(towards) < (mid + normals[1]).distance_sq(towards);
    let normal = if closer { normals[0] } else { normals[1] };
    line.translated(normal * spacing)
}

fn draw_double(
    graph: &Graph,
    options: &Options,
    edge: &Edge,
    line: Line,
    normals: [Vector2; 2],
    out: &mut Vec<DrawCommand>,
) {
    let spacing = options.bond_spacing;
    let shortened = |mut l: Line| {
        l.shorten(l.length() * (1.0 - options.short_bond_length));
        l
    };
    let (s, t) = (edge.source, edge.target);

    let ring = graph
        .common_rings(s, t)
        .into_iter()
        .max_by_key(|&r| (graph.is_ring_aromatic(r), graph.rings[r].size()));
    if let Some(r) = ring {
        let inner = inner_line(&line, normals, graph.rings[r].center, spacing);
        out.push(plain(shortened(inner)));
        out.push(plain(line));
        return;
    }

    let a = &graph.vertices[s];
    let b = &graph.vertices[t];
    let half = options.half_bond_spacing();
    let symmetric = |out: &mut Vec<DrawCommand>| {
        out.push(plain(line.translated(normals[0] * half)));
        out.push(plain(line.translated(normals[1] * half)));
    };
    if edge.center || (a.is_terminal() && b.is_terminal()) {
        symmetric(out);
        return;
    }
    let a_neighbours = drawn_neighbours(graph, a, t);
    let b_neighbours = drawn_neighbours(graph, b, s);
    let (an, bn) = (a_neighbours.len(), b_neighbours.len());
    if (an == 0 && bn > 1) || (bn == 0 && an > 1) {
        symmetric(out);
        return;
    }

    let side = |ids: &mut dyn Iterator<Item = usize>| {
        let mut counts = [0usize; 2];
        for v in ids {
            let p = graph.vertices[v].position;
            let d = p.which_side(a.position, b.position);
            let reference = (a.position + normals[0]).which_side(a.position, b.position);
            if d.abs() < 1e-9 {
                continue;
            }
            if (d > 0.0) == (reference > 0.0) {
                counts[0] += 1;
            } else {
                counts[1] += 1;
            }
        }
        counts
    };
    let mut counts = side(&mut a_neighbours.iter().chain(b_neighbours.iter()).copied());
    if counts[0] == counts[1] {
        counts = side(
            &mut graph
                .vertices()
                .iter()
                .filter(|v| v.atom.is_drawn && v.id != s && v.id != t)
                .map(|v| v.id),
        );
    }
    let normal = if counts[0] <= counts[1] { normals[0] } else { normals[1] };
    out.push(plain(shortened(line.translated(normal * spacing))));
    out.push(plain(line));
}

fn draw_aromatic_rings(graph: &Graph, options: &Options, out: &mut Vec<DrawCommand>) {
    for ring in graph.rings() {
        if ring.is_part_of_bridged || !graph.is_ring_aromatic(ring.id) {
            continue;
        }
        out.push(DrawCommand::AromaticRing {
            center: ring.center,
            radius: ring.apothem(options.bond_length) - options.bond_spacing,
        });
    }
}

fn text_direction(graph: &Graph, vertex: &Vertex) -> TextDirection {
    let angles: Vec<f64> = vertex
        .neighbours
        .iter()
        .filter(|&&n| graph.vertices[n].atom.is_drawn)
        .map(|&n| (vertex.position - graph.vertices[n].position).angle())
        .collect();
    if angles.is_empty() {
        return TextDirection::Right;
    }
    let mean = geometry::mean_angle(&angles);
    if mean.abs() <= FRAC_PI_4 {
        TextDirection::Right
    } else if mean.abs() >= PI - FRAC_PI_4 {
        TextDirection::Left
    } else if (mean - FRAC_PI_2).abs() < FRAC_PI_4 {
        // screen y grows downwards
        TextDirection::Down
    } else {
        TextDirection::Up
    }
}

fn draw_vertex(graph: &Graph, options: &Options, vertex: &Vertex, out: &mut Vec<DrawCommand>) {
    if !vertex.atom.is_drawn {
        return;
    }
    if options.debug {
        out.push(DrawCommand::DebugText {
            position: vertex.position,
            text: format!("v: {}", vertex.id),
        });
    }
    let atom = &vertex.atom;
    let color = options.theme.color(&atom.element).to_owned();
    if options.atom_visualization == AtomVisualization::AllBalls {
        out.push(DrawCommand::Ball {
            position: vertex.position,
            element: atom.element.clone(),
            color,
        });
        return;
    }

    let is_carbon = atom.element == "C";
    let has_pseudo = atom.has_attached_pseudo_elements();
    let is_terminal =
        (options.terminal_carbons || !is_carbon || has_pseudo) && vertex.is_terminal();
    let show = !is_carbon
        || atom.draw_explicit
        || is_terminal
        || has_pseudo
        || atom.charge() != 0
        || atom.isotope().is_some()
        || graph.vertices().len() == 1;
    if !show {
        return;
    }
    if options.atom_visualization == AtomVisualization::Balls {
        out.push(DrawCommand::Ball {
            position: vertex.position,
            element: atom.element.clone(),
            color,
        });
        return;
    }
    out.push(DrawCommand::Text {
        position: vertex.position,
        element: atom.element.clone(),
        hydrogens: graph.implicit_hydrogens(vertex.id),
        direction: text_direction(graph, vertex),
        is_terminal,
        charge: atom.charge(),
        isotope: atom.isotope(),
        pseudo_elements: atom.pseudo_elements.clone(),
        color,
    });
}
