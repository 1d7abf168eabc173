//! The recursive parse tree consumed by graph construction.
//!
//! Each node is one atom together with the bond that leads into it, the
//! ring-closure markers written after it, its parenthesised branches and the
//! atom that linearly follows it.

use serde::{Deserialize, Serialize};

use crate::smiles::error::SmilesError;
use crate::smiles::tokenizer::{AtomToken, Token};

/// Bond symbols as written in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondSymbol {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
    /// `/`, a single bond carrying double-bond configuration.
    Up,
    /// `\`, a single bond carrying double-bond configuration.
    Down,
}

impl BondSymbol {
    pub fn order(self) -> u8 {
        match self {
            Self::Single | Self::Aromatic | Self::Up | Self::Down => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Quadruple => 4,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Single => '-',
            Self::Double => '=',
            Self::Triple => '#',
            Self::Quadruple => '$',
            Self::Aromatic => ':',
            Self::Up => '/',
            Self::Down => '\\',
        }
    }
}

/// Tetrahedral chirality tag of a bracket atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Chirality {
    #[default]
    None,
    /// `@`: looking from the first neighbour, the others run counterclockwise.
    CounterClockwise,
    /// `@@`
    Clockwise,
}

/// Attributes only a bracket atom can carry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BracketAtom {
    pub isotope: Option<u16>,
    pub hydrogens: u8,
    pub charge: i8,
    pub chirality: Chirality,
    pub class: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomSpec {
    /// Element symbol with canonical capitalisation ("C", "Cl", "Se").
    pub element: String,
    /// Written in lowercase in the input.
    pub aromatic: bool,
    pub bracket: Option<BracketAtom>,
}

impl AtomSpec {
    pub fn new(element: &str) -> Self {
        Self {
            element: element.to_owned(),
            aromatic: false,
            bracket: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingClosure {
    pub id: u16,
    pub bond: Option<BondSymbol>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseNode {
    pub atom: AtomSpec,
    /// Bond leading into this atom from its parent, if written.
    pub bond: Option<BondSymbol>,
    pub ring_closures: Vec<RingClosure>,
    pub branches: Vec<ParseNode>,
    pub next: Option<Box<ParseNode>>,
}

impl ParseNode {
    pub fn new(atom: AtomSpec) -> Self {
        Self {
            atom,
            bond: None,
            ring_closures: Vec::new(),
            branches: Vec::new(),
            next: None,
        }
    }

    /// Number of atoms in this node's subtree, itself included.
    pub fn atom_count(&self) -> usize {
        let mut count = 0;
        let mut cur = Some(self);
        while let Some(node) = cur {
            count += 1 + node.branches.iter().map(ParseNode::atom_count).sum::<usize>();
            cur = node.next.as_deref();
        }
        count
    }
}

/// One root per dot-separated fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseTree {
    pub fragments: Vec<ParseNode>,
}

impl ParseTree {
    pub fn atom_count(&self) -> usize {
        self.fragments.iter().map(ParseNode::atom_count).sum()
    }
}

pub(crate) fn build_parse_tree(tokens: &[Token]) -> Result<ParseTree, SmilesError> {
    let mut fragments = Vec::new();
    let mut pos = 0;

    while pos < tokens.len() {
        fragments.push(parse_chain(tokens, &mut pos, None)?);
        match tokens.get(pos) {
            None => break,
            Some(Token::Dot(_)) => pos += 1,
            Some(Token::CloseParen(p)) => return Err(SmilesError::UnmatchedParen { pos: *p }),
            Some(other) => return Err(SmilesError::ExpectedAtom { pos: token_pos(other) }),
        }
    }

    if fragments.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    Ok(ParseTree { fragments })
}

fn parse_chain(
    tokens: &[Token],
    pos: &mut usize,
    bond: Option<BondSymbol>,
) -> Result<ParseNode, SmilesError> {
    let atom_tok = match tokens.get(*pos) {
        Some(Token::Atom(a)) => a,
        Some(other) => return Err(SmilesError::ExpectedAtom { pos: token_pos(other) }),
        None => {
            return Err(SmilesError::ExpectedAtom {
                pos: tokens.last().map(token_pos).unwrap_or(0),
            })
        }
    };
    *pos += 1;

    let mut node = ParseNode::new(atom_spec(atom_tok));
    node.bond = bond;

    loop {
        match tokens.get(*pos) {
            Some(Token::RingClosure { bond, id, .. }) => {
                node.ring_closures.push(RingClosure {
                    id: *id,
                    bond: *bond,
                });
                *pos += 1;
            }
            Some(Token::OpenParen(open)) => {
                let open = *open;
                *pos += 1;
                let branch_bond = match tokens.get(*pos) {
                    Some(Token::Bond(b, _)) => {
                        *pos += 1;
                        Some(*b)
                    }
                    _ => None,
                };
                let branch = parse_chain(tokens, pos, branch_bond)?;
                match tokens.get(*pos) {
                    Some(Token::CloseParen(_)) => *pos += 1,
                    _ => return Err(SmilesError::UnmatchedParen { pos: open }),
                }
                node.branches.push(branch);
            }
            Some(Token::Bond(b, _)) => {
                let b = *b;
                *pos += 1;
                node.next = Some(Box::new(parse_chain(tokens, pos, Some(b))?));
                break;
            }
            Some(Token::Atom(_)) => {
                node.next = Some(Box::new(parse_chain(tokens, pos, None)?));
                break;
            }
            Some(Token::CloseParen(_)) | Some(Token::Dot(_)) | None => break,
        }
    }

    Ok(node)
}

fn atom_spec(tok: &AtomToken) -> AtomSpec {
    AtomSpec {
        element: tok.element.clone(),
        aromatic: tok.is_aromatic,
        bracket: tok.is_bracket.then(|| BracketAtom {
            isotope: tok.isotope,
            hydrogens: tok.hcount,
            charge: tok.charge,
            chirality: tok.chirality,
            class: tok.class,
        }),
    }
}

fn token_pos(tok: &Token) -> usize {
    match tok {
        Token::Atom(a) => a.pos,
        Token::Bond(_, pos)
        | Token::RingClosure { pos, .. }
        | Token::OpenParen(pos)
        | Token::CloseParen(pos)
        | Token::Dot(pos) => *pos,
    }
}
