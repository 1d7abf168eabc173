use crate::element;
use crate::smiles::error::SmilesError;
use crate::smiles::tree::{BondSymbol, Chirality};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Atom(AtomToken),
    Bond(BondSymbol, usize),
    RingClosure {
        bond: Option<BondSymbol>,
        id: u16,
        pos: usize,
    },
    OpenParen(usize),
    CloseParen(usize),
    Dot(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomToken {
    pub element: String,
    pub is_aromatic: bool,
    pub isotope: Option<u16>,
    pub chirality: Chirality,
    pub hcount: u8,
    pub charge: i8,
    pub class: u16,
    pub is_bracket: bool,
    pub pos: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, SmilesError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
            }
            '[' => {
                let (tok, next) = parse_bracket_atom(&chars, i)?;
                tokens.push(Token::Atom(tok));
                i = next;
            }
            'B' if chars.get(i + 1) == Some(&'r') => {
                tokens.push(Token::Atom(bare_atom("Br", false, i)));
                i += 2;
            }
            'C' if chars.get(i + 1) == Some(&'l') => {
                tokens.push(Token::Atom(bare_atom("Cl", false, i)));
                i += 2;
            }
            c @ ('B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I') => {
                tokens.push(Token::Atom(bare_atom(&c.to_string(), false, i)));
                i += 1;
            }
            c @ ('b' | 'c' | 'n' | 'o' | 'p' | 's') => {
                let symbol = c.to_ascii_uppercase().to_string();
                tokens.push(Token::Atom(bare_atom(&symbol, true, i)));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Bond(BondSymbol::Single, i));
                i += 1;
            }
            '=' => {
                tokens.push(Token::Bond(BondSymbol::Double, i));
                i += 1;
            }
            '#' => {
                tokens.push(Token::Bond(BondSymbol::Triple, i));
                i += 1;
            }
            '$' => {
                tokens.push(Token::Bond(BondSymbol::Quadruple, i));
                i += 1;
            }
            ':' => {
                tokens.push(Token::Bond(BondSymbol::Aromatic, i));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Bond(BondSymbol::Up, i));
                i += 1;
            }
            '\\' => {
                tokens.push(Token::Bond(BondSymbol::Down, i));
                i += 1;
            }
            '(' => {
                tokens.push(Token::OpenParen(i));
                i += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen(i));
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot(i));
                i += 1;
            }
            '%' => {
                let (id, next) = parse_percent_ring(&chars, i)?;
                let bond = try_consume_pending_bond(&mut tokens);
                tokens.push(Token::RingClosure { bond, id, pos: i });
                i = next;
            }
            d @ '0'..='9' => {
                let bond = try_consume_pending_bond(&mut tokens);
                tokens.push(Token::RingClosure {
                    bond,
                    id: (d as u16) - b'0' as u16,
                    pos: i,
                });
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                return Err(SmilesError::InvalidElement {
                    pos: i,
                    text: c.to_string(),
                });
            }
            ch => return Err(SmilesError::UnexpectedChar { pos: i, ch }),
        }
    }

    Ok(tokens)
}

fn bare_atom(element: &str, aromatic: bool, pos: usize) -> AtomToken {
    AtomToken {
        element: element.to_owned(),
        is_aromatic: aromatic,
        isotope: None,
        chirality: Chirality::None,
        hcount: 0,
        charge: 0,
        class: 0,
        is_bracket: false,
        pos,
    }
}

// A bond written directly before a ring-closure digit belongs to the closure.
fn try_consume_pending_bond(tokens: &mut Vec<Token>) -> Option<BondSymbol> {
    if let Some(Token::Bond(..)) = tokens.last() {
        if let Some(Token::Bond(b, _)) = tokens.pop() {
            return Some(b);
        }
    }
    None
}

fn parse_percent_ring(chars: &[char], start: usize) -> Result<(u16, usize), SmilesError> {
    let i = start + 1;
    if i + 1 >= chars.len() || !chars[i].is_ascii_digit() || !chars[i + 1].is_ascii_digit() {
        return Err(SmilesError::UnexpectedChar {
            pos: start,
            ch: '%',
        });
    }
    let d1 = (chars[i] as u16) - b'0' as u16;
    let d2 = (chars[i + 1] as u16) - b'0' as u16;
    Ok((d1 * 10 + d2, i + 2))
}

fn parse_bracket_atom(chars: &[char], start: usize) -> Result<(AtomToken, usize), SmilesError> {
    let mut i = start + 1; // skip '['

    let isotope = parse_isotope(chars, &mut i, start)?;
    let (element, is_aromatic) = parse_bracket_element(chars, &mut i, start)?;
    let chirality = parse_chirality(chars, &mut i);
    let hcount = parse_hcount(chars, &mut i);
    let charge = parse_charge(chars, &mut i, start)?;
    let class = parse_class(chars, &mut i);

    if i >= chars.len() || chars[i] != ']' {
        return Err(SmilesError::UnclosedBracket { pos: start });
    }
    i += 1; // skip ']'

    Ok((
        AtomToken {
            element,
            is_aromatic,
            isotope,
            chirality,
            hcount,
            charge,
            class,
            is_bracket: true,
            pos: start,
        },
        i,
    ))
}

fn parse_isotope(chars: &[char], i: &mut usize, start: usize) -> Result<Option<u16>, SmilesError> {
    let mut val: u16 = 0;
    let mut found = false;
    while *i < chars.len() && chars[*i].is_ascii_digit() {
        found = true;
        val = val
            .checked_mul(10)
            .and_then(|v| v.checked_add(chars[*i] as u16 - b'0' as u16))
            .ok_or(SmilesError::InvalidIsotope { pos: start })?;
        *i += 1;
    }
    Ok(found.then_some(val))
}

fn parse_bracket_element(
    chars: &[char],
    i: &mut usize,
    bracket_start: usize,
) -> Result<(String, bool), SmilesError> {
    if *i >= chars.len() {
        return Err(SmilesError::UnclosedBracket { pos: bracket_start });
    }

    const AROMATIC: [&str; 9] = ["se", "as", "te", "b", "c", "n", "o", "p", "s"];
    for pat in AROMATIC {
        let end = *i + pat.len();
        if end > chars.len() {
            continue;
        }
        let slice: String = chars[*i..end].iter().collect();
        if slice == pat {
            *i = end;
            let mut symbol = pat.to_owned();
            symbol[..1].make_ascii_uppercase();
            return Ok((symbol, true));
        }
    }

    // Two-letter symbols win over their one-letter prefix ("Cl" over "C").
    if *i + 1 < chars.len() && chars[*i].is_ascii_uppercase() && chars[*i + 1].is_ascii_lowercase()
    {
        let sym: String = chars[*i..=*i + 1].iter().collect();
        if element::is_element(&sym) {
            *i += 2;
            return Ok((sym, false));
        }
    }

    if chars[*i].is_ascii_uppercase() {
        let sym = chars[*i].to_string();
        if element::is_element(&sym) {
            *i += 1;
            return Ok((sym, false));
        }
    }

    Err(SmilesError::InvalidElement {
        pos: *i,
        text: chars.get(*i).map(|c| c.to_string()).unwrap_or_default(),
    })
}

fn parse_chirality(chars: &[char], i: &mut usize) -> Chirality {
    if *i < chars.len() && chars[*i] == '@' {
        *i += 1;
        if *i < chars.len() && chars[*i] == '@' {
            *i += 1;
            Chirality::Clockwise
        } else {
            Chirality::CounterClockwise
        }
    } else {
        Chirality::None
    }
}

fn parse_hcount(chars: &[char], i: &mut usize) -> u8 {
    if *i < chars.len() && chars[*i] == 'H' {
        *i += 1;
        let mut count: u8 = 1;
        if *i < chars.len() && chars[*i].is_ascii_digit() {
            count = chars[*i] as u8 - b'0';
            *i += 1;
        }
        count
    } else {
        0
    }
}

fn parse_charge(chars: &[char], i: &mut usize, bracket_start: usize) -> Result<i8, SmilesError> {
    let sign: i8 = match chars.get(*i) {
        Some('+') => 1,
        Some('-') => -1,
        _ => return Ok(0),
    };
    let symbol = chars[*i];
    *i += 1;

    if *i < chars.len() && chars[*i] == symbol {
        let mut count: i8 = 1;
        while *i < chars.len() && chars[*i] == symbol {
            count = count
                .checked_add(1)
                .ok_or(SmilesError::InvalidCharge { pos: bracket_start })?;
            *i += 1;
        }
        return Ok(sign * count);
    }

    if *i < chars.len() && chars[*i].is_ascii_digit() {
        let mut val: i8 = 0;
        while *i < chars.len() && chars[*i].is_ascii_digit() {
            val = val
                .checked_mul(10)
                .and_then(|v| v.checked_add((chars[*i] as i8) - b'0' as i8))
                .ok_or(SmilesError::InvalidCharge { pos: bracket_start })?;
            *i += 1;
        }
        return Ok(sign * val);
    }

    Ok(sign)
}

fn parse_class(chars: &[char], i: &mut usize) -> u16 {
    if *i < chars.len() && chars[*i] == ':' {
        *i += 1;
        let mut val: u16 = 0;
        while *i < chars.len() && chars[*i].is_ascii_digit() {
            val = val.saturating_mul(10).saturating_add(chars[*i] as u16 - b'0' as u16);
            *i += 1;
        }
        val
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(tok: &Token) -> &AtomToken {
        match tok {
            Token::Atom(a) => a,
            other => panic!("expected atom, got {other:?}"),
        }
    }

    #[test]
    fn tokenize_methane() {
        let tokens = tokenize("C").unwrap();
        assert_eq!(tokens.len(), 1);
        let a = atom(&tokens[0]);
        assert_eq!(a.element, "C");
        assert!(!a.is_bracket);
        assert!(!a.is_aromatic);
    }

    #[test]
    fn two_letter_organic() {
        let tokens = tokenize("ClCBr").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(atom(&tokens[0]).element, "Cl");
        assert_eq!(atom(&tokens[2]).element, "Br");
    }

    #[test]
    fn tokenize_bracket_atom() {
        let tokens = tokenize("[NH4+]").unwrap();
        let a = atom(&tokens[0]);
        assert_eq!(a.element, "N");
        assert!(a.is_bracket);
        assert_eq!(a.hcount, 4);
        assert_eq!(a.charge, 1);
    }

    #[test]
    fn tokenize_isotope() {
        let tokens = tokenize("[13CH4]").unwrap();
        let a = atom(&tokens[0]);
        assert_eq!(a.isotope, Some(13));
        assert_eq!(a.element, "C");
    }

    #[test]
    fn ring_closure_takes_preceding_bond() {
        let tokens = tokenize("C=1CC1").unwrap();
        assert!(matches!(
            tokens[1],
            Token::RingClosure {
                bond: Some(BondSymbol::Double),
                id: 1,
                ..
            }
        ));
    }

    #[test]
    fn percent_ring() {
        let tokens = tokenize("C%10CC%10").unwrap();
        assert!(matches!(tokens[1], Token::RingClosure { id: 10, .. }));
    }

    #[test]
    fn chirality_tags() {
        let tokens = tokenize("[C@@H](F)(Cl)Br").unwrap();
        let a = atom(&tokens[0]);
        assert_eq!(a.chirality, Chirality::Clockwise);
        assert_eq!(a.hcount, 1);
        let tokens = tokenize("[C@H](F)(Cl)Br").unwrap();
        assert_eq!(atom(&tokens[0]).chirality, Chirality::CounterClockwise);
    }

    #[test]
    fn aromatic_bracket_selenium() {
        let tokens = tokenize("[se]").unwrap();
        let a = atom(&tokens[0]);
        assert!(a.is_aromatic);
        assert_eq!(a.element, "Se");
    }

    #[test]
    fn charge_variants() {
        for (s, q) in [("[O-]", -1), ("[O-2]", -2), ("[O--]", -2), ("[Fe+3]", 3)] {
            let tokens = tokenize(s).unwrap();
            assert_eq!(atom(&tokens[0]).charge, q, "{s}");
        }
    }

    #[test]
    fn unknown_bare_symbol() {
        assert!(matches!(
            tokenize("CX"),
            Err(SmilesError::InvalidElement { pos: 1, .. })
        ));
    }

    #[test]
    fn unknown_bracket_symbol() {
        assert!(matches!(
            tokenize("[Xx]"),
            Err(SmilesError::InvalidElement { .. })
        ));
    }

    #[test]
    fn unclosed_bracket() {
        assert!(matches!(
            tokenize("[C"),
            Err(SmilesError::UnclosedBracket { pos: 0 })
        ));
    }
}
