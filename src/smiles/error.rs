use std::fmt;

/// Errors produced when reading a SMILES string into a parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    /// An unexpected character was encountered at the given position.
    UnexpectedChar { pos: usize, ch: char },
    /// An unrecognized element symbol was found.
    InvalidElement { pos: usize, text: String },
    /// A bracket atom `[` was opened but never closed with `]`.
    UnclosedBracket { pos: usize },
    /// A parenthesis was opened without a matching close, or vice versa.
    UnmatchedParen { pos: usize },
    /// A charge specifier inside a bracket atom could not be parsed.
    InvalidCharge { pos: usize },
    /// An isotope number overflowed.
    InvalidIsotope { pos: usize },
    /// A bond symbol or ring-closure digit appeared where an atom was expected.
    ExpectedAtom { pos: usize },
    /// The input string was empty or contained only whitespace.
    EmptyInput,
}

impl fmt::Display for SmilesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar { pos, ch } => {
                write!(f, "unexpected character '{}' at position {}", ch, pos)
            }
            Self::InvalidElement { pos, text } => {
                write!(f, "invalid element '{}' at position {}", text, pos)
            }
            Self::UnclosedBracket { pos } => {
                write!(f, "unclosed bracket atom starting at position {}", pos)
            }
            Self::UnmatchedParen { pos } => {
                write!(f, "unmatched parenthesis at position {}", pos)
            }
            Self::InvalidCharge { pos } => write!(f, "invalid charge at position {}", pos),
            Self::InvalidIsotope { pos } => write!(f, "isotope overflow at position {}", pos),
            Self::ExpectedAtom { pos } => write!(f, "expected an atom at position {}", pos),
            Self::EmptyInput => write!(f, "empty SMILES string"),
        }
    }
}

impl std::error::Error for SmilesError {}
