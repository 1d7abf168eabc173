pub mod error;
mod tokenizer;
pub mod tree;

pub use error::SmilesError;
pub use tree::{AtomSpec, BondSymbol, BracketAtom, Chirality, ParseNode, ParseTree, RingClosure};

/// Reads a SMILES string into the parse tree the layout engine consumes.
///
/// Ring-closure pairing is not validated here; an unpaired marker is
/// reported when the graph is built from the tree.
pub fn parse_smiles(s: &str) -> Result<ParseTree, SmilesError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    let tokens = tokenizer::tokenize(trimmed)?;
    if tokens.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    tree::build_parse_tree(&tokens)
}
