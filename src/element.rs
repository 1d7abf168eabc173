//! Element symbol table.
//!
//! The layout engine only needs to know whether a symbol is a real element,
//! its atomic number (for stereo priorities) and how many bonds it usually
//! forms (for the hydrogen count written next to heteroatom labels).

static SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Atomic number for an element symbol (`"Cl"` -> 17). Case sensitive.
pub fn atomic_number(symbol: &str) -> Option<u8> {
    SYMBOLS
        .iter()
        .position(|&s| s == symbol)
        .map(|i| (i + 1) as u8)
}

pub fn is_element(symbol: &str) -> bool {
    atomic_number(symbol).is_some()
}

/// Symbols that may appear outside brackets.
pub fn is_organic_subset(symbol: &str) -> bool {
    matches!(
        symbol,
        "B" | "C" | "N" | "O" | "P" | "S" | "F" | "Cl" | "Br" | "I"
    )
}

/// Symbols that may be written in lowercase (aromatic) form.
pub fn can_be_aromatic(symbol: &str) -> bool {
    matches!(symbol, "B" | "C" | "N" | "O" | "P" | "S" | "Se" | "As" | "Te")
}

/// Usual number of bonds, used to derive the implicit hydrogen count of
/// label text. Elements without an entry get no hydrogens.
pub fn max_bonds(symbol: &str) -> Option<u8> {
    match symbol {
        "H" => Some(1),
        "C" => Some(4),
        "N" => Some(3),
        "O" => Some(2),
        "P" => Some(3),
        "S" => Some(2),
        "B" => Some(3),
        "F" | "Cl" | "Br" | "I" => Some(1),
        _ => None,
    }
}
