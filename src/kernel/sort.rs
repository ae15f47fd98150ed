use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kernel::name::Name;

/// The sort of a term.
/// There is no subsorting among named sorts; every term sort extends Any.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Sort {
    // The sort of formulas.
    Formula,

    // The sort of updates, the program-state transformers written {x := t}.
    Update,

    // The top sort. Every term sort is compatible with it, formulas and updates are not.
    Any,

    // A concrete sort, like "int" or "boolean".
    Named(Name),

    // A generic sort. These only appear in taclets.
    // Matching resolves each generic sort to one concrete sort, consistently per match.
    Generic(Name),
}

impl Sort {
    pub fn named(name: &str) -> Sort {
        Sort::Named(Name::new(name))
    }

    pub fn generic(name: &str) -> Sort {
        Sort::Generic(Name::new(name))
    }

    /// Whether terms of this sort are ordinary terms, as opposed to formulas or updates.
    pub fn is_term_sort(&self) -> bool {
        !matches!(self, Sort::Formula | Sort::Update)
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, Sort::Generic(_))
    }

    /// Whether a term of this sort may appear where a term of the expected sort is required.
    /// Generic sorts are compatible with any term sort here; whether they resolve
    /// consistently is the matcher's business.
    pub fn is_compatible_with(&self, expected: &Sort) -> bool {
        if self == expected {
            return true;
        }
        match (self, expected) {
            (_, Sort::Any) => self.is_term_sort(),
            (Sort::Generic(_), other) | (other, Sort::Generic(_)) => other.is_term_sort(),
            _ => false,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Sort::Formula => write!(f, "Formula"),
            Sort::Update => write!(f, "Update"),
            Sort::Any => write!(f, "any"),
            Sort::Named(name) => write!(f, "{}", name),
            Sort::Generic(name) => write!(f, "{}", name),
        }
    }
}
