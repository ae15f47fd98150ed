use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kernel::name::Name;
use crate::kernel::sort::Sort;

/// What a schema variable may be instantiated with.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SchemaVariableKind {
    // Any term whose sort is compatible with the given sort.
    // The sort may be generic.
    Term(Sort),

    // Any formula.
    Formula,

    // Any update.
    Update,

    // A logic variable of the given sort, as bound by a quantifier.
    Variable(Sort),

    // A program variable of the given sort.
    ProgramVariable(Sort),

    // The remaining statements of a program block.
    StatementList,
}

/// A typed placeholder in a taclet.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SchemaVariable {
    name: Name,
    kind: SchemaVariableKind,
}

impl SchemaVariable {
    pub fn new(name: &str, kind: SchemaVariableKind) -> SchemaVariable {
        SchemaVariable {
            name: Name::new(name),
            kind,
        }
    }

    pub fn term(name: &str, sort: Sort) -> SchemaVariable {
        SchemaVariable::new(name, SchemaVariableKind::Term(sort))
    }

    pub fn formula(name: &str) -> SchemaVariable {
        SchemaVariable::new(name, SchemaVariableKind::Formula)
    }

    pub fn variable(name: &str, sort: Sort) -> SchemaVariable {
        SchemaVariable::new(name, SchemaVariableKind::Variable(sort))
    }

    pub fn program_variable(name: &str, sort: Sort) -> SchemaVariable {
        SchemaVariable::new(name, SchemaVariableKind::ProgramVariable(sort))
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn kind(&self) -> &SchemaVariableKind {
        &self.kind
    }

    /// The sort of the terms this schema variable stands for.
    /// Statement lists are not terms and have none.
    pub fn sort(&self) -> Option<Sort> {
        match &self.kind {
            SchemaVariableKind::Term(sort)
            | SchemaVariableKind::Variable(sort)
            | SchemaVariableKind::ProgramVariable(sort) => Some(sort.clone()),
            SchemaVariableKind::Formula => Some(Sort::Formula),
            SchemaVariableKind::Update => Some(Sort::Update),
            SchemaVariableKind::StatementList => None,
        }
    }

    /// Whether this schema variable may stand for a whole term.
    pub fn is_term_like(&self) -> bool {
        !matches!(self.kind, SchemaVariableKind::StatementList)
    }
}

impl fmt::Display for SchemaVariable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
