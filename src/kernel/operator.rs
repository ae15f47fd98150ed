use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::kernel::name::Name;
use crate::kernel::program::{ProgramBlock, ProgramVariable};
use crate::kernel::schema_variable::SchemaVariable;
use crate::kernel::sort::Sort;

/// A variable bound by a quantifier.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct LogicVariable {
    pub name: Name,
    pub sort: Sort,
}

impl LogicVariable {
    pub fn new(name: &str, sort: Sort) -> LogicVariable {
        LogicVariable {
            name: Name::new(name),
            sort,
        }
    }
}

impl fmt::Display for LogicVariable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// What a binder binds.
/// In taclets a binder may bind a variable schema variable, matched against the concrete
/// logic variable of the instance.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum QuantifiableVariable {
    Logic(LogicVariable),
    Schema(SchemaVariable),
}

impl QuantifiableVariable {
    pub fn sort(&self) -> Sort {
        match self {
            QuantifiableVariable::Logic(lv) => lv.sort.clone(),
            QuantifiableVariable::Schema(sv) => sv.sort().unwrap_or(Sort::Any),
        }
    }
}

impl fmt::Display for QuantifiableVariable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QuantifiableVariable::Logic(lv) => write!(f, "{}:{}", lv, lv.sort),
            QuantifiableVariable::Schema(sv) => write!(f, "{}", sv),
        }
    }
}

/// A function or predicate symbol. Constants are functions without arguments.
/// Predicates have the result sort Formula.
/// Inside taclets the sorts may be generic.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Function {
    pub name: Name,
    pub arg_sorts: Vec<Sort>,
    pub sort: Sort,
}

impl Function {
    pub fn new(name: &str, arg_sorts: Vec<Sort>, sort: Sort) -> Arc<Function> {
        Arc::new(Function {
            name: Name::new(name),
            arg_sorts,
            sort,
        })
    }

    pub fn constant(name: &str, sort: Sort) -> Arc<Function> {
        Function::new(name, vec![], sort)
    }

    pub fn predicate(name: &str, arg_sorts: Vec<Sort>) -> Arc<Function> {
        Function::new(name, arg_sorts, Sort::Formula)
    }

    pub fn has_generic_sort(&self) -> bool {
        self.sort.is_generic() || self.arg_sorts.iter().any(|s| s.is_generic())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Junctor {
    True,
    False,
    Not,
    And,
    Or,
    Imp,
    Equiv,
}

impl Junctor {
    pub fn arity(self) -> usize {
        match self {
            Junctor::True | Junctor::False => 0,
            Junctor::Not => 1,
            Junctor::And | Junctor::Or | Junctor::Imp | Junctor::Equiv => 2,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Junctor::True => "true",
            Junctor::False => "false",
            Junctor::Not => "not",
            Junctor::And => "and",
            Junctor::Or => "or",
            Junctor::Imp => "imp",
            Junctor::Equiv => "equiv",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Quantifier {
    All,
    Ex,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ModalityKind {
    // [p]post: if p terminates, post holds afterwards.
    Box,

    // <p>post: p terminates and post holds afterwards.
    Diamond,
}

/// The root symbol of a term.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Function(Arc<Function>),

    Junctor(Junctor),

    // Equality on terms of any sort.
    Equals,

    // Binds the variables of its term, one formula child.
    Quantifier(Quantifier),

    // A reference to a logic variable, bound by an enclosing quantifier.
    LogicVariable(LogicVariable),

    ProgramVariable(ProgramVariable),

    // A placeholder. Only taclets contain these.
    SchemaVariable(SchemaVariable),

    // {\subst x; t}body: the value t (child 0) replaces the bound variable in the body
    // (child 1). Taclets use it, replacement carries it out.
    Substitution,

    // A program together with the modality around it, one formula child (the postcondition).
    Modality {
        kind: ModalityKind,
        program: ProgramBlock,
    },

    // The update "lhs := value". Children are the program variable and the value.
    ElementaryUpdate,

    // Applies the update in child 0 to the term or formula in child 1.
    UpdateApplication,
}

impl Operator {
    pub fn arity(&self) -> usize {
        match self {
            Operator::Function(f) => f.arg_sorts.len(),
            Operator::Junctor(j) => j.arity(),
            Operator::Equals => 2,
            Operator::Quantifier(_) => 1,
            Operator::Substitution => 2,
            Operator::LogicVariable(_)
            | Operator::ProgramVariable(_)
            | Operator::SchemaVariable(_) => 0,
            Operator::Modality { .. } => 1,
            Operator::ElementaryUpdate | Operator::UpdateApplication => 2,
        }
    }

    /// Whether terms with this operator bind variables in their children.
    pub fn is_binder(&self) -> bool {
        matches!(self, Operator::Quantifier(_) | Operator::Substitution)
    }

    /// Whether the bound variables of the term are in scope in the child at this index.
    pub fn binds_in(&self, index: usize) -> bool {
        match self {
            Operator::Quantifier(_) => true,
            Operator::Substitution => index == 1,
            _ => false,
        }
    }

    /// The sort the child at the given index must be compatible with.
    /// None means the child is checked separately or not at all.
    pub fn expected_arg_sort(&self, index: usize) -> Option<Sort> {
        match self {
            Operator::Function(f) => f.arg_sorts.get(index).cloned(),
            Operator::Junctor(_) | Operator::Quantifier(_) | Operator::Modality { .. } => {
                Some(Sort::Formula)
            }
            Operator::Equals => Some(Sort::Any),
            Operator::Substitution => {
                if index == 0 {
                    Some(Sort::Any)
                } else {
                    None
                }
            }
            Operator::ElementaryUpdate => None,
            Operator::UpdateApplication => {
                if index == 0 {
                    Some(Sort::Update)
                } else {
                    None
                }
            }
            Operator::LogicVariable(_)
            | Operator::ProgramVariable(_)
            | Operator::SchemaVariable(_) => None,
        }
    }

    /// The sort of a term with this operator and these child sorts.
    pub fn result_sort(&self, child_sorts: &[Sort]) -> Sort {
        match self {
            Operator::Function(f) => f.sort.clone(),
            Operator::Junctor(_)
            | Operator::Equals
            | Operator::Quantifier(_)
            | Operator::Modality { .. } => Sort::Formula,
            Operator::LogicVariable(lv) => lv.sort.clone(),
            Operator::ProgramVariable(pv) => pv.sort.clone(),
            Operator::SchemaVariable(sv) => sv.sort().unwrap_or(Sort::Any),
            Operator::ElementaryUpdate => Sort::Update,
            Operator::Substitution | Operator::UpdateApplication => {
                child_sorts.get(1).cloned().unwrap_or(Sort::Any)
            }
        }
    }

    /// Whether the operator is a variable that can appear on the left of an elementary update.
    pub fn is_assignable(&self) -> bool {
        match self {
            Operator::ProgramVariable(_) => true,
            Operator::SchemaVariable(sv) => matches!(
                sv.kind(),
                crate::kernel::schema_variable::SchemaVariableKind::ProgramVariable(_)
            ),
            _ => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operator::Function(func) => write!(f, "{}", func.name),
            Operator::Junctor(j) => write!(f, "{}", j.symbol()),
            Operator::Equals => write!(f, "equals"),
            Operator::Quantifier(Quantifier::All) => write!(f, "all"),
            Operator::Quantifier(Quantifier::Ex) => write!(f, "ex"),
            Operator::LogicVariable(lv) => write!(f, "{}", lv),
            Operator::ProgramVariable(pv) => write!(f, "{}", pv),
            Operator::SchemaVariable(sv) => write!(f, "{}", sv),
            Operator::Modality {
                kind: ModalityKind::Box,
                program,
            } => write!(f, "[{}]", program),
            Operator::Modality {
                kind: ModalityKind::Diamond,
                program,
            } => write!(f, "<{}>", program),
            Operator::Substitution => write!(f, "subst"),
            Operator::ElementaryUpdate => write!(f, ":="),
            Operator::UpdateApplication => write!(f, "update"),
        }
    }
}
