use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::kernel::name::Name;
use crate::kernel::schema_variable::{SchemaVariable, SchemaVariableKind};
use crate::kernel::sort::Sort;

/// A variable of the program being verified.
/// Unlike logic variables, program variables are rigid symbols of the sequent and can be
/// assigned by programs and updates.
///
/// The serial tells apart variables that share a name. Variables declared up front have
/// serial 0, variables created by the namer for "new" conditions get fresh serials.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ProgramVariable {
    pub name: Name,
    pub sort: Sort,
    #[serde(default)]
    pub serial: u32,
}

impl ProgramVariable {
    pub fn new(name: &str, sort: Sort) -> ProgramVariable {
        ProgramVariable {
            name: Name::new(name),
            sort,
            serial: 0,
        }
    }

    /// The same variable identity under a different name.
    pub fn renamed(&self, name: Name) -> ProgramVariable {
        ProgramVariable {
            name,
            sort: self.sort.clone(),
            serial: self.serial,
        }
    }
}

impl fmt::Display for ProgramVariable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A piece of program syntax, either a statement or an expression.
/// The engine does not interpret programs. It only needs to match them, instantiate them
/// and rename the program variables inside them.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ProgramElement {
    Variable(ProgramVariable),

    // A placeholder, only in taclets.
    // Program-variable schema variables stand for one variable,
    // statement-list schema variables for the rest of a statement list.
    Schema(SchemaVariable),

    Literal(i64),

    // Any other construct, like "assign" or "plus", with its parts in order.
    Node {
        kind: Name,
        children: Vec<ProgramElement>,
    },
}

impl ProgramElement {
    pub fn node(kind: &str, children: Vec<ProgramElement>) -> ProgramElement {
        ProgramElement::Node {
            kind: Name::new(kind),
            children,
        }
    }

    /// The statement "lhs = rhs".
    pub fn assign(lhs: ProgramElement, rhs: ProgramElement) -> ProgramElement {
        ProgramElement::node("assign", vec![lhs, rhs])
    }

    pub fn is_statement_list(&self) -> bool {
        match self {
            ProgramElement::Schema(sv) => sv.kind() == &SchemaVariableKind::StatementList,
            _ => false,
        }
    }

    pub fn collect_program_variables(&self, output: &mut Vec<ProgramVariable>) {
        match self {
            ProgramElement::Variable(pv) => {
                if !output.contains(pv) {
                    output.push(pv.clone());
                }
            }
            ProgramElement::Node { children, .. } => {
                for child in children {
                    child.collect_program_variables(output);
                }
            }
            ProgramElement::Schema(_) | ProgramElement::Literal(_) => {}
        }
    }

    pub fn collect_schema_variables(&self, output: &mut Vec<SchemaVariable>) {
        match self {
            ProgramElement::Schema(sv) => {
                if !output.contains(sv) {
                    output.push(sv.clone());
                }
            }
            ProgramElement::Node { children, .. } => {
                for child in children {
                    child.collect_schema_variables(output);
                }
            }
            ProgramElement::Variable(_) | ProgramElement::Literal(_) => {}
        }
    }

    /// Returns None when no variable changed, so callers can keep sharing the original.
    pub fn replace_variables(
        &self,
        f: &dyn Fn(&ProgramVariable) -> Option<ProgramVariable>,
    ) -> Option<ProgramElement> {
        match self {
            ProgramElement::Variable(pv) => f(pv).map(ProgramElement::Variable),
            ProgramElement::Node { kind, children } => {
                let replaced = replace_all(children, f)?;
                Some(ProgramElement::Node {
                    kind: kind.clone(),
                    children: replaced,
                })
            }
            ProgramElement::Schema(_) | ProgramElement::Literal(_) => None,
        }
    }

    fn fmt_statement(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_statement_list() {
            write!(f, "{}", self)
        } else {
            write!(f, "{};", self)
        }
    }
}

fn replace_all(
    elements: &[ProgramElement],
    f: &dyn Fn(&ProgramVariable) -> Option<ProgramVariable>,
) -> Option<Vec<ProgramElement>> {
    let mut answer: Option<Vec<ProgramElement>> = None;
    for (i, element) in elements.iter().enumerate() {
        if let Some(replaced) = element.replace_variables(f) {
            let list = answer.get_or_insert_with(|| elements[..i].to_vec());
            list.push(replaced);
        } else if let Some(list) = answer.as_mut() {
            list.push(element.clone());
        }
    }
    answer
}

impl fmt::Display for ProgramElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProgramElement::Variable(pv) => write!(f, "{}", pv),
            ProgramElement::Schema(sv) => write!(f, "{}", sv),
            ProgramElement::Literal(value) => write!(f, "{}", value),
            ProgramElement::Node { kind, children } => {
                if kind.as_str() == "assign" && children.len() == 2 {
                    return write!(f, "{} = {}", children[0], children[1]);
                }
                write!(f, "{}(", kind)?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// The statement list inside a modality.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramBlock(Arc<[ProgramElement]>);

impl ProgramBlock {
    pub fn new(statements: Vec<ProgramElement>) -> ProgramBlock {
        ProgramBlock(Arc::from(statements))
    }

    pub fn empty() -> ProgramBlock {
        ProgramBlock::new(vec![])
    }

    pub fn statements(&self) -> &[ProgramElement] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn collect_program_variables(&self, output: &mut Vec<ProgramVariable>) {
        for statement in self.0.iter() {
            statement.collect_program_variables(output);
        }
    }

    pub fn collect_schema_variables(&self, output: &mut Vec<SchemaVariable>) {
        for statement in self.0.iter() {
            statement.collect_schema_variables(output);
        }
    }

    /// Returns None when no variable changed.
    pub fn replace_variables(
        &self,
        f: &dyn Fn(&ProgramVariable) -> Option<ProgramVariable>,
    ) -> Option<ProgramBlock> {
        replace_all(&self.0, f).map(ProgramBlock::new)
    }
}

impl fmt::Display for ProgramBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for statement in self.0.iter() {
            write!(f, " ")?;
            statement.fmt_statement(f)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_var(name: &str) -> ProgramVariable {
        ProgramVariable::new(name, Sort::named("int"))
    }

    #[test]
    fn test_block_display() {
        let rest = SchemaVariable::new("#rest", SchemaVariableKind::StatementList);
        let block = ProgramBlock::new(vec![
            ProgramElement::assign(
                ProgramElement::Variable(int_var("x")),
                ProgramElement::Literal(1),
            ),
            ProgramElement::Schema(rest),
        ]);
        assert_eq!(block.to_string(), "{ x = 1; #rest }");
    }

    #[test]
    fn test_replace_variables_shares_unchanged_blocks() {
        let block = ProgramBlock::new(vec![ProgramElement::assign(
            ProgramElement::Variable(int_var("x")),
            ProgramElement::Variable(int_var("y")),
        )]);
        let x = int_var("x");
        let renamed = block.replace_variables(&|pv| {
            if pv == &x {
                Some(pv.renamed(Name::new("x_1")))
            } else {
                None
            }
        });
        assert_eq!(renamed.unwrap().to_string(), "{ x_1 = y; }");
        assert!(block.replace_variables(&|_| None).is_none());
    }
}
