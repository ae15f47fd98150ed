use std::fmt;
use std::sync::Arc;

use crate::kernel::name::Name;
use crate::kernel::operator::LogicVariable;
use crate::kernel::program::{ProgramBlock, ProgramElement, ProgramVariable};
use crate::kernel::schema_variable::SchemaVariable;
use crate::kernel::sort::Sort;
use crate::kernel::term::Term;

/// What a schema variable got bound to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instantiation {
    // For term, formula and update schema variables.
    Term(Term),

    // For variable schema variables, which stand for a bound variable.
    LogicVariable(LogicVariable),

    ProgramVariable(ProgramVariable),

    // For statement-list schema variables. May be empty.
    Statements(Arc<[ProgramElement]>),
}

impl Instantiation {
    /// The instantiation as a term, if it can be one.
    pub fn as_term(&self) -> Option<Term> {
        match self {
            Instantiation::Term(t) => Some(t.clone()),
            Instantiation::LogicVariable(lv) => Some(Term::logic_var(lv)),
            Instantiation::ProgramVariable(pv) => Some(Term::program_var(pv)),
            Instantiation::Statements(_) => None,
        }
    }

    pub fn sort(&self) -> Option<Sort> {
        match self {
            Instantiation::Term(t) => Some(t.sort().clone()),
            Instantiation::LogicVariable(lv) => Some(lv.sort.clone()),
            Instantiation::ProgramVariable(pv) => Some(pv.sort.clone()),
            Instantiation::Statements(_) => None,
        }
    }

    /// Free logic variables of the instantiation.
    /// A bound-variable instantiation has none, it is a binder, not a reference.
    pub fn free_variables(&self) -> &[LogicVariable] {
        match self {
            Instantiation::Term(t) => t.free_variables(),
            _ => &[],
        }
    }

    /// Returns None when nothing changed.
    pub fn replace_program_variables(
        &self,
        f: &dyn Fn(&ProgramVariable) -> Option<ProgramVariable>,
    ) -> Option<Instantiation> {
        match self {
            Instantiation::Term(t) => t.replace_program_variables(f).map(Instantiation::Term),
            Instantiation::LogicVariable(_) => None,
            Instantiation::ProgramVariable(pv) => f(pv).map(Instantiation::ProgramVariable),
            Instantiation::Statements(statements) => ProgramBlock::new(statements.to_vec())
                .replace_variables(f)
                .map(|block| Instantiation::Statements(Arc::from(block.statements()))),
        }
    }
}

impl fmt::Display for Instantiation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instantiation::Term(t) => write!(f, "{}", t),
            Instantiation::LogicVariable(lv) => write!(f, "{}", lv),
            Instantiation::ProgramVariable(pv) => write!(f, "{}", pv),
            Instantiation::Statements(statements) => {
                for (i, s) in statements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{};", s)?;
                }
                Ok(())
            }
        }
    }
}

/// The result of matching: schema variable bindings, generic sort resolutions,
/// and the updates crossed on the way to the find position.
///
/// Immutable in the sense that every extension returns a new store. The persistent maps
/// make that cheap, and a failed extension leaves the original untouched.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SvInstantiations {
    map: im::HashMap<SchemaVariable, Instantiation>,
    generic_sorts: im::HashMap<Name, Sort>,

    // Outermost update first.
    update_context: im::Vector<Term>,
}

impl SvInstantiations {
    pub fn new() -> SvInstantiations {
        SvInstantiations::default()
    }

    pub fn get(&self, sv: &SchemaVariable) -> Option<&Instantiation> {
        self.map.get(sv)
    }

    pub fn is_instantiated(&self, sv: &SchemaVariable) -> bool {
        self.map.contains_key(sv)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty() && self.generic_sorts.is_empty() && self.update_context.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaVariable, &Instantiation)> {
        self.map.iter()
    }

    /// Binds the schema variable.
    /// If it is already bound, the existing binding must equal the new one,
    /// otherwise None is returned.
    pub fn add(&self, sv: &SchemaVariable, inst: Instantiation) -> Option<SvInstantiations> {
        if let Some(existing) = self.map.get(sv) {
            return if existing == &inst {
                Some(self.clone())
            } else {
                None
            };
        }
        let mut answer = self.clone();
        answer.map.insert(sv.clone(), inst);
        Some(answer)
    }

    /// Binds the schema variable, replacing any existing binding.
    pub fn replace(&self, sv: &SchemaVariable, inst: Instantiation) -> SvInstantiations {
        let mut answer = self.clone();
        answer.map.insert(sv.clone(), inst);
        answer
    }

    pub fn generic_sort(&self, name: &Name) -> Option<&Sort> {
        self.generic_sorts.get(name)
    }

    pub fn generic_sorts(&self) -> impl Iterator<Item = (&Name, &Sort)> {
        self.generic_sorts.iter()
    }

    /// Resolves the generic sort to the concrete one.
    /// Fails if it already resolves to something else, or if the concrete sort is not a
    /// term sort.
    pub fn resolve_generic(&self, name: &Name, concrete: &Sort) -> Option<SvInstantiations> {
        if !concrete.is_term_sort() || concrete.is_generic() {
            return None;
        }
        match self.generic_sorts.get(name) {
            Some(existing) if existing == concrete => Some(self.clone()),
            Some(_) => None,
            None => {
                let mut answer = self.clone();
                answer.generic_sorts.insert(name.clone(), concrete.clone());
                Some(answer)
            }
        }
    }

    /// The sort with generic sorts replaced by their resolution, when there is one.
    pub fn resolve_sort(&self, sort: &Sort) -> Sort {
        match sort {
            Sort::Generic(name) => self
                .generic_sorts
                .get(name)
                .cloned()
                .unwrap_or_else(|| sort.clone()),
            _ => sort.clone(),
        }
    }

    /// Checks that the sort is compatible with the expected sort, resolving a generic
    /// expected sort along the way.
    pub fn match_sort(&self, actual: &Sort, expected: &Sort) -> Option<SvInstantiations> {
        match expected {
            Sort::Generic(name) => self.resolve_generic(name, actual),
            _ => {
                if actual.is_compatible_with(expected) {
                    Some(self.clone())
                } else {
                    None
                }
            }
        }
    }

    pub fn update_context(&self) -> &im::Vector<Term> {
        &self.update_context
    }

    pub fn with_update_context(&self, updates: im::Vector<Term>) -> SvInstantiations {
        let mut answer = self.clone();
        answer.update_context = updates;
        answer
    }

    /// Keeps only the bindings of the given schema variables.
    /// Generic sort resolutions and the update context are kept.
    pub fn restrict_to(&self, svs: &[SchemaVariable]) -> SvInstantiations {
        let mut answer = self.clone();
        answer.map.retain(|sv, _| svs.contains(sv));
        answer
    }

    /// Returns None when nothing changed.
    pub fn replace_program_variables(
        &self,
        f: &dyn Fn(&ProgramVariable) -> Option<ProgramVariable>,
    ) -> Option<SvInstantiations> {
        let mut answer: Option<SvInstantiations> = None;
        for (sv, inst) in self.map.iter() {
            if let Some(replaced) = inst.replace_program_variables(f) {
                answer
                    .get_or_insert_with(|| self.clone())
                    .map
                    .insert(sv.clone(), replaced);
            }
        }
        let mut updates_changed = false;
        let updates: im::Vector<Term> = self
            .update_context
            .iter()
            .map(|u| match u.replace_program_variables(f) {
                Some(replaced) => {
                    updates_changed = true;
                    replaced
                }
                None => u.clone(),
            })
            .collect();
        if updates_changed {
            answer.get_or_insert_with(|| self.clone()).update_context = updates;
        }
        answer
    }
}

impl fmt::Display for SvInstantiations {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut entries: Vec<String> = self
            .map
            .iter()
            .map(|(sv, inst)| format!("{} -> {}", sv, inst))
            .collect();
        entries.sort();
        write!(f, "[{}]", entries.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::operator::Function;

    fn constant(name: &str) -> Term {
        Term::func(&Function::constant(name, Sort::named("int")), vec![]).unwrap()
    }

    #[test]
    fn test_add_requires_consistency() {
        let x = SchemaVariable::term("?x", Sort::named("int"));
        let insts = SvInstantiations::new()
            .add(&x, Instantiation::Term(constant("a")))
            .unwrap();
        assert!(insts.add(&x, Instantiation::Term(constant("a"))).is_some());
        assert!(insts.add(&x, Instantiation::Term(constant("b"))).is_none());
        // The failed extension leaves the original alone.
        assert_eq!(insts.len(), 1);
    }

    #[test]
    fn test_generic_sorts_resolve_once() {
        let g = Name::new("G");
        let insts = SvInstantiations::new()
            .resolve_generic(&g, &Sort::named("int"))
            .unwrap();
        assert!(insts.resolve_generic(&g, &Sort::named("int")).is_some());
        assert!(insts.resolve_generic(&g, &Sort::named("boolean")).is_none());
        assert_eq!(insts.resolve_sort(&Sort::Generic(g)), Sort::named("int"));
        assert!(SvInstantiations::new()
            .resolve_generic(&Name::new("H"), &Sort::Formula)
            .is_none());
    }

    #[test]
    fn test_restrict_keeps_context() {
        let x = SchemaVariable::term("?x", Sort::named("int"));
        let y = SchemaVariable::term("?y", Sort::named("int"));
        let insts = SvInstantiations::new()
            .add(&x, Instantiation::Term(constant("a")))
            .unwrap()
            .add(&y, Instantiation::Term(constant("b")))
            .unwrap()
            .resolve_generic(&Name::new("G"), &Sort::named("int"))
            .unwrap();
        let restricted = insts.restrict_to(&[y.clone()]);
        assert!(!restricted.is_instantiated(&x));
        assert!(restricted.is_instantiated(&y));
        assert!(restricted.generic_sort(&Name::new("G")).is_some());
    }
}
