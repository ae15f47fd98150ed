use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kernel::name::Name;
use crate::kernel::program::ProgramVariable;
use crate::kernel::sort::Sort;
use crate::sequent::{Sequent, SequentChangeInfo, SequentFormula};
use crate::taclet_index::TacletIndex;

/// How a set of program variables got renamed. Maps each old variable to its new one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RenamingEffect {
    map: BTreeMap<ProgramVariable, ProgramVariable>,
}

impl RenamingEffect {
    pub fn new() -> RenamingEffect {
        RenamingEffect::default()
    }

    pub fn single(old: ProgramVariable, new: ProgramVariable) -> RenamingEffect {
        let mut answer = RenamingEffect::new();
        answer.insert(old, new);
        answer
    }

    pub fn insert(&mut self, old: ProgramVariable, new: ProgramVariable) {
        if old != new {
            self.map.insert(old, new);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, old: &ProgramVariable) -> Option<&ProgramVariable> {
        self.map.get(old)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProgramVariable, &ProgramVariable)> {
        self.map.iter()
    }
}

/// The renamings that happened when a node was created, kept for the record.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RenamingTable {
    pub renamings: Vec<(ProgramVariable, ProgramVariable)>,
}

impl From<&RenamingEffect> for RenamingTable {
    fn from(effect: &RenamingEffect) -> RenamingTable {
        RenamingTable {
            renamings: effect
                .iter()
                .map(|(old, new)| (old.clone(), new.clone()))
                .collect(),
        }
    }
}

impl fmt::Display for RenamingTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, (old, new)) in self.renamings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} -> {}", old, new)?;
        }
        Ok(())
    }
}

/// Creates program variables and keeps their names apart.
pub trait VariableNamer {
    /// A new program variable, distinct from every variable created before.
    /// The name is only a proposal, it may clash with existing names until renamed.
    fn new_program_variable(&mut self, proposal: &str, sort: &Sort) -> ProgramVariable;

    /// Picks the name a new variable gets in a goal, given the global variables of the goal
    /// and its sequent. Returns the variable to use, and the renaming that was needed.
    fn rename(
        &mut self,
        var: &ProgramVariable,
        globals: &im::OrdSet<ProgramVariable>,
        sequent: &Sequent,
    ) -> (ProgramVariable, RenamingEffect);

    /// A copy in the current state. An application runs against a copy, so that a failed
    /// one leaves no trace in the namer.
    fn boxed_clone(&self) -> Box<dyn VariableNamer>;
}

/// Makes names unique by appending a separator and a counter to the base name.
#[derive(Clone)]
pub struct DefaultVariableNamer {
    separator: String,

    // The serial of the last variable created. Declared variables have serial 0.
    last_serial: u32,
}

impl DefaultVariableNamer {
    pub fn new(separator: &str) -> DefaultVariableNamer {
        DefaultVariableNamer {
            separator: separator.to_string(),
            last_serial: 0,
        }
    }
}

impl VariableNamer for DefaultVariableNamer {
    fn new_program_variable(&mut self, proposal: &str, sort: &Sort) -> ProgramVariable {
        self.last_serial += 1;
        ProgramVariable {
            name: Name::new(proposal.trim_start_matches('#')),
            sort: sort.clone(),
            serial: self.last_serial,
        }
    }

    fn boxed_clone(&self) -> Box<dyn VariableNamer> {
        Box::new(self.clone())
    }

    fn rename(
        &mut self,
        var: &ProgramVariable,
        globals: &im::OrdSet<ProgramVariable>,
        sequent: &Sequent,
    ) -> (ProgramVariable, RenamingEffect) {
        let mut in_use: BTreeSet<Name> = globals
            .iter()
            .filter(|pv| *pv != var)
            .map(|pv| pv.name.clone())
            .collect();
        let mut mentioned = vec![];
        for formula in sequent.antecedent.iter().chain(sequent.succedent.iter()) {
            formula.formula().collect_program_variables(&mut mentioned);
        }
        in_use.extend(
            mentioned
                .into_iter()
                .filter(|pv| pv != var)
                .map(|pv| pv.name),
        );

        if !in_use.contains(&var.name) {
            return (var.clone(), RenamingEffect::new());
        }
        let mut k = 0;
        let name = loop {
            let candidate = Name::from(format!("{}{}{}", var.name, self.separator, k));
            if !in_use.contains(&candidate) {
                break candidate;
            }
            k += 1;
        };
        let renamed = var.renamed(name);
        debug!(old = %var, new = %renamed, "renaming program variable");
        (renamed.clone(), RenamingEffect::single(var.clone(), renamed))
    }
}

/// Pushes a renaming through everything that can mention program variables.
/// An empty renaming leaves everything as it is without looking at it.
pub struct ProgVarReplacer<'a> {
    effect: &'a RenamingEffect,
}

impl<'a> ProgVarReplacer<'a> {
    pub fn new(effect: &'a RenamingEffect) -> ProgVarReplacer<'a> {
        ProgVarReplacer { effect }
    }

    fn lookup(&self, pv: &ProgramVariable) -> Option<ProgramVariable> {
        self.effect.get(pv).cloned()
    }

    pub fn replace_formula(&self, formula: &SequentFormula) -> Option<SequentFormula> {
        let replaced = formula
            .formula()
            .replace_program_variables(&|pv| self.lookup(pv))?;
        // Renaming program variables keeps a formula closed.
        SequentFormula::new(replaced).ok()
    }

    pub fn replace_sequent(&self, change: &mut SequentChangeInfo) {
        if self.effect.is_empty() {
            return;
        }
        change.map_formulas(&|formula| self.replace_formula(formula));
    }

    pub fn replace_globals(&self, globals: &im::OrdSet<ProgramVariable>) -> im::OrdSet<ProgramVariable> {
        if self.effect.is_empty() {
            return globals.clone();
        }
        globals
            .iter()
            .map(|pv| self.lookup(pv).unwrap_or_else(|| pv.clone()))
            .collect()
    }

    pub fn replace_index(&self, index: &TacletIndex) -> TacletIndex {
        if self.effect.is_empty() {
            return index.clone();
        }
        index.map_instantiations(&|insts| insts.replace_program_variables(&|pv| self.lookup(pv)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::operator::Function;
    use crate::kernel::term::Term;

    fn int() -> Sort {
        Sort::named("int")
    }

    fn mentions(pv: &ProgramVariable) -> SequentFormula {
        let p = Function::predicate("p", vec![int()]);
        SequentFormula::new(Term::func(&p, vec![Term::program_var(pv)]).unwrap()).unwrap()
    }

    #[test]
    fn test_new_variables_are_distinct() {
        let mut namer = DefaultVariableNamer::new("_");
        let a = namer.new_program_variable("#tmp", &int());
        let b = namer.new_program_variable("#tmp", &int());
        assert_eq!(a.name.as_str(), "tmp");
        assert_ne!(a, b);
    }

    #[test]
    fn test_no_clash_needs_no_renaming() {
        let mut namer = DefaultVariableNamer::new("_");
        let tmp = namer.new_program_variable("tmp", &int());
        let (renamed, effect) = namer.rename(&tmp, &im::OrdSet::new(), &Sequent::new());
        assert_eq!(renamed, tmp);
        assert!(effect.is_empty());
    }

    #[test]
    fn test_clash_with_sequent_is_renamed() {
        let mut namer = DefaultVariableNamer::new("_");
        let declared = ProgramVariable::new("tmp", int());
        let taken = ProgramVariable::new("tmp_0", int());
        let sequent = Sequent::from_formulas(vec![mentions(&declared), mentions(&taken)], vec![]);
        let tmp = namer.new_program_variable("tmp", &int());
        let (renamed, effect) = namer.rename(&tmp, &im::OrdSet::new(), &sequent);
        assert_eq!(renamed.name.as_str(), "tmp_1");
        assert_eq!(effect.get(&tmp), Some(&renamed));
    }

    #[test]
    fn test_replacer_renames_sequent_and_globals() {
        let old = ProgramVariable::new("x", int());
        let new = old.renamed(Name::new("x_0"));
        let effect = RenamingEffect::single(old.clone(), new.clone());
        let replacer = ProgVarReplacer::new(&effect);

        let mut change =
            SequentChangeInfo::unchanged(Sequent::from_formulas(vec![mentions(&old)], vec![]));
        replacer.replace_sequent(&mut change);
        assert_eq!(change.sequent().to_string(), "p(x_0) ==>");

        let globals: im::OrdSet<ProgramVariable> = vec![old].into_iter().collect();
        assert!(replacer.replace_globals(&globals).contains(&new));
    }

    #[test]
    fn test_empty_effect_is_a_no_op() {
        let effect = RenamingEffect::new();
        let replacer = ProgVarReplacer::new(&effect);
        let sequent = Sequent::from_formulas(vec![mentions(&ProgramVariable::new("x", int()))], vec![]);
        let mut change = SequentChangeInfo::unchanged(sequent.clone());
        replacer.replace_sequent(&mut change);
        assert!(!change.has_changed());
        assert_eq!(change.sequent(), sequent);

        // Nothing is rebuilt.
        let globals: im::OrdSet<ProgramVariable> =
            vec![ProgramVariable::new("y", int())].into_iter().collect();
        assert!(replacer.replace_globals(&globals).ptr_eq(&globals));
        let index = TacletIndex::new();
        assert_eq!(replacer.replace_index(&index), index);
    }

    #[test]
    fn test_copies_count_on_their_own() {
        let mut namer = DefaultVariableNamer::new("_");
        namer.new_program_variable("a", &int());
        let mut copy = namer.boxed_clone();
        assert_eq!(copy.new_program_variable("b", &int()).serial, 2);
        assert_eq!(namer.new_program_variable("c", &int()).serial, 2);
    }
}
