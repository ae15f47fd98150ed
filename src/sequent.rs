use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kernel::label::LabelSet;
use crate::kernel::operator::{Junctor, Operator};
use crate::kernel::term::{Term, TermError};
use crate::settings::LabelMerge;

/// A formula that may appear in a sequent: closed, of sort Formula, with no schema variables.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Term", into = "Term")]
pub struct SequentFormula(Term);

impl SequentFormula {
    pub fn new(term: Term) -> Result<SequentFormula, TermError> {
        if !term.is_formula() {
            return Err(TermError::NotAFormula {
                term: term.to_string(),
                sort: term.sort().clone(),
            });
        }
        if !term.is_closed() || term.has_schema_variables() {
            let mut free: Vec<String> = term
                .free_variables()
                .iter()
                .map(|v| v.to_string())
                .collect();
            let mut svs = vec![];
            term.collect_schema_variables(&mut svs);
            free.extend(svs.iter().map(|sv| sv.to_string()));
            return Err(TermError::NotClosed {
                term: term.to_string(),
                free,
            });
        }
        Ok(SequentFormula(term))
    }

    pub fn formula(&self) -> &Term {
        &self.0
    }
}

impl TryFrom<Term> for SequentFormula {
    type Error = TermError;

    fn try_from(term: Term) -> Result<SequentFormula, TermError> {
        SequentFormula::new(term)
    }
}

impl From<SequentFormula> for Term {
    fn from(sf: SequentFormula) -> Term {
        sf.0
    }
}

impl fmt::Display for SequentFormula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Side {
    Antecedent,
    Succedent,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Antecedent => Side::Succedent,
            Side::Succedent => Side::Antecedent,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::Antecedent => write!(f, "antecedent"),
            Side::Succedent => write!(f, "succedent"),
        }
    }
}

/// A position in a sequent: a formula, and a path of child indices into it.
/// The empty path denotes the formula itself.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PosInOccurrence {
    pub side: Side,
    pub index: usize,
    pub path: Vec<usize>,
}

impl PosInOccurrence {
    pub fn top_level(side: Side, index: usize) -> PosInOccurrence {
        PosInOccurrence {
            side,
            index,
            path: vec![],
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.path.is_empty()
    }

    pub fn down(&self, child: usize) -> PosInOccurrence {
        let mut path = self.path.clone();
        path.push(child);
        PosInOccurrence {
            side: self.side,
            index: self.index,
            path,
        }
    }

    /// The formula this position is in.
    pub fn top_formula<'a>(&self, sequent: &'a Sequent) -> Option<&'a SequentFormula> {
        sequent.semisequent(self.side).get(self.index)
    }

    pub fn subterm<'a>(&self, sequent: &'a Sequent) -> Option<&'a Term> {
        self.top_formula(sequent)?.formula().subterm_at(&self.path)
    }

    /// Where the subterm would sit, if it were a whole formula.
    /// None when it has no polarity, like below an equivalence or inside a function argument.
    pub fn polarity(&self, sequent: &Sequent) -> Option<Side> {
        let mut term = self.top_formula(sequent)?.formula();
        let mut polarity = self.side;
        for &i in &self.path {
            match term.op() {
                Operator::Junctor(Junctor::Not) => polarity = polarity.other(),
                Operator::Junctor(Junctor::Imp) if i == 0 => polarity = polarity.other(),
                Operator::Junctor(Junctor::Imp | Junctor::And | Junctor::Or)
                | Operator::Quantifier(_)
                | Operator::Modality { .. } => {}
                Operator::UpdateApplication if i == 1 => {}
                _ => return None,
            }
            term = term.children().get(i)?;
        }
        Some(polarity)
    }
}

impl fmt::Display for PosInOccurrence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.side, self.index)?;
        for i in &self.path {
            write!(f, ".{}", i)?;
        }
        Ok(())
    }
}

/// A formula that stayed in place but changed, like when labels were merged into it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormulaChange {
    pub old: SequentFormula,
    pub new: SequentFormula,
}

/// One side of a sequent. Ordered, without duplicates.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Semisequent(im::Vector<SequentFormula>);

impl Semisequent {
    pub fn new() -> Semisequent {
        Semisequent::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SequentFormula> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequentFormula> {
        self.0.iter()
    }

    pub fn contains(&self, formula: &SequentFormula) -> bool {
        self.0.contains(formula)
    }

    /// Inserts the formula at the index, unless it is redundant.
    ///
    /// A formula equal to one already present is rejected. A formula equal to one already
    /// present except for labels is not added, but its labels are merged into the existing
    /// formula according to the policy.
    pub fn insert(
        &self,
        index: usize,
        formula: SequentFormula,
        merge: LabelMerge,
    ) -> SemisequentChangeInfo {
        let mut info = SemisequentChangeInfo::unchanged(self.clone());
        info.insert(index, formula, merge);
        info
    }

    pub fn insert_first(&self, formula: SequentFormula, merge: LabelMerge) -> SemisequentChangeInfo {
        self.insert(0, formula, merge)
    }

    pub fn insert_last(&self, formula: SequentFormula, merge: LabelMerge) -> SemisequentChangeInfo {
        self.insert(self.len(), formula, merge)
    }

    /// Removes the formula at the index and inserts the replacements in its place.
    /// Redundant replacements take up no room, the next one goes where they would have.
    pub fn replace(
        &self,
        index: usize,
        replacements: Vec<SequentFormula>,
        merge: LabelMerge,
    ) -> SemisequentChangeInfo {
        let mut info = SemisequentChangeInfo::unchanged(self.clone());
        info.remove(index);
        let mut cursor = index;
        for formula in replacements {
            if info.insert(cursor, formula, merge) {
                cursor += 1;
            }
        }
        info
    }
}

impl fmt::Display for Semisequent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, formula) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", formula)?;
        }
        Ok(())
    }
}

/// The result of changing a semisequent, together with what changed.
/// The semisequent it started from is left alone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SemisequentChangeInfo {
    pub semisequent: Semisequent,
    pub added: Vec<SequentFormula>,
    pub removed: Vec<SequentFormula>,
    pub modified: Vec<FormulaChange>,

    // Formulas that were not added because they were already there.
    pub rejected: Vec<SequentFormula>,
}

impl SemisequentChangeInfo {
    pub fn unchanged(semisequent: Semisequent) -> SemisequentChangeInfo {
        SemisequentChangeInfo {
            semisequent,
            added: vec![],
            removed: vec![],
            modified: vec![],
            rejected: vec![],
        }
    }

    pub fn has_changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.modified.is_empty()
    }

    // Returns whether the formula went in at the index. Merged or rejected formulas don't.
    fn insert(&mut self, index: usize, formula: SequentFormula, merge: LabelMerge) -> bool {
        let existing = self
            .semisequent
            .0
            .iter()
            .position(|f| f.formula().equals_modulo_labels(formula.formula()));
        let Some(position) = existing else {
            let index = index.min(self.semisequent.len());
            self.semisequent.0.insert(index, formula.clone());
            self.added.push(formula);
            return true;
        };
        let old = self.semisequent.0[position].clone();
        if old == formula {
            self.rejected.push(formula);
            return false;
        }
        let labels = match merge {
            LabelMerge::Union => old.formula().labels().union(formula.formula().labels()),
            LabelMerge::KeepExisting => old.formula().labels().clone(),
        };
        if &labels == old.formula().labels() {
            self.rejected.push(formula);
            return false;
        }
        let new = SequentFormula(old.formula().with_labels(labels));
        self.semisequent.0.set(position, new.clone());
        self.record_modified(old, new);
        false
    }

    fn record_modified(&mut self, old: SequentFormula, new: SequentFormula) {
        // A formula added in this change stays added, just in its new shape.
        if let Some(added) = self.added.iter_mut().find(|f| **f == old) {
            *added = new;
            return;
        }
        if let Some(change) = self.modified.iter_mut().find(|c| c.new == old) {
            change.new = new;
            return;
        }
        self.modified.push(FormulaChange { old, new });
    }

    fn remove(&mut self, index: usize) {
        if index >= self.semisequent.len() {
            return;
        }
        let formula = self.semisequent.0.remove(index);
        if let Some(i) = self.added.iter().position(|f| *f == formula) {
            self.added.remove(i);
            return;
        }
        if let Some(i) = self.modified.iter().position(|c| c.new == formula) {
            let change = self.modified.remove(i);
            self.removed.push(change.old);
            return;
        }
        self.removed.push(formula);
    }

    /// Folds a later change of the resulting semisequent into this one.
    pub fn combine(&mut self, later: SemisequentChangeInfo) {
        for formula in later.removed {
            if let Some(i) = self.added.iter().position(|f| *f == formula) {
                self.added.remove(i);
            } else if let Some(i) = self.modified.iter().position(|c| c.new == formula) {
                let change = self.modified.remove(i);
                self.removed.push(change.old);
            } else {
                self.removed.push(formula);
            }
        }
        for change in later.modified {
            self.record_modified(change.old, change.new);
        }
        self.added.extend(later.added);
        self.rejected.extend(later.rejected);
        self.semisequent = later.semisequent;
    }
}

/// Antecedent and succedent. Read as: the conjunction of the antecedent implies the
/// disjunction of the succedent.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Sequent {
    pub antecedent: Semisequent,
    pub succedent: Semisequent,
}

impl Sequent {
    pub fn new() -> Sequent {
        Sequent::default()
    }

    /// Builds a sequent from formulas, dropping redundant ones.
    pub fn from_formulas(
        antecedent: impl IntoIterator<Item = SequentFormula>,
        succedent: impl IntoIterator<Item = SequentFormula>,
    ) -> Sequent {
        let mut answer = Sequent::new();
        for formula in antecedent {
            answer = answer
                .add_formula(Side::Antecedent, formula, false, LabelMerge::Union)
                .into_sequent();
        }
        for formula in succedent {
            answer = answer
                .add_formula(Side::Succedent, formula, false, LabelMerge::Union)
                .into_sequent();
        }
        answer
    }

    pub fn semisequent(&self, side: Side) -> &Semisequent {
        match side {
            Side::Antecedent => &self.antecedent,
            Side::Succedent => &self.succedent,
        }
    }

    pub fn len(&self) -> usize {
        self.antecedent.len() + self.succedent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.antecedent.is_empty() && self.succedent.is_empty()
    }

    pub fn formula_at(&self, pos: &PosInOccurrence) -> Option<&SequentFormula> {
        pos.top_formula(self)
    }

    /// Every formula with its top-level position, antecedent first.
    pub fn positions(&self) -> impl Iterator<Item = (PosInOccurrence, &SequentFormula)> {
        let ante = self
            .antecedent
            .iter()
            .enumerate()
            .map(|(i, f)| (PosInOccurrence::top_level(Side::Antecedent, i), f));
        let succ = self
            .succedent
            .iter()
            .enumerate()
            .map(|(i, f)| (PosInOccurrence::top_level(Side::Succedent, i), f));
        ante.chain(succ)
    }

    /// Every position in the sequent, down to subterms.
    /// Antecedent first, and within a formula parents before children.
    pub fn subterm_positions(&self) -> Vec<PosInOccurrence> {
        let mut answer = vec![];
        for (top, formula) in self.positions() {
            for path in subterm_paths(formula.formula()) {
                answer.push(PosInOccurrence {
                    side: top.side,
                    index: top.index,
                    path,
                });
            }
        }
        answer
    }

    fn change(&self, side: Side, info: SemisequentChangeInfo) -> SequentChangeInfo {
        let mut answer = SequentChangeInfo::unchanged(self.clone());
        answer.apply(side, info);
        answer
    }

    /// Adds the formula at the start or the end of one side.
    pub fn add_formula(
        &self,
        side: Side,
        formula: SequentFormula,
        first: bool,
        merge: LabelMerge,
    ) -> SequentChangeInfo {
        let semi = self.semisequent(side);
        let info = if first {
            semi.insert_first(formula, merge)
        } else {
            semi.insert_last(formula, merge)
        };
        self.change(side, info)
    }

    /// Replaces the formula at the position by the replacements.
    pub fn change_formula(
        &self,
        pos: &PosInOccurrence,
        replacements: Vec<SequentFormula>,
        merge: LabelMerge,
    ) -> SequentChangeInfo {
        let info = self
            .semisequent(pos.side)
            .replace(pos.index, replacements, merge);
        self.change(pos.side, info)
    }
}

impl fmt::Display for Sequent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.antecedent.is_empty() {
            write!(f, "{} ", self.antecedent)?;
        }
        write!(f, "==>")?;
        if !self.succedent.is_empty() {
            write!(f, " {}", self.succedent)?;
        }
        Ok(())
    }
}

/// A sequent derived from an original one, together with the changes on each side.
/// Changes compose: each step continues from the result of the previous one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SequentChangeInfo {
    original: Sequent,
    antecedent: SemisequentChangeInfo,
    succedent: SemisequentChangeInfo,
}

impl SequentChangeInfo {
    pub fn unchanged(original: Sequent) -> SequentChangeInfo {
        SequentChangeInfo {
            antecedent: SemisequentChangeInfo::unchanged(original.antecedent.clone()),
            succedent: SemisequentChangeInfo::unchanged(original.succedent.clone()),
            original,
        }
    }

    pub fn original(&self) -> &Sequent {
        &self.original
    }

    pub fn side(&self, side: Side) -> &SemisequentChangeInfo {
        match side {
            Side::Antecedent => &self.antecedent,
            Side::Succedent => &self.succedent,
        }
    }

    pub fn has_changed(&self) -> bool {
        self.antecedent.has_changed() || self.succedent.has_changed()
    }

    /// The current sequent.
    pub fn sequent(&self) -> Sequent {
        Sequent {
            antecedent: self.antecedent.semisequent.clone(),
            succedent: self.succedent.semisequent.clone(),
        }
    }

    pub fn into_sequent(self) -> Sequent {
        Sequent {
            antecedent: self.antecedent.semisequent,
            succedent: self.succedent.semisequent,
        }
    }

    fn apply(&mut self, side: Side, info: SemisequentChangeInfo) {
        match side {
            Side::Antecedent => self.antecedent.combine(info),
            Side::Succedent => self.succedent.combine(info),
        }
    }

    /// Folds a later change, made to the current sequent, into this one.
    pub fn combine(&mut self, later: SequentChangeInfo) {
        self.antecedent.combine(later.antecedent);
        self.succedent.combine(later.succedent);
    }

    pub fn add_formula(&mut self, side: Side, formula: SequentFormula, first: bool, merge: LabelMerge) {
        let later = self.sequent().add_formula(side, formula, first, merge);
        self.combine(later);
    }

    pub fn change_formula(
        &mut self,
        pos: &PosInOccurrence,
        replacements: Vec<SequentFormula>,
        merge: LabelMerge,
    ) {
        let later = self.sequent().change_formula(pos, replacements, merge);
        self.combine(later);
    }

    /// Replaces every formula on both sides by the result of f, where f returns one.
    /// Used to push program variable renamings through a change in progress.
    pub fn map_formulas(&mut self, f: &dyn Fn(&SequentFormula) -> Option<SequentFormula>) {
        for side in [Side::Antecedent, Side::Succedent] {
            let info = match side {
                Side::Antecedent => &mut self.antecedent,
                Side::Succedent => &mut self.succedent,
            };
            let mut changes = vec![];
            for (i, formula) in info.semisequent.iter().enumerate() {
                if let Some(new) = f(formula) {
                    changes.push((i, formula.clone(), new));
                }
            }
            for (i, old, new) in changes {
                info.semisequent.0.set(i, new.clone());
                info.record_modified(old, new);
            }
        }
    }
}

impl fmt::Display for SequentChangeInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.sequent())
    }
}

/// A sequent shape in a taclet: the formulas may contain schema variables.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SchematicSequent {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub antecedent: Vec<Term>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub succedent: Vec<Term>,
}

impl SchematicSequent {
    pub fn new(antecedent: Vec<Term>, succedent: Vec<Term>) -> SchematicSequent {
        SchematicSequent {
            antecedent,
            succedent,
        }
    }

    pub fn side(&self, side: Side) -> &[Term] {
        match side {
            Side::Antecedent => &self.antecedent,
            Side::Succedent => &self.succedent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.antecedent.is_empty() && self.succedent.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Side, &Term)> {
        self.antecedent
            .iter()
            .map(|t| (Side::Antecedent, t))
            .chain(self.succedent.iter().map(|t| (Side::Succedent, t)))
    }
}

impl fmt::Display for SchematicSequent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |terms: &[Term]| {
            terms
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "{} ==> {}", join(&self.antecedent), join(&self.succedent))
    }
}

// Paths to all subterms, parents before children.
fn subterm_paths(term: &Term) -> Vec<Vec<usize>> {
    let mut answer = vec![];
    let mut stack: Vec<(&Term, Vec<usize>)> = vec![(term, vec![])];
    while let Some((t, path)) = stack.pop() {
        for (i, child) in t.children().iter().enumerate().rev() {
            let mut child_path = path.clone();
            child_path.push(i);
            stack.push((child, child_path));
        }
        answer.push(path);
    }
    answer
}

/// The formula with other labels on its root.
pub fn labeled(formula: &SequentFormula, labels: LabelSet) -> SequentFormula {
    SequentFormula(formula.formula().with_labels(labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::label::TermLabel;
    use crate::kernel::operator::Function;

    fn sf(name: &str) -> SequentFormula {
        SequentFormula::new(Term::func(&Function::predicate(name, vec![]), vec![]).unwrap())
            .unwrap()
    }

    fn label(names: &[&str]) -> LabelSet {
        LabelSet::new(names.iter().map(|n| TermLabel::new(n)))
    }

    #[test]
    fn test_sequent_formulas_must_be_closed_formulas() {
        let c = Term::func(&Function::constant("c", crate::kernel::sort::Sort::named("int")), vec![])
            .unwrap();
        assert!(matches!(
            SequentFormula::new(c),
            Err(TermError::NotAFormula { .. })
        ));
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let semi = Semisequent::new().insert_first(sf("p"), LabelMerge::Union).semisequent;
        let info = semi.insert_first(sf("p"), LabelMerge::Union);
        assert_eq!(info.semisequent.len(), 1);
        assert_eq!(info.rejected, vec![sf("p")]);
        assert!(!info.has_changed());
    }

    #[test]
    fn test_adding_twice_is_idempotent() {
        let once = Sequent::new()
            .add_formula(Side::Antecedent, sf("p"), true, LabelMerge::Union)
            .into_sequent();
        let twice = once
            .add_formula(Side::Antecedent, sf("p"), true, LabelMerge::Union)
            .into_sequent();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_labels_are_merged() {
        let semi = Semisequent::new()
            .insert_first(labeled(&sf("p"), label(&["a"])), LabelMerge::Union)
            .semisequent;
        let info = semi.insert_first(labeled(&sf("p"), label(&["b"])), LabelMerge::Union);
        assert_eq!(info.semisequent.len(), 1);
        assert_eq!(info.modified.len(), 1);
        assert_eq!(
            info.semisequent.get(0).unwrap().formula().labels(),
            &label(&["a", "b"])
        );

        let kept = semi.insert_first(labeled(&sf("p"), label(&["b"])), LabelMerge::KeepExisting);
        assert_eq!(kept.rejected.len(), 1);
        assert_eq!(
            kept.semisequent.get(0).unwrap().formula().labels(),
            &label(&["a"])
        );
    }

    #[test]
    fn test_replace_keeps_position() {
        let semi = Semisequent::new()
            .insert_last(sf("a"), LabelMerge::Union)
            .semisequent
            .insert_last(sf("b"), LabelMerge::Union)
            .semisequent
            .insert_last(sf("c"), LabelMerge::Union)
            .semisequent;
        let info = semi.replace(1, vec![sf("x"), sf("y")], LabelMerge::Union);
        assert_eq!(info.semisequent.to_string(), "a, x, y, c");
        assert_eq!(info.removed, vec![sf("b")]);
        assert_eq!(info.added, vec![sf("x"), sf("y")]);
    }

    #[test]
    fn test_redundant_replacement_takes_no_room() {
        let sequent = Sequent::from_formulas(vec![sf("a"), sf("x"), sf("c")], vec![]);
        let pos = PosInOccurrence::top_level(Side::Antecedent, 1);
        let change = sequent.change_formula(&pos, vec![sf("a"), sf("b")], LabelMerge::Union);
        assert_eq!(change.sequent().to_string(), "a, b, c ==>");
        assert_eq!(change.side(Side::Antecedent).rejected, vec![sf("a")]);
        assert_eq!(change.side(Side::Antecedent).added, vec![sf("b")]);
    }

    #[test]
    fn test_change_infos_compose() {
        let sequent = Sequent::from_formulas(vec![sf("a")], vec![sf("b")]);
        let mut change = SequentChangeInfo::unchanged(sequent.clone());
        change.add_formula(Side::Antecedent, sf("c"), true, LabelMerge::Union);
        change.change_formula(
            &PosInOccurrence::top_level(Side::Antecedent, 0),
            vec![sf("d")],
            LabelMerge::Union,
        );
        // c was added and then replaced, so only d shows up as added.
        assert_eq!(change.side(Side::Antecedent).added, vec![sf("d")]);
        assert!(change.side(Side::Antecedent).removed.is_empty());
        assert_eq!(change.sequent().to_string(), "d, a ==> b");
        assert_eq!(change.original(), &sequent);
    }

    #[test]
    fn test_polarity() {
        let p = sf("p").formula().clone();
        let q = sf("q").formula().clone();
        let imp = Term::junctor(Junctor::Imp, vec![p, q]).unwrap();
        let sequent = Sequent::from_formulas(vec![], vec![SequentFormula::new(imp).unwrap()]);
        let top = PosInOccurrence::top_level(Side::Succedent, 0);
        assert_eq!(top.polarity(&sequent), Some(Side::Succedent));
        assert_eq!(top.down(0).polarity(&sequent), Some(Side::Antecedent));
        assert_eq!(top.down(1).polarity(&sequent), Some(Side::Succedent));
    }

    #[test]
    fn test_subterm_positions() {
        let p = sf("p").formula().clone();
        let q = sf("q").formula().clone();
        let imp = Term::junctor(Junctor::Imp, vec![p, q]).unwrap();
        let sequent =
            Sequent::from_formulas(vec![sf("r")], vec![SequentFormula::new(imp).unwrap()]);
        let positions: Vec<String> = sequent
            .subterm_positions()
            .iter()
            .map(|pos| pos.to_string())
            .collect();
        let top = PosInOccurrence::top_level(Side::Succedent, 0);
        assert_eq!(
            positions,
            vec![
                PosInOccurrence::top_level(Side::Antecedent, 0).to_string(),
                top.to_string(),
                top.down(0).to_string(),
                top.down(1).to_string(),
            ]
        );
    }

    #[test]
    fn test_display() {
        let sequent = Sequent::from_formulas(vec![sf("p")], vec![sf("q"), sf("r")]);
        assert_eq!(sequent.to_string(), "p ==> q, r");
        assert_eq!(Sequent::new().to_string(), "==>");
    }
}
