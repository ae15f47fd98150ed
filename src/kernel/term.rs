use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::kernel::label::LabelSet;
use crate::kernel::name::Name;
use crate::kernel::operator::{
    Function, Junctor, LogicVariable, ModalityKind, Operator, QuantifiableVariable, Quantifier,
};
use crate::kernel::program::{ProgramBlock, ProgramVariable};
use crate::kernel::schema_variable::SchemaVariable;
use crate::kernel::sort::Sort;

/// The ways term construction can fail.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TermError {
    // The operator needs a different number of children.
    Arity {
        op: String,
        expected: usize,
        actual: usize,
    },

    // A child has a sort the operator does not accept at that index.
    Sort {
        op: String,
        index: usize,
        expected: Sort,
        actual: Sort,
    },

    // Binders need bound variables, other operators must not have any.
    Binder { op: String, bound: usize },

    // The left side of an elementary update is not a program variable.
    NotAssignable { found: String },

    // A sequent formula is not a formula.
    NotAFormula { term: String, sort: Sort },

    // A sequent formula has free logic variables.
    NotClosed { term: String, free: Vec<String> },

    // A path does not lead to a subterm.
    InvalidPath { term: String, path: Vec<usize> },
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TermError::Arity {
                op,
                expected,
                actual,
            } => write!(
                f,
                "operator {} expects {} arguments but got {}",
                op, expected, actual
            ),
            TermError::Sort {
                op,
                index,
                expected,
                actual,
            } => write!(
                f,
                "argument {} of {} must have sort {} but has sort {}",
                index, op, expected, actual
            ),
            TermError::Binder { op, bound } => {
                write!(f, "operator {} cannot bind {} variables", op, bound)
            }
            TermError::NotAssignable { found } => {
                write!(f, "cannot assign to {}, it is not a program variable", found)
            }
            TermError::NotAFormula { term, sort } => {
                write!(f, "{} has sort {}, expected a formula", term, sort)
            }
            TermError::NotClosed { term, free } => {
                write!(f, "{} has free variables {}", term, free.join(", "))
            }
            TermError::InvalidPath { term, path } => {
                write!(f, "no subterm of {} at path {:?}", term, path)
            }
        }
    }
}

impl std::error::Error for TermError {}

struct TermData {
    op: Operator,
    children: Vec<Term>,
    bound_vars: Vec<QuantifiableVariable>,
    labels: LabelSet,

    // Everything below is computed at construction.
    sort: Sort,

    // Ignores the names of bound variables, so that alpha-equivalent terms hash the same.
    // structure_hash also ignores labels, at every depth.
    structure_hash: u64,
    full_hash: u64,

    // Sorted and without duplicates.
    free_vars: Vec<LogicVariable>,

    has_schema_variables: bool,
}

/// An immutable term. Cloning is cheap and shares structure.
///
/// Equality is structural, up to consistent renaming of bound variables, and compares
/// label sets. Use equals_modulo_labels to ignore labels.
#[derive(Clone)]
pub struct Term(Arc<TermData>);

impl Term {
    /// Creates a term, checking arity, binders and argument sorts.
    pub fn new(
        op: Operator,
        children: Vec<Term>,
        bound_vars: Vec<QuantifiableVariable>,
        labels: LabelSet,
    ) -> Result<Term, TermError> {
        if children.len() != op.arity() {
            return Err(TermError::Arity {
                op: op.to_string(),
                expected: op.arity(),
                actual: children.len(),
            });
        }
        let bound_ok = match op {
            Operator::Quantifier(_) => !bound_vars.is_empty(),
            Operator::Substitution => bound_vars.len() == 1,
            _ => bound_vars.is_empty(),
        };
        if !bound_ok {
            return Err(TermError::Binder {
                op: op.to_string(),
                bound: bound_vars.len(),
            });
        }
        for (i, child) in children.iter().enumerate() {
            if let Some(expected) = op.expected_arg_sort(i) {
                if !child.sort().is_compatible_with(&expected) {
                    return Err(TermError::Sort {
                        op: op.to_string(),
                        index: i,
                        expected,
                        actual: child.sort().clone(),
                    });
                }
            }
        }
        match op {
            Operator::ElementaryUpdate => {
                let lhs = &children[0];
                if !lhs.op().is_assignable() {
                    return Err(TermError::NotAssignable {
                        found: lhs.to_string(),
                    });
                }
                if !children[1].sort().is_compatible_with(lhs.sort()) {
                    return Err(TermError::Sort {
                        op: op.to_string(),
                        index: 1,
                        expected: lhs.sort().clone(),
                        actual: children[1].sort().clone(),
                    });
                }
            }
            Operator::Substitution => {
                let var_sort = bound_vars[0].sort();
                if !children[0].sort().is_compatible_with(&var_sort) {
                    return Err(TermError::Sort {
                        op: op.to_string(),
                        index: 0,
                        expected: var_sort,
                        actual: children[0].sort().clone(),
                    });
                }
            }
            _ => {}
        }
        Ok(Term::build(op, children, bound_vars, labels))
    }

    // Assumes the arguments were validated.
    fn build(
        op: Operator,
        children: Vec<Term>,
        bound_vars: Vec<QuantifiableVariable>,
        labels: LabelSet,
    ) -> Term {
        let child_sorts: Vec<Sort> = children.iter().map(|c| c.sort().clone()).collect();
        let sort = op.result_sort(&child_sorts);

        let mut hasher = DefaultHasher::new();
        hash_operator(&op, &mut hasher);
        for var in &bound_vars {
            match var {
                QuantifiableVariable::Logic(lv) => {
                    0u8.hash(&mut hasher);
                    lv.sort.hash(&mut hasher);
                }
                QuantifiableVariable::Schema(sv) => {
                    1u8.hash(&mut hasher);
                    sv.hash(&mut hasher);
                }
            }
        }
        for child in &children {
            child.0.structure_hash.hash(&mut hasher);
        }
        let structure_hash = hasher.finish();

        let mut hasher = DefaultHasher::new();
        structure_hash.hash(&mut hasher);
        labels.hash(&mut hasher);
        for child in &children {
            child.0.full_hash.hash(&mut hasher);
        }
        let full_hash = hasher.finish();

        let mut free_vars: Vec<LogicVariable> = vec![];
        if let Operator::LogicVariable(lv) = &op {
            free_vars.push(lv.clone());
        }
        for (i, child) in children.iter().enumerate() {
            for lv in &child.0.free_vars {
                let bound_here = op.binds_in(i)
                    && bound_vars
                        .iter()
                        .any(|b| matches!(b, QuantifiableVariable::Logic(x) if x == lv));
                if !bound_here {
                    free_vars.push(lv.clone());
                }
            }
        }
        free_vars.sort();
        free_vars.dedup();

        let has_schema_variables = match &op {
            Operator::SchemaVariable(_) => true,
            Operator::Modality { program, .. } => {
                let mut svs = vec![];
                program.collect_schema_variables(&mut svs);
                !svs.is_empty()
            }
            _ => false,
        } || bound_vars
            .iter()
            .any(|b| matches!(b, QuantifiableVariable::Schema(_)))
            || children.iter().any(|c| c.0.has_schema_variables);

        Term(Arc::new(TermData {
            op,
            children,
            bound_vars,
            labels,
            sort,
            structure_hash,
            full_hash,
            free_vars,
            has_schema_variables,
        }))
    }

    /// A term without children, bound variables or labels.
    /// Only valid for operators of arity zero.
    fn leaf(op: Operator) -> Term {
        debug_assert_eq!(op.arity(), 0);
        Term::build(op, vec![], vec![], LabelSet::empty())
    }

    pub fn tt() -> Term {
        Term::leaf(Operator::Junctor(Junctor::True))
    }

    pub fn ff() -> Term {
        Term::leaf(Operator::Junctor(Junctor::False))
    }

    pub fn logic_var(lv: &LogicVariable) -> Term {
        Term::leaf(Operator::LogicVariable(lv.clone()))
    }

    pub fn program_var(pv: &ProgramVariable) -> Term {
        Term::leaf(Operator::ProgramVariable(pv.clone()))
    }

    pub fn schema_var(sv: &SchemaVariable) -> Term {
        Term::leaf(Operator::SchemaVariable(sv.clone()))
    }

    pub fn func(f: &Arc<Function>, args: Vec<Term>) -> Result<Term, TermError> {
        Term::new(
            Operator::Function(f.clone()),
            args,
            vec![],
            LabelSet::empty(),
        )
    }

    pub fn junctor(j: Junctor, args: Vec<Term>) -> Result<Term, TermError> {
        Term::new(Operator::Junctor(j), args, vec![], LabelSet::empty())
    }

    pub fn equals(left: Term, right: Term) -> Result<Term, TermError> {
        Term::new(Operator::Equals, vec![left, right], vec![], LabelSet::empty())
    }

    pub fn quantifier(
        q: Quantifier,
        var: QuantifiableVariable,
        body: Term,
    ) -> Result<Term, TermError> {
        Term::new(
            Operator::Quantifier(q),
            vec![body],
            vec![var],
            LabelSet::empty(),
        )
    }

    pub fn substitution(
        var: QuantifiableVariable,
        value: Term,
        body: Term,
    ) -> Result<Term, TermError> {
        Term::new(
            Operator::Substitution,
            vec![value, body],
            vec![var],
            LabelSet::empty(),
        )
    }

    pub fn modality(
        kind: ModalityKind,
        program: ProgramBlock,
        post: Term,
    ) -> Result<Term, TermError> {
        Term::new(
            Operator::Modality { kind, program },
            vec![post],
            vec![],
            LabelSet::empty(),
        )
    }

    pub fn elementary_update(lhs: Term, value: Term) -> Result<Term, TermError> {
        Term::new(
            Operator::ElementaryUpdate,
            vec![lhs, value],
            vec![],
            LabelSet::empty(),
        )
    }

    pub fn apply_update(update: Term, target: Term) -> Result<Term, TermError> {
        Term::new(
            Operator::UpdateApplication,
            vec![update, target],
            vec![],
            LabelSet::empty(),
        )
    }

    pub fn op(&self) -> &Operator {
        &self.0.op
    }

    pub fn children(&self) -> &[Term] {
        &self.0.children
    }

    pub fn child(&self, i: usize) -> &Term {
        &self.0.children[i]
    }

    pub fn arity(&self) -> usize {
        self.0.children.len()
    }

    pub fn bound_vars(&self) -> &[QuantifiableVariable] {
        &self.0.bound_vars
    }

    pub fn labels(&self) -> &LabelSet {
        &self.0.labels
    }

    pub fn has_labels(&self) -> bool {
        !self.0.labels.is_empty()
    }

    pub fn sort(&self) -> &Sort {
        &self.0.sort
    }

    pub fn is_formula(&self) -> bool {
        self.0.sort == Sort::Formula
    }

    /// The free logic variables, sorted.
    pub fn free_variables(&self) -> &[LogicVariable] {
        &self.0.free_vars
    }

    pub fn is_closed(&self) -> bool {
        self.0.free_vars.is_empty()
    }

    pub fn occurs_free(&self, lv: &LogicVariable) -> bool {
        self.0.free_vars.binary_search(lv).is_ok()
    }

    pub fn has_schema_variables(&self) -> bool {
        self.0.has_schema_variables
    }

    /// The same term with other labels on its root.
    pub fn with_labels(&self, labels: LabelSet) -> Term {
        if labels == self.0.labels {
            return self.clone();
        }
        Term::build(
            self.0.op.clone(),
            self.0.children.clone(),
            self.0.bound_vars.clone(),
            labels,
        )
    }

    /// The same term with other children.
    /// The new children get validated against the operator like in Term::new.
    pub fn with_children(&self, children: Vec<Term>) -> Result<Term, TermError> {
        Term::new(
            self.0.op.clone(),
            children,
            self.0.bound_vars.clone(),
            self.0.labels.clone(),
        )
    }

    /// Whether both terms are equal when labels are ignored at every depth.
    pub fn equals_modulo_labels(&self, other: &Term) -> bool {
        if self.0.structure_hash != other.0.structure_hash {
            return false;
        }
        alpha_equal(self, other, &mut vec![], false)
    }

    /// Iterates over all subterms, parents before children.
    pub fn iter_pre_order(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// Iterates over all subterms, children before parents.
    pub fn iter_post_order(&self) -> PostOrder<'_> {
        PostOrder {
            stack: vec![(self, 0)],
        }
    }

    pub fn subterm_at(&self, path: &[usize]) -> Option<&Term> {
        let mut current = self;
        for &i in path {
            current = current.0.children.get(i)?;
        }
        Some(current)
    }

    /// Replaces the subterm at the path, rebuilding the terms above it.
    /// Everything off the path is shared with the original.
    pub fn replace_at(&self, path: &[usize], replacement: Term) -> Result<Term, TermError> {
        let Some((&first, rest)) = path.split_first() else {
            return Ok(replacement);
        };
        let Some(child) = self.0.children.get(first) else {
            return Err(TermError::InvalidPath {
                term: self.to_string(),
                path: path.to_vec(),
            });
        };
        let new_child = child.replace_at(rest, replacement)?;
        let mut children = self.0.children.clone();
        children[first] = new_child;
        self.with_children(children)
    }

    pub fn collect_schema_variables(&self, output: &mut Vec<SchemaVariable>) {
        if !self.has_schema_variables() {
            return;
        }
        let mut push = |sv: &SchemaVariable| {
            if !output.contains(sv) {
                output.push(sv.clone());
            }
        };
        for term in self.iter_pre_order() {
            for var in term.bound_vars() {
                if let QuantifiableVariable::Schema(sv) = var {
                    push(sv);
                }
            }
            match term.op() {
                Operator::SchemaVariable(sv) => push(sv),
                Operator::Modality { program, .. } => {
                    let mut svs = vec![];
                    program.collect_schema_variables(&mut svs);
                    for sv in &svs {
                        push(sv);
                    }
                }
                _ => {}
            }
        }
    }

    pub fn collect_program_variables(&self, output: &mut Vec<ProgramVariable>) {
        for term in self.iter_pre_order() {
            match term.op() {
                Operator::ProgramVariable(pv) => {
                    if !output.contains(pv) {
                        output.push(pv.clone());
                    }
                }
                Operator::Modality { program, .. } => program.collect_program_variables(output),
                _ => {}
            }
        }
    }

    /// Rebuilds the term with every program variable for which f returns a replacement
    /// replaced, in terms and in programs.
    /// Returns None when nothing changed, so the caller can keep sharing the original.
    pub fn replace_program_variables(
        &self,
        f: &dyn Fn(&ProgramVariable) -> Option<ProgramVariable>,
    ) -> Option<Term> {
        let new_op = match &self.0.op {
            Operator::ProgramVariable(pv) => f(pv).map(Operator::ProgramVariable),
            Operator::Modality { kind, program } => {
                program
                    .replace_variables(f)
                    .map(|program| Operator::Modality {
                        kind: *kind,
                        program,
                    })
            }
            _ => None,
        };
        let mut new_children: Option<Vec<Term>> = None;
        for (i, child) in self.0.children.iter().enumerate() {
            if let Some(replaced) = child.replace_program_variables(f) {
                new_children.get_or_insert_with(|| self.0.children.clone())[i] = replaced;
            }
        }
        if new_op.is_none() && new_children.is_none() {
            return None;
        }
        // Replacements keep the sort of the variable, so the result stays well-formed.
        Some(Term::build(
            new_op.unwrap_or_else(|| self.0.op.clone()),
            new_children.unwrap_or_else(|| self.0.children.clone()),
            self.0.bound_vars.clone(),
            self.0.labels.clone(),
        ))
    }

    /// Capture-avoiding substitution of a free logic variable.
    pub fn substitute(&self, var: &LogicVariable, value: &Term) -> Result<Term, TermError> {
        if !self.occurs_free(var) {
            return Ok(self.clone());
        }
        if let Operator::LogicVariable(lv) = &self.0.op {
            debug_assert_eq!(lv, var);
            if !value.sort().is_compatible_with(&lv.sort) {
                return Err(TermError::Sort {
                    op: "substitution".to_string(),
                    index: 0,
                    expected: lv.sort.clone(),
                    actual: value.sort().clone(),
                });
            }
            return Ok(value.clone());
        }

        // Rename bound variables that would capture free variables of the value.
        let mut bound_vars = self.0.bound_vars.clone();
        let mut children = self.0.children.clone();
        for b in bound_vars.iter_mut() {
            let QuantifiableVariable::Logic(bound) = b else {
                continue;
            };
            if !value.occurs_free(bound) {
                continue;
            }
            let mut avoid: Vec<LogicVariable> = value.free_variables().to_vec();
            for child in &children {
                avoid.extend(child.free_variables().iter().cloned());
            }
            let fresh = fresh_logic_variable(bound, &avoid);
            let fresh_term = Term::logic_var(&fresh);
            for (i, child) in children.iter_mut().enumerate() {
                if self.0.op.binds_in(i) {
                    *child = child.substitute(bound, &fresh_term)?;
                }
            }
            *bound = fresh;
        }

        let mut new_children = Vec::with_capacity(children.len());
        for (i, child) in children.iter().enumerate() {
            let shadowed = self.0.op.binds_in(i)
                && bound_vars
                    .iter()
                    .any(|b| matches!(b, QuantifiableVariable::Logic(x) if x == var));
            if shadowed {
                new_children.push(child.clone());
            } else {
                new_children.push(child.substitute(var, value)?);
            }
        }
        Term::new(
            self.0.op.clone(),
            new_children,
            bound_vars,
            self.0.labels.clone(),
        )
    }
}

/// A logic variable like var whose name differs from everything in avoid.
pub fn fresh_logic_variable(var: &LogicVariable, avoid: &[LogicVariable]) -> LogicVariable {
    let mut k = 0;
    loop {
        let name = Name::from(format!("{}{}", var.name, k));
        if !avoid.iter().any(|lv| lv.name == name) {
            return LogicVariable {
                name,
                sort: var.sort.clone(),
            };
        }
        k += 1;
    }
}

// Hashes the operator without the names of logic variables.
fn hash_operator<H: Hasher>(op: &Operator, state: &mut H) {
    std::mem::discriminant(op).hash(state);
    match op {
        Operator::LogicVariable(lv) => lv.sort.hash(state),
        other => other.hash(state),
    }
}

// The environment pairs up variables bound on the left with variables bound on the right,
// innermost last.
fn alpha_equal(
    left: &Term,
    right: &Term,
    env: &mut Vec<(LogicVariable, LogicVariable)>,
    compare_labels: bool,
) -> bool {
    if Arc::ptr_eq(&left.0, &right.0) && env.is_empty() {
        return true;
    }
    if left.0.structure_hash != right.0.structure_hash {
        return false;
    }
    if compare_labels && left.0.labels != right.0.labels {
        return false;
    }
    match (&left.0.op, &right.0.op) {
        (Operator::LogicVariable(x), Operator::LogicVariable(y)) => {
            return variables_correspond(x, y, env);
        }
        (l, r) => {
            if l != r {
                return false;
            }
        }
    }
    if left.0.bound_vars.len() != right.0.bound_vars.len() {
        return false;
    }
    let mut binders: Vec<(LogicVariable, LogicVariable)> = vec![];
    for (lb, rb) in left.0.bound_vars.iter().zip(right.0.bound_vars.iter()) {
        match (lb, rb) {
            (QuantifiableVariable::Logic(x), QuantifiableVariable::Logic(y)) => {
                if x.sort != y.sort {
                    return false;
                }
                binders.push((x.clone(), y.clone()));
            }
            (QuantifiableVariable::Schema(a), QuantifiableVariable::Schema(b)) if a == b => {}
            _ => return false,
        }
    }

    for (i, (lc, rc)) in left.0.children.iter().zip(right.0.children.iter()).enumerate() {
        let scoped = left.0.op.binds_in(i);
        if scoped {
            env.extend(binders.iter().cloned());
        }
        let equal = alpha_equal(lc, rc, env, compare_labels);
        if scoped {
            env.truncate(env.len() - binders.len());
        }
        if !equal {
            return false;
        }
    }
    true
}

fn variables_correspond(
    x: &LogicVariable,
    y: &LogicVariable,
    env: &[(LogicVariable, LogicVariable)],
) -> bool {
    for (bx, by) in env.iter().rev() {
        if bx == x || by == y {
            return bx == x && by == y;
        }
    }
    x == y
}

impl PartialEq for Term {
    fn eq(&self, other: &Term) -> bool {
        if self.0.full_hash != other.0.full_hash {
            return false;
        }
        alpha_equal(self, other, &mut vec![], true)
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.full_hash);
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let data = &self.0;
        match &data.op {
            Operator::Quantifier(_) => {
                write!(f, "{}{{", data.op)?;
                for (i, var) in data.bound_vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", var)?;
                }
                write!(f, "}}({})", data.children[0])?;
            }
            Operator::Substitution => write!(
                f,
                "{{subst {}; {}}}({})",
                data.bound_vars[0], data.children[0], data.children[1]
            )?,
            Operator::Modality { .. } => write!(f, "{}({})", data.op, data.children[0])?,
            Operator::ElementaryUpdate => {
                write!(f, "{} := {}", data.children[0], data.children[1])?
            }
            Operator::UpdateApplication => {
                write!(f, "{{{}}}{}", data.children[0], data.children[1])?
            }
            op => {
                write!(f, "{}", op)?;
                if !data.children.is_empty() {
                    write!(f, "(")?;
                    for (i, child) in data.children.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", child)?;
                    }
                    write!(f, ")")?;
                }
            }
        }
        if !data.labels.is_empty() {
            write!(f, "{}", data.labels)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Term({})", self)
    }
}

pub struct PreOrder<'a> {
    stack: Vec<&'a Term>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Term;

    fn next(&mut self) -> Option<&'a Term> {
        let term = self.stack.pop()?;
        self.stack.extend(term.0.children.iter().rev());
        Some(term)
    }
}

pub struct PostOrder<'a> {
    // Each entry is a term and the index of the next child to visit.
    stack: Vec<(&'a Term, usize)>,
}

impl<'a> Iterator for PostOrder<'a> {
    type Item = &'a Term;

    fn next(&mut self) -> Option<&'a Term> {
        loop {
            let (term, next_child) = self.stack.last_mut()?;
            let term: &'a Term = *term;
            if *next_child < term.0.children.len() {
                let child = &term.0.children[*next_child];
                *next_child += 1;
                self.stack.push((child, 0));
            } else {
                self.stack.pop();
                return Some(term);
            }
        }
    }
}

/// The serialized form of a term. Deserialization validates it through Term::new.
#[derive(Serialize, Deserialize)]
pub struct TermRepr {
    op: Operator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Term>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    bound: Vec<QuantifiableVariable>,
    #[serde(default, skip_serializing_if = "LabelSet::is_empty")]
    labels: LabelSet,
}

impl TryFrom<TermRepr> for Term {
    type Error = TermError;

    fn try_from(repr: TermRepr) -> Result<Term, TermError> {
        Term::new(repr.op, repr.children, repr.bound, repr.labels)
    }
}

impl From<Term> for TermRepr {
    fn from(term: Term) -> TermRepr {
        TermRepr {
            op: term.0.op.clone(),
            children: term.0.children.clone(),
            bound: term.0.bound_vars.clone(),
            labels: term.0.labels.clone(),
        }
    }
}

impl Serialize for Term {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TermRepr::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Term {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Term, D::Error> {
        let repr = TermRepr::deserialize(deserializer)?;
        Term::try_from(repr).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::label::TermLabel;

    fn int() -> Sort {
        Sort::named("int")
    }

    fn pred(name: &str) -> Term {
        Term::func(&Function::predicate(name, vec![]), vec![]).unwrap()
    }

    fn p_of(t: Term) -> Term {
        Term::func(&Function::predicate("p", vec![int()]), vec![t]).unwrap()
    }

    fn forall(lv: &LogicVariable, body: Term) -> Term {
        Term::quantifier(Quantifier::All, QuantifiableVariable::Logic(lv.clone()), body).unwrap()
    }

    #[test]
    fn test_arity_is_checked() {
        let result = Term::junctor(Junctor::And, vec![pred("a")]);
        assert!(matches!(result, Err(TermError::Arity { expected: 2, .. })));
    }

    #[test]
    fn test_child_sorts_are_checked() {
        let c = Term::func(&Function::constant("c", int()), vec![]).unwrap();
        let result = Term::junctor(Junctor::Not, vec![c]);
        assert!(matches!(result, Err(TermError::Sort { index: 0, .. })));
    }

    #[test]
    fn test_update_needs_program_variable_lhs() {
        let c = Term::func(&Function::constant("c", int()), vec![]).unwrap();
        let result = Term::elementary_update(c.clone(), c);
        assert!(matches!(result, Err(TermError::NotAssignable { .. })));
    }

    #[test]
    fn test_alpha_equivalence() {
        let x = LogicVariable::new("x", int());
        let y = LogicVariable::new("y", int());
        let left = forall(&x, p_of(Term::logic_var(&x)));
        let right = forall(&y, p_of(Term::logic_var(&y)));
        assert_eq!(left, right);

        let mut hasher1 = DefaultHasher::new();
        left.hash(&mut hasher1);
        let mut hasher2 = DefaultHasher::new();
        right.hash(&mut hasher2);
        assert_eq!(hasher1.finish(), hasher2.finish());
    }

    #[test]
    fn test_free_variables_are_not_renamed() {
        let x = LogicVariable::new("x", int());
        let y = LogicVariable::new("y", int());
        assert_ne!(p_of(Term::logic_var(&x)), p_of(Term::logic_var(&y)));
        // all x. p(y) is not all y. p(y)
        let left = forall(&x, p_of(Term::logic_var(&y)));
        let right = forall(&y, p_of(Term::logic_var(&y)));
        assert_ne!(left, right);
    }

    #[test]
    fn test_free_variable_tracking() {
        let x = LogicVariable::new("x", int());
        let body = p_of(Term::logic_var(&x));
        assert_eq!(body.free_variables(), &[x.clone()]);
        assert!(forall(&x, body).is_closed());
    }

    #[test]
    fn test_labels_matter_for_equality_but_not_order() {
        let a = TermLabel::new("a");
        let b = TermLabel::new("b");
        let plain = pred("q");
        let ab = plain.with_labels(LabelSet::new(vec![a.clone(), b.clone()]));
        let ba = plain.with_labels(LabelSet::new(vec![b, a]));
        assert_eq!(ab, ba);
        assert_ne!(ab, plain);
        assert!(ab.equals_modulo_labels(&plain));
    }

    #[test]
    fn test_traversal_orders() {
        let t = Term::junctor(Junctor::And, vec![pred("a"), pred("b")]).unwrap();
        let pre: Vec<String> = t.iter_pre_order().map(|s| s.op().to_string()).collect();
        let post: Vec<String> = t.iter_post_order().map(|s| s.op().to_string()).collect();
        assert_eq!(pre, vec!["and", "a", "b"]);
        assert_eq!(post, vec!["a", "b", "and"]);
        // Each call starts over.
        assert_eq!(t.iter_pre_order().count(), 3);
    }

    #[test]
    fn test_replace_at_shares_siblings() {
        let t = Term::junctor(Junctor::Or, vec![pred("a"), pred("b")]).unwrap();
        let replaced = t.replace_at(&[1], pred("c")).unwrap();
        assert_eq!(replaced.to_string(), "or(a, c)");
        assert!(Arc::ptr_eq(&t.child(0).0, &replaced.child(0).0));
        assert!(t.replace_at(&[3], pred("c")).is_err());
    }

    #[test]
    fn test_substitution_avoids_capture() {
        let x = LogicVariable::new("x", int());
        let y = LogicVariable::new("y", int());
        let f = Function::new("f", vec![int(), int()], int());
        // all y. p(f(x, y)), substitute x by y
        let body = p_of(Term::func(&f, vec![Term::logic_var(&x), Term::logic_var(&y)]).unwrap());
        let t = forall(&y, body);
        let result = t.substitute(&x, &Term::logic_var(&y)).unwrap();
        assert_eq!(result.free_variables(), &[y.clone()]);
        assert_eq!(result.to_string(), "all{y0:int}(p(f(y, y0)))");
    }

    #[test]
    fn test_serde_validates() {
        let t = Term::junctor(Junctor::Imp, vec![pred("a"), pred("b")]).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);

        let bad = r#"{"op":{"Junctor":"Not"}}"#;
        assert!(serde_json::from_str::<Term>(bad).is_err());
    }
}
