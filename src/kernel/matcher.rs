use crate::kernel::instantiations::{Instantiation, SvInstantiations};
use crate::kernel::operator::{Function, LogicVariable, Operator, QuantifiableVariable};
use crate::kernel::program::{ProgramBlock, ProgramElement};
use crate::kernel::schema_variable::{SchemaVariable, SchemaVariableKind};
use crate::kernel::sort::Sort;
use crate::kernel::term::Term;

/// Matches a schematic pattern against a concrete term, extending the given instantiations.
///
/// On success, replacing the schema variables of the pattern with the returned
/// instantiations gives back the concrete term, up to labels that the pattern does not
/// mention. On failure nothing is returned, and the input is unchanged.
pub fn match_term(
    pattern: &Term,
    concrete: &Term,
    insts: &SvInstantiations,
) -> Option<SvInstantiations> {
    let mut matcher = Matcher::new(insts.clone());
    if matcher.match_terms(pattern, concrete) {
        Some(matcher.insts)
    } else {
        None
    }
}

/// Matches a pattern program block against a concrete one.
pub fn match_program(
    pattern: &ProgramBlock,
    concrete: &ProgramBlock,
    insts: &SvInstantiations,
) -> Option<SvInstantiations> {
    let mut matcher = Matcher::new(insts.clone());
    if matcher.match_elements(pattern.statements(), concrete.statements()) {
        Some(matcher.insts)
    } else {
        None
    }
}

// The state of one match. Owned, so a failed match can simply be dropped.
struct Matcher {
    insts: SvInstantiations,

    // Pairs up logic variables bound by the pattern with the concrete variables bound at
    // the same place. Innermost last.
    renamings: Vec<(LogicVariable, LogicVariable)>,
}

impl Matcher {
    fn new(insts: SvInstantiations) -> Matcher {
        Matcher {
            insts,
            renamings: vec![],
        }
    }

    fn extend(&mut self, next: Option<SvInstantiations>) -> bool {
        match next {
            Some(insts) => {
                self.insts = insts;
                true
            }
            None => false,
        }
    }

    // Whether a concrete variable is bound by a binder that the pattern spells out itself.
    // Such variables must not leak into schema variable instantiations, because the
    // replacement may bind them differently.
    fn is_renamed_concrete(&self, var: &LogicVariable) -> bool {
        for (_, concrete) in self.renamings.iter().rev() {
            if concrete == var {
                return true;
            }
        }
        false
    }

    fn variables_correspond(&self, pattern: &LogicVariable, concrete: &LogicVariable) -> bool {
        for (p, c) in self.renamings.iter().rev() {
            if p == pattern || c == concrete {
                return p == pattern && c == concrete;
            }
        }
        pattern == concrete
    }

    fn match_schema_variable(&mut self, sv: &SchemaVariable, concrete: &Term) -> bool {
        let inst = match sv.kind() {
            SchemaVariableKind::Term(sort) => {
                if !concrete.sort().is_term_sort() {
                    return false;
                }
                let next = self.insts.match_sort(concrete.sort(), sort);
                if !self.extend(next) {
                    return false;
                }
                Instantiation::Term(concrete.clone())
            }
            SchemaVariableKind::Formula => {
                if !concrete.is_formula() {
                    return false;
                }
                Instantiation::Term(concrete.clone())
            }
            SchemaVariableKind::Update => {
                if concrete.sort() != &Sort::Update {
                    return false;
                }
                Instantiation::Term(concrete.clone())
            }
            SchemaVariableKind::Variable(sort) => {
                let Operator::LogicVariable(lv) = concrete.op() else {
                    return false;
                };
                let next = self.insts.match_sort(&lv.sort, sort);
                if !self.extend(next) {
                    return false;
                }
                Instantiation::LogicVariable(lv.clone())
            }
            SchemaVariableKind::ProgramVariable(sort) => {
                let Operator::ProgramVariable(pv) = concrete.op() else {
                    return false;
                };
                let next = self.insts.match_sort(&pv.sort, sort);
                if !self.extend(next) {
                    return false;
                }
                Instantiation::ProgramVariable(pv.clone())
            }
            SchemaVariableKind::StatementList => return false,
        };
        if inst
            .free_variables()
            .iter()
            .any(|v| self.is_renamed_concrete(v))
        {
            return false;
        }
        let next = self.insts.add(sv, inst);
        self.extend(next)
    }

    fn match_functions(&mut self, pattern: &Function, concrete: &Function) -> bool {
        if pattern.name != concrete.name || pattern.arg_sorts.len() != concrete.arg_sorts.len() {
            return false;
        }
        if !pattern.has_generic_sort() {
            return pattern == concrete;
        }
        let pairs = pattern
            .arg_sorts
            .iter()
            .zip(concrete.arg_sorts.iter())
            .chain(std::iter::once((&pattern.sort, &concrete.sort)));
        for (p, c) in pairs {
            let next = match p {
                Sort::Generic(name) => self.insts.resolve_generic(name, c),
                _ if p == c => continue,
                _ => None,
            };
            if !self.extend(next) {
                return false;
            }
        }
        true
    }

    fn match_operators(&mut self, pattern: &Operator, concrete: &Operator) -> bool {
        match (pattern, concrete) {
            (Operator::Function(p), Operator::Function(c)) => self.match_functions(p, c),
            (Operator::LogicVariable(p), Operator::LogicVariable(c)) => {
                self.variables_correspond(p, c)
            }
            (
                Operator::Modality {
                    kind: pk,
                    program: pp,
                },
                Operator::Modality {
                    kind: ck,
                    program: cp,
                },
            ) => pk == ck && self.match_elements(pp.statements(), cp.statements()),
            (p, c) => p == c,
        }
    }

    // Returns the pattern/concrete pairs of logic variables the binders introduce.
    fn match_binders(
        &mut self,
        pattern: &[QuantifiableVariable],
        concrete: &[QuantifiableVariable],
    ) -> Option<Vec<(LogicVariable, LogicVariable)>> {
        if pattern.len() != concrete.len() {
            return None;
        }
        let mut pairs = vec![];
        for (p, c) in pattern.iter().zip(concrete.iter()) {
            let QuantifiableVariable::Logic(c) = c else {
                return None;
            };
            match p {
                QuantifiableVariable::Logic(p) => {
                    let next = self.insts.match_sort(&c.sort, &p.sort);
                    if !self.extend(next) {
                        return None;
                    }
                    pairs.push((p.clone(), c.clone()));
                }
                QuantifiableVariable::Schema(sv) => {
                    if !self.match_schema_variable(sv, &Term::logic_var(c)) {
                        return None;
                    }
                }
            }
        }
        Some(pairs)
    }

    fn match_terms(&mut self, pattern: &Term, concrete: &Term) -> bool {
        if let Operator::SchemaVariable(sv) = pattern.op() {
            if !self.match_labels(pattern, concrete) {
                return false;
            }
            // The instantiation carries the labels of the concrete term.
            return self.match_schema_variable(sv, concrete);
        }

        if pattern.arity() != concrete.arity() {
            return false;
        }
        if !self.match_operators(pattern.op(), concrete.op()) {
            return false;
        }
        if !self.match_labels(pattern, concrete) {
            return false;
        }
        let Some(pairs) = self.match_binders(pattern.bound_vars(), concrete.bound_vars()) else {
            return false;
        };

        for (i, (p, c)) in pattern
            .children()
            .iter()
            .zip(concrete.children().iter())
            .enumerate()
        {
            let scoped = pattern.op().binds_in(i);
            if scoped {
                self.renamings.extend(pairs.iter().cloned());
            }
            let ok = self.match_terms(p, c);
            if scoped {
                self.renamings.truncate(self.renamings.len() - pairs.len());
            }
            if !ok {
                return false;
            }
        }
        true
    }

    // Labels in the pattern must be present on the concrete term.
    // Labels the pattern does not mention are ignored.
    fn match_labels(&self, pattern: &Term, concrete: &Term) -> bool {
        pattern
            .labels()
            .iter()
            .all(|label| concrete.labels().contains(label))
    }

    fn match_elements(&mut self, pattern: &[ProgramElement], concrete: &[ProgramElement]) -> bool {
        for (i, p) in pattern.iter().enumerate() {
            if p.is_statement_list() {
                // Only a trailing statement list can bind anything.
                if i + 1 != pattern.len() {
                    return false;
                }
                let ProgramElement::Schema(sv) = p else {
                    return false;
                };
                let rest = concrete.get(i..).unwrap_or(&[]);
                let next = self
                    .insts
                    .add(sv, Instantiation::Statements(rest.to_vec().into()));
                return self.extend(next);
            }
            let Some(c) = concrete.get(i) else {
                return false;
            };
            if !self.match_element(p, c) {
                return false;
            }
        }
        pattern.len() == concrete.len()
    }

    fn match_element(&mut self, pattern: &ProgramElement, concrete: &ProgramElement) -> bool {
        match (pattern, concrete) {
            (ProgramElement::Schema(sv), ProgramElement::Variable(pv)) => {
                self.match_schema_variable(sv, &Term::program_var(pv))
            }
            (
                ProgramElement::Node {
                    kind: pk,
                    children: pc,
                },
                ProgramElement::Node {
                    kind: ck,
                    children: cc,
                },
            ) => pk == ck && self.match_elements(pc, cc),
            (ProgramElement::Schema(_), _) => false,
            (p, c) => p == c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::label::{LabelSet, TermLabel};
    use crate::kernel::operator::{Junctor, ModalityKind, Quantifier};
    use crate::kernel::program::ProgramVariable;

    fn int() -> Sort {
        Sort::named("int")
    }

    fn pred(name: &str) -> Term {
        Term::func(&Function::predicate(name, vec![]), vec![]).unwrap()
    }

    fn constant(name: &str) -> Term {
        Term::func(&Function::constant(name, int()), vec![]).unwrap()
    }

    fn sv_term(sv: &SchemaVariable) -> Term {
        Term::schema_var(sv)
    }

    #[test]
    fn test_binds_formula_variables() {
        let a = SchemaVariable::formula("?a");
        let b = SchemaVariable::formula("?b");
        let pattern = Term::junctor(Junctor::Imp, vec![sv_term(&a), sv_term(&b)]).unwrap();
        let concrete = Term::junctor(Junctor::Imp, vec![pred("p"), pred("q")]).unwrap();
        let insts = match_term(&pattern, &concrete, &SvInstantiations::new()).unwrap();
        assert_eq!(insts.get(&a), Some(&Instantiation::Term(pred("p"))));
        assert_eq!(insts.get(&b), Some(&Instantiation::Term(pred("q"))));
    }

    #[test]
    fn test_wrong_junctor_fails() {
        let a = SchemaVariable::formula("?a");
        let b = SchemaVariable::formula("?b");
        let pattern = Term::junctor(Junctor::And, vec![sv_term(&a), sv_term(&b)]).unwrap();
        let concrete = Term::junctor(Junctor::Or, vec![pred("p"), pred("q")]).unwrap();
        assert!(match_term(&pattern, &concrete, &SvInstantiations::new()).is_none());
    }

    #[test]
    fn test_repeated_variable_must_agree() {
        let f = Function::new("f", vec![int(), int()], int());
        let x = SchemaVariable::term("?x", int());
        let pattern = Term::func(&f, vec![sv_term(&x), sv_term(&x)]).unwrap();
        let same = Term::func(&f, vec![constant("a"), constant("a")]).unwrap();
        let different = Term::func(&f, vec![constant("a"), constant("b")]).unwrap();
        assert!(match_term(&pattern, &same, &SvInstantiations::new()).is_some());
        assert!(match_term(&pattern, &different, &SvInstantiations::new()).is_none());
    }

    #[test]
    fn test_term_variable_rejects_formula() {
        let x = SchemaVariable::term("?x", Sort::Any);
        assert!(match_term(&sv_term(&x), &pred("p"), &SvInstantiations::new()).is_none());
        assert!(match_term(&sv_term(&x), &constant("c"), &SvInstantiations::new()).is_some());
    }

    #[test]
    fn test_generic_sorts_are_consistent() {
        let g = Sort::generic("G");
        let x = SchemaVariable::term("?x", g.clone());
        let y = SchemaVariable::term("?y", g);
        let pattern = Term::equals(sv_term(&x), sv_term(&y)).unwrap();
        let b = Term::func(&Function::constant("b", Sort::named("boolean")), vec![]).unwrap();
        let good = Term::equals(constant("a"), constant("c")).unwrap();
        let bad = Term::equals(constant("a"), b).unwrap();
        let insts = match_term(&pattern, &good, &SvInstantiations::new()).unwrap();
        assert_eq!(
            insts.generic_sort(&crate::kernel::name::Name::new("G")),
            Some(&int())
        );
        assert!(match_term(&pattern, &bad, &SvInstantiations::new()).is_none());
    }

    #[test]
    fn test_schema_binder_binds_concrete_variable() {
        let var = SchemaVariable::variable("#x", int());
        let body = SchemaVariable::formula("?b");
        let pattern = Term::quantifier(
            Quantifier::All,
            QuantifiableVariable::Schema(var.clone()),
            sv_term(&body),
        )
        .unwrap();
        let p = Function::predicate("p", vec![int()]);
        let x = LogicVariable::new("x", int());
        let concrete = Term::quantifier(
            Quantifier::All,
            QuantifiableVariable::Logic(x.clone()),
            Term::func(&p, vec![Term::logic_var(&x)]).unwrap(),
        )
        .unwrap();
        let insts = match_term(&pattern, &concrete, &SvInstantiations::new()).unwrap();
        assert_eq!(insts.get(&var), Some(&Instantiation::LogicVariable(x)));
    }

    #[test]
    fn test_concrete_binders_do_not_leak() {
        // all y. ?b against all x. p(x): ?b would capture x.
        let body = SchemaVariable::formula("?b");
        let y = LogicVariable::new("y", int());
        let pattern = Term::quantifier(
            Quantifier::All,
            QuantifiableVariable::Logic(y.clone()),
            sv_term(&body),
        )
        .unwrap();
        let p = Function::predicate("p", vec![int()]);
        let x = LogicVariable::new("x", int());
        let depends = Term::quantifier(
            Quantifier::All,
            QuantifiableVariable::Logic(x.clone()),
            Term::func(&p, vec![Term::logic_var(&x)]).unwrap(),
        )
        .unwrap();
        assert!(match_term(&pattern, &depends, &SvInstantiations::new()).is_none());

        // all y. p(y) against all x. p(x) is fine: bound variables correspond.
        let pattern = Term::quantifier(
            Quantifier::All,
            QuantifiableVariable::Logic(y.clone()),
            Term::func(&p, vec![Term::logic_var(&y)]).unwrap(),
        )
        .unwrap();
        assert!(match_term(&pattern, &depends, &SvInstantiations::new()).is_some());
    }

    #[test]
    fn test_statement_list_binds_rest() {
        let v = SchemaVariable::program_variable("#v", int());
        let w = SchemaVariable::program_variable("#w", int());
        let rest = SchemaVariable::new("#rest", SchemaVariableKind::StatementList);
        let x = ProgramVariable::new("x", int());
        let y = ProgramVariable::new("y", int());
        let pattern = ProgramBlock::new(vec![
            ProgramElement::assign(
                ProgramElement::Schema(v.clone()),
                ProgramElement::Schema(w.clone()),
            ),
            ProgramElement::Schema(rest.clone()),
        ]);
        let second = ProgramElement::assign(
            ProgramElement::Variable(y.clone()),
            ProgramElement::Literal(2),
        );
        let concrete = ProgramBlock::new(vec![
            ProgramElement::assign(
                ProgramElement::Variable(x.clone()),
                ProgramElement::Variable(y.clone()),
            ),
            second.clone(),
        ]);
        let insts = match_program(&pattern, &concrete, &SvInstantiations::new()).unwrap();
        assert_eq!(insts.get(&v), Some(&Instantiation::ProgramVariable(x)));
        assert_eq!(insts.get(&w), Some(&Instantiation::ProgramVariable(y)));
        assert_eq!(
            insts.get(&rest),
            Some(&Instantiation::Statements(vec![second].into()))
        );
    }

    #[test]
    fn test_modality_kinds_must_agree() {
        let post = SchemaVariable::formula("?post");
        let pattern = Term::modality(ModalityKind::Box, ProgramBlock::empty(), sv_term(&post)).unwrap();
        let concrete =
            Term::modality(ModalityKind::Diamond, ProgramBlock::empty(), pred("p")).unwrap();
        assert!(match_term(&pattern, &concrete, &SvInstantiations::new()).is_none());
    }

    #[test]
    fn test_pattern_labels_must_be_present() {
        let l = LabelSet::new(vec![TermLabel::new("l")]);
        let a = SchemaVariable::formula("?a");
        let labeled_pattern = sv_term(&a).with_labels(l.clone());
        assert!(match_term(&labeled_pattern, &pred("p"), &SvInstantiations::new()).is_none());
        let labeled = pred("p").with_labels(l);
        let insts = match_term(&sv_term(&a), &labeled, &SvInstantiations::new()).unwrap();
        assert_eq!(insts.get(&a), Some(&Instantiation::Term(labeled)));
    }

    #[test]
    fn test_matching_is_deterministic() {
        let a = SchemaVariable::formula("?a");
        let b = SchemaVariable::formula("?b");
        let pattern = Term::junctor(Junctor::Or, vec![sv_term(&a), sv_term(&b)]).unwrap();
        let concrete = Term::junctor(Junctor::Or, vec![pred("p"), pred("q")]).unwrap();
        let first = match_term(&pattern, &concrete, &SvInstantiations::new());
        let second = match_term(&pattern, &concrete, &SvInstantiations::new());
        assert_eq!(first, second);
    }
}
