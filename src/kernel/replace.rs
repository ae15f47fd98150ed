use std::fmt;
use std::sync::Arc;

use crate::kernel::instantiations::{Instantiation, SvInstantiations};
use crate::kernel::operator::{Function, LogicVariable, Operator, QuantifiableVariable};
use crate::kernel::program::{ProgramBlock, ProgramElement};
use crate::kernel::schema_variable::SchemaVariable;
use crate::kernel::term::{fresh_logic_variable, Term, TermError};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReplaceError {
    // The template mentions a schema variable the instantiations do not bind.
    Unbound(SchemaVariable),

    // The binding has the wrong shape for the place the schema variable appears in.
    WrongKind {
        sv: SchemaVariable,
        instantiation: String,
    },

    // The instantiated template is not a well-formed term.
    IllFormed(TermError),
}

impl fmt::Display for ReplaceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReplaceError::Unbound(sv) => write!(f, "schema variable {} is not instantiated", sv),
            ReplaceError::WrongKind { sv, instantiation } => write!(
                f,
                "schema variable {} cannot be replaced by {} here",
                sv, instantiation
            ),
            ReplaceError::IllFormed(e) => write!(f, "ill-formed replacement: {}", e),
        }
    }
}

impl std::error::Error for ReplaceError {}

impl From<TermError> for ReplaceError {
    fn from(e: TermError) -> ReplaceError {
        ReplaceError::IllFormed(e)
    }
}

/// Replaces the schema variables of a template by their instantiations.
/// Generic sorts are resolved and substitutions in the template are carried out.
///
/// The replacement works bottom-up and keeps subterms that need no change shared.
pub fn instantiate(template: &Term, insts: &SvInstantiations) -> Result<Term, ReplaceError> {
    if !needs_instantiation(template) {
        return Ok(template.clone());
    }

    if let Operator::SchemaVariable(sv) = template.op() {
        let inst = lookup(sv, insts)?;
        let Some(term) = inst.as_term() else {
            return Err(ReplaceError::WrongKind {
                sv: sv.clone(),
                instantiation: inst.to_string(),
            });
        };
        if template.has_labels() {
            return Ok(term.with_labels(term.labels().union(template.labels())));
        }
        return Ok(term);
    }

    let op = instantiate_operator(template.op(), insts)?;
    let (bound_vars, body_template) = instantiate_binders(template, insts)?;

    let mut children = Vec::with_capacity(body_template.arity());
    for child in body_template.children() {
        children.push(instantiate(child, insts)?);
    }

    if let Operator::Substitution = op {
        let QuantifiableVariable::Logic(var) = &bound_vars[0] else {
            return Err(ReplaceError::IllFormed(TermError::Binder {
                op: op.to_string(),
                bound: 0,
            }));
        };
        let result = children[1].substitute(var, &children[0])?;
        if template.has_labels() {
            return Ok(result.with_labels(result.labels().union(template.labels())));
        }
        return Ok(result);
    }

    Ok(Term::new(
        op,
        children,
        bound_vars,
        template.labels().clone(),
    )?)
}

// Whether instantiate would change anything.
fn needs_instantiation(template: &Term) -> bool {
    if template.has_schema_variables() {
        return true;
    }
    template.iter_pre_order().any(|t| match t.op() {
        Operator::Substitution => true,
        Operator::Function(f) => f.has_generic_sort(),
        Operator::LogicVariable(lv) => lv.sort.is_generic(),
        _ => false,
    })
}

fn lookup<'a>(
    sv: &SchemaVariable,
    insts: &'a SvInstantiations,
) -> Result<&'a Instantiation, ReplaceError> {
    insts
        .get(sv)
        .ok_or_else(|| ReplaceError::Unbound(sv.clone()))
}

fn instantiate_logic_variable(lv: &LogicVariable, insts: &SvInstantiations) -> LogicVariable {
    LogicVariable {
        name: lv.name.clone(),
        sort: insts.resolve_sort(&lv.sort),
    }
}

fn instantiate_operator(op: &Operator, insts: &SvInstantiations) -> Result<Operator, ReplaceError> {
    Ok(match op {
        Operator::Function(f) if f.has_generic_sort() => Operator::Function(Arc::new(Function {
            name: f.name.clone(),
            arg_sorts: f.arg_sorts.iter().map(|s| insts.resolve_sort(s)).collect(),
            sort: insts.resolve_sort(&f.sort),
        })),
        Operator::LogicVariable(lv) => {
            Operator::LogicVariable(instantiate_logic_variable(lv, insts))
        }
        Operator::Modality { kind, program } => Operator::Modality {
            kind: *kind,
            program: instantiate_program(program, insts)?,
        },
        other => other.clone(),
    })
}

// Instantiates the bound variables of the template.
// Returns them together with the template to take the children from. That is the template
// itself, unless a concrete binder had to be renamed to avoid capturing a free variable of
// some instantiation.
fn instantiate_binders(
    template: &Term,
    insts: &SvInstantiations,
) -> Result<(Vec<QuantifiableVariable>, Term), ReplaceError> {
    let mut body = template.clone();
    let mut bound_vars = Vec::with_capacity(template.bound_vars().len());
    for var in template.bound_vars() {
        match var {
            QuantifiableVariable::Schema(sv) => match lookup(sv, insts)? {
                Instantiation::LogicVariable(lv) => {
                    bound_vars.push(QuantifiableVariable::Logic(lv.clone()))
                }
                Instantiation::Term(t) => match t.op() {
                    Operator::LogicVariable(lv) => {
                        bound_vars.push(QuantifiableVariable::Logic(lv.clone()))
                    }
                    _ => {
                        return Err(ReplaceError::WrongKind {
                            sv: sv.clone(),
                            instantiation: t.to_string(),
                        })
                    }
                },
                other => {
                    return Err(ReplaceError::WrongKind {
                        sv: sv.clone(),
                        instantiation: other.to_string(),
                    })
                }
            },
            QuantifiableVariable::Logic(lv) => {
                let captured = captured_variables(template, insts);
                if captured.contains(lv) {
                    let mut avoid = captured;
                    avoid.extend(template.free_variables().iter().cloned());
                    let fresh = fresh_logic_variable(lv, &avoid);
                    body = rename_bound(&body, lv, &fresh)?;
                    bound_vars.push(QuantifiableVariable::Logic(instantiate_logic_variable(
                        &fresh, insts,
                    )));
                } else {
                    bound_vars.push(QuantifiableVariable::Logic(instantiate_logic_variable(
                        lv, insts,
                    )));
                }
            }
        }
    }
    Ok((bound_vars, body))
}

// Free variables of the instantiations used below this template.
fn captured_variables(template: &Term, insts: &SvInstantiations) -> Vec<LogicVariable> {
    let mut svs = vec![];
    template.collect_schema_variables(&mut svs);
    let mut answer = vec![];
    for sv in &svs {
        if let Some(inst) = insts.get(sv) {
            answer.extend(inst.free_variables().iter().cloned());
        }
    }
    answer
}

// Renames the variable in the scoped children of the binder.
fn rename_bound(binder: &Term, from: &LogicVariable, to: &LogicVariable) -> Result<Term, ReplaceError> {
    let replacement = Term::logic_var(to);
    let mut children = binder.children().to_vec();
    for (i, child) in children.iter_mut().enumerate() {
        if binder.op().binds_in(i) {
            *child = child.substitute(from, &replacement)?;
        }
    }
    Ok(binder.with_children(children)?)
}

/// Replaces the schema variables of a program block.
/// Statement-list instantiations are spliced in.
pub fn instantiate_program(
    program: &ProgramBlock,
    insts: &SvInstantiations,
) -> Result<ProgramBlock, ReplaceError> {
    let mut svs = vec![];
    program.collect_schema_variables(&mut svs);
    if svs.is_empty() {
        return Ok(program.clone());
    }
    Ok(ProgramBlock::new(instantiate_elements(
        program.statements(),
        insts,
    )?))
}

fn instantiate_elements(
    elements: &[ProgramElement],
    insts: &SvInstantiations,
) -> Result<Vec<ProgramElement>, ReplaceError> {
    let mut answer = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            ProgramElement::Schema(sv) => match lookup(sv, insts)? {
                Instantiation::ProgramVariable(pv) => {
                    answer.push(ProgramElement::Variable(pv.clone()))
                }
                Instantiation::Statements(statements) => {
                    answer.extend(statements.iter().cloned())
                }
                other => {
                    return Err(ReplaceError::WrongKind {
                        sv: sv.clone(),
                        instantiation: other.to_string(),
                    })
                }
            },
            ProgramElement::Node { kind, children } => answer.push(ProgramElement::Node {
                kind: kind.clone(),
                children: instantiate_elements(children, insts)?,
            }),
            other => answer.push(other.clone()),
        }
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::matcher::match_term;
    use crate::kernel::operator::{Junctor, Quantifier};
    use crate::kernel::schema_variable::SchemaVariableKind;
    use crate::kernel::sort::Sort;

    fn int() -> Sort {
        Sort::named("int")
    }

    fn pred(name: &str) -> Term {
        Term::func(&Function::predicate(name, vec![]), vec![]).unwrap()
    }

    #[test]
    fn test_instantiate_inverts_match() {
        let a = SchemaVariable::formula("?a");
        let b = SchemaVariable::formula("?b");
        let pattern =
            Term::junctor(Junctor::Imp, vec![Term::schema_var(&a), Term::schema_var(&b)]).unwrap();
        let concrete = Term::junctor(Junctor::Imp, vec![pred("p"), pred("q")]).unwrap();
        let insts = match_term(&pattern, &concrete, &SvInstantiations::new()).unwrap();
        assert_eq!(instantiate(&pattern, &insts).unwrap(), concrete);
    }

    #[test]
    fn test_unbound_variable_is_an_error() {
        let a = SchemaVariable::formula("?a");
        let result = instantiate(&Term::schema_var(&a), &SvInstantiations::new());
        assert_eq!(result, Err(ReplaceError::Unbound(a)));
    }

    #[test]
    fn test_substitution_is_carried_out() {
        // {\subst #x; ?t}?b with #x -> x, ?t -> c, ?b -> p(x)
        let var = SchemaVariable::variable("#x", int());
        let t = SchemaVariable::term("?t", int());
        let b = SchemaVariable::formula("?b");
        let template = Term::substitution(
            QuantifiableVariable::Schema(var.clone()),
            Term::schema_var(&t),
            Term::schema_var(&b),
        )
        .unwrap();
        let x = LogicVariable::new("x", int());
        let p = Function::predicate("p", vec![int()]);
        let c = Term::func(&Function::constant("c", int()), vec![]).unwrap();
        let insts = SvInstantiations::new()
            .add(&var, Instantiation::LogicVariable(x.clone()))
            .unwrap()
            .add(&t, Instantiation::Term(c.clone()))
            .unwrap()
            .add(
                &b,
                Instantiation::Term(Term::func(&p, vec![Term::logic_var(&x)]).unwrap()),
            )
            .unwrap();
        let result = instantiate(&template, &insts).unwrap();
        assert_eq!(result, Term::func(&p, vec![c]).unwrap());
    }

    #[test]
    fn test_concrete_binder_is_renamed_to_avoid_capture() {
        // all y. ?b with ?b -> p(y), where y is free in the instantiation.
        let y = LogicVariable::new("y", int());
        let b = SchemaVariable::formula("?b");
        let template = Term::quantifier(
            Quantifier::All,
            QuantifiableVariable::Logic(y.clone()),
            Term::schema_var(&b),
        )
        .unwrap();
        let p = Function::predicate("p", vec![int()]);
        let body = Term::func(&p, vec![Term::logic_var(&y)]).unwrap();
        let insts = SvInstantiations::new()
            .add(&b, Instantiation::Term(body))
            .unwrap();
        let result = instantiate(&template, &insts).unwrap();
        assert_eq!(result.free_variables(), &[y]);
        assert_eq!(result.to_string(), "all{y0:int}(p(y))");
    }

    #[test]
    fn test_statement_lists_are_spliced() {
        let rest = SchemaVariable::new("#rest", SchemaVariableKind::StatementList);
        let statement = ProgramElement::assign(
            ProgramElement::Variable(crate::kernel::program::ProgramVariable::new("x", int())),
            ProgramElement::Literal(1),
        );
        let insts = SvInstantiations::new()
            .add(
                &rest,
                Instantiation::Statements(vec![statement.clone(), statement.clone()].into()),
            )
            .unwrap();
        let block = ProgramBlock::new(vec![ProgramElement::Schema(rest)]);
        let result = instantiate_program(&block, &insts).unwrap();
        assert_eq!(result.statements().len(), 2);
    }

    #[test]
    fn test_generic_functions_are_resolved() {
        let g = Sort::generic("G");
        let x = SchemaVariable::term("?x", g.clone());
        let f = Function::new("id", vec![g.clone()], g);
        let template = Term::func(&f, vec![Term::schema_var(&x)]).unwrap();
        let c = Term::func(&Function::constant("c", int()), vec![]).unwrap();
        let concrete_f = Function::new("id", vec![int()], int());
        let concrete = Term::func(&concrete_f, vec![c]).unwrap();
        let insts = match_term(&template, &concrete, &SvInstantiations::new()).unwrap();
        let result = instantiate(&template, &insts).unwrap();
        assert_eq!(result, concrete);
        assert_eq!(result.sort(), &int());
    }
}
