// Shorthands for building formulas from formulas.
use crate::kernel::operator::Junctor;
use crate::kernel::term::{Term, TermError};

pub fn not(t: Term) -> Result<Term, TermError> {
    Term::junctor(Junctor::Not, vec![t])
}

pub fn and(left: Term, right: Term) -> Result<Term, TermError> {
    Term::junctor(Junctor::And, vec![left, right])
}

pub fn or(left: Term, right: Term) -> Result<Term, TermError> {
    Term::junctor(Junctor::Or, vec![left, right])
}

pub fn imp(left: Term, right: Term) -> Result<Term, TermError> {
    Term::junctor(Junctor::Imp, vec![left, right])
}

/// Left-nested conjunction. The empty conjunction is true.
pub fn and_all(terms: impl IntoIterator<Item = Term>) -> Result<Term, TermError> {
    let mut answer: Option<Term> = None;
    for t in terms {
        answer = Some(match answer {
            None => t,
            Some(acc) => and(acc, t)?,
        });
    }
    Ok(answer.unwrap_or_else(Term::tt))
}

/// Wraps the target in the updates, the first update outermost.
/// With no updates, the target is returned as is.
pub fn apply_updates<'a>(
    updates: impl DoubleEndedIterator<Item = &'a Term>,
    target: Term,
) -> Result<Term, TermError> {
    let mut answer = target;
    for update in updates.rev() {
        answer = Term::apply_update(update.clone(), answer)?;
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::operator::Function;
    use crate::kernel::program::ProgramVariable;
    use crate::kernel::sort::Sort;

    fn pred(name: &str) -> Term {
        Term::func(&Function::predicate(name, vec![]), vec![]).unwrap()
    }

    #[test]
    fn test_and_all() {
        assert_eq!(and_all(vec![]).unwrap(), Term::tt());
        let t = and_all(vec![pred("a"), pred("b"), pred("c")]).unwrap();
        assert_eq!(t.to_string(), "and(and(a, b), c)");
    }

    #[test]
    fn test_apply_updates_outermost_first() {
        let int = Sort::named("int");
        let x = Term::program_var(&ProgramVariable::new("x", int.clone()));
        let y = Term::program_var(&ProgramVariable::new("y", int.clone()));
        let one = Term::func(&Function::constant("1", int), vec![]).unwrap();
        let u1 = Term::elementary_update(x, one.clone()).unwrap();
        let u2 = Term::elementary_update(y, one).unwrap();
        let t = apply_updates([u1, u2].iter(), pred("p")).unwrap();
        assert_eq!(t.to_string(), "{x := 1}{y := 1}p");
    }
}
