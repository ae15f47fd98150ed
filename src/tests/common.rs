use crate::kernel::name::Name;
use crate::kernel::operator::{Function, Junctor};
use crate::kernel::program::ProgramVariable;
use crate::kernel::sort::Sort;
use crate::kernel::term::Term;
use crate::node::NodeId;
use crate::proof::Proof;
use crate::rule_base::RuleBase;
use crate::sequent::{Sequent, SequentFormula};
use crate::settings::ProofSettings;
use crate::taclet_app::TacletApp;

pub fn int() -> Sort {
    Sort::named("int")
}

/// A propositional constant.
pub fn pred(name: &str) -> Term {
    Term::func(&Function::predicate(name, vec![]), vec![]).unwrap()
}

pub fn int_var(name: &str) -> ProgramVariable {
    ProgramVariable::new(name, int())
}

pub fn not(a: Term) -> Term {
    Term::junctor(Junctor::Not, vec![a]).unwrap()
}

pub fn and(a: Term, b: Term) -> Term {
    Term::junctor(Junctor::And, vec![a, b]).unwrap()
}

pub fn or(a: Term, b: Term) -> Term {
    Term::junctor(Junctor::Or, vec![a, b]).unwrap()
}

pub fn imp(a: Term, b: Term) -> Term {
    Term::junctor(Junctor::Imp, vec![a, b]).unwrap()
}

pub fn sequent(antecedent: Vec<Term>, succedent: Vec<Term>) -> Sequent {
    let wrap = |terms: Vec<Term>| -> Vec<SequentFormula> {
        terms
            .into_iter()
            .map(|t| SequentFormula::new(t).unwrap())
            .collect()
    };
    Sequent::from_formulas(wrap(antecedent), wrap(succedent))
}

/// A proof of the sequent with the builtin rules and default settings.
pub fn builtin_proof(sequent: Sequent) -> Proof {
    let rules = RuleBase::builtin().unwrap();
    Proof::new(sequent, rules.index(), ProofSettings::default())
}

/// The first application of the named taclet to the goal. Panics if there is none.
pub fn first_app(proof: &Proof, goal: NodeId, taclet: &str) -> TacletApp {
    match proof.find_applications(goal, &Name::new(taclet)).into_iter().next() {
        Some(app) => app,
        None => panic!("{} does not apply to {}", taclet, goal),
    }
}

/// Applies the first application of the named taclet to the goal, returning the new goals.
pub fn step(proof: &mut Proof, goal: NodeId, taclet: &str) -> Vec<NodeId> {
    let app = first_app(proof, goal, taclet);
    match proof.apply(goal, &app) {
        Ok(goals) => goals,
        Err(e) => panic!("{}", e),
    }
}

/// The sequents of the open goals, as strings.
pub fn open_sequents(proof: &Proof) -> Vec<String> {
    proof
        .open_goals()
        .iter()
        .map(|g| g.sequent.to_string())
        .collect()
}
