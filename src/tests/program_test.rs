use crate::kernel::name::Name;
use crate::kernel::operator::ModalityKind;
use crate::kernel::program::{ProgramBlock, ProgramElement, ProgramVariable};
use crate::kernel::sort::Sort;
use crate::kernel::term::Term;
use crate::namer::RenamingTable;
use crate::tests::common::*;

fn assign(lhs: &ProgramVariable, rhs: &ProgramVariable) -> ProgramElement {
    ProgramElement::assign(
        ProgramElement::Variable(lhs.clone()),
        ProgramElement::Variable(rhs.clone()),
    )
}

fn diamond(statements: Vec<ProgramElement>, post: Term) -> Term {
    Term::modality(ModalityKind::Diamond, ProgramBlock::new(statements), post).unwrap()
}

#[test]
fn test_assignment_becomes_an_update() {
    let (x, y) = (int_var("x"), int_var("y"));
    let target = diamond(vec![assign(&x, &y)], pred("p"));
    let mut proof = builtin_proof(sequent(vec![], vec![target]));
    let root = proof.root();
    step(&mut proof, root, "assignment");
    assert_eq!(open_sequents(&proof), vec!["==> {x := y}<{ }>(p)"]);
}

#[test]
fn test_assignment_keeps_the_update_context() {
    let (x, y, z) = (int_var("x"), int_var("y"), int_var("z"));
    let update =
        Term::elementary_update(Term::program_var(&z), Term::program_var(&y)).unwrap();
    let target = Term::apply_update(update, diamond(vec![assign(&x, &y)], pred("p"))).unwrap();
    let mut proof = builtin_proof(sequent(vec![], vec![target]));
    let root = proof.root();

    let apps = proof.find_applications(root, &Name::new("assignment"));
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].position().unwrap().path, vec![1]);
    assert_eq!(apps[0].instantiations().update_context().len(), 1);

    step(&mut proof, root, "assignment");
    assert_eq!(open_sequents(&proof), vec!["==> {z := y}{x := y}<{ }>(p)"]);
}

#[test]
fn test_assignment_does_not_apply_below_a_modality() {
    let (x, y, z) = (int_var("x"), int_var("y"), int_var("z"));
    let inner = diamond(vec![assign(&z, &y)], pred("p"));
    let outer = diamond(vec![assign(&x, &y)], inner);
    let proof = builtin_proof(sequent(vec![], vec![outer]));
    let apps = proof.find_applications(proof.root(), &Name::new("assignment"));
    assert_eq!(apps.len(), 1);
    assert!(apps[0].position().unwrap().is_top_level());
}

#[test]
fn test_assignment_needs_matching_sorts() {
    let x = int_var("x");
    let flag = ProgramVariable::new("flag", Sort::named("bool"));
    let target = diamond(vec![assign(&x, &flag)], pred("p"));
    let proof = builtin_proof(sequent(vec![], vec![target]));
    assert!(proof
        .find_applications(proof.root(), &Name::new("assignment"))
        .is_empty());
}

#[test]
fn test_new_variables_are_renamed_apart() {
    let (x, y, tmp) = (int_var("x"), int_var("y"), int_var("tmp"));
    let post = Term::equals(Term::program_var(&tmp), Term::program_var(&x)).unwrap();
    let target = diamond(vec![assign(&x, &y)], post);
    let mut proof = builtin_proof(sequent(vec![], vec![target]));
    let root = proof.root();

    let goals = step(&mut proof, root, "introduceTemp");
    assert_eq!(
        open_sequents(&proof),
        vec!["==> <{ tmp_0 = y; x = tmp_0; }>(equals(tmp, x))"]
    );
    let node = proof.node(goals[0]).unwrap();
    assert_eq!(node.renamings.len(), 1);
    let RenamingTable { renamings } = &node.renamings[0];
    assert_eq!(renamings[0].0.name.as_str(), "tmp");
    assert_eq!(renamings[0].1.name.as_str(), "tmp_0");
    let globals: Vec<&str> = proof
        .goal(goals[0])
        .unwrap()
        .global_prog_vars
        .iter()
        .map(|pv| pv.name.as_str())
        .collect();
    assert_eq!(globals, vec!["tmp_0"]);

    // A second temporary gets yet another name.
    step(&mut proof, goals[0], "introduceTemp");
    assert_eq!(
        open_sequents(&proof),
        vec!["==> <{ tmp_1 = y; tmp_0 = tmp_1; x = tmp_0; }>(equals(tmp, x))"]
    );
}

#[test]
fn test_new_variable_keeps_a_free_name() {
    let (x, y) = (int_var("x"), int_var("y"));
    let target = diamond(vec![assign(&x, &y)], pred("p"));
    let mut proof = builtin_proof(sequent(vec![], vec![target]));
    let root = proof.root();
    let index_before = proof.goal(root).unwrap().taclet_index.clone();
    let goals = step(&mut proof, root, "introduceTemp");
    assert_eq!(
        open_sequents(&proof),
        vec!["==> <{ tmp = y; x = tmp; }>(p)"]
    );
    assert!(proof.node(goals[0]).unwrap().renamings.is_empty());

    // Without a renaming, only the new variable itself shows up.
    let goal = proof.goal(goals[0]).unwrap();
    assert_eq!(goal.taclet_index, index_before);
    let globals: Vec<&str> = goal.global_prog_vars.iter().map(|pv| pv.name.as_str()).collect();
    assert_eq!(globals, vec!["tmp"]);
}
