use std::sync::Arc;

use assert_fs::prelude::*;
use indoc::indoc;

use crate::kernel::name::Name;
use crate::kernel::schema_variable::SchemaVariable;
use crate::kernel::term::Term;
use crate::proof::Proof;
use crate::rule_base::RuleBase;
use crate::settings::ProofSettings;
use crate::taclet::{GoalTemplate, Taclet, TacletKind};
use crate::taclet_index::TacletIndex;
use crate::tests::common::*;

#[test]
fn test_loaded_rules_prove_like_the_builtin_ones() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("rules.json");
    RuleBase::builtin().unwrap().save(file.path()).unwrap();
    let rules = RuleBase::load(file.path()).unwrap();

    let mut proof = Proof::new(
        sequent(vec![], vec![imp(pred("p"), pred("p"))]),
        rules.index(),
        ProofSettings::default(),
    );
    let root = proof.root();
    let goals = step(&mut proof, root, "impRight");
    step(&mut proof, goals[0], "close");
    assert!(proof.is_closed());
}

#[test]
fn test_settings_name_the_addrules() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("settings.json");
    file.write_str(indoc! {r#"
        {
          "addrule_infix": "_rule"
        }
    "#})
    .unwrap();
    let settings = ProofSettings::load(file.path()).unwrap();
    assert_eq!(settings.max_assumes_candidates, 4096);

    let rules = RuleBase::builtin().unwrap();
    let mut proof = Proof::new(
        sequent(vec![pred("p"), pred("q")], vec![]),
        rules.index(),
        settings,
    );
    let root = proof.root();
    let goals = step(&mut proof, root, "hideLeft");
    let goals = step(&mut proof, goals[0], "hideLeft");
    assert_eq!(open_sequents(&proof), vec!["==>"]);

    let index = &proof.goal(goals[0]).unwrap().taclet_index;
    assert!(index.get(&Name::new("insert_hidden_rule0_0")).is_some());
    assert!(index.get(&Name::new("insert_hidden_rule1_0")).is_some());
}

// Any antecedent formula will do for its assumes.
fn pick_any() -> Taclet {
    let x = Term::schema_var(&SchemaVariable::formula("?x"));
    Taclet::new("pickAny", TacletKind::NoFind)
        .with_assumes(vec![x.clone()], vec![])
        .with_goal(GoalTemplate::new().add(vec![], vec![x]))
}

#[test]
fn test_max_assumes_candidates_limits_enumeration() {
    let seq = sequent(vec![pred("p"), pred("q"), pred("r")], vec![]);
    let index = TacletIndex::from_taclets(vec![Arc::new(pick_any())]);
    let name = Name::new("pickAny");

    let proof = Proof::new(seq.clone(), index.clone(), ProofSettings::default());
    assert_eq!(proof.find_applications(proof.root(), &name).len(), 3);

    let settings = ProofSettings::from_json(r#"{"max_assumes_candidates": 2}"#).unwrap();
    let proof = Proof::new(seq, index, settings);
    let apps = proof.find_applications(proof.root(), &name);
    assert_eq!(apps.len(), 2);
    assert_eq!(apps[1].assumes()[0].formula().to_string(), "q");
}
