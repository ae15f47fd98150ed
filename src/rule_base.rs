use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kernel::name::Name;
use crate::kernel::operator::{Junctor, ModalityKind, QuantifiableVariable, Quantifier};
use crate::kernel::program::{ProgramBlock, ProgramElement};
use crate::kernel::schema_variable::{SchemaVariable, SchemaVariableKind};
use crate::kernel::sort::Sort;
use crate::kernel::term::{Term, TermError};
use crate::taclet::{
    ApplicationRestriction, GoalTemplate, NewVariableSort, Taclet, TacletError, TacletKind,
    VariableCondition,
};
use crate::taclet_index::TacletIndex;

#[derive(Debug)]
pub enum RuleBaseError {
    Io(io::Error),
    Json(serde_json::Error),
    Term(TermError),
    Malformed(TacletError),

    // Two taclets share a name.
    Duplicate(Name),
}

impl fmt::Display for RuleBaseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuleBaseError::Io(e) => write!(f, "cannot read rule base: {}", e),
            RuleBaseError::Json(e) => write!(f, "cannot parse rule base: {}", e),
            RuleBaseError::Term(e) => write!(f, "ill-formed template: {}", e),
            RuleBaseError::Malformed(e) => write!(f, "{}", e),
            RuleBaseError::Duplicate(name) => write!(f, "duplicate taclet name {}", name),
        }
    }
}

impl std::error::Error for RuleBaseError {}

impl From<io::Error> for RuleBaseError {
    fn from(e: io::Error) -> Self {
        RuleBaseError::Io(e)
    }
}

impl From<serde_json::Error> for RuleBaseError {
    fn from(e: serde_json::Error) -> Self {
        RuleBaseError::Json(e)
    }
}

impl From<TermError> for RuleBaseError {
    fn from(e: TermError) -> Self {
        RuleBaseError::Term(e)
    }
}

impl From<TacletError> for RuleBaseError {
    fn from(e: TacletError) -> Self {
        RuleBaseError::Malformed(e)
    }
}

/// The taclets a proof starts out with.
/// Every taclet is valid and no two share a name.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RuleBase {
    taclets: Vec<Arc<Taclet>>,
}

impl RuleBase {
    pub fn new(taclets: Vec<Taclet>) -> Result<RuleBase, RuleBaseError> {
        let answer = RuleBase {
            taclets: taclets.into_iter().map(Arc::new).collect(),
        };
        answer.check()?;
        Ok(answer)
    }

    fn check(&self) -> Result<(), RuleBaseError> {
        let mut seen = HashSet::new();
        for taclet in &self.taclets {
            taclet.validate()?;
            if !seen.insert(taclet.name.clone()) {
                return Err(RuleBaseError::Duplicate(taclet.name.clone()));
            }
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<RuleBase, RuleBaseError> {
        let answer: RuleBase = serde_json::from_str(text)?;
        answer.check()?;
        Ok(answer)
    }

    pub fn load(path: &Path) -> Result<RuleBase, RuleBaseError> {
        let text = std::fs::read_to_string(path)?;
        let answer = RuleBase::from_json(&text)?;
        debug!(path = %path.display(), taclets = answer.len(), "loaded rule base");
        Ok(answer)
    }

    pub fn to_json(&self) -> Result<String, RuleBaseError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), RuleBaseError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.taclets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taclets.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Taclet>> {
        self.taclets.iter().find(|t| t.name.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Taclet>> {
        self.taclets.iter()
    }

    /// A fresh taclet index holding every taclet, uninstantiated.
    pub fn index(&self) -> TacletIndex {
        TacletIndex::from_taclets(self.taclets.iter().cloned())
    }

    /// The propositional calculus, a quantifier rule, and a few rules for
    /// symbolically executing assignments.
    pub fn builtin() -> Result<RuleBase, RuleBaseError> {
        RuleBase::new(vec![
            close(),
            close_true(),
            close_false(),
            imp_right()?,
            imp_left()?,
            and_left()?,
            and_right()?,
            or_left()?,
            or_right()?,
            not_left()?,
            not_right()?,
            cut(),
            hide_left(),
            all_left()?,
            assignment()?,
            introduce_temp()?,
        ])
    }
}

fn formula(name: &str) -> Term {
    Term::schema_var(&SchemaVariable::formula(name))
}

fn binary(j: Junctor) -> Result<Term, TermError> {
    Term::junctor(j, vec![formula("?a"), formula("?b")])
}

fn close() -> Taclet {
    let b = formula("?b");
    Taclet::new("close", TacletKind::Succedent { find: b.clone() }).with_assumes(vec![b], vec![])
}

fn close_true() -> Taclet {
    Taclet::new("closeTrue", TacletKind::Succedent { find: Term::tt() })
}

fn close_false() -> Taclet {
    Taclet::new("closeFalse", TacletKind::Antecedent { find: Term::ff() })
}

fn imp_right() -> Result<Taclet, TermError> {
    Ok(Taclet::new("impRight", TacletKind::Succedent { find: binary(Junctor::Imp)? })
        .with_goal(GoalTemplate::new().replace_sequent(vec![formula("?a")], vec![formula("?b")])))
}

fn imp_left() -> Result<Taclet, TermError> {
    Ok(Taclet::new("impLeft", TacletKind::Antecedent { find: binary(Junctor::Imp)? })
        .with_goal(GoalTemplate::new().replace_sequent(vec![], vec![formula("?a")]))
        .with_goal(GoalTemplate::new().replace_sequent(vec![formula("?b")], vec![])))
}

fn and_left() -> Result<Taclet, TermError> {
    Ok(Taclet::new("andLeft", TacletKind::Antecedent { find: binary(Junctor::And)? })
        .with_goal(
            GoalTemplate::new().replace_sequent(vec![formula("?a"), formula("?b")], vec![]),
        ))
}

fn and_right() -> Result<Taclet, TermError> {
    Ok(Taclet::new("andRight", TacletKind::Succedent { find: binary(Junctor::And)? })
        .with_goal(GoalTemplate::new().replace_sequent(vec![], vec![formula("?a")]))
        .with_goal(GoalTemplate::new().replace_sequent(vec![], vec![formula("?b")])))
}

fn or_left() -> Result<Taclet, TermError> {
    Ok(Taclet::new("orLeft", TacletKind::Antecedent { find: binary(Junctor::Or)? })
        .with_goal(GoalTemplate::new().replace_sequent(vec![formula("?a")], vec![]))
        .with_goal(GoalTemplate::new().replace_sequent(vec![formula("?b")], vec![])))
}

fn or_right() -> Result<Taclet, TermError> {
    Ok(Taclet::new("orRight", TacletKind::Succedent { find: binary(Junctor::Or)? })
        .with_goal(
            GoalTemplate::new().replace_sequent(vec![], vec![formula("?a"), formula("?b")]),
        ))
}

fn not_left() -> Result<Taclet, TermError> {
    let find = Term::junctor(Junctor::Not, vec![formula("?a")])?;
    Ok(Taclet::new("notLeft", TacletKind::Antecedent { find })
        .with_goal(GoalTemplate::new().replace_sequent(vec![], vec![formula("?a")])))
}

fn not_right() -> Result<Taclet, TermError> {
    let find = Term::junctor(Junctor::Not, vec![formula("?a")])?;
    Ok(Taclet::new("notRight", TacletKind::Succedent { find })
        .with_goal(GoalTemplate::new().replace_sequent(vec![formula("?a")], vec![])))
}

// The cut formula ?c has to be supplied by whoever applies the rule.
fn cut() -> Taclet {
    Taclet::new("cut", TacletKind::NoFind)
        .with_goal(GoalTemplate::named("TRUE").add(vec![formula("?c")], vec![]))
        .with_goal(GoalTemplate::named("FALSE").add(vec![], vec![formula("?c")]))
}

// Hides an antecedent formula, leaving a rule behind that brings it back.
fn hide_left() -> Taclet {
    let insert = Taclet::new("insert_hidden", TacletKind::NoFind)
        .with_goal(GoalTemplate::new().add(vec![formula("?a")], vec![]));
    Taclet::new("hideLeft", TacletKind::Antecedent { find: formula("?a") }).with_goal(
        GoalTemplate::new()
            .replace_sequent(vec![], vec![])
            .add_rule(insert),
    )
}

// The instance ?t has to be supplied by whoever applies the rule.
fn all_left() -> Result<Taclet, TermError> {
    let sort = Sort::generic("G");
    let x = QuantifiableVariable::Schema(SchemaVariable::variable("?x", sort.clone()));
    let t = Term::schema_var(&SchemaVariable::term("?t", sort));
    let find = Term::quantifier(Quantifier::All, x.clone(), formula("?b"))?;
    let instance = Term::substitution(x, t, formula("?b"))?;
    Ok(Taclet::new("allLeft", TacletKind::Antecedent { find })
        .with_goal(GoalTemplate::new().add(vec![instance], vec![])))
}

fn program_sv(name: &str) -> SchemaVariable {
    SchemaVariable::program_variable(name, Sort::generic("G"))
}

fn rest() -> SchemaVariable {
    SchemaVariable::new("#rest", SchemaVariableKind::StatementList)
}

fn assign(lhs: &SchemaVariable, rhs: &SchemaVariable) -> ProgramElement {
    ProgramElement::assign(
        ProgramElement::Schema(lhs.clone()),
        ProgramElement::Schema(rhs.clone()),
    )
}

// The find of the assignment rules: <{ #v = #w; #rest }>?post
fn assignment_find(v: &SchemaVariable, w: &SchemaVariable) -> Result<Term, TermError> {
    let program = ProgramBlock::new(vec![assign(v, w), ProgramElement::Schema(rest())]);
    Term::modality(ModalityKind::Diamond, program, formula("?post"))
}

// <{ #v = #w; #rest }>?post  ~>  {#v := #w}<{ #rest }>?post
fn assignment() -> Result<Taclet, TermError> {
    let v = program_sv("#v");
    let w = program_sv("#w");
    let find = assignment_find(&v, &w)?;
    let rest = ProgramBlock::new(vec![ProgramElement::Schema(rest())]);
    let update = Term::elementary_update(Term::schema_var(&v), Term::schema_var(&w))?;
    let replacement = Term::apply_update(
        update,
        Term::modality(ModalityKind::Diamond, rest, formula("?post"))?,
    )?;
    Ok(Taclet::new(
        "assignment",
        TacletKind::Rewrite {
            find,
            restriction: ApplicationRestriction::same_update_level(),
        },
    )
    .with_goal(GoalTemplate::new().replace_term(replacement)))
}

// <{ #v = #w; #rest }>?post  ~>  <{ #tmp = #w; #v = #tmp; #rest }>?post
// with #tmp a new program variable.
fn introduce_temp() -> Result<Taclet, TermError> {
    let v = program_sv("#v");
    let w = program_sv("#w");
    let tmp = program_sv("#tmp");
    let find = assignment_find(&v, &w)?;
    let program = ProgramBlock::new(vec![
        assign(&tmp, &w),
        assign(&v, &tmp),
        ProgramElement::Schema(rest()),
    ]);
    let replacement = Term::modality(ModalityKind::Diamond, program, formula("?post"))?;
    Ok(Taclet::new(
        "introduceTemp",
        TacletKind::Rewrite {
            find,
            restriction: ApplicationRestriction::same_update_level(),
        },
    )
    .with_condition(VariableCondition::New {
        sv: tmp.clone(),
        sort: NewVariableSort::TypeOf(w),
    })
    .with_goal(
        GoalTemplate::new()
            .replace_term(replacement)
            .add_program_var(tmp),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use indoc::indoc;

    #[test]
    fn test_builtin_is_valid() {
        let base = RuleBase::builtin().unwrap();
        assert_eq!(base.len(), 16);
        assert_eq!(base.index().len(), 16);
        assert_eq!(
            base.get("impRight").unwrap().to_string(),
            "impRight { find(==> imp(?a, ?b)) replacewith(?a ==> ?b) }"
        );
        assert_eq!(
            base.get("close").unwrap().to_string(),
            "close { assumes(?b ==>) find(==> ?b) closegoal }"
        );
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result = RuleBase::new(vec![close_true(), close_true()]);
        assert!(matches!(result, Err(RuleBaseError::Duplicate(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("rules.json");
        let base = RuleBase::builtin().unwrap();
        base.save(file.path()).unwrap();
        let loaded = RuleBase::load(file.path()).unwrap();
        assert_eq!(loaded, base);
    }

    #[test]
    fn test_load_rejects_malformed_taclet() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("rules.json");
        // A succedent taclet whose find is not a formula.
        file.write_str(indoc! {r#"
            {
              "taclets": [
                {
                  "name": "broken",
                  "kind": {
                    "Succedent": {
                      "find": {
                        "op": {"SchemaVariable": {"name": "?t", "kind": {"Term": "Any"}}}
                      }
                    }
                  }
                }
              ]
            }
        "#})
        .unwrap();
        let result = RuleBase::load(file.path());
        assert!(matches!(result, Err(RuleBaseError::Malformed(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = assert_fs::TempDir::new().unwrap();
        let result = RuleBase::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(RuleBaseError::Io(_))));
    }
}
