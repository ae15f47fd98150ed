use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kernel::name::Name;
use crate::kernel::schema_variable::{SchemaVariable, SchemaVariableKind};
use crate::kernel::sort::Sort;
use crate::kernel::term::Term;
use crate::sequent::{SchematicSequent, Side};

/// Where a rewrite taclet may be applied.
/// With no restriction, any position matching the find pattern will do.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationRestriction {
    // The position may be below update applications.
    // The updates crossed form the update context of the application.
    pub same_update_level: bool,

    // There must be no update or modality above the position.
    pub in_sequent_state: bool,

    // The position must have the polarity of an antecedent formula.
    pub antecedent_polarity: bool,

    // The position must have the polarity of a succedent formula.
    pub succedent_polarity: bool,
}

impl ApplicationRestriction {
    pub fn same_update_level() -> ApplicationRestriction {
        ApplicationRestriction {
            same_update_level: true,
            ..ApplicationRestriction::default()
        }
    }

    pub fn in_sequent_state() -> ApplicationRestriction {
        ApplicationRestriction {
            in_sequent_state: true,
            ..ApplicationRestriction::default()
        }
    }
}

/// What the taclet looks for.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TacletKind {
    // Rewrites a term or formula anywhere inside a sequent formula.
    Rewrite {
        find: Term,
        #[serde(default)]
        restriction: ApplicationRestriction,
    },

    // Works on a whole antecedent formula.
    Antecedent { find: Term },

    // Works on a whole succedent formula.
    Succedent { find: Term },

    // Needs no position at all.
    NoFind,
}

/// What replaces the find position.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Replacement {
    // The found term or formula stays.
    #[default]
    None,

    // For rewrite taclets.
    Term(Term),

    // For antecedent and succedent taclets: the found formula is replaced by the formulas
    // of its own side, the formulas of the other side are added.
    Sequent(SchematicSequent),
}

/// The recipe for one successor goal.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalTemplate {
    // The branch label, like "Normal Execution" or "Use Case".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub replace: Replacement,

    #[serde(skip_serializing_if = "SchematicSequent::is_empty")]
    pub add: SchematicSequent,

    // Taclets that become available in the new goal and below it.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_rules: Vec<Taclet>,

    // Program-variable schema variables whose instantiations become new program variables
    // of the goal.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_program_vars: Vec<SchemaVariable>,
}

impl GoalTemplate {
    pub fn new() -> GoalTemplate {
        GoalTemplate::default()
    }

    pub fn named(name: &str) -> GoalTemplate {
        GoalTemplate {
            name: Some(name.to_string()),
            ..GoalTemplate::default()
        }
    }

    pub fn replace_term(mut self, term: Term) -> GoalTemplate {
        self.replace = Replacement::Term(term);
        self
    }

    pub fn replace_sequent(mut self, antecedent: Vec<Term>, succedent: Vec<Term>) -> GoalTemplate {
        self.replace = Replacement::Sequent(SchematicSequent::new(antecedent, succedent));
        self
    }

    pub fn add(mut self, antecedent: Vec<Term>, succedent: Vec<Term>) -> GoalTemplate {
        self.add = SchematicSequent::new(antecedent, succedent);
        self
    }

    pub fn add_rule(mut self, taclet: Taclet) -> GoalTemplate {
        self.add_rules.push(taclet);
        self
    }

    pub fn add_program_var(mut self, sv: SchemaVariable) -> GoalTemplate {
        self.add_program_vars.push(sv);
        self
    }

    fn collect_schema_variables(&self, output: &mut Vec<SchemaVariable>) {
        match &self.replace {
            Replacement::None => {}
            Replacement::Term(t) => t.collect_schema_variables(output),
            Replacement::Sequent(s) => collect_from_sequent(s, output),
        }
        collect_from_sequent(&self.add, output);
        for rule in &self.add_rules {
            rule.collect_schema_variables(output);
        }
        for sv in &self.add_program_vars {
            push_unique(output, sv);
        }
    }
}

/// The sort of a variable created for a "new" condition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NewVariableSort {
    Fixed(Sort),

    // The sort of whatever the other schema variable is instantiated with.
    TypeOf(SchemaVariable),
}

/// Side conditions on the instantiations of a taclet.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum VariableCondition {
    // The program-variable schema variable gets a fresh program variable.
    New {
        sv: SchemaVariable,
        sort: NewVariableSort,
    },

    // The logic variable bound to var must not occur free in the instantiation of term.
    NotFreeIn {
        var: SchemaVariable,
        term: SchemaVariable,
    },
}

/// A taclet is malformed if its parts do not fit together.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TacletError {
    pub taclet: Name,
    pub message: String,
}

impl fmt::Display for TacletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed taclet {}: {}", self.taclet, self.message)
    }
}

impl std::error::Error for TacletError {}

/// A schematic rule.
/// Taclets are built when the rule base is loaded and never change afterwards.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Taclet {
    pub name: Name,

    pub kind: TacletKind,

    // Formulas that must be in the sequent, or else get proven separately.
    #[serde(default, skip_serializing_if = "SchematicSequent::is_empty")]
    pub assumes: SchematicSequent,

    // One successor goal per template. No templates means the taclet closes the goal.
    #[serde(default)]
    pub goals: Vec<GoalTemplate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<VariableCondition>,
}

impl Taclet {
    pub fn new(name: &str, kind: TacletKind) -> Taclet {
        Taclet {
            name: Name::new(name),
            kind,
            assumes: SchematicSequent::default(),
            goals: vec![],
            conditions: vec![],
        }
    }

    pub fn with_assumes(mut self, antecedent: Vec<Term>, succedent: Vec<Term>) -> Taclet {
        self.assumes = SchematicSequent::new(antecedent, succedent);
        self
    }

    pub fn with_goal(mut self, goal: GoalTemplate) -> Taclet {
        self.goals.push(goal);
        self
    }

    pub fn with_condition(mut self, condition: VariableCondition) -> Taclet {
        self.conditions.push(condition);
        self
    }

    /// The same taclet under another name.
    pub fn renamed(&self, name: Name) -> Taclet {
        Taclet {
            name,
            ..self.clone()
        }
    }

    pub fn find(&self) -> Option<&Term> {
        match &self.kind {
            TacletKind::Rewrite { find, .. }
            | TacletKind::Antecedent { find }
            | TacletKind::Succedent { find } => Some(find),
            TacletKind::NoFind => None,
        }
    }

    /// The side a non-rewrite find has to be on.
    pub fn find_side(&self) -> Option<Side> {
        match &self.kind {
            TacletKind::Antecedent { .. } => Some(Side::Antecedent),
            TacletKind::Succedent { .. } => Some(Side::Succedent),
            _ => None,
        }
    }

    /// Every schema variable mentioned anywhere in the taclet, including its addrules.
    pub fn schema_variables(&self) -> Vec<SchemaVariable> {
        let mut answer = vec![];
        self.collect_schema_variables(&mut answer);
        answer
    }

    fn collect_schema_variables(&self, output: &mut Vec<SchemaVariable>) {
        if let Some(find) = self.find() {
            find.collect_schema_variables(output);
        }
        collect_from_sequent(&self.assumes, output);
        for goal in &self.goals {
            goal.collect_schema_variables(output);
        }
        for condition in &self.conditions {
            match condition {
                VariableCondition::New { sv, sort } => {
                    push_unique(output, sv);
                    if let NewVariableSort::TypeOf(other) = sort {
                        push_unique(output, other);
                    }
                }
                VariableCondition::NotFreeIn { var, term } => {
                    push_unique(output, var);
                    push_unique(output, term);
                }
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> TacletError {
        TacletError {
            taclet: self.name.clone(),
            message: message.into(),
        }
    }

    /// Checks that the parts of the taclet fit together.
    pub fn validate(&self) -> Result<(), TacletError> {
        match &self.kind {
            TacletKind::Antecedent { find } | TacletKind::Succedent { find } => {
                if !find.is_formula() {
                    return Err(self.error(format!("find pattern {} is not a formula", find)));
                }
            }
            TacletKind::Rewrite { find, restriction } => {
                if restriction.same_update_level && restriction.in_sequent_state {
                    return Err(self.error("conflicting application restrictions"));
                }
                if restriction.antecedent_polarity && restriction.succedent_polarity {
                    return Err(self.error("conflicting polarity restrictions"));
                }
                if find.sort() == &Sort::Update {
                    return Err(self.error("cannot rewrite updates"));
                }
            }
            TacletKind::NoFind => {}
        }
        for (_, term) in self.assumes.iter() {
            if !term.is_formula() {
                return Err(self.error(format!("assumes pattern {} is not a formula", term)));
            }
        }
        for goal in &self.goals {
            match (&self.kind, &goal.replace) {
                (_, Replacement::None) => {}
                (TacletKind::Rewrite { find, .. }, Replacement::Term(t)) => {
                    let compatible = t.sort() == find.sort()
                        || (find.sort().is_term_sort() && t.sort().is_term_sort());
                    if !compatible {
                        return Err(self.error(format!(
                            "replacement {} does not fit find pattern {}",
                            t, find
                        )));
                    }
                }
                (
                    TacletKind::Antecedent { .. } | TacletKind::Succedent { .. },
                    Replacement::Sequent(_),
                ) => {}
                _ => {
                    return Err(self.error("replacement does not fit the kind of taclet"));
                }
            }
            for (_, term) in goal.add.iter() {
                if !term.is_formula() {
                    return Err(self.error(format!("added term {} is not a formula", term)));
                }
            }
            if let Replacement::Sequent(s) = &goal.replace {
                for (_, term) in s.iter() {
                    if !term.is_formula() {
                        return Err(self.error(format!("replacement {} is not a formula", term)));
                    }
                }
            }
            for sv in &goal.add_program_vars {
                if !matches!(sv.kind(), SchemaVariableKind::ProgramVariable(_)) {
                    return Err(self.error(format!("{} is not a program variable", sv)));
                }
            }
            for rule in &goal.add_rules {
                rule.validate()?;
            }
        }
        for condition in &self.conditions {
            match condition {
                VariableCondition::New { sv, .. } => {
                    if !matches!(sv.kind(), SchemaVariableKind::ProgramVariable(_)) {
                        return Err(
                            self.error(format!("new variable {} is not a program variable", sv))
                        );
                    }
                }
                VariableCondition::NotFreeIn { var, .. } => {
                    if !matches!(var.kind(), SchemaVariableKind::Variable(_)) {
                        return Err(
                            self.error(format!("{} is not a variable schema variable", var))
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

fn push_unique(output: &mut Vec<SchemaVariable>, sv: &SchemaVariable) {
    if !output.contains(sv) {
        output.push(sv.clone());
    }
}

fn collect_from_sequent(sequent: &SchematicSequent, output: &mut Vec<SchemaVariable>) {
    for (_, term) in sequent.iter() {
        term.collect_schema_variables(output);
    }
}

impl fmt::Display for Taclet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {{", self.name)?;
        if !self.assumes.is_empty() {
            write!(f, " assumes({})", self.assumes)?;
        }
        match &self.kind {
            TacletKind::Rewrite { find, .. } => write!(f, " find({})", find)?,
            TacletKind::Antecedent { find } => write!(f, " find({} ==>)", find)?,
            TacletKind::Succedent { find } => write!(f, " find(==> {})", find)?,
            TacletKind::NoFind => {}
        }
        for condition in &self.conditions {
            match condition {
                VariableCondition::New { sv, .. } => write!(f, " new({})", sv)?,
                VariableCondition::NotFreeIn { var, term } => {
                    write!(f, " notFreeIn({}, {})", var, term)?
                }
            }
        }
        for (i, goal) in self.goals.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            if let Some(name) = &goal.name {
                write!(f, " \"{}\":", name)?;
            }
            match &goal.replace {
                Replacement::None => {}
                Replacement::Term(t) => write!(f, " replacewith({})", t)?,
                Replacement::Sequent(s) => write!(f, " replacewith({})", s)?,
            }
            if !goal.add.is_empty() {
                write!(f, " add({})", goal.add)?;
            }
            for rule in &goal.add_rules {
                write!(f, " addrules({})", rule.name)?;
            }
        }
        if self.goals.is_empty() {
            write!(f, " closegoal")?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::operator::Junctor;

    fn imp_right() -> Taclet {
        let a = SchemaVariable::formula("?a");
        let b = SchemaVariable::formula("?b");
        let find =
            Term::junctor(Junctor::Imp, vec![Term::schema_var(&a), Term::schema_var(&b)]).unwrap();
        let goal = GoalTemplate::new()
            .replace_sequent(vec![Term::schema_var(&a)], vec![Term::schema_var(&b)]);
        Taclet::new("impRight", TacletKind::Succedent { find }).with_goal(goal)
    }

    #[test]
    fn test_schema_variables_are_collected_once() {
        let svs = imp_right().schema_variables();
        let names: Vec<&str> = svs.iter().map(|sv| sv.name().as_str()).collect();
        assert_eq!(names, vec!["?a", "?b"]);
    }

    #[test]
    fn test_validate_rejects_term_replacement_for_succedent_taclet() {
        let mut taclet = imp_right();
        assert!(taclet.validate().is_ok());
        taclet.goals[0].replace = Replacement::Term(Term::tt());
        assert!(taclet.validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            imp_right().to_string(),
            "impRight { find(==> imp(?a, ?b)) replacewith(?a ==> ?b) }"
        );
    }

    #[test]
    fn test_json_round_trip_keeps_the_taclet() {
        let taclet = imp_right();
        let json = serde_json::to_string(&taclet).unwrap();
        let back: Taclet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, taclet);
    }
}
