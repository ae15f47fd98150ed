use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::executor::ApplyErrorKind;
use crate::kernel::instantiations::{Instantiation, SvInstantiations};
use crate::kernel::matcher::match_term;
use crate::kernel::operator::Operator;
use crate::kernel::schema_variable::SchemaVariable;
use crate::kernel::term::Term;
use crate::namer::VariableNamer;
use crate::sequent::{PosInOccurrence, Sequent, SequentFormula, Side};
use crate::taclet::{NewVariableSort, Replacement, Taclet, TacletKind, VariableCondition};

/// Whether a term with root operator op could match a pattern with root operator pattern.
/// Cheap, used to skip positions before running the matcher.
pub fn root_may_match(pattern: &Operator, op: &Operator) -> bool {
    match (pattern, op) {
        (Operator::SchemaVariable(_), _) => true,
        (Operator::Function(p), Operator::Function(c)) => p.name == c.name,
        (Operator::Modality { kind: pk, .. }, Operator::Modality { kind: ck, .. }) => pk == ck,
        (Operator::LogicVariable(_), Operator::LogicVariable(_)) => true,
        (p, c) => p == c,
    }
}

/// A taclet with some instantiations, not yet tied to a position.
/// This is what a taclet index holds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NoPosTacletApp {
    pub taclet: Arc<Taclet>,
    pub instantiations: SvInstantiations,
}

impl NoPosTacletApp {
    pub fn new(taclet: Arc<Taclet>) -> NoPosTacletApp {
        NoPosTacletApp {
            taclet,
            instantiations: SvInstantiations::new(),
        }
    }

    pub fn with_instantiations(taclet: Arc<Taclet>, instantiations: SvInstantiations) -> NoPosTacletApp {
        NoPosTacletApp {
            taclet,
            instantiations,
        }
    }

    fn app(&self, instantiations: SvInstantiations, position: Option<PosInOccurrence>) -> TacletApp {
        TacletApp {
            taclet: self.taclet.clone(),
            instantiations,
            position,
            assumes: vec![],
        }
    }

    /// The application of a taclet without find.
    pub fn no_find_app(&self) -> Option<TacletApp> {
        match self.taclet.kind {
            TacletKind::NoFind => Some(self.app(self.instantiations.clone(), None)),
            _ => None,
        }
    }

    /// Matches the find pattern at the position.
    /// None when the position does not exist, the pattern does not match, or an
    /// application restriction rules the position out.
    pub fn match_find(&self, sequent: &Sequent, pos: &PosInOccurrence) -> Option<TacletApp> {
        let formula = pos.top_formula(sequent)?.formula();
        let answer = match &self.taclet.kind {
            TacletKind::NoFind => return None,
            TacletKind::Antecedent { find } | TacletKind::Succedent { find } => {
                if !pos.is_top_level() || self.taclet.find_side() != Some(pos.side) {
                    return None;
                }
                let insts = match_term(find, formula, &self.instantiations)?;
                self.app(insts, Some(pos.clone()))
            }
            TacletKind::Rewrite { find, restriction } => {
                if restriction.antecedent_polarity || restriction.succedent_polarity {
                    let wanted = if restriction.antecedent_polarity {
                        Side::Antecedent
                    } else {
                        Side::Succedent
                    };
                    if pos.polarity(sequent) != Some(wanted) {
                        return None;
                    }
                }
                let mut updates = im::Vector::new();
                let mut below_other = false;
                let mut term = formula;
                for &i in &pos.path {
                    match term.op() {
                        Operator::UpdateApplication => {
                            if restriction.in_sequent_state {
                                return None;
                            }
                            if restriction.same_update_level {
                                // Only the updates on top of the formula form the context.
                                if i == 0 || below_other {
                                    return None;
                                }
                                updates.push_back(term.child(0).clone());
                            }
                        }
                        Operator::Modality { .. } => {
                            if restriction.same_update_level || restriction.in_sequent_state {
                                return None;
                            }
                        }
                        _ => below_other = true,
                    }
                    term = term.children().get(i)?;
                }
                if !root_may_match(find.op(), term.op()) {
                    return None;
                }
                let insts = self.instantiations.with_update_context(updates);
                let insts = match_term(find, term, &insts)?;
                self.app(insts, Some(pos.clone()))
            }
        };
        trace!(taclet = %self.taclet.name, position = %pos, "find matched");
        Some(answer)
    }

    /// The applications at one position: the find match, completed with every way to
    /// instantiate the assumes formulas from the sequent.
    pub fn applications_at(
        &self,
        sequent: &Sequent,
        pos: &PosInOccurrence,
        max_assumes: usize,
    ) -> Vec<TacletApp> {
        self.complete(self.match_find(sequent, pos), sequent, max_assumes)
    }

    fn complete(&self, found: Option<TacletApp>, sequent: &Sequent, max_assumes: usize) -> Vec<TacletApp> {
        let Some(app) = found else {
            return vec![];
        };
        app.match_assumes(sequent, max_assumes)
            .into_iter()
            .filter(|complete| complete.check_variable_conditions())
            .collect()
    }

    /// Every application of the taclet to the sequent, over every position and every way
    /// to instantiate the assumes formulas from the sequent.
    pub fn find_applications(&self, sequent: &Sequent, max_assumes: usize) -> Vec<TacletApp> {
        match &self.taclet.kind {
            TacletKind::NoFind => self.complete(self.no_find_app(), sequent, max_assumes),
            TacletKind::Antecedent { .. } | TacletKind::Succedent { .. } => sequent
                .positions()
                .flat_map(|(pos, _)| self.applications_at(sequent, &pos, max_assumes))
                .collect(),
            TacletKind::Rewrite { .. } => sequent
                .subterm_positions()
                .iter()
                .flat_map(|pos| self.applications_at(sequent, pos, max_assumes))
                .collect(),
        }
    }
}

/// How one assumes formula got instantiated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AssumesInstantiation {
    // A formula found in the sequent.
    InSequent {
        pos: PosInOccurrence,
        formula: SequentFormula,
    },

    // A formula supplied from outside. Applying the taclet creates a goal to prove it.
    Direct { side: Side, formula: SequentFormula },
}

impl AssumesInstantiation {
    pub fn formula(&self) -> &SequentFormula {
        match self {
            AssumesInstantiation::InSequent { formula, .. }
            | AssumesInstantiation::Direct { formula, .. } => formula,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, AssumesInstantiation::Direct { .. })
    }
}

/// A taclet, its instantiations, the position it applies to and its assumes
/// instantiations. Complete applications can be executed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TacletApp {
    taclet: Arc<Taclet>,
    instantiations: SvInstantiations,
    position: Option<PosInOccurrence>,

    // One per assumes pattern, antecedent patterns first. Empty until matched.
    assumes: Vec<AssumesInstantiation>,
}

impl TacletApp {
    pub fn taclet(&self) -> &Arc<Taclet> {
        &self.taclet
    }

    pub fn instantiations(&self) -> &SvInstantiations {
        &self.instantiations
    }

    pub fn position(&self) -> Option<&PosInOccurrence> {
        self.position.as_ref()
    }

    pub fn assumes(&self) -> &[AssumesInstantiation] {
        &self.assumes
    }

    pub fn has_direct_assumes(&self) -> bool {
        self.assumes.iter().any(|a| a.is_direct())
    }

    /// Binds a schema variable that matching could not bind, like the instance term of a
    /// quantifier rule. The term must fit the kind and sort of the schema variable.
    pub fn instantiate(&self, sv: &SchemaVariable, term: &Term) -> Option<TacletApp> {
        let insts = match_term(&Term::schema_var(sv), term, &self.instantiations)?;
        Some(TacletApp {
            instantiations: insts,
            ..self.clone()
        })
    }

    // Strips the update context from a formula, if the formula starts with it.
    fn strip_update_context<'a>(&self, formula: &'a Term) -> Option<&'a Term> {
        let mut term = formula;
        for update in self.instantiations.update_context().iter() {
            match term.op() {
                Operator::UpdateApplication if term.child(0) == update => term = term.child(1),
                _ => return None,
            }
        }
        Some(term)
    }

    fn match_assumes_formula(
        &self,
        pattern: &Term,
        formula: &SequentFormula,
        insts: &SvInstantiations,
    ) -> Option<SvInstantiations> {
        let stripped = self.strip_update_context(formula.formula())?;
        match_term(pattern, stripped, insts)
    }

    /// Every way to instantiate the assumes patterns with formulas of the sequent,
    /// up to max applications. Without assumes patterns, the application itself.
    pub fn match_assumes(&self, sequent: &Sequent, max: usize) -> Vec<TacletApp> {
        let patterns: Vec<(Side, Term)> = self
            .taclet
            .assumes
            .iter()
            .map(|(side, t)| (side, t.clone()))
            .collect();
        if patterns.is_empty() {
            return vec![self.clone()];
        }
        let mut answer = vec![];
        self.enumerate_assumes(
            sequent,
            &patterns,
            self.instantiations.clone(),
            &mut vec![],
            max,
            &mut answer,
        );
        answer
    }

    fn enumerate_assumes(
        &self,
        sequent: &Sequent,
        patterns: &[(Side, Term)],
        insts: SvInstantiations,
        chosen: &mut Vec<AssumesInstantiation>,
        max: usize,
        answer: &mut Vec<TacletApp>,
    ) {
        if answer.len() >= max {
            return;
        }
        let Some(((side, pattern), rest)) = patterns.split_first() else {
            answer.push(TacletApp {
                instantiations: insts,
                assumes: chosen.clone(),
                ..self.clone()
            });
            return;
        };
        for (index, formula) in sequent.semisequent(*side).iter().enumerate() {
            let Some(next) = self.match_assumes_formula(pattern, formula, &insts) else {
                continue;
            };
            chosen.push(AssumesInstantiation::InSequent {
                pos: PosInOccurrence::top_level(*side, index),
                formula: formula.clone(),
            });
            self.enumerate_assumes(sequent, rest, next, chosen, max, answer);
            chosen.pop();
            if answer.len() >= max {
                return;
            }
        }
    }

    /// Sets the assumes instantiations, one per assumes pattern, antecedent first.
    /// Each formula must match its pattern. Direct formulas are taken as they are,
    /// formulas claimed to be in the sequent must be there.
    pub fn with_assumes(
        &self,
        sequent: &Sequent,
        assumes: Vec<AssumesInstantiation>,
    ) -> Option<TacletApp> {
        let patterns: Vec<(Side, &Term)> = self.taclet.assumes.iter().collect();
        if patterns.len() != assumes.len() {
            return None;
        }
        let mut insts = self.instantiations.clone();
        for ((side, pattern), inst) in patterns.iter().zip(assumes.iter()) {
            match inst {
                AssumesInstantiation::InSequent { pos, formula } => {
                    if pos.side != *side || sequent.formula_at(pos) != Some(formula) {
                        return None;
                    }
                }
                AssumesInstantiation::Direct { side: s, .. } => {
                    if s != side {
                        return None;
                    }
                }
            }
            insts = self.match_assumes_formula(pattern, inst.formula(), &insts)?;
        }
        Some(TacletApp {
            instantiations: insts,
            assumes,
            ..self.clone()
        })
    }

    /// Creates the program variables the "new" conditions ask for.
    pub fn instantiate_new_variables(
        &self,
        namer: &mut dyn VariableNamer,
    ) -> Result<TacletApp, ApplyErrorKind> {
        let mut insts = self.instantiations.clone();
        for condition in &self.taclet.conditions {
            let VariableCondition::New { sv, sort } = condition else {
                continue;
            };
            if insts.is_instantiated(sv) {
                continue;
            }
            let sort = match sort {
                NewVariableSort::Fixed(sort) => insts.resolve_sort(sort),
                NewVariableSort::TypeOf(other) => insts
                    .get(other)
                    .and_then(|inst| inst.sort())
                    .ok_or_else(|| ApplyErrorKind::Uninstantiated(vec![other.clone()]))?,
            };
            let pv = namer.new_program_variable(sv.name().as_str(), &sort);
            trace!(sv = %sv, variable = %pv, "new program variable");
            insts = insts.replace(sv, Instantiation::ProgramVariable(pv));
        }
        Ok(TacletApp {
            instantiations: insts,
            ..self.clone()
        })
    }

    /// Whether the instantiations satisfy the variable conditions.
    /// Conditions on schema variables that are not instantiated yet count as satisfied.
    pub fn check_variable_conditions(&self) -> bool {
        for condition in &self.taclet.conditions {
            match condition {
                VariableCondition::New { sv, .. } => match self.instantiations.get(sv) {
                    None | Some(Instantiation::ProgramVariable(_)) => {}
                    Some(_) => return false,
                },
                VariableCondition::NotFreeIn { var, term } => {
                    let (Some(Instantiation::LogicVariable(lv)), Some(inst)) =
                        (self.instantiations.get(var), self.instantiations.get(term))
                    else {
                        continue;
                    };
                    if inst.free_variables().contains(lv) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// The schema variables the application still needs before it can be executed.
    /// Schema variables that only appear in addrules do not count, nor do the ones
    /// "new" conditions create.
    pub fn uninstantiated(&self) -> Vec<SchemaVariable> {
        let mut needed = vec![];
        if let Some(find) = self.taclet.find() {
            find.collect_schema_variables(&mut needed);
        }
        for (_, t) in self.taclet.assumes.iter() {
            t.collect_schema_variables(&mut needed);
        }
        for goal in &self.taclet.goals {
            match &goal.replace {
                Replacement::None => {}
                Replacement::Term(t) => t.collect_schema_variables(&mut needed),
                Replacement::Sequent(s) => {
                    for (_, t) in s.iter() {
                        t.collect_schema_variables(&mut needed);
                    }
                }
            }
            for (_, t) in goal.add.iter() {
                t.collect_schema_variables(&mut needed);
            }
        }
        let created: Vec<&SchemaVariable> = self
            .taclet
            .conditions
            .iter()
            .filter_map(|c| match c {
                VariableCondition::New { sv, .. } => Some(sv),
                _ => None,
            })
            .collect();
        needed
            .into_iter()
            .filter(|sv| !self.instantiations.is_instantiated(sv) && !created.contains(&sv))
            .collect()
    }
}

impl fmt::Display for TacletApp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.taclet.name)?;
        if let Some(pos) = &self.position {
            write!(f, " at {}", pos)?;
        }
        write!(f, " with {}", self.instantiations)
    }
}
