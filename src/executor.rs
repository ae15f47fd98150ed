use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::goal::Goal;
use crate::kernel::instantiations::{Instantiation, SvInstantiations};
use crate::kernel::matcher::match_term;
use crate::kernel::name::Name;
use crate::kernel::program::ProgramVariable;
use crate::kernel::replace::{instantiate, ReplaceError};
use crate::kernel::schema_variable::SchemaVariable;
use crate::kernel::term::{Term, TermError};
use crate::kernel::term_builder;
use crate::namer::{ProgVarReplacer, RenamingTable, VariableNamer};
use crate::sequent::{PosInOccurrence, Sequent, SequentChangeInfo, SequentFormula, Side};
use crate::settings::{LabelMerge, ProofSettings};
use crate::taclet::{GoalTemplate, Replacement, Taclet, TacletError, TacletKind};
use crate::taclet_app::{AssumesInstantiation, NoPosTacletApp, TacletApp};
use crate::taclet_index::TacletIndex;

/// The branch label of the goal that proves directly supplied assumes formulas.
pub const ASSUMPTIONS_BRANCH: &str = "Assumptions";

/// Why a taclet application could not be executed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApplyErrorKind {
    // Instantiating a template failed.
    Replace(ReplaceError),

    // A produced formula is not a closed formula.
    Term(TermError),

    Malformed(TacletError),

    // The position is not in the sequent, or an assumes formula is not where it claims to be.
    InvalidPosition,

    // The find pattern does not match at the position.
    NoMatch,

    // The application lacks assumes instantiations.
    MissingAssumes { expected: usize, actual: usize },

    // These schema variables still need instantiations.
    Uninstantiated(Vec<SchemaVariable>),

    // The instantiations violate a variable condition.
    ConditionViolated,

    // The goal is not an open goal of the proof.
    GoalNotOpen,
}

impl fmt::Display for ApplyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApplyErrorKind::Replace(e) => write!(f, "{}", e),
            ApplyErrorKind::Term(e) => write!(f, "{}", e),
            ApplyErrorKind::Malformed(e) => write!(f, "{}", e),
            ApplyErrorKind::InvalidPosition => write!(f, "invalid position"),
            ApplyErrorKind::NoMatch => write!(f, "the find pattern does not match"),
            ApplyErrorKind::MissingAssumes { expected, actual } => write!(
                f,
                "expected {} assumes instantiations but got {}",
                expected, actual
            ),
            ApplyErrorKind::Uninstantiated(svs) => {
                let names: Vec<String> = svs.iter().map(|sv| sv.to_string()).collect();
                write!(f, "uninstantiated schema variables: {}", names.join(", "))
            }
            ApplyErrorKind::ConditionViolated => write!(f, "a variable condition is violated"),
            ApplyErrorKind::GoalNotOpen => write!(f, "the goal is not open"),
        }
    }
}

impl From<ReplaceError> for ApplyErrorKind {
    fn from(e: ReplaceError) -> Self {
        ApplyErrorKind::Replace(e)
    }
}

impl From<TermError> for ApplyErrorKind {
    fn from(e: TermError) -> Self {
        ApplyErrorKind::Term(e)
    }
}

impl From<TacletError> for ApplyErrorKind {
    fn from(e: TacletError) -> Self {
        ApplyErrorKind::Malformed(e)
    }
}

/// A failed taclet application, with the taclet and position it was tried at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApplyError {
    pub taclet: Name,
    pub position: Option<PosInOccurrence>,
    pub kind: ApplyErrorKind,
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "cannot apply {}", self.taclet)?;
        if let Some(pos) = &self.position {
            write!(f, " at {}", pos)?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for ApplyError {}

/// What an application needs from the proof it happens in.
pub struct ApplyContext<'a> {
    pub namer: &'a mut dyn VariableNamer,
    pub settings: &'a ProofSettings,

    // The serial of the node the rule is applied to, and its counter for addrule names.
    pub node_serial: usize,
    pub next_taclet_id: &'a mut u32,
}

/// One goal produced by an application, not yet part of the proof tree.
#[derive(Clone, Debug)]
pub struct SuccessorGoal {
    pub branch_label: Option<String>,
    pub change: SequentChangeInfo,
    pub global_prog_vars: im::OrdSet<ProgramVariable>,
    pub taclet_index: TacletIndex,
    pub renamings: Vec<RenamingTable>,
}

impl SuccessorGoal {
    fn copy_of(goal: &Goal, change: SequentChangeInfo) -> SuccessorGoal {
        SuccessorGoal {
            branch_label: None,
            change,
            global_prog_vars: goal.global_prog_vars.clone(),
            taclet_index: goal.taclet_index.clone(),
            renamings: vec![],
        }
    }

    pub fn sequent(&self) -> Sequent {
        self.change.sequent()
    }
}

/// Builds the sequents for the goals of an application, before any template is applied.
///
/// Returns n copies of the sequent, where n is the number of goal templates but at least
/// one. If some assumes formulas were supplied directly, an obligation goal comes first:
/// its succedent ends with the conjunction of the direct antecedent formulas and the
/// negated direct succedent formulas.
///
/// The other copies stay as they are. The direct formulas are not added to them as
/// assumptions, so a goal only ever sees what its own templates put there.
pub fn check_if_goals(
    sequent: &Sequent,
    assumes: &[AssumesInstantiation],
    templates: usize,
    merge: LabelMerge,
) -> Result<Vec<SequentChangeInfo>, TermError> {
    let mut parts = vec![];
    for inst in assumes {
        if let AssumesInstantiation::Direct { side, formula } = inst {
            let part = match side {
                Side::Antecedent => formula.formula().clone(),
                Side::Succedent => term_builder::not(formula.formula().clone())?,
            };
            parts.push(part);
        }
    }
    let mut answer = vec![];
    if !parts.is_empty() {
        let obligation = SequentFormula::new(term_builder::and_all(parts)?)?;
        let mut change = SequentChangeInfo::unchanged(sequent.clone());
        change.add_formula(Side::Succedent, obligation, false, merge);
        answer.push(change);
    }
    for _ in 0..templates.max(1) {
        answer.push(SequentChangeInfo::unchanged(sequent.clone()));
    }
    Ok(answer)
}

/// Executes applications of one taclet.
pub struct TacletExecutor<'a> {
    taclet: &'a Taclet,
}

impl<'a> TacletExecutor<'a> {
    pub fn new(taclet: &'a Taclet) -> TacletExecutor<'a> {
        TacletExecutor { taclet }
    }

    /// Applies the taclet to the goal.
    ///
    /// Returns the successor goals in order: the obligation for directly supplied assumes
    /// formulas if there is one, then one goal per goal template. No successors means the
    /// goal is closed. The goal itself is never changed.
    pub fn apply(
        &self,
        goal: &Goal,
        app: &TacletApp,
        ctx: &mut ApplyContext,
    ) -> Result<Vec<SuccessorGoal>, ApplyError> {
        debug!(taclet = %self.taclet.name, goal = goal.node.0, "applying taclet");
        self.apply_inner(goal, app, ctx).map_err(|kind| {
            debug!(taclet = %self.taclet.name, error = %kind, "application failed");
            ApplyError {
                taclet: self.taclet.name.clone(),
                position: app.position().cloned(),
                kind,
            }
        })
    }

    fn apply_inner(
        &self,
        goal: &Goal,
        app: &TacletApp,
        ctx: &mut ApplyContext,
    ) -> Result<Vec<SuccessorGoal>, ApplyErrorKind> {
        if app.taclet().as_ref() != self.taclet {
            return Err(ApplyErrorKind::Malformed(TacletError {
                taclet: self.taclet.name.clone(),
                message: format!("application is for taclet {}", app.taclet().name),
            }));
        }
        self.taclet.validate()?;
        self.check_position(goal, app)?;
        self.check_assumes(goal, app)?;

        let app = app.instantiate_new_variables(&mut *ctx.namer)?;
        if !app.check_variable_conditions() {
            return Err(ApplyErrorKind::ConditionViolated);
        }
        let missing = app.uninstantiated();
        if !missing.is_empty() {
            return Err(ApplyErrorKind::Uninstantiated(missing));
        }

        let merge = ctx.settings.label_merge;
        let mut changes = check_if_goals(
            &goal.sequent,
            app.assumes(),
            self.taclet.goals.len(),
            merge,
        )?
        .into_iter();

        let mut answer = vec![];
        if app.has_direct_assumes() {
            if let Some(obligation) = changes.next() {
                let mut successor = SuccessorGoal::copy_of(goal, obligation);
                successor.branch_label = Some(ASSUMPTIONS_BRANCH.to_string());
                answer.push(successor);
            }
        }

        for (template, change) in self.taclet.goals.iter().zip(changes) {
            let mut successor = SuccessorGoal::copy_of(goal, change);
            successor.branch_label = template.name.clone();
            self.apply_replacement(template, &app, &mut successor.change, merge)?;
            self.apply_add(template, app.instantiations(), &mut successor.change, merge)?;
            self.apply_add_rules(template, app.instantiations(), &mut successor, ctx);
            self.apply_add_program_vars(template, app.instantiations(), &mut successor, ctx)?;
            trace!(
                taclet = %self.taclet.name,
                sequent = %successor.change,
                "produced goal"
            );
            answer.push(successor);
        }
        Ok(answer)
    }

    fn check_position(&self, goal: &Goal, app: &TacletApp) -> Result<(), ApplyErrorKind> {
        let (Some(find), Some(pos)) = (self.taclet.find(), app.position()) else {
            return match (&self.taclet.kind, app.position()) {
                (TacletKind::NoFind, None) => Ok(()),
                _ => Err(ApplyErrorKind::InvalidPosition),
            };
        };
        if let Some(side) = self.taclet.find_side() {
            if side != pos.side || !pos.is_top_level() {
                return Err(ApplyErrorKind::InvalidPosition);
            }
        }
        let subterm = pos
            .subterm(&goal.sequent)
            .ok_or(ApplyErrorKind::InvalidPosition)?;
        if match_term(find, subterm, app.instantiations()).is_none() {
            return Err(ApplyErrorKind::NoMatch);
        }
        Ok(())
    }

    fn check_assumes(&self, goal: &Goal, app: &TacletApp) -> Result<(), ApplyErrorKind> {
        let expected = self.taclet.assumes.iter().count();
        if app.assumes().len() != expected {
            return Err(ApplyErrorKind::MissingAssumes {
                expected,
                actual: app.assumes().len(),
            });
        }
        for inst in app.assumes() {
            if let AssumesInstantiation::InSequent { pos, formula } = inst {
                if goal.sequent.formula_at(pos) != Some(formula) {
                    return Err(ApplyErrorKind::InvalidPosition);
                }
            }
        }
        Ok(())
    }

    // Instantiates a template formula and wraps it in the update context.
    fn sequent_formula(
        &self,
        template: &Term,
        insts: &SvInstantiations,
    ) -> Result<SequentFormula, ApplyErrorKind> {
        let instantiated = instantiate(template, insts)?;
        let wrapped = term_builder::apply_updates(insts.update_context().iter(), instantiated)?;
        Ok(SequentFormula::new(wrapped)?)
    }

    fn sequent_formulas(
        &self,
        templates: &[Term],
        insts: &SvInstantiations,
    ) -> Result<Vec<SequentFormula>, ApplyErrorKind> {
        templates
            .iter()
            .map(|t| self.sequent_formula(t, insts))
            .collect()
    }

    // Inserts the formulas at the head of the side, in their order.
    fn add_at_head(
        change: &mut SequentChangeInfo,
        side: Side,
        formulas: Vec<SequentFormula>,
        merge: LabelMerge,
    ) {
        for formula in formulas.into_iter().rev() {
            change.add_formula(side, formula, true, merge);
        }
    }

    fn apply_replacement(
        &self,
        template: &GoalTemplate,
        app: &TacletApp,
        change: &mut SequentChangeInfo,
        merge: LabelMerge,
    ) -> Result<(), ApplyErrorKind> {
        let insts = app.instantiations();
        let pos = match (&template.replace, app.position()) {
            (Replacement::None, _) => return Ok(()),
            (_, Some(pos)) => pos,
            (_, None) => return Err(ApplyErrorKind::InvalidPosition),
        };
        match &template.replace {
            Replacement::None => {}
            Replacement::Term(replacement) => {
                let instantiated = instantiate(replacement, insts)?;
                let sequent = change.sequent();
                let top = pos
                    .top_formula(&sequent)
                    .ok_or(ApplyErrorKind::InvalidPosition)?;
                let rewritten = top.formula().replace_at(&pos.path, instantiated)?;
                let top_pos = PosInOccurrence::top_level(pos.side, pos.index);
                change.change_formula(&top_pos, vec![SequentFormula::new(rewritten)?], merge);
            }
            Replacement::Sequent(replacement) => {
                let own = self.sequent_formulas(replacement.side(pos.side), insts)?;
                let other = self.sequent_formulas(replacement.side(pos.side.other()), insts)?;
                change.change_formula(pos, own, merge);
                Self::add_at_head(change, pos.side.other(), other, merge);
            }
        }
        Ok(())
    }

    fn apply_add(
        &self,
        template: &GoalTemplate,
        insts: &SvInstantiations,
        change: &mut SequentChangeInfo,
        merge: LabelMerge,
    ) -> Result<(), ApplyErrorKind> {
        for side in [Side::Antecedent, Side::Succedent] {
            let formulas = self.sequent_formulas(template.add.side(side), insts)?;
            Self::add_at_head(change, side, formulas, merge);
        }
        Ok(())
    }

    fn apply_add_rules(
        &self,
        template: &GoalTemplate,
        insts: &SvInstantiations,
        successor: &mut SuccessorGoal,
        ctx: &mut ApplyContext,
    ) {
        for rule in &template.add_rules {
            let name = Name::from(format!(
                "{}{}{}_{}",
                rule.name, ctx.settings.addrule_infix, ctx.node_serial, *ctx.next_taclet_id
            ));
            *ctx.next_taclet_id += 1;
            let restricted = insts.restrict_to(&rule.schema_variables());
            trace!(taclet = %self.taclet.name, addrule = %name, "adding taclet");
            successor.taclet_index.add(NoPosTacletApp::with_instantiations(
                Arc::new(rule.renamed(name)),
                restricted,
            ));
        }
    }

    fn apply_add_program_vars(
        &self,
        template: &GoalTemplate,
        insts: &SvInstantiations,
        successor: &mut SuccessorGoal,
        ctx: &mut ApplyContext,
    ) -> Result<(), ApplyErrorKind> {
        for sv in &template.add_program_vars {
            let Some(Instantiation::ProgramVariable(pv)) = insts.get(sv) else {
                return Err(ApplyErrorKind::Uninstantiated(vec![sv.clone()]));
            };
            if successor.global_prog_vars.contains(pv) {
                continue;
            }
            let (renamed, effect) =
                ctx.namer
                    .rename(pv, &successor.global_prog_vars, &successor.change.sequent());
            if !effect.is_empty() {
                let replacer = ProgVarReplacer::new(&effect);
                successor.global_prog_vars = replacer.replace_globals(&successor.global_prog_vars);
                successor.taclet_index = replacer.replace_index(&successor.taclet_index);
                replacer.replace_sequent(&mut successor.change);
                successor.renamings.push(RenamingTable::from(&effect));
            }
            successor.global_prog_vars.insert(renamed);
        }
        Ok(())
    }
}
