use std::fmt;

use tracing::{debug, trace};

use crate::executor::{ApplyContext, ApplyError, ApplyErrorKind, TacletExecutor};
use crate::goal::Goal;
use crate::kernel::name::Name;
use crate::namer::{DefaultVariableNamer, VariableNamer};
use crate::node::{Node, NodeId};
use crate::sequent::Sequent;
use crate::settings::ProofSettings;
use crate::taclet_app::TacletApp;
use crate::taclet_index::TacletIndex;

/// A proof tree, grown by applying taclets to its open goals.
pub struct Proof {
    // Indexed by NodeId.
    nodes: Vec<Node>,

    // The open goals, in tree order.
    goals: Vec<Goal>,

    namer: Box<dyn VariableNamer>,
    settings: ProofSettings,
}

impl Proof {
    /// A proof of the sequent with one open goal, using the default variable namer.
    pub fn new(sequent: Sequent, taclet_index: TacletIndex, settings: ProofSettings) -> Proof {
        let namer = Box::new(DefaultVariableNamer::new(&settings.rename_separator));
        Proof::with_namer(sequent, taclet_index, settings, namer)
    }

    pub fn with_namer(
        sequent: Sequent,
        taclet_index: TacletIndex,
        settings: ProofSettings,
        namer: Box<dyn VariableNamer>,
    ) -> Proof {
        let root = NodeId(0);
        let goal = Goal::new(root, sequent.clone(), im::OrdSet::new(), taclet_index);
        Proof {
            nodes: vec![Node::new(root, None, sequent, 0)],
            goals: vec![goal],
            namer,
            settings,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn settings(&self) -> &ProofSettings {
        &self.settings
    }

    pub fn open_goals(&self) -> &[Goal] {
        &self.goals
    }

    /// The open goal at the node, if the node is an open goal.
    pub fn goal(&self, node: NodeId) -> Option<&Goal> {
        self.goals.iter().find(|g| g.node == node)
    }

    pub fn is_closed(&self) -> bool {
        self.goals.is_empty()
    }

    /// Every way to apply the named taclet of the goal's index to the goal.
    pub fn find_applications(&self, goal: NodeId, taclet: &Name) -> Vec<TacletApp> {
        let Some(goal) = self.goal(goal) else {
            return vec![];
        };
        let Some(app) = goal.taclet_index.get(taclet) else {
            return vec![];
        };
        app.find_applications(&goal.sequent, self.settings.max_assumes_candidates)
    }

    /// Every way to apply any taclet of the goal's index to the goal.
    /// Taclets without find come first, by name. Then position by position, antecedent first
    /// and parents before children, the taclets whose find could match there.
    pub fn all_applications(&self, goal: NodeId) -> Vec<TacletApp> {
        let Some(goal) = self.goal(goal) else {
            return vec![];
        };
        let max = self.settings.max_assumes_candidates;
        let mut answer: Vec<TacletApp> = goal
            .taclet_index
            .no_find()
            .flat_map(|app| app.find_applications(&goal.sequent, max))
            .collect();
        for pos in goal.sequent.subterm_positions() {
            let Some(term) = pos.subterm(&goal.sequent) else {
                continue;
            };
            for app in goal.taclet_index.candidates(term) {
                answer.extend(app.applications_at(&goal.sequent, &pos, max));
            }
        }
        trace!(goal = goal.node.0, applications = answer.len(), "found applications");
        answer
    }

    /// Applies the taclet application to the open goal.
    /// The goal is replaced by its successors, which are returned in order. If the
    /// application fails, the proof stays as it was, down to the namer and the addrule
    /// counter.
    pub fn apply(&mut self, goal: NodeId, app: &TacletApp) -> Result<Vec<NodeId>, ApplyError> {
        let Some(goal_index) = self.goals.iter().position(|g| g.node == goal) else {
            return Err(ApplyError {
                taclet: app.taclet().name.clone(),
                position: app.position().cloned(),
                kind: ApplyErrorKind::GoalNotOpen,
            });
        };

        let node = &self.nodes[goal.0];
        let mut next_taclet_id = node.next_taclet_id;
        let mut namer = self.namer.boxed_clone();
        let mut ctx = ApplyContext {
            namer: namer.as_mut(),
            settings: &self.settings,
            node_serial: node.serial,
            next_taclet_id: &mut next_taclet_id,
        };
        let successors =
            TacletExecutor::new(app.taclet()).apply(&self.goals[goal_index], app, &mut ctx)?;

        self.namer = namer;
        let node = &mut self.nodes[goal.0];
        node.next_taclet_id = next_taclet_id;
        node.applied = Some(app.clone());

        let mut ids = vec![];
        let mut new_goals = vec![];
        for successor in successors {
            let id = NodeId(self.nodes.len());
            let sequent = successor.sequent();
            let mut child = Node::new(id, Some(goal), sequent.clone(), id.0);
            child.branch_label = successor.branch_label;
            child.renamings = successor.renamings;
            self.nodes.push(child);
            self.nodes[goal.0].children.push(id);
            new_goals.push(Goal::new(
                id,
                sequent,
                successor.global_prog_vars,
                successor.taclet_index,
            ));
            ids.push(id);
        }
        debug!(
            goal = goal.0,
            taclet = %app.taclet().name,
            successors = ids.len(),
            "applied taclet"
        );
        self.goals.splice(goal_index..goal_index + 1, new_goals);
        Ok(ids)
    }

    fn fmt_node(&self, f: &mut fmt::Formatter, id: NodeId, depth: usize) -> fmt::Result {
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        write!(f, "{:indent$}{}", "", node, indent = depth * 2)?;
        if node.is_closed_leaf() {
            write!(f, " (closed)")?;
        } else if node.is_leaf() {
            write!(f, " (open)")?;
        }
        writeln!(f)?;
        for child in &node.children {
            self.fmt_node(f, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Proof {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_node(f, self.root(), 0)
    }
}
