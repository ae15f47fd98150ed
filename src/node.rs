use std::fmt;

use serde::{Deserialize, Serialize};

use crate::namer::RenamingTable;
use crate::sequent::Sequent;
use crate::taclet_app::TacletApp;

/// Identifies a node within its proof.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the proof tree. Every node holds one sequent.
/// A node without children is either an open goal or was closed by its rule.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub sequent: Sequent,

    // The rule applied to this node, once one is.
    pub applied: Option<TacletApp>,

    // The label of the branch this node starts, like "Assumptions".
    pub branch_label: Option<String>,

    // The program variable renamings made when this node was created.
    pub renamings: Vec<RenamingTable>,

    // Numbers nodes in creation order, across the whole proof.
    pub serial: usize,

    // Counts the addrules created when a rule is applied to this node.
    pub next_taclet_id: u32,
}

impl Node {
    pub fn new(id: NodeId, parent: Option<NodeId>, sequent: Sequent, serial: usize) -> Node {
        Node {
            id,
            parent,
            children: vec![],
            sequent,
            applied: None,
            branch_label: None,
            renamings: vec![],
            serial,
            next_taclet_id: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// A leaf closed by its rule, as opposed to an open goal.
    pub fn is_closed_leaf(&self) -> bool {
        self.is_leaf() && self.applied.is_some()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(label) = &self.branch_label {
            write!(f, " [{}]", label)?;
        }
        write!(f, " {}", self.sequent)?;
        if let Some(app) = &self.applied {
            write!(f, " by {}", app.taclet().name)?;
        }
        Ok(())
    }
}
