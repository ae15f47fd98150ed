use std::fmt;

use crate::kernel::program::ProgramVariable;
use crate::node::NodeId;
use crate::sequent::Sequent;
use crate::taclet_index::TacletIndex;

/// An open leaf of the proof tree, with everything a rule application needs.
#[derive(Clone, Debug)]
pub struct Goal {
    pub node: NodeId,
    pub sequent: Sequent,

    // Program variables introduced on the way to this goal.
    pub global_prog_vars: im::OrdSet<ProgramVariable>,

    // The taclets available here. Addrules of ancestor applications show up only here and
    // in the goals below.
    pub taclet_index: TacletIndex,
}

impl Goal {
    pub fn new(
        node: NodeId,
        sequent: Sequent,
        global_prog_vars: im::OrdSet<ProgramVariable>,
        taclet_index: TacletIndex,
    ) -> Goal {
        Goal {
            node,
            sequent,
            global_prog_vars,
            taclet_index,
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "goal {}: {}", self.node, self.sequent)
    }
}
