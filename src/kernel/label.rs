use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::kernel::name::Name;

/// A metadata tag attached to a term, for example to track where a formula came from.
/// Labels never change the logical meaning of a term.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermLabel(Name);

impl TermLabel {
    pub fn new(name: &str) -> TermLabel {
        TermLabel(Name::new(name))
    }

    pub fn name(&self) -> &Name {
        &self.0
    }
}

impl fmt::Display for TermLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered set of labels.
/// Insertion order is kept for display, but equality and hashing ignore it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(Vec<TermLabel>);

impl LabelSet {
    pub fn empty() -> LabelSet {
        LabelSet(Vec::new())
    }

    /// Duplicates are dropped, keeping the first occurrence.
    pub fn new(labels: impl IntoIterator<Item = TermLabel>) -> LabelSet {
        let mut set = LabelSet::empty();
        for label in labels {
            set.insert(label);
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, label: &TermLabel) -> bool {
        self.0.contains(label)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TermLabel> {
        self.0.iter()
    }

    /// Returns whether the label was new.
    pub fn insert(&mut self, label: TermLabel) -> bool {
        if self.contains(&label) {
            return false;
        }
        self.0.push(label);
        true
    }

    /// The labels of self followed by the labels of other that self lacks.
    pub fn union(&self, other: &LabelSet) -> LabelSet {
        let mut answer = self.clone();
        for label in other.iter() {
            answer.insert(label.clone());
        }
        answer
    }

    /// The labels of other that self also has, in the order of other.
    pub fn intersection(&self, other: &LabelSet) -> LabelSet {
        LabelSet(
            other
                .iter()
                .filter(|label| self.contains(label))
                .cloned()
                .collect(),
        )
    }

    /// The labels of self that other lacks.
    pub fn difference(&self, other: &LabelSet) -> LabelSet {
        LabelSet(
            self.iter()
                .filter(|label| !other.contains(label))
                .cloned()
                .collect(),
        )
    }

    fn sorted(&self) -> Vec<&TermLabel> {
        let mut labels: Vec<&TermLabel> = self.0.iter().collect();
        labels.sort();
        labels
    }
}

impl PartialEq for LabelSet {
    fn eq(&self, other: &LabelSet) -> bool {
        self.len() == other.len() && self.iter().all(|label| other.contains(label))
    }
}

impl Eq for LabelSet {}

impl Hash for LabelSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted().hash(state);
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<<")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", label)?;
        }
        write!(f, ">>")
    }
}
