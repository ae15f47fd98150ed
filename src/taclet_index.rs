use std::sync::Arc;

use crate::kernel::instantiations::SvInstantiations;
use crate::kernel::name::Name;
use crate::kernel::term::Term;
use crate::taclet::{Taclet, TacletKind};
use crate::taclet_app::{root_may_match, NoPosTacletApp};

/// The taclets available in a goal, by name.
///
/// Goals on different branches get their own copies. The persistent map makes copying
/// cheap, and a taclet added on one branch is invisible on the others.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TacletIndex {
    apps: im::OrdMap<Name, NoPosTacletApp>,
}

impl TacletIndex {
    pub fn new() -> TacletIndex {
        TacletIndex::default()
    }

    pub fn from_taclets(taclets: impl IntoIterator<Item = Arc<Taclet>>) -> TacletIndex {
        let mut index = TacletIndex::new();
        for taclet in taclets {
            index.add(NoPosTacletApp::new(taclet));
        }
        index
    }

    /// Adds the application, replacing any with the same taclet name.
    pub fn add(&mut self, app: NoPosTacletApp) {
        self.apps.insert(app.taclet.name.clone(), app);
    }

    pub fn get(&self, name: &Name) -> Option<&NoPosTacletApp> {
        self.apps.get(name)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// All entries, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &NoPosTacletApp> {
        self.apps.values()
    }

    /// The entries whose find pattern could match the term, judged by root operator.
    pub fn candidates<'a>(&'a self, term: &'a Term) -> impl Iterator<Item = &'a NoPosTacletApp> {
        self.apps.values().filter(move |app| match app.taclet.find() {
            Some(find) => root_may_match(find.op(), term.op()),
            None => false,
        })
    }

    /// The entries for taclets without find.
    pub fn no_find(&self) -> impl Iterator<Item = &NoPosTacletApp> {
        self.apps
            .values()
            .filter(|app| matches!(app.taclet.kind, TacletKind::NoFind))
    }

    /// Rebuilds the index with the instantiations of every entry passed through f,
    /// where f returns a change.
    pub fn map_instantiations(
        &self,
        f: &dyn Fn(&SvInstantiations) -> Option<SvInstantiations>,
    ) -> TacletIndex {
        let mut answer = self.clone();
        for (name, app) in self.apps.iter() {
            if let Some(insts) = f(&app.instantiations) {
                answer.apps.insert(
                    name.clone(),
                    NoPosTacletApp::with_instantiations(app.taclet.clone(), insts),
                );
            }
        }
        answer
    }
}
