use crate::model::ModelId;
use std::collections::BTreeSet;

static EMPTY: ModelSet = ModelSet(BTreeSet::new());

/// Ordered set of model identities an expression reads from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSet(BTreeSet<ModelId>);

impl ModelSet {
    /// The shared empty set. Every caller gets the same instance.
    pub fn empty() -> &'static ModelSet {
        &EMPTY
    }

    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn single(model: ModelId) -> Self {
        Self(BTreeSet::from([model]))
    }

    pub fn insert(&mut self, model: ModelId) -> bool {
        self.0.insert(model)
    }

    pub fn union(&self, other: &ModelSet) -> ModelSet {
        Self(self.0.union(&other.0).copied().collect())
    }

    pub fn contains(&self, model: ModelId) -> bool {
        self.0.contains(&model)
    }

    pub fn is_subset(&self, other: &ModelSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<ModelId> for ModelSet {
    fn from_iter<I: IntoIterator<Item = ModelId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a ModelSet> for ModelSet {
    fn from_iter<I: IntoIterator<Item = &'a ModelSet>>(iter: I) -> Self {
        Self(iter.into_iter().flat_map(|set| set.0.iter().copied()).collect())
    }
}
