//! Named in-memory tables flowing through the quality engine.

use polars::prelude::*;

/// A named, ordered table. The name is the dataset identity used in every report.
#[derive(Debug, Clone)]
pub struct RowSet {
    name: String,
    frame: DataFrame,
}

impl RowSet {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut DataFrame {
        &mut self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.frame.get_column_names().iter().any(|c| *c == column)
    }

    /// Replace the frame wholesale, e.g. after a filter.
    pub fn replace_frame(&mut self, frame: DataFrame) {
        self.frame = frame;
    }
}

/// Every RowSet of one run, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    sets: Vec<RowSet>,
}

impl Datasets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the RowSet with the same name.
    pub fn insert(&mut self, set: RowSet) {
        match self.sets.iter_mut().find(|s| s.name == set.name) {
            Some(existing) => *existing = set,
            None => self.sets.push(set),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RowSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RowSet> {
        self.sets.iter_mut().find(|s| s.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<RowSet> {
        let idx = self.sets.iter().position(|s| s.name == name)?;
        Some(self.sets.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowSet> {
        self.sets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RowSet> {
        self.sets.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl From<RowSet> for Datasets {
    fn from(set: RowSet) -> Self {
        Self { sets: vec![set] }
    }
}

impl FromIterator<RowSet> for Datasets {
    fn from_iter<I: IntoIterator<Item = RowSet>>(iter: I) -> Self {
        let mut datasets = Datasets::new();
        for set in iter {
            datasets.insert(set);
        }
        datasets
    }
}
