use crate::construct::{Candidate, FrequentTuple, Level};
use crate::error::Result;

/// Keeps the candidates whose support reaches `min_support`.
pub fn prune(candidates: Vec<Candidate>, min_support: u64) -> Vec<FrequentTuple> {
    candidates
        .into_iter()
        .filter(|c| c.support() >= min_support)
        .map(|c| FrequentTuple::new(c.tuple().clone(), c.support()))
        .collect()
}

pub struct LevelPruner {
    min_support: u64,
}
impl LevelPruner {
    pub fn new(min_support: u64) -> Self {
        Self { min_support }
    }
    pub fn min_support(&self) -> u64 {
        self.min_support
    }
    /// Prunes and keeps the survivors as a level, ordered by tuple.
    pub fn prune_level(&self, level: usize, candidates: Vec<Candidate>) -> Result<Level> {
        let mut frequent = prune(candidates, self.min_support);
        frequent.sort_by(|a, b| a.tuple().cmp(b.tuple()));
        let mut kept = Level::new(level);
        for tuple in frequent {
            kept.keep(tuple)?;
        }
        Ok(kept)
    }
}
