//! Support evaluation: running a candidate spec and reading back every
//! candidate tuple with its co-occurrence count.
//!
//! [`SqlEvaluator`] renders the spec and lets the store do the joins; each
//! accepted level is written back as a temporary table for the next level's
//! antecedent lookups. [`BitmapEvaluator`] interprets the same spec over
//! in-memory bitmaps of movies per actor.

use roaring::RoaringTreemap;
use std::collections::HashMap;
use tracing::debug;

use crate::construct::{Actor, ActorHasher, ActorTuple, Appearance, Candidate, Level, Movie};
use crate::error::{CostarError, Result};
use crate::persist::{atomically, integer_at, Row, StorageSession};
use crate::synthesis::{render, CandidateSpec, RelationNames};
use crate::watchdog::CancelToken;

// larger batches run into the compound select limit of older SQLite builds
const INSERT_BATCH: usize = 250;

pub trait SupportEvaluator {
    /// Every candidate of the spec's level with its support, in tuple order.
    fn evaluate(&mut self, spec: &CandidateSpec) -> Result<Vec<Candidate>>;
    /// Records a pruned level as the antecedent set of the next one.
    fn accept(&mut self, level: &Level) -> Result<()>;
    /// Drops whatever the evaluator keeps on behalf of the run.
    fn release(&mut self) -> Result<()>;
}

// ------------- SQL -------------
pub struct SqlEvaluator<S: StorageSession> {
    session: S,
    names: RelationNames,
    push_down: Option<u64>,
    materialized: Vec<usize>,
}
impl<S: StorageSession> SqlEvaluator<S> {
    /// With `push_down`, the store only returns groups meeting that support.
    pub fn new(session: S, names: RelationNames, push_down: Option<u64>) -> Self {
        Self {
            session,
            names,
            push_down,
            materialized: Vec::new(),
        }
    }
    pub fn materialized(&self) -> &[usize] {
        &self.materialized
    }
    pub fn into_session(self) -> S {
        self.session
    }
    fn candidate_from(level: usize, row: &Row) -> Result<Candidate> {
        if row.len() != level + 1 {
            return Err(CostarError::Storage(format!(
                "level {level} rows need {} columns, got {}",
                level + 1,
                row.len()
            )));
        }
        let mut actors = Vec::with_capacity(level);
        for column in 0..level {
            actors.push(integer_at(row, column)?);
        }
        let tuple = ActorTuple::from_ordered(actors.clone()).ok_or_else(|| {
            CostarError::Invariant(format!("{actors:?} is not in ascending order"))
        })?;
        let support = u64::try_from(integer_at(row, level)?)
            .map_err(|e| CostarError::Invariant(format!("support of {tuple}: {e}")))?;
        Ok(Candidate::new(tuple, support))
    }
}

impl<S: StorageSession> SupportEvaluator for SqlEvaluator<S> {
    fn evaluate(&mut self, spec: &CandidateSpec) -> Result<Vec<Candidate>> {
        for antecedent in spec.antecedents() {
            if !self.materialized.contains(&antecedent.level()) {
                return Err(CostarError::Synthesis(format!(
                    "level {} needs level {}, which has not been materialized",
                    spec.level(),
                    antecedent.level()
                )));
            }
        }
        let sql = render(spec, &self.names, self.push_down);
        let rows = self.session.query(&sql)?;
        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            candidates.push(Self::candidate_from(spec.level(), row)?);
        }
        debug!(level = spec.level(), candidates = candidates.len(), "evaluated");
        Ok(candidates)
    }

    fn accept(&mut self, level: &Level) -> Result<()> {
        let k = level.level();
        let table = self.names.level(k);
        let columns: Vec<String> = (1..=k).map(|i| format!("actor{i}")).collect();
        let stale: Vec<usize> = self
            .materialized
            .iter()
            .copied()
            .filter(|l| *l != k)
            .collect();
        let names = &self.names;
        atomically(&mut self.session, "accept_level", |s| {
            s.execute(&format!("drop table if exists temp.{table}"))?;
            let definitions: Vec<String> = columns
                .iter()
                .map(|c| format!("{c} integer not null"))
                .collect();
            s.execute(&format!(
                "create temp table {table} ({}, support integer not null, primary key ({}))",
                definitions.join(", "),
                columns.join(", ")
            ))?;
            let tuples = level.tuples();
            for batch in tuples.chunks(INSERT_BATCH) {
                let values: Vec<String> = batch
                    .iter()
                    .map(|f| {
                        let mut cells: Vec<String> =
                            f.tuple().actors().iter().map(|a| a.to_string()).collect();
                        cells.push(f.support().to_string());
                        format!("({})", cells.join(", "))
                    })
                    .collect();
                s.execute(&format!(
                    "insert into {table} ({}, support) values {}",
                    columns.join(", "),
                    values.join(", ")
                ))?;
            }
            // only the newest level is ever looked up
            for old in &stale {
                s.execute(&format!("drop table if exists temp.{}", names.level(*old)))?;
            }
            Ok(())
        })?;
        self.materialized = vec![k];
        debug!(table = %table, tuples = level.len(), "level materialized");
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        for level in std::mem::take(&mut self.materialized) {
            self.session
                .execute(&format!("drop table if exists temp.{}", self.names.level(level)))?;
        }
        Ok(())
    }
}

// ------------- Bitmap -------------
// order preserving map of signed ids onto the bitmap's key space
fn bitmap_key(movie: Movie) -> u64 {
    (movie as u64) ^ (1 << 63)
}

pub struct BitmapEvaluator {
    movies: HashMap<Actor, RoaringTreemap, ActorHasher>,
    actors: Vec<Actor>,
    previous: Option<Level>,
    token: CancelToken,
}
impl BitmapEvaluator {
    pub fn new(appearances: &[Appearance], token: CancelToken) -> Self {
        let mut movies: HashMap<Actor, RoaringTreemap, ActorHasher> = HashMap::default();
        for appearance in appearances {
            movies
                .entry(appearance.actor())
                .or_default()
                .insert(bitmap_key(appearance.movie()));
        }
        let mut actors: Vec<Actor> = movies.keys().copied().collect();
        actors.sort_unstable();
        Self {
            movies,
            actors,
            previous: None,
            token,
        }
    }
    fn movies_of(&self, actor: Actor) -> Result<&RoaringTreemap> {
        self.movies
            .get(&actor)
            .ok_or_else(|| CostarError::Invariant(format!("actor {actor} has no appearances")))
    }
    fn satisfies(&self, spec: &CandidateSpec, candidate: &ActorTuple, previous: &Level) -> bool {
        let actors = candidate.actors();
        let ordered = spec
            .orderings()
            .all(|(left, right)| actors[left - 1] < actors[right - 1]);
        ordered
            && spec.antecedents().iter().all(|antecedent| {
                let positions: Vec<usize> = antecedent.projection().iter().map(|p| p - 1).collect();
                candidate
                    .project(&positions)
                    .is_some_and(|projected| previous.contains(&projected))
            })
    }
}

impl SupportEvaluator for BitmapEvaluator {
    fn evaluate(&mut self, spec: &CandidateSpec) -> Result<Vec<Candidate>> {
        let expected = self.previous.as_ref().map_or(1, |l| l.level() + 1);
        if spec.level() != expected {
            return Err(CostarError::Synthesis(format!(
                "expected a spec for level {expected}, got level {}",
                spec.level()
            )));
        }
        if !spec.shares_one_movie() {
            return Err(CostarError::Synthesis(format!(
                "the roles of level {} are not tied to one movie",
                spec.level()
            )));
        }
        let mut candidates = Vec::new();
        let Some(previous) = self.previous.as_ref() else {
            for actor in &self.actors {
                let support = self.movies_of(*actor)?.len();
                candidates.push(Candidate::new(ActorTuple::single(*actor), support));
            }
            return Ok(candidates);
        };
        if spec.prefix_antecedent().is_none() {
            return Err(CostarError::Synthesis(format!(
                "level {} has no prefix antecedent to extend",
                spec.level()
            )));
        }
        if let Some(stray) = spec
            .antecedents()
            .iter()
            .find(|a| a.level() != previous.level())
        {
            return Err(CostarError::Synthesis(format!(
                "antecedent on level {} while level {} is the latest",
                stray.level(),
                previous.level()
            )));
        }
        for frequent in previous {
            if self.token.is_cancelled() {
                return Err(CostarError::Interrupted);
            }
            let prefix = frequent.tuple();
            let mut shared = self.movies_of(prefix.first())?.clone();
            for actor in &prefix.actors()[1..] {
                shared &= self.movies_of(*actor)?;
            }
            if shared.is_empty() {
                continue;
            }
            let start = self.actors.partition_point(|a| *a <= prefix.last());
            for actor in &self.actors[start..] {
                let Some(candidate) = prefix.extend(*actor) else {
                    continue;
                };
                if !self.satisfies(spec, &candidate, previous) {
                    continue;
                }
                let support = (&shared & self.movies_of(*actor)?).len();
                if support > 0 {
                    candidates.push(Candidate::new(candidate, support));
                }
            }
        }
        debug!(level = spec.level(), candidates = candidates.len(), "evaluated in memory");
        Ok(candidates)
    }

    fn accept(&mut self, level: &Level) -> Result<()> {
        self.previous = Some(level.clone());
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.previous = None;
        Ok(())
    }
}
