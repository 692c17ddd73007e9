// frequent levels are looked up by tuple, so they use a fast hasher
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

// tuples are shared between a level and the candidates derived from it
use std::sync::Arc;

// used to print out readable forms of a construct
use std::fmt;

use crate::error::{CostarError, Result};

// ------------- Actor & Movie -------------
pub type Actor = i64;
pub type Movie = i64;

pub type TupleHasher = BuildHasherDefault<SeaHasher>;
pub type ActorHasher = BuildHasherDefault<SeaHasher>;

// ------------- Appearance -------------
/// One row of the qualifying appearance relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Appearance {
    actor: Actor,
    movie: Movie,
}
impl Appearance {
    pub fn new(actor: Actor, movie: Movie) -> Self {
        Self { actor, movie }
    }
    pub fn actor(&self) -> Actor {
        self.actor
    }
    pub fn movie(&self) -> Movie {
        self.movie
    }
}

// ------------- ActorTuple -------------
/// A duplicate-free set of actors kept in strictly ascending order.
///
/// The ordering is what keeps `(1, 2)` and `(2, 1)` from both being
/// enumerated, so every constructor either establishes it or rejects input
/// that breaks it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorTuple {
    actors: Arc<[Actor]>,
}
impl ActorTuple {
    /// Sorts the actors; `None` if the input is empty or repeats an actor.
    pub fn new(mut actors: Vec<Actor>) -> Option<Self> {
        actors.sort_unstable();
        Self::from_ordered(actors)
    }
    /// Accepts the actors as given; `None` unless they strictly increase.
    pub fn from_ordered(actors: Vec<Actor>) -> Option<Self> {
        if actors.is_empty() || actors.windows(2).any(|x| x[0] >= x[1]) {
            return None;
        }
        Some(Self {
            actors: Arc::from(actors),
        })
    }
    pub fn single(actor: Actor) -> Self {
        Self {
            actors: Arc::from(vec![actor]),
        }
    }
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }
    pub fn len(&self) -> usize {
        self.actors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
    pub fn first(&self) -> Actor {
        self.actors[0]
    }
    pub fn last(&self) -> Actor {
        self.actors[self.actors.len() - 1]
    }
    pub fn contains(&self, actor: Actor) -> bool {
        self.actors.binary_search(&actor).is_ok()
    }
    /// The tuple without its last actor.
    pub fn prefix(&self) -> Option<ActorTuple> {
        self.without(self.len() - 1)
    }
    /// The tuple without its first actor.
    pub fn suffix(&self) -> Option<ActorTuple> {
        self.without(0)
    }
    /// The tuple with the actor at `position` (zero based) projected out.
    pub fn without(&self, position: usize) -> Option<ActorTuple> {
        if self.len() < 2 || position >= self.len() {
            return None;
        }
        let rest: Vec<Actor> = self
            .actors
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, a)| *a)
            .collect();
        Some(Self {
            actors: Arc::from(rest),
        })
    }
    /// Picks the actors at the given zero based positions.
    pub fn project(&self, positions: &[usize]) -> Option<ActorTuple> {
        let mut picked = Vec::with_capacity(positions.len());
        for position in positions {
            picked.push(*self.actors.get(*position)?);
        }
        Self::from_ordered(picked)
    }
    /// Appends an actor that sorts after every actor already present.
    pub fn extend(&self, actor: Actor) -> Option<ActorTuple> {
        if actor <= self.last() {
            return None;
        }
        let mut actors = self.actors.to_vec();
        actors.push(actor);
        Some(Self {
            actors: Arc::from(actors),
        })
    }
}
impl fmt::Display for ActorTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actors: Vec<String> = self.actors.iter().map(|a| a.to_string()).collect();
        write!(f, "({})", actors.join(", "))
    }
}

// ------------- Candidate -------------
/// A tuple produced by evaluating a level, before pruning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    tuple: ActorTuple,
    support: u64,
}
impl Candidate {
    pub fn new(tuple: ActorTuple, support: u64) -> Self {
        Self { tuple, support }
    }
    pub fn tuple(&self) -> &ActorTuple {
        &self.tuple
    }
    pub fn support(&self) -> u64 {
        self.support
    }
}

// ------------- FrequentTuple -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrequentTuple {
    tuple: ActorTuple,
    support: u64,
}
impl FrequentTuple {
    pub fn new(tuple: ActorTuple, support: u64) -> Self {
        Self { tuple, support }
    }
    pub fn tuple(&self) -> &ActorTuple {
        &self.tuple
    }
    pub fn support(&self) -> u64 {
        self.support
    }
}
impl fmt::Display for FrequentTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tuple, self.support)
    }
}

// ------------- Level -------------
/// Keeps the frequent tuples of one lattice level, with lookup by tuple.
#[derive(Debug, Clone)]
pub struct Level {
    level: usize,
    kept: Vec<FrequentTuple>,
    lookup: HashMap<ActorTuple, u64, TupleHasher>,
}
impl Level {
    pub fn new(level: usize) -> Self {
        Self {
            level,
            kept: Vec::new(),
            lookup: HashMap::default(),
        }
    }
    /// Returns true if the tuple was previously kept.
    pub fn keep(&mut self, frequent: FrequentTuple) -> Result<bool> {
        if frequent.tuple().len() != self.level {
            return Err(CostarError::Invariant(format!(
                "tuple {} does not belong on level {}",
                frequent.tuple(),
                self.level
            )));
        }
        match self.lookup.entry(frequent.tuple().clone()) {
            Entry::Occupied(_) => Ok(true),
            Entry::Vacant(e) => {
                e.insert(frequent.support());
                self.kept.push(frequent);
                Ok(false)
            }
        }
    }
    pub fn level(&self) -> usize {
        self.level
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
    pub fn contains(&self, tuple: &ActorTuple) -> bool {
        self.lookup.contains_key(tuple)
    }
    pub fn support_of(&self, tuple: &ActorTuple) -> Option<u64> {
        self.lookup.get(tuple).copied()
    }
    pub fn tuples(&self) -> &[FrequentTuple] {
        &self.kept
    }
    pub fn iter(&self) -> std::slice::Iter<'_, FrequentTuple> {
        self.kept.iter()
    }
}
impl<'a> IntoIterator for &'a Level {
    type Item = &'a FrequentTuple;
    type IntoIter = std::slice::Iter<'a, FrequentTuple>;
    fn into_iter(self) -> Self::IntoIter {
        self.kept.iter()
    }
}
