//! Candidate synthesis: the constraint set that enumerates level k of the
//! lattice, and the one place it is turned into SQL.
//!
//! A level-k candidate is described by k *roles*, each a copy of the
//! qualifying appearance relation standing for one tuple position. The roles
//! are tied together by three kinds of predicates:
//!
//! * a co-occurrence chain `r1.movie = r2.movie = ... = rk.movie`,
//! * the canonical ordering `ri.actor < rj.actor` for every `i < j`,
//! * membership of (k-1)-projections in the previous frequent level, which is
//!   what keeps the search from degenerating into a k-way cross product.
//!
//! Everything here is a pure function of the level and the antecedent policy,
//! so the same request always yields the same spec.

use std::fmt;

use crate::config::AntecedentCheck;
use crate::error::{CostarError, Result};

pub const DEFAULT_BASE_RELATION: &str = "qualifying_appearance";
pub const DEFAULT_LEVEL_PREFIX: &str = "lattice_level_";

/// One tuple position, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Role {
    position: usize,
}
impl Role {
    pub fn new(position: usize) -> Self {
        Self { position }
    }
    pub fn position(&self) -> usize {
        self.position
    }
    pub fn alias(&self) -> String {
        format!("r{}", self.position)
    }
}

/// A lookup into the frequent set of `level`, matched against the roles in
/// `projection` (ascending role positions).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Antecedent {
    level: usize,
    projection: Vec<usize>,
}
impl Antecedent {
    pub fn level(&self) -> usize {
        self.level
    }
    pub fn projection(&self) -> &[usize] {
        &self.projection
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// Both roles reference the same movie.
    SameMovie { left: usize, right: usize },
    /// The actor in `left` sorts strictly before the actor in `right`.
    ActorBefore { left: usize, right: usize },
    /// Column `slot` (from 1) of antecedent number `antecedent` is the actor
    /// in `role`.
    Member {
        antecedent: usize,
        slot: usize,
        role: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateSpec {
    level: usize,
    roles: Vec<Role>,
    antecedents: Vec<Antecedent>,
    predicates: Vec<Predicate>,
    group_by: Vec<usize>,
}
impl CandidateSpec {
    pub fn level(&self) -> usize {
        self.level
    }
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
    pub fn antecedents(&self) -> &[Antecedent] {
        &self.antecedents
    }
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
    pub fn group_by(&self) -> &[usize] {
        &self.group_by
    }
    pub fn co_occurrences(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.predicates.iter().filter_map(|p| match p {
            Predicate::SameMovie { left, right } => Some((*left, *right)),
            _ => None,
        })
    }
    pub fn orderings(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.predicates.iter().filter_map(|p| match p {
            Predicate::ActorBefore { left, right } => Some((*left, *right)),
            _ => None,
        })
    }
    pub fn memberships(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.predicates.iter().filter_map(|p| match p {
            Predicate::Member {
                antecedent,
                slot,
                role,
            } => Some((*antecedent, *slot, *role)),
            _ => None,
        })
    }
    /// Index of the antecedent covering roles `1..k`, if there is one.
    pub fn prefix_antecedent(&self) -> Option<usize> {
        let prefix: Vec<usize> = (1..self.level).collect();
        self.antecedents
            .iter()
            .position(|a| a.projection == prefix)
    }
    /// True when the co-occurrence predicates tie every role to the same movie.
    pub fn shares_one_movie(&self) -> bool {
        // union-find over role positions
        let mut parent: Vec<usize> = (0..=self.level).collect();
        fn root(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }
        for (left, right) in self.co_occurrences() {
            if left == 0 || right == 0 || left > self.level || right > self.level {
                return false;
            }
            let (l, r) = (root(&mut parent, left), root(&mut parent, right));
            parent[l] = r;
        }
        let first = root(&mut parent, 1);
        (2..=self.level).all(|p| root(&mut parent, p) == first)
    }
}
impl fmt::Display for CandidateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level {}: {} roles, {} co-occurrence, {} ordering, {} antecedent lookups",
            self.level,
            self.roles.len(),
            self.co_occurrences().count(),
            self.orderings().count(),
            self.antecedents.len()
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Synthesizer {
    antecedents: AntecedentCheck,
}
impl Synthesizer {
    pub fn new(antecedents: AntecedentCheck) -> Self {
        Self { antecedents }
    }
    pub fn antecedent_check(&self) -> AntecedentCheck {
        self.antecedents
    }
    pub fn synthesize(&self, level: usize) -> Result<CandidateSpec> {
        if level == 0 {
            return Err(CostarError::Synthesis(
                "the lattice starts at level 1, level 0 has no candidates".into(),
            ));
        }
        let roles: Vec<Role> = (1..=level).map(Role::new).collect();
        let mut predicates = Vec::new();
        // the chain form is enough for equality
        for i in 1..level {
            predicates.push(Predicate::SameMovie {
                left: i,
                right: i + 1,
            });
        }
        // adjacent pairs alone are not enforced by the antecedent joins, so all pairs
        for i in 1..level {
            for j in (i + 1)..=level {
                predicates.push(Predicate::ActorBefore { left: i, right: j });
            }
        }
        let mut antecedents = Vec::new();
        if level >= 2 {
            let projections: Vec<Vec<usize>> = match self.antecedents {
                AntecedentCheck::PrefixSuffix => {
                    vec![(1..level).collect(), (2..=level).collect()]
                }
                AntecedentCheck::AllSubsets => (1..=level)
                    .rev()
                    .map(|omitted| (1..=level).filter(|p| *p != omitted).collect())
                    .collect(),
            };
            for (index, projection) in projections.into_iter().enumerate() {
                for (slot, role) in projection.iter().enumerate() {
                    predicates.push(Predicate::Member {
                        antecedent: index,
                        slot: slot + 1,
                        role: *role,
                    });
                }
                antecedents.push(Antecedent {
                    level: level - 1,
                    projection,
                });
            }
        }
        Ok(CandidateSpec {
            level,
            roles,
            antecedents,
            predicates,
            group_by: (1..=level).collect(),
        })
    }
}

/// Names of the session-scoped relations the rendered queries read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationNames {
    pub base: String,
    pub level_prefix: String,
}
impl Default for RelationNames {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_RELATION.into(),
            level_prefix: DEFAULT_LEVEL_PREFIX.into(),
        }
    }
}
impl RelationNames {
    pub fn level(&self, level: usize) -> String {
        format!("{}{}", self.level_prefix, level)
    }
}

/// Renders a spec as a single select statement. With `min_support` the
/// threshold is also applied by the store, as a `having` clause.
pub fn render(spec: &CandidateSpec, names: &RelationNames, min_support: Option<u64>) -> String {
    let support = "count(distinct r1.movie)";
    let mut projections: Vec<String> = spec
        .roles()
        .iter()
        .map(|r| format!("{}.actor as actor{}", r.alias(), r.position()))
        .collect();
    projections.push(format!("{support} as support"));

    let mut relations: Vec<String> = spec
        .roles()
        .iter()
        .map(|r| format!("{} {}", names.base, r.alias()))
        .collect();
    for (index, antecedent) in spec.antecedents().iter().enumerate() {
        relations.push(format!("{} a{}", names.level(antecedent.level()), index + 1));
    }

    let conditions: Vec<String> = spec
        .predicates()
        .iter()
        .map(|p| match p {
            Predicate::SameMovie { left, right } => format!("r{left}.movie = r{right}.movie"),
            Predicate::ActorBefore { left, right } => format!("r{left}.actor < r{right}.actor"),
            Predicate::Member {
                antecedent,
                slot,
                role,
            } => format!("a{}.actor{slot} = r{role}.actor", antecedent + 1),
        })
        .collect();

    let grouping: Vec<String> = spec
        .group_by()
        .iter()
        .map(|p| format!("r{p}.actor"))
        .collect();
    let ordering: Vec<String> = spec.group_by().iter().map(|p| format!("actor{p}")).collect();

    let mut sql = format!(
        "select {}\nfrom {}",
        projections.join(", "),
        relations.join(", ")
    );
    if !conditions.is_empty() {
        sql.push_str(&format!("\nwhere {}", conditions.join(" and ")));
    }
    sql.push_str(&format!("\ngroup by {}", grouping.join(", ")));
    if let Some(threshold) = min_support {
        sql.push_str(&format!("\nhaving {support} >= {threshold}"));
    }
    sql.push_str(&format!("\norder by {}", ordering.join(", ")));
    sql
}
