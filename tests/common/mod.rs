#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use costar::config::{AntecedentCheck, EvaluatorKind, Settings};
use costar::persist::SqliteSession;
use rusqlite::{params, Connection};

pub const A: i64 = 1;
pub const B: i64 = 2;
pub const C: i64 = 3;
pub const D: i64 = 4;

pub fn connection(
    movies: &[(i64, &str, f64)],
    members: &[(i64, &str)],
    appearances: &[(i64, i64)],
) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "create table movie (id integer primary key, type text, avgrating real);
         create table member (id integer primary key, name text);
         create table movie_actor (actor integer, movie integer);",
    )
    .unwrap();
    for (id, kind, rating) in movies {
        conn.execute(
            "insert into movie (id, type, avgrating) values (?, ?, ?)",
            params![id, kind, rating],
        )
        .unwrap();
    }
    for (id, name) in members {
        conn.execute(
            "insert into member (id, name) values (?, ?)",
            params![id, name],
        )
        .unwrap();
    }
    for (actor, movie) in appearances {
        conn.execute(
            "insert into movie_actor (actor, movie) values (?, ?)",
            params![actor, movie],
        )
        .unwrap();
    }
    conn
}

/// Five good movies starring A, B and C. D only shows up in a TV series and
/// in a badly rated movie.
pub fn scenario() -> SqliteSession {
    let mut movies: Vec<(i64, &str, f64)> = (101..=105).map(|m| (m, "movie", 7.5)).collect();
    movies.push((201, "tvSeries", 9.0));
    movies.push((202, "movie", 5.0));
    let mut appearances = Vec::new();
    for movie in 101..=105 {
        for actor in [A, B, C] {
            appearances.push((actor, movie));
        }
    }
    appearances.push((D, 201));
    appearances.push((D, 202));
    appearances.push((A, 202));
    // a second credit in the same movie must not count twice
    appearances.push((A, 101));
    let members = [(A, "Alice"), (B, "Bob"), (C, "Carol"), (D, "Dave")];
    SqliteSession::new(connection(&movies, &members, &appearances))
}

pub fn settings(min_support: u64, evaluator: EvaluatorKind, antecedents: AntecedentCheck) -> Settings {
    let mut settings = Settings::default();
    settings.mining.min_support = min_support;
    settings.mining.evaluator = evaluator;
    settings.mining.antecedents = antecedents;
    settings
}

pub fn every_setup() -> Vec<(EvaluatorKind, AntecedentCheck, bool)> {
    let mut setups = Vec::new();
    for evaluator in [EvaluatorKind::Sql, EvaluatorKind::Bitmap] {
        for antecedents in [AntecedentCheck::PrefixSuffix, AntecedentCheck::AllSubsets] {
            for push_down in [true, false] {
                setups.push((evaluator, antecedents, push_down));
            }
        }
    }
    setups
}

/// Deterministic pseudo-random numbers (Knuth's MMIX LCG).
pub struct Lcg(u64);
impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }
    pub fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
    pub fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

/// A random cast list: `actors` actors spread over `movies` good movies, with
/// a few bad ones mixed in.
pub fn random_dataset(
    seed: u64,
    actors: i64,
    movies: i64,
) -> (Vec<(i64, &'static str, f64)>, Vec<(i64, i64)>) {
    let mut rng = Lcg::new(seed);
    let mut catalog = Vec::new();
    let mut appearances = Vec::new();
    for movie in 1..=movies {
        let (kind, rating) = match rng.below(10) {
            0 => ("short", 8.0),
            1 => ("movie", 4.0),
            _ => ("movie", 6.0 + rng.below(4) as f64),
        };
        catalog.push((movie, kind, rating));
        // a core of low numbered actors shows up together more often
        for actor in 1..=actors {
            let chance = if actor <= 4 { 7 } else { 3 };
            if rng.below(10) < chance {
                appearances.push((actor, movie));
            }
        }
    }
    (catalog, appearances)
}

/// All frequent actor sets by level, found by trying every subset.
pub fn brute_force(
    movies: &[(i64, &str, f64)],
    appearances: &[(i64, i64)],
    min_support: u64,
) -> Vec<BTreeMap<Vec<i64>, u64>> {
    let good: BTreeSet<i64> = movies
        .iter()
        .filter(|(_, kind, rating)| kind.eq_ignore_ascii_case("movie") && *rating > 5.0)
        .map(|(id, _, _)| *id)
        .collect();
    let mut casts: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for (actor, movie) in appearances {
        if good.contains(movie) {
            casts.entry(*movie).or_default().insert(*actor);
        }
    }
    let actors: Vec<i64> = casts
        .values()
        .flat_map(|cast| cast.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    assert!(actors.len() <= 16, "brute force is exponential");
    let mut levels: Vec<BTreeMap<Vec<i64>, u64>> = Vec::new();
    for mask in 1u32..(1 << actors.len()) {
        let group: Vec<i64> = (0..actors.len())
            .filter(|i| mask & (1 << i) != 0)
            .map(|i| actors[i])
            .collect();
        let support = casts
            .values()
            .filter(|cast| group.iter().all(|a| cast.contains(a)))
            .count() as u64;
        if support >= min_support {
            while levels.len() < group.len() {
                levels.push(BTreeMap::new());
            }
            levels[group.len() - 1].insert(group, support);
        }
    }
    while levels.last().is_some_and(|l| l.is_empty()) {
        levels.pop();
    }
    levels
}
