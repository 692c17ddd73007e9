use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use costar::config::{AntecedentCheck, EvaluatorKind, Settings};
use costar::construct::Appearance;
use costar::evaluate::{BitmapEvaluator, SupportEvaluator};
use costar::persist::SqliteSession;
use costar::run::run;
use costar::synthesis::Synthesizer;
use costar::watchdog::CancelToken;
use rusqlite::{params, Connection};

// ------------- Dataset -------------
// xorshift, so every run mines the same cast lists
fn next(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn appearances(actors: i64, movies: i64) -> Vec<(i64, i64)> {
    let mut state = 0x2545_f491_4f6c_dd1d;
    let mut cast = Vec::new();
    for movie in 1..=movies {
        for actor in 1..=actors {
            // a small ensemble that works together, everybody else now and then
            let chance = if actor <= 6 { 60 } else { 8 };
            if next(&mut state) % 100 < chance {
                cast.push((actor, movie));
            }
        }
    }
    cast
}

fn session(actors: i64, movies: i64) -> SqliteSession {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "create table movie (id integer primary key, type text, avgrating real);
         create table member (id integer primary key, name text);
         create table movie_actor (actor integer, movie integer);",
    )
    .unwrap();
    let tx = conn.transaction().unwrap();
    for movie in 1..=movies {
        tx.execute(
            "insert into movie (id, type, avgrating) values (?, 'movie', 7.0)",
            params![movie],
        )
        .unwrap();
    }
    for actor in 1..=actors {
        tx.execute(
            "insert into member (id, name) values (?, ?)",
            params![actor, format!("actor {actor}")],
        )
        .unwrap();
    }
    for (actor, movie) in appearances(actors, movies) {
        tx.execute(
            "insert into movie_actor (actor, movie) values (?, ?)",
            params![actor, movie],
        )
        .unwrap();
    }
    tx.commit().unwrap();
    SqliteSession::new(conn)
}

fn settings(evaluator: EvaluatorKind, antecedents: AntecedentCheck) -> Settings {
    let mut settings = Settings::default();
    settings.mining.min_support = 20;
    settings.mining.evaluator = evaluator;
    settings.mining.antecedents = antecedents;
    settings
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut sql = session(200, 400);
    let mut bitmap = session(200, 400);
    let prefix_suffix = settings(EvaluatorKind::Sql, AntecedentCheck::PrefixSuffix);
    let all_subsets = settings(EvaluatorKind::Sql, AntecedentCheck::AllSubsets);
    let in_memory = settings(EvaluatorKind::Bitmap, AntecedentCheck::PrefixSuffix);
    println!("{}", run(&mut sql, &prefix_suffix).unwrap());

    c.bench_function("mine sql prefix_suffix", |b| {
        b.iter(|| run(&mut sql, black_box(&prefix_suffix)).unwrap())
    });
    c.bench_function("mine sql all_subsets", |b| {
        b.iter(|| run(&mut sql, black_box(&all_subsets)).unwrap())
    });
    c.bench_function("mine bitmap", |b| {
        b.iter(|| run(&mut bitmap, black_box(&in_memory)).unwrap())
    });

    let cast: Vec<Appearance> = appearances(200, 400)
        .into_iter()
        .map(|(actor, movie)| Appearance::new(actor, movie))
        .collect();
    let level_one = Synthesizer::new(AntecedentCheck::PrefixSuffix)
        .synthesize(1)
        .unwrap();
    c.bench_function("bitmap level 1", |b| {
        b.iter(|| {
            let mut evaluator = BitmapEvaluator::new(black_box(&cast), CancelToken::new());
            evaluator.evaluate(&level_one).unwrap()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
