//! Costar – level-wise mining of actors who keep appearing together.
//!
//! Given a relational dataset of movies, people and the appearances linking
//! them, costar finds the largest groups of actors that co-appear in at least
//! `min_support` well-rated movies. The search walks the lattice of actor
//! sets one level at a time, Apriori style:
//!
//! * Level 1 holds every actor with enough qualifying movies.
//! * Level k is only ever generated from frequent tuples of level k-1, since a
//!   group cannot be frequent unless its sub-groups are.
//! * The search stops at the first level with no frequent tuple; the level
//!   before it is the result.
//!
//! Tuples are always kept in strictly ascending actor order (see
//! [`construct::ActorTuple`]), which is what makes every group appear exactly
//! once no matter how many roles a candidate query has.
//!
//! ## Modules
//! * [`construct`] – Actors, tuples, candidates and the [`construct::Level`] keeper.
//! * [`base`] – Derives the qualifying appearances (movie type and rating filter).
//! * [`synthesis`] – The structured constraint set for level k and its SQL rendering.
//! * [`evaluate`] – Support evaluation, in the store or over in-memory bitmaps.
//! * [`prune`] – The minimum support filter.
//! * [`miner`] – The level-wise state machine.
//! * [`report`] – Resolves the actors of the final level to names.
//! * [`persist`] – The storage session seam and its SQLite implementation.
//! * [`config`] – Layered settings.
//! * [`watchdog`] – Per-level time limits.
//! * [`run`] – Ties the stages together into one run.
//!
//! ## Quick Start
//! ```
//! use rusqlite::Connection;
//! use costar::{config::Settings, persist::SqliteSession, run::run};
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch(
//!     "create table movie (id integer primary key, type text, avgrating real);
//!      create table member (id integer primary key, name text);
//!      create table movie_actor (actor integer, movie integer);",
//! ).unwrap();
//! let mut session = SqliteSession::new(conn);
//! let report = run(&mut session, &Settings::default()).unwrap();
//! assert_eq!(report.final_level, None);
//! ```

pub mod base;
pub mod config;
pub mod construct;
pub mod error;
pub mod evaluate;
pub mod miner;
pub mod persist;
pub mod prune;
pub mod report;
pub mod run;
pub mod synthesis;
pub mod watchdog;

pub use error::{CostarError, Result};
