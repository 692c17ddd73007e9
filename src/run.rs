use chrono::{DateTime, Utc};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::base::{BaseRelation, BaseRelationBuilder, MovieFilter};
use crate::config::{EvaluatorKind, Settings};
use crate::error::Result;
use crate::evaluate::{BitmapEvaluator, SqlEvaluator, SupportEvaluator};
use crate::miner::{LatticeMiner, LevelSummary, MiningOutcome};
use crate::persist::StorageSession;
use crate::prune::LevelPruner;
use crate::report::{ResolvedTuple, ResultReporter};
use crate::synthesis::{RelationNames, Synthesizer};
use crate::watchdog::Watchdog;

#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub base_rows: usize,
    pub base_elapsed: Duration,
    pub levels: Vec<LevelSummary>,
    pub final_level: Option<usize>,
    pub result: Vec<ResolvedTuple>,
    pub total_elapsed: Duration,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mining run started {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "Total number of rows in the base relation: {}", self.base_rows)?;
        writeln!(f, "--- {:.3} seconds for the base relation ---", self.base_elapsed.as_secs_f64())?;
        for level in &self.levels {
            writeln!(
                f,
                "Total number of rows in level {}: {} of {} candidates",
                level.level, level.frequent, level.candidates
            )?;
            writeln!(f, "--- {:.3} seconds for level {} ---", level.elapsed.as_secs_f64(), level.level)?;
        }
        match self.final_level {
            Some(level) => {
                writeln!(f, "Final level with frequent tuples is level {level}. Its actors are:")?;
                for tuple in &self.result {
                    writeln!(f, "{tuple}")?;
                }
            }
            None => writeln!(f, "No actor reaches the minimum support, the result is empty.")?,
        }
        write!(f, "--- {:.3} seconds in total ---", self.total_elapsed.as_secs_f64())
    }
}

/// Builds the base relation, mines every level and names the actors of the
/// last frequent one.
pub fn run<S: StorageSession>(session: &mut S, settings: &Settings) -> Result<RunReport> {
    let started_at = Utc::now();
    let started = Instant::now();
    let names = RelationNames::default();

    let base = BaseRelationBuilder::new(
        &settings.schema,
        MovieFilter::from(&settings.mining),
        &names,
    )
    .build(session)?;
    let base_elapsed = started.elapsed();

    let outcome = match mine(session, settings, &names, &base) {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Err(cleanup) = base.release(session) {
                warn!(error = %cleanup, "could not drop the base relation");
            }
            return Err(e);
        }
    };
    let result = match &outcome.result {
        Some(level) => ResultReporter::new(&settings.schema).resolve(session, level)?,
        None => Vec::new(),
    };
    base.release(session)?;

    let report = RunReport {
        started_at,
        base_rows: base.rows(),
        base_elapsed,
        final_level: outcome.final_level(),
        levels: outcome.levels,
        result,
        total_elapsed: started.elapsed(),
    };
    info!(final_level = ?report.final_level, tuples = report.result.len(), "run complete");
    Ok(report)
}

fn mine<S: StorageSession>(
    session: &mut S,
    settings: &Settings,
    names: &RelationNames,
    base: &BaseRelation,
) -> Result<MiningOutcome> {
    let mining = &settings.mining;
    let synthesizer = Synthesizer::new(mining.antecedents);
    let pruner = LevelPruner::new(mining.min_support);
    let watchdog = Watchdog::new(mining.level_timeout(), session.interrupter());
    match mining.evaluator {
        EvaluatorKind::Sql => {
            let push_down = mining.push_down_support.then_some(mining.min_support);
            let evaluator = SqlEvaluator::new(&mut *session, names.clone(), push_down);
            mine_with(synthesizer, evaluator, pruner, watchdog)
        }
        EvaluatorKind::Bitmap => {
            let appearances = base.fetch(session)?;
            let evaluator = BitmapEvaluator::new(&appearances, watchdog.token());
            mine_with(synthesizer, evaluator, pruner, watchdog)
        }
    }
}

fn mine_with<E: SupportEvaluator>(
    synthesizer: Synthesizer,
    evaluator: E,
    pruner: LevelPruner,
    watchdog: Watchdog,
) -> Result<MiningOutcome> {
    LatticeMiner::new(synthesizer, evaluator, pruner)
        .with_watchdog(watchdog)
        .run()
}
