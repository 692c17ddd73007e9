use std::time::Duration;
use tracing::{debug, info, warn};

use crate::construct::Level;
use crate::error::{CostarError, Result};
use crate::evaluate::SupportEvaluator;
use crate::prune::LevelPruner;
use crate::synthesis::Synthesizer;
use crate::watchdog::Watchdog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerState {
    /// The next level to evaluate.
    Level(usize),
    Done,
    /// A level failed; nothing the miner holds may be used as a result.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSummary {
    pub level: usize,
    pub candidates: usize,
    pub frequent: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct MiningOutcome {
    /// The last non-empty level, if level 1 had any frequent actor at all.
    pub result: Option<Level>,
    pub levels: Vec<LevelSummary>,
}
impl MiningOutcome {
    pub fn final_level(&self) -> Option<usize> {
        self.result.as_ref().map(|l| l.level())
    }
}

/// Drives the level-wise search: synthesize, evaluate and prune level k,
/// then move to k + 1 until a level comes back empty.
pub struct LatticeMiner<E: SupportEvaluator> {
    synthesizer: Synthesizer,
    evaluator: E,
    pruner: LevelPruner,
    watchdog: Watchdog,
    state: MinerState,
    last_frequent: Option<Level>,
    summaries: Vec<LevelSummary>,
}
impl<E: SupportEvaluator> LatticeMiner<E> {
    pub fn new(synthesizer: Synthesizer, evaluator: E, pruner: LevelPruner) -> Self {
        Self {
            synthesizer,
            evaluator,
            pruner,
            watchdog: Watchdog::unlimited(),
            state: MinerState::Level(1),
            last_frequent: None,
            summaries: Vec::new(),
        }
    }
    pub fn with_watchdog(mut self, watchdog: Watchdog) -> Self {
        self.watchdog = watchdog;
        self
    }
    pub fn state(&self) -> MinerState {
        self.state
    }
    pub fn summaries(&self) -> &[LevelSummary] {
        &self.summaries
    }
    pub fn last_frequent(&self) -> Option<&Level> {
        self.last_frequent.as_ref()
    }
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Evaluates the current level. Returns it when it has frequent tuples,
    /// `None` once the search is over.
    pub fn advance(&mut self) -> Result<Option<&Level>> {
        let k = match self.state {
            MinerState::Level(k) => k,
            MinerState::Done => return Ok(None),
            MinerState::Aborted => {
                return Err(CostarError::Invariant(
                    "the search was aborted and cannot continue".into(),
                ));
            }
        };
        let guard = self.watchdog.arm(k);
        let outcome = self.mine_level(k);
        let elapsed = guard.elapsed();
        let expired = guard.expired();
        drop(guard);
        let (candidates, level) = match outcome {
            _ if expired => {
                self.state = MinerState::Aborted;
                let limit_ms = self.watchdog.limit().map_or(0, |l| l.as_millis());
                return Err(CostarError::Timeout { level: k, limit_ms });
            }
            Err(e) => {
                self.state = MinerState::Aborted;
                return Err(e);
            }
            Ok(mined) => mined,
        };
        info!(
            level = k,
            candidates,
            frequent = level.len(),
            ms = elapsed.as_secs_f64() * 1000.0,
            "level complete"
        );
        self.summaries.push(LevelSummary {
            level: k,
            candidates,
            frequent: level.len(),
            elapsed,
        });
        if level.is_empty() {
            self.state = MinerState::Done;
            return Ok(None);
        }
        self.state = MinerState::Level(k + 1);
        self.last_frequent = Some(level);
        Ok(self.last_frequent.as_ref())
    }

    fn mine_level(&mut self, k: usize) -> Result<(usize, Level)> {
        let spec = self.synthesizer.synthesize(k)?;
        debug!(%spec, "synthesized");
        let candidates = self.evaluator.evaluate(&spec)?;
        let evaluated = candidates.len();
        let level = self.pruner.prune_level(k, candidates)?;
        if !level.is_empty() {
            self.evaluator.accept(&level)?;
        }
        Ok((evaluated, level))
    }

    /// Runs every remaining level and releases the evaluator.
    pub fn run(mut self) -> Result<MiningOutcome> {
        let searched = loop {
            match self.advance() {
                Ok(Some(_)) => continue,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        match searched {
            Ok(()) => {
                self.evaluator.release()?;
                Ok(MiningOutcome {
                    result: self.last_frequent,
                    levels: self.summaries,
                })
            }
            Err(e) => {
                if let Err(cleanup) = self.evaluator.release() {
                    warn!(error = %cleanup, "could not release evaluator state");
                }
                Err(e)
            }
        }
    }
}
