//! Per-level time limits.
//!
//! Levels are evaluated on the calling thread. When a limit is configured, a
//! watchdog thread is armed for the duration of each level; if the level
//! outlives it, the watchdog raises the shared cancellation flag (observed by
//! in-memory evaluation) and interrupts the statement running in the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::persist::Interrupt;

/// Cancellation flag shared with whoever does the work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct Watchdog {
    limit: Option<Duration>,
    token: CancelToken,
    interrupter: Option<Arc<dyn Interrupt>>,
}
impl Watchdog {
    pub fn new(limit: Option<Duration>, interrupter: Option<Arc<dyn Interrupt>>) -> Self {
        Self {
            limit,
            token: CancelToken::new(),
            interrupter,
        }
    }
    pub fn unlimited() -> Self {
        Self::new(None, None)
    }
    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
    /// Starts timing a level; the limit applies until the guard is dropped.
    pub fn arm(&self, level: usize) -> LevelGuard {
        let started = Instant::now();
        let Some(limit) = self.limit else {
            return LevelGuard {
                started,
                token: self.token.clone(),
                stop: None,
                join: None,
            };
        };
        let token = self.token.clone();
        let interrupter = self.interrupter.clone();
        if limit.is_zero() {
            expire(level, limit, &token, interrupter.as_deref());
            return LevelGuard {
                started,
                token,
                stop: None,
                join: None,
            };
        }
        let (tx, rx) = mpsc::channel::<()>();
        let token_for_thread = token.clone();
        let join = std::thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(limit) {
                expire(level, limit, &token_for_thread, interrupter.as_deref());
            }
        });
        LevelGuard {
            started,
            token,
            stop: Some(tx),
            join: Some(join),
        }
    }
}

fn expire(level: usize, limit: Duration, token: &CancelToken, interrupter: Option<&dyn Interrupt>) {
    warn!(level, limit_ms = limit.as_millis() as u64, "level exceeded its time limit");
    token.cancel();
    if let Some(interrupter) = interrupter {
        interrupter.interrupt();
    }
}

pub struct LevelGuard {
    started: Instant,
    token: CancelToken,
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}
impl LevelGuard {
    pub fn expired(&self) -> bool {
        self.token.is_cancelled()
    }
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
impl Drop for LevelGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
