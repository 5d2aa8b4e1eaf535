//! Trace Cache
//!
//! Set of traces currently in use, flushed as a whole by staggered timers.
//!
//! ```text
//! register #1  → timer @ +1×delay
//! register #2  → timer @ +1×delay
//! register #3  → timer @ +2×delay
//! register #4  → timer @ +3×delay      ... up to max_timers
//!
//! first timer due → every trace AND every timer dropped at once
//! ```
//!
//! Timers are deadlines checked on every access, under the same lock as
//! the set itself, so no reader ever sees a partial flush.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::{TingeConfig, DEFAULT_MAX_TIMERS};

#[derive(Debug, Default)]
struct CacheState {
    traces: HashSet<String>,
    timers: Vec<Instant>,
}

impl CacheState {
    /// Fire the earliest timer if it is due
    fn sweep(&mut self, now: Instant) {
        let due = self.timers.iter().any(|deadline| *deadline <= now);
        if due {
            tracing::debug!(
                traces = self.traces.len(),
                timers = self.timers.len(),
                "flushing trace cache"
            );
            self.traces.clear();
            self.timers.clear();
        }
    }
}

/// In-flight traces with staggered whole-cache expiry
#[derive(Debug)]
pub struct TraceCache {
    state: Mutex<CacheState>,
    flush_delay: Duration,
    max_timers: usize,
}

impl TraceCache {
    /// Create an empty cache
    pub fn new(flush_delay: Duration, max_timers: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            flush_delay,
            max_timers,
        }
    }

    /// Create a cache from the timer settings of a config
    pub fn from_config(config: &TingeConfig) -> Self {
        Self::new(config.flush_delay, config.max_timers)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic elsewhere cannot leave the set half-flushed, so a
        // poisoned lock is still consistent.
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sweep(Instant::now());
        state
    }

    /// Mark a trace as in use
    ///
    /// Returns `false` if it already was. Each new trace schedules another
    /// flush timer until `max_timers` are pending; the n-th pending timer
    /// waits `n × flush_delay` (the first one waits `flush_delay`).
    pub fn register(&self, trace: &str) -> bool {
        let mut state = self.lock();

        if state.traces.contains(trace) {
            return false;
        }
        state.traces.insert(trace.to_string());

        if state.timers.len() < self.max_timers {
            let factor = state.timers.len().max(1) as u32;
            let deadline = Instant::now() + self.flush_delay * factor;
            state.timers.push(deadline);
        }

        true
    }

    /// Is the trace currently in use?
    pub fn contains(&self, trace: &str) -> bool {
        self.lock().traces.contains(trace)
    }

    /// Drop every trace and every pending timer now
    pub fn flush(&self) {
        let mut state = self.lock();
        state.traces.clear();
        state.timers.clear();
    }

    /// Traces currently held
    pub fn len(&self) -> usize {
        self.lock().traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush timers currently pending
    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }

    #[cfg(test)]
    fn deadlines(&self) -> Vec<Instant> {
        self.lock().timers.clone()
    }
}

impl Default for TraceCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), DEFAULT_MAX_TIMERS)
    }
}
