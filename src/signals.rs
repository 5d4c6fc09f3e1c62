// Lifecycle signal bus for the story container.
// Signals fire once and never un-fire; waiters block on a condvar.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    Built,
    LoadStart,
    LoadEnd,
    Unload,
}

pub struct Signals {
    fired: Mutex<HashSet<Signal>>,
    condvar: Condvar,
}

impl Signals {
    pub fn new() -> Self {
        Signals {
            fired: Mutex::new(HashSet::new()),
            condvar: Condvar::new(),
        }
    }

    /// Mark a signal as fired. Idempotent; the first firing wins.
    pub fn signal(&self, signal: Signal) {
        let mut fired = self.fired.lock().unwrap();
        if fired.insert(signal) {
            log::debug!("[Signals] {:?} fired", signal);
            self.condvar.notify_all();
        }
    }

    pub fn has_signaled(&self, signal: Signal) -> bool {
        self.fired.lock().unwrap().contains(&signal)
    }

    /// Block until the signal fires or the timeout elapses.
    /// Returns true if the signal fired.
    pub fn wait_for(&self, signal: Signal, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut fired = self.fired.lock().unwrap();

        while !fired.contains(&signal) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _result) = self
                .condvar
                .wait_timeout(fired, deadline - now)
                .unwrap();
            fired = guard;
        }
        true
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self::new()
    }
}
