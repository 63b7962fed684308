//! Thread coordination primitives for the render loop
//!
//! The render loop rendezvous points (frame prepared/done, suspend, reset)
//! use auto-reset event semantics: a signal wakes exactly one waiter and is
//! consumed by the wakeup, but a signal sent with no waiter present is
//! latched until the next wait. The suspend handshake additionally needs a
//! counting semaphore.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if a panicking thread poisoned it.
///
/// The scheduler's shared state stays structurally consistent under its
/// locks (every critical section restores invariants before unlocking), so
/// a poisoned lock is treated as still usable rather than a second panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One-shot-per-wait wakeup flag.
///
/// `signal` latches the event and wakes one waiter; `wait` blocks until the
/// event is latched and consumes it. Multiple signals without an
/// intervening wait collapse into one.
pub struct AutoResetEvent {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl AutoResetEvent {
    /// Creates the event in the non-signaled state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Latches the event and wakes one waiting thread, if any.
    pub fn signal(&self) {
        let mut signaled = lock(&self.signaled);
        *signaled = true;
        self.condvar.notify_one();
    }

    /// Blocks until the event is signaled, then resets it.
    pub fn wait(&self) {
        let mut signaled = lock(&self.signaled);
        while !*signaled {
            signaled = self
                .condvar
                .wait(signaled)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *signaled = false;
    }
}

impl Default for AutoResetEvent {
    fn default() -> Self {
        Self::new()
    }
}

/// Counting semaphore built on a mutex/condvar pair.
pub struct Semaphore {
    permits: Mutex<u32>,
    condvar: Condvar,
}

impl Semaphore {
    /// Creates a semaphore with zero permits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            permits: Mutex::new(0),
            condvar: Condvar::new(),
        }
    }

    /// Adds one permit and wakes one waiter.
    pub fn post(&self) {
        let mut permits = lock(&self.permits);
        *permits += 1;
        self.condvar.notify_one();
    }

    /// Blocks until a permit is available and takes it.
    pub fn wait(&self) {
        let mut permits = lock(&self.permits);
        while *permits == 0 {
            permits = self
                .condvar
                .wait(permits)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *permits -= 1;
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_event_signal_before_wait_is_latched() {
        let event = AutoResetEvent::new();
        event.signal();
        event.wait(); // must not block
    }

    #[test]
    fn test_event_wakes_cross_thread() {
        let event = Arc::new(AutoResetEvent::new());
        let waiter = {
            let event = Arc::clone(&event);
            thread::spawn(move || event.wait())
        };
        event.signal();
        waiter.join().unwrap();
    }

    #[test]
    fn test_event_auto_resets() {
        let event = Arc::new(AutoResetEvent::new());
        event.signal();
        event.signal(); // collapses into the latched signal
        event.wait();

        // A second wait must block again until a fresh signal arrives.
        let waiter = {
            let event = Arc::clone(&event);
            thread::spawn(move || event.wait())
        };
        event.signal();
        waiter.join().unwrap();
    }

    #[test]
    fn test_semaphore_counts_permits() {
        let semaphore = Semaphore::new();
        semaphore.post();
        semaphore.post();
        semaphore.wait();
        semaphore.wait(); // both permits available without blocking
    }

    #[test]
    fn test_semaphore_blocks_until_post() {
        let semaphore = Arc::new(Semaphore::new());
        let waiter = {
            let semaphore = Arc::clone(&semaphore);
            thread::spawn(move || semaphore.wait())
        };
        semaphore.post();
        waiter.join().unwrap();
    }
}
