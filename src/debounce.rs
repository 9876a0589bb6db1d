use std::time::{Duration, Instant};

/// Single-shot timer that coalesces bursts: every [`Debouncer::schedule`]
/// replaces the previous arming, so only the latest action ever fires.
///
/// Time is supplied by the caller. The debouncer never sleeps; an event loop
/// waits for [`Debouncer::deadline`] and then calls [`Debouncer::fire`].
#[derive(Debug)]
pub struct Debouncer<A> {
    armed: Option<(Instant, A)>,
}

impl<A> Debouncer<A> {
    pub fn new() -> Self {
        Self { armed: None }
    }

    pub fn schedule(&mut self, action: A, delay: Duration, now: Instant) {
        self.armed = Some((now + delay, action));
    }

    pub fn cancel(&mut self) -> Option<A> {
        self.armed.take().map(|(_, a)| a)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|(at, _)| *at)
    }

    pub fn fire(&mut self, now: Instant) -> Option<A> {
        if self.deadline().is_some_and(|at| now >= at) {
            self.cancel()
        } else {
            None
        }
    }
}

impl<A> Default for Debouncer<A> {
    fn default() -> Self {
        Self::new()
    }
}
