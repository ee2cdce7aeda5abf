//! Round-robin candidate selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Round-robin selector.
/// Stores an internal counter to rotate through backends.
///
/// Every selection advances the counter, so successive attempts of one call
/// land on successive backends as long as calls do not interleave.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a backend for the given attempt index.
    ///
    /// Returns `None` once `attempt` reaches the number of backends, which
    /// bounds how many candidates one call rotates through.
    pub fn next_server<B>(&self, backends: &[Arc<B>], attempt: usize) -> Option<Arc<B>> {
        if attempt >= backends.len() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % backends.len();
        Some(backends[index].clone())
    }
}
