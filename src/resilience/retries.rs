//! Retry and failover orchestration.
//!
//! # Responsibilities
//! - Ask the resolver for a candidate per attempt
//! - Report every attempt's latency and outcome to its backend, exactly once
//! - Classify failures and decide: fast retry, rotate, or give up
//!
//! # State Machine
//! ```text
//! Resolve ──none──▶ Exhausted (last error, or core.io_error)
//!    │
//!    ▼
//! Attempt ──ok──▶ Success
//!    │
//!    ▼ err
//! Classify: internal.* → auto_retry += 1 (reset past cap) → Resolve
//!           core.*     → remember as last error           → Resolve
//!           other      → return the error unchanged
//! ```
//!
//! # Design Decisions
//! - Retries are sequential; there is no backoff or hedging
//! - While fast-retrying a transient fault the attempt index stays 0, so the
//!   rotation budget is only consumed by fresh resolves
//! - Outcome reporting lives in a drop guard so a panicking attempt still counts

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::context::CallContext;
use crate::error::{codes, CallError, ErrorClass};
use crate::http::response::Response;
use crate::load_balancer::{Backend, BackendResolver};

/// Per-call retry bookkeeping.
#[derive(Debug, Default)]
struct RetryState {
    /// Candidate-rotation attempts handed to the resolver so far.
    retry_count: usize,
    /// Consecutive fast retries of a transient fault; never above the cap.
    auto_retry_count: u32,
    /// Code and message of the most recent retryable failure.
    last_error: Option<(String, String)>,
}

impl RetryState {
    fn attempt_index(&mut self) -> usize {
        if self.auto_retry_count > 0 {
            0
        } else {
            let index = self.retry_count;
            self.retry_count += 1;
            index
        }
    }

    fn on_transient(&mut self, err: &CallError, cap: u32) {
        self.auto_retry_count += 1;
        if self.auto_retry_count > cap {
            self.auto_retry_count = 0;
        }
        self.remember(err);
    }

    fn remember(&mut self, err: &CallError) {
        self.last_error = Some((err.code().to_string(), err.message().to_string()));
    }

    fn exhausted(self) -> CallError {
        match self.last_error {
            Some((code, message)) => CallError::new(code, message),
            None => CallError::new(codes::IO_ERROR, ""),
        }
    }
}

/// Reports one attempt to its backend when finished or dropped.
struct AttemptGuard<'a> {
    backend: &'a dyn Backend,
    started: Instant,
    armed: bool,
}

impl<'a> AttemptGuard<'a> {
    fn start(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            started: Instant::now(),
            armed: true,
        }
    }

    fn finish(mut self, is_error: bool) {
        self.armed = false;
        self.backend.count(self.started.elapsed(), is_error);
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.backend.count(self.started.elapsed(), true);
        }
    }
}

/// Drives one logical call across candidate backends.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    resolver: Arc<dyn BackendResolver>,
    auto_retry_cnt: u32,
}

impl Orchestrator {
    pub fn new(resolver: Arc<dyn BackendResolver>, auto_retry_cnt: u32) -> Self {
        Self {
            resolver,
            auto_retry_cnt,
        }
    }

    pub fn resolver(&self) -> &Arc<dyn BackendResolver> {
        &self.resolver
    }

    pub fn auto_retry_cnt(&self) -> u32 {
        self.auto_retry_cnt
    }

    /// Run `attempt` against resolved backends until it succeeds, fails
    /// non-retryably, or the resolver has no candidate left.
    ///
    /// `attempt` receives the absolute URL of the candidate.
    pub fn execute<F>(
        &self,
        path: &str,
        key: &str,
        ctx: &CallContext,
        mut attempt: F,
    ) -> Result<Response, CallError>
    where
        F: FnMut(&str) -> Result<Response, CallError>,
    {
        let span = tracing::debug_span!("call", call_id = %Uuid::new_v4(), %key, %path);
        let _entered = span.enter();

        let mut state = RetryState::default();
        loop {
            let index = state.attempt_index();
            let Some(backend) = self.resolver.resolve(key, ctx, index) else {
                let err = state.exhausted();
                tracing::debug!(attempt = index, code = %err.code(), "No candidate left");
                return Err(err);
            };

            let url = self.resolver.invoke_url(backend.as_ref(), path);
            tracing::debug!(attempt = index, backend = %backend.id(), %url, "Dispatching attempt");

            let guard = AttemptGuard::start(backend.as_ref());
            let outcome = attempt(&url);
            guard.finish(outcome.is_err());

            let err = match outcome {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            match err.class() {
                ErrorClass::Transient => {
                    state.on_transient(&err, self.auto_retry_cnt);
                    if state.auto_retry_count > 0 {
                        tracing::warn!(
                            backend = %backend.id(),
                            code = %err.code(),
                            retry = state.auto_retry_count,
                            "Transient fault, retrying"
                        );
                    } else {
                        tracing::warn!(
                            backend = %backend.id(),
                            code = %err.code(),
                            "Transient retries exhausted, rotating"
                        );
                    }
                }
                ErrorClass::Completed => {
                    tracing::debug!(backend = %backend.id(), code = %err.code(), "Attempt failed, rotating");
                    state.remember(&err);
                }
                ErrorClass::Fatal => {
                    tracing::debug!(backend = %backend.id(), code = %err.code(), "Non-retryable failure");
                    return Err(err);
                }
            }
        }
    }
}
