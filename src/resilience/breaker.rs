//! Circuit breaker
//!
//! Per-target state machine that fails fast once a target accumulates
//! `failure_threshold` consecutive monitored failures. State is keyed by
//! target identifier and guarded by a lock per target, so unrelated
//! targets never contend.

use crate::utils::error::{AiError, AiResult, ErrorKind};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Circuit breaker state for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through; failures are counted
    Closed,
    /// Calls are rejected without invoking the wrapped call
    Open,
    /// One trial call is in flight
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive monitored failures that open the circuit
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before admitting a probe
    pub recovery_timeout: Duration,
    /// Error kinds that count toward the failure threshold
    pub monitored: HashSet<ErrorKind>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            monitored: ErrorKind::default_monitored(),
        }
    }
}

#[derive(Debug)]
struct TargetState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probed_at: Option<Instant>,
}

impl TargetState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            probed_at: None,
        }
    }
}

/// Circuit breaker keyed by target identifier.
///
/// State transitions happen on admission ([`check`](Self::check)) and on
/// outcome recording ([`record_success`](Self::record_success) /
/// [`record_failure`](Self::record_failure)); there is no background
/// timer. A caller that drops its request before an outcome is known
/// simply records nothing, which counts as neither success nor failure;
/// an abandoned half-open probe is replaced after another full recovery
/// timeout so a cancelled probe can never wedge the target.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    targets: RwLock<HashMap<String, Arc<Mutex<TargetState>>>>,
}

impl CircuitBreaker {
    /// Create a breaker with the given configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            targets: RwLock::new(HashMap::new()),
        }
    }

    fn target_state(&self, target: &str) -> Arc<Mutex<TargetState>> {
        if let Some(state) = self
            .targets
            .read()
            .expect("breaker map lock poisoned")
            .get(target)
        {
            return state.clone();
        }
        let mut map = self.targets.write().expect("breaker map lock poisoned");
        map.entry(target.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TargetState::new())))
            .clone()
    }

    /// Admission check. Fails with [`AiError::CircuitOpen`] while the
    /// circuit is open; once `recovery_timeout` has elapsed the next
    /// caller transitions the circuit to half-open and is admitted as the
    /// single probe.
    pub fn check(&self, target: &str) -> AiResult<()> {
        let state = self.target_state(target);
        let mut state = state.lock().expect("breaker state lock poisoned");
        match state.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = state
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.recovery_timeout {
                    state.state = CircuitState::HalfOpen;
                    state.probed_at = Some(Instant::now());
                    debug!(target_id = target, "Circuit half-open, admitting probe");
                    Ok(())
                } else {
                    Err(AiError::CircuitOpen(target.to_string()))
                }
            }
            // The probe admitted at the half-open transition is still in
            // flight; everyone else is rejected. A probe whose caller was
            // cancelled records no outcome, so once a full recovery
            // timeout has passed without one, a fresh probe is admitted.
            CircuitState::HalfOpen => {
                let probe_elapsed = state
                    .probed_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if probe_elapsed >= self.config.recovery_timeout {
                    state.probed_at = Some(Instant::now());
                    debug!(target_id = target, "Probe abandoned, admitting replacement");
                    Ok(())
                } else {
                    Err(AiError::CircuitOpen(target.to_string()))
                }
            }
        }
    }

    /// Record a successful call outcome
    pub fn record_success(&self, target: &str) {
        let state = self.target_state(target);
        let mut state = state.lock().expect("breaker state lock poisoned");
        if state.state == CircuitState::HalfOpen {
            debug!(target_id = target, "Probe succeeded, closing circuit");
        }
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.opened_at = None;
        state.probed_at = None;
    }

    /// Record a failed call outcome. Only monitored kinds count toward the
    /// threshold; other kinds leave breaker state untouched.
    pub fn record_failure(&self, target: &str, kind: ErrorKind) {
        if !self.config.monitored.contains(&kind) {
            return;
        }
        let state = self.target_state(target);
        let mut state = state.lock().expect("breaker state lock poisoned");
        match state.state {
            CircuitState::HalfOpen => {
                // Failed probe: reopen and restart the recovery clock
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
                state.probed_at = None;
                warn!(target_id = target, "Probe failed, reopening circuit");
            }
            CircuitState::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.config.failure_threshold {
                    state.state = CircuitState::Open;
                    state.opened_at = Some(Instant::now());
                    warn!(
                        target_id = target,
                        failures = state.consecutive_failures,
                        "Failure threshold reached, opening circuit"
                    );
                }
            }
            CircuitState::Open => {
                // Late failure from a call admitted before the circuit
                // opened; the clock is already running.
                state.consecutive_failures += 1;
            }
        }
    }

    /// Current state for a target (Closed for unknown targets)
    pub fn state(&self, target: &str) -> CircuitState {
        let state = self.target_state(target);
        let state = state.lock().expect("breaker state lock poisoned");
        state.state
    }
}
