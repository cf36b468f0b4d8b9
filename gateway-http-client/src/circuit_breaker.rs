//! Circuit breaker over a sliding window of call outcomes.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, requests are allowed.
    Closed,
    /// Circuit is open, requests are rejected.
    Open,
    /// Circuit is half-open, a bounded number of probes are allowed.
    HalfOpen,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failure ratio in the window at which the circuit opens, in (0, 1].
    pub failure_ratio_threshold: f64,
    /// Number of most recent outcomes kept in the window.
    pub window_size: usize,
    /// Outcomes required in the window before the ratio is evaluated.
    pub minimum_samples: usize,
    /// Time to stay open before admitting probes.
    pub open_state_duration: Duration,
    /// Number of probe requests admitted in half-open state.
    pub half_open_probe_count: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_ratio_threshold: 0.5,
            window_size: 20,
            minimum_samples: 10,
            open_state_duration: Duration::from_secs(5),
            half_open_probe_count: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new circuit breaker config.
    pub fn new(failure_ratio_threshold: f64, open_state_duration: Duration) -> Self {
        Self {
            failure_ratio_threshold,
            open_state_duration,
            ..Default::default()
        }
    }

    /// Set the rolling window size.
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Set the minimum number of samples before the circuit may open.
    pub fn with_minimum_samples(mut self, samples: usize) -> Self {
        self.minimum_samples = samples;
        self
    }

    /// Set the number of half-open probes.
    pub fn with_half_open_probe_count(mut self, count: u32) -> Self {
        self.half_open_probe_count = count;
        self
    }

    /// Set the open-state cool-down.
    pub fn with_open_state_duration(mut self, duration: Duration) -> Self {
        self.open_state_duration = duration;
        self
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    /// Current state.
    pub state: CircuitState,
    /// Successes currently in the window.
    pub successes: usize,
    /// Failures currently in the window.
    pub failures: usize,
    /// Calls rejected while open, since creation.
    pub short_circuited: u64,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    /// Bumped on every state transition; permits from an older generation
    /// no longer affect the breaker.
    generation: u64,
    /// `true` marks a failure.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    probes_admitted: u32,
    probe_successes: u32,
    short_circuited: u64,
}

/// Circuit breaker for one downstream service.
///
/// All state sits behind one lock so readers always see a consistent view.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

/// Admission for one call, obtained from [`CircuitBreaker::try_acquire`].
///
/// The call's outcome is reported by consuming the permit. Outcomes are
/// only counted while the breaker is still in the state that issued the
/// permit. Dropping a half-open probe's permit without an outcome reopens
/// the circuit; dropping any other permit records nothing.
#[derive(Debug)]
#[must_use = "report the call outcome with `success` or `failure`"]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    probe: bool,
    settled: bool,
}

impl BreakerPermit<'_> {
    /// Whether this call is a half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    /// Report a successful call.
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record(self.generation, self.probe, false);
    }

    /// Report a failed call.
    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record(self.generation, self.probe, true);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.abandon_probe(self.generation);
        }
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let window = VecDeque::with_capacity(config.window_size);
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                window,
                opened_at: None,
                probes_admitted: 0,
                probe_successes: 0,
                short_circuited: 0,
            }),
        }
    }

    /// Name of the protected service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the current circuit state.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.maybe_transition_to_half_open(&mut inner);
        inner.state
    }

    /// Consistent view of state and counters.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.inner.lock();
        self.maybe_transition_to_half_open(&mut inner);
        let failures = inner.window.iter().filter(|failed| **failed).count();
        BreakerSnapshot {
            state: inner.state,
            successes: inner.window.len() - failures,
            failures,
            short_circuited: inner.short_circuited,
        }
    }

    /// Ask permission for one call.
    ///
    /// Returns `None` (and counts a short-circuit) when the call must not
    /// be attempted.
    pub fn try_acquire(&self) -> Option<BreakerPermit<'_>> {
        let mut inner = self.inner.lock();
        self.maybe_transition_to_half_open(&mut inner);

        let probe = match inner.state {
            CircuitState::Closed => Some(false),
            CircuitState::Open => None,
            CircuitState::HalfOpen => {
                if inner.probes_admitted < self.config.half_open_probe_count {
                    inner.probes_admitted += 1;
                    debug!(service = %self.name, probe = inner.probes_admitted, "Admitting half-open probe");
                    Some(true)
                } else {
                    None
                }
            }
        };

        match probe {
            Some(probe) => Some(BreakerPermit {
                breaker: self,
                generation: inner.generation,
                probe,
                settled: false,
            }),
            None => {
                inner.short_circuited += 1;
                debug!(service = %self.name, "Call short-circuited by open breaker");
                None
            }
        }
    }

    /// Reset the circuit breaker to closed state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        self.close(&mut inner);
    }

    fn record(&self, generation: u64, probe: bool, failed: bool) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(service = %self.name, failed, "Ignoring outcome of a call admitted before the last transition");
            return;
        }

        match (inner.state, probe) {
            (CircuitState::Closed, false) => {
                self.push_outcome(&mut inner, failed);
                if failed && self.should_trip(&inner) {
                    self.open(&mut inner);
                }
            }
            // Any failed probe reopens the circuit and restarts the cool-down.
            (CircuitState::HalfOpen, true) if failed => self.open(&mut inner),
            (CircuitState::HalfOpen, true) => {
                inner.probe_successes += 1;
                if inner.probe_successes >= self.config.half_open_probe_count {
                    self.close(&mut inner);
                }
            }
            _ => {}
        }
    }

    fn abandon_probe(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            debug!(service = %self.name, "Half-open probe abandoned without outcome");
            self.open(&mut inner);
        }
    }

    fn push_outcome(&self, inner: &mut Inner, failed: bool) {
        if inner.window.len() >= self.config.window_size.max(1) {
            inner.window.pop_front();
        }
        inner.window.push_back(failed);
    }

    fn should_trip(&self, inner: &Inner) -> bool {
        let samples = inner.window.len();
        if samples == 0 || samples < self.config.minimum_samples {
            return false;
        }
        let failures = inner.window.iter().filter(|failed| **failed).count();
        failures as f64 / samples as f64 >= self.config.failure_ratio_threshold
    }

    fn open(&self, inner: &mut Inner) {
        warn!(
            service = %self.name,
            previous = ?inner.state,
            cool_down_ms = self.config.open_state_duration.as_millis() as u64,
            "Circuit breaker opening"
        );
        inner.state = CircuitState::Open;
        inner.generation += 1;
        inner.opened_at = Some(Instant::now());
        inner.probes_admitted = 0;
        inner.probe_successes = 0;
    }

    fn close(&self, inner: &mut Inner) {
        if inner.state != CircuitState::Closed {
            info!(service = %self.name, "Circuit breaker closing");
        }
        inner.state = CircuitState::Closed;
        inner.generation += 1;
        inner.opened_at = None;
        inner.window.clear();
        inner.probes_admitted = 0;
        inner.probe_successes = 0;
    }

    /// Transition to half-open if the cool-down has elapsed.
    fn maybe_transition_to_half_open(&self, inner: &mut Inner) {
        if inner.state != CircuitState::Open {
            return;
        }

        if let Some(opened) = inner.opened_at
            && opened.elapsed() >= self.config.open_state_duration
        {
            debug!(service = %self.name, "Circuit breaker transitioning to half-open");
            inner.state = CircuitState::HalfOpen;
            inner.generation += 1;
            inner.probes_admitted = 0;
            inner.probe_successes = 0;
        }
    }
}
