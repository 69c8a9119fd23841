//! Per-backend circuit breaker.
//!
//! Only counts failures to *reach* a backend. A statement the backend rejected
//! proves it is up and is recorded as reachable. While the breaker is open the
//! executor skips the backend and goes straight to its standby.
//!
//! Closed trips to open once the window holds at least `failure_threshold`
//! unreachable outcomes and they make up `error_rate_threshold` of it. After
//! `reset_timeout`, calls go through again (half-open): `success_threshold`
//! answered calls close the breaker, one unreachable call reopens it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::models::CircuitBreakerSettings;

#[cfg(feature = "telemetry")]
use opentelemetry::{global, metrics::Counter, KeyValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub backend: String,
    pub failure_threshold: usize,
    pub success_threshold: usize,
    pub reset_timeout: Duration,
    pub error_rate_threshold: f64,
    pub window: Duration,
}

impl BreakerConfig {
    pub fn from_settings(backend: &str, settings: &CircuitBreakerSettings) -> Self {
        Self {
            backend: backend.to_string(),
            failure_threshold: settings.failure_threshold.max(1),
            success_threshold: settings.success_threshold.max(1),
            reset_timeout: Duration::from_secs(settings.reset_timeout_secs),
            error_rate_threshold: settings.error_rate_threshold,
            window: Duration::from_secs(settings.window_secs),
        }
    }
}

#[derive(Debug)]
enum Phase {
    /// Recent `(when, reached)` outcomes, oldest first.
    Closed { outcomes: VecDeque<(Instant, bool)> },
    Open { since: Instant },
    HalfOpen { answered: usize },
}

impl Phase {
    fn closed() -> Self {
        Phase::Closed {
            outcomes: VecDeque::new(),
        }
    }

    fn open() -> Self {
        Phase::Open {
            since: Instant::now(),
        }
    }

    fn state(&self) -> CircuitState {
        match self {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
pub struct BackendBreaker {
    config: BreakerConfig,
    phase: Mutex<Phase>,
    #[cfg(feature = "telemetry")]
    transitions: Counter<u64>,
}

impl BackendBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            phase: Mutex::new(Phase::closed()),
            #[cfg(feature = "telemetry")]
            transitions: global::meter("shardgate-circuit-breaker")
                .u64_counter("shardgate_breaker_transitions_total")
                .with_description("Backend circuit breaker state changes")
                .build(),
        }
    }

    pub fn backend(&self) -> &str {
        &self.config.backend
    }

    pub async fn state(&self) -> CircuitState {
        let mut phase = self.phase.lock().await;
        self.expire_open(&mut phase);
        phase.state()
    }

    /// False while open; half-open lets calls through to test the backend.
    pub async fn allows_request(&self) -> bool {
        self.state().await != CircuitState::Open
    }

    /// The backend answered, with rows or with a statement error.
    pub async fn record_reachable(&self) {
        let mut phase = self.phase.lock().await;
        self.expire_open(&mut phase);

        let next = match &mut *phase {
            Phase::Closed { outcomes } => {
                self.push(outcomes, true);
                None
            }
            Phase::HalfOpen { answered } => {
                *answered += 1;
                (*answered >= self.config.success_threshold).then(Phase::closed)
            }
            Phase::Open { .. } => None,
        };
        if let Some(next) = next {
            self.enter(&mut phase, next);
        }
    }

    /// The backend could not be reached at all.
    pub async fn record_unreachable(&self) {
        let mut phase = self.phase.lock().await;
        self.expire_open(&mut phase);

        let next = match &mut *phase {
            Phase::Closed { outcomes } => {
                self.push(outcomes, false);
                self.should_open(outcomes).then(Phase::open)
            }
            Phase::HalfOpen { .. } => Some(Phase::open()),
            Phase::Open { .. } => None,
        };
        if let Some(next) = next {
            self.enter(&mut phase, next);
        }
    }

    fn expire_open(&self, phase: &mut Phase) {
        if let Phase::Open { since } = phase {
            if since.elapsed() >= self.config.reset_timeout {
                self.enter(phase, Phase::HalfOpen { answered: 0 });
            }
        }
    }

    fn push(&self, outcomes: &mut VecDeque<(Instant, bool)>, reached: bool) {
        let now = Instant::now();
        outcomes.push_back((now, reached));
        while outcomes
            .front()
            .is_some_and(|(at, _)| now.duration_since(*at) > self.config.window)
        {
            outcomes.pop_front();
        }
        // Bursts inside one window.
        let cap = self.config.failure_threshold * 100;
        if outcomes.len() > cap {
            outcomes.drain(..outcomes.len() - cap);
        }
    }

    fn should_open(&self, outcomes: &VecDeque<(Instant, bool)>) -> bool {
        let unreachable = outcomes.iter().filter(|(_, reached)| !reached).count();
        unreachable >= self.config.failure_threshold
            && unreachable as f64 / outcomes.len() as f64 >= self.config.error_rate_threshold
    }

    fn enter(&self, phase: &mut Phase, next: Phase) {
        let (from, to) = (phase.state(), next.state());

        #[cfg(feature = "telemetry")]
        self.transitions.add(
            1,
            &[
                KeyValue::new("backend", self.config.backend.clone()),
                KeyValue::new("from", from.to_string()),
                KeyValue::new("to", to.to_string()),
            ],
        );

        tracing::warn!(backend = %self.config.backend, %from, %to, "Circuit breaker transition");
        *phase = next;
    }
}
