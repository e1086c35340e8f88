use crate::resilience::events::{ResilienceEvent, ResilienceEvents};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BreakerError {
    #[error("circuit for '{dependency}' is open, not attempting call")]
    Open { dependency: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone, Copy, Debug)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before allowing one trial.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Breaker {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// A half-open circuit admits exactly one in-flight trial call.
    trial_in_flight: bool,
}

impl Breaker {
    const fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
        }
    }
}

/// Registry of circuit breakers, keyed by dependency name.
///
/// State is process-wide and shared by every worker calling a dependency; it
/// rebuilds as `Closed` on restart. All transitions happen under one mutex so
/// concurrent workers observe and trip the breaker consistently.
pub struct BreakerRegistry {
    config: BreakerConfig,
    events: ResilienceEvents,
    breakers: Mutex<HashMap<String, Breaker>>,
}

impl BreakerRegistry {
    #[must_use]
    pub fn new(config: BreakerConfig, events: ResilienceEvents) -> Self {
        Self {
            config,
            events,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether a call to `dependency` may proceed.
    ///
    /// While open, calls are rejected until `reset_timeout` has elapsed, at
    /// which point the breaker moves to half-open and admits a single trial.
    /// The caller must report the outcome through [`Self::record_success`] or
    /// [`Self::record_failure`].
    ///
    /// # Errors
    ///
    /// Returns [`BreakerError::Open`] when the circuit is rejecting calls.
    pub fn try_acquire(&self, dependency: &str) -> Result<(), BreakerError> {
        let mut breakers = self.breakers.lock().expect("breaker mutex poisoned");
        let breaker = breakers
            .entry(dependency.to_owned())
            .or_insert_with(Breaker::new);

        match breaker.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let elapsed = breaker
                    .opened_at
                    .map_or(Duration::ZERO, |opened_at| opened_at.elapsed());
                if elapsed >= self.config.reset_timeout {
                    info!("Circuit for '{}' moving to half-open.", dependency);
                    breaker.state = BreakerState::HalfOpen;
                    breaker.trial_in_flight = true;
                    Ok(())
                } else {
                    Err(BreakerError::Open {
                        dependency: dependency.to_owned(),
                    })
                }
            }
            BreakerState::HalfOpen => {
                if breaker.trial_in_flight {
                    Err(BreakerError::Open {
                        dependency: dependency.to_owned(),
                    })
                } else {
                    breaker.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Records a successful call, closing the circuit if it was half-open.
    pub fn record_success(&self, dependency: &str) {
        let mut breakers = self.breakers.lock().expect("breaker mutex poisoned");
        let breaker = breakers
            .entry(dependency.to_owned())
            .or_insert_with(Breaker::new);

        match breaker.state {
            BreakerState::Closed => breaker.consecutive_failures = 0,
            BreakerState::HalfOpen => {
                info!("Circuit for '{}' closed after trial success.", dependency);
                breaker.state = BreakerState::Closed;
                breaker.consecutive_failures = 0;
                breaker.opened_at = None;
                breaker.trial_in_flight = false;
                self.events.publish(ResilienceEvent::BreakerClosed {
                    dependency: dependency.to_owned(),
                });
            }
            BreakerState::Open => {}
        }
    }

    /// Records a failed call, opening the circuit when the threshold is hit
    /// or a half-open trial fails.
    pub fn record_failure(&self, dependency: &str) {
        let mut breakers = self.breakers.lock().expect("breaker mutex poisoned");
        let breaker = breakers
            .entry(dependency.to_owned())
            .or_insert_with(Breaker::new);

        match breaker.state {
            BreakerState::Closed => {
                breaker.consecutive_failures += 1;
                if breaker.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        "Circuit for '{}' opened after {} consecutive failures.",
                        dependency, breaker.consecutive_failures
                    );
                    breaker.state = BreakerState::Open;
                    breaker.opened_at = Some(Instant::now());
                    self.events.publish(ResilienceEvent::BreakerOpened {
                        dependency: dependency.to_owned(),
                    });
                }
            }
            BreakerState::HalfOpen => {
                warn!("Circuit for '{}' re-opened after trial failure.", dependency);
                breaker.state = BreakerState::Open;
                breaker.opened_at = Some(Instant::now());
                breaker.trial_in_flight = false;
                self.events.publish(ResilienceEvent::BreakerOpened {
                    dependency: dependency.to_owned(),
                });
            }
            BreakerState::Open => {}
        }
    }

    #[must_use]
    pub fn state(&self, dependency: &str) -> BreakerState {
        let breakers = self.breakers.lock().expect("breaker mutex poisoned");
        breakers
            .get(dependency)
            .map_or(BreakerState::Closed, |b| b.state)
    }
}
