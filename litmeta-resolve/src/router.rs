//! Quota-aware router for generative fallback providers
//!
//! One [`QuotaRouter`] is shared (behind `Arc`) by every concurrent resolution
//! so that a cooldown or a dead provider observed for one record is honored for
//! all of them immediately.
//!
//! # State machine
//! ```text
//! AVAILABLE ──rate limited──▶ COOLING_DOWN(until) ──expiry──▶ AVAILABLE
//!     │                             │
//!     └──────unauthorized───────────┴──────────▶ DEAD (terminal)
//! ```
//! Cooldown expiry is purely time-based; nothing resets it explicitly.

use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default base cooldown after a rate-limited outcome
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Maximum extra cooldown, as a fraction of the base duration
const MAX_JITTER: f64 = 0.25;

/// Outcome signal reported by a provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    /// 401/403-class policy violation
    Unauthorized,
    /// 429/503-class quota or availability signal
    RateLimited,
    /// Any other failure (transport error, unparseable reply, other status)
    Failed,
    /// Provider has no credentials; no request was sent
    NotConfigured,
}

impl CallOutcome {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => CallOutcome::Unauthorized,
            429 | 503 => CallOutcome::RateLimited,
            200..=299 => CallOutcome::Success,
            _ => CallOutcome::Failed,
        }
    }
}

/// Current availability of one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    CoolingDown(Instant),
    Dead,
}

#[derive(Debug, Default, Clone)]
struct ProviderState {
    cooldown_until: Option<Instant>,
    dead: bool,
}

impl ProviderState {
    fn availability(&self, now: Instant) -> Availability {
        if self.dead {
            return Availability::Dead;
        }
        match self.cooldown_until {
            Some(until) if until > now => Availability::CoolingDown(until),
            _ => Availability::Available,
        }
    }
}

/// Shared per-provider availability tracker
#[derive(Debug)]
pub struct QuotaRouter {
    states: Mutex<HashMap<String, ProviderState>>,
    base_cooldown: Duration,
}

impl QuotaRouter {
    pub fn new() -> Self {
        Self::with_cooldown(DEFAULT_COOLDOWN)
    }

    pub fn with_cooldown(base_cooldown: Duration) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            base_cooldown,
        }
    }

    pub fn base_cooldown(&self) -> Duration {
        self.base_cooldown
    }

    /// Availability of a provider right now
    pub fn availability(&self, provider: &str) -> Availability {
        let now = Instant::now();
        self.lock()
            .get(provider)
            .map(|state| state.availability(now))
            .unwrap_or(Availability::Available)
    }

    pub fn is_available(&self, provider: &str) -> bool {
        self.availability(provider) == Availability::Available
    }

    /// Invoke `f` for `provider` if it is available
    ///
    /// Returns `None` without invoking `f` while the provider is cooling down or
    /// dead. Otherwise the outcome signal drives the state machine and, unless it
    /// was a policy or quota signal, `f`'s result is returned unchanged.
    ///
    /// Availability is checked only before `f` runs. Callers that pass the
    /// check concurrently may all reach the provider before the first
    /// rate-limit signal is recorded; later calls see the cooldown.
    pub async fn call<T, F, Fut>(&self, provider: &str, f: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = (Option<T>, CallOutcome)>,
    {
        match self.availability(provider) {
            Availability::Available => {}
            Availability::CoolingDown(until) => {
                debug!(
                    provider = provider,
                    remaining_ms = until.saturating_duration_since(Instant::now()).as_millis() as u64,
                    "Provider cooling down, skipping"
                );
                return None;
            }
            Availability::Dead => {
                debug!(provider = provider, "Provider disabled, skipping");
                return None;
            }
        }

        // Lock is not held across the call
        let (result, outcome) = f().await;

        match outcome {
            CallOutcome::Unauthorized => {
                self.mark_dead(provider);
                None
            }
            CallOutcome::RateLimited => {
                self.start_cooldown(provider);
                None
            }
            // A cooldown started by another caller meanwhile stays in force
            CallOutcome::Success | CallOutcome::Failed | CallOutcome::NotConfigured => result,
        }
    }

    /// Permanently disable a provider
    pub fn mark_dead(&self, provider: &str) {
        let mut states = self.lock();
        let state = states.entry(provider.to_string()).or_default();
        if !state.dead {
            warn!(provider = provider, "Provider rejected credentials, disabling for this session");
        }
        state.dead = true;
        state.cooldown_until = None;
    }

    /// Suspend a provider for the base cooldown plus up to 25% jitter
    pub fn start_cooldown(&self, provider: &str) {
        let jitter = rand::thread_rng().gen_range(0.0..=MAX_JITTER);
        let duration = self.base_cooldown.mul_f64(1.0 + jitter);

        let mut states = self.lock();
        let state = states.entry(provider.to_string()).or_default();
        if state.dead {
            return;
        }
        state.cooldown_until = Some(Instant::now() + duration);

        warn!(
            provider = provider,
            cooldown_ms = duration.as_millis() as u64,
            "Provider rate limited, cooling down"
        );
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ProviderState>> {
        // State stays consistent even if a holder panicked
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for QuotaRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(CallOutcome::from_status(401), CallOutcome::Unauthorized);
        assert_eq!(CallOutcome::from_status(403), CallOutcome::Unauthorized);
        assert_eq!(CallOutcome::from_status(429), CallOutcome::RateLimited);
        assert_eq!(CallOutcome::from_status(503), CallOutcome::RateLimited);
        assert_eq!(CallOutcome::from_status(200), CallOutcome::Success);
        assert_eq!(CallOutcome::from_status(500), CallOutcome::Failed);
    }

    #[test]
    fn test_unknown_provider_is_available() {
        let router = QuotaRouter::new();
        assert_eq!(router.availability("groq"), Availability::Available);
    }

    #[tokio::test]
    async fn test_success_propagates_result() {
        let router = QuotaRouter::new();
        let result = router.call("groq", || async { (Some(7), CallOutcome::Success) }).await;
        assert_eq!(result, Some(7));
    }

    #[tokio::test]
    async fn test_failed_outcome_keeps_provider_available() {
        let router = QuotaRouter::new();
        let result: Option<u8> = router.call("groq", || async { (None, CallOutcome::Failed) }).await;
        assert_eq!(result, None);
        assert!(router.is_available("groq"));
    }

    #[tokio::test]
    async fn test_cooldown_does_not_revive_dead_provider() {
        let router = QuotaRouter::new();
        router.mark_dead("groq");
        router.start_cooldown("groq");
        assert_eq!(router.availability("groq"), Availability::Dead);
    }
}
