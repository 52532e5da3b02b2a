//! Daily token budget for the external catalog API.
//!
//! One [`TokenBudget`] is shared (behind an `Arc`) by every run in the
//! process. All state lives behind a single mutex so a check and the hold it
//! grants happen atomically: two concurrent runs can never both pass a check
//! against the last few tokens of the day.
//!
//! The counter resets lazily. The first call after the UTC day rolls over
//! zeroes usage; there is no background timer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Source of "now". Injected so tests can cross day boundaries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
struct BudgetState {
    day: NaiveDate,
    used_today: u64,
    /// Tokens held by outstanding reservations.
    reserved: u64,
    last_reset_at: DateTime<Utc>,
}

impl BudgetState {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            day: now.date_naive(),
            used_today: 0,
            reserved: 0,
            last_reset_at: now,
        }
    }

    fn committed(&self) -> u64 {
        self.used_today.saturating_add(self.reserved)
    }
}

/// Snapshot returned by [`TokenBudget::token_status`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenStatus {
    pub used_today: u64,
    pub reserved: u64,
    pub remaining: u64,
    pub ceiling: u64,
    pub percent_used: f64,
    pub can_proceed: bool,
    pub last_reset_at: DateTime<Utc>,
}

/// A hold on part of today's budget, granted by [`TokenBudget::reserve`].
///
/// Must be passed to [`TokenBudget::settle`] once the call's real cost is
/// known. A reservation from a previous day settles as plain usage against
/// the new day without touching the new day's holds.
#[derive(Debug)]
#[must_use = "an unsettled reservation holds budget until the next day boundary"]
pub struct Reservation {
    amount: u64,
    day: NaiveDate,
}

impl Reservation {
    #[must_use]
    pub fn amount(&self) -> u64 {
        self.amount
    }
}

pub struct TokenBudget {
    ceiling: u64,
    clock: Arc<dyn Clock>,
    state: Mutex<Option<BudgetState>>,
}

impl std::fmt::Debug for TokenBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBudget")
            .field("ceiling", &self.ceiling)
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl TokenBudget {
    #[must_use]
    pub fn new(ceiling: u64) -> Self {
        Self::with_clock(ceiling, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(ceiling: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            ceiling,
            clock,
            state: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// `true` when `estimated_cost` more tokens fit under today's ceiling.
    ///
    /// Fails closed once usage reaches the ceiling, even for a zero estimate.
    #[must_use]
    pub fn has_token_budget(&self, estimated_cost: u64) -> bool {
        let mut guard = self.lock();
        let state = self.current(&mut guard);
        self.fits(state, estimated_cost)
    }

    /// Adds `actual_cost` to today's usage.
    pub fn record_usage(&self, actual_cost: u64) {
        let mut guard = self.lock();
        let state = self.current(&mut guard);
        state.used_today = state.used_today.saturating_add(actual_cost);
        if state.used_today >= self.ceiling {
            tracing::warn!(
                used_today = state.used_today,
                ceiling = self.ceiling,
                "daily token budget exhausted"
            );
        }
    }

    /// Checks and holds `estimated_cost` in one step. Returns `None` when the
    /// estimate does not fit.
    pub fn reserve(&self, estimated_cost: u64) -> Option<Reservation> {
        let mut guard = self.lock();
        let state = self.current(&mut guard);
        if !self.fits(state, estimated_cost) {
            return None;
        }
        state.reserved = state.reserved.saturating_add(estimated_cost);
        Some(Reservation {
            amount: estimated_cost,
            day: state.day,
        })
    }

    /// Releases `reservation` and records `actual_cost` as usage.
    pub fn settle(&self, reservation: Reservation, actual_cost: u64) {
        let mut guard = self.lock();
        let state = self.current(&mut guard);
        if reservation.day == state.day {
            state.reserved = state.reserved.saturating_sub(reservation.amount);
        }
        state.used_today = state.used_today.saturating_add(actual_cost);
        if actual_cost > reservation.amount {
            tracing::debug!(
                estimated = reservation.amount,
                actual = actual_cost,
                "call cost exceeded its reservation"
            );
        }
    }

    /// Folds in the API's own remaining-token figure. Usage is raised to
    /// `ceiling - tokens_left` when that is higher; it is never lowered.
    pub fn reconcile(&self, tokens_left: u64) {
        let mut guard = self.lock();
        let state = self.current(&mut guard);
        let implied_used = self.ceiling.saturating_sub(tokens_left);
        if implied_used > state.used_today {
            tracing::info!(
                local = state.used_today,
                implied = implied_used,
                "raising local token usage to match API report"
            );
            state.used_today = implied_used;
        }
    }

    #[must_use]
    pub fn token_status(&self) -> TokenStatus {
        let mut guard = self.lock();
        let state = *self.current(&mut guard);
        let remaining = self.ceiling.saturating_sub(state.committed());
        #[allow(clippy::cast_precision_loss)]
        let percent_used = if self.ceiling == 0 {
            100.0
        } else {
            (state.used_today as f64 / self.ceiling as f64 * 100.0).min(100.0)
        };
        TokenStatus {
            used_today: state.used_today,
            reserved: state.reserved,
            remaining,
            ceiling: self.ceiling,
            percent_used,
            can_proceed: state.used_today < self.ceiling && remaining > 0,
            last_reset_at: state.last_reset_at,
        }
    }

    fn fits(&self, state: &BudgetState, estimated_cost: u64) -> bool {
        state.used_today < self.ceiling
            && state.committed().saturating_add(estimated_cost) <= self.ceiling
    }

    /// Today's state, creating it on first use and resetting it when the UTC
    /// day has changed.
    fn current<'a>(&self, slot: &'a mut Option<BudgetState>) -> &'a mut BudgetState {
        let now = self.clock.now();
        let today = now.date_naive();
        if let Some(previous) = slot.as_ref().filter(|s| s.day != today) {
            tracing::info!(
                previous_day = %previous.day,
                used = previous.used_today,
                "token budget day rolled over; resetting usage"
            );
            *slot = Some(BudgetState::fresh(now));
        }
        slot.get_or_insert_with(|| BudgetState::fresh(now))
    }

    fn lock(&self) -> MutexGuard<'_, Option<BudgetState>> {
        // Counters stay consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "budget_test.rs"]
mod tests;
