//! Scheduler — registration table for (date rule, time rule, callback)
//! triples and per-tick match-set computation.
//!
//! Ordering contract: `due()` returns matches in ascending registration
//! order (FIFO), and computes the full match set before any callback runs.
//! Unregistering mid-tick therefore removes an action from *future* ticks
//! only — the current tick's already-computed set is untouched. Duplicate
//! registrations are independent actions and fire independently.

use crate::calendar::CalendarError;
use crate::domain::Instant;
use crate::engine::rules::{DateRule, RuleEvaluator, TimeRule};

/// Handle returned by [`Scheduler::register`]. Ids increase in
/// registration order and are never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(pub u64);

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reg#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct ScheduledAction {
    id: RegistrationId,
    date_rule: DateRule,
    time_rule: TimeRule,
    callback: String,
}

/// An action selected to fire at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueAction {
    pub id: RegistrationId,
    pub callback: String,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    /// Kept in registration order: register only appends, unregister
    /// preserves relative order.
    actions: Vec<ScheduledAction>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback to fire whenever both rules match a tick.
    pub fn register(
        &mut self,
        date_rule: DateRule,
        time_rule: TimeRule,
        callback: impl Into<String>,
    ) -> RegistrationId {
        let id = RegistrationId(self.next_id);
        self.next_id += 1;
        self.actions.push(ScheduledAction {
            id,
            date_rule,
            time_rule,
            callback: callback.into(),
        });
        id
    }

    /// Remove a registration. Returns false if the id was already gone.
    pub fn unregister(&mut self, id: RegistrationId) -> bool {
        let before = self.actions.len();
        self.actions.retain(|a| a.id != id);
        self.actions.len() != before
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Compute the match set for one tick, in ascending registration order.
    pub fn due(
        &self,
        instant: Instant,
        evaluator: &RuleEvaluator<'_>,
    ) -> Result<Vec<DueAction>, CalendarError> {
        let mut due = Vec::new();
        for action in &self.actions {
            if evaluator.matches(instant, &action.date_rule, &action.time_rule)? {
                due.push(DueAction {
                    id: action.id,
                    callback: action.callback.clone(),
                });
            }
        }
        Ok(due)
    }
}
