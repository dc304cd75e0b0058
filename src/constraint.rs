//! Runtime constraints evaluated by the machine after every step.
//!
//! A constraint is a side-effect free predicate over a read-only
//! [`ComputationState`]. It reports a [`ConstraintViolation`] as a value rather
//! than failing, and the machine turns that value into an abort.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::computation::ComputationState;
use crate::types::{ConstraintError, Value};

/// Why a constraint stopped a computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConstraintViolation {
    /// More steps were taken than allowed.
    StepLimit { step_limit: u64 },
    /// The computation ran longer than allowed.
    TimeLimit {
        time_limit: Duration,
        duration: Duration,
    },
    /// The external cancellation signal was raised.
    Cancelled,
    /// Several sub-constraints fired at once.
    Multi(Vec<ConstraintViolation>),
    /// Raised by a caller supplied constraint.
    Custom(String),
}

impl ConstraintViolation {
    /// A human readable reason for the violation.
    pub fn reason(&self) -> String {
        match self {
            ConstraintViolation::StepLimit { step_limit } => {
                format!("Step limit of {} exceeded", step_limit)
            }
            ConstraintViolation::TimeLimit {
                time_limit,
                duration,
            } => format!("Time limit of {:?} exceeded after {:?}", time_limit, duration),
            ConstraintViolation::Cancelled => "Computation was cancelled".to_string(),
            ConstraintViolation::Multi(violations) => {
                let reasons: Vec<String> = violations.iter().map(|v| v.reason()).collect();
                format!("Multiple constraints violated: {}", reasons.join("; "))
            }
            ConstraintViolation::Custom(reason) => reason.clone(),
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

/// A rule checked against the computation state after every step.
///
/// Implementations must not mutate shared state on `check` if they are to be
/// reused across computations.
pub trait Constraint<S, T>: Send + Sync {
    /// Returns `None` while the computation may continue.
    fn check(&self, state: &ComputationState<S, T>) -> Option<ConstraintViolation>;
}

impl<S, T, F> Constraint<S, T> for F
where
    F: Fn(&ComputationState<S, T>) -> Option<ConstraintViolation> + Send + Sync,
{
    fn check(&self, state: &ComputationState<S, T>) -> Option<ConstraintViolation> {
        self(state)
    }
}

/// Fires once the step count exceeds the limit. Reaching it exactly is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepLimitConstraint {
    limit: u64,
}

impl StepLimitConstraint {
    pub fn new(limit: u64) -> Result<Self, ConstraintError> {
        if limit < 1 {
            return Err(ConstraintError::InvalidStepLimit(limit));
        }

        Ok(Self { limit })
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

impl<S: Value, T: Value> Constraint<S, T> for StepLimitConstraint {
    fn check(&self, state: &ComputationState<S, T>) -> Option<ConstraintViolation> {
        (state.step_count() > self.limit).then_some(ConstraintViolation::StepLimit {
            step_limit: self.limit,
        })
    }
}

/// Fires once the running time exceeds the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimitConstraint {
    limit: Duration,
}

impl TimeLimitConstraint {
    pub fn new(limit: Duration) -> Result<Self, ConstraintError> {
        if limit.is_zero() {
            return Err(ConstraintError::InvalidTimeLimit);
        }

        Ok(Self { limit })
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl<S: Value, T: Value> Constraint<S, T> for TimeLimitConstraint {
    fn check(&self, state: &ComputationState<S, T>) -> Option<ConstraintViolation> {
        let duration = state.duration();

        (duration > self.limit).then_some(ConstraintViolation::TimeLimit {
            time_limit: self.limit,
            duration,
        })
    }
}

/// Fires once the token is cancelled.
///
/// A `CancellationToken` can always be cancelled, so construction cannot fail.
#[derive(Debug, Clone)]
pub struct CancellationConstraint {
    token: CancellationToken,
}

impl CancellationConstraint {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl<S: Value, T: Value> Constraint<S, T> for CancellationConstraint {
    fn check(&self, _state: &ComputationState<S, T>) -> Option<ConstraintViolation> {
        self.token
            .is_cancelled()
            .then_some(ConstraintViolation::Cancelled)
    }
}

/// Evaluates every sub-constraint and reports all of those that fired.
pub struct MultiConstraint<S, T> {
    constraints: Vec<Arc<dyn Constraint<S, T>>>,
}

impl<S, T> MultiConstraint<S, T> {
    pub fn new(constraints: Vec<Arc<dyn Constraint<S, T>>>) -> Result<Self, ConstraintError> {
        if constraints.is_empty() {
            return Err(ConstraintError::EmptyConstraintList);
        }

        Ok(Self { constraints })
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl<S, T> fmt::Debug for MultiConstraint<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiConstraint")
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

impl<S: Value, T: Value> Constraint<S, T> for MultiConstraint<S, T> {
    fn check(&self, state: &ComputationState<S, T>) -> Option<ConstraintViolation> {
        // No short-circuit: every constraint is evaluated.
        let violations: Vec<ConstraintViolation> = self
            .constraints
            .iter()
            .filter_map(|constraint| constraint.check(state))
            .collect();

        (!violations.is_empty()).then_some(ConstraintViolation::Multi(violations))
    }
}
