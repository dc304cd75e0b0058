//! Notifications emitted by a [`Machine`](crate::Machine) and the terminal payloads of a
//! finished computation.

use std::time::Duration;

use serde::Serialize;

use crate::constraint::ConstraintViolation;
use crate::types::{trim, State, StepFault, Symbol, Transition};

/// Snapshot taken when a computation ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report<S, T> {
    /// The state the machine ended in.
    pub state: State<S>,
    /// Number of transitions applied.
    pub step_count: u64,
    /// Total running time.
    pub duration: Duration,
    /// Raw contents of every tape, blanks included.
    pub tapes: Vec<Vec<Symbol<T>>>,
}

impl<S, T> Report<S, T> {
    /// Raw contents of the first tape.
    pub fn tape(&self) -> &[Symbol<T>] {
        self.tapes.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Contents of the first tape with leading and trailing blanks removed.
    pub fn result(&self) -> &[Symbol<T>] {
        trim(self.tape())
    }
}

/// Why a computation was aborted. A cause is either a violation or a fault,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AbortCause {
    /// Explicit abort request without an underlying fault.
    Requested,
    /// A runtime constraint fired.
    Violation(ConstraintViolation),
    /// Applying a transition or evaluating a constraint failed.
    Fault(StepFault),
}

impl AbortCause {
    pub fn violation(&self) -> Option<&ConstraintViolation> {
        match self {
            AbortCause::Violation(violation) => Some(violation),
            _ => None,
        }
    }

    pub fn fault(&self) -> Option<&StepFault> {
        match self {
            AbortCause::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// How a computation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome<S, T> {
    /// The machine reached `Accept` or `Reject`.
    Terminated(Report<S, T>),
    /// The computation was stopped before reaching a finish state.
    Aborted {
        report: Report<S, T>,
        cause: AbortCause,
    },
}

impl<S, T> Outcome<S, T> {
    pub fn report(&self) -> &Report<S, T> {
        match self {
            Outcome::Terminated(report) | Outcome::Aborted { report, .. } => report,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Outcome::Terminated(_))
    }

    /// Returns the abort cause, or `None` for a terminated computation.
    pub fn cause(&self) -> Option<&AbortCause> {
        match self {
            Outcome::Terminated(_) => None,
            Outcome::Aborted { cause, .. } => Some(cause),
        }
    }
}

/// A notification delivered to every registered [`Observer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MachineEvent<S, T> {
    /// A transition was applied.
    Stepped(Transition<S, T>),
    /// The computation reached a finish state.
    Terminated(Report<S, T>),
    /// The computation was aborted.
    Aborted {
        report: Report<S, T>,
        cause: AbortCause,
    },
}

impl<S, T> From<Outcome<S, T>> for MachineEvent<S, T> {
    fn from(outcome: Outcome<S, T>) -> Self {
        match outcome {
            Outcome::Terminated(report) => MachineEvent::Terminated(report),
            Outcome::Aborted { report, cause } => MachineEvent::Aborted { report, cause },
        }
    }
}

/// Receives machine notifications.
///
/// Observers run on whichever thread drove the step, after the machine has
/// released its internal locks, so they may call back into the machine.
pub trait Observer<S, T>: Send + Sync {
    fn on_event(&self, event: &MachineEvent<S, T>);
}

impl<S, T, F> Observer<S, T> for F
where
    F: Fn(&MachineEvent<S, T>) + Send + Sync,
{
    fn on_event(&self, event: &MachineEvent<S, T>) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{render, symbols};

    fn report() -> Report<u8, char> {
        Report {
            state: State::Accept,
            step_count: 3,
            duration: Duration::from_millis(2),
            tapes: vec![symbols("__ab_"), symbols("x")],
        }
    }

    #[test]
    fn test_report_result_is_trimmed_first_tape() {
        let report = report();

        assert_eq!(render(report.tape()), "__ab_");
        assert_eq!(render(report.result()), "ab");
    }

    #[test]
    fn test_report_without_tapes() {
        let report = Report::<u8, char> {
            tapes: Vec::new(),
            ..report()
        };

        assert!(report.tape().is_empty());
        assert!(report.result().is_empty());
    }

    #[test]
    fn test_outcome_accessors() {
        let terminated = Outcome::Terminated(report());
        assert!(terminated.is_terminated());
        assert_eq!(terminated.cause(), None);

        let aborted = Outcome::Aborted {
            report: report(),
            cause: AbortCause::Violation(ConstraintViolation::Cancelled),
        };
        assert!(!aborted.is_terminated());
        assert_eq!(
            aborted.cause().and_then(AbortCause::violation),
            Some(&ConstraintViolation::Cancelled)
        );
        assert_eq!(aborted.cause().and_then(AbortCause::fault), None);
        assert_eq!(aborted.report().step_count, 3);
    }

    #[test]
    fn test_outcome_into_event() {
        let event: MachineEvent<u8, char> = Outcome::Terminated(report()).into();
        assert!(matches!(event, MachineEvent::Terminated(r) if r.step_count == 3));
    }

    #[test]
    fn test_event_serialization() {
        let event: MachineEvent<u8, char> = MachineEvent::Aborted {
            report: report(),
            cause: AbortCause::Violation(ConstraintViolation::StepLimit { step_limit: 3 }),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["Aborted"]["report"]["state"], "Accept");
        assert_eq!(json["Aborted"]["report"]["step_count"], 3);
        assert_eq!(
            json["Aborted"]["cause"]["Violation"]["StepLimit"]["step_limit"],
            3
        );
    }
}
