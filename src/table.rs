//! This module provides the `TransitionTable`, an immutable and validated mapping from
//! transition domains to ranges. A table can only be obtained through [`TransitionTable::new`],
//! which runs every well-formedness check before the table exists.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::types::{
    DomainNotFound, State, TableError, Transition, TransitionDomain, TransitionRange, Value,
};

/// A deterministic transition table.
///
/// Every domain maps to exactly one range, at least one domain starts from
/// `Initial`, at least one range reaches `Accept`, and all transitions agree on
/// the number of tapes.
#[derive(Debug, Clone)]
pub struct TransitionTable<S, T> {
    rules: HashMap<TransitionDomain<S, T>, TransitionRange<S, T>>,
    tape_count: usize,
}

type Check<S, T> = fn(&[Transition<S, T>]) -> Result<(), TableError>;

impl<S: Value, T: Value> TransitionTable<S, T> {
    /// Validates the transitions and builds the table.
    ///
    /// Checks run in a fixed order (emptiness, determinism, required sentinels,
    /// state placement, tape counts) and the first failure is returned.
    pub fn new<I>(transitions: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = Transition<S, T>>,
    {
        let transitions: Vec<Transition<S, T>> = transitions.into_iter().collect();
        validate(&transitions)?;

        let tape_count = transitions
            .first()
            .map_or(1, |transition| transition.domain.tape_count());
        let rules: HashMap<_, _> = transitions
            .into_iter()
            .map(|transition| (transition.domain, transition.range))
            .collect();

        debug!(transitions = rules.len(), tape_count, "transition_table_built");

        Ok(Self { rules, tape_count })
    }

    /// Looks up the range for a domain.
    ///
    /// A miss is not an error of the table; the engine treats it as the implicit
    /// reject rule.
    pub fn lookup(
        &self,
        domain: &TransitionDomain<S, T>,
    ) -> Result<&TransitionRange<S, T>, DomainNotFound> {
        self.rules
            .get(domain)
            .ok_or_else(|| DomainNotFound(format!("{:?}", domain)))
    }

    /// Returns the number of tapes every transition covers.
    pub fn tape_count(&self) -> usize {
        self.tape_count
    }

    /// Returns the number of transitions.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// A valid table always holds at least one transition.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates over every transition in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&TransitionDomain<S, T>, &TransitionRange<S, T>)> {
        self.rules.iter()
    }
}

impl<S: Value, T: Value> TryFrom<Vec<Transition<S, T>>> for TransitionTable<S, T> {
    type Error = TableError;

    fn try_from(transitions: Vec<Transition<S, T>>) -> Result<Self, Self::Error> {
        Self::new(transitions)
    }
}

fn validate<S: Value, T: Value>(transitions: &[Transition<S, T>]) -> Result<(), TableError> {
    let checks: [Check<S, T>; 6] = [
        check_not_empty,
        check_deterministic,
        check_initial_present,
        check_accept_present,
        check_state_placement,
        check_tape_counts,
    ];

    checks.iter().try_for_each(|check| check(transitions))
}

fn check_not_empty<S, T>(transitions: &[Transition<S, T>]) -> Result<(), TableError> {
    if transitions.is_empty() {
        return Err(TableError::Empty);
    }

    Ok(())
}

/// Rejects tables in which two transitions share a domain.
fn check_deterministic<S: Value, T: Value>(
    transitions: &[Transition<S, T>],
) -> Result<(), TableError> {
    let mut seen = HashSet::with_capacity(transitions.len());

    for transition in transitions {
        if !seen.insert(&transition.domain) {
            return Err(TableError::DuplicateDomain(format!(
                "{:?}",
                transition.domain
            )));
        }
    }

    Ok(())
}

fn check_initial_present<S, T>(transitions: &[Transition<S, T>]) -> Result<(), TableError> {
    transitions
        .iter()
        .any(|transition| matches!(transition.domain.state, State::Initial))
        .then_some(())
        .ok_or(TableError::MissingInitial)
}

fn check_accept_present<S, T>(transitions: &[Transition<S, T>]) -> Result<(), TableError> {
    transitions
        .iter()
        .any(|transition| matches!(transition.range.state, State::Accept))
        .then_some(())
        .ok_or(TableError::MissingAccept)
}

/// Only `Initial` and value states may appear in a domain; `Initial` may never
/// appear in a range.
fn check_state_placement<S: Value, T: Value>(
    transitions: &[Transition<S, T>],
) -> Result<(), TableError> {
    for transition in transitions {
        if transition.domain.state.is_finish() {
            return Err(TableError::FinishStateInDomain(format!(
                "{:?}",
                transition.domain
            )));
        }

        if matches!(transition.range.state, State::Initial) {
            return Err(TableError::InitialStateInRange(format!(
                "{:?}",
                transition.range
            )));
        }
    }

    Ok(())
}

fn check_tape_counts<S: Value, T: Value>(
    transitions: &[Transition<S, T>],
) -> Result<(), TableError> {
    let mut expected = None;

    for transition in transitions {
        let domain = transition.domain.tape_count();
        let range = transition.range.tape_count();

        if domain == 0 {
            return Err(TableError::EmptyDomain(format!("{:?}", transition.domain)));
        }

        if domain != range {
            return Err(TableError::ArityMismatch { domain, range });
        }

        match expected {
            None => expected = Some(domain),
            Some(expected) if expected != domain => {
                return Err(TableError::InconsistentTapeCount {
                    expected,
                    found: domain,
                })
            }
            Some(_) => {}
        }
    }

    Ok(())
}
