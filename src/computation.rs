//! The mutable record of an in-progress computation: its configuration, step count and
//! elapsed running time.

use std::time::{Duration, Instant};

use crate::types::{ComputationError, State, TransitionDomain, Value};

/// A stopwatch that accumulates time across start/stop cycles.
#[derive(Debug, Clone, Default)]
struct Clock {
    started: Option<Instant>,
    elapsed: Duration,
}

impl Clock {
    fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
    }

    fn elapsed(&self) -> Duration {
        self.elapsed + self.started.map_or(Duration::ZERO, |started| started.elapsed())
    }
}

/// Current configuration, step count and running time of one computation.
///
/// Once the configuration reaches a finish state every further update is
/// refused with [`ComputationError::Finished`].
#[derive(Debug, Clone)]
pub struct ComputationState<S, T> {
    configuration: TransitionDomain<S, T>,
    step_count: u64,
    clock: Clock,
}

impl<S: Value, T: Value> ComputationState<S, T> {
    /// Creates a state at step zero with the clock stopped.
    pub fn new(configuration: TransitionDomain<S, T>) -> Self {
        Self {
            configuration,
            step_count: 0,
            clock: Clock::default(),
        }
    }

    /// The machine's current state and the symbols under its heads.
    pub fn configuration(&self) -> &TransitionDomain<S, T> {
        &self.configuration
    }

    /// Number of transitions applied so far.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Running time accumulated so far, including the current stretch if the
    /// clock is running.
    pub fn duration(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Whether the configuration is in `Accept` or `Reject`.
    pub fn is_finished(&self) -> bool {
        self.configuration.state.is_finish()
    }

    pub fn start_clock(&mut self) {
        self.clock.start();
    }

    pub fn stop_clock(&mut self) {
        self.clock.stop();
    }

    /// Records one applied transition.
    pub fn advance(
        &mut self,
        configuration: TransitionDomain<S, T>,
    ) -> Result<(), ComputationError> {
        self.ensure_running()?;
        self.configuration = configuration;
        self.step_count += 1;
        Ok(())
    }

    /// Forces the configuration into `Reject` without counting a step. Used when no
    /// transition is defined for the current configuration.
    pub fn reject(&mut self) -> Result<(), ComputationError> {
        self.ensure_running()?;
        self.configuration.state = State::Reject;
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), ComputationError> {
        if self.is_finished() {
            return Err(ComputationError::Finished(format!(
                "{:?}",
                self.configuration.state
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;

    fn initial() -> ComputationState<u8, char> {
        ComputationState::new(TransitionDomain::new(State::Initial, Symbol::Value('a')))
    }

    #[test]
    fn test_new_state_is_at_step_zero() {
        let state = initial();

        assert_eq!(state.step_count(), 0);
        assert_eq!(state.duration(), Duration::ZERO);
        assert!(!state.is_finished());
    }

    #[test]
    fn test_advance_counts_steps() {
        let mut state = initial();

        state
            .advance(TransitionDomain::new(State::Value(1), Symbol::Blank))
            .unwrap();
        state
            .advance(TransitionDomain::new(State::Value(2), Symbol::Blank))
            .unwrap();

        assert_eq!(state.step_count(), 2);
        assert_eq!(state.configuration().state, State::Value(2));
    }

    #[test]
    fn test_updates_refused_after_finish() {
        let mut state = initial();
        state
            .advance(TransitionDomain::new(State::Accept, Symbol::Blank))
            .unwrap();

        let result = state.advance(TransitionDomain::new(State::Value(1), Symbol::Blank));
        assert!(matches!(result, Err(ComputationError::Finished(_))));
        assert!(state.reject().is_err());
        assert_eq!(state.step_count(), 1);
        assert_eq!(state.configuration().state, State::Accept);
    }

    #[test]
    fn test_reject_does_not_count_a_step() {
        let mut state = initial();
        state.reject().unwrap();

        assert_eq!(state.step_count(), 0);
        assert_eq!(state.configuration().state, State::Reject);
        assert_eq!(state.configuration().symbol(), Some(&Symbol::Value('a')));
    }

    #[test]
    fn test_clock_accumulates_only_while_running() {
        let mut state = initial();
        state.start_clock();
        std::thread::sleep(Duration::from_millis(5));
        state.stop_clock();

        let stopped = state.duration();
        assert!(stopped >= Duration::from_millis(5));

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(state.duration(), stopped);
    }
}
