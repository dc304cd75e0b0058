//! This module defines the `Machine`, the engine that drives a computation over a
//! [`TransitionTable`]. A computation is started in either automatic mode, where the engine
//! steps until the machine halts, or manual mode, where the caller drives each step.
//!
//! Every computation ends with exactly one terminal notification: `Terminated` when a
//! finish state is reached, or `Aborted` when an abort was requested, a constraint fired or
//! a step failed. Faults raised while stepping are never returned to the caller; they are
//! only reported through the abort notification and the returned [`Outcome`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::computation::ComputationState;
use crate::constraint::{Constraint, ConstraintViolation};
use crate::event::{AbortCause, MachineEvent, Observer, Outcome, Report};
use crate::table::TransitionTable;
use crate::tape::Tape;
use crate::types::{
    ComputationMode, EngineError, State, StepFault, Symbol, Transition, TransitionDomain, Value,
};

/// The active-run record, guarded separately from the computation so abort
/// requests never wait for a step to finish.
#[derive(Debug, Clone)]
struct RunControl {
    id: u64,
    mode: ComputationMode,
    abort: CancellationToken,
}

/// Everything a single run owns.
struct Computation<S, T> {
    id: u64,
    mode: ComputationMode,
    tapes: Vec<Tape<T>>,
    state: ComputationState<S, T>,
    constraint: Option<Arc<dyn Constraint<S, T>>>,
    abort: CancellationToken,
}

impl<S: Value, T: Value> Computation<S, T> {
    fn heads(&self) -> Vec<Symbol<T>> {
        self.tapes.iter().map(|tape| tape.read().clone()).collect()
    }

    /// Applies the transition for the current configuration, or forces `Reject`
    /// when none is defined.
    fn apply(&mut self, table: &TransitionTable<S, T>) -> Result<Option<Transition<S, T>>, StepFault> {
        let domain = self.state.configuration().clone();

        let range = match table.lookup(&domain) {
            Ok(range) => range.clone(),
            Err(miss) => {
                debug!(run = self.id, reason = %miss, "implicit_reject");
                self.state.reject()?;
                return Ok(None);
            }
        };

        for (tape, (symbol, direction)) in self.tapes.iter_mut().zip(&range.actions) {
            tape.write(symbol.clone());
            tape.move_head(*direction);
        }

        let next = TransitionDomain::multi(range.state.clone(), self.heads());
        self.state.advance(next)?;

        debug!(
            run = self.id,
            step = self.state.step_count(),
            state = ?range.state,
            "machine_step"
        );

        Ok(Some(Transition::new(domain, range)))
    }

    fn check(&self) -> Option<ConstraintViolation> {
        self.constraint
            .as_ref()
            .and_then(|constraint| constraint.check(&self.state))
    }
}

/// What one pass of the step loop produced.
struct Advance<S, T> {
    run: u64,
    stepped: Option<Transition<S, T>>,
    outcome: Option<Outcome<S, T>>,
}

/// A read-only view of the active computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatus<S, T> {
    pub mode: ComputationMode,
    pub configuration: TransitionDomain<S, T>,
    pub step_count: u64,
    pub duration: Duration,
    /// Raw contents of every tape.
    pub tapes: Vec<Vec<Symbol<T>>>,
    /// Head offset on every tape, counted from the leftmost visited cell.
    pub heads: Vec<usize>,
}

/// Completion handle for an automatic run executing in the background.
#[derive(Debug)]
pub struct RunHandle<S, T> {
    task: JoinHandle<Result<Outcome<S, T>, EngineError>>,
}

impl<S, T> RunHandle<S, T> {
    /// Waits for the run to terminate or abort.
    pub async fn wait(self) -> Result<Outcome<S, T>, EngineError> {
        self.task
            .await
            .map_err(|e| EngineError::BackgroundTask(e.to_string()))?
    }

    /// Returns `true` once the background run has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// A deterministic Turing machine over a single validated transition table.
///
/// At most one computation runs at a time. The machine can be reused once a
/// computation ends.
pub struct Machine<S, T> {
    table: Arc<TransitionTable<S, T>>,
    // Lock order: `computation` before `control`.
    computation: Mutex<Option<Computation<S, T>>>,
    control: Mutex<Option<RunControl>>,
    observers: RwLock<Vec<Arc<dyn Observer<S, T>>>>,
    next_run: AtomicU64,
}

impl<S: Value, T: Value> Machine<S, T> {
    /// Creates an idle machine for the given table.
    pub fn new(table: impl Into<Arc<TransitionTable<S, T>>>) -> Self {
        Self {
            table: table.into(),
            computation: Mutex::new(None),
            control: Mutex::new(None),
            observers: RwLock::new(Vec::new()),
            next_run: AtomicU64::new(1),
        }
    }

    /// Returns the machine's transition table.
    pub fn table(&self) -> &TransitionTable<S, T> {
        &self.table
    }

    /// Registers an observer for every subsequent notification.
    pub fn subscribe<O>(&self, observer: O)
    where
        O: Observer<S, T> + 'static,
    {
        self.observers.write().push(Arc::new(observer));
    }

    /// Returns the mode of the active computation, if any.
    pub fn mode(&self) -> Option<ComputationMode> {
        self.control.lock().as_ref().map(|active| active.mode)
    }

    pub fn is_running(&self) -> bool {
        self.control.lock().is_some()
    }

    /// Returns a snapshot of the active computation.
    ///
    /// Blocks while a step is in flight.
    pub fn status(&self) -> Option<RunStatus<S, T>> {
        self.computation
            .lock()
            .as_ref()
            .map(|computation| RunStatus {
                mode: computation.mode,
                configuration: computation.state.configuration().clone(),
                step_count: computation.state.step_count(),
                duration: computation.state.duration(),
                tapes: computation.tapes.iter().map(Tape::contents).collect(),
                heads: computation.tapes.iter().map(Tape::head).collect(),
            })
    }

    /// Starts a manual computation. Nothing is stepped until [`Machine::step`] is
    /// called.
    pub fn start_manual<I>(
        &self,
        input: I,
        constraint: Option<Arc<dyn Constraint<S, T>>>,
    ) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = Symbol<T>>,
    {
        self.initialize(ComputationMode::Manual, input, constraint)
    }

    /// Runs a computation to completion on the calling thread.
    pub fn start_automatic<I>(
        &self,
        input: I,
        constraint: Option<Arc<dyn Constraint<S, T>>>,
    ) -> Result<Outcome<S, T>, EngineError>
    where
        I: IntoIterator<Item = Symbol<T>>,
    {
        self.initialize(ComputationMode::Automatic, input, constraint)?;
        self.drive()
    }

    /// Starts a computation on a background blocking task and returns as soon as
    /// it is scheduled.
    ///
    /// Sequencing errors are returned immediately; everything that happens during
    /// the run is reported through the handle and the notifications.
    pub async fn start_automatic_async<I>(
        self: &Arc<Self>,
        input: I,
        constraint: Option<Arc<dyn Constraint<S, T>>>,
    ) -> Result<RunHandle<S, T>, EngineError>
    where
        I: IntoIterator<Item = Symbol<T>>,
    {
        self.initialize(ComputationMode::Automatic, input, constraint)?;

        let machine = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || machine.drive());

        Ok(RunHandle { task })
    }

    /// Performs one step of the active manual computation.
    ///
    /// Returns `Ok(true)` while another step is possible, and `Ok(false)` once the
    /// computation has terminated or been aborted.
    pub fn step(&self) -> Result<bool, EngineError> {
        let advance = {
            let mut slot = self.computation.lock();
            match slot.as_ref() {
                Some(computation) if computation.mode == ComputationMode::Manual => {}
                _ => return Err(EngineError::NoManualRun),
            }
            self.advance(&mut slot)
        };

        let advance = advance.ok_or(EngineError::NoManualRun)?;

        Ok(self.publish(advance).is_none())
    }

    /// Requests that the active computation stop.
    ///
    /// A manual computation is aborted immediately on the calling thread. An
    /// automatic computation is only flagged; its loop aborts before the next step.
    pub fn request_abortion(&self) -> Result<(), EngineError> {
        let active = self.control.lock().clone().ok_or(EngineError::NotRunning)?;
        active.abort.cancel();

        info!(run = active.id, mode = %active.mode, "abort_requested");

        if active.mode == ComputationMode::Manual {
            if let Some(outcome) = self.abort_run(active.id, AbortCause::Requested) {
                let _ = self.emit(&outcome.into());
            }
        }

        Ok(())
    }

    fn initialize<I>(
        &self,
        mode: ComputationMode,
        input: I,
        constraint: Option<Arc<dyn Constraint<S, T>>>,
    ) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = Symbol<T>>,
    {
        let mut slot = self.computation.lock();
        let mut control = self.control.lock();

        if let Some(active) = control.as_ref() {
            return Err(EngineError::AlreadyRunning(active.mode));
        }

        let tape_count = self.table.tape_count();
        let mut tapes = Vec::with_capacity(tape_count);
        tapes.push(Tape::new(input));
        tapes.extend((1..tape_count).map(|_| Tape::new(std::iter::empty())));

        let heads = tapes.iter().map(|tape| tape.read().clone()).collect();
        let mut state = ComputationState::new(TransitionDomain::multi(State::Initial, heads));
        state.start_clock();

        let id = self.next_run.fetch_add(1, Ordering::Relaxed);
        let abort = CancellationToken::new();

        *slot = Some(Computation {
            id,
            mode,
            tapes,
            state,
            constraint,
            abort: abort.clone(),
        });
        *control = Some(RunControl { id, mode, abort });

        info!(run = id, mode = %mode, tape_count, "computation_started");

        Ok(())
    }

    /// The automatic step loop.
    fn drive(&self) -> Result<Outcome<S, T>, EngineError> {
        loop {
            let advance = {
                let mut slot = self.computation.lock();
                self.advance(&mut slot)
            }
            .ok_or(EngineError::NotRunning)?;

            if let Some(outcome) = self.publish(advance) {
                return Ok(outcome);
            }
        }
    }

    /// One pass of the step algorithm: observe the abort flag, apply a transition,
    /// check for a finish state, then evaluate the constraint.
    fn advance(&self, slot: &mut Option<Computation<S, T>>) -> Option<Advance<S, T>> {
        let computation = slot.as_mut()?;
        let run = computation.id;

        if computation.abort.is_cancelled() {
            return Some(self.stop(slot, run, None, AbortCause::Requested));
        }

        let table = &self.table;
        let stepped = match panic::catch_unwind(AssertUnwindSafe(|| computation.apply(table))) {
            Ok(Ok(stepped)) => stepped,
            Ok(Err(fault)) => return Some(self.stop(slot, run, None, AbortCause::Fault(fault))),
            Err(payload) => {
                let fault = StepFault::Panic(panic_message(payload));
                return Some(self.stop(slot, run, None, AbortCause::Fault(fault)));
            }
        };

        if computation.state.is_finished() {
            let outcome = slot.take().map(|computation| self.finish(computation, None));
            return Some(Advance {
                run,
                stepped,
                outcome,
            });
        }

        let verdict = match panic::catch_unwind(AssertUnwindSafe(|| computation.check())) {
            Ok(None) => None,
            Ok(Some(violation)) => Some(AbortCause::Violation(violation)),
            Err(payload) => Some(AbortCause::Fault(StepFault::Panic(panic_message(payload)))),
        };

        match verdict {
            Some(cause) => Some(self.stop(slot, run, stepped, cause)),
            None => Some(Advance {
                run,
                stepped,
                outcome: None,
            }),
        }
    }

    fn stop(
        &self,
        slot: &mut Option<Computation<S, T>>,
        run: u64,
        stepped: Option<Transition<S, T>>,
        cause: AbortCause,
    ) -> Advance<S, T> {
        let outcome = slot
            .take()
            .map(|computation| self.finish(computation, Some(cause)));

        Advance {
            run,
            stepped,
            outcome,
        }
    }

    /// Runs the abort sequence for `run` if it is still the active computation.
    fn abort_run(&self, run: u64, cause: AbortCause) -> Option<Outcome<S, T>> {
        let mut slot = self.computation.lock();
        if slot.as_ref().is_some_and(|computation| computation.id == run) {
            slot.take().map(|computation| self.finish(computation, Some(cause)))
        } else {
            None
        }
    }

    /// Shared terminate/abort sequence: stop the clock, snapshot, clear the tapes
    /// and release the active-run record. The caller emits the notification once
    /// every lock is released.
    fn finish(&self, mut computation: Computation<S, T>, cause: Option<AbortCause>) -> Outcome<S, T> {
        computation.state.stop_clock();

        let report = Report {
            state: computation.state.configuration().state.clone(),
            step_count: computation.state.step_count(),
            duration: computation.state.duration(),
            tapes: computation.tapes.iter().map(Tape::contents).collect(),
        };
        computation.tapes.iter_mut().for_each(Tape::clear);

        {
            let mut control = self.control.lock();
            if control
                .as_ref()
                .is_some_and(|active| active.id == computation.id)
            {
                *control = None;
            }
        }

        match cause {
            None => {
                info!(
                    run = computation.id,
                    state = ?report.state,
                    steps = report.step_count,
                    duration = ?report.duration,
                    "computation_terminated"
                );
                Outcome::Terminated(report)
            }
            Some(cause) => {
                match &cause {
                    AbortCause::Requested => info!(
                        run = computation.id,
                        steps = report.step_count,
                        "computation_aborted"
                    ),
                    AbortCause::Violation(violation) => warn!(
                        run = computation.id,
                        steps = report.step_count,
                        violation = %violation,
                        "computation_aborted"
                    ),
                    AbortCause::Fault(fault) => warn!(
                        run = computation.id,
                        steps = report.step_count,
                        error = %fault,
                        "computation_aborted"
                    ),
                }
                Outcome::Aborted { report, cause }
            }
        }
    }

    /// Emits the notifications of one step and returns the run's outcome if it
    /// ended. An observer panicking on `Stepped` aborts the run with a fault.
    fn publish(&self, advance: Advance<S, T>) -> Option<Outcome<S, T>> {
        let Advance {
            run,
            stepped,
            mut outcome,
        } = advance;

        if let Some(transition) = stepped {
            if let Err(message) = self.emit(&MachineEvent::Stepped(transition)) {
                if outcome.is_none() {
                    outcome = self.abort_run(run, AbortCause::Fault(StepFault::Panic(message)));
                }
            }
        }

        // The run is already released here, so a panic is only logged.
        if let Some(outcome) = &outcome {
            let _ = self.emit(&outcome.clone().into());
        }

        outcome
    }

    /// Notifies every observer with no lock held. A panicking observer does not
    /// keep the others from being called; the first panic message is returned.
    fn emit(&self, event: &MachineEvent<S, T>) -> Result<(), String> {
        let observers = self.observers.read().clone();
        let mut failure = None;

        for observer in observers {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
                let message = panic_message(payload);
                warn!(error = %message, "observer_panicked");
                failure.get_or_insert(message);
            }
        }

        failure.map_or(Ok(()), Err)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
