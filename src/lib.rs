//! This crate provides the core of a deterministic Turing machine simulator.
//! It includes the symbol and state model, a self-extending tape, validated transition
//! tables, runtime constraints, and the `Machine` engine that drives computations either
//! step by step or automatically in the background.

pub mod computation;
pub mod constraint;
pub mod event;
pub mod machine;
pub mod programs;
pub mod table;
pub mod tape;
pub mod types;

/// Re-exports the computation record evaluated by constraints.
pub use computation::ComputationState;
/// Re-exports the constraint trait and the built-in constraints.
pub use constraint::{
    CancellationConstraint, Constraint, ConstraintViolation, MultiConstraint,
    StepLimitConstraint, TimeLimitConstraint,
};
/// Re-exports the notification and terminal payload types.
pub use event::{AbortCause, MachineEvent, Observer, Outcome, Report};
/// Re-exports the engine and its run handles.
pub use machine::{Machine, RunHandle, RunStatus};
/// Re-exports the built-in program catalog.
pub use programs::{Program, ProgramInfo, ProgramManager, ProgramState, PROGRAMS};
/// Re-exports the validated transition table.
pub use table::TransitionTable;
/// Re-exports the tape.
pub use tape::Tape;
/// Re-exports the value model, transition shapes and error types.
pub use types::{
    render, symbols, trim, ComputationError, ComputationMode, ConstraintError, Direction,
    DomainNotFound, EngineError, ProgramError, State, StepFault, Symbol, TableError, Transition,
    TransitionDomain, TransitionRange, Value, DEFAULT_STEP_LIMIT, INPUT_BLANK_SYMBOL,
};
