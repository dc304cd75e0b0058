//! This module defines the core value types used throughout the engine: tape symbols,
//! machine states, head directions, the transition shapes that make up a table, and
//! the error types produced by construction, sequencing and stepping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// A special input character used to denote the blank symbol in textual tapes.
pub const INPUT_BLANK_SYMBOL: char = '_';
/// The step limit applied by hosts that do not configure one explicitly.
pub const DEFAULT_STEP_LIMIT: u64 = 10_000;

/// Bound for the payload carried by a [`Symbol`] or [`State`].
///
/// Anything cheap to clone, comparable, hashable and shareable across threads
/// qualifies; the blanket impl means callers never implement it by hand.
pub trait Value: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// The content of a single tape cell.
///
/// `Blank` is distinct from every `Value`, including a value holding the
/// payload type's default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol<T> {
    /// The empty cell every unvisited position holds.
    Blank,
    /// A written symbol.
    Value(T),
}

impl<T> Symbol<T> {
    /// Returns `true` for the blank cell.
    pub fn is_blank(&self) -> bool {
        matches!(self, Symbol::Blank)
    }

    /// Returns the payload, or `None` for a blank cell.
    pub fn value(&self) -> Option<&T> {
        match self {
            Symbol::Blank => None,
            Symbol::Value(value) => Some(value),
        }
    }
}

impl<T> From<T> for Symbol<T> {
    fn from(value: T) -> Self {
        Symbol::Value(value)
    }
}

impl<T: fmt::Display> fmt::Display for Symbol<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Blank => write!(f, "{}", INPUT_BLANK_SYMBOL),
            Symbol::Value(value) => write!(f, "{}", value),
        }
    }
}

/// The control state of the machine.
///
/// The three sentinels are only equal to themselves. `Accept` and `Reject` are
/// finish states; a computation cannot continue past them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State<S> {
    /// The state every computation starts in.
    Initial,
    /// Halting state signalling acceptance of the input.
    Accept,
    /// Halting state signalling rejection of the input.
    Reject,
    /// A user defined intermediate state.
    Value(S),
}

impl<S> State<S> {
    /// Returns `true` for `Accept` and `Reject`.
    pub fn is_finish(&self) -> bool {
        matches!(self, State::Accept | State::Reject)
    }
}

impl<S> From<S> for State<S> {
    fn from(value: S) -> Self {
        State::Value(value)
    }
}

impl<S: fmt::Display> fmt::Display for State<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Initial => write!(f, "Initial"),
            State::Accept => write!(f, "Accept"),
            State::Reject => write!(f, "Reject"),
            State::Value(value) => write!(f, "{}", value),
        }
    }
}

/// Represents the possible directions a Turing Machine head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

/// The key a transition is looked up by: the current state and the symbol under
/// each head, ordered by tape.
///
/// A single-tape machine uses exactly one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionDomain<S, T> {
    /// The state the machine must be in.
    pub state: State<S>,
    /// The symbols that must be under the heads, one per tape.
    pub symbols: Vec<Symbol<T>>,
}

impl<S, T> TransitionDomain<S, T> {
    /// Creates a single-tape domain.
    pub fn new(state: State<S>, symbol: Symbol<T>) -> Self {
        Self {
            state,
            symbols: vec![symbol],
        }
    }

    /// Creates a domain spanning several tapes.
    pub fn multi(state: State<S>, symbols: Vec<Symbol<T>>) -> Self {
        Self { state, symbols }
    }

    /// Returns the symbol under the first head.
    pub fn symbol(&self) -> Option<&Symbol<T>> {
        self.symbols.first()
    }

    /// Returns the number of tapes this domain covers.
    pub fn tape_count(&self) -> usize {
        self.symbols.len()
    }
}

/// The effect of applying a transition: the next state, plus the symbol to write
/// and the head movement for every tape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionRange<S, T> {
    /// The state the machine moves to.
    pub state: State<S>,
    /// What to write and where to move, one entry per tape.
    pub actions: Vec<(Symbol<T>, Direction)>,
}

impl<S, T> TransitionRange<S, T> {
    /// Creates a single-tape range.
    pub fn new(state: State<S>, symbol: Symbol<T>, direction: Direction) -> Self {
        Self {
            state,
            actions: vec![(symbol, direction)],
        }
    }

    /// Creates a range spanning several tapes.
    pub fn multi(state: State<S>, actions: Vec<(Symbol<T>, Direction)>) -> Self {
        Self { state, actions }
    }

    /// Returns the number of tapes this range covers.
    pub fn tape_count(&self) -> usize {
        self.actions.len()
    }
}

/// Represents a single transition rule: when `domain` matches, apply `range`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition<S, T> {
    pub domain: TransitionDomain<S, T>,
    pub range: TransitionRange<S, T>,
}

impl<S, T> Transition<S, T> {
    pub fn new(domain: TransitionDomain<S, T>, range: TransitionRange<S, T>) -> Self {
        Self { domain, range }
    }
}

/// Whether a run is driven by the engine's own loop or by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputationMode {
    Automatic,
    Manual,
}

impl fmt::Display for ComputationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputationMode::Automatic => write!(f, "automatic"),
            ComputationMode::Manual => write!(f, "manual"),
        }
    }
}

/// Converts a textual tape into symbols, mapping [`INPUT_BLANK_SYMBOL`] to `Blank`.
pub fn symbols(input: &str) -> Vec<Symbol<char>> {
    input
        .chars()
        .map(|c| {
            if c == INPUT_BLANK_SYMBOL {
                Symbol::Blank
            } else {
                Symbol::Value(c)
            }
        })
        .collect()
}

/// Renders symbols back into text, the inverse of [`symbols`].
pub fn render(symbols: &[Symbol<char>]) -> String {
    symbols.iter().map(|s| s.to_string()).collect()
}

/// Strips the leading and trailing blanks from a tape's contents.
pub fn trim<T>(symbols: &[Symbol<T>]) -> &[Symbol<T>] {
    let start = symbols
        .iter()
        .position(|s| !s.is_blank())
        .unwrap_or(symbols.len());
    let end = symbols
        .iter()
        .rposition(|s| !s.is_blank())
        .map_or(start, |i| i + 1);

    &symbols[start..end]
}

/// Errors raised while building a [`TransitionTable`](crate::TransitionTable).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// No transitions were supplied.
    #[error("Transition table must contain at least one transition")]
    Empty,
    /// Two transitions share the same domain.
    #[error("Duplicate transition domain: {0}")]
    DuplicateDomain(String),
    /// No domain starts from the initial state.
    #[error("No transition starts from the Initial state")]
    MissingInitial,
    /// No range leads to the accept state.
    #[error("No transition leads to the Accept state")]
    MissingAccept,
    /// A domain uses `Accept` or `Reject` as its state.
    #[error("Finish state used in transition domain: {0}")]
    FinishStateInDomain(String),
    /// A range uses `Initial` as its state.
    #[error("Initial state used in transition range: {0}")]
    InitialStateInRange(String),
    /// A domain reads from zero tapes.
    #[error("Transition domain reads no symbols: {0}")]
    EmptyDomain(String),
    /// A range writes to a different number of tapes than its domain reads.
    #[error("Transition range covers {range} tapes but its domain covers {domain}")]
    ArityMismatch { domain: usize, range: usize },
    /// Transitions disagree about how many tapes the machine has.
    #[error("Inconsistent tape count: expected {expected}, found {found}")]
    InconsistentTapeCount { expected: usize, found: usize },
}

/// Raised by a table lookup when no transition is defined for a domain.
///
/// The engine treats this as the implicit reject rule; it never reaches callers
/// of the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No transition defined for {0}")]
pub struct DomainNotFound(pub String);

/// Errors raised while building a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("Step limit must be at least 1, got {0}")]
    InvalidStepLimit(u64),
    #[error("Time limit must be greater than zero")]
    InvalidTimeLimit,
    #[error("Composite constraint requires at least one constraint")]
    EmptyConstraintList,
}

/// Errors raised by [`ComputationState`](crate::ComputationState) updates.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ComputationError {
    /// The computation already reached a finish state.
    #[error("Computation already finished in state {0}")]
    Finished(String),
}

/// A runtime fault that aborted a computation mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum StepFault {
    #[error(transparent)]
    Computation(#[from] ComputationError),
    /// A transition application or constraint evaluation panicked.
    #[error("Step panicked: {0}")]
    Panic(String),
}

/// Usage errors returned synchronously by the machine's control surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A run is already active.
    #[error("A computation is already in progress ({0} mode)")]
    AlreadyRunning(ComputationMode),
    /// `step` was called without an active manual run.
    #[error("No manual computation is in progress")]
    NoManualRun,
    /// An abort was requested with no active run.
    #[error("No computation is in progress")]
    NotRunning,
    /// The background task driving an automatic run could not be joined.
    #[error("Background computation failed: {0}")]
    BackgroundTask(String),
}

/// Errors raised by the built-in program catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("Program not found: {0}")]
    NotFound(String),
    #[error("Program index {0} out of range")]
    IndexOutOfRange(usize),
    #[error("Invalid program table: {0}")]
    Table(#[from] TableError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hasher;

    fn hash_of<V: Hash>(value: &V) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_direction_serialization() {
        let left_json = serde_json::to_string(&Direction::Left).unwrap();
        let right_json = serde_json::to_string(&Direction::Right).unwrap();

        assert_eq!(left_json, "\"Left\"");
        assert_eq!(right_json, "\"Right\"");

        let left: Direction = serde_json::from_str(&left_json).unwrap();
        assert_eq!(left, Direction::Left);
    }

    #[test]
    fn test_blank_differs_from_default_value() {
        let blank: Symbol<char> = Symbol::Blank;
        let default = Symbol::Value(char::default());

        assert_ne!(blank, default);
        assert_ne!(hash_of(&blank), hash_of(&default));
        assert_eq!(blank, Symbol::Blank);
    }

    #[test]
    fn test_sentinels_differ_from_default_value_state() {
        let default = State::Value(u32::default());

        for sentinel in [State::Initial, State::Accept, State::Reject] {
            assert_ne!(sentinel, default);
            assert_ne!(hash_of(&sentinel), hash_of(&default));
        }
        assert_ne!(State::<u32>::Accept, State::Reject);
    }

    #[test]
    fn test_finish_states() {
        assert!(State::<u8>::Accept.is_finish());
        assert!(State::<u8>::Reject.is_finish());
        assert!(!State::<u8>::Initial.is_finish());
        assert!(!State::Value(1u8).is_finish());
    }

    #[test]
    fn test_single_tape_shapes() {
        let domain = TransitionDomain::new(State::<u8>::Initial, Symbol::Value('a'));
        let range = TransitionRange::new(State::<u8>::Accept, Symbol::Value('b'), Direction::Stay);

        assert_eq!(domain.tape_count(), 1);
        assert_eq!(domain.symbol(), Some(&Symbol::Value('a')));
        assert_eq!(range.tape_count(), 1);
        assert_eq!(range.actions[0], (Symbol::Value('b'), Direction::Stay));
    }

    #[test]
    fn test_symbols_from_text() {
        assert_eq!(
            symbols("a_b"),
            vec![Symbol::Value('a'), Symbol::Blank, Symbol::Value('b')]
        );
        assert_eq!(render(&symbols("a_b")), "a_b");
        assert!(symbols("").is_empty());
    }

    #[test]
    fn test_trim_strips_outer_blanks_only() {
        let raw = symbols("__a_b__");
        assert_eq!(render(trim(&raw)), "a_b");
        assert!(trim(&symbols("___")).is_empty());
        assert!(trim::<char>(&[]).is_empty());
    }

    #[test]
    fn test_error_display() {
        let error = EngineError::AlreadyRunning(ComputationMode::Manual);
        assert!(error.to_string().contains("manual"));

        let error = TableError::InconsistentTapeCount {
            expected: 2,
            found: 1,
        };
        assert!(error.to_string().contains("expected 2"));
    }

    fn any_state() -> impl Strategy<Value = State<u8>> {
        prop_oneof![
            Just(State::Initial),
            Just(State::Accept),
            Just(State::Reject),
            any::<u8>().prop_map(State::Value),
        ]
    }

    fn any_symbol() -> impl Strategy<Value = Symbol<u8>> {
        prop_oneof![Just(Symbol::Blank), any::<u8>().prop_map(Symbol::Value)]
    }

    proptest! {
        #[test]
        fn property_equal_states_hash_equally(a in any_state(), b in any_state()) {
            prop_assert_eq!(a == b, b == a);
            if a == b {
                prop_assert_eq!(hash_of(&a), hash_of(&b));
            }
        }

        #[test]
        fn property_equal_symbols_hash_equally(a in any_symbol(), b in any_symbol()) {
            prop_assert_eq!(a == b, b == a);
            if a == b {
                prop_assert_eq!(hash_of(&a), hash_of(&b));
            }
        }

        #[test]
        fn property_sentinels_never_equal_values(x in any::<u8>()) {
            for sentinel in [State::Initial, State::Accept, State::Reject] {
                prop_assert_ne!(sentinel, State::Value(x));
            }
            prop_assert_ne!(Symbol::Blank, Symbol::Value(x));
            prop_assert_eq!(State::Value(x), State::Value(x));
        }
    }

    fn tape_text() -> impl Strategy<Value = String> {
        proptest::string::string_regex("[_ab]{0,16}").unwrap()
    }

    proptest! {
        #[test]
        fn property_trim_is_idempotent(text in tape_text()) {
            let raw = symbols(&text);
            let once = trim(&raw);
            prop_assert_eq!(trim(once), once);
        }

        #[test]
        fn property_trim_removes_maximal_blank_affixes(text in tape_text()) {
            let raw = symbols(&text);
            let trimmed = trim(&raw);
            prop_assert!(trimmed.first().map_or(true, |s| !s.is_blank()));
            prop_assert!(trimmed.last().map_or(true, |s| !s.is_blank()));
            prop_assert_eq!(render(trimmed), text.trim_matches(INPUT_BLANK_SYMBOL));
        }

        #[test]
        fn property_trim_without_blanks_is_identity(text in "[ab]{0,16}") {
            let raw = symbols(&text);
            prop_assert_eq!(trim(&raw), raw.as_slice());
        }
    }
}
