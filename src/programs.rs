//! A catalog of ready-made machines, used by hosts for demos and by tests as
//! realistic fixtures.

use crate::table::TransitionTable;
use crate::types::{
    Direction, ProgramError, State, Symbol, TableError, Transition, TransitionDomain,
    TransitionRange, INPUT_BLANK_SYMBOL,
};

/// State type used by every built-in program.
pub type ProgramState = &'static str;

/// One row of a single-tape program: `(state, read, next, write, direction)`.
type Row = (&'static str, char, &'static str, char, Direction);

/// Describes a built-in program without building its table.
#[derive(Debug, Clone, Copy)]
pub struct ProgramInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// An input the program is meant to be run on.
    pub sample_input: &'static str,
    build: fn() -> Result<TransitionTable<ProgramState, char>, TableError>,
}

/// A built-in program with its validated table.
#[derive(Debug, Clone)]
pub struct Program {
    pub name: &'static str,
    pub description: &'static str,
    pub sample_input: &'static str,
    pub table: TransitionTable<ProgramState, char>,
}

pub static PROGRAMS: [ProgramInfo; 6] = [
    ProgramInfo {
        name: "binary-increment",
        description: "Adds one to a binary number",
        sample_input: "1011",
        build: binary_increment,
    },
    ProgramInfo {
        name: "bit-flip",
        description: "Inverts every bit, accepting at the first blank",
        sample_input: "10010",
        build: bit_flip,
    },
    ProgramInfo {
        name: "even-parity",
        description: "Accepts binary strings with an even number of ones",
        sample_input: "1101",
        build: even_parity,
    },
    ProgramInfo {
        name: "busy-beaver-2",
        description: "The 2-state busy beaver; halts after 6 steps with four ones",
        sample_input: "",
        build: busy_beaver_2,
    },
    ProgramInfo {
        name: "endless",
        description: "Walks right forever on blank input; use with a constraint",
        sample_input: "",
        build: endless,
    },
    ProgramInfo {
        name: "multi-tape-copy",
        description: "Copies the input from tape 1 to tape 2",
        sample_input: "1101",
        build: multi_tape_copy,
    },
];

/// Lookup over [`PROGRAMS`].
pub struct ProgramManager;

impl ProgramManager {
    /// Returns every built-in program description.
    pub fn list() -> &'static [ProgramInfo] {
        &PROGRAMS
    }

    /// Get the number of available programs
    pub fn get_program_count() -> usize {
        PROGRAMS.len()
    }

    /// Get a program by its index
    pub fn get_program_by_index(index: usize) -> Result<Program, ProgramError> {
        PROGRAMS
            .get(index)
            .ok_or(ProgramError::IndexOutOfRange(index))
            .and_then(Self::build)
    }

    /// Get a program by its name
    pub fn get_program_by_name(name: &str) -> Result<Program, ProgramError> {
        PROGRAMS
            .iter()
            .find(|info| info.name == name)
            .ok_or_else(|| ProgramError::NotFound(name.to_string()))
            .and_then(Self::build)
    }

    fn build(info: &ProgramInfo) -> Result<Program, ProgramError> {
        Ok(Program {
            name: info.name,
            description: info.description,
            sample_input: info.sample_input,
            table: (info.build)()?,
        })
    }
}

fn state(name: &'static str) -> State<ProgramState> {
    match name {
        "start" => State::Initial,
        "accept" => State::Accept,
        "reject" => State::Reject,
        _ => State::Value(name),
    }
}

fn symbol(c: char) -> Symbol<char> {
    if c == INPUT_BLANK_SYMBOL {
        Symbol::Blank
    } else {
        Symbol::Value(c)
    }
}

fn single_tape(rows: &[Row]) -> Result<TransitionTable<ProgramState, char>, TableError> {
    TransitionTable::new(rows.iter().map(|&(from, read, to, write, direction)| {
        Transition::new(
            TransitionDomain::new(state(from), symbol(read)),
            TransitionRange::new(state(to), symbol(write), direction),
        )
    }))
}

fn binary_increment() -> Result<TransitionTable<ProgramState, char>, TableError> {
    use Direction::*;
    single_tape(&[
        ("start", '0', "scan", '0', Right),
        ("start", '1', "scan", '1', Right),
        ("start", '_', "carry", '_', Left),
        ("scan", '0', "scan", '0', Right),
        ("scan", '1', "scan", '1', Right),
        ("scan", '_', "carry", '_', Left),
        ("carry", '1', "carry", '0', Left),
        ("carry", '0', "accept", '1', Stay),
        ("carry", '_', "accept", '1', Stay),
    ])
}

fn bit_flip() -> Result<TransitionTable<ProgramState, char>, TableError> {
    use Direction::*;
    single_tape(&[
        ("start", '0', "flip", '1', Right),
        ("start", '1', "flip", '0', Right),
        ("start", '_', "accept", '_', Stay),
        ("flip", '0', "flip", '1', Right),
        ("flip", '1', "flip", '0', Right),
        ("flip", '_', "accept", '_', Stay),
    ])
}

/// `odd` has no rule for blank, so odd parity halts through the implicit reject.
fn even_parity() -> Result<TransitionTable<ProgramState, char>, TableError> {
    use Direction::*;
    single_tape(&[
        ("start", '0', "even", '0', Right),
        ("start", '1', "odd", '1', Right),
        ("start", '_', "accept", '_', Stay),
        ("even", '0', "even", '0', Right),
        ("even", '1', "odd", '1', Right),
        ("even", '_', "accept", '_', Stay),
        ("odd", '0', "odd", '0', Right),
        ("odd", '1', "even", '1', Right),
    ])
}

/// Machine state `A` is split into `start` and `a` since `b` returns to it.
fn busy_beaver_2() -> Result<TransitionTable<ProgramState, char>, TableError> {
    use Direction::*;
    single_tape(&[
        ("start", '_', "b", '1', Right),
        ("start", '1', "b", '1', Left),
        ("a", '_', "b", '1', Right),
        ("a", '1', "b", '1', Left),
        ("b", '_', "a", '1', Left),
        ("b", '1', "accept", '1', Right),
    ])
}

fn endless() -> Result<TransitionTable<ProgramState, char>, TableError> {
    use Direction::*;
    single_tape(&[
        ("start", '_', "walk", '_', Right),
        ("walk", '_', "walk", '_', Right),
        ("walk", 'x', "accept", 'x', Stay),
    ])
}

fn multi_tape_copy() -> Result<TransitionTable<ProgramState, char>, TableError> {
    let copy = |from: &'static str, bit: char| {
        Transition::new(
            TransitionDomain::multi(state(from), vec![symbol(bit), Symbol::Blank]),
            TransitionRange::multi(
                state("copy"),
                vec![
                    (symbol(bit), Direction::Right),
                    (symbol(bit), Direction::Right),
                ],
            ),
        )
    };
    let done = |from: &'static str| {
        Transition::new(
            TransitionDomain::multi(state(from), vec![Symbol::Blank, Symbol::Blank]),
            TransitionRange::multi(
                State::Accept,
                vec![(Symbol::Blank, Direction::Left), (Symbol::Blank, Direction::Left)],
            ),
        )
    };

    TransitionTable::new(vec![
        copy("start", '0'),
        copy("start", '1'),
        copy("copy", '0'),
        copy("copy", '1'),
        done("start"),
        done("copy"),
    ])
}
