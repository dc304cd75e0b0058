//! A bidirectional tape that grows lazily in either direction.

use std::collections::VecDeque;

use tracing::trace;

use crate::types::{Direction, Symbol};

/// The read/write surface of a single tape.
///
/// The tape always holds at least one cell. Moving the head past either end
/// appends a fresh `Blank`, so previously written cells are never lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape<T> {
    cells: VecDeque<Symbol<T>>,
    head: usize,
}

impl<T: Clone> Tape<T> {
    /// Builds a tape from its initial contents, with the head on the first cell.
    ///
    /// Empty input yields a tape holding a single `Blank`.
    pub fn new<I>(input: I) -> Self
    where
        I: IntoIterator<Item = Symbol<T>>,
    {
        let mut cells: VecDeque<Symbol<T>> = input.into_iter().collect();
        if cells.is_empty() {
            cells.push_back(Symbol::Blank);
        }

        Self { cells, head: 0 }
    }

    /// Returns the symbol under the head.
    pub fn read(&self) -> &Symbol<T> {
        &self.cells[self.head]
    }

    /// Replaces the symbol under the head.
    pub fn write(&mut self, symbol: Symbol<T>) {
        self.cells[self.head] = symbol;
    }

    /// Moves the head one cell, extending the tape with a `Blank` when it would
    /// leave the written region. Returns the symbol now under the head.
    pub fn move_head(&mut self, direction: Direction) -> &Symbol<T> {
        match direction {
            Direction::Left => {
                if self.head == 0 {
                    trace!(len = self.cells.len() + 1, "tape_extend_left");
                    self.cells.push_front(Symbol::Blank);
                } else {
                    self.head -= 1;
                }
            }
            Direction::Right => {
                self.head += 1;
                if self.head == self.cells.len() {
                    trace!(len = self.cells.len() + 1, "tape_extend_right");
                    self.cells.push_back(Symbol::Blank);
                }
            }
            Direction::Stay => {}
        }

        self.read()
    }

    /// Resets the tape to a single `Blank` cell, dropping its previous contents.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.cells.push_back(Symbol::Blank);
        self.head = 0;
    }

    /// Returns the head's offset from the leftmost cell.
    pub fn head(&self) -> usize {
        self.head
    }

    /// Returns the number of cells visited so far.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// A tape is never empty; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates over every cell from left to right without moving the head.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol<T>> {
        self.cells.iter()
    }

    /// Returns a copy of every cell from left to right.
    pub fn contents(&self) -> Vec<Symbol<T>> {
        self.cells.iter().cloned().collect()
    }
}
