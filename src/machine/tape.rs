//! Tape storage for the Turing-machine kinds.
//!
//! A tape is split at the head into two deques: `before` holds the cells left of the head and
//! `after` holds the head cell followed by the cells to its right. Every head move re-compacts
//! runs of blanks so that at most one leading and one trailing blank remain. A bounded tape
//! (one-way machines) starts with the left-bound sentinel as its first cell and never drops it.

use std::collections::VecDeque;

use crate::types::{Direction, Symbol};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    before: VecDeque<Symbol>,
    after: VecDeque<Symbol>,
    blank: Symbol,
    bounded: bool,
}

impl Tape {
    /// Creates a two-way tape holding `input` with the head on its first symbol.
    pub fn new(input: &[Symbol], blank: &str) -> Self {
        Self::with_left(input, blank, blank, false)
    }

    /// Creates a one-way tape whose first cell is `bound`, with the head on the first input
    /// symbol right of it.
    pub fn bounded(input: &[Symbol], blank: &str, bound: &str) -> Self {
        Self::with_left(input, blank, bound, true)
    }

    fn with_left(input: &[Symbol], blank: &str, left: &str, bounded: bool) -> Self {
        let mut after: VecDeque<Symbol> = input.iter().cloned().collect();
        if after.back().map_or(true, |last| last != blank) {
            after.push_back(blank.to_string());
        }
        Self {
            before: VecDeque::from([left.to_string()]),
            after,
            blank: blank.to_string(),
            bounded,
        }
    }

    /// The symbol under the head.
    pub fn read(&self) -> &str {
        self.after.front().map_or(self.blank.as_str(), String::as_str)
    }

    /// Overwrites the head cell with `symbol` and moves the head.
    pub fn write_and_move(&mut self, symbol: &str, direction: Direction) {
        match self.after.front_mut() {
            Some(cell) => *cell = symbol.to_string(),
            None => self.after.push_front(symbol.to_string()),
        }

        match direction {
            Direction::Right => {
                if let Some(cell) = self.after.pop_front() {
                    self.before.push_back(cell);
                }
                if self.after.is_empty() {
                    self.after.push_back(self.blank.clone());
                } else if !self.bounded && self.has_blank_prefix() {
                    self.before.pop_front();
                }
            }
            Direction::Left => {
                if let Some(cell) = self.before.pop_back() {
                    self.after.push_front(cell);
                }
                if self.before.is_empty() && !self.bounded {
                    self.before.push_back(self.blank.clone());
                }
                self.compact_right();
            }
            Direction::Stay => self.compact_right(),
        }
    }

    fn has_blank_prefix(&self) -> bool {
        self.before.len() > 1
            && self.before.iter().take(2).all(|cell| *cell == self.blank)
    }

    fn compact_right(&mut self) {
        let len = self.after.len();
        if len > 1 && self.after.iter().skip(len - 2).all(|cell| *cell == self.blank) {
            self.after.pop_back();
        } else if self.after.back().map_or(true, |last| *last != self.blank) {
            self.after.push_back(self.blank.clone());
        }
    }

    /// The number of stored cells.
    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw symbol stored in cell `index`, counting from the leftmost stored cell.
    pub fn cell(&self, index: usize) -> Option<&str> {
        if index < self.before.len() {
            self.before.get(index).map(String::as_str)
        } else {
            self.after.get(index - self.before.len()).map(String::as_str)
        }
    }

    /// The index of the head cell.
    pub fn head(&self) -> usize {
        self.before.len()
    }

    pub fn blank(&self) -> &str {
        &self.blank
    }

    /// Iterates over the stored cells from left to right.
    pub fn cells(&self) -> impl Iterator<Item = &Symbol> {
        self.before.iter().chain(self.after.iter())
    }

    /// The non-blank content of the tape, left to right, skipping `ignore` as well.
    pub fn content(&self, ignore: &[&str]) -> String {
        self.cells()
            .filter(|cell| **cell != self.blank && !ignore.contains(&cell.as_str()))
            .map(String::as_str)
            .collect()
    }
}
