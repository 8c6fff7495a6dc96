//! Reductions between the Turing-machine kinds.

use std::collections::{BTreeSet, VecDeque};

use super::states_with;
use crate::key;
use crate::machine::{Mtm, OneTm, Tm, DEFAULT_BOUND};
use crate::namespace::{product, SyntheticNamespace};
use crate::table::TransitionTable;
use crate::types::{Direction, State, Symbol, TransitionArgument, TransitionResult};

/// Embeds a Turing machine as a multitape machine with one tape.
pub(super) fn tm_mtm(tm: &Tm) -> Mtm {
    Mtm::new(
        1,
        tm.start.clone(),
        tm.accept.clone(),
        tm.reject.clone(),
        tm.blank.clone(),
        tm.table.clone(),
    )
}

/// Simulates a multitape machine on one tape of multi-track cells.
///
/// The simulated region lies between a left and a right end marker. Each cell holds one
/// `(symbol, mark)` pair per tape, where the mark tells whether the head of that tape is on
/// the cell, or is about to move onto the next cell to the right.
pub(super) fn mtm_tm(mtm: &Mtm) -> Tm {
    if mtm.tapes == 1 {
        return Tm::new(
            mtm.start.clone(),
            mtm.accept.clone(),
            mtm.reject.clone(),
            mtm.blank.clone(),
            mtm.table.clone(),
        );
    }
    Tracks::new(mtm).build()
}

/// Where a simulated head stands relative to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Mark {
    Off,
    Head,
    /// The head leaves this cell for the next cell of its track during the next read sweep.
    Pending,
}

impl Mark {
    pub(super) const ALL: [Mark; 3] = [Mark::Off, Mark::Head, Mark::Pending];

    pub(super) fn suffix(self) -> &'static str {
        match self {
            Mark::Off => "",
            Mark::Head => "^",
            Mark::Pending => ">",
        }
    }
}

type Cell = Vec<(Symbol, Mark)>;

/// What the simulating machine is doing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    /// Sweeping right: collects the symbols under the head marks and moves pending marks.
    Read {
        state: State,
        seen: Vec<Option<Symbol>>,
        carry: Vec<bool>,
    },
    /// Sweeping left from the right marker: writes and handles left moves.
    Write {
        rule: TransitionResult,
        done: Vec<bool>,
        pending: Vec<bool>,
    },
    /// Going back to the left marker.
    Rewind { state: State },
    /// The right marker became a cell; the marker goes on the blank after it.
    GrowRight {
        state: State,
        seen: Vec<Option<Symbol>>,
    },
    /// The left marker became a cell; the marker goes on the blank before it.
    GrowLeft { state: State },
    /// Replaces every cell by its first-track symbol, then accepts.
    Decode,
}

struct Tracks<'a> {
    mtm: &'a Mtm,
    cells: Vec<Cell>,
    states: SyntheticNamespace,
    symbols: SyntheticNamespace,
    start: State,
    accept: State,
    reject: State,
    left: Symbol,
    right: Symbol,
    table: TransitionTable,
    queue: VecDeque<Phase>,
    visited: BTreeSet<Phase>,
}

impl<'a> Tracks<'a> {
    fn new(mtm: &'a Mtm) -> Self {
        let alphabets: Vec<BTreeSet<Symbol>> = (0..mtm.tapes).map(|tape| mtm.alphabet(tape)).collect();

        let mut symbols = SyntheticNamespace::new();
        for alphabet in &alphabets {
            symbols.reserve_all("symbol", alphabet);
        }
        let left = symbols.declare(key!["left"], "[");
        let right = symbols.declare(key!["right"], "]");

        let tracks: Vec<Vec<(Symbol, Mark)>> = alphabets
            .iter()
            .map(|alphabet| {
                alphabet
                    .iter()
                    .flat_map(|symbol| Mark::ALL.map(|mark| (symbol.clone(), mark)))
                    .collect()
            })
            .collect();

        let mut states = SyntheticNamespace::new();
        let start = states.declare(key!["start"], &mtm.start);
        let accept = states.declare(key!["accept"], &mtm.accept);
        let reject = states.declare(key!["reject"], &mtm.reject);

        Self {
            mtm,
            cells: product(&tracks),
            states,
            symbols,
            start,
            accept,
            reject,
            left,
            right,
            table: TransitionTable::new(),
            queue: VecDeque::new(),
            visited: BTreeSet::new(),
        }
    }

    fn build(mut self) -> Tm {
        self.lay_out_input();
        while let Some(phase) = self.queue.pop_front() {
            let from = self.label(&phase);
            match phase {
                Phase::Read { state, seen, carry } => self.read(&from, &state, &seen, &carry),
                Phase::Write { rule, done, pending } => self.write(&from, &rule, &done, &pending),
                Phase::Rewind { state } => self.rewind(&from, &state),
                Phase::GrowRight { state, seen } => {
                    let carry = vec![false; seen.len()];
                    let (blank, right) = (self.mtm.blank.clone(), self.right.clone());
                    self.go(&from, &blank, Phase::Read { state, seen, carry }, &right, Direction::Stay);
                }
                Phase::GrowLeft { state } => {
                    let (blank, left) = (self.mtm.blank.clone(), self.left.clone());
                    let next = self.begin(&state);
                    self.go(&from, &blank, next, &left, Direction::Stay);
                }
                Phase::Decode => self.decode(&from),
            }
        }

        Tm::new(self.start, self.accept, self.reject, self.mtm.blank.clone(), self.table)
    }

    /// Rewrites the input between the end markers, every head on the first cell.
    fn lay_out_input(&mut self) {
        let mtm = self.mtm;
        let n = mtm.tapes;
        let blank = mtm.blank.clone();
        let to_left = self
            .states
            .declare(key!["init", "left"], &format!("{}-left", mtm.start));
        let first = self
            .states
            .declare(key!["init", "first"], &format!("{}-first", mtm.start));
        let rest = self
            .states
            .declare(key!["init", "rest"], &format!("{}-rest", mtm.start));
        let (start, left, right) = (self.start.clone(), self.left.clone(), self.right.clone());

        self.table
            .set_move(to_left.clone(), blank.clone(), first.clone(), left, Direction::Right);
        for symbol in mtm.alphabet(0) {
            self.table
                .set_move(start.clone(), symbol.clone(), to_left.clone(), symbol.clone(), Direction::Left);

            let track = |mark: Mark| -> Cell {
                (0..n)
                    .map(|tape| {
                        let on_tape = if tape == 0 { &symbol } else { &blank };
                        (on_tape.clone(), mark)
                    })
                    .collect()
            };
            let head = self.cell_label(&track(Mark::Head));
            self.table
                .set_move(first.clone(), symbol.clone(), rest.clone(), head, Direction::Right);
            if symbol != blank {
                let plain = self.cell_label(&track(Mark::Off));
                self.table
                    .set_move(rest.clone(), symbol.clone(), rest.clone(), plain, Direction::Right);
            }
        }

        let rewind = Phase::Rewind {
            state: mtm.start.clone(),
        };
        self.go(&rest, &blank, rewind, &right, Direction::Left);
    }

    fn begin(&self, state: &str) -> Phase {
        if state == self.mtm.accept {
            return Phase::Decode;
        }
        Phase::Read {
            state: state.to_string(),
            seen: vec![None; self.mtm.tapes],
            carry: vec![false; self.mtm.tapes],
        }
    }

    fn read(&mut self, from: &str, state: &str, seen: &[Option<Symbol>], carry: &[bool]) {
        let mtm = self.mtm;
        let n = mtm.tapes;
        let left = self.left.clone();
        let right = self.right.clone();

        if seen.iter().all(Option::is_none) && !carry.contains(&true) {
            self.table.pass(from, &left, Direction::Right);
        }

        for i in 0..self.cells.len() {
            let cell = self.cells[i].clone();
            let valid = cell
                .iter()
                .enumerate()
                .all(|(tape, (_, mark))| *mark == Mark::Off || (seen[tape].is_none() && !carry[tape]));
            if !valid {
                continue;
            }

            let mut next_seen = seen.to_vec();
            let mut next_carry = vec![false; n];
            let mut written = cell.clone();
            for (tape, (symbol, mark)) in cell.iter().enumerate() {
                if carry[tape] {
                    written[tape].1 = Mark::Head;
                    next_seen[tape] = Some(symbol.clone());
                    continue;
                }
                match mark {
                    Mark::Head => next_seen[tape] = Some(symbol.clone()),
                    Mark::Pending => {
                        written[tape].1 = Mark::Off;
                        next_carry[tape] = true;
                    }
                    Mark::Off => {}
                }
            }

            let (read, write) = (self.cell_label(&cell), self.cell_label(&written));
            let next = Phase::Read {
                state: state.to_string(),
                seen: next_seen,
                carry: next_carry,
            };
            self.go(from, &read, next, &write, Direction::Right);
        }

        if carry.contains(&true) {
            let grown: Cell = carry
                .iter()
                .map(|moved| {
                    let mark = if *moved { Mark::Head } else { Mark::Off };
                    (mtm.blank.clone(), mark)
                })
                .collect();
            let seen = seen
                .iter()
                .zip(carry)
                .map(|(symbol, moved)| if *moved { Some(mtm.blank.clone()) } else { symbol.clone() })
                .collect();
            let write = self.cell_label(&grown);
            let next = Phase::GrowRight {
                state: state.to_string(),
                seen,
            };
            self.go(from, &right, next, &write, Direction::Right);
            return;
        }

        let Some(symbols) = seen.iter().cloned().collect::<Option<Vec<Symbol>>>() else {
            return;
        };
        match mtm.table.get(&TransitionArgument::new(state, symbols)) {
            Some(rule) if rule.state != mtm.reject => {
                let next = Phase::Write {
                    rule: rule.clone(),
                    done: vec![false; n],
                    pending: vec![false; n],
                };
                self.go(from, &right, next, &right, Direction::Left);
            }
            _ => {
                let reject = self.reject.clone();
                self.table
                    .set_move(from, right.clone(), reject, right, Direction::Stay);
            }
        }
    }

    fn write(&mut self, from: &str, rule: &TransitionResult, done: &[bool], pending: &[bool]) {
        let n = self.mtm.tapes;

        for i in 0..self.cells.len() {
            let cell = self.cells[i].clone();
            let valid = cell.iter().enumerate().all(|(tape, (_, mark))| match mark {
                Mark::Off => true,
                Mark::Head => !done[tape],
                Mark::Pending => false,
            });
            if !valid {
                continue;
            }

            let mut written = cell.clone();
            let mut next_done = done.to_vec();
            let mut next_pending = vec![false; n];
            for tape in 0..n {
                if pending[tape] {
                    written[tape].1 = Mark::Head;
                } else if cell[tape].1 == Mark::Head {
                    if let Some(symbol) = rule.symbols.get(tape) {
                        written[tape].0 = symbol.clone();
                    }
                    written[tape].1 = match rule.directions.get(tape).copied().unwrap_or(Direction::Stay) {
                        Direction::Stay => Mark::Head,
                        Direction::Right => Mark::Pending,
                        Direction::Left => {
                            next_pending[tape] = true;
                            Mark::Off
                        }
                    };
                    next_done[tape] = true;
                }
            }

            let next = if next_done.iter().all(|d| *d) && !next_pending.contains(&true) {
                Phase::Rewind {
                    state: rule.state.clone(),
                }
            } else {
                Phase::Write {
                    rule: rule.clone(),
                    done: next_done,
                    pending: next_pending,
                }
            };
            let (read, write) = (self.cell_label(&cell), self.cell_label(&written));
            self.go(from, &read, next, &write, Direction::Left);
        }

        if done.iter().all(|d| *d) && pending.contains(&true) {
            let grown: Cell = pending
                .iter()
                .map(|moved| {
                    let mark = if *moved { Mark::Head } else { Mark::Off };
                    (self.mtm.blank.clone(), mark)
                })
                .collect();
            let (left, write) = (self.left.clone(), self.cell_label(&grown));
            let next = Phase::GrowLeft {
                state: rule.state.clone(),
            };
            self.go(from, &left, next, &write, Direction::Left);
        }
    }

    fn rewind(&mut self, from: &str, state: &str) {
        for i in 0..self.cells.len() {
            let cell = self.cells[i].clone();
            let label = self.cell_label(&cell);
            self.table.pass(from, &label, Direction::Left);
        }
        let left = self.left.clone();
        let next = self.begin(state);
        self.go(from, &left, next, &left, Direction::Stay);
    }

    fn decode(&mut self, from: &str) {
        let blank = self.mtm.blank.clone();
        let (left, right, accept) = (self.left.clone(), self.right.clone(), self.accept.clone());
        self.table
            .set_move(from, left, from, blank.clone(), Direction::Right);
        for i in 0..self.cells.len() {
            let cell = self.cells[i].clone();
            let label = self.cell_label(&cell);
            let first = cell[0].0.clone();
            self.table.set_move(from, label, from, first, Direction::Right);
        }
        self.table.set_move(from, right, accept, blank, Direction::Stay);
    }

    /// Adds a rule into `to`, scheduling `to` for expansion the first time it is seen.
    fn go(&mut self, from: &str, read: &str, to: Phase, write: &str, direction: Direction) {
        let target = self.label(&to);
        self.table.set_move(from, read, target, write, direction);
        if self.visited.insert(to.clone()) {
            self.queue.push_back(to);
        }
    }

    fn cell_label(&mut self, cell: &[(Symbol, Mark)]) -> Symbol {
        let mut key = key!["cell"];
        let mut parts = Vec::with_capacity(cell.len());
        for (symbol, mark) in cell {
            key.push(symbol.clone());
            key.push(format!("{mark:?}"));
            parts.push(format!("{symbol}{}", mark.suffix()));
        }
        self.symbols.declare(key, &parts.join("|"))
    }

    fn label(&mut self, phase: &Phase) -> State {
        let seen_parts = |seen: &[Option<Symbol>]| -> Vec<String> {
            seen.iter()
                .map(|symbol| match symbol {
                    Some(symbol) => format!("+{symbol}"),
                    None => "-".to_string(),
                })
                .collect()
        };
        let flags = |bits: &[bool]| -> String { bits.iter().map(|b| if *b { '1' } else { '0' }).collect() };

        let (key, base) = match phase {
            Phase::Read { state, seen, carry } => {
                let mut key = key!["read", state, flags(carry)];
                key.extend(seen_parts(seen));
                let base = if seen.iter().all(Option::is_none) && !carry.contains(&true) {
                    state.clone()
                } else {
                    let seen: Vec<&str> = seen.iter().map(|s| s.as_deref().unwrap_or("?")).collect();
                    format!("{state}-read[{}]", seen.join(","))
                };
                (key, base)
            }
            Phase::Write { rule, done, pending } => {
                let mut key = key!["write", rule.state, flags(done), flags(pending)];
                key.extend(rule.symbols.iter().cloned());
                key.extend(rule.directions.iter().map(ToString::to_string));
                (key, format!("{}-write", rule.state))
            }
            Phase::Rewind { state } => (key!["rewind", state], format!("{state}-rewind")),
            Phase::GrowRight { state, seen } => {
                let mut key = key!["grow-right", state];
                key.extend(seen_parts(seen));
                (key, format!("{state}-grow-right"))
            }
            Phase::GrowLeft { state } => (key!["grow-left", state], format!("{state}-grow-left")),
            Phase::Decode => (key!["decode"], "decode".to_string()),
        };
        self.states.declare(key, &base)
    }
}

/// Folds the two-way tape onto a one-way tape.
///
/// Cell `i` of the one-way tape holds the pair (cell `i`, cell `-i-1`) of the two-way tape.
/// A pair whose lower half is blank is written as its upper symbol alone, so the input needs
/// no preparation. Upper-half states keep their names and lower-half states are marked; the
/// head flips halves whenever it steps onto the bound.
pub(super) fn tm_one_tm(tm: &Tm) -> OneTm {
    let mut alphabet = tm.alphabet();
    alphabet.insert(tm.blank.clone());

    let mut symbols = SyntheticNamespace::new();
    symbols.reserve_all("symbol", &alphabet);
    let bound = symbols.declare(key!["bound"], DEFAULT_BOUND);
    let mut pair = |upper: &str, lower: &str| -> Symbol {
        if lower == tm.blank {
            upper.to_string()
        } else {
            symbols.declare(key!["pair", upper, lower], &format!("{upper}|{lower}"))
        }
    };

    let source = states_with(&tm.table, [tm.start.as_str(), tm.accept.as_str(), tm.reject.as_str()]);
    let halting = |state: &str| state == tm.accept || state == tm.reject;
    let mut states = SyntheticNamespace::new();
    states.reserve_all("state", &source);
    let mut half = |state: &str, lower: bool| -> State {
        if lower && !halting(state) {
            states.declare(key!["lower", state], state)
        } else {
            state.to_string()
        }
    };

    let mut table = TransitionTable::new();
    for (arg, res) in tm.table.entries() {
        if halting(&arg.state) {
            continue;
        }
        let (read, write, direction) = (arg.symbol(), res.symbol(), res.direction());
        for other in &alphabet {
            table.set_move(
                half(&arg.state, false),
                pair(read, other),
                half(&res.state, false),
                pair(write, other),
                direction,
            );
            table.set_move(
                half(&arg.state, true),
                pair(other, read),
                half(&res.state, true),
                pair(other, write),
                direction.reverse(),
            );
        }
    }
    for state in source.iter().filter(|state| !halting(state)) {
        let (upper, lower) = (half(state, false), half(state, true));
        table.set_move(upper.clone(), bound.clone(), lower.clone(), bound.clone(), Direction::Right);
        table.set_move(lower, bound.clone(), upper, bound.clone(), Direction::Right);
    }

    let table = table.remove_unreachable_states(&tm.start, Some(&tm.accept), Some(&tm.reject));
    OneTm::new(
        tm.start.clone(),
        tm.accept.clone(),
        tm.reject.clone(),
        tm.blank.clone(),
        bound,
        table,
    )
}

/// Runs a one-way machine on a two-way tape by writing the bound left of the input first.
///
/// On halting, the bound is erased and the head goes back to where the one-way machine left
/// it before the new accept or reject state is entered.
pub(super) fn one_tm_tm(tm: &OneTm) -> Tm {
    let mut alphabet = tm.alphabet();
    alphabet.insert(tm.blank.clone());

    let mut symbols = SyntheticNamespace::new();
    symbols.reserve_all("symbol", &alphabet);
    symbols.reserve(key!["bound"], &tm.bound);
    let mut marked = |symbol: &str| symbols.declare(key!["mark", symbol], symbol);

    let source = states_with(&tm.table, [tm.start.as_str(), tm.accept.as_str(), tm.reject.as_str()]);
    let mut states = SyntheticNamespace::new();
    states.reserve_all("state", &source);
    let start = states.declare(key!["start"], &tm.start);
    let place = states.declare(key!["place-bound"], &format!("{}-bound", tm.start));

    let mut table = tm
        .table
        .select(|arg| arg.state != tm.accept && arg.state != tm.reject);
    for symbol in &alphabet {
        table.set_move(start.clone(), symbol.clone(), place.clone(), symbol.clone(), Direction::Left);
    }
    table.set_move(place, tm.blank.clone(), tm.start.clone(), tm.bound.clone(), Direction::Right);

    // missing transitions reject through the cleanup below
    for state in source.iter().filter(|state| **state != tm.accept && **state != tm.reject) {
        for symbol in alphabet.iter().chain([&tm.bound]) {
            let arg = TransitionArgument::single(state.clone(), symbol.clone());
            if !table.contains(&arg) {
                table.set_move(state.clone(), symbol.clone(), tm.reject.clone(), symbol.clone(), Direction::Stay);
            }
        }
    }

    let mut finals = Vec::with_capacity(2);
    for halt in [&tm.accept, &tm.reject] {
        let last = states.declare(key!["final", halt], halt);
        let seek = states.declare(key!["seek", halt], &format!("{halt}-seek"));
        let back = states.declare(key!["return", halt], &format!("{halt}-return"));

        for symbol in &alphabet {
            let mark = marked(symbol);
            table.set_move(halt.clone(), symbol.clone(), seek.clone(), mark.clone(), Direction::Left);
            table.pass(&seek, symbol, Direction::Left);
            table.pass(&back, symbol, Direction::Right);
            table.set_move(back.clone(), mark, last.clone(), symbol.clone(), Direction::Stay);
        }
        table.set_move(halt.clone(), tm.bound.clone(), last.clone(), tm.blank.clone(), Direction::Stay);
        table.set_move(seek, tm.bound.clone(), back, tm.blank.clone(), Direction::Right);
        finals.push(last);
    }

    let (accept, reject) = (finals.remove(0), finals.remove(0));
    let table = table.remove_unreachable_states(&start, Some(&accept), Some(&reject));
    Tm::new(start, accept, reject, tm.blank.clone(), table)
}

/// Replaces every stay move by a right move followed by a left move back.
fn without_stays(
    table: &TransitionTable,
    states: &BTreeSet<State>,
    accept: &str,
    reject: &str,
    symbols: &BTreeSet<Symbol>,
) -> TransitionTable {
    let mut names = SyntheticNamespace::new();
    names.reserve_all("state", states);

    let mut result = TransitionTable::new();
    for (arg, res) in table.entries() {
        if arg.state == accept || arg.state == reject {
            continue;
        }
        if res.direction() != Direction::Stay {
            result.set(arg.clone(), res.clone());
            continue;
        }

        let back = names.declare(key!["back", res.state], &format!("{}-back", res.state));
        result.set(
            arg.clone(),
            TransitionResult::single(back.clone(), res.symbol(), Direction::Right),
        );
        for symbol in symbols {
            result.set_move(back.clone(), symbol.clone(), res.state.clone(), symbol.clone(), Direction::Left);
        }
    }
    result
}

pub(super) fn tm_no_stay(tm: &Tm) -> Tm {
    let mut symbols = tm.alphabet();
    symbols.insert(tm.blank.clone());
    let states = states_with(&tm.table, [tm.start.as_str(), tm.accept.as_str(), tm.reject.as_str()]);

    let table = without_stays(&tm.table, &states, &tm.accept, &tm.reject, &symbols)
        .remove_unreachable_states(&tm.start, Some(&tm.accept), Some(&tm.reject));
    Tm::new(
        tm.start.clone(),
        tm.accept.clone(),
        tm.reject.clone(),
        tm.blank.clone(),
        table,
    )
}

/// Like [`tm_no_stay`]. The cell right of the head never holds the bound.
pub(super) fn one_tm_no_stay(tm: &OneTm) -> OneTm {
    let mut symbols = tm.alphabet();
    symbols.insert(tm.blank.clone());
    let states = states_with(&tm.table, [tm.start.as_str(), tm.accept.as_str(), tm.reject.as_str()]);

    let table = without_stays(&tm.table, &states, &tm.accept, &tm.reject, &symbols)
        .remove_unreachable_states(&tm.start, Some(&tm.accept), Some(&tm.reject));
    OneTm::new(
        tm.start.clone(),
        tm.accept.clone(),
        tm.reject.clone(),
        tm.blank.clone(),
        tm.bound.clone(),
        table,
    )
}
