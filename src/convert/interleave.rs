//! Alternate tape layouts that interleave several logical cells on neighbouring cells.

use std::collections::{BTreeSet, VecDeque};

use super::states_with;
use super::tape::{mtm_tm, Mark};
use crate::key;
use crate::machine::{Mtm, OneTm, Tm, DEFAULT_BOUND};
use crate::namespace::SyntheticNamespace;
use crate::table::TransitionTable;
use crate::types::{Direction, State, Symbol, TransitionArgument, TransitionResult};

/// Runs a Turing machine on a one-way tape that alternates the cells of both tape halves.
///
/// Cell `k >= 0` of the two-way tape lives at position `2k + 1` right of the bound and cell
/// `-k` at position `2k`. The input is spread over the odd positions before the first step.
/// Upper-half states keep their names and lower-half states are marked.
pub(super) fn tm_one_tm_interleaved(tm: &Tm) -> OneTm {
    Halves::new(tm).build()
}

struct Halves<'a> {
    tm: &'a Tm,
    alphabet: BTreeSet<Symbol>,
    bound: Symbol,
    states: SyntheticNamespace,
    table: TransitionTable,
}

impl<'a> Halves<'a> {
    fn new(tm: &'a Tm) -> Self {
        let mut alphabet = tm.alphabet();
        alphabet.insert(tm.blank.clone());

        let mut symbols = SyntheticNamespace::new();
        symbols.reserve_all("symbol", &alphabet);
        let bound = symbols.declare(key!["bound"], DEFAULT_BOUND);

        let source = states_with(&tm.table, [tm.start.as_str(), tm.accept.as_str(), tm.reject.as_str()]);
        let mut states = SyntheticNamespace::new();
        states.reserve_all("state", &source);

        Self {
            tm,
            alphabet,
            bound,
            states,
            table: TransitionTable::new(),
        }
    }

    fn build(mut self) -> OneTm {
        let tm = self.tm;
        let start = self.spread_input();
        for (arg, res) in tm.table.entries() {
            if !self.halting(&arg.state) {
                self.step(arg, res, false);
                self.step(arg, res, true);
            }
        }

        let table = self
            .table
            .remove_unreachable_states(&start, Some(&tm.accept), Some(&tm.reject));
        OneTm::new(
            start,
            tm.accept.clone(),
            tm.reject.clone(),
            tm.blank.clone(),
            self.bound,
            table,
        )
    }

    fn halting(&self, state: &str) -> bool {
        state == self.tm.accept || state == self.tm.reject
    }

    fn half(&mut self, state: &str, lower: bool) -> State {
        if lower && !self.halting(state) {
            self.states.declare(key!["lower", state], state)
        } else {
            state.to_string()
        }
    }

    fn helper(&mut self, kind: &str, state: &str) -> State {
        self.states.declare(key![kind, state], &format!("{state}-{kind}"))
    }

    /// Moves over any cell but the bound.
    fn every_cell(&mut self, from: &str, to: &str, direction: Direction) {
        for symbol in &self.alphabet {
            self.table
                .set_move(from, symbol.clone(), to, symbol.clone(), direction);
        }
    }

    /// Opens a blank gap after every input symbol, then returns to the first one.
    fn spread_input(&mut self) -> State {
        let tm = self.tm;
        let blank = tm.blank.clone();
        let spread = self.helper("spread", &tm.start);
        let open = self.helper("open", &tm.start);
        let back = self.helper("back", &tm.start);
        let home = self.helper("home", &tm.start);
        let input: Vec<Symbol> = self.alphabet.iter().filter(|s| **s != blank).cloned().collect();

        for symbol in &input {
            let carry = self.helper(&format!("carry-{symbol}"), &tm.start);
            self.table
                .set_move(spread.clone(), symbol.clone(), open.clone(), symbol.clone(), Direction::Right);
            self.table
                .set_move(open.clone(), symbol.clone(), carry.clone(), blank.clone(), Direction::Right);
            for next in &input {
                let shifted = self.helper(&format!("carry-{next}"), &tm.start);
                self.table
                    .set_move(carry.clone(), next.clone(), shifted, symbol.clone(), Direction::Right);
            }
            self.table
                .set_move(carry, blank.clone(), back.clone(), symbol.clone(), Direction::Left);
            self.table.pass(&back, symbol, Direction::Left);
        }
        self.table
            .set_move(back, blank.clone(), spread.clone(), blank.clone(), Direction::Right);
        self.table
            .set_move(spread.clone(), blank.clone(), home.clone(), blank.clone(), Direction::Left);
        self.table
            .set_move(open, blank.clone(), home.clone(), blank, Direction::Left);

        self.every_cell(&home, &home, Direction::Left);
        let (bound, first) = (self.bound.clone(), self.half(&tm.start, false));
        self.table
            .set_move(home, bound.clone(), first, bound, Direction::Right);
        spread
    }

    fn step(&mut self, arg: &TransitionArgument, res: &TransitionResult, lower: bool) {
        let from = self.half(&arg.state, lower);
        let (read, write) = (arg.symbol(), res.symbol());
        if self.halting(&res.state) {
            self.table
                .set_move(from, read, res.state.clone(), write, Direction::Stay);
            return;
        }

        let bound = self.bound.clone();
        let (upper, below) = (self.half(&res.state, false), self.half(&res.state, true));
        let to = if lower { below.clone() } else { upper.clone() };
        let direction = if lower {
            res.direction().reverse()
        } else {
            res.direction()
        };
        match (direction, lower) {
            (Direction::Stay, _) => self.table.set_move(from, read, to, write, Direction::Stay),
            // away from the bound, over the other half's cell
            (Direction::Right, _) => {
                let skip = self.helper(if lower { "skip-lower" } else { "skip" }, &res.state);
                self.table
                    .set_move(from, read, skip.clone(), write, Direction::Right);
                self.every_cell(&skip, &to, Direction::Right);
            }
            // from cell 0, the next cell left is cell -1 at position 2
            (Direction::Left, false) => {
                let left = self.helper("left", &res.state);
                let cross = self.helper("cross", &res.state);
                self.table
                    .set_move(from, read, left.clone(), write, Direction::Left);
                self.every_cell(&left, &upper, Direction::Left);
                self.table
                    .set_move(left, bound.clone(), cross.clone(), bound, Direction::Right);
                self.every_cell(&cross, &below, Direction::Right);
            }
            // from cell -1, the next cell right is cell 0 at position 1
            (Direction::Left, true) => {
                let right = self.helper("right", &res.state);
                let check = self.helper("check", &res.state);
                self.table
                    .set_move(from, read, right.clone(), write, Direction::Left);
                self.every_cell(&right, &check, Direction::Left);
                self.table
                    .set_move(check.clone(), bound.clone(), upper, bound, Direction::Right);
                self.every_cell(&check, &below, Direction::Stay);
            }
        }
    }
}

/// Simulates a multitape machine with the tapes interleaved cell by cell.
///
/// Cell `j` of tape `i` lives at position `j * n + i` between a left and a right end marker,
/// so a block of `n` neighbouring cells holds one cell of every tape. Each head is a mark on
/// one cell of its track and moves a whole block at a time.
pub(super) fn mtm_tm_interleaved(mtm: &Mtm) -> Tm {
    if mtm.tapes == 1 {
        return mtm_tm(mtm);
    }
    Blocks::new(mtm).build()
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Sweep {
    /// Moving right over track `track`, collecting the symbols under the heads.
    Read {
        state: State,
        track: usize,
        seen: Vec<Option<Symbol>>,
        carry: Vec<bool>,
    },
    /// A new block replaces the right marker; `track` is the cell being written.
    GrowRight {
        state: State,
        track: usize,
        seen: Vec<Option<Symbol>>,
        carry: Vec<bool>,
    },
    /// Moving left from the right marker, applying `rule` to every head.
    Write {
        rule: TransitionResult,
        track: usize,
        done: Vec<bool>,
        pending: Vec<bool>,
    },
    /// A new block replaces the left marker, `remaining` cells still to write.
    GrowLeft {
        state: State,
        remaining: usize,
        pending: Vec<bool>,
    },
    /// Compacts the first track onto the tape, then accepts.
    Decode,
}

struct Blocks<'a> {
    mtm: &'a Mtm,
    alphabets: Vec<BTreeSet<Symbol>>,
    states: SyntheticNamespace,
    symbols: SyntheticNamespace,
    start: State,
    accept: State,
    reject: State,
    left: Symbol,
    right: Symbol,
    hole: Symbol,
    table: TransitionTable,
    queue: VecDeque<Sweep>,
    visited: BTreeSet<Sweep>,
}

impl<'a> Blocks<'a> {
    fn new(mtm: &'a Mtm) -> Self {
        let alphabets: Vec<BTreeSet<Symbol>> = (0..mtm.tapes).map(|tape| mtm.alphabet(tape)).collect();

        let mut symbols = SyntheticNamespace::new();
        for alphabet in &alphabets {
            symbols.reserve_all("symbol", alphabet);
        }
        let left = symbols.declare(key!["left"], "[");
        let right = symbols.declare(key!["right"], "]");
        let hole = symbols.declare(key!["hole"], "#");

        let mut states = SyntheticNamespace::new();
        let start = states.declare(key!["start"], &mtm.start);
        let accept = states.declare(key!["accept"], &mtm.accept);
        let reject = states.declare(key!["reject"], &mtm.reject);

        Self {
            mtm,
            alphabets,
            states,
            symbols,
            start,
            accept,
            reject,
            left,
            right,
            hole,
            table: TransitionTable::new(),
            queue: VecDeque::new(),
            visited: BTreeSet::new(),
        }
    }

    fn build(mut self) -> Tm {
        self.lay_out_input();
        while let Some(sweep) = self.queue.pop_front() {
            let from = self.label(&sweep);
            match sweep {
                Sweep::Read {
                    state,
                    track,
                    seen,
                    carry,
                } => self.read(&from, &state, track, &seen, &carry),
                Sweep::GrowRight {
                    state,
                    track,
                    seen,
                    carry,
                } => self.grow_right(&from, state, track, seen, &carry),
                Sweep::Write {
                    rule,
                    track,
                    done,
                    pending,
                } => self.write(&from, &rule, track, &done, &pending),
                Sweep::GrowLeft {
                    state,
                    remaining,
                    pending,
                } => self.grow_left(&from, &state, remaining, &pending),
                Sweep::Decode => self.decode(&from),
            }
        }

        Tm::new(self.start, self.accept, self.reject, self.mtm.blank.clone(), self.table)
    }

    /// Spreads the input over the first track, marks the heads on block 0 and places the
    /// end markers.
    fn lay_out_input(&mut self) {
        let mtm = self.mtm;
        let n = mtm.tapes;
        let blank = mtm.blank.clone();
        let spread = self.phase_state("init", "spread");
        let open: Vec<State> = (1..n).map(|k| self.phase_state("init", &format!("open{k}"))).collect();
        let back: Vec<State> = (1..n).map(|k| self.phase_state("init", &format!("back{k}"))).collect();
        let close = self.phase_state("init", "close");
        let home = self.phase_state("init", "home");
        let place = self.phase_state("init", "place");
        let first = self.phase_state("init", "first");
        let marks: Vec<State> = (1..n).map(|k| self.phase_state("init", &format!("mark{k}"))).collect();
        let rewind = self.phase_state("init", "rewind");

        let input: Vec<Symbol> = self.alphabets[0].iter().filter(|s| **s != blank).cloned().collect();
        let (start, left, right) = (self.start.clone(), self.left.clone(), self.right.clone());

        // the first cell carries the head of tape 0 and lets `home` find it again
        let mut firsts = input.clone();
        firsts.push(blank.clone());
        for symbol in &firsts {
            let marked = self.cell(symbol, Mark::Head);
            self.table
                .set_move(start.clone(), symbol.clone(), open[0].clone(), marked.clone(), Direction::Right);
            self.table
                .set_move(home.clone(), marked.clone(), place.clone(), marked.clone(), Direction::Left);
            self.table
                .set_move(first.clone(), marked.clone(), marks[0].clone(), marked.clone(), Direction::Right);
            self.table.pass(&rewind, &marked, Direction::Left);
        }
        for symbol in &input {
            self.table
                .set_move(spread.clone(), symbol.clone(), open[0].clone(), symbol.clone(), Direction::Right);
            self.table.pass(&home, symbol, Direction::Left);
        }
        self.table.pass(&home, &blank, Direction::Left);

        // open[k] stands where track k + 1 of the current block goes
        for k in 0..n - 1 {
            let after = if k + 1 < n - 1 {
                open[k + 1].clone()
            } else {
                spread.clone()
            };
            for symbol in &input {
                let carry = self.phase_state("init", &format!("carry{}-{symbol}", k + 1));
                self.table
                    .set_move(open[k].clone(), symbol.clone(), carry.clone(), blank.clone(), Direction::Right);
                for next in &input {
                    let shifted = self.phase_state("init", &format!("carry{}-{next}", k + 1));
                    self.table
                        .set_move(carry.clone(), next.clone(), shifted, symbol.clone(), Direction::Right);
                }
                self.table
                    .set_move(carry, blank.clone(), back[k].clone(), symbol.clone(), Direction::Left);
                self.table.pass(&back[k], symbol, Direction::Left);
            }
            self.table
                .set_move(back[k].clone(), blank.clone(), after, blank.clone(), Direction::Right);

            // out of input: the last block is filled with blanks
            let filled = if k + 1 < n - 1 {
                open[k + 1].clone()
            } else {
                close.clone()
            };
            self.table
                .set_move(open[k].clone(), blank.clone(), filled, blank.clone(), Direction::Right);
        }
        self.table
            .set_move(close, blank.clone(), home, right, Direction::Left);
        self.table
            .set_move(place, blank.clone(), first, left.clone(), Direction::Right);

        let marked_blank = self.cell(&blank, Mark::Head);
        for k in 0..n - 1 {
            let (to, direction) = if k + 1 < n - 1 {
                (marks[k + 1].clone(), Direction::Right)
            } else {
                (rewind.clone(), Direction::Left)
            };
            self.table
                .set_move(marks[k].clone(), blank.clone(), to, marked_blank.clone(), direction);
        }
        let begin = self.begin(&mtm.start);
        self.go(&rewind, &left, begin, &left, Direction::Stay);
    }

    fn begin(&self, state: &str) -> Sweep {
        if state == self.mtm.accept {
            return Sweep::Decode;
        }
        Sweep::Read {
            state: state.to_string(),
            track: 0,
            seen: vec![None; self.mtm.tapes],
            carry: vec![false; self.mtm.tapes],
        }
    }

    fn read(&mut self, from: &str, state: &str, track: usize, seen: &[Option<Symbol>], carry: &[bool]) {
        let mtm = self.mtm;
        let n = mtm.tapes;
        let (left, right) = (self.left.clone(), self.right.clone());

        if track == 0 && seen.iter().all(Option::is_none) && !carry.contains(&true) {
            self.table.pass(from, &left, Direction::Right);
        }

        let alphabet: Vec<Symbol> = self.alphabets[track].iter().cloned().collect();
        for symbol in &alphabet {
            for mark in Mark::ALL {
                if mark != Mark::Off && (seen[track].is_some() || carry[track]) {
                    continue;
                }
                let mut next_seen = seen.to_vec();
                let mut next_carry = carry.to_vec();
                let written = if carry[track] {
                    next_seen[track] = Some(symbol.clone());
                    next_carry[track] = false;
                    Mark::Head
                } else {
                    match mark {
                        Mark::Head => next_seen[track] = Some(symbol.clone()),
                        Mark::Pending => next_carry[track] = true,
                        Mark::Off => {}
                    }
                    if mark == Mark::Pending {
                        Mark::Off
                    } else {
                        mark
                    }
                };

                let (read, write) = (self.cell(symbol, mark), self.cell(symbol, written));
                let next = Sweep::Read {
                    state: state.to_string(),
                    track: (track + 1) % n,
                    seen: next_seen,
                    carry: next_carry,
                };
                self.go(from, &read, next, &write, Direction::Right);
            }
        }

        // the right marker always follows a whole block
        if track != 0 {
            return;
        }
        if carry.contains(&true) {
            let write = self.grown(carry[0]);
            let mut seen = seen.to_vec();
            if carry[0] {
                seen[0] = Some(mtm.blank.clone());
            }
            let mut carry = carry.to_vec();
            carry[0] = false;
            let next = Sweep::GrowRight {
                state: state.to_string(),
                track: 1,
                seen,
                carry,
            };
            self.go(from, &right, next, &write, Direction::Right);
            return;
        }

        let Some(symbols) = seen.iter().cloned().collect::<Option<Vec<Symbol>>>() else {
            return;
        };
        match mtm.table.get(&TransitionArgument::new(state, symbols)) {
            Some(rule) if rule.state != mtm.reject => {
                let next = Sweep::Write {
                    rule: rule.clone(),
                    track: n - 1,
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

    fn grow_right(&mut self, from: &str, state: State, track: usize, mut seen: Vec<Option<Symbol>>, carry: &[bool]) {
        let blank = self.mtm.blank.clone();
        if track == self.mtm.tapes {
            let right = self.right.clone();
            let next = Sweep::Read {
                state,
                track: 0,
                seen,
                carry: vec![false; carry.len()],
            };
            self.go(from, &blank, next, &right, Direction::Stay);
            return;
        }

        let write = self.grown(carry[track]);
        if carry[track] {
            seen[track] = Some(blank.clone());
        }
        let next = Sweep::GrowRight {
            state,
            track: track + 1,
            seen,
            carry: carry.to_vec(),
        };
        self.go(from, &blank, next, &write, Direction::Right);
    }

    fn write(&mut self, from: &str, rule: &TransitionResult, track: usize, done: &[bool], pending: &[bool]) {
        let n = self.mtm.tapes;

        let alphabet: Vec<Symbol> = self.alphabets[track].iter().cloned().collect();
        for symbol in &alphabet {
            for mark in [Mark::Off, Mark::Head] {
                if mark == Mark::Head && (done[track] || pending[track]) {
                    continue;
                }
                let mut next_done = done.to_vec();
                let mut next_pending = pending.to_vec();
                let (written, written_mark) = if pending[track] {
                    next_pending[track] = false;
                    (symbol.clone(), Mark::Head)
                } else if mark == Mark::Head {
                    next_done[track] = true;
                    let written = rule.symbols.get(track).cloned().unwrap_or_else(|| symbol.clone());
                    let moved = match rule.directions.get(track).copied().unwrap_or(Direction::Stay) {
                        Direction::Stay => Mark::Head,
                        Direction::Right => Mark::Pending,
                        Direction::Left => {
                            next_pending[track] = true;
                            Mark::Off
                        }
                    };
                    (written, moved)
                } else {
                    (symbol.clone(), Mark::Off)
                };

                let (read, write) = (self.cell(symbol, mark), self.cell(&written, written_mark));
                let next = Sweep::Write {
                    rule: rule.clone(),
                    track: (track + n - 1) % n,
                    done: next_done,
                    pending: next_pending,
                };
                self.go(from, &read, next, &write, Direction::Left);
            }
        }

        if track != n - 1 {
            return;
        }
        let left = self.left.clone();
        if pending.contains(&true) {
            let write = self.grown(pending[n - 1]);
            let next = Sweep::GrowLeft {
                state: rule.state.clone(),
                remaining: n - 1,
                pending: pending.to_vec(),
            };
            self.go(from, &left, next, &write, Direction::Left);
        } else {
            let next = self.begin(&rule.state);
            self.go(from, &left, next, &left, Direction::Stay);
        }
    }

    fn grow_left(&mut self, from: &str, state: &str, remaining: usize, pending: &[bool]) {
        let blank = self.mtm.blank.clone();
        if remaining == 0 {
            let left = self.left.clone();
            let next = self.begin(state);
            self.go(from, &blank, next, &left, Direction::Stay);
            return;
        }

        let write = self.grown(pending[remaining - 1]);
        let next = Sweep::GrowLeft {
            state: state.to_string(),
            remaining: remaining - 1,
            pending: pending.to_vec(),
        };
        self.go(from, &blank, next, &write, Direction::Left);
    }

    /// Keeps the first-track cells, turns the other cells into holes and closes the gaps.
    fn decode(&mut self, from: &str) {
        let mtm = self.mtm;
        let n = mtm.tapes;
        let blank = mtm.blank.clone();
        let (left, right, hole, accept) = (
            self.left.clone(),
            self.right.clone(),
            self.hole.clone(),
            self.accept.clone(),
        );
        let strip: Vec<State> = std::iter::once(from.to_string())
            .chain((1..n).map(|track| self.phase_state("decode", &format!("strip{track}"))))
            .collect();
        let to_start = self.phase_state("decode", "start");
        let gather = self.phase_state("decode", "gather");
        let find = self.phase_state("decode", "find");
        let erase = self.phase_state("decode", "erase");
        let to_left = self.phase_state("decode", "left");
        let first: Vec<Symbol> = self.alphabets[0].iter().cloned().collect();

        self.table.pass(from, &left, Direction::Right);
        for track in 0..n {
            let alphabet: Vec<Symbol> = self.alphabets[track].iter().cloned().collect();
            for symbol in &alphabet {
                for mark in Mark::ALL {
                    let cell = self.cell(symbol, mark);
                    let kept = if track == 0 { symbol.clone() } else { hole.clone() };
                    self.table
                        .set_move(strip[track].clone(), cell, strip[(track + 1) % n].clone(), kept, Direction::Right);
                }
            }
        }
        self.table
            .set_move(from, right.clone(), to_start.clone(), right.clone(), Direction::Left);

        self.table.pass(&to_start, &hole, Direction::Left);
        self.table
            .set_move(to_start.clone(), left.clone(), gather.clone(), left.clone(), Direction::Right);
        self.table.set_move(gather.clone(), hole.clone(), find.clone(), hole.clone(), Direction::Right);
        self.table
            .set_move(gather.clone(), right.clone(), to_left.clone(), blank.clone(), Direction::Left);
        self.table.pass(&find, &hole, Direction::Right);
        self.table
            .set_move(find.clone(), right, erase.clone(), blank.clone(), Direction::Left);
        self.table
            .set_move(erase.clone(), hole.clone(), erase.clone(), blank.clone(), Direction::Left);
        for symbol in &first {
            let carry = self.phase_state("decode", &format!("carry-{symbol}"));
            let put = self.phase_state("decode", &format!("put-{symbol}"));
            self.table.pass(&gather, symbol, Direction::Right);
            self.table
                .set_move(find.clone(), symbol.clone(), carry.clone(), hole.clone(), Direction::Left);
            self.table.pass(&carry, &hole, Direction::Left);
            for stop in first.iter().chain([&left]) {
                self.table
                    .set_move(carry.clone(), stop.clone(), put.clone(), stop.clone(), Direction::Right);
            }
            self.table
                .set_move(put, hole.clone(), gather.clone(), symbol.clone(), Direction::Right);
            self.table
                .set_move(erase.clone(), symbol.clone(), to_left.clone(), symbol.clone(), Direction::Left);
            self.table.pass(&to_left, symbol, Direction::Left);
            self.table.pass(&to_start, symbol, Direction::Left);
        }
        self.table
            .set_move(erase, left.clone(), accept.clone(), blank.clone(), Direction::Right);
        self.table
            .set_move(to_left, left, accept, blank, Direction::Right);
    }

    /// A fixed helper state of the layout or decode phase.
    fn phase_state(&mut self, phase: &str, kind: &str) -> State {
        let base = match phase {
            "init" => format!("{}-{kind}", self.mtm.start),
            _ => format!("{phase}-{kind}"),
        };
        self.states.declare(key![phase, kind], &base)
    }

    /// A cell of a freshly grown block, carrying a head when `head` holds.
    fn grown(&mut self, head: bool) -> Symbol {
        let blank = self.mtm.blank.clone();
        self.cell(&blank, if head { Mark::Head } else { Mark::Off })
    }

    /// Adds a rule into `to`, scheduling `to` for expansion the first time it is seen.
    fn go(&mut self, from: &str, read: &str, to: Sweep, write: &str, direction: Direction) {
        let target = self.label(&to);
        self.table.set_move(from, read, target, write, direction);
        if self.visited.insert(to.clone()) {
            self.queue.push_back(to);
        }
    }

    /// Unmarked cells hold the bare symbol.
    fn cell(&mut self, symbol: &str, mark: Mark) -> Symbol {
        if mark == Mark::Off {
            return symbol.to_string();
        }
        self.symbols.declare(
            key!["cell", symbol, format!("{mark:?}")],
            &format!("{symbol}{}", mark.suffix()),
        )
    }

    fn label(&mut self, sweep: &Sweep) -> State {
        let flags = |bits: &[bool]| -> String { bits.iter().map(|b| if *b { '1' } else { '0' }).collect() };
        let seen_parts = |seen: &[Option<Symbol>]| -> Vec<String> {
            seen.iter()
                .map(|symbol| match symbol {
                    Some(symbol) => format!("+{symbol}"),
                    None => "-".to_string(),
                })
                .collect()
        };

        let (key, base) = match sweep {
            Sweep::Read {
                state,
                track,
                seen,
                carry,
            } => {
                let mut key = key!["read", state, track, flags(carry)];
                key.extend(seen_parts(seen));
                let base = if *track == 0 && seen.iter().all(Option::is_none) && !carry.contains(&true) {
                    state.clone()
                } else {
                    let seen: Vec<&str> = seen.iter().map(|s| s.as_deref().unwrap_or("?")).collect();
                    format!("{state}-read{track}[{}]", seen.join(","))
                };
                (key, base)
            }
            Sweep::GrowRight {
                state,
                track,
                seen,
                carry,
            } => {
                let mut key = key!["grow-right", state, track, flags(carry)];
                key.extend(seen_parts(seen));
                (key, format!("{state}-grow-right{track}"))
            }
            Sweep::Write {
                rule,
                track,
                done,
                pending,
            } => {
                let mut key = key!["write", rule.state, track, flags(done), flags(pending)];
                key.extend(rule.symbols.iter().cloned());
                key.extend(rule.directions.iter().map(ToString::to_string));
                (key, format!("{}-write{track}", rule.state))
            }
            Sweep::GrowLeft {
                state,
                remaining,
                pending,
            } => (
                key!["grow-left", state, remaining, flags(pending)],
                format!("{state}-grow-left{remaining}"),
            ),
            Sweep::Decode => (key!["decode"], "decode".to_string()),
        };
        self.states.declare(key, &base)
    }
}
