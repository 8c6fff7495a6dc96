//! Reductions between pushdown automata and Turing machines.

use std::collections::BTreeSet;

use super::states_with;
use crate::key;
use crate::machine::{
    Dpda, Tm, DEFAULT_ACCEPT, DEFAULT_BLANK, DEFAULT_BOTTOM, DEFAULT_EPS, DEFAULT_REJECT,
    DEFAULT_SEPARATOR,
};
use crate::namespace::{Key, SyntheticNamespace};
use crate::table::TransitionTable;
use crate::types::{Direction, State, Symbol, TransitionArgument, TransitionResult};

const END_MARKER: &str = "$";
const WALL: &str = "|";

/// Simulates a pushdown automaton on a Turing-machine tape.
///
/// The tape holds the input with a mark on the next unread cell, an end marker, and then
/// every stack from bottom to top followed by a wall. A step walks right collecting the
/// stack tops, looks the move up, and rewrites the stacks from the last one back to the first.
pub(super) fn dpda_tm(dpda: &Dpda) -> Tm {
    if dpda.stacks == 0 {
        return stackless(dpda);
    }
    StackTape::new(dpda).build()
}

fn input_alphabet(dpda: &Dpda) -> BTreeSet<Symbol> {
    dpda.table
        .arguments()
        .map(|arg| arg.symbol())
        .filter(|symbol| *symbol != dpda.eps)
        .map(str::to_string)
        .collect()
}

fn stack_alphabet(dpda: &Dpda) -> BTreeSet<Symbol> {
    let mut symbols = BTreeSet::from([dpda.bottom.clone()]);
    for (arg, res) in dpda.table.entries() {
        symbols.extend(arg.symbols.iter().skip(1).cloned());
        symbols.extend(dpda.push_groups(&res.symbols).into_iter().flatten());
    }
    symbols.remove(&dpda.eps);
    symbols
}

fn source_states(dpda: &Dpda) -> BTreeSet<State> {
    states_with(
        &dpda.table,
        std::iter::once(dpda.start.as_str()).chain(dpda.accept.iter().map(String::as_str)),
    )
}

/// A DPDA without stacks is a finite automaton with epsilon moves; its tape machine never
/// moves left.
fn stackless(dpda: &Dpda) -> Tm {
    let sigma = input_alphabet(dpda);
    let states = source_states(dpda);

    let mut names = SyntheticNamespace::new();
    names.reserve_all("state", &states);
    let accept = names.declare(key!["accept"], DEFAULT_ACCEPT);
    let reject = names.declare(key!["reject"], DEFAULT_REJECT);

    let mut symbols = SyntheticNamespace::new();
    symbols.reserve_all("symbol", &sigma);
    let blank = symbols.declare(key!["blank"], DEFAULT_BLANK);

    let mut table = TransitionTable::new();
    for state in &states {
        let eps = dpda
            .table
            .get(&TransitionArgument::single(state.clone(), dpda.eps.clone()));
        for symbol in &sigma {
            let arg = TransitionArgument::single(state.clone(), symbol.clone());
            let (to, direction) = match (dpda.table.get(&arg), eps) {
                (Some(res), _) => (&res.state, Direction::Right),
                (None, Some(res)) => (&res.state, Direction::Stay),
                (None, None) => continue,
            };
            table.set_move(state.clone(), symbol.clone(), to.clone(), symbol.clone(), direction);
        }

        let end = match eps {
            Some(res) => res.state.clone(),
            None if dpda.accept.contains(state) => accept.clone(),
            None => reject.clone(),
        };
        table.set_move(state.clone(), blank.clone(), end, blank.clone(), Direction::Stay);
    }

    let table = table.remove_unreachable_states(&dpda.start, Some(&accept), Some(&reject));
    Tm::new(dpda.start.clone(), accept, reject, blank, table)
}

/// The stack rewrite decided by one DPDA move.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Job {
    state: State,
    groups: Vec<Vec<Symbol>>,
    consume: bool,
}

impl Job {
    fn key(&self, op: &str) -> Key {
        let mut key = key![op, self.state, self.consume];
        for group in &self.groups {
            key.push("/".to_string());
            key.extend(group.iter().map(|symbol| format!("+{symbol}")));
        }
        key
    }

    fn stack_key(&self, op: &str, stack: usize) -> Key {
        let mut key = self.key(op);
        key.push(stack.to_string());
        key
    }
}

fn optional(symbol: Option<&str>) -> String {
    symbol.map_or_else(|| "-".to_string(), |symbol| format!("+{symbol}"))
}

fn tops_key(state: &str, reading: Option<&str>, collected: &[Symbol], last: Option<&str>) -> Key {
    let mut key = key!["tops", state, optional(reading), optional(last)];
    key.extend(collected.iter().map(|symbol| format!("+{symbol}")));
    key
}

struct StackTape<'a> {
    dpda: &'a Dpda,
    source: BTreeSet<State>,
    sigma: BTreeSet<Symbol>,
    gamma: BTreeSet<Symbol>,
    states: SyntheticNamespace,
    symbols: SyntheticNamespace,
    blank: Symbol,
    end: Symbol,
    wall: Symbol,
    accept: State,
    reject: State,
    table: TransitionTable,
    jobs: BTreeSet<Job>,
}

impl<'a> StackTape<'a> {
    fn new(dpda: &'a Dpda) -> Self {
        let sigma = input_alphabet(dpda);
        let gamma = stack_alphabet(dpda);
        let source = source_states(dpda);

        let mut symbols = SyntheticNamespace::new();
        symbols.reserve_all("symbol", sigma.iter().chain(&gamma));
        let blank = symbols.declare(key!["blank"], DEFAULT_BLANK);
        let end = symbols.declare(key!["end"], END_MARKER);
        let wall = symbols.declare(key!["wall"], WALL);

        let mut states = SyntheticNamespace::new();
        states.reserve_all("fetch", &source);
        let accept = states.declare(key!["accept"], DEFAULT_ACCEPT);
        let reject = states.declare(key!["reject"], DEFAULT_REJECT);

        Self {
            dpda,
            source,
            sigma,
            gamma,
            states,
            symbols,
            blank,
            end,
            wall,
            accept,
            reject,
            table: TransitionTable::new(),
            jobs: BTreeSet::new(),
        }
    }

    fn build(mut self) -> Tm {
        let start = self.lay_out_stacks();
        for state in self.source.clone() {
            self.fetch(&state);
        }

        let table = self
            .table
            .remove_unreachable_states(&start, Some(&self.accept), Some(&self.reject));
        Tm::new(start, self.accept, self.reject, self.blank, table)
    }

    fn mark(&mut self, symbol: &str) -> Symbol {
        self.symbols.declare(key!["mark", symbol], symbol)
    }

    fn fetch_state(&mut self, state: &str) -> State {
        self.states.declare(key!["fetch", state], state)
    }

    /// Every symbol found right of the end marker.
    fn stack_cells(&self) -> Vec<Symbol> {
        self.gamma.iter().cloned().chain([self.wall.clone()]).collect()
    }

    /// Marks the first input cell, writes the end marker and one bottom and wall per stack,
    /// then returns to the mark.
    fn lay_out_stacks(&mut self) -> State {
        let dpda = self.dpda;
        let start = &dpda.start;
        let init = self.states.declare(key!["init"], &format!("{start}-init"));
        let scan = self.states.declare(key!["init", "scan"], &format!("{start}-init-scan"));
        let back = self.states.declare(key!["init", "back"], &format!("{start}-init-back"));
        let bottoms: Vec<State> = (0..dpda.stacks)
            .map(|i| {
                self.states
                    .declare(key!["init", "bottom", i], &format!("{start}-init-bottom{i}"))
            })
            .collect();
        let walls: Vec<State> = (0..dpda.stacks)
            .map(|i| {
                self.states
                    .declare(key!["init", "wall", i], &format!("{start}-init-wall{i}"))
            })
            .collect();

        let (blank, end, wall) = (self.blank.clone(), self.end.clone(), self.wall.clone());
        let end_mark = self.mark(&end);
        for symbol in self.sigma.clone() {
            let mark = self.mark(&symbol);
            self.table
                .set_move(init.clone(), symbol.clone(), scan.clone(), mark, Direction::Right);
            self.table.pass(&scan, &symbol, Direction::Right);
        }

        let Some(first) = bottoms.first().cloned() else {
            return init;
        };
        self.table
            .set_move(init.clone(), blank.clone(), first.clone(), end_mark.clone(), Direction::Right);
        self.table
            .set_move(scan, blank.clone(), first, end.clone(), Direction::Right);
        for (i, (bottom, wall_state)) in bottoms.iter().zip(&walls).enumerate() {
            self.table.set_move(
                bottom.clone(),
                blank.clone(),
                wall_state.clone(),
                dpda.bottom.clone(),
                Direction::Right,
            );
            match bottoms.get(i + 1) {
                Some(next) => self.table.set_move(
                    wall_state.clone(),
                    blank.clone(),
                    next.clone(),
                    wall.clone(),
                    Direction::Right,
                ),
                None => self.table.set_move(
                    wall_state.clone(),
                    blank.clone(),
                    back.clone(),
                    wall.clone(),
                    Direction::Left,
                ),
            }
        }

        for cell in self.stack_cells() {
            self.table.pass(&back, &cell, Direction::Left);
        }
        let fetch = self.fetch_state(start);
        self.table
            .set_move(back.clone(), end.clone(), fetch.clone(), end, Direction::Stay);
        self.table
            .set_move(back, end_mark.clone(), fetch, end_mark, Direction::Stay);
        init
    }

    /// Emits the rules of `state` waiting for its next move: find the input mark, then
    /// collect the stack tops.
    fn fetch(&mut self, state: &str) {
        let from = self.fetch_state(state);
        let end = self.end.clone();
        let end_mark = self.mark(&end);

        for symbol in self.sigma.clone() {
            let mark = self.mark(&symbol);
            let scan = self
                .states
                .declare(key!["scan", state, symbol], &format!("{state}-scan"));
            self.table.pass(&from, &symbol, Direction::Left);
            self.table
                .set_move(from.clone(), mark.clone(), scan.clone(), mark, Direction::Right);
            for other in self.sigma.clone() {
                self.table.pass(&scan, &other, Direction::Right);
            }
            let tops = self.tops(state, Some(&symbol), Vec::new());
            self.table
                .set_move(scan, end.clone(), tops, end.clone(), Direction::Right);
        }

        self.table.pass(&from, &end, Direction::Left);
        let tops = self.tops(state, None, Vec::new());
        self.table
            .set_move(from, end_mark.clone(), tops, end_mark, Direction::Right);
    }

    /// Returns the state entered on the bottom of stack `collected.len()` while collecting
    /// tops, emitting its rules the first time.
    fn tops(&mut self, state: &str, reading: Option<&str>, collected: Vec<Symbol>) -> State {
        let entry_key = tops_key(state, reading, &collected, None);
        if let Some(entry) = self.states.get(&entry_key) {
            return entry.to_string();
        }

        let base = format!("{state}-tops");
        let entry = self.states.declare(entry_key, &base);
        let mut lasts = vec![(None, entry.clone())];
        for symbol in self.gamma.clone() {
            let key = tops_key(state, reading, &collected, Some(symbol.as_str()));
            let label = self.states.declare(key, &base);
            lasts.push((Some(symbol), label));
        }

        let wall = self.wall.clone();
        for (last, from) in &lasts {
            for (symbol, to) in lasts.iter().filter_map(|(s, to)| s.as_ref().map(|s| (s, to))) {
                self.table
                    .set_move(from.clone(), symbol.clone(), to.clone(), symbol.clone(), Direction::Right);
            }

            let Some(last) = last else {
                continue;
            };
            let mut next = collected.clone();
            next.push(last.clone());
            let (to, direction) = if next.len() == self.dpda.stacks {
                self.decide(state, reading, &next)
            } else {
                (self.tops(state, reading, next), Direction::Right)
            };
            self.table
                .set_move(from.clone(), wall.clone(), to, wall.clone(), direction);
        }

        entry
    }

    /// Looks up the move for `state` reading `reading` (`None` at the end of the input) with
    /// `tops` on the stacks. The head is on the last wall.
    fn decide(&mut self, state: &str, reading: Option<&str>, tops: &[Symbol]) -> (State, Direction) {
        let dpda = self.dpda;
        let lookup = |symbol: &str| {
            let mut symbols = vec![symbol.to_string()];
            symbols.extend(tops.iter().cloned());
            dpda.table.get(&TransitionArgument::new(state, symbols))
        };
        let found = reading
            .and_then(|symbol| lookup(symbol).map(|res| (res, true)))
            .or_else(|| lookup(&dpda.eps).map(|res| (res, false)));

        match found {
            None => {
                let verdict = if reading.is_none() && dpda.accept.contains(state) {
                    self.accept.clone()
                } else {
                    self.reject.clone()
                };
                (verdict, Direction::Stay)
            }
            Some((res, consume)) => {
                let groups = dpda
                    .push_groups(&res.symbols)
                    .into_iter()
                    .map(|group| group.into_iter().filter(|s| *s != dpda.eps).collect())
                    .collect();
                let job = Job {
                    state: res.state.clone(),
                    groups,
                    consume,
                };
                (self.run_job(&job), Direction::Left)
            }
        }
    }

    fn exec_state(&mut self, job: &Job, stack: usize) -> State {
        self.states
            .declare(job.stack_key("exec", stack), &format!("{}-push{stack}", job.state))
    }

    /// Returns the state that rewrites the top of the last stack for `job`, emitting the
    /// rules of the whole rewrite the first time.
    fn run_job(&mut self, job: &Job) -> State {
        let n = self.dpda.stacks;
        let first = self.exec_state(job, n - 1);
        if !self.jobs.insert(job.clone()) {
            return first;
        }

        let finish = self.finish(job);
        let gamma: Vec<Symbol> = self.gamma.iter().cloned().collect();
        let (wall, end) = (self.wall.clone(), self.end.clone());
        let end_mark = self.mark(&end);

        for i in 0..n {
            let exec = self.exec_state(job, i);
            let seek = self
                .states
                .declare(job.stack_key("seek", i), &format!("{}-seek", job.state));
            for symbol in &gamma {
                self.table.pass(&seek, symbol, Direction::Left);
            }
            if i > 0 {
                let below = self.exec_state(job, i - 1);
                self.table
                    .set_move(seek.clone(), wall.clone(), below, wall.clone(), Direction::Left);
            } else {
                self.table
                    .set_move(seek.clone(), end.clone(), finish.clone(), end.clone(), Direction::Stay);
                self.table.set_move(
                    seek.clone(),
                    end_mark.clone(),
                    finish.clone(),
                    end_mark.clone(),
                    Direction::Stay,
                );
            }

            match job.groups.get(i).map(Vec::as_slice).unwrap_or_default() {
                [] => self.delete_top(job, i, &exec, &seek),
                [symbol] => {
                    for top in &gamma {
                        self.table
                            .set_move(exec.clone(), top.clone(), seek.clone(), symbol.clone(), Direction::Left);
                    }
                }
                group => self.insert_top(job, i, group, &exec, &seek),
            }
        }
        first
    }

    /// Pops without pushing: marks the top as a hole and shifts the rest of the tape left.
    fn delete_top(&mut self, job: &Job, stack: usize, exec: &str, seek: &str) {
        let cells = self.stack_cells();
        let blank = self.blank.clone();
        let sweep = self
            .states
            .declare(job.stack_key("delete", stack), &format!("{}-delete", job.state));
        let pick = self
            .states
            .declare(job.stack_key("pick", stack), &format!("{}-pick", job.state));

        let gamma: Vec<Symbol> = self.gamma.iter().cloned().collect();
        let mut holes = Vec::with_capacity(gamma.len());
        for top in &gamma {
            let hole = self.mark(top);
            self.table
                .set_move(exec, top.clone(), sweep.clone(), hole.clone(), Direction::Right);
            holes.push(hole);
        }
        for cell in &cells {
            self.table.pass(&sweep, cell, Direction::Right);
        }
        self.table
            .set_move(sweep, blank.clone(), pick.clone(), blank.clone(), Direction::Left);

        let carries: Vec<State> = cells
            .iter()
            .map(|cell| {
                let mut key = job.stack_key("carry", stack);
                key.push(cell.clone());
                self.states.declare(key, &format!("{}-carry", job.state))
            })
            .collect();
        for (cell, carry) in cells.iter().zip(&carries) {
            self.table
                .set_move(pick.clone(), cell.clone(), carry.clone(), blank.clone(), Direction::Left);
            for (other, next) in cells.iter().zip(&carries) {
                self.table
                    .set_move(carry.clone(), other.clone(), next.clone(), cell.clone(), Direction::Left);
            }
            for hole in &holes {
                self.table
                    .set_move(carry.clone(), hole.clone(), seek, cell.clone(), Direction::Left);
            }
        }
    }

    fn insert_state(&mut self, job: &Job, stack: usize, index: usize, carried: &str) -> State {
        let mut key = job.stack_key("insert", stack);
        key.extend([index.to_string(), carried.to_string()]);
        self.states.declare(key, &format!("{}-insert", job.state))
    }

    /// Pushes two or more symbols: overwrites the top with the first one, then inserts each
    /// following symbol by shifting the rest of the tape right.
    fn insert_top(&mut self, job: &Job, stack: usize, group: &[Symbol], exec: &str, seek: &str) {
        let cells = self.stack_cells();
        let blank = self.blank.clone();

        let Some((head, rest)) = group.split_first() else {
            return;
        };
        if let Some(second) = rest.first() {
            let mark = self.mark(second);
            let carry = self.insert_state(job, stack, 1, &mark);
            for top in self.gamma.clone() {
                self.table
                    .set_move(exec, top, carry.clone(), head.clone(), Direction::Right);
            }
        }

        for (index, symbol) in group.iter().enumerate().skip(1) {
            let mark = self.mark(symbol);
            let mut key = job.stack_key("return", stack);
            key.push(index.to_string());
            let back = self.states.declare(key, &format!("{}-return", job.state));

            for carried in cells.iter().chain([&mark]) {
                let from = self.insert_state(job, stack, index, carried);
                for cell in &cells {
                    let to = self.insert_state(job, stack, index, cell);
                    self.table
                        .set_move(from.clone(), cell.clone(), to, carried.clone(), Direction::Right);
                }
                self.table
                    .set_move(from, blank.clone(), back.clone(), carried.clone(), Direction::Left);
            }
            for cell in &cells {
                self.table.pass(&back, cell, Direction::Left);
            }

            match group.get(index + 1) {
                Some(next) => {
                    let next_mark = self.mark(next);
                    let carry = self.insert_state(job, stack, index + 1, &next_mark);
                    self.table
                        .set_move(back, mark, carry, symbol.clone(), Direction::Right);
                }
                None => self
                    .table
                    .set_move(back, mark, seek, symbol.clone(), Direction::Left),
            }
        }
    }

    /// Returns the state that completes `job` once every stack is rewritten: it moves the
    /// input mark if the move consumed a symbol and hands over to the target state.
    fn finish(&mut self, job: &Job) -> State {
        let from = self
            .states
            .declare(job.key("finish"), &format!("{}-finish", job.state));
        let fetch = self.fetch_state(&job.state);
        let end = self.end.clone();
        let end_mark = self.mark(&end);

        self.table
            .set_move(from.clone(), end_mark.clone(), fetch.clone(), end_mark.clone(), Direction::Stay);
        if !job.consume {
            self.table
                .set_move(from.clone(), end.clone(), fetch, end, Direction::Stay);
            return from;
        }

        let find = self
            .states
            .declare(key!["find", job.state], &format!("{}-find", job.state));
        let advance = self
            .states
            .declare(key!["advance", job.state], &format!("{}-advance", job.state));
        self.table
            .set_move(from.clone(), end.clone(), find.clone(), end.clone(), Direction::Left);
        for symbol in self.sigma.clone() {
            let mark = self.mark(&symbol);
            self.table.pass(&find, &symbol, Direction::Left);
            self.table
                .set_move(find.clone(), mark.clone(), advance.clone(), symbol.clone(), Direction::Right);
            self.table
                .set_move(advance.clone(), symbol, fetch.clone(), mark, Direction::Stay);
        }
        self.table
            .set_move(advance, end, fetch, end_mark, Direction::Stay);
        from
    }
}

/// Simulates a Turing machine with two stacks.
///
/// The first stack holds the cells left of the head, its top being the nearest one. The
/// second stack holds the head cell and everything right of it, with the head cell on top.
/// The input is loaded onto the first stack and then flipped onto the second one.
pub(super) fn tm_dpda_two_stacks(tm: &Tm) -> Dpda {
    let mut tape = tm.alphabet();
    tape.insert(tm.blank.clone());

    let mut symbols = SyntheticNamespace::new();
    symbols.reserve_all("symbol", &tape);
    let eps = symbols.declare(key!["eps"], DEFAULT_EPS);
    let bottom = symbols.declare(key!["bottom"], DEFAULT_BOTTOM);
    let separator = symbols.declare(key!["separator"], DEFAULT_SEPARATOR);

    let source = states_with(&tm.table, [tm.start.as_str(), tm.accept.as_str(), tm.reject.as_str()]);
    let mut states = SyntheticNamespace::new();
    states.reserve_all("state", &source);
    let load = states.declare(key!["load"], &format!("{}-load", tm.start));
    let flip = states.declare(key!["flip"], &format!("{}-flip", tm.start));

    let mut dpda = Dpda::new(
        2,
        load.clone(),
        eps.clone(),
        bottom.clone(),
        separator,
        BTreeSet::from([tm.accept.clone()]),
        TransitionTable::new(),
    );
    let tops: Vec<Symbol> = tape.iter().cloned().chain([bottom.clone()]).collect();
    let mut table = TransitionTable::new();
    let mut rule = |from: &str, read: [&str; 3], to: &str, groups: [Vec<Symbol>; 2]| {
        let arg = TransitionArgument::new(from, read.iter().map(|s| s.to_string()).collect());
        table.set(arg, TransitionResult::new(to, dpda.push_list(&groups), Vec::new()));
    };

    for t1 in &tops {
        for symbol in tape.iter().filter(|symbol| **symbol != tm.blank) {
            rule(
                &load,
                [symbol, t1, &bottom],
                &load,
                [vec![t1.clone(), symbol.clone()], vec![bottom.clone()]],
            );
        }
        rule(&load, [&eps, t1, &bottom], &flip, [vec![t1.clone()], vec![bottom.clone()]]);

        for t2 in &tops {
            if *t1 == bottom {
                rule(&flip, [&eps, t1, t2], &tm.start, [vec![bottom.clone()], vec![t2.clone()]]);
            } else {
                rule(&flip, [&eps, t1, t2], &flip, [Vec::new(), vec![t2.clone(), t1.clone()]]);
            }
        }
    }

    for (arg, res) in tm.table.entries() {
        if arg.state == tm.accept || arg.state == tm.reject {
            continue;
        }
        let (read, write) = (arg.symbol(), res.symbol().to_string());
        // an empty second stack stands for blanks right of the head
        let mut under = vec![read];
        if read == tm.blank {
            under.push(&bottom);
        }

        for x in under {
            let keep = if x == bottom { vec![bottom.clone()] } else { Vec::new() };
            for t1 in &tops {
                let (left, right) = match res.direction() {
                    Direction::Stay => (vec![t1.clone()], [keep.clone(), vec![write.clone()]].concat()),
                    Direction::Right => (vec![t1.clone(), write.clone()], keep.clone()),
                    Direction::Left if *t1 == bottom => (
                        vec![bottom.clone()],
                        [keep.clone(), vec![write.clone(), tm.blank.clone()]].concat(),
                    ),
                    Direction::Left => (Vec::new(), [keep.clone(), vec![write.clone(), t1.clone()]].concat()),
                };
                rule(&arg.state, [&eps, t1, x], &res.state, [left, right]);
            }
        }
    }

    dpda.table = table.remove_unreachable_states(&load, Some(&tm.accept), None);
    dpda
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::fixtures::{accepts, parse};
    use crate::machine::Automaton;

    // balanced parentheses
    const PARENS: &str = "\
accept: OK
START ( Z -> START Z X
START ( X -> START X X
START ) X -> START
START eps Z -> OK Z
";

    // a^n b^n c^n, counting on both stacks
    const ANBNCN: &str = "\
stacks: 2
accept: END
START a Z Z -> START Z a , Z a
START a a a -> START a a , a a
START b a a -> B , a
B b a a -> B , a
B c Z a -> C Z ,
C c Z a -> C Z ,
C eps Z Z -> END Z , Z
";

    const INCREMENT: &str = "START 1 -> START 1 >\nSTART _ -> ACCEPT 1 ^\n";

    const LEFT_OF_INPUT: &str = "\
START a -> L a <
L _ -> M x <
M _ -> N y >
N x -> ACCEPT x ^
";

    #[test]
    fn test_dpda_tm_one_stack() {
        let dpda: Dpda = parse(PARENS);
        let tm = dpda_tm(&dpda);

        assert_eq!(tm.accept_state(), "ACCEPT");
        for input in ["", "()", "(())()", "(", ")(", "())"] {
            assert_eq!(accepts(&tm, input), accepts(&dpda, input), "input {input:?}");
        }
        assert!(accepts(&tm, "(())()"));
        assert!(!accepts(&tm, "())"));
    }

    #[test]
    fn test_dpda_tm_two_stacks() {
        let dpda: Dpda = parse(ANBNCN);
        let tm = dpda_tm(&dpda);

        for input in ["", "abc", "aabbcc", "abbc", "abcc", "acb", "aabbc"] {
            assert_eq!(accepts(&tm, input), accepts(&dpda, input), "input {input:?}");
        }
        assert!(accepts(&tm, "aabbcc"));
    }

    #[test]
    fn test_dpda_tm_stackless() {
        let dpda: Dpda = parse("stacks: 0\naccept: END\nSTART a -> START\nSTART eps -> END\n");
        let tm = dpda_tm(&dpda);

        assert!(tm
            .table
            .entries()
            .all(|(_, res)| res.direction() != Direction::Left));
        for input in ["", "aa", "ab", "b"] {
            assert_eq!(accepts(&tm, input), accepts(&dpda, input), "input {input:?}");
        }
    }

    #[test]
    fn test_tm_dpda_two_stacks() {
        let tm: Tm = parse(INCREMENT);
        let dpda = tm_dpda_two_stacks(&tm);

        assert_eq!(dpda.stacks(), 2);
        assert_eq!(dpda.start_state(), "START-load");
        assert_eq!(dpda.accept_states(), &BTreeSet::from(["ACCEPT".to_string()]));
        for input in ["", "1", "111", "1a"] {
            assert_eq!(accepts(&dpda, input), accepts(&tm, input), "input {input:?}");
        }
    }

    #[test]
    fn test_tm_dpda_two_stacks_moves_left_of_input() {
        let tm: Tm = parse(LEFT_OF_INPUT);
        let dpda = tm_dpda_two_stacks(&tm);

        for input in ["a", "b", "", "aa"] {
            assert_eq!(accepts(&dpda, input), accepts(&tm, input), "input {input:?}");
        }
    }

    #[test]
    fn test_tm_dpda_two_stacks_reparses() {
        let tm: Tm = parse(LEFT_OF_INPUT);
        let dpda = tm_dpda_two_stacks(&tm);
        let reparsed: Dpda = parse(&dpda.to_string());
        assert_eq!(reparsed.table, dpda.table);
    }

    #[test]
    fn test_stacks_round_trip() {
        let tm: Tm = parse(INCREMENT);
        let back = dpda_tm(&tm_dpda_two_stacks(&tm));
        for input in ["", "11", "1a"] {
            assert_eq!(accepts(&back, input), accepts(&tm, input), "input {input:?}");
        }
    }
}
