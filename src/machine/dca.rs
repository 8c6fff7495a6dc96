use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

use super::{
    check_input_symbol, unreadable_from, write_transitions, Automaton, CellKind, Cursor,
    DEFAULT_EPS, DEFAULT_START, NO_TRANSITION,
};
use crate::analyzer::{check_accept_set, collect};
use crate::graph::Graph;
use crate::parser::{
    expect_args, expect_token, line_width, parse_count, Arity, Description, Setting,
};
use crate::table::TransitionTable;
use crate::types::{MachineKind, State, Symbol, TransitionArgument, TransitionResult};
use crate::verdict::ParseVerdict;

const DEFAULT_COUNTERS: usize = 1;

/// What a transition expects of a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CounterGuard {
    /// `=`: the counter is zero.
    Zero,
    /// `>`: the counter is positive.
    Positive,
}

impl CounterGuard {
    pub const ALL: [CounterGuard; 2] = [CounterGuard::Zero, CounterGuard::Positive];

    pub fn of(value: i64) -> Self {
        if value == 0 {
            CounterGuard::Zero
        } else {
            CounterGuard::Positive
        }
    }
}

impl FromStr for CounterGuard {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(CounterGuard::Zero),
            ">" => Ok(CounterGuard::Positive),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CounterGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CounterGuard::Zero => "=",
            CounterGuard::Positive => ">",
        })
    }
}

/// What a transition does to a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CounterUpdate {
    Increment,
    Keep,
    Decrement,
}

impl CounterUpdate {
    pub fn delta(self) -> i64 {
        match self {
            CounterUpdate::Increment => 1,
            CounterUpdate::Keep => 0,
            CounterUpdate::Decrement => -1,
        }
    }
}

impl FromStr for CounterUpdate {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+1" => Ok(CounterUpdate::Increment),
            "0" => Ok(CounterUpdate::Keep),
            "-1" => Ok(CounterUpdate::Decrement),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CounterUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CounterUpdate::Increment => "+1",
            CounterUpdate::Keep => "0",
            CounterUpdate::Decrement => "-1",
        })
    }
}

/// A deterministic counter automaton.
///
/// Description lines have the form `from symbol g1..gn -> to u1..un`, where each guard `gi` is
/// `=` or `>` and each update `ui` is `+1`, `0` or `-1`. When no rule matches the next input
/// symbol, the rule for `eps` is tried; when neither matches, the run finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct Dca {
    pub(crate) counters: usize,
    pub(crate) start: State,
    pub(crate) eps: Symbol,
    pub(crate) accept: BTreeSet<State>,
    pub(crate) table: TransitionTable,
    run: Option<CounterRun>,
}

#[derive(Debug, Clone, PartialEq)]
struct CounterRun {
    cursor: Cursor,
    values: Vec<i64>,
    finished: bool,
    dead_end: Option<usize>,
}

impl Default for Dca {
    fn default() -> Self {
        Self {
            counters: DEFAULT_COUNTERS,
            start: DEFAULT_START.to_string(),
            eps: DEFAULT_EPS.to_string(),
            accept: BTreeSet::new(),
            table: TransitionTable::new(),
            run: None,
        }
    }
}

impl Dca {
    /// Creates a DCA from its parts, without run state.
    pub fn new(
        counters: usize,
        start: impl Into<State>,
        eps: impl Into<Symbol>,
        accept: BTreeSet<State>,
        table: TransitionTable,
    ) -> Self {
        Self {
            counters,
            start: start.into(),
            eps: eps.into(),
            accept,
            table,
            run: None,
        }
    }

    pub fn counters(&self) -> usize {
        self.counters
    }

    pub fn eps(&self) -> &str {
        &self.eps
    }

    pub fn accept_states(&self) -> &BTreeSet<State> {
        &self.accept
    }

    /// The current counter values.
    pub fn values(&self) -> Option<&[i64]> {
        self.run.as_ref().map(|run| run.values.as_slice())
    }

    /// Builds a transition argument from an input symbol and counter guards.
    pub fn argument(state: &str, symbol: &str, guards: &[CounterGuard]) -> TransitionArgument {
        let mut symbols = vec![symbol.to_string()];
        symbols.extend(guards.iter().map(ToString::to_string));
        TransitionArgument::new(state, symbols)
    }

    /// Builds a transition result from counter updates.
    pub fn result(state: &str, updates: &[CounterUpdate]) -> TransitionResult {
        TransitionResult::new(
            state,
            updates.iter().map(ToString::to_string).collect(),
            Vec::new(),
        )
    }

    /// Decodes the guards of a stored argument.
    pub fn guards(arg: &TransitionArgument) -> Vec<CounterGuard> {
        arg.symbols[1..]
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect()
    }

    /// Decodes the updates of a stored result.
    pub fn updates(res: &TransitionResult) -> Vec<CounterUpdate> {
        res.symbols.iter().filter_map(|s| s.parse().ok()).collect()
    }

    fn lookup(&self, state: &str, symbol: &str, guards: &[CounterGuard]) -> Option<&TransitionResult> {
        self.table.get(&Self::argument(state, symbol, guards))
    }
}

fn set_counters(dca: &mut Dca, args: &[&str], line: usize) -> ParseVerdict {
    match parse_count(args[1], "counters", 0, line) {
        Ok(counters) => {
            dca.counters = counters;
            if counters == 0 {
                return ParseVerdict::warning(format!(
                    "Line {line}: DCA with no counters. Probably a DFA should be used instead"
                ));
            }
            ParseVerdict::ok()
        }
        Err(verdict) => verdict,
    }
}

fn set_start(dca: &mut Dca, args: &[&str], _line: usize) -> ParseVerdict {
    dca.start = args[1].to_string();
    ParseVerdict::ok()
}

fn set_eps(dca: &mut Dca, args: &[&str], _line: usize) -> ParseVerdict {
    dca.eps = args[1].to_string();
    ParseVerdict::ok()
}

fn add_accept(dca: &mut Dca, args: &[&str], _line: usize) -> ParseVerdict {
    dca.accept.extend(args[1..].iter().map(|s| s.to_string()));
    ParseVerdict::ok()
}

impl Description for Dca {
    const SETTINGS: &'static [Setting<Self>] = &[
        Setting {
            key: "counters:",
            arity: Arity::Exactly(2),
            apply: set_counters,
        },
        Setting {
            key: "start:",
            arity: Arity::Exactly(2),
            apply: set_start,
        },
        Setting {
            key: "eps:",
            arity: Arity::Exactly(2),
            apply: set_eps,
        },
        Setting {
            key: "accept:",
            arity: Arity::Any,
            apply: add_accept,
        },
    ];

    fn check_settings(&self) -> ParseVerdict {
        collect([check_accept_set(&self.accept)])
    }

    fn parse_transition(&mut self, args: &[&str], line: usize) -> ParseVerdict {
        let n = self.counters;
        let width = match line_width(n, 2, 4, line) {
            Ok(width) => width,
            Err(verdict) => return verdict,
        };
        let mut verdict = expect_args(args, width, line);
        if verdict.has_errors() || verdict.merge(expect_token(args, n + 2, "->", line)) {
            return verdict;
        }

        let guard_tokens = &args[2..n + 2];
        let update_tokens = &args[n + 4..];
        let mut guards = Vec::with_capacity(n);
        let mut updates = Vec::with_capacity(n);
        for (i, (guard, update)) in guard_tokens.iter().zip(update_tokens).enumerate() {
            let Ok(guard) = guard.parse::<CounterGuard>() else {
                return ParseVerdict::error(
                    format!(
                        "Line {line}, counter {}: invalid argument '{guard}', expected '=' or '>'",
                        i + 1
                    ),
                    line,
                );
            };
            let Ok(update) = update.parse::<CounterUpdate>() else {
                return ParseVerdict::error(
                    format!(
                        "Line {line}, counter {}: invalid result action '{update}', expected '+1' or '0' or '-1'",
                        i + 1
                    ),
                    line,
                );
            };
            guards.push(guard);
            updates.push(update);
        }

        if let Some(i) = guards
            .iter()
            .zip(&updates)
            .position(|(g, u)| *g == CounterGuard::Zero && *u == CounterUpdate::Decrement)
        {
            return ParseVerdict::error(
                format!(
                    "Line {line}, counter {}: forbidden behavior, cannot decrement a zero counter",
                    i + 1
                ),
                line,
            );
        }
        verdict.merge(check_input_symbol(args[1], Some(&self.eps), line));

        self.table.set(
            Self::argument(args[0], args[1], &guards),
            Self::result(args[n + 3], &updates),
        );
        verdict
    }

    fn transition_edge(&self, args: &[&str]) -> (State, State) {
        (args[0].to_string(), args[self.counters + 3].to_string())
    }

    fn transition_key(&self, args: &[&str]) -> TransitionArgument {
        TransitionArgument::new(
            args[0],
            args[1..self.counters + 2].iter().map(|s| s.to_string()).collect(),
        )
    }

    fn check_transitions(&self, _graph: &Graph<State>) -> ParseVerdict {
        ParseVerdict::ok()
    }
}

impl Automaton for Dca {
    const KIND: MachineKind = MachineKind::Dca;

    fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn start_state(&self) -> &str {
        &self.start
    }

    fn init(&mut self, input: &str) {
        let cursor = Cursor::new(input, &self.start);
        self.run = Some(CounterRun {
            dead_end: unreadable_from(&cursor.input, &self.table),
            cursor,
            values: vec![0; self.counters],
            finished: false,
        });
    }

    fn is_initialized(&self) -> bool {
        self.run.is_some()
    }

    fn advance(&mut self) {
        if let Some(run) = self.run.as_mut().filter(|run| run.dead_end == Some(run.cursor.ptr)) {
            run.finished = true;
            run.cursor.state = NO_TRANSITION.to_string();
            trace!(ptr = run.cursor.ptr, "DCA stuck on an unreadable symbol");
            return;
        }
        let Some(run) = self.run.as_ref() else {
            return;
        };
        let guards: Vec<CounterGuard> = run.values.iter().map(|v| CounterGuard::of(*v)).collect();
        let state = run.cursor.state.clone();
        let symbol = run.cursor.current(&self.eps).to_string();

        let (next, consumed) = match self.lookup(&state, &symbol, &guards) {
            Some(res) => (Some(res.clone()), symbol != self.eps),
            None => (self.lookup(&state, &self.eps, &guards).cloned(), false),
        };

        let Some(run) = self.run.as_mut() else {
            return;
        };
        match next {
            Some(res) => {
                for (value, update) in run.values.iter_mut().zip(Self::updates(&res)) {
                    *value += update.delta();
                }
                run.cursor.state = res.state;
                if consumed {
                    run.cursor.ptr += 1;
                }
            }
            None => {
                run.finished = true;
                if !run.cursor.at_end() {
                    run.cursor.state = NO_TRANSITION.to_string();
                }
            }
        }
        trace!(state = %run.cursor.state, values = ?run.values, "DCA step");
    }

    fn current_state(&self) -> Option<String> {
        self.run.as_ref().map(|run| run.cursor.state.clone())
    }

    fn is_in_start_state(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.cursor.ptr == 0 && run.cursor.state == self.start)
    }

    fn is_in_accept_state(&self) -> bool {
        self.run.as_ref().is_some_and(|run| {
            run.finished && run.cursor.at_end() && self.accept.contains(&run.cursor.state)
        })
    }

    fn is_in_reject_state(&self) -> bool {
        self.is_in_terminal_state() && !self.is_in_accept_state()
    }

    fn is_in_terminal_state(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.finished)
    }

    fn tapes(&self) -> usize {
        self.counters + 1
    }

    fn tape_size(&self, tape: usize) -> usize {
        match (self.run.as_ref(), tape) {
            (None, _) => 0,
            (Some(run), 0) => run.cursor.input.len() + 1,
            (Some(run), t) => run.values.get(t - 1).map_or(0, |v| v.to_string().len()),
        }
    }

    fn tape_content(&self, tape: usize, index: usize) -> String {
        match (self.run.as_ref(), tape) {
            (None, _) => String::new(),
            (Some(run), 0) => run.cursor.content(index),
            (Some(run), t) => run
                .values
                .get(t - 1)
                .and_then(|v| v.to_string().chars().nth(index))
                .map(String::from)
                .unwrap_or_default(),
        }
    }

    fn tape_cell(&self, tape: usize, index: usize) -> CellKind {
        match (self.run.as_ref(), tape) {
            (None, _) => CellKind::Blank,
            (Some(run), 0) => run.cursor.cell(index),
            (Some(run), t) => CellKind::Counter {
                zero: run.values.get(t - 1).map_or(true, |v| *v == 0),
            },
        }
    }

    fn tape_pointer(&self, tape: usize, index: usize) -> bool {
        tape == 0 && self.run.as_ref().is_some_and(|run| run.cursor.ptr == index)
    }
}

impl fmt::Display for Dca {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.counters != DEFAULT_COUNTERS {
            writeln!(f, "counters: {}", self.counters)?;
        }
        if self.start != DEFAULT_START {
            writeln!(f, "start: {}", self.start)?;
        }
        if self.eps != DEFAULT_EPS {
            writeln!(f, "eps: {}", self.eps)?;
        }
        if !self.accept.is_empty() {
            let accept: Vec<&str> = self.accept.iter().map(String::as_str).collect();
            writeln!(f, "accept: {}", accept.join(" "))?;
        }
        write_transitions(f, &self.table, |arg, res| {
            let mut line = vec![arg.state.as_str()];
            line.extend(arg.symbols.iter().map(String::as_str));
            line.push("->");
            line.push(&res.state);
            line.extend(res.symbols.iter().map(String::as_str));
            line.join(" ")
        })
    }
}
