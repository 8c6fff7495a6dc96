use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

use super::tm::{check_halting_source, parse_tape_line, write_tape_machine};
use super::{
    symbols_of, Automaton, CellKind, Tape, DEFAULT_ACCEPT, DEFAULT_BLANK, DEFAULT_BOUND,
    DEFAULT_REJECT, DEFAULT_START,
};
use crate::analyzer::{check_distinct, check_reachability, collect};
use crate::graph::Graph;
use crate::parser::{Arity, Description, Setting};
use crate::table::TransitionTable;
use crate::types::{Direction, MachineKind, State, Symbol, TransitionArgument};
use crate::verdict::ParseVerdict;

/// A single-tape Turing machine whose tape is bounded on the left.
///
/// The first tape cell always holds the left-bound symbol and the head starts right of it.
/// Transitions may neither write a new bound, erase the existing one, nor move left from it.
#[derive(Debug, Clone, PartialEq)]
pub struct OneTm {
    pub(crate) start: State,
    pub(crate) accept: State,
    pub(crate) reject: State,
    pub(crate) blank: Symbol,
    pub(crate) bound: Symbol,
    pub(crate) table: TransitionTable,
    run: Option<(Tape, State)>,
}

impl Default for OneTm {
    fn default() -> Self {
        Self {
            start: DEFAULT_START.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            reject: DEFAULT_REJECT.to_string(),
            blank: DEFAULT_BLANK.to_string(),
            bound: DEFAULT_BOUND.to_string(),
            table: TransitionTable::new(),
            run: None,
        }
    }
}

impl OneTm {
    /// Creates a one-way Turing machine from its parts, without run state.
    pub fn new(
        start: impl Into<State>,
        accept: impl Into<State>,
        reject: impl Into<State>,
        blank: impl Into<Symbol>,
        bound: impl Into<Symbol>,
        table: TransitionTable,
    ) -> Self {
        Self {
            start: start.into(),
            accept: accept.into(),
            reject: reject.into(),
            blank: blank.into(),
            bound: bound.into(),
            table,
            run: None,
        }
    }

    pub fn accept_state(&self) -> &str {
        &self.accept
    }

    pub fn reject_state(&self) -> &str {
        &self.reject
    }

    pub fn blank(&self) -> &str {
        &self.blank
    }

    pub fn bound(&self) -> &str {
        &self.bound
    }

    /// Every symbol some transition reads or writes, the bound excluded.
    pub fn alphabet(&self) -> BTreeSet<Symbol> {
        self.table
            .entries()
            .flat_map(|(arg, res)| [arg.symbol().to_string(), res.symbol().to_string()])
            .filter(|symbol| *symbol != self.bound)
            .collect()
    }

    pub fn tape(&self) -> Option<&Tape> {
        self.run.as_ref().map(|(tape, _)| tape)
    }

    fn check_bound(&self, args: &[&str], direction: Direction, line: usize) -> ParseVerdict {
        let (read, write) = (args[1], args[4]);
        let forbidden = if read != self.bound && write == self.bound {
            "you can't place a new bound symbol"
        } else if read == self.bound && write != self.bound {
            "you can't remove an existing bound symbol"
        } else if read == self.bound && direction == Direction::Left {
            "you can't go left while on bound"
        } else {
            return ParseVerdict::ok();
        };
        ParseVerdict::error(
            format!("Line {line}: Forbidden transition. In one-way Turing machines, {forbidden}"),
            line,
        )
    }
}

fn set_start(tm: &mut OneTm, args: &[&str], _line: usize) -> ParseVerdict {
    tm.start = args[1].to_string();
    ParseVerdict::ok()
}

fn set_accept(tm: &mut OneTm, args: &[&str], _line: usize) -> ParseVerdict {
    tm.accept = args[1].to_string();
    ParseVerdict::ok()
}

fn set_reject(tm: &mut OneTm, args: &[&str], _line: usize) -> ParseVerdict {
    tm.reject = args[1].to_string();
    ParseVerdict::ok()
}

fn set_blank(tm: &mut OneTm, args: &[&str], _line: usize) -> ParseVerdict {
    tm.blank = args[1].to_string();
    ParseVerdict::ok()
}

fn set_bound(tm: &mut OneTm, args: &[&str], _line: usize) -> ParseVerdict {
    tm.bound = args[1].to_string();
    ParseVerdict::ok()
}

impl Description for OneTm {
    const SETTINGS: &'static [Setting<Self>] = &[
        Setting {
            key: "start:",
            arity: Arity::Exactly(2),
            apply: set_start,
        },
        Setting {
            key: "accept:",
            arity: Arity::Exactly(2),
            apply: set_accept,
        },
        Setting {
            key: "reject:",
            arity: Arity::Exactly(2),
            apply: set_reject,
        },
        Setting {
            key: "blank:",
            arity: Arity::Exactly(2),
            apply: set_blank,
        },
        Setting {
            key: "left-bound:",
            arity: Arity::Exactly(2),
            apply: set_bound,
        },
    ];

    fn check_settings(&self) -> ParseVerdict {
        collect([
            check_distinct(&[
                ("start state", self.start.as_str()),
                ("accept state", self.accept.as_str()),
                ("reject state", self.reject.as_str()),
            ]),
            check_distinct(&[
                ("blank symbol", self.blank.as_str()),
                ("left bound symbol", self.bound.as_str()),
            ]),
        ])
    }

    fn parse_transition(&mut self, args: &[&str], line: usize) -> ParseVerdict {
        let (arg, res) = match parse_tape_line(args, line) {
            Ok(parsed) => parsed,
            Err(verdict) => return verdict,
        };
        let verdict = self.check_bound(args, res.direction(), line);
        if verdict.has_errors() {
            return verdict;
        }
        self.table.set(arg, res);
        check_halting_source(args[0], &self.accept, &self.reject, line)
    }

    fn transition_edge(&self, args: &[&str]) -> (State, State) {
        (args[0].to_string(), args[3].to_string())
    }

    fn transition_key(&self, args: &[&str]) -> TransitionArgument {
        TransitionArgument::single(args[0], args[1])
    }

    fn check_transitions(&self, graph: &Graph<State>) -> ParseVerdict {
        collect([check_reachability(graph, &self.start, &self.accept, &self.reject)])
    }
}

impl Automaton for OneTm {
    const KIND: MachineKind = MachineKind::OneTm;

    fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn start_state(&self) -> &str {
        &self.start
    }

    fn init(&mut self, input: &str) {
        let tape = Tape::bounded(&symbols_of(input), &self.blank, &self.bound);
        self.run = Some((tape, self.start.clone()));
    }

    fn is_initialized(&self) -> bool {
        self.run.is_some()
    }

    fn advance(&mut self) {
        let Some((tape, state)) = self.run.as_mut() else {
            return;
        };
        let arg = TransitionArgument::single(state.clone(), tape.read());
        match self.table.get(&arg) {
            Some(res) => {
                tape.write_and_move(res.symbol(), res.direction());
                *state = res.state.clone();
            }
            None => *state = self.reject.clone(),
        }
        trace!(state = %state, head = tape.head(), "1TM step");
    }

    fn current_state(&self) -> Option<String> {
        self.run.as_ref().map(|(_, state)| state.clone())
    }

    fn is_in_start_state(&self) -> bool {
        self.run.as_ref().is_some_and(|(_, state)| *state == self.start)
    }

    fn is_in_accept_state(&self) -> bool {
        self.run.as_ref().is_some_and(|(_, state)| *state == self.accept)
    }

    fn is_in_reject_state(&self) -> bool {
        self.run.as_ref().is_some_and(|(_, state)| *state == self.reject)
    }

    fn tapes(&self) -> usize {
        1
    }

    fn tape_size(&self, _tape: usize) -> usize {
        self.tape().map_or(0, Tape::len)
    }

    fn tape_content(&self, _tape: usize, index: usize) -> String {
        match self.tape().and_then(|tape| tape.cell(index)) {
            Some(cell) if cell != self.blank && cell != self.bound => cell.to_string(),
            _ => String::new(),
        }
    }

    fn tape_cell(&self, _tape: usize, index: usize) -> CellKind {
        match self.tape().and_then(|tape| tape.cell(index)) {
            Some(cell) if cell == self.bound => CellKind::Boundary,
            Some(cell) if cell != self.blank => CellKind::Symbol,
            _ => CellKind::Blank,
        }
    }

    fn tape_pointer(&self, _tape: usize, index: usize) -> bool {
        self.tape().is_some_and(|tape| tape.head() == index)
    }
}

impl fmt::Display for OneTm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tape_machine(
            f,
            &[
                ("start", self.start.as_str(), DEFAULT_START),
                ("accept", self.accept.as_str(), DEFAULT_ACCEPT),
                ("reject", self.reject.as_str(), DEFAULT_REJECT),
                ("blank", self.blank.as_str(), DEFAULT_BLANK),
                ("left-bound", self.bound.as_str(), DEFAULT_BOUND),
            ],
            &self.table,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Halt;

    // accepts inputs whose first symbol equals the last one
    const SAME_ENDS: &str = "\
START a -> A a >
START b -> B b >
A a -> A a >
A b -> A b >
B a -> B a >
B b -> B b >
A _ -> CA _ <
B _ -> CB _ <
CA a -> ACCEPT a ^
CB b -> ACCEPT b ^
";

    fn onetm(text: &str) -> OneTm {
        let mut tm = OneTm::default();
        let verdict = tm.parse(text);
        assert!(!verdict.has_errors(), "{:?}", verdict.errors());
        tm
    }

    #[test]
    fn test_same_ends() {
        let mut tm = onetm(SAME_ENDS);
        for (input, accepted) in [("aba", true), ("b", true), ("ab", false), ("", false)] {
            tm.init(input);
            assert_eq!(tm.run() == Ok(Halt::Accept), accepted, "input {input:?}");
        }
    }

    #[test]
    fn test_bound_is_first_cell() {
        let mut tm = onetm("START a -> START a <\nSTART BD -> ACCEPT BD >\n");
        tm.init("a");
        assert_eq!(tm.tape_cell(0, 0), CellKind::Boundary);
        assert_eq!(tm.tape_content(0, 0), "");
        assert!(tm.tape_pointer(0, 1));

        tm.step();
        assert!(tm.tape_pointer(0, 0));
        assert_eq!(tm.run(), Ok(Halt::Accept));
        assert!(tm.tape_pointer(0, 1));
    }

    #[test]
    fn test_forbidden_bound_transitions() {
        let mut tm = OneTm::default();
        let verdict = tm.parse("START a -> START BD >\nSTART BD -> START a >\nA BD -> A BD <\n");
        let messages: Vec<&str> = verdict.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "Line 1: Forbidden transition. In one-way Turing machines, you can't place a new bound symbol",
                "Line 2: Forbidden transition. In one-way Turing machines, you can't remove an existing bound symbol",
                "Line 3: Forbidden transition. In one-way Turing machines, you can't go left while on bound",
            ]
        );
    }

    #[test]
    fn test_blank_and_bound_must_differ() {
        let mut tm = OneTm::default();
        let verdict = tm.parse("left-bound: _\n");
        assert_eq!(
            verdict.errors()[0].message,
            "Names of blank symbol and left bound symbol are equal (_)"
        );
    }

    #[test]
    fn test_serialization() {
        let tm = onetm("left-bound: |\nSTART | -> ACCEPT | >\n");
        assert_eq!(tm.to_string(), "left-bound: |\n\nSTART | -> ACCEPT | >\n");
    }
}
