use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

use super::{
    symbols_of, write_transitions, Automaton, CellKind, Tape, DEFAULT_ACCEPT, DEFAULT_BLANK,
    DEFAULT_REJECT, DEFAULT_START,
};
use crate::analyzer::{check_distinct, check_reachability, collect};
use crate::graph::Graph;
use crate::parser::{expect_args, expect_token, Arity, Description, Setting};
use crate::table::TransitionTable;
use crate::types::{
    Direction, MachineKind, State, Symbol, TransitionArgument, TransitionResult,
};
use crate::verdict::ParseVerdict;

/// A single-tape Turing machine with a tape unbounded in both directions.
///
/// Description lines have the form `from read -> to write direction`. A missing transition
/// moves to the reject state without touching the tape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tm {
    pub(crate) start: State,
    pub(crate) accept: State,
    pub(crate) reject: State,
    pub(crate) blank: Symbol,
    pub(crate) table: TransitionTable,
    run: Option<(Tape, State)>,
}

impl Default for Tm {
    fn default() -> Self {
        Self {
            start: DEFAULT_START.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            reject: DEFAULT_REJECT.to_string(),
            blank: DEFAULT_BLANK.to_string(),
            table: TransitionTable::new(),
            run: None,
        }
    }
}

impl Tm {
    /// Creates a Turing machine from its parts, without run state.
    pub fn new(
        start: impl Into<State>,
        accept: impl Into<State>,
        reject: impl Into<State>,
        blank: impl Into<Symbol>,
        table: TransitionTable,
    ) -> Self {
        Self {
            start: start.into(),
            accept: accept.into(),
            reject: reject.into(),
            blank: blank.into(),
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

    /// Every symbol some transition reads or writes.
    pub fn alphabet(&self) -> BTreeSet<Symbol> {
        self.table
            .entries()
            .flat_map(|(arg, res)| [arg.symbol().to_string(), res.symbol().to_string()])
            .collect()
    }

    /// The tape of the current run.
    pub fn tape(&self) -> Option<&Tape> {
        self.run.as_ref().map(|(tape, _)| tape)
    }
}

fn set_start(tm: &mut Tm, args: &[&str], _line: usize) -> ParseVerdict {
    tm.start = args[1].to_string();
    ParseVerdict::ok()
}

fn set_accept(tm: &mut Tm, args: &[&str], _line: usize) -> ParseVerdict {
    tm.accept = args[1].to_string();
    ParseVerdict::ok()
}

fn set_reject(tm: &mut Tm, args: &[&str], _line: usize) -> ParseVerdict {
    tm.reject = args[1].to_string();
    ParseVerdict::ok()
}

fn set_blank(tm: &mut Tm, args: &[&str], _line: usize) -> ParseVerdict {
    tm.blank = args[1].to_string();
    ParseVerdict::ok()
}

/// Parses the `from read -> to write direction` line shared by single-tape machines.
pub(crate) fn parse_tape_line(
    args: &[&str],
    line: usize,
) -> Result<(TransitionArgument, TransitionResult), ParseVerdict> {
    let mut verdict = expect_args(args, 6, line);
    if verdict.has_errors() || verdict.merge(expect_token(args, 2, "->", line)) {
        return Err(verdict);
    }
    let direction = Direction::parse(args[5], line).map_err(|e| ParseVerdict::error(e, line))?;
    Ok((
        TransitionArgument::single(args[0], args[1]),
        TransitionResult::single(args[3], args[4], direction),
    ))
}

/// Warns about transitions leaving a halting state.
pub(crate) fn check_halting_source(from: &str, accept: &str, reject: &str, line: usize) -> ParseVerdict {
    if from == accept {
        ParseVerdict::warning(format!("Line {line}: transition from accept state"))
    } else if from == reject {
        ParseVerdict::warning(format!("Line {line}: transition from reject state"))
    } else {
        ParseVerdict::ok()
    }
}

impl Description for Tm {
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
    ];

    fn check_settings(&self) -> ParseVerdict {
        collect([check_distinct(&[
            ("start state", self.start.as_str()),
            ("accept state", self.accept.as_str()),
            ("reject state", self.reject.as_str()),
        ])])
    }

    fn parse_transition(&mut self, args: &[&str], line: usize) -> ParseVerdict {
        let (arg, res) = match parse_tape_line(args, line) {
            Ok(parsed) => parsed,
            Err(verdict) => return verdict,
        };
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

impl Automaton for Tm {
    const KIND: MachineKind = MachineKind::Tm;

    fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn start_state(&self) -> &str {
        &self.start
    }

    fn init(&mut self, input: &str) {
        let tape = Tape::new(&symbols_of(input), &self.blank);
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
        trace!(state = %state, head = tape.head(), "TM step");
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
            Some(cell) if cell != self.blank => cell.to_string(),
            _ => String::new(),
        }
    }

    fn tape_cell(&self, _tape: usize, index: usize) -> CellKind {
        match self.tape().and_then(|tape| tape.cell(index)) {
            Some(cell) if cell != self.blank => CellKind::Symbol,
            _ => CellKind::Blank,
        }
    }

    fn tape_pointer(&self, _tape: usize, index: usize) -> bool {
        self.tape().is_some_and(|tape| tape.head() == index)
    }
}

/// Writes the settings and transitions shared by the single-tape machine kinds.
pub(crate) fn write_tape_machine(
    f: &mut fmt::Formatter<'_>,
    settings: &[(&str, &str, &str)],
    table: &TransitionTable,
) -> fmt::Result {
    for (key, value, default) in settings {
        if value != default {
            writeln!(f, "{key}: {value}")?;
        }
    }
    write_transitions(f, table, |arg, res| {
        format!(
            "{} {} -> {} {} {}",
            arg.state,
            arg.symbol(),
            res.state,
            res.symbol(),
            res.direction()
        )
    })
}

impl fmt::Display for Tm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tape_machine(
            f,
            &[
                ("start", self.start.as_str(), DEFAULT_START),
                ("accept", self.accept.as_str(), DEFAULT_ACCEPT),
                ("reject", self.reject.as_str(), DEFAULT_REJECT),
                ("blank", self.blank.as_str(), DEFAULT_BLANK),
            ],
            &self.table,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Halt;

    // appends a 1 to a unary number
    const INCREMENT: &str = "\
START 1 -> START 1 >
START _ -> ACCEPT 1 ^
";

    fn tm(text: &str) -> Tm {
        let mut tm = Tm::default();
        let verdict = tm.parse(text);
        assert!(!verdict.has_errors(), "{:?}", verdict.errors());
        tm
    }

    #[test]
    fn test_increment() {
        let mut tm = tm(INCREMENT);
        tm.init("111");
        assert_eq!(tm.run(), Ok(Halt::Accept));
        assert_eq!(tm.tape().map(|t| t.content(&[])), Some("1111".to_string()));
    }

    #[test]
    fn test_missing_transition_rejects() {
        let mut tm = tm(INCREMENT);
        tm.init("1a1");
        assert_eq!(tm.run(), Ok(Halt::Reject));
        assert_eq!(tm.tape().map(|t| t.content(&[])), Some("1a1".to_string()));
    }

    #[test]
    fn test_inspection_hides_blanks() {
        let mut tm = tm(INCREMENT);
        tm.init("1");
        assert_eq!(tm.tape_size(0), 3);
        assert_eq!(tm.tape_content(0, 0), "");
        assert_eq!(tm.tape_cell(0, 0), CellKind::Blank);
        assert_eq!(tm.tape_content(0, 1), "1");
        assert!(tm.tape_pointer(0, 1));
    }

    #[test]
    fn test_equal_settings_are_fatal() {
        let mut tm = Tm::default();
        let verdict = tm.parse("accept: X\nreject: X\nSTART _ -> X _ ^\n");
        assert_eq!(
            verdict.errors()[0].message,
            "Names of accept state and reject state are equal (X)"
        );
        assert_eq!(verdict.errors()[0].line, 0);
    }

    #[test]
    fn test_invalid_direction() {
        let mut tm = Tm::default();
        let verdict = tm.parse("START _ -> ACCEPT _ R\n");
        assert_eq!(
            verdict.errors()[0].message,
            "Line 1: Invalid transition direction 'R' (expected '>', '<' or '^')"
        );
    }

    #[test]
    fn test_advisories() {
        let mut tm = Tm::default();
        let verdict = tm.parse("START a -> ACCEPT a ^\nACCEPT a -> START a ^\nX a -> Y a ^\n");
        assert!(!verdict.has_errors());
        assert_eq!(
            verdict.warnings(),
            [
                "Line 2: transition from accept state",
                "States X, Y are unreachable from start state and therefore are useless",
            ]
        );

        let verdict = tm.parse("START a -> B a >\n");
        assert_eq!(
            verdict.warnings(),
            ["Accept state 'ACCEPT' is unreachable from the start state 'START'. \
              Any input of this machine will be either rejected or entered to infinite loop"]
        );
    }

    #[test]
    fn test_serialization() {
        let tm = tm("blank: #\nSTART # -> ACCEPT 1 ^\nSTART 1 -> START 1 >\n");
        assert_eq!(
            tm.to_string(),
            "blank: #\n\nSTART # -> ACCEPT 1 ^\nSTART 1 -> START 1 >\n"
        );
    }
}
