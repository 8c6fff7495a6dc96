use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

use super::tm::check_halting_source;
use super::{
    symbols_of, write_transitions, Automaton, CellKind, Tape, DEFAULT_ACCEPT, DEFAULT_BLANK,
    DEFAULT_REJECT, DEFAULT_START,
};
use crate::analyzer::{check_distinct, check_reachability, check_read_written, collect};
use crate::graph::Graph;
use crate::parser::{
    expect_args, expect_token, line_width, parse_count, Arity, Description, Setting,
};
use crate::table::TransitionTable;
use crate::types::{
    Direction, MachineKind, State, Symbol, TransitionArgument, TransitionResult,
};
use crate::verdict::ParseVerdict;

pub const DEFAULT_TAPES: usize = 2;

/// A Turing machine with several independent two-way tapes.
///
/// Description lines have the form `from s1 .. sn -> to w1 d1 .. wn dn`. The input is written
/// on the first tape; the other tapes start blank. A missing transition moves to the reject
/// state and leaves every tape as it is.
#[derive(Debug, Clone, PartialEq)]
pub struct Mtm {
    pub(crate) tapes: usize,
    pub(crate) start: State,
    pub(crate) accept: State,
    pub(crate) reject: State,
    pub(crate) blank: Symbol,
    pub(crate) table: TransitionTable,
    run: Option<(Vec<Tape>, State)>,
}

impl Default for Mtm {
    fn default() -> Self {
        Self {
            tapes: DEFAULT_TAPES,
            start: DEFAULT_START.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            reject: DEFAULT_REJECT.to_string(),
            blank: DEFAULT_BLANK.to_string(),
            table: TransitionTable::new(),
            run: None,
        }
    }
}

impl Mtm {
    /// Creates a multitape Turing machine from its parts, without run state.
    pub fn new(
        tapes: usize,
        start: impl Into<State>,
        accept: impl Into<State>,
        reject: impl Into<State>,
        blank: impl Into<Symbol>,
        table: TransitionTable,
    ) -> Self {
        Self {
            tapes,
            start: start.into(),
            accept: accept.into(),
            reject: reject.into(),
            blank: blank.into(),
            table,
            run: None,
        }
    }

    pub fn tape_count(&self) -> usize {
        self.tapes
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

    /// Every symbol some transition reads or writes on tape `tape`, blank included.
    pub fn alphabet(&self, tape: usize) -> BTreeSet<Symbol> {
        let mut symbols: BTreeSet<Symbol> = self
            .table
            .entries()
            .flat_map(|(arg, res)| [arg.symbols.get(tape), res.symbols.get(tape)])
            .flatten()
            .cloned()
            .collect();
        symbols.insert(self.blank.clone());
        symbols
    }

    /// The tapes of the current run.
    pub fn tape_store(&self) -> Option<&[Tape]> {
        self.run.as_ref().map(|(tapes, _)| tapes.as_slice())
    }

    fn tape(&self, tape: usize) -> Option<&Tape> {
        self.tape_store().and_then(|tapes| tapes.get(tape))
    }

    fn symbols_per_tape(&self) -> (Vec<BTreeSet<Symbol>>, Vec<BTreeSet<Symbol>>) {
        let mut read = vec![BTreeSet::new(); self.tapes];
        let mut written = vec![BTreeSet::new(); self.tapes];
        for (arg, res) in self.table.entries() {
            for (tape, symbol) in arg.symbols.iter().enumerate().take(self.tapes) {
                read[tape].insert(symbol.clone());
            }
            for (tape, symbol) in res.symbols.iter().enumerate().take(self.tapes) {
                written[tape].insert(symbol.clone());
            }
        }
        (read, written)
    }
}

fn set_tapes(mtm: &mut Mtm, args: &[&str], line: usize) -> ParseVerdict {
    match parse_count(args[1], "tapes", 1, line) {
        Ok(tapes) => {
            mtm.tapes = tapes;
            if tapes == 1 {
                return ParseVerdict::warning(format!(
                    "Line {line}: multitape TM with one tape. \
                     Probably should be interpreted as standard Turing machine"
                ));
            }
            ParseVerdict::ok()
        }
        Err(verdict) => verdict,
    }
}

fn set_start(mtm: &mut Mtm, args: &[&str], _line: usize) -> ParseVerdict {
    mtm.start = args[1].to_string();
    ParseVerdict::ok()
}

fn set_accept(mtm: &mut Mtm, args: &[&str], _line: usize) -> ParseVerdict {
    mtm.accept = args[1].to_string();
    ParseVerdict::ok()
}

fn set_reject(mtm: &mut Mtm, args: &[&str], _line: usize) -> ParseVerdict {
    mtm.reject = args[1].to_string();
    ParseVerdict::ok()
}

fn set_blank(mtm: &mut Mtm, args: &[&str], _line: usize) -> ParseVerdict {
    mtm.blank = args[1].to_string();
    ParseVerdict::ok()
}

impl Description for Mtm {
    const SETTINGS: &'static [Setting<Self>] = &[
        Setting {
            key: "tapes:",
            arity: Arity::Exactly(2),
            apply: set_tapes,
        },
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
        let n = self.tapes;
        let width = match line_width(n, 3, 3, line) {
            Ok(width) => width,
            Err(verdict) => return verdict,
        };
        let mut verdict = expect_args(args, width, line);
        if verdict.has_errors() || verdict.merge(expect_token(args, n + 1, "->", line)) {
            return verdict;
        }

        let mut written = Vec::with_capacity(n);
        let mut directions = Vec::with_capacity(n);
        for tape in 0..n {
            written.push(args[n + 3 + 2 * tape].to_string());
            match Direction::parse(args[n + 4 + 2 * tape], line) {
                Ok(direction) => directions.push(direction),
                Err(e) => return ParseVerdict::error(e, line),
            }
        }

        verdict.merge(check_halting_source(args[0], &self.accept, &self.reject, line));
        let arg = self.transition_key(args);
        self.table
            .set(arg, TransitionResult::new(args[n + 2], written, directions));
        verdict
    }

    fn transition_edge(&self, args: &[&str]) -> (State, State) {
        (args[0].to_string(), args[self.tapes + 2].to_string())
    }

    fn transition_key(&self, args: &[&str]) -> TransitionArgument {
        let read = args[1..=self.tapes].iter().map(|s| s.to_string()).collect();
        TransitionArgument::new(args[0], read)
    }

    fn check_transitions(&self, graph: &Graph<State>) -> ParseVerdict {
        let (read, written) = self.symbols_per_tape();
        collect([
            check_reachability(graph, &self.start, &self.accept, &self.reject),
            check_read_written(&read, &written, &self.blank),
        ])
    }
}

impl Automaton for Mtm {
    const KIND: MachineKind = MachineKind::Mtm;

    fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn start_state(&self) -> &str {
        &self.start
    }

    fn init(&mut self, input: &str) {
        let mut tapes = vec![Tape::new(&symbols_of(input), &self.blank)];
        tapes.extend((1..self.tapes).map(|_| Tape::new(&[], &self.blank)));
        self.run = Some((tapes, self.start.clone()));
    }

    fn is_initialized(&self) -> bool {
        self.run.is_some()
    }

    fn advance(&mut self) {
        let Some((tapes, state)) = self.run.as_mut() else {
            return;
        };
        let read: Vec<Symbol> = tapes.iter().map(|tape| tape.read().to_string()).collect();
        let arg = TransitionArgument::new(state.clone(), read);

        match self.table.get(&arg) {
            Some(res) => {
                for (tape, (symbol, direction)) in
                    tapes.iter_mut().zip(res.symbols.iter().zip(&res.directions))
                {
                    tape.write_and_move(symbol, *direction);
                }
                *state = res.state.clone();
            }
            None => {
                for (tape, symbol) in tapes.iter_mut().zip(&arg.symbols) {
                    tape.write_and_move(symbol, Direction::Stay);
                }
                *state = self.reject.clone();
            }
        }
        trace!(state = %state, symbols = ?arg.symbols, "MTM step");
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
        self.tapes
    }

    fn tape_size(&self, tape: usize) -> usize {
        self.tape(tape).map_or(0, Tape::len)
    }

    fn tape_content(&self, tape: usize, index: usize) -> String {
        match self.tape(tape).and_then(|t| t.cell(index)) {
            Some(cell) if cell != self.blank => cell.to_string(),
            _ => String::new(),
        }
    }

    fn tape_cell(&self, tape: usize, index: usize) -> CellKind {
        match self.tape(tape).and_then(|t| t.cell(index)) {
            Some(cell) if cell != self.blank => CellKind::Symbol,
            _ => CellKind::Blank,
        }
    }

    fn tape_pointer(&self, tape: usize, index: usize) -> bool {
        self.tape(tape).is_some_and(|t| t.head() == index)
    }
}

impl fmt::Display for Mtm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tapes != DEFAULT_TAPES {
            writeln!(f, "tapes: {}", self.tapes)?;
        }
        for (key, value, default) in [
            ("start", &self.start, DEFAULT_START),
            ("accept", &self.accept, DEFAULT_ACCEPT),
            ("reject", &self.reject, DEFAULT_REJECT),
            ("blank", &self.blank, DEFAULT_BLANK),
        ] {
            if value != default {
                writeln!(f, "{key}: {value}")?;
            }
        }
        write_transitions(f, &self.table, |arg, res| {
            let mut line = arg.state.clone();
            for symbol in &arg.symbols {
                line.push(' ');
                line.push_str(symbol);
            }
            line.push_str(" -> ");
            line.push_str(&res.state);
            for (symbol, direction) in res.symbols.iter().zip(&res.directions) {
                line.push_str(&format!(" {symbol} {direction}"));
            }
            line
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Halt;

    // a^n b^n: counts the a's on the second tape, then matches them against the b's
    const ANBN: &str = "\
START a _ -> START a > X >
START b _ -> MATCH b ^ _ <
START _ _ -> ACCEPT _ ^ _ ^
MATCH b X -> MATCH b > X <
MATCH _ _ -> ACCEPT _ ^ _ ^
";

    fn mtm(text: &str) -> Mtm {
        let mut mtm = Mtm::default();
        let verdict = mtm.parse(text);
        assert!(!verdict.has_errors(), "{:?}", verdict.errors());
        mtm
    }

    #[test]
    fn test_anbn() {
        let mut mtm = mtm(ANBN);
        for (input, accepted) in [
            ("", true),
            ("ab", true),
            ("aabb", true),
            ("aab", false),
            ("abb", false),
            ("ba", false),
            ("ab a", false),
        ] {
            mtm.init(input);
            assert_eq!(mtm.run() == Ok(Halt::Accept), accepted, "input {input:?}");
        }
    }

    #[test]
    fn test_second_tape_starts_blank() {
        let mut mtm = mtm(ANBN);
        mtm.init("aa");
        assert_eq!(mtm.tapes(), 2);
        assert_eq!(mtm.tape_size(1), 2);
        assert!(mtm.tape_pointer(1, 1));

        mtm.step();
        mtm.step();
        assert_eq!(mtm.tape_content(1, 1), "X");
        assert_eq!(mtm.tape_content(1, 2), "X");
        assert_eq!(mtm.tape_cell(1, 3), CellKind::Blank);
    }

    #[test]
    fn test_missing_transition_keeps_tapes() {
        let mut mtm = mtm(ANBN);
        mtm.init("c");
        assert_eq!(mtm.run(), Ok(Halt::Reject));
        assert_eq!(mtm.tape_store().map(|t| t[0].content(&[])), Some("c".to_string()));
    }

    #[test]
    fn test_tapes_setting() {
        let mut mtm = Mtm::default();
        let verdict = mtm.parse("tapes: 1\nSTART a -> ACCEPT a ^\n");
        assert!(!verdict.has_errors());
        assert_eq!(
            verdict.warnings(),
            ["Line 1: multitape TM with one tape. Probably should be interpreted as standard Turing machine"]
        );

        let verdict = mtm.parse("tapes: 0\n");
        assert_eq!(
            verdict.errors()[0].message,
            "Number of tapes must be a positive integer (got 0)"
        );

        let verdict = mtm.parse("tapes: many\n");
        assert_eq!(verdict.errors()[0].message, "Unable to parse number of tapes: many");
    }

    #[test]
    fn test_line_shape_depends_on_tapes() {
        let mut mtm = Mtm::default();
        let verdict = mtm.parse("tapes: 3\nSTART a _ -> ACCEPT a ^ _ ^\n");
        assert_eq!(
            verdict.errors()[0].message,
            "Line 2: Too few arguments (expected 12 args, got 9 args)"
        );

        let verdict = mtm.parse("START a _ => ACCEPT a ^ _ ^\n");
        assert_eq!(
            verdict.errors()[0].message,
            "Line 1, argument 3: Expected '->' instead of '=>'"
        );
    }

    #[test]
    fn test_read_never_written() {
        let mut mtm = Mtm::default();
        let verdict = mtm.parse("START a Y -> ACCEPT a ^ _ ^\n");
        assert_eq!(verdict.warnings(), ["Tape 2: symbol 'Y' is read but never written"]);
    }

    #[test]
    fn test_serialization() {
        let mtm = mtm("tapes: 1\nSTART a -> ACCEPT b >\n");
        assert_eq!(mtm.to_string(), "tapes: 1\n\nSTART a -> ACCEPT b >\n");
    }

    #[test]
    fn test_huge_tape_count_is_fatal() {
        let mut mtm = Mtm::default();
        let verdict = mtm.parse("tapes: 9223372036854775807\nSTART a -> ACCEPT a >\n");

        assert!(verdict.has_errors());
        assert_eq!(
            verdict.errors()[0].message,
            "Number of tapes must be at most 256 (got 9223372036854775807)"
        );
    }
}
