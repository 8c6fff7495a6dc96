use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

use super::{
    check_input_symbol, write_transitions, Automaton, CellKind, Cursor, DEFAULT_START,
    NO_TRANSITION,
};
use crate::analyzer::{check_accept_set, collect};
use crate::graph::Graph;
use crate::parser::{expect_args, expect_token, Arity, Description, Setting};
use crate::table::TransitionTable;
use crate::types::{MachineKind, State, Symbol, TransitionArgument, TransitionResult};
use crate::verdict::ParseVerdict;

/// A deterministic finite automaton.
///
/// Description lines have the form `from symbol -> to`. A missing transition sends the
/// automaton to the implicit `no transition` sink, which rejects.
#[derive(Debug, Clone, PartialEq)]
pub struct Dfa {
    pub(crate) start: State,
    pub(crate) accept: BTreeSet<State>,
    pub(crate) table: TransitionTable,
    run: Option<Cursor>,
}

impl Default for Dfa {
    fn default() -> Self {
        Self {
            start: DEFAULT_START.to_string(),
            accept: BTreeSet::new(),
            table: TransitionTable::new(),
            run: None,
        }
    }
}

impl Dfa {
    /// Creates a DFA from its parts, without run state.
    pub fn new(start: impl Into<State>, accept: BTreeSet<State>, table: TransitionTable) -> Self {
        Self {
            start: start.into(),
            accept,
            table,
            run: None,
        }
    }

    pub fn accept_states(&self) -> &BTreeSet<State> {
        &self.accept
    }

    /// Every input symbol some transition reads.
    pub fn alphabet(&self) -> BTreeSet<Symbol> {
        self.table
            .arguments()
            .map(|arg| arg.symbol().to_string())
            .collect()
    }
}

fn set_start(dfa: &mut Dfa, args: &[&str], _line: usize) -> ParseVerdict {
    dfa.start = args[1].to_string();
    ParseVerdict::ok()
}

fn add_accept(dfa: &mut Dfa, args: &[&str], _line: usize) -> ParseVerdict {
    dfa.accept.extend(args[1..].iter().map(|s| s.to_string()));
    ParseVerdict::ok()
}

impl Description for Dfa {
    const SETTINGS: &'static [Setting<Self>] = &[
        Setting {
            key: "start:",
            arity: Arity::Exactly(2),
            apply: set_start,
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
        let mut verdict = expect_args(args, 4, line);
        if verdict.has_errors() || verdict.merge(expect_token(args, 2, "->", line)) {
            return verdict;
        }
        verdict.merge(check_input_symbol(args[1], None, line));

        self.table.set(
            TransitionArgument::single(args[0], args[1]),
            TransitionResult::to_state(args[3]),
        );
        verdict
    }

    fn transition_edge(&self, args: &[&str]) -> (State, State) {
        (args[0].to_string(), args[3].to_string())
    }

    fn transition_key(&self, args: &[&str]) -> TransitionArgument {
        TransitionArgument::single(args[0], args[1])
    }

    fn check_transitions(&self, _graph: &Graph<State>) -> ParseVerdict {
        ParseVerdict::ok()
    }
}

impl Automaton for Dfa {
    const KIND: MachineKind = MachineKind::Dfa;

    fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn start_state(&self) -> &str {
        &self.start
    }

    fn init(&mut self, input: &str) {
        self.run = Some(Cursor::new(input, &self.start));
    }

    fn is_initialized(&self) -> bool {
        self.run.is_some()
    }

    fn advance(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let Some(symbol) = run.input.get(run.ptr) else {
            return;
        };

        let arg = TransitionArgument::single(run.state.clone(), symbol.clone());
        run.state = match self.table.get(&arg) {
            Some(res) => res.state.clone(),
            None => NO_TRANSITION.to_string(),
        };
        run.ptr += 1;
        trace!(state = %run.state, symbol = %arg.symbol(), "DFA step");
    }

    fn current_state(&self) -> Option<String> {
        self.run.as_ref().map(|run| run.state.clone())
    }

    fn is_in_start_state(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.ptr == 0)
    }

    fn is_in_accept_state(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.at_end() && self.accept.contains(&run.state))
    }

    fn is_in_reject_state(&self) -> bool {
        self.run.as_ref().is_some_and(|run| {
            run.state == NO_TRANSITION || (run.at_end() && !self.accept.contains(&run.state))
        })
    }

    fn tapes(&self) -> usize {
        1
    }

    fn tape_size(&self, _tape: usize) -> usize {
        self.run.as_ref().map_or(0, |run| run.input.len() + 1)
    }

    fn tape_content(&self, _tape: usize, index: usize) -> String {
        self.run
            .as_ref()
            .map(|run| run.content(index))
            .unwrap_or_default()
    }

    fn tape_cell(&self, _tape: usize, index: usize) -> CellKind {
        self.run
            .as_ref()
            .map_or(CellKind::Blank, |run| run.cell(index))
    }

    fn tape_pointer(&self, _tape: usize, index: usize) -> bool {
        self.run.as_ref().is_some_and(|run| run.ptr == index)
    }
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start != DEFAULT_START {
            writeln!(f, "start: {}", self.start)?;
        }
        if !self.accept.is_empty() {
            let accept: Vec<&str> = self.accept.iter().map(String::as_str).collect();
            writeln!(f, "accept: {}", accept.join(" "))?;
        }
        write_transitions(f, &self.table, |arg, res| {
            format!("{} {} -> {}", arg.state, arg.symbol(), res.state)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Halt;

    fn dfa(text: &str) -> Dfa {
        let mut dfa = Dfa::default();
        let verdict = dfa.parse(text);
        assert!(!verdict.has_errors(), "{:?}", verdict.errors());
        dfa
    }

    #[test]
    fn test_parity() {
        let mut dfa = dfa(
            "start: S\naccept: S\nS 0 -> S\nS 1 -> T\nT 0 -> T\nT 1 -> S",
        );

        dfa.init("1010");
        assert!(dfa.is_in_start_state());
        assert_eq!(dfa.run(), Ok(Halt::Accept));
        assert_eq!(dfa.current_state().as_deref(), Some("S"));

        dfa.init("111");
        assert_eq!(dfa.run(), Ok(Halt::Reject));
    }

    #[test]
    fn test_missing_transition_rejects() {
        let mut dfa = dfa("accept: A\nSTART a -> A\n");
        dfa.init("ab");
        assert_eq!(dfa.run(), Ok(Halt::Reject));
        assert_eq!(dfa.current_state().as_deref(), Some(NO_TRANSITION));
    }

    #[test]
    fn test_empty_accept_set_warning() {
        let mut dfa = Dfa::default();
        let verdict = dfa.parse("START a -> START\n");
        assert_eq!(
            verdict.warnings(),
            ["No accept states of the automaton defined. Every input will be rejected"]
        );
    }

    #[test]
    fn test_accept_accumulates_and_settings_end() {
        let mut dfa = Dfa::default();
        let verdict = dfa.parse("accept: A B\naccept: C\nSTART a -> A\nstart: X\n");
        assert_eq!(dfa.accept.len(), 3);
        assert_eq!(dfa.start, DEFAULT_START);
        // a settings key after the first transition is a malformed transition
        assert_eq!(verdict.errors()[0].line, 4);
    }

    #[test]
    fn test_duplicate_transition_keeps_last() {
        let mut dfa = Dfa::default();
        let verdict = dfa.parse("accept: A\nSTART a -> A\nSTART a -> B\n");
        assert_eq!(
            dfa.table.get(&TransitionArgument::single("START", "a")),
            Some(&TransitionResult::to_state("B"))
        );
        assert_eq!(
            verdict.warnings(),
            ["Lines 2, 3: duplicate transition arguments: only the last declaration (line 3) will matter"]
        );
    }

    #[test]
    fn test_malformed_lines_do_not_stop_parsing() {
        let mut dfa = Dfa::default();
        let verdict = dfa.parse("accept: A\nSTART a A\nSTART b => A\nSTART c -> A\n");
        assert_eq!(verdict.errors().len(), 2);
        assert_eq!(verdict.errors()[0].line, 2);
        assert_eq!(verdict.errors()[1].line, 3);
        assert!(dfa.table.contains(&TransitionArgument::single("START", "c")));
    }

    #[test]
    fn test_serialization_round_trip() {
        let source = dfa("start: S\naccept: A\nS 0 -> A\n");
        let text = source.to_string();
        assert_eq!(text, "start: S\naccept: A\n\nS 0 -> A\n");

        let mut copy = dfa(&text);
        assert_eq!(copy.table, source.table);
        for (input, accepted) in [("0", true), ("1", false), ("", false)] {
            copy.init(input);
            assert_eq!(copy.run() == Ok(Halt::Accept), accepted, "input {input:?}");
        }
    }
}
