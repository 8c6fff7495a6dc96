use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

use super::{
    check_input_symbol, symbols_of, write_transitions, Automaton, CellKind, DEFAULT_EPS,
    DEFAULT_START,
};
use crate::analyzer::{check_accept_set, collect};
use crate::graph::Graph;
use crate::parser::{expect_args, expect_token, Arity, Description, Setting};
use crate::table::TransitionTable;
use crate::types::{MachineKind, State, Symbol, TransitionArgument, TransitionResult};
use crate::verdict::ParseVerdict;

/// A nondeterministic finite automaton with epsilon transitions.
///
/// Repeated transition arguments add branches instead of replacing each other. The automaton
/// tracks the set of live states and accepts when the input is exhausted and any live state
/// is accepting.
#[derive(Debug, Clone, PartialEq)]
pub struct Nfa {
    pub(crate) start: State,
    pub(crate) eps: Symbol,
    pub(crate) accept: BTreeSet<State>,
    pub(crate) table: TransitionTable,
    run: Option<NfaRun>,
}

#[derive(Debug, Clone, PartialEq)]
struct NfaRun {
    input: Vec<Symbol>,
    ptr: usize,
    live: BTreeSet<State>,
    eps_graph: Graph<State>,
}

impl Default for Nfa {
    fn default() -> Self {
        Self {
            start: DEFAULT_START.to_string(),
            eps: DEFAULT_EPS.to_string(),
            accept: BTreeSet::new(),
            table: TransitionTable::new(),
            run: None,
        }
    }
}

impl Nfa {
    /// Creates an NFA from its parts, without run state.
    pub fn new(
        start: impl Into<State>,
        eps: impl Into<Symbol>,
        accept: BTreeSet<State>,
        table: TransitionTable,
    ) -> Self {
        Self {
            start: start.into(),
            eps: eps.into(),
            accept,
            table,
            run: None,
        }
    }

    pub fn accept_states(&self) -> &BTreeSet<State> {
        &self.accept
    }

    pub fn eps(&self) -> &str {
        &self.eps
    }

    /// The graph of epsilon transitions between states.
    pub fn eps_graph(&self) -> Graph<State> {
        let mut graph = Graph::new();
        for (arg, res) in self.table.entries() {
            if arg.symbol() == self.eps {
                graph.add_edge(arg.state.clone(), res.state.clone());
            }
        }
        graph
    }

    /// Every non-epsilon input symbol some transition reads.
    pub fn alphabet(&self) -> BTreeSet<Symbol> {
        self.table
            .arguments()
            .map(|arg| arg.symbol())
            .filter(|symbol| *symbol != self.eps)
            .map(str::to_string)
            .collect()
    }

    /// The set of states the automaton may currently be in.
    pub fn live_states(&self) -> Option<&BTreeSet<State>> {
        self.run.as_ref().map(|run| &run.live)
    }

    fn accepts_live(&self, run: &NfaRun) -> bool {
        run.live.iter().any(|state| self.accept.contains(state))
    }
}

fn set_start(nfa: &mut Nfa, args: &[&str], _line: usize) -> ParseVerdict {
    nfa.start = args[1].to_string();
    ParseVerdict::ok()
}

fn set_eps(nfa: &mut Nfa, args: &[&str], _line: usize) -> ParseVerdict {
    nfa.eps = args[1].to_string();
    ParseVerdict::ok()
}

fn add_accept(nfa: &mut Nfa, args: &[&str], _line: usize) -> ParseVerdict {
    nfa.accept.extend(args[1..].iter().map(|s| s.to_string()));
    ParseVerdict::ok()
}

impl Description for Nfa {
    const SETTINGS: &'static [Setting<Self>] = &[
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

    const NONDETERMINISTIC: bool = true;

    fn check_settings(&self) -> ParseVerdict {
        collect([check_accept_set(&self.accept)])
    }

    fn parse_transition(&mut self, args: &[&str], line: usize) -> ParseVerdict {
        let mut verdict = expect_args(args, 4, line);
        if verdict.has_errors() || verdict.merge(expect_token(args, 2, "->", line)) {
            return verdict;
        }

        if args[0] == args[3] && args[1] == self.eps {
            verdict.put_warning(format!("Line {line}: cyclic eps-transition"));
        }
        verdict.merge(check_input_symbol(args[1], Some(&self.eps), line));

        self.table.add(
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

impl Automaton for Nfa {
    const KIND: MachineKind = MachineKind::Nfa;

    fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn start_state(&self) -> &str {
        &self.start
    }

    fn init(&mut self, input: &str) {
        let eps_graph = self.eps_graph();
        let live = eps_graph.bfs([&self.start]);
        self.run = Some(NfaRun {
            input: symbols_of(input),
            ptr: 0,
            live,
            eps_graph,
        });
    }

    fn is_initialized(&self) -> bool {
        self.run.is_some()
    }

    fn advance(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let Some(symbol) = run.input.get(run.ptr).cloned() else {
            return;
        };
        run.ptr += 1;

        let targets: Vec<State> = run
            .live
            .iter()
            .flat_map(|state| {
                self.table
                    .get_all(&TransitionArgument::single(state.clone(), symbol.clone()))
            })
            .map(|res| res.state.clone())
            .collect();
        run.live = run.eps_graph.bfs(&targets);

        trace!(symbol = %symbol, live = run.live.len(), "NFA step");
    }

    fn current_state(&self) -> Option<String> {
        self.run.as_ref().map(|run| {
            run.live
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
    }

    fn is_in_start_state(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.ptr == 0)
    }

    fn is_in_accept_state(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.ptr == run.input.len() && self.accepts_live(run))
    }

    fn is_in_reject_state(&self) -> bool {
        self.is_in_terminal_state() && !self.is_in_accept_state()
    }

    fn is_in_terminal_state(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.ptr == run.input.len() || run.live.is_empty())
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
            .and_then(|run| run.input.get(index).cloned())
            .unwrap_or_default()
    }

    fn tape_cell(&self, _tape: usize, index: usize) -> CellKind {
        match self.run.as_ref() {
            Some(run) if run.input.is_empty() => CellKind::Blank,
            Some(run) if index < run.input.len() => CellKind::Symbol,
            Some(_) => CellKind::End,
            None => CellKind::Blank,
        }
    }

    fn tape_pointer(&self, _tape: usize, index: usize) -> bool {
        self.run.as_ref().is_some_and(|run| run.ptr == index)
    }
}

impl fmt::Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
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
            format!("{} {} -> {}", arg.state, arg.symbol(), res.state)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Halt, Step};

    fn nfa(text: &str) -> Nfa {
        let mut nfa = Nfa::default();
        let verdict = nfa.parse(text);
        assert!(!verdict.has_errors(), "{:?}", verdict.errors());
        nfa
    }

    fn accepts(nfa: &mut Nfa, input: &str) -> bool {
        nfa.init(input);
        nfa.run() == Ok(Halt::Accept)
    }

    #[test]
    fn test_branches_accumulate() {
        let nfa = nfa("accept: B\nSTART a -> A\nSTART a -> B\n");
        let results = nfa.table.get_all(&TransitionArgument::single("START", "a"));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_ends_with_ab() {
        let mut nfa = nfa(
            "accept: C\nSTART a -> START\nSTART b -> START\nSTART a -> B\nB b -> C\n",
        );
        assert!(accepts(&mut nfa, "ab"));
        assert!(accepts(&mut nfa, "babab"));
        assert!(!accepts(&mut nfa, "aba"));
        assert!(!accepts(&mut nfa, ""));
    }

    #[test]
    fn test_eps_closure_on_init() {
        let mut nfa = nfa("accept: C\nSTART eps -> B\nB eps -> C\nC eps -> START\n");
        nfa.init("");
        assert_eq!(nfa.current_state().as_deref(), Some("B, C, START"));
        assert_eq!(nfa.run(), Ok(Halt::Accept));
    }

    #[test]
    fn test_dead_end_is_terminal_reject() {
        let mut nfa = nfa("accept: A\nSTART a -> A\n");
        nfa.init("ba");
        assert_eq!(nfa.step(), Step::Halt(Halt::Reject));
        assert!(nfa.is_in_reject_state());
        assert_eq!(nfa.current_state().as_deref(), Some(""));
    }

    #[test]
    fn test_cyclic_eps_warning() {
        let mut nfa = Nfa::default();
        let verdict = nfa.parse("accept: A\nSTART eps -> START\n");
        assert_eq!(verdict.warnings(), ["Line 2: cyclic eps-transition"]);
    }

    #[test]
    fn test_serialization() {
        let nfa = nfa("eps: e\naccept: A\nSTART e -> A\nSTART e -> B\n");
        assert_eq!(
            nfa.to_string(),
            "eps: e\naccept: A\n\nSTART e -> A\nSTART e -> B\n"
        );
    }
}
