use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

use super::{
    check_input_symbol, unreadable_from, write_transitions, Automaton, CellKind, Cursor,
    DEFAULT_BOTTOM, DEFAULT_EPS, DEFAULT_SEPARATOR, DEFAULT_START, NO_TRANSITION,
};
use crate::analyzer::{check_accept_set, check_popped_pushed, collect};
use crate::graph::Graph;
use crate::parser::{
    expect_args_at_least, expect_token, line_width, parse_count, Arity, Description, Setting,
};
use crate::table::TransitionTable;
use crate::types::{MachineKind, State, Symbol, TransitionArgument, TransitionResult};
use crate::verdict::ParseVerdict;

const DEFAULT_STACKS: usize = 1;

/// A deterministic pushdown automaton with any number of stacks.
///
/// Description lines have the form `from symbol t1..tn -> to push...`. Every step pops the
/// top of each stack; the push list after the target state holds one group per stack,
/// separated by the stack separator, whose symbols are pushed in order (the last one ends up
/// on top). Each stack starts with the bottom sentinel, which can be popped only if it is
/// pushed back first.
#[derive(Debug, Clone, PartialEq)]
pub struct Dpda {
    pub(crate) stacks: usize,
    pub(crate) start: State,
    pub(crate) eps: Symbol,
    pub(crate) bottom: Symbol,
    pub(crate) separator: Symbol,
    pub(crate) accept: BTreeSet<State>,
    pub(crate) table: TransitionTable,
    run: Option<StackRun>,
}

#[derive(Debug, Clone, PartialEq)]
struct StackRun {
    cursor: Cursor,
    stacks: Vec<Vec<Symbol>>,
    finished: bool,
    dead_end: Option<usize>,
}

impl Default for Dpda {
    fn default() -> Self {
        Self {
            stacks: DEFAULT_STACKS,
            start: DEFAULT_START.to_string(),
            eps: DEFAULT_EPS.to_string(),
            bottom: DEFAULT_BOTTOM.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            accept: BTreeSet::new(),
            table: TransitionTable::new(),
            run: None,
        }
    }
}

impl Dpda {
    /// Creates a pushdown automaton from its parts, without run state.
    pub fn new(
        stacks: usize,
        start: impl Into<State>,
        eps: impl Into<Symbol>,
        bottom: impl Into<Symbol>,
        separator: impl Into<Symbol>,
        accept: BTreeSet<State>,
        table: TransitionTable,
    ) -> Self {
        Self {
            stacks,
            start: start.into(),
            eps: eps.into(),
            bottom: bottom.into(),
            separator: separator.into(),
            accept,
            table,
            run: None,
        }
    }

    pub fn stacks(&self) -> usize {
        self.stacks
    }

    pub fn eps(&self) -> &str {
        &self.eps
    }

    pub fn bottom(&self) -> &str {
        &self.bottom
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn accept_states(&self) -> &BTreeSet<State> {
        &self.accept
    }

    /// The current stack contents, bottom first.
    pub fn stack_contents(&self) -> Option<&[Vec<Symbol>]> {
        self.run.as_ref().map(|run| run.stacks.as_slice())
    }

    /// Splits a stored push list into one group per stack.
    pub fn push_groups(&self, symbols: &[Symbol]) -> Vec<Vec<Symbol>> {
        let mut groups = vec![Vec::new()];
        for symbol in symbols {
            if *symbol == self.separator {
                groups.push(Vec::new());
            } else if let Some(group) = groups.last_mut() {
                group.push(symbol.clone());
            }
        }
        groups.resize(self.stacks.max(1), Vec::new());
        groups
    }

    /// Joins per-stack push groups into a stored push list. Empty groups are written as `eps`.
    pub fn push_list(&self, groups: &[Vec<Symbol>]) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        for (i, group) in groups.iter().enumerate() {
            if i > 0 {
                symbols.push(self.separator.clone());
            }
            if group.is_empty() {
                symbols.push(self.eps.clone());
            } else {
                symbols.extend(group.iter().cloned());
            }
        }
        symbols
    }

    fn lookup(&self, state: &str, symbol: &str, tops: &[Symbol]) -> Option<&TransitionResult> {
        let mut symbols = vec![symbol.to_string()];
        symbols.extend(tops.iter().cloned());
        self.table.get(&TransitionArgument::new(state, symbols))
    }

    fn check_stack_changes(&self, tops: &[&str], push: &[Symbol], line: usize) -> ParseVerdict {
        let separators = push.iter().filter(|s| **s == self.separator).count();
        if self.stacks > 0 && separators != self.stacks - 1 {
            return ParseVerdict::error(
                format!(
                    "Line {line}: expected {} stack changes after '->' (got {})",
                    self.stacks,
                    separators + 1
                ),
                line,
            );
        }

        let mut verdict = ParseVerdict::ok();
        for (i, top) in tops.iter().enumerate() {
            if *top == self.eps {
                return ParseVerdict::error(
                    format!("Line {line}, stack {}: eps-symbol is forbidden here", i + 1),
                    line,
                );
            }
            if *top == self.separator {
                verdict.put_warning(format!(
                    "Line {line}, stack {}: symbol '{}' is a stack separator",
                    i + 1,
                    self.separator
                ));
            }
        }

        for (i, (top, group)) in tops.iter().zip(self.push_groups(push)).enumerate() {
            let mut pushed = group.iter().peekable();
            if *top == self.bottom {
                if pushed.next_if(|s| **s == self.bottom).is_none() {
                    return ParseVerdict::error(
                        format!(
                            "Line {line}, stack {}: forbidden stack bottom behavior (stack bottom removed)",
                            i + 1
                        ),
                        line,
                    );
                }
            }
            if pushed.any(|s| *s == self.bottom) {
                return ParseVerdict::error(
                    format!(
                        "Line {line}, stack {}: forbidden stack bottom behavior (new stack bottom pushed)",
                        i + 1
                    ),
                    line,
                );
            }
        }
        verdict
    }
}

fn set_stacks(dpda: &mut Dpda, args: &[&str], line: usize) -> ParseVerdict {
    match parse_count(args[1], "stacks", 0, line) {
        Ok(stacks) => {
            dpda.stacks = stacks;
            if stacks == 0 {
                return ParseVerdict::warning(format!(
                    "Line {line}: DPDA with no stacks. Probably a DFA should be used instead"
                ));
            }
            ParseVerdict::ok()
        }
        Err(verdict) => verdict,
    }
}

fn set_start(dpda: &mut Dpda, args: &[&str], _line: usize) -> ParseVerdict {
    dpda.start = args[1].to_string();
    ParseVerdict::ok()
}

fn set_eps(dpda: &mut Dpda, args: &[&str], _line: usize) -> ParseVerdict {
    dpda.eps = args[1].to_string();
    ParseVerdict::ok()
}

fn set_bottom(dpda: &mut Dpda, args: &[&str], _line: usize) -> ParseVerdict {
    dpda.bottom = args[1].to_string();
    ParseVerdict::ok()
}

fn set_separator(dpda: &mut Dpda, args: &[&str], _line: usize) -> ParseVerdict {
    dpda.separator = args[1].to_string();
    ParseVerdict::ok()
}

fn add_accept(dpda: &mut Dpda, args: &[&str], _line: usize) -> ParseVerdict {
    dpda.accept.extend(args[1..].iter().map(|s| s.to_string()));
    ParseVerdict::ok()
}

impl Description for Dpda {
    const SETTINGS: &'static [Setting<Self>] = &[
        Setting {
            key: "stacks:",
            arity: Arity::Exactly(2),
            apply: set_stacks,
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
            key: "bottom:",
            arity: Arity::Exactly(2),
            apply: set_bottom,
        },
        Setting {
            key: "stack-separator:",
            arity: Arity::Exactly(2),
            apply: set_separator,
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
        let n = self.stacks;
        let width = match line_width(n, 1, 4, line) {
            Ok(width) => width,
            Err(verdict) => return verdict,
        };
        let mut verdict = expect_args_at_least(args, width, line);
        if verdict.has_errors() || verdict.merge(expect_token(args, n + 2, "->", line)) {
            return verdict;
        }

        let mut push: Vec<Symbol> = args[n + 4..].iter().map(|s| s.to_string()).collect();
        if n > 0 && push.is_empty() {
            push = vec![self.separator.clone(); n - 1];
        }
        if verdict.merge(self.check_stack_changes(&args[2..n + 2], &push, line)) {
            return verdict;
        }
        verdict.merge(check_input_symbol(args[1], Some(&self.eps), line));

        self.table.set(
            self.transition_key(args),
            TransitionResult::new(args[n + 3], push, Vec::new()),
        );
        verdict
    }

    fn transition_edge(&self, args: &[&str]) -> (State, State) {
        (args[0].to_string(), args[self.stacks + 3].to_string())
    }

    fn transition_key(&self, args: &[&str]) -> TransitionArgument {
        TransitionArgument::new(
            args[0],
            args[1..self.stacks + 2].iter().map(|s| s.to_string()).collect(),
        )
    }

    fn check_transitions(&self, _graph: &Graph<State>) -> ParseVerdict {
        let mut popped = vec![BTreeSet::new(); self.stacks];
        let mut pushed = vec![BTreeSet::new(); self.stacks];
        for (arg, res) in self.table.entries() {
            for (i, group) in self.push_groups(&res.symbols).into_iter().enumerate().take(self.stacks) {
                if let Some(top) = arg.symbols.get(i + 1) {
                    popped[i].insert(top.clone());
                }
                pushed[i].extend(group);
            }
        }
        collect([check_popped_pushed(&popped, &pushed, &self.bottom)])
    }
}

impl Automaton for Dpda {
    const KIND: MachineKind = MachineKind::Dpda;

    fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn start_state(&self) -> &str {
        &self.start
    }

    fn init(&mut self, input: &str) {
        let cursor = Cursor::new(input, &self.start);
        self.run = Some(StackRun {
            dead_end: unreadable_from(&cursor.input, &self.table),
            cursor,
            stacks: vec![vec![self.bottom.clone()]; self.stacks],
            finished: false,
        });
    }

    fn is_initialized(&self) -> bool {
        self.run.is_some()
    }

    fn advance(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if run.dead_end == Some(run.cursor.ptr) {
            run.finished = true;
            run.cursor.state = NO_TRANSITION.to_string();
            trace!(ptr = run.cursor.ptr, "DPDA stuck on an unreadable symbol");
            return;
        }
        let tops: Vec<Symbol> = run
            .stacks
            .iter_mut()
            .map(|stack| stack.pop().unwrap_or_else(|| self.bottom.clone()))
            .collect();
        let state = run.cursor.state.clone();
        let symbol = run.cursor.current(&self.eps).to_string();

        let (next, consumed) = match self.lookup(&state, &symbol, &tops) {
            Some(res) => (Some(res.clone()), symbol != self.eps),
            None => (self.lookup(&state, &self.eps, &tops).cloned(), false),
        };

        let groups = match &next {
            Some(res) => self.push_groups(&res.symbols),
            None => tops.iter().map(|top| vec![top.clone()]).collect(),
        };

        let Some(run) = self.run.as_mut() else {
            return;
        };
        for (stack, group) in run.stacks.iter_mut().zip(groups) {
            stack.extend(group.into_iter().filter(|s| *s != self.eps));
        }
        match next {
            Some(res) => {
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
        trace!(state = %run.cursor.state, "DPDA step");
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
        self.stacks + 1
    }

    fn tape_size(&self, tape: usize) -> usize {
        match (self.run.as_ref(), tape) {
            (None, _) => 0,
            (Some(run), 0) => run.cursor.input.len() + 1,
            (Some(run), t) => run.stacks.get(t - 1).map_or(0, |s| s.len() + 1),
        }
    }

    fn tape_content(&self, tape: usize, index: usize) -> String {
        match (self.run.as_ref(), tape) {
            (None, _) => String::new(),
            (Some(run), 0) => run.cursor.content(index),
            (Some(run), t) => match run.stacks.get(t - 1).and_then(|s| s.get(index)) {
                Some(symbol) if *symbol == self.bottom => String::new(),
                Some(symbol) => symbol.clone(),
                None => String::new(),
            },
        }
    }

    fn tape_cell(&self, tape: usize, index: usize) -> CellKind {
        match (self.run.as_ref(), tape) {
            (None, _) => CellKind::Blank,
            (Some(run), 0) => run.cursor.cell(index),
            (Some(run), t) => match run.stacks.get(t - 1).and_then(|s| s.get(index)) {
                Some(symbol) if *symbol == self.bottom => CellKind::Boundary,
                Some(_) => CellKind::Symbol,
                None => CellKind::End,
            },
        }
    }

    fn tape_pointer(&self, tape: usize, index: usize) -> bool {
        match (self.run.as_ref(), tape) {
            (None, _) => false,
            (Some(run), 0) => run.cursor.ptr == index,
            (Some(run), t) => run
                .stacks
                .get(t - 1)
                .is_some_and(|s| !s.is_empty() && s.len() - 1 == index),
        }
    }
}

impl fmt::Display for Dpda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stacks != DEFAULT_STACKS {
            writeln!(f, "stacks: {}", self.stacks)?;
        }
        if self.start != DEFAULT_START {
            writeln!(f, "start: {}", self.start)?;
        }
        if self.eps != DEFAULT_EPS {
            writeln!(f, "eps: {}", self.eps)?;
        }
        if self.bottom != DEFAULT_BOTTOM {
            writeln!(f, "bottom: {}", self.bottom)?;
        }
        if self.separator != DEFAULT_SEPARATOR {
            writeln!(f, "stack-separator: {}", self.separator)?;
        }
        if !self.accept.is_empty() {
            let accept: Vec<&str> = self.accept.iter().map(String::as_str).collect();
            writeln!(f, "accept: {}", accept.join(" "))?;
        }
        write_transitions(f, &self.table, |arg, res| {
            let mut line = vec![arg.state.clone()];
            line.extend(arg.symbols.iter().cloned());
            line.push("->".to_string());
            line.push(res.state.clone());
            if self.stacks > 0 {
                line.extend(self.push_list(&self.push_groups(&res.symbols)));
            }
            line.join(" ")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Halt;

    // balanced parentheses
    const PARENS: &str = "\
accept: END
START ( Z -> START Z X
START ( X -> START X X
START ) X -> START
START eps Z -> END Z
";

    fn dpda(text: &str) -> Dpda {
        let mut dpda = Dpda::default();
        let verdict = dpda.parse(text);
        assert!(!verdict.has_errors(), "{:?}", verdict.errors());
        dpda
    }

    fn accepts(dpda: &mut Dpda, input: &str) -> bool {
        dpda.init(input);
        dpda.run() == Ok(Halt::Accept)
    }

    #[test]
    fn test_balanced_parentheses() {
        let mut dpda = dpda(PARENS);
        assert!(accepts(&mut dpda, ""));
        assert!(accepts(&mut dpda, "()"));
        assert!(accepts(&mut dpda, "(()())"));
        assert!(!accepts(&mut dpda, "(()"));
        assert!(!accepts(&mut dpda, "())"));
    }

    #[test]
    fn test_unmatched_bracket_stays_on_stack() {
        let mut dpda = dpda(PARENS);
        dpda.init("(()");
        assert_eq!(dpda.run(), Ok(Halt::Reject));
        assert_eq!(dpda.current_state().as_deref(), Some("START"));
        assert_eq!(
            dpda.stack_contents(),
            Some(&[vec!["Z".to_string(), "X".to_string()]][..])
        );
    }

    #[test]
    fn test_stack_inspection() {
        let mut dpda = dpda(PARENS);
        dpda.init("((");
        dpda.step();
        dpda.step();
        assert_eq!(dpda.tapes(), 2);
        assert_eq!(dpda.tape_size(1), 4);
        assert_eq!(dpda.tape_content(1, 0), "");
        assert_eq!(dpda.tape_cell(1, 0), CellKind::Boundary);
        assert_eq!(dpda.tape_content(1, 2), "X");
        assert!(dpda.tape_pointer(1, 2));
    }

    #[test]
    fn test_stack_bottom_rules() {
        let mut dpda = Dpda::default();
        let verdict = dpda.parse("accept: A\nSTART a Z -> A X\nSTART b X -> A X Z\n");
        let messages: Vec<&str> = verdict.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "Line 2, stack 1: forbidden stack bottom behavior (stack bottom removed)",
                "Line 3, stack 1: forbidden stack bottom behavior (new stack bottom pushed)",
            ]
        );
    }

    #[test]
    fn test_stack_changes_count() {
        let mut dpda = Dpda::default();
        let verdict = dpda.parse("stacks: 2\naccept: A\nSTART a Z Z -> A Z\nSTART eps Z Z -> A\n");
        assert_eq!(
            verdict.errors()[0].message,
            "Line 3: expected 2 stack changes after '->' (got 1)"
        );
        // an empty push list pops the tops of every stack
        assert_eq!(verdict.errors()[1].line, 4);
    }

    #[test]
    fn test_eps_top_and_popped_never_pushed() {
        let mut dpda = Dpda::default();
        let verdict = dpda.parse("accept: A\nSTART a eps -> A\nSTART a Y -> A\n");
        assert_eq!(
            verdict.errors()[0].message,
            "Line 2, stack 1: eps-symbol is forbidden here"
        );
        assert_eq!(verdict.warnings(), ["Stack 1: symbol 'Y' is popped but never pushed"]);
    }

    #[test]
    fn test_serialization() {
        let dpda = dpda("stacks: 2\naccept: A\nSTART a Z X -> A Z Y , \n");
        assert_eq!(
            dpda.to_string(),
            "stacks: 2\naccept: A\n\nSTART a Z X -> A Z Y , eps\n"
        );
    }

    #[test]
    fn test_huge_stack_count_is_fatal() {
        let mut dpda = Dpda::default();
        let verdict = dpda.parse("stacks: 9223372036854775807\naccept: A\nSTART a Z -> A Z\n");

        assert!(verdict.has_errors());
        assert_eq!(
            verdict.errors()[0].message,
            "Number of stacks must be at most 256 (got 9223372036854775807)"
        );
    }

    #[test]
    fn test_unreadable_symbol_stops_eps_loop() {
        let mut dpda = dpda("accept: END\nSTART a Z -> END Z\nSTART eps Z -> START Z\n");
        dpda.init("b");
        assert_eq!(dpda.run_with_limit(100), Ok(Halt::Reject));
        assert_eq!(dpda.current_state().as_deref(), Some(NO_TRANSITION));

        dpda.init("a");
        assert_eq!(dpda.run_with_limit(100), Ok(Halt::Accept));
    }
}
