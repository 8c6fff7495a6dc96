//! This module defines the seven machine kinds and the capabilities they share.
//!
//! Every kind implements [`Automaton`]: it parses its own description format, is started with
//! [`Automaton::init`] and is driven one transition at a time with [`Automaton::step`]. Read-only
//! inspection accessors expose the run state (input cursor, tapes, stacks or counters) as a
//! sequence of tracks of cells. [`Machine`] wraps one machine of any kind.

mod dca;
mod dfa;
mod dpda;
mod mtm;
mod nfa;
mod onetm;
mod tape;
mod tm;

pub use dca::{CounterGuard, CounterUpdate, Dca};
pub use dfa::Dfa;
pub use dpda::Dpda;
pub use mtm::Mtm;
pub use nfa::Nfa;
pub use onetm::OneTm;
pub use tape::Tape;
pub use tm::Tm;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::parser::{parse_description, Description};
use crate::table::TransitionTable;
use crate::types::{
    Halt, MachineError, MachineKind, State, Step, Symbol, TransitionArgument, TransitionResult,
    MAX_EXECUTION_STEPS,
};
use crate::verdict::ParseVerdict;

/// The start state every kind uses unless a description says otherwise.
pub const DEFAULT_START: &str = "START";
/// The default accept state of the Turing-machine kinds.
pub const DEFAULT_ACCEPT: &str = "ACCEPT";
/// The default reject state of the Turing-machine kinds.
pub const DEFAULT_REJECT: &str = "REJECT";
/// The default blank symbol of the Turing-machine kinds.
pub const DEFAULT_BLANK: &str = "_";
/// The default epsilon symbol of the NFA, DCA and DPDA.
pub const DEFAULT_EPS: &str = "eps";
/// The default stack-bottom sentinel of the DPDA.
pub const DEFAULT_BOTTOM: &str = "Z";
/// The default separator between the push lists of different stacks.
pub const DEFAULT_SEPARATOR: &str = ",";
/// The default left-bound sentinel of one-way Turing machines.
pub const DEFAULT_BOUND: &str = "BD";
/// The implicit sink state automata fall into when no transition applies.
pub const NO_TRANSITION: &str = "no transition";

/// What a single inspected cell holds, for callers that render tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    /// A blank tape cell, or the empty input.
    Blank,
    /// A sentinel: the left bound of a one-way tape or the bottom of a stack.
    Boundary,
    /// An ordinary symbol.
    Symbol,
    /// A digit of a counter value.
    Counter { zero: bool },
    /// The position just past the end of the input.
    End,
}

/// The capabilities shared by every machine kind.
///
/// A machine is uninitialized until [`Automaton::init`] is called, running until it reaches a
/// terminal configuration, and then halted with an accept or reject outcome. A later `init`
/// discards the previous run entirely.
pub trait Automaton: Description + fmt::Display + fmt::Debug + Clone {
    /// The kind of this machine.
    const KIND: MachineKind;

    /// Replaces the configuration and table of this machine with the ones described by `text`.
    ///
    /// # Returns
    ///
    /// * A `ParseVerdict` with every fatal and advisory diagnostic of the description.
    fn parse(&mut self, text: &str) -> ParseVerdict {
        parse_description(self, text)
    }

    /// The transition table of this machine.
    fn table(&self) -> &TransitionTable;

    fn start_state(&self) -> &str;

    /// Starts a new run on `input`, one symbol per character.
    fn init(&mut self, input: &str);

    fn is_initialized(&self) -> bool;

    /// Performs one transition of a running, non-terminal machine.
    fn advance(&mut self);

    /// The current control state, or `None` before `init`.
    fn current_state(&self) -> Option<String>;

    fn is_in_start_state(&self) -> bool;

    fn is_in_accept_state(&self) -> bool;

    fn is_in_reject_state(&self) -> bool;

    fn is_in_terminal_state(&self) -> bool {
        self.is_in_accept_state() || self.is_in_reject_state()
    }

    /// The number of inspectable tracks.
    fn tapes(&self) -> usize;

    /// The number of cells of track `tape`.
    fn tape_size(&self, tape: usize) -> usize;

    /// The displayed content of a cell. Blanks and sentinels are shown as empty strings.
    fn tape_content(&self, tape: usize, index: usize) -> String;

    fn tape_cell(&self, tape: usize, index: usize) -> CellKind;

    /// Whether a head or cursor points at a cell.
    fn tape_pointer(&self, tape: usize, index: usize) -> bool;

    /// The outcome of a halted run.
    fn halted(&self) -> Option<Halt> {
        if self.is_in_accept_state() {
            Some(Halt::Accept)
        } else if self.is_in_terminal_state() {
            Some(Halt::Reject)
        } else {
            None
        }
    }

    /// Executes a single step.
    ///
    /// # Returns
    ///
    /// * `Step::Continue` if the machine performed a step and is still running.
    /// * `Step::Halt(_)` if the machine is in a terminal configuration after the step, or was
    ///   already in one (in which case nothing changes).
    /// * `Step::Halt(Halt::Err(MachineError::NotInitialized))` before `init`.
    fn step(&mut self) -> Step {
        if !self.is_initialized() {
            return Step::Halt(Halt::Err(MachineError::NotInitialized));
        }
        if let Some(halt) = self.halted() {
            return Step::Halt(halt);
        }

        self.advance();

        match self.halted() {
            Some(halt) => Step::Halt(halt),
            None => Step::Continue,
        }
    }

    /// Runs the machine until it halts or `MAX_EXECUTION_STEPS` is reached.
    fn run(&mut self) -> Result<Halt, MachineError> {
        self.run_with_limit(MAX_EXECUTION_STEPS)
    }

    /// Runs the machine until it halts or `limit` steps have been executed.
    ///
    /// # Returns
    ///
    /// * `Ok(Halt::Accept)` or `Ok(Halt::Reject)` once the machine halts.
    /// * `Err(MachineError::StepLimit)` if it is still running after `limit` steps.
    /// * `Err(MachineError::NotInitialized)` before `init`.
    fn run_with_limit(&mut self, limit: usize) -> Result<Halt, MachineError> {
        if !self.is_initialized() {
            return Err(MachineError::NotInitialized);
        }
        for _ in 0..limit {
            match self.step() {
                Step::Continue => {}
                Step::Halt(Halt::Err(e)) => return Err(e),
                Step::Halt(halt) => return Ok(halt),
            }
        }
        if let Some(halt) = self.halted() {
            return Ok(halt);
        }

        warn!(kind = %Self::KIND, limit, "Execution step limit reached");
        Err(MachineError::StepLimit(limit))
    }
}

/// The input cursor shared by the automata kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub input: Vec<Symbol>,
    pub ptr: usize,
    pub state: State,
}

impl Cursor {
    pub fn new(input: &str, state: &str) -> Self {
        Self {
            input: symbols_of(input),
            ptr: 0,
            state: state.to_string(),
        }
    }

    pub fn at_end(&self) -> bool {
        self.ptr >= self.input.len()
    }

    /// The next input symbol, or `eps` once the input is exhausted.
    pub fn current<'a>(&'a self, eps: &'a str) -> &'a str {
        self.input.get(self.ptr).map_or(eps, String::as_str)
    }

    pub fn cell(&self, index: usize) -> CellKind {
        if self.input.is_empty() {
            CellKind::Blank
        } else if index < self.input.len() {
            CellKind::Symbol
        } else {
            CellKind::End
        }
    }

    pub fn content(&self, index: usize) -> String {
        self.input.get(index).cloned().unwrap_or_default()
    }
}

/// The position of the first input symbol that no rule of `table` reads.
///
/// Counter and pushdown automata accept only after consuming the whole input, so a run
/// that reaches this position can never accept.
pub(crate) fn unreadable_from(input: &[Symbol], table: &TransitionTable) -> Option<usize> {
    let readable: std::collections::BTreeSet<&str> =
        table.arguments().map(TransitionArgument::symbol).collect();
    input.iter().position(|symbol| !readable.contains(symbol.as_str()))
}

/// Splits an input string into one symbol per character.
pub fn symbols_of(input: &str) -> Vec<Symbol> {
    input.chars().map(String::from).collect()
}

/// Warns about input symbols that can never match because inputs are split per character.
pub(crate) fn check_input_symbol(symbol: &str, eps: Option<&str>, line: usize) -> ParseVerdict {
    if symbol.chars().count() == 1 || Some(symbol) == eps {
        return ParseVerdict::ok();
    }
    ParseVerdict::warning(format!(
        "Line {line}: '{symbol}' is multi-character but inputs are split into one-character symbols"
    ))
}

/// Writes the transitions of `table`, one per line, with an empty line before every group of
/// transitions leaving the same state.
pub(crate) fn write_transitions<F>(
    f: &mut fmt::Formatter<'_>,
    table: &TransitionTable,
    mut line: F,
) -> fmt::Result
where
    F: FnMut(&TransitionArgument, &TransitionResult) -> String,
{
    let mut group: Option<&str> = None;
    for (arg, res) in table.entries() {
        if group != Some(arg.state.as_str()) {
            writeln!(f)?;
            group = Some(&arg.state);
        }
        writeln!(f, "{}", line(arg, res))?;
    }
    Ok(())
}

/// A machine of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Machine {
    Dfa(Dfa),
    Nfa(Nfa),
    Dca(Dca),
    Dpda(Dpda),
    OneTm(OneTm),
    Tm(Tm),
    Mtm(Mtm),
}

macro_rules! dispatch {
    ($machine:expr, $inner:ident => $body:expr) => {
        match $machine {
            Machine::Dfa($inner) => $body,
            Machine::Nfa($inner) => $body,
            Machine::Dca($inner) => $body,
            Machine::Dpda($inner) => $body,
            Machine::OneTm($inner) => $body,
            Machine::Tm($inner) => $body,
            Machine::Mtm($inner) => $body,
        }
    };
}

impl Machine {
    /// Creates an empty machine of `kind` with the default configuration.
    pub fn new(kind: MachineKind) -> Self {
        match kind {
            MachineKind::Dfa => Machine::Dfa(Dfa::default()),
            MachineKind::Nfa => Machine::Nfa(Nfa::default()),
            MachineKind::Dca => Machine::Dca(Dca::default()),
            MachineKind::Dpda => Machine::Dpda(Dpda::default()),
            MachineKind::OneTm => Machine::OneTm(OneTm::default()),
            MachineKind::Tm => Machine::Tm(Tm::default()),
            MachineKind::Mtm => Machine::Mtm(Mtm::default()),
        }
    }

    /// Parses a description of the given kind.
    ///
    /// # Returns
    ///
    /// * `Ok((Machine, warnings))` if the description has no fatal diagnostics.
    /// * `Err(MachineError::Description)` with the first fatal diagnostic otherwise.
    pub fn from_description(
        kind: MachineKind,
        text: &str,
    ) -> Result<(Self, Vec<String>), MachineError> {
        let mut machine = Self::new(kind);
        let warnings = machine.parse(text).into_result()?;
        Ok((machine, warnings))
    }

    pub fn kind(&self) -> MachineKind {
        match self {
            Machine::Dfa(_) => Dfa::KIND,
            Machine::Nfa(_) => Nfa::KIND,
            Machine::Dca(_) => Dca::KIND,
            Machine::Dpda(_) => Dpda::KIND,
            Machine::OneTm(_) => OneTm::KIND,
            Machine::Tm(_) => Tm::KIND,
            Machine::Mtm(_) => Mtm::KIND,
        }
    }

    pub fn parse(&mut self, text: &str) -> ParseVerdict {
        dispatch!(self, m => m.parse(text))
    }

    pub fn table(&self) -> &TransitionTable {
        dispatch!(self, m => m.table())
    }

    pub fn start_state(&self) -> &str {
        dispatch!(self, m => m.start_state())
    }

    pub fn init(&mut self, input: &str) {
        dispatch!(self, m => m.init(input))
    }

    pub fn is_initialized(&self) -> bool {
        dispatch!(self, m => m.is_initialized())
    }

    pub fn step(&mut self) -> Step {
        dispatch!(self, m => m.step())
    }

    pub fn run(&mut self) -> Result<Halt, MachineError> {
        dispatch!(self, m => m.run())
    }

    pub fn run_with_limit(&mut self, limit: usize) -> Result<Halt, MachineError> {
        dispatch!(self, m => m.run_with_limit(limit))
    }

    pub fn halted(&self) -> Option<Halt> {
        dispatch!(self, m => m.halted())
    }

    pub fn current_state(&self) -> Option<String> {
        dispatch!(self, m => m.current_state())
    }

    pub fn is_in_start_state(&self) -> bool {
        dispatch!(self, m => m.is_in_start_state())
    }

    pub fn is_in_accept_state(&self) -> bool {
        dispatch!(self, m => m.is_in_accept_state())
    }

    pub fn is_in_reject_state(&self) -> bool {
        dispatch!(self, m => m.is_in_reject_state())
    }

    pub fn is_in_terminal_state(&self) -> bool {
        dispatch!(self, m => m.is_in_terminal_state())
    }

    pub fn tapes(&self) -> usize {
        dispatch!(self, m => m.tapes())
    }

    pub fn tape_size(&self, tape: usize) -> usize {
        dispatch!(self, m => m.tape_size(tape))
    }

    pub fn tape_content(&self, tape: usize, index: usize) -> String {
        dispatch!(self, m => m.tape_content(tape, index))
    }

    pub fn tape_cell(&self, tape: usize, index: usize) -> CellKind {
        dispatch!(self, m => m.tape_cell(tape, index))
    }

    pub fn tape_pointer(&self, tape: usize, index: usize) -> bool {
        dispatch!(self, m => m.tape_pointer(tape, index))
    }

    /// The displayed content of a whole track, cells concatenated.
    pub fn track(&self, tape: usize) -> String {
        (0..self.tape_size(tape))
            .map(|i| self.tape_content(tape, i))
            .collect()
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, m => fmt::Display::fmt(m, f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARITY: &str = "start: S\naccept: S\nS 0 -> S\nS 1 -> T\nT 0 -> T\nT 1 -> S\n";

    #[test]
    fn test_machine_new_has_kind() {
        for kind in MachineKind::ALL {
            let machine = Machine::new(kind);
            assert_eq!(machine.kind(), kind);
            assert!(!machine.is_initialized());
            assert_eq!(machine.current_state(), None);
        }
    }

    #[test]
    fn test_step_before_init() {
        let mut machine = Machine::new(MachineKind::Tm);
        assert_eq!(
            machine.step(),
            Step::Halt(Halt::Err(MachineError::NotInitialized))
        );
        assert_eq!(machine.run(), Err(MachineError::NotInitialized));
    }

    #[test]
    fn test_from_description_reports_first_error() {
        let result = Machine::from_description(MachineKind::Dfa, "S 0 => A");
        assert!(matches!(
            result,
            Err(MachineError::Description { line: 1, .. })
        ));
    }

    #[test]
    fn test_parity_scenario() {
        let (mut machine, warnings) =
            Machine::from_description(MachineKind::Dfa, PARITY).unwrap();
        assert!(warnings.is_empty());

        machine.init("1010");
        assert_eq!(machine.run(), Ok(Halt::Accept));
        assert_eq!(machine.current_state().as_deref(), Some("S"));

        machine.init("10");
        assert_eq!(machine.run(), Ok(Halt::Reject));
        assert_eq!(machine.current_state().as_deref(), Some("T"));
    }

    #[test]
    fn test_run_with_limit() {
        let looping = "START _ -> START _ >\n";
        let (mut machine, _) = Machine::from_description(MachineKind::Tm, looping).unwrap();
        machine.init("");
        assert_eq!(machine.run_with_limit(50), Err(MachineError::StepLimit(50)));
        assert!(!machine.is_in_terminal_state());
    }

    #[test]
    fn test_halted_machine_does_not_move() {
        let (mut machine, _) = Machine::from_description(MachineKind::Dfa, PARITY).unwrap();
        machine.init("");
        assert_eq!(machine.step(), Step::Halt(Halt::Accept));
        assert_eq!(machine.step(), Step::Halt(Halt::Accept));
    }

    #[test]
    fn test_track_rendering() {
        let (mut machine, _) = Machine::from_description(MachineKind::Dfa, PARITY).unwrap();
        machine.init("01");
        assert_eq!(machine.tapes(), 1);
        assert_eq!(machine.track(0), "01");
        assert!(machine.tape_pointer(0, 0));
        assert_eq!(machine.tape_cell(0, 2), CellKind::End);
    }

    #[test]
    fn test_input_symbol_warning() {
        assert!(!check_input_symbol("a", None, 1).has_warnings());
        assert!(!check_input_symbol("eps", Some("eps"), 1).has_warnings());
        assert_eq!(
            check_input_symbol("ab", Some("eps"), 3).warnings(),
            ["Line 3: 'ab' is multi-character but inputs are split into one-character symbols"]
        );
    }
}
