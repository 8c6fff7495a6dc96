//! This module defines the core data structures shared by every machine kind: symbols and
//! states, transition arguments and results, head directions, execution outcomes and errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::Rule;

/// A symbol of a machine's alphabet. Symbols are opaque tokens.
pub type Symbol = String;
/// A control state of a machine. States are opaque tokens.
pub type State = String;

/// The maximum number of steps `run` executes before giving up.
pub const MAX_EXECUTION_STEPS: usize = 10000;
/// The maximum allowed size for a machine description in bytes.
pub const MAX_DESCRIPTION_SIZE: usize = 65536; // 64KB

/// Represents the possible directions a tape head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// Parses a direction token of a description line.
    ///
    /// # Arguments
    ///
    /// * `token` - One of `>`, `<` or `^`.
    /// * `line` - The line number used in the diagnostic.
    ///
    /// # Returns
    ///
    /// * `Ok(Direction)` for a valid token.
    /// * `Err(String)` with a line-scoped diagnostic otherwise.
    pub fn parse(token: &str, line: usize) -> Result<Self, String> {
        match token {
            ">" => Ok(Direction::Right),
            "<" => Ok(Direction::Left),
            "^" => Ok(Direction::Stay),
            _ => Err(format!(
                "Line {line}: Invalid transition direction '{token}' (expected '>', '<' or '^')"
            )),
        }
    }

    /// Returns the mirrored direction. `Stay` is its own mirror.
    pub fn reverse(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Stay => Direction::Stay,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Direction::Right => ">",
            Direction::Left => "<",
            Direction::Stay => "^",
        };
        f.write_str(token)
    }
}

/// The left-hand side of a transition: a control state plus one observed symbol per track.
///
/// Arguments are ordered by state first and then lexicographically by symbols, which is
/// also the order used when a machine is rendered back to text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionArgument {
    pub state: State,
    pub symbols: Vec<Symbol>,
}

impl TransitionArgument {
    pub fn new(state: impl Into<State>, symbols: Vec<Symbol>) -> Self {
        Self {
            state: state.into(),
            symbols,
        }
    }

    /// Creates an argument for single-track machines.
    pub fn single(state: impl Into<State>, symbol: impl Into<Symbol>) -> Self {
        Self::new(state, vec![symbol.into()])
    }

    /// Returns the symbol of the first track.
    pub fn symbol(&self) -> &str {
        self.symbols.first().map(String::as_str).unwrap_or_default()
    }
}

/// The right-hand side of a transition.
///
/// `directions` is empty for kinds without tape heads (automata, DCA, DPDA).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionResult {
    pub state: State,
    pub symbols: Vec<Symbol>,
    pub directions: Vec<Direction>,
}

impl TransitionResult {
    pub fn new(state: impl Into<State>, symbols: Vec<Symbol>, directions: Vec<Direction>) -> Self {
        Self {
            state: state.into(),
            symbols,
            directions,
        }
    }

    /// Creates a result that only names the next state (finite automata).
    pub fn to_state(state: impl Into<State>) -> Self {
        Self::new(state, Vec::new(), Vec::new())
    }

    /// Creates a result for single-tape machines.
    pub fn single(state: impl Into<State>, symbol: impl Into<Symbol>, direction: Direction) -> Self {
        Self::new(state, vec![symbol.into()], vec![direction])
    }

    /// Returns the written symbol of the first track.
    pub fn symbol(&self) -> &str {
        self.symbols.first().map(String::as_str).unwrap_or_default()
    }

    /// Returns the head movement of the first track, `Stay` if the result has none.
    pub fn direction(&self) -> Direction {
        self.directions.first().copied().unwrap_or(Direction::Stay)
    }

    /// Reinterprets the result as the argument the machine will observe next,
    /// assuming the head does not move.
    pub fn as_argument(&self) -> TransitionArgument {
        TransitionArgument::new(self.state.clone(), self.symbols.clone())
    }
}

/// The kind of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MachineKind {
    Dfa,
    Nfa,
    Dca,
    Dpda,
    OneTm,
    Tm,
    Mtm,
}

impl MachineKind {
    /// All kinds, in declaration order.
    pub const ALL: [MachineKind; 7] = [
        MachineKind::Dfa,
        MachineKind::Nfa,
        MachineKind::Dca,
        MachineKind::Dpda,
        MachineKind::OneTm,
        MachineKind::Tm,
        MachineKind::Mtm,
    ];

    /// The short name used in conversion tags and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            MachineKind::Dfa => "dfa",
            MachineKind::Nfa => "nfa",
            MachineKind::Dca => "dca",
            MachineKind::Dpda => "dpda",
            MachineKind::OneTm => "1tm",
            MachineKind::Tm => "tm",
            MachineKind::Mtm => "mtm",
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MachineKind {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s.to_lowercase())
            .ok_or_else(|| MachineError::UnknownKind(s.to_string()))
    }
}

/// Represents the outcome of a single execution step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The machine performed a step and can continue.
    Continue,
    /// The machine is in a terminal configuration.
    Halt(Halt),
}

/// Why a machine stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    Accept,
    Reject,

    Err(MachineError),
}

/// Represents the errors that can occur while loading, running or converting machines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    /// Indicates that a description line could not be tokenized.
    #[error("Description parsing error: {0}")]
    Parse(#[from] Box<pest::error::Error<Rule>>),
    /// The first fatal diagnostic produced while parsing a description.
    #[error("{message}")]
    Description { line: usize, message: String },
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    File(String),
    /// Indicates a machine kind name that is not recognized.
    #[error("Unknown machine kind: {0}")]
    UnknownKind(String),
    /// Indicates a conversion tag outside the supported vocabulary.
    #[error("Unknown conversion: {0}")]
    UnknownConversion(String),
    /// A conversion was dispatched with a machine of the wrong kind.
    #[error("Conversion {tag} expects a {expected} machine, got {found}")]
    KindMismatch {
        tag: String,
        expected: MachineKind,
        found: MachineKind,
    },
    /// `step` was called before `init`.
    #[error("Machine is not initialized")]
    NotInitialized,
    /// The bounded run helper stopped without reaching a terminal configuration.
    #[error("Step limit of {0} exceeded")]
    StepLimit(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serialization() {
        let left = Direction::Left;
        let right = Direction::Right;

        let left_json = serde_json::to_string(&left).unwrap();
        let right_json = serde_json::to_string(&right).unwrap();

        assert_eq!(left_json, "\"Left\"");
        assert_eq!(right_json, "\"Right\"");

        let left_deserialized: Direction = serde_json::from_str(&left_json).unwrap();
        let right_deserialized: Direction = serde_json::from_str(&right_json).unwrap();

        assert_eq!(left, left_deserialized);
        assert_eq!(right, right_deserialized);
    }

    #[test]
    fn test_direction_tokens() {
        assert_eq!(Direction::parse(">", 1), Ok(Direction::Right));
        assert_eq!(Direction::parse("<", 1), Ok(Direction::Left));
        assert_eq!(Direction::parse("^", 1), Ok(Direction::Stay));

        let err = Direction::parse("R", 7).unwrap_err();
        assert_eq!(
            err,
            "Line 7: Invalid transition direction 'R' (expected '>', '<' or '^')"
        );

        for dir in [Direction::Left, Direction::Right, Direction::Stay] {
            assert_eq!(Direction::parse(&dir.to_string(), 1), Ok(dir));
        }
    }

    #[test]
    fn test_direction_reverse() {
        assert_eq!(Direction::Left.reverse(), Direction::Right);
        assert_eq!(Direction::Right.reverse(), Direction::Left);
        assert_eq!(Direction::Stay.reverse(), Direction::Stay);
    }

    #[test]
    fn test_argument_ordering() {
        let a = TransitionArgument::single("A", "1");
        let b = TransitionArgument::single("A", "2");
        let c = TransitionArgument::single("B", "0");

        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_result_as_argument() {
        let res = TransitionResult::single("q1", "x", Direction::Right);
        assert_eq!(res.as_argument(), TransitionArgument::single("q1", "x"));
        assert_eq!(res.direction(), Direction::Right);
        assert_eq!(TransitionResult::to_state("q").direction(), Direction::Stay);
    }

    #[test]
    fn test_machine_kind_names() {
        for kind in MachineKind::ALL {
            assert_eq!(kind.name().parse::<MachineKind>().unwrap(), kind);
        }
        assert!(matches!(
            "pda".parse::<MachineKind>(),
            Err(MachineError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_error_display() {
        let error = MachineError::KindMismatch {
            tag: "mtm-tm".to_string(),
            expected: MachineKind::Mtm,
            found: MachineKind::Dfa,
        };

        let error_msg = format!("{}", error);
        assert!(error_msg.contains("mtm-tm"));
        assert!(error_msg.contains("mtm machine"));
        assert!(error_msg.contains("dfa"));
    }
}
