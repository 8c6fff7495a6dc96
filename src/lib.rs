//! This crate provides the core logic of an automata workbench.
//! It includes modules for parsing the text descriptions of seven machine kinds (finite,
//! counter and pushdown automata, and one-way, two-way and multi-tape Turing machines),
//! simulating them step by step, analyzing their descriptions, and converting machines
//! between kinds while preserving the accepted language.

pub mod analyzer;
pub mod convert;
pub mod graph;
pub mod loader;
pub mod machine;
pub mod namespace;
pub mod parser;
pub mod samples;
pub mod table;
pub mod types;
pub mod verdict;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the conversion entry points.
pub use convert::{convert, init, ConversionTag};
/// Re-exports the `MachineLoader` struct from the loader module.
pub use loader::MachineLoader;
/// Re-exports the machine kinds and the capabilities they share.
pub use machine::{Automaton, CellKind, Dca, Dfa, Dpda, Machine, Mtm, Nfa, OneTm, Tm};
/// Re-exports the scoped name generator used by the conversions.
pub use namespace::SyntheticNamespace;
/// Re-exports the embedded sample machines.
pub use samples::{Sample, SAMPLES};
/// Re-exports the transition table shared by every kind.
pub use table::TransitionTable;
/// Re-exports the types shared across the crate.
pub use types::{
    Direction, Halt, MachineError, MachineKind, State, Step, Symbol, TransitionArgument,
    TransitionResult, MAX_DESCRIPTION_SIZE, MAX_EXECUTION_STEPS,
};
/// Re-exports the diagnostics produced while parsing a description.
pub use verdict::{Diagnostic, ParseVerdict};
