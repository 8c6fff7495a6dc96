//! This module provides the checks that run once a description has been read, detecting
//! inconsistent settings and suspicious (but executable) transition tables.
//!
//! Only [`AnalysisIssue::EqualSettings`] is fatal. Everything else is advisory and never
//! prevents a machine from running.

use std::collections::BTreeSet;

use crate::graph::Graph;
use crate::types::{State, Symbol};
use crate::verdict::ParseVerdict;

/// Represents the problems that can be found while analyzing a parsed description.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalysisIssue {
    /// Two settings that must differ carry the same name: (first role, second role, name).
    EqualSettings(&'static str, &'static str, String),
    /// An automaton without any accept state.
    EmptyAcceptSet,
    /// The accept state cannot be reached from the start state: (accept, start).
    UnreachableAccept(State, State),
    /// States that are never reached from the start state.
    UnreachableStates(Vec<State>),
    /// Symbols read on a secondary tape that no transition ever writes: (tape, symbol), 1-based.
    ReadNeverWritten(Vec<(usize, Symbol)>),
    /// Stack symbols a transition pops that no transition ever pushes: (stack, symbol), 1-based.
    PoppedNeverPushed(Vec<(usize, Symbol)>),
}

impl From<AnalysisIssue> for ParseVerdict {
    /// Converts an `AnalysisIssue` into the diagnostics it stands for.
    fn from(issue: AnalysisIssue) -> Self {
        match issue {
            AnalysisIssue::EqualSettings(first, second, name) => {
                ParseVerdict::error(format!("Names of {first} and {second} are equal ({name})"), 0)
            }
            AnalysisIssue::EmptyAcceptSet => ParseVerdict::warning(
                "No accept states of the automaton defined. Every input will be rejected",
            ),
            AnalysisIssue::UnreachableAccept(accept, start) => ParseVerdict::warning(format!(
                "Accept state '{accept}' is unreachable from the start state '{start}'. \
                 Any input of this machine will be either rejected or entered to infinite loop"
            )),
            AnalysisIssue::UnreachableStates(states) => {
                if let [state] = states.as_slice() {
                    ParseVerdict::warning(format!(
                        "State {state} is unreachable from start state and therefore is useless"
                    ))
                } else {
                    ParseVerdict::warning(format!(
                        "States {} are unreachable from start state and therefore are useless",
                        states.join(", ")
                    ))
                }
            }
            AnalysisIssue::ReadNeverWritten(symbols) => {
                let mut verdict = ParseVerdict::ok();
                for (tape, symbol) in symbols {
                    verdict.put_warning(format!(
                        "Tape {tape}: symbol '{symbol}' is read but never written"
                    ));
                }
                verdict
            }
            AnalysisIssue::PoppedNeverPushed(symbols) => {
                let mut verdict = ParseVerdict::ok();
                for (stack, symbol) in symbols {
                    verdict.put_warning(format!(
                        "Stack {stack}: symbol '{symbol}' is popped but never pushed"
                    ));
                }
                verdict
            }
        }
    }
}

/// Folds the outcome of several checks into one verdict.
///
/// # Example
///
/// ```
/// use automata::analyzer::{check_accept_set, check_distinct, collect};
/// use std::collections::BTreeSet;
///
/// let verdict = collect([
///     check_distinct(&[("accept state", "A"), ("reject state", "R")]),
///     check_accept_set(&BTreeSet::new()),
/// ]);
/// assert!(!verdict.has_errors());
/// assert_eq!(verdict.warnings().len(), 1);
/// ```
pub fn collect<I>(results: I) -> ParseVerdict
where
    I: IntoIterator<Item = Result<(), AnalysisIssue>>,
{
    let mut verdict = ParseVerdict::ok();
    for issue in results.into_iter().filter_map(Result::err) {
        verdict.merge(issue.into());
    }
    verdict
}

/// Checks that every pair of named settings differs.
///
/// # Arguments
///
/// * `named` - (role, name) pairs such as `("accept state", "ACCEPT")`. Every pair of
///   entries is compared in order.
///
/// # Returns
///
/// * `Ok(())` if all names are distinct.
/// * `Err(AnalysisIssue::EqualSettings)` for the first pair that collides.
pub fn check_distinct(named: &[(&'static str, &str)]) -> Result<(), AnalysisIssue> {
    for (i, (first_role, first)) in named.iter().enumerate() {
        for (second_role, second) in &named[i + 1..] {
            if first == second {
                return Err(AnalysisIssue::EqualSettings(
                    first_role,
                    second_role,
                    first.to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Checks that an automaton has at least one accept state.
pub fn check_accept_set(accept: &BTreeSet<State>) -> Result<(), AnalysisIssue> {
    if accept.is_empty() {
        return Err(AnalysisIssue::EmptyAcceptSet);
    }
    Ok(())
}

/// Checks that the accept state and every mentioned state are reachable from the start.
///
/// Every state may fall into the reject state on a missing transition, so the reject state
/// is joined to all states before the search.
///
/// # Arguments
///
/// * `graph` - The source-to-target state graph of the parsed transitions.
pub fn check_reachability(
    graph: &Graph<State>,
    start: &str,
    accept: &str,
    reject: &str,
) -> Result<(), AnalysisIssue> {
    let mut graph = graph.clone();
    graph.add_vertex(start.to_string());
    graph.add_vertex(accept.to_string());
    graph.join_with_all(reject.to_string());

    let start = start.to_string();
    let reached = graph.bfs([&start]);

    if !reached.contains(accept) {
        return Err(AnalysisIssue::UnreachableAccept(accept.to_string(), start));
    }

    let unreachable: Vec<State> = graph
        .vertices()
        .iter()
        .filter(|state| !reached.contains(*state))
        .cloned()
        .collect();
    if !unreachable.is_empty() {
        return Err(AnalysisIssue::UnreachableStates(unreachable));
    }
    Ok(())
}

/// Checks that every symbol read on a secondary tape is also written on it.
///
/// The first tape holds the input, so its symbols need no writer.
///
/// # Arguments
///
/// * `read` - Per tape, the symbols the transitions read.
/// * `written` - Per tape, the symbols the transitions write.
/// * `blank` - The blank symbol, which is always present.
pub fn check_read_written(
    read: &[BTreeSet<Symbol>],
    written: &[BTreeSet<Symbol>],
    blank: &str,
) -> Result<(), AnalysisIssue> {
    let missing = missing_writers(read, written, blank, 1);
    if !missing.is_empty() {
        return Err(AnalysisIssue::ReadNeverWritten(missing));
    }
    Ok(())
}

/// Checks that every symbol popped from a stack is also pushed onto it.
///
/// # Arguments
///
/// * `popped` - Per stack, the symbols the transitions expect on top.
/// * `pushed` - Per stack, the symbols the transitions push.
/// * `bottom` - The stack-bottom sentinel, which is always present.
pub fn check_popped_pushed(
    popped: &[BTreeSet<Symbol>],
    pushed: &[BTreeSet<Symbol>],
    bottom: &str,
) -> Result<(), AnalysisIssue> {
    let missing = missing_writers(popped, pushed, bottom, 0);
    if !missing.is_empty() {
        return Err(AnalysisIssue::PoppedNeverPushed(missing));
    }
    Ok(())
}

fn missing_writers(
    read: &[BTreeSet<Symbol>],
    written: &[BTreeSet<Symbol>],
    preset: &str,
    skip: usize,
) -> Vec<(usize, Symbol)> {
    let empty = BTreeSet::new();
    read.iter()
        .enumerate()
        .skip(skip)
        .flat_map(|(track, symbols)| {
            let writers = written.get(track).unwrap_or(&empty);
            symbols
                .iter()
                .filter(move |symbol| symbol.as_str() != preset && !writers.contains(*symbol))
                .map(move |symbol| (track + 1, symbol.clone()))
        })
        .collect()
}
