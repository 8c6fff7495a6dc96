//! Reductions between the finite automata, and from a DFA into the richer kinds.

use std::collections::{BTreeSet, VecDeque};

use super::states_with;
use crate::key;
use crate::machine::{Dca, Dfa, Nfa, Tm, DEFAULT_ACCEPT, DEFAULT_BLANK, DEFAULT_EPS, DEFAULT_REJECT};
use crate::namespace::SyntheticNamespace;
use crate::table::TransitionTable;
use crate::types::{Direction, State, Symbol, TransitionArgument, TransitionResult};

/// The empty subset of the subset construction.
const EMPTY_SUBSET: &str = "none";

/// Removes epsilon transitions.
///
/// Every rule `(q, a) -> r` is copied to each state with an epsilon path into `q`, and every
/// state with an epsilon path into an accept state becomes accepting.
pub(super) fn nfa_no_eps(nfa: &Nfa) -> Nfa {
    let into = nfa.eps_graph().inverse();

    let mut table = TransitionTable::new();
    for (arg, res) in nfa.table.entries() {
        if arg.symbol() == nfa.eps {
            continue;
        }
        for from in into.bfs([&arg.state]) {
            let copy = TransitionArgument::single(from, arg.symbol());
            if !table.get_all(&copy).contains(res) {
                table.add(copy, res.clone());
            }
        }
    }

    let accept = into.bfs(&nfa.accept);
    let table = table.remove_unreachable_states(&nfa.start, None, None);
    Nfa::new(nfa.start.clone(), nfa.eps.clone(), accept, table)
}

/// Determinizes an NFA with a total subset construction over its non-eps alphabet.
pub(super) fn nfa_dfa(nfa: &Nfa) -> Dfa {
    let nfa = nfa_no_eps(nfa);
    let alphabet = nfa.alphabet();
    let mut names = SyntheticNamespace::new();

    let start: BTreeSet<State> = BTreeSet::from([nfa.start.clone()]);
    let mut discovered = BTreeSet::from([start.clone()]);
    let mut queue = VecDeque::from([start.clone()]);
    let mut table = TransitionTable::new();
    let mut accept = BTreeSet::new();

    while let Some(subset) = queue.pop_front() {
        let from = subset_label(&mut names, &subset);
        if subset.iter().any(|state| nfa.accept.contains(state)) {
            accept.insert(from.clone());
        }

        for symbol in &alphabet {
            let image: BTreeSet<State> = subset
                .iter()
                .flat_map(|state| {
                    nfa.table
                        .get_all(&TransitionArgument::single(state.clone(), symbol.clone()))
                })
                .map(|res| res.state.clone())
                .collect();
            let to = subset_label(&mut names, &image);
            table.set(
                TransitionArgument::single(from.clone(), symbol.clone()),
                TransitionResult::to_state(to),
            );
            if discovered.insert(image.clone()) {
                queue.push_back(image);
            }
        }
    }

    Dfa::new(subset_label(&mut names, &start), accept, table)
}

/// Names a subset by its members in sorted order, joined with `/`.
fn subset_label(names: &mut SyntheticNamespace, subset: &BTreeSet<State>) -> String {
    let mut key = key!["subset"];
    key.extend(subset.iter().cloned());
    let base = if subset.is_empty() {
        EMPTY_SUBSET.to_string()
    } else {
        subset.iter().map(String::as_str).collect::<Vec<_>>().join("/")
    };
    names.declare(key, &base)
}

/// Declares an epsilon symbol outside the alphabet of `dfa`.
fn fresh_eps(dfa: &Dfa) -> Symbol {
    let mut symbols = SyntheticNamespace::new();
    symbols.reserve_all("symbol", &dfa.alphabet());
    symbols.declare(key!["eps"], DEFAULT_EPS)
}

pub(super) fn dfa_nfa(dfa: &Dfa) -> Nfa {
    Nfa::new(dfa.start.clone(), fresh_eps(dfa), dfa.accept.clone(), dfa.table.clone())
}

pub(super) fn dfa_dca(dfa: &Dfa) -> Dca {
    Dca::new(0, dfa.start.clone(), fresh_eps(dfa), dfa.accept.clone(), dfa.table.clone())
}

/// Runs a DFA on a tape: every rule moves right, and the blank after the input decides.
pub(super) fn dfa_tm(dfa: &Dfa) -> Tm {
    let states = states_with(
        &dfa.table,
        std::iter::once(dfa.start.as_str()).chain(dfa.accept.iter().map(String::as_str)),
    );
    let mut names = SyntheticNamespace::new();
    names.reserve_all("state", &states);
    let accept = names.declare(key!["accept"], DEFAULT_ACCEPT);
    let reject = names.declare(key!["reject"], DEFAULT_REJECT);

    let mut symbols = SyntheticNamespace::new();
    symbols.reserve_all("symbol", &dfa.alphabet());
    let blank = symbols.declare(key!["blank"], DEFAULT_BLANK);

    let mut table = TransitionTable::new();
    for (arg, res) in dfa.table.entries() {
        table.set_move(
            arg.state.clone(),
            arg.symbol(),
            res.state.clone(),
            arg.symbol(),
            Direction::Right,
        );
    }
    for state in &states {
        let verdict = if dfa.accept.contains(state) { &accept } else { &reject };
        table.set_move(state.clone(), blank.clone(), verdict.clone(), blank.clone(), Direction::Stay);
    }

    Tm::new(dfa.start.clone(), accept, reject, blank, table)
}
