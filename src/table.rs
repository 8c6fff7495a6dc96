//! This module provides `TransitionTable`, the step function shared by every machine kind.
//!
//! The table is a multimap from `TransitionArgument` to one or more `TransitionResult`s.
//! Deterministic kinds write with [`TransitionTable::set`] (last write wins), the NFA writes
//! with [`TransitionTable::add`] and reads every branch with [`TransitionTable::get_all`].

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::Graph;
use crate::types::{Direction, State, Symbol, TransitionArgument, TransitionResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionTable {
    entries: BTreeMap<TransitionArgument, Vec<TransitionResult>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every result stored for `arg` with `res`.
    pub fn set(&mut self, arg: TransitionArgument, res: TransitionResult) {
        self.entries.insert(arg, vec![res]);
    }

    /// Appends `res` to the results stored for `arg`.
    pub fn add(&mut self, arg: TransitionArgument, res: TransitionResult) {
        self.entries.entry(arg).or_default().push(res);
    }

    /// Appends `res` to the results stored for `arg` unless it is already there.
    pub fn add_unique(&mut self, arg: TransitionArgument, res: TransitionResult) {
        let results = self.entries.entry(arg).or_default();
        if !results.contains(&res) {
            results.push(res);
        }
    }

    /// Single-tape shorthand for `set`.
    pub fn set_move(
        &mut self,
        from: impl Into<State>,
        read: impl Into<Symbol>,
        to: impl Into<State>,
        write: impl Into<Symbol>,
        dir: Direction,
    ) {
        self.set(
            TransitionArgument::single(from, read),
            TransitionResult::single(to, write, dir),
        );
    }

    /// Moves over `symbol` in `dir` without changing state or tape.
    pub fn pass(&mut self, state: &str, symbol: &str, dir: Direction) {
        self.set_move(state, symbol, state, symbol, dir);
    }

    /// Returns the first result stored for `arg`.
    pub fn get(&self, arg: &TransitionArgument) -> Option<&TransitionResult> {
        self.entries.get(arg).and_then(|results| results.first())
    }

    /// Returns every result stored for `arg`, in insertion order.
    pub fn get_all(&self, arg: &TransitionArgument) -> &[TransitionResult] {
        self.entries.get(arg).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, arg: &TransitionArgument) -> bool {
        self.entries.contains_key(arg)
    }

    /// Iterates over the distinct arguments in sorted order.
    pub fn arguments(&self) -> impl Iterator<Item = &TransitionArgument> {
        self.entries.keys()
    }

    /// Iterates over every (argument, result) pair, one pair per stored result.
    pub fn entries(&self) -> impl Iterator<Item = (&TransitionArgument, &TransitionResult)> {
        self.entries
            .iter()
            .flat_map(|(arg, results)| results.iter().map(move |res| (arg, res)))
    }

    /// The number of distinct arguments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a table with the entries whose argument satisfies `pred`.
    pub fn select<F>(&self, pred: F) -> Self
    where
        F: Fn(&TransitionArgument) -> bool,
    {
        self.filter(|arg, _| pred(arg))
    }

    /// Returns a table with the entries whose result satisfies `pred`.
    pub fn select_by_result<F>(&self, pred: F) -> Self
    where
        F: Fn(&TransitionResult) -> bool,
    {
        self.filter(|_, res| pred(res))
    }

    fn filter<F>(&self, keep: F) -> Self
    where
        F: Fn(&TransitionArgument, &TransitionResult) -> bool,
    {
        let mut table = Self::new();
        for (arg, res) in self.entries() {
            if keep(arg, res) {
                table.add(arg.clone(), res.clone());
            }
        }
        table
    }

    /// Every state mentioned as a source or a target.
    pub fn states(&self) -> BTreeSet<State> {
        self.entries()
            .flat_map(|(arg, res)| [arg.state.clone(), res.state.clone()])
            .collect()
    }

    /// The graph of source state to target state edges.
    pub fn state_graph(&self) -> Graph<State> {
        let mut graph = Graph::new();
        for (arg, res) in self.entries() {
            graph.add_edge(arg.state.clone(), res.state.clone());
        }
        graph
    }

    /// Returns a table without the transitions of states unreachable from `start`.
    ///
    /// The start, accept and reject states are anchors: their outgoing transitions are kept
    /// even when the state graph never reaches them.
    pub fn remove_unreachable_states(
        &self,
        start: &str,
        accept: Option<&str>,
        reject: Option<&str>,
    ) -> Self {
        let graph = self.state_graph();
        let start = start.to_string();
        let mut keep = graph.bfs([&start]);
        keep.insert(start);
        keep.extend(accept.into_iter().chain(reject).map(str::to_string));

        self.select(|arg| keep.contains(&arg.state))
    }

    /// Returns a table in which `old_blank` is written as `new_blank`.
    ///
    /// A rule reading `old_blank` is kept and additionally registered for `new_blank`, so the
    /// machine treats both symbols as blank when reading.
    pub fn replace_blanks(&self, old_blank: &str, new_blank: &str) -> Self {
        let swap = |symbols: &[Symbol]| -> Vec<Symbol> {
            symbols
                .iter()
                .map(|s| {
                    if s == old_blank {
                        new_blank.to_string()
                    } else {
                        s.clone()
                    }
                })
                .collect()
        };

        let mut table = Self::new();
        for (arg, res) in self.entries() {
            let res = TransitionResult::new(res.state.clone(), swap(&res.symbols), res.directions.clone());
            table.add_unique(arg.clone(), res.clone());
            if arg.symbols.iter().any(|s| s == old_blank) {
                table.add_unique(TransitionArgument::new(arg.state.clone(), swap(&arg.symbols)), res);
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(state: &str, sym: &str) -> TransitionArgument {
        TransitionArgument::single(state, sym)
    }

    fn res(state: &str) -> TransitionResult {
        TransitionResult::to_state(state)
    }

    #[test]
    fn test_set_keeps_last() {
        let mut table = TransitionTable::new();
        table.set(arg("q", "a"), res("r1"));
        table.set(arg("q", "a"), res("r2"));

        assert_eq!(table.get(&arg("q", "a")), Some(&res("r2")));
        assert_eq!(table.get_all(&arg("q", "a")).len(), 1);
    }

    #[test]
    fn test_add_accumulates() {
        let mut table = TransitionTable::new();
        table.add(arg("q", "a"), res("r1"));
        table.add(arg("q", "a"), res("r2"));

        assert_eq!(table.get_all(&arg("q", "a")), &[res("r1"), res("r2")]);
        assert_eq!(table.get(&arg("q", "a")), Some(&res("r1")));
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries().count(), 2);
    }

    #[test]
    fn test_missing_argument() {
        let table = TransitionTable::new();
        assert_eq!(table.get(&arg("q", "a")), None);
        assert!(table.get_all(&arg("q", "a")).is_empty());
    }

    #[test]
    fn test_select_and_select_by_result() {
        let mut table = TransitionTable::new();
        table.set_move("q", "a", "q", "b", Direction::Right);
        table.set_move("q", "b", "h", "b", Direction::Stay);
        table.set_move("p", "a", "h", "a", Direction::Left);

        let from_q = table.select(|a| a.state == "q");
        assert_eq!(from_q.len(), 2);

        let stays = table.select_by_result(|r| r.direction() == Direction::Stay);
        assert_eq!(stays.len(), 1);
        assert!(stays.contains(&arg("q", "b")));
    }

    #[test]
    fn test_remove_unreachable_states() {
        let mut table = TransitionTable::new();
        table.set(arg("S", "a"), res("A"));
        table.set(arg("A", "a"), res("S"));
        table.set(arg("X", "a"), res("Y"));
        table.set(arg("Y", "a"), res("X"));
        table.set(arg("R", "a"), res("S"));
        table.set(arg("ACC", "a"), res("S"));

        let pruned = table.remove_unreachable_states("S", Some("ACC"), Some("R"));

        assert!(pruned.contains(&arg("S", "a")));
        assert!(pruned.contains(&arg("A", "a")));
        assert!(pruned.contains(&arg("R", "a")));
        assert!(pruned.contains(&arg("ACC", "a")));
        assert!(!pruned.contains(&arg("X", "a")));
        assert!(!pruned.contains(&arg("Y", "a")));
    }

    #[test]
    fn test_remove_unreachable_keeps_isolated_start() {
        let mut table = TransitionTable::new();
        table.set(arg("S", "a"), res("S"));

        let pruned = table.remove_unreachable_states("S", None, None);
        assert_eq!(pruned, table);
    }

    #[test]
    fn test_replace_blanks() {
        let mut table = TransitionTable::new();
        table.set_move("q", "_", "r", "_", Direction::Right);
        table.set_move("q", "a", "r", "_", Direction::Left);

        let replaced = table.replace_blanks("_", "#");

        let on_old = replaced.get(&arg("q", "_")).unwrap();
        assert_eq!(on_old.symbol(), "#");
        let on_new = replaced.get(&arg("q", "#")).unwrap();
        assert_eq!(on_new, on_old);
        assert_eq!(replaced.get(&arg("q", "a")).unwrap().symbol(), "#");
        assert_eq!(replaced.len(), 3);
    }

    #[test]
    fn test_replace_blanks_keeps_every_branch() {
        let mut table = TransitionTable::new();
        table.add(arg("q", "_"), res("r1"));
        table.add(arg("q", "_"), res("r2"));

        let replaced = table.replace_blanks("_", "#");

        assert_eq!(replaced.get_all(&arg("q", "_")), &[res("r1"), res("r2")]);
        assert_eq!(replaced.get_all(&arg("q", "#")), &[res("r1"), res("r2")]);
    }

    #[test]
    fn test_add_unique_skips_repeats() {
        let mut table = TransitionTable::new();
        table.add_unique(arg("q", "a"), res("r"));
        table.add_unique(arg("q", "a"), res("r"));
        assert_eq!(table.get_all(&arg("q", "a")).len(), 1);
    }

    #[test]
    fn test_states() {
        let mut table = TransitionTable::new();
        table.set(arg("S", "a"), res("A"));
        table.set(arg("A", "b"), res("B"));

        let states: Vec<_> = table.states().into_iter().collect();
        assert_eq!(states, vec!["A", "B", "S"]);
    }
}
