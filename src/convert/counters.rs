//! Reductions of counter automata.
//!
//! A DCA with more than two counters is simulated with two: the first holds the Gödel number
//! `p1^c1 * ... * pn^cn` of the source counters (the first n primes), the second is scratch
//! space that is empty between macro steps. Guards become residue tests, increments become
//! multiplications and decrements become divisions, all driven by eps transitions.

use std::collections::BTreeSet;

use super::states_with;
use crate::key;
use crate::machine::{CounterGuard, CounterUpdate, Dca, Dpda, DEFAULT_BOTTOM, DEFAULT_SEPARATOR};
use crate::namespace::{primes, product, SyntheticNamespace};
use crate::table::TransitionTable;
use crate::types::{State, Symbol, TransitionArgument, TransitionResult};

use CounterGuard::{Positive, Zero};
use CounterUpdate::{Decrement, Increment, Keep};

/// The stack symbol counting one unit of a counter.
const UNIT: &str = "1";

/// Simulates each counter with a stack of units above the bottom.
pub(super) fn dca_dpda(dca: &Dca) -> Dpda {
    let mut symbols = SyntheticNamespace::new();
    let eps = symbols.reserve(key!["eps"], &dca.eps);
    let bottom = symbols.declare(key!["bottom"], DEFAULT_BOTTOM);
    let unit = symbols.declare(key!["unit"], UNIT);
    let separator = symbols.declare(key!["separator"], DEFAULT_SEPARATOR);

    let mut dpda = Dpda::new(
        dca.counters,
        dca.start.clone(),
        eps,
        bottom.clone(),
        separator,
        dca.accept.clone(),
        TransitionTable::new(),
    );

    let mut table = TransitionTable::new();
    for (arg, res) in dca.table.entries() {
        let tops: Vec<Symbol> = Dca::guards(arg)
            .into_iter()
            .map(|guard| match guard {
                Zero => bottom.clone(),
                Positive => unit.clone(),
            })
            .collect();
        let groups: Vec<Vec<Symbol>> = tops
            .iter()
            .zip(Dca::updates(res))
            .map(|(top, update)| match update {
                Increment => vec![top.clone(), unit.clone()],
                Keep => vec![top.clone()],
                Decrement => Vec::new(),
            })
            .collect();

        let mut observed = vec![arg.symbol().to_string()];
        observed.extend(tops);
        table.set(
            TransitionArgument::new(arg.state.clone(), observed),
            TransitionResult::new(res.state.clone(), dpda.push_list(&groups), Vec::new()),
        );
    }
    dpda.table = table;
    dpda
}

/// Reduces a DCA to at most two counters. Machines that already have at most two are copied.
pub(super) fn dca_two_counters(dca: &Dca) -> Dca {
    if dca.counters <= 2 {
        return Dca::new(
            dca.counters,
            dca.start.clone(),
            dca.eps.clone(),
            dca.accept.clone(),
            dca.table.clone(),
        );
    }
    Packing::new(dca).build()
}

struct Packing<'a> {
    dca: &'a Dca,
    primes: Vec<u64>,
    names: SyntheticNamespace,
    table: TransitionTable,
}

fn guard_code(guards: &[CounterGuard]) -> String {
    guards.iter().map(ToString::to_string).collect()
}

fn update_code(updates: &[CounterUpdate]) -> String {
    updates.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

/// Every guard vector of length `n`.
fn guard_vectors(n: usize) -> Vec<Vec<CounterGuard>> {
    let domain: Vec<String> = CounterGuard::ALL.iter().map(ToString::to_string).collect();
    product(&vec![domain; n])
        .into_iter()
        .map(|codes| codes.iter().filter_map(|code| code.parse().ok()).collect())
        .collect()
}

impl<'a> Packing<'a> {
    fn new(dca: &'a Dca) -> Self {
        Self {
            dca,
            primes: primes(dca.counters),
            names: SyntheticNamespace::new(),
            table: TransitionTable::new(),
        }
    }

    fn build(mut self) -> Dca {
        let dca = self.dca;
        let eps = dca.eps.clone();
        let start = self.names.declare(key!["start"], &dca.start);

        // all source counters are zero, so the packed value starts at 1
        let first = self.test_state(&dca.start, 0, &[], 0);
        self.rule(&start, &eps, [Zero, Zero], &first, [Increment, Keep]);

        let states = states_with(
            &dca.table,
            std::iter::once(dca.start.as_str()).chain(dca.accept.iter().map(String::as_str)),
        );
        let mut accept = BTreeSet::new();
        for state in &states {
            self.residue_tests(state);
            for guards in guard_vectors(dca.counters) {
                let ready = self.ready_state(state, &guards);
                if dca.accept.contains(state) {
                    accept.insert(ready.clone());
                }
                let rules = dca
                    .table
                    .entries()
                    .filter(|(arg, _)| arg.state == *state && Dca::guards(arg) == guards);
                for (arg, res) in rules {
                    let next = self.apply(&res.state, &Dca::updates(res), 0);
                    self.rule(&ready, arg.symbol(), [Positive, Zero], &next, [Keep, Keep]);
                }
            }
        }

        let table = self.table.remove_unreachable_states(&start, None, None);
        Dca::new(2, start, eps, accept, table)
    }

    fn rule(
        &mut self,
        from: &str,
        symbol: &str,
        guards: [CounterGuard; 2],
        to: &str,
        updates: [CounterUpdate; 2],
    ) {
        self.table
            .set(Dca::argument(from, symbol, &guards), Dca::result(to, &updates));
    }

    fn eps_rule(&mut self, from: &str, guards: [CounterGuard; 2], to: &str, updates: [CounterUpdate; 2]) {
        let eps = self.dca.eps.clone();
        self.rule(from, &eps, guards, to, updates);
    }

    /// The state that knows every guard of `state` and consumes the next input symbol.
    fn ready_state(&mut self, state: &str, guards: &[CounterGuard]) -> State {
        let code = guard_code(guards);
        self.names
            .declare(key!["ready", state, code], &format!("{state}[{code}]"))
    }

    /// The state counting the packed value modulo the prime of `counter`.
    fn test_state(&mut self, state: &str, counter: usize, known: &[CounterGuard], residue: u64) -> State {
        let code = guard_code(known);
        self.names.declare(
            key!["test", state, counter, code, residue],
            &format!("{state}-test{}{code}-{residue}", counter + 1),
        )
    }

    /// The state moving the scratch counter back after a residue test.
    fn restore_state(&mut self, state: &str, known: &[CounterGuard]) -> State {
        let code = guard_code(known);
        self.names
            .declare(key!["restore", state, code], &format!("{state}-restore{code}"))
    }

    /// Tests every source counter of `state` for zero, one prime at a time, ending in the
    /// ready state of the guard vector found.
    fn residue_tests(&mut self, state: &str) {
        let n = self.dca.counters;
        for counter in 0..n {
            let p = self.primes[counter];
            for known in guard_vectors(counter) {
                for residue in 0..p {
                    let here = self.test_state(state, counter, &known, residue);
                    let next = self.test_state(state, counter, &known, (residue + 1) % p);
                    for scratch in CounterGuard::ALL {
                        self.eps_rule(&here, [Positive, scratch], &next, [Decrement, Increment]);
                    }

                    let mut found = known.clone();
                    found.push(if residue == 0 { Positive } else { Zero });
                    let restore = self.restore_state(state, &found);
                    self.eps_rule(&here, [Zero, Positive], &restore, [Keep, Keep]);
                }
            }

            for found in guard_vectors(counter + 1) {
                let restore = self.restore_state(state, &found);
                let after = if counter + 1 < n {
                    self.test_state(state, counter + 1, &found, 0)
                } else {
                    self.ready_state(state, &found)
                };
                for packed in CounterGuard::ALL {
                    self.eps_rule(&restore, [packed, Positive], &restore, [Increment, Decrement]);
                }
                self.eps_rule(&restore, [Positive, Zero], &after, [Keep, Keep]);
            }
        }
    }

    /// Applies `updates` from counter `from` onwards, then tests the guards of `target`.
    ///
    /// # Returns
    ///
    /// * The entry state of the macro sequence.
    fn apply(&mut self, target: &str, updates: &[CounterUpdate], from: usize) -> State {
        let Some(counter) = (from..updates.len()).find(|&i| updates[i] != Keep) else {
            return self.test_state(target, 0, &[], 0);
        };

        let code = update_code(updates);
        let op = if updates[counter] == Increment { "mul" } else { "div" };
        let entry_key = key![op, target, code, counter, 0];
        if let Some(entry) = self.names.get(&entry_key) {
            return entry.to_string();
        }

        let p = self.primes[counter];
        let phase = |names: &mut SyntheticNamespace, residue: u64| {
            names.declare(
                key![op, target, code, counter, residue],
                &format!("{target}-{op}{}-{residue}", counter + 1),
            )
        };
        let back = self.names.declare(
            key!["back", target, code, counter],
            &format!("{target}-back{}", counter + 1),
        );
        let after = self.apply(target, updates, counter + 1);

        for packed in CounterGuard::ALL {
            self.eps_rule(&back, [packed, Positive], &back, [Increment, Decrement]);
        }
        self.eps_rule(&back, [Positive, Zero], &after, [Keep, Keep]);

        for residue in 0..p {
            let here = phase(&mut self.names, residue);
            let next = phase(&mut self.names, (residue + 1) % p);
            if residue == 0 {
                for scratch in CounterGuard::ALL {
                    self.eps_rule(&here, [Positive, scratch], &next, [Decrement, Increment]);
                }
                self.eps_rule(&here, [Zero, Positive], &back, [Keep, Keep]);
            } else if updates[counter] == Increment {
                // multiply: p scratch units per packed unit
                for packed in CounterGuard::ALL {
                    self.eps_rule(&here, [packed, Positive], &next, [Keep, Increment]);
                }
            } else {
                // divide: one scratch unit per p packed units
                self.eps_rule(&here, [Positive, Positive], &next, [Decrement, Keep]);
            }
        }

        phase(&mut self.names, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::fixtures::{accepts, parse};

    const ANBN: &str = "\
accept: F
START a = -> A +1
A a > -> A +1
A b > -> B -1
B b > -> B -1
B eps = -> F 0
";

    // a^n b^n c^n, n >= 1, with three counters
    const ANBNCN: &str = "\
counters: 3
accept: F
START a = = = -> A +1 +1 +1
A a > > > -> A +1 +1 +1
A b > > > -> B -1 0 0
B b > > > -> B -1 0 0
B c = > > -> C 0 -1 -1
C c = > > -> C 0 -1 -1
C eps = = = -> F 0 0 0
";

    #[test]
    fn test_dca_dpda() {
        let dca: Dca = parse(ANBN);
        let dpda = dca_dpda(&dca);

        assert_eq!(dpda.stacks(), 1);
        let arg = TransitionArgument::new("A", vec!["b".into(), "1".into()]);
        assert_eq!(dpda.table.get(&arg).map(|res| res.symbols.clone()), Some(vec!["eps".to_string()]));
        let arg = TransitionArgument::new("START", vec!["a".into(), "Z".into()]);
        assert_eq!(
            dpda.table.get(&arg).map(|res| res.symbols.clone()),
            Some(vec!["Z".to_string(), "1".to_string()])
        );

        for input in ["", "ab", "aabb", "aab", "abb", "ba"] {
            assert_eq!(accepts(&dpda, input), accepts(&dca, input), "input {input:?}");
        }
    }

    #[test]
    fn test_dca_dpda_reparses() {
        let dca: Dca = parse(ANBNCN);
        let dpda = dca_dpda(&dca);
        let reparsed: Dpda = parse(&dpda.to_string());
        assert_eq!(reparsed.table, dpda.table);
        assert!(accepts(&reparsed, "aabbcc"));
    }

    #[test]
    fn test_two_counters_is_identity_when_small() {
        let dca: Dca = parse(ANBN);
        let copy = dca_two_counters(&dca);
        assert_eq!(copy.table, dca.table);
        assert_eq!(copy.counters(), 1);
    }

    #[test]
    fn test_two_counters_packs_three() {
        let dca: Dca = parse(ANBNCN);
        let packed = dca_two_counters(&dca);

        assert_eq!(packed.counters(), 2);
        assert!(packed.table.entries().all(|(arg, _)| arg.symbols.len() == 3));
        for input in ["", "abc", "aabbcc", "aabbc", "abbc", "abcc", "acb"] {
            assert_eq!(accepts(&packed, input), accepts(&dca, input), "input {input:?}");
        }
    }

    #[test]
    fn test_guard_vectors() {
        assert_eq!(guard_vectors(0), vec![Vec::<CounterGuard>::new()]);
        assert_eq!(
            guard_vectors(2),
            vec![
                vec![Zero, Zero],
                vec![Zero, Positive],
                vec![Positive, Zero],
                vec![Positive, Positive],
            ]
        );
    }
}
