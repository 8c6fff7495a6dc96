//! Property-based tests for the transition table, the name allocator and the conversions.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated tables, names and inputs.

use std::collections::BTreeSet;

use automata::samples::find;
use automata::{
    convert, key, ConversionTag, Direction, Halt, Machine, MachineKind, SyntheticNamespace,
    TransitionArgument, TransitionResult, TransitionTable,
};
use proptest::prelude::*;

const STATES: [&str; 4] = ["START", "A", "B", "C"];
const LIMIT: usize = 2_000_000;

fn accepts(machine: &Machine, input: &str) -> bool {
    let mut machine = machine.clone();
    machine.init(input);
    machine.run_with_limit(LIMIT) == Ok(Halt::Accept)
}

fn word(alphabet: &'static [char], max: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(alphabet), 0..=max)
        .prop_map(|chars| chars.into_iter().collect())
}

prop_compose! {
    fn arbitrary_result()(state in 0..4usize, symbol in "[a-c]", dir in 0..3u8) -> TransitionResult {
        let direction = match dir {
            0 => Direction::Left,
            1 => Direction::Right,
            _ => Direction::Stay,
        };
        TransitionResult::single(STATES[state], symbol, direction)
    }
}

prop_compose! {
    /// An NFA over {a, b} with epsilon rules, written as a description.
    fn arbitrary_nfa()(
        rules in prop::collection::vec((0..4usize, 0..3usize, 0..4usize), 1..10),
        accept in prop::collection::btree_set(0..4usize, 1..3),
    ) -> String {
        let symbols = ["a", "b", "eps"];
        let accept: Vec<&str> = accept.into_iter().map(|i| STATES[i]).collect();
        let mut text = format!("accept: {}\n", accept.join(" "));
        for (from, symbol, to) in rules {
            text.push_str(&format!("{} {} -> {}\n", STATES[from], symbols[symbol], STATES[to]));
        }
        text
    }
}

proptest! {
    #[test]
    fn set_keeps_only_the_later_result(
        state in 0..4usize,
        symbol in "[a-c]",
        first in arbitrary_result(),
        second in arbitrary_result(),
    ) {
        let arg = TransitionArgument::single(STATES[state], symbol);
        let mut table = TransitionTable::new();
        table.set(arg.clone(), first);
        table.set(arg.clone(), second.clone());

        prop_assert_eq!(table.len(), 1);
        prop_assert_eq!(table.get(&arg), Some(&second));
        prop_assert_eq!(table.get_all(&arg), &[second][..]);
    }

    #[test]
    fn add_accumulates_every_result(
        results in prop::collection::vec(arbitrary_result(), 1..6),
    ) {
        let arg = TransitionArgument::single("START", "a");
        let mut table = TransitionTable::new();
        for res in &results {
            table.add(arg.clone(), res.clone());
        }

        prop_assert_eq!(table.get_all(&arg), results.as_slice());
        prop_assert_eq!(table.get(&arg), results.first());
    }

    #[test]
    fn pruning_keeps_anchors_and_reachable_states(
        rules in prop::collection::vec((0..4usize, 0..4usize), 0..8),
        accept in 0..4usize,
    ) {
        let mut table = TransitionTable::new();
        for (from, to) in &rules {
            table.add(
                TransitionArgument::single(STATES[*from], "a"),
                TransitionResult::to_state(STATES[*to]),
            );
        }
        let pruned = table.remove_unreachable_states("START", Some(STATES[accept]), None);

        let reached = table.state_graph().bfs([&"START".to_string()]);
        for (arg, _) in table.entries() {
            let keep = arg.state == "START" || arg.state == STATES[accept] || reached.contains(&arg.state);
            prop_assert_eq!(pruned.contains(arg), keep, "{}", arg.state);
        }
    }

    #[test]
    fn declared_labels_are_unique_and_stable(
        names in prop::collection::vec("[ab]{1,2}", 1..20),
        reserved in prop::collection::btree_set("[ab]{1,2}", 0..4),
    ) {
        let mut namespace = SyntheticNamespace::new();
        for label in &reserved {
            prop_assert_eq!(namespace.reserve(key!["reserved", label], label), label.clone());
        }

        let mut issued: BTreeSet<String> = reserved.clone();
        let mut labels = Vec::new();
        for (i, base) in names.iter().enumerate() {
            let label = namespace.declare(key!["synthetic", i], base);
            prop_assert!(label.starts_with(base.as_str()));
            prop_assert!(issued.insert(label.clone()), "{} issued twice", label);
            labels.push(label);
        }

        for (i, (base, label)) in names.iter().zip(&labels).enumerate() {
            prop_assert_eq!(&namespace.declare(key!["synthetic", i], base), label);
            prop_assert_eq!(namespace.get(&key!["synthetic", i]), Some(label.as_str()));
        }
        prop_assert_eq!(namespace.family(&key!["synthetic"]).len(), names.len());
    }

    #[test]
    fn nfa_conversions_preserve_the_language(
        text in arbitrary_nfa(),
        inputs in prop::collection::vec(word(&['a', 'b'], 5), 1..8),
    ) {
        let (nfa, _) = Machine::from_description(MachineKind::Nfa, &text).unwrap();
        let no_eps = convert(&nfa, ConversionTag::NfaNoEps).unwrap();
        let dfa = convert(&nfa, ConversionTag::NfaDfa).unwrap();

        for input in &inputs {
            let expected = accepts(&nfa, input);
            prop_assert_eq!(accepts(&no_eps, input), expected, "nfa-noeps on {:?}\n{}", input, text);
            prop_assert_eq!(accepts(&dfa, input), expected, "nfa-dfa on {:?}\n{}", input, text);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn dfa_tm_preserves_the_language(input in word(&['0', '1'], 8)) {
        let dfa = find("even-ones", None).unwrap().machine().unwrap();
        let tm = convert(&dfa, ConversionTag::DfaTm).unwrap();
        let one_tm = convert(&tm, ConversionTag::TmOneTm).unwrap();
        let interleaved = convert(&tm, ConversionTag::TmOneTmInterleaved).unwrap();

        let expected = accepts(&dfa, &input);
        prop_assert_eq!(accepts(&tm, &input), expected);
        prop_assert_eq!(accepts(&one_tm, &input), expected);
        prop_assert_eq!(accepts(&interleaved, &input), expected);
    }

    #[test]
    fn dpda_tm_preserves_the_language(input in word(&['(', ')'], 6)) {
        let dpda = find("parens", None).unwrap().machine().unwrap();
        let tm = convert(&dpda, ConversionTag::DpdaTm).unwrap();

        prop_assert_eq!(accepts(&tm, &input), accepts(&dpda, &input));
    }

    #[test]
    fn mtm_tm_preserves_the_language(input in word(&['a', 'b'], 6)) {
        let mtm = find("anbn", Some(MachineKind::Mtm)).unwrap().machine().unwrap();
        let tm = convert(&mtm, ConversionTag::MtmTm).unwrap();
        let interleaved = convert(&mtm, ConversionTag::MtmTmInterleaved).unwrap();

        let expected = accepts(&mtm, &input);
        prop_assert_eq!(accepts(&tm, &input), expected);
        prop_assert_eq!(accepts(&interleaved, &input), expected);
    }

    #[test]
    fn one_tm_conversions_preserve_the_language(input in word(&['a', 'b'], 6)) {
        let one_tm = find("same-ends", None).unwrap().machine().unwrap();
        let tm = convert(&one_tm, ConversionTag::OneTmTm).unwrap();
        let no_stay = convert(&one_tm, ConversionTag::OneTmNoStay).unwrap();
        let two_stacks = convert(&tm, ConversionTag::TmDpdaTwoStacks).unwrap();

        let expected = accepts(&one_tm, &input);
        prop_assert_eq!(accepts(&tm, &input), expected);
        prop_assert_eq!(accepts(&no_stay, &input), expected);
        prop_assert_eq!(accepts(&two_stacks, &input), expected);
    }

    #[test]
    fn counter_conversions_preserve_the_language(input in word(&['a', 'b'], 6)) {
        let dca = find("anbn", Some(MachineKind::Dca)).unwrap().machine().unwrap();
        let dpda = convert(&dca, ConversionTag::DcaDpda).unwrap();

        prop_assert_eq!(accepts(&dpda, &input), accepts(&dca, &input));
    }
}
