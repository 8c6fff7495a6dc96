//! End-to-end scenarios: parse a description, run it, convert it and run the result.

use automata::samples::find;
use automata::{
    convert, init, ConversionTag, Halt, Machine, MachineError, MachineKind, TransitionArgument,
};

/// A limit generous enough for the step overhead of every conversion on short inputs.
const LIMIT: usize = 2_000_000;

const PARITY: &str = "start: S\naccept: S\nS 0 -> S\nS 1 -> T\nT 0 -> T\nT 1 -> S\n";

fn machine(kind: MachineKind, text: &str) -> Machine {
    let (machine, _) = Machine::from_description(kind, text).unwrap();
    machine
}

fn verdict(machine: &Machine, input: &str) -> Halt {
    let mut machine = machine.clone();
    machine.init(input);
    machine.run_with_limit(LIMIT).unwrap()
}

fn assert_same_language(source: &Machine, converted: &Machine, inputs: &[&str]) {
    for input in inputs {
        assert_eq!(
            verdict(converted, input),
            verdict(source, input),
            "{} -> {} on {input:?}",
            source.kind(),
            converted.kind()
        );
    }
}

#[test]
fn dfa_parity_scenario() {
    let mut dfa = machine(MachineKind::Dfa, PARITY);
    dfa.init("1010");
    assert_eq!(dfa.run(), Ok(Halt::Accept));
    assert_eq!(dfa.current_state().as_deref(), Some("S"));
}

#[test]
fn tm_increment_scenario() {
    let mut tm = find("increment", Some(MachineKind::Tm)).unwrap().machine().unwrap();
    tm.init("111");
    assert_eq!(tm.run(), Ok(Halt::Accept));
    assert_eq!(tm.track(0), "1111");
}

#[test]
fn dfa_round_trip_through_text() {
    let dfa = machine(MachineKind::Dfa, "start: S\naccept: A\nS 0 -> A\n");
    let reparsed = machine(MachineKind::Dfa, &dfa.to_string());

    assert_eq!(reparsed.table(), dfa.table());
    assert_same_language(&dfa, &reparsed, &["", "0", "1"]);
}

#[test]
fn mtm_tm_preserves_acceptance() {
    let mtm = find("anbn", Some(MachineKind::Mtm)).unwrap().machine().unwrap();
    let tm = convert(&mtm, ConversionTag::MtmTm).unwrap();

    assert_eq!(tm.kind(), MachineKind::Tm);
    assert_same_language(&mtm, &tm, &["", "ab", "aabb", "ab a", "aab", "ba"]);
}

#[test]
fn interleaved_mtm_tm_preserves_acceptance() {
    let mtm = find("anbn", Some(MachineKind::Mtm)).unwrap().machine().unwrap();
    let tm = convert(&mtm, ConversionTag::MtmTmInterleaved).unwrap();

    assert_eq!(tm.kind(), MachineKind::Tm);
    assert_same_language(&mtm, &tm, &["", "ab", "aabb", "ab a", "aab", "ba", "aaabbb"]);

    let mut run = tm.clone();
    run.init("aabb");
    assert_eq!(run.run_with_limit(LIMIT), Ok(Halt::Accept));
    assert_eq!(run.track(0), "aabb");
}

#[test]
fn both_mtm_layouts_agree() {
    let mtm = machine(
        MachineKind::Mtm,
        "START a _ -> L a ^ x <\nL a _ -> M a ^ y <\nM a _ -> N a ^ _ >\nN a y -> ACCEPT a ^ y ^\n",
    );
    let tracks = convert(&mtm, ConversionTag::MtmTm).unwrap();
    let blocks = convert(&mtm, ConversionTag::MtmTmInterleaved).unwrap();

    let inputs = ["", "a", "aa", "b", "ab"];
    assert_same_language(&mtm, &tracks, &inputs);
    assert_same_language(&mtm, &blocks, &inputs);
}

#[test]
fn interleaved_one_way_tape_preserves_acceptance() {
    let tm = machine(
        MachineKind::Tm,
        "START a -> L a <\nL _ -> M x <\nM _ -> N y >\nN x -> ACCEPT x ^\nSTART b -> START b >\n",
    );
    let one_tm = convert(&tm, ConversionTag::TmOneTmInterleaved).unwrap();
    let no_stay = convert(&one_tm, ConversionTag::OneTmNoStay).unwrap();

    let inputs = ["", "a", "b", "ba", "bba", "bbb", "ab"];
    assert_same_language(&tm, &one_tm, &inputs);
    assert_same_language(&tm, &no_stay, &inputs);
}

#[test]
fn one_tape_mtm_converts_to_identity() {
    let tm = find("increment", Some(MachineKind::Tm)).unwrap().machine().unwrap();
    let mtm = convert(&tm, ConversionTag::TmMtm).unwrap();
    let back = convert(&mtm, ConversionTag::MtmTm).unwrap();

    assert_eq!(back.table(), tm.table());
}

#[test]
fn nfa_to_dfa_is_total_and_equivalent() {
    let nfa = find("ab-star", None).unwrap().machine().unwrap();
    let dfa = convert(&nfa, ConversionTag::NfaDfa).unwrap();

    for state in dfa.table().states() {
        for symbol in ["a", "b"] {
            let arg = TransitionArgument::single(state.as_str(), symbol);
            assert_eq!(dfa.table().get_all(&arg).len(), 1, "{state} {symbol}");
        }
    }
    assert_same_language(&nfa, &dfa, &["", "a", "ab", "abb", "b", "aab", "aba"]);
}

#[test]
fn finite_automata_chain_to_turing_machine() {
    let nfa = find("ab-star", None).unwrap().machine().unwrap();
    let dfa = convert(&nfa, ConversionTag::NfaDfa).unwrap();
    let tm = convert(&dfa, ConversionTag::DfaTm).unwrap();
    let one_tm = convert(&tm, ConversionTag::TmOneTm).unwrap();
    let no_stay = convert(&one_tm, ConversionTag::OneTmNoStay).unwrap();

    assert_same_language(&nfa, &no_stay, &["", "a", "ab", "abbb", "ba", "aa"]);
}

#[test]
fn counter_automaton_to_pushdown_to_turing_machine() {
    let dca = find("anbn", Some(MachineKind::Dca)).unwrap().machine().unwrap();
    let dpda = convert(&dca, ConversionTag::DcaDpda).unwrap();
    let tm = convert(&dpda, ConversionTag::DpdaTm).unwrap();

    let inputs = ["", "ab", "aabb", "aab", "abb", "ba"];
    assert_same_language(&dca, &dpda, &inputs);
    assert_same_language(&dca, &tm, &inputs);
}

#[test]
fn three_counters_pack_into_two() {
    let dca = machine(
        MachineKind::Dca,
        "\
counters: 3
accept: F
START a = = = -> A +1 +1 +1
A a > > > -> A +1 +1 +1
A b > > > -> B -1 0 0
B b > > > -> B -1 0 0
B c = > > -> C 0 -1 -1
C c = > > -> C 0 -1 -1
C eps = = = -> F 0 0 0
",
    );
    let packed = convert(&dca, ConversionTag::DcaTwoCounters).unwrap();

    match &packed {
        Machine::Dca(packed) => assert_eq!(packed.counters(), 2),
        other => panic!("expected a DCA, got {}", other.kind()),
    }
    assert_same_language(&dca, &packed, &["abc", "aabbcc", "aabbc", "abcc", "acb"]);
}

#[test]
fn turing_machine_on_two_stacks() {
    let tm = find("increment", Some(MachineKind::Tm)).unwrap().machine().unwrap();
    let dpda = convert(&tm, ConversionTag::TmDpdaTwoStacks).unwrap();

    match &dpda {
        Machine::Dpda(dpda) => assert_eq!(dpda.stacks(), 2),
        other => panic!("expected a DPDA, got {}", other.kind()),
    }
    assert_same_language(&tm, &dpda, &["", "1", "111"]);
}

#[test]
fn two_stack_machine_rejects_symbols_the_tm_never_reads() {
    let tm = machine(
        MachineKind::Tm,
        "START b -> B _ >\nSTART _ -> A _ <\nA _ -> A _ >\nB b -> ACCEPT _ >\n",
    );
    let dpda = convert(&tm, ConversionTag::TmDpdaTwoStacks).unwrap();

    assert_same_language(&tm, &dpda, &["a", "ab", "ba", "b", "bb", "bbb"]);
}

#[test]
fn one_way_machine_round_trip() {
    let one_tm = find("same-ends", None).unwrap().machine().unwrap();
    let tm = convert(&one_tm, ConversionTag::OneTmTm).unwrap();
    let back = convert(&tm, ConversionTag::TmOneTm).unwrap();
    let interleaved = convert(&tm, ConversionTag::TmOneTmInterleaved).unwrap();

    let inputs = ["", "a", "ab", "aba", "bab", "abab"];
    assert_same_language(&one_tm, &tm, &inputs);
    assert_same_language(&one_tm, &back, &inputs);
    assert_same_language(&one_tm, &interleaved, &inputs);
}

#[test]
fn converted_machines_serialize_to_parseable_text() {
    for sample in automata::SAMPLES.iter() {
        let source = sample.machine().unwrap();
        for tag in ConversionTag::ALL.iter().filter(|tag| tag.source() == sample.kind) {
            let converted = convert(&source, *tag).unwrap();
            let text = converted.to_string();
            let reparsed = Machine::from_description(tag.target(), &text)
                .unwrap_or_else(|e| panic!("{tag} on {}: {e}\n{text}", sample.name));
            assert_eq!(reparsed.0.to_string(), text, "{tag} on {}", sample.name);
        }
    }
}

#[test]
fn init_picks_the_source_kind() {
    assert_eq!(init("mtm-tm").unwrap().kind(), MachineKind::Mtm);
    assert_eq!(init("1tm-nostay").unwrap().kind(), MachineKind::OneTm);
    assert_eq!(
        init("dpda-dca").map(|m| m.kind()),
        Err(MachineError::UnknownConversion("dpda-dca".to_string()))
    );
}

#[test]
fn kind_mismatch_fails_loudly() {
    let dfa = machine(MachineKind::Dfa, PARITY);
    assert_eq!(
        convert(&dfa, ConversionTag::MtmTm).map(|m| m.kind()),
        Err(MachineError::KindMismatch {
            tag: "mtm-tm".to_string(),
            expected: MachineKind::Mtm,
            found: MachineKind::Dfa,
        })
    );
}
