//! This module provides the conversion engine: a closed vocabulary of reductions that turn a
//! machine of one kind into a machine of another kind accepting the same inputs.
//!
//! Every routine reads its source without mutating it, allocates the states and symbols it
//! invents from its own [`SyntheticNamespace`](crate::namespace::SyntheticNamespace) and
//! returns a machine with no run state. Routines assume inputs over the alphabet the source
//! table mentions; symbols the source never reads may be rejected earlier by the result.

mod automata;
mod counters;
mod interleave;
mod stacks;
mod tape;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

use crate::machine::Machine;
use crate::table::TransitionTable;
use crate::types::{MachineError, MachineKind, State};

/// One reduction of the conversion vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConversionTag {
    NfaNoEps,
    NfaDfa,
    DfaNfa,
    DfaTm,
    DfaDca,
    DcaDpda,
    DcaTwoCounters,
    TmMtm,
    MtmTm,
    MtmTmInterleaved,
    TmOneTm,
    TmOneTmInterleaved,
    OneTmTm,
    TmNoStay,
    OneTmNoStay,
    DpdaTm,
    TmDpdaTwoStacks,
}

impl ConversionTag {
    pub const ALL: [ConversionTag; 17] = [
        ConversionTag::NfaNoEps,
        ConversionTag::NfaDfa,
        ConversionTag::DfaNfa,
        ConversionTag::DfaTm,
        ConversionTag::DfaDca,
        ConversionTag::DcaDpda,
        ConversionTag::DcaTwoCounters,
        ConversionTag::TmMtm,
        ConversionTag::MtmTm,
        ConversionTag::MtmTmInterleaved,
        ConversionTag::TmOneTm,
        ConversionTag::TmOneTmInterleaved,
        ConversionTag::OneTmTm,
        ConversionTag::TmNoStay,
        ConversionTag::OneTmNoStay,
        ConversionTag::DpdaTm,
        ConversionTag::TmDpdaTwoStacks,
    ];

    /// The tag as written on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionTag::NfaNoEps => "nfa-noeps",
            ConversionTag::NfaDfa => "nfa-dfa",
            ConversionTag::DfaNfa => "dfa-nfa",
            ConversionTag::DfaTm => "dfa-tm",
            ConversionTag::DfaDca => "dfa-dca",
            ConversionTag::DcaDpda => "dca-dpda",
            ConversionTag::DcaTwoCounters => "dca-2counters",
            ConversionTag::TmMtm => "tm-mtm",
            ConversionTag::MtmTm => "mtm-tm",
            ConversionTag::MtmTmInterleaved => "mtm-tm-2",
            ConversionTag::TmOneTm => "tm-1tm",
            ConversionTag::TmOneTmInterleaved => "tm-1tm-2",
            ConversionTag::OneTmTm => "1tm-tm",
            ConversionTag::TmNoStay => "tm-nostay",
            ConversionTag::OneTmNoStay => "1tm-nostay",
            ConversionTag::DpdaTm => "dpda-tm",
            ConversionTag::TmDpdaTwoStacks => "tm-dpda-2stacks",
        }
    }

    /// The kind of machine the reduction consumes.
    pub fn source(self) -> MachineKind {
        match self {
            ConversionTag::NfaNoEps | ConversionTag::NfaDfa => MachineKind::Nfa,
            ConversionTag::DfaNfa | ConversionTag::DfaTm | ConversionTag::DfaDca => MachineKind::Dfa,
            ConversionTag::DcaDpda | ConversionTag::DcaTwoCounters => MachineKind::Dca,
            ConversionTag::TmMtm
            | ConversionTag::TmOneTm
            | ConversionTag::TmOneTmInterleaved
            | ConversionTag::TmNoStay
            | ConversionTag::TmDpdaTwoStacks => MachineKind::Tm,
            ConversionTag::MtmTm | ConversionTag::MtmTmInterleaved => MachineKind::Mtm,
            ConversionTag::OneTmTm | ConversionTag::OneTmNoStay => MachineKind::OneTm,
            ConversionTag::DpdaTm => MachineKind::Dpda,
        }
    }

    /// The kind of machine the reduction produces.
    pub fn target(self) -> MachineKind {
        match self {
            ConversionTag::NfaNoEps | ConversionTag::DfaNfa => MachineKind::Nfa,
            ConversionTag::NfaDfa => MachineKind::Dfa,
            ConversionTag::DfaDca | ConversionTag::DcaTwoCounters => MachineKind::Dca,
            ConversionTag::DcaDpda | ConversionTag::TmDpdaTwoStacks => MachineKind::Dpda,
            ConversionTag::TmMtm => MachineKind::Mtm,
            ConversionTag::TmOneTm | ConversionTag::TmOneTmInterleaved | ConversionTag::OneTmNoStay => {
                MachineKind::OneTm
            }
            ConversionTag::DfaTm
            | ConversionTag::MtmTm
            | ConversionTag::MtmTmInterleaved
            | ConversionTag::OneTmTm
            | ConversionTag::TmNoStay
            | ConversionTag::DpdaTm => MachineKind::Tm,
        }
    }
}

lazy_static::lazy_static! {
    static ref TAGS: HashMap<&'static str, ConversionTag> = ConversionTag::ALL
        .iter()
        .map(|tag| (tag.as_str(), *tag))
        .collect();
}

impl fmt::Display for ConversionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionTag {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TAGS.get(s.to_lowercase().as_str())
            .copied()
            .ok_or_else(|| MachineError::UnknownConversion(s.to_string()))
    }
}

/// Creates an empty machine of the kind a conversion tag consumes.
///
/// # Arguments
///
/// * `tag` - A conversion tag such as `"mtm-tm"`.
///
/// # Returns
///
/// * `Ok(Machine)` with the default configuration of the source kind.
/// * `Err(MachineError::UnknownConversion)` if the tag is not part of the vocabulary.
pub fn init(tag: &str) -> Result<Machine, MachineError> {
    let tag: ConversionTag = tag.parse()?;
    Ok(Machine::new(tag.source()))
}

/// Applies the reduction named by `tag` to `machine`.
///
/// # Returns
///
/// * `Ok(Machine)` - A fresh machine of `tag.target()` kind, without run state.
/// * `Err(MachineError::KindMismatch)` if `machine` is not of `tag.source()` kind.
pub fn convert(machine: &Machine, tag: ConversionTag) -> Result<Machine, MachineError> {
    let converted = match (tag, machine) {
        (ConversionTag::NfaNoEps, Machine::Nfa(nfa)) => Machine::Nfa(automata::nfa_no_eps(nfa)),
        (ConversionTag::NfaDfa, Machine::Nfa(nfa)) => Machine::Dfa(automata::nfa_dfa(nfa)),
        (ConversionTag::DfaNfa, Machine::Dfa(dfa)) => Machine::Nfa(automata::dfa_nfa(dfa)),
        (ConversionTag::DfaTm, Machine::Dfa(dfa)) => Machine::Tm(automata::dfa_tm(dfa)),
        (ConversionTag::DfaDca, Machine::Dfa(dfa)) => Machine::Dca(automata::dfa_dca(dfa)),
        (ConversionTag::DcaDpda, Machine::Dca(dca)) => Machine::Dpda(counters::dca_dpda(dca)),
        (ConversionTag::DcaTwoCounters, Machine::Dca(dca)) => {
            Machine::Dca(counters::dca_two_counters(dca))
        }
        (ConversionTag::TmMtm, Machine::Tm(tm)) => Machine::Mtm(tape::tm_mtm(tm)),
        (ConversionTag::MtmTm, Machine::Mtm(mtm)) => Machine::Tm(tape::mtm_tm(mtm)),
        (ConversionTag::MtmTmInterleaved, Machine::Mtm(mtm)) => {
            Machine::Tm(interleave::mtm_tm_interleaved(mtm))
        }
        (ConversionTag::TmOneTm, Machine::Tm(tm)) => Machine::OneTm(tape::tm_one_tm(tm)),
        (ConversionTag::TmOneTmInterleaved, Machine::Tm(tm)) => {
            Machine::OneTm(interleave::tm_one_tm_interleaved(tm))
        }
        (ConversionTag::OneTmTm, Machine::OneTm(tm)) => Machine::Tm(tape::one_tm_tm(tm)),
        (ConversionTag::TmNoStay, Machine::Tm(tm)) => Machine::Tm(tape::tm_no_stay(tm)),
        (ConversionTag::OneTmNoStay, Machine::OneTm(tm)) => {
            Machine::OneTm(tape::one_tm_no_stay(tm))
        }
        (ConversionTag::DpdaTm, Machine::Dpda(dpda)) => Machine::Tm(stacks::dpda_tm(dpda)),
        (ConversionTag::TmDpdaTwoStacks, Machine::Tm(tm)) => {
            Machine::Dpda(stacks::tm_dpda_two_stacks(tm))
        }
        (tag, machine) => {
            error!(
                tag = %tag,
                expected = %tag.source(),
                found = %machine.kind(),
                "Conversion dispatched with a machine of the wrong kind"
            );
            return Err(MachineError::KindMismatch {
                tag: tag.to_string(),
                expected: tag.source(),
                found: machine.kind(),
            });
        }
    };

    debug!(
        tag = %tag,
        source_rules = machine.table().len(),
        target_rules = converted.table().len(),
        "Converted machine"
    );
    Ok(converted)
}

/// Every state `table` mentions, plus `anchors`.
pub(crate) fn states_with<'a, I>(table: &TransitionTable, anchors: I) -> BTreeSet<State>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut states = table.states();
    states.extend(anchors.into_iter().map(str::to_string));
    states
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::machine::Automaton;
    use crate::types::Halt;

    /// Parses a description that must not have fatal diagnostics.
    pub fn parse<M: Automaton + Default>(text: &str) -> M {
        let mut machine = M::default();
        let verdict = machine.parse(text);
        assert!(!verdict.has_errors(), "{:?}", verdict.errors());
        machine
    }

    /// Runs a copy of `machine` on `input` with a generous step limit.
    pub fn accepts<M: Automaton>(machine: &M, input: &str) -> bool {
        let mut machine = machine.clone();
        machine.init(input);
        match machine.run_with_limit(2_000_000) {
            Ok(halt) => halt == Halt::Accept,
            Err(e) => panic!("run on {input:?} failed: {e}"),
        }
    }
}
