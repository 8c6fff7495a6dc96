//! Sample machines shipped with the crate, one per kind.

use crate::machine::Machine;
use crate::types::{MachineError, MachineKind};

/// An embedded sample description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub name: &'static str,
    pub kind: MachineKind,
    pub description: &'static str,
}

impl Sample {
    /// Parses the sample into a fresh machine.
    pub fn machine(&self) -> Result<Machine, MachineError> {
        Machine::from_description(self.kind, self.description).map(|(machine, _)| machine)
    }

    /// The first line of the description without its comment marker.
    pub fn summary(&self) -> &'static str {
        self.description
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("//"))
            .map_or("", str::trim)
    }
}

lazy_static::lazy_static! {
    pub static ref SAMPLES: Vec<Sample> = vec![
        Sample {
            name: "even-ones",
            kind: MachineKind::Dfa,
            description: include_str!("../samples/even-ones.dfa"),
        },
        Sample {
            name: "ab-star",
            kind: MachineKind::Nfa,
            description: include_str!("../samples/ab-star.nfa"),
        },
        Sample {
            name: "anbn",
            kind: MachineKind::Dca,
            description: include_str!("../samples/anbn.dca"),
        },
        Sample {
            name: "parens",
            kind: MachineKind::Dpda,
            description: include_str!("../samples/parens.dpda"),
        },
        Sample {
            name: "same-ends",
            kind: MachineKind::OneTm,
            description: include_str!("../samples/same-ends.1tm"),
        },
        Sample {
            name: "increment",
            kind: MachineKind::Tm,
            description: include_str!("../samples/increment.tm"),
        },
        Sample {
            name: "anbn",
            kind: MachineKind::Mtm,
            description: include_str!("../samples/anbn.mtm"),
        },
    ];
}

/// Finds a sample by name, and by kind when several samples share the name.
pub fn find(name: &str, kind: Option<MachineKind>) -> Option<&'static Sample> {
    SAMPLES
        .iter()
        .find(|sample| sample.name == name && kind.map_or(true, |kind| sample.kind == kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Halt;

    fn run(sample: &Sample, input: &str) -> Halt {
        let mut machine = sample.machine().unwrap();
        machine.init(input);
        machine.run().unwrap()
    }

    #[test]
    fn test_every_sample_parses_cleanly() {
        for sample in SAMPLES.iter() {
            let (_, warnings) = Machine::from_description(sample.kind, sample.description)
                .unwrap_or_else(|e| panic!("{} ({}): {e}", sample.name, sample.kind));
            assert!(warnings.is_empty(), "{}: {warnings:?}", sample.name);
            assert!(!sample.summary().is_empty());
        }
    }

    #[test]
    fn test_one_sample_per_kind() {
        for kind in MachineKind::ALL {
            assert_eq!(SAMPLES.iter().filter(|s| s.kind == kind).count(), 1, "{kind}");
        }
    }

    #[test]
    fn test_find() {
        assert_eq!(find("parens", None).map(|s| s.kind), Some(MachineKind::Dpda));
        assert_eq!(find("anbn", Some(MachineKind::Mtm)).map(|s| s.kind), Some(MachineKind::Mtm));
        assert!(find("anbn", Some(MachineKind::Dfa)).is_none());
        assert!(find("missing", None).is_none());
    }

    #[test]
    fn test_sample_languages() {
        let cases: [(&str, MachineKind, &[&str], &[&str]); 7] = [
            ("even-ones", MachineKind::Dfa, &["", "11", "0110"], &["1", "0111"]),
            ("ab-star", MachineKind::Nfa, &["a", "ab", "abbb"], &["", "b", "aa"]),
            ("anbn", MachineKind::Dca, &["", "ab", "aaabbb"], &["a", "abb", "ba"]),
            ("parens", MachineKind::Dpda, &["", "()", "(()())"], &["(", ")(", "())"]),
            ("same-ends", MachineKind::OneTm, &["a", "abba", "bab"], &["", "ab", "ba"]),
            ("increment", MachineKind::Tm, &["", "111"], &[]),
            ("anbn", MachineKind::Mtm, &["", "ab", "aabb"], &["aab", "abb", "ba"]),
        ];

        for (name, kind, accepted, rejected) in cases {
            let sample = find(name, Some(kind)).unwrap();
            for input in accepted {
                assert_eq!(run(sample, input), Halt::Accept, "{name} ({kind}) on {input:?}");
            }
            for input in rejected {
                assert_eq!(run(sample, input), Halt::Reject, "{name} ({kind}) on {input:?}");
            }
        }
    }

    #[test]
    fn test_increment_appends_one() {
        let mut machine = find("increment", None).unwrap().machine().unwrap();
        machine.init("11");
        assert_eq!(machine.run(), Ok(Halt::Accept));
        assert_eq!(machine.track(0), "111");
    }
}
