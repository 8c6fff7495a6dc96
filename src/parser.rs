//! This module provides the description parser shared by every machine kind, utilizing the
//! `pest` crate to tokenize lines.
//!
//! A description is an optional block of `key: value...` settings followed by transition
//! lines. The first line whose leading token is not a registered settings key closes the
//! settings block for good. Each machine kind plugs into the driver through [`Description`]:
//! a static settings registry plus transition-line parsing and validation hooks.

use pest::Parser as PestParser;
use pest_derive::Parser as PestParser;
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::debug;

use crate::graph::Graph;
use crate::types::{MachineError, State, TransitionArgument};
use crate::verdict::ParseVerdict;

/// Derives a `PestParser` for the line grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct DescriptionParser;

/// How many tokens a settings line takes, key included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Any,
}

/// One entry of a machine kind's settings registry.
pub struct Setting<M> {
    /// The leading token, lower-case and including the trailing colon (e.g. `start:`).
    pub key: &'static str,
    pub arity: Arity,
    /// Applies the setting. Receives every token of the line and the line number.
    pub apply: fn(&mut M, &[&str], usize) -> ParseVerdict,
}

/// The hooks a machine kind provides to the description parser.
pub trait Description: Default + 'static {
    /// The settings registry of this kind.
    const SETTINGS: &'static [Setting<Self>];

    /// Whether repeated transition arguments are branches rather than redeclarations.
    const NONDETERMINISTIC: bool = false;

    /// Runs once after the settings block closes.
    fn check_settings(&self) -> ParseVerdict;

    /// Parses one transition line into the machine's table.
    fn parse_transition(&mut self, args: &[&str], line: usize) -> ParseVerdict;

    /// The (source, target) states of a transition line that parsed without errors.
    fn transition_edge(&self, args: &[&str]) -> (State, State);

    /// The argument declared by a transition line that parsed without errors.
    fn transition_key(&self, args: &[&str]) -> TransitionArgument;

    /// Runs once after every line has been consumed.
    ///
    /// # Arguments
    ///
    /// * `graph` - The state graph of every transition line that parsed without errors.
    fn check_transitions(&self, graph: &Graph<State>) -> ParseVerdict;
}

/// Splits one description line into tokens, dropping the trailing comment.
///
/// # Returns
///
/// * `Ok(Vec<&str>)` with the tokens in order, empty for blank and comment-only lines.
/// * `Err(MachineError::Parse)` if the line cannot be tokenized.
pub fn tokenize(line: &str) -> Result<Vec<&str>, MachineError> {
    let pairs = DescriptionParser::parse(Rule::line, line)
        .map_err(|e| MachineError::Parse(Box::new(e)))?;

    Ok(pairs
        .flatten()
        .filter(|pair| pair.as_rule() == Rule::token)
        .map(|pair| pair.as_str())
        .collect())
}

/// Parses `text` into `machine`, resetting its configuration and table first.
///
/// Parsing is best-effort: every line is visited and every diagnostic is accumulated in the
/// returned verdict. Duplicated settings and duplicated transition arguments are advisory;
/// the last declaration wins.
pub fn parse_description<M: Description>(machine: &mut M, text: &str) -> ParseVerdict {
    *machine = M::default();

    let mut verdict = ParseVerdict::ok();
    let mut reading_settings = true;
    let mut declared_settings = DuplicationChecker::default();
    let mut accumulated_settings = DuplicationChecker::default();
    let mut declared_transitions = DuplicationChecker::default();
    let mut graph = Graph::new();
    let mut lines = 0;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        lines = line;

        let args = match tokenize(raw) {
            Ok(args) => args,
            Err(e) => {
                verdict.put_error(format!("Line {line}: {e}"), line);
                continue;
            }
        };
        if args.is_empty() {
            continue;
        }

        if reading_settings {
            let key = args[0].to_lowercase();
            if let Some(setting) = M::SETTINGS.iter().find(|s| s.key == key) {
                if !verdict.merge(apply_setting(machine, setting, &args, line)) {
                    match setting.arity {
                        Arity::Any => accumulated_settings.put(key, line),
                        Arity::Exactly(_) => declared_settings.put(key, line),
                    }
                }
                continue;
            }

            reading_settings = false;
            verdict.merge(machine.check_settings());
            declared_settings.validate("settings", &mut verdict);
            accumulated_settings.validate_accumulated(&mut verdict);
        }

        if !verdict.merge(machine.parse_transition(&args, line)) {
            let (from, to) = machine.transition_edge(&args);
            graph.add_edge(from, to);
            if !M::NONDETERMINISTIC {
                declared_transitions.put(machine.transition_key(&args), line);
            }
        }
    }

    if reading_settings {
        verdict.merge(machine.check_settings());
        declared_settings.validate("settings", &mut verdict);
        accumulated_settings.validate_accumulated(&mut verdict);
    }
    verdict.merge(machine.check_transitions(&graph));
    if !M::NONDETERMINISTIC {
        declared_transitions.validate("transition arguments", &mut verdict);
    }

    debug!(
        lines,
        errors = verdict.errors().len(),
        warnings = verdict.warnings().len(),
        "Parsed machine description"
    );

    verdict
}

fn apply_setting<M>(machine: &mut M, setting: &Setting<M>, args: &[&str], line: usize) -> ParseVerdict {
    if let Arity::Exactly(count) = setting.arity {
        let verdict = expect_args(args, count, line);
        if verdict.has_errors() {
            return verdict;
        }
    }
    (setting.apply)(machine, args, line)
}

/// Checks that a line has exactly `count` tokens.
pub fn expect_args(args: &[&str], count: usize, line: usize) -> ParseVerdict {
    if args.len() == count {
        return ParseVerdict::ok();
    }
    let few_or_many = if args.len() < count { "few" } else { "many" };
    ParseVerdict::error(
        format!(
            "Line {line}: Too {few_or_many} arguments (expected {count} args, got {} args)",
            args.len()
        ),
        line,
    )
}

/// Checks that a line has at least `count` tokens.
pub fn expect_args_at_least(args: &[&str], count: usize, line: usize) -> ParseVerdict {
    if args.len() >= count {
        return ParseVerdict::ok();
    }
    ParseVerdict::error(
        format!(
            "Line {line}: Too few arguments (expected at least {count} args, got {} args)",
            args.len()
        ),
        line,
    )
}

/// Checks that the token at `index` is exactly `expected`.
pub fn expect_token(args: &[&str], index: usize, expected: &str, line: usize) -> ParseVerdict {
    match args.get(index) {
        Some(token) if *token == expected => ParseVerdict::ok(),
        found => ParseVerdict::error(
            format!(
                "Line {line}, argument {index}: Expected '{expected}' instead of '{}'",
                found.copied().unwrap_or_default()
            ),
            line,
        ),
    }
}

/// The largest value a count setting such as `tapes:` may take.
pub const MAX_COUNT: usize = 256;

/// Parses a count setting such as `tapes:` or `counters:`.
///
/// # Arguments
///
/// * `what` - The plural noun used in diagnostics ("tapes", "stacks", ...).
/// * `min` - The smallest accepted value.
pub fn parse_count(value: &str, what: &str, min: i64, line: usize) -> Result<usize, ParseVerdict> {
    let parsed: i64 = value.parse().map_err(|_| {
        ParseVerdict::error(format!("Unable to parse number of {what}: {value}"), line)
    })?;

    if parsed < min {
        let qualifier = if min > 0 { "positive" } else { "non-negative" };
        return Err(ParseVerdict::error(
            format!("Number of {what} must be a {qualifier} integer (got {parsed})"),
            line,
        ));
    }
    match usize::try_from(parsed) {
        Ok(count) if count <= MAX_COUNT => Ok(count),
        _ => Err(ParseVerdict::error(
            format!("Number of {what} must be at most {MAX_COUNT} (got {parsed})"),
            line,
        )),
    }
}

/// Returns `count * per + extra`, the token count of a transition line, or a fatal
/// diagnostic when it does not fit in a `usize`.
pub fn line_width(count: usize, per: usize, extra: usize, line: usize) -> Result<usize, ParseVerdict> {
    count
        .checked_mul(per)
        .and_then(|width| width.checked_add(extra))
        .ok_or_else(|| ParseVerdict::error(format!("Line {line}: Too many arguments to expect"), line))
}

/// Records the lines on which each key was declared and reports repeated keys.
struct DuplicationChecker<K: Ord> {
    declared: BTreeMap<K, Vec<usize>>,
}

impl<K: Ord> Default for DuplicationChecker<K> {
    fn default() -> Self {
        Self {
            declared: BTreeMap::new(),
        }
    }
}

impl<K: Ord> DuplicationChecker<K> {
    fn put(&mut self, key: K, line: usize) {
        self.declared.entry(key).or_default().push(line);
    }

    fn validate(&self, kind: impl Display, verdict: &mut ParseVerdict) {
        for lines in self.declared.values().filter(|lines| lines.len() > 1) {
            let last = lines[lines.len() - 1];
            let listed = lines
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            verdict.put_warning(format!(
                "Lines {listed}: duplicate {kind}: only the last declaration (line {last}) will matter"
            ));
        }
    }

    /// Reports settings such as `accept:` whose repeated lines add up instead of replacing
    /// each other.
    fn validate_accumulated(&self, verdict: &mut ParseVerdict)
    where
        K: Display,
    {
        for (key, lines) in self.declared.iter().filter(|(_, lines)| lines.len() > 1) {
            let listed = lines
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            verdict.put_warning(format!(
                "Lines {listed}: repeated {key} settings: every declaration is combined"
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_on_whitespace() {
        assert_eq!(tokenize("  S 0 ->\tA  ").unwrap(), vec!["S", "0", "->", "A"]);
    }

    #[test]
    fn test_tokenize_strips_comments() {
        assert_eq!(tokenize("S 0 -> A // go to A").unwrap(), vec!["S", "0", "->", "A"]);
        assert_eq!(tokenize("S a//b").unwrap(), vec!["S", "a"]);
        assert!(tokenize("// only a comment").unwrap().is_empty());
        assert!(tokenize("   ").unwrap().is_empty());
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_expect_args_messages() {
        let verdict = expect_args(&["a", "b"], 4, 3);
        assert_eq!(
            verdict.errors()[0].message,
            "Line 3: Too few arguments (expected 4 args, got 2 args)"
        );
        let verdict = expect_args(&["a", "b", "c"], 2, 5);
        assert_eq!(
            verdict.errors()[0].message,
            "Line 5: Too many arguments (expected 2 args, got 3 args)"
        );
        assert!(!expect_args(&["a"], 1, 1).has_errors());
    }

    #[test]
    fn test_expect_token_message() {
        let verdict = expect_token(&["S", "0", "=>", "A"], 2, "->", 9);
        assert_eq!(verdict.errors()[0].line, 9);
        assert_eq!(
            verdict.errors()[0].message,
            "Line 9, argument 2: Expected '->' instead of '=>'"
        );
    }

    #[test]
    fn test_expect_args_at_least() {
        assert!(!expect_args_at_least(&["a", "b"], 2, 1).has_errors());
        assert_eq!(
            expect_args_at_least(&["a"], 3, 4).errors()[0].message,
            "Line 4: Too few arguments (expected at least 3 args, got 1 args)"
        );
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("3", "tapes", 1, 1), Ok(3));
        assert_eq!(parse_count("0", "stacks", 0, 1), Ok(0));

        let err = parse_count("x", "counters", 0, 2).unwrap_err();
        assert_eq!(err.errors()[0].message, "Unable to parse number of counters: x");

        let err = parse_count("0", "tapes", 1, 2).unwrap_err();
        assert_eq!(
            err.errors()[0].message,
            "Number of tapes must be a positive integer (got 0)"
        );
    }

    #[test]
    fn test_parse_count_upper_bound() {
        assert_eq!(parse_count("256", "tapes", 1, 1), Ok(MAX_COUNT));

        let err = parse_count("9223372036854775807", "counters", 0, 3).unwrap_err();
        assert_eq!(err.errors()[0].line, 3);
        assert_eq!(
            err.errors()[0].message,
            "Number of counters must be at most 256 (got 9223372036854775807)"
        );
        assert!(parse_count("257", "stacks", 0, 1).is_err());
    }

    #[test]
    fn test_line_width_overflow() {
        assert_eq!(line_width(3, 2, 4, 1), Ok(10));
        let err = line_width(usize::MAX, 2, 4, 7).unwrap_err();
        assert_eq!(err.errors()[0].message, "Line 7: Too many arguments to expect");
    }

    #[test]
    fn test_duplication_checker() {
        let mut checker = DuplicationChecker::default();
        checker.put("start:", 1);
        checker.put("accept:", 2);
        checker.put("start:", 4);

        let mut verdict = ParseVerdict::ok();
        checker.validate("settings", &mut verdict);

        assert_eq!(
            verdict.warnings(),
            ["Lines 1, 4: duplicate settings: only the last declaration (line 4) will matter"]
        );
    }

    #[test]
    fn test_accumulated_settings_are_reported_as_combined() {
        let mut checker = DuplicationChecker::default();
        checker.put("accept:".to_string(), 1);
        checker.put("accept:".to_string(), 3);

        let mut verdict = ParseVerdict::ok();
        checker.validate_accumulated(&mut verdict);

        assert_eq!(
            verdict.warnings(),
            ["Lines 1, 3: repeated accept: settings: every declaration is combined"]
        );
    }
}
