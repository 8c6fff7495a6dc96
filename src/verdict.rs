//! Diagnostics produced while parsing a machine description.
//!
//! A `ParseVerdict` collects fatal diagnostics (with the line they refer to) and advisory
//! warnings. Verdicts compose with [`ParseVerdict::merge`]; nothing here aborts a parse.

use serde::{Deserialize, Serialize};

use crate::types::MachineError;

/// A fatal diagnostic scoped to a description line. Line `0` means "not tied to a line".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseVerdict {
    errors: Vec<Diagnostic>,
    warnings: Vec<String>,
}

impl ParseVerdict {
    /// An empty verdict.
    pub fn ok() -> Self {
        Self::default()
    }

    /// A verdict holding a single fatal diagnostic.
    pub fn error(message: impl Into<String>, line: usize) -> Self {
        let mut verdict = Self::default();
        verdict.put_error(message, line);
        verdict
    }

    /// A verdict holding a single warning.
    pub fn warning(message: impl Into<String>) -> Self {
        let mut verdict = Self::default();
        verdict.put_warning(message);
        verdict
    }

    pub fn put_error(&mut self, message: impl Into<String>, line: usize) -> &mut Self {
        self.errors.push(Diagnostic {
            line,
            message: message.into(),
        });
        self
    }

    pub fn put_warning(&mut self, message: impl Into<String>) -> &mut Self {
        self.warnings.push(message.into());
        self
    }

    /// Appends all diagnostics of `other`.
    ///
    /// # Returns
    ///
    /// * `true` if `other` carried at least one fatal diagnostic.
    pub fn merge(&mut self, other: ParseVerdict) -> bool {
        let failed = other.has_errors();
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        failed
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Converts the verdict into a `Result`, failing with the first fatal diagnostic.
    ///
    /// # Returns
    ///
    /// * `Ok(warnings)` if there are no fatal diagnostics.
    /// * `Err(MachineError::Description)` carrying the first fatal diagnostic otherwise.
    pub fn into_result(self) -> Result<Vec<String>, MachineError> {
        match self.errors.into_iter().next() {
            Some(Diagnostic { line, message }) => Err(MachineError::Description { line, message }),
            None => Ok(self.warnings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_reports_other_errors() {
        let mut verdict = ParseVerdict::warning("first");

        assert!(!verdict.merge(ParseVerdict::warning("second")));
        assert!(verdict.merge(ParseVerdict::error("broken", 3)));
        assert!(!verdict.merge(ParseVerdict::ok()));

        assert_eq!(verdict.warnings(), ["first", "second"]);
        assert_eq!(
            verdict.errors(),
            [Diagnostic {
                line: 3,
                message: "broken".to_string()
            }]
        );
    }

    #[test]
    fn test_into_result_takes_first_error() {
        let mut verdict = ParseVerdict::error("one", 1);
        verdict.put_error("two", 2);

        assert_eq!(
            verdict.into_result(),
            Err(MachineError::Description {
                line: 1,
                message: "one".to_string()
            })
        );

        let clean = ParseVerdict::warning("just a warning");
        assert_eq!(clean.into_result(), Ok(vec!["just a warning".to_string()]));
    }

    #[test]
    fn test_verdict_serialization() {
        let verdict = ParseVerdict::error("Line 2: bad", 2);
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(json.contains("\"line\":2"));

        let back: ParseVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, verdict);
    }
}
