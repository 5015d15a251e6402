//! Structured diagnostic records.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structured diagnostic message.
///
/// Each diagnostic carries a severity, a category-prefixed code, a primary
/// message, and optional footnotes. The router reports about nets, wires,
/// and pips by name, so there are no source locations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a note-severity diagnostic.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Note, code, message)
    }

    /// Creates a warning-severity diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Creates an error-severity diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Adds a footnote to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn constructors_set_severity() {
        let code = DiagnosticCode::new(Category::Routing, 1);
        assert_eq!(Diagnostic::note(code, "m").severity, Severity::Note);
        assert_eq!(Diagnostic::warning(code, "m").severity, Severity::Warning);
        assert_eq!(Diagnostic::error(code, "m").severity, Severity::Error);
    }

    #[test]
    fn with_note_appends() {
        let code = DiagnosticCode::new(Category::Validate, 2);
        let diag = Diagnostic::error(code, "loop detected")
            .with_note("net counter_q")
            .with_note("wire span_4_x7");
        assert_eq!(diag.notes.len(), 2);
        assert_eq!(diag.notes[0], "net counter_q");
    }

    #[test]
    fn display_format() {
        let code = DiagnosticCode::new(Category::Routing, 102);
        let diag = Diagnostic::warning(code, "failed to find a route");
        assert_eq!(format!("{diag}"), "warning[R102]: failed to find a route");
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Setup, 5);
        let diag = Diagnostic::note(code, "routing 12 arcs").with_note("queue ready");
        let json = serde_json::to_string(&diag).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, diag.message);
        assert_eq!(back.notes, diag.notes);
    }
}
