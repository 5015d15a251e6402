//! Diagnostic codes with category prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Setup and route adoption diagnostics, prefixed with `S`.
    Setup,
    /// Routing-loop diagnostics (progress, rip-up, failures), prefixed with `R`.
    Routing,
    /// Post-route validation diagnostics, prefixed with `V`.
    Validate,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Setup => 'S',
            Category::Routing => 'R',
            Category::Validate => 'V',
        }
    }
}

/// A structured diagnostic code: a category prefix plus a numeric identifier.
///
/// Displayed as the prefix followed by a zero-padded 3-digit number, e.g.
/// `R101` or `V003`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
