//! Structured error types shared across LHS crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`LhsError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (indices, dimensions, solver diagnostics).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for local hidden state analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum LhsError {
    /// The assemblage failed a Hermiticity, positivity or normalization check.
    #[error("invalid assemblage: {0}")]
    InvalidAssemblage(ErrorInfo),
    /// The solver finished with a status that decides nothing.
    #[error("solver status error: {0}")]
    SolverStatus(ErrorInfo),
    /// The dual certificate could not be normalized.
    #[error("degenerate certificate: {0}")]
    DegenerateCertificate(ErrorInfo),
    /// Inconsistent dimensions, empty shapes or unknown variables.
    #[error("shape error: {0}")]
    Shape(ErrorInfo),
    /// Serialization, configuration and artefact I/O errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl LhsError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            LhsError::InvalidAssemblage(info)
            | LhsError::SolverStatus(info)
            | LhsError::DegenerateCertificate(info)
            | LhsError::Shape(info)
            | LhsError::Serde(info) => info,
        }
    }

    /// Shorthand for a [`LhsError::Shape`] error without context.
    pub fn shape(code: &str, message: impl Into<String>) -> Self {
        LhsError::Shape(ErrorInfo::new(code, message))
    }
}
