//! Refresh outcome reporting.

use serde::Serialize;
use thiserror::Error;

/// Errors and warnings accumulated over one refresh attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Report {
    /// `true` iff no error was recorded.
    pub fn successful(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.errors.push(message);
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }
}

/// A refresh that recorded at least one error.
///
/// The course record and the cache on disk are as they were before the
/// attempt.
#[derive(Debug, Clone, Error)]
#[error("{}", .report.errors.join("\n"))]
pub struct Failure {
    pub report: Report,
}

impl From<Report> for Failure {
    fn from(report: Report) -> Self {
        Self { report }
    }
}
