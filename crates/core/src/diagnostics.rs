//! Diagnostic sink injected into the resolver and timeline driver.

use std::{cell::RefCell, fmt};

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-operation tracing (market trades, unhandled kinds).
    Debug,
    /// Noteworthy state changes such as a fee change.
    Info,
    /// Recoverable oddities in the input.
    Warn,
    /// The run is about to abort.
    Fatal,
}

/// Receiver of diagnostics emitted while processing a recording.
pub trait DiagnosticSink {
    /// Record one message.
    fn emit(&self, severity: Severity, message: fmt::Arguments<'_>);
}

/// Forwards every diagnostic to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, severity: Severity, message: fmt::Arguments<'_>) {
        match severity {
            Severity::Debug => tracing::debug!("{message}"),
            Severity::Info => tracing::info!("{message}"),
            Severity::Warn => tracing::warn!("{message}"),
            Severity::Fatal => tracing::error!("{message}"),
        }
    }
}

/// Keeps diagnostics in memory; used by tests to assert on what was logged.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: RefCell<Vec<(Severity, String)>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded at exactly `severity`.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .filter(|(level, _)| *level == severity)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, severity: Severity, message: fmt::Arguments<'_>) {
        self.records.borrow_mut().push((severity, message.to_string()));
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn emit(&self, severity: Severity, message: fmt::Arguments<'_>) {
        (**self).emit(severity, message)
    }
}
