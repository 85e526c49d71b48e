//! Replays the operation stream against a simulated match clock.

use crate::{
    diagnostics::{DiagnosticSink, Severity, TracingSink},
    error::AnalysisError,
    ledger::{Ledger, LedgerEntry},
    market::MarketState,
    operation::Operation,
    resolver::ActionResolver,
    stream::StreamError,
};

/// Lifecycle of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Accepting operations.
    Consuming,
    /// The source is exhausted; the ledger is final.
    Done,
}

/// Consumes one recording's operations in order and builds its ledger.
pub struct TimelineDriver<S = TracingSink> {
    resolver: ActionResolver<S>,
    ledger: Ledger,
    clock_ms: u64,
    state: DriverState,
}

impl<S: DiagnosticSink> TimelineDriver<S> {
    /// Driver at match time zero with an empty ledger.
    pub fn new(resolver: ActionResolver<S>) -> Self {
        Self {
            resolver,
            ledger: Ledger::new(),
            clock_ms: 0,
            state: DriverState::Consuming,
        }
    }

    /// Match time reached so far, in milliseconds.
    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Ledger built so far.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Market of the run.
    pub fn market(&self) -> &MarketState {
        self.resolver.market()
    }

    /// Process a single operation.
    pub fn feed(&mut self, operation: &Operation) -> Result<(), AnalysisError> {
        if self.state == DriverState::Done {
            return Err(AnalysisError::StreamFinished);
        }

        match operation {
            Operation::Sync { elapsed_ms, .. } => {
                self.clock_ms = self.clock_ms.saturating_add(*elapsed_ms);
            }
            Operation::Action(action) => {
                let resolved = self
                    .resolver
                    .resolve(action, self.clock_ms)
                    .map_err(|source| AnalysisError::Resolve {
                        elapsed_ms: self.clock_ms,
                        source,
                    });
                let resolution = match resolved {
                    Ok(Some(resolution)) => resolution,
                    Ok(None) => return Ok(()),
                    Err(err) => return Err(self.abort(err)),
                };
                // Only resolvable actions reach this point, and those always
                // have a known kind and a player.
                let (Some(kind), Some(player_id)) = (action.kind(), action.player_id()) else {
                    return Ok(());
                };
                let entry = LedgerEntry {
                    elapsed_ms: self.clock_ms,
                    kind,
                    player_id,
                    object_id: resolution.object_id,
                    expense: resolution.expense,
                    name: resolution.display_name,
                    prices: self.resolver.market().prices(),
                };
                self.resolver
                    .sink()
                    .emit(Severity::Debug, format_args!("recording {entry:?}"));
                self.ledger.push(entry);
            }
            Operation::Other => {}
        }
        Ok(())
    }

    /// Mark the source as exhausted.
    pub fn finish(&mut self) {
        self.state = DriverState::Done;
    }

    /// Consume `operations` until exhaustion and return the finished ledger.
    ///
    /// The first stream or resolution error aborts the run.
    pub fn run<I>(mut self, operations: I) -> Result<Ledger, AnalysisError>
    where
        I: IntoIterator<Item = Result<Operation, StreamError>>,
    {
        for operation in operations {
            let operation = operation.map_err(|err| self.abort(err.into()))?;
            self.feed(&operation)?;
        }
        self.finish();
        self.resolver.sink().emit(
            Severity::Info,
            format_args!(
                "timeline finished at {} ms with {} ledger entries",
                self.clock_ms,
                self.ledger.len()
            ),
        );
        Ok(self.ledger)
    }

    /// Hand over the ledger built so far.
    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    fn abort(&mut self, err: AnalysisError) -> AnalysisError {
        self.state = DriverState::Done;
        self.resolver.sink().emit(
            Severity::Fatal,
            format_args!("aborting at {} ms: {err}", self.clock_ms),
        );
        err
    }
}
