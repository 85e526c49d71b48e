#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Age of Empires II expense analyser.
//!
//! This crate hosts the object catalog, the market simulation, the
//! operation stream reader, the timeline that turns a recording into an
//! expense ledger, and the persistence and reporting layers used by the
//! command line and any future frontends.

pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ledger;
pub mod market;
pub mod models;
pub mod operation;
pub mod players;
pub mod recording;
pub mod report;
pub mod resolver;
pub mod stream;
pub mod timeline;

pub use catalog::{CatalogGroup, GameCatalog};
pub use config::AppConfig;
pub use diagnostics::{DiagnosticSink, Severity, TracingSink};
pub use error::{AnalysisError, ResolveError};
pub use ledger::{Ledger, LedgerEntry};
pub use market::{MarketSettings, MarketState, TradeOp};
pub use models::{Commodity, Expense, MarketPrices, Resource};
pub use operation::{Action, ActionKind, Operation};
pub use players::{Player, PlayerRegistry};
pub use recording::{LedgerSource, Recording};
pub use report::Report;
pub use resolver::ActionResolver;
pub use timeline::TimelineDriver;
