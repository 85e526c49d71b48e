//! Fatal error types of the conversion pipeline.

use serde_json::Value;

use crate::{
    catalog::CatalogError, models::PlayerId, operation::ActionKind, stream::StreamError,
};

/// An action that cannot be turned into a ledger entry.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Kind with economic meaning that the ledger cannot express.
    #[error("unsupported action {kind} by player {player_id:?}: {payload}")]
    Unsupported {
        /// Kind of the action.
        kind: ActionKind,
        /// Acting player, when known.
        player_id: Option<PlayerId>,
        /// Raw action fields.
        payload: Value,
    },
    /// Build, queue or research of an id missing from the catalog.
    #[error("{kind} by player {player_id} references an unknown object")]
    UnknownObject {
        /// Kind of the action.
        kind: ActionKind,
        /// Acting player.
        player_id: PlayerId,
        /// Failed catalog lookup.
        #[source]
        source: CatalogError,
    },
    /// Market trade of gold or an unknown resource id.
    #[error("{kind} by player {player_id} trades non-tradable resource id {resource_id}")]
    NonTradable {
        /// Kind of the action.
        kind: ActionKind,
        /// Trading player.
        player_id: PlayerId,
        /// Resource id from the recording.
        resource_id: u8,
    },
}

/// Reason a recording could not be converted.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The operation stream could not be read.
    #[error(transparent)]
    Stream(#[from] StreamError),
    /// An action failed to resolve.
    #[error("at {elapsed_ms} ms: {source}")]
    Resolve {
        /// Match time of the failing action.
        elapsed_ms: u64,
        /// Resolution failure.
        #[source]
        source: ResolveError,
    },
    /// The driver was used after it finished.
    #[error("operation fed after the stream was exhausted")]
    StreamFinished,
}

impl AnalysisError {
    /// Match time at which the run aborted, when known.
    pub fn elapsed_ms(&self) -> Option<u64> {
        match self {
            AnalysisError::Resolve { elapsed_ms, .. } => Some(*elapsed_ms),
            _ => None,
        }
    }
}
