//! Error types for the linkhop-pathfind crate.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum PathfindError {
    /// The remote graph could not be reached; sampling cannot proceed.
    #[error("Remote graph unavailable: {0}")]
    RemoteUnavailable(#[from] linkhop_graph::GraphError),

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] linkhop_core::LinkhopError),
}

pub type Result<T> = std::result::Result<T, PathfindError>;
