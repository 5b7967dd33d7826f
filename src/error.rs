//! Error types.
//!
//! Engine failures ([`ModelError`]) are what the harness and the session
//! isolate; [`CastleError`] is the crate-level error returned from
//! encoder, session and aggregation entry points.

use thiserror::Error;

/// A failure raised by the simulation engine itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("model construction failed: {message}")]
    Construction { message: String },

    #[error("model step failed: {message}")]
    Step { message: String },

    #[error("model panicked: {message}")]
    Panicked { message: String },
}

impl ModelError {
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
        }
    }

    pub fn step(message: impl Into<String>) -> Self {
        Self::Step {
            message: message.into(),
        }
    }
}

/// Aggregation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("cannot aggregate an empty batch")]
    EmptyBatch,

    #[error("cannot merge reports built with different thresholds")]
    ThresholdMismatch,
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum CastleError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid model state: {reason}")]
    InvalidModelState { reason: String },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CastleError {
    #[must_use]
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidModelState {
            reason: reason.into(),
        }
    }

    /// Returns true if the error originated inside the engine.
    #[must_use]
    pub const fn is_model(&self) -> bool {
        matches!(self, Self::Model(_))
    }
}

pub type Result<T> = std::result::Result<T, CastleError>;
