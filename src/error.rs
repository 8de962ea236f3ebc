//! Unified error model for the matching core.
//!
//! A single `MatchError` enum is used across the expander, join stage, Frame
//! and optimizer so that `run_search` has exactly one failure type to report
//! to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::GraphId;

#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchError {
    #[error("invalid argument: {detail}")]
    InvalidArgument { detail: String },

    #[error("invariant violation: {detail}")]
    InvariantViolation { detail: String },

    #[error("search cancelled")]
    Cancelled,

    #[error("no such graph: {graph_id}")]
    NoSuchGraph { graph_id: GraphId },
}

/// Default mapping for ad-hoc glue code that deals in `anyhow::Error` (e.g. a
/// caller's own setup code) and needs to cross into this crate's error type;
/// mirrors the teacher's `From<anyhow::Error> for AppError` default mapping.
impl From<anyhow::Error> for MatchError {
    fn from(err: anyhow::Error) -> Self {
        MatchError::InvariantViolation { detail: err.to_string() }
    }
}

impl MatchError {
    pub fn invalid_argument<S: Into<String>>(detail: S) -> Self {
        MatchError::InvalidArgument { detail: detail.into() }
    }

    pub fn invariant_violation<S: Into<String>>(detail: S) -> Self {
        MatchError::InvariantViolation { detail: detail.into() }
    }

    pub fn no_such_graph(graph_id: GraphId) -> Self {
        MatchError::NoSuchGraph { graph_id }
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
