// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::time::Duration;
use thiserror::Error;

/// Everything that can end an AI report request.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("chat call failed: {0}")]
    Chat(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("model response is not valid JSON: {reason} (response starts with: {prefix})")]
    InvalidJson { reason: String, prefix: String },

    #[error("model response is not a report: {0}")]
    MalformedReport(String),

    #[error("model kept requesting queries after {limit} round trips")]
    IterationBudgetExceeded { limit: usize },

    #[error("report generation timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("conversation history cannot be refined: {0}")]
    InvalidHistory(String),
}
