//! Uniform result of every mutating claim operation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome reported back to the host layer.
///
/// Validation and authorization failures are values, never errors; only
/// persistence failures travel through `Result::Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionResponse {
    Successful,
    Failed(FailureReason),
}

/// Why an operation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Acting player lacks the required role
    Access,
    /// Name outside 1..=36 characters
    Length,
    /// Name, member or claim already present
    Exists,
    /// Region, member or invitation absent
    NotFound,
    /// Operation aimed at the acting player where that is meaningless
    SelfTarget,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Access => "access",
            FailureReason::Length => "length",
            FailureReason::Exists => "exists",
            FailureReason::NotFound => "not-found",
            FailureReason::SelfTarget => "self-target",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "access" => Some(FailureReason::Access),
            "length" => Some(FailureReason::Length),
            "exists" => Some(FailureReason::Exists),
            "not-found" => Some(FailureReason::NotFound),
            "self-target" => Some(FailureReason::SelfTarget),
            _ => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ActionResponse {
    pub const fn failed(reason: FailureReason) -> Self {
        ActionResponse::Failed(reason)
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, ActionResponse::Successful)
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            ActionResponse::Successful => None,
            ActionResponse::Failed(reason) => Some(*reason),
        }
    }

    /// Wire code of the failure, empty when successful
    pub fn reason_code(&self) -> &'static str {
        self.reason().map_or("", |r| r.as_str())
    }
}

impl fmt::Display for ActionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionResponse::Successful => f.write_str("successful"),
            ActionResponse::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}
