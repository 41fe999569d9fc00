use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Stage;

#[derive(Error, Debug)]
pub enum TidingsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Selector error: {0}")]
    Selector(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Generation lock conflict for key {0}")]
    LockConflict(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Why a stage fault happened. Kept machine-checkable so callers can
/// distinguish a model outage from a broken lookup without parsing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    ModelInvocation,
    Lookup,
    Timeout,
    Internal,
}

/// One recovered fault from a pipeline stage. Appended to the run's error
/// list and retained for the life of the run; never cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageFault {
    pub stage: Stage,
    pub kind: FaultKind,
    pub message: String,
}

impl StageFault {
    pub fn new(stage: Stage, kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    pub fn internal(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, FaultKind::Internal, message)
    }
}

impl std::fmt::Display for StageFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} step failed: {}", self.stage, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_fault_renders_stage_and_message() {
        let fault = StageFault::new(Stage::Research, FaultKind::Lookup, "search timed out");
        assert_eq!(fault.to_string(), "research step failed: search timed out");
    }
}
