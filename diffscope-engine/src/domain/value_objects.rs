//! Engine value objects

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum JobStatus {
    /// Job is allocated and waiting for a worker slot
    Pending,
    /// A worker is driving the scan pipeline
    Running,
    /// Pipeline reached the end stage; a report is available
    Completed,
    /// A stage failed; error detail and a partial report are available
    Failed,
    /// Job was cancelled before completion
    Cancelled,
}

impl JobStatus {
    /// Returns the set of valid target states from the current state.
    ///
    /// ```text
    /// Pending ──► Running ──► Completed
    ///   │           ├──────► Failed
    ///   └──────────►└──────► Cancelled
    /// ```
    ///
    /// Running → Cancelled is legal because cancellation is cooperative and
    /// honored at stage boundaries; terminal states have no successors.
    pub fn valid_transitions(&self) -> &[JobStatus] {
        match self {
            Self::Pending => &[Self::Running, Self::Cancelled],
            Self::Running => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => &[],
        }
    }

    /// Check whether transitioning to `target` is allowed from the current state.
    pub fn can_transition_to(&self, target: &JobStatus) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Whether this status represents a terminal (final) state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Error parsing a status filter supplied by a caller
#[derive(Debug, thiserror::Error)]
#[error("Unknown job status: {0}")]
pub struct ParseJobStatusError(pub String);

impl std::str::FromStr for JobStatus {
    type Err = ParseJobStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ParseJobStatusError(other.to_string())),
        }
    }
}

/// Recorded state transition for a scan job (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobTransition {
    pub from: JobStatus,
    pub to: JobStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Human-readable reason or context for the transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an invalid status transition is attempted.
#[derive(Debug, thiserror::Error)]
#[error("Invalid job transition from {from} to {to}")]
pub struct JobTransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(JobStatus::Pending.can_transition_to(&JobStatus::Running));
        assert!(JobStatus::Pending.can_transition_to(&JobStatus::Cancelled));
        assert!(JobStatus::Running.can_transition_to(&JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(&JobStatus::Failed));
        assert!(JobStatus::Running.can_transition_to(&JobStatus::Cancelled));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!JobStatus::Pending.can_transition_to(&JobStatus::Completed));
        assert!(!JobStatus::Pending.can_transition_to(&JobStatus::Failed));
        assert!(!JobStatus::Completed.can_transition_to(&JobStatus::Running));
        assert!(!JobStatus::Failed.can_transition_to(&JobStatus::Running));
        assert!(!JobStatus::Cancelled.can_transition_to(&JobStatus::Pending));
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("running".parse::<JobStatus>().ok(), Some(JobStatus::Running));
        assert_eq!("FAILED".parse::<JobStatus>().ok(), Some(JobStatus::Failed));
        assert!("unknown".parse::<JobStatus>().is_err());
    }
}
