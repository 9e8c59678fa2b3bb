//! Proposal status as reported by the chain

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::extract::value_as_u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Still voting or waiting; holds the normalized raw status
    Open(String),
    CompletedSuccess,
    Completed,
    Passed,
    Rejected,
    Expired,
    Unknown,
}

impl ProposalStatus {
    /// Normalize a reported status, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "completed_success" => Self::CompletedSuccess,
            "completed" => Self::Completed,
            "passed" => Self::Passed,
            "rejected" => Self::Rejected,
            "expired" => Self::Expired,
            "" | "unknown" => Self::Unknown,
            _ => Self::Open(normalized),
        }
    }

    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Self::CompletedSuccess | Self::Completed | Self::Passed)
    }

    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Rejected | Self::Expired)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(raw) => write!(f, "{}", raw),
            Self::CompletedSuccess => write!(f, "completed_success"),
            Self::Completed => write!(f, "completed"),
            Self::Passed => write!(f, "passed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Expired => write!(f, "expired"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A proposal record decoded from `proposal query` or a transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalSnapshot {
    pub status: ProposalStatus,
    pub vote_amount: String,
    pub stop_vote_height: Option<u64>,
    pub trigger_height: Option<u64>,
}

impl ProposalSnapshot {
    /// Only objects decode; a bare number or string is not a proposal record.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object()?;

        let status = value
            .get("status")
            .and_then(Value::as_str)
            .map(ProposalStatus::parse)
            .unwrap_or(ProposalStatus::Unknown);

        let vote_amount = match value.get("vote_amount") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "0".to_string(),
        };

        let stop_vote_height = value
            .get("args")
            .and_then(|a| a.get("stop_vote_height"))
            .and_then(value_as_u64);
        let trigger_height = value
            .get("trigger")
            .and_then(|t| t.get("height"))
            .and_then(value_as_u64);

        Some(Self {
            status,
            vote_amount,
            stop_vote_height,
            trigger_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ProposalStatus::parse("COMPLETED_SUCCESS"), ProposalStatus::CompletedSuccess);
        assert_eq!(ProposalStatus::parse("Passed"), ProposalStatus::Passed);
        assert_eq!(ProposalStatus::parse(" Rejected "), ProposalStatus::Rejected);
        assert_eq!(ProposalStatus::parse("voting"), ProposalStatus::Open("voting".to_string()));
        assert_eq!(ProposalStatus::parse(""), ProposalStatus::Unknown);
    }

    #[test]
    fn test_terminal_sets() {
        for raw in ["completed_success", "completed", "passed"] {
            let status = ProposalStatus::parse(raw);
            assert!(status.is_terminal_success());
            assert!(!status.is_terminal_failure());
        }
        for raw in ["rejected", "expired"] {
            let status = ProposalStatus::parse(raw);
            assert!(status.is_terminal_failure());
            assert!(!status.is_terminal_success());
        }
        for raw in ["pending", "voting", "unknown"] {
            let status = ProposalStatus::parse(raw);
            assert!(!status.is_terminal_success());
            assert!(!status.is_terminal_failure());
        }
    }

    #[test]
    fn test_display_round_trips_normalized() {
        assert_eq!(ProposalStatus::parse("Voting").to_string(), "voting");
        assert_eq!(ProposalStatus::Expired.to_string(), "expired");
    }

    #[test]
    fn test_snapshot_from_value() {
        let value = json!({
            "status": "voting",
            "vote_amount": "900",
            "args": {"min_vote_percent": "51", "stop_vote_height": "1040"},
            "trigger": {"height": 1050}
        });
        let snapshot = ProposalSnapshot::from_value(&value).unwrap();
        assert_eq!(snapshot.status, ProposalStatus::Open("voting".to_string()));
        assert_eq!(snapshot.vote_amount, "900");
        assert_eq!(snapshot.stop_vote_height, Some(1040));
        assert_eq!(snapshot.trigger_height, Some(1050));
    }

    #[test]
    fn test_snapshot_defaults() {
        let snapshot = ProposalSnapshot::from_value(&json!({})).unwrap();
        assert_eq!(snapshot.status, ProposalStatus::Unknown);
        assert_eq!(snapshot.vote_amount, "0");
        assert_eq!(snapshot.stop_vote_height, None);

        assert!(ProposalSnapshot::from_value(&json!(7)).is_none());
    }
}
