//! Consensus Governance
//!
//! Drives a consensus-change proposal through a node that is only reachable
//! via its command-line client: plans the vote and trigger heights, writes
//! and submits the proposal, votes with the available governance tokens and
//! monitors the chain until the new consensus is active.

pub mod balance;
pub mod clock;
pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod monitor;
pub mod node;
pub mod orchestrator;
pub mod planner;
pub mod prompt;
pub mod proposal;
pub mod status;

pub use balance::TokenBalance;
pub use clock::{CancelToken, Clock, SystemClock};
pub use config::{
    ConsensusTarget, MonitorConfig, NodeSettings, ProposalConfig, Settings, VoteConfig,
};
pub use error::{CommandError, GovernanceError, Result};
pub use gateway::{CliGateway, CommandExecutor, NodeCommand};
pub use monitor::{Monitor, MonitorOutcome, MonitorState, MonitorTarget};
pub use node::{NodeClient, SubmissionResult};
pub use orchestrator::{Orchestrator, RunReport, Stage};
pub use planner::{plan, HeightPlan};
pub use prompt::{NoPrompt, Prompt};
pub use proposal::{Proposal, ProposalBuilder};
pub use status::{ProposalSnapshot, ProposalStatus};

/// Default location of the node CLI
pub const DEFAULT_CLI: &str = "./bin/xchain-cli";

/// Proposer used when no address can be resolved
pub const DEFAULT_ADDRESS: &str = "TeyyPLpp9L7QAcxHangtcHTu7HUZ6iydY";

/// Log target for stage headers
pub const STAGE: &str = "stage";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(Settings::default().node.cli.to_str(), Some(DEFAULT_CLI));
        assert!(extract::looks_like_address(DEFAULT_ADDRESS));
    }
}
