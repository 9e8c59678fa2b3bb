//! Proposer configuration (proposer.toml) support
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below. Example:
//!
//! ```toml
//! [node]
//! cli = "./bin/xchain-cli"
//! command_timeout_secs = 60
//!
//! [proposal]
//! vote_duration_blocks = 40
//! min_vote_percent = 51
//!
//! [monitor]
//! max_checks_after_trigger = 20
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GovernanceError, Result};

/// Vote window and trigger spacing for a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalConfig {
    /// Blocks the vote stays open (~2 minutes at 3 second blocks)
    pub vote_duration_blocks: u64,
    /// Blocks between vote end and trigger execution
    pub trigger_buffer: u64,
    /// Blocks between trigger and the new consensus' first block
    pub block_num_buffer: u64,
    /// Voting threshold, 1..=100
    pub min_vote_percent: u64,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            vote_duration_blocks: 40,
            trigger_buffer: 10,
            block_num_buffer: 5,
            min_vote_percent: 51,
        }
    }
}

impl ProposalConfig {
    pub fn with_vote_duration(self, vote_duration_blocks: u64) -> Self {
        Self {
            vote_duration_blocks,
            ..self
        }
    }

    pub fn with_trigger_buffer(self, trigger_buffer: u64) -> Self {
        Self {
            trigger_buffer,
            ..self
        }
    }

    /// Out-of-range percentages are ignored.
    pub fn with_min_vote_percent(self, min_vote_percent: u64) -> Self {
        if (1..=100).contains(&min_vote_percent) {
            Self {
                min_vote_percent,
                ..self
            }
        } else {
            self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.min_vote_percent) {
            return Err(GovernanceError::InvalidConfig(format!(
                "min_vote_percent must be between 1 and 100, got {}",
                self.min_vote_percent
            )));
        }
        Ok(())
    }
}

/// How to reach the node CLI and what to pay for transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub cli: PathBuf,
    /// Per-call timeout; 0 disables it
    pub command_timeout_secs: u64,
    pub init_fee: u64,
    pub propose_fee: u64,
    pub vote_fee: u64,
    /// Wait after a transaction before relying on it
    pub confirmation_delay_secs: u64,
    pub proposal_path: PathBuf,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            cli: PathBuf::from(crate::DEFAULT_CLI),
            command_timeout_secs: 60,
            init_fee: 1000,
            propose_fee: 100,
            vote_fee: 100,
            confirmation_delay_secs: 5,
            proposal_path: PathBuf::from("proposal-app/proposal.json"),
        }
    }
}

impl NodeSettings {
    pub fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_secs(self.confirmation_delay_secs)
    }
}

/// The consensus the proposal switches to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusTarget {
    pub name: String,
    pub version: String,
    pub proposer_num: u64,
    pub period: u64,
    pub alternate_interval: u64,
    pub term_interval: u64,
    pub vote_unit_price: u64,
    /// How far in the future the new consensus' timestamp is set
    pub activation_offset_secs: u64,
    pub module: String,
    pub contract: String,
    pub method: String,
}

impl Default for ConsensusTarget {
    fn default() -> Self {
        Self {
            name: "tdpos".to_string(),
            version: "3".to_string(),
            proposer_num: 1,
            period: 10_000,
            alternate_interval: 10_000,
            term_interval: 30_000,
            vote_unit_price: 1,
            activation_offset_secs: 10 * 60,
            module: "xkernel".to_string(),
            contract: "$consensus".to_string(),
            method: "updateConsensus".to_string(),
        }
    }
}

/// Polling cadence for the monitor loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    pub verbose_poll_interval_secs: u64,
    pub unchanged_height_delay_secs: u64,
    pub height_retry_delay_secs: u64,
    pub max_checks_after_trigger: u32,
    /// Estimated block interval used for ETAs
    pub seconds_per_block: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            verbose_poll_interval_secs: 5,
            unchanged_height_delay_secs: 3,
            height_retry_delay_secs: 10,
            max_checks_after_trigger: 20,
            seconds_per_block: 3,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self, verbose: bool) -> Duration {
        if verbose {
            Duration::from_secs(self.verbose_poll_interval_secs)
        } else {
            Duration::from_secs(self.poll_interval_secs)
        }
    }
}

/// How many tokens go into the vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    /// Share of available tokens voted by default, 1..=100
    pub ratio_percent: u64,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self { ratio_percent: 90 }
    }
}

/// Everything a run needs, built once at startup and passed down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub node: NodeSettings,
    pub proposal: ProposalConfig,
    pub consensus: ConsensusTarget,
    pub monitor: MonitorConfig,
    pub vote: VoteConfig,
    /// Proposer address; resolved from the node when absent
    pub address: Option<String>,
    pub interactive: bool,
    pub verbose: bool,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.proposal.validate()?;

        if self.node.cli.as_os_str().is_empty() {
            return Err(GovernanceError::InvalidConfig(
                "node.cli must not be empty".to_string(),
            ));
        }
        if self.consensus.name.trim().is_empty() {
            return Err(GovernanceError::InvalidConfig(
                "consensus.name must not be empty".to_string(),
            ));
        }
        if self.monitor.max_checks_after_trigger == 0 {
            return Err(GovernanceError::InvalidConfig(
                "monitor.max_checks_after_trigger must be positive".to_string(),
            ));
        }
        if self.monitor.seconds_per_block == 0 {
            return Err(GovernanceError::InvalidConfig(
                "monitor.seconds_per_block must be positive".to_string(),
            ));
        }
        if !(1..=100).contains(&self.vote.ratio_percent) {
            return Err(GovernanceError::InvalidConfig(format!(
                "vote.ratio_percent must be between 1 and 100, got {}",
                self.vote.ratio_percent
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.proposal.vote_duration_blocks, 40);
        assert_eq!(settings.proposal.trigger_buffer, 10);
        assert_eq!(settings.proposal.block_num_buffer, 5);
        assert_eq!(settings.proposal.min_vote_percent, 51);
        assert_eq!(settings.monitor.max_checks_after_trigger, 20);
        assert_eq!(settings.consensus.name, "tdpos");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            [node]
            cli = "/opt/xchain/bin/xchain-cli"
            command_timeout_secs = 0

            [proposal]
            vote_duration_blocks = 100
            "#,
        )
        .unwrap();

        assert_eq!(settings.node.cli, PathBuf::from("/opt/xchain/bin/xchain-cli"));
        assert_eq!(settings.node.command_timeout(), None);
        assert_eq!(settings.node.propose_fee, 100);
        assert_eq!(settings.proposal.vote_duration_blocks, 100);
        assert_eq!(settings.proposal.min_vote_percent, 51);
    }

    #[test]
    fn test_rejects_out_of_range_vote_percent() {
        let result = Settings::from_toml("[proposal]\nmin_vote_percent = 0\n");
        assert!(matches!(result, Err(GovernanceError::InvalidConfig(_))));

        let result = Settings::from_toml("[proposal]\nmin_vote_percent = 101\n");
        assert!(matches!(result, Err(GovernanceError::InvalidConfig(_))));
    }

    #[test]
    fn test_vote_section() {
        let settings = Settings::from_toml("[vote]\nratio_percent = 50\n").unwrap();
        assert_eq!(settings.vote.ratio_percent, 50);
        assert_eq!(Settings::default().vote.ratio_percent, 90);

        let result = Settings::from_toml("[vote]\nratio_percent = 0\n");
        assert!(matches!(result, Err(GovernanceError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_max_checks() {
        let result = Settings::from_toml("[monitor]\nmax_checks_after_trigger = 0\n");
        assert!(matches!(result, Err(GovernanceError::InvalidConfig(_))));
    }

    #[test]
    fn test_min_vote_override_ignores_invalid() {
        let config = ProposalConfig::default();
        assert_eq!(config.with_min_vote_percent(75).min_vote_percent, 75);
        assert_eq!(config.with_min_vote_percent(0).min_vote_percent, 51);
        assert_eq!(config.with_min_vote_percent(150).min_vote_percent, 51);
    }

    #[test]
    fn test_poll_interval_shorter_when_verbose() {
        let monitor = MonitorConfig::default();
        assert_eq!(monitor.poll_interval(false), Duration::from_secs(10));
        assert_eq!(monitor.poll_interval(true), Duration::from_secs(5));
    }
}
