//! Consensus-change proposal payload
//!
//! The layout mirrors what `proposal propose --proposal <file>` expects:
//! a vote window under `args` and a deferred `updateConsensus` call under
//! `trigger`. Field order is preserved in the written JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ConsensusTarget, ProposalConfig};
use crate::error::Result;
use crate::planner::HeightPlan;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Voting group the proposer is placed in
pub const INITIAL_PROPOSER_GROUP: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalArgs {
    pub min_vote_percent: String,
    pub stop_vote_height: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub version: String,
    pub proposer_num: String,
    pub period: String,
    pub alternate_interval: String,
    pub term_interval: String,
    /// Activation time in nanoseconds since the epoch
    pub timestamp: String,
    pub block_num: String,
    pub vote_unit_price: String,
    pub init_proposer: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerArgs {
    pub name: String,
    pub config: ConsensusConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub height: u64,
    pub module: String,
    pub contract: String,
    pub method: String,
    pub args: TriggerArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub args: ProposalArgs,
    pub trigger: Trigger,
}

impl Proposal {
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct ProposalBuilder<'a> {
    target: &'a ConsensusTarget,
}

impl<'a> ProposalBuilder<'a> {
    pub fn new(target: &'a ConsensusTarget) -> Self {
        Self { target }
    }

    pub fn build(
        &self,
        proposer: &str,
        plan: &HeightPlan,
        config: &ProposalConfig,
        now: DateTime<Utc>,
    ) -> Proposal {
        let target = self.target;

        let mut init_proposer = BTreeMap::new();
        init_proposer.insert(INITIAL_PROPOSER_GROUP.to_string(), vec![proposer.to_string()]);

        Proposal {
            args: ProposalArgs {
                min_vote_percent: config.min_vote_percent.to_string(),
                stop_vote_height: plan.stop_vote_height.to_string(),
            },
            trigger: Trigger {
                height: plan.trigger_height,
                module: target.module.clone(),
                contract: target.contract.clone(),
                method: target.method.clone(),
                args: TriggerArgs {
                    name: target.name.clone(),
                    config: ConsensusConfig {
                        version: target.version.clone(),
                        proposer_num: target.proposer_num.to_string(),
                        period: target.period.to_string(),
                        alternate_interval: target.alternate_interval.to_string(),
                        term_interval: target.term_interval.to_string(),
                        timestamp: self.activation_timestamp(now).to_string(),
                        block_num: plan.block_num_height.to_string(),
                        vote_unit_price: target.vote_unit_price.to_string(),
                        init_proposer,
                    },
                },
            },
        }
    }

    /// `now` plus the activation offset, as integer nanoseconds.
    pub fn activation_timestamp(&self, now: DateTime<Utc>) -> i128 {
        let now_nanos =
            now.timestamp() as i128 * NANOS_PER_SEC + now.timestamp_subsec_nanos() as i128;
        now_nanos + self.target.activation_offset_secs as i128 * NANOS_PER_SEC
    }

    /// Write `proposal` as indented JSON, creating parent directories.
    pub fn write(proposal: &Proposal, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, proposal.to_pretty_json()?)?;
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn sample() -> Proposal {
        let target = ConsensusTarget::default();
        let config = ProposalConfig::default();
        let now = Utc.timestamp_opt(1_700_000_000, 500).unwrap();
        ProposalBuilder::new(&target).build(
            "TeyyPLpp9L7QAcxHangtcHTu7HUZ6iydY",
            &plan(1000, &config),
            &config,
            now,
        )
    }

    #[test]
    fn test_proposal_layout() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "args": {"min_vote_percent": "51", "stop_vote_height": "1040"},
                "trigger": {
                    "height": 1050,
                    "module": "xkernel",
                    "contract": "$consensus",
                    "method": "updateConsensus",
                    "args": {
                        "name": "tdpos",
                        "config": {
                            "version": "3",
                            "proposer_num": "1",
                            "period": "10000",
                            "alternate_interval": "10000",
                            "term_interval": "30000",
                            "timestamp": "1700000600000000500",
                            "block_num": "1055",
                            "vote_unit_price": "1",
                            "init_proposer": {"1": ["TeyyPLpp9L7QAcxHangtcHTu7HUZ6iydY"]}
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_timestamp_is_in_the_future() {
        let target = ConsensusTarget::default();
        let builder = ProposalBuilder::new(&target);
        let now = Utc::now();
        let now_nanos = now.timestamp() as i128 * NANOS_PER_SEC;
        assert!(builder.activation_timestamp(now) > now_nanos);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proposal-app").join("proposal.json");

        let proposal = sample();
        let written = ProposalBuilder::write(&proposal, &path).unwrap();
        assert_eq!(written, path);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\n  \"args\""));
        let decoded: Proposal = serde_json::from_str(&contents).unwrap();
        assert_eq!(decoded, proposal);

        let raw: Value = serde_json::from_str(&contents).unwrap();
        let keys: Vec<_> = raw.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["args", "trigger"]);
    }
}
