//! Typed queries against the node CLI
//!
//! Each method issues one or two commands through a [`CommandExecutor`] and
//! runs the output through the extractors. One-shot operations surface
//! command failures as errors; lookups whose absence is expected return
//! `Option`.

use log::{debug, warn};
use serde_json::Value;
use std::path::Path;

use crate::balance::TokenBalance;
use crate::error::{GovernanceError, Result};
use crate::extract;
use crate::gateway::{CommandExecutor, NodeCommand};
use crate::status::ProposalSnapshot;

/// Identifiers returned by `proposal propose`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionResult {
    pub proposal_id: Option<String>,
    pub transaction_id: Option<String>,
}

impl SubmissionResult {
    pub fn from_output(raw: &str) -> Self {
        Self {
            proposal_id: extract::proposal_id(raw),
            transaction_id: extract::transaction_id(raw),
        }
    }

    pub fn has_identifier(&self) -> bool {
        self.proposal_id.is_some() || self.transaction_id.is_some()
    }
}

pub struct NodeClient<E> {
    executor: E,
}

impl<E: CommandExecutor> NodeClient<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    fn run(&self, command: NodeCommand) -> Result<String> {
        self.executor
            .execute(&command)
            .map_err(|source| GovernanceError::command(&command, source))
    }

    pub fn version(&self) -> Result<String> {
        self.run(NodeCommand::new(["--version"]))
    }

    /// Address of the CLI's default account, if it has one.
    pub fn default_address(&self) -> Option<String> {
        match self.run(NodeCommand::new(["account", "default"])) {
            Ok(output) => extract::default_address(&output),
            Err(e) => {
                debug!("No default account: {}", e);
                None
            }
        }
    }

    /// Raw `governToken query` output; an error means governance tokens
    /// are not initialized for `address`.
    pub fn query_governance_tokens(&self, address: &str) -> Result<String> {
        self.run(NodeCommand::new(["governToken", "query", "-a", address]))
    }

    /// Decoded balance, `None` when the output does not parse.
    pub fn token_balance(&self, address: &str) -> Result<Option<TokenBalance>> {
        let output = self.query_governance_tokens(address)?;
        Ok(extract::response_json(&output).and_then(|json| TokenBalance::from_response(&json)))
    }

    /// Initialize governance tokens. Returns the transaction id.
    pub fn init_governance_tokens(&self, fee: u64) -> Result<String> {
        let output =
            self.run(NodeCommand::new(["governToken", "init", "--fee"]).arg(fee.to_string()))?;
        extract::transaction_id(&output).ok_or_else(|| {
            GovernanceError::ParseFailure("transaction id from governToken init".to_string())
        })
    }

    pub fn status(&self) -> Result<Value> {
        let output = self.run(NodeCommand::new(["status"]))?;
        serde_json::from_str(&output)
            .map_err(|e| GovernanceError::ParseFailure(format!("node status: {}", e)))
    }

    pub fn current_height(&self) -> Result<u64> {
        let status = self.status()?;
        extract::chain_height(&status)
            .ok_or_else(|| {
                GovernanceError::ParseFailure("blockchains[0].ledger.trunkHeight".to_string())
            })
    }

    /// Whether the active consensus is `target`. Failures read as `false`.
    pub fn consensus_matches(&self, target: &str) -> bool {
        match self.status() {
            Ok(status) => extract::consensus_name_matches(&status, target),
            Err(e) => {
                debug!("Error checking consensus status: {}", e);
                false
            }
        }
    }

    pub fn submit_proposal(&self, path: &Path, fee: u64) -> Result<SubmissionResult> {
        let output = self.run(
            NodeCommand::new(["proposal", "propose", "--proposal"])
                .arg(path.display().to_string())
                .arg("--fee")
                .arg(fee.to_string()),
        )?;
        Ok(SubmissionResult::from_output(&output))
    }

    /// Raw `tx query` output.
    pub fn query_transaction(&self, txid: &str) -> Result<String> {
        self.run(NodeCommand::new(["tx", "query", txid]))
    }

    pub fn proposal_id_from_transaction(&self, txid: &str) -> Option<String> {
        match self.query_transaction(txid) {
            Ok(output) => extract::proposal_key_from_transaction(&output),
            Err(e) => {
                debug!("Could not query transaction {}: {}", txid, e);
                None
            }
        }
    }

    /// Vote with `amount` tokens. Returns the vote transaction id if printed.
    pub fn vote(&self, proposal_id: &str, amount: u64, fee: u64) -> Result<Option<String>> {
        let output = self.run(
            NodeCommand::new(["proposal", "vote", "--pid", proposal_id])
                .arg("--amount")
                .arg(amount.to_string())
                .arg("--fee")
                .arg(fee.to_string()),
        )?;
        Ok(extract::transaction_id(&output))
    }

    /// Current proposal record.
    ///
    /// Queries the proposal directly, then falls back to the outputs recorded
    /// by `txid`. With no proposal id the fallback takes the first proposal
    /// record in the transaction.
    pub fn proposal_status(
        &self,
        proposal_id: Option<&str>,
        txid: Option<&str>,
    ) -> Option<ProposalSnapshot> {
        proposal_id
            .and_then(|pid| self.query_proposal(pid))
            .or_else(|| txid.and_then(|txid| self.proposal_from_transaction(proposal_id, txid)))
    }

    fn query_proposal(&self, proposal_id: &str) -> Option<ProposalSnapshot> {
        let output = match self.run(NodeCommand::new(["proposal", "query", "-p", proposal_id])) {
            Ok(output) => output,
            Err(e) => {
                debug!("Proposal query failed: {}", e);
                return None;
            }
        };

        let snapshot = extract::json_after_marker(&output, extract::CONTRACT_RESPONSE_MARKER)
            .and_then(|json| ProposalSnapshot::from_value(&json));
        if snapshot.is_none() {
            debug!("Error parsing proposal query output");
        }
        snapshot
    }

    fn proposal_from_transaction(
        &self,
        proposal_id: Option<&str>,
        txid: &str,
    ) -> Option<ProposalSnapshot> {
        let output = self.query_transaction(txid).ok()?;
        let tx_json: Value = match serde_json::from_str(&output) {
            Ok(json) => json,
            Err(e) => {
                warn!("Transaction {} output is not JSON: {}", txid, e);
                return None;
            }
        };

        let record = match proposal_id {
            Some(pid) => {
                extract::nested_transaction_output(&tx_json, extract::PROPOSAL_BUCKET, pid)
            }
            None => extract::first_proposal_output(&tx_json),
        }?;
        ProposalSnapshot::from_value(&record)
    }
}
