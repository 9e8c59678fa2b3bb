//! Proposal lifecycle orchestration
//!
//! Runs the stages strictly in order, each depending on the one before:
//!
//! `CliChecked → AddressResolved → GovernanceChecked → HeightRead → Planned →
//! ProposalBuilt → Submitted → TokensQueried → Voted → Monitoring → Done`
//!
//! A stage that produces nothing usable aborts the run with an error. The
//! exceptions are the governance check in interactive mode and the vote,
//! both of which only log and let the run continue.
//!
//! Cancellation before monitoring aborts at the next stage boundary, so no
//! further transaction is sent once the token is set. During monitoring it
//! ends the loop with `UserCancelled` instead.

use log::{debug, error, info, warn};
use std::path::PathBuf;

use crate::clock::{pause, CancelToken, Clock};
use crate::config::{ProposalConfig, Settings};
use crate::error::{GovernanceError, Result};
use crate::extract::{self, looks_like_address};
use crate::gateway::CommandExecutor;
use crate::monitor::{Monitor, MonitorOutcome, MonitorTarget};
use crate::node::{NodeClient, SubmissionResult};
use crate::planner::{self, HeightPlan};
use crate::prompt::Prompt;
use crate::proposal::{Proposal, ProposalBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    CliChecked,
    AddressResolved,
    GovernanceChecked,
    HeightRead,
    Planned,
    ProposalBuilt,
    Submitted,
    TokensQueried,
    Voted,
    Monitoring,
    Done,
}

/// Everything a completed run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub address: String,
    pub plan: HeightPlan,
    pub proposal: Proposal,
    pub proposal_path: PathBuf,
    pub submission: SubmissionResult,
    pub vote_transaction_id: Option<String>,
    pub outcome: MonitorOutcome,
}

pub struct Orchestrator<'a, E, C: ?Sized, P: ?Sized> {
    settings: &'a Settings,
    node: NodeClient<E>,
    clock: &'a C,
    prompt: &'a P,
    cancel: CancelToken,
    stage: Stage,
}

impl<'a, E, C, P> Orchestrator<'a, E, C, P>
where
    E: CommandExecutor,
    C: Clock + ?Sized,
    P: Prompt + ?Sized,
{
    pub fn new(
        settings: &'a Settings,
        executor: E,
        clock: &'a C,
        prompt: &'a P,
        cancel: CancelToken,
    ) -> Self {
        Self {
            settings,
            node: NodeClient::new(executor),
            clock,
            prompt,
            cancel,
            stage: Stage::Start,
        }
    }

    /// Last stage reached
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `stage`, refusing to go on once the run has been cancelled.
    fn advance(&mut self, stage: Stage) -> Result<()> {
        debug!("Stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
        self.ensure_not_cancelled()
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            warn!("Run cancelled by user after stage {:?}", self.stage);
            return Err(GovernanceError::Aborted("cancelled by user".to_string()));
        }
        Ok(())
    }

    fn interactive(&self) -> bool {
        self.settings.interactive
    }

    pub fn run(&mut self) -> Result<RunReport> {
        self.ensure_not_cancelled()?;
        self.check_cli()?;
        self.advance(Stage::CliChecked)?;

        let address = self.resolve_address();
        self.advance(Stage::AddressResolved)?;

        self.check_governance(&address)?;
        self.advance(Stage::GovernanceChecked)?;

        let current_height = self.node.current_height().map_err(|e| {
            error!("Failed to get blockchain height.");
            e
        })?;
        info!("✅ Current blockchain height: {}", current_height);
        self.advance(Stage::HeightRead)?;

        let config = self.proposal_config(current_height);
        let plan = planner::plan(current_height, &config);
        info!("Vote will end at height: {}", plan.stop_vote_height);
        info!("Trigger will execute at height: {}", plan.trigger_height);
        info!("Block num height set to: {}", plan.block_num_height);
        self.advance(Stage::Planned)?;

        let (proposal, proposal_path) = self.build_proposal(&address, &plan, &config)?;
        self.advance(Stage::ProposalBuilt)?;

        let submission = self.submit(&proposal_path)?;
        self.advance(Stage::Submitted)?;

        let available = self.available_tokens(&address);
        self.advance(Stage::TokensQueried)?;

        let vote_transaction_id = self.vote(&submission, available)?;
        self.advance(Stage::Voted)?;

        let target = MonitorTarget {
            proposal_id: submission.proposal_id.clone(),
            transaction_id: vote_transaction_id
                .clone()
                .or_else(|| submission.transaction_id.clone()),
            stop_vote_height: Some(plan.stop_vote_height),
            trigger_height: Some(plan.trigger_height),
        };
        self.advance(Stage::Monitoring)?;
        if self.interactive() {
            self.prompt.show("Press Ctrl+C to stop monitoring at any time");
        }
        let outcome = Monitor::new(
            &self.node,
            self.clock,
            &self.settings.monitor,
            &self.settings.consensus.name,
            self.settings.verbose,
            self.cancel.clone(),
        )
        .run(&target);
        debug!("Stage {:?} -> {:?}", self.stage, Stage::Done);
        self.stage = Stage::Done;

        Ok(RunReport {
            address,
            plan,
            proposal,
            proposal_path,
            submission,
            vote_transaction_id,
            outcome,
        })
    }

    fn check_cli(&self) -> Result<()> {
        info!(target: crate::STAGE, "Checking if the node CLI is available...");
        match self.node.version() {
            Ok(version) => {
                info!("✅ Found node CLI: {}", version);
                Ok(())
            }
            Err(e) => {
                error!(
                    "Could not find or execute the node CLI. \
                     Please make sure it's installed and the path is correct."
                );
                Err(e)
            }
        }
    }

    fn resolve_address(&self) -> String {
        info!(target: crate::STAGE, "Checking address...");

        let mut address = self
            .settings
            .address
            .clone()
            .filter(|a| !a.trim().is_empty());

        if address.is_none() {
            if let Some(default) = self.node.default_address() {
                let keep = !self.interactive()
                    || self.prompt.confirm(&format!("Use default address {}?", default), true);
                address = if keep {
                    Some(default)
                } else {
                    self.prompt.input("Enter your address")
                };
            }
        }

        let address = address
            .or_else(|| {
                if self.interactive() {
                    self.prompt.input("Enter your address")
                } else {
                    None
                }
            })
            .unwrap_or_else(|| {
                warn!("Using default address: {}", crate::DEFAULT_ADDRESS);
                crate::DEFAULT_ADDRESS.to_string()
            });

        if !looks_like_address(&address) {
            warn!(
                "Address format appears invalid. Continuing anyway, but this might cause issues."
            );
        }
        info!("Proposer address: {}", address);
        address
    }

    fn check_governance(&self, address: &str) -> Result<()> {
        info!(target: crate::STAGE, "Checking if governance tokens are initialized...");

        let err = match self.node.query_governance_tokens(address) {
            Ok(output) => {
                let balance = extract::response_json(&output)
                    .and_then(|json| json.get("total_balance").and_then(extract::value_as_u64));
                match balance {
                    Some(balance) => info!("✅ Current governance token balance: {}", balance),
                    None => warn!(
                        "Could not parse token balance, but governance appears to be initialized."
                    ),
                }
                return Ok(());
            }
            Err(e) => e,
        };

        if !self.interactive() {
            error!("Governance tokens not initialized.");
            return Err(GovernanceError::PreconditionFailure(format!(
                "governance tokens not initialized for {}: {}",
                address, err
            )));
        }

        if !self
            .prompt
            .confirm("Governance tokens not found. Would you like to initialize them?", false)
        {
            warn!("Skipping governance token initialization.");
            return Ok(());
        }

        info!("Attempting to initialize governance tokens...");
        match self.node.init_governance_tokens(self.settings.node.init_fee) {
            Ok(txid) => {
                info!("✅ Successfully initialized governance tokens (Tx id: {})", txid);
                self.await_confirmation();
            }
            Err(e) => error!("Failed to initialize governance tokens: {}", e),
        }
        Ok(())
    }

    fn proposal_config(&self, current_height: u64) -> ProposalConfig {
        info!(target: crate::STAGE, "Configuring proposal parameters...");

        let mut config = self.settings.proposal;
        if !self.interactive() {
            return config;
        }

        self.prompt.show(&format!("Current blockchain height: {}", current_height));
        self.prompt
            .show(&format!("Default voting duration: {} blocks", config.vote_duration_blocks));

        if let Some(blocks) = self.ask_u64(&format!(
            "Enter voting duration in blocks (default: {})",
            config.vote_duration_blocks
        )) {
            config = config.with_vote_duration(blocks);
        }

        if let Some(percent) = self.ask_u64(&format!(
            "Enter minimum vote percent (default: {})",
            config.min_vote_percent
        )) {
            let updated = config.with_min_vote_percent(percent);
            if updated.min_vote_percent != percent {
                warn!(
                    "Minimum vote percent must be between 1 and 100, keeping {}",
                    config.min_vote_percent
                );
            }
            config = updated;
        }

        if let Some(blocks) = self.ask_u64(&format!(
            "Enter trigger buffer blocks (default: {})",
            config.trigger_buffer
        )) {
            config = config.with_trigger_buffer(blocks);
        }

        config
    }

    fn ask_u64(&self, question: &str) -> Option<u64> {
        let answer = self.prompt.input(question)?;
        match answer.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring non-numeric answer {:?}, using default", answer);
                None
            }
        }
    }

    fn build_proposal(
        &self,
        address: &str,
        plan: &HeightPlan,
        config: &ProposalConfig,
    ) -> Result<(Proposal, PathBuf)> {
        info!(target: crate::STAGE, "Creating proposal...");

        let proposal = ProposalBuilder::new(&self.settings.consensus).build(
            address,
            plan,
            config,
            self.clock.now(),
        );
        let path = ProposalBuilder::write(&proposal, &self.settings.node.proposal_path)?;
        info!("✅ Created proposal at {}", path.display());

        if self.interactive() && self.prompt.confirm("Show proposal details?", false) {
            self.prompt.show(&proposal.to_pretty_json()?);
        }

        Ok((proposal, path))
    }

    fn submit(&self, path: &std::path::Path) -> Result<SubmissionResult> {
        info!(target: crate::STAGE, "Submitting proposal...");

        if self.interactive() && !self.prompt.confirm("Ready to submit proposal?", true) {
            warn!("Proposal submission cancelled by user.");
            return Err(GovernanceError::Aborted("proposal submission cancelled".to_string()));
        }

        let mut submission = self
            .node
            .submit_proposal(path, self.settings.node.propose_fee)
            .map_err(|e| {
                error!("Proposal submission failed.");
                e
            })?;

        if let Some(pid) = &submission.proposal_id {
            info!("✅ Proposal ID: {}", pid);
        }

        if let Some(txid) = submission.transaction_id.clone() {
            info!("✅ Transaction ID: {}", txid);
            self.await_confirmation();
            self.ensure_not_cancelled()?;

            if submission.proposal_id.is_none() {
                submission.proposal_id = self.node.proposal_id_from_transaction(&txid);
                if let Some(pid) = &submission.proposal_id {
                    info!("✅ Extracted Proposal ID from transaction: {}", pid);
                }
            }
        }

        if submission.proposal_id.is_none() && self.interactive() {
            submission.proposal_id = self
                .prompt
                .input("Could not automatically determine proposal ID. Please enter it manually");
        }

        if !submission.has_identifier() {
            error!("Proposal submission returned neither a proposal ID nor a transaction ID.");
            return Err(GovernanceError::MissingIdentifier);
        }
        Ok(submission)
    }

    fn available_tokens(&self, address: &str) -> u64 {
        info!(target: crate::STAGE, "Checking governance tokens for {}...", address);

        match self.node.token_balance(address) {
            Ok(Some(balance)) => {
                info!("Total governance tokens: {}", balance.total);
                info!("Locked tokens: {}", balance.locked());
                if balance.locked() > balance.total {
                    warn!(
                        "Locked tokens exceed the total balance; treating available tokens as zero"
                    );
                }
                info!("✅ Available tokens for voting: {}", balance.available());
                balance.available()
            }
            Ok(None) => {
                error!("Error getting governance tokens: unrecognized balance response");
                0
            }
            Err(e) => {
                error!("Failed to query governance tokens: {}", e);
                0
            }
        }
    }

    fn vote(&self, submission: &SubmissionResult, available: u64) -> Result<Option<String>> {
        self.ensure_not_cancelled()?;
        let Some(pid) = submission.proposal_id.as_deref() else {
            warn!("No proposal ID known, skipping vote.");
            return Ok(None);
        };

        if available == 0 {
            warn!("No governance tokens available for voting.");
            if self.interactive() && !self.prompt.confirm("Continue monitoring anyway?", true) {
                return Err(GovernanceError::Aborted(
                    "no governance tokens available for voting".to_string(),
                ));
            }
            return Ok(None);
        }

        info!(target: crate::STAGE, "Voting on proposal {}...", pid);
        let amount = self.vote_amount(available);
        info!("Voting with {} tokens...", amount);
        self.ensure_not_cancelled()?;

        match self.node.vote(pid, amount, self.settings.node.vote_fee) {
            Ok(Some(txid)) => {
                info!("✅ Vote Transaction ID: {}", txid);
                self.await_confirmation();
                Ok(Some(txid))
            }
            Ok(None) => {
                info!("✅ Vote submitted successfully");
                Ok(None)
            }
            Err(e) => {
                error!("Vote submission failed: {}", e);
                Ok(None)
            }
        }
    }

    fn vote_amount(&self, available: u64) -> u64 {
        let default = default_vote_amount(available, self.settings.vote.ratio_percent);
        if !self.interactive() {
            return default;
        }

        match self.ask_u64(&format!("Enter amount to vote with (default: {})", default)) {
            Some(amount) if amount > available => {
                warn!(
                    "Amount exceeds available tokens ({}), using maximum available",
                    available
                );
                available
            }
            Some(amount) if amount > 0 => amount,
            _ => default,
        }
    }

    fn await_confirmation(&self) {
        info!("Waiting for transaction to be confirmed...");
        pause(self.clock, self.settings.node.confirmation_delay(), &self.cancel);
    }
}

/// `ratio_percent` of `available`, at least one token when any are available.
pub fn default_vote_amount(available: u64, ratio_percent: u64) -> u64 {
    if available == 0 {
        return 0;
    }
    let share = available as u128 * ratio_percent.min(100) as u128 / 100;
    (share as u64).max(1)
}
