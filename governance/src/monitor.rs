//! Proposal monitor
//!
//! Polls the node until the proposal resolves:
//! - `ConfirmedSuccess` once the consensus identity matches the target,
//!   either past the trigger height or after a terminal-success status
//! - `Rejected` / `Expired` as soon as the chain reports them
//! - `MaxChecksExhausted` when the consensus has not switched after the
//!   configured number of post-trigger checks
//! - `UserCancelled` when the cancel token is set, observed between polls
//!
//! A terminal-success status alone never ends the loop; the consensus check
//! has to agree.

use log::{debug, info, warn};
use std::time::Duration;

use crate::clock::{pause, CancelToken, Clock};
use crate::config::MonitorConfig;
use crate::gateway::CommandExecutor;
use crate::node::NodeClient;
use crate::status::{ProposalSnapshot, ProposalStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    ConfirmedSuccess { height: u64 },
    Rejected,
    Expired,
    MaxChecksExhausted { checks: u32 },
    UserCancelled,
}

impl MonitorOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::ConfirmedSuccess { .. })
    }
}

/// What to watch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorTarget {
    pub proposal_id: Option<String>,
    /// Transaction whose outputs serve as a status fallback
    pub transaction_id: Option<String>,
    /// Taken from the chain's record when absent
    pub stop_vote_height: Option<u64>,
    pub trigger_height: Option<u64>,
}

impl MonitorTarget {
    fn label(&self) -> &str {
        self.proposal_id
            .as_deref()
            .or(self.transaction_id.as_deref())
            .unwrap_or("<unknown>")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub last_seen_height: Option<u64>,
    pub checks_after_trigger: u32,
    pub max_checks_after_trigger: u32,
    /// Iterations that reached the status query
    pub polls: u64,
}

pub struct Monitor<'a, E, C: ?Sized> {
    node: &'a NodeClient<E>,
    clock: &'a C,
    config: &'a MonitorConfig,
    consensus: &'a str,
    verbose: bool,
    cancel: CancelToken,
    state: MonitorState,
}

impl<'a, E: CommandExecutor, C: Clock + ?Sized> Monitor<'a, E, C> {
    pub fn new(
        node: &'a NodeClient<E>,
        clock: &'a C,
        config: &'a MonitorConfig,
        consensus: &'a str,
        verbose: bool,
        cancel: CancelToken,
    ) -> Self {
        Self {
            node,
            clock,
            config,
            consensus,
            verbose,
            cancel,
            state: MonitorState {
                max_checks_after_trigger: config.max_checks_after_trigger,
                ..MonitorState::default()
            },
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn run(&mut self, target: &MonitorTarget) -> MonitorOutcome {
        info!(target: crate::STAGE, "Monitoring proposal {}...", target.label());

        loop {
            if self.cancel.is_cancelled() {
                warn!("Monitoring stopped by user");
                return MonitorOutcome::UserCancelled;
            }
            if let Some(outcome) = self.poll(target) {
                return outcome;
            }
        }
    }

    /// One iteration; `None` means keep polling.
    fn poll(&mut self, target: &MonitorTarget) -> Option<MonitorOutcome> {
        let height = match self.node.current_height() {
            Ok(height) => height,
            Err(e) => {
                let delay = Duration::from_secs(self.config.height_retry_delay_secs);
                warn!(
                    "Failed to get blockchain height ({}), retrying in {} seconds...",
                    e,
                    delay.as_secs()
                );
                self.wait(delay);
                return None;
            }
        };

        if self.state.last_seen_height == Some(height) && !self.verbose {
            self.wait(Duration::from_secs(self.config.unchanged_height_delay_secs));
            return None;
        }
        self.state.last_seen_height = Some(height);
        self.state.polls += 1;

        let snapshot = self
            .node
            .proposal_status(target.proposal_id.as_deref(), target.transaction_id.as_deref());

        let outcome = match snapshot {
            Some(snapshot) => self.evaluate(height, target, &snapshot),
            None => {
                warn!("Could not retrieve status for proposal {}", target.label());
                self.confirm_consensus(height)
            }
        };
        if outcome.is_some() {
            return outcome;
        }

        let interval = self.config.poll_interval(self.verbose);
        debug!("Next update in {} seconds...", interval.as_secs());
        self.wait(interval);
        None
    }

    fn evaluate(
        &mut self,
        height: u64,
        target: &MonitorTarget,
        snapshot: &ProposalSnapshot,
    ) -> Option<MonitorOutcome> {
        let stop_vote_height = target.stop_vote_height.or(snapshot.stop_vote_height).unwrap_or(0);
        let trigger_height = target.trigger_height.or(snapshot.trigger_height).unwrap_or(0);

        info!("Status: {}, Votes: {}", snapshot.status, snapshot.vote_amount);
        info!(
            "Current height: {}, Stop vote: {}, Trigger: {}",
            height, stop_vote_height, trigger_height
        );
        self.report_progress(height, stop_vote_height, trigger_height);

        match &snapshot.status {
            ProposalStatus::Rejected => {
                warn!("Proposal has been rejected. Monitoring complete.");
                return Some(MonitorOutcome::Rejected);
            }
            ProposalStatus::Expired => {
                warn!("Proposal has expired. Monitoring complete.");
                return Some(MonitorOutcome::Expired);
            }
            _ => {}
        }

        if height >= trigger_height {
            self.state.checks_after_trigger += 1;

            if let Some(confirmed) = self.confirm_consensus(height) {
                return Some(confirmed);
            }
            if self.state.checks_after_trigger >= self.state.max_checks_after_trigger {
                warn!(
                    "Maximum number of checks reached after trigger height. Please verify manually."
                );
                return Some(MonitorOutcome::MaxChecksExhausted {
                    checks: self.state.checks_after_trigger,
                });
            }
            warn!(
                "Consensus not changed yet. Checks remaining: {}",
                self.state.max_checks_after_trigger - self.state.checks_after_trigger
            );
        }

        if snapshot.status.is_terminal_success() {
            info!("Proposal is {}! Checking if consensus has changed...", snapshot.status);
            return self.confirm_consensus(height);
        }

        None
    }

    fn confirm_consensus(&self, height: u64) -> Option<MonitorOutcome> {
        if self.node.consensus_matches(self.consensus) {
            info!("✅ SUCCESS: Consensus has been changed to {}", self.consensus);
            Some(MonitorOutcome::ConfirmedSuccess { height })
        } else {
            None
        }
    }

    fn report_progress(&self, height: u64, stop_vote_height: u64, trigger_height: u64) {
        let blocks_until_vote_end = stop_vote_height.saturating_sub(height);
        let blocks_until_trigger = trigger_height.saturating_sub(height);
        let per_block = self.config.seconds_per_block;

        if blocks_until_vote_end > 0 {
            info!(
                "Voting ends in {} blocks (~{})",
                blocks_until_vote_end,
                format_time_remaining(blocks_until_vote_end.saturating_mul(per_block))
            );
        } else if blocks_until_trigger > 0 {
            info!(
                "Waiting for trigger in {} blocks (~{})",
                blocks_until_trigger,
                format_time_remaining(blocks_until_trigger.saturating_mul(per_block))
            );
        } else {
            info!("Waiting for consensus change...");
        }
    }

    fn wait(&self, duration: Duration) {
        pause(self.clock, duration, &self.cancel);
    }
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Render seconds as seconds, minutes, or hours and minutes.
pub fn format_time_remaining(seconds: u64) -> String {
    if seconds < 60 {
        plural(seconds, "second")
    } else if seconds < 3600 {
        plural(seconds / 60, "minute")
    } else {
        let hours = plural(seconds / 3600, "hour");
        match (seconds % 3600) / 60 {
            0 => hours,
            minutes => format!("{} {}", hours, plural(minutes, "minute")),
        }
    }
}
