//! Consensus Proposer
//!
//! Proposes switching the chain to TDPoS consensus through the node CLI,
//! votes on the proposal and watches the chain until the switch lands.

mod logging;
mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use governance::{
    CancelToken, CliGateway, MonitorOutcome, NoPrompt, Orchestrator, Prompt, RunReport, Settings,
    SystemClock,
};
use log::{error, warn};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::prompt::TerminalPrompt;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the node CLI [default: ./bin/xchain-cli]
    #[arg(long)]
    cli: Option<PathBuf>,

    /// Proposer address (defaults to the CLI's default account)
    #[arg(short, long)]
    address: Option<String>,

    /// Ask for parameters and confirmations (on by default in a terminal)
    #[arg(short, long, conflicts_with = "non_interactive")]
    interactive: bool,

    /// Never prompt, even in a terminal
    #[arg(long)]
    non_interactive: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Timeout for each node CLI call in seconds (0 disables)
    #[arg(long)]
    timeout: Option<u64>,
}

impl Args {
    /// File settings with flags applied on top.
    fn settings(&self, on_terminal: bool) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => Settings::default(),
        };

        if let Some(cli) = &self.cli {
            settings.node.cli = cli.clone();
        }
        if let Some(address) = &self.address {
            settings.address = Some(address.clone());
        }
        if let Some(timeout) = self.timeout {
            settings.node.command_timeout_secs = timeout;
        }
        settings.verbose |= self.verbose;
        settings.interactive = !self.non_interactive
            && (self.interactive || settings.interactive || on_terminal);

        settings.validate().context("Invalid configuration")?;
        Ok(settings)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let on_terminal = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();

    let settings = args.settings(on_terminal);
    logging::init(settings.as_ref().map_or(args.verbose, |s| s.verbose));

    match settings.and_then(|settings| run(&settings)) {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings) -> Result<RunReport> {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            std::process::exit(130);
        }
        warn!("Stopping... press Ctrl+C again to exit immediately");
        handler_token.cancel();
    })
    .context("Failed to install Ctrl+C handler")?;

    let gateway = CliGateway::from_settings(&settings.node);
    let prompt: Box<dyn Prompt> = if settings.interactive {
        Box::new(TerminalPrompt)
    } else {
        Box::new(NoPrompt)
    };

    let mut orchestrator =
        Orchestrator::new(settings, gateway, &SystemClock, prompt.as_ref(), cancel);
    orchestrator
        .run()
        .with_context(|| format!("Proposal run stopped after stage {:?}", orchestrator.stage()))
}

fn describe(outcome: &MonitorOutcome) -> String {
    match outcome {
        MonitorOutcome::ConfirmedSuccess { height } => {
            format!("consensus switched (confirmed at height {})", height).green().to_string()
        }
        MonitorOutcome::Rejected => "proposal rejected".red().to_string(),
        MonitorOutcome::Expired => "proposal expired".red().to_string(),
        MonitorOutcome::MaxChecksExhausted { checks } => {
            format!("not confirmed after {} checks past the trigger, verify manually", checks)
                .yellow()
                .to_string()
        }
        MonitorOutcome::UserCancelled => "monitoring stopped by user".yellow().to_string(),
    }
}

fn print_summary(report: &RunReport) {
    let none = "-";
    println!();
    println!("{}", "📊 Proposal Summary".cyan().bold());
    println!("==========================================");
    println!("Proposer:        {}", report.address);
    println!("Proposal file:   {}", report.proposal_path.display());
    println!(
        "Proposal ID:     {}",
        report.submission.proposal_id.as_deref().unwrap_or(none)
    );
    println!(
        "Transaction ID:  {}",
        report.submission.transaction_id.as_deref().unwrap_or(none)
    );
    println!(
        "Vote TX ID:      {}",
        report.vote_transaction_id.as_deref().unwrap_or(none)
    );
    println!("Start height:    {}", report.plan.current_height);
    println!("Vote ends:       {}", report.plan.stop_vote_height);
    println!("Trigger:         {}", report.plan.trigger_height);
    println!("Outcome:         {}", describe(&report.outcome));
}
