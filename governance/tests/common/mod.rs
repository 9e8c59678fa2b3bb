//! Simulated node and clock shared by the integration tests
//!
//! Time only moves when the code under test sleeps. The node answers
//! `status` and `proposal query` from a script indexed by elapsed time
//! (one entry per poll interval); every other command is answered from a
//! fixed table.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use governance::{CancelToken, Clock, CommandError, CommandExecutor, NodeCommand, Prompt};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

pub struct SimClock {
    start: DateTime<Utc>,
    elapsed: Rc<Cell<Duration>>,
    cancel_at: Option<(Duration, CancelToken)>,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            start: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
            cancel_at: None,
        }
    }

    /// Flip `token` once simulated time reaches `at`.
    pub fn cancel_at(mut self, at: Duration, token: CancelToken) -> Self {
        self.cancel_at = Some((at, token));
        self
    }

    pub fn handle(&self) -> Rc<Cell<Duration>> {
        Rc::clone(&self.elapsed)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        self.start + chrono::Duration::from_std(self.elapsed.get()).unwrap()
    }

    fn sleep(&self, duration: Duration) {
        let elapsed = self.elapsed.get() + duration;
        self.elapsed.set(elapsed);
        if let Some((at, token)) = &self.cancel_at {
            if elapsed >= *at {
                token.cancel();
            }
        }
    }
}

/// What the chain looks like during one poll interval
#[derive(Debug, Clone)]
pub struct Poll {
    /// `None` makes `status` fail
    pub height: Option<u64>,
    /// `None` makes `proposal query` fail
    pub status: Option<&'static str>,
    pub consensus: &'static str,
}

impl Poll {
    pub fn new(height: u64, status: &'static str, consensus: &'static str) -> Self {
        Self {
            height: Some(height),
            status: Some(status),
            consensus,
        }
    }
}

pub struct SimNode {
    elapsed: Rc<Cell<Duration>>,
    interval: Duration,
    script: Box<dyn Fn(usize) -> Poll>,
    canned: HashMap<String, Result<String, String>>,
    pub calls: RefCell<Vec<String>>,
}

impl SimNode {
    pub fn new(
        clock: &SimClock,
        interval: Duration,
        script: impl Fn(usize) -> Poll + 'static,
    ) -> Self {
        Self {
            elapsed: clock.handle(),
            interval,
            script: Box::new(script),
            canned: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn respond(mut self, command: &str, output: &str) -> Self {
        self.canned.insert(command.to_string(), Ok(output.to_string()));
        self
    }

    pub fn fail(mut self, command: &str, stderr: &str) -> Self {
        self.canned.insert(command.to_string(), Err(stderr.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn current(&self) -> Poll {
        let index = self.elapsed.get().as_millis() / self.interval.as_millis();
        (self.script)(index as usize)
    }
}

fn failed(stderr: impl Into<String>) -> CommandError {
    CommandError::Failed {
        status: Some(1),
        stderr: stderr.into(),
    }
}

impl CommandExecutor for SimNode {
    fn execute(&self, command: &NodeCommand) -> Result<String, CommandError> {
        let line = command.to_string();
        self.calls.borrow_mut().push(line.clone());

        if let Some(canned) = self.canned.get(&line) {
            return canned.clone().map_err(failed);
        }

        let poll = self.current();
        if line == "status" {
            return match poll.height {
                Some(height) => Ok(json!({
                    "blockchains": [{
                        "name": "xuper",
                        "ledger": {"rootBlockid": "00", "trunkHeight": height},
                        "consensusName": poll.consensus
                    }]
                })
                .to_string()),
                None => Err(failed("rpc error: connection refused")),
            };
        }
        if line.starts_with("proposal query -p ") {
            return match poll.status {
                Some(status) => Ok(format!(
                    "contract response: {}\n",
                    json!({"status": status, "vote_amount": "900"})
                )),
                None => Err(failed("proposal not found")),
            };
        }
        Err(failed(format!("unexpected command: {}", line)))
    }
}

/// Answers questions by substring match; unmatched questions get defaults.
#[derive(Default)]
pub struct ScriptedPrompt {
    confirms: Vec<(&'static str, bool)>,
    inputs: Vec<(&'static str, &'static str)>,
    pub asked: RefCell<Vec<String>>,
    pub shown: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn answer_confirm(mut self, key: &'static str, answer: bool) -> Self {
        self.confirms.push((key, answer));
        self
    }

    pub fn answer_input(mut self, key: &'static str, answer: &'static str) -> Self {
        self.inputs.push((key, answer));
        self
    }

    pub fn was_asked(&self, key: &str) -> bool {
        self.asked.borrow().iter().any(|q| q.contains(key))
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, question: &str, default: bool) -> bool {
        self.asked.borrow_mut().push(question.to_string());
        self.confirms
            .iter()
            .find(|(key, _)| question.contains(key))
            .map(|(_, answer)| *answer)
            .unwrap_or(default)
    }

    fn input(&self, question: &str) -> Option<String> {
        self.asked.borrow_mut().push(question.to_string());
        self.inputs
            .iter()
            .find(|(key, _)| question.contains(key))
            .map(|(_, answer)| answer.to_string())
    }

    fn show(&self, text: &str) {
        self.shown.borrow_mut().push(text.to_string());
    }
}
