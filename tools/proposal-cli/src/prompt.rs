use governance::prompt::parse_confirmation;
use governance::Prompt;
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

/// Asks on stdout, reads answers line by line from stdin.
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn ask(&self, question: &str) -> Option<String> {
        print!("{} ", question.cyan());
        io::stdout().flush().ok()?;

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        self.ask(&format!("{} {}", question, hint))
            .map(|answer| parse_confirmation(&answer, default))
            .unwrap_or(default)
    }

    fn input(&self, question: &str) -> Option<String> {
        self.ask(&format!("{}:", question)).filter(|answer| !answer.is_empty())
    }

    fn show(&self, text: &str) {
        println!("{}", text);
    }
}
