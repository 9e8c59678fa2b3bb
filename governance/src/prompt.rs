//! Interactive input seam

/// Source of operator answers. Only consulted in interactive runs.
pub trait Prompt {
    /// Yes/no question; an empty answer yields `default`.
    fn confirm(&self, question: &str, default: bool) -> bool;

    /// Free-form answer; `None` when empty or unavailable.
    fn input(&self, question: &str) -> Option<String>;

    /// Show text to the operator.
    fn show(&self, text: &str);
}

/// Answers every question with its default
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl Prompt for NoPrompt {
    fn confirm(&self, _question: &str, default: bool) -> bool {
        default
    }

    fn input(&self, _question: &str) -> Option<String> {
        None
    }

    fn show(&self, _text: &str) {}
}

/// Interpret a y/n answer, falling back to `default` when blank.
pub fn parse_confirmation(answer: &str, default: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}
