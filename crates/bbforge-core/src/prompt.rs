//! Interactive input capability injected into backends.

/// Asks the operator for a single value.
///
/// Backends call this only for values upstream metadata did not provide.
/// Implementations return the raw answer; callers trim it and treat an empty
/// answer as "no value".
pub trait Prompt: Send + Sync {
    fn ask(&self, question: &str) -> anyhow::Result<String>;
}

/// Prompt that never asks and always answers with nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl Prompt for NonInteractive {
    fn ask(&self, question: &str) -> anyhow::Result<String> {
        tracing::debug!(question, "Skipping prompt in non-interactive mode");
        Ok(String::new())
    }
}
