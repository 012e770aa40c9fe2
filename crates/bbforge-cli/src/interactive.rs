//! Terminal prompts for values upstream metadata did not provide.
//!
//! Uses dialoguer; an empty answer is allowed and means "no value".

use anyhow::{Context, Result};
use dialoguer::{Input, theme::ColorfulTheme};

use bbforge_core::prompt::Prompt;

#[derive(Default)]
pub struct DialoguerPrompt {
    theme: ColorfulTheme,
}

impl DialoguerPrompt {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompt for DialoguerPrompt {
    fn ask(&self, question: &str) -> Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()
            .with_context(|| format!("Failed to read answer for: {question}"))
    }
}
