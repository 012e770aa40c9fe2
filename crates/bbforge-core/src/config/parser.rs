//! TOML parser with helpful error messages

use std::path::Path;

use super::schema::BbforgeConfig;
use crate::error::ConfigError;

/// Parse bbforge.toml with detailed error messages
pub fn parse_bbforge_toml(path: &Path) -> Result<BbforgeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bbforge_toml_str(&content)
}

/// Parse bbforge.toml content from string
pub fn parse_bbforge_toml_str(content: &str) -> Result<BbforgeConfig, ConfigError> {
    let config: BbforgeConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config.expand_paths())
}

/// Enhance TOML parsing errors with the offending lines
fn enhance_toml_error(error: toml::de::Error, content: &str) -> ConfigError {
    let message = error.message().to_string();

    let line_num = error
        .span()
        .map(|span| content[..span.start.min(content.len())].lines().count().max(1));

    match line_num {
        Some(line_num) => ConfigError::Parse(format!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            message
        )),
        None => ConfigError::Parse(format!("TOML parsing error: {}", error)),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
