//! Pluggable decoders turning raw artifact payloads into attribute maps.
//!
//! Parsers are held by an explicit [`ParserRegistry`] built at startup and
//! looked up by case-insensitive name.

mod appstream;
mod kde_ci;

use std::fmt;

use tracing::{trace, warn};

pub use appstream::AppStreamParser;
pub use kde_ci::KdeCiParser;

use crate::error::ParseError;

/// Normalized parser output.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

pub trait Parser: fmt::Debug + Send + Sync {
    /// Registry key, matched case-insensitively.
    fn name(&self) -> &'static str;

    fn init(&mut self) -> Result<(), ParseError>;

    fn ready(&self) -> bool;

    fn parse(&self, payload: &[u8]) -> Result<Attributes, ParseError>;
}

#[derive(Debug, Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn Parser>>,
}

impl ParserRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in parsers, initialized.
    pub fn with_default_parsers() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(AppStreamParser::new()));
        registry.register(Box::new(KdeCiParser::new()));
        registry.init();
        registry
    }

    pub fn register(&mut self, parser: Box<dyn Parser>) {
        self.parsers.push(parser);
    }

    /// Initialize every parser; failures leave that parser not ready.
    pub fn init(&mut self) {
        for parser in &mut self.parsers {
            match parser.init() {
                Ok(()) => trace!(parser = parser.name(), "Parser initialized"),
                Err(e) => warn!(parser = parser.name(), error = %e, "Parser failed to initialize"),
            }
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    pub fn get(&self, name: &str) -> Result<&dyn Parser, ParseError> {
        self.parsers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .map(|p| p.as_ref())
            .ok_or_else(|| ParseError::UnknownParser(name.to_string()))
    }

    /// Parse `payload` with the named parser, which must be ready.
    pub fn parse(&self, name: &str, payload: &[u8]) -> Result<Attributes, ParseError> {
        let parser = self.get(name)?;
        if !parser.ready() {
            return Err(ParseError::NotReady(parser.name().to_string()));
        }
        parser.parse(payload)
    }
}
