use serde::Deserialize;
use serde_json::Value;

use super::{Attributes, Parser};
use crate::error::ParseError;

/// Reads the repository paths a project requires from its `.kde-ci.yml`.
#[derive(Debug, Default)]
pub struct KdeCiParser {
    ready: bool,
}

impl KdeCiParser {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default, Deserialize)]
struct CiDescriptor {
    #[serde(default, rename = "Dependencies")]
    dependencies: Vec<DependencyBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct DependencyBlock {
    #[serde(default)]
    require: serde_yaml::Mapping,
}

impl Parser for KdeCiParser {
    fn name(&self) -> &'static str {
        "kde-ci"
    }

    fn init(&mut self) -> Result<(), ParseError> {
        self.ready = true;
        Ok(())
    }

    fn ready(&self) -> bool {
        self.ready
    }

    fn parse(&self, payload: &[u8]) -> Result<Attributes, ParseError> {
        let text = std::str::from_utf8(payload)?;
        let descriptor: CiDescriptor = if text.trim().is_empty() {
            CiDescriptor::default()
        } else {
            serde_yaml::from_str(text)?
        };

        let mut requires: Vec<String> = Vec::new();
        for block in &descriptor.dependencies {
            for key in block.require.iter().filter_map(|(key, _)| key.as_str()) {
                if !requires.iter().any(|seen| seen == key) {
                    requires.push(key.to_string());
                }
            }
        }

        let mut attributes = Attributes::new();
        attributes.insert(
            "requires".into(),
            Value::Array(requires.into_iter().map(Value::String).collect()),
        );
        Ok(attributes)
    }
}
