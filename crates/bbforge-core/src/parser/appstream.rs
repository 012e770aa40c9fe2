use roxmltree::{Document, Node, ParsingOptions};
use serde_json::Value;
use tracing::trace;

use super::{Attributes, Parser};
use crate::error::ParseError;
use crate::version::latest_stable;

/// Extracts summary, description and the latest stable release from an
/// AppStream metadata file.
///
/// Only untranslated elements (no `xml:lang`) are considered. Attributes are
/// omitted rather than set empty when the document lacks them.
#[derive(Debug, Default)]
pub struct AppStreamParser {
    ready: bool,
}

impl AppStreamParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Parser for AppStreamParser {
    fn name(&self) -> &'static str {
        "appstream"
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
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(text, options)?;
        let root = doc.root_element();

        let mut attributes = Attributes::new();

        if let Some(summary) = children(root, "summary").find(is_untranslated) {
            attributes.insert("summary".into(), Value::String(direct_text(summary)));
        }

        let paragraph = children(root, "description")
            .flat_map(|description| children(description, "p"))
            .find(is_untranslated);
        if let Some(paragraph) = paragraph {
            attributes.insert("description".into(), Value::String(direct_text(paragraph)));
        }

        let versions: Vec<&str> = children(root, "releases")
            .flat_map(|releases| children(releases, "release"))
            .filter_map(|release| release.attribute("version"))
            .collect();
        trace!(candidates = versions.len(), "Selecting AppStream release version");
        if let Some(version) = latest_stable(versions) {
            attributes.insert("version".into(), Value::String(version));
        }

        Ok(attributes)
    }
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| child.has_tag_name(tag))
}

fn is_untranslated(node: &Node<'_, '_>) -> bool {
    !node.attributes().any(|attr| attr.name() == "lang")
}

/// Text directly inside the element, trimmed; nested markup is ignored.
fn direct_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect::<String>()
        .trim()
        .to_string()
}
