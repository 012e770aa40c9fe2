//! Recipe templates rendered with `upon`.
//!
//! Both templates are compiled into one engine under their file names, so
//! either may `{% include "recipe-include.tmpl" %}` the other. The template
//! context is the serialized [`RecipeSource`].

use std::fs;
use std::path::Path;

use upon::Engine;

use crate::error::RecipeError;
use crate::types::RecipeSource;

pub const MAIN_TEMPLATE: &str = "recipe-main.tmpl";
pub const INCLUDE_TEMPLATE: &str = "recipe-include.tmpl";

/// Rendered contents of the `.bb` and `.inc` files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRecipe {
    pub recipe: String,
    pub include: String,
}

pub struct RecipeRenderer {
    engine: Engine<'static>,
}

impl RecipeRenderer {
    /// Read and compile both templates from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, RecipeError> {
        let main = read_template(&dir.join(MAIN_TEMPLATE))?;
        let include = read_template(&dir.join(INCLUDE_TEMPLATE))?;
        Self::from_sources(main, include)
    }

    pub fn from_sources(
        main: impl Into<String>,
        include: impl Into<String>,
    ) -> Result<Self, RecipeError> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);

        for (name, source) in [(MAIN_TEMPLATE, main.into()), (INCLUDE_TEMPLATE, include.into())] {
            engine
                .add_template(name, source)
                .map_err(|source| RecipeError::TemplateCompile {
                    name: name.to_string(),
                    source,
                })?;
        }

        Ok(Self { engine })
    }

    /// Render both files into memory.
    pub fn render(&self, recipe: &RecipeSource) -> Result<RenderedRecipe, RecipeError> {
        Ok(RenderedRecipe {
            recipe: self.render_one(MAIN_TEMPLATE, recipe)?,
            include: self.render_one(INCLUDE_TEMPLATE, recipe)?,
        })
    }

    fn render_one(&self, name: &str, recipe: &RecipeSource) -> Result<String, RecipeError> {
        self.engine
            .template(name)
            .render(recipe)
            .to_string()
            .map_err(|source| RecipeError::Render {
                name: name.to_string(),
                source,
            })
    }
}

fn read_template(path: &Path) -> Result<String, RecipeError> {
    fs::read_to_string(path).map_err(|source| RecipeError::TemplateRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Template helpers for BitBake output.
mod addons {
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Formatter for double-quoted BitBake values: collapses whitespace and
    /// escapes backslashes and quotes.
    fn bitbake_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
                write!(f, "{}", collapsed.replace('\\', "\\\\").replace('"', "\\\""))?
            }
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    /// Join a list with `separator`; a missing value joins to nothing.
    fn join(list: &Value, separator: &str) -> String {
        match list {
            Value::List(items) => items.iter().map(scalar).collect::<Vec<_>>().join(separator),
            other => scalar(other),
        }
    }

    fn scalar(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::None | Value::List(_) | Value::Map(_) => String::new(),
        }
    }

    /// Registers the `bitbake` formatter and `join` function.
    pub(super) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("bitbake", bitbake_formatter);
        engine.add_function("join", join);
    }
}
