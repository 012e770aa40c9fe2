//! bbforge - BitBake recipe generator
//!
//! Usage:
//!   bbforge cache update                        # Refresh upstream metadata
//!   bbforge source search <keyword>             # Search known projects
//!   bbforge recipe show <backend> <identifier>  # Show the enriched descriptor
//!   bbforge recipe create <backend> <identifier>

mod interactive;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bbforge_core::prelude::*;

use crate::interactive::DialoguerPrompt;

#[derive(Parser)]
#[command(name = "bbforge")]
#[command(about = "Generate BitBake recipes from upstream project metadata", long_about = None)]
struct Cli {
    /// Path to bbforge.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Never prompt; missing values stay empty
    #[arg(long, global = true)]
    no_input: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage cached upstream metadata
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Query upstream projects
    #[command(subcommand)]
    Source(SourceCommand),

    /// Inspect or generate recipes
    #[command(subcommand)]
    Recipe(RecipeCommand),
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Refresh every backend from upstream and rewrite the cache
    Update,
}

#[derive(Subcommand)]
enum SourceCommand {
    /// Search project names and descriptions
    Search {
        keyword: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum RecipeCommand {
    /// Write `<identifier>_<version>.bb` and `<identifier>.inc` into a layer
    Create {
        backend: String,
        identifier: String,

        /// Layer directory to write into (overrides `recipes.layer_directory`)
        #[arg(long)]
        layer: Option<PathBuf>,
    },

    /// Show the enriched descriptor without writing anything
    Show {
        backend: String,
        identifier: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "bbforge=debug,info"
    } else {
        "bbforge=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
            if e.downcast_ref::<FatalError>().is_some() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = ConfigStore::discover(cli.config.as_deref())?;
    let config = store.load()?;

    let prompt: Arc<dyn Prompt> = if cli.no_input {
        Arc::new(NonInteractive)
    } else {
        Arc::new(DialoguerPrompt::new())
    };
    let context = AppContext::new(config, prompt)?;

    match cli.command {
        Commands::Cache(CacheCommand::Update) => run_cache_update(&context),
        Commands::Source(SourceCommand::Search { keyword, format }) => {
            run_search(&context, &keyword, format)
        }
        Commands::Recipe(RecipeCommand::Create {
            backend,
            identifier,
            layer,
        }) => run_create(&context, &backend, &identifier, layer),
        Commands::Recipe(RecipeCommand::Show {
            backend,
            identifier,
            format,
        }) => run_show(&context, &backend, &identifier, format),
    }
}

fn run_cache_update(context: &AppContext) -> Result<()> {
    #[cfg(unix)]
    spawn_interrupt_listener(context.cancellation().clone())?;

    let mut registry = context.backend_registry()?;
    registry.load_cache()?;
    let report = registry.load_source()?;

    if context.cancellation().is_cancelled() {
        anyhow::bail!("Cache update interrupted");
    }
    if !report.all_succeeded() {
        anyhow::bail!("Cache update failed for: {}", report.failed.join(", "));
    }
    println!("{} Cache updated for: {}", style("✓").green(), report.succeeded.join(", "));
    Ok(())
}

/// First SIGINT cancels in-flight work; a second one exits immediately.
#[cfg(unix)]
fn spawn_interrupt_listener(cancel: CancellationToken) -> Result<()> {
    use signal_hook::consts::SIGINT;
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT]).context("Failed to register SIGINT handler")?;
    std::thread::spawn(move || {
        for _ in signals.forever() {
            if cancel.is_cancelled() {
                std::process::exit(130);
            }
            tracing::warn!("Interrupted; finishing current step (press Ctrl-C again to abort)");
            cancel.cancel();
        }
    });
    Ok(())
}

fn loaded_registry(context: &AppContext) -> Result<BackendRegistry> {
    let mut registry = context.backend_registry()?;
    registry.load_cache()?;
    Ok(registry)
}

fn run_search(context: &AppContext, keyword: &str, format: OutputFormat) -> Result<()> {
    let registry = loaded_registry(context)?;
    let results = registry.search_source(keyword);

    match format {
        OutputFormat::Table => print_search_table(&results),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
    }
    Ok(())
}

fn print_search_table(results: &[RecipeSource]) {
    if results.is_empty() {
        println!("No matching projects.");
        println!("If the cache is empty, run: bbforge cache update");
        return;
    }

    println!("{:<28} {:<48} {:<12} Url", "Name", "Description", "Backend");
    println!("{}", "-".repeat(110));

    for source in results {
        println!(
            "{:<28} {:<48} {:<12} {}",
            truncate(&source.name, 28),
            truncate(&source.description, 48),
            source.backend,
            source.url
        );
    }
}

fn truncate(text: &str, width: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= width {
        single_line
    } else {
        let cut: String = single_line.chars().take(width.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

fn run_create(
    context: &AppContext,
    backend: &str,
    identifier: &str,
    layer: Option<PathBuf>,
) -> Result<()> {
    let registry = loaded_registry(context)?;
    let mut synthesizer = context.recipe_synthesizer(&registry);
    if let Some(layer) = layer {
        synthesizer = synthesizer.with_layer_directory(layer);
    }

    let created = synthesizer
        .create_recipe(backend, identifier)
        .with_context(|| format!("Failed to create recipe '{identifier}'"))?;

    println!(
        "{} Created recipe '{}' {}",
        style("✓").green(),
        created.recipe.identifier,
        created.recipe.version.as_deref().unwrap_or_default()
    );
    println!("  {}", created.recipe_path.display());
    println!("  {}", created.include_path.display());
    Ok(())
}

fn run_show(
    context: &AppContext,
    backend: &str,
    identifier: &str,
    format: OutputFormat,
) -> Result<()> {
    let registry = loaded_registry(context)?;
    let recipe = registry.get_recipe(backend, identifier)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&recipe)?),
        OutputFormat::Table => print_recipe(&recipe),
    }
    Ok(())
}

fn print_recipe(recipe: &RecipeSource) {
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    let list = |values: &[String]| {
        if values.is_empty() {
            "-".to_string()
        } else {
            values.join(" ")
        }
    };

    println!("Name:        {}", recipe.name);
    println!("Identifier:  {}", recipe.identifier);
    println!("Backend:     {}", recipe.backend);
    println!("Version:     {}", optional(&recipe.version));
    println!("Section:     {}", recipe.section);
    println!("Url:         {}", recipe.url);
    println!("Summary:     {}", optional(&recipe.summary));
    println!("Description: {}", recipe.description);
    println!("Licenses:    {}", list(&recipe.licenses));
    println!("Inherits:    {}", list(&recipe.inherits));
    println!("Depends:     {}", list(&recipe.depends));
    println!("Source:      {}", optional(&recipe.src_uri));
    println!("SHA-256:     {}", optional(&recipe.src_sha256));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_recipe_create() {
        let cli = Cli::try_parse_from([
            "bbforge", "--no-input", "recipe", "create", "kde-invent", "kcoreaddons", "--layer", "meta-kf5",
        ])
        .unwrap();
        assert!(cli.no_input);
        match cli.command {
            Commands::Recipe(RecipeCommand::Create { backend, identifier, layer }) => {
                assert_eq!(backend, "kde-invent");
                assert_eq!(identifier, "kcoreaddons");
                assert_eq!(layer, Some(PathBuf::from("meta-kf5")));
            }
            _ => panic!("expected recipe create"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bbforge", "source", "search", "kio", "-v", "--format", "json"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Source(SourceCommand::Search { format: OutputFormat::Json, .. })
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("multi\nline  text", 20), "multi line text");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
