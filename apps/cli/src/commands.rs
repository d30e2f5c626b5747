//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use quire_content::ContentStore;
use quire_core::{
    EnrichOptions, EnrichSummary, ImportOptions, ImportSummary, ReviewOptions, ReviewSummary,
    ReviewTarget, RunProgress, run_enrichment, run_import, run_review,
};
use quire_providers::ProviderChain;
use quire_shared::{
    AppConfig, CONFIG_FILE_NAME, ensure_any_provider, init_config, load_config,
    resolve_credentials_from_env,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Quire: LLM enrichment and editorial review for markdown articles.
#[derive(Parser)]
#[command(
    name = "quire",
    version,
    about = "Enrich markdown articles with structured metadata and review drafts with an LLM.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to quire.toml (defaults to ./quire.toml, then the user config dir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Content directory, overriding `[content] dir`.
    #[arg(long, global = true)]
    pub content_dir: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Add summary, highlights, topic, and related concepts to articles.
    Enrich {
        /// Call providers and log results without writing files.
        #[arg(long)]
        dry_run: bool,

        /// Re-enrich articles that already have `enriched_at`.
        #[arg(long)]
        force: bool,

        /// Only this article (slug, file name, or path).
        #[arg(long)]
        file: Option<String>,
    },

    /// Insert paragraph-level review comments into drafts.
    Review {
        /// Review one article (slug, file name, or path).
        #[arg(long, conflicts_with = "all_drafts")]
        file: Option<String>,

        /// Review every draft in the content directory.
        #[arg(long)]
        all_drafts: bool,

        /// Comment on paragraphs that already carry a comment.
        #[arg(long)]
        force: bool,

        /// Match and log comments without writing files.
        #[arg(long)]
        dry_run: bool,

        /// Print the full prompt sent for each article.
        #[arg(long)]
        show_prompt: bool,
    },

    /// Import brainstorm notes as hidden articles.
    Import {
        /// Source directory, overriding `[import] source_dir`.
        #[arg(long)]
        source: Option<PathBuf>,

        /// Only this file name inside the source directory.
        #[arg(long)]
        file: Option<String>,

        /// Report what would be imported without writing.
        #[arg(long)]
        dry_run: bool,

        /// Overwrite articles that already exist.
        #[arg(long)]
        force: bool,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default quire.toml.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "quire=info",
        1 => "quire=debug",
        _ => "quire=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    let content_dir = cli.content_dir.clone();
    match cli.command {
        Command::Enrich {
            dry_run,
            force,
            file,
        } => {
            let config = load_config(config_path)?;
            let store = content_store(&config, content_dir);
            cmd_enrich(&config, &store, dry_run, force, file).await
        }
        Command::Review {
            file,
            all_drafts,
            force,
            dry_run,
            show_prompt,
        } => {
            let target = match (file, all_drafts) {
                (Some(file), _) => ReviewTarget::File(file),
                (None, true) => ReviewTarget::AllDrafts,
                (None, false) => {
                    print_review_usage();
                    return Ok(());
                }
            };
            let config = load_config(config_path)?;
            let store = content_store(&config, content_dir);
            let mut options = ReviewOptions::from_settings(&config.review, target);
            options.force = force;
            options.dry_run = dry_run;
            options.show_prompt = show_prompt;
            cmd_review(&config, &store, &options).await
        }
        Command::Import {
            source,
            file,
            dry_run,
            force,
        } => {
            let config = load_config(config_path)?;
            let store = content_store(&config, content_dir);
            cmd_import(&config, &store, source, file, dry_run, force)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn content_store(config: &AppConfig, override_dir: Option<PathBuf>) -> ContentStore {
    ContentStore::new(override_dir.unwrap_or_else(|| config.content.dir.clone()))
}

/// Build the provider chain, failing if no provider has a usable key.
fn provider_chain(config: &AppConfig) -> Result<ProviderChain> {
    let credentials = resolve_credentials_from_env(config);
    ensure_any_provider(&credentials)?;
    let chain = ProviderChain::from_credentials(&credentials)?;
    info!(providers = ?chain.names(), "provider chain ready");
    Ok(chain)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_enrich(
    config: &AppConfig,
    store: &ContentStore,
    dry_run: bool,
    force: bool,
    file: Option<String>,
) -> Result<()> {
    let chain = provider_chain(config)?;

    let mut options = EnrichOptions::from_settings(&config.enrich);
    options.dry_run = dry_run;
    options.force = force;
    options.target = file;

    info!(content = %store.root().display(), dry_run, force, "starting enrichment");

    let progress = CliProgress::new();
    let summary = run_enrichment(store, &chain, &options, &progress).await?;
    print_enrich_summary(&summary);
    Ok(())
}

async fn cmd_review(config: &AppConfig, store: &ContentStore, options: &ReviewOptions) -> Result<()> {
    let chain = provider_chain(config)?;

    info!(content = %store.root().display(), dry_run = options.dry_run, "starting review");

    let progress = CliProgress::new();
    let summary = run_review(store, &chain, options, &progress).await?;
    print_review_summary(&summary);
    Ok(())
}

fn cmd_import(
    config: &AppConfig,
    store: &ContentStore,
    source: Option<PathBuf>,
    file: Option<String>,
    dry_run: bool,
    force: bool,
) -> Result<()> {
    let source_dir = source
        .or_else(|| config.import.source_dir.clone())
        .ok_or_else(|| eyre!("no brainstorm source: pass --source or set [import] source_dir"))?;

    let mut options = ImportOptions::new(source_dir);
    options.file = file;
    options.dry_run = dry_run;
    options.force = force;

    let summary = run_import(store, &options)?;
    print_import_summary(&summary);
    Ok(())
}

fn cmd_config_init(explicit: Option<&Path>) -> Result<()> {
    let path = explicit.map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), Path::to_path_buf);
    init_config(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(explicit: Option<&Path>) -> Result<()> {
    let config = load_config(explicit)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn dry_run_banner(dry_run: bool) {
    if dry_run {
        println!("  (dry run: no files were written)");
    }
}

fn print_enrich_summary(summary: &EnrichSummary) {
    println!();
    println!("  Enrichment complete");
    println!("  Total:    {}", summary.total);
    println!("  Enriched: {}", summary.enriched);
    println!("  Skipped:  {}", summary.skipped);
    println!("  Failed:   {}", summary.failed);
    for (provider, count) in &summary.by_provider {
        println!("    via {provider}: {count}");
    }
    dry_run_banner(summary.dry_run);
    println!();
}

fn print_review_summary(summary: &ReviewSummary) {
    println!();
    println!("  Review complete");
    println!("  Reviewed:       {}", summary.reviewed);
    println!("  Comments added: {}", summary.comments_added);
    println!("  Skipped:        {}", summary.skipped);
    println!("  Failed:         {}", summary.failed);
    if summary.unmatched > 0 || summary.already_commented > 0 {
        println!(
            "  Dropped:        {} unmatched, {} already commented",
            summary.unmatched, summary.already_commented
        );
    }
    dry_run_banner(summary.dry_run);
    println!();
}

fn print_import_summary(summary: &ImportSummary) {
    println!();
    println!("  Import complete");
    println!("  Imported: {}", summary.imported);
    println!("  Updated:  {}", summary.updated);
    println!("  Skipped:  {}", summary.skipped);
    println!("  Errors:   {}", summary.errors);
    dry_run_banner(summary.dry_run);
    println!();
}

fn print_review_usage() {
    println!("Usage:");
    println!("  quire review --file <slug>     Review one draft");
    println!("  quire review --all-drafts      Review every draft");
    println!();
    println!("Options: --force, --dry-run, --show-prompt");
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl RunProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, current: usize, total: usize, slug: &str) {
        self.spinner.set_message(format!("[{current}/{total}] {slug}"));
    }

    fn prompt(&self, slug: &str, prompt: &str) {
        self.spinner.suspend(|| {
            println!("--- prompt for {slug} ---");
            println!("{prompt}");
            println!("--- end prompt ---");
        });
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}
