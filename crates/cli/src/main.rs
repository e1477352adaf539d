//! esolang-archive command-line tool.
//!
//! Archives the successful submissions of a contest round into a git
//! repository, one commit per submission, and offers subcommands to
//! inspect extension and identity resolution and to manage the
//! configuration file.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing::error;
use tracing_subscriber::EnvFilter;

use esolang_archive_core::archive::ArchiveReport;
use esolang_archive_core::config::ArchiveConfig;
use esolang_archive_core::engine::{ArchiveEngine, ArchivePlan};
use esolang_archive_core::language::ExtensionSource;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Archive esolang-battle submissions into a git repository.
#[derive(Parser, Debug)]
#[command(
    name = "esolang-archive",
    version,
    about = "Archive contest submissions into a git repository"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "./esolang-archive.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Commit every successful submission of a contest round.
    Archive {
        /// Contest name.
        #[arg(default_value = "esolang")]
        contest: String,

        /// Round identifier; becomes the directory name in the archive.
        #[arg(default_value = "01")]
        round: String,

        /// Print the planned commits without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the file extension each language slug resolves to.
    Extension {
        /// Language slugs to resolve.
        #[arg(required = true)]
        slugs: Vec<String>,
    },

    /// Show the commit identity of every registered handle.
    Identities,

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./esolang-archive.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "esolang-archive failed");
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_tracing("warn");
            cmd_init(&output)
        }
        Commands::Validate => {
            init_tracing("warn");
            cmd_validate(&cli.config)
        }
        command => {
            let config = load_config(&cli.config)?;
            init_tracing(&config.archive.log_level);
            let engine = ArchiveEngine::new(config);

            match command {
                Commands::Archive {
                    contest,
                    round,
                    dry_run,
                } => cmd_archive(&engine, &contest, &round, dry_run).await,
                Commands::Extension { slugs } => cmd_extension(&engine, &slugs).await,
                Commands::Identities => cmd_identities(&engine).await,
                Commands::Init { .. } | Commands::Validate => unreachable!(),
            }
        }
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<ArchiveConfig> {
    let mut config =
        ArchiveConfig::load_from_file(path).context("failed to load configuration file")?;
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_archive(engine: &ArchiveEngine, contest: &str, round: &str, dry_run: bool) -> Result<()> {
    let feed = engine
        .github_client()
        .context("failed to create GitHub client")?;
    let plan = engine
        .plan(contest, round, &feed)
        .await
        .with_context(|| format!("failed to plan archive of {} round {}", contest, round))?;

    if dry_run {
        print_plan(&plan, engine.config().archive.timezone_offset_minutes);
        return Ok(());
    }

    let report = engine
        .execute(&plan)
        .context("archive run failed")?;
    print_report(&report);
    Ok(())
}

/// Dates are shown in the offset the commits will carry.
fn print_plan(plan: &ArchivePlan, offset_minutes: i32) {
    let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    println!();
    println!(
        "{}",
        style::header(&format!(
            "Planned commits for {} round {} (dry run)",
            plan.contest, plan.round
        ))
    );
    println!();

    if plan.entries.is_empty() {
        println!("{}", style::warn("No successful submissions to archive."));
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Submission", "Path", "Author", "Date", "Message"]);

    for (i, entry) in plan.entries.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&entry.submission_id),
            Cell::new(entry.path.display()),
            Cell::new(&entry.author),
            Cell::new(
                entry
                    .created_at
                    .with_timezone(&offset)
                    .format("%Y-%m-%d %H:%M:%S %:z"),
            ),
            Cell::new(&entry.message),
        ]);
    }

    println!("{}", table);
    println!();
    println!("{}", style::dim(&format!("{} commit(s) planned", plan.entries.len())));
}

fn print_report(report: &ArchiveReport) {
    println!();
    if report.commits.is_empty() {
        println!(
            "{}",
            style::warn(&format!("Round {}: nothing to commit.", report.round))
        );
        return;
    }

    for commit in &report.commits {
        println!(
            "  {} {} {}",
            style::sha(&commit.sha),
            commit.path.display(),
            style::dim(&commit.submission_id)
        );
    }
    println!();
    println!(
        "{}",
        style::success(&format!(
            "Archived {} submission(s) for round {}",
            report.commits.len(),
            report.round
        ))
    );
}

async fn cmd_extension(engine: &ArchiveEngine, slugs: &[String]) -> Result<()> {
    let resolver = engine
        .load_extensions()
        .await
        .context("failed to load language tables")?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Slug", "Extension", "Source"]);

    for slug in slugs {
        let resolved = resolver.resolve_detailed(slug);
        let source = match &resolved.source {
            ExtensionSource::Override => Cell::new("override").fg(comfy_table::Color::Green),
            ExtensionSource::Registry { language } if resolved.effective_slug != *slug => {
                Cell::new(format!("registry: {} (via {})", language, resolved.effective_slug))
            }
            ExtensionSource::Registry { language } => Cell::new(format!("registry: {}", language)),
            ExtensionSource::Fallback => Cell::new("fallback").fg(comfy_table::Color::Yellow),
        };
        table.add_row(vec![Cell::new(slug), Cell::new(&resolved.extension), source]);
    }

    println!("{}", table);
    Ok(())
}

async fn cmd_identities(engine: &ArchiveEngine) -> Result<()> {
    let feed = engine
        .github_client()
        .context("failed to create GitHub client")?;
    let identities = engine
        .resolve_identities(&feed)
        .await
        .context("failed to resolve identities")?;

    if identities.is_empty() {
        println!("No handles registered.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Handle", "Name", "Email"]);
    for (handle, identity) in identities.iter() {
        table.add_row(vec![handle, identity.name.as_str(), identity.email.as_str()]);
    }

    println!("{}", table);
    println!();
    println!("{}", style::dim(&format!("{} handle(s)", identities.len())));
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, ArchiveConfig::default_template())
        .context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Point [datastore] path at the contest snapshot");
    println!("  2. Create users.yml and languages.yml next to the config");
    println!(
        "  3. Validate with: esolang-archive validate --config {}",
        output.display()
    );
    println!(
        "  4. Archive a round: esolang-archive --config {} archive esolang 01",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        ArchiveConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  {}", style::success("TOML structure is valid"));

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  {}", style::success("Environment variable references processed"));

    if let Err(e) = config.validate() {
        println!("  {}", style::error(&format!("Validation error: {}", e)));
        anyhow::bail!("configuration validation failed");
    }
    println!("  {}", style::success("All required fields are valid"));

    let mut missing = Vec::new();
    for path in [
        &config.identity.users_file,
        &config.languages.overrides_file,
        &config.datastore.path,
    ] {
        if !path.exists() {
            missing.push(path.clone());
        }
    }
    if let Some(path) = &config.languages.registry_file {
        if !path.exists() {
            missing.push(path.clone());
        }
    }
    for path in &missing {
        println!("  {}", style::warn(&format!("File not found: {}", path.display())));
    }

    println!();
    println!("{}", style::header("Configuration summary:"));
    println!("  Archive root   : {}", config.archive.root.display());
    println!("  Commit message : {}", config.archive.commit_message);
    println!("  Timezone offset: {} min", config.archive.timezone_offset_minutes);
    println!("  Users file     : {}", config.identity.users_file.display());
    println!("  Identity source: {:?}", config.identity.strategy);
    println!("  Overrides file : {}", config.languages.overrides_file.display());
    println!(
        "  Registry       : {}",
        match &config.languages.registry_file {
            Some(path) => path.display().to_string(),
            None => config.languages.registry_url.clone(),
        }
    );
    println!("  Datastore      : {}", config.datastore.path.display());
    println!(
        "  GitHub token   : {}",
        if config.github.token.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!();
    println!("Configuration is valid.");

    Ok(())
}
