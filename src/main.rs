mod bisync;
mod cli;
mod config;
mod error;
mod integrity;
mod sync;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use colored::Colorize;
use config::Config;
use error::format_bytes;
use sync::SyncEngine;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // Parse CLI arguments
    let mut cli = Cli::parse();

    // Load config file
    let config = Config::load(cli.config.as_deref())?;

    if cli.list_profiles {
        let profiles = config.list_profiles();
        if profiles.is_empty() {
            println!("No profiles configured");
            if let Some(path) = Config::default_path() {
                println!("\nCreate profiles in: {}", path.display());
            }
        } else {
            println!("Available profiles:");
            for name in profiles {
                println!("  {}", name);
            }
        }
        return Ok(());
    }

    // Merge profile and defaults (CLI args take precedence)
    cli.apply_config(&config)?;

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().as_str()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    // Validate arguments
    cli.validate()?;
    let (left, right) = cli
        .replicas()
        .ok_or_else(|| anyhow::anyhow!("Both replica paths are required"))?;

    if !cli.quiet && !cli.json {
        println!("pairsync v{}", env!("CARGO_PKG_VERSION"));
        println!("Syncing {} ⇄ {}", left.display(), right.display());

        if cli.dry_run {
            println!("Mode: Dry-run (no changes will be made)\n");
        }
    }

    let engine = SyncEngine::new(cli.dry_run, cli.quiet || cli.json, cli.json);
    let stats = engine.sync(left, right)?;

    // Print summary (skip if JSON mode - already emitted JSON summary)
    if !cli.quiet && !cli.json {
        if cli.dry_run {
            println!("\n{}\n", "✓ Dry-run complete (no changes made)".green().bold());
        } else {
            println!("\n{}\n", "✓ Sync complete".green().bold());
        }

        let verb = |done: &'static str, would: &'static str| if cli.dry_run { would } else { done };

        println!("  Directories:       {}", stats.directories_visited.to_string().blue());
        print_count(verb("Dirs created:", "Would create:"), stats.directories_created, |s| s.green());
        print_count(verb("Files copied:", "Would copy:"), stats.files_copied, |s| s.green());
        print_count(verb("Files deleted:", "Would delete:"), stats.files_deleted, |s| s.red());
        print_count("Resurrected:", stats.files_resurrected, |s| s.yellow());
        print_count("Conflicts:", stats.conflicts_resolved, |s| s.yellow());
        if stats.clashes_skipped > 0 {
            print_count("Clashes skipped:", stats.clashes_skipped, |s| s.red());
        }

        println!();
        println!("  Bytes copied:      {}", format_bytes(stats.bytes_copied).cyan());
        println!("  Duration:          {}", format_duration(stats.duration).cyan());
    }

    Ok(())
}

fn print_count(label: &str, count: usize, paint: impl Fn(String) -> colored::ColoredString) {
    let value = if count > 0 {
        paint(count.to_string())
    } else {
        count.to_string().bright_black()
    };
    println!("  {:<19}{}", label, value);
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        if mins >= 60 {
            let hours = mins / 60;
            let mins = mins % 60;
            format!("{}h {}m {}s", hours, mins, secs)
        } else {
            format!("{}m {}s", mins, secs)
        }
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}
