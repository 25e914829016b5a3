use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pairsync")]
#[command(about = "Two-way directory synchronization with per-directory version history", long_about = None)]
#[command(version)]
#[command(after_help = "EXAMPLES:
    # Sync two directories (either may be missing, not both)
    pairsync ~/notes /mnt/usb/notes

    # Preview what would change
    pairsync ~/notes /mnt/usb/notes --dry-run

    # Machine-readable events
    pairsync ~/notes /mnt/usb/notes --json

    # Use a pair from the config file
    pairsync --profile notes

Each directory keeps its history in a hidden .sync file. Names starting
with '.' are never synced.")]
pub struct Cli {
    /// First replica
    pub left: Option<PathBuf>,

    /// Second replica
    pub right: Option<PathBuf>,

    /// Show what would change without touching either tree or its history
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Quiet mode (only show errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Emit newline-delimited JSON events instead of human output
    #[arg(long)]
    pub json: bool,

    /// Take the replica pair from a named config profile
    #[arg(long)]
    pub profile: Option<String>,

    /// List configured profiles and exit
    #[arg(long)]
    pub list_profiles: bool,

    /// Config file (default: <config dir>/pairsync/config.toml)
    #[arg(long, env = "PAIRSYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Fill unset options from the config file. Explicit arguments win.
    pub fn apply_config(&mut self, config: &Config) -> anyhow::Result<()> {
        if let Some(ref name) = self.profile {
            let profile = config
                .profile(name)
                .ok_or_else(|| anyhow::anyhow!("Profile '{}' not found", name))?;

            if self.left.is_none() {
                self.left = Some(profile.left.clone());
            }
            if self.right.is_none() {
                self.right = Some(profile.right.clone());
            }
            if !self.dry_run {
                self.dry_run = profile.dry_run.unwrap_or(false);
            }
        }

        let defaults = &config.defaults;
        if !self.quiet && self.verbose == 0 {
            self.quiet = defaults.quiet.unwrap_or(false);
        }
        if self.verbose == 0 && !self.quiet {
            self.verbose = defaults.verbose.unwrap_or(0);
        }
        if !self.json {
            self.json = defaults.json.unwrap_or(false);
        }

        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.list_profiles {
            return Ok(());
        }

        if self.left.is_none() || self.right.is_none() {
            anyhow::bail!("Usage: pairsync <directory1> <directory2> (or use --profile)");
        }

        Ok(())
    }

    /// Both replica paths; only meaningful after `validate`.
    pub fn replicas(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.left.as_ref().zip(self.right.as_ref())
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.quiet || self.json {
            return tracing::Level::ERROR;
        }

        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
