pub mod commands;
pub mod config;
pub mod rule_args;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

pub use rule_args::{parse_amount, RuleArgs};

/// Recurra: recurring bills and income, tracked by date.
#[derive(Debug, Parser)]
#[command(name = "recurra", version, about)]
pub struct Cli {
    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Define a new recurring template.
    Add {
        #[arg(long)]
        name: String,
        /// Amount in major units, e.g. "1200" or "19.99".
        #[arg(long, value_parser = parse_amount, allow_hyphen_values = true)]
        amount: i64,
        /// Record as income instead of an expense.
        #[arg(long)]
        income: bool,
        /// First date the template may fall on (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,
        #[command(flatten)]
        rule: RuleArgs,
    },
    /// List templates.
    List {
        /// Include deleted templates.
        #[arg(long)]
        all: bool,
    },
    /// Show one template.
    Show { id: String },
    /// Everything due as of today, with catch-up counts.
    Due {
        /// Override "today" (YYYY-MM-DD).
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Next pending dates of a template.
    Upcoming {
        id: String,
        /// How many dates to show.
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
    },
    /// Post the current occurrence of a template.
    Post {
        id: String,
        /// Date it actually happened (defaults to the due date).
        #[arg(long)]
        on: Option<NaiveDate>,
        /// Fail unless the template is still due on this date.
        #[arg(long)]
        expect: Option<NaiveDate>,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Skip the current occurrence of a template.
    Skip {
        id: String,
        #[arg(long)]
        expect: Option<NaiveDate>,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Pause a template; it stops showing as due.
    Pause { id: String },
    /// Resume a paused template.
    Resume { id: String },
    /// Delete a template. Posted records are kept.
    Delete { id: String },
    /// Records posted against a template.
    Records { id: String },
    /// Preview the dates a rule would produce, without saving anything.
    Preview {
        #[command(flatten)]
        rule: RuleArgs,
        #[arg(long)]
        from: NaiveDate,
        /// How many dates to show.
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
    },
    /// List the named presets.
    Presets,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `RC_CONFIG` (or `recurra.toml`
/// by default).  A missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(rc_domain::config::Config, String)> {
    let config_path = std::env::var("RC_CONFIG").unwrap_or_else(|_| "recurra.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        rc_domain::config::Config::default()
    };

    Ok((config, config_path))
}
