use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "dep-inventory",
    about = "Inventory third-party dependencies of several applications into one HTML report",
    version
)]
pub struct Cli {
    /// Application roots, each containing a package.json (default: `applications` from config)
    #[arg(value_name = "APP")]
    pub apps: Vec<PathBuf>,

    /// Config file [default: ./.dep-inventory/config.toml, fallback ~/.config/dep-inventory/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTML report path [default: dependencies.html]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "html", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Identifier prefix treated as internal and left out of the report (repeatable)
    #[arg(long = "internal-prefix", value_name = "PREFIX")]
    pub internal_prefix: Vec<String>,

    /// Maximum concurrent metadata resolutions per application
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Skip applications that fail instead of aborting; exits 1 if any were skipped
    #[arg(long)]
    pub keep_going: bool,

    /// Also list dependencies declared with different versions
    #[arg(long)]
    pub conflicts: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum ReportFormat {
    Html,
    Terminal,
    Json,
}

impl Cli {
    /// Layer command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if !self.apps.is_empty() {
            config.applications = self.apps.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if !self.internal_prefix.is_empty() {
            config.namespace.internal_prefixes = self.internal_prefix.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.resolve.concurrency = concurrency;
        }
        if self.keep_going {
            config.resolve.keep_going = true;
        }
    }
}
