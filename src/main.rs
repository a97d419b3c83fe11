//! `dep-inventory`: collect the third-party dependencies of several
//! applications and report each one's name, version and description.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and load config ([`config::load_config`]).
//! 2. Read every application's manifest ([`manifest`]), in order.
//! 3. Resolve newly seen dependencies from their installed `package.json`,
//!    installing first when needed ([`resolver`], [`installer`]).
//! 4. Merge into one first-seen-wins report ([`aggregator`]).
//! 5. Write the HTML report and optionally print it ([`report`]).
//! 6. Exit `0`, or `1` on any fatal error or skipped application.

mod aggregator;
mod cli;
mod config;
mod error;
mod installer;
mod logging;
mod manifest;
mod models;
mod report;
mod resolver;
#[cfg(test)]
mod testutil;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use aggregator::Aggregator;
use cli::{Cli, ReportFormat};
use config::load_config;
use installer::CommandInstaller;
use models::Aggregation;
use report::html::HtmlOptions;
use resolver::MetadataResolver;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(logging::default_filter(cli.verbose, cli.quiet));

    let cwd = std::env::current_dir().context("Cannot determine working directory")?;
    let mut config = load_config(&cwd, cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let progress = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        pb
    };

    let resolver = MetadataResolver::new(
        CommandInstaller::from_config(&config.install),
        config.install.materialization_dir.clone(),
    );
    let aggregation = Aggregator::new(resolver, config.namespace_policy())
        .with_concurrency(config.resolve.concurrency)
        .keep_going(config.resolve.keep_going)
        .with_progress(progress)
        .aggregate(&config.applications)
        .await?;

    let html = report::html::render(
        &aggregation.report,
        HtmlOptions {
            show_conflicts: cli.conflicts,
        },
    )
    .context("Failed to render HTML report")?;
    report::write_report(&config.output, &html)?;

    match cli.report {
        ReportFormat::Html => {
            if aggregation.report.is_empty() {
                eprintln!("  {} no third-party dependencies found", "!".yellow());
            } else if !cli.quiet {
                eprintln!(
                    "  {} {} dependencies written to {}",
                    "→".cyan(),
                    aggregation.report.len(),
                    config.output.display()
                );
            }
        }
        ReportFormat::Terminal => {
            report::terminal::render(&aggregation, cli.conflicts, cli.quiet);
        }
        ReportFormat::Json => {
            let entries: Vec<_> = aggregation.report.entries().collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    if !aggregation.is_complete() {
        print_skipped(&aggregation);
        std::process::exit(1);
    }

    Ok(())
}

fn print_skipped(aggregation: &Aggregation) {
    eprintln!(
        "\n {} {} application(s) skipped:",
        "[ERROR]".red().bold(),
        aggregation.skipped.len()
    );
    for skipped in &aggregation.skipped {
        eprintln!(
            "  {} {} ({}): {}",
            "✗".red(),
            skipped.application.display(),
            skipped.error.kind(),
            skipped.error
        );
        if !skipped.unresolved.is_empty() {
            eprintln!("      unresolved: {}", skipped.unresolved.join(", "));
        }
    }
}
