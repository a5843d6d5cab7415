//! `vendor-license-check` — make sure every vendored dependency carries a
//! license file, classify those files, and enforce an allow-list.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and install logging ([`logging`]).
//! 2. Load the allow-list ([`config::load_allow_list`]).
//! 3. Resolve every `<host>/<repo>` under the vendor root ([`resolver`]).
//! 4. Classify the candidate license files on a bounded pool ([`backend`], [`license`]).
//! 5. Bucket dependencies by license, write the JSON report, check policy ([`audit`]).
//! 6. Render the requested report ([`report`]).
//! 7. Exit `0` (clean) or `1` (timeout, error, or forbidden license).

mod audit;
mod backend;
mod cli;
mod comments;
mod config;
mod error;
mod license;
mod logging;
mod models;
mod report;
mod resolver;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use audit::{AuditOptions, AuditOutcome, Auditor};
use backend::BackendOptions;
use cli::{Cli, ReportFormat};
use config::load_allow_list;
use error::ScanError;
use license::oracle::PhraseOracle;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let outcome = match run(&cli).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let timed_out = err
                .downcast_ref::<ScanError>()
                .is_some_and(ScanError::is_timeout);
            if timed_out {
                eprintln!("{}", "Timeout while processing the licenses!".red().bold());
            } else {
                eprintln!("{} {:#}", "Error:".red().bold(), err);
            }
            std::process::exit(1);
        }
    };

    if let Err(err) = render(&cli, &outcome) {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }

    if !outcome.passed() {
        for violation in &outcome.violations {
            eprintln!("{} {}", "✗".red(), violation);
        }
        std::process::exit(1);
    }

    if !cli.quiet {
        println!("{}", "Dependencies license check passed! Good job!".green());
    }
}

async fn run(cli: &Cli) -> Result<AuditOutcome> {
    let allow_list = load_allow_list(&cli.path, cli.allow_list.as_deref())?;

    let oracle = PhraseOracle::new().context("failed to build the license oracle")?;

    let progress = if !cli.quiet {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let options = AuditOptions {
        license_files: cli.files.clone(),
        backend: BackendOptions {
            jobs: cli.jobs,
            comments_only: !cli.whole_file,
            progress: progress.clone(),
        },
        allow_list,
        tie_break: cli.tie_break.into(),
        on_unreadable: cli.unreadable_policy(),
        deadline: Some(cli.timeout),
    };

    let auditor = Auditor::new(Arc::new(oracle), options);
    let outcome = auditor.process(&cli.path, cli.output.as_deref()).await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    Ok(outcome?)
}

fn render(cli: &Cli, outcome: &AuditOutcome) -> Result<()> {
    match cli.report {
        ReportFormat::Terminal => {
            report::terminal::render(outcome, &cli.path, cli.verbose, cli.quiet);
        }
        ReportFormat::Json => {
            println!("{}", report::json::to_string(&outcome.report)?);
        }
    }
    Ok(())
}
