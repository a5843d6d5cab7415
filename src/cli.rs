use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::audit::UnreadablePolicy;
use crate::backend::DEFAULT_JOBS;
use crate::models::TieBreak;

#[derive(Parser, Debug)]
#[command(
    name = "vendor-license-check",
    about = "Check that every vendored dependency carries an allowed license",
    version
)]
pub struct Cli {
    /// Vendor directory laid out as <host>/<repo>
    #[arg(long, default_value = "./vendor/")]
    pub path: PathBuf,

    /// Write the JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// License file names, matched case-insensitively, in priority order
    #[arg(
        long,
        value_name = "LIST",
        value_delimiter = ',',
        default_value = "LICENSE,LICENSE.TXT,LICENSE.MD,COPYING"
    )]
    pub files: Vec<String>,

    /// Deadline for the whole run, e.g. 90s, 5m, 1h
    #[arg(long, value_name = "DURATION", default_value = "5m", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Allow-list file [default: <vendor parent>/.license, fallback ~/.config/vendor-license-check/allowed]
    #[arg(long, value_name = "FILE")]
    pub allow_list: Option<PathBuf>,

    /// Maximum number of files classified at once
    #[arg(long, value_name = "N", default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    /// Classify whole files, even source files with recognizable comments
    #[arg(long)]
    pub whole_file: bool,

    /// Which license wins when a file matches several
    #[arg(long, value_name = "RULE", default_value = "highest-confidence")]
    pub tie_break: TieBreakArg,

    /// Skip repos that cannot be listed instead of failing
    #[arg(long)]
    pub keep_going: bool,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Debug logging and the full license table
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn unreadable_policy(&self) -> UnreadablePolicy {
        if self.keep_going {
            UnreadablePolicy::SkipRepo
        } else {
            UnreadablePolicy::Abort
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum TieBreakArg {
    Last,
    HighestConfidence,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::Last => TieBreak::Last,
            TieBreakArg::HighestConfidence => TieBreak::HighestConfidence,
        }
    }
}

/// Parse `250ms`, `30s`, `5m` or `1h`. A bare number is seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration `{raw}`"))?;

    let scaled = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration `{raw}` is too large"))
    };
    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => scaled(1),
        "m" => scaled(60),
        "h" => scaled(60 * 60),
        other => Err(format!("unknown duration unit `{other}` (use ms, s, m or h)")),
    }
}
