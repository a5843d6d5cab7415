use std::collections::BTreeSet;
use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::audit::AuditOutcome;
use crate::license::risk::classify;
use crate::models::{LicenseRisk, UNKNOWN};

/// Dependencies listed per row unless `--verbose` is given.
const MAX_LISTED: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Pass,
    Warn,
    Error,
}

/// Render a colored terminal report.
pub fn render(outcome: &AuditOutcome, path: &Path, verbose: bool, quiet: bool) {
    let rows: Vec<(&str, &BTreeSet<String>, Verdict)> = outcome
        .report
        .buckets
        .iter()
        .map(|(license, deps)| (license.as_str(), deps, verdict(outcome, license)))
        .collect();

    let count = |v: Verdict| -> usize {
        rows.iter()
            .filter(|(_, _, verdict)| *verdict == v)
            .map(|(_, deps, _)| deps.len())
            .sum()
    };
    let (pass_count, warn_count, error_count) =
        (count(Verdict::Pass), count(Verdict::Warn), count(Verdict::Error));
    let total = outcome.report.dependency_count();

    if quiet {
        println!(
            "Total: {}  Pass: {}  Warn: {}  Error: {}",
            total,
            pass_count.to_string().green(),
            warn_count.to_string().yellow(),
            error_count.to_string().red(),
        );
        return;
    }

    println!(
        "\n {} v{}",
        "vendor-license-check".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Scanning: {}\n", path.display());

    if outcome.report.is_empty() {
        println!(" No vendored dependencies found.\n");
        return;
    }

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Dependencies       : {}", total));
    println!(" │  {:<48} │", format!("License files      : {}", outcome.candidates));
    println!(
        " │  {:<48} │",
        format!("{}  Pass            : {:>4}", "✓".green(), pass_count)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Warn            : {:>4}", "⚠".yellow(), warn_count)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Error           : {:>4}", "✗".red(), error_count)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if !outcome.file_errors.is_empty() || !outcome.unreadable.is_empty() {
        println!(" {} Skipped during the audit:\n", "[WARN]".yellow().bold());
        for (repo, err) in &outcome.unreadable {
            println!("   {} {}: {}", "⚠".yellow(), repo, err);
        }
        for err in &outcome.file_errors {
            println!("   {} {}", "⚠".yellow(), err);
        }
        println!();
    }

    let shown: Vec<_> = rows
        .iter()
        .filter(|(_, _, v)| verbose || *v != Verdict::Pass)
        .collect();
    if shown.is_empty() {
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("License").add_attribute(Attribute::Bold),
            Cell::new("Risk").add_attribute(Attribute::Bold),
            Cell::new("Dependencies").add_attribute(Attribute::Bold),
            Cell::new("Count").add_attribute(Attribute::Bold),
            Cell::new("Verdict").add_attribute(Attribute::Bold),
        ]);

    for (license, deps, verdict) in shown {
        let (verdict_str, verdict_color) = match verdict {
            Verdict::Pass => ("✓ pass", Color::Green),
            Verdict::Warn => ("⚠ warn", Color::Yellow),
            Verdict::Error => ("✗ error", Color::Red),
        };

        let risk = classify(license);
        let risk_color = match risk {
            LicenseRisk::Permissive => Color::Green,
            LicenseRisk::WeakCopyleft => Color::Yellow,
            LicenseRisk::StrongCopyleft => Color::Red,
            LicenseRisk::Unknown => Color::DarkGrey,
        };

        table.add_row(vec![
            Cell::new(license),
            Cell::new(risk.to_string()).fg(risk_color),
            Cell::new(list_dependencies(deps, verbose)),
            Cell::new(deps.len()).set_alignment(CellAlignment::Right),
            Cell::new(verdict_str)
                .fg(verdict_color)
                .set_alignment(CellAlignment::Center),
        ]);
    }

    println!("{}", table);
}

fn verdict(outcome: &AuditOutcome, license: &str) -> Verdict {
    if outcome.violations.iter().any(|v| v.license == license) {
        Verdict::Error
    } else if license == UNKNOWN {
        Verdict::Warn
    } else {
        Verdict::Pass
    }
}

fn list_dependencies(deps: &BTreeSet<String>, verbose: bool) -> String {
    let limit = if verbose { deps.len() } else { MAX_LISTED };
    let mut listed: Vec<String> = deps.iter().take(limit).cloned().collect();
    let rest = deps.len().saturating_sub(limit);
    if rest > 0 {
        listed.push(format!("… and {} more", rest));
    }
    listed.join("\n")
}
