//! Plain-text console output for the CLI commands.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use sitewatch_types::{MeasurementRecord, Rating};

use crate::alert::{AlertState, Outcome};
use crate::data::duration::format_duration;
use crate::data::{Analysis, History, Thresholds};
use crate::monitor::{CheckReport, HealthReport, TrendSnapshot};

const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARKLINE_WIDTH: usize = 8;

fn render_sparkline(data: &[u8]) -> String {
    if data.is_empty() {
        return " ".repeat(SPARKLINE_WIDTH);
    }
    let values: Vec<u8> = data.iter().rev().take(SPARKLINE_WIDTH).rev().copied().collect();
    values.iter().map(|&v| SPARKLINE_CHARS[v.min(7) as usize]).collect()
}

fn rating_marker(rating: Rating) -> &'static str {
    match rating {
        Rating::Good => "ok",
        Rating::NeedsImprovement => "!!",
        Rating::Poor => "XX",
    }
}

fn format_record(record: &MeasurementRecord, thresholds: &Thresholds) -> String {
    if let Some(error) = &record.error {
        return format!("{:<16} FAILED  {}", record.subject, error);
    }

    let mut parts: Vec<String> = record
        .scores
        .iter()
        .map(|(category, score)| match score {
            Some(s) => format!("{} {}", category, s),
            None => format!("{} -", category),
        })
        .collect();
    for (name, value) in &record.metrics {
        match thresholds.metric(name) {
            Some(t) => parts.push(format!("{} {}", name, t.format_value(*value))),
            None => parts.push(format!("{} {}", name, value)),
        }
    }
    format!("{:<16} {}", record.subject, parts.join("  "))
}

fn render_outcome(out: &mut String, outcome: &Outcome) {
    let _ = writeln!(
        out,
        "\nAlerts: {} fired, {} skipped, {} resolved",
        outcome.fired.len(),
        outcome.skipped.len(),
        outcome.resolved.len()
    );
    for skipped in &outcome.skipped {
        let _ = writeln!(out, "  skipped {} ({})", skipped.alert.title(), skipped.reason);
    }
}

/// Summary of a `check` run.
pub fn render_check(report: &CheckReport, thresholds: &Thresholds) -> String {
    let mut out = String::from("Lighthouse audit\n");
    for record in &report.records {
        let _ = writeln!(out, "  {}", format_record(record, thresholds));
    }
    for summary in &report.scores.summaries {
        for category in summary.scores.keys() {
            if let Some(delta) = summary.delta(category).filter(|d| *d != 0) {
                let _ = writeln!(out, "  {:<16} {} {:+}", summary.subject, category, delta);
            }
        }
    }
    render_outcome(&mut out, &report.outcome);
    out
}

/// Summary of a `health` run.
pub fn render_health(report: &HealthReport, thresholds: &Thresholds) -> String {
    let mut out = String::from("Function health\n");
    for record in &report.records {
        let _ = writeln!(out, "  {}", format_record(record, thresholds));
    }
    render_outcome(&mut out, &report.outcome);
    out
}

fn render_analysis(
    out: &mut String,
    title: &str,
    analysis: &Analysis,
    history: &History,
    thresholds: &Thresholds,
) {
    let _ = writeln!(out, "{}", title);
    let results = analysis.results();
    if results.is_empty() {
        let _ = writeln!(out, "  no data");
        return;
    }

    let _ = writeln!(
        out,
        "  {:<16} {:<13} {:>10} {:>10}     {:>8}  {}",
        "SUBJECT", "METRIC", "LATEST", "AVERAGE", "CHANGE", "TREND"
    );
    for result in results {
        let format = |v: f64| match thresholds.metric(&result.metric) {
            Some(t) => t.format_value(v),
            None => format!("{}", v),
        };
        let change = result
            .change_percent
            .map(|c| format!("{:+.1}%", c))
            .unwrap_or_else(|| "-".to_string());
        let levels = history.sparkline(&result.subject, &result.metric, SPARKLINE_WIDTH);
        let sparkline = render_sparkline(&levels);
        let _ = writeln!(
            out,
            "  {:<16} {:<13} {:>10} {:>10} {}  {:>8} {} {}",
            result.subject,
            result.metric,
            format(result.latest),
            format(result.average),
            rating_marker(result.rating),
            change,
            result.trend.symbol(),
            sparkline
        );
    }

    if !analysis.recommendations.is_empty() {
        let _ = writeln!(out, "\n  Recommendations");
        for rec in &analysis.recommendations {
            let _ = writeln!(
                out,
                "  [{}] {} ({}): {}",
                rec.priority.label(),
                rec.metric,
                rec.subjects.join(", "),
                rec.message
            );
        }
    }
}

/// Trend tables and recommendations for both histories.
pub fn render_report(
    snapshot: &TrendSnapshot,
    pages: &History,
    functions: &History,
    thresholds: &Thresholds,
) -> String {
    let mut out = String::new();
    render_analysis(&mut out, "Core Web Vitals", &snapshot.vitals, pages, thresholds);
    out.push('\n');
    render_analysis(
        &mut out,
        "Function response times",
        &snapshot.functions,
        functions,
        thresholds,
    );

    if !snapshot.scores.is_empty() {
        let _ = writeln!(out, "\nLighthouse scores");
        for summary in &snapshot.scores {
            let scores: Vec<String> = summary
                .scores
                .iter()
                .map(|(c, s)| format!("{} {}", c, s))
                .collect();
            let _ = writeln!(out, "  {:<16} {}", summary.subject, scores.join("  "));
        }
    }
    out
}

/// Open alerts and active cooldowns.
pub fn render_status(state: &AlertState, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let open = state.open(None);

    let _ = writeln!(out, "Open alerts: {}", open.len());
    for alert in open {
        let age = (now - alert.timestamp).to_std().unwrap_or_default();
        let issue = alert
            .issue_number
            .map(|n| format!(" #{}", n))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {} ({} ago){}{}",
            alert.title(),
            format_duration(age),
            issue,
            if alert.acknowledged { " ack" } else { "" }
        );
    }

    let active = state.cooldowns.active(now);
    let _ = writeln!(out, "Active cooldowns: {}", active.len());
    for (monitor, entry) in active {
        let remaining = entry
            .expires()
            .and_then(|at| (at - now).to_std().ok())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {:<10} {:<32} {} left",
            monitor.as_str(),
            entry.key,
            format_duration(remaining)
        );
    }
    out
}
