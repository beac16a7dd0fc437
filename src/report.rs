// src/report.rs
//! Plain-text rendering of challenges and results for the terminal.

use std::fmt::Write;

use crate::challenge::Challenge;
use crate::models::ResultEvent;
use crate::session::{RunLog, RunReport};

pub const SUBMIT_SUCCESS: &str = "🎉 Congratulations! You fixed the bug. +100 XP";
pub const SUBMIT_BLOCKED: &str = "🔒 Submission is locked until every test passes.";
pub const NO_RESULTS: &str = "Run the tests to check whether your code is correct.";

pub fn format_challenge(challenge: &Challenge) -> String {
    let mut out = String::new();
    let title = challenge.title.as_deref().unwrap_or(&challenge.id);
    let _ = writeln!(out, "📘 {}", title);
    let _ = writeln!(out, "\n{}", challenge.instructions.trim_end());
    if !challenge.examples.is_empty() {
        let _ = writeln!(out, "\nExamples:\n{}", challenge.examples.trim_end());
    }
    if let Some(media) = &challenge.media {
        let _ = writeln!(out, "\n🎬 {}", media);
    }
    let _ = write!(out, "\n🧪 {} test cases", challenge.test_cases.len());
    out
}

pub fn format_event(event: &ResultEvent) -> String {
    let icon = if event.is_success() { "✅" } else { "❌" };
    let label = match event.test_case {
        0 => "Execution".to_string(),
        n => format!("Test Case {}", n),
    };
    format!("{} {} [{}]\n{}", icon, label, event.status, event.display_message())
}

/// "x/y Tests Passing", or `None` when nothing has run.
pub fn format_summary(log: &RunLog) -> Option<String> {
    if log.is_empty() {
        return None;
    }
    Some(format!("👍 {}/{} Tests Passing", log.passing_count(), log.len()))
}

pub fn format_run(report: &RunReport, submitted: usize) -> String {
    let separator = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{}", separator);

    if report.superseded {
        let _ = writeln!(out, "⏭️  Run #{} was replaced by a newer run", report.generation);
    } else if report.log.is_empty() {
        let _ = writeln!(out, "{}", NO_RESULTS);
    } else {
        for event in report.log.events() {
            let _ = writeln!(out, "{}\n", format_event(event));
        }
        if let Some(summary) = format_summary(&report.log) {
            let _ = writeln!(out, "{}", summary);
        }
        if report.transport_error.is_none() && !report.log.is_complete(submitted) {
            let _ = writeln!(
                out,
                "⚠️  Results arrived for {} of {} test cases",
                report.log.by_ordinal().range(1..=submitted as u32).count(),
                submitted
            );
        }
    }

    let elapsed = report.finished_at - report.started_at;
    let _ = writeln!(out, "⏱️  {}ms", elapsed.num_milliseconds());
    let _ = write!(out, "{}", separator);
    out
}
