//! Trace Document Formatting
//!
//! Renders a completed trace as the markdown document written to the
//! archive and stored alongside the trace row.

use chrono::{DateTime, SecondsFormat, Utc};
use symptom_trace_core::{TraceResult, Urgency};

fn urgency_badge(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Urgent => "🔴",
        Urgency::Discuss => "🟡",
        Urgency::Info => "🔵",
    }
}

/// Format a trace as one markdown document.
pub fn format_trace_markdown(trace: &TraceResult, date: DateTime<Utc>) -> String {
    let mut lines: Vec<String> = vec![
        "# TRACE Analysis".to_string(),
        String::new(),
        format!("**Symptoms:** {}", trace.symptoms.headline()),
        format!(
            "**Date:** {}",
            date.to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
        String::new(),
        "## Thinking".to_string(),
        String::new(),
    ];

    if trace.thinking.trim().is_empty() {
        lines.push("_No extended thinking captured._".to_string());
    } else {
        lines.push(trace.thinking.clone());
    }
    lines.push(String::new());

    lines.push("## Causal Chains".to_string());
    lines.push(String::new());
    for chain in &trace.chains {
        lines.push(format!(
            "### {} (confidence: {}%)",
            chain.label,
            (chain.overall_confidence * 100.0).round() as i64
        ));
        lines.push(String::new());
        for node in &chain.nodes {
            lines.push(format!(
                "- **[{}]** {}: {}",
                node.node_type, node.title, node.description
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push(trace.summary.clone());
    lines.push(String::new());

    lines.push("## Suggestions".to_string());
    lines.push(String::new());
    for s in &trace.suggestions {
        let audience = if s.for_doctor {
            "(for doctor)"
        } else {
            "(for patient)"
        };
        lines.push(format!(
            "- {} {} {}",
            urgency_badge(s.urgency),
            s.text,
            audience
        ));
    }

    lines.join("\n")
}

/// Archive note path: `TRACE Patient Notes/<date> - <title>.md`, with the
/// title reduced to ASCII letters, digits, spaces and hyphens, at most 60 chars.
pub fn archive_note_path(title: &str, date: DateTime<Utc>) -> String {
    let safe: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
        .take(60)
        .collect();
    format!(
        "TRACE Patient Notes/{} - {}.md",
        date.format("%Y-%m-%d"),
        safe
    )
}
