//! Reporting of derivation results in human, JSON and summary form.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::engine::{DerivationResults, DocumentResult, DocumentStatus, PerformanceMetrics};

pub struct Output {
    verbosity: VerbosityLevel,
    format: OutputFormat,
    show_colors: bool,
}

/// JSON report envelope.
#[derive(Serialize)]
struct Report<'a> {
    generated_at: DateTime<Utc>,
    tool_version: &'static str,
    #[serde(flatten)]
    results: &'a DerivationResults,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            format,
            show_colors: format == OutputFormat::Human && atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_results(&self, results: &DerivationResults) -> Result<String, serde_json::Error> {
        match self.format {
            OutputFormat::Json => self.format_json(results, Utc::now()),
            OutputFormat::Summary => Ok(self.format_summary(results)),
            OutputFormat::Human => Ok(self.format_human(results)),
        }
    }

    pub fn format_json(
        &self,
        results: &DerivationResults,
        generated_at: DateTime<Utc>,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Report {
            generated_at,
            tool_version: env!("CARGO_PKG_VERSION"),
            results,
        })
    }

    fn format_human(&self, results: &DerivationResults) -> String {
        let mut output = String::new();

        for result in &results.file_results {
            let show = match self.verbosity {
                VerbosityLevel::Quiet => result.status.is_failed(),
                VerbosityLevel::Normal | VerbosityLevel::Verbose => true,
            };
            if show {
                output.push_str(&self.format_document_result(result));
                output.push('\n');
            }
        }

        if self.verbosity > VerbosityLevel::Quiet {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&self.format_summary(results));
        }
        output
    }

    pub fn format_document_result(&self, result: &DocumentResult) -> String {
        let path = result.path.display();
        let duration = format_duration(result.duration);

        match &result.status {
            DocumentStatus::Linked | DocumentStatus::Derived => {
                let label = if result.status == DocumentStatus::Linked {
                    self.colorize("✓ LINKED ", "32")
                } else {
                    self.colorize("✓ DERIVED", "32")
                };
                let mut line = format!(
                    "{}  {} [{}] ({}) - {} artifact{}",
                    label,
                    path,
                    result.document_type,
                    duration,
                    result.artifacts,
                    plural(result.artifacts)
                );
                if result.status == DocumentStatus::Linked {
                    line.push_str(&format!(
                        ", {} resolved, {} dropped",
                        result.resolved_at_link, result.dropped_at_link
                    ));
                } else {
                    line.push_str(&format!(", {} unresolved", result.unresolved_after_derive));
                }
                if self.verbosity >= VerbosityLevel::Verbose {
                    if let Some(namespace) = &result.target_namespace {
                        line.push_str(&format!("\n    targetNamespace: {}", namespace));
                    }
                    if let Some(uuid) = result.primary_uuid {
                        line.push_str(&format!("\n    uuid: {}", uuid));
                    }
                }
                line
            }
            DocumentStatus::Failed { message } => format!(
                "{}  {} ({}) - {}",
                self.colorize("✗ FAILED ", "31"),
                path,
                duration,
                message
            ),
            DocumentStatus::Skipped { reason } => format!(
                "{}  {} ({}) - {}",
                self.colorize("- SKIPPED", "36"),
                path,
                duration,
                reason
            ),
        }
    }

    pub fn format_summary(&self, results: &DerivationResults) -> String {
        let mut output = String::new();
        output.push_str("Derivation Summary:\n");
        output.push_str(&format!("  Documents: {}\n", results.total_documents));
        if results.linked_documents > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Linked:", "32"),
                results.linked_documents
            ));
        }
        if results.derived_documents > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Derived (not linked):", "32"),
                results.derived_documents
            ));
        }
        if results.failed_documents > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Failed:", "31"),
                results.failed_documents
            ));
        }
        if results.skipped_documents > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Skipped:", "36"),
                results.skipped_documents
            ));
        }
        output.push_str(&format!("  Artifacts derived: {}\n", results.total_artifacts));
        output.push_str(&format!(
            "  References: {} unresolved after derive, {} resolved, {} dropped\n",
            results.total_unresolved, results.total_resolved, results.total_dropped
        ));
        output.push_str(&format!("  Success rate: {:.1}%\n", results.success_rate()));
        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(results.performance_metrics.total_duration)
        ));

        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&format_performance_metrics(&results.performance_metrics));
        }
        output
    }
}

fn format_performance_metrics(metrics: &PerformanceMetrics) -> String {
    let mut output = String::new();
    output.push_str("\nPerformance Metrics:\n");
    output.push_str(&format!(
        "  Discovery: {}  Derivation: {}  Persistence: {}  Linking: {}\n",
        format_duration(metrics.discovery_duration),
        format_duration(metrics.derivation_duration),
        format_duration(metrics.persistence_duration),
        format_duration(metrics.link_duration),
    ));
    output.push_str(&format!(
        "  Throughput: {:.1} documents/sec\n",
        metrics.throughput_documents_per_second
    ));
    output.push_str(&format!(
        "  Concurrent derivations: {}\n",
        metrics.concurrent_derivations
    ));
    output
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
