//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{SyncConfig, ValidationResult};
use crate::reconciler::{ReconcileAction, ReconciledResource};
use crate::sync::{ResourceSummary, SyncReport};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Resolved resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Properties")]
    properties: String,
    #[tabled(rename = "Secret")]
    secret: String,
    #[tabled(rename = "Files")]
    files: String,
}

/// Reconciled resource row for table display.
#[derive(Tabled)]
struct ExposedRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "ID")]
    id: i64,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a validation result and configuration summary.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &SyncConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "valid": result.is_valid(),
                "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "warnings": result.warnings,
                "application": config.deployment.application,
                "environment": config.deployment.environment,
                "used": config.resources.used.len(),
                "exposed": config.resources.exposed.len(),
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid!\n", "✓".green())
                } else {
                    let mut output = format!("{} Configuration is invalid:\n", "✗".red());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                    output
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output.push_str("\nConfiguration summary:\n");
                let _ = writeln!(output, "   Registry: {}", config.registry.url);
                let _ = writeln!(output, "   Application: {}", config.deployment.application);
                let _ = writeln!(
                    output,
                    "   Environment: {}{}",
                    config.deployment.environment,
                    config
                        .deployment
                        .zone
                        .as_deref()
                        .map(|zone| format!(" ({zone})"))
                        .unwrap_or_default()
                );
                let _ = writeln!(output, "   Version: {}", config.deployment.version);
                let _ = writeln!(output, "   Used resources: {}", config.resources.used.len());
                let _ = writeln!(
                    output,
                    "   Exposed resources: {}",
                    config.resources.exposed.len()
                );
                output
            }
        }
    }

    /// Formats resolved resources.
    #[must_use]
    pub fn format_resources(&self, resources: &[ResourceSummary]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(resources).unwrap_or_default(),
            OutputFormat::Text => {
                if resources.is_empty() {
                    return String::from("   No used resources declared.\n");
                }

                let rows: Vec<ResourceRow> = resources.iter().map(Self::resource_row).collect();
                let mut output = Table::new(rows).to_string();
                let _ = write!(
                    output,
                    "\n\n{} Resolved {} resources\n",
                    "✓".green(),
                    resources.len()
                );
                output
            }
        }
    }

    /// Formats reconciled exposed resources.
    #[must_use]
    pub fn format_reconciled(&self, reconciled: &[ReconciledResource]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(reconciled).unwrap_or_default(),
            OutputFormat::Text => {
                if reconciled.is_empty() {
                    return String::from("   No exposed resources declared.\n");
                }

                let rows: Vec<ExposedRow> = reconciled
                    .iter()
                    .map(|r| ExposedRow {
                        action: Self::format_action(r.action),
                        alias: r.alias.clone(),
                        resource_type: r.resource_type.clone(),
                        id: r.id,
                    })
                    .collect();

                let created = reconciled
                    .iter()
                    .filter(|r| r.action == ReconcileAction::Created)
                    .count();

                let mut output = Table::new(rows).to_string();
                let _ = write!(
                    output,
                    "\n\nReconciled: {} created, {} updated\n",
                    created.to_string().green(),
                    (reconciled.len() - created).to_string().yellow()
                );
                output
            }
        }
    }

    /// Formats a sync report.
    #[must_use]
    pub fn format_report(&self, report: &SyncReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!(
                    "\n{} Registered {}:{} in {}\n",
                    "✓".green(),
                    report.application,
                    report.version,
                    report.environment
                );
                let _ = writeln!(output, "   Pass: {}", report.pass_id);
                let _ = writeln!(
                    output,
                    "   Started: {}",
                    report.started_at.format("%Y-%m-%d %H:%M:%S")
                );
                let _ = writeln!(output, "   Duration: {} ms", report.duration_ms());
                let _ = writeln!(output, "   Used: {}", Self::format_ids(&report.used_resource_ids));
                let _ = writeln!(
                    output,
                    "   Exposed: {}",
                    Self::format_ids(&report.exposed_resource_ids)
                );

                if !report.used.is_empty() {
                    output.push('\n');
                    output.push_str(&self.format_resources(&report.used));
                }
                if !report.exposed.is_empty() {
                    output.push('\n');
                    output.push_str(&self.format_reconciled(&report.exposed));
                }
                output
            }
        }
    }

    /// Formats the result of the presence checks.
    #[must_use]
    pub fn format_check(&self, application: &str, environment: &str) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "application": application,
                "environment": environment,
                "exists": true,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => format!(
                "{} Environment {environment} and application {application} exist in the registry\n",
                "✓".green()
            ),
        }
    }

    fn resource_row(resource: &ResourceSummary) -> ResourceRow {
        ResourceRow {
            alias: resource.alias.clone(),
            resource_type: resource.resource_type.clone(),
            id: resource
                .id
                .map_or_else(|| String::from("-"), |id| id.to_string()),
            properties: Self::truncate(&resource.properties.join(", "), 40),
            secret: if resource.has_secret {
                "yes".green().to_string()
            } else {
                "no".dimmed().to_string()
            },
            files: resource.certificates.len().to_string(),
        }
    }

    /// Formats a reconcile action with color.
    fn format_action(action: ReconcileAction) -> String {
        match action {
            ReconcileAction::Created => "+create".green().to_string(),
            ReconcileAction::Updated => "~update".yellow().to_string(),
        }
    }

    fn format_ids(ids: &[i64]) -> String {
        if ids.is_empty() {
            return String::from("-");
        }
        ids.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ResourceSummary {
        ResourceSummary {
            alias: String::from("appdb"),
            resource_type: String::from("DataSource"),
            id: Some(11),
            properties: vec![String::from("url"), String::from("username")],
            has_secret: true,
            certificates: vec![],
        }
    }

    #[test]
    fn test_resources_json_has_no_secret_values() {
        let output = OutputFormatter::new(OutputFormat::Json).format_resources(&[summary()]);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["alias"], "appdb");
        assert_eq!(value[0]["has_secret"], true);
        assert_eq!(value[0]["id"], 11);
    }

    #[test]
    fn test_resources_text_table() {
        colored::control::set_override(false);
        let output = OutputFormatter::new(OutputFormat::Text).format_resources(&[summary()]);
        assert!(output.contains("appdb"));
        assert!(output.contains("url, username"));
        assert!(output.contains("Resolved 1 resources"));
    }

    #[test]
    fn test_reconciled_text_counts() {
        colored::control::set_override(false);
        let reconciled = vec![
            ReconciledResource {
                alias: String::from("api"),
                resource_type: String::from("RestService"),
                id: 7,
                action: ReconcileAction::Created,
            },
            ReconciledResource {
                alias: String::from("ws"),
                resource_type: String::from("WebserviceEndpoint"),
                id: 8,
                action: ReconcileAction::Updated,
            },
        ];
        let output = OutputFormatter::new(OutputFormat::Text).format_reconciled(&reconciled);
        assert!(output.contains("+create"));
        assert!(output.contains("Reconciled: 1 created, 1 updated"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("abcdefghijkl", 8), "abcde...");
    }
}
