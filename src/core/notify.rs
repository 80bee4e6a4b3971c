//! Notification stage
//!
//! Decides whether a run warrants a summary email and composes it. The
//! decision is a pure function of the merged aggregate and the policy flag.
//! Delivery is best-effort: a send failure is logged and never fails the run.

use crate::adapters::smtp::{EmailMessage, Notifier};
use crate::config::EmailConfig;
use crate::core::aggregate::RunAggregate;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write;

/// What the notification stage did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Email is disabled in configuration or on the command line
    Disabled,

    /// Policy decided no email was needed
    Suppressed,

    Sent,

    /// Delivery was attempted and failed
    Failed,
}

/// Whether the run's outcome warrants an email
///
/// A run in which every unit was skipped never notifies. Otherwise an email
/// goes out when the policy asks for success emails, an upload failed, fewer
/// files were exported than configured, or the backup count does not match
/// the export count.
pub fn should_notify(
    aggregate: &RunAggregate,
    total_units: usize,
    send_when_successful: bool,
) -> bool {
    if aggregate.skipped_count() == total_units {
        return false;
    }

    send_when_successful
        || aggregate.failed_count() > 0
        || aggregate.exported_count() < total_units
        || aggregate.backup_count() != aggregate.exported_count()
}

fn list(names: &[String]) -> String {
    if names.is_empty() {
        String::new()
    } else {
        format!(" - {}", names.join(", "))
    }
}

/// Compose the plain-text summary body
pub fn compose_body(aggregate: &RunAggregate, total_units: usize) -> String {
    let mut body = String::from("Hello,\n\n");
    // Writing to a String cannot fail.
    let _ = writeln!(body, "Total files to be exported: {total_units}");
    let _ = writeln!(
        body,
        "Total files exported: {}{}",
        aggregate.exported_count(),
        list(&aggregate.exported_files)
    );
    let _ = writeln!(
        body,
        "Total files uploaded over SFTP: {}{}",
        aggregate.uploaded_count(),
        list(&aggregate.uploaded_files)
    );
    let _ = writeln!(
        body,
        "Total files moved to backup: {}{}",
        aggregate.backup_count(),
        list(&aggregate.backup_files)
    );
    let _ = writeln!(
        body,
        "Files not uploaded: {}{}",
        aggregate.failed_count(),
        list(&aggregate.failed_files)
    );

    if !aggregate.errors.is_empty() {
        body.push_str("\nErrors encountered during the process:\n");
        for error in &aggregate.errors {
            let _ = writeln!(body, "{error}");
        }
    }

    body.push_str("\nThanks.\n");
    body
}

/// `<client> | <interface> | <dd Mon YYYY>`
pub fn compose_subject(client_name: &str, interface_name: &str, date: NaiveDate) -> String {
    format!(
        "{client_name} | {interface_name} | {}",
        date.format("%d %b %Y")
    )
}

/// Build the message for a run
pub fn compose_message(
    config: &EmailConfig,
    aggregate: &RunAggregate,
    total_units: usize,
    date: NaiveDate,
) -> EmailMessage {
    EmailMessage {
        sender: config.sender.clone(),
        recipients: config.recipients.clone(),
        subject: compose_subject(&config.client_name, &config.interface_name, date),
        body: compose_body(aggregate, total_units),
    }
}

/// Decide, compose and send
pub async fn notify(
    notifier: &dyn Notifier,
    config: &EmailConfig,
    aggregate: &RunAggregate,
    total_units: usize,
    date: NaiveDate,
) -> NotificationStatus {
    if !should_notify(aggregate, total_units, config.send_when_successful) {
        tracing::info!(
            total = total_units,
            skipped = aggregate.skipped_count(),
            "No notification needed"
        );
        return NotificationStatus::Suppressed;
    }

    let message = compose_message(config, aggregate, total_units, date);
    match notifier.send(&message).await {
        Ok(()) => NotificationStatus::Sent,
        Err(e) => {
            tracing::error!(error = %e, "Error sending email");
            NotificationStatus::Failed
        }
    }
}
