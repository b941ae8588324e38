use anyhow::Context;
use serde_json::Value;
use std::fs;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::{fmt, layer::SubscriberExt, Layer, Registry};

/// Target for events that must also land in the audit file
pub const AUDIT_TARGET: &str = "audit_log";

pub fn setup_logging(log_dir: &str) -> Result<(), anyhow::Error> {
    fs::create_dir_all(log_dir).context("Failed to create logs directory")?;

    // Daily rotating file appender
    let file_appender = rolling::daily(log_dir, "audit.log");

    // Only the audit target is written to disk
    let target_filter = Targets::new().with_target(AUDIT_TARGET, LevelFilter::TRACE);

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(target_filter);

    // Stdout layer logs everything at INFO and above
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(LevelFilter::INFO);

    let subscriber = Registry::default().with(stdout_layer).with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    Ok(())
}

/// Records an audited action: who did what to which record
pub fn audit(actor: &str, action: &str, subject: &str, detail: Option<&Value>) {
    match detail {
        Some(d) => {
            info!(
                target: AUDIT_TARGET,
                actor = actor,
                action = action,
                subject = subject,
                detail = %d,
                "{} {} {}", actor, action, subject
            );
        }
        None => {
            info!(
                target: AUDIT_TARGET,
                actor = actor,
                action = action,
                subject = subject,
                "{} {} {}", actor, action, subject
            );
        }
    }
}
