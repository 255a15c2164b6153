//! Out-of-band alert delivery.
//!
//! Fatal run conditions and misconfigured paths are reported to a central
//! logging endpoint as a JSON POST. The channel is strictly best-effort:
//! a delivery failure is logged locally and swallowed, never propagated.
//! The alert path must not be able to take the engine down.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AlertConfig;

/// Fixed label used when no account name can be determined.
const FALLBACK_ACCOUNT: &str = "svc-acct";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    app_name: &'a str,
    app_version: &'a str,
    app_user: &'a str,
    severity: &'a str,
    message: &'a str,
    email_subject: Option<&'a str>,
    from_address: Option<&'a str>,
    /// Recipients; empty when the alert does not ask for notification.
    send_to: &'a str,
    sent_at: String,
}

pub struct AlertClient {
    config: AlertConfig,
    account: String,
    http: reqwest::Client,
}

impl AlertClient {
    pub fn new(config: AlertConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build alert HTTP client")?;
        let account = account_label(&config);

        Ok(Self {
            config,
            account,
            http,
        })
    }

    /// Deliver an alert. `notify` controls whether the recipient list is
    /// attached so the receiving end fans out email.
    pub async fn send(&self, severity: Severity, message: &str, notify: bool) {
        let Some(url) = self.config.url.as_deref() else {
            debug!("alert channel disabled; dropping: {}", message);
            return;
        };

        let send_to = if notify {
            self.config.notify_addresses.as_deref().unwrap_or("")
        } else {
            ""
        };

        let payload = AlertPayload {
            app_name: &self.config.app_name,
            app_version: env!("CARGO_PKG_VERSION"),
            app_user: &self.account,
            severity: severity.as_str(),
            message,
            email_subject: self.config.email_subject.as_deref(),
            from_address: self.config.from_address.as_deref(),
            send_to,
            sent_at: Utc::now().to_rfc3339(),
        };

        match self.http.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!("alert endpoint returned {}: {}", response.status(), message);
            }
            Err(e) => {
                warn!("alert delivery failed: {} (message was: {})", e, message);
            }
        }
    }
}

/// Display label identifying the account this process runs as. The config
/// override wins; otherwise the hosting environment is consulted, with a
/// fixed fallback when it has nothing to say.
pub fn account_label(config: &AlertConfig) -> String {
    if let Some(label) = &config.account_label {
        return label.clone();
    }

    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| FALLBACK_ACCOUNT.to_string())
}
