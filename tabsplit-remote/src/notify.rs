//! SMTP notifications.
//!
//! Rendering is kept separate from delivery so the mail text can be checked
//! without a server.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use tabsplit_core::config::SmtpConfig;
use tabsplit_sync::{FailureReport, NoopNotifier, Notifier, NotifyError, RunSummary};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);
const TIME_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// A rendered plain-text mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

pub fn summary_email(summary: &RunSummary, sent_at: &str) -> Email {
    let mut body = String::from("Order sync report\n\n");
    body.push_str(&summary.report_text());
    let _ = write!(body, "\nTime: {sent_at}\n");
    Email {
        subject: format!("tabsplit: {} orders processed", summary.succeeded),
        body,
    }
}

pub fn failure_email(report: &FailureReport, sent_at: &str) -> Email {
    let mut body = String::from("Order sync error report\n\n");
    let _ = writeln!(body, "{}", report.subject);
    if !report.details.is_empty() {
        let _ = writeln!(body, "\nDetails:");
        for (key, value) in &report.details {
            let _ = writeln!(body, "  {key}: {value}");
        }
    }
    let _ = write!(
        body,
        "\nTime: {sent_at}\n\nPlease check the logs and resolve the issue.\n"
    );
    Email {
        subject: "tabsplit: error".to_string(),
        body,
    }
}

/// Sends mail through a configured SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let builder = if config.ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
        }
        .map_err(|e| NotifyError(format!("invalid SMTP server {:?}: {e}", config.server)))?;

        let mut builder = builder.port(config.port).timeout(Some(SMTP_TIMEOUT));
        if config.auth {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let from = parse_mailbox(&config.from)?;
        let to = config
            .to
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            return Err(NotifyError("MAIL_TO has no recipients".to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    async fn send(&self, email: Email) -> Result<(), NotifyError> {
        let mut message = Message::builder()
            .from(self.from.clone())
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN);
        for to in &self.to {
            message = message.to(to.clone());
        }
        let message = message
            .body(email.body)
            .map_err(|e| NotifyError(format!("could not build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError(e.to_string()))?;
        Ok(())
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, NotifyError> {
    addr.parse::<Mailbox>()
        .map_err(|e| NotifyError(format!("invalid mail address {addr:?}: {e}")))
}

fn now() -> String {
    Local::now().format(TIME_FORMAT).to_string()
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn run_summary(&self, summary: &RunSummary) -> Result<(), NotifyError> {
        self.send(summary_email(summary, &now())).await?;
        tracing::info!("summary email sent");
        Ok(())
    }

    async fn failure(&self, report: &FailureReport) -> Result<(), NotifyError> {
        self.send(failure_email(report, &now())).await?;
        tracing::info!(subject = %report.subject, "error notification email sent");
        Ok(())
    }
}

/// The SMTP notifier when mail is configured, otherwise a no-op.
///
/// A mail misconfiguration never prevents a sync run; it is logged and
/// notifications are dropped.
pub fn notifier_from_config(config: &SmtpConfig) -> Box<dyn Notifier> {
    if !config.is_enabled() {
        tracing::debug!("SMTP credentials not set, notifications disabled");
        return Box::new(NoopNotifier);
    }
    match SmtpNotifier::new(config) {
        Ok(notifier) => Box::new(notifier),
        Err(err) => {
            tracing::warn!(error = %err, "email notifier misconfigured, notifications disabled");
            Box::new(NoopNotifier)
        }
    }
}
