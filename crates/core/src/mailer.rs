//! OTP delivery over SMTP.
//!
//! Uses the `lettre` crate with an async STARTTLS relay. When no relay is
//! configured the code is logged at info level instead, so registration
//! keeps working in local development.

use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, warn};

use crate::config::SmtpConfig;
use crate::errors::NotifyError;

/// Sends registration OTP emails.
pub struct OtpMailer {
    smtp: SmtpConfig,
}

impl OtpMailer {
    pub fn new(smtp: SmtpConfig) -> Self {
        Self { smtp }
    }

    /// Whether a relay and sender address are configured.
    pub fn is_configured(&self) -> bool {
        self.smtp.relay.is_some() && self.smtp.from.is_some()
    }

    /// Deliver `code` to `to`. There are no retries: a failure surfaces
    /// once and the caller decides what to tell the user.
    pub async fn send_otp(&self, to: &str, code: &str) -> Result<(), NotifyError> {
        let (relay, from) = match (&self.smtp.relay, &self.smtp.from) {
            (Some(relay), Some(from)) => (relay.as_str(), from.as_str()),
            _ => {
                info!(to, code, "SMTP not configured, logging OTP instead of mailing it");
                return Ok(());
            }
        };

        debug!(to, "sending registration OTP");

        let from_mailbox: Mailbox = from
            .parse()
            .map_err(|e| NotifyError::BuildFailed(format!("invalid from address: {e}")))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| NotifyError::BuildFailed(format!("invalid recipient '{to}': {e}")))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject("Your OTP for Registration")
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "Your OTP is: {code}\nThis OTP is valid for 5 minutes."
            ))
            .map_err(|e| NotifyError::BuildFailed(e.to_string()))?;

        let transport = self.build_transport(relay)?;
        match transport.send(email).await {
            Ok(_) => {
                info!(to, "OTP email sent");
                Ok(())
            }
            Err(e) => {
                warn!(to, error = %e, "failed to send OTP email");
                Err(NotifyError::SendFailed(e.to_string()))
            }
        }
    }

    /// Build an async SMTP transport for the configured relay, attaching
    /// credentials when both username and password are present.
    fn build_transport(
        &self,
        relay: &str,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        // Accept `host` or `host:port`; lettre picks the standard port.
        let parts: Vec<&str> = relay.rsplitn(2, ':').collect();
        let host = if parts.len() == 2 { parts[1] } else { relay };

        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotifyError::SendFailed(format!("SMTP connection error: {e}")))?;

        let transport = match (&self.smtp.username, &self.smtp.password) {
            (Some(username), Some(password)) => {
                let creds = Credentials::new(username.clone(), password.clone());
                builder.credentials(creds).build()
            }
            _ => builder.build(),
        };
        Ok(transport)
    }
}
