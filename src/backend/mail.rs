/**
 * Outgoing Mail
 *
 * Mail delivery is an external collaborator. Handlers talk to it through the
 * `Mailer` trait. `SmtpMailer` relays through an SMTP server when one is
 * configured; otherwise `LogMailer` only records the message in the log.
 */

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::backend::server::config::SmtpConfig;

/// Mail delivery failure
#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// An outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Mail {
    /// Verification code for a freshly created account
    pub fn email_verification(to: &str, username: &str, code: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Verify Your Collabris Account".to_string(),
            body: format!(
                "Hi {},\n\nYour verification code is {}. It expires in 10 minutes.",
                username, code
            ),
        }
    }

    /// Password reset code
    pub fn password_reset(to: &str, username: &str, code: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Reset Your Collabris Password".to_string(),
            body: format!(
                "Hi {},\n\nYour password reset code is {}. It expires in 10 minutes.",
                username, code
            ),
        }
    }
}

/// Sends mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), MailError>;
}

/// Mailer that writes messages to the log
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        tracing::info!("[Mail] To: {} | Subject: {}", mail.to, mail.subject);
        tracing::debug!("[Mail] Body: {}", mail.body);
        Ok(())
    }
}

/// Mailer that relays through an SMTP server
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport
    ///
    /// Port 465 uses implicit TLS, other ports STARTTLS. Nothing is sent
    /// until the first message.
    ///
    /// # Errors
    /// `MailError` when the sender address or the TLS setup is invalid
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| MailError(format!("invalid sender address {:?}: {}", config.from, e)))?;

        let mut builder = if config.use_tls {
            let tls = TlsParameters::new(config.host.clone())
                .map_err(|e| MailError(format!("TLS configuration error: {}", e)))?;
            if config.port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                    .map_err(|e| MailError(format!("SMTP relay error: {}", e)))?
                    .port(config.port)
                    .tls(Tls::Wrapper(tls))
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| MailError(format!("SMTP relay error: {}", e)))?
                    .port(config.port)
                    .tls(Tls::Required(tls))
            }
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| MailError(format!("invalid recipient {:?}: {}", mail.to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| MailError(format!("failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError(e.to_string()))?;

        tracing::info!("[Mail] Sent \"{}\" to {}", mail.subject, mail.to);
        Ok(())
    }
}

/// Pick the mailer for a configuration
///
/// Without SMTP settings, or when the transport cannot be built, mail goes
/// to the log.
pub fn mailer_for(smtp: Option<&SmtpConfig>) -> Arc<dyn Mailer> {
    let Some(config) = smtp else {
        tracing::info!("[Mail] SMTP_HOST not set, outgoing mail is only logged");
        return Arc::new(LogMailer);
    };

    match SmtpMailer::new(config) {
        Ok(mailer) => {
            tracing::info!(
                "[Mail] Relaying through {}:{} (tls: {})",
                config.host,
                config.port,
                config.use_tls
            );
            Arc::new(mailer)
        }
        Err(e) => {
            tracing::error!("[Mail] {}; falling back to the log mailer", e);
            Arc::new(LogMailer)
        }
    }
}
