//! services/api/src/adapters/mailer.rs
//!
//! Implementations of the `MailService` port: an SMTP relay client built on
//! `lettre`, and a logging stand-in used when no relay is configured.

use async_trait::async_trait;
use attendance_core::ports::{MailService, OutgoingMail, PortError, PortResult};
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SmtpConfig;

/// Port on which the relay expects TLS from the first byte instead of STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

//=========================================================================================
// SMTP
//=========================================================================================

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, timeout: Duration) -> PortResult<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| PortError::Unexpected(format!("Invalid sender address: {}", e)))?;

        let relay = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        };
        let builder = relay
            .map_err(|e| PortError::Unexpected(format!("Invalid SMTP relay: {}", e)))?
            .port(config.port)
            .timeout(Some(timeout));

        let builder = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, mail: OutgoingMail) -> PortResult<Message> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| PortError::Unexpected(format!("Invalid recipient {}: {}", mail.to, e)))?;
        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject);
        let html = SinglePart::html(mail.html_body);

        let message = match mail.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                    PortError::Unexpected(format!("Invalid attachment type: {}", e))
                })?;
                builder.multipart(
                    MultiPart::mixed().singlepart(html).singlepart(
                        Attachment::new(attachment.filename).body(attachment.content, content_type),
                    ),
                )
            }
            None => builder.singlepart(html),
        };
        message.map_err(|e| PortError::Unexpected(format!("Failed to build mail: {}", e)))
    }
}

#[async_trait]
impl MailService for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> PortResult<()> {
        let subject = mail.subject.clone();
        let message = self.build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| PortError::Unavailable(format!("SMTP relay failed: {}", e)))?;
        debug!(subject = %subject, "Mail handed to relay");
        Ok(())
    }
}

//=========================================================================================
// Logging fallback
//=========================================================================================

/// Writes each mail to the log instead of delivering it.
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl MailService for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> PortResult<()> {
        info!(
            to = %mail.to,
            subject = %mail.subject,
            body_bytes = mail.html_body.len(),
            attachment = mail.attachment.as_ref().map(|a| a.filename.as_str()).unwrap_or("-"),
            "SMTP is not configured; mail logged instead of sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::ports::MailAttachment;

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("reports".to_string()),
            password: Some("secret".to_string()),
            from: "Attendance <reports@example.com>".to_string(),
        }
    }

    #[tokio::test]
    async fn builds_a_multipart_message_with_the_csv_attachment() {
        let mailer = SmtpMailer::new(&smtp_config(), Duration::from_secs(1)).unwrap();
        let message = mailer
            .build_message(OutgoingMail {
                to: "admin@example.com".to_string(),
                subject: "Monthly Attendance Report - June 2024".to_string(),
                html_body: "<h2>Monthly Attendance Report</h2>".to_string(),
                attachment: Some(MailAttachment {
                    filename: "Monthly_Report_2024-06.csv".to_string(),
                    content_type: "text/csv".to_string(),
                    content: b"Employee Name,Employee ID\n".to_vec(),
                }),
            })
            .unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("Subject: Monthly Attendance Report - June 2024"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("Monthly_Report_2024-06.csv"));
    }

    #[tokio::test]
    async fn rejects_malformed_addresses() {
        let mut config = smtp_config();
        config.from = "not an address".to_string();
        assert!(SmtpMailer::new(&config, Duration::from_secs(1)).is_err());

        let mailer = SmtpMailer::new(&smtp_config(), Duration::from_secs(1)).unwrap();
        let result = mailer.build_message(OutgoingMail {
            to: "nobody".to_string(),
            subject: "x".to_string(),
            html_body: String::new(),
            attachment: None,
        });
        assert!(result.is_err());
    }
}
