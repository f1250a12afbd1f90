use lettre::message::{Attachment, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, instrument};
use trainhub_config::EmailConfig;
use trainhub_core::AppError;

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub file_name: String,
    pub content_type: &'static str,
    pub content: Vec<u8>,
}

impl EmailAttachment {
    pub fn pdf(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "application/pdf",
            content,
        }
    }
}

pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_dry_run(&self) -> bool {
        !self.config.enabled
    }

    /// Sends a text + HTML message with optional attachments. With SMTP
    /// disabled the message is built and logged but not delivered.
    #[instrument(skip(self, text_body, html_body, attachments), fields(attachments = attachments.len()))]
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
        attachments: Vec<EmailAttachment>,
    ) -> Result<(), AppError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_PLAIN)
                    .body(text_body.to_string()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_HTML)
                    .body(html_body.to_string()),
            );

        let mut content = MultiPart::mixed().multipart(body);
        for attachment in attachments {
            let content_type = header::ContentType::parse(attachment.content_type).map_err(|e| {
                AppError::internal_error(format!("Invalid attachment content type: {}", e))
            })?;
            content = content.singlepart(
                Attachment::new(attachment.file_name).body(attachment.content, content_type),
            );
        }

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::internal_error(format!("Invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid recipient email: {}", e)))?)
            .subject(subject)
            .multipart(content)
            .map_err(|e| AppError::internal_error(format!("Failed to build email: {}", e)))?;

        if self.is_dry_run() {
            info!(to = %to_email, subject = %subject, "SMTP disabled, email not sent (dry run)");
            return Ok(());
        }

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| {
                    AppError::internal_error(format!("Failed to create SMTP relay: {}", e))
                })?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::internal_error(format!("Task join error: {}", e)))?
            .map_err(|e| AppError::internal_error(format!("Failed to send email: {}", e)))?;

        info!(to = %to_email, subject = %subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_builds_message_without_sending() {
        let service = EmailService::new(EmailConfig::disabled());
        assert!(service.is_dry_run());

        let result = service
            .send_email(
                "marie.dupont@example.com",
                "Convocation - Session mars",
                "Bonjour",
                "<p>Bonjour</p>",
                vec![EmailAttachment::pdf("convocation_dupont_marie.pdf", b"%PDF-1.5".to_vec())],
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_a_bad_request() {
        let service = EmailService::new(EmailConfig::disabled());
        let err = service
            .send_email("not an email", "Subject", "text", "<p>html</p>", vec![])
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
