//! System email service.
//!
//! Sends transactional emails like the signup welcome message, using the
//! SMTP settings from the main config file. Sending is optional: when SMTP
//! is not configured the service silently skips.

use anyhow::Result;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::EmailConfig;

/// Service for sending system emails
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Check if email sending is configured and enabled
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    /// Send the post-signup welcome email
    pub async fn send_welcome_email(&self, to_email: &str, name: &str) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!(
                "Email not configured, skipping welcome email to {}",
                to_email
            );
            return Ok(());
        }

        let subject = format!("Welcome to {}", self.config.from_name);
        let html_body = render_welcome_html(name, &self.config.from_name);
        let text_body = render_welcome_text(name, &self.config.from_name);

        self.send_email(to_email, &subject, &html_body, &text_body)
            .await
    }

    /// Send an email with HTML and plain text versions
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<()> {
        let smtp_host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("SMTP host not configured"))?;
        let from_address = self
            .config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("From address not configured"))?;

        // Build the from mailbox with name
        let from_mailbox = format!("{} <{}>", self.config.from_name, from_address);
        let from: Mailbox = from_mailbox.parse()?;
        let to: Mailbox = to_email.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        // Build SMTP transport
        let mailer = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        mailer.build().send(email).await?;

        tracing::info!("Sent email to {}: {}", to_email, subject);
        Ok(())
    }
}

fn render_welcome_text(name: &str, service_name: &str) -> String {
    format!(
        "Hi {name},\n\n\
         Your {service_name} account is ready. You can sign in with your email\n\
         address and the password you chose during signup.\n\n\
         If you did not create this account, you can ignore this email.\n",
    )
}

fn render_welcome_html(name: &str, service_name: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: sans-serif; color: #222;">
  <h2>Hi {name},</h2>
  <p>Your {service_name} account is ready. You can sign in with your email
  address and the password you chose during signup.</p>
  <p style="color: #777; font-size: 12px;">If you did not create this account,
  you can ignore this email.</p>
</body>
</html>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_service_skips_silently() {
        let service = EmailService::new(EmailConfig::default());
        assert!(!service.is_enabled());
        // Must not attempt a network call
        assert!(service
            .send_welcome_email("jane@example.com", "Jane")
            .await
            .is_ok());
    }

    #[test]
    fn test_welcome_bodies_mention_recipient() {
        let text = render_welcome_text("Jane", "Keelson");
        assert!(text.contains("Hi Jane"));
        assert!(text.contains("Keelson"));

        let html = render_welcome_html("Jane", "Keelson");
        assert!(html.contains("Hi Jane"));
    }
}
