/// Email service for invitation (password setup) links
use crate::clients::IdentityProviderError;
use crate::config::EmailSettings;
use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

type Result<T> = std::result::Result<T, IdentityProviderError>;

/// Async email transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
    app_name: String,
}

impl EmailService {
    /// Build email service from configuration
    ///
    /// If SMTP host is empty, operates in no-op mode (logs only).
    pub fn new(config: &EmailSettings, app_name: &str) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| IdentityProviderError::Delivery(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| {
                IdentityProviderError::Delivery(format!("Failed to configure SMTP transport: {}", e))
            })?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self {
            transport,
            from,
            app_name: app_name.to_string(),
        })
    }

    /// Check if SMTP transport is enabled
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Send the invitation email carrying the password setup link
    pub async fn send_invitation_email(&self, recipient: &str, link: &str) -> Result<()> {
        let subject = format!("You have been invited to {}", self.app_name);
        let (html_body, text_body) = render_invitation(&self.app_name, link);

        let Some(transport) = &self.transport else {
            info!(
                subject = %subject,
                recipient, "Email service running in no-op mode; skipping actual send"
            );
            return Ok(());
        };

        let to = recipient.parse::<Mailbox>().map_err(|e| {
            IdentityProviderError::Delivery(format!("Invalid recipient email address: {}", e))
        })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| {
                IdentityProviderError::Delivery(format!("Failed to build email message: {}", e))
            })?;

        transport
            .send(email)
            .await
            .map_err(|e| IdentityProviderError::Delivery(format!("Failed to send email: {}", e)))?;
        info!(subject = %subject, "Invitation email sent");

        Ok(())
    }
}

fn render_invitation(app_name: &str, link: &str) -> (String, String) {
    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <h2>You have been invited to {app_name}</h2>
    <p>Set your password to activate your account:</p>
    <p style="margin: 30px 0;">
        <a href="{link}" style="background-color: #000; color: #fff; padding: 14px 28px; text-decoration: none; border-radius: 25px; display: inline-block;">Set password</a>
    </p>
    <p style="color: #666; font-size: 14px;">
        If the button doesn't work, copy this link into your browser:<br>
        <a href="{link}" style="color: #007AFF;">{link}</a>
    </p>
    <p style="color: #999; font-size: 12px; margin-top: 30px;">
        If the link has expired, use "Forgot password" on the sign-in page.
    </p>
</body>
</html>"#
    );

    let text_body = format!(
        "You have been invited to {app_name}.\n\n\
        Set your password to activate your account:\n{link}\n\n\
        If the link has expired, use \"Forgot password\" on the sign-in page."
    );

    (html_body, text_body)
}
