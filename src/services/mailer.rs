//! Outbound email: SendGrid v3 mail-send API, or the log in development.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::MailConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;
}

/// Verification-code email. Registered users get reset wording, everyone else registration wording.
pub fn otp_email(to: &str, code: &str, is_registered: bool, ttl_minutes: i64) -> EmailMessage {
    let (subject, lead) = if is_registered {
        ("Your Password Reset Code", "Use this code to reset your password:")
    } else {
        (
            "Your Registration Code",
            "Use this code to complete your registration:",
        )
    };
    let text = format!(
        "{lead}\n\n{code}\n\nThis code will expire in {ttl_minutes} minutes."
    );
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #0052CC; font-size: 24px;">Verification Code</h1>
  <p style="color: #344563; font-size: 16px;">{lead}</p>
  <div style="background-color: #F4F5F7; padding: 24px; border-radius: 4px; text-align: center;">
    <h2 style="font-family: monospace; font-size: 32px; letter-spacing: 8px; margin: 0; color: #172B4D;">{code}</h2>
  </div>
  <p style="color: #344563; font-size: 14px;">This code will expire in {ttl_minutes} minutes.</p>
</div>"#
    );
    EmailMessage {
        to: to.to_string(),
        subject: subject.to_string(),
        text,
        html,
    }
}

pub struct SendGridMailer {
    http: Client,
    endpoint: Url,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl SendGridMailer {
    pub fn new(config: &MailConfig) -> AppResult<Self> {
        let endpoint = Url::parse(&config.sendgrid_api_url)
            .and_then(|base| base.join("v3/mail/send"))
            .map_err(|e| AppError::Config(format!("SENDGRID_API_URL: {}", e)))?;
        Ok(Self {
            http: Client::new(),
            endpoint,
            api_key: config.sendgrid_api_key.clone(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        // text/plain must precede text/html in SendGrid's content array.
        let payload = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from_email, "name": self.from_name },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html }
            ]
        });
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "sendgrid rejected message");
            return Err(AppError::Mail(format!("sendgrid responded {}", status)));
        }
        info!(subject = %message.subject, "email sent");
        Ok(())
    }
}

/// Development mailer: nothing leaves the process, the message lands in the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "mail delivery disabled; message logged"
        );
        Ok(())
    }
}
