//! Business logic: Jira access, one-time codes, and outbound mail.

pub mod jira;
pub mod mailer;
pub mod otp;

pub use jira::JiraClient;
pub use mailer::{EmailMessage, LogMailer, Mailer, SendGridMailer};
pub use otp::OtpService;
