use doku::Document;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone, SmartDefault, Document)]
#[serde(default)]
pub struct Settings {
  /// Email sending configuration. All options except login/password are mandatory
  #[default(None)]
  #[doku(example = "Some(Default::default())")]
  pub email: Option<EmailConfig>,
  /// Settings related to notification fan-out
  #[default(Default::default())]
  pub notifications: NotificationsConfig,
  /// The domain name of your forum (mandatory)
  #[default("unset")]
  #[doku(example = "example.com")]
  pub hostname: String,
  /// Whether the site is available over TLS. Affects the links placed in emails.
  #[default(true)]
  pub tls_enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Document, SmartDefault)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
  /// Hostname and port of the smtp server
  #[doku(example = "localhost:25")]
  pub smtp_server: String,
  /// Login name for smtp server
  pub smtp_login: Option<String>,
  /// Password to login to the smtp server
  smtp_password: Option<String>,
  #[doku(example = "noreply@example.com")]
  /// Address to send emails from, eg "noreply@your-instance.com"
  pub smtp_from_address: String,
  /// Whether or not smtp connections should use tls. Can be none, tls, or starttls
  #[default("none")]
  #[doku(example = "none")]
  pub tls_type: String,
}

impl EmailConfig {
  pub fn smtp_password(&self) -> Option<String> {
    env::var("AGORA_SMTP_PASSWORD")
      .ok()
      .or(self.smtp_password.clone())
  }
}

#[derive(Debug, Deserialize, Serialize, Clone, SmartDefault, Document)]
#[serde(default)]
pub struct NotificationsConfig {
  /// Seconds to hold back quote and mention emails, so that a post can still be
  /// edited before anything irrevocable goes out
  #[default(300)]
  #[doku(example = "300")]
  pub mention_email_delay: u32,
  /// Words which are masked out of notification subjects and bodies
  #[doku(example = "[\"darn\"]")]
  pub censored_words: Vec<String>,
}
