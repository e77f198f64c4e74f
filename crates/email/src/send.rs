use agora_db::{enums::MailPriority, sensitive::SensitiveString};
use agora_utils::{
  error::{AgoraErrorExt, AgoraErrorType, AgoraResult},
  settings::structs::Settings,
  utils::markup::plain_text_from_html,
  version::version,
};
use async_trait::async_trait;
use lettre::{
  message::{
    header::{ContentType, Header, HeaderName, HeaderValue},
    Mailbox,
    MultiPart,
  },
  transport::smtp::{authentication::Credentials, extension::ClientId},
  Address,
  AsyncTransport,
  Message,
};
use std::str::FromStr;
use uuid::Uuid;

type AsyncSmtpTransport = lettre::AsyncSmtpTransport<lettre::Tokio1Executor>;

/// A fully assembled email, ready for a [`Mailer`] to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
  pub to_email: SensitiveString,
  pub to_name: String,
  pub subject: String,
  pub body: String,
  /// When set the body is html and a plain text alternative is derived from
  /// it, otherwise the body goes out as plain text.
  pub html: bool,
  /// Stable tag for the message id, so that resends of the same post thread
  /// together in mail clients. A random id is generated when unset.
  pub unique_tag: Option<String>,
  pub priority: MailPriority,
}

/// Delivers assembled emails. The production implementation talks to an smtp
/// relay, tests swap in a recording fake.
#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, email: &OutboundEmail) -> AgoraResult<()>;
}

#[derive(Debug, Clone, Copy)]
struct XPriority(MailPriority);

impl Header for XPriority {
  fn name() -> HeaderName {
    HeaderName::new_from_ascii_str("X-Priority")
  }

  fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
    let priority = match s.trim() {
      "1" => MailPriority::High,
      "5" => MailPriority::Low,
      _ => MailPriority::Normal,
    };
    Ok(XPriority(priority))
  }

  fn display(&self) -> HeaderValue {
    let value = match self.0 {
      MailPriority::High => "1",
      MailPriority::Normal => "3",
      MailPriority::Low => "5",
    };
    HeaderValue::new(Self::name(), value.to_string())
  }
}

#[derive(Debug, Clone)]
struct XMailer(String);

impl Header for XMailer {
  fn name() -> HeaderName {
    HeaderName::new_from_ascii_str("X-Mailer")
  }

  fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
    Ok(XMailer(s.trim().to_string()))
  }

  fn display(&self) -> HeaderValue {
    HeaderValue::new(Self::name(), self.0.clone())
  }
}

/// Sends through the smtp relay configured in the email settings section.
#[derive(Debug)]
pub struct SmtpMailer {
  transport: AsyncSmtpTransport,
  from_address: String,
  hostname: String,
}

impl SmtpMailer {
  pub fn from_settings(settings: &Settings) -> AgoraResult<SmtpMailer> {
    let email_config = settings.email.clone().ok_or(AgoraErrorType::NoEmailSetup)?;

    let (smtp_server, smtp_port) = {
      let (server, port) = email_config
        .smtp_server
        .split_once(':')
        .ok_or(AgoraErrorType::EmailSmtpServerNeedsAPort)?;
      (server, port.parse::<u16>()?)
    };

    // Set the TLS
    let mut builder = match email_config.tls_type.as_str() {
      "starttls" => AsyncSmtpTransport::starttls_relay(smtp_server)?.port(smtp_port),
      "tls" => AsyncSmtpTransport::relay(smtp_server)?.port(smtp_port),
      _ => AsyncSmtpTransport::builder_dangerous(smtp_server).port(smtp_port),
    };

    // Set the creds if they exist
    if let (Some(login), Some(password)) =
      (email_config.smtp_login.clone(), email_config.smtp_password())
    {
      builder = builder.credentials(Credentials::new(login, password));
    }

    Ok(SmtpMailer {
      transport: builder
        .hello_name(ClientId::Domain(settings.hostname.clone()))
        .build(),
      from_address: email_config.smtp_from_address,
      hostname: settings.hostname.clone(),
    })
  }

  fn build_message(&self, email: &OutboundEmail) -> AgoraResult<Message> {
    let message_id = email
      .unique_tag
      .clone()
      .unwrap_or_else(|| Uuid::new_v4().to_string());

    let builder = Message::builder()
      .from(
        self
          .from_address
          .parse()
          .with_agora_type(AgoraErrorType::InvalidEmailAddress(
            self.from_address.clone(),
          ))?,
      )
      .to(Mailbox::new(
        Some(email.to_name.clone()),
        Address::from_str(&email.to_email).with_agora_type(AgoraErrorType::InvalidEmailAddress(
          email.to_email.clone().into_inner(),
        ))?,
      ))
      .message_id(Some(format!("<{}@{}>", message_id, self.hostname)))
      .subject(email.subject.clone())
      .header(XMailer(format!("Agora {}", version())))
      .header(XPriority(email.priority));

    let message = if email.html {
      let plain_text = plain_text_from_html(&email.body)?;
      builder.multipart(MultiPart::alternative_plain_html(
        plain_text,
        email.body.clone(),
      ))
    } else {
      builder
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
    }
    .with_agora_type(AgoraErrorType::EmailSendFailed)?;

    Ok(message)
  }
}

#[async_trait]
impl Mailer for SmtpMailer {
  async fn send(&self, email: &OutboundEmail) -> AgoraResult<()> {
    let message = self.build_message(email)?;
    self
      .transport
      .send(message)
      .await
      .with_agora_type(AgoraErrorType::EmailSendFailed)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  #![allow(clippy::unwrap_used)]

  use super::*;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  fn test_settings(smtp_server: &str) -> Settings {
    let email = serde_json::from_value(json!({
      "smtp_server": smtp_server,
      "smtp_from_address": "noreply@example.com",
      "tls_type": "none",
    }))
    .unwrap();
    Settings {
      email: Some(email),
      hostname: "forum.example.com".to_string(),
      ..Default::default()
    }
  }

  fn test_email() -> OutboundEmail {
    OutboundEmail {
      to_email: SensitiveString::from("alice@example.com"),
      to_name: "alice".to_string(),
      subject: "Topic reply: Weekly sync".to_string(),
      body: "A reply has been posted.".to_string(),
      html: false,
      unique_tag: Some("m21".to_string()),
      priority: MailPriority::Normal,
    }
  }

  #[test]
  fn smtp_server_without_a_port_is_rejected() {
    let err = SmtpMailer::from_settings(&test_settings("localhost")).unwrap_err();
    assert_eq!(err.error_type, AgoraErrorType::EmailSmtpServerNeedsAPort);
  }

  #[test]
  fn message_id_and_priority_land_in_the_headers() {
    let mailer = SmtpMailer::from_settings(&test_settings("localhost:25")).unwrap();
    let raw = String::from_utf8(mailer.build_message(&test_email()).unwrap().formatted()).unwrap();
    assert!(raw.contains("<m21@forum.example.com>"));
    assert!(raw.contains("X-Priority: 3"));
    assert!(raw.contains("X-Mailer: Agora"));
  }

  #[test]
  fn invalid_recipient_address_is_reported() {
    let mailer = SmtpMailer::from_settings(&test_settings("localhost:25")).unwrap();
    let email = OutboundEmail {
      to_email: SensitiveString::from("not-an-address"),
      ..test_email()
    };
    let err = mailer.build_message(&email).unwrap_err();
    assert_eq!(
      err.error_type,
      AgoraErrorType::InvalidEmailAddress("not-an-address".to_string())
    );
  }
}
