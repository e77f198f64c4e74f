use crate::send::OutboundEmail;
use agora_db::{
  enums::MailPriority,
  newtypes::{PostId, TopicId},
  sensitive::SensitiveString,
};
use agora_utils::settings::structs::Settings;

/// The kinds of notification email one fan-out round can produce, carrying
/// the content already rendered for one recipient's locale.
pub enum NotificationEmail<'a> {
  /// A reply in a topic the recipient watches.
  TopicReply {
    subject: &'a str,
    body: &'a str,
    poster: &'a str,
    posted_at: &'a str,
  },
  /// A new topic on a board the recipient watches.
  BoardTopic {
    subject: &'a str,
    body: &'a str,
    poster: &'a str,
    board: &'a str,
    posted_at: &'a str,
  },
  /// The recipient's words were quoted.
  Quoted {
    subject: &'a str,
    body: &'a str,
    poster: &'a str,
    posted_at: &'a str,
  },
  /// The recipient was mentioned by name.
  Mentioned {
    subject: &'a str,
    body: &'a str,
    poster: &'a str,
    posted_at: &'a str,
  },
}

/// Assembles the outbound email for one recipient. Notification emails go
/// out as plain text, tagged with the post id so that the copies every
/// recipient gets share a message id.
pub fn notification_email(
  to_name: &str,
  to_email: SensitiveString,
  topic_id: TopicId,
  post_id: PostId,
  data: NotificationEmail<'_>,
  settings: &Settings,
) -> OutboundEmail {
  let post_link = format!(
    "{}/topic/{}#post-{}",
    settings.get_protocol_and_hostname(),
    topic_id,
    post_id
  );
  let settings_link = crate::notification_settings_link(settings);

  let (subject, body) = match data {
    NotificationEmail::TopicReply {
      subject,
      body,
      poster,
      posted_at,
    } => (
      format!("Topic reply: {subject}"),
      format!(
        "A reply has been posted by {poster} to a topic you are watching.\n\n\
         {subject} ({posted_at})\n\n\
         {body}\n\n\
         Read the reply at {post_link}\n\n\
         To change how you are notified, visit {settings_link}"
      ),
    ),
    NotificationEmail::BoardTopic {
      subject,
      body,
      poster,
      board,
      posted_at,
    } => (
      format!("New topic: {subject}"),
      format!(
        "{poster} has started a new topic, \"{subject}\", on {board}, a board you are \
         watching. ({posted_at})\n\n\
         {body}\n\n\
         Read the topic at {post_link}\n\n\
         To change how you are notified, visit {settings_link}"
      ),
    ),
    NotificationEmail::Quoted {
      subject,
      body,
      poster,
      posted_at,
    } => (
      format!("You have been quoted: {subject}"),
      format!(
        "{poster} has quoted you in a post.\n\n\
         {subject} ({posted_at})\n\n\
         {body}\n\n\
         Read the post at {post_link}\n\n\
         To change how you are notified, visit {settings_link}"
      ),
    ),
    NotificationEmail::Mentioned {
      subject,
      body,
      poster,
      posted_at,
    } => (
      format!("You have been mentioned: {subject}"),
      format!(
        "{poster} has mentioned you in a post.\n\n\
         {subject} ({posted_at})\n\n\
         {body}\n\n\
         Read the post at {post_link}\n\n\
         To change how you are notified, visit {settings_link}"
      ),
    ),
  };

  OutboundEmail {
    to_email,
    to_name: to_name.to_string(),
    subject,
    body,
    html: false,
    unique_tag: Some(format!("m{post_id}")),
    priority: MailPriority::Normal,
  }
}

#[cfg(test)]
mod tests {
  #![allow(clippy::unwrap_used)]

  use super::*;
  use pretty_assertions::assert_eq;

  fn test_settings() -> Settings {
    Settings {
      hostname: "forum.example.com".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn watcher_reply_email_links_the_post() {
    let email = notification_email(
      "bob",
      SensitiveString::from("bob@example.com"),
      TopicId(7),
      PostId(21),
      NotificationEmail::TopicReply {
        subject: "Weekly sync",
        body: "Pushed to Tuesday.",
        poster: "alice",
        posted_at: "Mar 01, 2026, 10:15 AM",
      },
      &test_settings(),
    );

    assert_eq!(email.subject, "Topic reply: Weekly sync");
    assert!(email
      .body
      .contains("https://forum.example.com/topic/7#post-21"));
    assert!(email.body.contains("alice"));
    assert!(email.body.contains("/profile/notifications"));
    assert_eq!(email.unique_tag, Some("m21".to_string()));
    assert!(!email.html);
  }

  #[test]
  fn board_topic_email_names_the_board() {
    let email = notification_email(
      "bob",
      SensitiveString::from("bob@example.com"),
      TopicId(8),
      PostId(30),
      NotificationEmail::BoardTopic {
        subject: "Introductions",
        body: "Hello everyone.",
        poster: "carol",
        board: "General",
        posted_at: "Mar 02, 2026, 09:00 AM",
      },
      &test_settings(),
    );

    assert_eq!(email.subject, "New topic: Introductions");
    assert!(email.body.contains("General"));
    assert_eq!(email.unique_tag, Some("m30".to_string()));
  }

  #[test]
  fn quote_and_mention_emails_name_the_action() {
    let quoted = notification_email(
      "bob",
      SensitiveString::from("bob@example.com"),
      TopicId(7),
      PostId(21),
      NotificationEmail::Quoted {
        subject: "Weekly sync",
        body: "As bob said.",
        poster: "alice",
        posted_at: "Mar 01, 2026, 10:15 AM",
      },
      &test_settings(),
    );
    let mentioned = notification_email(
      "bob",
      SensitiveString::from("bob@example.com"),
      TopicId(7),
      PostId(21),
      NotificationEmail::Mentioned {
        subject: "Weekly sync",
        body: "Ask @bob about it.",
        poster: "alice",
        posted_at: "Mar 01, 2026, 10:15 AM",
      },
      &test_settings(),
    );

    assert_eq!(quoted.subject, "You have been quoted: Weekly sync");
    assert_eq!(mentioned.subject, "You have been mentioned: Weekly sync");
  }
}
