use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
  EnumString, Display, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Hash,
)]
/// What changed about a post. Decides which member classes get notified.
pub enum PostEventKind {
  /// A new topic was started. Notifies board watchers.
  NewTopic,
  /// A reply was posted to an existing topic. Notifies topic watchers.
  #[default]
  Reply,
  /// An existing post was edited. Only quoted and mentioned members are
  /// considered, watchers are never re-notified for an edit.
  Edit,
}

#[derive(
  EnumString, Display, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Hash,
)]
/// How often a member wants to be emailed about watched content.
pub enum NotifyFrequency {
  /// An email for every new message.
  #[default]
  Immediate,
  /// Only the first unread message, nothing further until the member visits
  /// the topic again.
  FirstUnread,
  /// No individual emails, the message is rolled into a daily digest.
  DailyDigest,
  /// No individual emails, the message is rolled into a weekly digest.
  WeeklyDigest,
  /// No emails at all.
  Never,
}

#[derive(
  EnumString, Display, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Hash,
)]
/// Which kinds of watched activity a member wants to hear about.
pub enum WatchNotifyKind {
  /// Replies and new topics.
  #[default]
  AllActivity,
  /// Moderation actions only, such as locks and removals. Post events never
  /// match this.
  ModerationOnly,
  /// Nothing.
  Nothing,
}

#[derive(
  EnumString, Display, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Hash,
)]
/// The action an alert row describes.
pub enum AlertAction {
  /// A new topic in a watched board.
  Topic,
  /// A reply in a watched topic.
  #[default]
  Reply,
  /// The recipient was quoted.
  Quote,
  /// The recipient was mentioned.
  Mention,
}

#[derive(
  EnumString, Display, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Hash,
)]
/// Queueing priority for outbound mail.
pub enum MailPriority {
  High,
  #[default]
  Normal,
  Low,
}
