use crate::{
  newtypes::{BoardId, MemberId, TopicId},
  source::member::Member,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// What a watch subscription is attached to.
pub enum WatchTarget {
  Topic(TopicId),
  Board(BoardId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A watch subscription.
pub struct Watch {
  pub member_id: MemberId,
  pub target: WatchTarget,
  /// Set once the member has been emailed for this watch, cleared when they
  /// visit the topic or board again. While it is set no further watch emails
  /// go out, and the first-unread frequency skips the member entirely.
  pub sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A watch joined with its member profile, the shape one fan-out round loads.
pub struct Watcher {
  pub watch: Watch,
  pub member: Member,
}
