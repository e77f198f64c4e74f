use crate::{
  enums::AlertAction,
  newtypes::{AlertId, BoardId, MemberId, PostId, TopicId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// An in-app alert row, shown in the recipient's alert dropdown.
pub struct Alert {
  pub id: AlertId,
  pub recipient_id: MemberId,
  /// The member whose action caused the alert.
  pub actor_id: MemberId,
  /// Snapshot of the actor's name at alert time.
  pub actor_name: String,
  pub action: AlertAction,
  pub post_id: PostId,
  pub topic_id: TopicId,
  pub board_id: BoardId,
  /// Censored subject line, shown verbatim in the dropdown.
  pub subject: String,
  pub published_at: DateTime<Utc>,
  pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct AlertInsertForm {
  pub recipient_id: MemberId,
  pub actor_id: MemberId,
  pub actor_name: String,
  pub action: AlertAction,
  pub post_id: PostId,
  pub topic_id: TopicId,
  pub board_id: BoardId,
  pub subject: String,
  #[new(default)]
  pub read: bool,
}
