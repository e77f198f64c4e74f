use crate::newtypes::{BoardId, MemberId, PostId, TopicId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single message in a topic.
pub struct Post {
  pub id: PostId,
  pub topic_id: TopicId,
  pub board_id: BoardId,
  pub creator_id: MemberId,
  pub subject: String,
  /// Raw body as the member wrote it, before any markup rendering.
  pub body: String,
  pub published_at: DateTime<Utc>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
  /// The time of the most recent change to the post.
  pub fn last_modified_at(&self) -> DateTime<Utc> {
    self.updated_at.unwrap_or(self.published_at)
  }
}
