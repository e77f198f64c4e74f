use crate::{
  enums::PostEventKind,
  newtypes::{BoardId, MemberId, PostId, TaskId, TopicId},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumString};

/// How long a queue claim lasts before another worker may take the row over.
/// Scheduling a task for a future run time stores `run_at - CLAIM_TIMEOUT` as
/// the claim marker, which makes the row claimable exactly at `run_at`.
pub const CLAIM_TIMEOUT_SECONDS: i64 = 300;

#[derive(EnumString, Display, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
/// Discriminant routing a queued payload to its registered handler.
pub enum TaskKind {
  PostNotify,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", content = "data", rename_all = "snake_case")]
/// The typed payload of a queued background task.
pub enum TaskPayload {
  PostNotify(PostNotifyPayload),
}

impl TaskPayload {
  pub fn kind(&self) -> TaskKind {
    match self {
      TaskPayload::PostNotify(_) => TaskKind::PostNotify,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Everything a post notification round needs, carried across respawns.
pub struct PostNotifyPayload {
  pub post_id: PostId,
  pub topic_id: TopicId,
  pub board_id: BoardId,
  pub actor_id: MemberId,
  /// Snapshot of the actor's name, used in alerts and email subjects.
  pub actor_name: String,
  pub kind: PostEventKind,
  /// How many times this job has been re-enqueued.
  #[serde(default)]
  pub respawns: u8,
  /// Earliest wall-clock time quote and mention emails may go out.
  pub mention_mail_time: DateTime<Utc>,
  /// Quoted members whose notifications are still owed.
  #[serde(default)]
  pub quoted_members: HashSet<MemberId>,
  /// Mentioned members whose notifications are still owed.
  #[serde(default)]
  pub mentioned_members: HashSet<MemberId>,
  /// When non-empty, only these members may be notified.
  #[serde(default)]
  pub members_only: HashSet<MemberId>,
  /// The post modification time this job was created for. A newer stored
  /// time means another job has superseded this one.
  #[serde(default)]
  pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A row in the background task queue.
pub struct QueuedTask {
  pub id: TaskId,
  pub payload: TaskPayload,
  /// Claim lease marker, see [`CLAIM_TIMEOUT_SECONDS`].
  pub claimed_at: DateTime<Utc>,
}

impl QueuedTask {
  /// The wall-clock time at which the row becomes claimable.
  pub fn runnable_at(&self) -> DateTime<Utc> {
    self.claimed_at + Duration::seconds(CLAIM_TIMEOUT_SECONDS)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTaskForm {
  pub payload: TaskPayload,
  pub claimed_at: DateTime<Utc>,
}

impl QueuedTaskForm {
  /// A task claimable right away.
  pub fn immediate(payload: TaskPayload) -> Self {
    QueuedTaskForm {
      payload,
      claimed_at: DateTime::UNIX_EPOCH,
    }
  }

  /// A task claimable once `run_at` has passed.
  pub fn deferred(payload: TaskPayload, run_at: DateTime<Utc>) -> Self {
    let claimed_at =
      (run_at - Duration::seconds(CLAIM_TIMEOUT_SECONDS)).max(DateTime::UNIX_EPOCH);
    QueuedTaskForm { payload, claimed_at }
  }
}
