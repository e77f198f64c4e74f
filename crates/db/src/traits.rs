use crate::{
  enums::AlertAction,
  newtypes::{BoardId, MemberId, PostId, TaskId, TopicId},
  source::{
    alert::{Alert, AlertInsertForm},
    board::{Board, BoardGroupAccess},
    member::{Member, NotifyPrefs},
    post::Post,
    task::{QueuedTask, QueuedTaskForm},
    watch::Watcher,
  },
};
use agora_utils::error::AgoraResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Member profile lookups.
#[async_trait]
pub trait MemberStore: Send + Sync {
  /// Reads full profiles, group memberships included. Unknown ids are
  /// silently dropped from the result.
  async fn read_many(&self, ids: &[MemberId]) -> AgoraResult<Vec<Member>>;

  /// Resolves display names to ids, silently skipping unknown names.
  async fn ids_by_names(&self, names: &[String]) -> AgoraResult<Vec<MemberId>>;
}

#[async_trait]
pub trait BoardStore: Send + Sync {
  async fn read(&self, id: BoardId) -> AgoraResult<Option<Board>>;

  /// The raw access list of a board, one row per group with access defined.
  async fn access_groups(&self, id: BoardId) -> AgoraResult<Vec<BoardGroupAccess>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
  async fn read(&self, id: PostId) -> AgoraResult<Option<Post>>;
}

/// Watch subscriptions with their members joined in.
#[async_trait]
pub trait WatchStore: Send + Sync {
  /// Everyone watching the topic or its board.
  async fn watchers_for(&self, topic_id: TopicId, board_id: BoardId)
    -> AgoraResult<Vec<Watcher>>;

  /// Marks the given members' watch rows on this topic or board as sent.
  async fn mark_sent(
    &self,
    topic_id: TopicId,
    board_id: BoardId,
    member_ids: &HashSet<MemberId>,
  ) -> AgoraResult<()>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
  /// Message notification preferences for each requested member, with the
  /// site defaults filled in where a member has no explicit row.
  async fn message_notify_prefs(
    &self,
    ids: &[MemberId],
  ) -> AgoraResult<HashMap<MemberId, NotifyPrefs>>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
  /// Inserts all rows in one batch, returning how many were written.
  async fn create_batch(&self, forms: Vec<AlertInsertForm>) -> AgoraResult<usize>;

  /// Members holding an alert of this action for the post.
  async fn alerted_members(
    &self,
    post_id: PostId,
    action: AlertAction,
  ) -> AgoraResult<HashSet<MemberId>>;

  /// Deletes the post's alerts restricted to the given members, per action.
  /// Returns how many rows went away.
  async fn delete_for_members(
    &self,
    post_id: PostId,
    stale: &[(AlertAction, HashSet<MemberId>)],
  ) -> AgoraResult<usize>;

  /// Every alert of a member, newest first.
  async fn list_for_member(&self, member_id: MemberId) -> AgoraResult<Vec<Alert>>;
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
  async fn enqueue(&self, form: QueuedTaskForm) -> AgoraResult<QueuedTask>;

  /// Claims up to `limit` due tasks, renewing their lease to `now`. A task
  /// whose lease expires without [`TaskQueue::finish`] becomes claimable
  /// again.
  async fn claim_due(&self, now: DateTime<Utc>, limit: usize) -> AgoraResult<Vec<QueuedTask>>;

  /// Removes a finished task.
  async fn finish(&self, id: TaskId) -> AgoraResult<()>;
}

/// Everything the notification pipeline needs from storage, as one object
/// safe bundle.
pub trait Store:
  MemberStore + BoardStore + PostStore + WatchStore + PreferenceStore + AlertStore + TaskQueue
{
}

impl<T> Store for T where
  T: MemberStore + BoardStore + PostStore + WatchStore + PreferenceStore + AlertStore + TaskQueue
{
}
