use crate::{
  enums::AlertAction,
  newtypes::{AlertId, BoardId, MemberId, PostId, TaskId, TopicId},
  source::{
    alert::{Alert, AlertInsertForm},
    board::{Board, BoardGroupAccess},
    member::{Member, NotifyPrefs},
    post::Post,
    task::{QueuedTask, QueuedTaskForm, CLAIM_TIMEOUT_SECONDS},
    watch::{Watch, WatchTarget, Watcher},
  },
  traits::{
    AlertStore,
    BoardStore,
    MemberStore,
    PostStore,
    PreferenceStore,
    TaskQueue,
    WatchStore,
  },
};
use agora_utils::error::AgoraResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::{
  collections::{HashMap, HashSet},
  sync::atomic::{AtomicI32, Ordering},
};
use tokio::sync::RwLock;

/// In-memory implementation of every store trait, used as the test backend
/// and for embedding without an external database.
#[derive(Default)]
pub struct MemoryStore {
  members: RwLock<HashMap<MemberId, Member>>,
  prefs: RwLock<HashMap<MemberId, NotifyPrefs>>,
  boards: RwLock<HashMap<BoardId, Board>>,
  board_access: RwLock<Vec<BoardGroupAccess>>,
  posts: RwLock<HashMap<PostId, Post>>,
  watches: RwLock<Vec<Watch>>,
  alerts: RwLock<Vec<Alert>>,
  tasks: RwLock<Vec<QueuedTask>>,
  next_alert_id: AtomicI32,
  next_task_id: AtomicI32,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn add_member(&self, member: Member) {
    self.members.write().await.insert(member.id, member);
  }

  pub async fn set_prefs(&self, member_id: MemberId, prefs: NotifyPrefs) {
    self.prefs.write().await.insert(member_id, prefs);
  }

  pub async fn add_board(&self, board: Board) {
    self.boards.write().await.insert(board.id, board);
  }

  pub async fn add_board_access(&self, access: BoardGroupAccess) {
    self.board_access.write().await.push(access);
  }

  pub async fn add_post(&self, post: Post) {
    self.posts.write().await.insert(post.id, post);
  }

  pub async fn add_watch(&self, watch: Watch) {
    self.watches.write().await.push(watch);
  }

  /// Snapshot of all watch rows, in insertion order.
  pub async fn watches(&self) -> Vec<Watch> {
    self.watches.read().await.clone()
  }

  /// Snapshot of all alert rows, in insertion order.
  pub async fn alerts(&self) -> Vec<Alert> {
    self.alerts.read().await.clone()
  }

  /// Snapshot of all queued tasks, claimed or not.
  pub async fn tasks(&self) -> Vec<QueuedTask> {
    self.tasks.read().await.clone()
  }

  fn next_id(counter: &AtomicI32) -> i32 {
    counter.fetch_add(1, Ordering::Relaxed) + 1
  }
}

#[async_trait]
impl MemberStore for MemoryStore {
  async fn read_many(&self, ids: &[MemberId]) -> AgoraResult<Vec<Member>> {
    let members = self.members.read().await;
    Ok(ids.iter().filter_map(|id| members.get(id).cloned()).collect())
  }

  async fn ids_by_names(&self, names: &[String]) -> AgoraResult<Vec<MemberId>> {
    let members = self.members.read().await;
    Ok(
      names
        .iter()
        .filter_map(|name| {
          members
            .values()
            .find(|member| member.name.eq_ignore_ascii_case(name))
            .map(|member| member.id)
        })
        .collect(),
    )
  }
}

#[async_trait]
impl BoardStore for MemoryStore {
  async fn read(&self, id: BoardId) -> AgoraResult<Option<Board>> {
    Ok(self.boards.read().await.get(&id).cloned())
  }

  async fn access_groups(&self, id: BoardId) -> AgoraResult<Vec<BoardGroupAccess>> {
    Ok(
      self
        .board_access
        .read()
        .await
        .iter()
        .filter(|access| access.board_id == id)
        .copied()
        .collect(),
    )
  }
}

#[async_trait]
impl PostStore for MemoryStore {
  async fn read(&self, id: PostId) -> AgoraResult<Option<Post>> {
    Ok(self.posts.read().await.get(&id).cloned())
  }
}

#[async_trait]
impl WatchStore for MemoryStore {
  async fn watchers_for(
    &self,
    topic_id: TopicId,
    board_id: BoardId,
  ) -> AgoraResult<Vec<Watcher>> {
    let members = self.members.read().await;
    let watches = self.watches.read().await;
    Ok(
      watches
        .iter()
        .filter(|watch| match watch.target {
          WatchTarget::Topic(topic) => topic == topic_id,
          WatchTarget::Board(board) => board == board_id,
        })
        .filter_map(|watch| {
          members.get(&watch.member_id).map(|member| Watcher {
            watch: watch.clone(),
            member: member.clone(),
          })
        })
        .collect(),
    )
  }

  async fn mark_sent(
    &self,
    topic_id: TopicId,
    board_id: BoardId,
    member_ids: &HashSet<MemberId>,
  ) -> AgoraResult<()> {
    let mut watches = self.watches.write().await;
    for watch in &mut *watches {
      let on_target = match watch.target {
        WatchTarget::Topic(topic) => topic == topic_id,
        WatchTarget::Board(board) => board == board_id,
      };
      if on_target && member_ids.contains(&watch.member_id) {
        watch.sent = true;
      }
    }
    Ok(())
  }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
  async fn message_notify_prefs(
    &self,
    ids: &[MemberId],
  ) -> AgoraResult<HashMap<MemberId, NotifyPrefs>> {
    let prefs = self.prefs.read().await;
    Ok(
      ids
        .iter()
        .map(|id| (*id, prefs.get(id).copied().unwrap_or_default()))
        .collect(),
    )
  }
}

#[async_trait]
impl AlertStore for MemoryStore {
  async fn create_batch(&self, forms: Vec<AlertInsertForm>) -> AgoraResult<usize> {
    let mut alerts = self.alerts.write().await;
    let count = forms.len();
    let now = Utc::now();
    for form in forms {
      alerts.push(Alert {
        id: AlertId(Self::next_id(&self.next_alert_id)),
        recipient_id: form.recipient_id,
        actor_id: form.actor_id,
        actor_name: form.actor_name,
        action: form.action,
        post_id: form.post_id,
        topic_id: form.topic_id,
        board_id: form.board_id,
        subject: form.subject,
        published_at: now,
        read: form.read,
      });
    }
    Ok(count)
  }

  async fn alerted_members(
    &self,
    post_id: PostId,
    action: AlertAction,
  ) -> AgoraResult<HashSet<MemberId>> {
    Ok(
      self
        .alerts
        .read()
        .await
        .iter()
        .filter(|alert| alert.post_id == post_id && alert.action == action)
        .map(|alert| alert.recipient_id)
        .collect(),
    )
  }

  async fn delete_for_members(
    &self,
    post_id: PostId,
    stale: &[(AlertAction, HashSet<MemberId>)],
  ) -> AgoraResult<usize> {
    let mut alerts = self.alerts.write().await;
    let before = alerts.len();
    alerts.retain(|alert| {
      alert.post_id != post_id
        || !stale
          .iter()
          .any(|(action, members)| *action == alert.action && members.contains(&alert.recipient_id))
    });
    Ok(before - alerts.len())
  }

  async fn list_for_member(&self, member_id: MemberId) -> AgoraResult<Vec<Alert>> {
    let mut rows: Vec<Alert> = self
      .alerts
      .read()
      .await
      .iter()
      .filter(|alert| alert.recipient_id == member_id)
      .cloned()
      .collect();
    rows.reverse();
    Ok(rows)
  }
}

#[async_trait]
impl TaskQueue for MemoryStore {
  async fn enqueue(&self, form: QueuedTaskForm) -> AgoraResult<QueuedTask> {
    let task = QueuedTask {
      id: TaskId(Self::next_id(&self.next_task_id)),
      payload: form.payload,
      claimed_at: form.claimed_at,
    };
    self.tasks.write().await.push(task.clone());
    Ok(task)
  }

  async fn claim_due(&self, now: DateTime<Utc>, limit: usize) -> AgoraResult<Vec<QueuedTask>> {
    let mut tasks = self.tasks.write().await;
    let cutoff = now - Duration::seconds(CLAIM_TIMEOUT_SECONDS);
    let mut claimed = Vec::new();
    for task in &mut *tasks {
      if claimed.len() >= limit {
        break;
      }
      if task.claimed_at <= cutoff {
        task.claimed_at = now;
        claimed.push(task.clone());
      }
    }
    Ok(claimed)
  }

  async fn finish(&self, id: TaskId) -> AgoraResult<()> {
    self.tasks.write().await.retain(|task| task.id != id);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  #![allow(clippy::unwrap_used)]

  use super::*;
  use crate::{
    enums::PostEventKind,
    newtypes::GroupId,
    sensitive::SensitiveString,
    source::{
      member::NotifyMethods,
      task::{PostNotifyPayload, TaskPayload},
    },
  };
  use pretty_assertions::assert_eq;

  fn test_member(id: i32, name: &str) -> Member {
    Member {
      id: MemberId(id),
      name: name.to_string(),
      email: Some(SensitiveString::from(format!("{name}@example.com"))),
      groups: vec![GroupId(4)],
      muted_members: Vec::new(),
      language: "english".to_string(),
      time_offset: 0,
      time_format: "%b %d, %Y, %I:%M %p".to_string(),
    }
  }

  fn test_payload() -> TaskPayload {
    TaskPayload::PostNotify(PostNotifyPayload {
      post_id: PostId(1),
      topic_id: TopicId(1),
      board_id: BoardId(1),
      actor_id: MemberId(1),
      actor_name: "poster".to_string(),
      kind: PostEventKind::Reply,
      respawns: 0,
      mention_mail_time: Utc::now(),
      quoted_members: HashSet::new(),
      mentioned_members: HashSet::new(),
      members_only: HashSet::new(),
      modified_at: None,
    })
  }

  fn alert_form(recipient: i32, action: AlertAction, post: i32) -> AlertInsertForm {
    AlertInsertForm::new(
      MemberId(recipient),
      MemberId(99),
      "poster".to_string(),
      action,
      PostId(post),
      TopicId(1),
      BoardId(1),
      "Subject".to_string(),
    )
  }

  #[tokio::test]
  async fn watchers_join_topic_and_board_rows() {
    let store = MemoryStore::new();
    store.add_member(test_member(1, "alice")).await;
    store.add_member(test_member(2, "bob")).await;
    store
      .add_watch(Watch {
        member_id: MemberId(1),
        target: WatchTarget::Topic(TopicId(7)),
        sent: false,
      })
      .await;
    store
      .add_watch(Watch {
        member_id: MemberId(2),
        target: WatchTarget::Board(BoardId(3)),
        sent: false,
      })
      .await;
    store
      .add_watch(Watch {
        member_id: MemberId(1),
        target: WatchTarget::Topic(TopicId(8)),
        sent: false,
      })
      .await;
    // Watch row without a member profile behind it.
    store
      .add_watch(Watch {
        member_id: MemberId(9),
        target: WatchTarget::Topic(TopicId(7)),
        sent: false,
      })
      .await;

    let watchers = store.watchers_for(TopicId(7), BoardId(3)).await.unwrap();
    let ids: Vec<MemberId> = watchers.iter().map(|w| w.member.id).collect();
    assert_eq!(ids, vec![MemberId(1), MemberId(2)]);
  }

  #[tokio::test]
  async fn mark_sent_flips_only_named_rows() {
    let store = MemoryStore::new();
    for id in [1, 2] {
      store
        .add_watch(Watch {
          member_id: MemberId(id),
          target: WatchTarget::Topic(TopicId(7)),
          sent: false,
        })
        .await;
    }

    let emailed = HashSet::from([MemberId(1)]);
    store.mark_sent(TopicId(7), BoardId(3), &emailed).await.unwrap();

    let sent: Vec<bool> = store.watches().await.iter().map(|w| w.sent).collect();
    assert_eq!(sent, vec![true, false]);
  }

  #[tokio::test]
  async fn names_resolve_case_insensitively() {
    let store = MemoryStore::new();
    store.add_member(test_member(5, "Alice")).await;

    let ids = store
      .ids_by_names(&["alice".to_string(), "nobody".to_string()])
      .await
      .unwrap();
    assert_eq!(ids, vec![MemberId(5)]);
  }

  #[tokio::test]
  async fn missing_pref_rows_fall_back_to_defaults() {
    let store = MemoryStore::new();
    let custom = NotifyPrefs {
      methods: NotifyMethods::new(true, true),
      ..Default::default()
    };
    store.set_prefs(MemberId(1), custom).await;

    let prefs = store
      .message_notify_prefs(&[MemberId(1), MemberId(2)])
      .await
      .unwrap();
    assert_eq!(prefs.get(&MemberId(1)).unwrap(), &custom);
    assert_eq!(prefs.get(&MemberId(2)).unwrap(), &NotifyPrefs::default());
  }

  #[tokio::test]
  async fn stale_alerts_are_deleted_per_action() {
    let store = MemoryStore::new();
    store
      .create_batch(vec![
        alert_form(1, AlertAction::Quote, 5),
        alert_form(1, AlertAction::Mention, 5),
        alert_form(2, AlertAction::Quote, 5),
        alert_form(1, AlertAction::Quote, 6),
      ])
      .await
      .unwrap();

    let stale = vec![(AlertAction::Quote, HashSet::from([MemberId(1)]))];
    let deleted = store.delete_for_members(PostId(5), &stale).await.unwrap();
    assert_eq!(deleted, 1);

    let quoted = store
      .alerted_members(PostId(5), AlertAction::Quote)
      .await
      .unwrap();
    assert_eq!(quoted, HashSet::from([MemberId(2)]));
    // The mention alert and the other post's alert survive.
    assert_eq!(store.list_for_member(MemberId(1)).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn deferred_tasks_stay_invisible_until_due() {
    let store = MemoryStore::new();
    let now = Utc::now();
    store
      .enqueue(QueuedTaskForm::immediate(test_payload()))
      .await
      .unwrap();
    store
      .enqueue(QueuedTaskForm::deferred(
        test_payload(),
        now + Duration::seconds(600),
      ))
      .await
      .unwrap();

    let first = store.claim_due(now, 10).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first.first().unwrap().id, TaskId(1));
    store.finish(TaskId(1)).await.unwrap();

    let later = store.claim_due(now + Duration::seconds(600), 10).await.unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later.first().unwrap().id, TaskId(2));
  }

  #[tokio::test]
  async fn claiming_renews_the_lease() {
    let store = MemoryStore::new();
    let now = Utc::now();
    store
      .enqueue(QueuedTaskForm::immediate(test_payload()))
      .await
      .unwrap();

    assert_eq!(store.claim_due(now, 10).await.unwrap().len(), 1);
    // Claimed a second ago, so the lease still holds.
    assert!(store
      .claim_due(now + Duration::seconds(1), 10)
      .await
      .unwrap()
      .is_empty());
    // Once the lease expires the task shows up again.
    let reclaim_at = now + Duration::seconds(CLAIM_TIMEOUT_SECONDS);
    assert_eq!(store.claim_due(reclaim_at, 10).await.unwrap().len(), 1);

    store.finish(TaskId(1)).await.unwrap();
    assert!(store
      .claim_due(reclaim_at + Duration::seconds(600), 10)
      .await
      .unwrap()
      .is_empty());
  }
}
