use crate::{
  context::NotifyContext,
  eligibility::PermissionSet,
  render::{LocaleKey, MessageCache},
};
use agora_db::{
  enums::{AlertAction, NotifyFrequency, PostEventKind, WatchNotifyKind},
  newtypes::MemberId,
  sensitive::SensitiveString,
  source::{
    alert::AlertInsertForm,
    board::Board,
    member::{Member, NotifyPrefs},
    post::Post,
    task::{PostNotifyPayload, QueuedTask, QueuedTaskForm, TaskPayload},
    watch::Watcher,
  },
  traits::{AlertStore, BoardStore, MemberStore, PostStore, PreferenceStore, TaskQueue, WatchStore},
};
use agora_email::notifications::{notification_email, NotificationEmail};
use agora_utils::{
  error::{AgoraErrorExt2, AgoraErrorType, AgoraResult},
  utils::{
    markup::censor_text,
    mention::{scrape_text_for_mentions, scrape_text_for_quoted_authors},
  },
};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, warn};

mod cleanup;
mod respawn;

/// The member classes one fan-out round works through, in the order they
/// claim recipients. A member quoted and watching gets the quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
  Quoted,
  Mentioned,
  Watching,
}

impl Channel {
  fn action(self, kind: PostEventKind) -> AlertAction {
    match self {
      Channel::Quoted => AlertAction::Quote,
      Channel::Mentioned => AlertAction::Mention,
      Channel::Watching => match kind {
        PostEventKind::NewTopic => AlertAction::Topic,
        _ => AlertAction::Reply,
      },
    }
  }
}

/// Why a member was passed over, in the order the conditions are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
  AlreadyDone,
  MutedActor,
  UnwantedKind,
  IsActor,
  DigestFrequency,
  AlreadySentFirstUnread,
  NotInAllowList,
}

/// Working state of one fan-out round.
struct JobRun<'a> {
  context: &'a NotifyContext,
  post: Post,
  board: Board,
  payload: PostNotifyPayload,
  permissions: PermissionSet,
  prefs: HashMap<MemberId, NotifyPrefs>,
  /// Watchers who may see the board, drained by the watcher channel.
  watchers: Vec<Watcher>,
  watcher_ids: HashSet<MemberId>,
  now: DateTime<Utc>,
  alert_subject: String,
  /// Members a channel has already claimed this round.
  done: HashSet<MemberId>,
  /// Members whose email went out this round, flushed to the watch log.
  emailed: HashSet<MemberId>,
  /// Watchers whose email is still owed after this round.
  email_pending: HashSet<MemberId>,
  carry_quoted: HashSet<MemberId>,
  carry_mentioned: HashSet<MemberId>,
  alert_rows: Vec<AlertInsertForm>,
  cache: MessageCache,
}

/// Runs one post notification round: claims the post's quoted, mentioned and
/// watching members in that order, writes their alerts in one batch, emails
/// whoever wants email, and re-enqueues itself when anything is still owed.
#[tracing::instrument(skip_all, fields(post_id = %payload.post_id, kind = %payload.kind, respawns = payload.respawns))]
pub async fn execute(payload: PostNotifyPayload, context: &NotifyContext) -> AgoraResult<()> {
  let store = context.store();

  let Some(post) = PostStore::read(store, payload.post_id).await? else {
    error!("Post {} in notification job no longer exists", payload.post_id);
    return Ok(());
  };
  let Some(board) = BoardStore::read(store, payload.board_id).await? else {
    error!("Board {} in notification job no longer exists", payload.board_id);
    return Ok(());
  };

  // A newer edit has its own job with fresher relation sets.
  if payload.kind == PostEventKind::Edit {
    if let Some(expected) = payload.modified_at {
      if post.last_modified_at() > expected {
        debug!("Notification job for post {} was superseded by a newer edit", payload.post_id);
        return Ok(());
      }
    }
  }

  let permissions = PermissionSet::load(&store.access_groups(board.id).await?);

  let watchers: Vec<Watcher> = if payload.kind == PostEventKind::Edit {
    Vec::new()
  } else {
    store
      .watchers_for(payload.topic_id, payload.board_id)
      .await?
      .into_iter()
      .filter(|watcher| permissions.allows(&watcher.member.groups))
      .collect()
  };
  let watcher_ids: HashSet<MemberId> = watchers.iter().map(|watcher| watcher.member.id).collect();

  let mut candidate_ids = watcher_ids.clone();
  candidate_ids.extend(payload.quoted_members.iter().copied());
  candidate_ids.extend(payload.mentioned_members.iter().copied());
  let candidate_ids: Vec<MemberId> = candidate_ids.into_iter().collect();
  let prefs = store.message_notify_prefs(&candidate_ids).await?;

  let alert_subject = censor_text(&post.subject, &context.settings().notifications.censored_words);

  let mut run = JobRun {
    context,
    post,
    board,
    payload,
    permissions,
    prefs,
    watchers,
    watcher_ids,
    now: Utc::now(),
    alert_subject,
    done: HashSet::new(),
    emailed: HashSet::new(),
    email_pending: HashSet::new(),
    carry_quoted: HashSet::new(),
    carry_mentioned: HashSet::new(),
    alert_rows: Vec::new(),
    cache: MessageCache::new(),
  };

  if run.payload.kind == PostEventKind::Edit {
    let removed = cleanup::remove_stale_alerts(
      context,
      run.payload.post_id,
      &run.payload.quoted_members,
      &run.payload.mentioned_members,
    )
    .await?;
    if removed > 0 {
      debug!("Removed {removed} alerts made stale by the edit of post {}", run.payload.post_id);
    }
  }

  run.notify_quoted().await?;
  run.notify_mentioned().await?;
  run.notify_watchers().await?;
  run.finish().await
}

impl JobRun<'_> {
  async fn notify_quoted(&mut self) -> AgoraResult<()> {
    let ids: Vec<MemberId> = self.payload.quoted_members.iter().copied().collect();
    self.notify_carried(Channel::Quoted, ids).await
  }

  async fn notify_mentioned(&mut self) -> AgoraResult<()> {
    let ids: Vec<MemberId> = self.payload.mentioned_members.iter().copied().collect();
    self.notify_carried(Channel::Mentioned, ids).await
  }

  /// Handles the quoted and mentioned channels, whose recipients ride along
  /// in the payload and are carried forward when their turn has not come.
  async fn notify_carried(&mut self, channel: Channel, ids: Vec<MemberId>) -> AgoraResult<()> {
    if ids.is_empty() {
      return Ok(());
    }
    let store = self.context.store();
    let action = channel.action(self.payload.kind);
    let already_alerted = store.alerted_members(self.payload.post_id, action).await?;
    let members = store.read_many(&ids).await?;

    // A fresh edit round lists everyone the edited body still quotes or
    // mentions. Members already holding the alert were notified by an
    // earlier round of the original post.
    let fresh_edit = self.payload.kind == PostEventKind::Edit && self.payload.respawns == 0;

    for member in members {
      if !self.permissions.allows(&member.groups) {
        continue;
      }
      let prefs = self.member_prefs(member.id);
      if let Some(reason) = self.skip_reason(&member, &prefs, None, channel) {
        debug!("Skipping {channel:?} notification for member {}: {reason:?}", member.id);
        continue;
      }
      if fresh_edit && already_alerted.contains(&member.id) {
        continue;
      }

      // While the poster can still edit their words away, hold the whole
      // notification back, unless a watch would reach the member now anyway.
      if self.now < self.payload.mention_mail_time && !self.watcher_ids.contains(&member.id) {
        self.carry(channel, member.id);
        continue;
      }

      self.done.insert(member.id);
      if prefs.methods.alert && !already_alerted.contains(&member.id) {
        let form = self.alert_form(member.id, action);
        self.alert_rows.push(form);
      }
      if prefs.methods.email {
        let Some(to_email) = member.email.clone() else {
          debug!("Member {} wants email but has no address on file", member.id);
          continue;
        };
        match self.email_one(&member, to_email, channel).await {
          Ok(()) => {
            self.emailed.insert(member.id);
          }
          Err(e) => {
            warn!("Could not email member {} about post {}: {e}", member.id, self.payload.post_id);
            self.carry(channel, member.id);
          }
        }
      }
    }
    Ok(())
  }

  async fn notify_watchers(&mut self) -> AgoraResult<()> {
    // Edits never go back out to watchers.
    if self.payload.kind == PostEventKind::Edit {
      return Ok(());
    }
    let watchers = std::mem::take(&mut self.watchers);
    if watchers.is_empty() {
      return Ok(());
    }
    let action = Channel::Watching.action(self.payload.kind);
    let already_alerted = self
      .context
      .store()
      .alerted_members(self.payload.post_id, action)
      .await?;

    for watcher in watchers {
      let member = watcher.member;
      let prefs = self.member_prefs(member.id);
      if let Some(reason) =
        self.skip_reason(&member, &prefs, Some(watcher.watch.sent), Channel::Watching)
      {
        debug!("Skipping watch notification for member {}: {reason:?}", member.id);
        continue;
      }

      self.done.insert(member.id);
      if prefs.methods.alert && !already_alerted.contains(&member.id) {
        let form = self.alert_form(member.id, action);
        self.alert_rows.push(form);
      }
      if prefs.methods.email {
        if watcher.watch.sent {
          // Emailed since their last visit, nothing further until they return.
          continue;
        }
        let Some(to_email) = member.email.clone() else {
          debug!("Member {} wants email but has no address on file", member.id);
          continue;
        };
        match self.email_one(&member, to_email, Channel::Watching).await {
          Ok(()) => {
            self.emailed.insert(member.id);
          }
          Err(e) => {
            warn!("Could not email member {} about post {}: {e}", member.id, self.payload.post_id);
            self.carry(Channel::Watching, member.id);
          }
        }
      }
    }
    Ok(())
  }

  /// The skip conditions every channel applies, checked in a fixed order so
  /// the logged reason is the first one that matched.
  fn skip_reason(
    &self,
    member: &Member,
    prefs: &NotifyPrefs,
    watch_sent: Option<bool>,
    channel: Channel,
  ) -> Option<SkipReason> {
    if self.done.contains(&member.id) {
      return Some(SkipReason::AlreadyDone);
    }
    if member.has_muted(self.payload.actor_id) {
      return Some(SkipReason::MutedActor);
    }
    if channel == Channel::Watching && prefs.watched != WatchNotifyKind::AllActivity {
      return Some(SkipReason::UnwantedKind);
    }
    if member.id == self.payload.actor_id {
      return Some(SkipReason::IsActor);
    }
    if matches!(
      prefs.frequency,
      NotifyFrequency::Never | NotifyFrequency::DailyDigest | NotifyFrequency::WeeklyDigest
    ) {
      return Some(SkipReason::DigestFrequency);
    }
    if prefs.frequency == NotifyFrequency::FirstUnread && watch_sent == Some(true) {
      return Some(SkipReason::AlreadySentFirstUnread);
    }
    if !self.payload.members_only.is_empty() && !self.payload.members_only.contains(&member.id) {
      return Some(SkipReason::NotInAllowList);
    }
    None
  }

  fn member_prefs(&self, member_id: MemberId) -> NotifyPrefs {
    self.prefs.get(&member_id).copied().unwrap_or_default()
  }

  fn carry(&mut self, channel: Channel, member_id: MemberId) {
    match channel {
      Channel::Quoted => {
        self.carry_quoted.insert(member_id);
      }
      Channel::Mentioned => {
        self.carry_mentioned.insert(member_id);
      }
      Channel::Watching => {
        self.email_pending.insert(member_id);
      }
    }
  }

  fn alert_form(&self, recipient_id: MemberId, action: AlertAction) -> AlertInsertForm {
    AlertInsertForm::new(
      recipient_id,
      self.payload.actor_id,
      self.payload.actor_name.clone(),
      action,
      self.payload.post_id,
      self.payload.topic_id,
      self.payload.board_id,
      self.alert_subject.clone(),
    )
  }

  async fn email_one(
    &mut self,
    member: &Member,
    to_email: SensitiveString,
    channel: Channel,
  ) -> AgoraResult<()> {
    let message = self.cache.render(
      LocaleKey::for_member(member),
      &self.post,
      self.context.renderer(),
      &self.context.settings().notifications.censored_words,
    )?;
    let data = match channel {
      Channel::Quoted => NotificationEmail::Quoted {
        subject: &message.subject,
        body: &message.body,
        poster: &self.payload.actor_name,
        posted_at: &message.posted_at,
      },
      Channel::Mentioned => NotificationEmail::Mentioned {
        subject: &message.subject,
        body: &message.body,
        poster: &self.payload.actor_name,
        posted_at: &message.posted_at,
      },
      Channel::Watching => match self.payload.kind {
        PostEventKind::NewTopic => NotificationEmail::BoardTopic {
          subject: &message.subject,
          body: &message.body,
          poster: &self.payload.actor_name,
          board: &self.board.name,
          posted_at: &message.posted_at,
        },
        _ => NotificationEmail::TopicReply {
          subject: &message.subject,
          body: &message.body,
          poster: &self.payload.actor_name,
          posted_at: &message.posted_at,
        },
      },
    };
    let email = notification_email(
      &member.name,
      to_email,
      self.payload.topic_id,
      self.payload.post_id,
      data,
      self.context.settings(),
    );
    self.context.mailer().send(&email).await
  }

  /// Flushes the round: alerts in one batch, then the watch log, then the
  /// respawn decision.
  async fn finish(self) -> AgoraResult<()> {
    let JobRun {
      context,
      payload,
      emailed,
      email_pending,
      carry_quoted,
      carry_mentioned,
      alert_rows,
      ..
    } = self;
    let store = context.store();

    if !alert_rows.is_empty() {
      let written = store
        .create_batch(alert_rows)
        .await
        .with_agora_type(AgoraErrorType::CouldntCreateAlert)?;
      debug!("Wrote {written} alerts for post {}", payload.post_id);
    }
    if !emailed.is_empty() {
      store
        .mark_sent(payload.topic_id, payload.board_id, &emailed)
        .await
        .with_agora_type(AgoraErrorType::CouldntUpdateWatch)?;
    }
    if let Some(task_id) =
      respawn::respawn_if_pending(context, &payload, &email_pending, carry_quoted, carry_mentioned)
        .await?
    {
      debug!("Scheduled follow-up notification job {task_id}");
    }
    Ok(())
  }
}

/// Builds the queue payload for a new or edited post, scraping the body for
/// quoted and mentioned members.
pub async fn build_payload(
  post: &Post,
  actor: &Member,
  kind: PostEventKind,
  context: &NotifyContext,
) -> AgoraResult<PostNotifyPayload> {
  let store = context.store();
  let quoted_names = scrape_text_for_quoted_authors(&post.body);
  let mentioned_names = scrape_text_for_mentions(&post.body);
  let quoted_members: HashSet<MemberId> =
    store.ids_by_names(&quoted_names).await?.into_iter().collect();
  let mentioned_members: HashSet<MemberId> = store
    .ids_by_names(&mentioned_names)
    .await?
    .into_iter()
    .collect();
  let delay = i64::from(context.settings().notifications.mention_email_delay);

  Ok(PostNotifyPayload {
    post_id: post.id,
    topic_id: post.topic_id,
    board_id: post.board_id,
    actor_id: actor.id,
    actor_name: actor.name.clone(),
    kind,
    respawns: 0,
    mention_mail_time: post.last_modified_at() + Duration::seconds(delay),
    quoted_members,
    mentioned_members,
    members_only: HashSet::new(),
    modified_at: (kind == PostEventKind::Edit).then(|| post.last_modified_at()),
  })
}

/// Scrapes the post and queues its fan-out round, the call the composer flow
/// makes after saving a post.
pub async fn enqueue(
  post: &Post,
  actor: &Member,
  kind: PostEventKind,
  context: &NotifyContext,
) -> AgoraResult<QueuedTask> {
  let payload = build_payload(post, actor, kind, context).await?;
  context
    .store()
    .enqueue(QueuedTaskForm::immediate(TaskPayload::PostNotify(payload)))
    .await
    .with_agora_type(AgoraErrorType::CouldntEnqueueTask)
}
