#![allow(clippy::unwrap_used)]

use crate::{context::NotifyContext, render::MarkupRenderer};
use agora_db::{
  enums::{NotifyFrequency, PostEventKind, WatchNotifyKind},
  impls::memory::MemoryStore,
  newtypes::{BoardId, GroupId, MemberId, PostId, TopicId},
  source::{
    board::{Board, BoardGroupAccess},
    member::{Member, NotifyMethods, NotifyPrefs},
    post::Post,
    task::PostNotifyPayload,
    watch::{Watch, WatchTarget},
  },
};
use agora_email::send::{Mailer, OutboundEmail};
use agora_utils::{
  error::{AgoraErrorType, AgoraResult},
  settings::structs::Settings,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::{
  collections::HashSet,
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
    Mutex,
  },
};

pub(crate) const TEST_BOARD: BoardId = BoardId(3);
pub(crate) const TEST_TOPIC: TopicId = TopicId(7);
pub(crate) const TEST_POST: PostId = PostId(21);
pub(crate) const ACTOR: MemberId = MemberId(1);

/// A mailer that keeps what it was asked to send, optionally refusing
/// everything.
#[derive(Default)]
pub(crate) struct RecordingMailer {
  sent: Mutex<Vec<OutboundEmail>>,
  fail: AtomicBool,
}

impl RecordingMailer {
  pub(crate) fn sent(&self) -> Vec<OutboundEmail> {
    self.sent.lock().unwrap().clone()
  }

  pub(crate) fn recipients(&self) -> Vec<String> {
    self
      .sent()
      .into_iter()
      .map(|email| email.to_email.into_inner())
      .collect()
  }

  pub(crate) fn set_failing(&self, fail: bool) {
    self.fail.store(fail, Ordering::Relaxed);
  }
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, email: &OutboundEmail) -> AgoraResult<()> {
    if self.fail.load(Ordering::Relaxed) {
      return Err(AgoraErrorType::EmailSendFailed.into());
    }
    self.sent.lock().unwrap().push(email.clone());
    Ok(())
  }
}

/// Wraps bodies in a paragraph tag and counts how often it ran.
#[derive(Default)]
pub(crate) struct CountingRenderer {
  renders: AtomicUsize,
}

impl CountingRenderer {
  pub(crate) fn renders(&self) -> usize {
    self.renders.load(Ordering::Relaxed)
  }
}

impl MarkupRenderer for CountingRenderer {
  fn to_html(&self, body: &str) -> String {
    self.renders.fetch_add(1, Ordering::Relaxed);
    format!("<p>{body}</p>")
  }
}

pub(crate) struct TestBed {
  pub(crate) store: Arc<MemoryStore>,
  pub(crate) mailer: Arc<RecordingMailer>,
  pub(crate) renderer: Arc<CountingRenderer>,
  pub(crate) context: NotifyContext,
}

impl TestBed {
  /// An empty forum with the standard board and the posting member seeded.
  pub(crate) async fn create() -> TestBed {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let renderer = Arc::new(CountingRenderer::default());
    let settings = Settings {
      hostname: "forum.example.com".to_string(),
      ..Settings::default()
    };
    let context = NotifyContext::create_with_settings(
      store.clone(),
      mailer.clone(),
      renderer.clone(),
      settings,
    );
    store
      .add_board(Board {
        id: TEST_BOARD,
        name: "General".to_string(),
      })
      .await;
    store
      .add_board_access(BoardGroupAccess {
        board_id: TEST_BOARD,
        group_id: GroupId(4),
        deny: false,
      })
      .await;
    store.add_member(member(ACTOR.0, "alice")).await;
    TestBed {
      store,
      mailer,
      renderer,
      context,
    }
  }
}

pub(crate) fn member(id: i32, name: &str) -> Member {
  Member {
    id: MemberId(id),
    name: name.to_string(),
    email: Some(format!("{name}@example.com").into()),
    groups: vec![GroupId(4)],
    muted_members: Vec::new(),
    language: "en".to_string(),
    time_offset: 0,
    time_format: "%b %d, %Y, %H:%M".to_string(),
  }
}

pub(crate) fn prefs(alert: bool, email: bool, frequency: NotifyFrequency) -> NotifyPrefs {
  NotifyPrefs {
    methods: NotifyMethods::new(alert, email),
    frequency,
    watched: WatchNotifyKind::AllActivity,
  }
}

pub(crate) fn topic_watch(member_id: i32, sent: bool) -> Watch {
  Watch {
    member_id: MemberId(member_id),
    target: WatchTarget::Topic(TEST_TOPIC),
    sent,
  }
}

pub(crate) fn board_watch(member_id: i32, sent: bool) -> Watch {
  Watch {
    member_id: MemberId(member_id),
    target: WatchTarget::Board(TEST_BOARD),
    sent,
  }
}

pub(crate) fn post_published_at(published_at: DateTime<Utc>) -> Post {
  Post {
    id: TEST_POST,
    topic_id: TEST_TOPIC,
    board_id: TEST_BOARD,
    creator_id: ACTOR,
    subject: "Weekly sync notes".to_string(),
    body: "Thanks everyone, back to it next week.".to_string(),
    published_at,
    updated_at: None,
  }
}

/// A post old enough that the quote and mention hold back window has passed.
pub(crate) fn settled_post() -> Post {
  post_published_at(Utc::now() - Duration::seconds(900))
}

/// A post fresh enough that quote and mention emails are still held back.
pub(crate) fn fresh_post() -> Post {
  post_published_at(Utc::now())
}

pub(crate) fn payload(post: &Post, kind: PostEventKind) -> PostNotifyPayload {
  PostNotifyPayload {
    post_id: post.id,
    topic_id: post.topic_id,
    board_id: post.board_id,
    actor_id: ACTOR,
    actor_name: "alice".to_string(),
    kind,
    respawns: 0,
    mention_mail_time: post.published_at + Duration::seconds(300),
    quoted_members: HashSet::new(),
    mentioned_members: HashSet::new(),
    members_only: HashSet::new(),
    modified_at: None,
  }
}

pub(crate) fn member_set(ids: &[i32]) -> HashSet<MemberId> {
  ids.iter().copied().map(MemberId).collect()
}
