use agora_db::source::{member::Member, post::Post};
use agora_utils::{
  error::AgoraResult,
  utils::markup::{censor_text, plain_text_from_html},
};
use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use std::{collections::HashMap, fmt::Write};

/// Renders raw post markup into html. The forum brings its own markup
/// language, the pipeline only depends on this seam.
pub trait MarkupRenderer: Send + Sync {
  fn to_html(&self, body: &str) -> String;
}

/// The rendering inputs that differ between members. Members sharing a key
/// share one rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocaleKey {
  pub language: String,
  pub time_offset: i32,
  pub time_format: String,
}

impl LocaleKey {
  pub fn for_member(member: &Member) -> LocaleKey {
    LocaleKey {
      language: member.language.clone(),
      time_offset: member.time_offset,
      time_format: member.time_format.clone(),
    }
  }
}

/// One post rendered for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
  pub subject: String,
  pub body: String,
  pub posted_at: String,
}

/// Caches rendered messages per locale for the duration of one job.
#[derive(Default)]
pub struct MessageCache {
  rendered: HashMap<LocaleKey, RenderedMessage>,
  renders: usize,
}

impl MessageCache {
  pub fn new() -> MessageCache {
    MessageCache::default()
  }

  /// How many distinct renders this cache has performed.
  pub fn renders(&self) -> usize {
    self.renders
  }

  /// The post rendered for one locale, reusing an earlier render of the same
  /// locale when there is one.
  pub fn render(
    &mut self,
    key: LocaleKey,
    post: &Post,
    renderer: &dyn MarkupRenderer,
    censored_words: &[String],
  ) -> AgoraResult<RenderedMessage> {
    if let Some(message) = self.rendered.get(&key) {
      return Ok(message.clone());
    }
    let html = renderer.to_html(&post.body);
    let body = censor_text(&plain_text_from_html(&html)?, censored_words);
    let subject = censor_text(&post.subject, censored_words);
    let posted_at = format_local_time(post.published_at, key.time_offset, &key.time_format);
    let message = RenderedMessage {
      subject,
      body,
      posted_at,
    };
    self.rendered.insert(key, message.clone());
    self.renders += 1;
    Ok(message)
  }
}

/// Formats a UTC time in the member's timezone and preferred format. A
/// malformed format string falls back to rfc 2822.
fn format_local_time(time: DateTime<Utc>, offset_hours: i32, format: &str) -> String {
  let offset = FixedOffset::east_opt(offset_hours.saturating_mul(3600)).unwrap_or(Utc.fix());
  let local = time.with_timezone(&offset);
  let mut formatted = String::new();
  match write!(formatted, "{}", local.format(format)) {
    Ok(()) => formatted,
    Err(_) => local.to_rfc2822(),
  }
}
