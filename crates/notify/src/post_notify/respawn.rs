use crate::context::NotifyContext;
use agora_db::{
  newtypes::{MemberId, TaskId},
  source::task::{PostNotifyPayload, QueuedTaskForm, TaskPayload},
  traits::TaskQueue,
};
use agora_utils::error::{AgoraErrorExt2, AgoraErrorType, AgoraResult};
use std::collections::HashSet;
use tracing::warn;

/// How many follow-up rounds one post may spawn before the leftovers are
/// dropped.
const MAX_RESPAWNS: u8 = 10;

/// Re-enqueues the job when members are still owed a notification, carrying
/// the leftover sets forward. The new round is held back until the quote and
/// mention hold back window has passed.
pub(super) async fn respawn_if_pending(
  context: &NotifyContext,
  payload: &PostNotifyPayload,
  email_pending: &HashSet<MemberId>,
  carry_quoted: HashSet<MemberId>,
  carry_mentioned: HashSet<MemberId>,
) -> AgoraResult<Option<TaskId>> {
  if email_pending.is_empty() && carry_quoted.is_empty() && carry_mentioned.is_empty() {
    return Ok(None);
  }
  if payload.respawns >= MAX_RESPAWNS {
    warn!(
      "Giving up on notification job for post {} after {} rounds, {} members still owed",
      payload.post_id,
      payload.respawns,
      email_pending.len() + carry_quoted.len() + carry_mentioned.len(),
    );
    return Ok(None);
  }

  let next = PostNotifyPayload {
    respawns: payload.respawns + 1,
    quoted_members: carry_quoted,
    mentioned_members: carry_mentioned,
    ..payload.clone()
  };
  let run_at = next.mention_mail_time;
  let task = context
    .store()
    .enqueue(QueuedTaskForm::deferred(TaskPayload::PostNotify(next), run_at))
    .await
    .with_agora_type(AgoraErrorType::CouldntEnqueueTask)?;
  Ok(Some(task.id))
}
