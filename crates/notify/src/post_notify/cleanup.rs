use crate::context::NotifyContext;
use agora_db::{
  enums::AlertAction,
  newtypes::{MemberId, PostId},
  traits::AlertStore,
};
use agora_utils::error::{AgoraErrorExt2, AgoraErrorType, AgoraResult};
use std::collections::HashSet;

/// Deletes the quote and mention alerts an edit no longer supports: members
/// holding such an alert who are absent from the edited post's relation sets
/// lose it, in one batched delete.
pub(super) async fn remove_stale_alerts(
  context: &NotifyContext,
  post_id: PostId,
  quoted: &HashSet<MemberId>,
  mentioned: &HashSet<MemberId>,
) -> AgoraResult<usize> {
  let store = context.store();
  let mut stale = Vec::new();

  let gone_quoted: HashSet<MemberId> = store
    .alerted_members(post_id, AlertAction::Quote)
    .await?
    .difference(quoted)
    .copied()
    .collect();
  if !gone_quoted.is_empty() {
    stale.push((AlertAction::Quote, gone_quoted));
  }

  let gone_mentioned: HashSet<MemberId> = store
    .alerted_members(post_id, AlertAction::Mention)
    .await?
    .difference(mentioned)
    .copied()
    .collect();
  if !gone_mentioned.is_empty() {
    stale.push((AlertAction::Mention, gone_mentioned));
  }

  if stale.is_empty() {
    return Ok(0);
  }
  store
    .delete_for_members(post_id, &stale)
    .await
    .with_agora_type(AgoraErrorType::CouldntDeleteAlerts)
}
