use crate::newtypes::{BoardId, GroupId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
  pub id: BoardId,
  pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// One row of a board's access list. A group appears at most once per board,
/// either explicitly allowed or explicitly denied.
pub struct BoardGroupAccess {
  pub board_id: BoardId,
  pub group_id: GroupId,
  pub deny: bool,
}
