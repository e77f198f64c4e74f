use agora_db::{newtypes::GroupId, source::board::BoardGroupAccess};
use std::collections::HashSet;

/// A board's access rules, split into the groups let in and the groups shut
/// out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PermissionSet {
  allowed: HashSet<GroupId>,
  denied: HashSet<GroupId>,
}

impl PermissionSet {
  pub fn load(access: &[BoardGroupAccess]) -> PermissionSet {
    let mut permissions = PermissionSet::default();
    for row in access {
      if row.deny {
        permissions.denied.insert(row.group_id);
      } else {
        permissions.allowed.insert(row.group_id);
      }
    }
    permissions
  }

  /// Whether a member with these groups may see the board. Administrators
  /// always pass, a deny row beats any allow row, and a member matching no
  /// allow row is shut out even when nothing denies them.
  pub fn allows(&self, groups: &[GroupId]) -> bool {
    if groups.contains(&GroupId::ADMIN) {
      return true;
    }
    if groups.iter().any(|group| self.denied.contains(group)) {
      return false;
    }
    groups.iter().any(|group| self.allowed.contains(group))
  }
}
