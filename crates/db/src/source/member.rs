use crate::{
  enums::{NotifyFrequency, WatchNotifyKind},
  newtypes::{GroupId, MemberId},
  sensitive::SensitiveString,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A forum member, as the notification pipeline sees one.
pub struct Member {
  pub id: MemberId,
  pub name: String,
  /// Unset when the member never confirmed an address.
  pub email: Option<SensitiveString>,
  /// Every group the member belongs to, primary and post-count groups
  /// included.
  pub groups: Vec<GroupId>,
  /// Members this member has muted. Nothing their actions cause is delivered.
  pub muted_members: Vec<MemberId>,
  /// Interface language, also used to pick the email wording.
  pub language: String,
  /// Offset from UTC in hours, applied when formatting times for this member.
  pub time_offset: i32,
  /// strftime-style format for times shown to this member.
  pub time_format: String,
}

impl Member {
  pub fn has_muted(&self, other: MemberId) -> bool {
    self.muted_members.contains(&other)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
/// The delivery channels a notification goes out on. Stored as a two bit
/// mask in the preferences table, `0b01` for alerts and `0b10` for email.
pub struct NotifyMethods {
  pub alert: bool,
  pub email: bool,
}

impl NotifyMethods {
  pub fn new(alert: bool, email: bool) -> Self {
    NotifyMethods { alert, email }
  }

  pub fn from_bits(bits: i16) -> Self {
    NotifyMethods {
      alert: bits & 0b01 != 0,
      email: bits & 0b10 != 0,
    }
  }

  pub fn bits(&self) -> i16 {
    i16::from(self.alert) | (i16::from(self.email) << 1)
  }

  pub fn any(&self) -> bool {
    self.alert || self.email
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Per-member message notification preferences, board and topic level
/// overrides already resolved by the store.
pub struct NotifyPrefs {
  pub methods: NotifyMethods,
  pub frequency: NotifyFrequency,
  pub watched: WatchNotifyKind,
}

/// Members without an explicit preference row get an in-app alert and no
/// email.
impl Default for NotifyPrefs {
  fn default() -> Self {
    NotifyPrefs {
      methods: NotifyMethods::new(true, false),
      frequency: NotifyFrequency::Immediate,
      watched: WatchNotifyKind::AllActivity,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_methods_from_bits() {
    assert_eq!(NotifyMethods::new(true, false), NotifyMethods::from_bits(0b01));
    assert_eq!(NotifyMethods::new(false, true), NotifyMethods::from_bits(0b10));
    assert_eq!(NotifyMethods::new(true, true), NotifyMethods::from_bits(0b11));
    assert!(!NotifyMethods::from_bits(0).any());
  }

  #[test]
  fn test_methods_bits() {
    assert_eq!(0b11, NotifyMethods::new(true, true).bits());
    assert_eq!(0b10, NotifyMethods::new(false, true).bits());
  }
}
