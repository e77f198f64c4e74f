use serde::{Deserialize, Serialize};
use std::{
  backtrace::Backtrace,
  fmt,
  fmt::{Debug, Display},
};
use strum::Display;

pub type AgoraResult<T> = Result<T, AgoraError>;

#[derive(Display, Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(tag = "error", content = "message", rename_all = "snake_case")]
#[non_exhaustive]
// TODO: order these based on the crate they belong to (utils, db, email, notify)
pub enum AgoraErrorType {
  NotFound,
  HostnameNotSet,
  NoEmailSetup,
  EmailSmtpServerNeedsAPort,
  InvalidEmailAddress(String),
  EmailSendFailed,
  InvalidTaskPayload,
  CouldntCreateAlert,
  CouldntDeleteAlerts,
  CouldntEnqueueTask,
  CouldntUpdateWatch,
  Unknown(String),
}

pub struct AgoraError {
  pub error_type: AgoraErrorType,
  pub inner: anyhow::Error,
  pub context: Backtrace,
}

impl<T> From<T> for AgoraError
where
  T: Into<anyhow::Error>,
{
  fn from(t: T) -> Self {
    let cause = t.into();
    AgoraError {
      error_type: AgoraErrorType::Unknown(format!("{}", &cause)),
      inner: cause,
      context: Backtrace::capture(),
    }
  }
}

impl Debug for AgoraError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AgoraError")
      .field("message", &self.error_type)
      .field("inner", &self.inner)
      .field("context", &self.context)
      .finish()
  }
}

impl Display for AgoraError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: ", &self.error_type)?;
    writeln!(f, "{}", self.inner)?;
    fmt::Display::fmt(&self.context, f)
  }
}

impl From<AgoraErrorType> for AgoraError {
  fn from(error_type: AgoraErrorType) -> Self {
    let inner = anyhow::anyhow!("{}", error_type);
    AgoraError {
      error_type,
      inner,
      context: Backtrace::capture(),
    }
  }
}

pub trait AgoraErrorExt<T, E: Into<anyhow::Error>> {
  fn with_agora_type(self, error_type: AgoraErrorType) -> AgoraResult<T>;
}

impl<T, E: Into<anyhow::Error>> AgoraErrorExt<T, E> for Result<T, E> {
  fn with_agora_type(self, error_type: AgoraErrorType) -> AgoraResult<T> {
    self.map_err(|error| AgoraError {
      error_type,
      inner: error.into(),
      context: Backtrace::capture(),
    })
  }
}

pub trait AgoraErrorExt2<T> {
  fn with_agora_type(self, error_type: AgoraErrorType) -> AgoraResult<T>;
  fn into_anyhow(self) -> Result<T, anyhow::Error>;
}

impl<T> AgoraErrorExt2<T> for AgoraResult<T> {
  fn with_agora_type(self, error_type: AgoraErrorType) -> AgoraResult<T> {
    self.map_err(|mut e| {
      e.error_type = error_type;
      e
    })
  }

  // this function can't be an impl From or similar because it would conflict
  // with the broad Into<anyhow::Error> implementation above
  fn into_anyhow(self) -> Result<T, anyhow::Error> {
    self.map_err(|e| e.inner)
  }
}
