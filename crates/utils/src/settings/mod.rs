use crate::error::{AgoraErrorType, AgoraResult};
use deser_hjson::from_str;
use once_cell::sync::Lazy;
use std::{env, fs, io::Error};
use structs::Settings;

pub mod structs;

const DEFAULT_CONFIG_FILE: &str = "config/config.hjson";

#[allow(clippy::expect_used)]
pub static SETTINGS: Lazy<Settings> = Lazy::new(|| {
  if env::var("AGORA_INITIALIZE_WITH_DEFAULT_SETTINGS").is_ok() {
    println!(
      "AGORA_INITIALIZE_WITH_DEFAULT_SETTINGS was set, any configuration file has been ignored."
    );
    Settings::default()
  } else {
    Settings::init().expect(
      "Failed to load settings file, see documentation (https://agora-forum.org/docs/en/administration/configuration.html).",
    )
  }
});

impl Settings {
  /// Reads config from configuration file.
  fn init() -> AgoraResult<Self> {
    let config = from_str::<Settings>(&Self::read_config_file()?)?;

    if config.hostname == "unset" {
      Err(AgoraErrorType::HostnameNotSet.into())
    } else {
      Ok(config)
    }
  }

  pub fn get_config_location() -> String {
    env::var("AGORA_CONFIG_LOCATION").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
  }

  pub fn read_config_file() -> Result<String, Error> {
    fs::read_to_string(Self::get_config_location())
  }

  /// Returns either "http" or "https", depending on tls_enabled setting
  fn get_protocol_string(&self) -> &'static str {
    if self.tls_enabled {
      "https"
    } else {
      "http"
    }
  }

  /// Returns something like `http://localhost` or `https://forum.example.com`,
  /// with the correct protocol and hostname.
  pub fn get_protocol_and_hostname(&self) -> String {
    format!("{}://{}", self.get_protocol_string(), self.hostname)
  }
}
