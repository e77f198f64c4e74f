use agora_utils::settings::structs::Settings;

pub mod notifications;
pub mod send;

fn notification_settings_link(settings: &Settings) -> String {
  format!("{}/profile/notifications", settings.get_protocol_and_hostname())
}
