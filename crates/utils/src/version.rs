use std::env;

pub fn version() -> String {
  env::var("AGORA_VERSION").unwrap_or_else(|_| "unknown version".to_string())
}
