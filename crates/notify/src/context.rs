use crate::render::MarkupRenderer;
use agora_db::traits::Store;
use agora_email::send::Mailer;
use agora_utils::settings::{structs::Settings, SETTINGS};
use std::sync::Arc;

/// The shared handles every notification code path works through.
#[derive(Clone)]
pub struct NotifyContext {
  store: Arc<dyn Store>,
  mailer: Arc<dyn Mailer>,
  renderer: Arc<dyn MarkupRenderer>,
  settings: Arc<Settings>,
}

impl NotifyContext {
  /// A context on the globally loaded settings.
  pub fn create(
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    renderer: Arc<dyn MarkupRenderer>,
  ) -> NotifyContext {
    NotifyContext::create_with_settings(store, mailer, renderer, SETTINGS.clone())
  }

  /// A context on explicit settings, for embedders that manage configuration
  /// themselves.
  pub fn create_with_settings(
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    renderer: Arc<dyn MarkupRenderer>,
    settings: Settings,
  ) -> NotifyContext {
    NotifyContext {
      store,
      mailer,
      renderer,
      settings: Arc::new(settings),
    }
  }

  pub fn store(&self) -> &dyn Store {
    self.store.as_ref()
  }

  pub fn mailer(&self) -> &dyn Mailer {
    self.mailer.as_ref()
  }

  pub fn renderer(&self) -> &dyn MarkupRenderer {
    self.renderer.as_ref()
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }
}
