//! Model registry built from the `models` config section.

use std::str::FromStr;
use std::sync::Arc;

use palaver_config::ModelConfig;
use palaver_core::ChatModel;
use palaver_providers::{ProviderKind, build_provider, http};
use tracing::{info, warn};

use crate::factory::{SessionFactory, SessionSettings};

/// A configured model that is ready to start sessions.
#[derive(Clone)]
pub struct RegisteredModel {
    pub id: String,
    pub kind: ProviderKind,
    pub config: ModelConfig,
    pub factory: SessionFactory,
}

/// A config entry that was not registered because its type is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedModel {
    pub id: String,
    pub kind: String,
}

#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: Vec<RegisteredModel>,
    skipped: Vec<SkippedModel>,
}

impl ModelRegistry {
    /// Build a factory for every recognized entry, using the shared HTTP
    /// client.
    pub fn build(configs: &[ModelConfig]) -> palaver_config::Result<Self> {
        let client = http::shared_client();
        Self::build_with(configs, |kind, config| {
            build_provider(kind, config, client.clone())
        })
    }

    /// Like [`ModelRegistry::build`] with a custom provider constructor.
    ///
    /// Unknown model types are logged and skipped. Errors from `builder`
    /// abort the build.
    pub fn build_with<F>(configs: &[ModelConfig], mut builder: F) -> palaver_config::Result<Self>
    where
        F: FnMut(ProviderKind, &ModelConfig) -> palaver_config::Result<Arc<dyn ChatModel>>,
    {
        let mut registry = Self::default();
        for config in configs {
            let kind = match ProviderKind::from_str(&config.kind) {
                Ok(kind) => kind,
                Err(e) => {
                    warn!("Skipping model {}: {e}", config.id);
                    registry.skipped.push(SkippedModel {
                        id: config.id.clone(),
                        kind: config.kind.clone(),
                    });
                    continue;
                }
            };

            let provider = builder(kind, config)?;
            info!(
                "Registered model {} ({kind}, {})",
                config.id,
                provider.model_name()
            );
            registry.models.push(RegisteredModel {
                id: config.id.clone(),
                kind,
                config: config.clone(),
                factory: SessionFactory::new(provider, SessionSettings::from_model_config(config)),
            });
        }
        Ok(registry)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RegisteredModel> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredModel> {
        self.models.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    #[must_use]
    pub fn first_of_kind(&self, kind: ProviderKind) -> Option<&RegisteredModel> {
        self.models.iter().find(|m| m.kind == kind)
    }

    /// Entries left out because their type was not recognized.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedModel] {
        &self.skipped
    }

    /// Pick a model for one-shot commands: `id` if given, otherwise the
    /// first OpenAI model, otherwise the first model.
    #[must_use]
    pub fn select(&self, id: Option<&str>) -> Option<&RegisteredModel> {
        match id {
            Some(id) => self.get(id),
            None => self
                .first_of_kind(ProviderKind::OpenAI)
                .or_else(|| self.models.first()),
        }
    }
}
