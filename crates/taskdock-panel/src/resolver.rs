use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use taskdock_domain::{Interactions, NoticeLevel, Task, TaskProvider};
use taskdock_providers::ProviderRegistry;
use taskdock_settings::PanelSettings;

pub const UNCONFIGURED_WARNING: &str =
    "No tasklist has been configured for this workspace yet";

/// What a children request resolved to. The two placeholder shapes are
/// mutually exclusive; a request yields exactly one of the three.
#[derive(Debug, Clone)]
pub enum ChildrenOutcome {
    Unconfigured,
    Empty,
    Tasks(Vec<Task>),
}

/// The resolver's view of the registry, so tests can script providers
/// without standing up real adapters.
pub trait ProviderSource: Send + Sync {
    fn providers(&self) -> Vec<Arc<dyn TaskProvider>>;
    fn generation(&self) -> u64;
}

impl ProviderSource for ProviderRegistry {
    fn providers(&self) -> Vec<Arc<dyn TaskProvider>> {
        ProviderRegistry::providers(self)
    }

    fn generation(&self) -> u64 {
        ProviderRegistry::generation(self)
    }
}

pub struct ChildrenResolver {
    settings: PanelSettings,
    providers: Arc<dyn ProviderSource>,
    interactions: Arc<dyn Interactions>,
    warned_generation: AtomicU64,
}

impl ChildrenResolver {
    pub fn new(
        settings: PanelSettings,
        providers: Arc<dyn ProviderSource>,
        interactions: Arc<dyn Interactions>,
    ) -> Self {
        Self {
            settings,
            providers,
            interactions,
            warned_generation: AtomicU64::new(u64::MAX),
        }
    }

    /// Top-level children of the panel. Providers are drained one at a
    /// time so all of one provider's tasks precede the next provider's.
    pub async fn resolve_top_level(&self) -> ChildrenOutcome {
        if self.unconfigured() {
            self.warn_unconfigured_once().await;
            return ChildrenOutcome::Unconfigured;
        }

        let mut merged = Vec::new();
        for provider in self.providers.providers() {
            match provider.tasks(None).await {
                Ok(tasks) => merged.extend(tasks),
                Err(error) => {
                    warn!(
                        provider = provider.descriptor().id,
                        %error,
                        "provider failed to resolve its tasks"
                    );
                    self.interactions
                        .notify(NoticeLevel::Error, &error.to_string())
                        .await;
                }
            }
        }

        if merged.is_empty() {
            ChildrenOutcome::Empty
        } else {
            ChildrenOutcome::Tasks(merged)
        }
    }

    /// Children of an expanded task node. A task whose adapter was dropped
    /// by a registry rebuild can still serve whatever it has cached.
    pub async fn resolve_children(&self, parent: &Task) -> Vec<Task> {
        let Some(provider) = parent.provider() else {
            return parent.cached_sub_tasks().await.unwrap_or_default();
        };
        match provider.tasks(Some(parent)).await {
            Ok(tasks) => tasks,
            Err(error) => {
                warn!(parent = %parent.id, %error, "sub-task resolution failed");
                self.interactions
                    .notify(NoticeLevel::Error, &error.to_string())
                    .await;
                Vec::new()
            }
        }
    }

    fn unconfigured(&self) -> bool {
        if !self.settings.has_workspace() {
            return true;
        }
        match self.settings.task_lists().first() {
            None => true,
            Some(first) => first.project_id.is_empty(),
        }
    }

    /// Warns once per registry generation; a rebuild re-arms the gate.
    async fn warn_unconfigured_once(&self) {
        let generation = self.providers.generation();
        if self.warned_generation.swap(generation, Ordering::SeqCst) != generation {
            self.interactions
                .notify(NoticeLevel::Warning, UNCONFIGURED_WARNING)
                .await;
        }
    }
}
