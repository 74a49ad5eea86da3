use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use taskdock_domain::{TaskListSetting, TaskProvider};
use taskdock_settings::KEY_TASK_LIST;

use crate::factory::{build_provider, ProviderContext};

/// Owns one adapter per distinct configured provider id. Rebuilt whole
/// whenever the tasklist configuration changes; nothing migrates in-flight
/// state across a rebuild.
pub struct ProviderRegistry {
    context: ProviderContext,
    providers: RwLock<Vec<Arc<dyn TaskProvider>>>,
    generation: AtomicU64,
}

impl ProviderRegistry {
    pub fn new(context: ProviderContext) -> Arc<Self> {
        let registry = Arc::new(Self {
            context,
            providers: RwLock::new(Vec::new()),
            generation: AtomicU64::new(0),
        });
        registry.rebuild();

        let weak = Arc::downgrade(&registry);
        registry.context.settings.store().subscribe(
            KEY_TASK_LIST,
            Arc::new(move |_key| {
                if let Some(registry) = weak.upgrade() {
                    registry.rebuild();
                }
            }),
        );
        registry
    }

    /// Groups the persisted tasklist entries by provider id in first-seen
    /// order and replaces the adapter list with one instance per id.
    pub fn rebuild(&self) {
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<TaskListSetting>> = HashMap::new();
        for entry in self.context.settings.task_lists() {
            if !grouped.contains_key(&entry.project_manager) {
                order.push(entry.project_manager.clone());
            }
            grouped
                .entry(entry.project_manager.clone())
                .or_default()
                .push(entry);
        }

        let providers: Vec<Arc<dyn TaskProvider>> = order
            .into_iter()
            .map(|provider_id| {
                let task_lists = grouped.remove(&provider_id).unwrap_or_default();
                build_provider(&provider_id, task_lists, &self.context)
            })
            .collect();

        debug!(count = providers.len(), "rebuilt the provider registry");
        *self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner) = providers;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn providers(&self) -> Vec<Arc<dyn TaskProvider>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Looks an adapter up by the configured provider id, which for the
    /// fallback differs from its descriptor id.
    pub fn provider_for(&self, provider_id: &str) -> Option<Arc<dyn TaskProvider>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|provider| {
                provider.descriptor().id == provider_id
                    || provider
                        .task_list_settings()
                        .iter()
                        .any(|entry| entry.project_manager == provider_id)
            })
            .cloned()
    }

    /// Bumped on every rebuild. Consumers that gate one-time warnings
    /// compare against it so a rebuild re-arms them.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
