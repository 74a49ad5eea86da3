use std::sync::Arc;

use tracing::warn;

use taskdock_domain::{
    Interactions, ProviderDescriptor, ProviderKind, TaskListSetting, TaskProvider,
};
use taskdock_settings::PanelSettings;

use crate::fallback::FallbackProvider;
use crate::teamwork::{TeamworkProvider, TEAMWORK_DESCRIPTOR};
use crate::transport::HttpTransport;

/// Everything an adapter constructor needs besides its own settings slice.
#[derive(Clone)]
pub struct ProviderContext {
    pub settings: PanelSettings,
    pub interactions: Arc<dyn Interactions>,
    pub transport: Arc<dyn HttpTransport>,
}

pub fn build_provider(
    provider_id: &str,
    task_lists: Vec<TaskListSetting>,
    context: &ProviderContext,
) -> Arc<dyn TaskProvider> {
    match ProviderKind::from_id(provider_id) {
        ProviderKind::Teamwork => TeamworkProvider::new(
            task_lists,
            context.settings.clone(),
            Arc::clone(&context.interactions),
            Arc::clone(&context.transport),
        ),
        ProviderKind::Fallback => {
            warn!(provider_id, "no adapter is registered for this provider id");
            Arc::new(FallbackProvider::new(task_lists))
        }
    }
}

/// Descriptors of every adapter the factory can actually build, for the
/// provider picker in the configure flow.
pub fn known_descriptors() -> Vec<ProviderDescriptor> {
    vec![TEAMWORK_DESCRIPTOR]
}
