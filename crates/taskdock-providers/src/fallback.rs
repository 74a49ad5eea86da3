use taskdock_domain::{ProviderDescriptor, RouteTable, TaskListSetting, TaskProvider};

pub const FALLBACK_DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: "fallback",
    label: "Unsupported provider",
    description: "keeps unrecognized configuration entries inert",
    auth_url: "",
    token_help_url: "",
    self_label: "You",
    unassigned_label: "Unassigned",
    routes: RouteTable {
        projects: "",
        project_task_lists: "",
        task_list_tasks: "",
        sub_tasks: "",
        complete: "",
        people: "",
    },
};

/// Adapter for provider ids nothing is registered for. Every operation
/// resolves empty through the trait defaults, so a stale configuration
/// entry renders as nothing instead of breaking the whole panel.
pub struct FallbackProvider {
    descriptor: ProviderDescriptor,
    task_list_settings: Vec<TaskListSetting>,
}

impl FallbackProvider {
    pub fn new(task_list_settings: Vec<TaskListSetting>) -> Self {
        Self {
            descriptor: FALLBACK_DESCRIPTOR,
            task_list_settings,
        }
    }
}

#[async_trait::async_trait]
impl TaskProvider for FallbackProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn task_list_settings(&self) -> &[TaskListSetting] {
        &self.task_list_settings
    }
}
