use chrono::NaiveDate;

use crate::error::CoreError;
use crate::interact::PickItem;
use crate::task::Task;
use crate::tasklist::TaskListSetting;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    pub projects: &'static str,
    pub project_task_lists: &'static str,
    pub task_list_tasks: &'static str,
    pub sub_tasks: &'static str,
    pub complete: &'static str,
    pub people: &'static str,
}

/// Substitutes the placeholder in a route template.
pub fn fill_route(template: &str, value: &str) -> String {
    template
        .replace("{id}", value)
        .replace("{parentTaskId}", value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub auth_url: &'static str,
    pub token_help_url: &'static str,
    pub self_label: &'static str,
    pub unassigned_label: &'static str,
    pub routes: RouteTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Teamwork,
    Fallback,
}

impl ProviderKind {
    pub const fn as_id(self) -> &'static str {
        match self {
            Self::Teamwork => "teamwork",
            Self::Fallback => "fallback",
        }
    }

    /// Unknown ids deliberately resolve to the fallback kind so a stale
    /// configuration entry still yields a working, empty provider.
    pub fn from_id(provider_id: &str) -> Self {
        match provider_id {
            "teamwork" => Self::Teamwork,
            _ => Self::Fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub assignee_id: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[async_trait::async_trait]
pub trait TaskProvider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;
    fn task_list_settings(&self) -> &[TaskListSetting];

    async fn register(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn projects(&self) -> Result<Vec<PickItem>, CoreError> {
        Ok(Vec::new())
    }

    async fn task_lists(&self) -> Result<Option<TaskListSetting>, CoreError> {
        Ok(None)
    }

    async fn tasks(&self, _parent: Option<&Task>) -> Result<Vec<Task>, CoreError> {
        Ok(Vec::new())
    }

    async fn people(&self, _project_id: &str) -> Result<Vec<PickItem>, CoreError> {
        Ok(Vec::new())
    }

    async fn create_task(&self, _task_list_id: &str, _draft: &TaskDraft) -> Result<(), CoreError> {
        Err(CoreError::Configuration(format!(
            "task creation is not implemented by the {} provider",
            self.descriptor().id
        )))
    }

    async fn complete_task(
        &self,
        _task_id: &str,
    ) -> Result<Option<serde_json::Value>, CoreError> {
        Ok(None)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::from_id(self.descriptor().id)
    }
}
