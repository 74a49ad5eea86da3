use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListSetting {
    pub id: String,
    pub label: String,
    pub project_manager: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl TaskListSetting {
    pub fn identity(&self) -> (&str, &str) {
        (&self.project_manager, &self.id)
    }
}

/// Adds `incoming` unless an entry with the same `(provider, id)` identity
/// already exists. Returns whether the list changed.
pub fn merge_task_list(entries: &mut Vec<TaskListSetting>, incoming: TaskListSetting) -> bool {
    if entries
        .iter()
        .any(|entry| entry.identity() == incoming.identity())
    {
        return false;
    }
    entries.push(incoming);
    true
}
