use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::provider::TaskProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub full_name: String,
}

impl Person {
    /// Splits a comma-delimited id list and a pipe-delimited name list and
    /// pairs them by index. A single id takes the whole name string as-is.
    /// Mismatched lengths pair up to the shorter list; the input is
    /// unvalidated remote data.
    pub fn zip(ids: &str, names: &str) -> Vec<Person> {
        let id_list: Vec<&str> = ids.split(',').collect();
        if id_list.len() > 1 {
            id_list
                .into_iter()
                .zip(names.split('|'))
                .map(|(id, full_name)| Person {
                    id: id.to_owned(),
                    full_name: full_name.to_owned(),
                })
                .collect()
        } else {
            vec![Person {
                id: ids.to_owned(),
                full_name: names.to_owned(),
            }]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Assignees {
    People(Vec<Person>),
    Summary(String),
    Unassigned,
}

impl Assignees {
    pub fn display(&self, unassigned_label: &str) -> String {
        match self {
            Self::People(people) => people
                .iter()
                .map(|person| person.full_name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            Self::Summary(summary) => summary.clone(),
            Self::Unassigned => unassigned_label.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityClass {
    Urgent,
    Important,
    Normal,
    Prohibited,
}

impl PriorityClass {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "high" => Self::Urgent,
            _ => Self::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDetails {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub project_id: Option<String>,
    pub task_list_id: Option<String>,
    pub progress: Option<u8>,
    pub estimated_minutes: Option<u32>,
    pub description: Option<String>,
    pub comment_count: Option<u32>,
    pub private: bool,
    pub status: Option<String>,
    pub last_changed: Option<DateTime<Utc>>,
    pub creator: Option<Creator>,
}

#[derive(Clone)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub assignees: Assignees,
    pub priority: PriorityClass,
    pub has_children: bool,
    pub details: Option<TaskDetails>,
    provider: Option<Weak<dyn TaskProvider>>,
    sub_tasks: Arc<RwLock<Option<Vec<Task>>>>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            due_date: None,
            assignees: Assignees::Unassigned,
            priority: PriorityClass::Normal,
            has_children: false,
            details: None,
            provider: None,
            sub_tasks: Arc::new(RwLock::new(None)),
        }
    }

    pub fn attach_provider(&mut self, provider: Weak<dyn TaskProvider>) {
        self.provider = Some(provider);
    }

    pub fn provider(&self) -> Option<Arc<dyn TaskProvider>> {
        self.provider.as_ref().and_then(Weak::upgrade)
    }

    /// Resolved sub-tasks are cached on the instance; clones share the cache.
    pub async fn cached_sub_tasks(&self) -> Option<Vec<Task>> {
        self.sub_tasks.read().await.clone()
    }

    pub async fn store_sub_tasks(&self, sub_tasks: Vec<Task>) {
        *self.sub_tasks.write().await = Some(sub_tasks);
    }

    /// Seeds the cache while the task is still exclusively owned, for
    /// payloads that carry nested sub-tasks inline.
    pub fn preload_sub_tasks(&mut self, sub_tasks: Vec<Task>) {
        self.sub_tasks = Arc::new(RwLock::new(Some(sub_tasks)));
    }

    pub async fn complete(&self) -> Result<Option<serde_json::Value>, CoreError> {
        let provider = self.provider().ok_or_else(|| {
            CoreError::Configuration(format!(
                "task {} is no longer attached to a configured provider",
                self.id
            ))
        })?;
        provider.complete_task(&self.id).await
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Task")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("due_date", &self.due_date)
            .field("assignees", &self.assignees)
            .field("priority", &self.priority)
            .field("has_children", &self.has_children)
            .field("details", &self.details)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{Assignees, Person, PriorityClass, Task};
    use crate::error::CoreError;

    #[test]
    fn zip_pairs_each_id_with_the_name_at_the_same_index() {
        let people = Person::zip("11,22,33", "Ada Lovelace|Grace Hopper|Edsger Dijkstra");
        assert_eq!(people.len(), 3);
        assert_eq!(people[0].id, "11");
        assert_eq!(people[0].full_name, "Ada Lovelace");
        assert_eq!(people[2].id, "33");
        assert_eq!(people[2].full_name, "Edsger Dijkstra");
    }

    #[test]
    fn zip_with_a_single_id_keeps_the_whole_name_string() {
        let people = Person::zip("42", "Ada Lovelace");
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].id, "42");
        assert_eq!(people[0].full_name, "Ada Lovelace");
    }

    #[test]
    fn zip_with_mismatched_lengths_pairs_up_to_the_shorter_list() {
        let people = Person::zip("1,2,3", "Ada|Grace");
        assert_eq!(people.len(), 2);
        assert_eq!(people[1].id, "2");
        assert_eq!(people[1].full_name, "Grace");
    }

    #[test]
    fn priority_mapping_treats_only_high_as_urgent() {
        assert_eq!(PriorityClass::from_wire("high"), PriorityClass::Urgent);
        assert_eq!(PriorityClass::from_wire("medium"), PriorityClass::Normal);
        assert_eq!(PriorityClass::from_wire(""), PriorityClass::Normal);
    }

    #[test]
    fn assignees_display_joins_people_and_falls_back_to_the_sentinel() {
        let people = Assignees::People(vec![
            Person {
                id: "1".to_owned(),
                full_name: "Ada Lovelace".to_owned(),
            },
            Person {
                id: "2".to_owned(),
                full_name: "Grace Hopper".to_owned(),
            },
        ]);
        assert_eq!(people.display("Unassigned"), "Ada Lovelace, Grace Hopper");
        let summary = Assignees::Summary("Everyone".to_owned());
        assert_eq!(summary.display("Unassigned"), "Everyone");
        assert_eq!(Assignees::Unassigned.display("Unassigned"), "Unassigned");
    }

    #[tokio::test]
    async fn sub_task_cache_is_shared_between_clones() {
        let task = Task::new("1", "parent");
        let clone = task.clone();
        assert!(task.cached_sub_tasks().await.is_none());

        task.store_sub_tasks(vec![Task::new("2", "child")]).await;
        let cached = clone.cached_sub_tasks().await;
        assert_eq!(cached.map(|tasks| tasks.len()), Some(1));
    }

    #[tokio::test]
    async fn completing_a_detached_task_reports_a_configuration_error() {
        let task = Task::new("9", "orphan");
        let error = task.complete().await.unwrap_err();
        assert!(matches!(error, CoreError::Configuration(_)));
    }
}
