use std::collections::HashSet;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use taskdock_domain::calendar::{parse_wire_date, wire_date};
use taskdock_domain::{
    fill_route, Assignees, CoreError, Creator, Interactions, NoticeLevel, Person, PickItem,
    PriorityClass, ProviderDescriptor, RouteTable, Task, TaskDetails, TaskDraft, TaskListSetting,
    TaskProvider,
};
use taskdock_settings::PanelSettings;

use crate::fetch::{fetch, RestCredentials};
use crate::transport::{HttpMethod, HttpTransport};

pub const TEAMWORK_DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    id: "teamwork",
    label: "Teamwork",
    description: "teamwork.com | Working together. Beautifully",
    auth_url: "https://api.teamwork.com/authenticate.json",
    token_help_url:
        "https://support.teamwork.com/projects/using-teamwork-projects/locating-your-api-key",
    self_label: "You",
    unassigned_label: "Unassigned",
    routes: RouteTable {
        projects: "/projects.json",
        project_task_lists: "/projects/{id}/tasklists.json",
        task_list_tasks: "/tasklists/{id}/tasks.json",
        sub_tasks: "/tasks/{parentTaskId}/subtasks.json",
        complete: "/tasks/{id}/complete.json",
        people: "/projects/{id}/people.json",
    },
};

const TASK_LIST_KEY: &str = "tasklists";
const TASKS_KEY: &str = "todo-items";
const PEOPLE_KEY: &str = "people";
const PROJECTS_KEY: &str = "projects";

#[derive(Debug, Clone)]
struct AccountSession {
    user_id: String,
    base_url: String,
    credentials: RestCredentials,
}

pub struct TeamworkProvider {
    descriptor: ProviderDescriptor,
    task_list_settings: Vec<TaskListSetting>,
    settings: PanelSettings,
    interactions: Arc<dyn Interactions>,
    transport: Arc<dyn HttpTransport>,
    session: RwLock<Option<AccountSession>>,
    self_handle: Weak<TeamworkProvider>,
}

impl TeamworkProvider {
    pub fn new(
        task_list_settings: Vec<TaskListSetting>,
        settings: PanelSettings,
        interactions: Arc<dyn Interactions>,
        transport: Arc<dyn HttpTransport>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_handle| Self {
            descriptor: TEAMWORK_DESCRIPTOR,
            task_list_settings,
            settings,
            interactions,
            transport,
            session: RwLock::new(None),
            self_handle: self_handle.clone(),
        })
    }

    fn provider_handle(&self) -> Weak<dyn TaskProvider> {
        self.self_handle.clone()
    }

    fn endpoint(&self, base: &str, route: &str) -> String {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }

    async fn fetch_route(
        &self,
        session: &AccountSession,
        method: HttpMethod,
        route: &str,
        params: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Option<Value>, CoreError> {
        let url = self.endpoint(&session.base_url, route);
        fetch(
            self.transport.as_ref(),
            method,
            &url,
            params,
            body,
            Some(&session.credentials),
        )
        .await
    }

    /// Reads the stored token, or walks the interactive acquisition flow.
    /// `None` means the user backed out.
    async fn token(&self) -> Result<Option<String>, CoreError> {
        if let Some(token) = self.settings.token(self.descriptor.id) {
            return Ok(Some(token));
        }
        self.interactions
            .open_url(self.descriptor.token_help_url)
            .await;
        self.prompt_and_store_token().await
    }

    async fn update_token(&self) -> Result<Option<String>, CoreError> {
        self.prompt_and_store_token().await
    }

    async fn prompt_and_store_token(&self) -> Result<Option<String>, CoreError> {
        let Some(token) = self
            .interactions
            .input("Enter your Teamwork API token", None)
            .await
        else {
            return Ok(None);
        };
        let token = token.trim().to_owned();
        if token.is_empty() {
            return Ok(None);
        }
        self.settings
            .set_token(self.descriptor.id, &token)
            .map_err(|err| CoreError::Configuration(err.to_string()))?;
        Ok(Some(token))
    }

    async fn register_with_token(&self, initial: String) -> Result<(), CoreError> {
        let mut token = initial;
        loop {
            let credentials = RestCredentials::new(token.clone());
            let payload = match fetch(
                self.transport.as_ref(),
                HttpMethod::Get,
                self.descriptor.auth_url,
                &[],
                None,
                Some(&credentials),
            )
            .await
            {
                Ok(Some(payload)) => Some(payload),
                Ok(None) => None,
                Err(error) => {
                    warn!(%error, "Teamwork rejected the authentication request");
                    None
                }
            };

            match payload {
                Some(payload) => {
                    let session = parse_account_session(&payload, credentials)?;
                    debug!(base_url = %session.base_url, "signed in to Teamwork");
                    *self.session.write().await = Some(session);
                    return Ok(());
                }
                None => {
                    self.interactions
                        .notify(
                            NoticeLevel::Warning,
                            "Could not sign in to Teamwork with that token",
                        )
                        .await;
                    match self.update_token().await? {
                        Some(replacement) => token = replacement,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    async fn require_session(&self) -> Result<AccountSession, CoreError> {
        self.register().await?;
        let session = self.session.read().await.clone();
        session.ok_or_else(|| {
            CoreError::Configuration("Teamwork sign-in was not completed".to_owned())
        })
    }

    fn map_tasks(&self, raw_tasks: Vec<Value>, session: &AccountSession) -> Vec<Task> {
        raw_tasks
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<RawTask>(raw) {
                Ok(raw) => Some(self.map_task(raw, session)),
                Err(err) => {
                    warn!(%err, "skipping a malformed Teamwork task");
                    None
                }
            })
            .collect()
    }

    fn map_task(&self, raw: RawTask, session: &AccountSession) -> Task {
        let mut task = Task::new(raw.id.clone().unwrap_or_default(), raw.content.clone());
        task.due_date = raw.due_date.as_deref().and_then(parse_wire_date);
        task.assignees = map_assignees(&raw, session, self.descriptor.self_label);
        task.priority = PriorityClass::from_wire(&raw.priority);
        task.has_children = raw.sub_tasks.is_some();
        task.details = Some(TaskDetails {
            start_date: raw.start_date.as_deref().and_then(parse_wire_date),
            end_date: task.due_date,
            project_id: raw.project_id.clone(),
            task_list_id: raw.task_list_id.clone(),
            progress: raw.progress,
            estimated_minutes: raw.estimated_minutes,
            description: raw.description.clone().filter(|text| !text.is_empty()),
            comment_count: raw.comment_count,
            private: raw.private,
            status: raw.status.clone(),
            last_changed: raw.last_changed_on.as_deref().and_then(parse_timestamp),
            creator: raw.creator_id.clone().map(|id| Creator {
                id,
                first_name: raw.creator_firstname.clone().unwrap_or_default(),
                last_name: raw.creator_lastname.clone().unwrap_or_default(),
                avatar_url: raw.creator_avatar_url.clone(),
            }),
        });
        if let Some(nested) = raw.sub_tasks {
            task.preload_sub_tasks(self.map_tasks(nested, session));
        }
        task.attach_provider(self.provider_handle());
        task
    }

    async fn sub_tasks_of(&self, parent: &Task) -> Result<Vec<Task>, CoreError> {
        if let Some(cached) = parent.cached_sub_tasks().await {
            return Ok(cached);
        }

        let session = self.require_session().await?;
        let route = fill_route(self.descriptor.routes.sub_tasks, &parent.id);
        let params = [("sort", self.settings.sort_by())];
        let Some(payload) = self
            .fetch_route(&session, HttpMethod::Get, &route, &params, None)
            .await?
        else {
            return Ok(Vec::new());
        };

        let sub_tasks = self.map_tasks(extract_list(payload, TASKS_KEY), &session);
        parent.store_sub_tasks(sub_tasks.clone()).await;
        Ok(sub_tasks)
    }

    async fn top_level_tasks(&self) -> Result<Vec<Task>, CoreError> {
        let session = self.require_session().await?;
        let nest = if self.settings.nest_sub_tasks() {
            "yes"
        } else {
            "no"
        };
        let grouped = self.settings.group_by_task_list();

        // Tasklists are drained one at a time so the merged output keeps
        // configuration order.
        let mut merged = Vec::new();
        for setting in &self.task_list_settings {
            if setting.id.is_empty() {
                continue;
            }
            let route = fill_route(self.descriptor.routes.task_list_tasks, &setting.id);
            let mut params: Vec<(&str, String)> = vec![
                ("nestSubTasks", nest.to_owned()),
                ("sort", self.settings.sort_by()),
            ];
            if self.settings.only_mine() {
                params.push(("responsible-party-ids", session.user_id.clone()));
            }

            let fetched = match self
                .fetch_route(&session, HttpMethod::Get, &route, &params, None)
                .await?
            {
                Some(payload) => self.map_tasks(extract_list(payload, TASKS_KEY), &session),
                None => Vec::new(),
            };

            if grouped {
                let mut group = Task::new(format!("tasklist-{}", setting.id), setting.label.clone());
                group.has_children = true;
                group.preload_sub_tasks(fetched);
                group.attach_provider(self.provider_handle());
                merged.push(group);
            } else {
                merged.extend(fetched);
            }
        }
        Ok(merged)
    }
}

#[async_trait::async_trait]
impl TaskProvider for TeamworkProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn task_list_settings(&self) -> &[TaskListSetting] {
        &self.task_list_settings
    }

    async fn register(&self) -> Result<(), CoreError> {
        if self.session.read().await.is_some() {
            return Ok(());
        }
        let Some(token) = self.token().await? else {
            return Ok(());
        };
        self.register_with_token(token).await
    }

    async fn projects(&self) -> Result<Vec<PickItem>, CoreError> {
        let session = self.require_session().await?;
        let Some(payload) = self
            .fetch_route(
                &session,
                HttpMethod::Get,
                self.descriptor.routes.projects,
                &[],
                None,
            )
            .await?
        else {
            return Ok(Vec::new());
        };

        let projects = extract_list(payload, PROJECTS_KEY)
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<RawProject>(raw) {
                Ok(project) => Some(project.into_pick_item()),
                Err(err) => {
                    warn!(%err, "skipping a malformed Teamwork project");
                    None
                }
            })
            .collect();
        Ok(projects)
    }

    async fn task_lists(&self) -> Result<Option<TaskListSetting>, CoreError> {
        let session = self.require_session().await?;
        let configured: HashSet<(String, String)> = self
            .settings
            .task_lists()
            .into_iter()
            .map(|entry| (entry.project_manager, entry.id))
            .collect();

        let mut prompt = "Pick a Teamwork project".to_owned();
        loop {
            self.interactions.progress("Loading Teamwork projects").await;
            let projects = self.projects().await?;
            if projects.is_empty() {
                return Err(CoreError::Configuration(
                    "no Teamwork projects are visible to this account".to_owned(),
                ));
            }
            let Some(project) = self.interactions.pick(&prompt, &projects).await else {
                return Ok(None);
            };

            self.interactions.progress("Loading tasklists").await;
            let route = fill_route(self.descriptor.routes.project_task_lists, &project.id);
            let Some(payload) = self
                .fetch_route(&session, HttpMethod::Get, &route, &[], None)
                .await?
            else {
                return Ok(None);
            };

            let available: Vec<RawTaskList> = extract_list(payload, TASK_LIST_KEY)
                .into_iter()
                .filter_map(|raw| serde_json::from_value::<RawTaskList>(raw).ok())
                .collect();
            if available.is_empty() {
                return Err(CoreError::Configuration(format!(
                    "project {} has no tasklists",
                    project.label
                )));
            }

            let project_name = project
                .label
                .strip_prefix("★ ")
                .unwrap_or(&project.label)
                .to_owned();
            let candidates: Vec<PickItem> = available
                .iter()
                .filter(|list| {
                    let id = list.id.clone().unwrap_or_default();
                    !configured.contains(&(self.descriptor.id.to_owned(), id))
                })
                .map(|list| {
                    PickItem::new(list.id.clone().unwrap_or_default(), list.name.clone())
                        .with_description(project_name.clone())
                })
                .collect();
            if candidates.is_empty() {
                prompt =
                    "Every tasklist there is already configured. Pick a different project"
                        .to_owned();
                continue;
            }

            let Some(chosen) = self
                .interactions
                .pick("Pick a tasklist to add", &candidates)
                .await
            else {
                return Ok(None);
            };
            return Ok(Some(TaskListSetting {
                id: chosen.id,
                label: chosen.label,
                project_manager: self.descriptor.id.to_owned(),
                project_id: project.id,
                project_name: Some(project_name),
            }));
        }
    }

    async fn tasks(&self, parent: Option<&Task>) -> Result<Vec<Task>, CoreError> {
        match parent {
            Some(parent) => self.sub_tasks_of(parent).await,
            None => self.top_level_tasks().await,
        }
    }

    async fn people(&self, project_id: &str) -> Result<Vec<PickItem>, CoreError> {
        let session = self.require_session().await?;
        let route = fill_route(self.descriptor.routes.people, project_id);
        let Some(payload) = self
            .fetch_route(&session, HttpMethod::Get, &route, &[], None)
            .await?
        else {
            return Ok(Vec::new());
        };

        let people = extract_list(payload, PEOPLE_KEY)
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<RawPerson>(raw).ok())
            .map(RawPerson::into_pick_item)
            .collect();
        Ok(people)
    }

    async fn create_task(&self, task_list_id: &str, draft: &TaskDraft) -> Result<(), CoreError> {
        let session = self.require_session().await?;
        let route = fill_route(self.descriptor.routes.task_list_tasks, task_list_id);

        let mut item = serde_json::Map::new();
        item.insert("content".to_owned(), Value::String(draft.title.clone()));
        if let Some(assignee_id) = &draft.assignee_id {
            item.insert(
                "responsible-party-id".to_owned(),
                Value::String(assignee_id.clone()),
            );
        }
        if let Some(due_date) = draft.due_date {
            item.insert("due-date".to_owned(), Value::String(wire_date(due_date)));
        }
        let body = json!({ "todo-item": item });

        match self
            .fetch_route(&session, HttpMethod::Post, &route, &[], Some(body))
            .await?
        {
            Some(_) => Ok(()),
            None => Err(CoreError::Configuration(
                "the new task never reached Teamwork".to_owned(),
            )),
        }
    }

    async fn complete_task(&self, task_id: &str) -> Result<Option<Value>, CoreError> {
        let session = self.require_session().await?;
        let route = fill_route(self.descriptor.routes.complete, task_id);
        let outcome = self
            .fetch_route(&session, HttpMethod::Put, &route, &[], None)
            .await?;
        if outcome.is_none() {
            warn!(task_id, "the completion request never reached Teamwork");
        }
        Ok(outcome)
    }
}

fn parse_account_session(
    payload: &Value,
    credentials: RestCredentials,
) -> Result<AccountSession, CoreError> {
    let account: AccountPayload = serde_json::from_value(payload.clone()).map_err(|err| {
        CoreError::Configuration(format!("unexpected Teamwork auth response: {err}"))
    })?;
    let user_id = account.user_id.ok_or_else(|| {
        CoreError::Configuration("Teamwork auth response is missing the user id".to_owned())
    })?;
    let base_url = account
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            CoreError::Configuration(
                "Teamwork auth response is missing the account URL".to_owned(),
            )
        })?;
    Ok(AccountSession {
        user_id,
        base_url: base_url.trim_end_matches('/').to_owned(),
        credentials,
    })
}

fn map_assignees(raw: &RawTask, session: &AccountSession, self_label: &str) -> Assignees {
    if let Some(ids) = raw
        .responsible_party_id
        .as_deref()
        .filter(|ids| !ids.is_empty())
    {
        let names = raw.responsible_party_names.as_deref().unwrap_or_default();
        return Assignees::People(Person::zip(ids, names));
    }
    if let Some(summary) = raw
        .responsible_party_summary
        .as_deref()
        .filter(|summary| !summary.is_empty())
    {
        if raw.responsible_party_id.as_deref() == Some(session.user_id.as_str()) {
            return Assignees::Summary(self_label.to_owned());
        }
        return Assignees::Summary(summary.to_owned());
    }
    Assignees::Unassigned
}

/// The unwrapped payload is usually the list itself, but some responses keep
/// sibling keys, so fall back to looking the list up by name.
fn extract_list(payload: Value, key: &str) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }))
}

fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(number)) => number.as_i64().unwrap_or(0) != 0,
        Some(Value::String(text)) => matches!(text.as_str(), "1" | "true" | "yes"),
        _ => false,
    })
}

#[derive(Debug, Deserialize)]
struct AccountPayload {
    #[serde(default, rename = "userId", deserialize_with = "stringish")]
    user_id: Option<String>,
    #[serde(default, rename = "URL")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    #[serde(default, deserialize_with = "stringish")]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    starred: bool,
    #[serde(default)]
    company: Option<RawCompany>,
}

#[derive(Debug, Deserialize)]
struct RawCompany {
    #[serde(default)]
    name: String,
}

impl RawProject {
    fn into_pick_item(self) -> PickItem {
        let label = if self.starred {
            format!("★ {}", self.name)
        } else {
            self.name
        };
        let mut item = PickItem::new(self.id.unwrap_or_default(), label);
        if let Some(company) = self.company {
            item = item.with_description(company.name);
        }
        item
    }
}

#[derive(Debug, Deserialize)]
struct RawTaskList {
    #[serde(default, deserialize_with = "stringish")]
    id: Option<String>,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawPerson {
    #[serde(default, deserialize_with = "stringish")]
    id: Option<String>,
    #[serde(default, rename = "first-name")]
    first_name: String,
    #[serde(default, rename = "last-name")]
    last_name: String,
}

impl RawPerson {
    fn into_pick_item(self) -> PickItem {
        let full_name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned();
        PickItem::new(self.id.unwrap_or_default(), full_name)
    }
}

#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(default, deserialize_with = "stringish")]
    id: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "due-date")]
    due_date: Option<String>,
    #[serde(default, rename = "start-date")]
    start_date: Option<String>,
    #[serde(default, rename = "responsible-party-id", deserialize_with = "stringish")]
    responsible_party_id: Option<String>,
    #[serde(default, rename = "responsible-party-names")]
    responsible_party_names: Option<String>,
    #[serde(default, rename = "responsible-party-summary")]
    responsible_party_summary: Option<String>,
    #[serde(default)]
    priority: String,
    #[serde(default, rename = "subTasks")]
    sub_tasks: Option<Vec<Value>>,
    #[serde(default, rename = "project-id", deserialize_with = "stringish")]
    project_id: Option<String>,
    #[serde(default, rename = "todo-list-id", deserialize_with = "stringish")]
    task_list_id: Option<String>,
    #[serde(default)]
    progress: Option<u8>,
    #[serde(default, rename = "estimated-minutes")]
    estimated_minutes: Option<u32>,
    #[serde(default, rename = "comments-count")]
    comment_count: Option<u32>,
    #[serde(default, deserialize_with = "loose_bool")]
    private: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "last-changed-on")]
    last_changed_on: Option<String>,
    #[serde(default, rename = "creator-id", deserialize_with = "stringish")]
    creator_id: Option<String>,
    #[serde(default, rename = "creator-firstname")]
    creator_firstname: Option<String>,
    #[serde(default, rename = "creator-lastname")]
    creator_lastname: Option<String>,
    #[serde(default, rename = "creator-avatar-url")]
    creator_avatar_url: Option<String>,
}
