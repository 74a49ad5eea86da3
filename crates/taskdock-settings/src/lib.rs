use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use taskdock_domain::tasklist::{merge_task_list, TaskListSetting};

pub const ENV_TASKDOCK_SETTINGS: &str = "TASKDOCK_SETTINGS";

pub const KEY_TASK_LIST: &str = "taskList";
pub const KEY_SORT_BY: &str = "sortBy";
pub const KEY_ONLY_MINE: &str = "onlyMine";
pub const KEY_NEST_SUB_TASKS: &str = "nestSubTasks";
pub const KEY_GROUP_BY_TASK_LIST: &str = "groupTasksByProject";

const DEFAULT_SORT_BY: &str = "duedate";
const DEFAULT_ONLY_MINE: bool = true;
const DEFAULT_NEST_SUB_TASKS: bool = true;
const DEFAULT_GROUP_BY_TASK_LIST: bool = false;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0}")]
    Message(String),
}

impl SettingsError {
    fn storage(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingScope {
    User,
    Workspace,
}

pub type ChangeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Key-value settings shared with the host editor. Reads resolve workspace
/// over user scope; writes name their scope explicitly. Subscribers are
/// notified after any write whose key starts with their prefix.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn update(&self, key: &str, value: Value, scope: SettingScope) -> Result<(), SettingsError>;
    fn remove(&self, key: &str, scope: SettingScope) -> Result<(), SettingsError>;
    fn subscribe(&self, prefix: &str, callback: ChangeCallback);
    fn has_workspace(&self) -> bool;
}

struct ScopeState {
    user: Map<String, Value>,
    workspace: Option<Map<String, Value>>,
}

pub struct FileSettingsStore {
    user_path: PathBuf,
    workspace_path: Option<PathBuf>,
    state: RwLock<ScopeState>,
    subscribers: RwLock<Vec<(String, ChangeCallback)>>,
}

impl FileSettingsStore {
    pub fn open(
        user_path: PathBuf,
        workspace_path: Option<PathBuf>,
    ) -> Result<Self, SettingsError> {
        let user = load_or_create_scope(&user_path)?;
        let workspace = match &workspace_path {
            Some(path) => Some(load_or_create_scope(path)?),
            None => None,
        };
        debug!(user = %user_path.display(), workspace = ?workspace_path, "opened settings store");

        Ok(Self {
            user_path,
            workspace_path,
            state: RwLock::new(ScopeState { user, workspace }),
            subscribers: RwLock::new(Vec::new()),
        })
    }

    fn notify(&self, key: &str) {
        let matching = match self.subscribers.read() {
            Ok(subscribers) => subscribers
                .iter()
                .filter(|(prefix, _)| key.starts_with(prefix.as_str()))
                .map(|(_, callback)| Arc::clone(callback))
                .collect::<Vec<_>>(),
            Err(_) => Vec::new(),
        };
        for callback in matching {
            callback(key);
        }
    }

    fn write_scope(
        &self,
        key: &str,
        value: Option<Value>,
        scope: SettingScope,
    ) -> Result<(), SettingsError> {
        {
            let mut state = self
                .state
                .write()
                .map_err(|_| SettingsError::storage("settings state lock poisoned"))?;
            let (map, path) = match scope {
                SettingScope::User => (&mut state.user, self.user_path.as_path()),
                SettingScope::Workspace => {
                    let path = self.workspace_path.as_deref().ok_or_else(|| {
                        SettingsError::storage(
                            "cannot write workspace settings without an open workspace",
                        )
                    })?;
                    let map = state.workspace.as_mut().ok_or_else(|| {
                        SettingsError::storage(
                            "cannot write workspace settings without an open workspace",
                        )
                    })?;
                    (map, path)
                }
            };

            match value {
                Some(value) => {
                    map.insert(key.to_owned(), value);
                }
                None => {
                    map.remove(key);
                }
            }
            persist_scope(path, map)?;
        }

        self.notify(key);
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.read().ok()?;
        if let Some(workspace) = &state.workspace {
            if let Some(value) = workspace.get(key) {
                return Some(value.clone());
            }
        }
        state.user.get(key).cloned()
    }

    fn update(&self, key: &str, value: Value, scope: SettingScope) -> Result<(), SettingsError> {
        self.write_scope(key, Some(value), scope)
    }

    fn remove(&self, key: &str, scope: SettingScope) -> Result<(), SettingsError> {
        self.write_scope(key, None, scope)
    }

    fn subscribe(&self, prefix: &str, callback: ChangeCallback) {
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.push((prefix.to_owned(), callback));
        }
    }

    fn has_workspace(&self) -> bool {
        self.workspace_path.is_some()
    }
}

fn persist_scope(path: &Path, map: &Map<String, Value>) -> Result<(), SettingsError> {
    let rendered = serde_json::to_string_pretty(&Value::Object(map.clone())).map_err(|err| {
        SettingsError::storage(format!(
            "Failed to serialize settings for {}: {err}",
            path.display()
        ))
    })?;

    std::fs::write(path, rendered.as_bytes()).map_err(|err| {
        SettingsError::storage(format!(
            "Failed to write settings to {}: {err}",
            path.display()
        ))
    })
}

fn load_or_create_scope(path: &Path) -> Result<Map<String, Value>, SettingsError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        SettingsError::storage(format!(
                            "Failed to create parent directory {} for settings: {err}",
                            parent.display()
                        ))
                    })?;
                }
            }

            let empty = Map::new();
            persist_scope(path, &empty)?;
            return Ok(empty);
        }
        Err(err) => {
            return Err(SettingsError::storage(format!(
                "Failed to read settings from {}: {err}",
                path.display()
            )));
        }
    };

    let parsed: Value = serde_json::from_str(&raw).map_err(|err| {
        SettingsError::storage(format!(
            "Failed to parse settings from {}: {err}",
            path.display()
        ))
    })?;
    match parsed {
        Value::Object(map) => Ok(map),
        other => Err(SettingsError::storage(format!(
            "Settings file {} must hold a JSON object, found {other}",
            path.display()
        ))),
    }
}

/// Default user-scope settings path: `$TASKDOCK_SETTINGS` when set, else
/// `~/.config/taskdock/settings.json`.
pub fn default_user_settings_path() -> Result<PathBuf, SettingsError> {
    if let Ok(path) = std::env::var(ENV_TASKDOCK_SETTINGS) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let home = resolve_home_dir()?;
    Ok(home.join(".config").join("taskdock").join("settings.json"))
}

fn resolve_home_dir() -> Result<PathBuf, SettingsError> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Ok(PathBuf::from(profile));
        }
    }
    Err(SettingsError::storage(
        "Could not determine a home directory for the settings file",
    ))
}

fn token_key(provider_id: &str) -> String {
    format!("{provider_id}Token")
}

/// Typed accessors over the raw store for the panel's own keys.
#[derive(Clone)]
pub struct PanelSettings {
    store: Arc<dyn SettingsStore>,
}

impl PanelSettings {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn SettingsStore> {
        Arc::clone(&self.store)
    }

    pub fn has_workspace(&self) -> bool {
        self.store.has_workspace()
    }

    pub fn task_lists(&self) -> Vec<TaskListSetting> {
        let Some(raw) = self.store.get(KEY_TASK_LIST) else {
            return Vec::new();
        };
        match serde_json::from_value(raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(%err, "ignoring malformed {KEY_TASK_LIST} setting");
                Vec::new()
            }
        }
    }

    /// Merges one tasklist binding into the workspace-scoped list, deduped
    /// by `(provider, id)`. Returns whether the list changed.
    pub fn add_task_list(&self, incoming: TaskListSetting) -> Result<bool, SettingsError> {
        let mut entries = self.task_lists();
        if !merge_task_list(&mut entries, incoming) {
            return Ok(false);
        }
        let value = serde_json::to_value(&entries).map_err(|err| {
            SettingsError::storage(format!("Failed to serialize {KEY_TASK_LIST}: {err}"))
        })?;
        self.store
            .update(KEY_TASK_LIST, value, SettingScope::Workspace)?;
        Ok(true)
    }

    pub fn sort_by(&self) -> String {
        self.store
            .get(KEY_SORT_BY)
            .and_then(|value| value.as_str().map(str::to_owned))
            .unwrap_or_else(|| DEFAULT_SORT_BY.to_owned())
    }

    pub fn only_mine(&self) -> bool {
        self.store
            .get(KEY_ONLY_MINE)
            .and_then(|value| value.as_bool())
            .unwrap_or(DEFAULT_ONLY_MINE)
    }

    pub fn nest_sub_tasks(&self) -> bool {
        self.store
            .get(KEY_NEST_SUB_TASKS)
            .and_then(|value| value.as_bool())
            .unwrap_or(DEFAULT_NEST_SUB_TASKS)
    }

    pub fn group_by_task_list(&self) -> bool {
        self.store
            .get(KEY_GROUP_BY_TASK_LIST)
            .and_then(|value| value.as_bool())
            .unwrap_or(DEFAULT_GROUP_BY_TASK_LIST)
    }

    pub fn token(&self, provider_id: &str) -> Option<String> {
        self.store
            .get(&token_key(provider_id))
            .and_then(|value| value.as_str().map(str::to_owned))
            .filter(|token| !token.trim().is_empty())
    }

    /// Tokens are account secrets, so they always land in user scope.
    pub fn set_token(&self, provider_id: &str, token: &str) -> Result<(), SettingsError> {
        self.store.update(
            &token_key(provider_id),
            Value::String(token.to_owned()),
            SettingScope::User,
        )
    }
}
