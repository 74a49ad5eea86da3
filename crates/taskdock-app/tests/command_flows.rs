use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};

use taskdock_app::PanelCommands;
use taskdock_domain::{CoreError, Interactions, NoticeLevel, PickItem, TaskListSetting};
use taskdock_panel::{
    ChildrenResolver, ProviderSource, RefreshSignal, COMMAND_ADD_TASK, COMMAND_COMPLETE_TASK,
    COMMAND_CONFIGURE, COMMAND_REFRESH, COMMAND_VIEW_TASK,
};
use taskdock_providers::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, ProviderContext, ProviderRegistry,
    TransportError,
};
use taskdock_settings::{
    ChangeCallback, PanelSettings, SettingScope, SettingsError, SettingsStore, KEY_TASK_LIST,
};

struct QueueTransport {
    responses: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl QueueTransport {
    fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait::async_trait]
impl HttpTransport for QueueTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().expect("requests lock").push(request);
        let body = self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .ok_or_else(|| TransportError::Http("no queued response".to_owned()))?;
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }
}

#[derive(Default)]
struct ScriptedInteractions {
    picks: Mutex<VecDeque<String>>,
    inputs: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl ScriptedInteractions {
    fn with(picks: &[&str], inputs: &[Option<&str>]) -> Arc<Self> {
        Arc::new(Self {
            picks: Mutex::new(picks.iter().map(|pick| (*pick).to_owned()).collect()),
            inputs: Mutex::new(inputs.iter().map(|input| input.map(str::to_owned)).collect()),
            ..Self::default()
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }

    fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().expect("notices lock").clone()
    }
}

#[async_trait::async_trait]
impl Interactions for ScriptedInteractions {
    async fn pick(&self, prompt: &str, items: &[PickItem]) -> Option<PickItem> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_owned());
        let wanted = self.picks.lock().expect("picks lock").pop_front()?;
        items.iter().find(|item| item.id == wanted).cloned()
    }

    async fn input(&self, _prompt: &str, _placeholder: Option<&str>) -> Option<String> {
        self.inputs
            .lock()
            .expect("inputs lock")
            .pop_front()
            .flatten()
    }

    async fn open_url(&self, _url: &str) {}

    async fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices
            .lock()
            .expect("notices lock")
            .push((level, message.to_owned()));
    }
}

struct MemoryStore {
    values: Mutex<Map<String, Value>>,
    workspace: bool,
}

impl MemoryStore {
    fn new(workspace: bool) -> Self {
        Self {
            values: Mutex::new(Map::new()),
            workspace,
        }
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().expect("values lock").get(key).cloned()
    }

    fn update(&self, key: &str, value: Value, _scope: SettingScope) -> Result<(), SettingsError> {
        self.values
            .lock()
            .expect("values lock")
            .insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str, _scope: SettingScope) -> Result<(), SettingsError> {
        self.values.lock().expect("values lock").remove(key);
        Ok(())
    }

    fn subscribe(&self, _prefix: &str, _callback: ChangeCallback) {}

    fn has_workspace(&self) -> bool {
        self.workspace
    }
}

struct Harness {
    commands: PanelCommands,
    transport: Arc<QueueTransport>,
    interactions: Arc<ScriptedInteractions>,
    settings: PanelSettings,
    refresh: Arc<RefreshSignal>,
}

impl Harness {
    fn tick(&self) -> u64 {
        *self.refresh.subscribe().borrow()
    }
}

fn configured_entry(id: &str) -> TaskListSetting {
    TaskListSetting {
        id: id.to_owned(),
        label: format!("List {id}"),
        project_manager: "teamwork".to_owned(),
        project_id: "900".to_owned(),
        project_name: Some("Website".to_owned()),
    }
}

fn auth_response() -> Value {
    json!({
        "STATUS": "OK",
        "account": {
            "userId": 501,
            "URL": "https://acme.teamwork.com/"
        }
    })
}

fn harness(
    workspace: bool,
    entries: Vec<TaskListSetting>,
    responses: Vec<Value>,
    interactions: Arc<ScriptedInteractions>,
) -> Harness {
    let settings = PanelSettings::new(Arc::new(MemoryStore::new(workspace)));
    if !entries.is_empty() {
        settings
            .store()
            .update(
                KEY_TASK_LIST,
                serde_json::to_value(&entries).expect("serialize entries"),
                SettingScope::Workspace,
            )
            .expect("seed tasklists");
    }
    settings.set_token("teamwork", "secret").expect("seed token");

    let transport = Arc::new(QueueTransport::new(responses));
    let context = ProviderContext {
        settings: settings.clone(),
        interactions: Arc::clone(&interactions) as Arc<dyn Interactions>,
        transport: Arc::clone(&transport) as Arc<dyn HttpTransport>,
    };
    let registry = ProviderRegistry::new(context.clone());
    let resolver = Arc::new(ChildrenResolver::new(
        settings.clone(),
        Arc::clone(&registry) as Arc<dyn ProviderSource>,
        Arc::clone(&interactions) as Arc<dyn Interactions>,
    ));
    let refresh = Arc::new(RefreshSignal::new());
    let commands = PanelCommands::new(context, registry, resolver, Arc::clone(&refresh));

    Harness {
        commands,
        transport,
        interactions,
        settings,
        refresh,
    }
}

#[tokio::test]
async fn refreshing_bumps_the_panel_signal() {
    let interactions = ScriptedInteractions::with(&[], &[]);
    let harness = harness(true, vec![configured_entry("10")], Vec::new(), interactions);

    harness
        .commands
        .dispatch(COMMAND_REFRESH, None)
        .await
        .expect("refresh");

    assert_eq!(harness.tick(), 1);
}

#[tokio::test]
async fn adding_a_task_posts_the_draft_through_the_provider() {
    let interactions = ScriptedInteractions::with(
        &["11"],
        &[Some("Write the docs"), Some("16/06/2023")],
    );
    let responses = vec![
        auth_response(),
        json!({
            "STATUS": "OK",
            "people": [
                {"id": 11, "first-name": "Ada", "last-name": "Lovelace"},
                {"id": 12, "first-name": "Grace", "last-name": "Hopper"}
            ]
        }),
        json!({"STATUS": "OK"}),
    ];
    let harness = harness(true, vec![configured_entry("10")], responses, interactions);

    harness
        .commands
        .dispatch(COMMAND_ADD_TASK, None)
        .await
        .expect("add task");

    let requests = harness.transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].url, "https://api.teamwork.com/authenticate.json");
    let auth = requests[0].basic_auth.clone().expect("credentials");
    assert_eq!(auth.username, "secret");
    assert_eq!(auth.password, "terces");
    assert_eq!(
        requests[1].url,
        "https://acme.teamwork.com/projects/900/people.json"
    );
    assert_eq!(requests[2].method, HttpMethod::Post);
    assert_eq!(
        requests[2].url,
        "https://acme.teamwork.com/tasklists/10/tasks.json"
    );
    assert_eq!(
        requests[2].body,
        Some(json!({
            "todo-item": {
                "content": "Write the docs",
                "responsible-party-id": "11",
                "due-date": "20230616"
            }
        }))
    );
    assert_eq!(
        harness.interactions.notices(),
        vec![(
            NoticeLevel::Info,
            "\"Write the docs\" has been Created".to_owned()
        )]
    );
    assert_eq!(harness.tick(), 1);
}

#[tokio::test]
async fn an_unreadable_due_date_is_rechallenged() {
    let interactions = ScriptedInteractions::with(
        &[],
        &[Some("Write the docs"), Some("next tuesday"), Some("16/06/2023")],
    );
    let responses = vec![
        auth_response(),
        json!({"STATUS": "OK", "people": []}),
        json!({"STATUS": "OK"}),
    ];
    let harness = harness(true, vec![configured_entry("10")], responses, interactions);

    harness
        .commands
        .dispatch(COMMAND_ADD_TASK, None)
        .await
        .expect("add task");

    let notices = harness.interactions.notices();
    assert_eq!(
        notices[0],
        (
            NoticeLevel::Warning,
            "Enter the date as dd/mm/yyyy or leave it empty".to_owned()
        )
    );
    let requests = harness.transport.requests();
    let body = requests.last().and_then(|request| request.body.clone());
    assert_eq!(
        body,
        Some(json!({
            "todo-item": {
                "content": "Write the docs",
                "due-date": "20230616"
            }
        }))
    );
}

#[tokio::test]
async fn abandoning_the_title_prompt_files_nothing() {
    let interactions = ScriptedInteractions::with(&[], &[None]);
    let harness = harness(true, vec![configured_entry("10")], Vec::new(), interactions);

    harness
        .commands
        .dispatch(COMMAND_ADD_TASK, None)
        .await
        .expect("add task");

    assert!(harness.transport.requests().is_empty());
    assert_eq!(harness.tick(), 0);
}

#[tokio::test]
async fn several_configured_tasklists_prompt_for_the_target() {
    let interactions = ScriptedInteractions::with(&["20"], &[None]);
    let harness = harness(
        true,
        vec![configured_entry("10"), configured_entry("20")],
        Vec::new(),
        interactions,
    );

    harness
        .commands
        .dispatch(COMMAND_ADD_TASK, None)
        .await
        .expect("add task");

    assert_eq!(harness.interactions.prompts(), vec!["Pick a tasklist"]);
}

#[tokio::test]
async fn an_explicit_tasklist_argument_skips_the_prompt() {
    let interactions = ScriptedInteractions::with(&[], &[None]);
    let harness = harness(
        true,
        vec![configured_entry("10"), configured_entry("20")],
        Vec::new(),
        interactions,
    );

    harness
        .commands
        .dispatch(COMMAND_ADD_TASK, Some("20"))
        .await
        .expect("add task");

    assert!(harness.interactions.prompts().is_empty());
}

#[tokio::test]
async fn completing_a_task_notifies_and_refreshes() {
    let interactions = ScriptedInteractions::with(&[], &[]);
    let responses = vec![
        auth_response(),
        json!({
            "STATUS": "OK",
            "todo-items": [{"id": 77, "content": "Fix the build"}]
        }),
        json!({"STATUS": "OK"}),
    ];
    let harness = harness(true, vec![configured_entry("10")], responses, interactions);

    harness
        .commands
        .dispatch(COMMAND_COMPLETE_TASK, Some("77"))
        .await
        .expect("complete task");

    let requests = harness.transport.requests();
    let last = requests.last().expect("completion request");
    assert_eq!(last.method, HttpMethod::Put);
    assert_eq!(last.url, "https://acme.teamwork.com/tasks/77/complete.json");
    assert_eq!(
        harness.interactions.notices(),
        vec![(
            NoticeLevel::Info,
            "\"Fix the build\" has been Completed".to_owned()
        )]
    );
    assert_eq!(harness.tick(), 1);
}

#[tokio::test]
async fn viewing_a_task_prints_its_detail() {
    let interactions = ScriptedInteractions::with(&[], &[]);
    let responses = vec![
        auth_response(),
        json!({
            "STATUS": "OK",
            "todo-items": [{"id": 77, "content": "Fix the build", "progress": 40}]
        }),
    ];
    let harness = harness(true, vec![configured_entry("10")], responses, interactions);

    harness
        .commands
        .dispatch(COMMAND_VIEW_TASK, Some("77"))
        .await
        .expect("view task");

    let notices = harness.interactions.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, NoticeLevel::Info);
    assert!(notices[0].1.contains("Fix the build"));
    assert!(notices[0].1.contains("Progress: 40%"));
}

#[tokio::test]
async fn viewing_without_a_selection_notifies() {
    let interactions = ScriptedInteractions::with(&[], &[]);
    let harness = harness(true, vec![configured_entry("10")], Vec::new(), interactions);

    harness
        .commands
        .dispatch(COMMAND_VIEW_TASK, None)
        .await
        .expect("view task");

    assert_eq!(
        harness.interactions.notices(),
        vec![(NoticeLevel::Info, "No task is selected".to_owned())]
    );
    assert!(harness.transport.requests().is_empty());
}

#[tokio::test]
async fn viewing_an_unknown_task_reports_no_selection() {
    let interactions = ScriptedInteractions::with(&[], &[]);
    let responses = vec![
        auth_response(),
        json!({
            "STATUS": "OK",
            "todo-items": [{"id": 77, "content": "Fix the build"}]
        }),
    ];
    let harness = harness(true, vec![configured_entry("10")], responses, interactions);

    harness
        .commands
        .dispatch(COMMAND_VIEW_TASK, Some("404"))
        .await
        .expect("view task");

    assert_eq!(
        harness.interactions.notices(),
        vec![(NoticeLevel::Info, "No task is selected".to_owned())]
    );
}

#[tokio::test]
async fn configuring_binds_a_new_tasklist() {
    let interactions = ScriptedInteractions::with(&["teamwork", "900", "10"], &[]);
    let responses = vec![
        auth_response(),
        json!({
            "STATUS": "OK",
            "projects": [{"id": 900, "name": "Website", "company": {"name": "Acme"}}]
        }),
        json!({
            "STATUS": "OK",
            "tasklists": [{"id": 10, "name": "Sprint backlog"}]
        }),
    ];
    let harness = harness(true, Vec::new(), responses, interactions);

    harness
        .commands
        .dispatch(COMMAND_CONFIGURE, None)
        .await
        .expect("configure");

    assert_eq!(
        harness.interactions.prompts(),
        vec![
            "Pick a project manager",
            "Pick a Teamwork project",
            "Pick a tasklist to add"
        ]
    );
    assert_eq!(
        harness.settings.task_lists(),
        vec![TaskListSetting {
            id: "10".to_owned(),
            label: "Sprint backlog".to_owned(),
            project_manager: "teamwork".to_owned(),
            project_id: "900".to_owned(),
            project_name: Some("Website".to_owned()),
        }]
    );
    assert_eq!(harness.tick(), 1);
}

#[tokio::test]
async fn configuring_without_a_workspace_warns() {
    let interactions = ScriptedInteractions::with(&[], &[]);
    let harness = harness(false, Vec::new(), Vec::new(), interactions);

    harness
        .commands
        .dispatch(COMMAND_CONFIGURE, None)
        .await
        .expect("configure");

    assert_eq!(
        harness.interactions.notices(),
        vec![(
            NoticeLevel::Warning,
            "Open a workspace folder to configure a project manager".to_owned()
        )]
    );
    assert!(harness.transport.requests().is_empty());
    assert!(harness.settings.task_lists().is_empty());
}

#[tokio::test]
async fn abandoning_the_provider_picker_changes_nothing() {
    let interactions = ScriptedInteractions::with(&[], &[]);
    let harness = harness(true, Vec::new(), Vec::new(), interactions);

    harness
        .commands
        .dispatch(COMMAND_CONFIGURE, None)
        .await
        .expect("configure");

    assert!(harness.transport.requests().is_empty());
    assert!(harness.settings.task_lists().is_empty());
    assert_eq!(harness.tick(), 0);
}

#[tokio::test]
async fn unknown_command_ids_are_rejected() {
    let interactions = ScriptedInteractions::with(&[], &[]);
    let harness = harness(true, Vec::new(), Vec::new(), interactions);

    let error = harness
        .commands
        .dispatch("taskdock.unknown", None)
        .await
        .expect_err("unknown command");

    assert!(matches!(error, CoreError::Configuration(_)));
    assert!(error.to_string().contains("Unknown command"));
}
