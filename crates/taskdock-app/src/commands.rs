use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Local;
use tracing::warn;

use taskdock_domain::calendar;
use taskdock_domain::{
    CoreError, Interactions, NoticeLevel, PickItem, Task, TaskDraft, TaskListSetting,
};
use taskdock_panel::{
    detail_text, ChildrenOutcome, ChildrenResolver, RefreshSignal, COMMAND_ADD_TASK,
    COMMAND_COMPLETE_TASK, COMMAND_CONFIGURE, COMMAND_REFRESH, COMMAND_VIEW_TASK,
    UNCONFIGURED_WARNING,
};
use taskdock_providers::{build_provider, known_descriptors, ProviderContext, ProviderRegistry};

const NO_TASK_SELECTED: &str = "No task is selected";

/// The panel's command surface. Each entry point mirrors one host command id
/// and drives its own prompts through `Interactions`; a user backing out of
/// a prompt abandons the command without an error.
pub struct PanelCommands {
    context: ProviderContext,
    registry: Arc<ProviderRegistry>,
    resolver: Arc<ChildrenResolver>,
    refresh: Arc<RefreshSignal>,
}

impl PanelCommands {
    pub fn new(
        context: ProviderContext,
        registry: Arc<ProviderRegistry>,
        resolver: Arc<ChildrenResolver>,
        refresh: Arc<RefreshSignal>,
    ) -> Self {
        Self {
            context,
            registry,
            resolver,
            refresh,
        }
    }

    /// Routes a host command id to its handler. `argument` carries whatever
    /// id the host attached to the invocation, if any.
    pub async fn dispatch(
        &self,
        command_id: &str,
        argument: Option<&str>,
    ) -> Result<(), CoreError> {
        match command_id {
            COMMAND_REFRESH => {
                self.refresh_task_list();
                Ok(())
            }
            COMMAND_ADD_TASK => self.add_task(argument).await,
            COMMAND_VIEW_TASK => self.view_task(argument).await,
            COMMAND_COMPLETE_TASK => self.complete_task(argument).await,
            COMMAND_CONFIGURE => self.configure().await,
            other => Err(CoreError::Configuration(format!(
                "Unknown command '{other}'."
            ))),
        }
    }

    pub fn refresh_task_list(&self) {
        self.refresh.bump();
    }

    /// Prompts for a new task and files it with the owning provider. Backing
    /// out of the tasklist or title prompt drops the draft; skipping the
    /// assignee or due date just leaves that field empty.
    pub async fn add_task(&self, task_list_id: Option<&str>) -> Result<(), CoreError> {
        let Some(setting) = self.pick_task_list(task_list_id).await else {
            return Ok(());
        };
        let Some(provider) = self.registry.provider_for(&setting.project_manager) else {
            self.interactions()
                .notify(
                    NoticeLevel::Error,
                    &format!("No provider is available for {}", setting.project_manager),
                )
                .await;
            return Ok(());
        };

        let Some(title) = self
            .interactions()
            .input("New task", Some("What needs to be done?"))
            .await
            .map(|title| title.trim().to_owned())
            .filter(|title| !title.is_empty())
        else {
            return Ok(());
        };

        let people = match provider.people(&setting.project_id).await {
            Ok(people) => people,
            Err(error) => {
                warn!(%error, "people lookup failed while drafting a task");
                Vec::new()
            }
        };
        let assignee_id = if people.is_empty() {
            None
        } else {
            self.interactions()
                .pick("Who should do this?", &people)
                .await
                .map(|person| person.id)
        };

        // Re-challenge until the date parses; an empty line skips the field.
        let due_date = loop {
            let Some(raw) = self
                .interactions()
                .input("When is it due?", Some("dd/mm/yyyy"))
                .await
            else {
                break None;
            };
            match calendar::parse_input_date(&raw) {
                Some(date) => break Some(date),
                None => {
                    self.interactions()
                        .notify(
                            NoticeLevel::Warning,
                            "Enter the date as dd/mm/yyyy or leave it empty",
                        )
                        .await;
                }
            }
        };

        self.interactions().progress("Creating the task").await;
        let draft = TaskDraft {
            title,
            assignee_id,
            due_date,
        };
        match provider.create_task(&setting.id, &draft).await {
            Ok(()) => {
                self.interactions()
                    .notify(
                        NoticeLevel::Info,
                        &format!("\"{}\" has been Created", draft.title),
                    )
                    .await;
                self.refresh.bump();
            }
            Err(error) => {
                self.interactions()
                    .notify(NoticeLevel::Error, &error.to_string())
                    .await;
            }
        }
        Ok(())
    }

    /// Shows the detail view of a task, located by id in the current
    /// resolution.
    pub async fn view_task(&self, task_id: Option<&str>) -> Result<(), CoreError> {
        let Some(task) = self.find_task(task_id).await else {
            self.interactions()
                .notify(NoticeLevel::Info, NO_TASK_SELECTED)
                .await;
            return Ok(());
        };
        let text = detail_text(&task, Local::now().date_naive());
        self.interactions().notify(NoticeLevel::Info, &text).await;
        Ok(())
    }

    pub async fn complete_task(&self, task_id: Option<&str>) -> Result<(), CoreError> {
        let Some(task) = self.find_task(task_id).await else {
            self.interactions()
                .notify(NoticeLevel::Info, NO_TASK_SELECTED)
                .await;
            return Ok(());
        };
        match task.complete().await {
            Ok(_) => {
                self.interactions()
                    .notify(
                        NoticeLevel::Info,
                        &format!("\"{}\" has been Completed", task.title),
                    )
                    .await;
                self.refresh.bump();
            }
            Err(error) => {
                self.interactions()
                    .notify(NoticeLevel::Error, &error.to_string())
                    .await;
            }
        }
        Ok(())
    }

    /// Walks the configure flow: pick a provider, sign in, pick a project
    /// and one of its unconfigured tasklists, and persist the binding.
    pub async fn configure(&self) -> Result<(), CoreError> {
        if !self.context.settings.has_workspace() {
            self.interactions()
                .notify(
                    NoticeLevel::Warning,
                    "Open a workspace folder to configure a project manager",
                )
                .await;
            return Ok(());
        }

        let descriptors = known_descriptors();
        let items: Vec<PickItem> = descriptors
            .iter()
            .map(|descriptor| {
                PickItem::new(descriptor.id, descriptor.label)
                    .with_description(descriptor.description)
            })
            .collect();
        let Some(choice) = self
            .interactions()
            .pick("Pick a project manager", &items)
            .await
        else {
            return Ok(());
        };

        // Reuse the configured adapter when one exists so its session and
        // already-bound tasklists carry into the discovery filter.
        let provider = match self.registry.provider_for(&choice.id) {
            Some(provider) => provider,
            None => build_provider(&choice.id, Vec::new(), &self.context),
        };
        provider.register().await?;

        let Some(setting) = provider.task_lists().await? else {
            return Ok(());
        };
        let changed = self
            .context
            .settings
            .add_task_list(setting)
            .map_err(|err| CoreError::Configuration(err.to_string()))?;
        if changed {
            self.refresh.bump();
        }
        Ok(())
    }

    fn interactions(&self) -> &dyn Interactions {
        self.context.interactions.as_ref()
    }

    /// Resolves which configured tasklist a new task lands in. An explicit
    /// id wins, a single configuration skips the prompt, several ask.
    async fn pick_task_list(&self, task_list_id: Option<&str>) -> Option<TaskListSetting> {
        let entries = self.context.settings.task_lists();
        if let Some(id) = task_list_id {
            return entries.into_iter().find(|entry| entry.id == id);
        }
        match entries.len() {
            0 => {
                self.interactions()
                    .notify(NoticeLevel::Warning, UNCONFIGURED_WARNING)
                    .await;
                None
            }
            1 => entries.into_iter().next(),
            _ => {
                let items: Vec<PickItem> = entries
                    .iter()
                    .map(|entry| {
                        let item = PickItem::new(entry.id.clone(), entry.label.clone());
                        match &entry.project_name {
                            Some(project) => item.with_description(project.clone()),
                            None => item,
                        }
                    })
                    .collect();
                let choice = self.interactions().pick("Pick a tasklist", &items).await?;
                entries.into_iter().find(|entry| entry.id == choice.id)
            }
        }
    }

    /// Finds a task by id in the current resolution, descending into parents
    /// breadth-first.
    async fn find_task(&self, task_id: Option<&str>) -> Option<Task> {
        let task_id = task_id?;
        let ChildrenOutcome::Tasks(tasks) = self.resolver.resolve_top_level().await else {
            return None;
        };
        let mut queue: VecDeque<Task> = tasks.into();
        while let Some(task) = queue.pop_front() {
            if task.id == task_id {
                return Some(task);
            }
            if task.has_children {
                queue.extend(self.resolver.resolve_children(&task).await);
            }
        }
        None
    }
}
