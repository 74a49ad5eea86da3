use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;

use taskdock_app::{ConsoleInteractions, PanelCommands};
use taskdock_domain::{CollapsedState, CoreError, Interactions, NodeIcon, TreeNode};
use taskdock_panel::{
    nodes_for, task_node, ChildrenOutcome, ChildrenResolver, ProviderSource, RefreshSignal,
    COMMAND_ADD_TASK, COMMAND_COMPLETE_TASK, COMMAND_CONFIGURE, COMMAND_VIEW_TASK,
};
use taskdock_providers::{ProviderContext, ProviderRegistry, ReqwestTransport};
use taskdock_settings::{default_user_settings_path, FileSettingsStore, PanelSettings};

#[tokio::main]
async fn main() -> Result<()> {
    let flags = parse_cli_flags()?;
    let settings_path = match &flags.settings_path {
        Some(path) => path.clone(),
        None => default_user_settings_path()?,
    };
    // Logs go to a file so the interactive prompts own stdout.
    init_file_logging(&settings_path)?;

    let store = FileSettingsStore::open(settings_path, flags.workspace_path.clone())?;
    let settings = PanelSettings::new(Arc::new(store));
    let interactions: Arc<dyn Interactions> = Arc::new(ConsoleInteractions);
    let transport = Arc::new(ReqwestTransport::new()?);

    let context = ProviderContext {
        settings: settings.clone(),
        interactions: Arc::clone(&interactions),
        transport,
    };
    let registry = ProviderRegistry::new(context.clone());
    let resolver = Arc::new(ChildrenResolver::new(
        settings,
        Arc::clone(&registry) as Arc<dyn ProviderSource>,
        Arc::clone(&interactions),
    ));
    let refresh = Arc::new(RefreshSignal::new());
    let commands = PanelCommands::new(
        context,
        registry,
        Arc::clone(&resolver),
        Arc::clone(&refresh),
    );

    match flags.command.unwrap_or(CliCommand::List) {
        CliCommand::List => run_list(&resolver).await,
        CliCommand::Configure => commands.dispatch(COMMAND_CONFIGURE, None).await?,
        CliCommand::AddTask { task_list_id } => {
            commands
                .dispatch(COMMAND_ADD_TASK, task_list_id.as_deref())
                .await?
        }
        CliCommand::ViewTask { task_id } => {
            commands.dispatch(COMMAND_VIEW_TASK, Some(&task_id)).await?
        }
        CliCommand::CompleteTask { task_id } => {
            commands
                .dispatch(COMMAND_COMPLETE_TASK, Some(&task_id))
                .await?
        }
    }

    Ok(())
}

/// Prints the resolved tree, expanding parents depth-first.
async fn run_list(resolver: &ChildrenResolver) {
    let today = Local::now().date_naive();
    match resolver.resolve_top_level().await {
        ChildrenOutcome::Tasks(tasks) => {
            let mut stack: Vec<_> = tasks.into_iter().rev().map(|task| (task, 0)).collect();
            while let Some((task, depth)) = stack.pop() {
                println!("{}", render_line(&task_node(&task, today), depth));
                if task.has_children {
                    let children = resolver.resolve_children(&task).await;
                    for child in children.into_iter().rev() {
                        stack.push((child, depth + 1));
                    }
                }
            }
        }
        placeholder => {
            for node in nodes_for(&placeholder, today) {
                println!("{}", render_line(&node, 0));
            }
        }
    }
}

fn render_line(node: &TreeNode, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    let marker = if node.collapsed_state == CollapsedState::Collapsed {
        "+"
    } else {
        node.icon.map_or(" ", NodeIcon::key)
    };
    if node.description.is_empty() {
        format!("{indent}[{marker}] {}", node.label)
    } else {
        format!("{indent}[{marker}] {} ({})", node.label, node.description)
    }
}

fn init_file_logging(settings_path: &Path) -> Result<(), CoreError> {
    let log_path = log_file_path(settings_path);
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|error| {
                CoreError::Configuration(format!(
                    "failed to create taskdock log directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|error| {
            CoreError::Configuration(format!(
                "failed to open taskdock log file '{}': {error}",
                log_path.display()
            ))
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}

fn log_file_path(settings_path: &Path) -> PathBuf {
    settings_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join("taskdock.log")
}

#[derive(Debug, Default)]
struct CliFlags {
    settings_path: Option<PathBuf>,
    workspace_path: Option<PathBuf>,
    command: Option<CliCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    List,
    Configure,
    AddTask { task_list_id: Option<String> },
    ViewTask { task_id: String },
    CompleteTask { task_id: String },
}

fn parse_cli_flags() -> Result<CliFlags, CoreError> {
    parse_args(std::env::args().skip(1))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliFlags, CoreError> {
    let mut flags = CliFlags::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                flags.settings_path = Some(PathBuf::from(args.next().ok_or_else(|| {
                    CoreError::Configuration(
                        "Missing value after --settings. Use --settings <path>.".to_owned(),
                    )
                })?));
            }
            "--workspace" => {
                flags.workspace_path = Some(PathBuf::from(args.next().ok_or_else(|| {
                    CoreError::Configuration(
                        "Missing value after --workspace. Use --workspace <path>.".to_owned(),
                    )
                })?));
            }
            "--help" | "-h" => {
                print_cli_help();
                std::process::exit(0);
            }
            value if value.starts_with("--") => {
                return Err(CoreError::Configuration(format!(
                    "Unknown flag '{value}'. Run with --help for valid flags."
                )));
            }
            word => {
                if flags.command.is_some() {
                    return Err(CoreError::Configuration(format!(
                        "Unexpected argument '{word}'. Run with --help for valid commands."
                    )));
                }
                flags.command = Some(parse_command(word, &mut args)?);
            }
        }
    }

    Ok(flags)
}

fn parse_command(
    word: &str,
    args: &mut impl Iterator<Item = String>,
) -> Result<CliCommand, CoreError> {
    match word {
        "list" => Ok(CliCommand::List),
        "configure" => Ok(CliCommand::Configure),
        "add-task" => Ok(CliCommand::AddTask {
            task_list_id: args.next(),
        }),
        "view-task" => Ok(CliCommand::ViewTask {
            task_id: args.next().ok_or_else(|| {
                CoreError::Configuration(
                    "Missing task id after view-task. Use view-task <id>.".to_owned(),
                )
            })?,
        }),
        "complete-task" => Ok(CliCommand::CompleteTask {
            task_id: args.next().ok_or_else(|| {
                CoreError::Configuration(
                    "Missing task id after complete-task. Use complete-task <id>.".to_owned(),
                )
            })?,
        }),
        other => Err(CoreError::Configuration(format!(
            "Unknown command '{other}'. Run with --help for valid commands."
        ))),
    }
}

fn print_cli_help() {
    println!("Usage: taskdock [--settings <path>] [--workspace <path>] <command>");
    println!();
    println!("Commands:");
    println!("  list                     Print the task tree for the configured tasklists");
    println!("  configure                Bind a provider tasklist to this workspace");
    println!("  add-task [tasklist-id]   Create a task through interactive prompts");
    println!("  view-task <task-id>      Print the detail view of one task");
    println!("  complete-task <task-id>  Mark one task complete");
    println!();
    println!("  --settings <path>        Settings file (default: $TASKDOCK_SETTINGS or ~/.config/taskdock/settings.json)");
    println!("  --workspace <path>       Workspace-scope settings file");
    println!("  --help                   Show this help message");
}
