use chrono::NaiveDate;

use taskdock_domain::calendar;
use taskdock_domain::{
    CollapsedState, NodeCommand, NodeIcon, PriorityClass, Task, TreeNode,
};

use crate::resolver::ChildrenOutcome;

pub const COMMAND_REFRESH: &str = "taskdock.refreshTasklist";
pub const COMMAND_ADD_TASK: &str = "taskdock.addTask";
pub const COMMAND_VIEW_TASK: &str = "taskdock.viewTask";
pub const COMMAND_COMPLETE_TASK: &str = "taskdock.completeTask";
pub const COMMAND_CONFIGURE: &str = "taskdock.configure";

pub const UNCONFIGURED_LABEL: &str = "No project manager is configured in this workspace";
pub const EMPTY_LABEL: &str = "No tasks to show";

const FALLBACK_UNASSIGNED_LABEL: &str = "Unassigned";

/// Maps a resolved children outcome onto displayable nodes. The placeholder
/// shapes always produce exactly one node.
pub fn nodes_for(outcome: &ChildrenOutcome, today: NaiveDate) -> Vec<TreeNode> {
    match outcome {
        ChildrenOutcome::Unconfigured => vec![unconfigured_node()],
        ChildrenOutcome::Empty => vec![empty_node()],
        ChildrenOutcome::Tasks(tasks) => child_nodes(tasks, today),
    }
}

pub fn child_nodes(tasks: &[Task], today: NaiveDate) -> Vec<TreeNode> {
    tasks.iter().map(|task| task_node(task, today)).collect()
}

pub fn task_node(task: &Task, today: NaiveDate) -> TreeNode {
    let unassigned = task
        .provider()
        .map(|provider| provider.descriptor().unassigned_label)
        .unwrap_or(FALLBACK_UNASSIGNED_LABEL);
    let who = task.assignees.display(unassigned);

    let description = task
        .due_date
        .map(|date| calendar::calendar_label(date, today))
        .unwrap_or_default();
    let tooltip = match task.due_date {
        Some(date) => format!("[{}] {}", calendar::short_date(date), who),
        None => who,
    };

    TreeNode {
        label: task.title.clone(),
        tooltip,
        description,
        collapsed_state: if task.has_children {
            CollapsedState::Collapsed
        } else {
            CollapsedState::None
        },
        // Parents expand instead of opening; the icon marks leaves only.
        icon: if task.has_children {
            None
        } else {
            Some(priority_icon(task.priority))
        },
        command: Some(NodeCommand {
            id: COMMAND_VIEW_TASK.to_owned(),
            title: "View Task Details".to_owned(),
            argument: Some(task.id.clone()),
        }),
    }
}

pub fn unconfigured_node() -> TreeNode {
    TreeNode {
        label: UNCONFIGURED_LABEL.to_owned(),
        tooltip: UNCONFIGURED_LABEL.to_owned(),
        description: String::new(),
        collapsed_state: CollapsedState::None,
        icon: Some(NodeIcon::Warning),
        command: Some(NodeCommand {
            id: COMMAND_CONFIGURE.to_owned(),
            title: "Configure a project manager".to_owned(),
            argument: None,
        }),
    }
}

pub fn empty_node() -> TreeNode {
    TreeNode {
        label: EMPTY_LABEL.to_owned(),
        tooltip: EMPTY_LABEL.to_owned(),
        description: String::new(),
        collapsed_state: CollapsedState::None,
        icon: Some(NodeIcon::Info),
        command: None,
    }
}

fn priority_icon(priority: PriorityClass) -> NodeIcon {
    match priority {
        PriorityClass::Urgent => NodeIcon::Issues,
        PriorityClass::Important => NodeIcon::Warning,
        PriorityClass::Prohibited => NodeIcon::Error,
        PriorityClass::Normal => NodeIcon::CircleOutline,
    }
}
