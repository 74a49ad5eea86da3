pub mod calendar;
pub mod error;
pub mod interact;
pub mod provider;
pub mod task;
pub mod tasklist;
pub mod tree;

pub use error::CoreError;
pub use interact::{Interactions, NoticeLevel, PickItem};
pub use provider::{
    fill_route, ProviderDescriptor, ProviderKind, RouteTable, TaskDraft, TaskProvider,
};
pub use task::{Assignees, Creator, Person, PriorityClass, Task, TaskDetails};
pub use tasklist::{merge_task_list, TaskListSetting};
pub use tree::{CollapsedState, NodeCommand, NodeIcon, TreeNode};
