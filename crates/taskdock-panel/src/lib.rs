pub mod detail;
pub mod refresh;
pub mod render;
pub mod resolver;

pub use detail::{detail_text, humanize_minutes};
pub use refresh::RefreshSignal;
pub use render::{
    child_nodes, empty_node, nodes_for, task_node, unconfigured_node, COMMAND_ADD_TASK,
    COMMAND_COMPLETE_TASK, COMMAND_CONFIGURE, COMMAND_REFRESH, COMMAND_VIEW_TASK, EMPTY_LABEL,
    UNCONFIGURED_LABEL,
};
pub use resolver::{ChildrenOutcome, ChildrenResolver, ProviderSource, UNCONFIGURED_WARNING};
