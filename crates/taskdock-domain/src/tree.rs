#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapsedState {
    None,
    Collapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIcon {
    Issues,
    Warning,
    Error,
    CircleOutline,
    Info,
}

impl NodeIcon {
    pub const fn key(self) -> &'static str {
        match self {
            Self::Issues => "issues",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::CircleOutline => "circle-outline",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCommand {
    pub id: String,
    pub title: String,
    pub argument: Option<String>,
}

/// One displayable entry of the side panel, consumed by the host tree view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    pub tooltip: String,
    pub description: String,
    pub collapsed_state: CollapsedState,
    pub icon: Option<NodeIcon>,
    pub command: Option<NodeCommand>,
}
