#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickItem {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
}

impl PickItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Seam for everything that needs a human. `None` from a prompt means the
/// user backed out, which callers treat as a no-op rather than an error.
#[async_trait::async_trait]
pub trait Interactions: Send + Sync {
    async fn pick(&self, prompt: &str, items: &[PickItem]) -> Option<PickItem>;
    async fn input(&self, prompt: &str, placeholder: Option<&str>) -> Option<String>;
    async fn open_url(&self, url: &str);
    async fn notify(&self, level: NoticeLevel, message: &str);
    async fn progress(&self, message: &str) {
        let _ = message;
    }
}
