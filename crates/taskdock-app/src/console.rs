use std::io::{self, BufRead, Write};

use taskdock_domain::{Interactions, NoticeLevel, PickItem};

/// Terminal prompts. Pickers print a numbered menu; submitting an empty
/// line backs out of any prompt.
pub struct ConsoleInteractions;

#[async_trait::async_trait]
impl Interactions for ConsoleInteractions {
    async fn pick(&self, prompt: &str, items: &[PickItem]) -> Option<PickItem> {
        if items.is_empty() {
            return None;
        }
        println!("{prompt}");
        for (index, item) in items.iter().enumerate() {
            match &item.description {
                Some(description) => {
                    println!("  {}. {} ({description})", index + 1, item.label)
                }
                None => println!("  {}. {}", index + 1, item.label),
            }
        }
        let line = read_line()?;
        let choice: usize = line.parse().ok()?;
        items.get(choice.checked_sub(1)?).cloned()
    }

    async fn input(&self, prompt: &str, placeholder: Option<&str>) -> Option<String> {
        match placeholder {
            Some(placeholder) => println!("{prompt} [{placeholder}]"),
            None => println!("{prompt}"),
        }
        read_line()
    }

    async fn open_url(&self, url: &str) {
        println!("Open {url} in your browser");
    }

    async fn notify(&self, level: NoticeLevel, message: &str) {
        let prefix = match level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        println!("[{prefix}] {message}");
    }

    async fn progress(&self, message: &str) {
        println!("{message}...");
    }
}

fn read_line() -> Option<String> {
    print!("> ");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    let line = line.trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_owned())
    }
}
