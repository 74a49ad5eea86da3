pub mod commands;
pub mod console;

pub use commands::PanelCommands;
pub use console::ConsoleInteractions;
