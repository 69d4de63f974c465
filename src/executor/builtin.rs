mod commands;
mod manager;

pub use commands::{CdCommand, ExitCommand, HistoryCommand, PwdCommand};
#[cfg(unix)]
pub use commands::KillCommand;
pub use manager::{BuiltinCommand, BuiltinManager, ShellContext};
