use std::collections::HashMap;
use crate::history::History;
use super::commands::{CdCommand, ExitCommand, HistoryCommand, PwdCommand};

/// Shell state visible to built-ins.
#[derive(Debug, Default)]
pub struct ShellContext {
    pub last_status: i32,
    /// Set by `exit`; the front end stops running statements once present.
    pub exit_requested: Option<i32>,
    pub history: History,
}

/// A command that runs inside the shell process instead of being forked.
pub trait BuiltinCommand {
    fn name(&self) -> &'static str;
    /// `argv[0]` is the built-in's own name. Returns a POSIX exit code.
    fn invoke(&self, argv: &[String], ctx: &mut ShellContext) -> i32;
}

pub struct BuiltinManager {
    commands: HashMap<&'static str, Box<dyn BuiltinCommand>>,
}

impl BuiltinManager {
    pub fn new() -> Self {
        let mut mgr = Self::empty();
        mgr.register(Box::new(CdCommand));
        mgr.register(Box::new(PwdCommand));
        mgr.register(Box::new(ExitCommand));
        mgr.register(Box::new(HistoryCommand));
        #[cfg(unix)]
        mgr.register(Box::new(super::commands::KillCommand));
        mgr
    }

    pub fn empty() -> Self {
        BuiltinManager {
            commands: HashMap::new(),
        }
    }

    pub fn register(&mut self, cmd: Box<dyn BuiltinCommand>) {
        self.commands.insert(cmd.name(), cmd);
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn BuiltinCommand> {
        self.commands.get(name).map(|cmd| cmd.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for BuiltinManager {
    fn default() -> Self {
        Self::new()
    }
}
