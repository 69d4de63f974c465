use std::io;
use thiserror::Error;
use crate::ast::{Arena, AstNode, Command, ListItem, Logical, NodeId, Pipeline, Sequence};
use super::builtin::{BuiltinManager, ShellContext};

pub type ExecStatus = Result<i32, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    /// An OS call failed; renders as `<call>: <reason>`.
    #[error("{call}: {source}")]
    Sys {
        call: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{0} not implemented")]
    NotImplemented(String),
    #[error("empty command")]
    EmptyCommand,
    #[error("empty pipeline")]
    EmptyPipeline,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}

impl ExecError {
    pub fn sys(call: &'static str, source: impl Into<io::Error>) -> Self {
        ExecError::Sys { call, source: source.into() }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Platform capability used by [`Executor`]. Background launches return
/// `Ok(0)` immediately; foreground launches block until every process of
/// the unit has terminated.
pub trait JobControl {
    fn init_job_control(&mut self);
    fn launch_command(&mut self, cmd: &Command, background: bool) -> ExecStatus;
    fn launch_pipeline(&mut self, pipeline: &Pipeline, background: bool) -> ExecStatus;
    /// Run `logical` to completion in a detached process without blocking.
    fn launch_logical_controller(&mut self, logical: &Logical, arena: &Arena) -> Result<(), ExecError>;
    /// Collect finished background processes without reporting them.
    fn reap_background(&mut self) {}
}

/// Walks a parsed [`Sequence`] and dispatches each node to a [`JobControl`] back end.
pub struct Executor {
    job_control: Box<dyn JobControl>,
    builtins: BuiltinManager,
    context: ShellContext,
}

impl Executor {
    pub fn new(job_control: Box<dyn JobControl>) -> Self {
        Self::with_builtins(job_control, BuiltinManager::new())
    }

    pub fn with_builtins(job_control: Box<dyn JobControl>, builtins: BuiltinManager) -> Self {
        Executor {
            job_control,
            builtins,
            context: ShellContext::default(),
        }
    }

    pub fn init_job_control(&mut self) {
        self.job_control.init_job_control();
    }

    pub fn context(&self) -> &ShellContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ShellContext {
        &mut self.context
    }

    /// Run every statement left to right. A failing statement is recorded and
    /// the next one still runs; a built-in `exit` stops the walk.
    pub fn run(&mut self, seq: &Sequence, arena: &Arena) -> Vec<ExecError> {
        self.run_with(seq, arena, |_| {})
    }

    /// Like [`Executor::run`], calling `report` as soon as a statement fails
    /// and before the next one starts.
    pub fn run_with<F: FnMut(&ExecError)>(&mut self, seq: &Sequence, arena: &Arena, mut report: F) -> Vec<ExecError> {
        let mut errors = Vec::new();
        for item in &seq.items {
            if self.context.exit_requested.is_some() {
                break;
            }
            self.job_control.reap_background();
            match self.run_item(item, arena) {
                Ok(status) => self.context.last_status = status,
                Err(e) => {
                    log::debug!("statement {} failed: {}", item.node, e);
                    self.context.last_status = 1;
                    report(&e);
                    errors.push(e);
                }
            }
        }
        errors
    }

    pub fn run_item(&mut self, item: &ListItem, arena: &Arena) -> ExecStatus {
        if item.background {
            self.run_node_bg(item.node, arena)
        } else {
            self.run_node_fg(item.node, arena)
        }
    }

    pub fn run_node_fg(&mut self, id: NodeId, arena: &Arena) -> ExecStatus {
        match arena.get(id) {
            Some(AstNode::Command(cmd)) => self.run_command_fg(cmd),
            Some(AstNode::Pipeline(p)) => self.job_control.launch_pipeline(p, false),
            Some(AstNode::Logical(l)) => self.run_logical_fg(l, arena),
            None => Err(ExecError::UnknownNode(id)),
        }
    }

    /// Launch without waiting. The status of a background unit is never observed.
    pub fn run_node_bg(&mut self, id: NodeId, arena: &Arena) -> ExecStatus {
        match arena.get(id) {
            Some(AstNode::Command(cmd)) => self.job_control.launch_command(cmd, true),
            Some(AstNode::Pipeline(p)) => self.job_control.launch_pipeline(p, true),
            Some(AstNode::Logical(l)) => {
                self.job_control.launch_logical_controller(l, arena)?;
                Ok(0)
            }
            None => Err(ExecError::UnknownNode(id)),
        }
    }

    /// Short-circuit evaluation; when `rhs` is skipped the status is `lhs`'s.
    /// A built-in `exit` on the left also skips `rhs`.
    pub fn run_logical_fg(&mut self, logical: &Logical, arena: &Arena) -> ExecStatus {
        let lhs = self.run_node_fg(logical.lhs, arena)?;
        if self.context.exit_requested.is_some() || !logical.runs_rhs(lhs) {
            return Ok(lhs);
        }
        self.run_node_fg(logical.rhs, arena)
    }

    fn run_command_fg(&mut self, cmd: &Command) -> ExecStatus {
        let Some(builtin) = cmd.name().and_then(|name| self.builtins.get(name)) else {
            return self.job_control.launch_command(cmd, false);
        };
        log::debug!("builtin {:?}", cmd.argv);
        let context = &mut self.context;
        super::redirect::scoped(&cmd.redirs, || builtin.invoke(&cmd.argv, context))
    }
}
