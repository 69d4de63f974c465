use std::io;
use std::process::{Child, ExitStatus, Stdio};
use crate::ast::{Arena, Command, Logical, Pipeline};
use super::executor::{ExecError, ExecStatus, JobControl};
use super::redirect::{open_std, StdStream};

/// Portable back end built on `std::process`: no process groups, no
/// terminal control, and no background logical controller.
#[derive(Default)]
pub struct RestrictedJobControl {
    background: Vec<Child>,
}

impl RestrictedJobControl {
    pub fn new() -> Self {
        RestrictedJobControl { background: Vec::new() }
    }

    pub fn background_len(&self) -> usize {
        self.background.len()
    }

    fn spawn_all(&mut self, cmds: &[Command], background: bool) -> ExecStatus {
        if cmds.is_empty() {
            return Err(ExecError::EmptyPipeline);
        }
        if cmds.iter().any(|c| c.argv.is_empty()) {
            return Err(ExecError::EmptyCommand);
        }

        // None marks a stage whose program was not found.
        let mut children: Vec<Option<Child>> = Vec::with_capacity(cmds.len());
        let mut upstream: Option<Stdio> = None;
        for (i, cmd) in cmds.iter().enumerate() {
            let last = i + 1 == cmds.len();
            let mut proc = std::process::Command::new(&cmd.argv[0]);
            proc.args(&cmd.argv[1..]);
            if let Some(stdin) = upstream.take() {
                proc.stdin(stdin);
            }
            if !last {
                proc.stdout(Stdio::piped());
            }
            for r in &cmd.redirs {
                let opened = open_std(r);
                let (stream, file) = match opened {
                    Ok(pair) => pair,
                    Err(e) => return self.abandon(children, e),
                };
                match stream {
                    StdStream::Stdin => proc.stdin(file),
                    StdStream::Stdout => proc.stdout(file),
                };
            }

            match proc.spawn() {
                Ok(mut child) => {
                    // A stage whose stdout was redirected feeds the next one nothing.
                    upstream = match child.stdout.take() {
                        Some(out) => Some(Stdio::from(out)),
                        None if !last => Some(Stdio::null()),
                        None => None,
                    };
                    children.push(Some(child));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    eprintln!("jobsh: {}: command not found", cmd.argv[0]);
                    upstream = if last { None } else { Some(Stdio::null()) };
                    children.push(None);
                }
                Err(e) => return self.abandon(children, ExecError::sys("spawn", e)),
            }
        }

        if background {
            self.background.extend(children.into_iter().flatten());
            return Ok(0);
        }

        let mut last = 0;
        for child in children {
            last = match child {
                Some(mut child) => exit_code(child.wait().map_err(|e| ExecError::sys("wait", e))?),
                None => 127,
            };
        }
        Ok(last)
    }

    fn abandon(&mut self, children: Vec<Option<Child>>, err: ExecError) -> ExecStatus {
        self.background.extend(children.into_iter().flatten());
        Err(err)
    }
}

impl JobControl for RestrictedJobControl {
    fn init_job_control(&mut self) {
        log::debug!("restricted back end: no job control");
    }

    fn launch_command(&mut self, cmd: &Command, background: bool) -> ExecStatus {
        self.spawn_all(std::slice::from_ref(cmd), background)
    }

    fn launch_pipeline(&mut self, pipeline: &Pipeline, background: bool) -> ExecStatus {
        self.spawn_all(&pipeline.cmds, background)
    }

    fn launch_logical_controller(&mut self, _logical: &Logical, _arena: &Arena) -> Result<(), ExecError> {
        Err(ExecError::NotImplemented("background logical controller".to_string()))
    }

    fn reap_background(&mut self) {
        self.background.retain_mut(|child| !matches!(child.try_wait(), Ok(Some(_)) | Err(_)));
    }
}

/// Shell-style status: the exit code, or 128 plus the terminating signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    1
}
