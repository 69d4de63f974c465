use std::ffi::CString;
use std::io::{self, IsTerminal, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{dup2, execvp, fork, getpgrp, getpid, pipe, setpgid, ForkResult, Pid};
use crate::ast::{Arena, Command, Logical, Pipeline};
use super::executor::{ExecError, ExecStatus, Executor, JobControl};
use super::redirect::{apply_in_child, prepare_child, ChildRedirect};

const JOB_SIGNALS: [Signal; 5] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

/// fork/exec back end with process groups and terminal hand-off.
pub struct PosixJobControl {
    interactive: bool,
    shell_pgid: Pid,
    terminal: RawFd,
    background: Vec<Pid>,
}

impl Default for PosixJobControl {
    fn default() -> Self {
        Self::new()
    }
}

impl PosixJobControl {
    /// A detached back end: children get their own process groups but the
    /// terminal is never touched until [`JobControl::init_job_control`].
    pub fn new() -> Self {
        PosixJobControl {
            interactive: false,
            shell_pgid: getpgrp(),
            terminal: libc::STDIN_FILENO,
            background: Vec::new(),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Background processes launched and not yet reaped.
    pub fn background_pids(&self) -> &[Pid] {
        &self.background
    }

    fn spawn_group(&mut self, cmds: &[Command], background: bool) -> ExecStatus {
        if cmds.is_empty() {
            return Err(ExecError::EmptyPipeline);
        }
        let stages = cmds.iter().map(Stage::prepare).collect::<Result<Vec<_>, _>>()?;
        let _ = io::stdout().flush();

        let mut pids: Vec<Pid> = Vec::with_capacity(stages.len());
        let mut pgid: Option<Pid> = None;
        let mut prev_read: Option<OwnedFd> = None;

        for (i, stage) in stages.iter().enumerate() {
            let next = if i + 1 < stages.len() {
                match open_pipe() {
                    Ok(ends) => Some(ends),
                    Err(e) => return self.abandon(pids, e),
                }
            } else {
                None
            };

            // SAFETY: the child only performs async-signal-safe calls before exec or _exit.
            match unsafe { fork() } {
                Err(e) => return self.abandon(pids, ExecError::sys("fork", e)),
                Ok(ForkResult::Child) => {
                    let stdin = prev_read.as_ref().map(|fd| fd.as_raw_fd());
                    let stdout = next.as_ref().map(|(_, w)| w.as_raw_fd());
                    self.exec_child(stage, pgid, stdin, stdout, background)
                }
                Ok(ForkResult::Parent { child }) => {
                    let group = *pgid.get_or_insert(child);
                    // Also done by the child; whichever runs first wins the race.
                    match setpgid(child, group) {
                        Ok(()) | Err(Errno::EACCES) => {}
                        Err(e) => log::warn!("setpgid({}, {}): {}", child, group, e),
                    }
                    pids.push(child);
                    prev_read = next.map(|(read, _write)| read);
                }
            }
        }
        drop(prev_read);

        let group = pgid.unwrap_or_else(getpgrp);
        if background {
            log::debug!("background group {} {:?}", group, pids);
            self.background.extend(pids);
            return Ok(0);
        }

        if self.interactive {
            if let Err(e) = give_terminal(self.terminal, group) {
                log::warn!("tcsetpgrp({}): {}", group, e);
            }
        }
        let status = wait_all(&pids);
        if self.interactive {
            if let Err(e) = give_terminal(self.terminal, self.shell_pgid) {
                log::warn!("reclaiming terminal: {}", e);
            }
        }
        status
    }

    // Processes already started when a later stage fails are left to be reaped.
    fn abandon(&mut self, pids: Vec<Pid>, err: ExecError) -> ExecStatus {
        self.background.extend(pids);
        Err(err)
    }

    fn exec_child(
        &self,
        stage: &Stage,
        pgid: Option<Pid>,
        stdin: Option<RawFd>,
        stdout: Option<RawFd>,
        background: bool,
    ) -> ! {
        let me = getpid();
        let group = pgid.unwrap_or(me);
        let _ = setpgid(me, group);
        if self.interactive && !background {
            let _ = give_terminal(self.terminal, group);
        }
        restore_default_signals();

        if let Some(fd) = stdin {
            if let Err(e) = dup2(fd, libc::STDIN_FILENO) {
                child_fail(&stage.prefix, "dup2", e.desc());
            }
        }
        if let Some(fd) = stdout {
            if let Err(e) = dup2(fd, libc::STDOUT_FILENO) {
                child_fail(&stage.prefix, "dup2", e.desc());
            }
        }
        if let Err((call, reason)) = apply_in_child(&stage.redirs) {
            child_fail(&stage.prefix, call, reason);
        }

        match execvp(&stage.argv[0], &stage.argv) {
            Ok(never) => match never {},
            Err(Errno::ENOENT) => child_fail(&stage.prefix, "", "command not found"),
            Err(e) => child_fail(&stage.prefix, "execvp", e.desc()),
        }
    }
}

impl JobControl for PosixJobControl {
    fn init_job_control(&mut self) {
        if !io::stdin().is_terminal() {
            log::debug!("stdin is not a terminal; job control disabled");
            return;
        }
        for sig in JOB_SIGNALS {
            // SAFETY: SigIgn installs no handler code.
            if let Err(e) = unsafe { signal(sig, SigHandler::SigIgn) } {
                log::warn!("ignoring {:?}: {}", sig, e);
            }
        }
        let me = getpid();
        if let Err(e) = setpgid(me, me) {
            log::debug!("setpgid(self): {}", e);
        }
        self.shell_pgid = getpgrp();
        if let Err(e) = give_terminal(self.terminal, self.shell_pgid) {
            log::warn!("claiming terminal: {}", e);
            return;
        }
        self.interactive = true;
        log::debug!("job control enabled, shell group {}", self.shell_pgid);
    }

    fn launch_command(&mut self, cmd: &Command, background: bool) -> ExecStatus {
        self.spawn_group(std::slice::from_ref(cmd), background)
    }

    fn launch_pipeline(&mut self, pipeline: &Pipeline, background: bool) -> ExecStatus {
        self.spawn_group(&pipeline.cmds, background)
    }

    fn launch_logical_controller(&mut self, logical: &Logical, arena: &Arena) -> Result<(), ExecError> {
        let _ = io::stdout().flush();
        // SAFETY: the child runs a fresh executor and leaves through _exit.
        match unsafe { fork() } {
            Err(e) => Err(ExecError::sys("fork", e)),
            Ok(ForkResult::Child) => {
                let me = getpid();
                let _ = setpgid(me, me);
                restore_default_signals();

                let mut inner = Executor::new(Box::new(PosixJobControl::new()));
                let status = match inner.run_logical_fg(logical, arena) {
                    Ok(status) => status,
                    Err(e) => {
                        eprintln!("jobsh: {}", e);
                        127
                    }
                };
                let _ = io::stdout().flush();
                unsafe { libc::_exit(status) }
            }
            Ok(ForkResult::Parent { child }) => {
                match setpgid(child, child) {
                    Ok(()) | Err(Errno::EACCES) => {}
                    Err(e) => log::warn!("setpgid({}): {}", child, e),
                }
                log::debug!("background controller {}", child);
                self.background.push(child);
                Ok(())
            }
        }
    }

    fn reap_background(&mut self) {
        self.background.retain(|&pid| match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(Errno::EINTR) => true,
            Ok(status) => {
                log::debug!("reaped {}: {:?}", pid, status);
                false
            }
            Err(_) => false,
        });
    }
}

// Everything a child needs, allocated before fork.
struct Stage {
    argv: Vec<CString>,
    redirs: Vec<ChildRedirect>,
    prefix: Vec<u8>,
}

impl Stage {
    fn prepare(cmd: &Command) -> Result<Stage, ExecError> {
        let name = cmd.name().ok_or(ExecError::EmptyCommand)?;
        let argv = cmd
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ExecError::InvalidArgument(format!("NUL byte in arguments of {:?}", name)))?;
        Ok(Stage {
            argv,
            redirs: prepare_child(&cmd.redirs)?,
            prefix: format!("jobsh: {}: ", name).into_bytes(),
        })
    }
}

fn open_pipe() -> Result<(OwnedFd, OwnedFd), ExecError> {
    let (read, write) = pipe().map_err(|e| ExecError::sys("pipe", e))?;
    for fd in [&read, &write] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).map_err(|e| ExecError::sys("fcntl", e))?;
    }
    Ok((read, write))
}

fn give_terminal(fd: RawFd, pgid: Pid) -> io::Result<()> {
    // SAFETY: tcsetpgrp only reads its integer arguments.
    if unsafe { libc::tcsetpgrp(fd, pgid.as_raw()) } == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn restore_default_signals() {
    for sig in JOB_SIGNALS {
        // SAFETY: SigDfl installs no handler code.
        let _ = unsafe { signal(sig, SigHandler::SigDfl) };
    }
}

fn child_fail(prefix: &[u8], call: &str, reason: &str) -> ! {
    let mut parts: [&[u8]; 5] = [prefix, call.as_bytes(), b": ", reason.as_bytes(), b"\n"];
    if call.is_empty() {
        parts[2] = b"";
    }
    for part in parts {
        // SAFETY: write(2) on stderr from a buffer that outlives the call.
        unsafe {
            libc::write(libc::STDERR_FILENO, part.as_ptr().cast(), part.len());
        }
    }
    unsafe { libc::_exit(127) }
}

fn wait_all(pids: &[Pid]) -> ExecStatus {
    let mut last = 0;
    let mut first_err: Option<ExecError> = None;
    for &pid in pids {
        let status = loop {
            match waitpid(pid, None) {
                Err(Errno::EINTR) => continue,
                other => break other,
            }
        };
        match status {
            Ok(status) => last = status_code(status),
            Err(e) => {
                first_err.get_or_insert(ExecError::sys("waitpid", e));
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(last),
    }
}

/// Shell-style status: the exit code, or 128 plus the terminating signal.
pub(crate) fn status_code(status: WaitStatus) -> i32 {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
        _ => 1,
    }
}
