use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use crate::ast::{Redirect, RedirectKind};
use super::executor::{ExecError, ExecStatus};

pub(crate) const HEREDOC: &str = "heredoc (<<)";

/// Which standard stream a redirect replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StdStream {
    Stdin,
    Stdout,
}

impl StdStream {
    pub(crate) fn of(kind: RedirectKind) -> StdStream {
        match kind {
            RedirectKind::In | RedirectKind::Heredoc => StdStream::Stdin,
            RedirectKind::OutTrunc | RedirectKind::OutAppend => StdStream::Stdout,
        }
    }

    #[cfg(unix)]
    fn fd(self) -> std::os::unix::io::RawFd {
        match self {
            StdStream::Stdin => libc::STDIN_FILENO,
            StdStream::Stdout => libc::STDOUT_FILENO,
        }
    }
}

/// Open the file a redirect names, with the access mode its kind implies.
pub(crate) fn open_std(r: &Redirect) -> Result<(StdStream, File), ExecError> {
    let mut opts = OpenOptions::new();
    match r.kind {
        RedirectKind::In => opts.read(true),
        RedirectKind::OutTrunc => opts.write(true).create(true).truncate(true),
        RedirectKind::OutAppend => opts.write(true).create(true).append(true),
        RedirectKind::Heredoc => return Err(ExecError::NotImplemented(HEREDOC.to_string())),
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o644);
    }
    let file = opts.open(&r.target).map_err(|e| ExecError::sys("open", e))?;
    Ok((StdStream::of(r.kind), file))
}

/// Run `f` with `redirs` applied to the shell's own stdin/stdout, restoring
/// both descriptors afterwards even if applying a later redirect fails.
#[cfg(unix)]
pub(crate) fn scoped<F: FnOnce() -> i32>(redirs: &[Redirect], f: F) -> ExecStatus {
    use std::os::unix::io::AsRawFd;
    use nix::unistd::dup2;

    if redirs.is_empty() {
        return Ok(f());
    }
    if redirs.iter().any(|r| r.kind == RedirectKind::Heredoc) {
        return Err(ExecError::NotImplemented(HEREDOC.to_string()));
    }

    let _ = io::stdout().flush();
    let mut saved = SavedFds { fds: Vec::new() };
    for r in redirs {
        let (stream, file) = open_std(r)?;
        saved.save(stream.fd())?;
        dup2(file.as_raw_fd(), stream.fd()).map_err(|e| ExecError::sys("dup2", e))?;
    }
    let status = f();
    let _ = io::stdout().flush();
    drop(saved);
    Ok(status)
}

#[cfg(not(unix))]
pub(crate) fn scoped<F: FnOnce() -> i32>(redirs: &[Redirect], f: F) -> ExecStatus {
    if redirs.is_empty() {
        return Ok(f());
    }
    Err(ExecError::NotImplemented("redirection of built-in commands".to_string()))
}

// Saved copies of the descriptors a scoped redirect replaced.
#[cfg(unix)]
struct SavedFds {
    fds: Vec<(std::os::unix::io::RawFd, std::os::unix::io::RawFd)>,
}

#[cfg(unix)]
impl SavedFds {
    fn save(&mut self, target: std::os::unix::io::RawFd) -> Result<(), ExecError> {
        if self.fds.iter().any(|(t, _)| *t == target) {
            return Ok(());
        }
        let copy = nix::unistd::dup(target).map_err(|e| ExecError::sys("dup", e))?;
        self.fds.push((target, copy));
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for SavedFds {
    fn drop(&mut self) {
        for (target, copy) in self.fds.drain(..).rev() {
            if let Err(e) = nix::unistd::dup2(copy, target) {
                log::warn!("restoring fd {} failed: {}", target, e);
            }
            let _ = nix::unistd::close(copy);
        }
    }
}

/// A redirect resolved before `fork`, so the child only makes syscalls.
#[cfg(unix)]
pub(crate) struct ChildRedirect {
    target: std::os::unix::io::RawFd,
    path: std::ffi::CString,
    flags: nix::fcntl::OFlag,
    heredoc: bool,
}

#[cfg(unix)]
pub(crate) fn prepare_child(redirs: &[Redirect]) -> Result<Vec<ChildRedirect>, ExecError> {
    use nix::fcntl::OFlag;

    redirs
        .iter()
        .map(|r| {
            let flags = match r.kind {
                RedirectKind::In | RedirectKind::Heredoc => OFlag::O_RDONLY,
                RedirectKind::OutTrunc => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                RedirectKind::OutAppend => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
            };
            let path = std::ffi::CString::new(r.target.as_str())
                .map_err(|_| ExecError::InvalidArgument(format!("NUL byte in redirect target {:?}", r.target)))?;
            Ok(ChildRedirect {
                target: StdStream::of(r.kind).fd(),
                path,
                flags,
                heredoc: r.kind == RedirectKind::Heredoc,
            })
        })
        .collect()
}

/// Apply prepared redirects in order inside a forked child. On failure the
/// returned pair names the failing call and its reason.
#[cfg(unix)]
pub(crate) fn apply_in_child(redirs: &[ChildRedirect]) -> Result<(), (&'static str, &'static str)> {
    use nix::fcntl::open;
    use nix::sys::stat::Mode;
    use nix::unistd::{close, dup2};

    for r in redirs {
        if r.heredoc {
            return Err((HEREDOC, "not implemented"));
        }
        let fd = open(r.path.as_c_str(), r.flags, Mode::from_bits_truncate(0o644))
            .map_err(|e| ("open", e.desc()))?;
        if fd != r.target {
            dup2(fd, r.target).map_err(|e| ("dup2", e.desc()))?;
            let _ = close(fd);
        }
    }
    Ok(())
}
