use super::manager::{BuiltinCommand, ShellContext};

pub struct CdCommand;

impl BuiltinCommand for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn invoke(&self, argv: &[String], _ctx: &mut ShellContext) -> i32 {
        let target = match argv.get(1) {
            Some(dir) => dir.clone(),
            None => std::env::var("HOME").unwrap_or_else(|_| "/".to_string()),
        };
        match std::env::set_current_dir(&target) {
            Ok(_) => 0,
            Err(e) => {
                eprintln!("cd: {}: {}", target, e);
                1
            }
        }
    }
}

pub struct PwdCommand;

impl BuiltinCommand for PwdCommand {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn invoke(&self, _argv: &[String], _ctx: &mut ShellContext) -> i32 {
        match std::env::current_dir() {
            Ok(dir) => {
                println!("{}", dir.display());
                0
            }
            Err(e) => {
                eprintln!("pwd: {}", e);
                1
            }
        }
    }
}

pub struct ExitCommand;

impl BuiltinCommand for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn invoke(&self, argv: &[String], ctx: &mut ShellContext) -> i32 {
        let code = match argv.get(1) {
            None => ctx.last_status,
            Some(arg) => match arg.parse::<i32>() {
                // Exit statuses wrap like the kernel's 8-bit wait status.
                Ok(n) => n.rem_euclid(256),
                Err(_) => {
                    eprintln!("exit: {}: numeric argument required", arg);
                    return 2;
                }
            },
        };
        ctx.exit_requested = Some(code);
        code
    }
}

pub struct HistoryCommand;

impl BuiltinCommand for HistoryCommand {
    fn name(&self) -> &'static str {
        "history"
    }

    fn invoke(&self, argv: &[String], ctx: &mut ShellContext) -> i32 {
        let mut limit: Option<usize> = None;
        for arg in argv.iter().skip(1) {
            match arg.as_str() {
                "-c" | "--clear" => {
                    ctx.history.clear();
                    return 0;
                }
                s => match s.parse::<usize>() {
                    Ok(n) => limit = Some(n),
                    Err(_) => {
                        eprintln!("history: unknown option '{}'", s);
                        return 2;
                    }
                },
            }
        }

        let entries = ctx.history.entries();
        let start = limit.map_or(0, |n| entries.len().saturating_sub(n));
        for (i, line) in entries.iter().enumerate().skip(start) {
            println!("{:>5}  {}", i + 1, line);
        }
        0
    }
}

#[cfg(unix)]
pub struct KillCommand;

#[cfg(unix)]
impl KillCommand {
    fn parse_signal(spec: &str) -> Option<nix::sys::signal::Signal> {
        use nix::sys::signal::Signal;
        if let Ok(n) = spec.parse::<i32>() {
            return Signal::try_from(n).ok();
        }
        let upper = spec.to_ascii_uppercase();
        let name = if upper.starts_with("SIG") { upper } else { format!("SIG{}", upper) };
        name.parse::<Signal>().ok()
    }
}

#[cfg(unix)]
impl BuiltinCommand for KillCommand {
    fn name(&self) -> &'static str {
        "kill"
    }

    fn invoke(&self, argv: &[String], _ctx: &mut ShellContext) -> i32 {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let mut args = argv.iter().skip(1).peekable();
        let mut signal = Signal::SIGTERM;
        if let Some(spec) = args.peek().and_then(|a| a.strip_prefix('-')) {
            match Self::parse_signal(spec) {
                Some(sig) => signal = sig,
                None => {
                    eprintln!("kill: {}: invalid signal specification", spec);
                    return 2;
                }
            }
            args.next();
        }

        let pids: Vec<&String> = args.collect();
        if pids.is_empty() {
            eprintln!("kill: usage: kill [-SIGNAL] PID...");
            return 2;
        }

        let mut status = 0;
        for arg in pids {
            let Ok(raw) = arg.parse::<i32>() else {
                eprintln!("kill: {}: arguments must be process ids", arg);
                status = 1;
                continue;
            };
            if let Err(e) = kill(Pid::from_raw(raw), signal) {
                eprintln!("kill: ({}) - {}", raw, e.desc());
                status = 1;
            }
        }
        status
    }
}
