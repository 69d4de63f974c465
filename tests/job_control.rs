#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use jobsh::executor::{ExecError, Executor, PosixJobControl};
use jobsh::parser::parse_line;

struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("jobsh_it_{}_{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create scratch dir");
        Scratch { dir }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Single-quoted for splicing into shell source.
    fn quoted(&self, file: &str) -> String {
        format!("'{}'", self.path(file).display())
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn shell() -> Executor {
    Executor::new(Box::new(PosixJobControl::new()))
}

fn run(executor: &mut Executor, src: &str) -> (i32, Vec<ExecError>) {
    let parsed = parse_line(src);
    assert!(parsed.is_ok(), "{}: {:?}", src, parsed.error);
    let errors = executor.run(&parsed.sequence, &parsed.arena);
    (executor.context().last_status, errors)
}

fn status_of(src: &str) -> i32 {
    let (status, errors) = run(&mut shell(), src);
    assert!(errors.is_empty(), "{}: {:?}", src, errors);
    status
}

fn wait_for(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    path.exists()
}

#[test]
fn test_exit_statuses() {
    assert_eq!(status_of("true"), 0);
    assert_eq!(status_of("false"), 1);
    assert_eq!(status_of("sh -c 'exit 3'"), 3);
    assert_eq!(status_of("jobsh-no-such-program-xyz"), 127);
}

#[test]
fn test_signal_status() {
    assert_eq!(status_of("sh -c 'kill -9 $$'"), 137);
}

#[test]
fn test_pipeline_status_is_last_stage() {
    assert_eq!(status_of("false | true"), 0);
    assert_eq!(status_of("true | false"), 1);
    assert_eq!(status_of("true | true | sh -c 'exit 4'"), 4);
}

#[test]
fn test_pipeline_moves_data() {
    let scratch = Scratch::new("pipe_data");
    let src = format!("echo hello world | tr a-z A-Z | tr -d ' ' > {}", scratch.quoted("out"));
    assert_eq!(status_of(&src), 0);
    assert_eq!(fs::read_to_string(scratch.path("out")).unwrap(), "HELLOWORLD\n");
}

#[test]
fn test_redirect_overrides_pipe() {
    let scratch = Scratch::new("override");
    fs::write(scratch.path("in"), "from file\n").unwrap();
    let src = format!("echo from pipe | cat < {} > {}", scratch.quoted("in"), scratch.quoted("out"));
    assert_eq!(status_of(&src), 0);
    assert_eq!(fs::read_to_string(scratch.path("out")).unwrap(), "from file\n");
}

#[test]
fn test_truncate_append_and_input() {
    let scratch = Scratch::new("redirects");
    let f = scratch.quoted("f");
    let g = scratch.quoted("g");
    let src = format!("echo one > {f}; echo two >> {f}; cat < {f} > {g}; echo three > {f}");
    assert_eq!(status_of(&src), 0);
    assert_eq!(fs::read_to_string(scratch.path("g")).unwrap(), "one\ntwo\n");
    assert_eq!(fs::read_to_string(scratch.path("f")).unwrap(), "three\n");
}

#[test]
fn test_last_redirect_wins() {
    let scratch = Scratch::new("last_wins");
    let src = format!("echo hi > {} > {}", scratch.quoted("a"), scratch.quoted("b"));
    assert_eq!(status_of(&src), 0);
    assert_eq!(fs::read_to_string(scratch.path("a")).unwrap(), "");
    assert_eq!(fs::read_to_string(scratch.path("b")).unwrap(), "hi\n");
}

#[test]
fn test_missing_input_file_fails_child() {
    let scratch = Scratch::new("missing_in");
    let src = format!("cat < {}", scratch.quoted("nope"));
    assert_eq!(status_of(&src), 127);
}

#[test]
fn test_heredoc_is_rejected_at_execution() {
    assert_eq!(status_of("cat << EOF"), 127);
}

#[test]
fn test_short_circuit_never_runs_rhs() {
    let scratch = Scratch::new("short_circuit");
    let src = format!(
        "false && touch {}; true || touch {}; false || touch {}",
        scratch.quoted("and"),
        scratch.quoted("or"),
        scratch.quoted("ran")
    );
    assert_eq!(status_of(&src), 0);
    assert!(!scratch.path("and").exists());
    assert!(!scratch.path("or").exists());
    assert!(scratch.path("ran").exists());
}

#[test]
fn test_background_does_not_block() {
    let mut sh = shell();
    let start = Instant::now();
    let (status, errors) = run(&mut sh, "sleep 2 &");
    assert!(errors.is_empty());
    assert_eq!(status, 0);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_background_pipeline_completes() {
    let scratch = Scratch::new("bg_pipe");
    let src = format!("echo later | cat > {} &", scratch.quoted("out"));
    assert_eq!(status_of(&src), 0);
    assert!(wait_for(&scratch.path("out"), Duration::from_secs(5)));
}

#[test]
fn test_error_aborts_only_its_statement() {
    let scratch = Scratch::new("continue");
    let src = format!("pwd < {}; touch {}", scratch.quoted("missing"), scratch.quoted("after"));
    let (status, errors) = run(&mut shell(), &src);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ExecError::Sys { call: "open", .. }));
    assert_eq!(status, 0);
    assert!(scratch.path("after").exists());
}

#[test]
fn test_exit_builtin_stops_sequence() {
    let scratch = Scratch::new("exit");
    let mut sh = shell();
    let (status, errors) = run(&mut sh, &format!("exit 3; touch {}", scratch.quoted("never")));
    assert!(errors.is_empty());
    assert_eq!(status, 3);
    assert_eq!(sh.context().exit_requested, Some(3));
    assert!(!scratch.path("never").exists());
}
