use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use clap::Parser;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use jobsh::ast;
use jobsh::config::{Config, ConfigError};
use jobsh::executor::{platform_job_control, Executor};
use jobsh::parser::parse_line;
use jobsh::prompt::ShellPrompt;

/// Status reported for input that does not parse.
const SYNTAX_ERROR_STATUS: i32 = 2;

#[derive(Parser)]
#[command(name = "jobsh")]
#[command(about = "A small POSIX shell with job control")]
#[command(version)]
struct Cli {
    /// Run COMMAND and exit with its status
    #[arg(short = 'c', value_name = "COMMAND")]
    command: Option<String>,

    /// Read configuration from PATH instead of ~/.jobshrc
    #[arg(long = "rc", value_name = "PATH")]
    rc: Option<PathBuf>,

    /// Print the parsed tree instead of executing it
    #[arg(long = "dump-ast")]
    dump_ast: bool,

    /// Log debug details to stderr
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    if let Err(e) = TermLogger::init(level, simplelog::Config::default(), TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("jobsh: logger: {}", e);
    }

    let config = match load_config(cli.rc.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("jobsh: {}", e);
            return ExitCode::from(SYNTAX_ERROR_STATUS as u8);
        }
    };

    let mut shell = Shell::new(&config, cli.dump_ast);
    let status = match &cli.command {
        Some(src) => shell.run_source(src),
        None => shell.repl(&config),
    };
    ExitCode::from((status & 0xff) as u8)
}

// A missing default rc file is fine; a missing explicit one is not.
fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return Config::load_from_file(path);
    }
    let Some(path) = Config::default_path() else {
        return Ok(Config::default());
    };
    match Config::load_from_file(&path) {
        Err(ConfigError::NotFound(_)) => Ok(Config::default()),
        other => other,
    }
}

struct Shell {
    executor: Executor,
    dump_ast: bool,
}

impl Shell {
    fn new(config: &Config, dump_ast: bool) -> Self {
        let mut executor = Executor::new(platform_job_control());
        executor.context_mut().history.set_max_len(config.history_size());
        Shell { executor, dump_ast }
    }

    /// Parse and run one chunk of input, returning the last status.
    fn run_source(&mut self, src: &str) -> i32 {
        let parsed = parse_line(src);
        if let Some(err) = &parsed.error {
            eprintln!("jobsh: {}", err);
            eprintln!("{}", err.caret(src));
            self.executor.context_mut().last_status = SYNTAX_ERROR_STATUS;
            return SYNTAX_ERROR_STATUS;
        }

        if self.dump_ast {
            print!("{}", ast::dump(&parsed.arena, &parsed.sequence));
            return 0;
        }

        self.executor
            .run_with(&parsed.sequence, &parsed.arena, |e| eprintln!("jobsh: {}", e));
        self.executor.context().last_status
    }

    fn repl(&mut self, config: &Config) -> i32 {
        self.executor.init_job_control();
        let prompt = ShellPrompt::new(config.prompt());
        let mut input = io::stdin().lock();
        let mut output = io::stdout();

        loop {
            let line = match prompt.read_logical_line(&mut input, &mut output) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    log::error!("reading input: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            self.executor.context_mut().history.push(&line);
            self.run_source(&line);
            if let Some(code) = self.executor.context().exit_requested {
                return code;
            }
        }
        self.executor.context().last_status
    }
}
