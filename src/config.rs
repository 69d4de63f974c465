use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::history::DEFAULT_HISTORY_SIZE;

pub const MAX_FILE_BYTES: u64 = 1024 * 1024;
pub const MAX_LINE_BYTES: usize = 10_000;
pub const MAX_VARS: usize = 10_000;
pub const MAX_NAME_BYTES: usize = 1_000;
pub const MAX_VALUE_BYTES: usize = 100_000;

const DEFAULT_PROMPT: &str = "$ ";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}: no such file", .0.display())]
    NotFound(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config file exceeds 1 MiB")]
    TooLarge,
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Variables read from the rc file. Only `PS1` and `HISTORY_SIZE` affect the
/// shell; everything else is kept for lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    vars: HashMap<String, String>,
}

impl Config {
    /// `~/.jobshrc`, when a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".jobshrc"))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let io_err = |source: io::Error| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io { path: path.to_path_buf(), source }
            }
        };
        let meta = std::fs::metadata(path).map_err(io_err)?;
        if meta.len() > MAX_FILE_BYTES {
            return Err(ConfigError::TooLarge);
        }
        let src = std::fs::read_to_string(path).map_err(io_err)?;
        Self::load_from_str(&src)
    }

    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        if src.len() as u64 > MAX_FILE_BYTES {
            return Err(ConfigError::TooLarge);
        }
        let mut vars = HashMap::new();
        for (idx, line) in src.lines().enumerate() {
            let lineno = idx + 1;
            let parse_err = |message: String| ConfigError::Parse { line: lineno, message };

            if line.len() > MAX_LINE_BYTES {
                return Err(parse_err(format!("line longer than {} bytes", MAX_LINE_BYTES)));
            }
            let trimmed = line.trim_start();
            if trimmed.trim_end().is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                return Err(parse_err("expected NAME=VALUE".to_string()));
            };
            let name = name.trim();
            if !is_valid_name(name) {
                return Err(parse_err(format!("invalid variable name '{}'", name)));
            }
            if name.len() > MAX_NAME_BYTES {
                return Err(parse_err(format!("name longer than {} bytes", MAX_NAME_BYTES)));
            }
            let value = strip_quotes(value);
            if value.len() > MAX_VALUE_BYTES {
                return Err(parse_err(format!("value longer than {} bytes", MAX_VALUE_BYTES)));
            }
            if !vars.contains_key(name) && vars.len() >= MAX_VARS {
                return Err(parse_err(format!("more than {} variables", MAX_VARS)));
            }
            vars.insert(name.to_string(), value.to_string());
        }
        Ok(Config { vars })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn prompt(&self) -> &str {
        self.get("PS1").unwrap_or(DEFAULT_PROMPT)
    }

    /// Falls back to the default when unset or not a number.
    pub fn history_size(&self) -> usize {
        match self.get("HISTORY_SIZE").map(|v| v.trim().parse::<usize>()) {
            Some(Ok(n)) => n,
            Some(Err(_)) => {
                log::warn!("HISTORY_SIZE is not a number; using {}", DEFAULT_HISTORY_SIZE);
                DEFAULT_HISTORY_SIZE
            }
            None => DEFAULT_HISTORY_SIZE,
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

// One layer of matching quotes.
fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return &value[1..value.len() - 1];
        }
    }
    value
}
