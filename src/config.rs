use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::flags::Flags;

const RC_FILE: &str = ".smallshrc";

/// Interpreter settings: built-in defaults, then the rc file, then flags.
#[derive(Debug, Clone)]
pub struct Config {
    pub prompt: String,
    pub max_line_len: usize,
    pub max_args: usize,
    pub null_device: String,
    pub output_mode: u32,
    pub line_editing: bool,
    pub quiet: bool,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: ": ".to_string(),
            max_line_len: 2048,
            max_args: 512,
            null_device: "/dev/null".to_string(),
            output_mode: 0o644,
            line_editing: true,
            quiet: false,
            debug: false,
        }
    }
}

impl Config {
    /// Builds the configuration for a run.
    ///
    /// Problems inside the rc file come back as warnings; only an unreadable
    /// file is an error, and a missing default rc file is not one.
    pub fn load(flags: &Flags) -> Result<(Self, Vec<ConfigError>), ConfigError> {
        let mut config = Config::default();

        let warnings = match flags.get_value("config") {
            Some(path) => config.source(Path::new(path))?,
            None => match Self::default_rc_path() {
                Some(path) if path.exists() => config.source(&path)?,
                _ => Vec::new(),
            },
        };

        config.apply_flags(flags);
        Ok((config, warnings))
    }

    pub fn default_rc_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(RC_FILE))
    }

    fn source(&mut self, path: &Path) -> Result<Vec<ConfigError>, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        debug!(path = %path.display(), "loading rc file");
        Ok(self.apply_str(&content))
    }

    /// Applies `key = value` lines, skipping blanks and comments.
    pub fn apply_str(&mut self, content: &str) -> Vec<ConfigError> {
        content
            .lines()
            .enumerate()
            .filter_map(|(index, line)| self.process_line(index + 1, line).err())
            .collect()
    }

    fn process_line(&mut self, line_no: usize, line: &str) -> Result<(), ConfigError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        let (key, value) = trimmed
            .split_once('=')
            .ok_or(ConfigError::Malformed(line_no))?;
        let key = key.trim();
        let value = unquote(value.trim());
        let invalid = || ConfigError::InvalidValue {
            line: line_no,
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "prompt" => self.prompt = value.to_string(),
            "line_editing" => self.line_editing = parse_bool(value).ok_or_else(invalid)?,
            "quiet" => self.quiet = parse_bool(value).ok_or_else(invalid)?,
            "max_line_len" => self.max_line_len = parse_limit(value).ok_or_else(invalid)?,
            "max_args" => self.max_args = parse_limit(value).ok_or_else(invalid)?,
            _ => {
                return Err(ConfigError::UnknownKey {
                    line: line_no,
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    fn apply_flags(&mut self, flags: &Flags) {
        if flags.is_set("quiet") {
            self.quiet = true;
        }
        if flags.is_set("debug") {
            self.debug = true;
        }
        if flags.is_set("plain") {
            self.line_editing = false;
        }
    }
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_limit(value: &str) -> Option<usize> {
    value.parse().ok().filter(|&n| n > 0)
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Malformed(usize),
    UnknownKey { line: usize, key: String },
    InvalidValue { line: usize, key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "cannot read {}: {}", path.display(), e),
            ConfigError::Malformed(line) => write!(f, "line {}: expected `key = value`", line),
            ConfigError::UnknownKey { line, key } => {
                write!(f, "line {}: unknown setting `{}`", line, key)
            }
            ConfigError::InvalidValue { line, key, value } => {
                write!(f, "line {}: invalid value `{}` for `{}`", line, value, key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
