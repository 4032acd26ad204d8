use std::io::{self, BufRead, IsTerminal, StdinLock, Write};

use tracing::warn;

use crate::config::Config;
use crate::error::ShellError;

mod editor;

pub use editor::EditorReader;

/// Supplies one line of user input per call; `None` means end of input.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ShellError>;
}

/// Prompts on stdout and reads raw lines from any buffered source.
pub struct PlainReader<R> {
    input: R,
}

impl PlainReader<StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> PlainReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> LineReader for PlainReader<R> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ShellError> {
        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Picks the line editor for interactive terminals, raw lines otherwise.
pub fn open_reader(config: &Config) -> Box<dyn LineReader> {
    if config.line_editing && io::stdin().is_terminal() {
        match EditorReader::new() {
            Ok(editor) => return Box::new(editor),
            Err(e) => warn!(error = %e, "line editor unavailable, reading raw lines"),
        }
    }
    Box::new(PlainReader::stdin())
}
