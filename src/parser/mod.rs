use std::fmt;

mod expander;

pub use expander::VariableExpander;

const SEPARATORS: [char; 4] = [' ', '\t', '\n', '\r'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub args: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub foreground: bool,
}

impl ParsedCommand {
    pub fn program(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    LineTooLong { len: usize, max: usize },
    TooManyArguments { count: usize, max: usize },
    MissingRedirectTarget(char),
    MissingCommand,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::LineTooLong { len, max } => {
                write!(f, "line too long: {} characters (limit {})", len, max)
            }
            ParseError::TooManyArguments { count, max } => {
                write!(f, "too many arguments: {} (limit {})", count, max)
            }
            ParseError::MissingRedirectTarget(op) => {
                write!(f, "syntax error: expected a file name after '{}'", op)
            }
            ParseError::MissingCommand => write!(f, "syntax error: missing command"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Copy)]
pub struct Parser {
    max_line_len: usize,
    max_args: usize,
}

impl Parser {
    pub fn new(max_line_len: usize, max_args: usize) -> Self {
        Self {
            max_line_len,
            max_args,
        }
    }

    /// Parses one input line.
    ///
    /// Returns `Ok(None)` for blank lines and comments. A trailing `&` marks
    /// the command as background unless `foreground_only` is set.
    pub fn parse(
        &self,
        line: &str,
        expander: &VariableExpander,
        foreground_only: bool,
    ) -> Result<Option<ParsedCommand>, ParseError> {
        let len = line.trim_end_matches(|c: char| c == '\n' || c == '\r').chars().count();
        if len > self.max_line_len {
            return Err(ParseError::LineTooLong {
                len,
                max: self.max_line_len,
            });
        }

        if line.starts_with('#') {
            return Ok(None);
        }

        let mut tokens: Vec<String> = line
            .split(|c: char| SEPARATORS.contains(&c))
            .filter(|t| !t.is_empty())
            .map(|t| expander.expand(t).into_owned())
            .collect();
        if tokens.is_empty() {
            return Ok(None);
        }

        let mut foreground = true;
        if tokens.last().map(String::as_str) == Some("&") {
            tokens.pop();
            foreground = foreground_only;
        }

        let mut command = ParsedCommand {
            args: Vec::with_capacity(tokens.len()),
            input: None,
            output: None,
            foreground,
        };

        let mut tokens = tokens.into_iter();
        while let Some(token) = tokens.next() {
            match token.as_str() {
                "<" => command.input = Some(redirect_target(&mut tokens, '<')?),
                ">" => command.output = Some(redirect_target(&mut tokens, '>')?),
                _ => command.args.push(token),
            }
        }

        if command.args.is_empty() {
            return Err(ParseError::MissingCommand);
        }
        if command.args.len() > self.max_args {
            return Err(ParseError::TooManyArguments {
                count: command.args.len(),
                max: self.max_args,
            });
        }
        Ok(Some(command))
    }
}

fn redirect_target(
    tokens: &mut impl Iterator<Item = String>,
    op: char,
) -> Result<String, ParseError> {
    match tokens.next() {
        Some(target) if target != "<" && target != ">" => Ok(target),
        _ => Err(ParseError::MissingRedirectTarget(op)),
    }
}
