use std::borrow::Cow;

/// Replaces `$$` with the shell's process id.
#[derive(Debug, Clone)]
pub struct VariableExpander {
    pid: String,
}

impl VariableExpander {
    pub fn new(pid: impl Into<String>) -> Self {
        Self { pid: pid.into() }
    }

    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// Pairs are matched left to right without overlap, so `$$$` keeps its
    /// trailing `$`.
    pub fn expand<'a>(&self, token: &'a str) -> Cow<'a, str> {
        if token.contains("$$") {
            Cow::Owned(token.replace("$$", &self.pid))
        } else {
            Cow::Borrowed(token)
        }
    }
}
