use std::io::{self, IsTerminal};

use inksac::prelude::*;

/// Colors user-facing text when the stream it goes to is a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Highlighter {
    color_support: ColorSupport,
}

impl Highlighter {
    pub fn new(enabled: bool) -> Self {
        let support = if enabled {
            check_color_support().unwrap_or(ColorSupport::NoColor)
        } else {
            ColorSupport::NoColor
        };
        Self {
            color_support: support,
        }
    }

    pub fn for_stdout() -> Self {
        Self::new(io::stdout().is_terminal())
    }

    pub fn for_stderr() -> Self {
        Self::new(io::stderr().is_terminal())
    }

    pub fn highlight_error(&self, error: &str) -> String {
        if matches!(self.color_support, ColorSupport::NoColor) {
            return error.to_string();
        }

        let error_style = Style::builder()
            .foreground(Color::Red)
            .bold()
            .build();

        error.style(error_style).to_string()
    }

    pub fn highlight_notice(&self, notice: &str) -> String {
        if matches!(self.color_support, ColorSupport::NoColor) {
            return notice.to_string();
        }

        let notice_style = Style::builder()
            .foreground(Color::RGB(128, 128, 128))
            .build();

        notice.style(notice_style).to_string()
    }
}
