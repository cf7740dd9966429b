//! Terminal styling helpers
//!
//! Output goes through `anstream`, which strips the escapes when stdout or
//! stderr is not a terminal.

use owo_colors::{OwoColorize, Style, Styled};
use std::fmt::Display;

/// Check mark used in success lines
pub const CHECK: &str = "✓";

/// Semantic styles for CLI output
pub trait Stylize: Display + Sized {
    /// Bold
    fn emphasis(&self) -> Styled<&Self> {
        self.style(Style::new().bold())
    }

    /// Names, branches, SHAs
    fn accent(&self) -> Styled<&Self> {
        self.style(Style::new().cyan())
    }

    /// Secondary detail
    fn muted(&self) -> Styled<&Self> {
        self.style(Style::new().dimmed())
    }

    /// Completed steps
    fn success(&self) -> Styled<&Self> {
        self.style(Style::new().green())
    }

    /// Soft failures and pending states
    fn warn(&self) -> Styled<&Self> {
        self.style(Style::new().yellow())
    }

    /// Fatal errors
    fn error(&self) -> Styled<&Self> {
        self.style(Style::new().red().bold())
    }
}

impl<T: Display> Stylize for T {}

/// Green check mark
pub fn check() -> Styled<&'static str> {
    Style::new().green().style(CHECK)
}

/// Dimmed arrow for sub-steps
pub fn arrow() -> Styled<&'static str> {
    Style::new().dimmed().style("→")
}
