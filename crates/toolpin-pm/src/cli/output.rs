//! Output formatting for CLI.

use console::{style, Term};
use std::io::Write;
use std::path::Path;

/// Verbosity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Failures and the error count only
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// Map `-v` occurrences to a level
    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            _ => Verbosity::Verbose,
        }
    }
}

/// Output handler for CLI
pub struct Output {
    term: Term,
    verbosity: Verbosity,
}

impl Output {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            verbosity: Verbosity::Normal,
        }
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    fn should_output(&self, min_verbosity: Verbosity) -> bool {
        self.verbosity >= min_verbosity
    }

    /// Write a line
    pub fn writeln(&self, message: &str) {
        if self.should_output(Verbosity::Normal) {
            let _ = writeln!(&self.term, "{}", message);
        }
    }

    /// Write a verbose message
    pub fn verbose(&self, message: &str) {
        if self.should_output(Verbosity::Verbose) {
            let _ = writeln!(&self.term, "{}", style(message).dim());
        }
    }

    /// Write a per-tool failure block; shown even in quiet mode
    pub fn failure(&self, label: &str, url: &str, path: &Path, message: &str) {
        let _ = writeln!(&self.term, "{}", format_failure(label, url, path, message));
    }

    /// Write the `N errors` summary line
    pub fn error_count(&self, count: usize) {
        let _ = writeln!(&self.term, "{}", style(format_error_count(count)).red().bold());
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one tool failure:
///
/// ```text
/// elm 0.19.1
///     < https://example.com/elm.gz
///     > /home/me/.toolpin/elm/0.19.1/elm
/// Unexpected status code: 404
/// ```
pub fn format_failure(label: &str, url: &str, path: &Path, message: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}\n",
        style(label).bold(),
        style(format!("    < {}", url)).dim(),
        style(format!("    > {}", path.display())).dim(),
        message
    )
}

pub fn format_error_count(count: usize) -> String {
    if count == 1 {
        "1 error".to_string()
    } else {
        format!("{} errors", count)
    }
}
