//! Download progress normalization.

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

/// Receives download progress as a fraction strictly inside `(0, 1)`
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// A callback that ignores progress
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

lazy_static! {
    static ref PERCENTAGE_REGEX: Regex = Regex::new(r"(\d+(?:[.,]\d+)?)%").unwrap();
}

/// Longest partial number kept between reads
const CARRY_LIMIT: usize = 32;

/// Extracts percentages from a downloader's progress output.
///
/// Each read is scanned together with the trailing partial number of the
/// previous one, so tokens split across reads still match. The whole output
/// is kept for error messages once the process exits.
#[derive(Debug, Default)]
pub struct ProgressParser {
    text: String,
    carry: String,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append output and return the last percentage it completes, as a
    /// fraction
    pub fn push(&mut self, chunk: &str) -> Option<f64> {
        self.text.push_str(chunk);

        let mut window = std::mem::take(&mut self.carry);
        window.push_str(chunk);

        let fraction = PERCENTAGE_REGEX
            .captures_iter(&window)
            .last()
            .and_then(|caps| caps[1].replace(',', ".").parse::<f64>().ok())
            .map(|percent| percent / 100.0);

        self.carry = trailing_number(&window).to_string();
        fraction
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// The digits, dots and commas ending `text`, at most [`CARRY_LIMIT`] bytes
fn trailing_number(text: &str) -> &str {
    let start = text
        .trim_end_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ',')
        .len();
    let tail = &text[start..];
    &tail[tail.len().saturating_sub(CARRY_LIMIT)..]
}

/// Forwards only progress that moves forward within `(0, 1)`.
///
/// curl reports progress per HTTP exchange, and a redirect always runs from
/// 0% to 100% on headers alone. Values at the boundaries or not above the
/// last forwarded one are dropped; the caller reports 0 and 1 itself.
pub struct ProgressFilter {
    callback: ProgressCallback,
    last: f64,
}

impl ProgressFilter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self { callback, last: 0.0 }
    }

    /// Forward `fraction` if acceptable; returns whether it was forwarded
    pub fn report(&mut self, fraction: f64) -> bool {
        if fraction > 0.0 && fraction < 1.0 && fraction > self.last {
            self.last = fraction;
            (self.callback)(fraction);
            true
        } else {
            false
        }
    }
}

/// Strip curl's progress bar remnants from the start of its stderr
pub fn strip_progress_bar(stderr: &str) -> &str {
    stderr
        .trim()
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '#' | 'O' | '=' | '-'))
}
