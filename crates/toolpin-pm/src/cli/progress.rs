//! Per-tool status lines.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// State of one tool's status line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    /// Fraction in `[0, 1]`
    Progress(f64),
    Error,
}

/// Render a status line, e.g. ` 42% elm 0.19.1` or `ERR! elm 0.19.1`
pub fn format_slot(slot: Slot, label: &str) -> String {
    let prefix = match slot {
        Slot::Progress(fraction) => {
            let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32;
            format!("{:>3}%", percent)
        }
        Slot::Error => "ERR!".to_string(),
    };
    format!("{} {}", prefix, label)
}

/// Manages one status line per tool being installed
pub struct ProgressManager {
    multi: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            enabled,
        }
    }

    /// Create the status line for a tool, starting at 0%
    pub fn create_tool_bar(&self, label: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi.add(ProgressBar::new(100));
        if let Ok(style) = ProgressStyle::default_bar().template("{msg}") {
            pb.set_style(style);
        }
        pb.set_message(format_slot(Slot::Progress(0.0), label));
        pb
    }

    /// Redraw a tool's status line
    pub fn update(bar: &ProgressBar, slot: Slot, label: &str) {
        match slot {
            Slot::Progress(fraction) => {
                bar.set_position((fraction.clamp(0.0, 1.0) * 100.0) as u64);
                bar.set_message(format_slot(slot, label));
            }
            Slot::Error => bar.abandon_with_message(format_slot(slot, label)),
        }
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_slot() {
        assert_eq!(format_slot(Slot::Progress(0.0), "elm 0.19.1"), "  0% elm 0.19.1");
        assert_eq!(format_slot(Slot::Progress(0.42), "elm 0.19.1"), " 42% elm 0.19.1");
        assert_eq!(format_slot(Slot::Progress(1.0), "elm 0.19.1"), "100% elm 0.19.1");
        assert_eq!(format_slot(Slot::Error, "elm 0.19.1"), "ERR! elm 0.19.1");
    }

    #[test]
    fn test_progress_manager_disabled() {
        let pm = ProgressManager::new(false);

        let bar = pm.create_tool_bar("elm 0.19.1");
        assert!(bar.is_hidden());
        ProgressManager::update(&bar, Slot::Progress(0.5), "elm 0.19.1");
        ProgressManager::update(&bar, Slot::Error, "elm 0.19.1");
    }
}
