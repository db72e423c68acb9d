//! In-place progress line for hashing passes.

use colored::Colorize;
use std::io::{self, IsTerminal, Write};

/// Counts work items and redraws `"<title>: 42% (21/50)"` on stderr.
///
/// Only draws when stderr is a TTY. Ends with `", done."` on [`finish`].
///
/// [`finish`]: Progress::finish
pub struct Progress {
    title: String,
    total: usize,
    current: usize,
    /// Draw at all
    visible: bool,
    /// Last drawn percentage, to skip redundant redraws
    last_percent: u8,
    drawn: bool,
}

impl Progress {
    #[must_use]
    pub fn new(title: &str, total: usize) -> Self {
        Self::with_visibility(title, total, io::stderr().is_terminal())
    }

    /// A progress counter that never draws.
    #[must_use]
    pub fn hidden(title: &str, total: usize) -> Self {
        Self::with_visibility(title, total, false)
    }

    fn with_visibility(title: &str, total: usize, visible: bool) -> Self {
        let mut progress = Self {
            title: title.to_string(),
            total,
            current: 0,
            visible: visible && total > 0,
            last_percent: 0,
            drawn: false,
        };
        progress.draw();
        progress
    }

    /// Moves the counter to `current`, clamped to the total.
    pub fn update(&mut self, current: usize) {
        self.current = current.min(self.total);
        let percent = self.percent();
        if percent != self.last_percent {
            self.last_percent = percent;
            self.draw();
        }
    }

    #[allow(clippy::mem_forget)]
    pub fn finish(mut self) {
        self.current = self.total;
        self.last_percent = 100;
        if self.drawn {
            eprintln!(
                "\r{}: 100% ({}/{}), done.",
                self.title.dimmed(),
                self.total,
                self.total
            );
        }
        std::mem::forget(self);
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.current as f64 / self.total as f64) * 100.0) as u8
    }

    fn draw(&mut self) {
        if !self.visible {
            return;
        }
        eprint!(
            "\r{}: {}% ({}/{})",
            self.title.dimmed(),
            self.percent().to_string().dimmed(),
            self.current,
            self.total
        );
        let _ = io::stderr().flush();
        self.drawn = true;
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        // Abandoned mid-way: leave the cursor on a fresh line.
        if self.drawn && self.current < self.total {
            eprintln!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_tracks_percent() {
        let mut progress = Progress::hidden("Hashing", 200);
        progress.update(50);
        assert_eq!(progress.current, 50);
        assert_eq!(progress.last_percent, 25);
        progress.update(200);
        assert_eq!(progress.last_percent, 100);
    }

    #[test]
    fn test_update_clamps_to_total() {
        let mut progress = Progress::hidden("Hashing", 10);
        progress.update(20);
        assert_eq!(progress.current, 10);
    }

    #[test]
    fn test_zero_total_never_draws() {
        let mut progress = Progress::new("Hashing", 0);
        progress.update(5);
        assert_eq!(progress.current, 0);
        assert!(!progress.drawn);
    }

    #[test]
    fn test_hidden_never_draws() {
        let mut progress = Progress::hidden("Hashing", 3);
        progress.update(2);
        assert!(!progress.drawn);
        progress.finish();
    }
}
