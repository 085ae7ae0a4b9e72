//! Progress reporting for backup and restore operations.
//!
//! Drivers notify an optional [`ProgressSink`] at per-file boundaries and
//! poll it for cooperative cancellation. [`ConsoleProgress`] is the CLI
//! implementation: a single status line redrawn in place.

use std::io::{self, Write};
use std::path::Path;

/// Receiver for per-file progress events.
///
/// All notifications have default empty implementations so a sink only
/// implements what it cares about. After any per-file notification the
/// driver polls [`should_cancel`](Self::should_cancel) and aborts the
/// operation when it returns true.
pub trait ProgressSink {
    fn on_start(&mut self, _total_files: usize, _operation: &str) {}

    fn on_progress(&mut self, _current: &Path, _index: usize, _total: usize, _percent: f64) {}

    fn on_file_success(&mut self, _path: &Path) {}

    fn on_file_error(&mut self, _path: &Path, _message: &str) {}

    fn on_file_skipped(&mut self, _path: &Path, _reason: &str) {}

    fn on_complete(&mut self, _succeeded: usize, _failed: usize, _skipped: usize, _success: bool) {}

    fn should_cancel(&self) -> bool {
        false
    }
}

/// Console progress bar, redrawn on stderr with carriage returns so it
/// doesn't interfere with stdout output.
pub struct ConsoleProgress {
    operation: String,
    total: usize,
    prev_len: usize,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        ConsoleProgress { operation: String::new(), total: 0, prev_len: 0 }
    }

    fn draw(&mut self, index: usize, percent: f64) {
        // Determine terminal width (default 80)
        let term_width = term_size::dimensions().map(|(w, _)| w).unwrap_or(80);

        let mut bar_width: usize = 40;
        let line = loop {
            let filled = ((percent / 100.0) * bar_width as f64) as usize;
            let empty = bar_width - filled.min(bar_width);
            let line = format!(
                "[{}] [{}{}] {:.1}% | {}/{} files",
                self.operation.to_uppercase(),
                "█".repeat(filled.min(bar_width)),
                "░".repeat(empty),
                percent,
                index,
                self.total,
            );
            if line.chars().count() <= term_width || bar_width <= 10 {
                break line;
            }
            bar_width -= 4;
        };

        // Pad with spaces if the new line is shorter than the previous one.
        let mut padded = line.clone();
        if self.prev_len > padded.chars().count() {
            padded.push_str(&" ".repeat(self.prev_len - padded.chars().count()));
        }
        self.prev_len = line.chars().count();

        eprint!("\r\x1B[2K{}", padded);
        io::stderr().flush().ok();
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_start(&mut self, total_files: usize, operation: &str) {
        self.operation = operation.to_string();
        self.total = total_files;
        self.prev_len = 0;
    }

    fn on_progress(&mut self, _current: &Path, index: usize, _total: usize, percent: f64) {
        self.draw(index, percent);
    }

    fn on_file_error(&mut self, path: &Path, message: &str) {
        eprintln!("\r\x1B[2K[{}] {}: {}", self.operation, path.display(), message);
        self.prev_len = 0;
    }

    fn on_complete(&mut self, succeeded: usize, failed: usize, skipped: usize, _success: bool) {
        eprintln!(
            "\r\x1B[2K[{}] done | ok: {} | failed: {} | skipped: {}",
            self.operation, succeeded, failed, skipped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Recorder {
        events: Vec<String>,
        cancel_after: Option<usize>,
        seen: usize,
    }

    impl ProgressSink for Recorder {
        fn on_start(&mut self, total: usize, op: &str) {
            self.events.push(format!("start {} {}", op, total));
        }
        fn on_progress(&mut self, _c: &Path, index: usize, total: usize, _p: f64) {
            self.seen = index;
            self.events.push(format!("progress {}/{}", index, total));
        }
        fn on_complete(&mut self, ok: usize, failed: usize, skipped: usize, success: bool) {
            self.events.push(format!("complete {} {} {} {}", ok, failed, skipped, success));
        }
        fn should_cancel(&self) -> bool {
            self.cancel_after.map(|n| self.seen >= n).unwrap_or(false)
        }
    }

    #[test]
    fn default_sink_never_cancels() {
        struct Quiet;
        impl ProgressSink for Quiet {}
        let q = Quiet;
        assert!(!q.should_cancel());
    }

    #[test]
    fn recorder_sees_ordered_events() {
        let mut r = Recorder { events: vec![], cancel_after: None, seen: 0 };
        r.on_start(2, "backup");
        r.on_progress(&PathBuf::from("a"), 1, 2, 50.0);
        r.on_progress(&PathBuf::from("b"), 2, 2, 100.0);
        r.on_complete(2, 0, 0, true);
        assert_eq!(
            r.events,
            vec!["start backup 2", "progress 1/2", "progress 2/2", "complete 2 0 0 true"]
        );
    }
}
