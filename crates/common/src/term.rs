//! Terminal progress reporting for batch runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::{
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

const TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";

/// Counts processed files and renders a progress bar.
///
/// Shared by reference between workers; the counter is the only mutable state.
#[derive(Debug)]
pub struct BatchProgress {
    done: AtomicUsize,
    failed: AtomicUsize,
    bar: ProgressBar,
}

impl BatchProgress {
    /// Creates a visible progress bar for `total` files.
    pub fn new(total: usize, message: &str) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { done: AtomicUsize::new(0), failed: AtomicUsize::new(0), bar }
    }

    /// Creates a progress tracker that never draws.
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden());
        Self { done: AtomicUsize::new(0), failed: AtomicUsize::new(0), bar }
    }

    /// Records a finished file and returns the number of files finished so far.
    pub fn file_done(&self, path: &Path, ok: bool) -> usize {
        if !ok {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(name) = path.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
        self.bar.set_position(done as u64);
        done
    }

    /// Number of finished files.
    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    /// Number of finished files that failed.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Prints a line above the bar without tearing it.
    pub fn println(&self, msg: impl AsRef<str>) {
        self.bar.println(msg);
    }

    /// Clears the bar.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
