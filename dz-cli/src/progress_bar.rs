//! Indicatif-backed progress observer

use indicatif::{ProgressBar, ProgressStyle};

use dz_archive::Progress;

/// Terminal progress bar for pack/unpack operations
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .expect("static template")
                .progress_chars("=>-"),
        );
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for BarProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn inc(&self, n: u64) {
        self.bar.inc(n);
    }

    fn info(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    fn warn(&self, msg: &str) {
        // Printed above the bar so it survives redraws.
        self.bar.println(format!("warning: {msg}"));
    }

    fn finish(&self, msg: &str) {
        self.bar.finish_with_message(msg.to_string());
    }
}
