// src/pipeline/progress.rs

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-batch progress bar. A no-op when progress output is disabled.
pub struct BatchProgress {
    pb: Option<ProgressBar>,
    completed: AtomicUsize,
    total: usize,
}

impl BatchProgress {
    pub fn new(multi_progress: Option<&MultiProgress>, total: usize, batch_number: usize) -> Self {
        let pb = multi_progress.map(|mp| {
            let pb = mp.add(ProgressBar::new(total as u64));
            let style = ProgressStyle::default_bar()
                .template("🔄 [{elapsed_precise}] {prefix} {bar:40.cyan/blue} {pos}/{len} {msg}")
                .map(|s| s.progress_chars("█▉▊▋▌▍▎▏  "))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style);
            pb.set_prefix(format!("Batch {}", batch_number));
            pb
        });
        Self {
            pb,
            completed: AtomicUsize::new(0),
            total,
        }
    }

    pub fn increment(&self, message: &str) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(pb) = &self.pb {
            pb.set_position(completed as u64);
            let remaining = self.total.saturating_sub(completed);
            if remaining > 0 {
                pb.set_message(format!("{} | {} remaining", message, remaining));
            } else {
                pb.set_message(message.to_string());
            }
        }
    }

    pub fn finish(&self, message: &str) {
        if let Some(pb) = &self.pb {
            pb.finish_with_message(message.to_string());
        }
    }
}
