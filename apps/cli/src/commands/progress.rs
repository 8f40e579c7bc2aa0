//! Terminal progress bars for evaluation groups.

use indicatif::{ProgressBar, ProgressStyle};
use probe_eval::{ProgressEvent, ProgressSink};

/// Draws one progress bar per evaluation group.
pub struct BarProgressSink {
    bar: ProgressBar,
}

impl BarProgressSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({eta})") {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }
}

impl ProgressSink for BarProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { label, total } => {
                self.bar.set_length(total as u64);
                self.bar.set_position(0);
                self.bar.set_message(label);
            }
            ProgressEvent::Completed { done, .. } => self.bar.set_position(done as u64),
            ProgressEvent::Finished { .. } | ProgressEvent::Aborted { .. } => self.bar.finish_and_clear(),
        }
    }
}

impl Default for BarProgressSink {
    fn default() -> Self {
        Self::new()
    }
}
