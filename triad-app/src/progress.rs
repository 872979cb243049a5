//! Terminal progress bars.

use indicatif::{ProgressBar, ProgressStyle};
use triad_export::export::ProgressReporter;

/// [`ProgressReporter`] drawing an indicatif bar on stderr.
#[derive(Debug, Default)]
pub struct IndicatifProgress {
    bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for IndicatifProgress {
    fn start(&mut self, label: &str, total: u64) {
        let bar = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {elapsed_precise}")
        {
            bar.set_style(style.progress_chars("▉▊▋▌▍▎▏ "));
        }
        bar.set_message(label.to_string());
        self.bar = Some(bar);
    }

    fn advance(&mut self, n: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(n);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}
