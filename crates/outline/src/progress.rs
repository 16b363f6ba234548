use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use pdfoutline_core::{ProgressObserver, Stage};

/// Spinner that shows the current pipeline stage of one document.
pub struct StageSpinner {
    bar: ProgressBar,
    label: String,
}

impl StageSpinner {
    pub fn new(label: impl Into<String>) -> Self {
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.cyan} [{pos:>3}%] {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(bar, label)
    }

    pub fn with_bar(bar: ProgressBar, label: impl Into<String>) -> Self {
        StageSpinner {
            bar,
            label: label.into(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for StageSpinner {
    fn on_stage(&self, stage: Stage) {
        self.bar.set_position(stage.percent());
        self.bar.set_message(format!("{}: {stage}...", self.label));
        log::debug!("{}: {stage} ({}%)", self.label, stage.percent());
    }
}

/// Bar counting finished files in a batch.
pub fn file_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
