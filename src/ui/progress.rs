use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use crate::util::progress_percent;

const BAR_TEMPLATE: &str =
    "{prefix} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})";

/// One progress report for a file being downloaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressUpdate<'a> {
    /// Display name of the project the file belongs to.
    pub label: &'a str,
    /// `None` until the transfer has started.
    pub downloaded: Option<u64>,
    pub total: Option<u64>,
    /// 1-based position of this file in the batch.
    pub index: usize,
    pub count: usize,
}

pub trait ProgressSink {
    fn update(&mut self, update: &ProgressUpdate<'_>);

    fn finish(&mut self, _label: &str) {}
}

/// Terminal progress bars.
#[derive(Default)]
pub struct ConsoleProgress {
    bar: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn start(&mut self, update: &ProgressUpdate<'_>) {
        if let Some(previous) = self.bar.take() {
            previous.abandon();
        }
        let bar = ProgressBar::no_length();
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_prefix(format!("[{}/{}]", update.index, update.count));
        bar.set_message(format!("Downloading {}", update.label));
        self.bar = Some(bar);
    }
}

impl ProgressSink for ConsoleProgress {
    fn update(&mut self, update: &ProgressUpdate<'_>) {
        let Some(downloaded) = update.downloaded else {
            self.start(update);
            return;
        };
        if let Some(bar) = &self.bar {
            if let Some(total) = update.total {
                bar.set_length(total);
            }
            bar.set_position(downloaded);
        }
    }

    fn finish(&mut self, label: &str) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!("Downloaded {label}"));
        }
    }
}

/// Progress as log lines, for when stderr is not a terminal.
#[derive(Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn update(&mut self, update: &ProgressUpdate<'_>) {
        match update.downloaded {
            None => info!(
                "[{}/{}] Downloading {}: starting...",
                update.index, update.count, update.label
            ),
            Some(downloaded) => debug!(
                "[{}/{}] Downloading {}: {:.0}%",
                update.index,
                update.count,
                update.label,
                progress_percent(downloaded, update.total)
            ),
        }
    }

    fn finish(&mut self, label: &str) {
        info!("Downloaded {label}");
    }
}
