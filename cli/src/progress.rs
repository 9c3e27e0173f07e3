use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use fieldbackup_engine::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    RunStarted { total: usize },
    FileProcessed { index: usize, total: usize },
}

/// A ProgressCallback that forwards updates to the display thread via a
/// channel, and reads the stop flag set by the Ctrl+C handler.
pub struct ChannelProgress {
    sender: Sender<ProgressUpdate>,
    stop: Arc<AtomicBool>,
}

impl ChannelProgress {
    pub fn new(sender: Sender<ProgressUpdate>, stop: Arc<AtomicBool>) -> Self {
        ChannelProgress { sender, stop }
    }
}

impl ProgressCallback for ChannelProgress {
    fn on_run_started(&self, total: usize) {
        let _ = self.sender.send(ProgressUpdate::RunStarted { total });
    }

    fn on_file_processed(&self, index: usize, total: usize) {
        let _ = self.sender.send(ProgressUpdate::FileProcessed { index, total });
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Draw a bar from `receiver` until the worker drops its sender.
///
/// The bar length is the largest total seen so far. Returns the number of
/// files reported as processed.
pub fn render_progress(receiver: Receiver<ProgressUpdate>) -> usize {
    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }

    let mut max_total = 0;
    let mut processed = 0;
    for update in receiver.iter() {
        let total = match update {
            ProgressUpdate::RunStarted { total } => total,
            ProgressUpdate::FileProcessed { index, total } => {
                processed = index;
                bar.set_position(index as u64);
                total
            }
        };
        if total > max_total {
            max_total = total;
            bar.set_length(max_total as u64);
        }
    }

    bar.finish_and_clear();
    processed
}
