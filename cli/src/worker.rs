use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver};
use fieldbackup_engine::{run_backup, Config, EngineError, SessionReport};

use crate::progress::{ChannelProgress, ProgressUpdate};

/// Everything the worker needs to run one session.
pub struct BackupJob {
    pub config: Config,
    pub source: PathBuf,
    pub with_proxies: bool,
}

/// Spawn a background worker thread to execute a backup session.
///
/// Progress arrives on the returned receiver; the channel closes when the
/// session ends.
pub fn spawn_backup(
    job: BackupJob,
    stop: Arc<AtomicBool>,
) -> (JoinHandle<Result<SessionReport, EngineError>>, Receiver<ProgressUpdate>) {
    let (tx, rx) = unbounded::<ProgressUpdate>();

    let handle = thread::spawn(move || {
        let callback = ChannelProgress::new(tx, stop);
        run_backup(&job.config, &job.source, Some(&callback), job.with_proxies)
    });

    (handle, rx)
}
