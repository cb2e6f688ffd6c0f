use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{MissedTickBehavior, interval};

use crate::blob::BlobStore;
use crate::error::Result;
use crate::store::Store;
use crate::types::File;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired global files newly marked for deletion.
    pub expired: usize,
    pub purged: usize,
    /// Files already gone by the time they were reached.
    pub skipped: usize,
    /// Files left for the next run after a blob or record failure.
    pub failed: usize,
}

/// Purges every file marked for deletion, across all orgs.
///
/// Expired global files are marked first. The work list is read from live
/// state on every run, so an interrupted sweep resumes by simply running again.
/// Per-file failures are logged and never abort the batch.
pub fn sweep(store: &dyn Store, blobs: &dyn BlobStore, now: DateTime<Utc>) -> Result<SweepReport> {
    let mut report = SweepReport {
        expired: store.mark_expired_global_files(now)?,
        ..SweepReport::default()
    };

    let candidates = store.list_files_marked_for_deletion()?;

    for candidate in candidates {
        // Re-read: a restore or a concurrent purge may have happened since listing
        let file = match store.get_file(&candidate.id) {
            Ok(Some(file)) if file.should_delete => file,
            Ok(_) => {
                report.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(file_id = %candidate.id, "Sweep failed to load file: {e}");
                report.failed += 1;
                continue;
            }
        };

        match purge_marked(store, blobs, &file) {
            Ok(true) => report.purged += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                tracing::warn!(file_id = %file.id, "Sweep failed to purge file: {e}");
                report.failed += 1;
            }
        }
    }

    if report.expired + report.purged + report.failed > 0 {
        tracing::info!(
            expired = report.expired,
            purged = report.purged,
            skipped = report.skipped,
            failed = report.failed,
            "Sweep finished"
        );
    }

    Ok(report)
}

/// Blob first, then the record only if it is still marked. A restore landing
/// between the two keeps its record but has already lost the blob.
fn purge_marked(store: &dyn Store, blobs: &dyn BlobStore, file: &File) -> Result<bool> {
    blobs.delete(&file.blob_ref)?;
    let deleted = store.delete_marked_file(&file.id)?;
    if !deleted && store.get_file(&file.id)?.is_some() {
        tracing::warn!(file_id = %file.id, "File restored during sweep after its blob was deleted");
    }
    Ok(deleted)
}

/// Runs the sweep on a fixed interval in the background.
pub struct Sweeper {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
    period: Duration,
}

impl Sweeper {
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>, period: Duration) -> Self {
        Self {
            store,
            blobs,
            period,
        }
    }

    pub async fn run(self) {
        tracing::info!("Starting sweeper, every {}s", self.period.as_secs());

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let store = Arc::clone(&self.store);
            let blobs = Arc::clone(&self.blobs);
            let result =
                tokio::task::spawn_blocking(move || sweep(store.as_ref(), blobs.as_ref(), Utc::now()))
                    .await;

            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!("Sweep failed: {e}"),
                Err(e) => tracing::error!("Sweep task panicked: {e}"),
            }
        }
    }
}
