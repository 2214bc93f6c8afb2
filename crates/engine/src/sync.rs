//! Driver for the sync collaborator: push every unsynced record once and
//! acknowledge the ones the backend accepted.

use herdlog_core::{AnimalRecord, RecordId};
use thiserror::Error;

use crate::{EngineError, Store};

/// Transmits a single record to the remote backend. Returning `Ok` means the
/// backend confirmed receipt.
pub trait Uploader {
    fn upload(&mut self, record: &AnimalRecord) -> Result<(), UploadError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("upload failed: {0}")]
pub struct UploadError(pub String);

impl UploadError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub synced: Vec<RecordId>,
    pub failed: Vec<(RecordId, String)>,
    /// Uploaded, but edited or deleted locally before the upload was
    /// acknowledged. Edited rows stay unsynced for the next pass.
    pub superseded: Vec<RecordId>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.superseded.is_empty()
    }
}

impl Store {
    /// One pass over the unsynced records in id order.
    ///
    /// A rejected upload leaves that record unsynced and the pass moves on.
    /// Nothing is retried here; call again to retry. A record is acknowledged
    /// only if its row still matches what was uploaded. A storage error while
    /// acknowledging aborts the pass, and the record it was acknowledging will
    /// be uploaded again next time.
    pub fn sync_pending<U>(&self, uploader: &mut U) -> Result<SyncReport, EngineError>
    where
        U: Uploader + ?Sized,
    {
        let pending = self.list_unsynced()?;
        let mut report = SyncReport {
            attempted: pending.len(),
            ..SyncReport::default()
        };

        for record in &pending {
            match uploader.upload(record) {
                Ok(()) => {
                    if self.mark_synced_if_unchanged(record)? {
                        report.synced.push(record.id);
                    } else {
                        tracing::info!(record_id = %record.id, "record changed during upload");
                        report.superseded.push(record.id);
                    }
                }
                Err(e) => {
                    tracing::warn!(record_id = %record.id, error = %e, "upload rejected");
                    report.failed.push((record.id, e.0));
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            synced = report.synced.len(),
            failed = report.failed.len(),
            superseded = report.superseded.len(),
            "sync pass finished"
        );
        Ok(report)
    }
}
