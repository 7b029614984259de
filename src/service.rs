use std::sync::Arc;

use log::{debug, warn, Logger};
use uuid::Uuid;

use crate::db::{Db, ListFilter};
use crate::environment::VecStore;
use crate::errors::BackendError;
use crate::recording::{Recording, RecordingMetadata, RecordingPatch, UploadedFile};
use crate::session::Session;

/// Mediates every recording mutation that affects activation state.
/// This is the sole writer of `is_active`: after any successful
/// [`publish`](RecordingService::publish) or
/// [`restore`](RecordingService::restore), exactly one recording is
/// active.
pub struct RecordingService<O: Clone + Send + Sync> {
    logger: Arc<Logger>,
    db: Arc<dyn Db + Send + Sync>,
    store: Arc<VecStore<O>>,
}

impl<O: Clone + Send + Sync> RecordingService<O> {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db + Send + Sync>, store: Arc<VecStore<O>>) -> Self {
        Self { logger, db, store }
    }

    /// Archives whatever is currently active and inserts the new
    /// recording as active. Validation failures happen before any
    /// store call.
    pub async fn publish(
        &self,
        session: &Session,
        metadata: RecordingMetadata,
        file: UploadedFile,
    ) -> Result<Recording, BackendError> {
        session.require_admin()?;
        metadata.validate()?;

        debug!(self.logger, "Publishing recording..."; "title" => metadata.title());

        self.db.insert_active(metadata, file).await
    }

    /// Reactivates an archived recording, archiving whatever was
    /// active instead.
    pub async fn restore(&self, session: &Session, id: &Uuid) -> Result<Recording, BackendError> {
        session.require_admin()?;

        debug!(self.logger, "Restoring recording..."; "id" => format!("{}", id));

        self.db
            .restore(id)
            .await?
            .ok_or(BackendError::NonExistentId(*id))
    }

    /// Reads the current play count and writes it back incremented.
    /// Two listeners reporting a play at the same instant may lose one
    /// count; the counter is informational, not accounting.
    pub async fn increment_play_count(&self, id: &Uuid) -> Result<Recording, BackendError> {
        let recording = self
            .db
            .retrieve(id)
            .await?
            .ok_or(BackendError::NonExistentId(*id))?;

        self.db
            .update_play_count(id, recording.play_count() + 1)
            .await?
            .ok_or(BackendError::NonExistentId(*id))
    }

    /// Applies a partial metadata update.
    pub async fn update_metadata(
        &self,
        session: &Session,
        id: &Uuid,
        patch: RecordingPatch,
    ) -> Result<Recording, BackendError> {
        session.require_admin()?;

        self.db
            .update_metadata(id, patch)
            .await?
            .ok_or(BackendError::NonExistentId(*id))
    }

    /// Removes a recording and its blob. Deleting an id that no longer
    /// exists is a no-op, so repeated deletes of the same recording
    /// succeed. Blob deletion is best-effort: a storage failure is
    /// logged and the row is removed anyway.
    pub async fn delete(&self, session: &Session, id: &Uuid) -> Result<(), BackendError> {
        session.require_admin()?;

        let recording = match self.db.retrieve(id).await? {
            Some(recording) => recording,
            None => {
                debug!(self.logger, "Recording already deleted"; "id" => format!("{}", id));
                return Ok(());
            }
        };

        let key = recording.file_name();

        if let Err(e) = self.store.delete(key).await {
            warn!(self.logger, "Failed to delete blob"; "key" => key, "error" => format!("{}", e));
        }

        match self.db.delete(id).await {
            Err(BackendError::NonExistentId(_)) => Ok(()),
            other => other,
        }
    }

    /// Returns recordings matching `filter`, newest first.
    pub async fn list(&self, filter: ListFilter) -> Result<Vec<Recording>, BackendError> {
        self.db.list(filter).await
    }

    pub async fn retrieve(&self, id: &Uuid) -> Result<Option<Recording>, BackendError> {
        self.db.retrieve(id).await
    }

    /// The recording the player should present for a tag selection:
    /// the active one within the filtered set, or the newest match
    /// when the active recording is filtered out.
    pub async fn current(&self, filter: ListFilter) -> Result<Option<Recording>, BackendError> {
        let recordings = self
            .db
            .list(ListFilter {
                active: None,
                ..filter
            })
            .await?;

        let index = recordings
            .iter()
            .position(|recording| recording.is_active())
            .unwrap_or(0);

        Ok(recordings.into_iter().nth(index))
    }
}
