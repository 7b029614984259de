use std::sync::RwLock;

use futures::future::{self, BoxFuture, FutureExt};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Db, ListFilter};
use crate::errors::BackendError;
use crate::recording::{Recording, RecordingMetadata, RecordingPatch, Times, UploadedFile};

/// An in-process [`Db`] used by tests. Rows are appended in creation
/// order, so a reversed scan stands in for `created_at DESC`. The
/// archive-all-then-activate step runs under a single write lock,
/// matching the transactional Postgres implementation.
#[derive(Default)]
pub struct MemoryDb {
    rows: RwLock<Vec<Recording>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        MemoryDb::default()
    }

    fn matches(recording: &Recording, filter: &ListFilter) -> bool {
        filter
            .active
            .map_or(true, |active| recording.is_active == active)
            && filter
                .class_tag
                .map_or(true, |tag| recording.metadata.class_tag == tag)
            && filter
                .topic_tag
                .map_or(true, |tag| recording.metadata.topic_tag == tag)
    }

    fn archive_all(rows: &mut [Recording], now: OffsetDateTime) {
        for row in rows.iter_mut().filter(|row| row.is_active) {
            row.is_active = false;
            row.times.updated_at = now;
        }
    }
}

impl Db for MemoryDb {
    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let mut rows = self.rows.write().unwrap();

        let result = match rows.iter().position(|row| row.id == *id) {
            Some(index) => {
                rows.remove(index);
                Ok(())
            }
            None => Err(BackendError::NonExistentId(*id)),
        };

        future::ready(result).boxed()
    }

    fn insert_active(
        &self,
        metadata: RecordingMetadata,
        file: UploadedFile,
    ) -> BoxFuture<Result<Recording, BackendError>> {
        let now = OffsetDateTime::now_utc();
        let mut rows = self.rows.write().unwrap();

        Self::archive_all(&mut rows, now);

        let recording = Recording::new(
            Uuid::new_v4(),
            metadata,
            file.file_name,
            file.url,
            file.file_size,
            file.duration,
            0,
            true,
            Times {
                created_at: now,
                updated_at: now,
            },
        );

        rows.push(recording.clone());

        future::ready(Ok(recording)).boxed()
    }

    fn list(&self, filter: ListFilter) -> BoxFuture<Result<Vec<Recording>, BackendError>> {
        let rows = self.rows.read().unwrap();

        let mut matching: Vec<Recording> = rows
            .iter()
            .filter(|row| Self::matches(row, &filter))
            .cloned()
            .collect();
        matching.reverse();

        future::ready(Ok(matching)).boxed()
    }

    fn restore(&self, id: &Uuid) -> BoxFuture<Result<Option<Recording>, BackendError>> {
        let now = OffsetDateTime::now_utc();
        let mut rows = self.rows.write().unwrap();

        let result = if rows.iter().any(|row| row.id == *id) {
            Self::archive_all(&mut rows, now);

            let target = rows.iter_mut().find(|row| row.id == *id).unwrap();
            target.is_active = true;
            target.times.updated_at = now;

            Some(target.clone())
        } else {
            None
        };

        future::ready(Ok(result)).boxed()
    }

    fn retrieve(&self, id: &Uuid) -> BoxFuture<Result<Option<Recording>, BackendError>> {
        let rows = self.rows.read().unwrap();

        let result = rows.iter().find(|row| row.id == *id).cloned();

        future::ready(Ok(result)).boxed()
    }

    fn update_metadata(
        &self,
        id: &Uuid,
        patch: RecordingPatch,
    ) -> BoxFuture<Result<Option<Recording>, BackendError>> {
        let mut rows = self.rows.write().unwrap();

        let result = rows.iter_mut().find(|row| row.id == *id).map(|row| {
            if let Some(title) = patch.title {
                row.metadata.title = title;
            }
            if let Some(speaker) = patch.speaker {
                row.metadata.speaker = speaker;
            }
            if let Some(date) = patch.date {
                row.metadata.date = date;
            }
            if let Some(class_tag) = patch.class_tag {
                row.metadata.class_tag = class_tag;
            }
            if let Some(topic_tag) = patch.topic_tag {
                row.metadata.topic_tag = topic_tag;
            }
            if let Some(description) = patch.description {
                row.metadata.description = Some(description);
            }
            row.times.updated_at = OffsetDateTime::now_utc();

            row.clone()
        });

        future::ready(Ok(result)).boxed()
    }

    fn update_play_count(
        &self,
        id: &Uuid,
        play_count: i64,
    ) -> BoxFuture<Result<Option<Recording>, BackendError>> {
        let mut rows = self.rows.write().unwrap();

        let result = rows.iter_mut().find(|row| row.id == *id).map(|row| {
            row.play_count = play_count;
            row.times.updated_at = OffsetDateTime::now_utc();

            row.clone()
        });

        future::ready(Ok(result)).boxed()
    }
}
