use futures::future::BoxFuture;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::recording::{ClassTag, Recording, RecordingMetadata, RecordingPatch, TopicTag, UploadedFile};

pub mod memory;

/// Narrows a listing by activation state and tags, applied as
/// exact-match conjunctions.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListFilter {
    pub active: Option<bool>,
    pub class_tag: Option<ClassTag>,
    pub topic_tag: Option<TopicTag>,
}

impl ListFilter {
    pub fn active_only() -> Self {
        ListFilter {
            active: Some(true),
            ..ListFilter::default()
        }
    }
}

/// The recording table. Activation-state writes go through
/// [`insert_active`](Db::insert_active) and [`restore`](Db::restore)
/// only, each of which archives every other row in the same step.
pub trait Db {
    fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>>;

    /// Archives all currently-active recordings and inserts a new one
    /// as active, atomically where the storage supports it.
    fn insert_active(
        &self,
        metadata: RecordingMetadata,
        file: UploadedFile,
    ) -> BoxFuture<Result<Recording, BackendError>>;

    /// Returns recordings matching `filter`, newest first.
    fn list(&self, filter: ListFilter) -> BoxFuture<Result<Vec<Recording>, BackendError>>;

    /// Archives all currently-active recordings and reactivates the
    /// target, atomically where the storage supports it. Returns
    /// `None` if the target does not exist.
    fn restore(&self, id: &Uuid) -> BoxFuture<Result<Option<Recording>, BackendError>>;

    fn retrieve(&self, id: &Uuid) -> BoxFuture<Result<Option<Recording>, BackendError>>;

    fn update_metadata(
        &self,
        id: &Uuid,
        patch: RecordingPatch,
    ) -> BoxFuture<Result<Option<Recording>, BackendError>>;

    fn update_play_count(
        &self,
        id: &Uuid,
        play_count: i64,
    ) -> BoxFuture<Result<Option<Recording>, BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use std::str::FromStr;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::postgres::{PgPool, PgRow};
    use time::OffsetDateTime;
    use url::Url;
    use uuid::Uuid;

    use super::ListFilter;
    use crate::errors::BackendError;
    use crate::recording::{
        ClassTag, Recording, RecordingMetadata, RecordingPatch, Times, TopicTag, UploadedFile,
    };

    const SINGLE_ACTIVE_CONSTRAINT: &str = "recordings_single_active";

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn delete(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/delete.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentId(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn insert_active(
            &self,
            metadata: RecordingMetadata,
            file: UploadedFile,
        ) -> BoxFuture<Result<Recording, BackendError>> {
            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                sqlx::query(include_str!("queries/archive_active.sql"))
                    .execute(&mut tx)
                    .await
                    .map_err(map_sqlx_error)?;

                let query = sqlx::query_as(include_str!("queries/create.sql"));

                let (id, created_at, updated_at): (Uuid, OffsetDateTime, OffsetDateTime) = query
                    .bind(&metadata.title)
                    .bind(&metadata.speaker)
                    .bind(&metadata.date)
                    .bind(metadata.class_tag.as_str())
                    .bind(metadata.topic_tag.as_str())
                    .bind(&metadata.description)
                    .bind(&file.file_name)
                    .bind(file.url.as_str())
                    .bind(file.file_size)
                    .bind(&file.duration)
                    .fetch_one(&mut tx)
                    .await
                    .map_err(map_sqlx_error)?;

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(Recording::new(
                    id,
                    metadata,
                    file.file_name,
                    file.url,
                    file.file_size,
                    file.duration,
                    0,
                    true,
                    Times {
                        created_at,
                        updated_at,
                    },
                ))
            }
            .boxed()
        }

        fn list(&self, filter: ListFilter) -> BoxFuture<Result<Vec<Recording>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/list.sql"));

                let recordings = query
                    .bind(filter.active)
                    .bind(filter.class_tag.map(|tag| tag.as_str()))
                    .bind(filter.topic_tag.map(|tag| tag.as_str()))
                    .try_map(|row: PgRow| recording_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(recordings)
            }
            .boxed()
        }

        fn restore(&self, id: &Uuid) -> BoxFuture<Result<Option<Recording>, BackendError>> {
            let id = *id;

            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                sqlx::query(include_str!("queries/archive_active.sql"))
                    .execute(&mut tx)
                    .await
                    .map_err(map_sqlx_error)?;

                let recording: Option<Recording> =
                    sqlx::query(include_str!("queries/activate.sql"))
                        .bind(id)
                        .try_map(|row: PgRow| recording_from_row(&row))
                        .fetch_optional(&mut tx)
                        .await
                        .map_err(map_sqlx_error)?;

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(recording)
            }
            .boxed()
        }

        fn retrieve(&self, id: &Uuid) -> BoxFuture<Result<Option<Recording>, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve.sql"));

                let recording: Option<Recording> = query
                    .bind(id)
                    .try_map(|row: PgRow| recording_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(recording)
            }
            .boxed()
        }

        fn update_metadata(
            &self,
            id: &Uuid,
            patch: RecordingPatch,
        ) -> BoxFuture<Result<Option<Recording>, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/update_metadata.sql"));

                let recording: Option<Recording> = query
                    .bind(id)
                    .bind(&patch.title)
                    .bind(&patch.speaker)
                    .bind(&patch.date)
                    .bind(patch.class_tag.map(|tag| tag.as_str()))
                    .bind(patch.topic_tag.map(|tag| tag.as_str()))
                    .bind(&patch.description)
                    .try_map(|row: PgRow| recording_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(recording)
            }
            .boxed()
        }

        fn update_play_count(
            &self,
            id: &Uuid,
            play_count: i64,
        ) -> BoxFuture<Result<Option<Recording>, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/update_play_count.sql"));

                let recording: Option<Recording> = query
                    .bind(id)
                    .bind(play_count)
                    .try_map(|row: PgRow| recording_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(recording)
            }
            .boxed()
        }
    }

    fn recording_from_row(row: &PgRow) -> Result<Recording, sqlx::Error> {
        let id: Uuid = try_get(row, "id")?;
        let created_at: OffsetDateTime = try_get(row, "created_at")?;
        let updated_at: OffsetDateTime = try_get(row, "updated_at")?;

        let title: String = try_get(row, "title")?;
        let speaker: String = try_get(row, "speaker")?;
        let date: String = try_get(row, "date")?;
        let description: Option<String> = try_get(row, "description")?;

        let class_tag: String = try_get(row, "class_tag")?;
        let class_tag = ClassTag::from_str(&class_tag).map_err(decode_error)?;
        let topic_tag: String = try_get(row, "topic_tag")?;
        let topic_tag = TopicTag::from_str(&topic_tag).map_err(decode_error)?;

        let file_name: String = try_get(row, "file_name")?;
        let url: String = try_get(row, "url")?;
        let url: Url = Url::parse(&url).map_err(|source| {
            // this should never happen, since we control the URLs
            // that go into the database, but just for completeness...
            decode_error(BackendError::UnableToParseUrl { url, source })
        })?;

        let file_size: Option<i64> = try_get(row, "file_size")?;
        let duration: Option<String> = try_get(row, "duration")?;
        let play_count: i64 = try_get(row, "play_count")?;
        let is_active: bool = try_get(row, "is_active")?;

        Ok(Recording::new(
            id,
            RecordingMetadata::new(title, speaker, date, class_tag, topic_tag, description),
            file_name,
            url,
            file_size,
            duration,
            play_count,
            is_active,
            Times {
                created_at,
                updated_at,
            },
        ))
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn decode_error(error: BackendError) -> sqlx::Error {
        sqlx::Error::Decode(Box::new(error))
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        match error {
            Error::Database(ref e) if e.constraint() == Some(SINGLE_ACTIVE_CONSTRAINT) => {
                BackendError::ActiveConflict
            }
            _ => BackendError::Sqlx { source: error },
        }
    }
}
