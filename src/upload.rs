use log::debug;
use uuid::Uuid;

use crate::duration;
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::recording::{Recording, RecordingMetadata, UploadedFile};
use crate::session::Session;
use crate::store::object_key;

/// The largest audio file accepted for upload.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Rejects submissions whose content type is not audio or whose size
/// exceeds [`MAX_FILE_SIZE`], before anything touches a store.
pub fn validate(content_type: &str, size: u64) -> Result<(), BackendError> {
    let parsed: mime::Mime = content_type.parse().map_err(|_| BackendError::NotAnAudioFile {
        content_type: content_type.to_owned(),
    })?;

    if parsed.type_() != mime::AUDIO {
        return Err(BackendError::NotAnAudioFile {
            content_type: content_type.to_owned(),
        });
    }

    if size > MAX_FILE_SIZE {
        return Err(BackendError::FileTooLarge {
            size,
            limit: MAX_FILE_SIZE,
        });
    }

    Ok(())
}

/// Runs the full upload flow: validate the file, probe its duration,
/// save the blob, then publish the metadata. A probe failure is not
/// fatal; the recording is published with the fallback duration.
pub async fn complete_upload<O: Clone + Send + Sync>(
    environment: &Environment<O>,
    session: &Session,
    metadata: RecordingMetadata,
    file_name: &str,
    content_type: String,
    data: Vec<u8>,
) -> Result<Recording, BackendError> {
    validate(&content_type, data.len() as u64)?;

    let duration = match (environment.prober)(&data) {
        Ok(seconds) => duration::format_duration(seconds),
        Err(e) => {
            debug!(environment.logger, "Could not probe duration, using fallback"; "error" => format!("{}", e));

            duration::FALLBACK.to_owned()
        }
    };

    let key = object_key(&Uuid::new_v4(), file_name);
    let file_size = data.len() as i64;

    debug!(environment.logger, "Saving audio to store..."; "key" => &key);
    environment.store.save(&key, content_type, data).await?;

    let url = environment
        .store
        .get_url(&key)
        .map_err(|source| BackendError::FailedToGenerateUrl { source })?;

    let file = UploadedFile::new(key, url, Some(file_size), Some(duration));

    environment.service.publish(session, metadata, file).await
}
