use rusoto_core::RusotoError;
use rusoto_s3::{DeleteObjectError, PutObjectError};
use thiserror::Error;
use uuid::Uuid;
use warp::reject;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents a unique-index violation on the single-active
    /// invariant, i.e. a concurrent publish or restore won.
    #[error("another recording was activated concurrently")]
    ActiveConflict,

    /// Represents an error returned by the remote server when deleting
    /// a blob.
    #[error("blob deletion error")]
    DeleteFailed { source: RusotoError<DeleteObjectError> },

    /// Represents a failure to generate the public URL for a blob.
    #[error("could not generate URL")]
    FailedToGenerateUrl { source: url::ParseError },

    /// Represents a failure to run ffprobe.
    #[error("could not run ffprobe")]
    FfprobeFailed(std::io::Error),

    /// Represents an upload rejected for exceeding the size cap.
    #[error("file too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    /// Represents an operation attempted without an administrator
    /// session.
    #[error("operation requires an administrator")]
    Forbidden,

    /// Represents an ID that could not be parsed.
    #[error("invalid ID: {0}")]
    InvalidId(String),

    /// Represents an error caused by an unreadable form submission.
    #[error("malformed form submission")]
    MalformedFormSubmission,

    /// Represents unparseable ffprobe output.
    #[error("could not parse ffprobe output")]
    MalformedFfprobeOutput(serde_json::Error),

    /// Represents unparseable recording metadata.
    #[error("malformed recording metadata")]
    MalformedUploadMetadata(serde_json::Error),

    /// Represents a required metadata field left empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Represents an ID that does not refer to any recording.
    #[error("no recording with ID: {0}")]
    NonExistentId(Uuid),

    /// Represents an upload whose content type is not audio.
    #[error("not an audio file: {content_type}")]
    NotAnAudioFile { content_type: String },

    /// Represents an error caused by missing parts in a form
    /// submission.
    #[error("missing parts")]
    PartsMissing,

    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// Represents an error while staging data in a temporary file.
    #[error("temporary file error")]
    TemporaryFileError(std::io::Error),

    /// Represents a URL in the database that could not be parsed.
    #[error("unable to parse {url} as URL")]
    UnableToParseUrl { url: String, source: url::ParseError },

    /// Represents a tag value outside the known set.
    #[error("unrecognized tag: {0}")]
    UnrecognizedTag(String),

    /// Represents a duration reported by ffprobe that is not a number.
    #[error("ffprobe reported unusable duration: {0}")]
    UnusableDuration(String),

    /// Represents an error returned by the remote server when
    /// uploading a blob.
    #[error("blob upload error")]
    UploadFailed { source: RusotoError<PutObjectError> },
}

impl reject::Reject for BackendError {}
