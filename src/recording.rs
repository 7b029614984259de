use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::errors::BackendError;

/// The pacing track a recording belongs to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassTag {
    Cepatan,
    Lambatan,
}

impl ClassTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassTag::Cepatan => "cepatan",
            ClassTag::Lambatan => "lambatan",
        }
    }
}

impl FromStr for ClassTag {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cepatan" => Ok(ClassTag::Cepatan),
            "lambatan" => Ok(ClassTag::Lambatan),
            _ => Err(BackendError::UnrecognizedTag(s.to_owned())),
        }
    }
}

impl fmt::Display for ClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subject track a recording belongs to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicTag {
    Quran,
    Hadits,
}

impl TopicTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicTag::Quran => "quran",
            TopicTag::Hadits => "hadits",
        }
    }
}

impl FromStr for TopicTag {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quran" => Ok(TopicTag::Quran),
            "hadits" => Ok(TopicTag::Hadits),
            _ => Err(BackendError::UnrecognizedTag(s.to_owned())),
        }
    }
}

impl fmt::Display for TopicTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recording in the database.
#[derive(Clone, Debug, Serialize)]
pub struct Recording {
    /// The ID of the recording.
    pub(crate) id: Uuid,

    /// The user-submitted metadata.
    #[serde(flatten)]
    pub(crate) metadata: RecordingMetadata,

    /// The object key the audio is stored under. Needed to delete the
    /// blob along with the row.
    pub(crate) file_name: String,

    /// The public URL of the audio file.
    pub(crate) url: Url,

    /// The size of the audio file in bytes, if known.
    pub(crate) file_size: Option<i64>,

    /// The stored duration. Serialized in `H:MM:SS` form even for rows
    /// written by older clients in `M:SS` form.
    #[serde(serialize_with = "crate::duration::serialize_normalized")]
    pub(crate) duration: Option<String>,

    /// The number of times the recording has been played.
    pub(crate) play_count: i64,

    /// Whether this is the recording currently served to listeners.
    pub(crate) is_active: bool,

    /// The times it was created and updated.
    #[serde(flatten)]
    pub(crate) times: Times,
}

impl Recording {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        metadata: RecordingMetadata,
        file_name: String,
        url: Url,
        file_size: Option<i64>,
        duration: Option<String>,
        play_count: i64,
        is_active: bool,
        times: Times,
    ) -> Self {
        Recording {
            id,
            metadata,
            file_name,
            url,
            file_size,
            duration,
            play_count,
            is_active,
            times,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn metadata(&self) -> &RecordingMetadata {
        &self.metadata
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn play_count(&self) -> i64 {
        self.play_count
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

/// The metadata for a single recording.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecordingMetadata {
    /// The title provided.
    pub(crate) title: String,

    /// The speaker provided.
    pub(crate) speaker: String,

    /// The calendar date of the session, as an ISO date.
    pub(crate) date: String,

    /// The pacing track.
    pub(crate) class_tag: ClassTag,

    /// The subject track.
    pub(crate) topic_tag: TopicTag,

    /// The description provided, if any.
    #[serde(default)]
    pub(crate) description: Option<String>,
}

impl RecordingMetadata {
    pub fn new(
        title: impl Into<String>,
        speaker: impl Into<String>,
        date: impl Into<String>,
        class_tag: ClassTag,
        topic_tag: TopicTag,
        description: Option<String>,
    ) -> Self {
        RecordingMetadata {
            title: title.into(),
            speaker: speaker.into(),
            date: date.into(),
            class_tag,
            topic_tag,
            description,
        }
    }

    /// Rejects metadata whose required fields are empty. The tags are
    /// enforced by their types at deserialization.
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.title.trim().is_empty() {
            return Err(BackendError::MissingField("title"));
        }

        if self.speaker.trim().is_empty() {
            return Err(BackendError::MissingField("speaker"));
        }

        if self.date.trim().is_empty() {
            return Err(BackendError::MissingField("date"));
        }

        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// A partial update to a recording's metadata. Absent fields are left
/// unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RecordingPatch {
    pub(crate) title: Option<String>,
    pub(crate) speaker: Option<String>,
    pub(crate) date: Option<String>,
    pub(crate) class_tag: Option<ClassTag>,
    pub(crate) topic_tag: Option<TopicTag>,
    pub(crate) description: Option<String>,
}

/// The stored-file details handed to Publish once the blob exists.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// The object key in the blob store.
    pub(crate) file_name: String,

    /// The public URL of the blob.
    pub(crate) url: Url,

    /// The size in bytes, if known.
    pub(crate) file_size: Option<i64>,

    /// The probed duration in `H:MM:SS` form, if known.
    pub(crate) duration: Option<String>,
}

impl UploadedFile {
    pub fn new(
        file_name: impl Into<String>,
        url: Url,
        file_size: Option<i64>,
        duration: Option<String>,
    ) -> Self {
        UploadedFile {
            file_name: file_name.into(),
            url,
            file_size,
            duration,
        }
    }
}

/// The creation and modification times of a recording.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Times {
    /// The date and time it was created.
    #[serde(with = "time::serde::timestamp")]
    pub(crate) created_at: OffsetDateTime,

    /// The date and time it was last modified.
    #[serde(with = "time::serde::timestamp")]
    pub(crate) updated_at: OffsetDateTime,
}
