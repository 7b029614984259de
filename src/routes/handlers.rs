use std::time::{Duration, Instant};

use log::debug;
use serde::Deserialize;
use url::Url;
use uuid::Uuid;
use warp::{
    filters::multipart::FormData,
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::environment::{Environment, SafeStore};
use crate::errors::BackendError;
use crate::io::{self, parse_upload};
use crate::recording::{Recording, RecordingMetadata, RecordingPatch, UploadedFile};
use crate::routes::{
    query::ListQuery,
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::session::Session;
use crate::upload;

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

/// The JSON body accepted by the publish route: recording metadata
/// plus the details of an already-uploaded file.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(flatten)]
    metadata: RecordingMetadata,

    file_url: Url,

    file_name: String,

    #[serde(default)]
    file_size: Option<i64>,

    #[serde(default)]
    duration: Option<String>,
}

/// The JSON body accepted by the update route. `increment_play_count`
/// and `restore` take precedence over a field patch, in that order.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    increment_play_count: bool,

    #[serde(default)]
    restore: bool,

    #[serde(flatten)]
    patch: RecordingPatch,
}

pub async fn list<O: SafeStore>(environment: Environment<O>, query: ListQuery) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::list(), e);

        let filter = query.into_filter().map_err(error_handler)?;

        let recordings = environment
            .service
            .list(filter)
            .await
            .map_err(error_handler)?;

        json(&recordings)
    }
}

pub async fn current<O: SafeStore>(environment: Environment<O>, query: ListQuery) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::current(), e);

        let filter = query.into_filter().map_err(error_handler)?;

        let option = environment
            .service
            .current(filter)
            .await
            .map_err(error_handler)?;

        match option {
            Some(recording) => with_status(json(&recording), StatusCode::OK),
            None => with_status(json(&()), StatusCode::NOT_FOUND),
        }
    }
}

pub async fn retrieve<O: SafeStore>(environment: Environment<O>, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id.clone()), e);

        let id = Uuid::parse_str(&id)
            .map_err(|_| BackendError::InvalidId(id.clone()))
            .map_err(error_handler)?;
        debug!(environment.logger, "Retrieving recording..."; "id" => format!("{}", &id));

        let option = environment.service.retrieve(&id).await.map_err(error_handler)?;

        match option {
            Some(recording) => with_status(json(&recording), StatusCode::OK),
            None => with_status(json(&()), StatusCode::NOT_FOUND),
        }
    }
}

pub async fn publish<O: SafeStore + 'static>(
    environment: Environment<O>,
    authorization: Option<String>,
    request: PublishRequest,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::publish(), e);

        let session = session_from(&environment, authorization.as_deref());

        debug!(environment.logger, "Publishing recording...");
        let PublishRequest {
            metadata,
            file_url,
            file_name,
            file_size,
            duration,
        } = request;
        let file = UploadedFile::new(file_name, file_url, file_size, duration);

        let recording = environment
            .service
            .publish(&session, metadata, file)
            .await
            .map_err(error_handler)?;

        created_at_location(&environment, &recording)
    }
}

pub async fn upload<O: SafeStore + 'static>(
    environment: Environment<O>,
    authorization: Option<String>,
    content: FormData,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::upload(None), e);

        let session = session_from(&environment, authorization.as_deref());

        debug!(environment.logger, "Parsing submission...");
        let parts = parse_upload(content).await.map_err(error_handler)?;

        debug!(environment.logger, "Parsing recording metadata...");
        let raw_metadata = io::part_as_vec(parts.metadata)
            .await
            .map_err(|_| error_handler(BackendError::MalformedFormSubmission))?;
        let metadata: RecordingMetadata = serde_json::from_slice(&raw_metadata)
            .map_err(|e| error_handler(BackendError::MalformedUploadMetadata(e)))?;

        let file_name = parts.audio.filename().unwrap_or("audio").to_owned();
        let content_type = parts.audio.content_type().unwrap_or("").to_owned();

        debug!(environment.logger, "Reading audio contents..."; "file_name" => &file_name);
        let data = io::part_as_vec(parts.audio)
            .await
            .map_err(|_| error_handler(BackendError::MalformedFormSubmission))?;

        let recording =
            upload::complete_upload(&environment, &session, metadata, &file_name, content_type, data)
                .await
                .map_err(error_handler)?;

        created_at_location(&environment, &recording)
    }
}

pub async fn update<O: SafeStore>(
    environment: Environment<O>,
    id: String,
    authorization: Option<String>,
    request: UpdateRequest,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::update(id.clone()), e);

        let parsed = Uuid::parse_str(&id)
            .map_err(|_| BackendError::InvalidId(id.clone()))
            .map_err(error_handler)?;

        let recording = if request.increment_play_count {
            debug!(environment.logger, "Incrementing play count..."; "id" => &id);

            environment.service.increment_play_count(&parsed).await
        } else if request.restore {
            debug!(environment.logger, "Restoring recording..."; "id" => &id);

            let session = session_from(&environment, authorization.as_deref());
            environment.service.restore(&session, &parsed).await
        } else {
            debug!(environment.logger, "Updating recording..."; "id" => &id);

            let session = session_from(&environment, authorization.as_deref());
            environment
                .service
                .update_metadata(&session, &parsed, request.patch)
                .await
        }
        .map_err(error_handler)?;

        json(&recording)
    }
}

pub async fn delete<O: SafeStore>(
    environment: Environment<O>,
    id: String,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete(id.clone()), e);

        let parsed = Uuid::parse_str(&id)
            .map_err(|_| BackendError::InvalidId(id.clone()))
            .map_err(error_handler)?;
        debug!(environment.logger, "Deleting recording..."; "id" => &id);

        let session = session_from(&environment, authorization.as_deref());
        environment
            .service
            .delete(&session, &parsed)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Deleted { success: true })
    }
}

fn session_from<O: SafeStore>(environment: &Environment<O>, header: Option<&str>) -> Session {
    Session::from_bearer(&environment.config.admin_token, header)
}

fn created_at_location<O: SafeStore>(
    environment: &Environment<O>,
    recording: &Recording,
) -> impl Reply {
    let location = environment.urls.recording(recording.id());

    with_header(
        with_status(json(recording), StatusCode::CREATED),
        "location",
        location.as_str(),
    )
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
