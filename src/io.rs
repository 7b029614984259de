use std::io;

use bytes::{Buf, Bytes};
use futures::stream::{StreamExt, TryStreamExt};
use warp::multipart::{FormData, Part};

use crate::errors::BackendError;

/// The named parts of a recording submission.
pub struct Upload {
    pub metadata: Part,
    pub audio: Part,
}

/// Splits a form submission into its expected parts.
pub async fn parse_upload(content: FormData) -> Result<Upload, BackendError> {
    let parts: Vec<Part> = content
        .try_collect()
        .await
        .map_err(|_| BackendError::MalformedFormSubmission)?;

    let mut metadata = None;
    let mut audio = None;

    for part in parts {
        match part.name() {
            "metadata" => metadata = Some(part),
            "audio" => audio = Some(part),
            _ => {}
        }
    }

    match (metadata, audio) {
        (Some(metadata), Some(audio)) => Ok(Upload { metadata, audio }),
        _ => Err(BackendError::PartsMissing),
    }
}

/// Collects chunks of [`Part`].
pub async fn part_as_vec(raw: Part) -> Result<Vec<u8>, ()> {
    let vec_of_results = part_as_stream(raw).collect::<Vec<_>>().await;

    let vec_of_vecs = vec_of_results
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ())?;

    Ok(vec_of_vecs.concat())
}

/// Collects raw data from [`Part`].
pub fn part_as_stream(raw: Part) -> impl futures::Stream<Item = Result<Bytes, io::Error>> {
    raw.stream().map(|r| {
        r.map(|mut buf| buf.copy_to_bytes(buf.remaining()))
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "could not retrieve chunk"))
    })
}
