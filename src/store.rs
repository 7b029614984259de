use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use rusoto_s3::{DeleteObjectRequest, PutObjectRequest, S3Client, StreamingBody, S3};
use url::{ParseError, Url};
use uuid::Uuid;

use crate::errors::BackendError;
use crate::normalization::sanitize_file_name;

pub mod mock;

/// Derives the object key for an upload: a generated ID prepended to
/// the sanitized original file name, so two uploads of the same file
/// never collide.
pub fn object_key(id: &Uuid, file_name: &str) -> String {
    format!("{}-{}", id, sanitize_file_name(file_name))
}

pub trait Store: Send + Sync {
    /// The type of successful result.
    type Output;

    /// The type of raw data.
    type Raw;

    /// Deletes the given object.
    fn delete(&self, key: &str) -> BoxFuture<Result<(), BackendError>>;

    /// Gets the public URL for the given object.
    fn get_url(&self, key: &str) -> Result<Url, ParseError>;

    /// Saves the given data under the given key.
    fn save(
        &self,
        key: &str,
        content_type: String,
        raw: Self::Raw,
    ) -> BoxFuture<Result<Self::Output, BackendError>>;
}

/// A store that saves its data to S3-compatible object storage.
pub struct S3Store {
    client: Arc<S3Client>,
    acl: String,
    bucket: String,
    cache_control: String,
    base_url: Url,
}

impl S3Store {
    /// Creates a new instance.
    pub fn new(
        client: Arc<S3Client>,
        acl: String,
        bucket: String,
        cache_control: String,
        base_url: Url,
    ) -> Self {
        Self {
            client,
            acl,
            bucket,
            cache_control,
            base_url,
        }
    }

    pub fn from_env() -> Result<Self, rusoto_core::request::TlsError> {
        use rusoto_core::request::HttpClient;
        use rusoto_core::Region;
        use rusoto_credential::StaticProvider;

        use crate::config::get_variable;

        let access_key = get_variable("S3_ACCESS_KEY");
        let secret_access_key = get_variable("S3_SECRET_ACCESS_KEY");

        let region = Region::Custom {
            name: get_variable("S3_REGION_NAME"),
            endpoint: get_variable("S3_ENDPOINT"),
        };

        let bucket = get_variable("S3_BUCKET_NAME");
        let acl = get_variable("BACKEND_S3_ACL");
        let cache_control = get_variable("BACKEND_S3_CACHE_CONTROL");

        let client = Arc::new(S3Client::new_with(
            HttpClient::new()?,
            StaticProvider::new_minimal(access_key, secret_access_key),
            region,
        ));

        let base_url = Url::parse(&get_variable("S3_BASE_URL")).expect("parse S3_BASE_URL");

        Ok(S3Store::new(client, acl, bucket, cache_control, base_url))
    }
}

impl Store for S3Store {
    type Output = ();
    type Raw = Vec<u8>;

    fn delete(&self, key: &str) -> BoxFuture<Result<(), BackendError>> {
        delete(self, key.to_owned()).boxed()
    }

    fn get_url(&self, key: &str) -> Result<Url, ParseError> {
        self.base_url.join(key)
    }

    fn save(&self, key: &str, content_type: String, raw: Vec<u8>) -> BoxFuture<Result<(), BackendError>> {
        upload(self, key.to_owned(), content_type, raw).boxed()
    }
}

async fn delete(store: &S3Store, key: String) -> Result<(), BackendError> {
    let request = DeleteObjectRequest {
        bucket: store.bucket.clone(),
        key,
        ..Default::default()
    };

    let result = store.client.delete_object(request).await;

    result
        .map(|_| ())
        .map_err(|source| BackendError::DeleteFailed { source })
}

async fn upload(
    store: &S3Store,
    key: String,
    content_type: String,
    raw: Vec<u8>,
) -> Result<(), BackendError> {
    use std::convert::TryFrom;

    let len = i64::try_from(raw.len()).expect("raw data length must be within range of i64");

    let request = PutObjectRequest {
        acl: Some(store.acl.clone()),
        body: Some(StreamingBody::from(raw)),
        bucket: store.bucket.clone(),
        cache_control: Some(store.cache_control.clone()),
        content_length: Some(len),
        content_type: Some(content_type),
        key,
        ..Default::default()
    };

    let result = store.client.put_object(request).await;

    match result {
        Ok(_) => Ok(()),
        Err(e) => Err(BackendError::UploadFailed { source: e }),
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::object_key;

    #[test]
    fn keys_carry_id_and_sanitized_name() {
        let id = Uuid::new_v4();
        let key = object_key(&id, "kajian pagi.mp3");

        assert!(key.starts_with(&id.to_string()));
        assert!(key.ends_with("-kajian-pagi.mp3"));
    }

    #[test]
    fn identical_names_produce_distinct_keys() {
        let name = "senin.mp3";

        assert_ne!(
            object_key(&Uuid::new_v4(), name),
            object_key(&Uuid::new_v4(), name)
        );
    }
}
