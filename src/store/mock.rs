use std::collections::HashMap;
use std::sync::RwLock;

use futures::future::{self, BoxFuture, FutureExt};
use url::{ParseError, Url};

use crate::errors::BackendError;
use crate::store::Store;

/// An in-process [`Store`] used by tests. Saves land in a map and
/// every deletion request is logged, whether or not the key existed.
pub struct MockStore {
    pub map: RwLock<HashMap<String, Vec<u8>>>,
    deleted: RwLock<Vec<String>>,
    base_url: Url,
}

impl MockStore {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        MockStore {
            map: RwLock::new(HashMap::new()),
            deleted: RwLock::new(vec![]),
            base_url: Url::parse(base_url.as_ref()).expect("parse mock store base URL"),
        }
    }

    /// The keys deletion has been requested for, in order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.read().unwrap().clone()
    }
}

impl Store for MockStore {
    type Output = ();
    type Raw = Vec<u8>;

    fn delete(&self, key: &str) -> BoxFuture<Result<(), BackendError>> {
        self.map.write().unwrap().remove(key);
        self.deleted.write().unwrap().push(key.to_owned());

        future::ready(Ok(())).boxed()
    }

    fn get_url(&self, key: &str) -> Result<Url, ParseError> {
        self.base_url.join(key)
    }

    fn save(&self, key: &str, _content_type: String, raw: Vec<u8>) -> BoxFuture<Result<(), BackendError>> {
        self.map.write().unwrap().insert(key.to_owned(), raw);

        future::ready(Ok(())).boxed()
    }
}
