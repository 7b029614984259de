use std::sync::Arc;

use log::Logger;

use crate::errors::BackendError;
use crate::service::RecordingService;
use crate::store::Store;
use crate::urls::Urls;

pub type Prober = dyn Fn(&[u8]) -> Result<f64, BackendError> + Send + Sync;
pub type VecStore<O> = dyn Store<Output = O, Raw = Vec<u8>> + Send + Sync;

/// Marker for types that can parameterize an [`Environment`].
pub trait SafeStore: Clone + Send + Sync {}

impl<T: Clone + Send + Sync> SafeStore for T {}

#[derive(Clone)]
pub struct Environment<O: Clone + Send + Sync> {
    pub logger: Arc<Logger>,
    pub service: Arc<RecordingService<O>>,
    pub store: Arc<VecStore<O>>,
    pub urls: Arc<Urls>,
    pub prober: Arc<Prober>,
    pub config: Config,
}

impl<O: Clone + Send + Sync> Environment<O> {
    pub fn new(
        logger: Arc<Logger>,
        service: Arc<RecordingService<O>>,
        store: Arc<VecStore<O>>,
        urls: Arc<Urls>,
        prober: Arc<Prober>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            service,
            store,
            urls,
            prober,
            config,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) admin_token: String,
}

impl Config {
    pub fn new(admin_token: String) -> Self {
        Self { admin_token }
    }
}
