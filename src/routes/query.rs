use std::str::FromStr;

use serde::Deserialize;

use crate::db::ListFilter;
use crate::errors::BackendError;
use crate::recording::{ClassTag, TopicTag};

/// Query parameters accepted by the list and current routes. Tags
/// arrive as raw strings so an unknown value maps to a client error
/// rather than a rejection warp would swallow.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub active: Option<bool>,
    pub class_tag: Option<String>,
    pub topic_tag: Option<String>,
}

impl ListQuery {
    pub fn into_filter(self) -> Result<ListFilter, BackendError> {
        let class_tag = self
            .class_tag
            .map(|tag| ClassTag::from_str(&tag))
            .transpose()?;
        let topic_tag = self
            .topic_tag
            .map(|tag| TopicTag::from_str(&tag))
            .transpose()?;

        Ok(ListFilter {
            active: self.active,
            class_tag,
            topic_tag,
        })
    }
}
