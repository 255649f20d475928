//! Route decision and response assembly for the single servable page.

use std::path::PathBuf;

use serde::Deserialize;

use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::storage::{BlobStore, StorageError};

/// The only path that serves the asset.
pub const ROOT_PATH: &str = "/";

/// What to do with a request for anything other than `GET /`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Reply `404 Not Found`.
    #[default]
    NotFound,
    /// Send nothing and close.
    Ignore,
}

pub struct Responder<S> {
    store: S,
    asset: PathBuf,
    unmatched: UnmatchedPolicy,
}

impl<S: BlobStore> Responder<S> {
    pub fn new(store: S, asset: impl Into<PathBuf>, unmatched: UnmatchedPolicy) -> Self {
        Self {
            store,
            asset: asset.into(),
            unmatched,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Builds the response for `request`.
    ///
    /// Returns `Ok(None)` when the request is unmatched and the policy is
    /// [`UnmatchedPolicy::Ignore`]. The asset is re-read from storage on every
    /// matching call and sent as stored.
    pub async fn build(&self, request: &Request) -> Result<Option<Response>, StorageError> {
        if request.method != Method::GET || request.path != ROOT_PATH {
            return Ok(match self.unmatched {
                UnmatchedPolicy::NotFound => Some(Response::not_found()),
                UnmatchedPolicy::Ignore => None,
            });
        }

        let body = self.store.read(&self.asset).await?;
        Ok(Some(Response::gzip_html(body)))
    }
}
