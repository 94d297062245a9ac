//! Stateless request resolution.
//!
//! A request is a stage name and a proxy path. The stage selects a grammar,
//! the grammar turns decoded path segments into a [`Command`], and the
//! command is executed against the object stores. Every failure maps to an
//! HTTP status; nothing here retains state between requests.

mod gateway;
mod grammar;
mod path;
mod reply;

use std::sync::Arc;

use tracing::{debug, warn};

use rpmrepo_domain::{Checksum, MirrorStorage, StorageGeneration};
use rpmrepo_store::{validate_key, ObjectStore};

use crate::core::config::Config;
use crate::core::enumerate::Enumerator;

pub use gateway::{GatewayEvent, PathParameters, RequestContext};
pub use grammar::{Command, Destinations, Grammar, MirrorRequest, Stage, STAGES};
pub use path::{split_segments, PathError};
pub use reply::{GatewayResponse, Reply};

/// Paths that redirect to the project homepage on every live stage.
const HOMEPAGE_PATHS: &[&str] = &["", "/", "README.md"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverSettings {
    pub verify_blobs: bool,
    pub page_size: usize,
    pub destinations: Destinations,
}

impl ResolverSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            verify_blobs: config.resolver().verify_blobs,
            page_size: config.enumerate().page_size,
            destinations: Destinations {
                homepage: config.resolver().homepage.clone(),
                psi_base: config.resolver().psi_base.clone(),
            },
        }
    }
}

pub struct Resolver {
    current: Arc<dyn ObjectStore>,
    legacy: Arc<dyn ObjectStore>,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new(
        current: Arc<dyn ObjectStore>,
        legacy: Arc<dyn ObjectStore>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            current,
            legacy,
            settings,
        }
    }

    pub fn handle_event(&self, event: &GatewayEvent) -> Reply {
        self.handle(event.stage(), event.path())
    }

    pub fn handle(&self, stage: &str, path: &str) -> Reply {
        match self.parse(stage, path) {
            Ok(command) => self.execute(&command),
            Err(err) => {
                debug!(stage, path, code = err.code(), "rejected: {err}");
                Reply::bad_request()
            }
        }
    }

    /// Pure classification of a request; touches no store.
    pub fn parse(&self, stage: &str, path: &str) -> Result<Command, PathError> {
        let grammar = Stage::lookup(stage)
            .ok_or_else(|| PathError::UnknownStage(stage.to_string()))?
            .grammar();
        if grammar == Grammar::Retired {
            return Err(PathError::RetiredStage(stage.to_string()));
        }
        if HOMEPAGE_PATHS.contains(&path) {
            return Ok(Command::Redirect {
                location: self.settings.destinations.homepage.clone(),
            });
        }
        let segments = split_segments(path)?;
        grammar.parse(&segments, &self.settings.destinations)
    }

    pub fn execute(&self, command: &Command) -> Reply {
        match command {
            Command::Redirect { location } => Reply::Redirect {
                location: location.clone(),
            },
            Command::Enumerate { thread } => self.enumerate(thread.as_deref()),
            Command::Mirror(request) => self.mirror(request),
        }
    }

    fn enumerate(&self, thread: Option<&str>) -> Reply {
        let enumerator = Enumerator::new(self.current.as_ref(), self.settings.page_size);
        let body = match enumerator.snapshot_list(thread) {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "enumerate failed");
                return Reply::internal_error();
            }
        };
        match String::from_utf8(body) {
            Ok(body) => Reply::Json { body },
            Err(_) => {
                warn!("enumerate cache is not valid UTF-8");
                Reply::internal_error()
            }
        }
    }

    fn mirror(&self, request: &MirrorRequest) -> Reply {
        let Some(storage) = MirrorStorage::parse(&request.storage) else {
            return Reply::not_acceptable();
        };
        let store = match storage.generation() {
            StorageGeneration::Legacy => &self.legacy,
            StorageGeneration::Current => &self.current,
        };

        let key = storage.ref_key(&request.snapshot, &request.path);
        // Decoded segments may hold `/`, `.` or `..`; no ref is stored under such a key.
        if validate_key(&key).is_err() {
            debug!(key = %key, "ref key cannot exist");
            return Reply::not_found();
        }
        let head = match store.head(&key) {
            Ok(Some(head)) => head,
            Ok(None) => return Reply::not_found(),
            Err(err) => {
                warn!(key = %key, error = %err, "ref lookup failed");
                return Reply::internal_error();
            }
        };
        let Some(raw) = head.metadata.get(storage.checksum_field()) else {
            debug!(key = %key, "ref carries no checksum");
            return Reply::not_found();
        };
        let checksum = match Checksum::parse(raw) {
            Ok(checksum) => checksum,
            Err(err) => {
                warn!(key = %key, error = %err, "ref carries a malformed checksum");
                return Reply::internal_error();
            }
        };

        if self.settings.verify_blobs {
            let blob = storage.blob_key(&request.platform_id, &checksum);
            if validate_key(&blob).is_err() {
                return Reply::not_found();
            }
            match store.head(&blob) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!(key = %key, blob = %blob, "ref points at a missing blob");
                    return Reply::not_found();
                }
                Err(err) => {
                    warn!(blob = %blob, error = %err, "blob lookup failed");
                    return Reply::internal_error();
                }
            }
        }

        Reply::Redirect {
            location: format!(
                "{}/{}/{}",
                storage.delivery_base(),
                urlencoding::encode(&request.platform_id),
                checksum
            ),
        }
    }
}
