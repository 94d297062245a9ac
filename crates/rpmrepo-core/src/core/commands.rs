//! Command entry points returning [`ExecutionOutcome`]s for the CLI.

use anyhow::Result;
use serde_json::{json, Value};

use rpmrepo_domain::{SnapshotName, StorageClass};
use rpmrepo_store::ObjectStore;

use crate::core::enumerate::Enumerator;
use crate::core::index::Indexer;
use crate::core::layout::{CacheLayout, PreconditionError};
use crate::core::publish::Publisher;
use crate::core::pull::{PullRequest, Puller};
use crate::core::tooling::outcome::ExecutionOutcome;
use crate::diagnostics::commands;

/// One destination of `push`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushTarget {
    Data {
        storage: StorageClass,
        platform_id: String,
    },
    Snapshot(SnapshotName),
}

impl PushTarget {
    fn describe(&self) -> String {
        match self {
            Self::Data {
                storage,
                platform_id,
            } => format!("data {storage}/{platform_id}"),
            Self::Snapshot(snapshot) => format!("snapshot {snapshot}"),
        }
    }
}

fn precondition_outcome(err: &PreconditionError) -> ExecutionOutcome {
    ExecutionOutcome::user_error(
        err.to_string(),
        json!({ "code": err.code(), "hint": err.hint() }),
    )
}

fn failure_outcome(code: &str, message: &str, err: &anyhow::Error) -> ExecutionOutcome {
    if let Some(precondition) = err.downcast_ref::<PreconditionError>() {
        return precondition_outcome(precondition);
    }
    ExecutionOutcome::failure(
        message,
        json!({ "code": code, "error": format!("{err:#}") }),
    )
}

/// Mirrors the remote repository into the local cache.
///
/// # Errors
/// Returns an error only when the outcome itself cannot be built.
pub fn pull_repository(
    layout: &CacheLayout,
    program: &str,
    request: &PullRequest,
) -> Result<ExecutionOutcome> {
    match Puller::new(layout, program).pull(request) {
        Ok(()) => Ok(ExecutionOutcome::success(
            format!("pulled {} into {}", request.base_url, layout.root().display()),
            json!({
                "root": layout.root().display().to_string(),
                "platform_id": request.platform_id,
                "base_url": request.base_url.as_str(),
            }),
        )),
        Err(err) => Ok(failure_outcome(commands::PULL, "pull failed", &err)),
    }
}

pub fn index_repository(layout: &CacheLayout) -> Result<ExecutionOutcome> {
    match Indexer::new(layout).index() {
        Ok(summary) => Ok(ExecutionOutcome::success(
            format!(
                "indexed {} files into {} blobs",
                summary.files, summary.blobs
            ),
            serde_json::to_value(&summary)?,
        )),
        Err(err) => Ok(failure_outcome(commands::INDEX, "index failed", &err)),
    }
}

/// Pushes the index to every target in order, stopping at the first failure.
pub fn push_targets(
    layout: &CacheLayout,
    store: &dyn ObjectStore,
    targets: &[PushTarget],
) -> Result<ExecutionOutcome> {
    if let Err(err) = layout.require_index_ready() {
        return Ok(precondition_outcome(&err));
    }
    let publisher = Publisher::new(layout, store);
    let mut pushed: Vec<Value> = Vec::new();
    for target in targets {
        let result = match target {
            PushTarget::Data {
                storage,
                platform_id,
            } => publisher.push_data(*storage, platform_id),
            PushTarget::Snapshot(snapshot) => publisher.push_snapshot(snapshot),
        };
        match result {
            Ok(summary) => pushed.push(json!({
                "target": target.describe(),
                "uploaded": summary.uploaded,
                "marker": summary.marker,
            })),
            Err(err) => {
                return Ok(failure_outcome(
                    commands::PUSH,
                    &format!("push to {} failed", target.describe()),
                    &err,
                )
                .with_detail("completed", pushed));
            }
        }
    }
    Ok(ExecutionOutcome::success(
        format!("pushed {} target(s) to {}", pushed.len(), store.describe()),
        json!({ "targets": pushed }),
    ))
}

pub fn build_enumerate_cache(store: &dyn ObjectStore, page_size: usize) -> Result<ExecutionOutcome> {
    match Enumerator::new(store, page_size).rebuild_cache() {
        Ok(names) => Ok(ExecutionOutcome::success(
            format!("cached {} snapshot(s)", names.len()),
            json!({ "snapshots": names }),
        )),
        Err(err) => Ok(failure_outcome(
            commands::ENUMERATE_CACHE,
            "enumerate cache rebuild failed",
            &err,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tooling::outcome::CommandStatus;
    use rpmrepo_store::MemoryStore;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn index_without_pull_is_a_user_error() {
        let temp = tempdir().expect("tempdir");
        let layout = CacheLayout::new(temp.path(), "local").expect("layout");
        let outcome = index_repository(&layout).expect("outcome");
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(outcome.details["code"], "RR150");
    }

    #[test]
    fn push_runs_targets_in_order() {
        let temp = tempdir().expect("tempdir");
        let layout = CacheLayout::new(temp.path(), "local").expect("layout");
        layout.prepare().expect("prepare");
        fs::write(layout.repo_dir().join("a.rpm"), b"a").expect("write");
        fs::write(layout.repo_ready_marker(), b"").expect("marker");
        assert_eq!(
            index_repository(&layout).expect("index").status,
            CommandStatus::Ok
        );

        let store = MemoryStore::new();
        let targets = vec![
            PushTarget::Data {
                storage: StorageClass::Public,
                platform_id: "f40".to_string(),
            },
            PushTarget::Snapshot(SnapshotName::new("f40", "-1").expect("snapshot")),
        ];
        let outcome = push_targets(&layout, &store, &targets).expect("outcome");
        assert_eq!(outcome.status, CommandStatus::Ok);
        assert_eq!(outcome.details["targets"][1]["marker"], "data/thread/f40/f40-1");
        assert_eq!(store.keys().expect("keys").len(), 3);

        let outcome = build_enumerate_cache(&store, 16).expect("outcome");
        assert_eq!(outcome.details["snapshots"], json!(["f40-1"]));
    }

    #[test]
    fn push_before_index_is_a_user_error() {
        let temp = tempdir().expect("tempdir");
        let layout = CacheLayout::new(temp.path(), "local").expect("layout");
        let store = MemoryStore::new();
        let outcome = push_targets(&layout, &store, &[]).expect("outcome");
        assert_eq!(outcome.details["code"], "RR151");
        assert!(store.keys().expect("keys").is_empty());
    }
}
