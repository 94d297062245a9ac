#![deny(clippy::all)]

mod core;

pub(crate) use crate::core::fs;
pub(crate) use crate::core::tooling::diagnostics;

pub use crate::core::commands::{
    build_enumerate_cache, index_repository, pull_repository, push_targets, PushTarget,
};
pub use crate::core::config::{
    Config, EnumerateConfig, GlobalOptions, ResolverConfig, StoreConfig, DEFAULT_LEGACY_STORE,
    DEFAULT_PAGE_SIZE, DEFAULT_STORE,
};
pub use crate::core::enumerate::{render_snapshot_list, scan_snapshots, Enumerator};
pub use crate::core::index::{checksum_file, IndexSummary, Indexer, ReferenceTree};
pub use crate::core::layout::{generate_local_id, CacheLayout, PreconditionError};
pub use crate::core::publish::{LeavesWritten, Publisher, PushSummary, SnapshotPublication};
pub use crate::core::pull::{render_dnf_conf, PullRequest, Puller, DEFAULT_SYNC_PROGRAM};
pub use crate::core::resolver::{
    split_segments, Command, Destinations, GatewayEvent, GatewayResponse, Grammar,
    MirrorRequest, PathError, PathParameters, Reply, RequestContext, Resolver, ResolverSettings,
    Stage, STAGES,
};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};
