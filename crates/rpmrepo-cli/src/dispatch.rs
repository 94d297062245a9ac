use std::io::Read;

use anyhow::{Context, Result};
use serde_json::json;

use rpmrepo_core::{
    build_enumerate_cache, generate_local_id, index_repository, pull_repository, push_targets,
    CacheLayout, Config, ExecutionOutcome, GatewayEvent, PullRequest, PushTarget, Reply,
    Resolver, ResolverSettings,
};
use rpmrepo_domain::{RepoConfig, SnapshotName, StorageClass};

use crate::cli::{CommandCli, LocalArgs, PullArgs, PushArgs, ResolveArgs, RpmrepoCli};

pub fn run(cli: &RpmrepoCli) -> Result<ExecutionOutcome> {
    let config = Config::from_env()?.with_overrides(
        cli.store.as_deref(),
        cli.legacy_store.as_deref(),
        cli.page_size.map(|size| size as usize),
    );
    match &cli.command {
        CommandCli::Pull(args) => pull(&config, args),
        CommandCli::Index(args) => index_repository(&layout(args)?),
        CommandCli::Push(args) => push(&config, args),
        CommandCli::EnumerateCache => {
            let store = config.store().open_current()?;
            build_enumerate_cache(store.as_ref(), config.enumerate().page_size)
        }
        CommandCli::Resolve(args) => resolve(&config, args),
        CommandCli::Gateway => gateway(&config),
    }
}

fn layout(args: &LocalArgs) -> Result<CacheLayout> {
    CacheLayout::new(&args.cache, &args.local)
}

fn pull(config: &Config, args: &PullArgs) -> Result<ExecutionOutcome> {
    let request = match &args.repo {
        Some(path) => {
            let repo = RepoConfig::load(path)?;
            PullRequest {
                base_url: repo.base_url()?,
                platform_id: repo.platform_id,
            }
        }
        None => {
            let (Some(platform_id), Some(base_url)) = (&args.platform_id, &args.base_url) else {
                return Ok(ExecutionOutcome::user_error(
                    "pull needs --repo or both --platform-id and --base-url",
                    json!({ "hint": "pass --repo <FILE>" }),
                ));
            };
            PullRequest {
                platform_id: platform_id.clone(),
                base_url: base_url
                    .parse()
                    .with_context(|| format!("invalid base url '{base_url}'"))?,
            }
        }
    };
    let local = args.local.clone().unwrap_or_else(generate_local_id);
    let layout = CacheLayout::new(&args.cache, &local)?;
    let mut outcome =
        pull_repository(&layout, config.sync_program(), &request)?.with_detail("local", local.as_str());
    if args.local.is_none() {
        outcome.message = format!("{} (local id {local})", outcome.message);
    }
    Ok(outcome)
}

fn push(config: &Config, args: &PushArgs) -> Result<ExecutionOutcome> {
    let mut targets = Vec::new();
    if let Some(path) = &args.repo {
        let repo = RepoConfig::load(path)?;
        let suffix = args.suffix.as_deref().unwrap_or_default();
        targets.push(PushTarget::Data {
            storage: repo.storage,
            platform_id: repo.platform_id.clone(),
        });
        targets.push(PushTarget::Snapshot(repo.snapshot(suffix)?));
    }
    for chunk in args.to.chunks(3) {
        match parse_target(chunk) {
            Ok(target) => targets.push(target),
            Err(err) => {
                return Ok(ExecutionOutcome::user_error(
                    format!("invalid push target: {err:#}"),
                    json!({
                        "target": chunk,
                        "hint": "use `--to data <storage> <platform-id>` or `--to snapshot <snapshot-id> <suffix>`",
                    }),
                ))
            }
        }
    }
    let layout = layout(&args.local)?;
    let store = config.store().open_current()?;
    push_targets(&layout, store.as_ref(), &targets)
}

fn parse_target(chunk: &[String]) -> Result<PushTarget> {
    match chunk {
        [kind, storage, platform_id] if kind == "data" => Ok(PushTarget::Data {
            storage: storage.parse::<StorageClass>()?,
            platform_id: platform_id.clone(),
        }),
        [kind, snapshot_id, suffix] if kind == "snapshot" => Ok(PushTarget::Snapshot(
            SnapshotName::new(snapshot_id.clone(), suffix.clone())?,
        )),
        [kind, ..] => anyhow::bail!("unknown target kind '{kind}'"),
        [] => anyhow::bail!("empty target"),
    }
}

fn resolver(config: &Config) -> Result<Resolver> {
    Ok(Resolver::new(
        config.store().open_current()?,
        config.store().open_legacy()?,
        ResolverSettings::from_config(config),
    ))
}

fn resolve(config: &Config, args: &ResolveArgs) -> Result<ExecutionOutcome> {
    let reply = resolver(config)?.handle(&args.stage, &args.path);
    let envelope = serde_json::to_value(reply.to_gateway())?;
    let message = match &reply {
        Reply::Redirect { location } => format!("{} {location}", reply.status()),
        Reply::Json { body } => body.trim_end().to_string(),
        Reply::Status(status) => format!("{status}"),
    };
    Ok(match reply.status() {
        200..=399 => ExecutionOutcome::success(message, envelope),
        500.. => ExecutionOutcome::failure(message, envelope),
        _ => ExecutionOutcome::user_error(message, envelope),
    })
}

fn gateway(config: &Config) -> Result<ExecutionOutcome> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read the event from stdin")?;
    let event = match GatewayEvent::from_json(&raw) {
        Ok(event) => event,
        Err(err) => {
            return Ok(ExecutionOutcome::user_error(
                format!("invalid gateway event: {err}"),
                json!({ "hint": "expected {\"requestContext\":{\"stage\":..},\"pathParameters\":{\"proxy\":..}}" }),
            ))
        }
    };
    let reply = resolver(config)?.handle_event(&event);
    let response = serde_json::to_string(&reply.to_gateway())?;
    Ok(ExecutionOutcome::success(
        response,
        json!({ "passthrough": true, "statusCode": reply.status() }),
    ))
}
