#![cfg(unix)]

use rpmrepo_domain::Checksum;
use serde_json::Value;

mod common;

use common::{parse_json, Sandbox};

const FILES: &[(&str, &str)] = &[
    ("repodata/repomd.xml", "<repomd/>"),
    ("Packages/a/a-1.rpm", "rpm-a"),
    ("Packages/a/a-copy.rpm", "rpm-a"),
];

fn pull_and_index(sandbox: &Sandbox) {
    let dnf = sandbox.fake_dnf(FILES);
    sandbox
        .cmd()
        .env("RPMREPO_DNF", &dnf)
        .args(["pull", "--cache"])
        .arg(sandbox.cache())
        .args([
            "--local",
            "f40",
            "--platform-id",
            "f40",
            "--base-url",
            "https://mirror.example/f40/",
        ])
        .assert()
        .success();
    let assert = sandbox
        .cmd()
        .args(["--json", "index", "--cache"])
        .arg(sandbox.cache())
        .args(["--local", "f40"])
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "Ok");
    assert_eq!(payload["details"]["files"], 3);
    assert_eq!(payload["details"]["blobs"], 2);
}

#[test]
fn pull_index_push_then_resolve() {
    let sandbox = Sandbox::new();
    pull_and_index(&sandbox);

    let assert = sandbox
        .cmd()
        .args(["--json", "push", "--cache"])
        .arg(sandbox.cache())
        .args(["--local", "f40"])
        .args(["--to", "data", "public", "f40"])
        .args(["--to", "snapshot", "f40-x86_64", "-20240101"])
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(payload["details"]["targets"][0]["uploaded"], 2);
    assert_eq!(
        payload["details"]["targets"][1]["marker"],
        "data/thread/f40-x86_64/f40-x86_64-20240101"
    );
    assert!(sandbox
        .store_dir()
        .join("data/thread/f40-x86_64/f40-x86_64-20240101")
        .is_file());

    let assert = sandbox
        .cmd()
        .args(["--json", "resolve", "--stage", "default"])
        .arg("mirror/public/f40/f40-x86_64-20240101/Packages/a/a-copy.rpm")
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(payload["details"]["statusCode"], 301);
    assert_eq!(
        payload["details"]["headers"]["Location"],
        format!(
            "https://rpmrepo.storage.s3.amazonaws.com/data/public/f40/{}",
            Checksum::of_bytes(b"rpm-a")
        )
    );

    sandbox
        .cmd()
        .env("RPMREPO_VERIFY_BLOBS", "1")
        .args(["resolve", "mirror/public/f40/f40-x86_64-20240101/repodata/repomd.xml"])
        .assert()
        .success();
}

#[test]
fn enumerate_cache_lists_committed_snapshots() {
    let sandbox = Sandbox::new();
    pull_and_index(&sandbox);
    for suffix in ["-2", "-1"] {
        sandbox
            .cmd()
            .args(["push", "--cache"])
            .arg(sandbox.cache())
            .args(["--local", "f40", "--to", "snapshot", "f40", suffix])
            .assert()
            .success();
    }

    let assert = sandbox
        .cmd()
        .args(["--json", "enumerate-cache"])
        .assert()
        .success();
    assert_eq!(parse_json(&assert)["details"]["snapshots"], serde_json::json!(["f40-1", "f40-2"]));
    let cached = std::fs::read_to_string(sandbox.store_dir().join("data/thread/meta/cache.json"))
        .expect("cache");
    let names: Vec<String> = serde_json::from_str(&cached).expect("json");
    assert_eq!(names, vec!["f40-1", "f40-2"]);

    let assert = sandbox
        .cmd()
        .args(["--json", "resolve", "--stage", "control", "snapshots"])
        .assert()
        .success();
    let body = parse_json(&assert)["details"]["body"]
        .as_str()
        .map(str::to_string)
        .expect("body");
    assert_eq!(body, cached);
}

#[test]
fn push_with_repo_descriptor_derives_targets() {
    let sandbox = Sandbox::new();
    pull_and_index(&sandbox);
    let descriptor = sandbox.temp.path().join("f40.json");
    std::fs::write(
        &descriptor,
        r#"{"base-url":"https://mirror.example/f40/","platform-id":"f40","snapshot-id":"f40-x86_64","storage":"rhvpn"}"#,
    )
    .expect("descriptor");

    let assert = sandbox
        .cmd()
        .args(["--json", "push", "--cache"])
        .arg(sandbox.cache())
        .args(["--local", "f40", "--repo"])
        .arg(&descriptor)
        .args(["--suffix", "-20240301"])
        .assert()
        .success();
    let targets = parse_json(&assert)["details"]["targets"].clone();
    assert_eq!(targets.as_array().map(Vec::len), Some(2));
    assert_eq!(targets[0]["target"], Value::from("data rhvpn/f40"));
    assert!(sandbox
        .store_dir()
        .join("data/thread/f40-x86_64/f40-x86_64-20240301")
        .is_file());
}

#[test]
fn failed_pull_reports_failure() {
    let sandbox = Sandbox::new();
    let assert = sandbox
        .cmd()
        .env("RPMREPO_DNF", "false")
        .args(["--json", "pull", "--cache"])
        .arg(sandbox.cache())
        .args(["--local", "broken", "--platform-id", "f40", "--base-url", "https://m.example/"])
        .assert()
        .code(2);
    assert_eq!(parse_json(&assert)["details"]["code"], "RR101");
    assert!(!sandbox.cache().join("broken/conf/repo-ready").exists());
}
