#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::assert::Assert;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "RPMREPO_STORE",
    "RPMREPO_LEGACY_STORE",
    "RPMREPO_PAGE_SIZE",
    "RPMREPO_VERIFY_BLOBS",
    "RPMREPO_HOMEPAGE",
    "RPMREPO_PSI_BASE",
    "RPMREPO_DNF",
];

/// A cache directory plus local directory-backed stores.
pub struct Sandbox {
    pub temp: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = tempfile::Builder::new()
            .prefix("rpmrepo-cli")
            .tempdir()
            .expect("tempdir");
        Self { temp }
    }

    pub fn cache(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    pub fn store_dir(&self) -> PathBuf {
        self.temp.path().join("store")
    }

    pub fn legacy_dir(&self) -> PathBuf {
        self.temp.path().join("legacy")
    }

    /// `rpmrepo` with a scrubbed environment pointed at this sandbox.
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("rpmrepo");
        for var in ENV_VARS {
            cmd.env_remove(var);
        }
        cmd.env("NO_COLOR", "1")
            .env("RPMREPO_STORE", format!("dir:{}", self.store_dir().display()))
            .env(
                "RPMREPO_LEGACY_STORE",
                format!("dir:{}", self.legacy_dir().display()),
            )
            .env("RPMREPO_HOMEPAGE", "https://home.example/rpmrepo");
        cmd
    }

    /// Installs a stand-in for `dnf` that drops `files` into the download path.
    #[cfg(unix)]
    pub fn fake_dnf(&self, files: &[(&str, &str)]) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let mut script = String::from(
            "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"--download-path\" ]; then dest=\"$2\"; fi\n  shift\ndone\n",
        );
        for (rel, body) in files {
            let dir = Path::new(rel)
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            if !dir.is_empty() {
                script.push_str(&format!("mkdir -p \"$dest/{dir}\"\n"));
            }
            script.push_str(&format!("printf '%s' '{body}' > \"$dest/{rel}\"\n"));
        }
        let path = self.temp.path().join("fake-dnf");
        fs::write(&path, script).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }
}

pub fn parse_json(assert: &Assert) -> Value {
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|err| {
        panic!("stdout is not JSON ({err}): {stdout}");
    })
}
