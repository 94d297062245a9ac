use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use url::Url;

use crate::core::layout::CacheLayout;
use crate::fs;

pub const DEFAULT_SYNC_PROGRAM: &str = "dnf";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequest {
    pub platform_id: String,
    pub base_url: Url,
}

/// The single-repository configuration handed to the sync program.
#[must_use]
pub fn render_dnf_conf(platform_id: &str, base_url: &Url) -> String {
    format!(
        "[main]\nmodule_platform_id=platform:{platform_id}\n[repo0]\nname=repo0\nbaseurl={base_url}\n"
    )
}

/// Mirrors a remote repository into `repo/` with `dnf reposync`.
pub struct Puller<'a> {
    layout: &'a CacheLayout,
    program: &'a str,
}

impl<'a> Puller<'a> {
    pub fn new(layout: &'a CacheLayout, program: &'a str) -> Self {
        Self { layout, program }
    }

    /// Clears `conf/repo-ready`, syncs, and sets the marker again only when
    /// the sync program exits successfully.
    pub fn pull(&self, request: &PullRequest) -> Result<()> {
        if request.platform_id.trim().is_empty() {
            bail!("platform id must not be empty");
        }
        self.layout.prepare()?;
        fs::remove_file_if_exists(&self.layout.repo_ready_marker())?;

        let conf = self.layout.dnf_conf();
        fs::write_atomic(
            &conf,
            render_dnf_conf(&request.platform_id, &request.base_url).as_bytes(),
        )?;

        let installroot = tempfile::Builder::new()
            .prefix("root-")
            .tempdir_in(self.layout.tmp_dir())
            .with_context(|| {
                format!(
                    "failed to create install root under {}",
                    self.layout.tmp_dir().display()
                )
            })?;

        let mut command = Command::new(self.program);
        command
            .arg("-v")
            .arg("reposync")
            .arg("--config")
            .arg(&conf)
            .arg("--download-metadata")
            .arg("--download-path")
            .arg(self.layout.repo_dir())
            .arg("--installroot")
            .arg(installroot.path())
            .arg("--norepopath")
            .args(["--setopt", "reposdir="])
            .args(["--setopt", "skip_if_unavailable=false"]);
        debug!(command = ?command, "running sync program");
        info!(url = %request.base_url, platform = %request.platform_id, "pulling repository");

        let status = command
            .status()
            .with_context(|| format!("failed to spawn '{}'", self.program))?;
        if !status.success() {
            bail!("'{} reposync' failed with {status}", self.program);
        }

        fs::touch(&self.layout.repo_ready_marker())?;
        info!(root = %self.layout.root().display(), "repository ready");
        Ok(())
    }
}
