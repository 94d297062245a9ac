use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use rpmrepo_store::{open_store, ObjectStore};

use crate::core::pull::DEFAULT_SYNC_PROGRAM;

pub const DEFAULT_STORE: &str = "https://rpmrepo-storage.s3.amazonaws.com";
pub const DEFAULT_LEGACY_STORE: &str = "https://rpmci.s3.us-east-2.amazonaws.com";
pub const DEFAULT_PAGE_SIZE: usize = 16384;
pub const DEFAULT_HOMEPAGE: &str = "https://github.com/osbuild/rpmrepo";
pub const DEFAULT_PSI_BASE: &str =
    "https://rhos-d.infra.prod.upshift.rdu2.redhat.com:13808/v1/AUTH_95e858620fb34bcc9162d9f52367a560/rpmci";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn flag_is_enabled(&self, key: &str) -> bool {
        match self.var(key) {
            Some(value) => {
                let lowered = value.to_ascii_lowercase();
                !matches!(lowered.as_str(), "0" | "false" | "no" | "off" | "")
            }
            None => false,
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) store: StoreConfig,
    pub(crate) enumerate: EnumerateConfig,
    pub(crate) resolver: ResolverConfig,
    pub(crate) sync_program: String,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let page_size = match snapshot.var("RPMREPO_PAGE_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .with_context(|| format!("RPMREPO_PAGE_SIZE must be a positive integer, got '{raw}'"))?,
            None => DEFAULT_PAGE_SIZE,
        };
        Ok(Self {
            store: StoreConfig {
                current: snapshot
                    .var("RPMREPO_STORE")
                    .unwrap_or(DEFAULT_STORE)
                    .to_string(),
                legacy: snapshot
                    .var("RPMREPO_LEGACY_STORE")
                    .unwrap_or(DEFAULT_LEGACY_STORE)
                    .to_string(),
            },
            enumerate: EnumerateConfig { page_size },
            resolver: ResolverConfig {
                verify_blobs: snapshot.flag_is_enabled("RPMREPO_VERIFY_BLOBS"),
                homepage: snapshot
                    .var("RPMREPO_HOMEPAGE")
                    .unwrap_or(DEFAULT_HOMEPAGE)
                    .to_string(),
                psi_base: snapshot
                    .var("RPMREPO_PSI_BASE")
                    .unwrap_or(DEFAULT_PSI_BASE)
                    .trim_end_matches('/')
                    .to_string(),
            },
            sync_program: snapshot
                .var("RPMREPO_DNF")
                .unwrap_or(DEFAULT_SYNC_PROGRAM)
                .to_string(),
        })
    }

    /// Applies command-line overrides on top of the environment.
    #[must_use]
    pub fn with_overrides(
        mut self,
        store: Option<&str>,
        legacy_store: Option<&str>,
        page_size: Option<usize>,
    ) -> Self {
        if let Some(store) = store {
            self.store.current = store.to_string();
        }
        if let Some(legacy) = legacy_store {
            self.store.legacy = legacy.to_string();
        }
        if let Some(size) = page_size.filter(|size| *size > 0) {
            self.enumerate.page_size = size;
        }
        self
    }

    #[must_use]
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    #[must_use]
    pub fn enumerate(&self) -> &EnumerateConfig {
        &self.enumerate
    }

    #[must_use]
    pub fn resolver(&self) -> &ResolverConfig {
        &self.resolver
    }

    #[must_use]
    pub fn sync_program(&self) -> &str {
        &self.sync_program
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub current: String,
    pub legacy: String,
}

impl StoreConfig {
    pub fn open_current(&self) -> Result<Arc<dyn ObjectStore>> {
        open_store(&self.current).context("failed to open the snapshot store")
    }

    pub fn open_legacy(&self) -> Result<Arc<dyn ObjectStore>> {
        open_store(&self.legacy).context("failed to open the legacy store")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerateConfig {
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Answer 404 when a ref points at a blob that was never uploaded.
    pub verify_blobs: bool,
    pub homepage: String,
    pub psi_base: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        let config = Config::from_snapshot(&EnvSnapshot::testing(&[])).expect("config");
        assert_eq!(config.store().current, DEFAULT_STORE);
        assert_eq!(config.store().legacy, DEFAULT_LEGACY_STORE);
        assert_eq!(config.enumerate().page_size, 16384);
        assert!(!config.resolver().verify_blobs);
        assert_eq!(config.resolver().homepage, DEFAULT_HOMEPAGE);
        assert_eq!(config.sync_program(), "dnf");
    }

    #[test]
    fn environment_overrides_defaults() {
        let snapshot = EnvSnapshot::testing(&[
            ("RPMREPO_STORE", "memory:"),
            ("RPMREPO_LEGACY_STORE", "dir:/srv/legacy"),
            ("RPMREPO_PAGE_SIZE", "2"),
            ("RPMREPO_VERIFY_BLOBS", "yes"),
            ("RPMREPO_PSI_BASE", "https://psi.example/"),
            ("RPMREPO_DNF", "/usr/local/bin/dnf5"),
        ]);
        let config = Config::from_snapshot(&snapshot).expect("config");
        assert_eq!(config.store().current, "memory:");
        assert_eq!(config.store().legacy, "dir:/srv/legacy");
        assert_eq!(config.enumerate().page_size, 2);
        assert!(config.resolver().verify_blobs);
        assert_eq!(config.resolver().psi_base, "https://psi.example");
        assert_eq!(config.sync_program(), "/usr/local/bin/dnf5");
    }

    #[test]
    fn falsy_and_blank_values_fall_back() {
        let snapshot = EnvSnapshot::testing(&[
            ("RPMREPO_VERIFY_BLOBS", "off"),
            ("RPMREPO_STORE", "  "),
        ]);
        let config = Config::from_snapshot(&snapshot).expect("config");
        assert!(!config.resolver().verify_blobs);
        assert_eq!(config.store().current, DEFAULT_STORE);
    }

    #[test]
    fn rejects_invalid_page_size() {
        for raw in ["0", "-1", "many"] {
            let snapshot = EnvSnapshot::testing(&[("RPMREPO_PAGE_SIZE", raw)]);
            assert!(Config::from_snapshot(&snapshot).is_err(), "{raw}");
        }
    }

    #[test]
    fn cli_overrides_win_over_environment() {
        let snapshot = EnvSnapshot::testing(&[("RPMREPO_STORE", "memory:")]);
        let config = Config::from_snapshot(&snapshot)
            .expect("config")
            .with_overrides(Some("dir:/tmp/store"), None, Some(8));
        assert_eq!(config.store().current, "dir:/tmp/store");
        assert_eq!(config.store().legacy, DEFAULT_LEGACY_STORE);
        assert_eq!(config.enumerate().page_size, 8);
    }

    #[test]
    #[serial_test::serial]
    fn from_env_reads_process_environment() {
        env::set_var("RPMREPO_PAGE_SIZE", "7");
        let config = Config::from_env();
        env::remove_var("RPMREPO_PAGE_SIZE");
        assert_eq!(config.expect("config").enumerate().page_size, 7);
    }
}
