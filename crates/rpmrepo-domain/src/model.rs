use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::keys::{blob_key, CURRENT_CHECKSUM_FIELD, LEGACY_CHECKSUM_FIELD};

/// Access boundary a blob is published under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageClass {
    Public,
    Rhvpn,
}

impl StorageClass {
    pub const ALL: [StorageClass; 2] = [StorageClass::Public, StorageClass::Rhvpn];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Rhvpn => "rhvpn",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Self::Public),
            "rhvpn" => Ok(Self::Rhvpn),
            other => bail!("unknown storage class '{other}' (expected 'public' or 'rhvpn')"),
        }
    }
}

/// Which bucket layout a mirror storage identifier lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageGeneration {
    /// The first-generation `rpmci` bucket, with refs under `data/ref/snapshot/`.
    Legacy,
    Current,
}

/// Storage identifiers the resolver accepts in `mirror` paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MirrorStorage {
    Anon,
    Psi,
    Public,
    Rhvpn,
}

impl MirrorStorage {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "anon" => Some(Self::Anon),
            "psi" => Some(Self::Psi),
            "public" => Some(Self::Public),
            "rhvpn" => Some(Self::Rhvpn),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anon => "anon",
            Self::Psi => "psi",
            Self::Public => "public",
            Self::Rhvpn => "rhvpn",
        }
    }

    pub fn generation(self) -> StorageGeneration {
        match self {
            Self::Anon | Self::Psi => StorageGeneration::Legacy,
            Self::Public | Self::Rhvpn => StorageGeneration::Current,
        }
    }

    /// Base URL clients are redirected to; blobs live at `<base>/<platform>/<checksum>`.
    pub fn delivery_base(self) -> &'static str {
        match self {
            Self::Anon => "https://rpmci.s3.us-east-2.amazonaws.com/data/anon",
            Self::Psi => "https://rhos-d.infra.prod.upshift.rdu2.redhat.com:13808/v1/AUTH_95e858620fb34bcc9162d9f52367a560/rpmci/data/anon",
            Self::Public => "https://rpmrepo.storage.s3.amazonaws.com/data/public",
            // Only reachable through the VPC endpoint.
            Self::Rhvpn => "https://rpmrepo.storage.s3.amazonaws.com/data/rhvpn",
        }
    }

    /// Metadata field carrying the checksum on ref objects.
    pub fn checksum_field(self) -> &'static str {
        match self.generation() {
            StorageGeneration::Legacy => LEGACY_CHECKSUM_FIELD,
            StorageGeneration::Current => CURRENT_CHECKSUM_FIELD,
        }
    }

    /// Key of the ref object for `<snapshot>/<path>` in this storage's bucket.
    pub fn ref_key(self, snapshot: &str, path: &str) -> String {
        match self.generation() {
            StorageGeneration::Legacy => format!("data/ref/snapshot/{snapshot}/{path}"),
            StorageGeneration::Current => format!("data/ref/{snapshot}/{path}"),
        }
    }

    /// Key of the blob object a resolved ref points at.
    pub fn blob_key(self, platform: &str, checksum: &Checksum) -> String {
        let dir = match self {
            Self::Anon | Self::Psi => "anon",
            Self::Public => "public",
            Self::Rhvpn => "rhvpn",
        };
        format!("data/{dir}/{platform}/{checksum}")
    }
}

/// Snapshot identifier plus the suffix distinguishing captures of one thread.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotName {
    pub snapshot_id: String,
    pub suffix: String,
}

impl SnapshotName {
    pub fn new(snapshot_id: impl Into<String>, suffix: impl Into<String>) -> Result<Self> {
        let snapshot_id = snapshot_id.into();
        let suffix = suffix.into();
        if snapshot_id.is_empty() {
            bail!("snapshot id must not be empty");
        }
        for part in [&snapshot_id, &suffix] {
            if part.contains('/') {
                bail!("snapshot identifiers must not contain '/' (got '{part}')");
            }
        }
        if matches!(snapshot_id.as_str(), "." | "..") {
            bail!("snapshot id '{snapshot_id}' is reserved");
        }
        Ok(Self {
            snapshot_id,
            suffix,
        })
    }

    /// The committed name, `<snapshot-id><suffix>`.
    pub fn name(&self) -> String {
        format!("{}{}", self.snapshot_id, self.suffix)
    }

    /// Every snapshot commits into the thread named after its snapshot id.
    pub fn marker(&self) -> ThreadMarker {
        ThreadMarker {
            thread_id: self.snapshot_id.clone(),
            name: self.name(),
        }
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.snapshot_id, self.suffix)
    }
}

/// Existence of this marker is what makes a snapshot live.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadMarker {
    pub thread_id: String,
    pub name: String,
}

/// A logical path inside a snapshot and the blob it denotes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RefEntry {
    pub path: String,
    pub checksum: Checksum,
}

/// Identity of one uploaded blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRecord {
    pub storage: StorageClass,
    pub platform_id: String,
    pub checksum: Checksum,
}

impl BlobRecord {
    pub fn key(&self) -> String {
        blob_key(self.storage, &self.platform_id, &self.checksum)
    }
}
