use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::CONTENT_LENGTH;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::{validate_key, ListPage, Metadata, ObjectHead, ObjectStore, StoreError};

const USER_AGENT: &str = concat!("rpmrepo-store/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const META_HEADER_PREFIX: &str = "x-amz-meta-";

/// Anonymous client for an S3-compatible bucket endpoint.
///
/// Reads map a 404 (and the 403 S3 returns for missing keys when listing is
/// not granted) to "absent". Metadata travels as `x-amz-meta-*` headers.
/// Listing is not offered: it requires the XML listing API of the bucket.
#[derive(Clone, Debug)]
pub struct HttpStore {
    base: Url,
    client: Client,
}

impl HttpStore {
    pub fn new(base: Url) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self { base, client })
    }

    fn object_url(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        let encoded = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            encoded
        ))
    }

    fn send_put(&self, key: &str, request: RequestBuilder, metadata: &Metadata) -> Result<()> {
        let request = metadata.iter().fold(request, |request, (name, value)| {
            request.header(format!("{META_HEADER_PREFIX}{name}"), value)
        });
        let response = request
            .send()
            .with_context(|| format!("failed to upload {key}"))?;
        if !response.status().is_success() {
            return Err(StoreError::UnexpectedStatus {
                key: key.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }
        debug!(%key, "uploaded object");
        Ok(())
    }
}

fn is_absent(status: StatusCode) -> bool {
    matches!(status, StatusCode::NOT_FOUND | StatusCode::FORBIDDEN)
}

fn metadata_from(response: &Response) -> Metadata {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            let field = name.as_str().strip_prefix(META_HEADER_PREFIX)?;
            let value = value.to_str().ok()?;
            Some((field.to_string(), value.to_string()))
        })
        .collect()
}

impl ObjectStore for HttpStore {
    fn describe(&self) -> String {
        self.base.to_string()
    }

    fn put_object(&self, key: &str, body: &[u8], metadata: &Metadata) -> Result<()> {
        let url = self.object_url(key)?;
        let request = self.client.put(url).body(body.to_vec());
        self.send_put(key, request, metadata)
    }

    fn put_file(&self, key: &str, path: &Path, metadata: &Metadata) -> Result<()> {
        let url = self.object_url(key)?;
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        let request = self.client.put(url).body(Body::sized(file, len));
        self.send_put(key, request, metadata)
    }

    fn head(&self, key: &str) -> Result<Option<ObjectHead>> {
        let url = self.object_url(key)?;
        let response = self
            .client
            .head(&url)
            .send()
            .with_context(|| format!("failed to query {url}"))?;
        let status = response.status();
        if is_absent(status) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus {
                key: key.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);
        Ok(Some(ObjectHead {
            size,
            metadata: metadata_from(&response),
        }))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let url = self.object_url(key)?;
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?;
        let status = response.status();
        if is_absent(status) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus {
                key: key.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read body of {url}"))?;
        Ok(Some(bytes.to_vec()))
    }

    fn list_page(
        &self,
        _prefix: &str,
        _start_after: Option<&str>,
        _page_size: usize,
    ) -> Result<ListPage> {
        Err(StoreError::Unsupported {
            backend: "http",
            operation: "listing",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use std::panic;

    const CHECKSUM: &str =
        "sha256-e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn start_server() -> Option<Server> {
        match panic::catch_unwind(Server::run) {
            Ok(server) => Some(server),
            Err(_) => {
                eprintln!("skipping http store test (httptest server unavailable)");
                None
            }
        }
    }

    fn store_for(server: &Server) -> Result<HttpStore> {
        HttpStore::new(Url::parse(&server.url_str("/"))?)
    }

    #[test]
    fn head_reads_checksum_metadata() -> Result<()> {
        let Some(server) = start_server() else {
            return Ok(());
        };
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/data/ref/test/empty"))
                .respond_with(
                    status_code(200).insert_header("x-amz-meta-rpmrepo-checksum", CHECKSUM),
                ),
        );
        let store = store_for(&server)?;
        let head = store.head("data/ref/test/empty")?.expect("ref present");
        assert_eq!(
            head.metadata.get("rpmrepo-checksum").map(String::as_str),
            Some(CHECKSUM)
        );
        Ok(())
    }

    #[test]
    fn missing_and_forbidden_read_as_absent() -> Result<()> {
        let Some(server) = start_server() else {
            return Ok(());
        };
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/data/ref/test/missing"))
                .respond_with(status_code(404)),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/data/thread/meta/cache.json"))
                .respond_with(status_code(403)),
        );
        let store = store_for(&server)?;
        assert!(store.head("data/ref/test/missing")?.is_none());
        assert!(store.get("data/thread/meta/cache.json")?.is_none());
        Ok(())
    }

    #[test]
    fn server_errors_surface_as_unexpected_status() -> Result<()> {
        let Some(server) = start_server() else {
            return Ok(());
        };
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/data/ref/test/empty"))
                .respond_with(status_code(503)),
        );
        let store = store_for(&server)?;
        let err = store.head("data/ref/test/empty").unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::UnexpectedStatus {
                key: "data/ref/test/empty".into(),
                status: 503,
            })
        );
        Ok(())
    }

    #[test]
    fn put_sends_metadata_headers() -> Result<()> {
        let Some(server) = start_server() else {
            return Ok(());
        };
        server.expect(
            Expectation::matching(all_of![
                request::method_path("PUT", "/data/ref/snap/a%20b"),
                request::headers(contains(key("x-amz-meta-rpmrepo-checksum"))),
            ])
            .respond_with(status_code(200)),
        );
        let store = store_for(&server)?;
        let mut metadata = Metadata::new();
        metadata.insert("rpmrepo-checksum".into(), CHECKSUM.into());
        store.put_object("data/ref/snap/a b", b"", &metadata)?;
        Ok(())
    }

    #[test]
    fn listing_is_unsupported() -> Result<()> {
        let store = HttpStore::new(Url::parse("https://bucket.example")?)?;
        let err = store.list_page("data/thread/", None, 10).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>().map(StoreError::code),
            Some("RR802")
        );
        Ok(())
    }
}
