//! Mock registry helpers
//!
//! Serves registry documents at `/{name}` and tarballs at
//! `/-/{sanitized}-{version}.tgz`, the same shape the public registry uses.

use serde_json::{json, Map, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::tarballs::{integrity, package_tarball, shasum};

/// A version to publish on the mock registry
pub struct Published {
    pub version: String,
    pub tarball: Vec<u8>,
    /// Integrity string advertised in the document; `None` omits it
    pub integrity: Option<String>,
    /// Legacy SHA-1 hex digest; `None` omits it
    pub shasum: Option<String>,
}

impl Published {
    /// A well-formed package with correct integrity
    pub fn new(name: &str, version: &str) -> Self {
        let tarball = package_tarball(name, version);
        let integrity = Some(integrity(&tarball));
        Self {
            version: version.to_string(),
            tarball,
            integrity,
            shasum: None,
        }
    }

    /// Advertise only a legacy shasum, as old packages do
    pub fn with_shasum_only(mut self) -> Self {
        self.integrity = None;
        self.shasum = Some(shasum(&self.tarball));
        self
    }

    /// Advertise only a legacy shasum that does not match the tarball
    pub fn with_wrong_shasum(mut self) -> Self {
        self.integrity = None;
        self.shasum = Some(shasum(b"something else entirely"));
        self
    }

    /// Advertise an integrity that does not match the tarball
    pub fn with_wrong_integrity(mut self) -> Self {
        self.integrity = Some(integrity(b"something else entirely"));
        self
    }
}

fn tarball_path(name: &str, version: &str) -> String {
    format!("/-/{}-{}.tgz", name.replace('/', "_"), version)
}

/// Registry document for `name` listing `versions`
pub fn registry_document(base_url: &str, name: &str, versions: &[Published]) -> Value {
    let mut entries = Map::new();
    for published in versions {
        let mut dist = json!({
            "tarball": format!("{}{}", base_url, tarball_path(name, &published.version)),
        });
        if let Some(integrity) = &published.integrity {
            dist["integrity"] = json!(integrity);
        }
        if let Some(shasum) = &published.shasum {
            dist["shasum"] = json!(shasum);
        }
        entries.insert(
            published.version.clone(),
            json!({ "name": name, "version": published.version, "dist": dist }),
        );
    }
    json!({ "name": name, "versions": entries })
}

/// Publish `versions` of `name`: document plus one tarball route per version
pub async fn mock_package(server: &MockServer, name: &str, versions: &[Published]) {
    let document = registry_document(&server.uri(), name, versions);
    Mock::given(method("GET"))
        .and(path(format!("/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;

    for published in versions {
        Mock::given(method("GET"))
            .and(path(tarball_path(name, &published.version)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(published.tarball.clone()))
            .mount(server)
            .await;
    }
}

/// Publish `name` with only version strings (no downloadable tarballs)
pub async fn mock_versions(server: &MockServer, name: &str, versions: &[&str]) {
    let published: Vec<Published> = versions
        .iter()
        .map(|v| Published {
            version: v.to_string(),
            tarball: Vec::new(),
            integrity: None,
            shasum: None,
        })
        .collect();
    let document = registry_document(&server.uri(), name, &published);
    Mock::given(method("GET"))
        .and(path(format!("/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;
}

/// Serve `document` verbatim as the registry document for `name`
pub async fn mock_document(server: &MockServer, name: &str, document: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;
}

/// Answer every document request for `name` with `status`
pub async fn mock_status(server: &MockServer, name: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/{}", name)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Number of requests the server has seen so far
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}

/// Number of tarball downloads the server has seen so far
pub async fn tarball_downloads(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| {
            requests
                .iter()
                .filter(|r| r.url.path().ends_with(".tgz"))
                .count()
        })
        .unwrap_or_default()
}
