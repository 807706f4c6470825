//! In-memory package tarballs
//!
//! Builds gzip tarballs laid out the way registries publish them, with all
//! files under a top-level `package/` directory.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha1::Sha1;
use sha2::{Digest, Sha512};

use super::constants::ENTRY_FILE;

/// Gzip tarball containing `entries` verbatim
pub fn tarball(entries: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, body) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, body.as_bytes())
            .expect("append tar entry");
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip")
}

/// Tarball for `name@version` with a manifest pointing at [`ENTRY_FILE`]
pub fn package_tarball(name: &str, version: &str) -> Vec<u8> {
    let manifest = format!(
        r#"{{"name":"{}","version":"{}","main":"{}"}}"#,
        name, version, ENTRY_FILE
    );
    let entry = format!("module.exports = (args) => console.log('{}', args);", version);
    let entry_path = format!("package/{}", ENTRY_FILE);
    tarball(&[
        ("package/package.json", manifest.as_str()),
        (entry_path.as_str(), entry.as_str()),
    ])
}

/// Subresource integrity string for `data`
pub fn integrity(data: &[u8]) -> String {
    format!("sha512-{}", STANDARD.encode(Sha512::digest(data)))
}

/// Legacy hex SHA-1 `shasum` for `data`
pub fn shasum(data: &[u8]) -> String {
    format!("{:x}", Sha1::digest(data))
}
