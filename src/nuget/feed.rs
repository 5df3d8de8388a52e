use crate::error::{DnupError, Result};
use crate::nuget::sources::{NuGetSources, PackageSource};
use crate::nuget::version::{NuGetVersion, VersionComparator};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const FLAT_CONTAINER_TYPE: &str = "PackageBaseAddress/3.0.0";
const MAX_INDEX_BYTES: usize = 10 * 1024 * 1024;

/// NuGet feed client speaking the V3 protocol
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("dnup")
            .danger_accept_invalid_certs(false)
            .build()
            .map_err(|e| DnupError::Io(std::io::Error::other(e)))?;

        Ok(Self { client })
    }

    /// Fetch the latest version of a package, trying sources in configured order.
    /// Stops at the first source that knows the package to avoid excessive requests.
    pub fn fetch_latest_version<'s>(
        &self,
        sources: &'s NuGetSources,
        package_id: &str,
        stable_only: bool,
    ) -> Result<Option<(String, &'s PackageSource)>> {
        for source in sources.items() {
            let versions = self.fetch_versions_from_source(source, package_id)?;
            if versions.is_empty() {
                continue;
            }

            if let Some(latest) = VersionComparator::get_latest(&versions, stable_only) {
                return Ok(Some((latest, source)));
            }
        }

        Ok(None)
    }

    /// Find the first source whose feed lists the given version of a package.
    pub fn find_source_hosting<'s>(
        &self,
        sources: &'s NuGetSources,
        package_id: &str,
        version: &NuGetVersion,
    ) -> Result<Option<&'s PackageSource>> {
        for source in sources.items() {
            let versions = self.fetch_versions_from_source(source, package_id)?;
            if versions
                .iter()
                .any(|v| NuGetVersion::parse(v) == *version)
            {
                return Ok(Some(source));
            }
        }

        Ok(None)
    }

    /// Fetch all versions a single source knows for a package.
    /// Unknown packages and unreachable feeds yield an empty list.
    pub fn fetch_versions_from_source(
        &self,
        source: &PackageSource,
        package_id: &str,
    ) -> Result<Vec<String>> {
        let Some(base) = self.resolve_flat_container_base(source) else {
            return Ok(Vec::new());
        };

        let index_url = format!("{}{}/index.json", base, package_id.to_lowercase());

        if std::env::var("DNUP_VERBOSE").is_ok() {
            eprintln!("[VERBOSE] Fetching: {}", index_url);
        }

        let response = match self.client.get(&index_url).send() {
            Ok(resp) => resp,
            Err(e) => {
                if std::env::var("DNUP_VERBOSE").is_ok() {
                    eprintln!("[VERBOSE] Request failed: {}", e);
                }
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            if std::env::var("DNUP_VERBOSE").is_ok() {
                eprintln!("[VERBOSE] HTTP {}: {}", response.status(), index_url);
            }
            return Ok(Vec::new());
        }

        let text = response
            .text()
            .map_err(|e| DnupError::Io(std::io::Error::other(e)))?;

        if text.len() > MAX_INDEX_BYTES {
            return Err(DnupError::Io(std::io::Error::other(
                "Package version index exceeded 10MB limit",
            )));
        }

        let index: PackageVersionIndex = serde_json::from_str(&text)?;
        Ok(index.versions)
    }

    /// Resolve the flat-container base URL for a source.
    ///
    /// A source pointing at a V3 service index (`.../index.json`) is resolved
    /// through its resource list; any other URL is treated as a flat-container
    /// base directly.
    fn resolve_flat_container_base(&self, source: &PackageSource) -> Option<String> {
        let url = source.url_str();

        if !url.ends_with("/index.json") {
            return Some(ensure_trailing_slash(url));
        }

        let response = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(e) => {
                if std::env::var("DNUP_VERBOSE").is_ok() {
                    eprintln!("[VERBOSE] Service index request failed: {}", e);
                }
                return None;
            }
        };

        if !response.status().is_success() {
            return None;
        }

        let service_index: ServiceIndex = match response.json() {
            Ok(index) => index,
            Err(e) => {
                if std::env::var("DNUP_VERBOSE").is_ok() {
                    eprintln!("[VERBOSE] Malformed service index from {}: {}", url, e);
                }
                return None;
            }
        };

        service_index
            .resources
            .into_iter()
            .find(|r| r.resource_type.starts_with(FLAT_CONTAINER_TYPE))
            .map(|r| ensure_trailing_slash(&r.id))
    }
}

fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    #[serde(default)]
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    resource_type: String,
}

#[derive(Debug, Deserialize)]
struct PackageVersionIndex {
    #[serde(default)]
    versions: Vec<String>,
}
