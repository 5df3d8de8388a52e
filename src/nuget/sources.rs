use crate::error::{DnupError, Result};
use crate::utils::args::escape_argument;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use url::Url;

const NUGET_ORG_V3: &str = "https://api.nuget.org/v3/index.json";

/// A single NuGet package source (feed)
///
/// The URL is validated on construction but kept verbatim, so command lines
/// carry exactly the string the user configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSource {
    pub name: String,
    url: String,
}

impl PackageSource {
    pub fn new(name: impl Into<String>, url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|_| DnupError::ProjectValidation(format!("Invalid source URL: {url}")))?;

        match parsed.scheme() {
            "https" | "http" => {}
            scheme => {
                return Err(DnupError::ProjectValidation(format!(
                    "Unsupported source scheme: {scheme}"
                )));
            }
        }

        Ok(Self {
            name: name.into(),
            url: url.to_string(),
        })
    }

    pub fn url_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// The ordered set of all known package sources
#[derive(Debug, Clone, Default)]
pub struct NuGetSources {
    items: Vec<PackageSource>,
}

impl NuGetSources {
    pub fn new(items: Vec<PackageSource>) -> Self {
        Self { items }
    }

    /// The source set used when no NuGet.config is present
    pub fn default_sources() -> Self {
        let nuget_org = PackageSource::new("nuget.org", NUGET_ORG_V3)
            .unwrap_or_else(|_| unreachable!("default source URL is well formed"));
        Self {
            items: vec![nuget_org],
        }
    }

    /// Read package sources from a NuGet.config file, preserving their order.
    ///
    /// Entries with unsupported URLs are skipped rather than failing the
    /// whole configuration. Honors `<clear />`: without it the defaults are
    /// appended after the configured feeds.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DnupError::XmlParsing(format!("Failed to read '{}': {e}", path.display()))
        })?;

        let config: NuGetConfigXml = quick_xml::de::from_str(&content).map_err(|e| {
            DnupError::XmlParsing(format!("Failed to parse '{}': {e}", path.display()))
        })?;

        let Some(package_sources) = config.package_sources else {
            return Ok(Self::default_sources());
        };

        let mut items = Vec::new();
        for entry in &package_sources.add {
            match PackageSource::new(&entry.key, &entry.value) {
                Ok(source) => items.push(source),
                Err(e) => {
                    if std::env::var("DNUP_VERBOSE").is_ok() {
                        eprintln!("[VERBOSE] Skipping source '{}': {e}", entry.key);
                    }
                }
            }
        }

        if package_sources.clear.is_none() {
            for default in Self::default_sources().items {
                if !items.iter().any(|s| s.url == default.url) {
                    items.push(default);
                }
            }
        }

        if items.is_empty() {
            return Ok(Self::default_sources());
        }

        Ok(Self { items })
    }

    pub fn items(&self) -> &[PackageSource] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn first(&self) -> Option<&PackageSource> {
        self.items.first()
    }

    /// Serialize the source set to a command-line fragment,
    /// e.g. `-s https://example/feed -s https://nuget.org`
    pub fn command_line(&self, flag: &str) -> String {
        self.items
            .iter()
            .map(|s| format!("{flag} {}", escape_argument(s.url_str())))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Deserialize)]
struct NuGetConfigXml {
    #[serde(rename = "packageSources")]
    package_sources: Option<PackageSourcesXml>,
}

#[derive(Debug, Deserialize)]
struct PackageSourcesXml {
    clear: Option<ClearXml>,
    #[serde(rename = "add", default)]
    add: Vec<AddEntryXml>,
}

#[derive(Debug, Deserialize)]
struct ClearXml {}

#[derive(Debug, Deserialize)]
struct AddEntryXml {
    #[serde(rename = "@key")]
    key: String,
    #[serde(rename = "@value")]
    value: String,
}
