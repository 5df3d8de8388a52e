use crate::error::{DnupError, Result};
use crate::nuget::{NuGetVersion, is_valid_package_id};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Project file dialect, deciding how a reference update is applied.
///
/// Legacy project files do not support in-place version bumps through
/// `dotnet add`; the old reference must be removed first. SDK-style files
/// overwrite the version attribute on add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceDialect {
    Legacy,
    SdkStyle,
}

impl ReferenceDialect {
    pub fn label(self) -> &'static str {
        match self {
            ReferenceDialect::Legacy => "legacy",
            ReferenceDialect::SdkStyle => "sdk-style",
        }
    }
}

/// Location of a project file, split the way the update sequence needs it:
/// the containing directory for per-project commands, the bare file name to
/// pass to the tool, and the base directory for the solution-level restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFilePath {
    pub directory: PathBuf,
    pub file_name: String,
    pub base_directory: PathBuf,
}

/// A package reference found in a project file
#[derive(Debug, Clone)]
pub struct PackageReference {
    pub id: String,
    pub version: Option<NuGetVersion>,
    pub path: ProjectFilePath,
    pub dialect: ReferenceDialect,
}

/// Parse result for one project file
#[derive(Debug, Clone)]
pub struct ParsedProject {
    pub path: ProjectFilePath,
    pub dialect: ReferenceDialect,
    pub references: Vec<PackageReference>,
}

/// Parser for MSBuild project files (.csproj / .fsproj)
pub struct ProjectFileParser {
    base_directory: PathBuf,
}

impl ProjectFileParser {
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Self {
        Self {
            base_directory: base_directory.as_ref().to_path_buf(),
        }
    }

    /// Parse a project file and extract its package references
    pub fn parse(&self, project_file: &Path) -> Result<ParsedProject> {
        let content = fs::read_to_string(project_file).map_err(|e| {
            DnupError::XmlParsing(format!(
                "Failed to read project file '{}': {e}",
                project_file.display()
            ))
        })?;

        let project: ProjectXml = quick_xml::de::from_str(&content).map_err(|e| {
            DnupError::XmlParsing(format!(
                "Failed to parse project file '{}': {e}",
                project_file.display()
            ))
        })?;

        let path = self.path_descriptor(project_file)?;

        // SDK-style projects carry an Sdk attribute on the root element
        let dialect = if project.sdk.is_some() {
            ReferenceDialect::SdkStyle
        } else {
            ReferenceDialect::Legacy
        };

        let mut references = Vec::new();
        for group in &project.item_groups {
            for item in &group.package_references {
                let Some(id) = item.include.as_deref() else {
                    continue;
                };

                if !is_valid_package_id(id) {
                    if std::env::var("DNUP_VERBOSE").is_ok() {
                        eprintln!(
                            "[VERBOSE] Skipping malformed package id '{}' in {}",
                            id,
                            project_file.display()
                        );
                    }
                    continue;
                }

                let version = item
                    .version_attribute
                    .as_deref()
                    .or(item.version_element.as_deref())
                    .map(NuGetVersion::parse);

                references.push(PackageReference {
                    id: id.to_string(),
                    version,
                    path: path.clone(),
                    dialect,
                });
            }
        }

        Ok(ParsedProject {
            path,
            dialect,
            references,
        })
    }

    fn path_descriptor(&self, project_file: &Path) -> Result<ProjectFilePath> {
        let file_name = project_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DnupError::ProjectValidation(format!(
                    "Project path '{}' has no file name",
                    project_file.display()
                ))
            })?
            .to_string();

        let directory = project_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                DnupError::ProjectValidation(format!(
                    "Project file '{}' has no containing directory",
                    project_file.display()
                ))
            })?
            .to_path_buf();

        Ok(ProjectFilePath {
            directory,
            file_name,
            base_directory: self.base_directory.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProjectXml {
    #[serde(rename = "@Sdk")]
    sdk: Option<String>,
    #[serde(rename = "ItemGroup", default)]
    item_groups: Vec<ItemGroupXml>,
}

#[derive(Debug, Deserialize)]
struct ItemGroupXml {
    #[serde(rename = "PackageReference", default)]
    package_references: Vec<PackageReferenceXml>,
}

#[derive(Debug, Deserialize)]
struct PackageReferenceXml {
    #[serde(rename = "@Include")]
    include: Option<String>,
    #[serde(rename = "@Version")]
    version_attribute: Option<String>,
    #[serde(rename = "Version")]
    version_element: Option<String>,
}
