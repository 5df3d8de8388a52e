use crate::error::{DnupError, Result};
use crate::utils::path_validator::PathValidator;
use std::fs;
use std::path::{Path, PathBuf};

/// Directories never descended into while looking for project files
const SKIPPED_DIRS: &[&str] = &["bin", "obj", ".git", ".vs", "node_modules", "packages"];

/// ProjectScannerAgent validates the target directory and discovers its
/// project files and NuGet configuration
pub struct ProjectScannerAgent {
    project_path: PathBuf,
}

impl ProjectScannerAgent {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
        }
    }

    /// Validates the directory and collects project files
    pub fn validate(&self) -> Result<ProjectInfo> {
        let project_path = PathValidator::validate_project_path(&self.project_path)?;

        let mut project_files = Vec::new();
        collect_project_files(&project_path, &mut project_files)?;
        project_files.sort();

        if project_files.is_empty() {
            return Err(DnupError::ProjectValidation(format!(
                "No .csproj or .fsproj files found under '{}'",
                project_path.display()
            )));
        }

        let nuget_config = find_nuget_config(&project_path)?;

        // Check for Git repository
        let git_dir = project_path.join(".git");
        let is_git_repo = git_dir.exists() && git_dir.is_dir();

        Ok(ProjectInfo {
            project_path,
            project_files,
            nuget_config,
            has_git: is_git_repo,
        })
    }
}

fn collect_project_files(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            let skip = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|name| SKIPPED_DIRS.iter().any(|s| name.eq_ignore_ascii_case(s)))
                .unwrap_or(true);

            if !skip {
                collect_project_files(&path, found)?;
            }
        } else if PathValidator::is_project_file(&path) {
            found.push(path);
        }
    }

    Ok(())
}

fn find_nuget_config(dir: &Path) -> Result<Option<PathBuf>> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|name| name.eq_ignore_ascii_case("nuget.config"))
                .unwrap_or(false);

            if matches {
                return Ok(Some(path));
            }
        }
    }

    Ok(None)
}

#[derive(Debug, Clone)]
pub struct ProjectInfo {
    pub project_path: PathBuf,
    pub project_files: Vec<PathBuf>,
    pub nuget_config: Option<PathBuf>,
    pub has_git: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_project_files_recursively() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/App")).unwrap();
        fs::write(dir.path().join("src/App/App.csproj"), "<Project />").unwrap();
        fs::write(dir.path().join("Lib.fsproj"), "<Project />").unwrap();

        let info = ProjectScannerAgent::new(dir.path()).validate().unwrap();
        assert_eq!(info.project_files.len(), 2);
    }

    #[test]
    fn skips_build_output_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("obj")).unwrap();
        fs::write(dir.path().join("obj/App.csproj"), "<Project />").unwrap();
        fs::write(dir.path().join("App.csproj"), "<Project />").unwrap();

        let info = ProjectScannerAgent::new(dir.path()).validate().unwrap();
        assert_eq!(info.project_files.len(), 1);
    }

    #[test]
    fn fails_without_project_files() {
        let dir = tempdir().unwrap();
        let err = ProjectScannerAgent::new(dir.path()).validate().unwrap_err();
        assert!(matches!(err, DnupError::ProjectValidation(_)));
    }

    #[test]
    fn locates_nuget_config_case_insensitively() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("App.csproj"), "<Project />").unwrap();
        fs::write(dir.path().join("nuget.config"), "<configuration />").unwrap();

        let info = ProjectScannerAgent::new(dir.path()).validate().unwrap();
        assert!(info.nuget_config.is_some());
    }
}
