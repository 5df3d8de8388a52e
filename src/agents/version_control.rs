use crate::error::{DnupError, Result};
use crate::utils::path_validator::PathValidator;
use jiff::Zoned;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// VersionControlAgent handles Git operations with hardened input validation.
pub struct VersionControlAgent {
    project_path: PathBuf,
}

impl VersionControlAgent {
    pub fn new<P: AsRef<Path>>(project_path: P) -> Result<Self> {
        let project_path = Self::validate_git_path(project_path.as_ref())?;
        Ok(Self { project_path })
    }

    /// Check if the working directory is clean
    pub fn is_working_directory_clean(&self) -> Result<bool> {
        let output = self.run_git(&["status", "--porcelain"])?;
        Self::ensure_success(&output, "git status")?;
        Ok(output.stdout.is_empty())
    }

    /// Create a new branch for the update
    pub fn create_update_branch(&self, package_id: &str) -> Result<String> {
        let branch_name = self.create_safe_branch_name(package_id);
        let output = self.run_git(&["checkout", "-b", &branch_name])?;
        Self::ensure_success(&output, "git checkout -b")?;
        Ok(branch_name)
    }

    /// Stage the project files touched by an update, plus any lock files the
    /// restore steps rewrote next to them
    pub fn stage_updated_projects(&self, project_files: &[PathBuf]) -> Result<()> {
        for project_file in project_files {
            let validated = PathValidator::validate_file_path(project_file, &self.project_path)
                .map_err(|err| {
                    DnupError::GitOperation(format!("Refusing to stage unsafe path: {err}"))
                })?;

            let relative = validated
                .strip_prefix(&self.project_path)
                .map_err(|_| {
                    DnupError::GitOperation(format!(
                        "Path '{}' is not inside the repository",
                        validated.display()
                    ))
                })?
                .to_string_lossy()
                .to_string();

            let output = self.run_git(&["add", &relative])?;
            Self::ensure_success(&output, "git add")?;

            if let Some(parent) = validated.parent() {
                let lock_file = parent.join("packages.lock.json");
                if lock_file.exists() {
                    let lock_relative = lock_file
                        .strip_prefix(&self.project_path)
                        .map(|p| p.to_string_lossy().to_string());
                    if let Ok(lock_relative) = lock_relative {
                        let output = self.run_git(&["add", &lock_relative])?;
                        Self::ensure_success(&output, "git add")?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Commit the changes with a standard message
    pub fn commit_update(&self, package_id: &str, version: &str) -> Result<()> {
        let message = format!("chore(deps): update {package_id} to {version}");
        let output = self.run_git(&["commit", "-m", &message])?;
        Self::ensure_success(&output, "git commit")?;
        Ok(())
    }

    /// Full workflow: create branch, stage, and commit
    pub fn commit_to_new_branch(
        &self,
        project_files: &[PathBuf],
        package_id: &str,
        version: &str,
    ) -> Result<String> {
        let branch_name = self.create_update_branch(package_id)?;
        self.stage_updated_projects(project_files)?;
        self.commit_update(package_id, version)?;
        Ok(branch_name)
    }

    fn run_git(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .current_dir(&self.project_path)
            .args(args)
            .output()
            .map_err(|e| {
                DnupError::GitOperation(format!(
                    "Failed to execute git command '{}': {e}",
                    args.join(" ")
                ))
            })
    }

    fn ensure_success(output: &Output, command: &str) -> Result<()> {
        if output.status.success() {
            return Ok(());
        }

        Err(DnupError::GitOperation(format!(
            "{} failed: {}",
            command,
            String::from_utf8_lossy(&output.stderr)
        )))
    }

    fn validate_git_path(path: &Path) -> Result<PathBuf> {
        let dangerous = [';', '|', '&', '$', '`', '\n', '\r'];
        let path_str = path.to_string_lossy();
        if let Some(ch) = dangerous.iter().find(|c| path_str.contains(**c)) {
            return Err(DnupError::GitOperation(format!(
                "Path contains dangerous character: '{}'",
                ch
            )));
        }

        if !path.is_absolute() {
            return Err(DnupError::GitOperation(
                "Only absolute paths are allowed for Git operations".to_string(),
            ));
        }

        PathValidator::validate_project_path(path)
            .map_err(|err| DnupError::GitOperation(format!("Invalid Git path: {}", err)))
    }

    fn create_safe_branch_name(&self, package_id: &str) -> String {
        let date = Zoned::now().strftime("%Y-%m-%d").to_string();
        let mut branch_name = format!("deps/{package_id}-{date}");

        branch_name = branch_name
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '/' | '.' => c,
                _ => '-',
            })
            .collect();

        if branch_name.len() > 60 {
            branch_name.truncate(60);
        }

        branch_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{tempdir, tempdir_in};

    #[test]
    fn rejects_relative_paths() {
        let cwd = std::env::current_dir().unwrap();
        let temp = tempdir_in(&cwd).unwrap();
        let relative = PathBuf::from(temp.path().file_name().unwrap());
        assert!(VersionControlAgent::new(&relative).is_err());
    }

    #[test]
    fn rejects_dangerous_paths() {
        let dir = tempdir().unwrap();
        let dangerous = dir.path().join("sub;dir");
        fs::create_dir_all(&dangerous).unwrap();
        assert!(VersionControlAgent::new(dangerous).is_err());
    }

    #[test]
    fn creates_safe_branch_from_package_id() {
        let dir = tempdir().unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        let agent = VersionControlAgent::new(&canonical).unwrap();
        let branch = agent.create_safe_branch_name("Newtonsoft.Json");
        assert!(branch.starts_with("deps/Newtonsoft.Json-"));
        assert!(
            branch
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
        );
    }

    #[test]
    fn refuses_to_stage_paths_outside_repository() {
        let dir = tempdir().unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        let agent = VersionControlAgent::new(&canonical).unwrap();

        let outside = tempdir().unwrap();
        let foreign = outside.path().join("App.csproj");
        fs::write(&foreign, "<Project />").unwrap();

        assert!(agent.stage_updated_projects(&[foreign]).is_err());
    }
}
