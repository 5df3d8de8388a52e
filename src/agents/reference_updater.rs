use crate::agents::process_runner::ProcessRunner;
use crate::error::{DnupError, Result};
use crate::msbuild::{PackageReference, ReferenceDialect};
use crate::nuget::{NuGetSources, NuGetVersion, PackageSource};
use crate::utils::args::escape_argument;
use std::fmt;
use std::path::PathBuf;

/// The package-management tool every step is routed through
pub const PACKAGE_TOOL: &str = "dotnet";

/// ReferenceUpdater rewrites one package reference to a target version by
/// driving the dotnet CLI through a fixed sequence of subcommands.
///
/// The sequence is strictly ordered: each step depends on the side effects
/// of the previous one, so the first failure aborts the remainder. No step
/// is retried and nothing is rolled back; recovery after a partial sequence
/// is the caller's concern (typically version control).
pub struct ReferenceUpdater<'a> {
    runner: &'a dyn ProcessRunner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateStage {
    Restore,
    Remove,
    Add,
    RestoreSolution,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateStage::Restore => "restore",
            UpdateStage::Remove => "remove",
            UpdateStage::Add => "add",
            UpdateStage::RestoreSolution => "restore-solution",
        };
        write!(f, "{name}")
    }
}

struct UpdateStep {
    stage: UpdateStage,
    working_dir: PathBuf,
    args: String,
}

impl<'a> ReferenceUpdater<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self { runner }
    }

    /// Upgrade `reference` to `target_version`, installing from
    /// `install_source` while restoring against `all_sources`.
    ///
    /// All four inputs are required; an absent one fails with
    /// `InvalidArgument` before any process is started.
    pub fn update(
        &self,
        reference: Option<&PackageReference>,
        target_version: Option<&NuGetVersion>,
        install_source: Option<&PackageSource>,
        all_sources: Option<&NuGetSources>,
    ) -> Result<()> {
        let reference = required(reference, "package reference")?;
        let target_version = required(target_version, "target version")?;
        let install_source = required(install_source, "install source")?;
        let all_sources = required(all_sources, "source set")?;

        let steps = plan_steps(reference, target_version, install_source, all_sources);

        for step in steps {
            self.runner
                .run(&step.working_dir, PACKAGE_TOOL, &step.args, true)
                .map_err(|e| {
                    DnupError::ProcessExecution(format!(
                        "{} step failed in '{}' ({} {}): {}",
                        step.stage,
                        step.working_dir.display(),
                        PACKAGE_TOOL,
                        step.args,
                        e
                    ))
                })?;
        }

        Ok(())
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| DnupError::InvalidArgument(format!("{name} is required")))
}

/// Produce the ordered step list for a reference.
///
/// Restore runs first so the dependency graph for the current version is
/// materialized before any edit. Legacy projects need an explicit remove
/// before the add; SDK-style projects overwrite the version on add. The
/// final restore runs at the base directory with `--force-evaluate` so every
/// sibling project sharing the package is re-resolved.
fn plan_steps(
    reference: &PackageReference,
    target_version: &NuGetVersion,
    install_source: &PackageSource,
    all_sources: &NuGetSources,
) -> Vec<UpdateStep> {
    let project_dir = &reference.path.directory;
    let base_dir = &reference.path.base_directory;
    let project_file = &reference.path.file_name;
    let source_url = escape_argument(install_source.url_str());
    let sources_fragment = all_sources.command_line("-s");

    let stages: &[UpdateStage] = match reference.dialect {
        ReferenceDialect::Legacy => &[
            UpdateStage::Restore,
            UpdateStage::Remove,
            UpdateStage::Add,
            UpdateStage::RestoreSolution,
        ],
        ReferenceDialect::SdkStyle => &[
            UpdateStage::Restore,
            UpdateStage::Add,
            UpdateStage::RestoreSolution,
        ],
    };

    stages
        .iter()
        .map(|&stage| match stage {
            UpdateStage::Restore => {
                let mut args = format!("restore {project_file}");
                if !sources_fragment.is_empty() {
                    args.push(' ');
                    args.push_str(&sources_fragment);
                }
                UpdateStep {
                    stage,
                    working_dir: project_dir.clone(),
                    args,
                }
            }
            UpdateStage::Remove => UpdateStep {
                stage,
                working_dir: project_dir.clone(),
                args: format!("remove {project_file} package {}", reference.id),
            },
            UpdateStage::Add => UpdateStep {
                stage,
                working_dir: project_dir.clone(),
                args: format!(
                    "add {project_file} package {} -v {target_version} -s {source_url}",
                    reference.id
                ),
            },
            UpdateStage::RestoreSolution => UpdateStep {
                stage,
                working_dir: base_dir.clone(),
                args: format!("restore --force-evaluate -s {source_url}"),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msbuild::ProjectFilePath;
    use std::cell::RefCell;
    use std::path::Path;

    struct RecordingRunner {
        calls: RefCell<Vec<(PathBuf, String, String)>>,
        fail_on: Option<usize>,
    }

    impl RecordingRunner {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_at(index: usize) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_on: Some(index),
            }
        }

        fn calls(&self) -> Vec<(PathBuf, String, String)> {
            self.calls.borrow().clone()
        }
    }

    impl ProcessRunner for RecordingRunner {
        fn run(
            &self,
            working_dir: &Path,
            program: &str,
            args: &str,
            _capture_output: bool,
        ) -> Result<()> {
            let index = self.calls.borrow().len();
            self.calls.borrow_mut().push((
                working_dir.to_path_buf(),
                program.to_string(),
                args.to_string(),
            ));

            if self.fail_on == Some(index) {
                return Err(DnupError::ProcessExecution("simulated failure".into()));
            }

            Ok(())
        }
    }

    fn reference(dialect: ReferenceDialect, dir: &str, base: &str) -> PackageReference {
        PackageReference {
            id: "Foo".to_string(),
            version: Some(NuGetVersion::parse("1.0.0")),
            path: ProjectFilePath {
                directory: PathBuf::from(dir),
                file_name: "App.csproj".to_string(),
                base_directory: PathBuf::from(base),
            },
            dialect,
        }
    }

    fn sources() -> NuGetSources {
        NuGetSources::new(vec![
            PackageSource::new("example", "https://example/feed").unwrap(),
            PackageSource::new("nuget.org", "https://nuget.org").unwrap(),
        ])
    }

    fn install_source() -> PackageSource {
        PackageSource::new("example", "https://example/feed").unwrap()
    }

    #[test]
    fn legacy_reference_runs_four_steps_in_order() {
        let runner = RecordingRunner::new();
        let updater = ReferenceUpdater::new(&runner);
        let reference = reference(ReferenceDialect::Legacy, "/proj", "/proj");
        let version = NuGetVersion::parse("2.0.0");
        let source = install_source();
        let all = sources();

        updater
            .update(Some(&reference), Some(&version), Some(&source), Some(&all))
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|(_, program, _)| program == "dotnet"));
        assert_eq!(
            calls[0].2,
            "restore App.csproj -s https://example/feed -s https://nuget.org"
        );
        assert_eq!(calls[1].2, "remove App.csproj package Foo");
        assert_eq!(
            calls[2].2,
            "add App.csproj package Foo -v 2.0.0 -s https://example/feed"
        );
        assert_eq!(calls[3].2, "restore --force-evaluate -s https://example/feed");
    }

    #[test]
    fn sdk_style_reference_skips_remove() {
        let runner = RecordingRunner::new();
        let updater = ReferenceUpdater::new(&runner);
        let reference = reference(ReferenceDialect::SdkStyle, "/proj", "/proj");
        let version = NuGetVersion::parse("2.0.0");
        let source = install_source();
        let all = sources();

        updater
            .update(Some(&reference), Some(&version), Some(&source), Some(&all))
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].2.starts_with("restore App.csproj"));
        assert!(calls[1].2.starts_with("add App.csproj"));
        assert!(calls[2].2.starts_with("restore --force-evaluate"));
        assert!(!calls.iter().any(|(_, _, args)| args.starts_with("remove")));
    }

    #[test]
    fn absent_inputs_fail_before_any_process_runs() {
        let reference = reference(ReferenceDialect::Legacy, "/proj", "/proj");
        let version = NuGetVersion::parse("2.0.0");
        let source = install_source();
        let all = sources();

        let runner = RecordingRunner::new();
        let updater = ReferenceUpdater::new(&runner);

        let outcomes = [
            updater.update(None, Some(&version), Some(&source), Some(&all)),
            updater.update(Some(&reference), None, Some(&source), Some(&all)),
            updater.update(Some(&reference), Some(&version), None, Some(&all)),
            updater.update(Some(&reference), Some(&version), Some(&source), None),
        ];

        for outcome in outcomes {
            assert!(matches!(outcome, Err(DnupError::InvalidArgument(_))));
        }
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn add_step_uses_only_the_install_source() {
        let runner = RecordingRunner::new();
        let updater = ReferenceUpdater::new(&runner);
        let reference = reference(ReferenceDialect::SdkStyle, "/proj", "/proj");
        let version = NuGetVersion::parse("2.0.0");
        let source = install_source();
        let all = sources();

        updater
            .update(Some(&reference), Some(&version), Some(&source), Some(&all))
            .unwrap();

        let calls = runner.calls();
        let add_args = &calls[1].2;
        assert!(add_args.contains("-v 2.0.0"));
        assert!(add_args.contains("-s https://example/feed"));
        assert!(!add_args.contains("https://nuget.org"));

        let solution_args = &calls[2].2;
        assert!(solution_args.contains("-s https://example/feed"));
        assert!(!solution_args.contains("https://nuget.org"));
    }

    #[test]
    fn install_source_with_whitespace_survives_as_one_token() {
        let runner = RecordingRunner::new();
        let updater = ReferenceUpdater::new(&runner);
        let reference = reference(ReferenceDialect::SdkStyle, "/proj", "/proj");
        let version = NuGetVersion::parse("2.0.0");
        let source = PackageSource::new("spaced", "https://feeds.example.com/team feed/v3").unwrap();
        let all = sources();

        updater
            .update(Some(&reference), Some(&version), Some(&source), Some(&all))
            .unwrap();

        let add_args = &runner.calls()[1].2;
        assert!(add_args.ends_with("-s \"https://feeds.example.com/team feed/v3\""));

        let tokens = crate::utils::args::tokenize(add_args);
        assert_eq!(
            tokens.last().map(String::as_str),
            Some("https://feeds.example.com/team feed/v3")
        );
    }

    #[test]
    fn failure_aborts_remaining_steps() {
        let runner = RecordingRunner::failing_at(1);
        let updater = ReferenceUpdater::new(&runner);
        let reference = reference(ReferenceDialect::Legacy, "/proj", "/proj");
        let version = NuGetVersion::parse("2.0.0");
        let source = install_source();
        let all = sources();

        let err = updater
            .update(Some(&reference), Some(&version), Some(&source), Some(&all))
            .unwrap_err();

        assert_eq!(runner.calls().len(), 2);
        let message = err.to_string();
        assert!(message.contains("remove step failed"));
        assert!(message.contains("/proj"));
    }

    #[test]
    fn solution_restore_runs_in_the_base_directory() {
        let runner = RecordingRunner::new();
        let updater = ReferenceUpdater::new(&runner);
        let reference = reference(ReferenceDialect::Legacy, "/repo/src/App", "/repo");
        let version = NuGetVersion::parse("2.0.0");
        let source = install_source();
        let all = sources();

        updater
            .update(Some(&reference), Some(&version), Some(&source), Some(&all))
            .unwrap();

        let calls = runner.calls();
        assert!(
            calls[..3]
                .iter()
                .all(|(dir, _, _)| dir == Path::new("/repo/src/App"))
        );
        assert_eq!(calls[3].0, PathBuf::from("/repo"));
    }

    #[test]
    fn empty_source_set_omits_the_restore_fragment() {
        let runner = RecordingRunner::new();
        let updater = ReferenceUpdater::new(&runner);
        let reference = reference(ReferenceDialect::SdkStyle, "/proj", "/proj");
        let version = NuGetVersion::parse("2.0.0");
        let source = install_source();
        let all = NuGetSources::new(Vec::new());

        updater
            .update(Some(&reference), Some(&version), Some(&source), Some(&all))
            .unwrap();

        assert_eq!(runner.calls()[0].2, "restore App.csproj");
    }
}
