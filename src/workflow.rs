use crate::agents::project_scanner::ProjectInfo;
use crate::agents::{
    ExternalProcessRunner, ProjectScannerAgent, ReferenceUpdater, VersionControlAgent,
};
use crate::error::{DnupError, Result};
use crate::msbuild::{PackageReference, ProjectFileParser};
use crate::nuget::{FeedClient, NuGetSources, NuGetVersion, PackageSource};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;

/// Execute the update workflow for a single package
pub fn execute_update<P: AsRef<Path>>(
    project_path: P,
    package: &str,
    version: Option<&str>,
    source_override: Option<&str>,
    stable_only: bool,
    no_git: bool,
) -> Result<()> {
    let project_path = project_path.as_ref();
    println!(
        "{}",
        format!("Updating package reference '{}'...", package)
            .cyan()
            .bold()
    );

    // Step 1: Validate project structure
    println!("\n{}", "1. Validating project structure...".yellow());
    let scanner = ProjectScannerAgent::new(project_path);
    let project_info = scanner.validate()?;
    println!(
        "{}",
        format!("✓ Found {} project file(s)", project_info.project_files.len()).green()
    );

    // Step 2: Check Git status (if Git is available and not disabled)
    if project_info.has_git && !no_git {
        println!("\n{}", "2. Checking Git status...".yellow());
        let git_agent = VersionControlAgent::new(&project_info.project_path)?;

        if !git_agent.is_working_directory_clean()? {
            println!(
                "{}",
                "⚠ Warning: Working directory has uncommitted changes".red()
            );
            println!("Please commit or stash your changes before proceeding.");
            return Ok(());
        }
        println!("{}", "✓ Working directory is clean".green());
    } else if !no_git {
        println!(
            "\n{}",
            "2. Git repository not detected, skipping Git checks".yellow()
        );
    }

    // Step 3: Read NuGet source configuration
    println!("\n{}", "3. Reading NuGet source configuration...".yellow());
    let all_sources = load_sources(&project_info)?;
    print_sources(&all_sources);

    // Step 4: Locate the package reference
    println!("\n{}", "4. Locating package reference...".yellow());
    let references = find_references(&project_info, package)?;
    for reference in &references {
        let current = reference
            .version
            .as_ref()
            .map(|v| v.original.clone())
            .unwrap_or_else(|| "unversioned".to_string());
        println!(
            "   • {} {} ({})",
            reference.path.file_name.bright_cyan(),
            current.dimmed(),
            reference.dialect.label()
        );
    }

    // The id as the project files spell it, not as the user typed it
    let package_id = references[0].id.clone();

    // Step 5: Resolve the target version and install source
    println!("\n{}", "5. Resolving target version...".yellow());
    let (target_version, install_source) = resolve_target(
        &package_id,
        version,
        source_override,
        &all_sources,
        stable_only,
    )?;
    println!(
        "{}",
        format!(
            "✓ Target: {} {} (from {})",
            package_id, target_version, install_source.name
        )
        .green()
    );

    let (up_to_date, to_update): (Vec<_>, Vec<_>) = references
        .into_iter()
        .partition(|r| r.version.as_ref() == Some(&target_version));

    for reference in &up_to_date {
        println!(
            "   {} already at {}, skipping",
            reference.path.file_name,
            target_version
        );
    }

    if to_update.is_empty() {
        println!(
            "\n{}",
            format!("✨ All references are already at {}", target_version)
                .green()
                .bold()
        );
        return Ok(());
    }

    // Step 6: Run the update sequence per project
    println!("\n{}", "6. Updating package references...".yellow());
    let runner = ExternalProcessRunner;
    let updater = ReferenceUpdater::new(&runner);
    let mut updated_files = Vec::new();

    for reference in &to_update {
        let old = reference
            .version
            .as_ref()
            .map(|v| v.original.clone())
            .unwrap_or_else(|| "unversioned".to_string());
        println!(
            "\n   {} {} → {}",
            reference.path.file_name.white().bold(),
            old.red(),
            target_version.to_string().green().bold()
        );

        updater.update(
            Some(reference),
            Some(&target_version),
            Some(&install_source),
            Some(&all_sources),
        )?;

        updated_files.push(reference.path.directory.join(&reference.path.file_name));
    }
    println!("{}", "✓ Update completed".green());

    // Step 7: Git operations (if enabled)
    if project_info.has_git && !no_git {
        println!("\n{}", "7. Creating Git commit...".yellow());
        let git_agent = VersionControlAgent::new(&project_info.project_path)?;
        let branch_name = git_agent.commit_to_new_branch(
            &updated_files,
            &package_id,
            &target_version.original,
        )?;
        println!(
            "{}",
            format!("✓ Changes committed to branch: {}", branch_name).green()
        );
    }

    println!(
        "\n{}",
        "✨ Update process completed successfully!".green().bold()
    );
    Ok(())
}

/// Execute the check workflow (dry-run)
pub fn execute_check<P: AsRef<Path>>(project_path: P, stable_only: bool) -> Result<()> {
    let project_path = project_path.as_ref();
    let version_channel = if stable_only { "stable" } else { "all" };
    println!(
        "{}",
        format!(
            "Checking for available updates ({} versions)...",
            version_channel
        )
        .cyan()
        .bold()
    );

    // Step 1: Validate project structure
    println!("\n{}", "1. Validating project structure...".yellow());
    let scanner = ProjectScannerAgent::new(project_path);
    let project_info = scanner.validate()?;
    println!(
        "{}",
        format!("✓ Found {} project file(s)", project_info.project_files.len()).green()
    );

    // Step 2: Read NuGet source configuration
    println!("\n{}", "2. Reading NuGet source configuration...".yellow());
    let all_sources = load_sources(&project_info)?;
    print_sources(&all_sources);

    // Step 3: Check for updates without modifying anything
    println!("\n{}", "3. Checking for available updates...".yellow());
    let references = parse_all_references(&project_info)?;
    let report = check_for_updates(&references, &all_sources, stable_only)?;

    println!("{}", "✓ Check completed".green());

    // Step 4: Display available updates
    print_available_updates(&report, stable_only);

    Ok(())
}

/// Execute the list workflow - display all package references
pub fn execute_list<P: AsRef<Path>>(project_path: P) -> Result<()> {
    let project_path = project_path.as_ref();
    println!("{}", "Listing package references...".cyan().bold());

    // Step 1: Validate project structure
    println!("\n{}", "1. Validating project structure...".yellow());
    let scanner = ProjectScannerAgent::new(project_path);
    let project_info = scanner.validate()?;
    println!(
        "{}",
        format!("✓ Found {} project file(s)", project_info.project_files.len()).green()
    );

    // Step 2: Parse project files
    println!("\n{}", "2. Reading package references...".yellow());
    let parser = ProjectFileParser::new(&project_info.project_path);

    println!("\n{}", "📦 Package references:".cyan().bold());
    let mut total = 0;
    for project_file in &project_info.project_files {
        let parsed = parser.parse(project_file)?;
        println!(
            "\n{} ({}):",
            parsed.path.file_name.yellow().bold(),
            parsed.dialect.label()
        );

        if parsed.references.is_empty() {
            println!("  {}", "(no package references)".dimmed());
            continue;
        }

        for reference in &parsed.references {
            total += 1;
            match &reference.version {
                Some(version) => {
                    println!("  • {}", format!("{} {}", reference.id, version).cyan());
                }
                None => {
                    println!("  • {} {}", reference.id.cyan(), "(version unknown)".dimmed());
                }
            }
        }
    }

    println!("\n{}", "Summary:".cyan().bold());
    println!(
        "  {} package reference(s) across {} project(s)",
        total.to_string().yellow(),
        project_info.project_files.len().to_string().yellow()
    );

    Ok(())
}

fn load_sources(project_info: &ProjectInfo) -> Result<NuGetSources> {
    let sources = match &project_info.nuget_config {
        Some(config_path) => NuGetSources::from_config_file(config_path)?,
        None => {
            println!("   No NuGet.config found, using nuget.org");
            NuGetSources::default_sources()
        }
    };

    Ok(sources)
}

fn print_sources(sources: &NuGetSources) {
    println!("   Found {} source(s):", sources.len());
    for source in sources.items() {
        println!(
            "   • {} ({})",
            source.name.bright_cyan(),
            source.url_str().dimmed()
        );
    }
}

fn parse_all_references(project_info: &ProjectInfo) -> Result<Vec<PackageReference>> {
    let parser = ProjectFileParser::new(&project_info.project_path);
    let mut references = Vec::new();

    for project_file in &project_info.project_files {
        let parsed = parser.parse(project_file)?;
        references.extend(parsed.references);
    }

    Ok(references)
}

fn find_references(project_info: &ProjectInfo, package: &str) -> Result<Vec<PackageReference>> {
    let references: Vec<PackageReference> = parse_all_references(project_info)?
        .into_iter()
        .filter(|r| r.id.eq_ignore_ascii_case(package))
        .collect();

    if references.is_empty() {
        return Err(DnupError::PackageResolution(format!(
            "Package '{}' is not referenced by any project under '{}'",
            package,
            project_info.project_path.display()
        )));
    }

    Ok(references)
}

fn resolve_target(
    package_id: &str,
    version: Option<&str>,
    source_override: Option<&str>,
    all_sources: &NuGetSources,
    stable_only: bool,
) -> Result<(NuGetVersion, PackageSource)> {
    let override_source = source_override
        .map(|url| PackageSource::new("command-line", url))
        .transpose()?;

    match version {
        Some(requested) => {
            let target = NuGetVersion::parse(requested);
            if !target.is_well_formed() {
                return Err(DnupError::InvalidArgument(format!(
                    "'{requested}' is not a valid package version"
                )));
            }

            if let Some(source) = override_source {
                return Ok((target, source));
            }

            let feed = FeedClient::new()?;
            let install_source = match feed.find_source_hosting(all_sources, package_id, &target)? {
                Some(source) => source.clone(),
                None => {
                    println!(
                        "   {}",
                        format!(
                            "⚠ No configured source lists {} {}, using the first source",
                            package_id, target
                        )
                        .yellow()
                    );
                    all_sources
                        .first()
                        .cloned()
                        .ok_or_else(|| {
                            DnupError::InvalidArgument("no package sources configured".to_string())
                        })?
                }
            };

            Ok((target, install_source))
        }
        None => {
            let lookup_sources = match &override_source {
                Some(source) => NuGetSources::new(vec![source.clone()]),
                None => all_sources.clone(),
            };

            let feed = FeedClient::new()?;
            let (latest, found_on) = feed
                .fetch_latest_version(&lookup_sources, package_id, stable_only)?
                .ok_or_else(|| {
                    let channel = if stable_only { "stable " } else { "" };
                    DnupError::PackageResolution(format!(
                        "No {channel}versions of '{package_id}' found on the configured sources"
                    ))
                })?;

            Ok((NuGetVersion::parse(&latest), found_on.clone()))
        }
    }
}

struct AvailableUpdate {
    package_id: String,
    project: String,
    current: String,
    latest: String,
}

fn check_for_updates(
    references: &[PackageReference],
    all_sources: &NuGetSources,
    stable_only: bool,
) -> Result<Vec<AvailableUpdate>> {
    let feed = FeedClient::new()?;
    let mut latest_cache: HashMap<String, Option<String>> = HashMap::new();
    let mut updates = Vec::new();

    let pb = ProgressBar::new(references.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  [{bar:40}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    for reference in references {
        pb.set_message(format!("Checking {}", reference.id));

        let cache_key = reference.id.to_lowercase();
        let latest = match latest_cache.get(&cache_key) {
            Some(cached) => cached.clone(),
            None => {
                let resolved = feed
                    .fetch_latest_version(all_sources, &reference.id, stable_only)?
                    .map(|(version, _)| version);
                latest_cache.insert(cache_key, resolved.clone());
                resolved
            }
        };

        if let (Some(latest), Some(current)) = (latest, &reference.version) {
            if crate::nuget::VersionComparator::is_newer(&latest, &current.original) {
                updates.push(AvailableUpdate {
                    package_id: reference.id.clone(),
                    project: reference.path.file_name.clone(),
                    current: current.original.clone(),
                    latest,
                });
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(updates)
}

fn print_available_updates(updates: &[AvailableUpdate], stable_only: bool) {
    if updates.is_empty() {
        println!("\n{}", "✨ All package references are up to date!".green().bold());
        return;
    }

    println!("\n{}", "📦 Available Updates:".cyan().bold());
    println!("{}", format!("Found {} update(s)", updates.len()).yellow());

    if stable_only {
        println!("{}", "   (showing stable versions only)".dimmed());
    } else {
        println!(
            "{}",
            "   (showing all versions including pre-releases)".dimmed()
        );
    }

    for update in updates {
        let stability = if NuGetVersion::parse(&update.latest).is_stable() {
            "stable".green()
        } else {
            "pre-release".yellow()
        };
        println!(
            "  • {} {} {} → {} ({})",
            update.package_id.white().bold(),
            update.project.dimmed(),
            update.current.red(),
            update.latest.green().bold(),
            stability
        );
    }

    println!("\n{}", "To apply an update, run:".dimmed());
    println!("  {}", "dnup update <PACKAGE>".cyan());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn project_info(dir: &Path) -> ProjectInfo {
        ProjectScannerAgent::new(dir).validate().unwrap()
    }

    #[test]
    fn find_references_matches_case_insensitively() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("App.csproj"),
            r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Newtonsoft.Json" Version="12.0.3" />
  </ItemGroup>
</Project>"#,
        )
        .unwrap();

        let info = project_info(dir.path());
        let references = find_references(&info, "newtonsoft.json").unwrap();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].id, "Newtonsoft.Json");
    }

    #[test]
    fn find_references_fails_for_unknown_package() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("App.csproj"),
            r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Serilog" Version="3.1.1" />
  </ItemGroup>
</Project>"#,
        )
        .unwrap();

        let info = project_info(dir.path());
        let err = find_references(&info, "Newtonsoft.Json").unwrap_err();
        assert!(matches!(err, DnupError::PackageResolution(_)));
    }

    #[test]
    fn resolve_target_rejects_malformed_versions() {
        let sources = NuGetSources::default_sources();
        let err = resolve_target("Foo", Some("not-a-version"), None, &sources, true).unwrap_err();
        assert!(matches!(err, DnupError::InvalidArgument(_)));
    }

    #[test]
    fn resolve_target_uses_override_source_for_explicit_version() {
        let sources = NuGetSources::default_sources();
        let (version, source) = resolve_target(
            "Foo",
            Some("2.0.0"),
            Some("https://feeds.example.com/v3/index.json"),
            &sources,
            true,
        )
        .unwrap();

        assert_eq!(version.original, "2.0.0");
        assert_eq!(source.url_str(), "https://feeds.example.com/v3/index.json");
    }
}
