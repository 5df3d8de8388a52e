use std::cmp::Ordering;
use std::fmt;

/// NuGet version representation supporting semantic and legacy four-part forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NuGetVersion {
    pub original: String,
    parsed: VersionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionKind {
    Semantic(semver::Version),
    /// Legacy `1.2.3.4` (or two-part `1.2`) numeric versions
    Numeric(Vec<u32>),
    Unknown(String),
}

impl NuGetVersion {
    pub fn parse(version: &str) -> Self {
        let trimmed = version.trim();

        let parsed = if let Ok(v) = semver::Version::parse(trimmed) {
            VersionKind::Semantic(v)
        } else if let Some(numeric) = Self::parse_numeric(trimmed) {
            VersionKind::Numeric(numeric)
        } else {
            VersionKind::Unknown(trimmed.to_string())
        };

        NuGetVersion {
            original: trimmed.to_string(),
            parsed,
        }
    }

    fn parse_numeric(version: &str) -> Option<Vec<u32>> {
        let parts: Vec<&str> = version.split('.').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return None;
        }

        let mut numbers = Vec::new();
        for part in parts {
            if let Ok(num) = part.parse::<u32>() {
                numbers.push(num);
            } else {
                return None;
            }
        }

        Some(numbers)
    }

    /// True when the version parsed into a recognised NuGet form.
    pub fn is_well_formed(&self) -> bool {
        !matches!(self.parsed, VersionKind::Unknown(_))
    }

    pub fn is_stable(&self) -> bool {
        let lower = self.original.to_lowercase();

        // Markers NuGet feeds commonly use for pre-release builds
        let unstable_markers = [
            "alpha", "beta", "rc", "preview", "pre", "dev", "nightly", "ci",
        ];

        if let Some(suffix) = lower.split_once('-').map(|(_, s)| s) {
            for marker in &unstable_markers {
                if suffix.starts_with(marker) {
                    return false;
                }
            }
        }

        match &self.parsed {
            VersionKind::Semantic(v) => v.pre.is_empty(),
            VersionKind::Numeric(_) => true,
            VersionKind::Unknown(_) => false,
        }
    }
}

impl fmt::Display for NuGetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl PartialOrd for NuGetVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NuGetVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parsed, &other.parsed) {
            (VersionKind::Semantic(a), VersionKind::Semantic(b)) => a.cmp(b),
            (VersionKind::Numeric(a), VersionKind::Numeric(b)) => {
                for (av, bv) in a.iter().zip(b.iter()) {
                    match av.cmp(bv) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                a.len().cmp(&b.len())
            }
            // A numeric version is an implicit release; compare on the shared
            // major.minor.patch prefix and fall back to the textual form
            (VersionKind::Semantic(a), VersionKind::Numeric(b)) => {
                Self::cmp_semantic_numeric(a, b)
            }
            (VersionKind::Numeric(a), VersionKind::Semantic(b)) => {
                Self::cmp_semantic_numeric(b, a).reverse()
            }
            _ => self.original.cmp(&other.original),
        }
    }
}

impl NuGetVersion {
    fn cmp_semantic_numeric(sem: &semver::Version, numeric: &[u32]) -> Ordering {
        let sem_parts = [
            u32::try_from(sem.major).unwrap_or(u32::MAX),
            u32::try_from(sem.minor).unwrap_or(u32::MAX),
            u32::try_from(sem.patch).unwrap_or(u32::MAX),
        ];

        for (a, b) in sem_parts.iter().zip(numeric.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }

        match sem_parts.len().cmp(&numeric.len()) {
            // 1.2.3 vs 1.2.3.n: any trailing revision beyond zero wins
            Ordering::Less => {
                if numeric[sem_parts.len()..].iter().any(|&n| n > 0) {
                    Ordering::Less
                } else {
                    Ordering::Equal
                }
            }
            ordering => ordering,
        }
    }
}

pub struct VersionComparator;

impl VersionComparator {
    /// Get the latest version from a list
    pub fn get_latest(versions: &[String], stable_only: bool) -> Option<String> {
        let mut parsed_versions: Vec<NuGetVersion> =
            versions.iter().map(|v| NuGetVersion::parse(v)).collect();

        if stable_only {
            parsed_versions.retain(|v| v.is_stable());
        }

        parsed_versions.sort();
        parsed_versions.last().map(|v| v.original.clone())
    }

    /// Check if version `a` is newer than version `b`
    pub fn is_newer(a: &str, b: &str) -> bool {
        let va = NuGetVersion::parse(a);
        let vb = NuGetVersion::parse(b);
        va > vb
    }
}
