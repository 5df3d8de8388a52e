use regex::Regex;

pub mod feed;
pub mod sources;
pub mod version;

pub use feed::FeedClient;
pub use sources::{NuGetSources, PackageSource};
pub use version::{NuGetVersion, VersionComparator};

/// Check a string against the NuGet package id grammar
/// (word characters separated by single `.`, `-`, or `_`)
pub fn is_valid_package_id(id: &str) -> bool {
    if id.is_empty() || id.len() > 100 {
        return false;
    }

    Regex::new(r"^\w+([._-]\w+)*$")
        .map(|re| re.is_match(id))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dotted_package_ids() {
        assert!(is_valid_package_id("Newtonsoft.Json"));
        assert!(is_valid_package_id("Microsoft.Extensions.Logging"));
        assert!(is_valid_package_id("my-package_2"));
    }

    #[test]
    fn rejects_malformed_package_ids() {
        assert!(!is_valid_package_id(""));
        assert!(!is_valid_package_id("bad id"));
        assert!(!is_valid_package_id("trailing."));
        assert!(!is_valid_package_id("double..dot"));
        assert!(!is_valid_package_id("semi;colon"));
    }
}
