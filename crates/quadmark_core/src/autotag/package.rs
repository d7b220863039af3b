//! package.json and GitHub URL parsing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

static GITHUB_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(?:www\.)?github\.com/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?(?:/tree/([^/?#]+)(?:/([^?#]+?))?)?/?(?:[?#].*)?$",
    )
    .expect("valid github url regex")
});

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug)]
pub enum PackageJsonError {
    Parse(serde_json::Error),
}

impl Display for PackageJsonError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid package.json: {err}"),
        }
    }
}

impl Error for PackageJsonError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
        }
    }
}

/// Dependency names from `dependencies` and `devDependencies`.
pub fn parse_package_json(text: &str) -> Result<BTreeSet<String>, PackageJsonError> {
    let manifest: PackageManifest = serde_json::from_str(text).map_err(PackageJsonError::Parse)?;
    Ok(manifest
        .dependencies
        .into_keys()
        .chain(manifest.dev_dependencies.into_keys())
        .collect())
}

/// Repository and project directory addressed by a GitHub URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubLocation {
    pub owner: String,
    pub repo: String,
    /// Branch or tag from a `/tree/{ref}` suffix.
    pub git_ref: Option<String>,
    /// Directory inside the repository; empty for the root.
    pub path: String,
}

impl GithubLocation {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Repository-relative path of the package.json to read.
    pub fn package_json_path(&self) -> String {
        if self.path.is_empty() {
            "package.json".to_string()
        } else {
            format!("{}/package.json", self.path)
        }
    }
}

/// Parses `https://github.com/{owner}/{repo}[/tree/{ref}/{path}]`.
///
/// Returns `None` for anything else.
pub fn parse_github_url(url: &str) -> Option<GithubLocation> {
    let captures = GITHUB_URL_RE.captures(url.trim())?;
    Some(GithubLocation {
        owner: captures.get(1)?.as_str().to_string(),
        repo: captures.get(2)?.as_str().to_string(),
        git_ref: captures.get(3).map(|value| value.as_str().to_string()),
        path: captures
            .get(4)
            .map(|value| value.as_str().trim_matches('/').to_string())
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_github_url, parse_package_json};

    #[test]
    fn package_json_merges_runtime_and_dev_dependencies() {
        let names = parse_package_json(
            r#"{
                "name": "demo",
                "dependencies": { "next": "14.2.0", "react": "^18" },
                "devDependencies": { "typescript": "^5", "react": "^18" }
            }"#,
        )
        .unwrap();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["next", "react", "typescript"]);
    }

    #[test]
    fn package_json_without_dependencies_is_empty() {
        assert!(parse_package_json(r#"{"name":"bare"}"#).unwrap().is_empty());
        assert!(parse_package_json("not json").is_err());
    }

    #[test]
    fn github_root_url() {
        let location = parse_github_url("https://github.com/vercel/next.js").unwrap();
        assert_eq!(location.owner, "vercel");
        assert_eq!(location.repo, "next.js");
        assert_eq!(location.git_ref, None);
        assert_eq!(location.package_json_path(), "package.json");
        assert_eq!(location.full_name(), "vercel/next.js");
    }

    #[test]
    fn github_tree_url_selects_project_path() {
        let location =
            parse_github_url("https://github.com/acme/mono/tree/main/apps/web/").unwrap();
        assert_eq!(location.repo, "mono");
        assert_eq!(location.git_ref.as_deref(), Some("main"));
        assert_eq!(location.path, "apps/web");
        assert_eq!(location.package_json_path(), "apps/web/package.json");
    }

    #[test]
    fn non_github_urls_are_rejected() {
        assert!(parse_github_url("https://gitlab.com/acme/mono").is_none());
        assert!(parse_github_url("https://github.com/acme").is_none());
        assert!(parse_github_url("https://github.com/acme/mono/issues/1").is_none());
    }
}
