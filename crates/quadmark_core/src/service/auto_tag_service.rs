//! Auto-tagging use-case service.
//!
//! # Responsibility
//! - Manage per-user auto-tag rules, keywords and required packages.
//! - Import Node.js projects from GitHub and attach matching tags.
//!
//! # Invariants
//! - Keywords are trimmed and at least `MIN_KEYWORD_CHARS` long.
//! - An import without any required package is rejected before any write.
//! - Tag attachment from rules never detaches tags.

use crate::autotag::{
    effective_required_packages, match_rules, parse_github_url, parse_package_json,
    passes_required_gate, tag_set_diff, PackageJsonError,
};
use crate::error::ErrorKind;
use crate::model::auto_tag::{AutoTag, AutoTagKeyword, NodejsProject, RequiredPackage};
use crate::model::bookmark::TagId;
use crate::repo::auto_tag_repo::{AutoTagRepository, NodejsProjectImport};
use crate::repo::bookmark_repo::BookmarkRepository;
use crate::repo::RepoError;
use crate::service::external::{CodeHost, ExternalError};
use crate::service::{authenticated_user, non_blank, repo_error_kind};
use log::info;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub const MIN_KEYWORD_CHARS: usize = 3;

#[derive(Debug)]
pub enum AutoTagServiceError {
    Unauthorized,
    InvalidKeyword(String),
    BlankPackageName,
    InvalidRepositoryUrl(String),
    InvalidPackageJson(PackageJsonError),
    /// Dependencies contain none of the user's required packages.
    RequiredPackageMissing { required: Vec<String> },
    Duplicate { entity: &'static str, value: String },
    NotFound { entity: &'static str, id: String },
    External(ExternalError),
    Repo(RepoError),
}

impl AutoTagServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::InvalidKeyword(_)
            | Self::BlankPackageName
            | Self::InvalidRepositoryUrl(_)
            | Self::InvalidPackageJson(_)
            | Self::RequiredPackageMissing { .. }
            | Self::Duplicate { .. } => ErrorKind::ValidationFailed,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::External(_) => ErrorKind::PersistenceFailure,
            Self::Repo(err) => repo_error_kind(err),
        }
    }
}

impl Display for AutoTagServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::InvalidKeyword(keyword) => write!(
                f,
                "keyword must be at least {MIN_KEYWORD_CHARS} characters: `{keyword}`"
            ),
            Self::BlankPackageName => write!(f, "package name must not be blank"),
            Self::InvalidRepositoryUrl(url) => write!(f, "not a GitHub repository url: `{url}`"),
            Self::InvalidPackageJson(err) => write!(f, "{err}"),
            Self::RequiredPackageMissing { required } => write!(
                f,
                "project depends on none of the required packages: {}",
                required.join(", ")
            ),
            Self::Duplicate { entity, value } => write!(f, "{entity} already exists: {value}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::External(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AutoTagServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPackageJson(err) => Some(err),
            Self::External(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AutoTagServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Duplicate { entity, value } => Self::Duplicate { entity, value },
            other => Self::Repo(other),
        }
    }
}

impl From<ExternalError> for AutoTagServiceError {
    fn from(value: ExternalError) -> Self {
        Self::External(value)
    }
}

pub type AutoTagServiceResult<T> = Result<T, AutoTagServiceError>;

/// Result of one project import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectImport {
    pub project: NodejsProject,
    /// Tags whose rules fired, attached to the bookmark when one was given.
    pub matched_tag_ids: BTreeSet<TagId>,
}

/// Auto-tagging service facade.
pub struct AutoTagService<A: AutoTagRepository, B: BookmarkRepository> {
    rules: A,
    bookmarks: B,
    fallback_required: Vec<String>,
}

impl<A: AutoTagRepository, B: BookmarkRepository> AutoTagService<A, B> {
    pub fn new(rules: A, bookmarks: B) -> Self {
        Self {
            rules,
            bookmarks,
            fallback_required: Vec::new(),
        }
    }

    /// Required packages applied to users who configured none.
    pub fn with_fallback_required_packages(mut self, packages: Vec<String>) -> Self {
        self.fallback_required = packages;
        self
    }

    pub fn list_auto_tags(&self, user_id: Option<&str>) -> AutoTagServiceResult<Vec<AutoTag>> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        Ok(self.rules.list_auto_tags(user_id)?)
    }

    /// Makes the user's auto tags equal the named tags (set diff).
    pub fn replace_auto_tags(
        &self,
        user_id: Option<&str>,
        tag_names: &[String],
    ) -> AutoTagServiceResult<Vec<AutoTag>> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        let names: Vec<String> = tag_names
            .iter()
            .filter_map(|name| non_blank(name))
            .map(str::to_string)
            .collect();
        let desired: Vec<TagId> = self
            .bookmarks
            .find_tags_by_names(user_id, &names)?
            .into_iter()
            .map(|tag| tag.id)
            .collect();
        let current: Vec<TagId> = self
            .rules
            .list_auto_tags(user_id)?
            .into_iter()
            .map(|auto_tag| auto_tag.tag.id)
            .collect();

        let diff = tag_set_diff(&current, &desired);
        if !diff.is_empty() {
            self.rules
                .replace_auto_tags(user_id, &diff.attach, &diff.detach)?;
        }
        Ok(self.rules.list_auto_tags(user_id)?)
    }

    /// Adds a keyword; `None` when it already exists on that auto tag.
    pub fn add_keyword(
        &self,
        user_id: Option<&str>,
        auto_tag_id: &str,
        keyword: &str,
    ) -> AutoTagServiceResult<Option<AutoTagKeyword>> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        let keyword = keyword.trim();
        if keyword.chars().count() < MIN_KEYWORD_CHARS {
            return Err(AutoTagServiceError::InvalidKeyword(keyword.to_string()));
        }
        Ok(self.rules.add_keyword(user_id, auto_tag_id, keyword)?)
    }

    pub fn delete_keyword(&self, user_id: Option<&str>, keyword_id: &str) -> AutoTagServiceResult<()> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        Ok(self.rules.delete_keyword(user_id, keyword_id)?)
    }

    pub fn list_required_packages(
        &self,
        user_id: Option<&str>,
    ) -> AutoTagServiceResult<Vec<RequiredPackage>> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        Ok(self.rules.list_required_packages(user_id)?)
    }

    pub fn add_required_package(
        &self,
        user_id: Option<&str>,
        package_name: &str,
    ) -> AutoTagServiceResult<RequiredPackage> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        let package_name = non_blank(package_name).ok_or(AutoTagServiceError::BlankPackageName)?;
        Ok(self.rules.add_required_package(user_id, package_name)?)
    }

    pub fn delete_required_package(&self, user_id: Option<&str>, id: &str) -> AutoTagServiceResult<()> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        Ok(self.rules.delete_required_package(user_id, id)?)
    }

    /// Package names the import gate applies for this user right now.
    pub fn effective_required_packages(&self, user_id: Option<&str>) -> AutoTagServiceResult<Vec<String>> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        self.required_for(user_id)
    }

    /// Tag ids the user's rules assign to `dependency_names`.
    pub fn match_dependencies(
        &self,
        user_id: Option<&str>,
        dependency_names: &BTreeSet<String>,
    ) -> AutoTagServiceResult<BTreeSet<TagId>> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        let rules = self.rules.list_rules(user_id)?;
        Ok(match_rules(dependency_names, &rules))
    }

    /// Attaches matching tags to one bookmark. Returns newly attached count.
    pub fn auto_tag_bookmark(
        &self,
        user_id: Option<&str>,
        bookmark_id: &str,
        dependency_names: &BTreeSet<String>,
    ) -> AutoTagServiceResult<usize> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        self.ensure_bookmark_owned(user_id, bookmark_id)?;
        let matched = self.match_dependencies(Some(user_id), dependency_names)?;
        let tag_ids: Vec<TagId> = matched.into_iter().collect();
        Ok(self.bookmarks.attach_tags(bookmark_id, &tag_ids)?)
    }

    /// Imports the Node.js project at a GitHub URL.
    ///
    /// Reads the repository and its package.json from `code_host`, applies
    /// the required-package gate, records the project and attaches the tags
    /// whose rules fire to `bookmark_id` when given.
    pub fn import_project<H: CodeHost + ?Sized>(
        &self,
        user_id: Option<&str>,
        url: &str,
        bookmark_id: Option<&str>,
        code_host: &H,
    ) -> AutoTagServiceResult<ProjectImport> {
        let user_id = authenticated_user(user_id).ok_or(AutoTagServiceError::Unauthorized)?;
        let location = parse_github_url(url)
            .ok_or_else(|| AutoTagServiceError::InvalidRepositoryUrl(url.trim().to_string()))?;
        if let Some(bookmark_id) = bookmark_id {
            self.ensure_bookmark_owned(user_id, bookmark_id)?;
        }

        let started_at = Instant::now();
        let repo = code_host.repository(&location.owner, &location.repo)?;
        let manifest = code_host.file_content(
            &location.owner,
            &location.repo,
            location.git_ref.as_deref(),
            &location.package_json_path(),
        )?;
        let dependencies =
            parse_package_json(&manifest).map_err(AutoTagServiceError::InvalidPackageJson)?;

        let required = self.required_for(user_id)?;
        if !passes_required_gate(&dependencies, &required) {
            info!(
                "event=project_import module=service status=rejected reason=required_package_missing dependencies={}",
                dependencies.len()
            );
            return Err(AutoTagServiceError::RequiredPackageMissing { required });
        }

        let rules = self.rules.list_rules(user_id)?;
        let matched = match_rules(&dependencies, &rules);
        let tag_ids: Vec<TagId> = matched.iter().cloned().collect();
        let packages: Vec<String> = dependencies.into_iter().collect();
        let html_url = project_html_url(&repo.html_url, location.git_ref.as_deref(), &location.path);

        let project = self.rules.import_nodejs_project(NodejsProjectImport {
            repo: &repo,
            path: &location.path,
            html_url: &html_url,
            packages: &packages,
            bookmark_id,
            tag_ids: &tag_ids,
        })?;
        info!(
            "event=project_import module=service status=ok packages={} matched_tags={} duration_ms={}",
            packages.len(),
            tag_ids.len(),
            started_at.elapsed().as_millis()
        );
        Ok(ProjectImport {
            project,
            matched_tag_ids: matched,
        })
    }

    fn required_for(&self, user_id: &str) -> AutoTagServiceResult<Vec<String>> {
        let configured: Vec<String> = self
            .rules
            .list_required_packages(user_id)?
            .into_iter()
            .map(|package| package.package_name)
            .collect();
        Ok(effective_required_packages(&configured, &self.fallback_required))
    }

    fn ensure_bookmark_owned(&self, user_id: &str, bookmark_id: &str) -> AutoTagServiceResult<()> {
        if self.bookmarks.get_bookmark(user_id, bookmark_id)?.is_none() {
            return Err(AutoTagServiceError::NotFound {
                entity: "bookmark",
                id: bookmark_id.to_string(),
            });
        }
        Ok(())
    }
}

fn project_html_url(repo_html_url: &str, git_ref: Option<&str>, path: &str) -> String {
    if path.is_empty() {
        return repo_html_url.to_string();
    }
    format!(
        "{}/tree/{}/{path}",
        repo_html_url.trim_end_matches('/'),
        git_ref.unwrap_or("HEAD")
    )
}
