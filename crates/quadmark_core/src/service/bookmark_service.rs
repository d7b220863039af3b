//! Bookmark and tag use-case service.
//!
//! # Responsibility
//! - Create link bookmarks from URLs through a `LinkUnfurler`.
//! - Edit titles, delete bookmarks and replace attached tags by name.
//!
//! # Invariants
//! - Only `http(s)` URLs are accepted.
//! - A URL is saved at most once per user.
//! - Tag replacement is a set diff; unknown tag names are ignored.

use crate::autotag::tag_set_diff;
use crate::error::ErrorKind;
use crate::model::bookmark::{Bookmark, BookmarkLink, Tag, TagId};
use crate::repo::bookmark_repo::BookmarkRepository;
use crate::repo::RepoError;
use crate::service::external::{ExternalError, LinkUnfurler};
use crate::service::{authenticated_user, non_blank, repo_error_kind};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

static HTTP_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/?#]+[^\s]*$").expect("valid http url regex"));

#[derive(Debug)]
pub enum BookmarkServiceError {
    Unauthorized,
    InvalidUrl(String),
    /// Name or title is blank after trim.
    BlankField(&'static str),
    Duplicate { entity: &'static str, value: String },
    NotFound { entity: &'static str, id: String },
    External(ExternalError),
    Repo(RepoError),
}

impl BookmarkServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::InvalidUrl(_) | Self::BlankField(_) | Self::Duplicate { .. } => {
                ErrorKind::ValidationFailed
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::External(_) => ErrorKind::PersistenceFailure,
            Self::Repo(err) => repo_error_kind(err),
        }
    }
}

impl Display for BookmarkServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::InvalidUrl(url) => write!(f, "invalid url: `{url}`"),
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::Duplicate { entity, value } => write!(f, "{entity} already exists: {value}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::External(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BookmarkServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::External(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BookmarkServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Duplicate { entity, value } => Self::Duplicate { entity, value },
            other => Self::Repo(other),
        }
    }
}

impl From<ExternalError> for BookmarkServiceError {
    fn from(value: ExternalError) -> Self {
        Self::External(value)
    }
}

pub type BookmarkServiceResult<T> = Result<T, BookmarkServiceError>;

/// Bookmark service facade over repository implementations.
pub struct BookmarkService<R: BookmarkRepository> {
    repo: R,
}

impl<R: BookmarkRepository> BookmarkService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Saves `url` for the user with metadata from `unfurler`.
    ///
    /// The duplicate check runs before unfurling so a known URL never hits
    /// the network.
    pub fn create_bookmark<U: LinkUnfurler + ?Sized>(
        &self,
        user_id: Option<&str>,
        url: &str,
        unfurler: &U,
    ) -> BookmarkServiceResult<Bookmark> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        let url = url.trim();
        if !HTTP_URL_RE.is_match(url) {
            return Err(BookmarkServiceError::InvalidUrl(url.to_string()));
        }
        if self.repo.find_bookmark_id_by_url(user_id, url)?.is_some() {
            return Err(BookmarkServiceError::Duplicate {
                entity: "bookmark",
                value: url.to_string(),
            });
        }

        let started_at = Instant::now();
        let metadata = unfurler.unfurl(url).map_err(|err| {
            warn!(
                "event=bookmark_create module=service status=error error_code=unfurl_failed service={}",
                err.service
            );
            err
        })?;
        let link = BookmarkLink {
            url: url.to_string(),
            title: metadata.title,
            description: metadata.description,
            image_url: metadata.image_url,
            favicon: metadata.favicon,
        };
        let bookmark = self.repo.create_link_bookmark(user_id, &link, None)?;
        info!(
            "event=bookmark_create module=service status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(bookmark)
    }

    pub fn get_bookmark(&self, user_id: Option<&str>, id: &str) -> BookmarkServiceResult<Bookmark> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        self.repo
            .get_bookmark(user_id, id)?
            .ok_or_else(|| BookmarkServiceError::NotFound {
                entity: "bookmark",
                id: id.to_string(),
            })
    }

    /// User bookmarks, newest first.
    pub fn list_bookmarks(&self, user_id: Option<&str>) -> BookmarkServiceResult<Vec<Bookmark>> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        Ok(self.repo.list_bookmarks(user_id)?)
    }

    pub fn update_title(
        &self,
        user_id: Option<&str>,
        id: &str,
        title: &str,
    ) -> BookmarkServiceResult<Bookmark> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        let title = non_blank(title).ok_or(BookmarkServiceError::BlankField("title"))?;
        self.repo.update_bookmark_title(user_id, id, title)?;
        self.get_bookmark(Some(user_id), id)
    }

    pub fn delete_bookmark(&self, user_id: Option<&str>, id: &str) -> BookmarkServiceResult<()> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        self.repo.delete_bookmark(user_id, id)?;
        info!("event=bookmark_delete module=service status=ok");
        Ok(())
    }

    pub fn create_tag(&self, user_id: Option<&str>, name: &str) -> BookmarkServiceResult<Tag> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        let name = non_blank(name).ok_or(BookmarkServiceError::BlankField("tag name"))?;
        Ok(self.repo.create_tag(user_id, name)?)
    }

    pub fn list_tags(&self, user_id: Option<&str>) -> BookmarkServiceResult<Vec<Tag>> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        Ok(self.repo.list_tags(user_id)?)
    }

    /// Makes the bookmark's tags equal the named user tags.
    ///
    /// Names without a matching tag are skipped.
    pub fn set_bookmark_tags(
        &self,
        user_id: Option<&str>,
        bookmark_id: &str,
        tag_names: &[String],
    ) -> BookmarkServiceResult<Bookmark> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        let bookmark = self.get_bookmark(Some(user_id), bookmark_id)?;

        let names: Vec<String> = tag_names
            .iter()
            .filter_map(|name| non_blank(name))
            .map(str::to_string)
            .collect();
        let desired: Vec<TagId> = self
            .repo
            .find_tags_by_names(user_id, &names)?
            .into_iter()
            .map(|tag| tag.id)
            .collect();
        let current: Vec<TagId> = bookmark.tags.iter().map(|tag| tag.id.clone()).collect();

        let diff = tag_set_diff(&current, &desired);
        if diff.is_empty() {
            return Ok(bookmark);
        }
        self.repo
            .replace_bookmark_tags(bookmark_id, &diff.detach, &diff.attach)?;
        info!(
            "event=bookmark_tags_replace module=service status=ok attached={} detached={}",
            diff.attach.len(),
            diff.detach.len()
        );
        self.get_bookmark(Some(user_id), bookmark_id)
    }
}

#[cfg(test)]
mod tests {
    use super::HTTP_URL_RE;

    #[test]
    fn url_pattern_accepts_http_and_https_only() {
        assert!(HTTP_URL_RE.is_match("https://example.com"));
        assert!(HTTP_URL_RE.is_match("http://example.com/a?b=c#d"));
        assert!(!HTTP_URL_RE.is_match("ftp://example.com"));
        assert!(!HTTP_URL_RE.is_match("https://"));
        assert!(!HTTP_URL_RE.is_match("https://exa mple.com"));
        assert!(!HTTP_URL_RE.is_match("example.com"));
    }
}
