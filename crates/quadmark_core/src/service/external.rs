//! Collaborators the core does not implement: link unfurling and code hosting.

use crate::model::auto_tag::GithubRepo;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Metadata returned by a link unfurler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub favicon: Option<String>,
}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalError {
    pub service: &'static str,
    pub message: String,
}

impl ExternalError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

impl Display for ExternalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.service, self.message)
    }
}

impl Error for ExternalError {}

/// Fetches title/description/image/favicon for a URL.
pub trait LinkUnfurler {
    fn unfurl(&self, url: &str) -> Result<LinkMetadata, ExternalError>;
}

/// Unfurler that returns no metadata; cards fall back to the URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlOnlyUnfurler;

impl LinkUnfurler for UrlOnlyUnfurler {
    fn unfurl(&self, _url: &str) -> Result<LinkMetadata, ExternalError> {
        Ok(LinkMetadata::default())
    }
}

/// Read access to a GitHub-like code host.
pub trait CodeHost {
    fn repository(&self, owner: &str, repo: &str) -> Result<GithubRepo, ExternalError>;
    /// Raw file content at `path`; `git_ref = None` means the default branch.
    fn file_content(
        &self,
        owner: &str,
        repo: &str,
        git_ref: Option<&str>,
        path: &str,
    ) -> Result<String, ExternalError>;
}
