//! Bookmark list use-case service.

use crate::model::bookmark::{BookmarkId, BookmarkList};
use crate::repo::list_repo::ListRepository;
use crate::service::bookmark_service::{BookmarkServiceError, BookmarkServiceResult};
use crate::service::{authenticated_user, non_blank};

pub struct ListService<R: ListRepository> {
    repo: R,
}

impl<R: ListRepository> ListService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_list(
        &self,
        user_id: Option<&str>,
        name: &str,
        icon: &str,
        parent_id: Option<&str>,
    ) -> BookmarkServiceResult<BookmarkList> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        let name = non_blank(name).ok_or(BookmarkServiceError::BlankField("list name"))?;
        Ok(self
            .repo
            .create_list(user_id, name, icon.trim(), parent_id)?)
    }

    pub fn list_root_lists(&self, user_id: Option<&str>) -> BookmarkServiceResult<Vec<BookmarkList>> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        Ok(self.repo.list_root_lists(user_id)?)
    }

    pub fn list_child_lists(
        &self,
        user_id: Option<&str>,
        parent_id: &str,
    ) -> BookmarkServiceResult<Vec<BookmarkList>> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        Ok(self.repo.list_child_lists(user_id, parent_id)?)
    }

    /// Returns `true` when the bookmark was not in the list yet.
    pub fn add_bookmark(
        &self,
        user_id: Option<&str>,
        list_id: &str,
        bookmark_id: &str,
    ) -> BookmarkServiceResult<bool> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        Ok(self.repo.add_bookmark_to_list(user_id, list_id, bookmark_id)?)
    }

    pub fn list_bookmark_ids(
        &self,
        user_id: Option<&str>,
        list_id: &str,
    ) -> BookmarkServiceResult<Vec<BookmarkId>> {
        let user_id = authenticated_user(user_id).ok_or(BookmarkServiceError::Unauthorized)?;
        Ok(self.repo.list_bookmark_ids(user_id, list_id)?)
    }
}
