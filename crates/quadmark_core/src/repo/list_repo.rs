//! Bookmark list repository.
//!
//! # Invariants
//! - A list's parent, when set, belongs to the same user.
//! - Adding a bookmark twice to one list is a no-op.

use crate::model::bookmark::{BookmarkId, BookmarkList};
use crate::model::ids::{generate_id, LIST_PREFIX};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema_check::ensure_tables;
use rusqlite::{params, Connection, Row};

pub trait ListRepository {
    fn create_list(
        &self,
        user_id: &str,
        name: &str,
        icon: &str,
        parent_id: Option<&str>,
    ) -> RepoResult<BookmarkList>;
    /// Lists without parent, oldest first.
    fn list_root_lists(&self, user_id: &str) -> RepoResult<Vec<BookmarkList>>;
    fn list_child_lists(&self, user_id: &str, parent_id: &str) -> RepoResult<Vec<BookmarkList>>;
    /// Returns `true` when the bookmark was newly added.
    fn add_bookmark_to_list(
        &self,
        user_id: &str,
        list_id: &str,
        bookmark_id: &str,
    ) -> RepoResult<bool>;
    /// Bookmark ids in one list, most recently added first.
    fn list_bookmark_ids(&self, user_id: &str, list_id: &str) -> RepoResult<Vec<BookmarkId>>;
}

pub struct SqliteListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["bookmark_lists", "bookmarks_to_lists"])?;
        Ok(Self { conn })
    }

    fn ensure_list_owned(&self, user_id: &str, list_id: &str) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM bookmark_lists WHERE id = ?1 AND user_id = ?2);",
            params![list_id, user_id],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::not_found("list", list_id));
        }
        Ok(())
    }

    fn query_lists(&self, sql: &str, args: &[&str]) -> RepoResult<Vec<BookmarkList>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            lists.push(parse_list_row(row)?);
        }
        Ok(lists)
    }
}

impl ListRepository for SqliteListRepository<'_> {
    fn create_list(
        &self,
        user_id: &str,
        name: &str,
        icon: &str,
        parent_id: Option<&str>,
    ) -> RepoResult<BookmarkList> {
        if let Some(parent_id) = parent_id {
            self.ensure_list_owned(user_id, parent_id)?;
        }

        let id = generate_id(LIST_PREFIX);
        self.conn.execute(
            "INSERT INTO bookmark_lists (id, user_id, name, icon, parent_id)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![id, user_id, name, icon, parent_id],
        )?;
        let mut lists = self.query_lists(
            "SELECT id, user_id, name, icon, parent_id, created_at, updated_at
             FROM bookmark_lists
             WHERE id = ?1;",
            &[id.as_str()],
        )?;
        lists
            .pop()
            .ok_or_else(|| RepoError::InvalidData(format!("list {id} missing after insert")))
    }

    fn list_root_lists(&self, user_id: &str) -> RepoResult<Vec<BookmarkList>> {
        self.query_lists(
            "SELECT id, user_id, name, icon, parent_id, created_at, updated_at
             FROM bookmark_lists
             WHERE user_id = ?1
               AND parent_id IS NULL
             ORDER BY created_at ASC, rowid ASC;",
            &[user_id],
        )
    }

    fn list_child_lists(&self, user_id: &str, parent_id: &str) -> RepoResult<Vec<BookmarkList>> {
        self.query_lists(
            "SELECT id, user_id, name, icon, parent_id, created_at, updated_at
             FROM bookmark_lists
             WHERE user_id = ?1
               AND parent_id = ?2
             ORDER BY created_at ASC, rowid ASC;",
            &[user_id, parent_id],
        )
    }

    fn add_bookmark_to_list(
        &self,
        user_id: &str,
        list_id: &str,
        bookmark_id: &str,
    ) -> RepoResult<bool> {
        self.ensure_list_owned(user_id, list_id)?;
        let owned: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM bookmarks WHERE id = ?1 AND user_id = ?2);",
            params![bookmark_id, user_id],
            |row| row.get(0),
        )?;
        if owned != 1 {
            return Err(RepoError::not_found("bookmark", bookmark_id));
        }

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO bookmarks_to_lists (bookmark_id, list_id) VALUES (?1, ?2);",
            params![bookmark_id, list_id],
        )?;
        Ok(inserted == 1)
    }

    fn list_bookmark_ids(&self, user_id: &str, list_id: &str) -> RepoResult<Vec<BookmarkId>> {
        self.ensure_list_owned(user_id, list_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT bookmark_id
             FROM bookmarks_to_lists
             WHERE list_id = ?1
             ORDER BY added_at DESC, rowid DESC;",
        )?;
        let mut rows = stmt.query([list_id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

fn parse_list_row(row: &Row<'_>) -> RepoResult<BookmarkList> {
    Ok(BookmarkList {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        icon: row.get(3)?,
        parent_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
