//! Bookmark and tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist link bookmarks together with their unfurled link row.
//! - Own the bookmark/tag join table, including set-diff tag replacement.
//!
//! # Invariants
//! - Every query is scoped to one owning user.
//! - A link URL is unique per user.
//! - Bookmark lists are newest first: `created_at DESC, rowid DESC`.
//! - Tag attachment is insert-or-ignore; detaching is always explicit.

use crate::model::bookmark::{
    Bookmark, BookmarkId, BookmarkKind, BookmarkLink, Tag, TagId, UserId,
};
use crate::model::ids::{generate_id, BOOKMARK_PREFIX, TAG_PREFIX};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema_check::{ensure_tables, int_to_bool};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const BOOKMARK_SELECT: &str = "SELECT
    b.id,
    b.user_id,
    b.title,
    b.kind,
    b.archived,
    b.favorited,
    b.created_at,
    b.updated_at,
    l.url,
    l.title,
    l.description,
    l.image_url,
    l.favicon
 FROM bookmarks b
 LEFT JOIN bookmark_links l ON l.id = b.id";

/// Repository interface for bookmarks and their tags.
pub trait BookmarkRepository {
    /// Inserts a link bookmark and its link row in one transaction.
    fn create_link_bookmark(
        &self,
        user_id: &str,
        link: &BookmarkLink,
        title: Option<&str>,
    ) -> RepoResult<Bookmark>;
    fn get_bookmark(&self, user_id: &str, id: &str) -> RepoResult<Option<Bookmark>>;
    fn list_bookmarks(&self, user_id: &str) -> RepoResult<Vec<Bookmark>>;
    fn find_bookmark_id_by_url(&self, user_id: &str, url: &str)
        -> RepoResult<Option<BookmarkId>>;
    fn update_bookmark_title(&self, user_id: &str, id: &str, title: &str) -> RepoResult<()>;
    fn delete_bookmark(&self, user_id: &str, id: &str) -> RepoResult<()>;

    fn create_tag(&self, user_id: &str, name: &str) -> RepoResult<Tag>;
    /// User tags sorted by name.
    fn list_tags(&self, user_id: &str) -> RepoResult<Vec<Tag>>;
    /// Tags whose name is in `names`; unknown names are skipped.
    fn find_tags_by_names(&self, user_id: &str, names: &[String]) -> RepoResult<Vec<Tag>>;
    /// Attaches tags, ignoring ones already attached. Returns newly attached count.
    fn attach_tags(&self, bookmark_id: &str, tag_ids: &[TagId]) -> RepoResult<usize>;
    /// Detaches then attaches in one transaction.
    fn replace_bookmark_tags(
        &self,
        bookmark_id: &str,
        detach: &[TagId],
        attach: &[TagId],
    ) -> RepoResult<()>;
}

/// SQLite-backed bookmark repository.
pub struct SqliteBookmarkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookmarkRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &[
                "bookmarks",
                "bookmark_links",
                "bookmark_tags",
                "bookmarks_to_tags",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl BookmarkRepository for SqliteBookmarkRepository<'_> {
    fn create_link_bookmark(
        &self,
        user_id: &str,
        link: &BookmarkLink,
        title: Option<&str>,
    ) -> RepoResult<Bookmark> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if find_bookmark_id_by_url(&tx, user_id, link.url.as_str())?.is_some() {
            return Err(RepoError::duplicate("bookmark", link.url.as_str()));
        }

        let id = generate_id(BOOKMARK_PREFIX);
        tx.execute(
            "INSERT INTO bookmarks (id, user_id, title, kind)
             VALUES (?1, ?2, ?3, ?4);",
            params![id, user_id, title, BookmarkKind::Link.as_str()],
        )?;
        tx.execute(
            "INSERT INTO bookmark_links (id, url, title, description, image_url, favicon)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id,
                link.url,
                link.title,
                link.description,
                link.image_url,
                link.favicon,
            ],
        )?;
        tx.commit()?;

        load_bookmark(self.conn, user_id, id.as_str())?
            .ok_or_else(|| RepoError::InvalidData(format!("bookmark {id} missing after insert")))
    }

    fn get_bookmark(&self, user_id: &str, id: &str) -> RepoResult<Option<Bookmark>> {
        load_bookmark(self.conn, user_id, id)
    }

    fn list_bookmarks(&self, user_id: &str) -> RepoResult<Vec<Bookmark>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOOKMARK_SELECT}
             WHERE b.user_id = ?1
             ORDER BY b.created_at DESC, b.rowid DESC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut bookmarks = Vec::new();
        while let Some(row) = rows.next()? {
            bookmarks.push(parse_bookmark_row(row)?);
        }
        drop(rows);

        for bookmark in &mut bookmarks {
            bookmark.tags = load_tags_for_bookmark(self.conn, bookmark.id.as_str())?;
        }
        Ok(bookmarks)
    }

    fn find_bookmark_id_by_url(
        &self,
        user_id: &str,
        url: &str,
    ) -> RepoResult<Option<BookmarkId>> {
        find_bookmark_id_by_url(self.conn, user_id, url)
    }

    fn update_bookmark_title(&self, user_id: &str, id: &str, title: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE bookmarks
             SET title = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND user_id = ?2;",
            params![id, user_id, title],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("bookmark", id));
        }
        Ok(())
    }

    fn delete_bookmark(&self, user_id: &str, id: &str) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2;",
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("bookmark", id));
        }
        // Memberships carry no FK to bookmarks; clear them here.
        tx.execute(
            "DELETE FROM topic_quadrant_items
             WHERE item_id = ?1
               AND item_type = 'bookmark';",
            [id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn create_tag(&self, user_id: &str, name: &str) -> RepoResult<Tag> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM bookmark_tags WHERE user_id = ?1 AND name = ?2;",
                params![user_id, name],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(RepoError::duplicate("tag", name));
        }

        let id = generate_id(TAG_PREFIX);
        self.conn.execute(
            "INSERT INTO bookmark_tags (id, user_id, name) VALUES (?1, ?2, ?3);",
            params![id, user_id, name],
        )?;
        Ok(Tag {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
        })
    }

    fn list_tags(&self, user_id: &str) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name
             FROM bookmark_tags
             WHERE user_id = ?1
             ORDER BY name ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    fn find_tags_by_names(&self, user_id: &str, names: &[String]) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name
             FROM bookmark_tags
             WHERE user_id = ?1
               AND name = ?2;",
        )?;
        let mut tags: Vec<Tag> = Vec::new();
        for name in names {
            let tag = stmt
                .query_row(params![user_id, name], |row| {
                    Ok(Tag {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                })
                .optional()?;
            if let Some(tag) = tag {
                if !tags.iter().any(|known| known.id == tag.id) {
                    tags.push(tag);
                }
            }
        }
        Ok(tags)
    }

    fn attach_tags(&self, bookmark_id: &str, tag_ids: &[TagId]) -> RepoResult<usize> {
        if tag_ids.is_empty() {
            return Ok(0);
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let attached = insert_tag_links(&tx, bookmark_id, tag_ids)?;
        tx.commit()?;
        Ok(attached)
    }

    fn replace_bookmark_tags(
        &self,
        bookmark_id: &str,
        detach: &[TagId],
        attach: &[TagId],
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM bookmarks WHERE id = ?1);",
            [bookmark_id],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::not_found("bookmark", bookmark_id));
        }

        for tag_id in detach {
            tx.execute(
                "DELETE FROM bookmarks_to_tags WHERE bookmark_id = ?1 AND tag_id = ?2;",
                params![bookmark_id, tag_id],
            )?;
        }
        insert_tag_links(&tx, bookmark_id, attach)?;
        tx.execute(
            "UPDATE bookmarks
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [bookmark_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

/// Inserts `(bookmark, tag)` links, skipping existing ones.
pub(crate) fn insert_tag_links(
    conn: &Connection,
    bookmark_id: &str,
    tag_ids: &[TagId],
) -> RepoResult<usize> {
    let mut attached = 0;
    for tag_id in tag_ids {
        attached += conn.execute(
            "INSERT OR IGNORE INTO bookmarks_to_tags (bookmark_id, tag_id) VALUES (?1, ?2);",
            params![bookmark_id, tag_id],
        )?;
    }
    Ok(attached)
}

fn find_bookmark_id_by_url(
    conn: &Connection,
    user_id: &str,
    url: &str,
) -> RepoResult<Option<BookmarkId>> {
    let id = conn
        .query_row(
            "SELECT b.id
             FROM bookmarks b
             JOIN bookmark_links l ON l.id = b.id
             WHERE b.user_id = ?1
               AND l.url = ?2
             LIMIT 1;",
            params![user_id, url],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn load_bookmark(conn: &Connection, user_id: &str, id: &str) -> RepoResult<Option<Bookmark>> {
    let mut stmt = conn.prepare(&format!(
        "{BOOKMARK_SELECT}
         WHERE b.id = ?1
           AND b.user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id, user_id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let mut bookmark = parse_bookmark_row(row)?;
    bookmark.tags = load_tags_for_bookmark(conn, id)?;
    Ok(Some(bookmark))
}

fn load_tags_for_bookmark(conn: &Connection, bookmark_id: &str) -> RepoResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.user_id, t.name
         FROM bookmarks_to_tags bt
         JOIN bookmark_tags t ON t.id = bt.tag_id
         WHERE bt.bookmark_id = ?1
         ORDER BY t.name ASC;",
    )?;
    let mut rows = stmt.query([bookmark_id])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(parse_tag_row(row)?);
    }
    Ok(tags)
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
    })
}

fn parse_bookmark_row(row: &Row<'_>) -> RepoResult<Bookmark> {
    let id: String = row.get(0)?;
    let user_id: UserId = row.get(1)?;
    let kind_text: String = row.get(3)?;
    let kind = BookmarkKind::parse(kind_text.as_str()).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid bookmark kind `{kind_text}` for {id}"))
    })?;
    let url: Option<String> = row.get(8)?;
    let link = match url {
        Some(url) => Some(BookmarkLink {
            url,
            title: row.get(9)?,
            description: row.get(10)?,
            image_url: row.get(11)?,
            favicon: row.get(12)?,
        }),
        None => None,
    };

    Ok(Bookmark {
        id,
        user_id,
        title: row.get(2)?,
        kind,
        archived: int_to_bool(row.get(4)?, "bookmarks.archived")?,
        favorited: int_to_bool(row.get(5)?, "bookmarks.favorited")?,
        link,
        tags: Vec::new(),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
