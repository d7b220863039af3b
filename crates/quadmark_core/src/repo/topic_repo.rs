//! Topic board repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create topics together with their four quadrants.
//! - Persist topic memos and quadrant memberships.
//!
//! # Invariants
//! - A topic row always references exactly four quadrant rows.
//! - Stored positions inside one quadrant are dense and start at 0.
//! - `save_quadrant_items` is all-or-nothing across every given quadrant.
//! - An item id appears in at most one quadrant of a saved payload.

use crate::board::store::QuadrantItemStore;
use crate::model::ids::{generate_id, MEMO_PREFIX, QUADRANT_PREFIX, TOPIC_PREFIX};
use crate::model::item::{ItemKind, QuadrantItems, QuadrantMembership};
use crate::model::topic::{Quadrant, QuadrantId, Topic, TopicId, TopicMemo, QUADRANTS_PER_TOPIC};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema_check::ensure_tables;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::time::Instant;

const TOPIC_SELECT: &str = "SELECT
    t.id,
    t.user_id,
    t.name,
    t.icon,
    q1.id, q1.name,
    q2.id, q2.name,
    q3.id, q3.name,
    q4.id, q4.name,
    t.created_at,
    t.updated_at
 FROM bookmark_topics t
 JOIN topic_quadrants q1 ON q1.id = t.quadrant1_id
 JOIN topic_quadrants q2 ON q2.id = t.quadrant2_id
 JOIN topic_quadrants q3 ON q3.id = t.quadrant3_id
 JOIN topic_quadrants q4 ON q4.id = t.quadrant4_id";

/// Repository interface for topics, memos and quadrant memberships.
pub trait TopicRepository {
    /// Creates a topic and its four quadrants in one transaction.
    fn create_topic(&self, user_id: &str, name: &str, icon: &str) -> RepoResult<Topic>;
    fn get_topic(&self, user_id: &str, topic_id: &str) -> RepoResult<Option<Topic>>;
    /// User topics, newest first.
    fn list_topics(&self, user_id: &str) -> RepoResult<Vec<Topic>>;
    fn rename_quadrant(&self, user_id: &str, quadrant_id: &str, name: &str) -> RepoResult<()>;
    fn create_memo(&self, topic_id: &str, content: &str) -> RepoResult<TopicMemo>;
    /// Memos of one topic, oldest first.
    fn list_memos(&self, topic_id: &str) -> RepoResult<Vec<TopicMemo>>;
    /// Memberships of the given quadrants, in the given quadrant order then by position.
    fn list_memberships(&self, quadrant_ids: &[QuadrantId])
        -> RepoResult<Vec<QuadrantMembership>>;
    /// Full replace of every given quadrant's ordered item list.
    fn save_quadrant_items(&self, quadrants: &[QuadrantItems]) -> RepoResult<()>;
}

/// SQLite-backed topic repository.
pub struct SqliteTopicRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTopicRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &[
                "bookmark_topics",
                "topic_quadrants",
                "topic_memos",
                "topic_quadrant_items",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl TopicRepository for SqliteTopicRepository<'_> {
    fn create_topic(&self, user_id: &str, name: &str, icon: &str) -> RepoResult<Topic> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut quadrant_ids = Vec::with_capacity(QUADRANTS_PER_TOPIC);
        for index in 1..=QUADRANTS_PER_TOPIC {
            let quadrant_id = generate_id(QUADRANT_PREFIX);
            tx.execute(
                "INSERT INTO topic_quadrants (id, name) VALUES (?1, ?2);",
                params![quadrant_id, format!("Quadrant {index}")],
            )?;
            quadrant_ids.push(quadrant_id);
        }

        let topic_id = generate_id(TOPIC_PREFIX);
        tx.execute(
            "INSERT INTO bookmark_topics (
                id,
                user_id,
                name,
                icon,
                quadrant1_id,
                quadrant2_id,
                quadrant3_id,
                quadrant4_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                topic_id,
                user_id,
                name,
                icon,
                quadrant_ids[0],
                quadrant_ids[1],
                quadrant_ids[2],
                quadrant_ids[3],
            ],
        )?;
        tx.commit()?;

        load_topic(self.conn, user_id, topic_id.as_str())?
            .ok_or_else(|| RepoError::InvalidData(format!("topic {topic_id} missing after insert")))
    }

    fn get_topic(&self, user_id: &str, topic_id: &str) -> RepoResult<Option<Topic>> {
        load_topic(self.conn, user_id, topic_id)
    }

    fn list_topics(&self, user_id: &str) -> RepoResult<Vec<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TOPIC_SELECT}
             WHERE t.user_id = ?1
             ORDER BY t.created_at DESC, t.rowid DESC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut topics = Vec::new();
        while let Some(row) = rows.next()? {
            topics.push(parse_topic_row(row)?);
        }
        Ok(topics)
    }

    fn rename_quadrant(&self, user_id: &str, quadrant_id: &str, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE topic_quadrants
             SET name = ?3
             WHERE id = ?1
               AND EXISTS (
                 SELECT 1
                 FROM bookmark_topics t
                 WHERE t.user_id = ?2
                   AND ?1 IN (t.quadrant1_id, t.quadrant2_id, t.quadrant3_id, t.quadrant4_id)
               );",
            params![quadrant_id, user_id, name],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("quadrant", quadrant_id));
        }
        Ok(())
    }

    fn create_memo(&self, topic_id: &str, content: &str) -> RepoResult<TopicMemo> {
        let id = generate_id(MEMO_PREFIX);
        self.conn.execute(
            "INSERT INTO topic_memos (id, topic_id, content) VALUES (?1, ?2, ?3);",
            params![id, topic_id, content],
        )?;
        let memo = self
            .conn
            .query_row(
                "SELECT id, topic_id, content, created_at FROM topic_memos WHERE id = ?1;",
                [id.as_str()],
                |row| {
                    Ok(TopicMemo {
                        id: row.get(0)?,
                        topic_id: row.get(1)?,
                        content: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        memo.ok_or_else(|| RepoError::InvalidData(format!("memo {id} missing after insert")))
    }

    fn list_memos(&self, topic_id: &str) -> RepoResult<Vec<TopicMemo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, topic_id, content, created_at
             FROM topic_memos
             WHERE topic_id = ?1
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([topic_id])?;
        let mut memos = Vec::new();
        while let Some(row) = rows.next()? {
            memos.push(TopicMemo {
                id: row.get(0)?,
                topic_id: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
            });
        }
        Ok(memos)
    }

    fn list_memberships(
        &self,
        quadrant_ids: &[QuadrantId],
    ) -> RepoResult<Vec<QuadrantMembership>> {
        let mut stmt = self.conn.prepare(
            "SELECT quadrant_id, item_id, item_type, position
             FROM topic_quadrant_items
             WHERE quadrant_id = ?1
             ORDER BY position ASC;",
        )?;
        let mut memberships = Vec::new();
        for quadrant_id in quadrant_ids {
            let mut rows = stmt.query([quadrant_id.as_str()])?;
            while let Some(row) = rows.next()? {
                memberships.push(parse_membership_row(row)?);
            }
        }
        Ok(memberships)
    }

    fn save_quadrant_items(&self, quadrants: &[QuadrantItems]) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = save_quadrant_items_in_tx(self.conn, quadrants);
        match &result {
            Ok(item_count) => info!(
                "event=board_persist module=repo status=ok quadrants={} items={item_count} duration_ms={}",
                quadrants.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=board_persist module=repo status=error quadrants={} duration_ms={} error={err}",
                quadrants.len(),
                started_at.elapsed().as_millis()
            ),
        }
        result.map(|_| ())
    }
}

impl QuadrantItemStore for SqliteTopicRepository<'_> {
    type Error = RepoError;

    fn save_quadrant_items(&self, quadrants: &[QuadrantItems]) -> Result<(), Self::Error> {
        TopicRepository::save_quadrant_items(self, quadrants)
    }
}

/// Rejects duplicate quadrants or items inside one payload.
fn validate_payload(quadrants: &[QuadrantItems]) -> RepoResult<()> {
    let mut seen_quadrants = HashSet::new();
    let mut seen_items = HashSet::new();
    for quadrant in quadrants {
        if !seen_quadrants.insert(quadrant.quadrant_id.as_str()) {
            return Err(RepoError::Invalid(format!(
                "quadrant {} appears more than once",
                quadrant.quadrant_id
            )));
        }
        for item in &quadrant.items {
            if !seen_items.insert(item.item_id.as_str()) {
                return Err(RepoError::Invalid(format!(
                    "item {} appears in more than one position",
                    item.item_id
                )));
            }
        }
    }
    Ok(())
}

fn save_quadrant_items_in_tx(conn: &Connection, quadrants: &[QuadrantItems]) -> RepoResult<usize> {
    validate_payload(quadrants)?;

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    for quadrant in quadrants {
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM topic_quadrants WHERE id = ?1);",
            [quadrant.quadrant_id.as_str()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::not_found("quadrant", quadrant.quadrant_id.as_str()));
        }
    }

    let mut item_count = 0;
    for quadrant in quadrants {
        tx.execute(
            "DELETE FROM topic_quadrant_items WHERE quadrant_id = ?1;",
            [quadrant.quadrant_id.as_str()],
        )?;
        for (position, item) in quadrant.items.iter().enumerate() {
            tx.execute(
                "INSERT INTO topic_quadrant_items (quadrant_id, item_id, item_type, position)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    quadrant.quadrant_id,
                    item.item_id,
                    item.item_type.as_str(),
                    position as i64,
                ],
            )?;
            item_count += 1;
        }
    }
    tx.commit()?;
    Ok(item_count)
}

fn load_topic(conn: &Connection, user_id: &str, topic_id: &str) -> RepoResult<Option<Topic>> {
    let mut stmt = conn.prepare(&format!(
        "{TOPIC_SELECT}
         WHERE t.id = ?1
           AND t.user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![topic_id, user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_topic_row(row)?)),
        None => Ok(None),
    }
}

fn parse_topic_row(row: &Row<'_>) -> RepoResult<Topic> {
    let id: TopicId = row.get(0)?;
    let quadrant_at = |offset: usize| -> rusqlite::Result<Quadrant> {
        Ok(Quadrant::new(
            row.get::<_, String>(offset)?,
            row.get::<_, String>(offset + 1)?,
        ))
    };
    Ok(Topic {
        id,
        user_id: row.get(1)?,
        name: row.get(2)?,
        icon: row.get(3)?,
        quadrants: [
            quadrant_at(4)?,
            quadrant_at(6)?,
            quadrant_at(8)?,
            quadrant_at(10)?,
        ],
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn parse_membership_row(row: &Row<'_>) -> RepoResult<QuadrantMembership> {
    let item_type: String = row.get(2)?;
    let item_type = ItemKind::parse(item_type.as_str()).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid item_type `{item_type}` in topic_quadrant_items"
        ))
    })?;
    Ok(QuadrantMembership {
        quadrant_id: row.get(0)?,
        item_id: row.get(1)?,
        item_type,
        position: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::validate_payload;
    use crate::model::item::{ItemKind, ItemRef, QuadrantItems};

    fn quadrant(id: &str, items: &[&str]) -> QuadrantItems {
        QuadrantItems {
            quadrant_id: id.to_string(),
            items: items
                .iter()
                .map(|item_id| ItemRef {
                    item_id: item_id.to_string(),
                    item_type: ItemKind::Bookmark,
                })
                .collect(),
        }
    }

    #[test]
    fn payload_rejects_item_in_two_quadrants() {
        let payload = [quadrant("qd_a", &["bm_1"]), quadrant("qd_b", &["bm_1"])];
        assert!(validate_payload(&payload).is_err());
    }

    #[test]
    fn payload_rejects_repeated_quadrant() {
        let payload = [quadrant("qd_a", &["bm_1"]), quadrant("qd_a", &["bm_2"])];
        assert!(validate_payload(&payload).is_err());
    }

    #[test]
    fn payload_accepts_empty_quadrants() {
        let payload = [quadrant("qd_a", &[]), quadrant("qd_b", &["bm_1", "bm_2"])];
        assert!(validate_payload(&payload).is_ok());
    }
}
