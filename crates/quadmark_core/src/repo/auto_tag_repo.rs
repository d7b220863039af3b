//! Auto-tag rule and Node.js project repository.
//!
//! # Responsibility
//! - Persist per-user auto-tag rules, keywords and required packages.
//! - Record imported Node.js projects with their npm dependency links.
//!
//! # Invariants
//! - One auto tag per `(user, tag)`; one keyword per `(auto tag, keyword)`.
//! - A project import writes repo, project, packages and tag links atomically.

use crate::model::auto_tag::{
    AutoTag, AutoTagKeyword, AutoTagRule, GithubRepo, NodejsProject, RequiredPackage,
};
use crate::model::bookmark::{Tag, TagId};
use crate::model::ids::{
    generate_id, AUTO_TAG_KEYWORD_PREFIX, AUTO_TAG_PREFIX, NODEJS_PROJECT_PREFIX,
    REQUIRED_PACKAGE_PREFIX,
};
use crate::repo::bookmark_repo::insert_tag_links;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::schema_check::ensure_tables;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Input for one Node.js project import.
#[derive(Debug, Clone, Copy)]
pub struct NodejsProjectImport<'a> {
    pub repo: &'a GithubRepo,
    /// Directory of the package.json inside the repository; empty for root.
    pub path: &'a str,
    pub html_url: &'a str,
    pub packages: &'a [String],
    /// Bookmark receiving `tag_ids`, if any.
    pub bookmark_id: Option<&'a str>,
    pub tag_ids: &'a [TagId],
}

pub trait AutoTagRepository {
    /// User auto tags sorted by tag name, each with its keywords.
    fn list_auto_tags(&self, user_id: &str) -> RepoResult<Vec<AutoTag>>;
    fn list_rules(&self, user_id: &str) -> RepoResult<Vec<AutoTagRule>> {
        Ok(self
            .list_auto_tags(user_id)?
            .iter()
            .map(AutoTag::to_rule)
            .collect())
    }
    /// Adds and removes auto tags by tag id in one transaction.
    fn replace_auto_tags(
        &self,
        user_id: &str,
        add_tag_ids: &[TagId],
        remove_tag_ids: &[TagId],
    ) -> RepoResult<()>;
    /// Returns `None` when the keyword already exists on that auto tag.
    fn add_keyword(
        &self,
        user_id: &str,
        auto_tag_id: &str,
        keyword: &str,
    ) -> RepoResult<Option<AutoTagKeyword>>;
    fn delete_keyword(&self, user_id: &str, keyword_id: &str) -> RepoResult<()>;

    fn list_required_packages(&self, user_id: &str) -> RepoResult<Vec<RequiredPackage>>;
    fn add_required_package(&self, user_id: &str, package_name: &str)
        -> RepoResult<RequiredPackage>;
    fn delete_required_package(&self, user_id: &str, id: &str) -> RepoResult<()>;

    fn import_nodejs_project(&self, import: NodejsProjectImport<'_>)
        -> RepoResult<NodejsProject>;
    fn get_nodejs_project(&self, repo_id: i64, path: &str) -> RepoResult<Option<NodejsProject>>;
}

pub struct SqliteAutoTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAutoTagRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &[
                "auto_tags",
                "auto_tag_keywords",
                "nodejs_require_packages",
                "github_repos",
                "nodejs_projects",
                "npm_packages",
                "nodejs_projects_to_npm_packages",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl AutoTagRepository for SqliteAutoTagRepository<'_> {
    fn list_auto_tags(&self, user_id: &str) -> RepoResult<Vec<AutoTag>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.user_id, t.id, t.user_id, t.name
             FROM auto_tags a
             JOIN bookmark_tags t ON t.id = a.tag_id
             WHERE a.user_id = ?1
             ORDER BY t.name ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut auto_tags = Vec::new();
        while let Some(row) = rows.next()? {
            auto_tags.push(AutoTag {
                id: row.get(0)?,
                user_id: row.get(1)?,
                tag: Tag {
                    id: row.get(2)?,
                    user_id: row.get(3)?,
                    name: row.get(4)?,
                },
                keywords: Vec::new(),
            });
        }
        drop(rows);

        let mut keyword_stmt = self.conn.prepare(
            "SELECT id, auto_tag_id, keyword
             FROM auto_tag_keywords
             WHERE auto_tag_id = ?1
             ORDER BY keyword ASC;",
        )?;
        for auto_tag in &mut auto_tags {
            let mut rows = keyword_stmt.query([auto_tag.id.as_str()])?;
            while let Some(row) = rows.next()? {
                auto_tag.keywords.push(AutoTagKeyword {
                    id: row.get(0)?,
                    auto_tag_id: row.get(1)?,
                    keyword: row.get(2)?,
                });
            }
        }
        Ok(auto_tags)
    }

    fn replace_auto_tags(
        &self,
        user_id: &str,
        add_tag_ids: &[TagId],
        remove_tag_ids: &[TagId],
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for tag_id in remove_tag_ids {
            tx.execute(
                "DELETE FROM auto_tags WHERE user_id = ?1 AND tag_id = ?2;",
                params![user_id, tag_id],
            )?;
        }
        for tag_id in add_tag_ids {
            let owned: i64 = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM bookmark_tags WHERE id = ?1 AND user_id = ?2);",
                params![tag_id, user_id],
                |row| row.get(0),
            )?;
            if owned != 1 {
                return Err(RepoError::not_found("tag", tag_id.as_str()));
            }
            tx.execute(
                "INSERT OR IGNORE INTO auto_tags (id, user_id, tag_id) VALUES (?1, ?2, ?3);",
                params![generate_id(AUTO_TAG_PREFIX), user_id, tag_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn add_keyword(
        &self,
        user_id: &str,
        auto_tag_id: &str,
        keyword: &str,
    ) -> RepoResult<Option<AutoTagKeyword>> {
        let owned: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM auto_tags WHERE id = ?1 AND user_id = ?2);",
            params![auto_tag_id, user_id],
            |row| row.get(0),
        )?;
        if owned != 1 {
            return Err(RepoError::not_found("auto tag", auto_tag_id));
        }

        let id = generate_id(AUTO_TAG_KEYWORD_PREFIX);
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO auto_tag_keywords (id, auto_tag_id, keyword)
             VALUES (?1, ?2, ?3);",
            params![id, auto_tag_id, keyword],
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(AutoTagKeyword {
            id,
            auto_tag_id: auto_tag_id.to_string(),
            keyword: keyword.to_string(),
        }))
    }

    fn delete_keyword(&self, user_id: &str, keyword_id: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM auto_tag_keywords
             WHERE id = ?1
               AND auto_tag_id IN (SELECT id FROM auto_tags WHERE user_id = ?2);",
            params![keyword_id, user_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("keyword", keyword_id));
        }
        Ok(())
    }

    fn list_required_packages(&self, user_id: &str) -> RepoResult<Vec<RequiredPackage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, package_name
             FROM nodejs_require_packages
             WHERE user_id = ?1
             ORDER BY package_name ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut packages = Vec::new();
        while let Some(row) = rows.next()? {
            packages.push(RequiredPackage {
                id: row.get(0)?,
                user_id: row.get(1)?,
                package_name: row.get(2)?,
            });
        }
        Ok(packages)
    }

    fn add_required_package(
        &self,
        user_id: &str,
        package_name: &str,
    ) -> RepoResult<RequiredPackage> {
        let id = generate_id(REQUIRED_PACKAGE_PREFIX);
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO nodejs_require_packages (id, user_id, package_name)
             VALUES (?1, ?2, ?3);",
            params![id, user_id, package_name],
        )?;
        if inserted == 0 {
            return Err(RepoError::duplicate("required package", package_name));
        }
        Ok(RequiredPackage {
            id,
            user_id: user_id.to_string(),
            package_name: package_name.to_string(),
        })
    }

    fn delete_required_package(&self, user_id: &str, id: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM nodejs_require_packages WHERE id = ?1 AND user_id = ?2;",
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("required package", id));
        }
        Ok(())
    }

    fn import_nodejs_project(
        &self,
        import: NodejsProjectImport<'_>,
    ) -> RepoResult<NodejsProject> {
        let repo = import.repo;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO github_repos (
                id,
                owner,
                name,
                full_name,
                html_url,
                description,
                stargazers_count,
                pushed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (id) DO UPDATE SET
                owner = excluded.owner,
                name = excluded.name,
                full_name = excluded.full_name,
                html_url = excluded.html_url,
                description = excluded.description,
                stargazers_count = excluded.stargazers_count,
                pushed_at = excluded.pushed_at,
                crawled_at = (strftime('%s', 'now') * 1000);",
            params![
                repo.id,
                repo.owner,
                repo.name,
                repo.full_name,
                repo.html_url,
                repo.description,
                repo.stargazers_count,
                repo.pushed_at,
            ],
        )?;

        tx.execute(
            "INSERT INTO nodejs_projects (id, repo_id, path, html_url, bookmark_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (repo_id, path) DO UPDATE SET
                html_url = excluded.html_url,
                bookmark_id = COALESCE(excluded.bookmark_id, nodejs_projects.bookmark_id);",
            params![
                generate_id(NODEJS_PROJECT_PREFIX),
                repo.id,
                import.path,
                import.html_url,
                import.bookmark_id,
            ],
        )?;
        let project_id: String = tx.query_row(
            "SELECT id FROM nodejs_projects WHERE repo_id = ?1 AND path = ?2;",
            params![repo.id, import.path],
            |row| row.get(0),
        )?;

        tx.execute(
            "DELETE FROM nodejs_projects_to_npm_packages WHERE project_id = ?1;",
            [project_id.as_str()],
        )?;
        for package in import.packages {
            tx.execute(
                "INSERT OR IGNORE INTO npm_packages (name) VALUES (?1);",
                [package.as_str()],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO nodejs_projects_to_npm_packages (project_id, package_name)
                 VALUES (?1, ?2);",
                params![project_id, package],
            )?;
        }

        if let Some(bookmark_id) = import.bookmark_id {
            insert_tag_links(&tx, bookmark_id, import.tag_ids)?;
        }
        tx.commit()?;

        load_nodejs_project(self.conn, repo.id, import.path)?.ok_or_else(|| {
            RepoError::InvalidData(format!("nodejs project {project_id} missing after import"))
        })
    }

    fn get_nodejs_project(&self, repo_id: i64, path: &str) -> RepoResult<Option<NodejsProject>> {
        load_nodejs_project(self.conn, repo_id, path)
    }
}

fn load_nodejs_project(
    conn: &Connection,
    repo_id: i64,
    path: &str,
) -> RepoResult<Option<NodejsProject>> {
    let project = conn
        .query_row(
            "SELECT id, repo_id, path, html_url, bookmark_id
             FROM nodejs_projects
             WHERE repo_id = ?1
               AND path = ?2;",
            params![repo_id, path],
            |row| {
                Ok(NodejsProject {
                    id: row.get(0)?,
                    repo_id: row.get(1)?,
                    path: row.get(2)?,
                    html_url: row.get(3)?,
                    bookmark_id: row.get(4)?,
                    packages: Vec::new(),
                })
            },
        )
        .optional()?;
    let Some(mut project) = project else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT package_name
         FROM nodejs_projects_to_npm_packages
         WHERE project_id = ?1
         ORDER BY package_name ASC;",
    )?;
    let mut rows = stmt.query([project.id.as_str()])?;
    while let Some(row) = rows.next()? {
        project.packages.push(row.get(0)?);
    }
    Ok(Some(project))
}
