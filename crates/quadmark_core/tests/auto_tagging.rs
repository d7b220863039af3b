use quadmark_core::config::CoreConfig;
use quadmark_core::db::open_db_in_memory;
use quadmark_core::error::ErrorKind;
use quadmark_core::model::auto_tag::GithubRepo;
use quadmark_core::repo::auto_tag_repo::{AutoTagRepository, SqliteAutoTagRepository};
use quadmark_core::repo::bookmark_repo::SqliteBookmarkRepository;
use quadmark_core::service::auto_tag_service::{AutoTagService, AutoTagServiceError};
use quadmark_core::service::bookmark_service::BookmarkService;
use quadmark_core::service::external::{CodeHost, ExternalError, UrlOnlyUnfurler};
use rusqlite::Connection;
use std::collections::{BTreeSet, HashMap};

const USER: Option<&str> = Some("user-1");

type Service<'conn> = AutoTagService<SqliteAutoTagRepository<'conn>, SqliteBookmarkRepository<'conn>>;

struct FakeCodeHost {
    files: HashMap<String, String>,
}

impl FakeCodeHost {
    fn with_manifest(path: &str, manifest: serde_json::Value) -> Self {
        let mut files = HashMap::new();
        files.insert(path.to_string(), manifest.to_string());
        Self { files }
    }
}

impl CodeHost for FakeCodeHost {
    fn repository(&self, owner: &str, repo: &str) -> Result<GithubRepo, ExternalError> {
        Ok(GithubRepo {
            id: 4242,
            owner: owner.to_string(),
            name: repo.to_string(),
            full_name: format!("{owner}/{repo}"),
            html_url: format!("https://github.com/{owner}/{repo}"),
            description: Some("demo".to_string()),
            stargazers_count: 7,
            pushed_at: None,
        })
    }

    fn file_content(
        &self,
        _owner: &str,
        _repo: &str,
        _git_ref: Option<&str>,
        path: &str,
    ) -> Result<String, ExternalError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ExternalError::new("code_host", format!("missing {path}")))
    }
}

fn service(conn: &Connection) -> Service<'_> {
    AutoTagService::new(
        SqliteAutoTagRepository::try_new(conn).unwrap(),
        SqliteBookmarkRepository::try_new(conn).unwrap(),
    )
    .with_fallback_required_packages(CoreConfig::default().required_packages)
}

fn bookmarks(conn: &Connection) -> BookmarkService<SqliteBookmarkRepository<'_>> {
    BookmarkService::new(SqliteBookmarkRepository::try_new(conn).unwrap())
}

/// Creates tags, registers them as auto tags and gives each one keyword.
fn seed_rules(conn: &Connection, rules: &[(&str, &str)]) -> HashMap<String, String> {
    let bookmarks = bookmarks(conn);
    let service = service(conn);
    let mut tag_ids = HashMap::new();
    for (tag_name, _) in rules {
        let tag = bookmarks.create_tag(USER, tag_name).unwrap();
        tag_ids.insert(tag_name.to_string(), tag.id);
    }
    let names: Vec<String> = rules.iter().map(|(name, _)| name.to_string()).collect();
    let auto_tags = service.replace_auto_tags(USER, &names).unwrap();
    for (tag_name, keyword) in rules {
        let auto_tag = auto_tags
            .iter()
            .find(|auto_tag| auto_tag.tag.name == *tag_name)
            .unwrap();
        service.add_keyword(USER, &auto_tag.id, keyword).unwrap();
    }
    tag_ids
}

fn dependencies(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn match_dependencies_returns_firing_rule_tags() {
    let conn = open_db_in_memory().unwrap();
    let tags = seed_rules(&conn, &[("nextjs", "next"), ("vue", "vue")]);
    let service = service(&conn);

    let matched = service
        .match_dependencies(USER, &dependencies(&["next", "react"]))
        .unwrap();
    assert_eq!(matched, BTreeSet::from([tags["nextjs"].clone()]));

    let matched = service
        .match_dependencies(USER, &dependencies(&["svelte"]))
        .unwrap();
    assert!(matched.is_empty());
}

#[test]
fn replace_auto_tags_applies_set_difference() {
    let conn = open_db_in_memory().unwrap();
    let bookmarks = bookmarks(&conn);
    for name in ["alpha", "beta", "gamma"] {
        bookmarks.create_tag(USER, name).unwrap();
    }
    let service = service(&conn);

    let first = service
        .replace_auto_tags(USER, &["alpha".to_string(), "beta".to_string()])
        .unwrap();
    let alpha_id = first
        .iter()
        .find(|auto_tag| auto_tag.tag.name == "alpha")
        .unwrap()
        .id
        .clone();
    service.add_keyword(USER, &alpha_id, "astro").unwrap();

    let second = service
        .replace_auto_tags(USER, &["alpha".to_string(), "gamma".to_string(), "nope".to_string()])
        .unwrap();
    let names: Vec<&str> = second.iter().map(|auto_tag| auto_tag.tag.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "gamma"]);
    // Kept auto tags keep their keywords.
    let alpha = second.iter().find(|auto_tag| auto_tag.id == alpha_id).unwrap();
    assert_eq!(alpha.keywords.len(), 1);
    assert_eq!(alpha.keywords[0].keyword, "astro");
}

#[test]
fn keywords_are_trimmed_checked_and_deduplicated() {
    let conn = open_db_in_memory().unwrap();
    bookmarks(&conn).create_tag(USER, "react").unwrap();
    let service = service(&conn);
    let auto_tag = service
        .replace_auto_tags(USER, &["react".to_string()])
        .unwrap()
        .remove(0);

    let err = service.add_keyword(USER, &auto_tag.id, "  re ").unwrap_err();
    assert!(matches!(err, AutoTagServiceError::InvalidKeyword(_)));
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    let keyword = service
        .add_keyword(USER, &auto_tag.id, " react ")
        .unwrap()
        .expect("new keyword");
    assert_eq!(keyword.keyword, "react");
    assert!(service
        .add_keyword(USER, &auto_tag.id, "react")
        .unwrap()
        .is_none());

    let err = service
        .add_keyword(Some("user-2"), &auto_tag.id, "react-dom")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    service.delete_keyword(USER, &keyword.id).unwrap();
    assert!(service.list_auto_tags(USER).unwrap()[0].keywords.is_empty());
}

#[test]
fn required_packages_default_to_next_until_configured() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let host = FakeCodeHost::with_manifest(
        "package.json",
        serde_json::json!({ "dependencies": { "react": "^18" } }),
    );

    let err = service
        .import_project(USER, "https://github.com/acme/site", None, &host)
        .unwrap_err();
    match &err {
        AutoTagServiceError::RequiredPackageMissing { required } => {
            assert_eq!(required, &vec!["next".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    let package = service.add_required_package(USER, " react ").unwrap();
    assert_eq!(package.package_name, "react");
    let err = service.add_required_package(USER, "react").unwrap_err();
    assert!(matches!(err, AutoTagServiceError::Duplicate { .. }));
    assert!(service
        .import_project(USER, "https://github.com/acme/site", None, &host)
        .is_ok());

    service.delete_required_package(USER, &package.id).unwrap();
    assert!(service.list_required_packages(USER).unwrap().is_empty());
}

#[test]
fn import_project_records_packages_and_tags_bookmark() {
    let conn = open_db_in_memory().unwrap();
    let tags = seed_rules(&conn, &[("nextjs", "next"), ("tailwind", "tailwindcss"), ("vue", "vue")]);
    let bookmark = bookmarks(&conn)
        .create_bookmark(USER, "https://github.com/acme/mono", &UrlOnlyUnfurler)
        .unwrap();
    let service = service(&conn);
    let host = FakeCodeHost::with_manifest(
        "apps/web/package.json",
        serde_json::json!({
            "dependencies": { "next": "14.2.0", "react": "^18" },
            "devDependencies": { "tailwindcss": "^3" }
        }),
    );

    let imported = service
        .import_project(
            USER,
            "https://github.com/acme/mono/tree/main/apps/web",
            Some(bookmark.id.as_str()),
            &host,
        )
        .unwrap();
    assert_eq!(
        imported.matched_tag_ids,
        BTreeSet::from([tags["nextjs"].clone(), tags["tailwind"].clone()])
    );
    assert_eq!(imported.project.path, "apps/web");
    assert_eq!(
        imported.project.html_url,
        "https://github.com/acme/mono/tree/main/apps/web"
    );
    assert_eq!(imported.project.bookmark_id.as_deref(), Some(bookmark.id.as_str()));
    assert_eq!(imported.project.packages, vec!["next", "react", "tailwindcss"]);

    let tagged = bookmarks(&conn).get_bookmark(USER, &bookmark.id).unwrap();
    let names: Vec<&str> = tagged.tags.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(names, vec!["nextjs", "tailwind"]);

    // Re-importing without a bookmark keeps the existing link.
    let again = service
        .import_project(USER, "https://github.com/acme/mono/tree/main/apps/web", None, &host)
        .unwrap();
    assert_eq!(again.project.id, imported.project.id);
    assert_eq!(again.project.bookmark_id.as_deref(), Some(bookmark.id.as_str()));
    let stored = SqliteAutoTagRepository::try_new(&conn)
        .unwrap()
        .get_nodejs_project(4242, "apps/web")
        .unwrap()
        .unwrap();
    assert_eq!(stored, again.project);
}

#[test]
fn auto_tag_bookmark_only_attaches() {
    let conn = open_db_in_memory().unwrap();
    seed_rules(&conn, &[("nextjs", "next")]);
    let bookmark_service = bookmarks(&conn);
    let manual = bookmark_service.create_tag(USER, "manual").unwrap();
    let bookmark = bookmark_service
        .create_bookmark(USER, "https://example.com/app", &UrlOnlyUnfurler)
        .unwrap();
    bookmark_service
        .set_bookmark_tags(USER, &bookmark.id, &[manual.name.clone()])
        .unwrap();
    let service = service(&conn);

    let attached = service
        .auto_tag_bookmark(USER, &bookmark.id, &dependencies(&["next"]))
        .unwrap();
    assert_eq!(attached, 1);
    let attached_again = service
        .auto_tag_bookmark(USER, &bookmark.id, &dependencies(&["next"]))
        .unwrap();
    assert_eq!(attached_again, 0);

    let tagged = bookmark_service.get_bookmark(USER, &bookmark.id).unwrap();
    let names: Vec<&str> = tagged.tags.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(names, vec!["manual", "nextjs"]);
}

#[test]
fn import_project_rejects_bad_input_before_fetching() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let host = FakeCodeHost {
        files: HashMap::new(),
    };

    let err = service
        .import_project(USER, "https://gitlab.com/acme/site", None, &host)
        .unwrap_err();
    assert!(matches!(err, AutoTagServiceError::InvalidRepositoryUrl(_)));

    let err = service
        .import_project(USER, "https://github.com/acme/site", Some("bm_missing"), &host)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .import_project(USER, "https://github.com/acme/site", None, &host)
        .unwrap_err();
    assert!(matches!(err, AutoTagServiceError::External(_)));

    let err = service
        .import_project(None, "https://github.com/acme/site", None, &host)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[test]
fn configured_required_packages_gate_users_without_their_own() {
    let conn = open_db_in_memory().unwrap();
    let config = CoreConfig::default().with_overrides(|key| {
        (key == "QUADMARK_REQUIRED_PACKAGES").then(|| "react, vite".to_string())
    });
    let service = AutoTagService::new(
        SqliteAutoTagRepository::try_new(&conn).unwrap(),
        SqliteBookmarkRepository::try_new(&conn).unwrap(),
    )
    .with_fallback_required_packages(config.required_packages.clone());
    let host = FakeCodeHost::with_manifest(
        "package.json",
        serde_json::json!({ "devDependencies": { "vite": "^5" } }),
    );

    assert_eq!(
        service.effective_required_packages(USER).unwrap(),
        vec!["react".to_string(), "vite".to_string()]
    );
    assert!(service
        .import_project(USER, "https://github.com/acme/site", None, &host)
        .is_ok());

    service.add_required_package(USER, "next").unwrap();
    assert_eq!(
        service.effective_required_packages(USER).unwrap(),
        vec!["next".to_string()]
    );
    let err = service
        .import_project(USER, "https://github.com/acme/site", None, &host)
        .unwrap_err();
    assert!(matches!(err, AutoTagServiceError::RequiredPackageMissing { .. }));
}
