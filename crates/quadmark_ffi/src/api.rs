//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Own topic board sessions between drag gestures.
//! - Build auto-tag services with the configured fallback required packages.
//! - Convert core errors into response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - A board session belongs to one user and one topic.
//! - A drop that cannot reach storage leaves its session idle.
//! - Configuration is resolved once per process.

use log::warn;
use once_cell::sync::Lazy;
use quadmark_core::board::{BoardController, BoardEntity, BoardError};
use quadmark_core::db::open_db;
use quadmark_core::model::auto_tag::{AutoTag, GithubRepo};
use quadmark_core::model::ids::{generate_id, BOARD_SESSION_PREFIX};
use quadmark_core::model::item::Item;
use quadmark_core::model::topic::Topic;
use quadmark_core::repo::auto_tag_repo::SqliteAutoTagRepository;
use quadmark_core::repo::bookmark_repo::SqliteBookmarkRepository;
use quadmark_core::repo::topic_repo::SqliteTopicRepository;
use quadmark_core::service::auto_tag_service::{AutoTagService, AutoTagServiceError};
use quadmark_core::service::bookmark_service::{BookmarkService, BookmarkServiceError};
use quadmark_core::service::external::{CodeHost, ExternalError, UrlOnlyUnfurler};
use quadmark_core::service::topic_service::{TopicService, TopicServiceError};
use quadmark_core::{
    core_version as core_version_inner, init_logging as init_logging_inner,
    init_logging_from_config, ping as ping_inner, CoreConfig, ErrorKind, RepoError,
};
use rusqlite::Connection;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

static CORE_CONFIG: OnceLock<CoreConfig> = OnceLock::new();
static BOARD_SESSIONS: Lazy<Mutex<HashMap<String, BoardSession>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

struct BoardSession {
    user_id: String,
    topic_id: String,
    controller: BoardController,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Initializes logging from `QUADMARK_LOG_LEVEL` / `QUADMARK_LOG_DIR`.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging_from_env() -> String {
    match init_logging_from_config(core_config()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Topic summary for topic pickers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicView {
    pub topic_id: String,
    pub name: String,
    pub icon: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Id of the created entity, if any.
    pub id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
    /// `unauthorized|not_found|validation_failed|persistence_failure` on failure.
    pub error_kind: Option<String>,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: String) -> Self {
        Self {
            ok: true,
            id: Some(id),
            message: message.into(),
            error_kind: None,
        }
    }

    fn done(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: None,
            message: message.into(),
            error_kind: None,
        }
    }

    fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
            error_kind: Some(kind.as_str().to_string()),
        }
    }
}

/// Topic list response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicListResponse {
    pub ok: bool,
    pub topics: Vec<TopicView>,
    pub message: String,
    pub error_kind: Option<String>,
}

/// One card in a quadrant column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardItemView {
    pub item_id: String,
    /// `bookmark|memo`.
    pub item_type: String,
    pub label: String,
}

/// One column of the board in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardQuadrantView {
    pub quadrant_id: String,
    pub title: String,
    pub is_system: bool,
    pub items: Vec<BoardItemView>,
}

/// Board response envelope returned by every board gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardResponse {
    pub ok: bool,
    pub session_id: Option<String>,
    /// Columns after the gesture; empty on failure.
    pub quadrants: Vec<BoardQuadrantView>,
    /// Assistive-technology message for the gesture, if any.
    pub announcement: Option<String>,
    pub message: String,
    pub error_kind: Option<String>,
}

impl BoardResponse {
    fn snapshot(
        session_id: &str,
        controller: &BoardController,
        announcement: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            ok: true,
            session_id: Some(session_id.to_string()),
            quadrants: board_view(controller),
            announcement,
            message: message.into(),
            error_kind: None,
        }
    }

    fn failure(session_id: Option<&str>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            session_id: session_id.map(str::to_string),
            quadrants: Vec::new(),
            announcement: None,
            message: message.into(),
            error_kind: Some(kind.as_str().to_string()),
        }
    }
}

/// Creates a topic with four default quadrants.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn topic_create(user_id: Option<String>, name: String, icon: String) -> ActionResponse {
    match with_topic_service(|service| service.create_topic(user_id.as_deref(), &name, &icon)) {
        Ok(topic) => ActionResponse::success("Topic created.", topic.id),
        Err((kind, message)) => {
            ActionResponse::failure(kind, format!("topic_create failed: {message}"))
        }
    }
}

/// Lists the caller's topics, newest first.
#[flutter_rust_bridge::frb(sync)]
pub fn topic_list(user_id: Option<String>) -> TopicListResponse {
    match with_topic_service(|service| service.list_topics(user_id.as_deref())) {
        Ok(topics) => TopicListResponse {
            ok: true,
            message: format!("Found {} topic(s).", topics.len()),
            topics: topics.into_iter().map(to_topic_view).collect(),
            error_kind: None,
        },
        Err((kind, message)) => TopicListResponse {
            ok: false,
            topics: Vec::new(),
            message: format!("topic_list failed: {message}"),
            error_kind: Some(kind.as_str().to_string()),
        },
    }
}

/// Adds a memo to a topic and to every open session on that topic.
#[flutter_rust_bridge::frb(sync)]
pub fn memo_add(user_id: Option<String>, topic_id: String, content: String) -> ActionResponse {
    match with_topic_service(|service| service.add_memo(user_id.as_deref(), &topic_id, &content)) {
        Ok(memo) => {
            let mut sessions = lock_sessions();
            for session in sessions.values_mut() {
                if session.topic_id == memo.topic_id {
                    session
                        .controller
                        .insert_item(Item::memo(memo.id.clone(), "", memo.content.clone()));
                }
            }
            ActionResponse::success("Memo added.", memo.id)
        }
        Err((kind, message)) => ActionResponse::failure(kind, format!("memo_add failed: {message}")),
    }
}

/// Saves a URL as a bookmark. Metadata is left empty at this layer.
#[flutter_rust_bridge::frb(sync)]
pub fn bookmark_create(user_id: Option<String>, url: String) -> ActionResponse {
    let result = with_bookmark_service(|service| {
        service.create_bookmark(user_id.as_deref(), &url, &UrlOnlyUnfurler)
    });
    match result {
        Ok(bookmark) => ActionResponse::success("Bookmark created.", bookmark.id),
        Err((kind, message)) => {
            ActionResponse::failure(kind, format!("bookmark_create failed: {message}"))
        }
    }
}

/// Saves a tag name for the caller.
#[flutter_rust_bridge::frb(sync)]
pub fn tag_create(user_id: Option<String>, name: String) -> ActionResponse {
    match with_bookmark_service(|service| service.create_tag(user_id.as_deref(), &name)) {
        Ok(tag) => ActionResponse::success("Tag created.", tag.id),
        Err((kind, message)) => ActionResponse::failure(kind, format!("tag_create failed: {message}")),
    }
}

/// One keyword of an auto tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoTagKeywordView {
    pub keyword_id: String,
    pub keyword: String,
}

/// A tag that is attached automatically when its keywords match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoTagView {
    pub auto_tag_id: String,
    pub tag_id: String,
    pub tag_name: String,
    pub keywords: Vec<AutoTagKeywordView>,
}

/// Auto-tag list response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoTagListResponse {
    pub ok: bool,
    pub auto_tags: Vec<AutoTagView>,
    pub message: String,
    pub error_kind: Option<String>,
}

impl AutoTagListResponse {
    fn from_result(operation: &str, result: Result<Vec<AutoTag>, FfiFailure>) -> Self {
        match result {
            Ok(auto_tags) => Self {
                ok: true,
                message: format!("Found {} auto tag(s).", auto_tags.len()),
                auto_tags: auto_tags.into_iter().map(to_auto_tag_view).collect(),
                error_kind: None,
            },
            Err((kind, message)) => Self {
                ok: false,
                auto_tags: Vec::new(),
                message: format!("{operation} failed: {message}"),
                error_kind: Some(kind.as_str().to_string()),
            },
        }
    }
}

/// Plain string list envelope (package names, tag ids).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameListResponse {
    pub ok: bool,
    pub names: Vec<String>,
    pub message: String,
    pub error_kind: Option<String>,
}

impl NameListResponse {
    fn from_result(operation: &str, result: Result<Vec<String>, FfiFailure>) -> Self {
        match result {
            Ok(names) => Self {
                ok: true,
                message: format!("Found {} name(s).", names.len()),
                names,
                error_kind: None,
            },
            Err((kind, message)) => Self {
                ok: false,
                names: Vec::new(),
                message: format!("{operation} failed: {message}"),
                error_kind: Some(kind.as_str().to_string()),
            },
        }
    }
}

/// Repository metadata the caller already fetched from GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepoInput {
    pub repo_id: i64,
    pub html_url: String,
    pub description: Option<String>,
    pub stargazers_count: i64,
    /// Epoch ms of the last push.
    pub pushed_at: Option<i64>,
}

/// Project import response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectImportResponse {
    pub ok: bool,
    pub project_id: Option<String>,
    /// Tags whose rules fired for the project's dependencies.
    pub matched_tag_ids: Vec<String>,
    pub message: String,
    pub error_kind: Option<String>,
}

/// Lists the caller's auto tags with their keywords.
#[flutter_rust_bridge::frb(sync)]
pub fn auto_tag_list(user_id: Option<String>) -> AutoTagListResponse {
    AutoTagListResponse::from_result(
        "auto_tag_list",
        with_auto_tag_service(|service| service.list_auto_tags(user_id.as_deref())),
    )
}

/// Makes the caller's auto tags equal the named tags.
///
/// Names without a matching tag are skipped.
#[flutter_rust_bridge::frb(sync)]
pub fn auto_tag_replace(user_id: Option<String>, tag_names: Vec<String>) -> AutoTagListResponse {
    AutoTagListResponse::from_result(
        "auto_tag_replace",
        with_auto_tag_service(|service| service.replace_auto_tags(user_id.as_deref(), &tag_names)),
    )
}

/// Adds a dependency-name keyword to an auto tag.
///
/// An existing keyword is reported as success without an id.
#[flutter_rust_bridge::frb(sync)]
pub fn auto_tag_add_keyword(
    user_id: Option<String>,
    auto_tag_id: String,
    keyword: String,
) -> ActionResponse {
    match with_auto_tag_service(|service| {
        service.add_keyword(user_id.as_deref(), &auto_tag_id, &keyword)
    }) {
        Ok(Some(keyword)) => ActionResponse::success("Keyword added.", keyword.id),
        Ok(None) => ActionResponse::done("Keyword already exists."),
        Err((kind, message)) => {
            ActionResponse::failure(kind, format!("auto_tag_add_keyword failed: {message}"))
        }
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn auto_tag_delete_keyword(user_id: Option<String>, keyword_id: String) -> ActionResponse {
    match with_auto_tag_service(|service| service.delete_keyword(user_id.as_deref(), &keyword_id)) {
        Ok(()) => ActionResponse::done("Keyword deleted."),
        Err((kind, message)) => {
            ActionResponse::failure(kind, format!("auto_tag_delete_keyword failed: {message}"))
        }
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn required_package_add(user_id: Option<String>, package_name: String) -> ActionResponse {
    match with_auto_tag_service(|service| {
        service.add_required_package(user_id.as_deref(), &package_name)
    }) {
        Ok(package) => ActionResponse::success("Required package added.", package.id),
        Err((kind, message)) => {
            ActionResponse::failure(kind, format!("required_package_add failed: {message}"))
        }
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn required_package_delete(user_id: Option<String>, package_id: String) -> ActionResponse {
    match with_auto_tag_service(|service| {
        service.delete_required_package(user_id.as_deref(), &package_id)
    }) {
        Ok(()) => ActionResponse::done("Required package deleted."),
        Err((kind, message)) => {
            ActionResponse::failure(kind, format!("required_package_delete failed: {message}"))
        }
    }
}

/// Package names the project import gate applies for the caller.
///
/// Falls back to `QUADMARK_REQUIRED_PACKAGES` when the caller has none.
#[flutter_rust_bridge::frb(sync)]
pub fn required_package_effective(user_id: Option<String>) -> NameListResponse {
    NameListResponse::from_result(
        "required_package_effective",
        with_auto_tag_service(|service| service.effective_required_packages(user_id.as_deref())),
    )
}

/// Tag ids the caller's auto-tag rules assign to `dependency_names`.
#[flutter_rust_bridge::frb(sync)]
pub fn auto_tag_match(user_id: Option<String>, dependency_names: Vec<String>) -> NameListResponse {
    let dependencies = dependency_set(dependency_names);
    NameListResponse::from_result(
        "auto_tag_match",
        with_auto_tag_service(|service| {
            service
                .match_dependencies(user_id.as_deref(), &dependencies)
                .map(|tag_ids| tag_ids.into_iter().collect())
        }),
    )
}

/// Attaches the tags matching `dependency_names` to a bookmark.
#[flutter_rust_bridge::frb(sync)]
pub fn bookmark_auto_tag(
    user_id: Option<String>,
    bookmark_id: String,
    dependency_names: Vec<String>,
) -> ActionResponse {
    let dependencies = dependency_set(dependency_names);
    match with_auto_tag_service(|service| {
        service.auto_tag_bookmark(user_id.as_deref(), &bookmark_id, &dependencies)
    }) {
        Ok(attached) => ActionResponse::success(format!("Attached {attached} tag(s)."), bookmark_id),
        Err((kind, message)) => {
            ActionResponse::failure(kind, format!("bookmark_auto_tag failed: {message}"))
        }
    }
}

/// Records a Node.js project from a GitHub URL and tags its bookmark.
///
/// Input semantics:
/// - `repository` and `package_json` are fetched by the caller; no network
///   access happens here.
/// - `bookmark_id`, when given, receives the matched tags.
///
/// # FFI contract
/// - Rejects projects without any effective required package
///   (`validation_failed`) before writing.
#[flutter_rust_bridge::frb(sync)]
pub fn project_import(
    user_id: Option<String>,
    url: String,
    bookmark_id: Option<String>,
    repository: GithubRepoInput,
    package_json: String,
) -> ProjectImportResponse {
    let host = PrefetchedRepository {
        repository: &repository,
        package_json: &package_json,
    };
    match with_auto_tag_service(|service| {
        service.import_project(user_id.as_deref(), &url, bookmark_id.as_deref(), &host)
    }) {
        Ok(import) => ProjectImportResponse {
            ok: true,
            project_id: Some(import.project.id),
            message: format!("Project imported with {} tag(s).", import.matched_tag_ids.len()),
            matched_tag_ids: import.matched_tag_ids.into_iter().collect(),
            error_kind: None,
        },
        Err((kind, message)) => ProjectImportResponse {
            ok: false,
            project_id: None,
            matched_tag_ids: Vec::new(),
            message: format!("project_import failed: {message}"),
            error_kind: Some(kind.as_str().to_string()),
        },
    }
}

/// Loads a topic board and opens a drag session over it.
#[flutter_rust_bridge::frb(sync)]
pub fn board_open(user_id: Option<String>, topic_id: String) -> BoardResponse {
    let controller =
        match with_topic_service(|service| service.open_board(user_id.as_deref(), &topic_id)) {
            Ok(controller) => controller,
            Err((kind, message)) => {
                return BoardResponse::failure(None, kind, format!("board_open failed: {message}"))
            }
        };
    let session_id = generate_id(BOARD_SESSION_PREFIX);
    let response = BoardResponse::snapshot(&session_id, &controller, None, "Board opened.");
    lock_sessions().insert(
        session_id,
        BoardSession {
            user_id: user_id.unwrap_or_default().trim().to_string(),
            topic_id,
            controller,
        },
    );
    response
}

/// Applies a keyword filter to the session's visible items.
#[flutter_rust_bridge::frb(sync)]
pub fn board_set_filter(session_id: String, keyword: String) -> BoardResponse {
    with_session(&session_id, |session| {
        session.controller.set_filter(&keyword);
        Ok((None, "Filter applied."))
    })
}

/// Starts dragging a quadrant or an item.
///
/// `entity_kind` is `quadrant` or `item`.
#[flutter_rust_bridge::frb(sync)]
pub fn board_drag_start(session_id: String, entity_kind: String, entity_id: String) -> BoardResponse {
    let Some(active) = parse_entity(&entity_kind, &entity_id) else {
        return invalid_entity(&session_id, &entity_kind);
    };
    with_session(&session_id, |session| {
        let announcement = session.controller.drag_start(active).map_err(board_failure)?;
        Ok((announcement, "Drag started."))
    })
}

/// Updates the speculative arrangement for the current target.
///
/// `entity_kind = None` means the pointer is over nothing.
#[flutter_rust_bridge::frb(sync)]
pub fn board_drag_over(
    session_id: String,
    entity_kind: Option<String>,
    entity_id: Option<String>,
) -> BoardResponse {
    let over = match parse_target(entity_kind.as_deref(), entity_id.as_deref()) {
        Ok(over) => over,
        Err(kind) => return invalid_entity(&session_id, &kind),
    };
    with_session(&session_id, |session| {
        let announcement = session.controller.drag_over(over).map_err(board_failure)?;
        Ok((announcement, "Drag updated."))
    })
}

/// Drops the active entity and saves changed item arrangements.
///
/// On a save failure the envelope reports `persistence_failure` and the
/// session keeps the new arrangement; reopen the board to resync. When the
/// topic cannot be loaded at all, the drag is cancelled instead.
#[flutter_rust_bridge::frb(sync)]
pub fn board_drag_end(
    session_id: String,
    entity_kind: Option<String>,
    entity_id: Option<String>,
) -> BoardResponse {
    let over = match parse_target(entity_kind.as_deref(), entity_id.as_deref()) {
        Ok(over) => over,
        Err(kind) => return invalid_entity(&session_id, &kind),
    };
    with_session(&session_id, |session| {
        let conn = open_connection().map_err(|failure| abandon_drag(session, failure))?;
        let service = topic_service(&conn).map_err(|failure| abandon_drag(session, failure))?;
        let store = service
            .board_store(Some(session.user_id.as_str()), &session.topic_id)
            .map_err(|err| abandon_drag(session, topic_failure(err)))?;
        let outcome = session
            .controller
            .drag_end(over, &store)
            .map_err(board_failure)?;
        let message = if outcome.saved.is_some() {
            "Board saved."
        } else {
            "Drop applied."
        };
        Ok((outcome.announcement, message))
    })
}

/// Abandons the active drag and restores the committed arrangement.
#[flutter_rust_bridge::frb(sync)]
pub fn board_drag_cancel(session_id: String) -> BoardResponse {
    with_session(&session_id, |session| {
        let announcement = session.controller.drag_cancel().map_err(board_failure)?;
        Ok((announcement, "Drag cancelled."))
    })
}

/// Drops a board session. Unknown ids are ignored.
#[flutter_rust_bridge::frb(sync)]
pub fn board_close(session_id: String) -> bool {
    lock_sessions().remove(&session_id).is_some()
}

type FfiFailure = (ErrorKind, String);

fn core_config() -> &'static CoreConfig {
    CORE_CONFIG.get_or_init(CoreConfig::from_env)
}

fn open_connection() -> Result<Connection, FfiFailure> {
    open_db(&core_config().db_path)
        .map_err(|err| (ErrorKind::PersistenceFailure, format!("DB open failed: {err}")))
}

fn repo_init_failure(err: RepoError) -> FfiFailure {
    (ErrorKind::PersistenceFailure, format!("repo init failed: {err}"))
}

fn topic_service(
    conn: &Connection,
) -> Result<TopicService<SqliteTopicRepository<'_>, SqliteBookmarkRepository<'_>>, FfiFailure> {
    let topics = SqliteTopicRepository::try_new(conn).map_err(repo_init_failure)?;
    let bookmarks = SqliteBookmarkRepository::try_new(conn).map_err(repo_init_failure)?;
    Ok(TopicService::new(topics, bookmarks))
}

fn with_bookmark_service<T>(
    f: impl FnOnce(&BookmarkService<SqliteBookmarkRepository<'_>>) -> Result<T, BookmarkServiceError>,
) -> Result<T, FfiFailure> {
    let conn = open_connection()?;
    let repo = SqliteBookmarkRepository::try_new(&conn).map_err(repo_init_failure)?;
    f(&BookmarkService::new(repo)).map_err(|err| (err.kind(), err.to_string()))
}

type SqliteAutoTagService<'conn> =
    AutoTagService<SqliteAutoTagRepository<'conn>, SqliteBookmarkRepository<'conn>>;

fn with_auto_tag_service<T>(
    f: impl FnOnce(&SqliteAutoTagService<'_>) -> Result<T, AutoTagServiceError>,
) -> Result<T, FfiFailure> {
    let conn = open_connection()?;
    let rules = SqliteAutoTagRepository::try_new(&conn).map_err(repo_init_failure)?;
    let bookmarks = SqliteBookmarkRepository::try_new(&conn).map_err(repo_init_failure)?;
    let service = AutoTagService::new(rules, bookmarks)
        .with_fallback_required_packages(core_config().required_packages.clone());
    f(&service).map_err(|err| (err.kind(), err.to_string()))
}

/// Serves one already-fetched repository and its package.json.
struct PrefetchedRepository<'a> {
    repository: &'a GithubRepoInput,
    package_json: &'a str,
}

impl CodeHost for PrefetchedRepository<'_> {
    fn repository(&self, owner: &str, repo: &str) -> Result<GithubRepo, ExternalError> {
        let html_url = match self.repository.html_url.trim() {
            "" => format!("https://github.com/{owner}/{repo}"),
            url => url.to_string(),
        };
        Ok(GithubRepo {
            id: self.repository.repo_id,
            owner: owner.to_string(),
            name: repo.to_string(),
            full_name: format!("{owner}/{repo}"),
            html_url,
            description: self.repository.description.clone(),
            stargazers_count: self.repository.stargazers_count,
            pushed_at: self.repository.pushed_at,
        })
    }

    fn file_content(
        &self,
        _owner: &str,
        _repo: &str,
        _git_ref: Option<&str>,
        _path: &str,
    ) -> Result<String, ExternalError> {
        Ok(self.package_json.to_string())
    }
}

fn dependency_set(names: Vec<String>) -> BTreeSet<String> {
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn with_topic_service<T>(
    f: impl FnOnce(
        &TopicService<SqliteTopicRepository<'_>, SqliteBookmarkRepository<'_>>,
    ) -> Result<T, TopicServiceError>,
) -> Result<T, FfiFailure> {
    let conn = open_connection()?;
    let service = topic_service(&conn)?;
    f(&service).map_err(topic_failure)
}

fn with_session(
    session_id: &str,
    f: impl FnOnce(&mut BoardSession) -> Result<(Option<String>, &'static str), FfiFailure>,
) -> BoardResponse {
    let mut sessions = lock_sessions();
    let Some(session) = sessions.get_mut(session_id) else {
        return BoardResponse::failure(
            Some(session_id),
            ErrorKind::NotFound,
            format!("board session not found: {session_id}"),
        );
    };
    match f(session) {
        Ok((announcement, message)) => {
            BoardResponse::snapshot(session_id, &session.controller, announcement, message)
        }
        Err((kind, message)) => {
            let mut response = BoardResponse::failure(Some(session_id), kind, message);
            if kind == ErrorKind::PersistenceFailure {
                response.quadrants = board_view(&session.controller);
            }
            response
        }
    }
}

fn lock_sessions() -> MutexGuard<'static, HashMap<String, BoardSession>> {
    BOARD_SESSIONS.lock().unwrap_or_else(|poisoned| {
        warn!("event=board_sessions module=ffi status=recovered reason=poisoned_lock");
        PoisonError::into_inner(poisoned)
    })
}

fn abandon_drag(session: &mut BoardSession, failure: FfiFailure) -> FfiFailure {
    if session.controller.drag_cancel().is_ok() {
        warn!(
            "event=board_drag_end module=ffi status=cancelled error_kind={}",
            failure.0.as_str()
        );
    }
    failure
}

fn board_failure(err: BoardError) -> FfiFailure {
    (err.kind(), err.to_string())
}

fn topic_failure(err: TopicServiceError) -> FfiFailure {
    (err.kind(), err.to_string())
}

fn invalid_entity(session_id: &str, entity_kind: &str) -> BoardResponse {
    BoardResponse::failure(
        Some(session_id),
        ErrorKind::ValidationFailed,
        format!("unsupported entity kind: `{entity_kind}`"),
    )
}

fn parse_entity(kind: &str, id: &str) -> Option<BoardEntity> {
    match kind.trim() {
        "quadrant" => Some(BoardEntity::Quadrant(id.to_string())),
        "item" => Some(BoardEntity::Item(id.to_string())),
        _ => None,
    }
}

fn parse_target(kind: Option<&str>, id: Option<&str>) -> Result<Option<BoardEntity>, String> {
    match (kind, id) {
        (Some(kind), Some(id)) => parse_entity(kind, id).map(Some).ok_or_else(|| kind.to_string()),
        _ => Ok(None),
    }
}

fn board_view(controller: &BoardController) -> Vec<BoardQuadrantView> {
    controller
        .quadrants()
        .iter()
        .map(|quadrant| BoardQuadrantView {
            quadrant_id: quadrant.id.clone(),
            title: quadrant.title.clone(),
            is_system: quadrant.is_system(),
            items: controller
                .visible_items(&quadrant.id)
                .into_iter()
                .map(|item| BoardItemView {
                    item_id: item.id.clone(),
                    item_type: item.kind().as_str().to_string(),
                    label: item.label().to_string(),
                })
                .collect(),
        })
        .collect()
}

fn to_auto_tag_view(auto_tag: AutoTag) -> AutoTagView {
    AutoTagView {
        auto_tag_id: auto_tag.id,
        tag_id: auto_tag.tag.id,
        tag_name: auto_tag.tag.name,
        keywords: auto_tag
            .keywords
            .into_iter()
            .map(|keyword| AutoTagKeywordView {
                keyword_id: keyword.id,
                keyword: keyword.keyword,
            })
            .collect(),
    }
}

fn to_topic_view(topic: Topic) -> TopicView {
    TopicView {
        topic_id: topic.id,
        name: topic.name,
        icon: topic.icon,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        auto_tag_add_keyword, auto_tag_delete_keyword, auto_tag_list, auto_tag_match,
        auto_tag_replace, board_close, board_drag_cancel, board_drag_end, board_drag_over,
        board_drag_start, board_open, bookmark_auto_tag, bookmark_create, core_config,
        core_version, init_logging, memo_add, ping, project_import, required_package_add,
        required_package_delete, required_package_effective, tag_create, topic_create, topic_list,
        BoardResponse, GithubRepoInput,
    };
    use quadmark_core::db::open_db;
    use quadmark_core::model::ids::generate_id;

    fn user() -> Option<String> {
        Some(generate_id("user"))
    }

    fn column<'a>(board: &'a BoardResponse, quadrant_id: &str) -> Vec<&'a str> {
        board
            .quadrants
            .iter()
            .find(|quadrant| quadrant.quadrant_id == quadrant_id)
            .map(|quadrant| quadrant.items.iter().map(|item| item.item_id.as_str()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn topic_create_requires_user() {
        let response = topic_create(None, "Reading".to_string(), String::new());
        assert!(!response.ok);
        assert_eq!(response.error_kind.as_deref(), Some("unauthorized"));
    }

    #[test]
    fn topic_list_returns_created_topic() {
        let user_id = user();
        let created = topic_create(user_id.clone(), "Reading".to_string(), "📚".to_string());
        assert!(created.ok, "{}", created.message);

        let listed = topic_list(user_id);
        assert!(listed.ok, "{}", listed.message);
        assert_eq!(listed.topics.len(), 1);
        assert_eq!(Some(listed.topics[0].topic_id.clone()), created.id);
    }

    #[test]
    fn board_session_moves_bookmark_into_quadrant_and_persists() {
        let user_id = user();
        let topic_id = topic_create(user_id.clone(), "Work".to_string(), String::new())
            .id
            .expect("topic id");
        let bookmark_id = bookmark_create(user_id.clone(), "https://example.com/a".to_string())
            .id
            .expect("bookmark id");

        let opened = board_open(user_id.clone(), topic_id.clone());
        assert!(opened.ok, "{}", opened.message);
        assert_eq!(opened.quadrants.len(), 6);
        assert_eq!(column(&opened, "q-1"), vec![bookmark_id.as_str()]);
        let session_id = opened.session_id.clone().expect("session id");
        let first_quadrant = opened.quadrants[0].quadrant_id.clone();

        let started = board_drag_start(session_id.clone(), "item".to_string(), bookmark_id.clone());
        assert!(started.ok, "{}", started.message);
        assert!(started.announcement.is_some());

        let over = board_drag_over(
            session_id.clone(),
            Some("quadrant".to_string()),
            Some(first_quadrant.clone()),
        );
        assert_eq!(column(&over, &first_quadrant), vec![bookmark_id.as_str()]);

        let ended = board_drag_end(
            session_id.clone(),
            Some("quadrant".to_string()),
            Some(first_quadrant.clone()),
        );
        assert!(ended.ok, "{}", ended.message);
        assert_eq!(ended.message, "Board saved.");
        assert!(board_close(session_id));

        let reopened = board_open(user_id, topic_id);
        assert_eq!(column(&reopened, &first_quadrant), vec![bookmark_id.as_str()]);
        assert!(column(&reopened, "q-1").is_empty());
        assert!(board_close(reopened.session_id.expect("session id")));
    }

    #[test]
    fn board_drag_cancel_restores_committed_arrangement() {
        let user_id = user();
        let topic_id = topic_create(user_id.clone(), "Ideas".to_string(), String::new())
            .id
            .expect("topic id");
        let memo = memo_add(user_id.clone(), topic_id.clone(), "draft".to_string());
        assert!(memo.ok, "{}", memo.message);
        let memo_id = memo.id.expect("memo id");

        let opened = board_open(user_id, topic_id);
        let session_id = opened.session_id.clone().expect("session id");
        let target = opened.quadrants[1].quadrant_id.clone();

        board_drag_start(session_id.clone(), "item".to_string(), memo_id.clone());
        board_drag_over(session_id.clone(), Some("quadrant".to_string()), Some(target.clone()));
        let cancelled = board_drag_cancel(session_id.clone());
        assert!(cancelled.ok, "{}", cancelled.message);
        assert!(column(&cancelled, &target).is_empty());
        assert_eq!(column(&cancelled, "q-2"), vec![memo_id.as_str()]);

        let again = board_drag_cancel(session_id.clone());
        assert!(!again.ok);
        assert_eq!(again.error_kind.as_deref(), Some("validation_failed"));
        board_close(session_id);
    }

    #[test]
    fn board_calls_reject_unknown_session_and_entity_kind() {
        let missing = board_drag_cancel("brd_missing".to_string());
        assert_eq!(missing.error_kind.as_deref(), Some("not_found"));

        let invalid = board_drag_start("brd_missing".to_string(), "card".to_string(), "x".to_string());
        assert_eq!(invalid.error_kind.as_deref(), Some("validation_failed"));
        assert!(!board_close("brd_missing".to_string()));
    }

    #[test]
    fn drop_on_a_vanished_topic_leaves_session_ready_for_a_new_drag() {
        let user_id = user();
        let topic_id = topic_create(user_id.clone(), "Scratch".to_string(), String::new())
            .id
            .expect("topic id");
        let memo_id = memo_add(user_id.clone(), topic_id.clone(), "todo".to_string())
            .id
            .expect("memo id");
        let opened = board_open(user_id, topic_id.clone());
        let session_id = opened.session_id.clone().expect("session id");
        let target = opened.quadrants[0].quadrant_id.clone();

        let started = board_drag_start(session_id.clone(), "item".to_string(), memo_id.clone());
        assert!(started.ok, "{}", started.message);

        let conn = open_db(&core_config().db_path).expect("open db");
        conn.execute("DELETE FROM bookmark_topics WHERE id = ?1", [&topic_id])
            .expect("delete topic");

        let ended = board_drag_end(
            session_id.clone(),
            Some("quadrant".to_string()),
            Some(target),
        );
        assert!(!ended.ok);
        assert_eq!(ended.error_kind.as_deref(), Some("not_found"));

        let restarted = board_drag_start(session_id.clone(), "item".to_string(), memo_id.clone());
        assert!(restarted.ok, "{}", restarted.message);
        assert_eq!(column(&restarted, "q-2"), vec![memo_id.as_str()]);
        assert!(board_close(session_id));
    }

    #[test]
    fn auto_tag_rules_match_dependencies_and_tag_bookmarks() {
        let user_id = user();
        let tag_id = tag_create(user_id.clone(), "nextjs".to_string())
            .id
            .expect("tag id");

        let replaced = auto_tag_replace(user_id.clone(), vec!["nextjs".to_string(), "ghost".to_string()]);
        assert!(replaced.ok, "{}", replaced.message);
        assert_eq!(replaced.auto_tags.len(), 1);
        let auto_tag_id = replaced.auto_tags[0].auto_tag_id.clone();

        let added = auto_tag_add_keyword(user_id.clone(), auto_tag_id.clone(), " next ".to_string());
        assert!(added.ok, "{}", added.message);
        let keyword_id = added.id.expect("keyword id");
        let again = auto_tag_add_keyword(user_id.clone(), auto_tag_id.clone(), "next".to_string());
        assert!(again.ok);
        assert!(again.id.is_none());
        let short = auto_tag_add_keyword(user_id.clone(), auto_tag_id, "ne".to_string());
        assert_eq!(short.error_kind.as_deref(), Some("validation_failed"));

        let matched = auto_tag_match(user_id.clone(), vec!["react".to_string(), "next".to_string()]);
        assert_eq!(matched.names, vec![tag_id]);

        let bookmark_id = bookmark_create(user_id.clone(), "https://example.com/next".to_string())
            .id
            .expect("bookmark id");
        let tagged = bookmark_auto_tag(user_id.clone(), bookmark_id, vec!["next".to_string()]);
        assert!(tagged.ok, "{}", tagged.message);
        assert_eq!(tagged.message, "Attached 1 tag(s).");

        assert!(auto_tag_delete_keyword(user_id.clone(), keyword_id).ok);
        let listed = auto_tag_list(user_id);
        assert!(listed.auto_tags[0].keywords.is_empty());
    }

    #[test]
    fn project_import_gates_on_configured_required_packages() {
        let user_id = user();
        let repository = GithubRepoInput {
            repo_id: 77,
            html_url: String::new(),
            description: None,
            stargazers_count: 0,
            pushed_at: None,
        };
        let manifest = r#"{"dependencies":{"left-pad":"^1"}}"#.to_string();

        let effective = required_package_effective(user_id.clone());
        assert_eq!(effective.names, core_config().required_packages);

        let rejected = project_import(
            user_id.clone(),
            "https://github.com/acme/pad".to_string(),
            None,
            repository.clone(),
            manifest.clone(),
        );
        assert_eq!(rejected.error_kind.as_deref(), Some("validation_failed"));

        let package_id = required_package_add(user_id.clone(), "left-pad".to_string())
            .id
            .expect("package id");
        assert_eq!(
            required_package_effective(user_id.clone()).names,
            vec!["left-pad".to_string()]
        );
        let imported = project_import(
            user_id.clone(),
            "https://github.com/acme/pad".to_string(),
            None,
            repository,
            manifest,
        );
        assert!(imported.ok, "{}", imported.message);
        assert!(imported.project_id.is_some());

        assert!(required_package_delete(user_id.clone(), package_id).ok);
        assert_eq!(
            required_package_effective(user_id).names,
            core_config().required_packages
        );
    }
}
