//! MCP Server for bookshelf-mcp
//!
//! MCP Protocol (stdio) <-> domain::Catalog / application::WishlistService
//!
//! 8 tools: browse, search, topic, topics, page, refresh, wishlist, wishlist_edit

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use rmcp::{
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::error::AppError;
use crate::application::service::{CatalogService, WishlistService};
use crate::domain::model::book::Book;
use crate::domain::model::catalog::Catalog;
use crate::domain::model::id::BookId;
use crate::domain::model::wishlist::{Toggle, Wishlist};
use crate::infra::gutendex::GutendexClient;
use crate::infra::json_store::JsonWishlistRepository;

// =============================================================================
// Public entry point
// =============================================================================

/// MCP Serverを起動する。wishlist_pathはウィッシュリストの永続化先ファイル。
pub async fn run(wishlist_path: PathBuf) -> anyhow::Result<()> {
    let server = BookshelfMcpServer::new(wishlist_path);

    // 起動時の1回きりのカタログ取得。失敗は観測側に報告済みなので
    // 空カタログのまま上がる。
    let _ = server.load_catalog().await;

    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

// =============================================================================
// MCP Server
// =============================================================================

#[derive(Clone)]
struct BookshelfMcpServer {
    catalog: Arc<RwLock<Catalog>>,
    wishlist: Arc<RwLock<WishlistService<JsonWishlistRepository>>>,
    catalog_service: Arc<CatalogService<GutendexClient>>,
    tool_router: ToolRouter<Self>,
}

impl BookshelfMcpServer {
    fn new(wishlist_path: PathBuf) -> Self {
        let repo = JsonWishlistRepository::new(wishlist_path);
        Self {
            catalog: Arc::new(RwLock::new(Catalog::new())),
            wishlist: Arc::new(RwLock::new(WishlistService::open(repo))),
            catalog_service: Arc::new(CatalogService::new(GutendexClient::new())),
            tool_router: Self::tool_router(),
        }
    }

    /// カタログを1回取得して反映し、結果メッセージを返す。
    /// 取得中に新しいロードが始まっていた場合、この結果は捨てられる。
    async fn load_catalog(&self) -> Result<String, McpError> {
        let ticket = {
            let mut catalog = self
                .catalog
                .write()
                .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
            catalog.begin_load()
        };

        let books = self
            .catalog_service
            .fetch()
            .await
            .map_err(Self::to_mcp_error)?;

        let mut catalog = self
            .catalog
            .write()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
        if catalog.complete_load(ticket, books) {
            info!("catalog loaded: {} books", catalog.book_count());
            Ok(format!("Catalog loaded: {} books.", catalog.book_count()))
        } else {
            Ok("Catalog load superseded by a newer refresh; result discarded.".to_string())
        }
    }

    /// 現在のカタログページを整形して返す。
    fn render_browse(&self) -> Result<String, McpError> {
        let catalog = self
            .catalog
            .read()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
        let wishlist = self
            .wishlist
            .read()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
        Ok(format_browse(&catalog, wishlist.wishlist()))
    }

    /// 番号 or トピック名 → トピック名に解決する。
    fn resolve_topic(&self, topic_ref: &str) -> Result<String, McpError> {
        if let Ok(num) = topic_ref.parse::<usize>() {
            let catalog = self
                .catalog
                .read()
                .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
            let topics = catalog.distinct_topics();
            if num == 0 || num > topics.len() {
                return Err(McpError::invalid_params(
                    format!(
                        "Topic number {} out of range (1-{}). Use `topics` to see available topics.",
                        num,
                        topics.len()
                    ),
                    None,
                ));
            }
            return Ok(topics[num - 1].clone());
        }
        Ok(topic_ref.to_string())
    }

    /// 整数id / タイトル部分一致 → Book に解決する。
    ///
    /// 優先順位:
    /// 1. 整数id — `browse` 出力の番号と対応
    /// 2. カタログ内のタイトル部分一致（case-insensitive、一意なら採用）
    /// 3. ウィッシュリスト内のタイトル部分一致（カタログ未取得時のremove用）
    fn resolve_book(&self, book_ref: &str) -> Result<Book, McpError> {
        if book_ref.is_empty() {
            return Err(McpError::invalid_params("book must not be empty", None));
        }

        let catalog = self
            .catalog
            .read()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
        let wishlist = self
            .wishlist
            .read()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))?;

        // 1. 整数id
        if let Ok(num) = book_ref.parse::<u64>() {
            let id = BookId::new(num);
            if let Some(book) = catalog.find_by_id(id) {
                return Ok(book.clone());
            }
            if let Some(book) = wishlist.wishlist().find(id) {
                return Ok(book.clone());
            }
            return Err(McpError::invalid_params(
                format!("No book with id {num}. Use `browse` to see book ids."),
                None,
            ));
        }

        // 2. カタログ内タイトル部分一致
        let catalog_hits = catalog.find_by_title(book_ref);
        match catalog_hits.len() {
            1 => return Ok(catalog_hits[0].clone()),
            n if n > 1 => {
                return Err(McpError::invalid_params(
                    format!(
                        "Ambiguous title match: '{book_ref}' matches {n} books: {}",
                        catalog_hits
                            .iter()
                            .map(|b| format!("'{}' ({})", b.title, b.id))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    None,
                ))
            }
            _ => {}
        }

        // 3. ウィッシュリスト内タイトル部分一致（フォールバック）
        let wishlist_hits: Vec<&Book> = wishlist
            .wishlist()
            .books()
            .iter()
            .filter(|book| book.title_contains(book_ref))
            .collect();
        match wishlist_hits.len() {
            0 => Err(McpError::invalid_params(
                format!("No book found matching: '{book_ref}'"),
                None,
            )),
            1 => Ok(wishlist_hits[0].clone()),
            n => Err(McpError::invalid_params(
                format!("Ambiguous title match: '{book_ref}' matches {n} wishlisted books"),
                None,
            )),
        }
    }

    fn to_mcp_error(e: AppError) -> McpError {
        McpError::internal_error(format!("{e}"), None)
    }
}

// =============================================================================
// ServerHandler impl
// =============================================================================

impl ServerHandler for BookshelfMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "bookshelf-mcp".to_string(),
                title: Some("Bookshelf MCP — Book Store & Wishlist".to_string()),
                description: Some(
                    "Browse the Gutendex public-domain catalog and keep a persistent wishlist. \
                     2-step workflow: `browse` → pick a book id → `wishlist_edit`."
                        .to_string(),
                ),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Browse public-domain books and manage a wishlist.\n\
                 \n\
                 Intended flow: narrow the catalog with `search` and `topic`, walk pages with \
                 `page`, then `wishlist_edit` books by their id. `wishlist` shows what is saved.\n\
                 \n\
                 Tools: `browse` → `search`/`topic`/`page` → `wishlist_edit`, `wishlist`. \
                 `topics` lists filter choices, `refresh` re-fetches the catalog."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_ctx).await
    }
}

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBrowseRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpSearchRequest {
    #[schemars(description = "Title search text (case-insensitive). Empty string clears it.")]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpTopicRequest {
    #[schemars(
        description = "Topic to filter by: number from `topics` output or the literal topic string. Omit to clear the filter (all topics)."
    )]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpTopicsRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpPageRequest {
    #[schemars(
        description = "Where to go: 'next', 'prev', or an explicit page number (clamped to the valid range)."
    )]
    pub page: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpRefreshRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpWishlistRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpWishlistEditRequest {
    #[schemars(
        description = "Book to edit: integer id from `browse` output, or a unique title fragment."
    )]
    pub book: String,
    #[schemars(description = "Action: 'add', 'remove', or 'toggle'")]
    pub action: String,
}

/// wishlist_editのaction文字列を解釈する。
fn parse_edit_action(s: &str) -> Result<EditAction, McpError> {
    match s {
        "add" => Ok(EditAction::Add),
        "remove" => Ok(EditAction::Remove),
        "toggle" => Ok(EditAction::Toggle),
        other => Err(McpError::invalid_params(
            format!("Unknown action: '{other}'. Use: add, remove, toggle"),
            None,
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditAction {
    Add,
    Remove,
    Toggle,
}

// =============================================================================
// Tool implementations
// =============================================================================

#[tool_router]
impl BookshelfMcpServer {
    #[tool(
        name = "browse",
        description = "Show the current catalog page with book ids, titles, authors and topics. Wishlisted books are marked with ♥. Use the ids with `wishlist_edit`.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn browse(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpBrowseRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            self.render_browse()?,
        )]))
    }

    #[tool(
        name = "search",
        description = "Set the title search text and show the resulting page. Matching is case-insensitive substring. The current page is kept as-is; use `page` to navigate.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn search(
        &self,
        Parameters(req): Parameters<McpSearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        {
            let mut catalog = self
                .catalog
                .write()
                .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
            catalog.set_search_query(req.query);
        }
        Ok(CallToolResult::success(vec![Content::text(
            self.render_browse()?,
        )]))
    }

    #[tool(
        name = "topic",
        description = "Set the topic filter and show the resulting page. Accepts a number from `topics` output or a literal topic string; omit the argument to show all topics again.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn topic(
        &self,
        Parameters(req): Parameters<McpTopicRequest>,
    ) -> Result<CallToolResult, McpError> {
        let topic = match req.topic.as_deref() {
            Some(topic_ref) => self.resolve_topic(topic_ref)?,
            None => String::new(),
        };
        {
            let mut catalog = self
                .catalog
                .write()
                .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
            catalog.set_selected_topic(topic);
        }
        Ok(CallToolResult::success(vec![Content::text(
            self.render_browse()?,
        )]))
    }

    #[tool(
        name = "topics",
        description = "List every distinct topic in the catalog, numbered. Pass a number or the topic string to `topic` to filter by it.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn topics(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpTopicsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let catalog = self
            .catalog
            .read()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
        let topics = catalog.distinct_topics();

        if topics.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "No topics available. The catalog is empty; try `refresh`.",
            )]));
        }

        let mut output = format!("# Topics ({})\n\n", topics.len());
        for (i, topic) in topics.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, topic));
        }
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(
        name = "page",
        description = "Navigate the catalog view: 'next', 'prev', or an explicit page number. Requests past the last page are a no-op.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn page(
        &self,
        Parameters(req): Parameters<McpPageRequest>,
    ) -> Result<CallToolResult, McpError> {
        {
            let mut catalog = self
                .catalog
                .write()
                .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
            match req.page.as_str() {
                "next" => catalog.next_page(),
                "prev" => catalog.prev_page(),
                other => match other.parse::<usize>() {
                    Ok(n) => catalog.set_page(n),
                    Err(_) => {
                        return Err(McpError::invalid_params(
                            format!("Unknown page: '{other}'. Use: next, prev, or a page number"),
                            None,
                        ))
                    }
                },
            }
        }
        Ok(CallToolResult::success(vec![Content::text(
            self.render_browse()?,
        )]))
    }

    #[tool(
        name = "refresh",
        description = "Re-fetch the catalog from the remote source. On failure the current catalog is kept unchanged. A refresh started while an older one is in flight supersedes it.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn refresh(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpRefreshRequest>,
    ) -> Result<CallToolResult, McpError> {
        let message = self.load_catalog().await?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "{}\n\n{}",
            message,
            self.render_browse()?
        ))]))
    }

    #[tool(
        name = "wishlist",
        description = "Show the wishlist with book ids, titles, authors and topics. Remove entries with `wishlist_edit` (action: remove).",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn wishlist(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpWishlistRequest>,
    ) -> Result<CallToolResult, McpError> {
        let wishlist = self
            .wishlist
            .read()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))?;
        Ok(CallToolResult::success(vec![Content::text(
            format_wishlist(wishlist.wishlist()),
        )]))
    }

    #[tool(
        name = "wishlist_edit",
        description = "Add, remove, or toggle a book on the wishlist. Specify the book by id from `browse` output or by a unique title fragment. Every change is persisted immediately.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn wishlist_edit(
        &self,
        Parameters(req): Parameters<McpWishlistEditRequest>,
    ) -> Result<CallToolResult, McpError> {
        let action = parse_edit_action(&req.action)?;
        let book = self.resolve_book(&req.book)?;
        let title = book.title.clone();
        let id = book.id;

        let mut wishlist = self
            .wishlist
            .write()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))?;

        let message = match action {
            EditAction::Add => {
                if wishlist.add(book).map_err(Self::to_mcp_error)? {
                    format!("Added: {id}. {title}")
                } else {
                    format!("Already on the wishlist: {id}. {title}")
                }
            }
            EditAction::Remove => {
                if wishlist.remove(id).map_err(Self::to_mcp_error)? {
                    format!("Removed: {id}. {title}")
                } else {
                    format!("Not on the wishlist: {id}. {title}")
                }
            }
            EditAction::Toggle => match wishlist.toggle(book).map_err(Self::to_mcp_error)? {
                Toggle::Added => format!("Added: {id}. {title}"),
                Toggle::Removed => format!("Removed: {id}. {title}"),
            },
        };

        Ok(CallToolResult::success(vec![Content::text(format!(
            "{} (wishlist: {} books)",
            message,
            wishlist.wishlist().len()
        ))]))
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// カタログの現在ページをブラウズビューとして整形する。
pub fn format_browse(catalog: &Catalog, wishlist: &Wishlist) -> String {
    if catalog.book_count() == 0 {
        return "Catalog is empty. Use `refresh` to fetch it.".to_string();
    }

    let filtered_count = catalog.filtered_view().len();
    let mut output = format!(
        "# Book Store — {} of {} books (page {}/{})\n",
        filtered_count,
        catalog.book_count(),
        catalog.current_page(),
        catalog.page_count()
    );

    let mut filters = Vec::new();
    if !catalog.search_query().is_empty() {
        filters.push(format!("search: \"{}\"", catalog.search_query()));
    }
    if !catalog.selected_topic().is_empty() {
        filters.push(format!("topic: {}", catalog.selected_topic()));
    }
    if !filters.is_empty() {
        output.push_str(&filters.join(" | "));
        output.push('\n');
    }
    output.push('\n');

    let items = catalog.current_page_items();
    if items.is_empty() {
        output.push_str("(no books on this page — use `page` to navigate back)\n");
        return output;
    }

    for book in items {
        output.push_str(&format_book_entry(book, wishlist.contains(book.id)));
    }
    output
}

/// ウィッシュリストビューを整形する。
pub fn format_wishlist(wishlist: &Wishlist) -> String {
    if wishlist.is_empty() {
        return "Wishlist is empty. Pick a book id from `browse` and `wishlist_edit` it."
            .to_string();
    }

    let mut output = format!("# My Wishlist ({} books)\n\n", wishlist.len());
    for book in wishlist.books() {
        output.push_str(&format_book_entry(book, false));
    }
    output
}

/// 1冊ぶんの表示。id・タイトル・著者、続く行にトピックと表紙URL。
fn format_book_entry(book: &Book, wishlisted: bool) -> String {
    let mut entry = format!("{}. {}", book.id, book.title);
    if !book.authors.is_empty() {
        entry.push_str(&format!(" — {}", book.author_names()));
    }
    if wishlisted {
        entry.push_str(" ♥");
    }
    entry.push('\n');
    if !book.subjects.is_empty() {
        entry.push_str(&format!("   topics: {}\n", book.subjects.join(", ")));
    }
    if let Some(url) = book.cover_url() {
        entry.push_str(&format!("   cover: {url}\n"));
    }
    entry
}

// =============================================================================
// Tests
// =============================================================================
