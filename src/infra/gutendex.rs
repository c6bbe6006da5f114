use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::model::book::Book;
use crate::domain::repository::CatalogSource;

/// カタログの取得先（固定）。クエリパラメータは付けない。
pub const GUTENDEX_ENDPOINT: &str = "https://gutendex.com/books/";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),
}

/// APIレスポンスの外形。resultsのみ使い、件数やページングカーソルは無視する。
#[derive(Debug, Deserialize)]
struct CatalogPage {
    results: Vec<Book>,
}

/// gutendex.com カタログAPIクライアント。
///
/// 1セッション1回のバルク取得のみ。リトライもタイムアウトも持たず、
/// 失敗の扱い（カタログ据え置き）は呼び出し側に任せる。
pub struct GutendexClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GutendexClient {
    pub fn new() -> Self {
        Self::with_endpoint(GUTENDEX_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("bookshelf-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to create HTTP client");
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// カタログを一括取得する。
    pub async fn fetch_catalog(&self) -> Result<Vec<Book>, FetchError> {
        debug!("catalog request: {}", self.endpoint);

        let response = self.http.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("catalog endpoint returned {status}");
            return Err(FetchError::Status(status));
        }

        let page: CatalogPage = response.json().await?;
        debug!("catalog response: {} books", page.results.len());
        Ok(page.results)
    }
}

impl Default for GutendexClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogSource for GutendexClient {
    type Error = FetchError;

    async fn fetch(&self) -> Result<Vec<Book>, FetchError> {
        self.fetch_catalog().await
    }
}
