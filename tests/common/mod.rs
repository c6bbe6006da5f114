//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bookshelf_mcp::domain::model::book::{Author, Book};
use bookshelf_mcp::domain::model::catalog::Catalog;
use bookshelf_mcp::domain::model::id::BookId;
use bookshelf_mcp::domain::model::wishlist::Wishlist;
use bookshelf_mcp::domain::repository::{CatalogSource, WishlistRepository};

// =============================================================================
// InMemoryRepo — テスト用リポジトリ（localStorage相当の単一キーストア）
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("in-memory store error: {0}")]
pub struct InMemoryError(pub String);

/// ファイルI/O不要のインメモリリポジトリ。cloneはストアを共有するので
/// 「別セッションで開き直す」再読込テストに使える。
#[derive(Clone)]
pub struct InMemoryRepo {
    store: Rc<RefCell<HashMap<String, String>>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            store: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// 生のJSONをストアに直接仕込む（破損データや既存データの再現用）。
    pub fn preload(&self, json: &str) {
        self.store
            .borrow_mut()
            .insert("wishlist".to_string(), json.to_string());
    }

    pub fn raw(&self) -> Option<String> {
        self.store.borrow().get("wishlist").cloned()
    }
}

impl WishlistRepository for InMemoryRepo {
    type Error = InMemoryError;

    fn load(&self) -> Result<Option<Wishlist>, Self::Error> {
        let store = self.store.borrow();
        match store.get("wishlist") {
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(|e| InMemoryError(e.to_string())),
            None => Ok(None),
        }
    }

    fn save(&self, wishlist: &Wishlist) -> Result<(), Self::Error> {
        let json = serde_json::to_string(wishlist).map_err(|e| InMemoryError(e.to_string()))?;
        self.store.borrow_mut().insert("wishlist".to_string(), json);
        Ok(())
    }
}

// =============================================================================
// SaveFailsRepo — 書き込みが必ず失敗するリポジトリ
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("disk full")]
pub struct SaveError;

pub struct SaveFailsRepo;

impl WishlistRepository for SaveFailsRepo {
    type Error = SaveError;

    fn load(&self) -> Result<Option<Wishlist>, Self::Error> {
        Ok(None)
    }

    fn save(&self, _wishlist: &Wishlist) -> Result<(), Self::Error> {
        Err(SaveError)
    }
}

// =============================================================================
// StubSource — テスト用カタログ取得元
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("stub fetch failure")]
pub struct StubFetchError;

pub struct StubSource {
    books: Option<Vec<Book>>,
}

impl StubSource {
    pub fn ok(books: Vec<Book>) -> Self {
        Self { books: Some(books) }
    }

    pub fn failing() -> Self {
        Self { books: None }
    }
}

impl CatalogSource for StubSource {
    type Error = StubFetchError;

    async fn fetch(&self) -> Result<Vec<Book>, StubFetchError> {
        self.books.clone().ok_or(StubFetchError)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn book(id: u64, title: &str) -> Book {
    Book {
        id: BookId::new(id),
        title: title.into(),
        authors: Vec::new(),
        subjects: Vec::new(),
        formats: HashMap::new(),
    }
}

pub fn book_full(
    id: u64,
    title: &str,
    author: &str,
    subjects: &[&str],
    cover: Option<&str>,
) -> Book {
    let mut formats = HashMap::new();
    if let Some(url) = cover {
        formats.insert("image/jpeg".to_string(), url.to_string());
    }
    Book {
        id: BookId::new(id),
        title: title.into(),
        authors: vec![Author {
            name: author.into(),
        }],
        subjects: subjects.iter().map(|s| s.to_string()).collect(),
        formats,
    }
}

/// 標準的なテスト用カタログ:
/// ```text
/// 2701. Moby Dick; Or, The Whale — Melville, Herman [Sea stories, Adventure]
/// 158.  Emma — Austen, Jane [Romance]
/// 1342. Pride and Prejudice — Austen, Jane [Romance, England -- Fiction]
/// ```
pub fn library() -> Vec<Book> {
    vec![
        book_full(
            2701,
            "Moby Dick; Or, The Whale",
            "Melville, Herman",
            &["Sea stories", "Adventure"],
            Some("https://www.gutenberg.org/cache/epub/2701/pg2701.cover.medium.jpg"),
        ),
        book_full(158, "Emma", "Austen, Jane", &["Romance"], None),
        book_full(
            1342,
            "Pride and Prejudice",
            "Austen, Jane",
            &["Romance", "England -- Fiction"],
            None,
        ),
    ]
}

pub fn numbered_books(n: usize) -> Vec<Book> {
    (1..=n as u64)
        .map(|i| {
            let mut b = book(i, &format!("Book {i}"));
            b.subjects = vec!["Fiction".to_string()];
            b
        })
        .collect()
}

/// 書籍列をロード済みのCatalogを作る。
pub fn loaded_catalog(books: Vec<Book>) -> Catalog {
    let mut catalog = Catalog::new();
    let ticket = catalog.begin_load();
    assert!(catalog.complete_load(ticket, books));
    catalog
}

// =============================================================================
// Assertion helpers
// =============================================================================

/// 結果がErrで、メッセージに指定文字列を含むことをassert。
#[allow(dead_code)]
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}
