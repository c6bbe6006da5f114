use std::collections::BTreeSet;

use super::book::Book;
use super::id::BookId;

/// 1ページあたりの表示件数（固定）。
pub const PAGE_SIZE: usize = 12;

/// 進行中ロードのチケット。世代が古い結果はカタログに反映されない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// カタログ — 集約ルート。取得済み書籍列とセッション内ビュー状態を所有する。
///
/// 書籍列はロード成功時に丸ごと差し替え、それ以外では不変。
/// ビュー状態（検索クエリ・トピック・現在ページ）はセッション限りで永続化しない。
#[derive(Debug, Clone)]
pub struct Catalog {
    books: Vec<Book>,
    search_query: String,
    /// 空文字 = フィルタなし。
    selected_topic: String,
    /// 1始まり。
    current_page: usize,
    generation: u64,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            books: Vec::new(),
            search_query: String::new(),
            selected_topic: String::new(),
            current_page: 1,
            generation: 0,
        }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn selected_topic(&self) -> &str {
        &self.selected_topic
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    // --- ロード ---

    /// ロード開始を宣言し、結果を反映するためのチケットを得る。
    /// 新しい`begin_load`が呼ばれた時点で、それ以前のチケットは失効する。
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    /// 取得結果を反映する。チケットが最新の場合のみ書籍列を丸ごと差し替え、
    /// 失効済みならカタログを変えずにfalseを返す。
    pub fn complete_load(&mut self, ticket: LoadTicket, books: Vec<Book>) -> bool {
        if ticket.0 != self.generation {
            return false;
        }
        self.books = books;
        true
    }

    // --- ビュー状態 ---

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// トピックフィルタを設定する。空文字で解除。
    pub fn set_selected_topic(&mut self, topic: impl Into<String>) {
        self.selected_topic = topic.into();
    }

    /// ページ指定。`[1, ページ総数]`にクランプする。
    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.clamp(1, self.page_count());
    }

    /// 次ページへ。最終ページ以降では何もしない（範囲外の現在ページも動かさない）。
    pub fn next_page(&mut self) {
        if self.current_page < self.page_count() {
            self.current_page += 1;
        }
    }

    /// 前ページへ。1ページ目では何もしない。
    pub fn prev_page(&mut self) {
        if self.current_page > 1 {
            self.current_page -= 1;
        }
    }

    // --- 派生ビュー ---

    /// フィルタ適用後の書籍列。カタログの順序を保った部分列。
    ///
    /// タイトルはcase-insensitiveの部分一致、トピックはcase-sensitiveの
    /// 完全一致（未設定なら素通し）。両条件のAND。
    pub fn filtered_view(&self) -> Vec<&Book> {
        self.books
            .iter()
            .filter(|book| {
                book.title_contains(&self.search_query)
                    && (self.selected_topic.is_empty() || book.has_subject(&self.selected_topic))
            })
            .collect()
    }

    /// フィルタ適用後のページ総数。空でも1（表示上の下限）。
    pub fn page_count(&self) -> usize {
        self.filtered_view().len().div_ceil(PAGE_SIZE).max(1)
    }

    /// 現在ページの書籍列。最終ページは12件未満になり得る。
    /// フィルタ変更で現在ページが範囲外になった場合は空を返す。
    pub fn current_page_items(&self) -> Vec<&Book> {
        let offset = (self.current_page - 1) * PAGE_SIZE;
        self.filtered_view()
            .into_iter()
            .skip(offset)
            .take(PAGE_SIZE)
            .collect()
    }

    /// 全書籍のsubjectsの和集合。重複なし、表示安定のためソート済み。
    pub fn distinct_topics(&self) -> Vec<String> {
        self.books
            .iter()
            .flat_map(|book| book.subjects.iter())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_by_id(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    /// タイトル部分一致（case-insensitive）でカタログ全体を検索する。
    pub fn find_by_title(&self, query: &str) -> Vec<&Book> {
        self.books
            .iter()
            .filter(|book| book.title_contains(query))
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
