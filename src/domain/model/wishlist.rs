use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::book::Book;
use super::id::BookId;

/// `toggle`で実際に適用された操作。1回の呼び出しで必ずどちらか一方のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// ウィッシュリスト — 集約ルート。idをキーとするBookの集合。
///
/// 追加順を保持し、ワイヤ形式はBookのJSON配列そのもの。
/// membershipはインデックスでO(1)判定する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Book>", into = "Vec<Book>")]
pub struct Wishlist {
    books: Vec<Book>,
    index: HashSet<BookId>,
}

impl Wishlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn contains(&self, id: BookId) -> bool {
        self.index.contains(&id)
    }

    pub fn find(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    /// 追加。既に含まれていれば何もしない（冪等）。追加したらtrue。
    pub fn add(&mut self, book: Book) -> bool {
        if !self.index.insert(book.id) {
            return false;
        }
        self.books.push(book);
        true
    }

    /// 削除。含まれていなければ何もしない（冪等）。削除したらtrue。
    pub fn remove(&mut self, id: BookId) -> bool {
        if !self.index.remove(&id) {
            return false;
        }
        self.books.retain(|book| book.id != id);
        true
    }

    /// 含まれていればremove、いなければadd。
    pub fn toggle(&mut self, book: Book) -> Toggle {
        if self.remove(book.id) {
            Toggle::Removed
        } else {
            self.add(book);
            Toggle::Added
        }
    }
}

/// 永続化形式（JSON配列）からの復元。壊れたストアに同一idが重複して
/// いても最初の1件に畳み込む。
impl From<Vec<Book>> for Wishlist {
    fn from(books: Vec<Book>) -> Self {
        let mut wishlist = Wishlist::new();
        for book in books {
            wishlist.add(book);
        }
        wishlist
    }
}

impl From<Wishlist> for Vec<Book> {
    fn from(wishlist: Wishlist) -> Self {
        wishlist.books
    }
}
