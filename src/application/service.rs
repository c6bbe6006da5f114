use tracing::warn;

use crate::domain::model::book::Book;
use crate::domain::model::id::BookId;
use crate::domain::model::wishlist::{Toggle, Wishlist};
use crate::domain::repository::{CatalogSource, WishlistRepository};

use super::error::AppError;

/// カタログ取得のユースケース。
///
/// 1セッション1回のバルク取得のみ。取得結果をカタログへ反映してよいかは
/// Catalog集約の世代判定（begin_load/complete_load）に委ねる。
pub struct CatalogService<S: CatalogSource> {
    source: S,
}

impl<S: CatalogSource> CatalogService<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// カタログを取得する。失敗は観測用ログに流した上でエラーを返し、
    /// カタログ自体には触れない（呼び出し側が据え置く）。
    pub async fn fetch(&self) -> Result<Vec<Book>, AppError> {
        match self.source.fetch().await {
            Ok(books) => Ok(books),
            Err(e) => {
                warn!("catalog fetch failed: {e}");
                Err(AppError::Fetch(Box::new(e)))
            }
        }
    }
}

/// ウィッシュリストに対するユースケース。
///
/// セッション開始時に一度だけ読み込み、以後はメモリ上のコピーを正とする。
/// 変更は次状態を先に永続化してからコミットする（write-through）。
/// 書き込みに失敗した場合はメモリも変更前のまま残り、両者は常に一致する。
pub struct WishlistService<R: WishlistRepository> {
    repo: R,
    wishlist: Wishlist,
}

impl<R: WishlistRepository> WishlistService<R> {
    /// 永続化済みウィッシュリストを読み込んでServiceを作る。
    /// レコードが無い・読めない場合は空から始める。呼び出し側には失敗を返さない。
    pub fn open(repo: R) -> Self {
        let wishlist = match repo.load() {
            Ok(Some(wishlist)) => wishlist,
            Ok(None) => Wishlist::new(),
            Err(e) => {
                warn!("wishlist store unreadable, starting empty: {e}");
                Wishlist::new()
            }
        };
        Self { repo, wishlist }
    }

    pub fn wishlist(&self) -> &Wishlist {
        &self.wishlist
    }

    pub fn contains(&self, id: BookId) -> bool {
        self.wishlist.contains(id)
    }

    /// 追加する。既存なら何もせずOk(false)。
    pub fn add(&mut self, book: Book) -> Result<bool, AppError> {
        if self.wishlist.contains(book.id) {
            return Ok(false);
        }
        let mut next = self.wishlist.clone();
        next.add(book);
        self.commit(next)?;
        Ok(true)
    }

    /// 削除する。未登録なら何もせずOk(false)。
    pub fn remove(&mut self, id: BookId) -> Result<bool, AppError> {
        if !self.wishlist.contains(id) {
            return Ok(false);
        }
        let mut next = self.wishlist.clone();
        next.remove(id);
        self.commit(next)?;
        Ok(true)
    }

    /// 登録済みならremove、未登録ならadd。
    pub fn toggle(&mut self, book: Book) -> Result<Toggle, AppError> {
        let mut next = self.wishlist.clone();
        let outcome = next.toggle(book);
        self.commit(next)?;
        Ok(outcome)
    }

    // --- private ---

    fn commit(&mut self, next: Wishlist) -> Result<(), AppError> {
        self.repo
            .save(&next)
            .map_err(|e| AppError::Storage(Box::new(e)))?;
        self.wishlist = next;
        Ok(())
    }
}
