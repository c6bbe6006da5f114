use std::future::Future;

use super::model::book::Book;
use super::model::wishlist::Wishlist;

/// ウィッシュリスト永続化の抽象。Infra層が実装する。
///
/// loadは未保存ならNone。saveは全体を丸ごと上書きする。
pub trait WishlistRepository {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self) -> Result<Option<Wishlist>, Self::Error>;
    fn save(&self, wishlist: &Wishlist) -> Result<(), Self::Error>;
}

/// カタログ取得元の抽象。Infra層が実装する。
pub trait CatalogSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch(&self) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send;
}
