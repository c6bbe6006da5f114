use std::path::PathBuf;

use crate::domain::model::wishlist::Wishlist;
use crate::domain::repository::WishlistRepository;

#[derive(Debug, thiserror::Error)]
pub enum JsonStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSONファイルによるWishlistRepository実装。
/// 単一の名前空間キーの代わりに1ファイルを使い、BookのJSON配列を丸ごと持つ。
pub struct JsonWishlistRepository {
    path: PathBuf,
}

impl JsonWishlistRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WishlistRepository for JsonWishlistRepository {
    type Error = JsonStoreError;

    fn load(&self) -> Result<Option<Wishlist>, Self::Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let wishlist: Wishlist = serde_json::from_str(&content)?;
        Ok(Some(wishlist))
    }

    fn save(&self, wishlist: &Wishlist) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(wishlist)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::book::Book;
    use crate::domain::model::id::BookId;

    fn book(id: u64, title: &str) -> Book {
        Book {
            id: BookId::new(id),
            title: title.into(),
            authors: Vec::new(),
            subjects: Vec::new(),
            formats: std::collections::HashMap::new(),
        }
    }

    #[test]
    fn roundtrip_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wishlist.json");

        let repo = JsonWishlistRepository::new(&path);

        // 初回loadはNone
        assert!(repo.load().unwrap().is_none());

        let mut wishlist = Wishlist::new();
        wishlist.add(book(2701, "Moby Dick; Or, The Whale"));
        wishlist.add(book(158, "Emma"));

        repo.save(&wishlist).unwrap();

        let loaded = repo.load().unwrap().unwrap();
        assert_eq!(loaded, wishlist);
        assert!(loaded.contains(BookId::new(2701)));
    }

    #[test]
    fn load_propagates_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wishlist.json");
        std::fs::write(&path, "{ not json").unwrap();

        let repo = JsonWishlistRepository::new(&path);
        assert!(matches!(repo.load(), Err(JsonStoreError::Json(_))));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wishlist.json");

        let repo = JsonWishlistRepository::new(&path);
        repo.save(&Wishlist::new()).unwrap();
        assert!(path.exists());
    }
}
