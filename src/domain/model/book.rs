use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::id::BookId;

/// 表紙画像をformatsから引くためのMIMEキー。
pub const COVER_FORMAT: &str = "image/jpeg";

/// カタログAPIが返す著者レコード。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
}

/// カタログAPI由来の書籍レコード。読み取り専用。
///
/// `id`と`title`以外は欠けていても良い（欠落はデフォルト値で埋める）。
/// APIが追加で返すフィールドは無視する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub subjects: Vec<String>,
    /// MIMEタイプ → リソースURL。表紙は`image/jpeg`キー（無い場合もある）。
    #[serde(default)]
    pub formats: HashMap<String, String>,
}

impl Book {
    pub fn cover_url(&self) -> Option<&str> {
        self.formats.get(COVER_FORMAT).map(String::as_str)
    }

    /// タイトル部分一致（case-insensitive）。空クエリは常にtrue。
    pub fn title_contains(&self, query: &str) -> bool {
        self.title.to_lowercase().contains(&query.to_lowercase())
    }

    /// トピック一致（case-sensitive、完全一致）。
    pub fn has_subject(&self, topic: &str) -> bool {
        self.subjects.iter().any(|s| s == topic)
    }

    /// 著者名をカンマ区切りで連結する。
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moby_dick() -> Book {
        serde_json::from_value(serde_json::json!({
            "id": 2701,
            "title": "Moby Dick; Or, The Whale",
            "authors": [{"name": "Melville, Herman", "birth_year": 1819, "death_year": 1891}],
            "subjects": ["Whaling -- Fiction", "Sea stories"],
            "formats": {
                "image/jpeg": "https://www.gutenberg.org/cache/epub/2701/pg2701.cover.medium.jpg",
                "text/html": "https://www.gutenberg.org/ebooks/2701.html.images"
            },
            "download_count": 108745
        }))
        .unwrap()
    }

    #[test]
    fn parse_ignores_unknown_fields() {
        let book = moby_dick();
        assert_eq!(book.id, BookId::new(2701));
        assert_eq!(book.authors[0].name, "Melville, Herman");
    }

    #[test]
    fn parse_tolerates_missing_optional_fields() {
        let book: Book = serde_json::from_value(serde_json::json!({
            "id": 84,
            "title": "Frankenstein"
        }))
        .unwrap();

        assert!(book.authors.is_empty());
        assert!(book.subjects.is_empty());
        assert!(book.cover_url().is_none());
    }

    #[test]
    fn cover_url_reads_jpeg_format() {
        let book = moby_dick();
        assert_eq!(
            book.cover_url(),
            Some("https://www.gutenberg.org/cache/epub/2701/pg2701.cover.medium.jpg")
        );
    }

    #[test]
    fn title_match_is_case_insensitive() {
        let book = moby_dick();
        assert!(book.title_contains("moby"));
        assert!(book.title_contains("WHALE"));
        assert!(book.title_contains(""));
        assert!(!book.title_contains("emma"));
    }

    #[test]
    fn subject_match_is_case_sensitive() {
        let book = moby_dick();
        assert!(book.has_subject("Sea stories"));
        assert!(!book.has_subject("sea stories"));
        assert!(!book.has_subject("Sea"));
    }

    #[test]
    fn author_names_joined() {
        let mut book = moby_dick();
        book.authors.push(Author {
            name: "Editor, Some".into(),
        });
        assert_eq!(book.author_names(), "Melville, Herman, Editor, Some");
    }
}
