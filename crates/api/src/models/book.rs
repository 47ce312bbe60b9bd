//! Book domain types.
//!
//! A `BookRecord` is a catalog entry with its relations expanded, as every
//! book endpoint returns it. A `BookDraft` is the prefilled form produced by
//! ISBN lookup, and `BookInput` is what clients post to save a book.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bookly_core::{
    AuthorId, BookId, DateError, GenreId, Isbn, IsbnError, UserId, parse_published_date,
};

/// An author linked to a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    pub id: AuthorId,
    pub name: String,
}

/// A genre tag linked to a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreSummary {
    pub id: GenreId,
    pub name: String,
}

/// The user who first saved a book to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatorSummary {
    pub id: UserId,
    pub name: String,
    pub surname: String,
    pub email: String,
}

/// A user holding the book in their collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    pub id: UserId,
    pub name: String,
    pub surname: String,
}

/// A catalog entry with its relations expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookRecord {
    pub id: BookId,
    #[serde(rename = "ISBN")]
    pub isbn: Option<Isbn>,
    pub title: String,
    pub subtitle: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub genres: Vec<GenreSummary>,
    pub authors: Vec<AuthorSummary>,
    pub created_by: CreatorSummary,
    #[serde(rename = "addedByUsers")]
    pub added_by_users: Vec<MemberSummary>,
}

impl BookRecord {
    /// Whether `user` holds this book in their collection.
    #[must_use]
    pub fn has_member(&self, user: UserId) -> bool {
        self.added_by_users.iter().any(|m| m.id == user)
    }

    /// The record as a prefilled form.
    #[must_use]
    pub fn to_draft(&self) -> BookDraft {
        BookDraft {
            isbn: self.isbn.clone(),
            title: Some(self.title.clone()),
            subtitle: self.subtitle.clone(),
            authors: self.authors.iter().map(|a| a.name.clone()).collect(),
            publisher: self.publisher.clone(),
            published_date: self.published_date,
            page_count: self.page_count,
            language: self.language.clone(),
            description: self.description.clone(),
            cover_url: self.cover_url.clone(),
            genres: self.genres.iter().map(|g| g.name.clone()).collect(),
        }
    }
}

/// Book metadata used to prefill the add-book form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookDraft {
    #[serde(rename = "ISBN")]
    pub isbn: Option<Isbn>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub genres: Vec<String>,
}

impl BookDraft {
    /// A draft with only the ISBN filled in.
    #[must_use]
    pub fn manual(isbn: Isbn) -> Self {
        Self {
            isbn: Some(isbn),
            ..Self::default()
        }
    }
}

/// Where a lookup result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Database,
    GoogleBooks,
    Manual,
}

/// Names of the form fields a client may lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookField {
    #[serde(rename = "ISBN")]
    Isbn,
    Title,
    Subtitle,
    Authors,
    Publisher,
    PublishedDate,
    PageCount,
    Language,
    Description,
    CoverUrl,
}

/// Response of an ISBN lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub source: Source,
    pub book: BookDraft,
    /// Fields the client renders read-only.
    #[serde(rename = "disabledFields")]
    pub disabled_fields: Vec<BookField>,
}

/// Errors in a submitted book.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookInputError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Invalid ISBN: {0}")]
    InvalidIsbn(#[from] IsbnError),

    #[error("page_count must be a positive number")]
    InvalidPageCount,

    #[error("Invalid published_date: {0}")]
    InvalidPublishedDate(#[from] DateError),
}

/// A book as posted by a client, possibly partial.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookInput {
    #[serde(rename = "ISBN", default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Option<Vec<String>>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
}

/// A validated book ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub isbn: Option<Isbn>,
    pub title: String,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub genres: Vec<String>,
}

impl TryFrom<BookInput> for NewBook {
    type Error = BookInputError;

    fn try_from(input: BookInput) -> Result<Self, Self::Error> {
        let title = non_blank(input.title).ok_or(BookInputError::MissingTitle)?;

        let isbn = non_blank(input.isbn)
            .map(|raw| Isbn::parse(&raw))
            .transpose()?;

        if input.page_count.is_some_and(|n| n <= 0) {
            return Err(BookInputError::InvalidPageCount);
        }

        let published_date = non_blank(input.published_date)
            .map(|raw| parse_published_date(&raw))
            .transpose()?;

        Ok(Self {
            isbn,
            title,
            subtitle: non_blank(input.subtitle),
            authors: names(input.authors),
            publisher: non_blank(input.publisher),
            published_date,
            page_count: input.page_count,
            language: non_blank(input.language),
            description: non_blank(input.description),
            cover_url: non_blank(input.cover_url),
            genres: names(input.genres),
        })
    }
}

/// Trim a value and drop it when nothing is left.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Trim names, dropping blanks and case-insensitive duplicates.
///
/// Names compare by their lowercase form, as the `author` and `genre`
/// unique indexes on `lower(name)` do.
fn names(values: Option<Vec<String>>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<String> = Vec::new();
    for value in values.unwrap_or_default() {
        let name = value.trim();
        let key = name.to_lowercase();
        if name.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(name.to_owned());
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn input(title: &str) -> BookInput {
        BookInput {
            title: Some(title.to_owned()),
            ..BookInput::default()
        }
    }

    #[test]
    fn test_blank_title_rejected() {
        assert_eq!(
            NewBook::try_from(input("   ")).unwrap_err(),
            BookInputError::MissingTitle
        );
        assert_eq!(
            NewBook::try_from(BookInput::default()).unwrap_err(),
            BookInputError::MissingTitle
        );
    }

    #[test]
    fn test_blank_isbn_is_absent() {
        let book = NewBook::try_from(BookInput {
            isbn: Some(" ".to_owned()),
            ..input("Dune")
        })
        .unwrap();
        assert_eq!(book.isbn, None);
    }

    #[test]
    fn test_invalid_isbn_rejected() {
        let err = NewBook::try_from(BookInput {
            isbn: Some("12345".to_owned()),
            ..input("Dune")
        })
        .unwrap_err();
        assert!(matches!(err, BookInputError::InvalidIsbn(_)));
    }

    #[test]
    fn test_page_count_must_be_positive() {
        let err = NewBook::try_from(BookInput {
            page_count: Some(0),
            ..input("Dune")
        })
        .unwrap_err();
        assert_eq!(err, BookInputError::InvalidPageCount);
    }

    #[test]
    fn test_input_is_normalized() {
        let body = r#"{
            "ISBN": "978-0-441-17271-9",
            "title": "  Dune ",
            "subtitle": "",
            "authors": ["Frank Herbert", " frank herbert", ""],
            "published_date": "1965",
            "page_count": 412,
            "genres": ["Science Fiction"]
        }"#;
        let book = NewBook::try_from(serde_json::from_str::<BookInput>(body).unwrap()).unwrap();

        assert_eq!(book.isbn.unwrap().as_str(), "9780441172719");
        assert_eq!(book.title, "Dune");
        assert_eq!(book.subtitle, None);
        assert_eq!(book.authors, vec!["Frank Herbert"]);
        assert_eq!(book.published_date, NaiveDate::from_ymd_opt(1965, 1, 1));
        assert_eq!(book.genres, vec!["Science Fiction"]);
    }

    #[test]
    fn test_names_fold_non_ascii_case() {
        let genres = names(Some(vec![
            "Émile Zola".to_owned(),
            "ÉMILE ZOLA".to_owned(),
            "Science Fiction".to_owned(),
        ]));
        assert_eq!(genres, vec!["Émile Zola", "Science Fiction"]);
    }

    #[test]
    fn test_search_result_shape() {
        let result = SearchResult {
            source: Source::GoogleBooks,
            book: BookDraft::manual(Isbn::parse("9780441172719").unwrap()),
            disabled_fields: vec![BookField::Isbn, BookField::PublishedDate],
        };

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["source"], "google_books");
        assert_eq!(json["book"]["ISBN"], "9780441172719");
        assert!(json["book"]["title"].is_null());
        assert_eq!(
            json["disabledFields"],
            serde_json::json!(["ISBN", "published_date"])
        );
    }

    #[test]
    fn test_record_membership() {
        let member = UserId::new(Uuid::new_v4());
        let record = BookRecord {
            id: BookId::new(Uuid::new_v4()),
            isbn: None,
            title: "Dune".to_owned(),
            subtitle: None,
            publisher: None,
            published_date: None,
            page_count: None,
            language: None,
            description: None,
            cover_url: None,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
            genres: vec![],
            authors: vec![AuthorSummary {
                id: AuthorId::new(1),
                name: "Frank Herbert".to_owned(),
            }],
            created_by: CreatorSummary {
                id: member,
                name: "John".to_owned(),
                surname: "Reader".to_owned(),
                email: "user@bookly.com".to_owned(),
            },
            added_by_users: vec![MemberSummary {
                id: member,
                name: "John".to_owned(),
                surname: "Reader".to_owned(),
            }],
        };

        assert!(record.has_member(member));
        assert!(!record.has_member(UserId::new(Uuid::new_v4())));
        assert_eq!(record.to_draft().authors, vec!["Frank Herbert"]);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["addedByUsers"][0]["name"], "John");
        assert_eq!(json["created_by"]["email"], "user@bookly.com");
    }
}
