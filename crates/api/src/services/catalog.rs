//! Catalog service: ISBN resolution and book upsert.
//!
//! ISBN resolution walks a fixed chain: the local catalog first, then the
//! metadata provider, then an empty manual-entry form. Upsert attaches the
//! caller to an existing catalog entry with the same ISBN instead of creating
//! a duplicate.
//!
//! Concurrent upserts of the same new ISBN, or concurrent attaches of the same
//! user, are not serialized; the losing request fails on the database's unique
//! constraint.

use std::future::Future;

use thiserror::Error;
use tracing::instrument;

use bookly_core::{BookId, Isbn, IsbnError, UserId};

use crate::db::RepositoryError;
use crate::google_books::GoogleBooksError;
use crate::models::{
    BookDraft, BookField, BookInput, BookInputError, BookRecord, NewBook, SearchResult, Source,
};

/// Fields that are always read-only for a book already in the catalog.
const CATALOG_LOCKED_FIELDS: [BookField; 8] = [
    BookField::Isbn,
    BookField::Title,
    BookField::Subtitle,
    BookField::Authors,
    BookField::Publisher,
    BookField::PublishedDate,
    BookField::PageCount,
    BookField::Language,
];

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid ISBN: {0}")]
    InvalidIsbn(#[from] IsbnError),

    #[error("{0}")]
    InvalidBook(#[from] BookInputError),

    #[error("Book is already in your library")]
    AlreadyInCollection,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Catalog persistence used by [`CatalogService`].
pub trait CatalogStore: Send + Sync {
    /// Find a catalog entry by ISBN.
    fn find_by_isbn(
        &self,
        isbn: &Isbn,
    ) -> impl Future<Output = Result<Option<BookRecord>, RepositoryError>> + Send;

    /// Load a catalog entry by ID.
    fn get_by_id(
        &self,
        id: BookId,
    ) -> impl Future<Output = Result<Option<BookRecord>, RepositoryError>> + Send;

    /// Insert a new entry with `creator` as its creator and only member.
    fn insert(
        &self,
        book: &NewBook,
        creator: UserId,
    ) -> impl Future<Output = Result<BookRecord, RepositoryError>> + Send;

    /// Add `user` to the entry's members.
    fn add_member(
        &self,
        book: BookId,
        user: UserId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite description and/or cover URL; `None` leaves a field unchanged.
    fn update_details(
        &self,
        book: BookId,
        description: Option<&str>,
        cover_url: Option<&str>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// External source of book metadata.
pub trait MetadataProvider: Send + Sync {
    /// Look up a book by ISBN; `Ok(None)` when the provider has nothing.
    fn lookup_isbn(
        &self,
        isbn: &Isbn,
    ) -> impl Future<Output = Result<Option<BookDraft>, GoogleBooksError>> + Send;
}

/// Result of an upsert.
#[derive(Debug, Clone)]
pub struct Upserted {
    pub record: BookRecord,
    /// Whether a new catalog entry was created.
    pub created: bool,
}

/// Catalog service.
pub struct CatalogService<'a, S, M> {
    store: S,
    provider: &'a M,
}

impl<'a, S: CatalogStore, M: MetadataProvider> CatalogService<'a, S, M> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: S, provider: &'a M) -> Self {
        Self { store, provider }
    }

    /// Resolve an ISBN into a prefilled form for `user`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidIsbn` for malformed input,
    /// `CatalogError::AlreadyInCollection` when `user` already holds the book,
    /// and `CatalogError::Repository` if the catalog query fails. Provider
    /// failures are logged and fall through to manual entry.
    #[instrument(skip(self))]
    pub async fn resolve_isbn(&self, raw: &str, user: UserId) -> Result<SearchResult, CatalogError> {
        let isbn = Isbn::parse(raw)?;

        if let Some(record) = self.store.find_by_isbn(&isbn).await? {
            if record.has_member(user) {
                return Err(CatalogError::AlreadyInCollection);
            }
            tracing::debug!(book_id = %record.id, "ISBN found in catalog");
            return Ok(SearchResult {
                source: Source::Database,
                disabled_fields: locked_fields(&record),
                book: record.to_draft(),
            });
        }

        match self.provider.lookup_isbn(&isbn).await {
            Ok(Some(book)) => Ok(SearchResult {
                source: Source::GoogleBooks,
                book,
                disabled_fields: Vec::new(),
            }),
            Ok(None) => Ok(manual(isbn)),
            Err(e) => {
                tracing::warn!(error = %e, isbn = %isbn, "Metadata lookup failed, using manual entry");
                Ok(manual(isbn))
            }
        }
    }

    /// Save a book for `user`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidBook` when the input fails validation and
    /// `CatalogError::Repository` if a database operation fails.
    #[instrument(skip(self, input))]
    pub async fn upsert(&self, input: BookInput, user: UserId) -> Result<Upserted, CatalogError> {
        let book = NewBook::try_from(input)?;

        let existing = match &book.isbn {
            Some(isbn) => self.store.find_by_isbn(isbn).await?,
            None => None,
        };

        let Some(existing) = existing else {
            let record = self.store.insert(&book, user).await?;
            tracing::info!(book_id = %record.id, "Book added to catalog");
            return Ok(Upserted {
                record,
                created: true,
            });
        };

        let mut changed = false;
        if !existing.has_member(user) {
            self.store.add_member(existing.id, user).await?;
            tracing::info!(book_id = %existing.id, "Book added to collection");
            changed = true;
        }
        if book.description.is_some() || book.cover_url.is_some() {
            self.store
                .update_details(
                    existing.id,
                    book.description.as_deref(),
                    book.cover_url.as_deref(),
                )
                .await?;
            changed = true;
        }

        let record = if changed {
            self.store
                .get_by_id(existing.id)
                .await?
                .ok_or(RepositoryError::NotFound)?
        } else {
            existing
        };

        Ok(Upserted {
            record,
            created: false,
        })
    }
}

fn manual(isbn: Isbn) -> SearchResult {
    SearchResult {
        source: Source::Manual,
        book: BookDraft::manual(isbn),
        disabled_fields: Vec::new(),
    }
}

/// Read-only fields for a catalog hit.
///
/// Description and cover are the fields an upsert may still fill in, so they
/// stay editable while the catalog has no value for them.
fn locked_fields(record: &BookRecord) -> Vec<BookField> {
    let mut fields = CATALOG_LOCKED_FIELDS.to_vec();
    if record.description.is_some() {
        fields.push(BookField::Description);
    }
    if record.cover_url.is_some() {
        fields.push(BookField::CoverUrl);
    }
    fields
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use uuid::Uuid;

    use bookly_core::{AuthorId, GenreId};

    use super::*;
    use crate::models::{AuthorSummary, CreatorSummary, GenreSummary, MemberSummary};

    /// In-memory catalog.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryCatalog {
        books: Arc<Mutex<Vec<BookRecord>>>,
    }

    impl MemoryCatalog {
        pub(crate) fn books(&self) -> Vec<BookRecord> {
            self.books.lock().unwrap().clone()
        }
    }

    fn member(id: UserId) -> MemberSummary {
        MemberSummary {
            id,
            name: "Reader".to_owned(),
            surname: id.to_string(),
        }
    }

    impl CatalogStore for MemoryCatalog {
        async fn find_by_isbn(&self, isbn: &Isbn) -> Result<Option<BookRecord>, RepositoryError> {
            let books = self.books.lock().unwrap();
            Ok(books.iter().find(|b| b.isbn.as_ref() == Some(isbn)).cloned())
        }

        async fn get_by_id(&self, id: BookId) -> Result<Option<BookRecord>, RepositoryError> {
            let books = self.books.lock().unwrap();
            Ok(books.iter().find(|b| b.id == id).cloned())
        }

        async fn insert(&self, book: &NewBook, creator: UserId) -> Result<BookRecord, RepositoryError> {
            let mut books = self.books.lock().unwrap();
            if book.isbn.is_some() && books.iter().any(|b| b.isbn == book.isbn) {
                return Err(RepositoryError::Conflict("isbn already exists".to_owned()));
            }
            let now = Utc::now();
            let record = BookRecord {
                id: BookId::new(Uuid::new_v4()),
                isbn: book.isbn.clone(),
                title: book.title.clone(),
                subtitle: book.subtitle.clone(),
                publisher: book.publisher.clone(),
                published_date: book.published_date,
                page_count: book.page_count,
                language: book.language.clone(),
                description: book.description.clone(),
                cover_url: book.cover_url.clone(),
                created_at: now,
                updated_at: now,
                genres: (1..)
                    .zip(&book.genres)
                    .map(|(id, name)| GenreSummary {
                        id: GenreId::new(id),
                        name: name.clone(),
                    })
                    .collect(),
                authors: (1..)
                    .zip(&book.authors)
                    .map(|(id, name)| AuthorSummary {
                        id: AuthorId::new(id),
                        name: name.clone(),
                    })
                    .collect(),
                created_by: CreatorSummary {
                    id: creator,
                    name: "Reader".to_owned(),
                    surname: creator.to_string(),
                    email: "reader@bookly.com".to_owned(),
                },
                added_by_users: vec![member(creator)],
            };
            books.push(record.clone());
            Ok(record)
        }

        async fn add_member(&self, book: BookId, user: UserId) -> Result<(), RepositoryError> {
            let mut books = self.books.lock().unwrap();
            let record = books
                .iter_mut()
                .find(|b| b.id == book)
                .ok_or(RepositoryError::NotFound)?;
            if record.has_member(user) {
                return Err(RepositoryError::Conflict("membership already exists".to_owned()));
            }
            record.added_by_users.push(member(user));
            Ok(())
        }

        async fn update_details(
            &self,
            book: BookId,
            description: Option<&str>,
            cover_url: Option<&str>,
        ) -> Result<(), RepositoryError> {
            let mut books = self.books.lock().unwrap();
            let record = books
                .iter_mut()
                .find(|b| b.id == book)
                .ok_or(RepositoryError::NotFound)?;
            if let Some(description) = description {
                record.description = Some(description.to_owned());
            }
            if let Some(cover_url) = cover_url {
                record.cover_url = Some(cover_url.to_owned());
            }
            Ok(())
        }
    }

    /// Provider returning a fixed answer and counting calls.
    pub(crate) struct StubProvider {
        answer: Option<BookDraft>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubProvider {
        pub(crate) const fn found(draft: BookDraft) -> Self {
            Self {
                answer: Some(draft),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) const fn empty() -> Self {
            Self {
                answer: None,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) const fn failing() -> Self {
            Self {
                answer: None,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MetadataProvider for StubProvider {
        async fn lookup_isbn(&self, _isbn: &Isbn) -> Result<Option<BookDraft>, GoogleBooksError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GoogleBooksError::Status(reqwest::StatusCode::BAD_GATEWAY));
            }
            Ok(self.answer.clone())
        }
    }

    const ISBN: &str = "9780441172719";

    fn user() -> UserId {
        UserId::new(Uuid::new_v4())
    }

    fn dune() -> BookInput {
        BookInput {
            isbn: Some(ISBN.to_owned()),
            title: Some("Dune".to_owned()),
            authors: Some(vec!["Frank Herbert".to_owned()]),
            page_count: Some(412),
            ..BookInput::default()
        }
    }

    fn google_draft() -> BookDraft {
        BookDraft {
            title: Some("Dune".to_owned()),
            authors: vec!["Frank Herbert".to_owned()],
            ..BookDraft::manual(Isbn::parse(ISBN).unwrap())
        }
    }

    #[tokio::test]
    async fn test_unknown_isbn_uses_provider() {
        let provider = StubProvider::found(google_draft());
        let catalog = CatalogService::new(MemoryCatalog::default(), &provider);

        let result = catalog.resolve_isbn(ISBN, user()).await.unwrap();

        assert_eq!(result.source, Source::GoogleBooks);
        assert_eq!(result.book, google_draft());
        assert!(result.disabled_fields.is_empty());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_catalog_hit_locks_descriptive_fields() {
        let provider = StubProvider::found(google_draft());
        let store = MemoryCatalog::default();
        let catalog = CatalogService::new(store.clone(), &provider);
        catalog.upsert(dune(), user()).await.unwrap();

        let result = catalog.resolve_isbn("978-0-441-17271-9", user()).await.unwrap();

        assert_eq!(result.source, Source::Database);
        assert_eq!(result.book.title.as_deref(), Some("Dune"));
        assert_eq!(result.disabled_fields, CATALOG_LOCKED_FIELDS.to_vec());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_catalog_hit_locks_present_description_and_cover() {
        let provider = StubProvider::empty();
        let catalog = CatalogService::new(MemoryCatalog::default(), &provider);
        catalog
            .upsert(
                BookInput {
                    description: Some("Spice".to_owned()),
                    cover_url: Some("https://img/dune".to_owned()),
                    ..dune()
                },
                user(),
            )
            .await
            .unwrap();

        let result = catalog.resolve_isbn(ISBN, user()).await.unwrap();

        assert!(result.disabled_fields.contains(&BookField::Description));
        assert!(result.disabled_fields.contains(&BookField::CoverUrl));
    }

    #[tokio::test]
    async fn test_isbn_in_own_collection_conflicts() {
        let provider = StubProvider::empty();
        let catalog = CatalogService::new(MemoryCatalog::default(), &provider);
        let owner = user();
        catalog.upsert(dune(), owner).await.unwrap();

        let err = catalog.resolve_isbn(ISBN, owner).await.unwrap_err();

        assert!(matches!(err, CatalogError::AlreadyInCollection));
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_manual() {
        let provider = StubProvider::failing();
        let catalog = CatalogService::new(MemoryCatalog::default(), &provider);

        let result = catalog.resolve_isbn(ISBN, user()).await.unwrap();

        assert_eq!(result.source, Source::Manual);
        assert_eq!(result.book, BookDraft::manual(Isbn::parse(ISBN).unwrap()));
        assert!(result.disabled_fields.is_empty());
    }

    #[tokio::test]
    async fn test_provider_miss_is_manual() {
        let provider = StubProvider::empty();
        let catalog = CatalogService::new(MemoryCatalog::default(), &provider);

        let result = catalog.resolve_isbn(ISBN, user()).await.unwrap();

        assert_eq!(result.source, Source::Manual);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_isbn_rejected_before_lookup() {
        let provider = StubProvider::empty();
        let catalog = CatalogService::new(MemoryCatalog::default(), &provider);

        let err = catalog.resolve_isbn("12345", user()).await.unwrap_err();

        assert!(matches!(err, CatalogError::InvalidIsbn(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_upsert_new_isbn_creates_owned_entry() {
        let provider = StubProvider::empty();
        let store = MemoryCatalog::default();
        let catalog = CatalogService::new(store.clone(), &provider);
        let creator = user();

        let upserted = catalog.upsert(dune(), creator).await.unwrap();

        assert!(upserted.created);
        assert_eq!(store.books().len(), 1);
        assert_eq!(upserted.record.created_by.id, creator);
        let members: Vec<UserId> = upserted.record.added_by_users.iter().map(|m| m.id).collect();
        assert_eq!(members, vec![creator]);
    }

    #[tokio::test]
    async fn test_upsert_existing_isbn_adds_membership() {
        let provider = StubProvider::empty();
        let store = MemoryCatalog::default();
        let catalog = CatalogService::new(store.clone(), &provider);
        let creator = user();
        let reader = user();
        catalog.upsert(dune(), creator).await.unwrap();

        let upserted = catalog.upsert(dune(), reader).await.unwrap();

        assert!(!upserted.created);
        assert_eq!(store.books().len(), 1);
        assert_eq!(upserted.record.created_by.id, creator);
        assert!(upserted.record.has_member(creator));
        assert!(upserted.record.has_member(reader));
    }

    #[tokio::test]
    async fn test_upsert_existing_member_updates_details_only() {
        let provider = StubProvider::empty();
        let store = MemoryCatalog::default();
        let catalog = CatalogService::new(store.clone(), &provider);
        let owner = user();
        catalog.upsert(dune(), owner).await.unwrap();

        let upserted = catalog
            .upsert(
                BookInput {
                    title: Some("Dune (retitled)".to_owned()),
                    description: Some("Spice must flow".to_owned()),
                    ..dune()
                },
                owner,
            )
            .await
            .unwrap();

        assert!(!upserted.created);
        assert_eq!(upserted.record.title, "Dune");
        assert_eq!(upserted.record.description.as_deref(), Some("Spice must flow"));
        assert_eq!(upserted.record.added_by_users.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_without_isbn_always_inserts() {
        let provider = StubProvider::empty();
        let store = MemoryCatalog::default();
        let catalog = CatalogService::new(store.clone(), &provider);
        let untracked = BookInput {
            isbn: Some(String::new()),
            ..dune()
        };

        catalog.upsert(untracked.clone(), user()).await.unwrap();
        catalog.upsert(untracked, user()).await.unwrap();

        assert_eq!(store.books().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_blank_title_rejected() {
        let provider = StubProvider::empty();
        let store = MemoryCatalog::default();
        let catalog = CatalogService::new(store.clone(), &provider);

        let err = catalog
            .upsert(
                BookInput {
                    title: Some("  ".to_owned()),
                    ..dune()
                },
                user(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::InvalidBook(BookInputError::MissingTitle)
        ));
        assert!(store.books().is_empty());
    }
}
