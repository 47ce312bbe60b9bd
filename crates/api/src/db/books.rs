//! Book repository for database operations.
//!
//! Catalog rows are loaded with their creator in one query; authors, genres
//! and members are loaded in one query each for the whole page of books and
//! stitched together in memory.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bookly_core::{AuthorId, BookId, GenreId, Isbn, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::book::{
    AuthorSummary, BookRecord, CreatorSummary, GenreSummary, MemberSummary, NewBook,
};
use crate::services::CatalogStore;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: BookId,
    isbn: Option<String>,
    title: String,
    subtitle: Option<String>,
    publisher: Option<String>,
    published_date: Option<NaiveDate>,
    page_count: Option<i32>,
    language: Option<String>,
    description: Option<String>,
    cover_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    creator_id: UserId,
    creator_name: String,
    creator_surname: String,
    creator_email: String,
}

#[derive(Debug, sqlx::FromRow)]
struct AuthorLinkRow {
    book_id: BookId,
    id: AuthorId,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct GenreLinkRow {
    book_id: BookId,
    id: GenreId,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct MemberLinkRow {
    book_id: BookId,
    id: UserId,
    name: String,
    surname: String,
}

/// Relations of a set of books, keyed by book.
#[derive(Default)]
struct Relations {
    authors: HashMap<BookId, Vec<AuthorSummary>>,
    genres: HashMap<BookId, Vec<GenreSummary>>,
    members: HashMap<BookId, Vec<MemberSummary>>,
}

impl BookRow {
    fn into_record(self, relations: &mut Relations) -> Result<BookRecord, RepositoryError> {
        let isbn = self
            .isbn
            .as_deref()
            .map(Isbn::parse)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid ISBN in database: {e}")))?;

        Ok(BookRecord {
            id: self.id,
            isbn,
            title: self.title,
            subtitle: self.subtitle,
            publisher: self.publisher,
            published_date: self.published_date,
            page_count: self.page_count,
            language: self.language,
            description: self.description,
            cover_url: self.cover_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
            genres: relations.genres.remove(&self.id).unwrap_or_default(),
            authors: relations.authors.remove(&self.id).unwrap_or_default(),
            created_by: CreatorSummary {
                id: self.creator_id,
                name: self.creator_name,
                surname: self.creator_surname,
                email: self.creator_email,
            },
            added_by_users: relations.members.remove(&self.id).unwrap_or_default(),
        })
    }
}

const BOOK_SELECT: &str = r"
    SELECT b.id, b.isbn, b.title, b.subtitle, b.publisher, b.published_date,
           b.page_count, b.language, b.description, b.cover_url,
           b.created_at, b.updated_at,
           u.id AS creator_id, u.name AS creator_name,
           u.surname AS creator_surname, u.email AS creator_email
    FROM bookly.book b
    JOIN bookly.user u ON u.id = b.created_by_id
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
pub struct BookRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookRepository<'a> {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every catalog entry, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(&self) -> Result<Vec<BookRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "{BOOK_SELECT} ORDER BY b.created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        self.expand(rows).await
    }

    /// List the books in a user's collection, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_by_member(&self, user: UserId) -> Result<Vec<BookRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            r"{BOOK_SELECT}
            WHERE b.id IN (SELECT book_id FROM bookly.book_member WHERE user_id = $1)
            ORDER BY b.created_at DESC"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        self.expand(rows).await
    }

    /// List the books a user created, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_by_creator(&self, user: UserId) -> Result<Vec<BookRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "{BOOK_SELECT} WHERE b.created_by_id = $1 ORDER BY b.created_at DESC"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        self.expand(rows).await
    }

    /// Get a catalog entry by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_id(&self, id: BookId) -> Result<Option<BookRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{BOOK_SELECT} WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(self.expand(row.into_iter().collect()).await?.pop())
    }

    /// Get a catalog entry by ISBN.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_isbn(&self, isbn: &Isbn) -> Result<Option<BookRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{BOOK_SELECT} WHERE b.isbn = $1"))
            .bind(isbn.as_str())
            .fetch_optional(self.pool)
            .await?;

        Ok(self.expand(row.into_iter().collect()).await?.pop())
    }

    /// Insert a new catalog entry owned by `creator`, who becomes its only
    /// member. Authors and genres are created by name as needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the ISBN is already cataloged.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, book: &NewBook, creator: UserId) -> Result<BookRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, BookId>(
            r"
            INSERT INTO bookly.book
                (isbn, title, subtitle, publisher, published_date, page_count,
                 language, description, cover_url, created_by_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(book.isbn.as_ref().map(Isbn::as_str))
        .bind(&book.title)
        .bind(&book.subtitle)
        .bind(&book.publisher)
        .bind(book.published_date)
        .bind(book.page_count)
        .bind(&book.language)
        .bind(&book.description)
        .bind(&book.cover_url)
        .bind(creator)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "isbn"))?;

        for (position, name) in (0_i32..).zip(&book.authors) {
            let author_id = sqlx::query_scalar::<_, AuthorId>(
                r"
                INSERT INTO bookly.author (name) VALUES ($1)
                ON CONFLICT ((lower(name))) DO UPDATE SET name = bookly.author.name
                RETURNING id
                ",
            )
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO bookly.book_author (book_id, author_id, position) VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(author_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        for name in &book.genres {
            let genre_id = sqlx::query_scalar::<_, GenreId>(
                r"
                INSERT INTO bookly.genre (name) VALUES ($1)
                ON CONFLICT ((lower(name))) DO UPDATE SET name = bookly.genre.name
                RETURNING id
                ",
            )
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO bookly.book_genre (book_id, genre_id) VALUES ($1, $2)")
                .bind(id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("INSERT INTO bookly.book_member (book_id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(creator)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Add a user to a book's members.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user is already a member.
    pub async fn add_member(&self, book: BookId, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO bookly.book_member (book_id, user_id) VALUES ($1, $2)")
            .bind(book)
            .bind(user)
            .execute(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "membership"))?;

        Ok(())
    }

    /// Overwrite description and/or cover URL, leaving `None` fields as they are.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book doesn't exist.
    pub async fn update_details(
        &self,
        book: BookId,
        description: Option<&str>,
        cover_url: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bookly.book
            SET description = COALESCE($2, description),
                cover_url = COALESCE($3, cover_url)
            WHERE id = $1
            ",
        )
        .bind(book)
        .bind(description)
        .bind(cover_url)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Attach authors, genres and members to book rows, keeping row order.
    async fn expand(&self, rows: Vec<BookRow>) -> Result<Vec<BookRecord>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id.get()).collect();
        let mut relations = Relations::default();

        let authors = sqlx::query_as::<_, AuthorLinkRow>(
            r"
            SELECT ba.book_id, a.id, a.name
            FROM bookly.book_author ba
            JOIN bookly.author a ON a.id = ba.author_id
            WHERE ba.book_id = ANY($1)
            ORDER BY ba.position
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;
        for row in authors {
            relations
                .authors
                .entry(row.book_id)
                .or_default()
                .push(AuthorSummary {
                    id: row.id,
                    name: row.name,
                });
        }

        let genres = sqlx::query_as::<_, GenreLinkRow>(
            r"
            SELECT bg.book_id, g.id, g.name
            FROM bookly.book_genre bg
            JOIN bookly.genre g ON g.id = bg.genre_id
            WHERE bg.book_id = ANY($1)
            ORDER BY g.name
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;
        for row in genres {
            relations
                .genres
                .entry(row.book_id)
                .or_default()
                .push(GenreSummary {
                    id: row.id,
                    name: row.name,
                });
        }

        let members = sqlx::query_as::<_, MemberLinkRow>(
            r"
            SELECT bm.book_id, u.id, u.name, u.surname
            FROM bookly.book_member bm
            JOIN bookly.user u ON u.id = bm.user_id
            WHERE bm.book_id = ANY($1)
            ORDER BY bm.added_at
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;
        for row in members {
            relations
                .members
                .entry(row.book_id)
                .or_default()
                .push(MemberSummary {
                    id: row.id,
                    name: row.name,
                    surname: row.surname,
                });
        }

        rows.into_iter()
            .map(|row| row.into_record(&mut relations))
            .collect()
    }
}

impl CatalogStore for BookRepository<'_> {
    async fn find_by_isbn(&self, isbn: &Isbn) -> Result<Option<BookRecord>, RepositoryError> {
        self.get_by_isbn(isbn).await
    }

    async fn get_by_id(&self, id: BookId) -> Result<Option<BookRecord>, RepositoryError> {
        Self::get_by_id(self, id).await
    }

    async fn insert(&self, book: &NewBook, creator: UserId) -> Result<BookRecord, RepositoryError> {
        Self::insert(self, book, creator).await
    }

    async fn add_member(&self, book: BookId, user: UserId) -> Result<(), RepositoryError> {
        Self::add_member(self, book, user).await
    }

    async fn update_details(
        &self,
        book: BookId,
        description: Option<&str>,
        cover_url: Option<&str>,
    ) -> Result<(), RepositoryError> {
        Self::update_details(self, book, description, cover_url).await
    }
}
