//! Domain models.
//!
//! These types represent validated domain objects separate from database row
//! types. Response shapes serialize exactly as the web and mobile clients read
//! them.

pub mod book;
pub mod user;

pub use book::{
    AuthorSummary, BookDraft, BookField, BookInput, BookInputError, BookRecord, CreatorSummary,
    GenreSummary, MemberSummary, NewBook, SearchResult, Source,
};
pub use user::{NewUser, PublicUser, User};
