//! ISBN type.
//!
//! Books are identified across the catalog by their ISBN when one is known.
//! Input from scanners and forms is normalized before validation so that
//! `978-0-306-40615-7`, `978 0306 406157` and `9780306406157` collapse into
//! the same catalog key.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// ISBN-10 (nine digits plus a digit or `X`) or ISBN-13 with a 978/979 prefix.
static ISBN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9]{9}[0-9X]|(?:978|979)[0-9]{10})$").expect("Invalid regex")
});

/// Errors that can occur when parsing an [`Isbn`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IsbnError {
    /// The input is empty after normalization.
    #[error("ISBN cannot be empty")]
    Empty,
    /// The input is not a 10 or 13 character ISBN.
    #[error("ISBN must be 10 or 13 characters")]
    InvalidFormat,
}

/// A normalized ISBN-10 or ISBN-13.
///
/// Only the shape is validated (length, digits, 978/979 prefix); check digits
/// are not verified, so barcodes with printing quirks still resolve.
///
/// ```
/// use bookly_core::Isbn;
///
/// let isbn = Isbn::parse("978-0-306-40615-7").unwrap();
/// assert_eq!(isbn.as_str(), "9780306406157");
/// assert_eq!(Isbn::parse("080442957x").unwrap().as_str(), "080442957X");
/// assert!(Isbn::parse("12345").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    /// Parse and normalize an ISBN.
    ///
    /// Hyphens and whitespace are removed and a trailing `x` is upper-cased.
    ///
    /// # Errors
    ///
    /// Returns `IsbnError::Empty` for blank input and `IsbnError::InvalidFormat`
    /// when the normalized value is not a 10 or 13 character ISBN.
    pub fn parse(s: &str) -> Result<Self, IsbnError> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if normalized.is_empty() {
            return Err(IsbnError::Empty);
        }

        if !ISBN_RE.is_match(&normalized) {
            return Err(IsbnError::InvalidFormat);
        }

        Ok(Self(normalized))
    }

    /// Returns the ISBN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a 13 character ISBN.
    #[must_use]
    pub fn is_isbn13(&self) -> bool {
        self.0.len() == 13
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Isbn {
    type Err = IsbnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Isbn {
    type Error = IsbnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
