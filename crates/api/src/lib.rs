//! Bookly API library.
//!
//! The HTTP backend of the Bookly library tracker: accounts, the shared book
//! catalog, personal collections, and ISBN lookup backed by Google Books.
//! Exposed as a library so the CLI and tests can reuse it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod google_books;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
