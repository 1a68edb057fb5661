//! Storage layer for refshelf
//!
//! A single SQLite file holds references, page text, embeddings and the
//! FTS5 indexes over them.

pub mod migrations;
pub mod sqlite;

pub use sqlite::Database;
