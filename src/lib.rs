//! refshelf - bibliographic reference library search
//!
//! Stores references and extracted document text in SQLite and answers
//! ranked metadata, fulltext, combined and semantic queries, either from
//! the command line or as MCP tools.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod search;
pub mod storage;
pub mod test_utils;

pub use error::{Result, ShelfError};
