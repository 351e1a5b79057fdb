//! # linknlearn-store
//!
//! Persistence for the LinknLearn backend, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model: profiles and credentials, link requests and the connection graph,
//! conversation message streams, feed posts, and issue reports.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod posts;
pub mod requests;
pub mod users;

mod error;

#[cfg(test)]
pub(crate) mod test_support;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
