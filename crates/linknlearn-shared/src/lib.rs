//! # linknlearn-shared
//!
//! Domain types shared between the store and server crates: user,
//! link-request and conversation identifiers, the link-request status
//! machine, and institutional-email validation.
//!
//! Everything in this crate is pure and I/O-free.

pub mod constants;
pub mod email;
pub mod error;
pub mod types;

pub use error::SharedError;
pub use types::{ConversationId, LinkStatus, RequestId, UserId};
