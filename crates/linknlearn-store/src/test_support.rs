//! Shared fixtures for in-crate tests.

use chrono::Utc;
use linknlearn_shared::UserId;
use tempfile::TempDir;

use crate::database::Database;
use crate::models::Profile;

/// Open a fresh database in a temp directory. The directory must be kept
/// alive for the lifetime of the handle.
pub fn test_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open_at(&dir.path().join("test.db")).expect("open db");
    (db, dir)
}

/// A minimal profile with a unique email derived from the id.
pub fn profile(id: &str, name: &str) -> Profile {
    Profile {
        id: UserId::parse(id).expect("valid test id"),
        full_name: name.to_string(),
        email: format!("{id}@anurag.edu.in"),
        photo_url: None,
        department: None,
        college_name: None,
        graduation_year: None,
        bio: None,
        achievements: None,
        created_at: Utc::now(),
    }
}
