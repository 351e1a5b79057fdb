//! CRUD operations for [`Profile`] and [`Credentials`] records.

use chrono::{DateTime, Utc};
use linknlearn_shared::UserId;
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Credentials, Profile, ProfilePatch};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new profile.
    pub fn create_profile(&self, profile: &Profile) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, full_name, email, photo_url, department,
                                college_name, graduation_year, bio, achievements, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                profile.id.as_str(),
                profile.full_name,
                profile.email,
                profile.photo_url,
                profile.department,
                profile.college_name,
                profile.graduation_year,
                profile.bio,
                profile.achievements,
                profile.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Insert credentials for a freshly created profile.
    pub fn create_credentials(&self, creds: &Credentials) -> Result<()> {
        self.conn().execute(
            "INSERT INTO credentials (user_id, email, password_digest, verified, verification_token)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                creds.user_id.as_str(),
                creds.email,
                creds.password_digest,
                creds.verified,
                creds.verification_token,
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single profile by id.
    pub fn get_profile(&self, id: &UserId) -> Result<Profile> {
        self.conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = ?1"),
                params![id.as_str()],
                row_to_profile,
            )
            .map_err(not_found)
    }

    /// Fetch credentials by (lowercase) email address.
    pub fn get_credentials_by_email(&self, email: &str) -> Result<Credentials> {
        self.conn()
            .query_row(
                "SELECT user_id, email, password_digest, verified, verification_token
                 FROM credentials WHERE email = ?1",
                params![email],
                row_to_credentials,
            )
            .map_err(not_found)
    }

    /// Whether an account already exists for this email.
    pub fn email_taken(&self, email: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Case-insensitive substring search over name, email, department and
    /// graduation year, excluding the caller's own profile.
    pub fn search_profiles(&self, term: &str, exclude: &UserId) -> Result<Vec<Profile>> {
        let needle = format!("%{}%", term.trim().to_lowercase());

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users
             WHERE id != ?1
               AND (LOWER(full_name) LIKE ?2
                    OR LOWER(email) LIKE ?2
                    OR LOWER(COALESCE(department, '')) LIKE ?2
                    OR CAST(COALESCE(graduation_year, '') AS TEXT) LIKE ?2)
             ORDER BY full_name ASC"
        ))?;

        let rows = stmt.query_map(params![exclude.as_str(), needle], row_to_profile)?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Merge-update a profile: only fields present in the patch are
    /// written, everything else keeps its stored value.
    pub fn update_profile(&self, id: &UserId, patch: &ProfilePatch) -> Result<Profile> {
        let affected = self.conn().execute(
            "UPDATE users SET
                 full_name       = COALESCE(?2, full_name),
                 photo_url       = COALESCE(?3, photo_url),
                 department      = COALESCE(?4, department),
                 college_name    = COALESCE(?5, college_name),
                 graduation_year = COALESCE(?6, graduation_year),
                 bio             = COALESCE(?7, bio),
                 achievements    = COALESCE(?8, achievements)
             WHERE id = ?1",
            params![
                id.as_str(),
                patch.full_name,
                patch.photo_url,
                patch.department,
                patch.college_name,
                patch.graduation_year,
                patch.bio,
                patch.achievements,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_profile(id)
    }

    /// Mark the account verified if the token matches. Returns `false` when
    /// the token is wrong or the account is unknown.
    pub fn verify_email(&self, email: &str, token: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE credentials SET verified = 1, verification_token = NULL
             WHERE email = ?1 AND verification_token = ?2",
            params![email, token],
        )?;
        Ok(affected > 0)
    }
}

const PROFILE_COLUMNS: &str = "id, full_name, email, photo_url, department, \
                               college_name, graduation_year, bio, achievements, created_at";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

pub(crate) fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

pub(crate) fn parse_user_id(idx: usize, raw: String) -> rusqlite::Result<UserId> {
    UserId::parse(&raw).map_err(|e| conversion_err(idx, e))
}

pub(crate) fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

/// Map a `rusqlite::Row` to a [`Profile`].
fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: parse_user_id(0, row.get(0)?)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        photo_url: row.get(3)?,
        department: row.get(4)?,
        college_name: row.get(5)?,
        graduation_year: row.get(6)?,
        bio: row.get(7)?,
        achievements: row.get(8)?,
        created_at: parse_timestamp(9, row.get(9)?)?,
    })
}

fn row_to_credentials(row: &rusqlite::Row<'_>) -> rusqlite::Result<Credentials> {
    Ok(Credentials {
        user_id: parse_user_id(0, row.get(0)?)?,
        email: row.get(1)?,
        password_digest: row.get(2)?,
        verified: row.get(3)?,
        verification_token: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{profile, test_db};

    #[test]
    fn create_and_get_profile() {
        let (db, _dir) = test_db();
        let p = profile("u1", "Asha Rao");
        db.create_profile(&p).unwrap();

        let fetched = db.get_profile(&p.id).unwrap();
        assert_eq!(fetched, p);
    }

    #[test]
    fn get_missing_profile_is_not_found() {
        let (db, _dir) = test_db();
        let missing = UserId::parse("nobody").unwrap();
        assert!(matches!(db.get_profile(&missing), Err(StoreError::NotFound)));
    }

    #[test]
    fn patch_merges_only_provided_fields() {
        let (db, _dir) = test_db();
        let mut p = profile("u1", "Asha Rao");
        p.department = Some("CSE".into());
        p.bio = Some("hello".into());
        db.create_profile(&p).unwrap();

        let patch = ProfilePatch {
            bio: Some("new bio".into()),
            graduation_year: Some(2026),
            ..Default::default()
        };
        let updated = db.update_profile(&p.id, &patch).unwrap();

        assert_eq!(updated.bio.as_deref(), Some("new bio"));
        assert_eq!(updated.graduation_year, Some(2026));
        // Untouched fields survive.
        assert_eq!(updated.department.as_deref(), Some("CSE"));
        assert_eq!(updated.full_name, "Asha Rao");
    }

    #[test]
    fn search_matches_fields_and_excludes_self() {
        let (db, _dir) = test_db();
        let mut a = profile("u1", "Asha Rao");
        a.department = Some("Mechanical".into());
        let b = profile("u2", "Binod Kumar");
        let mut c = profile("u3", "Chitra Devi");
        c.graduation_year = Some(2027);
        for p in [&a, &b, &c] {
            db.create_profile(p).unwrap();
        }

        let me = UserId::parse("u2").unwrap();

        // Name match.
        let hits = db.search_profiles("asha", &me).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a.id);

        // Department match.
        assert_eq!(db.search_profiles("mech", &me).unwrap().len(), 1);

        // Graduation-year match.
        let hits = db.search_profiles("2027", &me).unwrap();
        assert_eq!(hits[0].id, c.id);

        // The caller never sees themself.
        assert!(db.search_profiles("binod", &me).unwrap().is_empty());
    }

    #[test]
    fn email_verification_flow() {
        let (db, _dir) = test_db();
        let p = profile("u1", "Asha Rao");
        db.create_profile(&p).unwrap();
        db.create_credentials(&Credentials {
            user_id: p.id.clone(),
            email: p.email.clone(),
            password_digest: "digest".into(),
            verified: false,
            verification_token: Some("tok-123".into()),
        })
        .unwrap();

        assert!(!db.verify_email(&p.email, "wrong").unwrap());
        assert!(!db.get_credentials_by_email(&p.email).unwrap().verified);

        assert!(db.verify_email(&p.email, "tok-123").unwrap());
        let creds = db.get_credentials_by_email(&p.email).unwrap();
        assert!(creds.verified);
        assert!(creds.verification_token.is_none());

        // Token is one-shot.
        assert!(!db.verify_email(&p.email, "tok-123").unwrap());
    }

    #[test]
    fn email_taken_detects_duplicates() {
        let (db, _dir) = test_db();
        let p = profile("u1", "Asha Rao");
        db.create_profile(&p).unwrap();
        assert!(db.email_taken(&p.email).unwrap());
        assert!(!db.email_taken("99zz999z99@anurag.edu.in").unwrap());
    }
}
