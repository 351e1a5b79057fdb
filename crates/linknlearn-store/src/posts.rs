//! CRUD operations for feed [`Post`] and [`Report`] records.

use linknlearn_shared::UserId;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::{Post, Report};
use crate::users::{conversion_err, not_found, parse_timestamp, parse_user_id};

impl Database {
    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    /// Insert a new post.
    pub fn create_post(&self, post: &Post) -> Result<()> {
        self.conn().execute(
            "INSERT INTO posts (id, author_id, caption, image_url, likes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                post.id.to_string(),
                post.author_id.as_str(),
                post.caption,
                post.image_url,
                post.likes,
                post.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single post by id.
    pub fn get_post(&self, id: Uuid) -> Result<Post> {
        self.conn()
            .query_row(
                "SELECT id, author_id, caption, image_url, likes, created_at
                 FROM posts WHERE id = ?1",
                params![id.to_string()],
                row_to_post,
            )
            .map_err(not_found)
    }

    /// The shared feed, newest first.
    pub fn list_posts(&self) -> Result<Vec<Post>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, author_id, caption, image_url, likes, created_at
             FROM posts
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map([], row_to_post)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    /// Increment a post's like counter and return the updated post.
    pub fn like_post(&self, id: Uuid) -> Result<Post> {
        let affected = self.conn().execute(
            "UPDATE posts SET likes = likes + 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        if affected == 0 {
            return Err(crate::error::StoreError::NotFound);
        }
        self.get_post(id)
    }

    // ------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------

    /// Insert a new issue report.
    pub fn create_report(&self, report: &Report) -> Result<()> {
        self.conn().execute(
            "INSERT INTO reports (id, reporter_id, description, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                report.id.to_string(),
                report.reporter_id.as_str(),
                report.description,
                report.image_url,
                report.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Reports filed by one user, newest first.
    pub fn reports_of(&self, user: &UserId) -> Result<Vec<Report>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, reporter_id, description, image_url, created_at
             FROM reports
             WHERE reporter_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![user.as_str()], row_to_report)?;

        let mut reports = Vec::new();
        for row in rows {
            reports.push(row?);
        }
        Ok(reports)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str).map_err(|e| conversion_err(0, e))?;

    Ok(Post {
        id,
        author_id: parse_user_id(1, row.get(1)?)?,
        caption: row.get(2)?,
        image_url: row.get(3)?,
        likes: row.get(4)?,
        created_at: parse_timestamp(5, row.get(5)?)?,
    })
}

fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str).map_err(|e| conversion_err(0, e))?;

    Ok(Report {
        id,
        reporter_id: parse_user_id(1, row.get(1)?)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        created_at: parse_timestamp(4, row.get(4)?)?,
    })
}
