use anyhow::Result;
use rusqlite::{Connection, Row};

use crate::Database;
use crate::models::CommentRow;

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.user_id, u.email, u.full_name, c.body, c.created_at
    FROM comments c
    JOIN users u ON u.id = c.user_id";

impl Database {
    /// Appends a comment. Returns `None` when the post does not exist.
    pub fn create_comment(
        &self,
        id: &str,
        post_id: &str,
        user_id: &str,
        body: &str,
    ) -> Result<Option<CommentRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if !post_exists(&tx, post_id)? {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO comments (id, post_id, user_id, body) VALUES (?1, ?2, ?3, ?4)",
                (id, post_id, user_id, body),
            )?;

            let row =
                tx.query_row(&format!("{COMMENT_SELECT} WHERE c.id = ?1"), [id], map_comment)?;
            tx.commit()?;
            Ok(Some(row))
        })
    }

    /// Comments of a post, oldest first. Returns `None` when the post does not exist.
    pub fn list_comments(&self, post_id: &str) -> Result<Option<Vec<CommentRow>>> {
        self.with_conn(|conn| {
            if !post_exists(conn, post_id)? {
                return Ok(None);
            }

            let mut stmt = conn.prepare(&format!(
                "{COMMENT_SELECT} WHERE c.post_id = ?1 ORDER BY c.created_at ASC, c.rowid ASC"
            ))?;
            let rows = stmt
                .query_map([post_id], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Some(rows))
        })
    }
}

fn post_exists(conn: &Connection, post_id: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
        [post_id],
        |row| row.get(0),
    )?)
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        author_email: row.get(3)?,
        author_full_name: row.get(4)?,
        body: row.get(5)?,
        created_at: row.get(6)?,
    })
}
