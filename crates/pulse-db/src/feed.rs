use anyhow::Result;
use rusqlite::Connection;
use rusqlite::types::Value;

use crate::Database;
use crate::models::{FeedEntry, PostRow};
use crate::reactions::optional_reaction_at;

/// Resume point for a `Recent` page: the last post already shown.
///
/// Feed order is `created_at DESC, id DESC`, so the pair is unique even
/// when several posts share a timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FeedCursor<'a> {
    pub created_at: &'a str,
    pub id: &'a str,
}

/// Which posts a feed call covers.
#[derive(Debug, Clone, Copy)]
pub enum PostFilter<'a> {
    /// One post by id.
    Id(&'a str),
    /// Everything written by one user, newest first.
    Author(&'a str),
    /// Newest posts overall, strictly after `before` when given.
    Recent {
        before: Option<FeedCursor<'a>>,
        limit: u32,
    },
}

// ?1 is the viewer id, NULL when anonymous. Each (user, post) pair has at
// most one reaction row, so the MAX picks the viewer's row or nothing.
const POST_SELECT: &str = "
    SELECT p.id, p.user_id, u.email, u.full_name, u.profile_picture,
           p.description, p.image, p.created_at, p.updated_at,
           COUNT(CASE WHEN l.reaction = 'like' THEN 1 END),
           COUNT(CASE WHEN l.reaction = 'dislike' THEN 1 END),
           MAX(CASE WHEN l.user_id = ?1 THEN l.reaction END)
    FROM posts p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN post_likes l ON l.post_id = p.id";

impl Database {
    /// Posts matching `filter`, each with like/dislike counts and, for a
    /// signed-in viewer, the viewer's own reaction.
    ///
    /// Always a single SQL statement, whatever the number of posts.
    pub fn load_feed(
        &self,
        viewer_id: Option<&str>,
        filter: PostFilter<'_>,
    ) -> Result<Vec<FeedEntry>> {
        self.with_conn(|conn| query_feed(conn, viewer_id, filter))
    }

    /// A single annotated post.
    pub fn get_post(&self, viewer_id: Option<&str>, post_id: &str) -> Result<Option<FeedEntry>> {
        Ok(self.load_feed(viewer_id, PostFilter::Id(post_id))?.into_iter().next())
    }
}

fn query_feed(
    conn: &Connection,
    viewer_id: Option<&str>,
    filter: PostFilter<'_>,
) -> Result<Vec<FeedEntry>> {
    let mut params: Vec<Value> = vec![match viewer_id {
        Some(viewer) => Value::Text(viewer.to_string()),
        None => Value::Null,
    }];
    let mut sql = String::from(POST_SELECT);

    match filter {
        PostFilter::Id(id) => {
            sql.push_str(" WHERE p.id = ?2");
            params.push(Value::Text(id.to_string()));
        }
        PostFilter::Author(user_id) => {
            sql.push_str(" WHERE p.user_id = ?2");
            params.push(Value::Text(user_id.to_string()));
        }
        PostFilter::Recent { before: Some(cursor), .. } => {
            sql.push_str(" WHERE (p.created_at, p.id) < (?2, ?3)");
            params.push(Value::Text(cursor.created_at.to_string()));
            params.push(Value::Text(cursor.id.to_string()));
        }
        PostFilter::Recent { before: None, .. } => {}
    }

    sql.push_str(" GROUP BY p.id ORDER BY p.created_at DESC, p.id DESC");

    if let PostFilter::Recent { limit, .. } = filter {
        sql.push_str(&format!(" LIMIT ?{}", params.len() + 1));
        params.push(Value::Integer(i64::from(limit)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            let post = PostRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                author_email: row.get(2)?,
                author_full_name: row.get(3)?,
                author_profile_picture: row.get(4)?,
                description: row.get(5)?,
                image: row.get(6)?,
                created_at: row.get(7)?,
                updated_at: row.get(8)?,
                likes_count: row.get(9)?,
                dislikes_count: row.get(10)?,
            };
            let viewer_reaction = optional_reaction_at(row, 11)?.and_then(|r| r.as_opinion());
            Ok(FeedEntry {
                post,
                viewer_reaction,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(entries)
}
