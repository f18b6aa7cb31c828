use anyhow::Result;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

use pulse_types::models::{Reaction, ReactionAction};

use crate::models::ReactionRow;
use crate::{Database, now_timestamp};

impl Database {
    /// Apply `action` to the (user, post) reaction and return the new state.
    /// Returns `None` when the post does not exist.
    ///
    /// The read and the write share one `BEGIN IMMEDIATE` transaction, so the
    /// write lock is held from the moment the current state is read. Two
    /// toggles on the same pair therefore run one after the other, and the
    /// upsert on `UNIQUE(user_id, post_id)` keeps it to a single row.
    pub fn toggle_reaction(
        &self,
        user_id: &str,
        post_id: &str,
        action: ReactionAction,
    ) -> Result<Option<Reaction>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let post_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
                [post_id],
                |row| row.get(0),
            )?;
            if !post_exists {
                return Ok(None);
            }

            let current = tx
                .query_row(
                    "SELECT reaction FROM post_likes WHERE user_id = ?1 AND post_id = ?2",
                    (user_id, post_id),
                    |row| reaction_at(row, 0),
                )
                .optional()?
                .unwrap_or_default();

            let next = current.toggle(action);

            tx.execute(
                "INSERT INTO post_likes (id, user_id, post_id, reaction) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, post_id)
                 DO UPDATE SET reaction = excluded.reaction, updated_at = ?5",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    user_id,
                    post_id,
                    next.as_str(),
                    now_timestamp(),
                ],
            )?;

            tx.commit()?;
            Ok(Some(next))
        })
    }

    /// Every reaction row of a post, `none` rows included. Inspection only:
    /// request handling reads reactions through `load_feed`.
    pub fn get_reactions_for_post(&self, post_id: &str) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, post_id, reaction, created_at, updated_at
                 FROM post_likes WHERE post_id = ?1
                 ORDER BY created_at, rowid",
            )?;

            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(ReactionRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        post_id: row.get(2)?,
                        reaction: reaction_at(row, 3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

/// Read a `reaction` column, surfacing unknown values as conversion errors.
pub(crate) fn reaction_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Reaction> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Nullable variant of `reaction_at`, for outer-joined columns.
pub(crate) fn optional_reaction_at(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<Reaction>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        raw.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
