use crate::models::{NewUser, ProfileUpdate, UserRow};
use crate::{Database, now_timestamp};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

const USER_COLUMNS: &str =
    "id, email, password, full_name, date_of_birth, profile_picture, created_at, updated_at";

impl Database {
    // -- Users --

    /// Inserts a user. Returns `false` without writing when the email is taken.
    pub fn create_user(&self, user: &NewUser) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, password, full_name, date_of_birth, profile_picture)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(email) DO NOTHING",
                rusqlite::params![
                    user.id,
                    user.email,
                    user.password_hash,
                    user.full_name,
                    user.date_of_birth,
                    user.profile_picture,
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Applies the non-empty fields of `update`. Returns `false` if the user is gone.
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    full_name = COALESCE(?2, full_name),
                    date_of_birth = COALESCE(?3, date_of_birth),
                    profile_picture = COALESCE(?4, profile_picture),
                    updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    update.full_name,
                    update.date_of_birth,
                    update.profile_picture,
                    now_timestamp(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn count_users_with_email(&self, email: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users WHERE email = ?1", [email], |row| {
                row.get(0)
            })?)
        })
    }

    // -- Refresh tokens --

    pub fn insert_refresh_token(&self, jti: &str, user_id: &str, expires_at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO refresh_tokens (jti, user_id, expires_at) VALUES (?1, ?2, ?3)",
                (jti, user_id, expires_at),
            )?;
            Ok(())
        })
    }

    /// Owner of a refresh token that is neither revoked nor expired.
    pub fn active_refresh_token_owner(&self, jti: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let owner = conn
                .query_row(
                    "SELECT user_id FROM refresh_tokens
                     WHERE jti = ?1 AND revoked_at IS NULL AND expires_at > ?2",
                    (jti, now_timestamp()),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(owner)
        })
    }

    /// Revokes a live refresh token owned by `user_id`.
    /// Returns `false` for unknown, foreign or already revoked tokens.
    pub fn revoke_refresh_token(&self, jti: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE refresh_tokens SET revoked_at = ?3
                 WHERE jti = ?1 AND user_id = ?2 AND revoked_at IS NULL",
                (jti, user_id, now_timestamp()),
            )?;
            Ok(changed == 1)
        })
    }

    // -- Posts --

    pub fn create_post(
        &self,
        id: &str,
        user_id: &str,
        description: &str,
        image: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, user_id, description, image) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, user_id, description, image],
            )?;
            Ok(())
        })
    }

    /// `(owner id, image path)` of a post, if it exists.
    pub fn get_post_owner(&self, id: &str) -> Result<Option<(String, Option<String>)>> {
        self.with_conn(|conn| {
            let owner = conn
                .query_row("SELECT user_id, image FROM posts WHERE id = ?1", [id], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .optional()?;
            Ok(owner)
        })
    }

    /// Deletes a post; reactions and comments go with it via `ON DELETE CASCADE`.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(deleted == 1)
        })
    }

    pub fn count_posts_by_user(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM posts WHERE user_id = ?1", [user_id], |row| {
                row.get(0)
            })?)
        })
    }
}

/// `column` is always one of our own literals, never user input.
fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                full_name: row.get(3)?,
                date_of_birth: row.get(4)?,
                profile_picture: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}
