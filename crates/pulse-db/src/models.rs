//! Database row types: these map directly to SQLite rows.
//! Distinct from pulse-types API models to keep the DB layer independent.

use pulse_types::models::Reaction;

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub date_of_birth: String,
    pub profile_picture: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewUser {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub date_of_birth: String,
    pub profile_picture: Option<String>,
}

/// Fields left as `None` keep their stored value.
#[derive(Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub profile_picture: Option<String>,
}

/// A post joined with its author and its aggregated reaction counts.
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub author_email: String,
    pub author_full_name: String,
    pub author_profile_picture: Option<String>,
    pub description: String,
    pub image: Option<String>,
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct FeedEntry {
    pub post: PostRow,
    /// Already normalized: a stored `none` comes back as `None`.
    pub viewer_reaction: Option<Reaction>,
}

pub struct ReactionRow {
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub reaction: Reaction,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub author_email: String,
    pub author_full_name: String,
    pub body: String,
    pub created_at: String,
}
