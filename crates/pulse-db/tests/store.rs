use std::cell::Cell;
use std::sync::Arc;
use std::thread;

use pulse_db::models::NewUser;
use pulse_db::{Database, FeedCursor, PostFilter};
use pulse_types::models::{Reaction, ReactionAction};
use uuid::Uuid;

fn seed_user(db: &Database, email: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let created = db
        .create_user(&NewUser {
            id: id.clone(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            full_name: format!("User {email}"),
            date_of_birth: "1990-01-01".to_string(),
            profile_picture: None,
        })
        .unwrap();
    assert!(created);
    id
}

fn seed_post(db: &Database, user_id: &str, description: &str) -> String {
    let id = Uuid::new_v4().to_string();
    db.create_post(&id, user_id, description, None).unwrap();
    id
}

thread_local! {
    static STATEMENTS: Cell<usize> = const { Cell::new(0) };
}

fn count_statement(_sql: &str) {
    STATEMENTS.with(|n| n.set(n.get() + 1));
}

/// Run `f` and report how many SQL statements SQLite executed meanwhile.
/// Store calls run on the calling thread, so a thread-local tally is exact.
#[allow(deprecated)]
fn statements_run<T>(db: &Database, f: impl FnOnce() -> T) -> (T, usize) {
    db.with_conn_mut(|conn| {
        conn.trace(Some(count_statement as fn(&str)));
        Ok(())
    })
    .unwrap();
    let start = STATEMENTS.with(Cell::get);
    let out = f();
    let used = STATEMENTS.with(Cell::get) - start;
    db.with_conn_mut(|conn| {
        conn.trace(None);
        Ok(())
    })
    .unwrap();
    (out, used)
}

fn set_created_at(db: &Database, post_id: &str, created_at: &str) {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE posts SET created_at = ?2 WHERE id = ?1",
            (post_id, created_at),
        )?;
        Ok(())
    })
    .unwrap();
}

#[test]
fn toggle_follows_state_table() {
    let db = Database::open_in_memory().unwrap();
    let user = seed_user(&db, "u@example.com");
    let post = seed_post(&db, &user, "hello");

    let steps = [
        (ReactionAction::Like, Reaction::Like),
        (ReactionAction::Like, Reaction::None),
        (ReactionAction::Dislike, Reaction::Dislike),
        (ReactionAction::Like, Reaction::Like),
        (ReactionAction::Dislike, Reaction::Dislike),
        (ReactionAction::Dislike, Reaction::None),
    ];

    for (action, expected) in steps {
        let got = db.toggle_reaction(&user, &post, action).unwrap();
        assert_eq!(got, Some(expected));
    }

    let rows = db.get_reactions_for_post(&post).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reaction, Reaction::None);
    assert_eq!(rows[0].user_id, user);
}

#[test]
fn toggle_on_missing_post_writes_nothing() {
    let db = Database::open_in_memory().unwrap();
    let user = seed_user(&db, "u@example.com");
    let missing = Uuid::new_v4().to_string();

    assert_eq!(db.toggle_reaction(&user, &missing, ReactionAction::Like).unwrap(), None);
    assert!(db.get_reactions_for_post(&missing).unwrap().is_empty());
}

#[test]
fn counts_only_like_and_dislike_rows() {
    let db = Database::open_in_memory().unwrap();
    let author = seed_user(&db, "author@example.com");
    let fan = seed_user(&db, "fan@example.com");
    let critic = seed_user(&db, "critic@example.com");
    let undecided = seed_user(&db, "undecided@example.com");
    let post = seed_post(&db, &author, "counted");

    db.toggle_reaction(&fan, &post, ReactionAction::Like).unwrap();
    db.toggle_reaction(&critic, &post, ReactionAction::Dislike).unwrap();
    db.toggle_reaction(&undecided, &post, ReactionAction::Like).unwrap();
    db.toggle_reaction(&undecided, &post, ReactionAction::Like).unwrap();

    let entry = db.get_post(None, &post).unwrap().unwrap();
    assert_eq!(entry.post.likes_count, 1);
    assert_eq!(entry.post.dislikes_count, 1);
    assert_eq!(entry.post.author_email, "author@example.com");

    // the `none` row still holds its slot
    assert_eq!(db.get_reactions_for_post(&post).unwrap().len(), 3);
}

#[test]
fn viewer_reaction_is_per_viewer_and_hides_none() {
    let db = Database::open_in_memory().unwrap();
    let author = seed_user(&db, "author@example.com");
    let fan = seed_user(&db, "fan@example.com");
    let undecided = seed_user(&db, "undecided@example.com");
    let post = seed_post(&db, &author, "hello");

    db.toggle_reaction(&fan, &post, ReactionAction::Like).unwrap();
    db.toggle_reaction(&undecided, &post, ReactionAction::Dislike).unwrap();
    db.toggle_reaction(&undecided, &post, ReactionAction::Dislike).unwrap();

    let as_fan = db.get_post(Some(&fan), &post).unwrap().unwrap();
    let as_undecided = db.get_post(Some(&undecided), &post).unwrap().unwrap();
    let as_author = db.get_post(Some(&author), &post).unwrap().unwrap();
    let anonymous = db.get_post(None, &post).unwrap().unwrap();

    assert_eq!(as_fan.viewer_reaction, Some(Reaction::Like));
    assert_eq!(as_undecided.viewer_reaction, None);
    assert_eq!(as_author.viewer_reaction, None);
    assert_eq!(anonymous.viewer_reaction, None);
}

#[test]
fn feed_is_one_statement_at_any_size() {
    let db = Database::open_in_memory().unwrap();
    let author = seed_user(&db, "author@example.com");
    let viewer = seed_user(&db, "viewer@example.com");

    let first = seed_post(&db, &author, "post 0");
    db.toggle_reaction(&viewer, &first, ReactionAction::Like).unwrap();

    let (page, small_cost) =
        statements_run(&db, || db.load_feed(Some(&viewer), PostFilter::Author(&author)));
    assert_eq!(page.unwrap().len(), 1);

    // well past any IN-list or parameter-limit batching
    for i in 1..1200 {
        let post = seed_post(&db, &author, &format!("post {i}"));
        if i % 3 == 0 {
            db.toggle_reaction(&viewer, &post, ReactionAction::Dislike).unwrap();
        }
    }

    let (page, large_cost) =
        statements_run(&db, || db.load_feed(Some(&viewer), PostFilter::Author(&author)));
    let page = page.unwrap();

    assert_eq!(page.len(), 1200);
    assert_eq!(small_cost, 1);
    assert_eq!(large_cost, 1);
    assert_eq!(page.iter().filter(|e| e.viewer_reaction.is_some()).count(), 400);
}

#[test]
fn anonymous_feed_is_one_statement() {
    let db = Database::open_in_memory().unwrap();
    let author = seed_user(&db, "author@example.com");
    for i in 0..5 {
        seed_post(&db, &author, &format!("post {i}"));
    }

    let (page, cost) = statements_run(&db, || {
        db.load_feed(None, PostFilter::Recent { before: None, limit: 20 })
    });
    assert_eq!(page.unwrap().len(), 5);
    assert_eq!(cost, 1);
}

#[test]
fn concurrent_toggles_leave_one_valid_row() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let user = seed_user(&db, "u@example.com");
    let post = seed_post(&db, &user, "contended");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            let user = user.clone();
            let post = post.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    db.toggle_reaction(&user, &post, ReactionAction::Like).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let rows = db.get_reactions_for_post(&post).unwrap();
    assert_eq!(rows.len(), 1);
    // 200 same-action toggles pair up, so no update was lost
    assert_eq!(rows[0].reaction, Reaction::None);
}

#[test]
fn deleting_a_post_cascades() {
    let db = Database::open_in_memory().unwrap();
    let user = seed_user(&db, "u@example.com");
    let post = seed_post(&db, &user, "short-lived");

    db.toggle_reaction(&user, &post, ReactionAction::Like).unwrap();
    db.create_comment(&Uuid::new_v4().to_string(), &post, &user, "first").unwrap();

    assert!(db.delete_post(&post).unwrap());
    assert!(!db.delete_post(&post).unwrap());

    assert!(db.get_post(None, &post).unwrap().is_none());
    assert!(db.get_reactions_for_post(&post).unwrap().is_empty());
    assert!(db.list_comments(&post).unwrap().is_none());
    let orphans: i64 = db
        .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn comments_come_back_oldest_first() {
    let db = Database::open_in_memory().unwrap();
    let author = seed_user(&db, "author@example.com");
    let reader = seed_user(&db, "reader@example.com");
    let post = seed_post(&db, &author, "discuss");

    for body in ["one", "two", "three"] {
        let created = db
            .create_comment(&Uuid::new_v4().to_string(), &post, &reader, body)
            .unwrap()
            .unwrap();
        assert_eq!(created.author_email, "reader@example.com");
    }

    let bodies: Vec<String> = db
        .list_comments(&post)
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|c| c.body)
        .collect();
    assert_eq!(bodies, ["one", "two", "three"]);

    let missing = Uuid::new_v4().to_string();
    assert!(db.create_comment("c", &missing, &reader, "lost").unwrap().is_none());
}

#[test]
fn duplicate_email_is_not_inserted() {
    let db = Database::open_in_memory().unwrap();
    seed_user(&db, "dup@example.com");

    let again = db
        .create_user(&NewUser {
            id: Uuid::new_v4().to_string(),
            email: "dup@example.com".to_string(),
            password_hash: "x".to_string(),
            full_name: "Second".to_string(),
            date_of_birth: "1990-01-01".to_string(),
            profile_picture: None,
        })
        .unwrap();

    assert!(!again);
    assert_eq!(db.count_users_with_email("dup@example.com").unwrap(), 1);
}

#[test]
fn refresh_tokens_revoke_once_and_only_by_owner() {
    let db = Database::open_in_memory().unwrap();
    let owner = seed_user(&db, "owner@example.com");
    let other = seed_user(&db, "other@example.com");
    let jti = Uuid::new_v4().to_string();

    db.insert_refresh_token(&jti, &owner, "2999-01-01T00:00:00.000Z").unwrap();
    assert_eq!(db.active_refresh_token_owner(&jti).unwrap(), Some(owner.clone()));

    assert!(!db.revoke_refresh_token(&jti, &other).unwrap());
    assert!(db.revoke_refresh_token(&jti, &owner).unwrap());
    assert!(!db.revoke_refresh_token(&jti, &owner).unwrap());
    assert_eq!(db.active_refresh_token_owner(&jti).unwrap(), None);

    let expired = Uuid::new_v4().to_string();
    db.insert_refresh_token(&expired, &owner, "2000-01-01T00:00:00.000Z").unwrap();
    assert_eq!(db.active_refresh_token_owner(&expired).unwrap(), None);
}

#[test]
fn recent_feed_pages_by_cursor() {
    let db = Database::open_in_memory().unwrap();
    let author = seed_user(&db, "author@example.com");

    let mut ids = Vec::new();
    for i in 0..5 {
        let id = seed_post(&db, &author, &format!("post {i}"));
        set_created_at(&db, &id, &format!("2026-01-0{}T00:00:00.000Z", i + 1));
        ids.push(id);
    }

    let first = db.load_feed(None, PostFilter::Recent { before: None, limit: 2 }).unwrap();
    let first_ids: Vec<&str> = first.iter().map(|e| e.post.id.as_str()).collect();
    assert_eq!(first_ids, [ids[4].as_str(), ids[3].as_str()]);

    let last = &first.last().unwrap().post;
    let cursor = FeedCursor {
        created_at: &last.created_at,
        id: &last.id,
    };
    let second = db
        .load_feed(None, PostFilter::Recent { before: Some(cursor), limit: 10 })
        .unwrap();
    let second_ids: Vec<&str> = second.iter().map(|e| e.post.id.as_str()).collect();
    assert_eq!(second_ids, [ids[2].as_str(), ids[1].as_str(), ids[0].as_str()]);
}

#[test]
fn cursor_pages_through_shared_timestamps() {
    let db = Database::open_in_memory().unwrap();
    let author = seed_user(&db, "author@example.com");

    let mut ids = Vec::new();
    for i in 0..4 {
        let id = seed_post(&db, &author, &format!("post {i}"));
        set_created_at(&db, &id, "2026-01-01T00:00:00.000Z");
        ids.push(id);
    }
    let newest = seed_post(&db, &author, "newest");
    set_created_at(&db, &newest, "2026-01-02T00:00:00.000Z");

    let mut seen = Vec::new();
    let mut cursor: Option<(String, String)> = None;
    loop {
        let before = cursor.as_ref().map(|(created_at, id)| FeedCursor {
            created_at: created_at.as_str(),
            id: id.as_str(),
        });
        let page = db.load_feed(None, PostFilter::Recent { before, limit: 2 }).unwrap();
        let Some(last) = page.last() else { break };
        cursor = Some((last.post.created_at.clone(), last.post.id.clone()));
        seen.extend(page.into_iter().map(|e| e.post.id));
    }

    assert_eq!(seen.len(), 5);
    assert_eq!(seen[0], newest);
    ids.sort();
    ids.reverse();
    assert_eq!(&seen[1..], ids.as_slice());
}

#[test]
fn author_filter_excludes_other_users() {
    let db = Database::open_in_memory().unwrap();
    let alice = seed_user(&db, "alice@example.com");
    let bob = seed_user(&db, "bob@example.com");
    seed_post(&db, &alice, "mine");
    seed_post(&db, &bob, "theirs");

    let page = db.load_feed(Some(&alice), PostFilter::Author(&alice)).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].post.description, "mine");
    assert_eq!(db.count_posts_by_user(&alice).unwrap(), 1);
}
