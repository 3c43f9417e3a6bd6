use ripple::auth::password;
use ripple::db;
use ripple::store::{follows, posts, query, users};
use tempfile::TempDir;

fn test_pool(temp_dir: &TempDir) -> ripple::state::DbPool {
    let db_path = temp_dir.path().join("test.db");
    let pool = db::create_pool(&db_path).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    pool
}

fn seed_user(conn: &rusqlite::Connection, username: &str) -> String {
    let hash = password::hash_password("hunter2hunter2").unwrap();
    users::create_user(conn, username, &hash, None, None, None)
        .unwrap()
        .id
}

#[tokio::test]
async fn follow_feed_like_comment_flow() {
    let temp_dir = TempDir::new().unwrap();
    let pool = test_pool(&temp_dir);
    let conn = pool.get().unwrap();

    let alice = seed_user(&conn, "alice");
    let bob = seed_user(&conn, "bob");

    // Alice posts; Bob's feed is empty until he follows her
    let post = posts::create_post(&conn, &alice, "first light", None).unwrap();
    assert!(query::feed_for(&conn, &bob).unwrap().is_empty());

    follows::follow(&conn, &bob, &alice).unwrap();
    let feed = query::feed_for(&conn, &bob).unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, post.id);
    assert_eq!(feed[0].username, "alice");

    // A like, a comment, and a reply to that comment
    assert!(posts::toggle_like(&conn, &post.id, &bob).unwrap());
    assert_eq!(posts::like_count(&conn, &post.id).unwrap(), 1);

    let comment = posts::add_comment(&conn, &post.id, &bob, "beautiful", None).unwrap();
    let reply = posts::add_comment(&conn, &post.id, &alice, "thanks!", Some(comment.id.as_str())).unwrap();
    assert_eq!(reply.parent_comment_id.as_deref(), Some(comment.id.as_str()));

    let thread = posts::list_comments(&conn, &post.id).unwrap();
    assert_eq!(thread.len(), 2);
    // Oldest first
    assert_eq!(thread[0].id, comment.id);

    // Unfollow empties the feed again
    assert!(follows::unfollow(&conn, &bob, &alice).unwrap());
    assert!(query::feed_for(&conn, &bob).unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_post_removes_its_comments_and_likes() {
    let temp_dir = TempDir::new().unwrap();
    let pool = test_pool(&temp_dir);
    let conn = pool.get().unwrap();

    let alice = seed_user(&conn, "alice");
    let bob = seed_user(&conn, "bob");

    let post = posts::create_post(&conn, &alice, "short lived", None).unwrap();
    posts::toggle_like(&conn, &post.id, &bob).unwrap();
    posts::add_comment(&conn, &post.id, &bob, "nice", None).unwrap();

    // Bob cannot delete Alice's post, and nothing changes
    assert!(!posts::delete_post(&conn, &post.id, &bob).unwrap());
    assert!(posts::get(&conn, &post.id).unwrap().is_some());

    assert!(posts::delete_post(&conn, &post.id, &alice).unwrap());
    assert!(posts::get(&conn, &post.id).unwrap().is_none());

    let orphans: i64 = conn
        .query_row("SELECT count(*) FROM comments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(orphans, 0);
    let likes: i64 = conn
        .query_row("SELECT count(*) FROM likes", [], |r| r.get(0))
        .unwrap();
    assert_eq!(likes, 0);
}

#[tokio::test]
async fn replies_cannot_cross_posts() {
    let temp_dir = TempDir::new().unwrap();
    let pool = test_pool(&temp_dir);
    let conn = pool.get().unwrap();

    let alice = seed_user(&conn, "alice");
    let first = posts::create_post(&conn, &alice, "one", None).unwrap();
    let second = posts::create_post(&conn, &alice, "two", None).unwrap();
    let comment = posts::add_comment(&conn, &first.id, &alice, "on one", None).unwrap();

    let err = posts::add_comment(&conn, &second.id, &alice, "stray", Some(comment.id.as_str()));
    assert!(matches!(err, Err(ripple::error::AppError::BadRequest(_))));
}

#[tokio::test]
async fn profile_view_reflects_follow_counts() {
    let temp_dir = TempDir::new().unwrap();
    let pool = test_pool(&temp_dir);
    let conn = pool.get().unwrap();

    let alice = seed_user(&conn, "alice");
    let bob = seed_user(&conn, "bob");
    let carol = seed_user(&conn, "carol");

    posts::create_post(&conn, &alice, "hello all", None).unwrap();
    follows::follow(&conn, &bob, &alice).unwrap();
    follows::follow(&conn, &carol, &alice).unwrap();
    follows::follow(&conn, &alice, &bob).unwrap();

    let view = query::profile_view(&conn, "alice", Some(bob.as_str()))
        .unwrap()
        .unwrap();
    assert_eq!(view.follower_count, 2);
    assert_eq!(view.following_count, 1);
    assert!(view.is_following);
    assert_eq!(view.posts.len(), 1);

    let anon = query::profile_view(&conn, "alice", None).unwrap().unwrap();
    assert!(!anon.is_following);
}

#[tokio::test]
async fn search_spans_users_and_posts() {
    let temp_dir = TempDir::new().unwrap();
    let pool = test_pool(&temp_dir);
    let conn = pool.get().unwrap();

    let hash = password::hash_password("hunter2hunter2").unwrap();
    let rose =
        users::create_user(&conn, "rose", &hash, Some("Rose"), Some("Woods"), None).unwrap();
    posts::create_post(&conn, &rose.id, "a rose by any other name", None).unwrap();

    let both = query::global_search(&conn, "rose").unwrap();
    assert_eq!(both.result_type, "all");
    assert_eq!(both.users.len(), 1);
    assert_eq!(both.posts.len(), 1);

    let users_only = query::global_search(&conn, "woods").unwrap();
    assert_eq!(users_only.result_type, "users");

    let none = query::global_search(&conn, "tulip").unwrap();
    assert_eq!(none.result_type, "all");
    assert!(none.users.is_empty() && none.posts.is_empty());
}
