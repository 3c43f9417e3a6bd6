//! Read-side views composed from the stores: the feed, the profile page and
//! global search.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::models::User;
use crate::error::AppResult;
use crate::store::posts::{map_post_view_row, PostView};
use crate::store::{follows, posts, users};

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user: User,
    pub posts: Vec<PostView>,
    pub is_following: bool,
    pub follower_count: i64,
    pub following_count: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub users: Vec<User>,
    pub posts: Vec<PostView>,
    pub result_type: String,
}

/// Posts authored by anyone the user follows, newest first. Unbounded.
pub fn feed_for(conn: &Connection, user_id: &str) -> AppResult<Vec<PostView>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.user_id, u.username, p.body, p.image_path, p.created_at
         FROM posts p JOIN users u ON u.id = p.user_id
         WHERE p.user_id IN (SELECT followed_id FROM follows WHERE follower_id = ?1)
         ORDER BY p.created_at DESC, p.id DESC",
    )?;
    let feed = stmt
        .query_map(params![user_id], map_post_view_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(feed)
}

/// Everything the profile page needs. `is_following` is false for
/// unauthenticated viewers. None when the username does not exist.
pub fn profile_view(
    conn: &Connection,
    username: &str,
    viewer_id: Option<&str>,
) -> AppResult<Option<ProfileView>> {
    let Some(user) = users::find_by_username(conn, username)? else {
        return Ok(None);
    };

    let posts = posts::list_by_user(conn, &user.id)?;
    let is_following = match viewer_id {
        Some(viewer) => follows::is_following(conn, viewer, &user.id)?,
        None => false,
    };
    let follower_count = follows::follower_count(conn, &user.id)?;
    let following_count = follows::following_count(conn, &user.id)?;

    Ok(Some(ProfileView {
        user,
        posts,
        is_following,
        follower_count,
        following_count,
    }))
}

/// Keyword search across users and posts. `result_type` is "users" when only
/// users matched, "posts" when only posts matched, and "all" otherwise —
/// including when nothing matched at all.
pub fn global_search(conn: &Connection, query: &str) -> AppResult<SearchResults> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(SearchResults {
            users: Vec::new(),
            posts: Vec::new(),
            result_type: "all".to_string(),
        });
    }

    let users = users::search_users(conn, query)?;
    let posts = posts::search_posts(conn, query)?;

    let result_type = if !users.is_empty() && posts.is_empty() {
        "users"
    } else if !posts.is_empty() && users.is_empty() {
        "posts"
    } else {
        "all"
    };

    Ok(SearchResults {
        users,
        posts,
        result_type: result_type.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::store::users::create_user;

    fn seed_user(conn: &Connection, username: &str) -> String {
        create_user(conn, username, "hash", None, None, None).unwrap().id
    }

    #[test]
    fn feed_contains_only_followed_users_posts() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");
        let carol = seed_user(&conn, "carol");

        posts::create_post(&conn, &alice, "from alice", None).unwrap();
        posts::create_post(&conn, &carol, "from carol", None).unwrap();
        posts::create_post(&conn, &bob, "bob's own", None).unwrap();

        follows::follow(&conn, &bob, &alice).unwrap();

        let feed = feed_for(&conn, &bob).unwrap();
        let bodies: Vec<_> = feed.iter().map(|p| p.body.as_str()).collect();
        assert_eq!(bodies, vec!["from alice"]);
        // Never the viewer's own posts: bob does not follow himself
        assert!(feed.iter().all(|p| p.user_id != bob));
    }

    #[test]
    fn profile_view_aggregates_counts_and_follow_state() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "alice");
        let bob = seed_user(&conn, "bob");
        let carol = seed_user(&conn, "carol");

        posts::create_post(&conn, &alice, "post one", None).unwrap();
        follows::follow(&conn, &bob, &alice).unwrap();
        follows::follow(&conn, &carol, &alice).unwrap();
        follows::follow(&conn, &alice, &bob).unwrap();

        let view = profile_view(&conn, "alice", Some(bob.as_str())).unwrap().unwrap();
        assert_eq!(view.user.id, alice);
        assert_eq!(view.posts.len(), 1);
        assert!(view.is_following);
        assert_eq!(view.follower_count, 2);
        assert_eq!(view.following_count, 1);

        // Unauthenticated viewer never "follows"
        let anon = profile_view(&conn, "alice", None).unwrap().unwrap();
        assert!(!anon.is_following);

        assert!(profile_view(&conn, "nobody", None).unwrap().is_none());
    }

    #[test]
    fn global_search_classifies_result_type() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "alice");
        posts::create_post(&conn, &alice, "a post about rust", None).unwrap();

        let only_users = global_search(&conn, "alice").unwrap();
        assert_eq!(only_users.result_type, "users");
        assert_eq!(only_users.users.len(), 1);
        assert!(only_users.posts.is_empty());

        let only_posts = global_search(&conn, "rust").unwrap();
        assert_eq!(only_posts.result_type, "posts");
        assert_eq!(only_posts.posts.len(), 1);

        let nothing = global_search(&conn, "zzz_no_match").unwrap();
        assert_eq!(nothing.result_type, "all");
        assert!(nothing.users.is_empty());
        assert!(nothing.posts.is_empty());
    }

    #[test]
    fn global_search_both_kinds_is_all() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let alice = seed_user(&conn, "wave");
        posts::create_post(&conn, &alice, "wave hello", None).unwrap();

        let both = global_search(&conn, "wave").unwrap();
        assert_eq!(both.result_type, "all");
        assert_eq!(both.users.len(), 1);
        assert_eq!(both.posts.len(), 1);
    }

    #[test]
    fn empty_query_returns_nothing() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let results = global_search(&conn, "   ").unwrap();
        assert!(results.users.is_empty());
        assert!(results.posts.is_empty());
        assert_eq!(results.result_type, "all");
    }
}
