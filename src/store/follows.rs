use rusqlite::{params, Connection};

use crate::error::AppResult;

/// Record that `follower_id` follows `followed_id`. Get-or-create: a second
/// call against the same pair leaves the single existing row in place.
/// Callers reject self-follows before calling.
pub fn follow(conn: &Connection, follower_id: &str, followed_id: &str) -> AppResult<()> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT OR IGNORE INTO follows (id, follower_id, followed_id) VALUES (?1, ?2, ?3)",
        params![id, follower_id, followed_id],
    )?;
    Ok(())
}

/// Remove the relationship if present. Returns false (silent no-op) when no
/// such row exists.
pub fn unfollow(conn: &Connection, follower_id: &str, followed_id: &str) -> AppResult<bool> {
    let rows = conn.execute(
        "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower_id, followed_id],
    )?;
    Ok(rows > 0)
}

pub fn is_following(conn: &Connection, follower_id: &str, followed_id: &str) -> AppResult<bool> {
    let following: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower_id, followed_id],
        |r| r.get(0),
    )?;
    Ok(following)
}

pub fn follower_count(conn: &Connection, user_id: &str) -> AppResult<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE followed_id = ?1",
        params![user_id],
        |r| r.get(0),
    )?;
    Ok(count)
}

pub fn following_count(conn: &Connection, user_id: &str) -> AppResult<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
        params![user_id],
        |r| r.get(0),
    )?;
    Ok(count)
}

/// Ids of everyone the user follows. Feeds are computed from this set.
pub fn followed_user_ids(conn: &Connection, user_id: &str) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT followed_id FROM follows WHERE follower_id = ?1")?;
    let ids = stmt
        .query_map(params![user_id], |r| r.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
