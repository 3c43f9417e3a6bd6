use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::auth::password;
use crate::db::models::User;
use crate::error::AppResult;

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, avatar_path, password_hash, created_at";

fn map_user(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        avatar_path: row.get(4)?,
        password_hash: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    avatar_path: Option<&str>,
) -> AppResult<User> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO users (id, username, first_name, last_name, avatar_path, password_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, username, first_name, last_name, avatar_path, password_hash],
    )?;

    let user = conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![id],
        map_user,
    )?;
    Ok(user)
}

pub fn username_taken(conn: &Connection, username: &str) -> AppResult<bool> {
    let taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn find_by_username(conn: &Connection, username: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
            params![username],
            map_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

/// Check a username/password pair. Returns the user on success, None on
/// unknown username or wrong password.
pub fn verify_credentials(
    conn: &Connection,
    username: &str,
    password_attempt: &str,
) -> AppResult<Option<User>> {
    let Some(user) = find_by_username(conn, username)? else {
        return Ok(None);
    };
    if password::verify_password(password_attempt, &user.password_hash) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Replace the profile fields. Absent names clear the stored value, matching
/// a full form submit; the avatar only changes when a new one is given.
pub fn update_profile(
    conn: &Connection,
    user_id: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    avatar_path: Option<&str>,
) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET first_name = ?2, last_name = ?3 WHERE id = ?1",
        params![user_id, first_name, last_name],
    )?;
    if let Some(path) = avatar_path {
        conn.execute(
            "UPDATE users SET avatar_path = ?2 WHERE id = ?1",
            params![user_id, path],
        )?;
    }
    Ok(())
}

pub fn update_avatar(conn: &Connection, user_id: &str, avatar_path: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET avatar_path = ?2 WHERE id = ?1",
        params![user_id, avatar_path],
    )?;
    Ok(())
}

pub fn update_password(conn: &Connection, user_id: &str, new_hash: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET password_hash = ?2 WHERE id = ?1",
        params![user_id, new_hash],
    )?;
    Ok(())
}

/// Case-insensitive substring search over username, first and last name.
pub fn search_users(conn: &Connection, query: &str) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users
         WHERE instr(lower(username), lower(?1)) > 0
            OR instr(lower(COALESCE(first_name, '')), lower(?1)) > 0
            OR instr(lower(COALESCE(last_name, '')), lower(?1)) > 0",
        USER_COLUMNS
    ))?;
    let users = stmt
        .query_map(params![query], map_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}
