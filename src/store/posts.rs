use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::models::{Comment, Post};
use crate::error::{AppError, AppResult};

/// A post joined with its author's username, as the views present it.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub body: String,
    pub image_path: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub username: String,
    pub body: String,
    pub parent_comment_id: Option<String>,
    pub created_at: String,
}

const POST_VIEW_SELECT: &str = "SELECT p.id, p.user_id, u.username, p.body, p.image_path, p.created_at
     FROM posts p JOIN users u ON u.id = p.user_id";

pub(crate) fn map_post_view_row(row: &Row) -> Result<PostView, rusqlite::Error> {
    Ok(PostView {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        body: row.get(3)?,
        image_path: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn create_post(
    conn: &Connection,
    user_id: &str,
    body: &str,
    image_path: Option<&str>,
) -> AppResult<Post> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO posts (id, user_id, body, image_path) VALUES (?1, ?2, ?3, ?4)",
        params![id, user_id, body, image_path],
    )?;
    let post = conn.query_row(
        "SELECT id, user_id, body, image_path, created_at FROM posts WHERE id = ?1",
        params![id],
        |row| {
            Ok(Post {
                id: row.get(0)?,
                user_id: row.get(1)?,
                body: row.get(2)?,
                image_path: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )?;
    Ok(post)
}

pub fn get(conn: &Connection, post_id: &str) -> AppResult<Option<Post>> {
    let post = conn
        .query_row(
            "SELECT id, user_id, body, image_path, created_at FROM posts WHERE id = ?1",
            params![post_id],
            |row| {
                Ok(Post {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    body: row.get(2)?,
                    image_path: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(post)
}

/// Single post joined with its author, for the detail view.
pub fn get_view(conn: &Connection, post_id: &str) -> AppResult<Option<PostView>> {
    let post = conn
        .query_row(
            &format!("{} WHERE p.id = ?1", POST_VIEW_SELECT),
            params![post_id],
            map_post_view_row,
        )
        .optional()?;
    Ok(post)
}

/// Delete a post if the acting user owns it. A non-owner's attempt is a
/// silent no-op (returns false); a missing post is NotFound.
pub fn delete_post(conn: &Connection, post_id: &str, acting_user_id: &str) -> AppResult<bool> {
    let owner_id: String = conn
        .query_row(
            "SELECT user_id FROM posts WHERE id = ?1",
            params![post_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or(AppError::NotFound)?;

    if owner_id != acting_user_id {
        return Ok(false);
    }

    conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;
    Ok(true)
}

/// Add a comment, optionally as a reply. The parent must exist and belong to
/// the same post.
pub fn add_comment(
    conn: &Connection,
    post_id: &str,
    user_id: &str,
    body: &str,
    parent_comment_id: Option<&str>,
) -> AppResult<Comment> {
    if get(conn, post_id)?.is_none() {
        return Err(AppError::NotFound);
    }

    if let Some(parent_id) = parent_comment_id {
        let parent_post: String = conn
            .query_row(
                "SELECT post_id FROM comments WHERE id = ?1",
                params![parent_id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or(AppError::NotFound)?;
        if parent_post != post_id {
            return Err(AppError::BadRequest(
                "Parent comment belongs to a different post".into(),
            ));
        }
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO comments (id, post_id, user_id, body, parent_comment_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, post_id, user_id, body, parent_comment_id],
    )?;

    let comment = conn.query_row(
        "SELECT id, post_id, user_id, body, parent_comment_id, created_at
         FROM comments WHERE id = ?1",
        params![id],
        |row| {
            Ok(Comment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                body: row.get(3)?,
                parent_comment_id: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )?;
    Ok(comment)
}

/// Toggle the acting user's like on a post. Returns whether the post is
/// liked after the toggle.
pub fn toggle_like(conn: &Connection, post_id: &str, user_id: &str) -> AppResult<bool> {
    if get(conn, post_id)?.is_none() {
        return Err(AppError::NotFound);
    }

    let existing: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM likes WHERE post_id = ?1 AND user_id = ?2",
        params![post_id, user_id],
        |r| r.get(0),
    )?;

    if existing {
        conn.execute(
            "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
        )?;
        Ok(false)
    } else {
        conn.execute(
            "INSERT INTO likes (post_id, user_id) VALUES (?1, ?2)",
            params![post_id, user_id],
        )?;
        Ok(true)
    }
}

pub fn like_count(conn: &Connection, post_id: &str) -> AppResult<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
        params![post_id],
        |r| r.get(0),
    )?;
    Ok(count)
}

pub fn has_liked(conn: &Connection, post_id: &str, user_id: &str) -> AppResult<bool> {
    let liked: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM likes WHERE post_id = ?1 AND user_id = ?2",
        params![post_id, user_id],
        |r| r.get(0),
    )?;
    Ok(liked)
}

/// All posts, newest first. Backs the home view.
pub fn list_all(conn: &Connection) -> AppResult<Vec<PostView>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY p.created_at DESC, p.id DESC",
        POST_VIEW_SELECT
    ))?;
    let posts = stmt
        .query_map([], map_post_view_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn list_by_user(conn: &Connection, user_id: &str) -> AppResult<Vec<PostView>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE p.user_id = ?1 ORDER BY p.created_at DESC, p.id DESC",
        POST_VIEW_SELECT
    ))?;
    let posts = stmt
        .query_map(params![user_id], map_post_view_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// A post's comments in chronological thread order. Replies are not
/// re-sorted into a tree; consumers render the flat list.
pub fn list_comments(conn: &Connection, post_id: &str) -> AppResult<Vec<CommentView>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.post_id, c.user_id, u.username, c.body, c.parent_comment_id, c.created_at
         FROM comments c JOIN users u ON u.id = c.user_id
         WHERE c.post_id = ?1
         ORDER BY c.created_at ASC, c.id ASC",
    )?;
    let comments = stmt
        .query_map(params![post_id], |row| {
            Ok(CommentView {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                username: row.get(3)?,
                body: row.get(4)?,
                parent_comment_id: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// Case-insensitive substring search on post bodies.
pub fn search_posts(conn: &Connection, query: &str) -> AppResult<Vec<PostView>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE instr(lower(p.body), lower(?1)) > 0
         ORDER BY p.created_at DESC, p.id DESC",
        POST_VIEW_SELECT
    ))?;
    let posts = stmt
        .query_map(params![query], map_post_view_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}
