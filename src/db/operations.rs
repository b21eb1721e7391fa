use std::path::Path;

use anyhow::Context;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::content::models::Post;
use crate::db::connection::DatabaseConnection;
use crate::db::models::PostSummary;

const PROGRESS_KEY_PREFIX: &str = "progress:";
const ACCESS_KEY_PREFIX: &str = "access:";

/// Database operations for client state and the content library
pub struct DbOperations;

impl DbOperations {
    /// Read a JSON value from the key-value store
    pub fn get_value<T: DeserializeOwned>(
        db: &DatabaseConnection,
        key: &str,
    ) -> Result<Option<T>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("Malformed value stored under {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Write a JSON value to the key-value store, replacing any previous value
    pub fn set_value<T: Serialize>(
        db: &DatabaseConnection,
        key: &str,
        value: &T,
    ) -> Result<(), anyhow::Error> {
        let raw = serde_json::to_string(value)?;
        let now = chrono::Utc::now().timestamp();

        let conn = db.get_connection();
        let conn = conn.lock();
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, raw, now],
        )?;

        Ok(())
    }

    pub fn progress_key(post_id: &str) -> String {
        format!("{}{}", PROGRESS_KEY_PREFIX, post_id)
    }

    /// Stored completed-section counter for a post
    pub fn get_progress(
        db: &DatabaseConnection,
        post_id: &str,
    ) -> Result<Option<i64>, anyhow::Error> {
        Self::get_value(db, &Self::progress_key(post_id))
    }

    pub fn set_progress(
        db: &DatabaseConnection,
        post_id: &str,
        completed_sections: i64,
    ) -> Result<(), anyhow::Error> {
        Self::set_value(db, &Self::progress_key(post_id), &completed_sections)
    }

    /// Whether a premium post has been unlocked on this device
    pub fn has_access(
        db: &DatabaseConnection,
        post_id: &str,
    ) -> Result<bool, anyhow::Error> {
        let key = format!("{}{}", ACCESS_KEY_PREFIX, post_id);
        Ok(Self::get_value::<bool>(db, &key)?.unwrap_or(false))
    }

    pub fn grant_access(
        db: &DatabaseConnection,
        post_id: &str,
    ) -> Result<(), anyhow::Error> {
        let key = format!("{}{}", ACCESS_KEY_PREFIX, post_id);
        Self::set_value(db, &key, &true)
    }

    /// Insert or replace a post, keeping its original date_added
    pub fn upsert_post(
        db: &DatabaseConnection,
        post: &Post,
        file_path: &str,
        date_modified: i64,
    ) -> Result<(), anyhow::Error> {
        let blocks = serde_json::to_string(&post.blocks)?;
        let now = chrono::Utc::now().timestamp();

        let conn = db.get_connection();
        let conn = conn.lock();
        conn.execute(
            "INSERT INTO posts (id, title, kind, is_premium, blocks, file_path, date_added, date_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                kind = excluded.kind,
                is_premium = excluded.is_premium,
                blocks = excluded.blocks,
                file_path = excluded.file_path,
                date_modified = excluded.date_modified",
            params![
                post.id,
                post.title,
                post.kind.as_str(),
                post.is_premium,
                blocks,
                file_path,
                now,
                date_modified,
            ],
        )?;

        Ok(())
    }

    /// Load a full post by id
    pub fn get_post(
        db: &DatabaseConnection,
        post_id: &str,
    ) -> Result<Option<Post>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let row = conn
            .query_row(
                "SELECT id, title, kind, is_premium, blocks FROM posts WHERE id = ?1",
                params![post_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, title, kind, is_premium, blocks)) = row else {
            return Ok(None);
        };

        let kind = serde_json::from_value(serde_json::Value::String(kind))
            .with_context(|| format!("Unknown post kind stored for {}", id))?;
        let blocks = serde_json::from_str(&blocks)
            .with_context(|| format!("Malformed blocks stored for {}", id))?;

        Ok(Some(Post {
            id,
            title,
            kind,
            is_premium,
            blocks,
        }))
    }

    /// Get all posts, most recently modified first
    pub fn get_all_posts(
        db: &DatabaseConnection,
    ) -> Result<Vec<PostSummary>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let mut stmt = conn.prepare(
            "SELECT id, title, kind, is_premium, file_path, date_modified
             FROM posts
             ORDER BY date_modified DESC, title ASC",
        )?;

        let posts = stmt
            .query_map([], |row| {
                Ok(PostSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    kind: row.get(2)?,
                    is_premium: row.get(3)?,
                    file_path: row.get(4)?,
                    date_modified: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    /// Latest date_modified recorded for posts indexed from a file
    pub fn get_file_modified(
        db: &DatabaseConnection,
        file_path: &str,
    ) -> Result<Option<i64>, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let modified: Option<i64> = conn.query_row(
            "SELECT MAX(date_modified) FROM posts WHERE file_path = ?1",
            params![file_path],
            |row| row.get(0),
        )?;

        Ok(modified)
    }

    /// Remove posts indexed from files under `root` that are no longer present;
    /// returns the number removed. Posts from other roots are left alone.
    pub fn remove_missing_posts(
        db: &DatabaseConnection,
        root: &Path,
        existing_files: &[String],
    ) -> Result<usize, anyhow::Error> {
        let indexed = Self::get_all_posts(db)?;

        let conn = db.get_connection();
        let conn = conn.lock();
        let mut removed = 0;
        for post in indexed {
            let under_root = Path::new(&post.file_path).starts_with(root);
            if under_root && !existing_files.contains(&post.file_path) {
                removed += conn.execute("DELETE FROM posts WHERE id = ?1", params![post.id])?;
            }
        }

        Ok(removed)
    }

    /// Remove posts recorded against `file_path` whose ids the file no longer contains
    pub fn remove_stale_file_posts(
        db: &DatabaseConnection,
        file_path: &str,
        current_ids: &[&str],
    ) -> Result<usize, anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();

        let mut stmt = conn.prepare("SELECT id FROM posts WHERE file_path = ?1")?;
        let stale = stmt
            .query_map(params![file_path], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|id| !current_ids.contains(&id.as_str()))
            .collect::<Vec<_>>();
        drop(stmt);

        let mut removed = 0;
        for id in stale {
            removed += conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        }
        Ok(removed)
    }

    /// Clear the content library. Progress and access grants are kept.
    pub fn clear_library(db: &DatabaseConnection) -> Result<(), anyhow::Error> {
        let conn = db.get_connection();
        let conn = conn.lock();
        conn.execute("DELETE FROM posts", [])?;
        Ok(())
    }
}
