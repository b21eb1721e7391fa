use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::content::models::Post;
use crate::db::connection::DatabaseConnection;
use crate::db::operations::DbOperations;

/// Result of an indexing operation
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexingResult {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub updated: usize,
    pub posts: usize,
    pub removed: usize,
    pub errors: Vec<String>,
}

/// Progress update for indexing
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexingProgress {
    pub current: usize,
    pub total: usize,
    pub current_file: String,
}

/// A post file holds one post or a list of posts
#[derive(Deserialize)]
#[serde(untagged)]
enum PostFile {
    Many(Vec<Post>),
    One(Box<Post>),
}

impl PostFile {
    fn into_posts(self) -> Vec<Post> {
        match self {
            PostFile::Many(posts) => posts,
            PostFile::One(post) => vec![*post],
        }
    }
}

/// Library indexer for adding posts to the database
pub struct LibraryIndexer;

impl LibraryIndexer {
    /// Index the post files found under `root` into the database with progress callback
    pub fn index_files_with_progress<P: AsRef<Path>, F>(
        root: &Path,
        paths: &[P],
        db: &DatabaseConnection,
        mut progress_callback: F,
    ) -> Result<IndexingResult, anyhow::Error>
    where
        F: FnMut(IndexingProgress),
    {
        let total_files = paths.len();
        let mut successful = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let mut updated = 0;
        let mut posts = 0;
        let mut removed = 0;
        let mut errors = Vec::new();

        for (index, path) in paths.iter().enumerate() {
            let path_ref = path.as_ref();

            // Send progress update
            progress_callback(IndexingProgress {
                current: index + 1,
                total: total_files,
                current_file: path_ref
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            });

            match Self::index_single_file(path_ref, db) {
                Ok(Some((written, dropped))) => {
                    updated += 1;
                    posts += written;
                    removed += dropped;
                    successful += 1;
                }
                Ok(None) => {
                    skipped += 1;
                    successful += 1;
                }
                Err(e) => {
                    failed += 1;
                    errors.push(format!("{}: {}", path_ref.display(), e));
                    warn!("Failed to index {}: {}", path_ref.display(), e);
                }
            }
        }

        // Drop posts whose files disappeared from this root
        let existing: Vec<String> = paths
            .iter()
            .map(|p| p.as_ref().to_string_lossy().to_string())
            .collect();
        removed += DbOperations::remove_missing_posts(db, root, &existing)?;

        Ok(IndexingResult {
            total_files,
            successful,
            failed,
            skipped,
            updated,
            posts,
            removed,
            errors,
        })
    }

    /// Index a single post file. Returns the number of posts written and the
    /// number of posts dropped from it, or `None` if the file is unchanged.
    fn index_single_file(
        path: &Path,
        db: &DatabaseConnection,
    ) -> Result<Option<(usize, usize)>, anyhow::Error> {
        let file_path = path.to_string_lossy().to_string();
        let modified_timestamp = std::fs::metadata(path)?
            .modified()?
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs() as i64;

        // Skip if file wasn't modified since last index
        if let Some(last_indexed) = DbOperations::get_file_modified(db, &file_path)? {
            if modified_timestamp <= last_indexed {
                debug!("Unchanged, skipping {}", file_path);
                return Ok(None);
            }
        }

        let content = std::fs::read_to_string(path)?;
        let posts = serde_json::from_str::<PostFile>(&content)?.into_posts();

        // Validate everything before writing anything from this file
        for post in &posts {
            post.validate()
                .map_err(|e| anyhow::anyhow!("Post '{}': {}", post.id, e))?;
        }

        for post in &posts {
            DbOperations::upsert_post(db, post, &file_path, modified_timestamp)?;
        }

        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        let dropped = DbOperations::remove_stale_file_posts(db, &file_path, &ids)?;

        debug!("Indexed {} post(s) from {}, dropped {}", posts.len(), file_path, dropped);
        Ok(Some((posts.len(), dropped)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::scanner::DirectoryScanner;
    use std::fs;

    const COURSE: &str = r#"{
        "id": "course-1", "title": "Dating 101", "type": "course",
        "blocks": [ { "type": "header", "content": "Week 1" } ]
    }"#;

    const ARTICLES: &str = r#"[
        { "id": "a1", "title": "First", "type": "article" },
        { "id": "a2", "title": "Second", "type": "podcast", "isPremium": true }
    ]"#;

    const BAD_QUIZ: &str = r#"{
        "id": "bad", "title": "Bad", "type": "course",
        "blocks": [ { "type": "quiz", "meta": { "questions": [
            { "question": "?", "options": ["only"], "correctAnswerIndex": 0 }
        ] } } ]
    }"#;

    #[test]
    fn test_index_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("course.json"), COURSE).unwrap();
        fs::write(dir.path().join("articles.json"), ARTICLES).unwrap();
        fs::write(dir.path().join("bad.json"), BAD_QUIZ).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let db = DatabaseConnection::open_in_memory().unwrap();
        let files = DirectoryScanner::scan(dir.path()).unwrap();

        let mut progress_calls = 0;
        let result = LibraryIndexer::index_files_with_progress(dir.path(), &files, &db, |_| progress_calls += 1).unwrap();

        assert_eq!(progress_calls, 4);
        assert_eq!(result.total_files, 4);
        assert_eq!(result.successful, 2);
        assert_eq!(result.failed, 2);
        assert_eq!(result.posts, 3);
        assert_eq!(result.errors.len(), 2);
        assert!(DbOperations::get_post(&db, "bad").unwrap().is_none());
        assert!(DbOperations::get_post(&db, "a2").unwrap().unwrap().is_premium);
    }

    #[test]
    fn test_unchanged_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("course.json"), COURSE).unwrap();

        let db = DatabaseConnection::open_in_memory().unwrap();
        let files = DirectoryScanner::scan(dir.path()).unwrap();

        let first = LibraryIndexer::index_files_with_progress(dir.path(), &files, &db, |_| {}).unwrap();
        assert_eq!(first.updated, 1);
        let second = LibraryIndexer::index_files_with_progress(dir.path(), &files, &db, |_| {}).unwrap();
        assert_eq!(second.skipped, 1);
        assert_eq!(second.updated, 0);
    }

    #[test]
    fn test_removed_files_drop_posts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("course.json"), COURSE).unwrap();
        fs::write(dir.path().join("articles.json"), ARTICLES).unwrap();

        let db = DatabaseConnection::open_in_memory().unwrap();
        let files = DirectoryScanner::scan(dir.path()).unwrap();
        LibraryIndexer::index_files_with_progress(dir.path(), &files, &db, |_| {}).unwrap();

        fs::remove_file(dir.path().join("articles.json")).unwrap();
        let files = DirectoryScanner::scan(dir.path()).unwrap();
        let result = LibraryIndexer::index_files_with_progress(dir.path(), &files, &db, |_| {}).unwrap();

        assert_eq!(result.removed, 2);
        assert_eq!(DbOperations::get_all_posts(&db).unwrap().len(), 1);
    }

    #[test]
    fn test_scanning_second_root_keeps_first() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("course.json"), COURSE).unwrap();
        fs::write(second.path().join("articles.json"), ARTICLES).unwrap();

        let db = DatabaseConnection::open_in_memory().unwrap();
        let files = DirectoryScanner::scan(first.path()).unwrap();
        LibraryIndexer::index_files_with_progress(first.path(), &files, &db, |_| {}).unwrap();

        let files = DirectoryScanner::scan(second.path()).unwrap();
        let result = LibraryIndexer::index_files_with_progress(second.path(), &files, &db, |_| {}).unwrap();

        assert_eq!(result.removed, 0);
        assert!(DbOperations::get_post(&db, "course-1").unwrap().is_some());
        assert_eq!(DbOperations::get_all_posts(&db).unwrap().len(), 3);
    }

    #[test]
    fn test_post_dropped_from_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        fs::write(&path, ARTICLES).unwrap();

        let db = DatabaseConnection::open_in_memory().unwrap();
        let files = DirectoryScanner::scan(dir.path()).unwrap();
        LibraryIndexer::index_files_with_progress(dir.path(), &files, &db, |_| {}).unwrap();

        fs::write(&path, r#"[ { "id": "a1", "title": "First", "type": "article" } ]"#).unwrap();
        // Make sure the rewrite registers as newer
        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let result = LibraryIndexer::index_files_with_progress(dir.path(), &files, &db, |_| {}).unwrap();
        assert_eq!(result.updated, 1);
        assert_eq!(result.removed, 1);
        assert!(DbOperations::get_post(&db, "a2").unwrap().is_none());
        assert!(DbOperations::get_post(&db, "a1").unwrap().is_some());
    }
}
