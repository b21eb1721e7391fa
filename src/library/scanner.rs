use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of post files in a content directory
const POST_EXTENSION: &str = "json";

/// Scanner for finding post files in a directory tree
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Scan a directory recursively and return all post file paths, sorted
    pub fn scan<P: AsRef<Path>>(directory: P) -> Result<Vec<PathBuf>, anyhow::Error> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            anyhow::bail!("Not a directory: {}", directory.display());
        }

        let mut post_files = Vec::new();

        for entry in WalkDir::new(directory)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            // Skip directories
            if !path.is_file() {
                continue;
            }

            // Skip hidden files such as editor swap files
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(false);
            if hidden {
                continue;
            }

            if let Some(extension) = path.extension() {
                if extension.to_string_lossy().eq_ignore_ascii_case(POST_EXTENSION) {
                    post_files.push(path.to_path_buf());
                }
            }
        }

        post_files.sort();
        Ok(post_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_finds_json_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("courses")).unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("courses/b.JSON"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join(".draft.json"), "{}").unwrap();

        let files = DirectoryScanner::scan(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.ends_with("courses/b.JSON")));
    }

    #[test]
    fn test_scan_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirectoryScanner::scan(dir.path().join("nope")).is_err());
    }
}
