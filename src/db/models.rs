// Data models
use serde::{Deserialize, Serialize};

/// Row summary of an indexed post, without its blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub is_premium: bool,
    pub file_path: String,
    pub date_modified: i64,
}
