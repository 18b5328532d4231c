//! Wire types shared by the endpoints and the stores.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub hash_id: String,
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub is_starred: bool,
    /// Seconds since the epoch; `None` until the book is first read.
    #[serde(default)]
    pub last_read_time: Option<f64>,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_mtime: f64,
    /// `None` iff the book has never been opened.
    #[serde(default)]
    pub chapter_index: Option<usize>,
    #[serde(default)]
    pub chapter_offset: Option<u64>,
    #[serde(default)]
    pub is_finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<Chapter>>,
}

impl Book {
    pub fn is_started(&self) -> bool {
        self.chapter_index.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub id: Option<i64>,
    pub book_id: i64,
    pub title: String,
    pub order_index: usize,
    /// Absent from listings; chapter text is fetched separately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProgress {
    pub chapter_index: usize,
    pub chapter_offset: u64,
}

/// Query filters for `GET books`. `None` fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBooksParams {
    pub starred: Option<bool>,
    pub search: Option<String>,
    pub finished: Option<bool>,
    pub started: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub message: String,
    #[serde(default)]
    pub files_scanned: u64,
    #[serde(default)]
    pub files_added: u64,
    #[serde(default)]
    pub files_updated: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    pub is_running: bool,
    #[serde(default)]
    pub files_scanned: u64,
    #[serde(default)]
    pub files_added: u64,
    #[serde(default)]
    pub files_updated: u64,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub current_file: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemVersion {
    pub app_version: String,
    #[serde(default)]
    pub database_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}
