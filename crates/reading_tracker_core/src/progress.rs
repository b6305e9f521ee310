//! Progress figures shown next to a book.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookStatus {
    ToRead,
    InProgress,
    Completed,
}

impl BookStatus {
    pub fn from_pages(completed_pages: i32, total_pages: i32) -> Self {
        if completed_pages <= 0 {
            BookStatus::ToRead
        } else if completed_pages == total_pages {
            BookStatus::Completed
        } else {
            BookStatus::InProgress
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookStatus::ToRead => "To Read",
            BookStatus::InProgress => "In Progress",
            BookStatus::Completed => "Completed",
        }
    }
}

/// Whole percent of the book covered, truncated. 0 for a book without pages.
pub fn progress_percent(completed_pages: i32, total_pages: i32) -> u32 {
    if total_pages <= 0 || completed_pages <= 0 {
        return 0;
    }
    (i64::from(completed_pages) * 100 / i64::from(total_pages)) as u32
}
