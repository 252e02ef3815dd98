//! Core types for the task manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of characters in a task title.
pub const MAX_TITLE_LEN: usize = 255;

/// A task as stored and as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Reasons a title is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleError {
    /// Missing, empty, or whitespace-only.
    Blank,
    /// More than [`MAX_TITLE_LEN`] characters after trimming.
    TooLong,
}

impl fmt::Display for TitleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleError::Blank => write!(f, "Task title is required"),
            TitleError::TooLong => write!(
                f,
                "Task title must be at most {} characters",
                MAX_TITLE_LEN
            ),
        }
    }
}

impl std::error::Error for TitleError {}

/// A validated task title: trimmed, non-empty, at most 255 characters.
///
/// Stores only accept this type, so a blank title can never reach a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTitle(String);

impl TaskTitle {
    pub fn parse(raw: &str) -> Result<Self, TitleError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TitleError::Blank);
        }
        if trimmed.chars().count() > MAX_TITLE_LEN {
            return Err(TitleError::TooLong);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_trimmed() {
        let title = TaskTitle::parse("  Buy milk \n").unwrap();
        assert_eq!(title.as_str(), "Buy milk");
    }

    #[test]
    fn blank_titles_are_rejected() {
        assert_eq!(TaskTitle::parse(""), Err(TitleError::Blank));
        assert_eq!(TaskTitle::parse("   \t\n"), Err(TitleError::Blank));
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        let exact: String = "é".repeat(MAX_TITLE_LEN);
        assert!(TaskTitle::parse(&exact).is_ok());

        let over: String = "x".repeat(MAX_TITLE_LEN + 1);
        assert_eq!(TaskTitle::parse(&over), Err(TitleError::TooLong));
    }

    #[test]
    fn task_serializes_with_wire_field_names() {
        let task = Task {
            id: 7,
            title: "Write docs".to_string(),
            completed: false,
            created_at: "2024-05-01T10:00:00.250Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["title"], "Write docs");
        assert_eq!(json["completed"], false);
        assert!(json["created_at"].as_str().unwrap().starts_with("2024-05-01T10:00:00.250"));
    }
}
