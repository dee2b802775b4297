use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("history too long, maximum {max} items")]
    HistoryTooLong { max: usize },
    #[error("message is empty")]
    EmptyMessage,
    #[error("message too long, maximum {max} characters")]
    MessageTooLong { max: usize },
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("<[^>]*>").expect("tag pattern compiles"))
}

/// Strips NUL bytes and markup-looking `<...>` runs, then trims. Empty input
/// stays empty.
pub fn sanitize(raw: &str) -> String {
    let without_nulls: String = raw.chars().filter(|c| *c != '\0').collect();
    let without_tags = tag_pattern().replace_all(&without_nulls, "");
    without_tags.trim().to_string()
}

/// Structural checks on the already-sanitized message and the raw history.
/// Pure; runs before any store or upstream I/O. Check order is fixed:
/// history bound, then emptiness, then message bound.
pub fn validate(
    sanitized_message: &str,
    history: &[String],
    max_history_items: usize,
    max_message_chars: usize,
) -> Result<(), ValidationError> {
    if history.len() > max_history_items {
        return Err(ValidationError::HistoryTooLong {
            max: max_history_items,
        });
    }
    if sanitized_message.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    if sanitized_message.chars().count() > max_message_chars {
        return Err(ValidationError::MessageTooLong {
            max: max_message_chars,
        });
    }
    Ok(())
}
