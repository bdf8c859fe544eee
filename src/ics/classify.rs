//! Event type classification for imported calendar events.
//!
//! An ordered keyword table decides the item type from the event text.
//! Earlier rules win, so a summary mentioning both "assignment" and "exam"
//! classifies as an assignment.

/// Ordered `(keyword, item type)` rules checked against the lowercased
/// event text. The first keyword found decides the type.
const TYPE_RULES: &[(&str, &str)] = &[
    ("assignment", "assignment"),
    ("homework", "assignment"),
    ("quiz", "quiz"),
    ("test", "quiz"),
    ("exam", "exam"),
    ("project", "project"),
    ("reading", "reading"),
    ("discussion", "discussion"),
];

/// Item type used when no rule matches
pub const DEFAULT_ITEM_TYPE: &str = "event";

/// Classifies a calendar event by keyword lookup over its summary and
/// description.
pub fn classify_event(summary: &str, description: &str) -> &'static str {
    let haystack = format!("{} {}", summary, description).to_lowercase();

    TYPE_RULES
        .iter()
        .find(|(keyword, _)| haystack.contains(keyword))
        .map(|(_, item_type)| *item_type)
        .unwrap_or(DEFAULT_ITEM_TYPE)
}
