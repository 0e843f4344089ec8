// corpusboard - core/filter.rs
//
// Composable filter engine for activity entries.
// All active filters are AND-combined.
// Core layer: pure logic, no I/O dependencies.

use crate::core::model::{ActivityEntry, ActivityStatus};
use crate::util::error::FilterError;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashSet;

/// Complete filter state. All fields are AND-combined when applied.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Statuses to include (empty = all).
    pub statuses: HashSet<ActivityStatus>,

    /// Start of time range (inclusive). None = no lower bound.
    pub time_start: Option<DateTime<Utc>>,

    /// End of time range (inclusive). None = no upper bound.
    pub time_end: Option<DateTime<Utc>>,

    /// Substring search over action and details (case-insensitive). Empty = no filter.
    pub text_search: String,

    /// Compiled regex search over the action. None = no regex filter.
    pub regex_search: Option<Regex>,
}

impl ActivityFilter {
    /// Returns true if no filters are active.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
            && self.time_start.is_none()
            && self.time_end.is_none()
            && self.text_search.is_empty()
            && self.regex_search.is_none()
    }

    /// Set the regex search pattern, compiling it.
    /// Returns an error if the pattern is invalid.
    pub fn set_regex(&mut self, pattern: &str) -> Result<(), FilterError> {
        if pattern.is_empty() {
            self.regex_search = None;
            return Ok(());
        }
        let regex = Regex::new(pattern).map_err(|e| FilterError::InvalidRegex {
            pattern: pattern.to_string(),
            source: e,
        })?;
        self.regex_search = Some(regex);
        Ok(())
    }

    /// Quick-filter for failures and warnings.
    pub fn problems_only() -> Self {
        let mut statuses = HashSet::new();
        statuses.insert(ActivityStatus::Warning);
        statuses.insert(ActivityStatus::Error);
        Self {
            statuses,
            ..Default::default()
        }
    }
}

/// Apply filters to a slice of entries, returning indices of matching entries.
///
/// Indices preserve the input order, so a newest-first slice yields a
/// newest-first result.
pub fn apply_filters(entries: &[ActivityEntry], filter: &ActivityFilter) -> Vec<usize> {
    if filter.is_empty() {
        return (0..entries.len()).collect();
    }

    let text_lower = filter.text_search.to_lowercase();

    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| matches_all(entry, filter, &text_lower))
        .map(|(idx, _)| idx)
        .collect()
}

/// Check if a single entry matches all active filters.
fn matches_all(entry: &ActivityEntry, filter: &ActivityFilter, text_lower: &str) -> bool {
    if !filter.statuses.is_empty() && !filter.statuses.contains(&entry.status) {
        return false;
    }

    if let Some(start) = filter.time_start {
        if entry.timestamp < start {
            return false;
        }
    }
    if let Some(end) = filter.time_end {
        if entry.timestamp > end {
            return false;
        }
    }

    if !text_lower.is_empty() {
        let in_action = entry.action.to_lowercase().contains(text_lower);
        let in_details = entry
            .details
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(text_lower));
        if !in_action && !in_details {
            return false;
        }
    }

    if let Some(ref regex) = filter.regex_search {
        if !regex.is_match(&entry.action) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_entry(id: u64, status: ActivityStatus, action: &str) -> ActivityEntry {
        ActivityEntry {
            id,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 3, 22, id as u32, 0).unwrap(),
            action: action.to_string(),
            status,
            details: None,
        }
    }

    #[test]
    fn test_empty_filter_returns_all() {
        let entries = vec![
            make_entry(1, ActivityStatus::Success, "arXiv collection completed"),
            make_entry(2, ActivityStatus::Running, "GitHub collection started"),
        ];
        let result = apply_filters(&entries, &ActivityFilter::default());
        assert_eq!(result, vec![0, 1]);
    }

    #[test]
    fn test_status_filter() {
        let entries = vec![
            make_entry(1, ActivityStatus::Error, "FRED collection failed"),
            make_entry(2, ActivityStatus::Info, "Batch operation started"),
            make_entry(3, ActivityStatus::Warning, "Stopped GitHub collection"),
        ];
        let result = apply_filters(&entries, &ActivityFilter::problems_only());
        assert_eq!(result, vec![0, 2]);
    }

    #[test]
    fn test_text_search_covers_details() {
        let mut with_details = make_entry(1, ActivityStatus::Success, "PDF processing completed");
        with_details.details = Some("45 files processed".to_string());
        let entries = vec![
            with_details,
            make_entry(2, ActivityStatus::Success, "arXiv collection completed"),
        ];
        let filter = ActivityFilter {
            text_search: "FILES".to_string(),
            ..Default::default()
        };
        assert_eq!(apply_filters(&entries, &filter), vec![0]);
    }

    #[test]
    fn test_regex_filter() {
        let entries = vec![
            make_entry(1, ActivityStatus::Running, "Started arXiv collection"),
            make_entry(2, ActivityStatus::Warning, "Stopped arXiv collection"),
            make_entry(3, ActivityStatus::Info, "Deduplicate operation started"),
        ];
        let mut filter = ActivityFilter::default();
        filter.set_regex(r"^(Started|Stopped) \w+ collection$").unwrap();
        assert_eq!(apply_filters(&entries, &filter), vec![0, 1]);
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let mut filter = ActivityFilter::default();
        let err = filter.set_regex("[unclosed").unwrap_err();
        assert!(matches!(err, FilterError::InvalidRegex { .. }));
        assert!(filter.regex_search.is_none());
    }

    #[test]
    fn test_time_range_is_inclusive() {
        let entries = vec![
            make_entry(10, ActivityStatus::Info, "a"),
            make_entry(20, ActivityStatus::Info, "b"),
            make_entry(30, ActivityStatus::Info, "c"),
        ];
        let filter = ActivityFilter {
            time_start: Some(entries[1].timestamp),
            time_end: Some(entries[2].timestamp),
            ..Default::default()
        };
        assert_eq!(apply_filters(&entries, &filter), vec![1, 2]);
    }
}
