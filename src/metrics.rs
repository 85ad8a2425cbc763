//! Aggregate duration and focus statistics derived from the task store.
//!
//! The weekly summary covers tasks in the rolling window `[today, today+5)`
//! whose weekday is Monday to Friday, measured against a fixed 40-hour
//! capacity. All percentages are integers in [0, 100]; a zero denominator
//! yields 0, never NaN.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::store::Store;
use crate::tags::TagRegistry;

/// Minutes of capacity in a 40-hour work week.
const WEEK_CAPACITY_MIN: u64 = 40 * 60;

/// Rolling-window totals for the week ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekSummary {
    /// Total scheduled minutes in the window.
    pub total_time: u64,
    /// Minutes on tasks tagged with a focus tag.
    pub key_task_time: u64,
    /// round(100 * key_task_time / total_time), 0 when nothing is scheduled.
    pub key_task_percentage: u8,
    /// round(100 * total_time / 40h).
    pub filled_percentage: u8,
}

/// Per-day statistics for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DaySummary {
    pub total_time: u64,
    /// round(100 * focus minutes / total minutes), 0 for an empty day.
    pub focus_percentage: u8,
    pub completed: usize,
    pub total: usize,
}

/// Integer percentage with the zero-denominator case defined as 0.
fn percentage(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u8
}

/// Summarise the five weekdays starting at `today`.
///
/// Weekend buckets inside the window are excluded, matching a Monday-Friday
/// working week; the filled percentage can exceed 100 when the week is
/// overbooked, and is clamped.
pub fn week_summary(store: &Store, registry: &TagRegistry, today: NaiveDate) -> WeekSummary {
    let mut total = 0u64;
    let mut key = 0u64;

    for (date, task) in store.tasks_in_window(today, 5) {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        total += task.duration as u64;
        if task.tag.as_deref().is_some_and(|t| registry.is_focus(t)) {
            key += task.duration as u64;
        }
    }

    WeekSummary {
        total_time: total,
        key_task_time: key,
        key_task_percentage: percentage(key, total),
        filled_percentage: percentage(total, WEEK_CAPACITY_MIN).min(100),
    }
}

/// Summarise a single day's bucket.
pub fn day_summary(store: &Store, registry: &TagRegistry, date: NaiveDate) -> DaySummary {
    let tasks = store.bucket(date);
    let total: u64 = tasks.iter().map(|t| t.duration as u64).sum();
    let focus: u64 = tasks
        .iter()
        .filter(|t| t.tag.as_deref().is_some_and(|tag| registry.is_focus(tag)))
        .map(|t| t.duration as u64)
        .sum();

    DaySummary {
        total_time: total,
        focus_percentage: percentage(focus, total),
        completed: tasks.iter().filter(|t| t.completed).count(),
        total: tasks.len(),
    }
}

/// Human-readable duration: "45 min", "1h 30m", "2 hours".
pub fn format_duration(minutes: u64) -> String {
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest != 0 {
        format!("{}h {}m", hours, rest)
    } else if hours == 1 {
        "1 hour".to_string()
    } else {
        format!("{} hours", hours)
    }
}

/// Minutes as decimal hours, e.g. "7.5h".
pub fn format_hours(minutes: u64) -> String {
    format!("{:.1}h", minutes as f64 / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use std::collections::BTreeMap;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn registry() -> TagRegistry {
        TagRegistry {
            tags: vec!["Admin".into(), "Sales".into(), "HR".into()],
            objectives: BTreeMap::new(),
            focus_count: 2,
        }
    }

    fn add(store: &mut Store, date: &str, tag: Option<&str>, duration: u32) {
        store.add(
            day(date),
            NewTask {
                title: "t".into(),
                tag: tag.map(str::to_string),
                duration,
            },
        );
    }

    #[test]
    fn empty_store_yields_all_zeroes() {
        let summary = week_summary(&Store::default(), &registry(), day("2024-05-06"));
        assert_eq!(summary, WeekSummary::default());
    }

    #[test]
    fn window_excludes_weekends_and_day_five() {
        let mut store = Store::default();
        // Thursday 2024-05-09 as "today": window covers Thu..Mon inclusive.
        add(&mut store, "2024-05-09", Some("Admin"), 60); // Thu, counted
        add(&mut store, "2024-05-10", None, 60); // Fri, counted
        add(&mut store, "2024-05-11", Some("Admin"), 60); // Sat, excluded
        add(&mut store, "2024-05-12", Some("Admin"), 60); // Sun, excluded
        add(&mut store, "2024-05-13", Some("Sales"), 60); // Mon, counted
        add(&mut store, "2024-05-14", Some("Sales"), 60); // Tue, outside window

        let summary = week_summary(&store, &registry(), day("2024-05-09"));
        assert_eq!(summary.total_time, 180);
        assert_eq!(summary.key_task_time, 120);
        assert_eq!(summary.key_task_percentage, 67);
    }

    #[test]
    fn orphan_and_non_focus_tags_do_not_count_as_key_time() {
        let mut store = Store::default();
        add(&mut store, "2024-05-06", Some("HR"), 60); // beyond divider
        add(&mut store, "2024-05-06", Some("Gone"), 60); // orphan value
        let summary = week_summary(&store, &registry(), day("2024-05-06"));
        assert_eq!(summary.total_time, 120);
        assert_eq!(summary.key_task_time, 0);
        assert_eq!(summary.key_task_percentage, 0);
    }

    #[test]
    fn filled_percentage_uses_forty_hour_baseline_and_clamps() {
        let mut store = Store::default();
        add(&mut store, "2024-05-06", None, 20 * 60);
        let summary = week_summary(&store, &registry(), day("2024-05-06"));
        assert_eq!(summary.filled_percentage, 50);

        add(&mut store, "2024-05-07", None, 60 * 60);
        let summary = week_summary(&store, &registry(), day("2024-05-06"));
        assert_eq!(summary.filled_percentage, 100);
    }

    #[test]
    fn percentages_stay_in_range_for_arbitrary_durations() {
        for (part, whole) in [(0, 0), (1, 3), (2, 3), (7, 7), (1, 100_000)] {
            let p = percentage(part, whole);
            assert!(p <= 100, "{part}/{whole} gave {p}");
        }
    }

    #[test]
    fn day_summary_focus_and_progress() {
        let mut store = Store::default();
        let d = "2024-05-06";
        add(&mut store, d, Some("Admin"), 90);
        add(&mut store, d, Some("HR"), 30);
        store.toggle_complete(1, day(d));

        let summary = day_summary(&store, &registry(), day(d));
        assert_eq!(summary.total_time, 120);
        assert_eq!(summary.focus_percentage, 75);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.total, 2);
    }

    #[test]
    fn day_summary_of_empty_day_is_zero() {
        let summary = day_summary(&Store::default(), &registry(), day("2024-05-06"));
        assert_eq!(summary.focus_percentage, 0);
        assert_eq!(summary.total_time, 0);
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(45), "45 min");
        assert_eq!(format_duration(60), "1 hour");
        assert_eq!(format_duration(90), "1h 30m");
        assert_eq!(format_duration(120), "2 hours");
        assert_eq!(format_hours(90), "1.5h");
    }
}
