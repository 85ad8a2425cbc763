//! The task store and its scheduling operations.
//!
//! This module provides the `Store` struct, a date-bucketed collection of
//! tasks that is the single source of truth for all task data, along with
//! date parsing and formatting utilities shared by the CLI and TUI.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::task::{NewTask, Task, TaskPatch};

/// In-memory mapping from calendar day to an ordered list of tasks.
///
/// Order within a bucket is display/priority order as arranged by the user;
/// completed tasks are pushed after incomplete ones for display only, the
/// stored order is unaffected by completion. Every mutation goes through a
/// method on this struct and the whole store is persisted afterwards.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store {
    pub buckets: BTreeMap<NaiveDate, Vec<Task>>,
}

impl Store {
    /// Load the store from a JSON file, starting empty if the file is
    /// missing or unreadable. A parse failure is never fatal.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Store::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(store) => store,
                Err(e) => {
                    eprintln!("Error parsing task store, starting fresh: {e}");
                    Store::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading task store, starting fresh: {e}");
                Store::default()
            }
        }
    }

    /// Save the store to a JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).unwrap();
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available task ID across all buckets.
    pub fn next_id(&self) -> u64 {
        self.buckets
            .values()
            .flatten()
            .map(|t| t.id)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Tasks for one day, in stored order. Empty slice for an absent bucket.
    pub fn bucket(&self, date: NaiveDate) -> &[Task] {
        self.buckets.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Locate a task by id within a known bucket.
    pub fn get(&self, id: u64, date: NaiveDate) -> Option<&Task> {
        self.buckets.get(&date)?.iter().find(|t| t.id == id)
    }

    /// Locate a task by id across every bucket, returning its date and
    /// position. Linear scan; bucket counts are small for a single user.
    pub fn find(&self, id: u64) -> Option<(NaiveDate, usize)> {
        for (date, tasks) in &self.buckets {
            if let Some(idx) = tasks.iter().position(|t| t.id == id) {
                return Some((*date, idx));
            }
        }
        None
    }

    /// Append a new task to a day's bucket with `completed = false`.
    ///
    /// A title that is empty after trimming makes this a silent no-op
    /// (`None`). An empty tag is stored as no tag. Callers are responsible
    /// for registering an unseen tag with the registry.
    pub fn add(&mut self, date: NaiveDate, new: NewTask) -> Option<u64> {
        let title = new.title.trim();
        if title.is_empty() {
            return None;
        }
        let id = self.next_id();
        let tag = new.tag.filter(|t| !t.trim().is_empty());
        self.buckets.entry(date).or_default().push(Task {
            id,
            title: title.to_string(),
            tag,
            duration: new.duration,
            completed: false,
            note: None,
        });
        Some(id)
    }

    /// Merge patch fields into the task with `id` in `date`'s bucket.
    ///
    /// A missing bucket or id leaves the store unchanged and returns false;
    /// this is a recoverable no-op the caller reports, never a crash.
    pub fn edit(&mut self, id: u64, date: NaiveDate, patch: &TaskPatch) -> bool {
        let Some(tasks) = self.buckets.get_mut(&date) else {
            return false;
        };
        match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Flip a task's completion flag. No-op when the task is absent.
    pub fn toggle_complete(&mut self, id: u64, date: NaiveDate) -> bool {
        let Some(tasks) = self.buckets.get_mut(&date) else {
            return false;
        };
        match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.completed = !task.completed;
                true
            }
            None => false,
        }
    }

    /// Remove a task by id from a day's bucket.
    pub fn delete(&mut self, id: u64, date: NaiveDate) -> bool {
        let Some(tasks) = self.buckets.get_mut(&date) else {
            return false;
        };
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        tasks.len() != before
    }

    /// Move a task to a new day, searching every bucket for it.
    ///
    /// Callers (the assist path in particular) may not know which bucket
    /// currently holds the task, so this scans rather than requiring a date
    /// hint. Remove-then-insert: the task ends up in exactly one bucket.
    pub fn reschedule(&mut self, id: u64, new_date: NaiveDate) -> bool {
        let mut moved = None;
        for tasks in self.buckets.values_mut() {
            if let Some(idx) = tasks.iter().position(|t| t.id == id) {
                moved = Some(tasks.remove(idx));
                break;
            }
        }
        match moved {
            Some(task) => {
                self.buckets.entry(new_date).or_default().push(task);
                true
            }
            None => false,
        }
    }

    /// Remove the element at `src_idx` in the source bucket and insert it at
    /// `dst_idx` in the destination bucket (same bucket allowed).
    ///
    /// Indices come from the presentation layer and are trusted; an
    /// out-of-range index is a programmer error and panics.
    pub fn reorder(
        &mut self,
        src_date: NaiveDate,
        src_idx: usize,
        dst_date: NaiveDate,
        dst_idx: usize,
    ) {
        let task = self.buckets.entry(src_date).or_default().remove(src_idx);
        let dst = self.buckets.entry(dst_date).or_default();
        dst.insert(dst_idx, task);
    }

    /// Set the completion flag on each listed task, scanning all buckets
    /// per id with first match wins. Unknown ids are skipped. Returns how
    /// many ids matched a task.
    pub fn bulk_set_completion(&mut self, ids: &[u64], completed: bool) -> usize {
        let mut matched = 0;
        for &id in ids {
            for tasks in self.buckets.values_mut() {
                if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                    task.completed = completed;
                    matched += 1;
                    break;
                }
            }
        }
        matched
    }

    /// Stored indices for a day reordered for display: incomplete tasks
    /// first, completed after, both keeping their stored relative order.
    pub fn display_order(&self, date: NaiveDate) -> Vec<usize> {
        let tasks = self.bucket(date);
        let mut order: Vec<usize> = (0..tasks.len()).collect();
        order.sort_by_key(|&i| tasks[i].completed);
        order
    }

    /// All tasks dated within `[start, start + days)`, with their dates.
    pub fn tasks_in_window(&self, start: NaiveDate, days: i64) -> Vec<(NaiveDate, &Task)> {
        let end = start + Duration::days(days);
        self.buckets
            .range(start..end)
            .flat_map(|(date, tasks)| tasks.iter().map(move |t| (*date, t)))
            .collect()
    }
}

/// Parse human-readable day input.
///
/// Supports "today", "tomorrow", "yesterday", bare or "next"-prefixed
/// weekday names, "in Nd" and the `YYYY-MM-DD` form of the date keys.
pub fn parse_day_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
    }

    let weekdays = [
        ("monday", 0),
        ("tuesday", 1),
        ("wednesday", 2),
        ("thursday", 3),
        ("friday", 4),
        ("saturday", 5),
        ("sunday", 6),
        ("mon", 0),
        ("tue", 1),
        ("wed", 2),
        ("thu", 3),
        ("fri", 4),
        ("sat", 5),
        ("sun", 6),
    ];

    for (day_name, target_day) in weekdays {
        let current_day = today.weekday().num_days_from_monday() as i32;
        let days_ahead = (target_day + 7 - current_day) % 7;
        if s == day_name {
            return Some(today + Duration::days(days_ahead as i64));
        }
        if s == format!("next {}", day_name) {
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add as i64));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Format a day relative to today ("today", "tomorrow", "in 3d", "2d ago").
pub fn format_day_relative(date: NaiveDate, today: NaiveDate) -> String {
    let delta = (date - today).num_days();
    match delta {
        0 => "today".into(),
        1 => "tomorrow".into(),
        -1 => "yesterday".into(),
        d if d > 1 => format!("in {}d", d),
        d => format!("{}d ago", -d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn store_with_one_task() -> Store {
        let mut store = Store::default();
        store.add(
            day("2024-01-01"),
            NewTask {
                title: "Write report".into(),
                tag: Some("Admin".into()),
                duration: 60,
            },
        );
        store
    }

    #[test]
    fn add_assigns_sequential_ids_and_appends() {
        let mut store = Store::default();
        let a = store.add(day("2024-01-01"), NewTask::new("first")).unwrap();
        let b = store.add(day("2024-01-01"), NewTask::new("second")).unwrap();
        assert_eq!(b, a + 1);
        let titles: Vec<_> = store
            .bucket(day("2024-01-01"))
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, ["first", "second"]);
    }

    #[test]
    fn add_with_blank_title_is_a_no_op() {
        let mut store = Store::default();
        assert_eq!(store.add(day("2024-01-01"), NewTask::new("   ")), None);
        assert!(store.buckets.is_empty());
    }

    #[test]
    fn add_stores_empty_tag_as_none() {
        let mut store = Store::default();
        let id = store
            .add(
                day("2024-01-01"),
                NewTask {
                    title: "untagged".into(),
                    tag: Some("".into()),
                    duration: 30,
                },
            )
            .unwrap();
        assert_eq!(store.get(id, day("2024-01-01")).unwrap().tag, None);
    }

    #[test]
    fn bucket_length_tracks_adds_minus_deletes() {
        let mut store = Store::default();
        let d = day("2024-05-06");
        let ids: Vec<u64> = (0..5)
            .map(|i| store.add(d, NewTask::new(&format!("t{i}"))).unwrap())
            .collect();
        assert!(store.delete(ids[1], d));
        assert!(store.delete(ids[3], d));
        assert_eq!(store.bucket(d).len(), 3);
        let remaining: Vec<u64> = store.bucket(d).iter().map(|t| t.id).collect();
        assert_eq!(remaining, [ids[0], ids[2], ids[4]]);
    }

    #[test]
    fn edit_merges_patch_fields() {
        let mut store = store_with_one_task();
        let patch = TaskPatch {
            duration: Some(90),
            tag: Some(None),
            ..Default::default()
        };
        assert!(store.edit(1, day("2024-01-01"), &patch));
        let task = store.get(1, day("2024-01-01")).unwrap();
        assert_eq!(task.duration, 90);
        assert_eq!(task.tag, None);
        assert_eq!(task.title, "Write report");
    }

    #[test]
    fn edit_missing_bucket_or_id_leaves_store_unchanged() {
        let mut store = store_with_one_task();
        let patch = TaskPatch {
            title: Some("changed".into()),
            ..Default::default()
        };
        assert!(!store.edit(1, day("2024-02-02"), &patch));
        assert!(!store.edit(99, day("2024-01-01"), &patch));
        assert_eq!(store.get(1, day("2024-01-01")).unwrap().title, "Write report");
    }

    #[test]
    fn toggle_complete_twice_restores_original_state() {
        let mut store = store_with_one_task();
        assert!(store.toggle_complete(1, day("2024-01-01")));
        assert!(store.get(1, day("2024-01-01")).unwrap().completed);
        assert!(store.toggle_complete(1, day("2024-01-01")));
        assert!(!store.get(1, day("2024-01-01")).unwrap().completed);
    }

    #[test]
    fn reschedule_moves_without_duplicating() {
        let mut store = store_with_one_task();
        assert!(store.reschedule(1, day("2024-01-03")));
        assert!(store.reschedule(1, day("2024-01-03")));
        let hits: usize = store
            .buckets
            .values()
            .flatten()
            .filter(|t| t.id == 1)
            .count();
        assert_eq!(hits, 1);
        assert!(store.get(1, day("2024-01-03")).is_some());
    }

    #[test]
    fn reschedule_unknown_id_returns_false() {
        let mut store = store_with_one_task();
        assert!(!store.reschedule(42, day("2024-01-03")));
    }

    #[test]
    fn reorder_within_and_across_buckets() {
        let mut store = Store::default();
        let d1 = day("2024-01-01");
        let d2 = day("2024-01-02");
        for title in ["a", "b", "c"] {
            store.add(d1, NewTask::new(title));
        }
        store.reorder(d1, 0, d1, 2);
        let titles: Vec<_> = store.bucket(d1).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["b", "c", "a"]);

        store.reorder(d1, 1, d2, 0);
        assert_eq!(store.bucket(d1).len(), 2);
        assert_eq!(store.bucket(d2)[0].title, "c");
    }

    #[test]
    fn bulk_set_completion_first_match_wins_and_skips_unknown() {
        let mut store = Store::default();
        let a = store.add(day("2024-01-01"), NewTask::new("a")).unwrap();
        let b = store.add(day("2024-01-02"), NewTask::new("b")).unwrap();
        // The unknown id does not count toward the matched total.
        assert_eq!(store.bulk_set_completion(&[a, b, 999], true), 2);
        assert!(store.get(a, day("2024-01-01")).unwrap().completed);
        assert!(store.get(b, day("2024-01-02")).unwrap().completed);
        assert_eq!(store.bulk_set_completion(&[a], false), 1);
        assert!(!store.get(a, day("2024-01-01")).unwrap().completed);
        assert!(store.get(b, day("2024-01-02")).unwrap().completed);
    }

    #[test]
    fn display_order_sorts_completed_last_without_touching_storage() {
        let mut store = Store::default();
        let d = day("2024-01-01");
        let a = store.add(d, NewTask::new("a")).unwrap();
        let _b = store.add(d, NewTask::new("b")).unwrap();
        let _c = store.add(d, NewTask::new("c")).unwrap();
        store.toggle_complete(a, d);
        assert_eq!(store.display_order(d), [1, 2, 0]);
        // Stored order is unchanged.
        let stored: Vec<_> = store.bucket(d).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(stored, ["a", "b", "c"]);
    }

    #[test]
    fn save_and_load_round_trip_preserves_buckets_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");

        let mut store = Store::default();
        store.add(
            day("2024-03-04"),
            NewTask {
                title: "Call investor".into(),
                tag: Some("Fundraising".into()),
                duration: 45,
            },
        );
        store.add(day("2024-03-05"), NewTask::new("Send invoice"));
        store.toggle_complete(2, day("2024-03-05"));
        assert!(store.edit(
            2,
            day("2024-03-05"),
            &TaskPatch {
                note: Some(Some("net 30".into())),
                ..Default::default()
            },
        ));

        store.save(&path).unwrap();
        let reloaded = Store::load(&path);
        assert_eq!(reloaded.buckets, store.buckets);
    }

    #[test]
    fn persisted_form_uses_date_string_keys() {
        let mut store = Store::default();
        store.add(day("2024-03-04"), NewTask::new("x"));
        let json = serde_json::to_value(&store).unwrap();
        assert!(json.get("2024-03-04").is_some());
    }

    #[test]
    fn load_on_garbage_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();
        let store = Store::load(&path);
        assert!(store.buckets.is_empty());
    }

    #[test]
    fn tasks_in_window_is_half_open() {
        let mut store = Store::default();
        store.add(day("2024-01-01"), NewTask::new("in"));
        store.add(day("2024-01-05"), NewTask::new("in"));
        store.add(day("2024-01-06"), NewTask::new("out"));
        let window = store.tasks_in_window(day("2024-01-01"), 5);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn week_start_is_monday() {
        assert_eq!(week_start(day("2024-05-08")), day("2024-05-06"));
        assert_eq!(week_start(day("2024-05-06")), day("2024-05-06"));
        assert_eq!(week_start(day("2024-05-12")), day("2024-05-06"));
    }

    #[test]
    fn parse_day_input_accepts_iso_dates() {
        assert_eq!(parse_day_input("2024-05-08"), Some(day("2024-05-08")));
        assert_eq!(parse_day_input(" 2024-05-08 "), Some(day("2024-05-08")));
        assert_eq!(parse_day_input("not a date"), None);
    }
}
