//! The tag registry: ordered category labels, per-tag objectives and the
//! focus-area count.
//!
//! The first `focus_count` tags are the "focus tags" used by the metrics.
//! Tags are referenced from tasks by value; removing a tag deliberately does
//! not touch tasks already carrying it (orphaned values are tolerated and
//! simply lose focus styling).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Tags seeded on first run, matching a small-business planning setup.
pub const DEFAULT_TAGS: [&str; 9] = [
    "Admin",
    "Fundraising",
    "Operations",
    "Finance",
    "Marketing",
    "Sales",
    "Development",
    "HR",
    "Customer Support",
];

/// Focus-area count seeded on first run.
pub const DEFAULT_FOCUS_COUNT: usize = 3;

/// Ordered list of unique tags, their objectives and the focus divider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRegistry {
    pub tags: Vec<String>,
    pub objectives: BTreeMap<String, String>,
    pub focus_count: usize,
}

impl Default for TagRegistry {
    fn default() -> Self {
        TagRegistry {
            tags: DEFAULT_TAGS.iter().map(|s| s.to_string()).collect(),
            objectives: BTreeMap::new(),
            focus_count: DEFAULT_FOCUS_COUNT,
        }
    }
}

impl TagRegistry {
    /// The current focus tags: the first `focus_count` entries.
    pub fn focus_tags(&self) -> &[String] {
        &self.tags[..self.focus_count.min(self.tags.len())]
    }

    /// Whether a task tag value counts toward focus metrics.
    pub fn is_focus(&self, tag: &str) -> bool {
        self.focus_tags().iter().any(|t| t == tag)
    }

    /// Append a tag. No-op when the name is empty or already present.
    pub fn add_tag(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.tags.iter().any(|t| t == name) {
            return false;
        }
        self.tags.push(name.to_string());
        true
    }

    /// Append a tag introduced from outside (e.g. by an assist-created
    /// task) if it is not yet registered.
    pub fn ensure_tag(&mut self, name: &str) {
        self.add_tag(name);
    }

    /// Replace the tag at `index` with `new_name`, migrating its objective.
    /// An empty `new_name` is equivalent to `remove_tag(index)`.
    pub fn rename_tag(&mut self, index: usize, new_name: &str) -> bool {
        if index >= self.tags.len() {
            return false;
        }
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return self.remove_tag(index);
        }
        let old = self.tags[index].clone();
        if let Some(objective) = self.objectives.remove(&old) {
            self.objectives.insert(new_name.to_string(), objective);
        }
        self.tags[index] = new_name.to_string();
        true
    }

    /// Delete the tag at `index` together with its objective. Tasks already
    /// carrying the value keep it (orphan policy).
    pub fn remove_tag(&mut self, index: usize) -> bool {
        if index >= self.tags.len() {
            return false;
        }
        let removed = self.tags.remove(index);
        self.objectives.remove(&removed);
        if self.focus_count > self.tags.len() {
            self.focus_count = self.tags.len();
        }
        true
    }

    /// Move a tag within the sequence.
    pub fn reorder_tags(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tags.len() || to >= self.tags.len() {
            return false;
        }
        let tag = self.tags.remove(from);
        self.tags.insert(to, tag);
        true
    }

    /// Move the focus divider: the first `n` tags become the focus tags.
    pub fn set_focus_count(&mut self, n: usize) {
        self.focus_count = n.min(self.tags.len());
    }

    /// Attach or replace the free-text objective for a tag. Clears the
    /// objective when `text` is empty.
    pub fn set_objective(&mut self, tag: &str, text: &str) {
        if text.is_empty() {
            self.objectives.remove(tag);
        } else {
            self.objectives.insert(tag.to_string(), text.to_string());
        }
    }

    /// Objective text for a tag, if any.
    pub fn objective(&self, tag: &str) -> Option<&str> {
        self.objectives.get(tag).map(String::as_str)
    }

    /// Load the registry from its three files under `dir`, seeding defaults
    /// for whatever is missing or unparsable. Never fatal.
    pub fn load(dir: &Path) -> Self {
        let mut registry = TagRegistry::default();

        if let Some(buf) = read_to_string(&dir.join("tags.json")) {
            match serde_json::from_str::<Vec<String>>(&buf) {
                Ok(tags) => registry.tags = tags,
                Err(e) => eprintln!("Error parsing tags, using defaults: {e}"),
            }
        }

        if let Some(buf) = read_to_string(&dir.join("objectives.json")) {
            match serde_json::from_str(&buf) {
                Ok(objectives) => registry.objectives = objectives,
                Err(e) => eprintln!("Error parsing objectives, using none: {e}"),
            }
        }

        if let Some(buf) = read_to_string(&dir.join("focus_areas")) {
            match buf.trim().parse::<usize>() {
                Ok(n) => registry.focus_count = n.min(registry.tags.len()),
                Err(e) => eprintln!("Error parsing focus-area count, using default: {e}"),
            }
        } else {
            registry.focus_count = registry.focus_count.min(registry.tags.len());
        }

        registry
    }

    /// Persist the registry to its three files under `dir`.
    pub fn save(&self, dir: &Path) -> std::io::Result<()> {
        write_atomic(
            &dir.join("tags.json"),
            &serde_json::to_string_pretty(&self.tags).unwrap(),
        )?;
        write_atomic(
            &dir.join("objectives.json"),
            &serde_json::to_string_pretty(&self.objectives).unwrap(),
        )?;
        write_atomic(&dir.join("focus_areas"), &self.focus_count.to_string())?;
        Ok(())
    }
}

fn read_to_string(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    let mut buf = String::new();
    match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
        Ok(_) => Some(buf),
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            None
        }
    }
}

fn write_atomic(path: &Path, data: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(data.as_bytes())?;
    f.flush()?;
    fs::rename(tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_registry() -> TagRegistry {
        TagRegistry {
            tags: vec!["Admin".into(), "Sales".into(), "HR".into()],
            objectives: BTreeMap::new(),
            focus_count: 2,
        }
    }

    #[test]
    fn focus_tags_are_the_first_n() {
        let registry = small_registry();
        assert_eq!(registry.focus_tags(), ["Admin", "Sales"]);
        assert!(registry.is_focus("Admin"));
        assert!(!registry.is_focus("HR"));
    }

    #[test]
    fn add_tag_rejects_empty_and_duplicates() {
        let mut registry = small_registry();
        assert!(!registry.add_tag(""));
        assert!(!registry.add_tag("  "));
        assert!(!registry.add_tag("Sales"));
        assert!(registry.add_tag("Legal"));
        assert_eq!(registry.tags.last().unwrap(), "Legal");
        // Appended past the divider: not a focus tag.
        assert!(!registry.is_focus("Legal"));
    }

    #[test]
    fn remove_tag_drops_objective_and_keeps_count_valid() {
        let mut registry = small_registry();
        registry.set_objective("Admin", "inbox zero");
        assert!(registry.remove_tag(0));
        assert_eq!(registry.tags, ["Sales", "HR"]);
        assert_eq!(registry.objective("Admin"), None);
        assert_eq!(registry.focus_count, 2);

        registry.remove_tag(0);
        registry.remove_tag(0);
        assert_eq!(registry.focus_count, 0);
    }

    #[test]
    fn rename_tag_migrates_objective() {
        let mut registry = small_registry();
        registry.set_objective("Sales", "close Q3 pipeline");
        assert!(registry.rename_tag(1, "Revenue"));
        assert_eq!(registry.tags, ["Admin", "Revenue", "HR"]);
        assert_eq!(registry.objective("Revenue"), Some("close Q3 pipeline"));
        assert_eq!(registry.objective("Sales"), None);
    }

    #[test]
    fn rename_to_empty_is_removal() {
        let mut registry = small_registry();
        registry.set_objective("Sales", "x");
        assert!(registry.rename_tag(1, "  "));
        assert_eq!(registry.tags, ["Admin", "HR"]);
        assert_eq!(registry.objective("Sales"), None);
    }

    #[test]
    fn reorder_moves_within_sequence() {
        let mut registry = small_registry();
        assert!(registry.reorder_tags(2, 0));
        assert_eq!(registry.tags, ["HR", "Admin", "Sales"]);
        // The divider did not move: HR is now a focus tag, Sales is not.
        assert_eq!(registry.focus_tags(), ["HR", "Admin"]);
    }

    #[test]
    fn set_focus_count_clamps_to_tag_count() {
        let mut registry = small_registry();
        registry.set_focus_count(10);
        assert_eq!(registry.focus_count, 3);
        registry.set_focus_count(0);
        assert!(registry.focus_tags().is_empty());
    }

    #[test]
    fn objective_set_and_clear() {
        let mut registry = small_registry();
        registry.set_objective("HR", "hire two engineers");
        assert_eq!(registry.objective("HR"), Some("hire two engineers"));
        registry.set_objective("HR", "");
        assert_eq!(registry.objective("HR"), None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = small_registry();
        registry.set_objective("Admin", "inbox zero");
        registry.save(dir.path()).unwrap();

        let reloaded = TagRegistry::load(dir.path());
        assert_eq!(reloaded, registry);
    }

    #[test]
    fn load_seeds_defaults_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TagRegistry::load(dir.path());
        assert_eq!(registry.tags.len(), DEFAULT_TAGS.len());
        assert_eq!(registry.focus_count, DEFAULT_FOCUS_COUNT);
    }

    #[test]
    fn load_clamps_focus_count_to_stored_tags() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tags.json"), r#"["A","B"]"#).unwrap();
        fs::write(dir.path().join("focus_areas"), "5").unwrap();
        let registry = TagRegistry::load(dir.path());
        assert_eq!(registry.focus_count, 2);
    }
}
