//! Command implementations for the CLI interface.
//!
//! This module contains all the command handlers that implement the various
//! subcommands, from basic scheduling operations to statistics, tag registry
//! management, AI-assisted entry and the TUI.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, Local, NaiveDate};

use crate::assist::{self, AssistClient, AssistConfig};
use crate::metrics::{day_summary, format_duration, format_hours, week_summary};
use crate::store::{format_day_relative, parse_day_input, week_start, Store};
use crate::tags::TagRegistry;
use crate::task::{NewTask, TaskPatch};
use crate::tui::run::run_board_tui;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the weekly board interface.
    Ui,

    /// Add a task to a day.
    Add {
        /// Task title.
        title: String,
        /// Day: YYYY-MM-DD, "today", "tomorrow", a weekday name, or "in Nd".
        #[arg(long, default_value = "today")]
        date: String,
        /// Category tag. An unseen tag is added to the registry.
        #[arg(long)]
        tag: Option<String>,
        /// Duration in minutes.
        #[arg(long, default_value_t = 30)]
        duration: u32,
        /// Free-text note.
        #[arg(long)]
        note: Option<String>,
    },

    /// List the week's tasks, or one day, or everything.
    List {
        /// Show a single day instead of the current week.
        #[arg(long)]
        date: Option<String>,
        /// Show every stored day.
        #[arg(long)]
        all: bool,
    },

    /// Update fields on a task.
    Edit {
        /// Task ID.
        id: u64,
        /// Day the task currently lives on.
        date: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// Remove the tag.
        #[arg(long)]
        clear_tag: bool,
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        note: Option<String>,
        /// Remove the note.
        #[arg(long)]
        clear_note: bool,
    },

    /// Flip a task's completion flag.
    Toggle {
        /// Task ID.
        id: u64,
        /// Day the task lives on.
        date: String,
    },

    /// Mark several tasks done (or not done) by ID, wherever they live.
    Done {
        /// Task IDs.
        ids: Vec<u64>,
        /// Mark as not done instead.
        #[arg(long)]
        undo: bool,
    },

    /// Delete a task from a day.
    Delete {
        /// Task ID.
        id: u64,
        /// Day the task lives on.
        date: String,
    },

    /// Move a task to another day, searching every day for it.
    Move {
        /// Task ID.
        id: u64,
        /// Destination day.
        date: String,
    },

    /// Show focus and capacity statistics for the week ahead.
    Stats,

    /// Manage the tag registry.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Create tasks from a natural-language request via the assist API.
    Ai {
        /// Freeform request, e.g. "prep board meeting thursday, 2h".
        request: String,
        /// Print parsed tasks without applying them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy the storage files into a timestamped backup.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TagAction {
    /// List tags with the focus divider and objectives.
    List,
    /// Append a tag (non-focus until moved above the divider).
    Add { name: String },
    /// Rename a tag, migrating its objective. An empty name removes it.
    Rename { tag: String, new_name: String },
    /// Remove a tag and its objective. Tasks keep the old value.
    Remove { tag: String },
    /// Move a tag to a new position (1-based).
    Move { tag: String, to: usize },
    /// Set how many leading tags are focus tags.
    Focus { count: usize },
    /// Set a tag's objective; omit TEXT to clear it.
    Objective { tag: String, text: Option<String> },
}

/// Path of the task-store file inside the storage directory.
pub fn tasks_path(dir: &Path) -> PathBuf {
    dir.join("tasks.json")
}

fn parse_day_or_exit(s: &str) -> NaiveDate {
    match parse_day_input(s) {
        Some(d) => d,
        None => {
            eprintln!("Unrecognised day '{s}'. Use YYYY-MM-DD, 'today', 'tomorrow', a weekday, or 'in Nd'.");
            std::process::exit(1);
        }
    }
}

fn save_store_or_exit(store: &Store, dir: &Path) {
    if let Err(e) = store.save(&tasks_path(dir)) {
        eprintln!("Failed to save tasks: {e}");
        std::process::exit(1);
    }
}

fn save_registry_or_exit(registry: &TagRegistry, dir: &Path) {
    if let Err(e) = registry.save(dir) {
        eprintln!("Failed to save tags: {e}");
        std::process::exit(1);
    }
}

/// Resolve a tag given by name or 1-based position to its index.
fn resolve_tag(registry: &TagRegistry, tag: &str) -> usize {
    if let Some(idx) = registry.tags.iter().position(|t| t == tag) {
        return idx;
    }
    if let Ok(pos) = tag.parse::<usize>() {
        if pos >= 1 && pos <= registry.tags.len() {
            return pos - 1;
        }
    }
    eprintln!("No tag named '{tag}' (and no tag at that position).");
    std::process::exit(1);
}

/// Launch the weekly board TUI.
pub fn cmd_ui(dir: &Path) {
    if let Err(e) = run_board_tui(dir) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Add a task to a day's bucket.
pub fn cmd_add(
    store: &mut Store,
    registry: &mut TagRegistry,
    dir: &Path,
    title: String,
    date: String,
    tag: Option<String>,
    duration: u32,
    note: Option<String>,
) {
    let date = parse_day_or_exit(&date);
    if duration == 0 {
        eprintln!("Duration must be a positive number of minutes.");
        std::process::exit(1);
    }
    if let Some(tag) = tag.as_deref().filter(|t| !t.trim().is_empty()) {
        registry.ensure_tag(tag.trim());
    }

    let Some(id) = store.add(
        date,
        NewTask {
            title,
            tag: tag.map(|t| t.trim().to_string()),
            duration,
        },
    ) else {
        eprintln!("Title cannot be empty.");
        std::process::exit(1);
    };

    if note.is_some() {
        store.edit(
            id,
            date,
            &TaskPatch {
                note: Some(note),
                ..Default::default()
            },
        );
    }

    save_store_or_exit(store, dir);
    save_registry_or_exit(registry, dir);
    println!("Added task {} on {}", id, date);
}

/// Print one day's tasks in display order (completed last).
fn print_day(store: &Store, registry: &TagRegistry, date: NaiveDate, today: NaiveDate) {
    let tasks = store.bucket(date);
    let summary = day_summary(store, registry, date);
    println!(
        "{} {} ({})  {} | {}% focus | {}/{} done",
        date.format("%A"),
        date,
        format_day_relative(date, today),
        format_hours(summary.total_time),
        summary.focus_percentage,
        summary.completed,
        summary.total,
    );
    for &i in &store.display_order(date) {
        let t = &tasks[i];
        let mark = if t.completed { "x" } else { " " };
        let tag = match &t.tag {
            Some(tag) if registry.is_focus(tag) => format!(" #{tag}*"),
            Some(tag) => format!(" #{tag}"),
            None => String::new(),
        };
        let note = if t.note.is_some() { " [note]" } else { "" };
        println!(
            "  [{}] {:<4} {:<9} {}{}{}",
            mark,
            t.id,
            format_duration(t.duration as u64),
            t.title,
            tag,
            note
        );
    }
    if tasks.is_empty() {
        println!("  -");
    }
}

/// List tasks: the current week by default, one day with --date, or the
/// whole store with --all.
pub fn cmd_list(store: &Store, registry: &TagRegistry, date: Option<String>, all: bool) {
    let today = Local::now().date_naive();
    if let Some(date) = date {
        print_day(store, registry, parse_day_or_exit(&date), today);
        return;
    }
    if all {
        for &date in store.buckets.keys() {
            print_day(store, registry, date, today);
        }
        return;
    }
    let monday = week_start(today);
    for offset in 0..7 {
        print_day(store, registry, monday + Duration::days(offset), today);
    }
}

/// Update fields on a task.
#[allow(clippy::too_many_arguments)]
pub fn cmd_edit(
    store: &mut Store,
    registry: &mut TagRegistry,
    dir: &Path,
    id: u64,
    date: String,
    title: Option<String>,
    tag: Option<String>,
    clear_tag: bool,
    duration: Option<u32>,
    note: Option<String>,
    clear_note: bool,
) {
    let date = parse_day_or_exit(&date);
    if let Some(d) = duration {
        if d == 0 {
            eprintln!("Duration must be a positive number of minutes.");
            std::process::exit(1);
        }
    }
    if let Some(t) = title.as_deref() {
        if t.trim().is_empty() {
            eprintln!("Title cannot be empty.");
            std::process::exit(1);
        }
    }

    let tag_patch = if clear_tag {
        Some(None)
    } else {
        match tag {
            Some(t) => {
                let t = t.trim().to_string();
                if !t.is_empty() {
                    registry.ensure_tag(&t);
                }
                Some((!t.is_empty()).then_some(t))
            }
            None => None,
        }
    };
    let note_patch = if clear_note { Some(None) } else { note.map(Some) };

    let patch = TaskPatch {
        title,
        tag: tag_patch,
        duration,
        completed: None,
        note: note_patch,
    };
    if !store.edit(id, date, &patch) {
        eprintln!("Task {} not found on {}.", id, date);
        std::process::exit(1);
    }
    save_store_or_exit(store, dir);
    save_registry_or_exit(registry, dir);
    println!("Updated task {}", id);
}

/// Flip a task's completion flag.
pub fn cmd_toggle(store: &mut Store, dir: &Path, id: u64, date: String) {
    let date = parse_day_or_exit(&date);
    if !store.toggle_complete(id, date) {
        eprintln!("Task {} not found on {}.", id, date);
        std::process::exit(1);
    }
    save_store_or_exit(store, dir);
    let state = if store.get(id, date).map(|t| t.completed).unwrap_or(false) {
        "done"
    } else {
        "not done"
    };
    println!("Task {} is now {}", id, state);
}

/// Bulk completion by ID across every bucket.
pub fn cmd_done(store: &mut Store, dir: &Path, ids: Vec<u64>, undo: bool) {
    if ids.is_empty() {
        eprintln!("No task IDs given.");
        std::process::exit(1);
    }
    let matched = store.bulk_set_completion(&ids, !undo);
    save_store_or_exit(store, dir);
    println!(
        "Marked {} of {} task(s) {}.",
        matched,
        ids.len(),
        if undo { "not done" } else { "done" }
    );
}

/// Delete a task from a day's bucket.
pub fn cmd_delete(store: &mut Store, dir: &Path, id: u64, date: String) {
    let date = parse_day_or_exit(&date);
    if !store.delete(id, date) {
        eprintln!("Task {} not found on {}.", id, date);
        std::process::exit(1);
    }
    save_store_or_exit(store, dir);
    println!("Deleted task {}", id);
}

/// Move a task to another day.
pub fn cmd_move(store: &mut Store, dir: &Path, id: u64, date: String) {
    let date = parse_day_or_exit(&date);
    if !store.reschedule(id, date) {
        eprintln!("Task {} not found.", id);
        std::process::exit(1);
    }
    save_store_or_exit(store, dir);
    println!("Moved task {} to {}", id, date);
}

/// Print weekly focus and capacity statistics.
pub fn cmd_stats(store: &Store, registry: &TagRegistry) {
    let today = Local::now().date_naive();
    let summary = week_summary(store, registry, today);

    println!("Week ahead ({} onwards, Mon-Fri)", today);
    println!(
        "  Focus:    {} / {} ({}%)",
        format_hours(summary.key_task_time),
        format_hours(summary.total_time),
        summary.key_task_percentage
    );
    println!(
        "  Capacity: {} / 40.0h ({}%)",
        format_hours(summary.total_time),
        summary.filled_percentage
    );
    println!(
        "  Focus tags: {}",
        if registry.focus_tags().is_empty() {
            "-".to_string()
        } else {
            registry.focus_tags().join(", ")
        }
    );
    println!();

    for offset in 0..5 {
        let date = today + Duration::days(offset);
        if matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            continue;
        }
        let day = day_summary(store, registry, date);
        println!(
            "  {:<9} {}  {:>6}  {:>3}% focus  {}/{} done",
            date.format("%A"),
            date,
            format_hours(day.total_time),
            day.focus_percentage,
            day.completed,
            day.total
        );
    }
}

/// Handle tag registry commands.
pub fn cmd_tag(registry: &mut TagRegistry, dir: &Path, action: TagAction) {
    match action {
        TagAction::List => {
            for (i, tag) in registry.tags.iter().enumerate() {
                if i == registry.focus_count {
                    println!("  ----- focus divider -----");
                }
                let objective = registry
                    .objective(tag)
                    .map(|o| format!("  ({o})"))
                    .unwrap_or_default();
                println!("{:>3}  {}{}", i + 1, tag, objective);
            }
            if registry.focus_count >= registry.tags.len() {
                println!("  ----- focus divider -----");
            }
            return;
        }
        TagAction::Add { name } => {
            if !registry.add_tag(&name) {
                eprintln!("Tag '{}' is empty or already present.", name.trim());
                std::process::exit(1);
            }
            println!("Added tag '{}'", name.trim());
        }
        TagAction::Rename { tag, new_name } => {
            let index = resolve_tag(registry, &tag);
            let removing = new_name.trim().is_empty();
            registry.rename_tag(index, &new_name);
            if removing {
                println!("Removed tag '{}'", tag);
            } else {
                println!("Renamed '{}' to '{}'", tag, new_name.trim());
            }
        }
        TagAction::Remove { tag } => {
            let index = resolve_tag(registry, &tag);
            registry.remove_tag(index);
            println!("Removed tag '{}' (tasks keep the old value)", tag);
        }
        TagAction::Move { tag, to } => {
            let index = resolve_tag(registry, &tag);
            if to < 1 || to > registry.tags.len() {
                eprintln!("Position must be between 1 and {}.", registry.tags.len());
                std::process::exit(1);
            }
            registry.reorder_tags(index, to - 1);
            println!("Moved '{}' to position {}", tag, to);
        }
        TagAction::Focus { count } => {
            registry.set_focus_count(count);
            println!(
                "Focus tags: {}",
                if registry.focus_tags().is_empty() {
                    "-".to_string()
                } else {
                    registry.focus_tags().join(", ")
                }
            );
        }
        TagAction::Objective { tag, text } => {
            let index = resolve_tag(registry, &tag);
            let tag = registry.tags[index].clone();
            registry.set_objective(&tag, text.as_deref().unwrap_or(""));
            match registry.objective(&tag) {
                Some(o) => println!("Objective for '{}': {}", tag, o),
                None => println!("Cleared objective for '{}'", tag),
            }
        }
    }
    save_registry_or_exit(registry, dir);
}

/// Create tasks from a natural-language request.
pub fn cmd_ai(
    store: &mut Store,
    registry: &mut TagRegistry,
    dir: &Path,
    request: String,
    dry_run: bool,
) {
    let today = Local::now().date_naive();
    let client = AssistClient::new(AssistConfig::from_env());
    let context = assist::relevant_tasks_json(store, today);

    let response = match client.complete(&request, &registry.tags, today, &context) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let planned = assist::parse_planned(&response);
    if planned.is_empty() {
        println!("No tasks in the response.");
        return;
    }

    if dry_run {
        for task in &planned {
            println!(
                "{}  {}  {}  {}",
                task.date.map(|d| d.to_string()).unwrap_or_else(|| format!("{today} (today)")),
                format_duration(task.duration as u64),
                task.title,
                task.tag.as_deref().map(|t| format!("#{t}")).unwrap_or_default()
            );
        }
        return;
    }

    let ids = assist::apply_planned(store, registry, &planned, today);
    save_store_or_exit(store, dir);
    save_registry_or_exit(registry, dir);
    println!("Created {} task(s): {:?}", ids.len(), ids);
}

/// Copy the storage files into a timestamped backup directory.
pub fn cmd_backup(dir: &Path) {
    let backup_dir = dir.join("backup");
    if let Err(e) = fs::create_dir_all(&backup_dir) {
        eprintln!("Failed to create backup directory: {e}");
        std::process::exit(1);
    }

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let mut copied = 0;
    for name in ["tasks.json", "tags.json", "objectives.json", "focus_areas"] {
        let src = dir.join(name);
        if !src.exists() {
            continue;
        }
        let dst = backup_dir.join(format!("{timestamp}_{name}"));
        match fs::copy(&src, &dst) {
            Ok(_) => copied += 1,
            Err(e) => {
                eprintln!("Failed to back up {name}: {e}");
                std::process::exit(1);
            }
        }
    }
    println!("Backed up {} file(s) to {}", copied, backup_dir.display());
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
