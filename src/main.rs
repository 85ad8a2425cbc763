//! # wkp - Weekly Planner CLI
//!
//! A terminal weekly task planner: a drag-style board of day columns backed
//! by plain JSON files, with focus-tag metrics and AI-assisted entry.
//!
//! ## Key Features
//!
//! - **Date-bucketed tasks**: every task lives on exactly one calendar day;
//!   move and reorder them freely between days
//! - **Focus tags**: the leading tags of the registry count toward a weekly
//!   focus percentage, measured against a 40-hour capacity
//! - **Multiple Interfaces**: full CLI for automation + a board TUI for
//!   visual planning (`wkp ui`)
//! - **AI-assisted entry**: turn a freeform request into scheduled tasks
//!   via an OpenAI-compatible endpoint (`wkp ai "..."`, Ctrl+K in the TUI)
//! - **Local File Storage**: four plain files under `~/.weekplan`, safe to
//!   source control or sync
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the board
//! wkp ui
//!
//! # Add a task via CLI
//! wkp add "Prepare board deck" --date friday --tag Fundraising --duration 90
//!
//! # This week at a glance
//! wkp list
//!
//! # Weekly focus statistics
//! wkp stats
//! ```
//!
//! Data is stored locally in `~/.weekplan/`: `tasks.json` (date-keyed task
//! buckets), `tags.json` (the ordered tag registry), `objectives.json`
//! (per-tag objectives) and `focus_areas` (the focus divider position).

use std::path::PathBuf;

use clap::Parser;

pub mod assist;
pub mod cli;
pub mod cmd;
pub mod metrics;
pub mod store;
pub mod tags;
pub mod task;
pub mod tui {
    pub mod board;
    pub mod colors;
    pub mod input;
    pub mod run;
}

use cli::Cli;
use cmd::*;
use store::Store;
use tags::TagRegistry;

fn main() {
    let cli = Cli::parse();

    // Determine the storage directory.
    let dir = cli.dir.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".weekplan")
    });
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Failed to create storage directory {}: {}", dir.display(), e);
        std::process::exit(1);
    }

    // Commands that don't need the store loaded.
    match &cli.command {
        Commands::Ui => {
            cmd_ui(&dir);
            return;
        }
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return;
        }
        Commands::Backup => {
            cmd_backup(&dir);
            return;
        }
        _ => {}
    }

    let mut store = Store::load(&tasks_path(&dir));
    let mut registry = TagRegistry::load(&dir);

    match cli.command {
        Commands::Ui => unreachable!("UI command handled above"),
        Commands::Completions { .. } => unreachable!("completions handled above"),
        Commands::Backup => unreachable!("backup handled above"),

        Commands::Add {
            title,
            date,
            tag,
            duration,
            note,
        } => cmd_add(&mut store, &mut registry, &dir, title, date, tag, duration, note),

        Commands::List { date, all } => cmd_list(&store, &registry, date, all),

        Commands::Edit {
            id,
            date,
            title,
            tag,
            clear_tag,
            duration,
            note,
            clear_note,
        } => cmd_edit(
            &mut store, &mut registry, &dir, id, date, title, tag, clear_tag, duration, note,
            clear_note,
        ),

        Commands::Toggle { id, date } => cmd_toggle(&mut store, &dir, id, date),

        Commands::Done { ids, undo } => cmd_done(&mut store, &dir, ids, undo),

        Commands::Delete { id, date } => cmd_delete(&mut store, &dir, id, date),

        Commands::Move { id, date } => cmd_move(&mut store, &dir, id, date),

        Commands::Stats => cmd_stats(&store, &registry),

        Commands::Tag { action } => cmd_tag(&mut registry, &dir, action),

        Commands::Ai { request, dry_run } => {
            cmd_ai(&mut store, &mut registry, &dir, request, dry_run)
        }
    }
}
