use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow};
use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cli::Invocation;
use crate::config::Config;
use crate::render::{Renderer, short_id};
use crate::store::{SaveOutcome, TaskStore, ValidationError};
use crate::task::Priority;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "list", "info", "edit", "remove", "clear", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut TaskStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "add" => cmd_add(store, &inv.command_args),
        "list" => cmd_list(store, renderer),
        "info" => cmd_info(store, renderer, &inv.command_args),
        "edit" => cmd_edit(store, &inv.command_args),
        "remove" => cmd_remove(store, &inv.command_args),
        "clear" => cmd_clear(store, cfg, &inv.command_args),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, args))]
fn cmd_add(store: &mut TaskStore, args: &[String]) -> anyhow::Result<()> {
    info!("command add");

    if args.is_empty() {
        return Err(anyhow!("add requires task text"));
    }

    let (priority, text_args) = match args[0].parse::<Priority>() {
        Ok(priority) => (priority, &args[1..]),
        Err(_) => (Priority::Moderate, args),
    };
    let text = text_args.join(" ");

    match store.add(&text, priority, Utc::now()) {
        Ok(outcome) => {
            report_save(&outcome);
            println!("Created task ({} total).", store.len());
            Ok(())
        }
        Err(ValidationError::EmptyText) => Err(anyhow!("task text must not be empty")),
    }
}

#[instrument(skip(store, renderer))]
fn cmd_list(store: &mut TaskStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command list");
    renderer.print_task_table(&store.view())
}

#[instrument(skip(store, renderer, args))]
fn cmd_info(
    store: &mut TaskStore,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command info");

    if args.is_empty() {
        return Err(anyhow!("info requires a task id"));
    }

    let id = resolve_task_id(store, &args[0])?;
    let task = store
        .get_by_id(id)
        .ok_or_else(|| anyhow!("no task with id: {id}"))?;
    renderer.print_task_info(task)
}

#[instrument(skip(store, args))]
fn cmd_edit(store: &mut TaskStore, args: &[String]) -> anyhow::Result<()> {
    info!("command edit");

    if args.len() < 2 {
        return Err(anyhow!(
            "edit requires a task id plus a new priority and/or text"
        ));
    }

    let id = resolve_task_id(store, &args[0])?;
    store.start_editing(id);

    let current = store
        .get_by_id(id)
        .map(|task| (task.text.clone(), task.priority));
    let Some((current_text, current_priority)) = current else {
        store.cancel_editing();
        return Err(anyhow!("no task with id: {id}"));
    };

    let (priority, text_args) = match args[1].parse::<Priority>() {
        Ok(priority) => (priority, &args[2..]),
        Err(_) => (current_priority, &args[1..]),
    };
    // `edit <id> <priority>` with no trailing text re-prioritizes in place.
    let text = if text_args.is_empty() {
        current_text
    } else {
        text_args.join(" ")
    };

    match store.update(id, &text, priority) {
        Ok(outcome) => {
            report_save(&outcome);
            println!("Updated task {}.", short_id(id));
            Ok(())
        }
        Err(ValidationError::EmptyText) => {
            store.cancel_editing();
            Err(anyhow!("task text must not be empty"))
        }
    }
}

#[instrument(skip(store, args))]
fn cmd_remove(store: &mut TaskStore, args: &[String]) -> anyhow::Result<()> {
    info!("command remove");

    if args.is_empty() {
        return Err(anyhow!("remove requires a task id"));
    }

    let id = resolve_task_id(store, &args[0])?;
    let outcome = store.remove(id);
    report_save(&outcome);
    println!("Removed task {}.", short_id(id));
    Ok(())
}

#[instrument(skip(store, cfg, args))]
fn cmd_clear(store: &mut TaskStore, cfg: &Config, args: &[String]) -> anyhow::Result<()> {
    info!("command clear");

    let needs_confirmation = cfg.get_bool("confirmation").unwrap_or(true);
    let forced = args.iter().any(|arg| arg == "yes" || arg == "--yes");

    if needs_confirmation && !forced && !confirm_clear(store.len())? {
        println!("Clear aborted.");
        return Ok(());
    }

    let outcome = store.clear_all();
    report_save(&outcome);
    println!("Cleared all tasks.");
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: triage [FLAGS] <command> [args]");
    println!();
    println!("commands:");
    println!("  add [priority] <text>        create a task (default priority: moderate)");
    println!("  list                         show all tasks, most urgent first");
    println!("  info <id>                    show one task in full");
    println!("  edit <id> [priority] [text]  rewrite a task; give a priority, new text, or both");
    println!("  remove <id>                  delete a task");
    println!("  clear [yes]                  delete every task");
    println!("  version                      print the version");
    println!();
    println!("priorities: critical, moderate, optional");
    println!("ids may be abbreviated to any unique prefix");
    Ok(())
}

/// Resolves a (possibly abbreviated) task id the same way command tokens
/// resolve: a unique prefix matches, anything else is an error.
fn resolve_task_id(store: &TaskStore, reference: &str) -> anyhow::Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(reference) {
        return Ok(id);
    }

    let needle = reference.to_ascii_lowercase();
    let mut matches = store
        .view()
        .into_iter()
        .map(|task| task.id)
        .filter(|id| id.to_string().starts_with(&needle));

    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no task matches id: {reference}"))?;
    if matches.next().is_some() {
        return Err(anyhow!("ambiguous task id: {reference}"));
    }

    Ok(first)
}

fn confirm_clear(count: usize) -> anyhow::Result<bool> {
    print!("Clear all {count} task(s)? (y/n) ");
    io::stdout().flush().context("failed to flush prompt")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;

    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn report_save(outcome: &SaveOutcome) {
    if let SaveOutcome::Failed(err) = outcome {
        eprintln!("warning: changes kept in memory only: {err}");
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::backend::JsonFileBackend;

    #[test]
    fn command_abbreviations_expand_when_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("add", &known), Some("add"));
        assert_eq!(expand_command_abbrev("l", &known), Some("list"));
        assert_eq!(expand_command_abbrev("rem", &known), Some("remove"));
        assert_eq!(expand_command_abbrev("frob", &known), None);
    }

    #[test]
    fn ambiguous_abbreviations_do_not_expand() {
        let known = vec!["clear", "clone"];
        assert_eq!(expand_command_abbrev("cl", &known), None);
        assert_eq!(expand_command_abbrev("cle", &known), Some("clear"));
    }

    #[test]
    fn task_ids_resolve_by_unique_prefix() {
        let temp = tempdir().expect("tempdir");
        let backend = JsonFileBackend::open(temp.path()).expect("open backend");
        let mut store = TaskStore::open(Box::new(backend));

        let outcome = store
            .add("Write report", Priority::Critical, Utc::now())
            .expect("add");
        assert!(outcome.is_saved());
        let id = store.view()[0].id;

        let prefix = short_id(id);
        assert_eq!(resolve_task_id(&store, &prefix).expect("resolve"), id);
        assert_eq!(
            resolve_task_id(&store, &id.to_string()).expect("resolve full"),
            id
        );
        assert!(resolve_task_id(&store, "zzzzzzzz").is_err());

        let outcome = store
            .add("Second task", Priority::Optional, Utc::now())
            .expect("add second");
        assert!(outcome.is_saved());

        // The empty prefix matches every task.
        let err = resolve_task_id(&store, "").expect_err("ambiguous prefix");
        assert!(err.to_string().contains("ambiguous task id"));
    }

    #[test]
    fn edit_of_a_vanished_uuid_does_not_leave_the_cursor_dangling() {
        let temp = tempdir().expect("tempdir");
        let backend = JsonFileBackend::open(temp.path()).expect("open backend");
        let mut store = TaskStore::open(Box::new(backend));

        let outcome = store
            .add("Kept", Priority::Moderate, Utc::now())
            .expect("add");
        assert!(outcome.is_saved());

        let ghost = Uuid::new_v4().to_string();
        let args = vec![ghost, "critical".to_string(), "new text".to_string()];
        assert!(cmd_edit(&mut store, &args).is_err());
        assert_eq!(store.editing_id(), None);
    }
}
