//! `formcraft history`: local history management

use super::{open_local_store, truncate};
use crate::cli::HistoryCommand;
use crate::config::Config;
use crate::error::{FormcraftError, Result};
use crate::history::{LocalHistoryItem, LocalHistoryStore};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    let store = open_local_store(config)?;
    handle_with_store(&store, command)
}

fn handle_with_store(store: &LocalHistoryStore, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List { search } => {
            let items = store.search(search.as_deref().unwrap_or(""));
            if items.is_empty() {
                println!("{}", "No generation history found.".yellow());
                return Ok(());
            }
            println!("\nGeneration History:");
            render_table(&items).printstd();
            println!();
            println!(
                "Use {} to print a schema.",
                "formcraft history show <ID>".cyan()
            );
            println!();
        }
        HistoryCommand::Show { id } => {
            let item = store
                .get(&id)
                .ok_or_else(|| FormcraftError::NotFound(format!("history item {}", id)))?;
            match item.schema {
                Some(schema) => println!("{}", schema.to_pretty_string()),
                None => println!("{}", "This attempt failed; no schema was recorded.".yellow()),
            }
        }
        HistoryCommand::Delete { id } => {
            if !store.delete(&id) {
                return Err(FormcraftError::NotFound(format!("history item {}", id)).into());
            }
            println!("{}", format!("Deleted history item {}", id).green());
        }
        HistoryCommand::Clear => {
            store.clear();
            println!("{}", "Cleared local history".green());
        }
    }
    Ok(())
}

fn render_table(items: &[LocalHistoryItem]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "ID".bold(),
        "When".bold(),
        "Prompt".bold(),
        "Status".bold()
    ]);

    for item in items {
        let status = if item.success {
            "ok".green()
        } else {
            "failed".red()
        };
        table.add_row(prettytable::row![
            item.id.cyan(),
            item.timestamp.format("%Y-%m-%d %H:%M"),
            truncate(&item.prompt, 40),
            status
        ]);
    }
    table
}
