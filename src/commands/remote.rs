//! `formcraft remote`: remote history browser
//!
//! Opens the server's database directly, so it cannot run while
//! `formcraft serve` holds the same data directory.

use super::{open_remote_store, truncate};
use crate::cli::RemoteCommand;
use crate::config::Config;
use crate::error::{FormcraftError, Result};
use crate::history::{HistoryPage, HistoryQuery, RemoteHistoryStore};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle remote history commands
pub async fn handle_remote(config: &Config, command: RemoteCommand) -> Result<()> {
    let store = open_remote_store(config)?;

    match command {
        RemoteCommand::List {
            page,
            limit,
            search,
            success,
        } => {
            let limit = limit
                .unwrap_or(config.history.default_page_size)
                .clamp(1, config.history.max_page_size);
            let mut query = HistoryQuery::new(page, limit);
            if let Some(search) = search {
                query = query.with_search(search);
            }
            if let Some(success) = success {
                query = query.with_success(success);
            }
            print_page(&store.list(&query)?);
        }
        RemoteCommand::Show { id } => {
            let item = store
                .get(&id)?
                .ok_or_else(|| FormcraftError::NotFound(format!("history record {}", id)))?;
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        RemoteCommand::Delete { id } => delete(&store, &id).await?,
        RemoteCommand::Stats => {
            let stats = store.stats()?;
            println!("Total:      {}", stats.total);
            println!("Successful: {}", stats.successful.to_string().green());
            println!("Failed:     {}", stats.failed.to_string().red());
        }
    }
    Ok(())
}

async fn delete(store: &RemoteHistoryStore, id: &str) -> Result<()> {
    if !store.delete(id).await? {
        return Err(FormcraftError::NotFound(format!("history record {}", id)).into());
    }
    println!("{}", format!("Deleted history record {}", id).green());
    Ok(())
}

fn print_page(page: &HistoryPage) {
    if page.items.is_empty() {
        println!("{}", "No history records found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "ID".bold(),
        "Created".bold(),
        "Prompt".bold(),
        "Image".bold()
    ]);
    for item in &page.items {
        table.add_row(prettytable::row![
            item.id.cyan(),
            item.timestamp.format("%Y-%m-%d %H:%M"),
            truncate(&item.prompt_preview, 40),
            item.input_image_url
        ]);
    }

    println!();
    table.printstd();
    println!(
        "Page {} ({} per page), {} total{}",
        page.page,
        page.limit,
        page.total,
        if page.has_more { ", more available" } else { "" }
    );
}
