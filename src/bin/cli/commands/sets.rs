use anyhow::{Context, Result};

use memora_lib::flashcards::{sort_card_sets, CardSet, SortMode};

use crate::app::App;
use crate::render::terminal::render_set_line;
use crate::OutputFormat;

fn set_json(set: &CardSet, card_count: usize, awaiting: bool) -> serde_json::Value {
    serde_json::json!({
        "id": set.id.to_string(),
        "title": set.title,
        "cardCount": card_count,
        "awaitDate": set.await_date().to_string(),
        "lastModified": set.last_modified().to_string(),
        "awaiting": awaiting,
    })
}

pub fn run(app: &App, mode: SortMode, format: &OutputFormat, use_color: bool) -> Result<()> {
    let mut sets = app.list_sets()?;
    sort_card_sets(&mut sets, mode, app.today);

    let counts: Vec<usize> = sets
        .iter()
        .map(|s| app.storage.list_cards(s.id).map(|c| c.len()).unwrap_or(0))
        .collect();

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = sets
                .iter()
                .zip(&counts)
                .map(|(s, &count)| set_json(s, count, s.is_awaiting(app.today)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if sets.is_empty() {
                println!("No card sets. Create one with `memora-cli new-set <title>`.");
                return Ok(());
            }

            let title_width = sets.iter().map(|s| s.title.len()).max().unwrap_or(5).clamp(5, 40);
            for (set, &count) in sets.iter().zip(&counts) {
                println!("{}", render_set_line(set, count, title_width, app.today, use_color));
            }
        }
    }

    Ok(())
}

pub fn run_create(app: &App, title: String, format: &OutputFormat) -> Result<()> {
    let set = app
        .storage
        .create_set(title, app.today)
        .context("Failed to create card set")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&set_json(&set, 0, true))?)
        }
        OutputFormat::Plain => println!("Created set \"{}\"", set.title),
    }
    Ok(())
}

pub fn run_rename(app: &App, set_name: &str, title: String, format: &OutputFormat) -> Result<()> {
    let set = app.find_set(set_name)?;
    let renamed = app
        .storage
        .rename_set(set.id, title)
        .context("Failed to rename card set")?;

    match format {
        OutputFormat::Json => {
            let count = app.storage.list_cards(renamed.id).map(|c| c.len()).unwrap_or(0);
            let awaiting = renamed.is_awaiting(app.today);
            println!("{}", serde_json::to_string_pretty(&set_json(&renamed, count, awaiting))?);
        }
        OutputFormat::Plain => println!("Renamed \"{}\" to \"{}\"", set.title, renamed.title),
    }
    Ok(())
}

pub fn run_delete(app: &App, set_name: &str) -> Result<()> {
    let set = app.find_set(set_name)?;
    app.storage
        .delete_set(set.id)
        .context("Failed to delete card set")?;
    println!("Deleted set \"{}\"", set.title);
    Ok(())
}
