use anyhow::{bail, Context, Result};

use memora_lib::flashcards::Card;

use crate::app::App;
use crate::OutputFormat;

fn print_card(card: &Card, verb: &str, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(card)?),
        OutputFormat::Plain => println!("{} \"{}\": {}", verb, card.term, card.definition),
    }
    Ok(())
}

pub fn run_add(
    app: &App,
    set_name: &str,
    term: String,
    definition: String,
    format: &OutputFormat,
) -> Result<()> {
    let set = app.find_set(set_name)?;
    let card = app
        .storage
        .add_card(set.id, term, definition, app.today)
        .context("Failed to add card")?;
    print_card(&card, "Added", format)
}

pub fn run_edit(
    app: &App,
    set_name: &str,
    card_term: &str,
    term: Option<String>,
    definition: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    if term.is_none() && definition.is_none() {
        bail!("Nothing to change: pass --term and/or --definition");
    }

    let set = app.find_set(set_name)?;
    let card = app.find_card(set.id, card_term)?;
    let updated = app
        .storage
        .update_card(set.id, card.id, term, definition)
        .context("Failed to update card")?;
    print_card(&updated, "Updated", format)
}

pub fn run_remove(app: &App, set_name: &str, card_term: &str) -> Result<()> {
    let set = app.find_set(set_name)?;
    let card = app.find_card(set.id, card_term)?;
    app.storage
        .delete_card(set.id, card.id)
        .context("Failed to remove card")?;
    println!("Removed \"{}\" from \"{}\"", card.term, set.title);
    Ok(())
}
