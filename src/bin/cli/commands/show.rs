use anyhow::{Context, Result};

use memora_lib::flashcards::InsertMode;

use crate::app::App;
use crate::render::terminal::{describe_due, paint, render_card_line, Color};
use crate::OutputFormat;

pub fn run(
    app: &App,
    set_name: &str,
    mode: InsertMode,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let found = app.find_set(set_name)?;
    let set = app
        .storage
        .load_set(found.id, mode, app.today)
        .context("Failed to load card set")?;

    match format {
        OutputFormat::Json => {
            let cards: Vec<_> = set.cards.cards().collect();
            let output = serde_json::json!({
                "id": set.id.to_string(),
                "title": set.title,
                "awaitDate": set.await_date().to_string(),
                "lastModified": set.last_modified().to_string(),
                "cards": cards,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            let due = set.due_cards(app.today).len();
            println!("{}", paint(&set.title, Color::BOLD, use_color));
            println!(
                "{} cards, {} due, next review {}",
                set.cards.len(),
                due,
                describe_due(set.await_date(), app.today)
            );
            println!();

            if set.cards.is_empty() {
                println!("No cards yet.");
                return Ok(());
            }

            let term_width = set
                .cards
                .cards()
                .map(|c| c.term.len())
                .max()
                .unwrap_or(4)
                .clamp(4, 30);
            for card in set.cards.cards() {
                println!("{}", render_card_line(card, term_width, app.today, use_color));
            }
        }
    }

    Ok(())
}
