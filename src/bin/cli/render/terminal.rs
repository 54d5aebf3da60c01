use chrono::NaiveDate;

use memora_lib::flashcards::{format_interval, Card, CardSet};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// "due", "in 3d", "in 2w"
pub fn describe_due(date: NaiveDate, today: NaiveDate) -> String {
    let days = (date - today).num_days();
    if days <= 0 {
        "due".to_string()
    } else {
        format!("in {}", format_interval(days as u32))
    }
}

/// One line of the set listing. Awaiting sets are highlighted.
pub fn render_set_line(
    set: &CardSet,
    card_count: usize,
    title_width: usize,
    today: NaiveDate,
    use_color: bool,
) -> String {
    let title = format!("{:<width$}", set.title, width = title_width);
    let status = if set.is_awaiting(today) {
        paint("awaiting", Color::BLUE, use_color)
    } else {
        paint(&describe_due(set.await_date(), today), Color::GRAY, use_color)
    };
    let title = if set.is_awaiting(today) {
        paint(&title, Color::BOLD, use_color)
    } else {
        title
    };
    format!("{} {:>5} cards  {}", title, card_count, status)
}

/// One line of a set's card listing
pub fn render_card_line(
    card: &Card,
    term_width: usize,
    today: NaiveDate,
    use_color: bool,
) -> String {
    let term = format!("{:<width$}", card.term, width = term_width);
    let schedule = if card.finished {
        paint("finished", Color::GREEN, use_color)
    } else if card.is_eligible(today) {
        paint("due", Color::YELLOW, use_color)
    } else {
        paint(&describe_due(card.memorization_date, today), Color::GRAY, use_color)
    };
    format!("{} box {}  {}  {}", term, card.box_level, schedule, card.definition)
}
