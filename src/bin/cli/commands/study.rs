use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use memora_lib::flashcards::{MemorizationSession, SessionError, SessionStatus, SessionSummary};

use crate::app::App;
use crate::render::terminal::{describe_due, paint, Color};

const PROMPT: &str = "[s]how  [y] knew it  [n] missed it  [q]uit";

/// Run an interactive memorization session over `input`/`output`
pub fn run<I, O>(
    app: &App,
    set_name: &str,
    seed: Option<u64>,
    input: &mut I,
    output: &mut O,
    use_color: bool,
) -> Result<()>
where
    I: BufRead,
    O: Write,
{
    let set = app.find_set(set_name)?;
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let policy = app.policy()?;
    let started = MemorizationSession::start(set.id, &app.storage, policy, rng, app.today);
    let mut session = match started {
        Ok(session) => session,
        Err(SessionError::NothingDue(_)) => {
            writeln!(
                output,
                "Nothing to study in \"{}\". Next review {}.",
                set.title,
                describe_due(set.await_date(), app.today)
            )?;
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to start session"),
    };

    writeln!(output, "{}", paint(&set.title, Color::BOLD, use_color))?;
    writeln!(output, "{}", paint(PROMPT, Color::GRAY, use_color))?;

    while session.status() == SessionStatus::Active {
        let term = match session.current_card() {
            Some(card) => card.term.clone(),
            None => break,
        };
        let (mastered, total) = session.progress();
        write!(output, "\n({}/{}) {} > ", mastered, total, paint(&term, Color::CYAN, use_color))?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        match line.trim() {
            "s" | "show" => {
                let definition = session.reveal()?;
                writeln!(output, "  {}", definition)?;
            }
            "y" | "yes" => {
                session.recall_success().context("Failed to record answer")?;
            }
            "n" | "no" => {
                let definition = session.reveal()?.to_string();
                session.recall_failure().context("Failed to record answer")?;
                writeln!(output, "  {}", paint(&definition, Color::RED, use_color))?;
            }
            "q" | "quit" => break,
            _ => writeln!(output, "{}", PROMPT)?,
        }
    }

    if session.status() == SessionStatus::PendingRollup {
        session.finalize().context("Failed to save set progress")?;
    }

    if session.status() == SessionStatus::Completed {
        print_summary(&session.summary(), app, output, use_color)
    } else {
        print_summary(&session.abandon(), app, output, use_color)
    }
}

fn print_summary<O: Write>(
    summary: &SessionSummary,
    app: &App,
    output: &mut O,
    use_color: bool,
) -> Result<()> {
    writeln!(output)?;
    if summary.completed {
        let line = format!(
            "All {} cards mastered. Next review {}.",
            summary.total,
            describe_due(summary.await_date, app.today)
        );
        writeln!(output, "{}", paint(&line, Color::GREEN, use_color))?;
    } else {
        writeln!(
            output,
            "Stopped with {} of {} cards mastered. Their progress is saved.",
            summary.mastered, summary.total
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use memora_lib::config::StudyConfig;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn test_app() -> (App, TempDir) {
        let temp = TempDir::new().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let app =
            App::with_config(StudyConfig::default(), temp.path().to_path_buf(), today).unwrap();
        (app, temp)
    }

    fn run_script(app: &App, script: &str) -> String {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();
        run(app, "fruit", Some(5), &mut input, &mut output, false).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_study_to_completion() {
        let (app, _temp) = test_app();
        let set = app.storage.create_set("Fruit".to_string(), app.today).unwrap();
        for term in ["Apple", "Banana"] {
            app.storage
                .add_card(set.id, term.to_string(), "x".to_string(), app.today)
                .unwrap();
        }

        let out = run_script(&app, "s\ny\ny\ny\ny\n");
        assert!(out.contains("All 2 cards mastered. Next review in 2d."));

        let stored = app.storage.get_set(set.id).unwrap();
        assert_eq!(stored.await_date(), app.today + Duration::days(2));

        // Nothing left for today
        let out = run_script(&app, "");
        assert!(out.contains("Nothing to study"));
    }

    #[test]
    fn test_quit_keeps_rollup() {
        let (app, _temp) = test_app();
        let set = app.storage.create_set("Fruit".to_string(), app.today).unwrap();
        app.storage
            .add_card(set.id, "Apple".to_string(), "x".to_string(), app.today)
            .unwrap();

        let out = run_script(&app, "n\nq\n");
        assert!(out.contains("Stopped with 0 of 1 cards mastered."));
        assert_eq!(app.storage.get_set(set.id).unwrap().await_date(), app.today);
        assert_eq!(app.storage.list_cards(set.id).unwrap()[0].box_level, 0);
    }
}
