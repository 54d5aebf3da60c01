mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use memora_lib::flashcards::{InsertMode, SortMode};

#[derive(Parser)]
#[command(name = "memora-cli", about = "Leitner-box flashcards in the terminal", version)]
struct Cli {
    /// Storage directory (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum SortArg {
    Chronological,
    Alphabetical,
    Awaiting,
}

impl From<SortArg> for SortMode {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Chronological => SortMode::Chronological,
            SortArg::Alphabetical => SortMode::Alphabetical,
            SortArg::Awaiting => SortMode::Awaiting,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OrderArg {
    Front,
    Append,
    Alphabetical,
    DueAware,
}

impl From<OrderArg> for InsertMode {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Front => InsertMode::Front,
            OrderArg::Append => InsertMode::Append,
            OrderArg::Alphabetical => InsertMode::Alphabetical,
            OrderArg::DueAware => InsertMode::DueAware,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List card sets
    Sets {
        /// Ordering (default from config)
        #[arg(long)]
        sort: Option<SortArg>,
    },

    /// Create a card set
    NewSet {
        title: String,
    },

    /// Rename a card set
    RenameSet {
        /// Set title (case-insensitive prefix match)
        set: String,
        title: String,
    },

    /// Delete a card set and all its cards
    DeleteSet {
        /// Set title (case-insensitive prefix match)
        set: String,
    },

    /// Add a card to a set
    Add {
        /// Set title (case-insensitive prefix match)
        set: String,
        term: String,
        definition: String,
    },

    /// Edit a card's term or definition
    Edit {
        /// Set title (case-insensitive prefix match)
        set: String,
        /// Current term (case-insensitive prefix match)
        card: String,
        #[arg(long)]
        term: Option<String>,
        #[arg(long)]
        definition: Option<String>,
    },

    /// Remove a card from a set
    Remove {
        /// Set title (case-insensitive prefix match)
        set: String,
        /// Term (case-insensitive prefix match)
        card: String,
    },

    /// Show the cards of a set
    Show {
        /// Set title (case-insensitive prefix match)
        set: String,
        /// Card ordering (default from config)
        #[arg(long)]
        mode: Option<OrderArg>,
    },

    /// Memorize the due cards of a set
    Study {
        /// Set title (case-insensitive prefix match)
        set: String,
        /// Seed for a reproducible card order
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let app = app::App::new(cli.data_dir)?;

    match cli.command {
        Command::Sets { sort } => {
            let mode = sort.map(SortMode::from).unwrap_or(app.config.sort_mode);
            commands::sets::run(&app, mode, &cli.format, use_color)?;
        }
        Command::NewSet { title } => {
            commands::sets::run_create(&app, title, &cli.format)?;
        }
        Command::RenameSet { set, title } => {
            commands::sets::run_rename(&app, &set, title, &cli.format)?;
        }
        Command::DeleteSet { set } => {
            commands::sets::run_delete(&app, &set)?;
        }
        Command::Add { set, term, definition } => {
            commands::cards::run_add(&app, &set, term, definition, &cli.format)?;
        }
        Command::Edit { set, card, term, definition } => {
            commands::cards::run_edit(&app, &set, &card, term, definition, &cli.format)?;
        }
        Command::Remove { set, card } => {
            commands::cards::run_remove(&app, &set, &card)?;
        }
        Command::Show { set, mode } => {
            let mode = mode.map(InsertMode::from).unwrap_or(app.config.insert_mode);
            commands::show::run(&app, &set, mode, &cli.format, use_color)?;
        }
        Command::Study { set, seed } => {
            let seed = seed.or(app.config.seed);
            let mut input = std::io::stdin().lock();
            let mut output = std::io::stdout();
            commands::study::run(&app, &set, seed, &mut input, &mut output, use_color)?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
