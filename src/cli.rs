use clap::{Args, Parser, Subcommand};
use glean_core::view::ReaderTheme;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "glean", version, about = "Command-line client for a Glean e-book server")]
pub struct Cli {
    /// Client configuration file.
    #[arg(long, default_value = "conf/config.toml")]
    pub config: PathBuf,

    /// Server base URL, overriding `[server] base_url`.
    #[arg(long, env = "GLEAN_SERVER")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open an app location such as `/`, `/library` or `/reader/7`.
    Open { location: String },
    /// Books with reading progress, most recent first.
    Shelf(ListArgs),
    /// Every book in the library.
    Library(ListArgs),
    /// Pick random books to read next.
    Random {
        #[arg(default_value_t = 1)]
        count: u32,
    },
    /// Print a chapter, or page through the book with `--interactive`.
    Read {
        book_id: i64,
        /// Zero-based chapter index; defaults to the saved position.
        #[arg(long)]
        chapter: Option<usize>,
        #[arg(short, long)]
        interactive: bool,
    },
    Star {
        book_id: i64,
        /// Remove the star instead.
        #[arg(long)]
        off: bool,
    },
    /// Mark a book as finished.
    Finish {
        book_id: i64,
        /// Mark it unfinished instead.
        #[arg(long)]
        undo: bool,
    },
    Delete {
        book_id: i64,
        /// Also delete the file from the server's disk.
        #[arg(long)]
        physical: bool,
    },
    /// Re-run chapter detection for a book.
    Reparse { book_id: i64 },
    /// Scan the library directory for new or changed books.
    Scan {
        /// Re-parse every file, not only changed ones.
        #[arg(long)]
        full: bool,
        /// Follow progress until the scan finishes.
        #[arg(long)]
        watch: bool,
    },
    ScanStatus,
    ScanStop,
    Login {
        #[arg(long, env = "GLEAN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Logout,
    /// Client and server versions.
    Version,
    /// Show or change reader display preferences.
    Appearance(AppearanceArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub starred: bool,
    #[arg(long, conflicts_with = "unfinished")]
    pub finished: bool,
    #[arg(long)]
    pub unfinished: bool,
    #[arg(long, short)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct AppearanceArgs {
    #[arg(long)]
    pub font_size: Option<u32>,
    #[arg(long)]
    pub line_height: Option<f32>,
    #[arg(long)]
    pub theme: Option<ReaderTheme>,
    #[arg(long)]
    pub brightness: Option<u8>,
    #[arg(long)]
    pub padding_horizontal: Option<u32>,
    #[arg(long)]
    pub padding_vertical: Option<u32>,
    #[arg(long)]
    pub paragraph_spacing: Option<f32>,
    #[arg(long)]
    pub animations: Option<bool>,
    /// Restore the defaults.
    #[arg(long, conflicts_with_all = ["font_size", "line_height", "theme", "brightness"])]
    pub reset: bool,
}
