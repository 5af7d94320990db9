//! Expression G CLI
//!
//! Offline tools for the page search engine: highlight a markup file, check a
//! pattern, and replay a popup session against an in-process background and page.

mod simulate;

use std::fs;

use clap::{Parser, Subcommand};

use eg_core::{compile, markup, HighlightEngine, MarkerStyle, PageTree};

#[derive(Parser)]
#[command(name = "eg-cli")]
#[command(about = "Expression G regex page search tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Marker element tag
    #[arg(long, global = true, default_value = eg_core::tree::DEFAULT_MARKER_TAG)]
    marker_tag: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Highlight every match of a pattern in a markup file
    Search {
        /// Markup file to search
        #[arg(short, long)]
        input: String,

        /// Pattern (case-insensitive, multiline)
        pattern: String,

        /// Print the highlighted markup
        #[arg(long)]
        show: bool,
    },

    /// Check whether a pattern compiles
    Check {
        /// Pattern to check
        pattern: String,
    },

    /// Replay popup actions against a markup file
    ///
    /// Steps: `type=<text>`, `next`, `prev`, `escape`, `reopen`, `reload`.
    Simulate {
        /// Markup file loaded as the page
        #[arg(short, long)]
        input: String,

        /// Tab id of the page
        #[arg(short, long, default_value_t = 1)]
        tab: i32,

        /// Popup actions, in order
        #[arg(required = true)]
        steps: Vec<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let style = MarkerStyle {
        tag: cli.marker_tag,
        ..MarkerStyle::default()
    };

    let result = match cli.command {
        Commands::Search { input, pattern, show } => cmd_search(&input, &pattern, show, style),
        Commands::Check { pattern } => cmd_check(&pattern),
        Commands::Simulate { input, tab, steps } => simulate::run(&input, tab, &steps, style),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn read_markup(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))
}

fn cmd_search(path: &str, pattern: &str, show: bool, style: MarkerStyle) -> Result<(), String> {
    let source = read_markup(path)?;
    let pattern = compile(pattern)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "Pattern is empty".to_string())?;

    let mut doc = markup::parse(&source);
    let mut engine = HighlightEngine::new(style);
    let count = engine.search(&mut doc, &pattern);

    println!("{} match{} for /{}/im in '{}'", count, if count == 1 { "" } else { "es" }, pattern.source(), path);
    for (index, marker) in doc.markers(engine.style()).into_iter().enumerate() {
        println!("  [{}] {:?}", index, doc.text_content(marker));
    }

    if show {
        println!();
        println!("{}", markup::serialize(&doc));
    }

    Ok(())
}

fn cmd_check(pattern: &str) -> Result<(), String> {
    match compile(pattern).map_err(|e| e.to_string())? {
        Some(pattern) => println!("OK: /{}/im", pattern.source()),
        None => println!("Empty: no search would run"),
    }
    Ok(())
}
