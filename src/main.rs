//! CLI entry point for bibfetch.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::debug;

mod app;
mod cli;

use app::config::{RunSettings, load_default_file_config};
use app::terminal;
use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    if !args.has_command() {
        Args::command().print_help()?;
        return Ok(());
    }

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let file_config = load_default_file_config()?;
    let settings = RunSettings::resolve(&args, file_config.as_ref());

    let no_color = terminal::should_disable_color(
        args.no_color,
        terminal::no_color_env_requested(),
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(settings.log_level, no_color);

    debug!(?args, "CLI arguments parsed");
    app::run(&args, &settings).await
}
