use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

use cxswitch::{
    commands,
    paths::Paths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "cxs")]
#[command(about = "Codex account switcher - swap API keys and providers in ~/.codex")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors
    #[arg(long, global = true, value_enum, value_name = "WHEN", default_value_t)]
    color: ColorMode,

    /// Codex directory to operate on (defaults to $CODEX_HOME or ~/.codex)
    #[arg(long, global = true, value_name = "DIR")]
    codex_dir: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all profiles and pick one to activate (default)
    List,

    /// Switch to a profile by name
    Use {
        /// Name of the profile to activate
        name: String,
    },

    /// Show the active API key and provider configuration
    Current {
        /// Print the API key unmasked
        #[arg(long)]
        reveal: bool,
    },

    /// Write an example apiConfig.json
    Init {
        /// Overwrite an existing store
        #[arg(long)]
        force: bool,
    },

    /// Run diagnostics on the codex setup
    Doctor,

    /// Print a shell completion script to stdout
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    let ui = Ui::new(cli.color, cli.no_color);

    if let Err(e) = run(cli, &ui) {
        ui.err(format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli, ui: &Ui) -> Result<()> {
    // Completions go to stdout untouched, before logging or path lookup.
    if let Some(Commands::Completions { shell }) = cli.command {
        generate(shell, &mut Cli::command(), "cxs", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose)?;

    let paths = Paths::new(cli.codex_dir)?;
    tracing::debug!("codex dir: {}", paths.codex_dir.display());

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => commands::list(&paths, ui),
        Commands::Use { name } => commands::use_profile(&paths, &name, ui),
        Commands::Current { reveal } => commands::current(&paths, ui, reveal),
        Commands::Init { force } => commands::init(&paths, force, ui),
        Commands::Doctor => commands::doctor(&paths, ui),
        Commands::Completions { .. } => Ok(()),
    }
}

/// Logs go to stderr; warnings already reach the user through the UI, so only
/// errors are logged unless `--verbose` or `RUST_LOG` asks for more.
fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}
