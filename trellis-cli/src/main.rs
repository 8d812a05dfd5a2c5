use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trellis_cli::{check_cmd, render_cmd, StateInput};

#[derive(Parser)]
#[command(name = "trellis", version, about = "Render and check trellis templates")]
struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StateArgs {
    /// JSON file holding the initial state object
    #[arg(long, conflicts_with = "state_json")]
    state: Option<PathBuf>,
    /// Initial state as an inline JSON object
    #[arg(long)]
    state_json: Option<String>,
}

impl StateArgs {
    fn input(&self) -> StateInput<'_> {
        match (&self.state, &self.state_json) {
            (Some(path), _) => StateInput::File(path),
            (None, Some(json)) => StateInput::Inline(json),
            (None, None) => StateInput::Empty,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template or component file to HTML on stdout.
    Render {
        input: PathBuf,
        #[command(flatten)]
        state: StateArgs,
        /// One top-level node per line
        #[arg(long)]
        pretty: bool,
    },
    /// Build a file once and report directive errors.
    Check {
        input: PathBuf,
        #[command(flatten)]
        state: StateArgs,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,trellis=debug",
        _ => "warn,trellis=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Render {
            input,
            state,
            pretty,
        } => println!("{}", render_cmd(&input, state.input(), pretty)?),
        Commands::Check { input, state } => println!("{}", check_cmd(&input, state.input())?),
    }
    Ok(())
}
