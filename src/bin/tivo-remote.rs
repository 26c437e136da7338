//! Command-line remote for a TiVo receiver.
//!
//! Usage: tivo-remote --config tivo.toml status
//!        tivo-remote --config tivo.toml channel 612

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tivolink::{Config, Direction, Intent, Power, Skill};

#[derive(Parser)]
#[command(name = "tivo-remote", version, about = "Control a TiVo over its network remote protocol")]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "tivo.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Report what is on.
    Status,
    /// Tune a channel, e.g. `channel 612`.
    Channel { digits: Vec<String> },
    /// Next channel (or fast-forward outside live TV).
    Up,
    /// Previous channel (or rewind outside live TV).
    Down,
    Play,
    Pause,
    Record,
    Stop,
    /// Leave standby.
    On,
    /// Enter standby.
    Off,
}

impl Cmd {
    fn into_intent(self) -> Intent {
        match self {
            Cmd::Status => Intent::Status,
            Cmd::Channel { digits } => Intent::SetChannel(digits.join(" ")),
            Cmd::Up => Intent::Step(Direction::Up),
            Cmd::Down => Intent::Step(Direction::Down),
            Cmd::Play => Intent::Play,
            Cmd::Pause => Intent::Pause,
            Cmd::Record => Intent::Record,
            Cmd::Stop => Intent::Stop,
            Cmd::On => Intent::Power(Power::On),
            Cmd::Off => Intent::Power(Power::Off),
        }
    }
}

/// Filter used when `RUST_LOG` is unset.
fn default_filter(verbose: u8, debug: bool) -> &'static str {
    match (verbose, debug) {
        (0, false) => "tivolink=warn",
        (0, true) | (1, _) => "tivolink=debug",
        _ => "tivolink=trace",
    }
}

fn init_tracing(verbose: u8, debug: bool) {
    let default = default_filter(verbose, debug);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cli.verbose, config.debug);

    let mut skill = match Skill::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match skill.handle(cli.command.into_intent()) {
        Ok(resp) => {
            println!("{resp}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
