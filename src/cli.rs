use std::path::{Path, PathBuf};

mod edit;
mod flatten;
mod identifier;
mod terminal;

use clap::ArgAction;
use edit::{Extract, Insert, New, Update};
use flatten::{Flatten, Search};
use identifier::{Check, Diff};
use onlv::Config;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the configuration file
    #[arg(short, long, default_value = "onlv.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let config = load_config(&self.config)?;
        self.command.run(&config)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Reads the configuration, falling back to defaults when the file is absent.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(path).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Validate and parse compact identifiers
    Check(Check),

    /// Compare a sequence of identifiers component by component
    ///
    /// Each identifier is compared with the one before it.
    Diff(Diff),

    /// Create an empty document
    New(New),

    /// Print the flat projection of a document
    Flatten(Flatten),

    /// Search the flat projection of a document
    Search(Search),

    /// Update a position
    Update(Update),

    /// Insert a new hierarchy node
    Insert(Insert),

    /// Reduce a document to the given positions
    Extract(Extract),
}

impl Command {
    fn run(self, config: &Config) -> anyhow::Result<()> {
        match self {
            Self::Check(command) => command.run()?,
            Self::Diff(command) => command.run(config)?,
            Self::New(command) => command.run(config)?,
            Self::Flatten(command) => command.run()?,
            Self::Search(command) => command.run()?,
            Self::Update(command) => command.run(config)?,
            Self::Insert(command) => command.run(config)?,
            Self::Extract(command) => command.run()?,
        }
        Ok(())
    }
}
