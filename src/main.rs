//! `onlv`: inspect and edit ONLV bill-of-quantities documents.

use clap::Parser;

mod cli;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    Cli::parse().run()
}
