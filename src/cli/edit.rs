use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use onlv::{
    Config, Document, Identifier, PositionManager,
    domain::{Clock, Quantity, document::Metadaten},
    editor::{self, Insertion, NewGroup, NewGrundtext, NewPosition, NextStep, PositionUpdate},
    flat::{self, ItemData},
    storage,
};
use serde_json::Value;
use tracing::instrument;

use super::terminal::Paint;

/// Writes `document` to `output`, or back to `input` when no output is given.
fn write(document: &Document, input: &Path, output: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = output.unwrap_or(input).to_path_buf();
    storage::save(document, &path)?;
    Ok(path)
}

#[derive(Debug, Parser)]
#[command(about = "Create an empty document")]
pub struct New {
    /// Where to write the document
    file: PathBuf,

    /// File name recorded in the metadata
    #[arg(long)]
    dateiname: Option<String>,

    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
}

impl New {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        if self.file.exists() && !self.force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                self.file.display()
            );
        }

        let mut document = PositionManager::new(config.clone()).new_document();
        if let Some(dateiname) = self.dateiname {
            document
                .onlv
                .metadaten
                .get_or_insert_with(Metadaten::default)
                .dateiname = Some(dateiname);
        }

        storage::save(&document, &self.file)?;
        println!("Created {}", self.file.display());
        println!(
            "{}",
            Paint::stdout().muted(format!(
                "Next: onlv insert {} lg <NR>",
                self.file.display()
            ))
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(about = "Update the properties of a position")]
pub struct Update {
    /// The ONLV JSON document
    file: PathBuf,

    /// The position id (e.g. `pos-ulg-01.02-03-A`)
    position: String,

    /// New keyword
    #[arg(long)]
    stichwort: Option<String>,

    /// New long text
    #[arg(long)]
    langtext: Option<String>,

    /// New unit
    #[arg(long)]
    einheit: Option<String>,

    /// New quantity
    #[arg(long)]
    lvmenge: Option<String>,

    /// New long text for the enclosing base text
    #[arg(long)]
    grundtext: Option<String>,

    /// Where to write the result (defaults to the input file)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Update {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut document = storage::load(&self.file)?;

        // omitted flags leave the current values in place
        let update = PositionUpdate {
            id: self.position.clone(),
            stichwort: self.stichwort,
            langtext: self.langtext.map(Value::String),
            einheit: self.einheit,
            lvmenge: self.lvmenge.as_deref().map(Quantity::from),
            grundtext: self.grundtext.map(Value::String),
        };

        let manager = PositionManager::new(config.clone());
        manager.try_update_in_place(&mut document, &update)?;
        document.touch(manager.clock().now());

        let path = write(&document, &self.file, self.output.as_deref())?;
        println!(
            "Updated {} in {}",
            Paint::stdout().number(&self.position),
            path.display()
        );
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(about = "Insert a new hierarchy node")]
pub struct Insert {
    /// The ONLV JSON document
    file: PathBuf,

    /// Where to write the result (defaults to the input file)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    target: Target,
}

#[derive(Debug, Subcommand)]
enum Target {
    /// A new main group
    Lg {
        /// Two-digit LG number
        nr: String,

        #[command(flatten)]
        group: GroupArgs,
    },

    /// A new sub-group in an existing LG
    Ulg {
        /// The enclosing LG
        lg: String,

        /// Two-digit ULG suffix
        nr: String,

        #[command(flatten)]
        group: GroupArgs,
    },

    /// A new base text with its first position
    Grundtext {
        /// The enclosing LG
        lg: String,

        /// The enclosing ULG suffix
        ulg: String,

        /// Two-digit base-text number
        nr: String,

        /// Shared long description
        #[arg(long = "grundtext")]
        description: Option<String>,

        /// Make the first position the Ungeteilteposition
        #[arg(long)]
        undivided: bool,

        #[command(flatten)]
        position: PositionArgs,
    },

    /// A new Folgeposition in an existing base text
    Folgeposition {
        /// The enclosing LG
        lg: String,

        /// The enclosing ULG suffix
        ulg: String,

        /// The base-text number
        grundtext: String,

        #[command(flatten)]
        position: PositionArgs,
    },
}

#[derive(Debug, Args)]
struct GroupArgs {
    /// Title
    #[arg(long)]
    title: Option<String>,

    /// Preliminary remark
    #[arg(long)]
    vorbemerkung: Option<String>,

    /// Origin flag (defaults to the configured flag)
    #[arg(long)]
    origin: Option<String>,
}

impl GroupArgs {
    fn into_group(self, nr: String) -> NewGroup {
        NewGroup {
            nr,
            ueberschrift: self.title,
            vorbemerkung: self.vorbemerkung.map(Value::String),
            herkunftskennzeichen: self.origin,
        }
    }
}

#[derive(Debug, Args)]
struct PositionArgs {
    /// Follow-up letter (defaults to the next free letter)
    #[arg(long)]
    ftnr: Option<char>,

    /// Keyword
    #[arg(long)]
    stichwort: String,

    /// Long text
    #[arg(long)]
    langtext: Option<String>,

    /// Unit
    #[arg(long)]
    einheit: Option<String>,

    /// Quantity
    #[arg(long)]
    lvmenge: Option<String>,

    /// Origin flag (defaults to the configured flag)
    #[arg(long)]
    origin: Option<String>,
}

impl From<PositionArgs> for NewPosition {
    fn from(args: PositionArgs) -> Self {
        Self {
            ftnr: args.ftnr,
            stichwort: args.stichwort,
            langtext: args.langtext.map(Value::String),
            einheit: args.einheit,
            lvmenge: args.lvmenge.as_deref().map(Quantity::from),
            herkunftskennzeichen: args.origin,
        }
    }
}

impl Insert {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let document = storage::load(&self.file)?;
        let manager = PositionManager::new(config.clone());

        let insertion = match self.target {
            Target::Lg { nr, group } => manager.insert_lg(&document, &group.into_group(nr))?,
            Target::Ulg { lg, nr, group } => {
                manager.insert_ulg(&document, &lg, &group.into_group(nr))?
            }
            Target::Grundtext {
                lg,
                ulg,
                nr,
                description,
                undivided,
                position,
            } => manager.insert_grundtext(
                &document,
                &lg,
                &ulg,
                &NewGrundtext {
                    nr,
                    langtext: description.map(Value::String),
                    position: position.into(),
                    undivided,
                },
            )?,
            Target::Folgeposition {
                lg,
                ulg,
                grundtext,
                position,
            } => manager.insert_folgeposition(&document, &lg, &ulg, &grundtext, &position.into())?,
        };

        let Insertion { document, id, next } = insertion;
        let path = write(&document, &self.file, self.output.as_deref())?;

        let paint = Paint::stdout();
        println!("Inserted {} in {}", paint.number(&id), path.display());
        if let Some(next) = next {
            let hint = match next {
                NextStep::Ulg { lg } => format!("onlv insert {} ulg {lg} <NR>", path.display()),
                NextStep::Grundtext { lg, ulg } => format!(
                    "onlv insert {} grundtext {lg} {ulg} <NR> --stichwort <STICHWORT>",
                    path.display()
                ),
            };
            println!("{}", paint.muted(format!("Next: {hint}")));
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(about = "Reduce a document to the given positions and their ancestors")]
pub struct Extract {
    /// The ONLV JSON document
    file: PathBuf,

    /// Six-digit identifiers, optionally with a follow-up letter
    #[arg(required = true)]
    identifiers: Vec<Identifier>,

    /// Where to write the extracted document
    #[arg(short, long)]
    output: PathBuf,
}

impl Extract {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let document = storage::load(&self.file)?;
        let extracted = editor::extract(&document, &self.identifiers);

        let positions = flat::flatten(&extracted)
            .iter()
            .filter(|item| matches!(item.data, ItemData::Position(_)))
            .count();
        storage::save(&extracted, &self.output)?;

        println!(
            "Extracted {positions} positions to {}",
            self.output.display()
        );
        Ok(())
    }
}
