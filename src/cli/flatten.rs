use std::path::PathBuf;

use clap::Parser;
use onlv::{
    domain::{JsonText, PlainText},
    flat::{self, FlatItem, ItemData},
    storage,
};
use tracing::instrument;

use super::terminal::Paint;

/// Longest label printed for remarks and descriptions, in characters.
const LABEL_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(about = "Print the flat projection of a document")]
pub struct Flatten {
    /// The ONLV JSON document
    file: PathBuf,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

impl Flatten {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let document = storage::load(&self.file)?;
        let items = flat::flatten(&document);
        print_items(items.iter(), self.output)
    }
}

#[derive(Debug, Parser)]
#[command(about = "Search the flat projection of a document")]
pub struct Search {
    /// The ONLV JSON document
    file: PathBuf,

    /// Search terms; every term must match
    #[arg(required = true)]
    query: Vec<String>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

impl Search {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let document = storage::load(&self.file)?;
        let items = flat::flatten(&document);
        let query = self.query.join(" ");
        let hits = flat::search(&items, &query);

        if hits.is_empty() {
            eprintln!("No items match '{query}'");
            return Ok(());
        }
        print_items(hits.into_iter(), self.output)
    }
}

fn print_items<'a>(
    items: impl Iterator<Item = &'a FlatItem>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    match output {
        OutputFormat::Pretty => {
            let paint = Paint::stdout();
            for item in items {
                println!(
                    "{}{}{} {}  {}",
                    paint.kind(item.kind),
                    "  ".repeat(item.level),
                    paint.number(&item.nr),
                    label(item),
                    paint.muted(&item.id)
                );
            }
        }
        OutputFormat::Json => {
            let items: Vec<&FlatItem> = items.collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

/// A one-line label for an item.
fn label(item: &FlatItem) -> String {
    match &item.data {
        ItemData::Group(properties) => properties.ueberschrift.clone().unwrap_or_default(),
        ItemData::Position(position) => position
            .pos_eigenschaften
            .stichwort
            .clone()
            .unwrap_or_default(),
        ItemData::Remark(text) | ItemData::Description { langtext: text, .. } => {
            truncate(&JsonText.plain_text(text), LABEL_WIDTH)
        }
        ItemData::StandingRemarks { .. } => "Ständige Vorbemerkungen".to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= width {
        return line;
    }
    let mut short: String = line.chars().take(width - 1).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("kurz", 10, "kurz"; "short text is kept")]
    #[test_case("ein\n langer   Text", 10, "ein lange…"; "long text is cut")]
    #[test_case("genau zehn", 10, "genau zehn"; "exact width is kept")]
    fn truncates(text: &str, width: usize, expected: &str) {
        assert_eq!(truncate(text, width), expected);
    }

    #[test]
    fn flatten_reads_document() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lv.json");
        std::fs::write(
            &path,
            r#"{ "onlv": { "ausschreibungs-lv": { "gliederung-lg": { "lg-liste": {
                "lg": { "lg-eigenschaften": { "ueberschrift": "Baustelle" }, "@_nr": "01" }
            }}}}}"#,
        )
        .unwrap();

        let command = Flatten {
            file: path.clone(),
            output: OutputFormat::Json,
        };
        assert!(command.run().is_ok());

        let command = Search {
            file: path,
            query: vec!["baustelle".into()],
            output: OutputFormat::Pretty,
        };
        assert!(command.run().is_ok());
    }

    #[test]
    fn flatten_reports_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let command = Flatten {
            file: tmp.path().join("missing.json"),
            output: OutputFormat::Pretty,
        };
        assert!(command.run().is_err());
    }
}
