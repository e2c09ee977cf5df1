use clap::Parser;
use onlv::{
    ChangeDetector, Config, Identifier,
    domain::{Variant, identifier::validate},
};
use tracing::instrument;

use super::terminal::Paint;

#[derive(Debug, Parser)]
#[command(about = "Validate and parse compact identifiers")]
pub struct Check {
    /// The identifiers to check (e.g. `991090A`)
    #[arg(required = true)]
    identifiers: Vec<String>,
}

impl Check {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self) -> anyhow::Result<()> {
        let paint = Paint::stdout();
        let mut invalid = 0;

        for raw in &self.identifiers {
            let validation = validate(raw);
            if !validation.is_valid() {
                invalid += 1;
                println!("{} {}", paint.rejected("✗"), paint.rejected(raw));
                for error in validation.errors() {
                    println!("    {}", paint.muted(error));
                }
                continue;
            }

            let identifier: Identifier = raw.parse()?;
            println!(
                "{} {}  {}",
                paint.ok("✓"),
                paint.number(&identifier),
                paint.muted(describe(&identifier))
            );
        }

        if invalid > 0 {
            anyhow::bail!("{invalid} of {} identifiers are invalid", self.identifiers.len());
        }
        Ok(())
    }
}

/// Lists the addressed components, e.g. `LG 99 · ULG 10 · Grundtext 90 · FTNR A`.
fn describe(identifier: &Identifier) -> String {
    let mut parts = Vec::with_capacity(4);
    if let Some(lg) = identifier.lg() {
        parts.push(format!("LG {lg}"));
    }
    if let Some(ulg) = identifier.ulg() {
        parts.push(format!("ULG {ulg}"));
    }
    parts.push(format!("Grundtext {}", identifier.grundtextnr()));
    match identifier.variant() {
        Variant::FollowUp(letter) => parts.push(format!("FTNR {letter}")),
        Variant::Standalone | Variant::Undivided => parts.push("standalone".to_string()),
    }
    parts.join(" · ")
}

#[derive(Debug, Parser)]
#[command(about = "Compare identifiers component by component")]
pub struct Diff {
    /// The identifiers, in the order the item was retargeted
    #[arg(required = true, num_args = 2..)]
    identifiers: Vec<String>,

    /// Also print the identifier history
    #[arg(long)]
    history: bool,
}

impl Diff {
    #[instrument(level = "debug", skip(self, config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let paint = Paint::stdout();
        let mut detector = ChangeDetector::new(config);

        for raw in &self.identifiers {
            let previous = detector.current().map(ToString::to_string);
            let changes = detector.set_identifier(raw, true).map_err(|errors| {
                let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
                anyhow::anyhow!(reasons.join("; "))
            })?;

            let (Some(previous), Some(changes)) = (previous, changes) else {
                continue;
            };

            let analysis = changes.analyze();
            println!(
                "{} → {}  [{}] {}",
                paint.number(previous),
                paint.number(raw),
                paint.significance(analysis.significance),
                analysis.description
            );
            println!("    {}", paint.muted(changes.summary()));
        }

        if self.history {
            println!();
            println!("{}", paint.muted("History"));
            for entry in detector.history() {
                println!(
                    "  {}  {}",
                    paint.muted(entry.replaced_at.format("%Y-%m-%d %H:%M:%S")),
                    paint.number(&entry.identifier)
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("991090A", "LG 99 · ULG 10 · Grundtext 90 · FTNR A"; "six digits with letter")]
    #[test_case("9910", "LG 99 · Grundtext 10 · standalone"; "four digits")]
    #[test_case("07", "Grundtext 07 · standalone"; "two digits")]
    fn describes_components(raw: &str, expected: &str) {
        let identifier: Identifier = raw.parse().unwrap();
        assert_eq!(describe(&identifier), expected);
    }

    #[test]
    fn check_fails_on_invalid_identifier() {
        let check = Check {
            identifiers: vec!["9910".into(), "991".into()],
        };
        assert!(check.run().is_err());
    }

    #[test]
    fn diff_accepts_valid_sequence() {
        let diff = Diff {
            identifiers: vec!["991090".into(), "991091A".into(), "011091A".into()],
            history: true,
        };
        assert!(diff.run(&Config::default()).is_ok());
    }

    #[test]
    fn diff_rejects_invalid_identifier() {
        let diff = Diff {
            identifiers: vec!["991090".into(), "99109".into()],
            history: false,
        };
        assert!(diff.run(&Config::default()).is_err());
    }
}
