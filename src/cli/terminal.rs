//! Coloured terminal output

use std::fmt::Display;

use onlv::{domain::changes::Significance, flat::ItemKind};
use owo_colors::{OwoColorize, colors::css};

/// Styles text for stdout, or passes it through when stdout is not a colour
/// terminal.
#[derive(Debug, Clone, Copy)]
pub struct Paint {
    enabled: bool,
}

impl Paint {
    /// Detects colour support on stdout.
    pub fn stdout() -> Self {
        Self {
            enabled: supports_color::on(supports_color::Stream::Stdout).is_some(),
        }
    }

    fn apply<T: Display>(self, text: T, style: impl FnOnce(&T) -> String) -> String {
        if self.enabled {
            style(&text)
        } else {
            text.to_string()
        }
    }

    /// Accepted input (green).
    pub fn ok(self, text: impl Display) -> String {
        self.apply(text, |t| t.fg::<css::Green>().to_string())
    }

    /// Rejected input (amber).
    pub fn rejected(self, text: impl Display) -> String {
        self.apply(text, |t| t.fg::<css::Orange>().to_string())
    }

    /// Hierarchy numbers and ids (blue).
    pub fn number(self, text: impl Display) -> String {
        self.apply(text, |t| t.fg::<css::LightBlue>().to_string())
    }

    /// Secondary detail.
    pub fn muted(self, text: impl Display) -> String {
        self.apply(text, |t| t.dimmed().to_string())
    }

    /// A significance label, coloured by how much of the tree it affects.
    pub fn significance(self, significance: Significance) -> String {
        match significance {
            Significance::High => self.apply(significance, |t| t.fg::<css::Red>().bold().to_string()),
            Significance::Medium => self.rejected(significance),
            Significance::Low => self.number(significance),
            Significance::None => self.muted(significance),
        }
    }

    /// An item kind tag, padded for column alignment.
    pub fn kind(self, kind: ItemKind) -> String {
        let label = format!("{:<21}", kind.as_str());
        match kind {
            ItemKind::Lg | ItemKind::Ulg => self.apply(label, |t| t.bold().to_string()),
            ItemKind::Position => label,
            ItemKind::Svb
            | ItemKind::Vorbemerkung
            | ItemKind::GrundtextDesc
            | ItemKind::GrundtextStaticDesc => self.muted(label),
        }
    }
}
