use std::fmt;

use chrono::{DateTime, Utc};

use crate::domain::{
    Config,
    clock::{Clock, SystemClock},
    identifier::{Identifier, ValidationError, validate},
};

/// One addressable component of an [`Identifier`], ordered from the top of
/// the hierarchy down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    /// Main group.
    Lg,
    /// Sub-group.
    Ulg,
    /// Base-text number.
    Grundtextnr,
    /// Follow-up letter.
    Ftnr,
}

impl Component {
    /// All components in hierarchy order.
    pub const ALL: [Self; 4] = [Self::Lg, Self::Ulg, Self::Grundtextnr, Self::Ftnr];

    /// The label used in change summaries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lg => "LG",
            Self::Ulg => "ULG",
            Self::Grundtextnr => "Grundtextnummer",
            Self::Ftnr => "FTNR",
        }
    }

    fn value_of(self, identifier: &Identifier) -> Option<String> {
        match self {
            Self::Lg => identifier.lg().map(str::to_string),
            Self::Ulg => identifier.ulg().map(str::to_string),
            Self::Grundtextnr => Some(identifier.grundtextnr().to_string()),
            Self::Ftnr => identifier.ftnr().map(String::from),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The before/after values of a single component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentChange {
    /// Whether the value differs.
    pub changed: bool,
    /// The previous value. `None` when the component was absent.
    pub from: Option<String>,
    /// The new value. `None` when the component is absent.
    pub to: Option<String>,
}

impl ComponentChange {
    fn new(from: Option<String>, to: Option<String>) -> Self {
        Self {
            changed: from != to,
            from,
            to,
        }
    }
}

/// Component-wise comparison of two identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    lg: ComponentChange,
    ulg: ComponentChange,
    grundtextnr: ComponentChange,
    ftnr: ComponentChange,
}

impl ChangeSet {
    /// Compares two parsed identifiers.
    #[must_use]
    pub fn between(previous: &Identifier, current: &Identifier) -> Self {
        let change = |component: Component| {
            ComponentChange::new(component.value_of(previous), component.value_of(current))
        };

        Self {
            lg: change(Component::Lg),
            ulg: change(Component::Ulg),
            grundtextnr: change(Component::Grundtextnr),
            ftnr: change(Component::Ftnr),
        }
    }

    /// The change recorded for a component.
    #[must_use]
    pub const fn get(&self, component: Component) -> &ComponentChange {
        match component {
            Component::Lg => &self.lg,
            Component::Ulg => &self.ulg,
            Component::Grundtextnr => &self.grundtextnr,
            Component::Ftnr => &self.ftnr,
        }
    }

    /// Whether any component changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        Component::ALL.iter().any(|c| self.get(*c).changed)
    }

    /// The changed components, in hierarchy order.
    #[must_use]
    pub fn changed_components(&self) -> Vec<Component> {
        Component::ALL
            .into_iter()
            .filter(|c| self.get(*c).changed)
            .collect()
    }

    /// Classifies the change by its most significant component.
    ///
    /// Only the highest-priority change is reported: when both LG and ULG
    /// change, the result is [`ChangeKind::Lg`] and the ULG change is not
    /// surfaced separately.
    #[must_use]
    pub fn analyze(&self) -> ChangeAnalysis {
        let kind = if self.lg.changed {
            ChangeKind::Lg
        } else if self.ulg.changed {
            ChangeKind::Ulg
        } else if self.grundtextnr.changed || self.ftnr.changed {
            ChangeKind::Position
        } else {
            ChangeKind::None
        };

        ChangeAnalysis {
            kind,
            description: kind.description().to_string(),
            significance: kind.significance(),
        }
    }

    /// A sentence listing every changed component, e.g.
    /// `Grundtextnummer: 90 → 91, FTNR: none → A`.
    #[must_use]
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .changed_components()
            .into_iter()
            .map(|component| {
                let change = self.get(component);
                format!(
                    "{}: {} → {}",
                    component.label(),
                    change.from.as_deref().unwrap_or("none"),
                    change.to.as_deref().unwrap_or("none"),
                )
            })
            .collect();

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// The class of a change, by the highest hierarchy level it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The main group changed.
    Lg,
    /// The sub-group changed within the same main group.
    Ulg,
    /// Only the base-text number or follow-up letter changed.
    Position,
    /// Nothing changed.
    None,
}

impl ChangeKind {
    /// Machine-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lg => "lg_change",
            Self::Ulg => "ulg_change",
            Self::Position => "position_change",
            Self::None => "no_change",
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Lg => "Main group (LG) changed; the whole subtree moves to another LG",
            Self::Ulg => "Sub-group (ULG) changed within the same LG",
            Self::Position => "Base-text number or follow-up letter changed",
            Self::None => "No changes detected",
        }
    }

    const fn significance(self) -> Significance {
        match self {
            Self::Lg => Significance::High,
            Self::Ulg => Significance::Medium,
            Self::Position => Significance::Low,
            Self::None => Significance::None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of the placement a change invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Significance {
    /// Nothing changed.
    None,
    /// The item stays within its sub-group.
    Low,
    /// The item moves between sub-groups.
    Medium,
    /// The item moves between main groups.
    High,
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// The classification produced by [`ChangeSet::analyze`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeAnalysis {
    /// The highest-priority change.
    pub kind: ChangeKind,
    /// Human-readable description.
    pub description: String,
    /// Significance of the change.
    pub significance: Significance,
}

/// One or both identifiers passed to [`detect_changes`] were invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct InvalidIdentifiers {
    /// Reasons from both identifiers, previous first.
    pub errors: Vec<ValidationError>,
}

impl fmt::Display for InvalidIdentifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot compare identifiers: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Compares two identifier strings component by component.
///
/// # Errors
///
/// Returns [`InvalidIdentifiers`] carrying the validation errors of both
/// inputs if either fails to parse. No comparison is made in that case.
pub fn detect_changes(previous: &str, current: &str) -> Result<ChangeSet, InvalidIdentifiers> {
    match (previous.parse::<Identifier>(), current.parse::<Identifier>()) {
        (Ok(previous), Ok(current)) => Ok(ChangeSet::between(&previous, &current)),
        _ => {
            let mut errors = validate(previous).into_errors();
            errors.extend(validate(current).into_errors());
            tracing::warn!("Change detection skipped: {errors:?}");
            Err(InvalidIdentifiers { errors })
        }
    }
}

/// A previously current identifier and when it was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The identifier that was replaced.
    pub identifier: Identifier,
    /// When it was replaced.
    pub replaced_at: DateTime<Utc>,
}

/// Tracks the identifier of the item being edited and reports which
/// components changed whenever it is retargeted.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector<C = SystemClock> {
    current: Option<Identifier>,
    history: Vec<HistoryEntry>,
    history_limit: Option<usize>,
    clock: C,
}

impl ChangeDetector {
    /// Creates a detector using the wall clock and the given configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ChangeDetector<C> {
    /// Creates a detector with an explicit clock.
    #[must_use]
    pub fn with_clock(config: &Config, clock: C) -> Self {
        Self {
            current: None,
            history: Vec::new(),
            history_limit: config.history_limit(),
            clock,
        }
    }

    /// Adopts a new current identifier.
    ///
    /// When a previous identifier exists it is pushed onto the history, and
    /// if `detect` is set the component diff against it is returned.
    ///
    /// # Errors
    ///
    /// Returns the validation errors if `identifier` is malformed. The
    /// detector is left unchanged in that case.
    pub fn set_identifier(
        &mut self,
        identifier: &str,
        detect: bool,
    ) -> Result<Option<ChangeSet>, Vec<ValidationError>> {
        let next = identifier.parse::<Identifier>().map_err(|error| {
            tracing::warn!("Rejected identifier '{identifier}': {error}");
            vec![error]
        })?;

        let changes = match &self.current {
            Some(previous) if detect => Some(ChangeSet::between(previous, &next)),
            _ => None,
        };

        if let Some(previous) = self.current.replace(next) {
            self.history.push(HistoryEntry {
                identifier: previous,
                replaced_at: self.clock.now(),
            });
            if let Some(limit) = self.history_limit {
                let excess = self.history.len().saturating_sub(limit);
                self.history.drain(..excess);
            }
        }

        Ok(changes)
    }

    /// The current identifier.
    #[must_use]
    pub const fn current(&self) -> Option<&Identifier> {
        self.current.as_ref()
    }

    /// A copy of the history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.clone()
    }

    /// Forgets all replaced identifiers. The current identifier is kept.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
