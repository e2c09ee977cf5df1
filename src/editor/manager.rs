//! Writes edits from the flat projection back into the nested tree.
//!
//! Every operation either works on a caller-owned document (`*_in_place`) or
//! clones the input and returns the edited copy. Failures are logged and
//! leave the tree untouched.

use std::fmt;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::address::{AddressError, PositionAddress, is_two_digits};
use crate::domain::{
    Clock, Config, SystemClock, Variant,
    document::{
        Document, GroupProperties, Grundtext, GrundtextBody, Lg, OneOrMany, Position,
        PositionProperties, Positionen, Quantity, Ulg, UlgListe,
    },
};

/// Maximum length of a position keyword, in characters.
pub const MAX_STICHWORT_LEN: usize = 60;

/// An edited position, as submitted from the flat list.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    /// The position's flat-item id.
    pub id: String,
    /// New keyword. `None` keeps the current one.
    pub stichwort: Option<String>,
    /// New long text. `None` keeps the current one.
    pub langtext: Option<Value>,
    /// New unit, if changed.
    pub einheit: Option<String>,
    /// New quantity, if changed. Numeric text is stored as a number.
    pub lvmenge: Option<Quantity>,
    /// New long text for the enclosing base text, if changed.
    pub grundtext: Option<Value>,
}

/// A new LG or ULG.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewGroup {
    /// Two-digit number.
    pub nr: String,
    /// Title.
    pub ueberschrift: Option<String>,
    /// Preliminary remark.
    pub vorbemerkung: Option<Value>,
    /// Origin flag. Defaults to the configured flag.
    pub herkunftskennzeichen: Option<String>,
}

/// A new Folgeposition or Ungeteilteposition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPosition {
    /// Requested letter. The next free letter is used when absent; ignored
    /// for undivided positions.
    pub ftnr: Option<char>,
    /// Keyword, at most [`MAX_STICHWORT_LEN`] characters.
    pub stichwort: String,
    /// Long text.
    pub langtext: Option<Value>,
    /// Unit.
    pub einheit: Option<String>,
    /// Quantity. Numeric text is stored as a number.
    pub lvmenge: Option<Quantity>,
    /// Origin flag. Defaults to the configured flag.
    pub herkunftskennzeichen: Option<String>,
}

/// A new base-text slot together with its first position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewGrundtext {
    /// Two-digit number.
    pub nr: String,
    /// Shared long description.
    pub langtext: Option<Value>,
    /// The first position.
    pub position: NewPosition,
    /// Whether the first position is the Ungeteilteposition.
    pub undivided: bool,
}

/// The addressing context the caller should prompt for after an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// A new LG needs its first ULG.
    Ulg {
        /// The new LG.
        lg: String,
    },
    /// A new ULG needs its first base text.
    Grundtext {
        /// The enclosing LG.
        lg: String,
        /// The new ULG.
        ulg: String,
    },
}

/// The result of a successful insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    /// The edited copy of the document.
    pub document: Document,
    /// The flat-item id of the inserted node.
    pub id: String,
    /// What the caller may want to insert next.
    pub next: Option<NextStep>,
}

/// A hierarchy level, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Main group.
    Lg,
    /// Sub-group.
    Ulg,
    /// Base-text slot.
    Grundtext,
    /// Lettered position.
    Folgeposition,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lg => "LG",
            Self::Ulg => "ULG",
            Self::Grundtext => "base text",
            Self::Folgeposition => "Folgeposition",
        })
    }
}

/// A well-formed address that does not resolve to a node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No LG with this number.
    #[error("LG '{0}' not found")]
    Lg(String),

    /// No ULG with this suffix in the LG.
    #[error("ULG '{lg}.{ulg}' not found")]
    Ulg {
        /// The LG searched.
        lg: String,
        /// The missing suffix.
        ulg: String,
    },

    /// No base text with this number in the ULG.
    #[error("base text '{0}' not found")]
    Grundtext(String),

    /// The base text has no position with this suffix.
    #[error("position '{0}' not found")]
    Position(String),
}

/// Reasons a position update was not applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    /// The id is not a position id.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// The keyword is too long.
    #[error("keyword has {0} characters, more than the maximum of 60")]
    StichwortTooLong(usize),

    /// The addressed position does not exist.
    #[error(transparent)]
    NotFound(#[from] LookupError),
}

/// Reasons an insertion was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    /// The new number is not two digits.
    #[error("invalid {level} number '{nr}': expected two digits")]
    InvalidNumber {
        /// Level of the new node.
        level: Level,
        /// The rejected number.
        nr: String,
    },

    /// A sibling with the same number or letter exists.
    #[error("{level} '{nr}' already exists")]
    Duplicate {
        /// Level of the new node.
        level: Level,
        /// The clashing number.
        nr: String,
    },

    /// The requested letter cannot name a Folgeposition.
    #[error("invalid Folgeposition letter '{0}': expected an uppercase letter other than 'U'")]
    InvalidLetter(char),

    /// Every letter from the configured default onwards is taken.
    #[error("base text '{0}' has no free Folgeposition letter")]
    LettersExhausted(String),

    /// The base text holds an Ungeteilteposition, which excludes Folgepositionen.
    #[error("base text '{0}' holds an Ungeteilteposition")]
    Undivided(String),

    /// The keyword is too long.
    #[error("keyword has {0} characters, more than the maximum of 60")]
    StichwortTooLong(usize),

    /// The parent node does not exist.
    #[error(transparent)]
    NotFound(#[from] LookupError),
}

fn ulg_mut<'d>(
    document: &'d mut Document,
    lg: &str,
    ulg: &str,
) -> Result<&'d mut Ulg, LookupError> {
    document
        .find_lg_mut(lg)
        .ok_or_else(|| LookupError::Lg(lg.to_string()))?
        .find_ulg_mut(ulg)
        .ok_or_else(|| LookupError::Ulg {
            lg: lg.to_string(),
            ulg: ulg.to_string(),
        })
}

fn grundtext_mut<'d>(
    document: &'d mut Document,
    lg: &str,
    ulg: &str,
    grundtextnr: &str,
) -> Result<&'d mut Grundtext, LookupError> {
    ulg_mut(document, lg, ulg)?
        .find_grundtext_mut(grundtextnr)
        .ok_or_else(|| LookupError::Grundtext(format!("{lg}{ulg}{grundtextnr}")))
}

fn check_number(level: Level, nr: &str) -> Result<(), InsertError> {
    if is_two_digits(nr) {
        Ok(())
    } else {
        Err(InsertError::InvalidNumber {
            level,
            nr: nr.to_string(),
        })
    }
}

fn logged(result: Result<Insertion, InsertError>) -> Result<Insertion, InsertError> {
    match &result {
        Ok(insertion) => debug!(id = %insertion.id, "inserted node"),
        Err(error) => warn!("Failed to insert node: {error}"),
    }
    result
}

fn check_stichwort(stichwort: &str) -> Result<(), usize> {
    let len = stichwort.chars().count();
    if len > MAX_STICHWORT_LEN {
        Err(len)
    } else {
        Ok(())
    }
}

/// Locates positions by address and applies edits and insertions.
#[derive(Debug, Clone)]
pub struct PositionManager<C = SystemClock> {
    config: Config,
    clock: C,
}

impl PositionManager {
    /// Creates a manager that timestamps edits with the wall clock.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> PositionManager<C> {
    /// Creates a manager that timestamps edits with the given clock.
    pub const fn with_clock(config: Config, clock: C) -> Self {
        Self { config, clock }
    }

    /// The clock used for edit timestamps.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// A new document without any LG, stamped with the current time.
    #[must_use]
    pub fn new_document(&self) -> Document {
        Document::empty(self.clock.now())
    }

    /// Applies `update` to the position it addresses.
    ///
    /// Returns `false`, logging a warning, if the id is malformed, the keyword
    /// is too long, or the position does not exist. The document is left
    /// untouched in that case.
    #[instrument(skip_all, fields(id = %update.id))]
    pub fn update_in_place(&self, document: &mut Document, update: &PositionUpdate) -> bool {
        match self.try_update_in_place(document, update) {
            Ok(()) => {
                debug!("updated position");
                true
            }
            Err(error) => {
                warn!("Failed to update position '{}': {error}", update.id);
                false
            }
        }
    }

    /// Like [`update_in_place`](Self::update_in_place), but reports why the
    /// update was rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is malformed, the keyword is too long, or
    /// the position does not exist.
    pub fn try_update_in_place(
        &self,
        document: &mut Document,
        update: &PositionUpdate,
    ) -> Result<(), UpdateError> {
        let address: PositionAddress = update.id.parse()?;
        if let Some(stichwort) = &update.stichwort {
            check_stichwort(stichwort).map_err(UpdateError::StichwortTooLong)?;
        }

        let grundtext = grundtext_mut(
            document,
            address.lg(),
            address.ulg(),
            address.grundtextnr(),
        )?;

        let position = match address.variant() {
            Variant::Undivided => grundtext.ungeteilteposition.as_mut(),
            Variant::FollowUp(letter) => grundtext.folgeposition_mut(letter),
            Variant::Standalone => None,
        }
        .ok_or_else(|| LookupError::Position(update.id.clone()))?;

        let properties = &mut position.pos_eigenschaften;
        if let Some(stichwort) = &update.stichwort {
            properties.stichwort = Some(stichwort.clone());
        }
        if let Some(langtext) = &update.langtext {
            properties.langtext = Some(langtext.clone());
        }
        if let Some(einheit) = &update.einheit {
            properties.einheit = Some(einheit.clone());
        }
        if let Some(lvmenge) = &update.lvmenge {
            properties.lvmenge = Some(lvmenge.clone().coerced());
        }

        if let Some(langtext) = &update.grundtext {
            grundtext.set_langtext(langtext.clone());
        }

        Ok(())
    }

    /// Returns an updated, timestamped copy of `document`, or `None` if the
    /// update could not be applied.
    #[must_use]
    pub fn update(&self, document: &Document, update: &PositionUpdate) -> Option<Document> {
        let mut updated = document.clone();
        if !self.update_in_place(&mut updated, update) {
            return None;
        }
        updated.touch(self.clock.now());
        Some(updated)
    }

    /// Appends a new LG.
    ///
    /// # Errors
    ///
    /// Returns an error if the number is not two digits or already in use.
    #[instrument(skip_all, fields(lg = %group.nr))]
    pub fn insert_lg(
        &self,
        document: &Document,
        group: &NewGroup,
    ) -> Result<Insertion, InsertError> {
        logged(self.add_lg(document, group))
    }

    /// Appends a new ULG to an existing LG.
    ///
    /// # Errors
    ///
    /// Returns an error if the LG does not exist, or the number is not two
    /// digits or already in use.
    #[instrument(skip_all, fields(lg = %lg, ulg = %group.nr))]
    pub fn insert_ulg(
        &self,
        document: &Document,
        lg: &str,
        group: &NewGroup,
    ) -> Result<Insertion, InsertError> {
        logged(self.add_ulg(document, lg, group))
    }

    /// Appends a new base-text slot with its first position to an existing
    /// ULG.
    ///
    /// # Errors
    ///
    /// Returns an error if the ULG does not exist, the number is not two
    /// digits or already in use, or the position is invalid.
    #[instrument(skip_all, fields(lg = %lg, ulg = %ulg, grundtext = %new.nr))]
    pub fn insert_grundtext(
        &self,
        document: &Document,
        lg: &str,
        ulg: &str,
        new: &NewGrundtext,
    ) -> Result<Insertion, InsertError> {
        logged(self.add_grundtext(document, lg, ulg, new))
    }

    /// Appends a new Folgeposition to an existing base text.
    ///
    /// # Errors
    ///
    /// Returns an error if the base text does not exist or holds an
    /// Ungeteilteposition, or if the letter is invalid or taken.
    #[instrument(skip_all, fields(lg = %lg, ulg = %ulg, grundtext = %grundtext))]
    pub fn insert_folgeposition(
        &self,
        document: &Document,
        lg: &str,
        ulg: &str,
        grundtext: &str,
        new: &NewPosition,
    ) -> Result<Insertion, InsertError> {
        logged(self.add_folgeposition(document, lg, ulg, grundtext, new))
    }

    fn finish(&self, mut document: Document, id: String, next: Option<NextStep>) -> Insertion {
        document.touch(self.clock.now());
        Insertion { document, id, next }
    }

    fn properties(&self, group: &NewGroup) -> GroupProperties {
        GroupProperties {
            ueberschrift: group.ueberschrift.clone(),
            vorbemerkung: group.vorbemerkung.clone(),
            herkunftskennzeichen: Some(self.origin(group.herkunftskennzeichen.as_ref())),
            extra: Map::new(),
        }
    }

    fn origin(&self, given: Option<&String>) -> String {
        given.map_or_else(|| self.config.origin_flag().to_string(), Clone::clone)
    }

    fn position(&self, new: &NewPosition, letter: Option<char>) -> Result<Position, InsertError> {
        check_stichwort(&new.stichwort).map_err(InsertError::StichwortTooLong)?;

        Ok(Position {
            pos_eigenschaften: PositionProperties {
                stichwort: Some(new.stichwort.clone()),
                langtext: new.langtext.clone(),
                einheit: new.einheit.clone(),
                lvmenge: new.lvmenge.clone().map(Quantity::coerced),
                herkunftskennzeichen: Some(self.origin(new.herkunftskennzeichen.as_ref())),
                leistungsteil: None,
                extra: Map::new(),
            },
            ftnr: letter.map(String::from),
            extra: Map::new(),
        })
    }

    /// Picks the letter for a new Folgeposition.
    fn letter(
        &self,
        requested: Option<char>,
        used: &[char],
        slot: &str,
    ) -> Result<char, InsertError> {
        match requested {
            Some(letter) if !letter.is_ascii_uppercase() || letter == 'U' => {
                Err(InsertError::InvalidLetter(letter))
            }
            Some(letter) if used.contains(&letter) => Err(InsertError::Duplicate {
                level: Level::Folgeposition,
                nr: format!("{slot}{letter}"),
            }),
            Some(letter) => Ok(letter),
            None => (self.config.default_ftnr()..='Z')
                .find(|letter| *letter != 'U' && !used.contains(letter))
                .ok_or_else(|| InsertError::LettersExhausted(slot.to_string())),
        }
    }

    fn add_lg(&self, document: &Document, group: &NewGroup) -> Result<Insertion, InsertError> {
        check_number(Level::Lg, &group.nr)?;
        if document.lgs().iter().any(|lg| lg.nr() == Some(group.nr.as_str())) {
            return Err(InsertError::Duplicate {
                level: Level::Lg,
                nr: group.nr.clone(),
            });
        }

        let mut updated = document.clone();
        updated.lgs_mut().push(Lg {
            lg_eigenschaften: self.properties(group),
            ulg_liste: Some(UlgListe::default()),
            nr: Some(group.nr.clone()),
            extra: Map::new(),
        });

        Ok(self.finish(
            updated,
            format!("lg-{}", group.nr),
            Some(NextStep::Ulg {
                lg: group.nr.clone(),
            }),
        ))
    }

    fn add_ulg(
        &self,
        document: &Document,
        lg: &str,
        group: &NewGroup,
    ) -> Result<Insertion, InsertError> {
        check_number(Level::Ulg, &group.nr)?;

        let mut updated = document.clone();
        let parent = updated
            .find_lg_mut(lg)
            .ok_or_else(|| LookupError::Lg(lg.to_string()))?;
        if parent.ulgs().iter().any(|ulg| ulg.nr() == Some(group.nr.as_str())) {
            return Err(InsertError::Duplicate {
                level: Level::Ulg,
                nr: format!("{lg}.{}", group.nr),
            });
        }

        parent.ulgs_mut().push(Ulg {
            ulg_eigenschaften: self.properties(group),
            positionen: Some(Positionen::default()),
            nr: Some(group.nr.clone()),
            extra: Map::new(),
        });

        Ok(self.finish(
            updated,
            format!("ulg-{lg}.{}", group.nr),
            Some(NextStep::Grundtext {
                lg: lg.to_string(),
                ulg: group.nr.clone(),
            }),
        ))
    }

    fn add_grundtext(
        &self,
        document: &Document,
        lg: &str,
        ulg: &str,
        new: &NewGrundtext,
    ) -> Result<Insertion, InsertError> {
        check_number(Level::Grundtext, &new.nr)?;

        let mut updated = document.clone();
        let parent = ulg_mut(&mut updated, lg, ulg)?;
        if parent.grundtexte().iter().any(|gt| gt.nr() == Some(new.nr.as_str())) {
            return Err(InsertError::Duplicate {
                level: Level::Grundtext,
                nr: format!("{lg}{ulg}{}", new.nr),
            });
        }

        let (variant, ungeteilteposition, folgeposition) = if new.undivided {
            let position = self.position(&new.position, None)?;
            (Variant::Undivided, Some(position), OneOrMany::default())
        } else {
            let slot = format!("{lg}{ulg}{}", new.nr);
            let letter = self.letter(new.position.ftnr, &[], &slot)?;
            let position = self.position(&new.position, Some(letter))?;
            (Variant::FollowUp(letter), None, vec![position].into())
        };

        parent.grundtexte_mut().push(Grundtext {
            grundtext: new.langtext.clone().map(|langtext| GrundtextBody {
                langtext: Some(langtext),
                extra: Map::new(),
            }),
            ungeteilteposition,
            folgeposition,
            nr: Some(new.nr.clone()),
            extra: Map::new(),
        });

        let address = PositionAddress::new(lg, ulg, new.nr.as_str(), variant);
        Ok(self.finish(updated, address.to_string(), None))
    }

    fn add_folgeposition(
        &self,
        document: &Document,
        lg: &str,
        ulg: &str,
        grundtextnr: &str,
        new: &NewPosition,
    ) -> Result<Insertion, InsertError> {
        let slot = format!("{lg}{ulg}{grundtextnr}");

        let mut updated = document.clone();
        let grundtext = grundtext_mut(&mut updated, lg, ulg, grundtextnr)?;
        if grundtext.ungeteilteposition.is_some() {
            return Err(InsertError::Undivided(slot));
        }

        let used: Vec<char> = grundtext.letters().collect();
        let letter = self.letter(new.ftnr, &used, &slot)?;
        let position = self.position(new, Some(letter))?;
        grundtext.folgeposition.push(position);

        let address = PositionAddress::new(lg, ulg, grundtextnr, Variant::FollowUp(letter));
        Ok(self.finish(updated, address.to_string(), None))
    }
}
