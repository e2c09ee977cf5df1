use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

/// Digits, then optionally exactly one letter.
static PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)([a-zA-Z]?)$").expect("pattern is valid"));

/// The addressing variant of a position below a base text.
///
/// ONLV distinguishes lettered follow-up positions (`A`, `B`, ...) from the
/// single undivided position of a base text. Compact identifiers without a
/// letter address the base text itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    /// No letter: the base text as a whole.
    Standalone,
    /// A lettered Folgeposition.
    FollowUp(char),
    /// The Ungeteilteposition, written as `U` in position ids.
    Undivided,
}

impl Variant {
    /// The letter of a follow-up position, if this is one.
    #[must_use]
    pub const fn letter(self) -> Option<char> {
        match self {
            Self::FollowUp(letter) => Some(letter),
            Self::Standalone | Self::Undivided => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => Ok(()),
            Self::FollowUp(letter) => write!(f, "{letter}"),
            Self::Undivided => f.write_str("U"),
        }
    }
}

/// Reasons a string is not a valid compact identifier.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The input was empty.
    #[error("Identifier must be a non-empty string")]
    Empty,

    /// The input is not digits optionally followed by a single letter.
    #[error(
        "Invalid identifier format '{0}': expected digits optionally followed by a single letter"
    )]
    Syntax(String),

    /// An odd number of digits (1, 3 or 5) cannot be split into components.
    #[error("Invalid identifier '{identifier}': {count} digits cannot be split into 2-digit components")]
    OddDigitCount {
        /// The rejected input.
        identifier: String,
        /// Number of digits found.
        count: usize,
    },

    /// More than six digits.
    #[error("Invalid identifier '{identifier}': {count} digits is more than the maximum of 6")]
    TooManyDigits {
        /// The rejected input.
        identifier: String,
        /// Number of digits found.
        count: usize,
    },
}

/// The outcome of validating a candidate identifier.
///
/// Validation never fails; malformed input is described by the contained
/// errors instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    errors: Vec<ValidationError>,
}

impl Validation {
    /// Whether the identifier was accepted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable reasons for rejection. Empty when valid.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Consumes the validation, returning the errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

/// Validates a compact identifier.
///
/// Accepts 2, 4 or 6 digits optionally followed by a single letter.
///
/// ```
/// use onlv::domain::identifier::validate;
///
/// assert!(validate("991090A").is_valid());
/// assert!(!validate("991").is_valid());
/// ```
#[must_use]
pub fn validate(identifier: &str) -> Validation {
    let errors = split(identifier).err().into_iter().collect();
    Validation { errors }
}

/// Parses a compact identifier, logging a warning on failure.
///
/// This is the lenient counterpart of [`Identifier::from_str`] for callers
/// that only need to know whether an identifier could be read.
#[must_use]
pub fn parse(identifier: &str) -> Option<Identifier> {
    match identifier.parse() {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            tracing::warn!("Failed to parse identifier '{identifier}': {error}");
            None
        }
    }
}

/// Splits input into its digit run and optional letter, enforcing the digit
/// count rule.
fn split(identifier: &str) -> Result<(&str, Option<char>), ValidationError> {
    if identifier.is_empty() {
        return Err(ValidationError::Empty);
    }

    let captures = PATTERN
        .captures(identifier)
        .ok_or_else(|| ValidationError::Syntax(identifier.to_string()))?;

    let digits = captures.get(1).map_or("", |m| m.as_str());
    let letter = captures.get(2).and_then(|m| m.as_str().chars().next());

    match digits.len() {
        2 | 4 | 6 => Ok((digits, letter)),
        count if count > 6 => Err(ValidationError::TooManyDigits {
            identifier: identifier.to_string(),
            count,
        }),
        count => Err(ValidationError::OddDigitCount {
            identifier: identifier.to_string(),
            count,
        }),
    }
}

/// A compact position identifier.
///
/// Format: `{LG?}{ULG?}{GRUNDTEXTNR}{FTNR?}` where every numeric component is
/// two digits. The digit count selects the addressed levels:
/// - 2 digits: base-text number only
/// - 4 digits: LG + base-text number
/// - 6 digits: LG + ULG + base-text number
///
/// A trailing letter selects a Folgeposition.
///
/// Examples: `99`, `9910`, `991090A`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    lg: Option<String>,
    ulg: Option<String>,
    grundtextnr: String,
    ftnr: Option<char>,
    digit_count: usize,
}

impl Identifier {
    /// The main group number, if addressed.
    #[must_use]
    pub fn lg(&self) -> Option<&str> {
        self.lg.as_deref()
    }

    /// The sub-group suffix, if addressed.
    #[must_use]
    pub fn ulg(&self) -> Option<&str> {
        self.ulg.as_deref()
    }

    /// The base-text number.
    #[must_use]
    pub fn grundtextnr(&self) -> &str {
        &self.grundtextnr
    }

    /// The follow-up letter, if any.
    #[must_use]
    pub const fn ftnr(&self) -> Option<char> {
        self.ftnr
    }

    /// Number of digits in the identifier (2, 4 or 6).
    #[must_use]
    pub const fn digit_count(&self) -> usize {
        self.digit_count
    }

    /// Whether the identifier addresses a base text rather than one of its
    /// follow-up positions.
    #[must_use]
    pub const fn is_standalone(&self) -> bool {
        self.ftnr.is_none()
    }

    /// The addressing variant.
    #[must_use]
    pub const fn variant(&self) -> Variant {
        match self.ftnr {
            Some(letter) => Variant::FollowUp(letter),
            None => Variant::Standalone,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(lg) = &self.lg {
            f.write_str(lg)?;
        }
        if let Some(ulg) = &self.ulg {
            f.write_str(ulg)?;
        }
        write!(f, "{}{}", self.grundtextnr, self.variant())
    }
}

impl FromStr for Identifier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, ftnr) = split(s)?;

        // the digit run is ASCII, so byte slicing is safe
        let (lg, ulg, grundtextnr) = match digits.len() {
            2 => (None, None, digits),
            4 => (Some(&digits[..2]), None, &digits[2..]),
            _ => (Some(&digits[..2]), Some(&digits[2..4]), &digits[4..]),
        };

        Ok(Self {
            lg: lg.map(str::to_string),
            ulg: ulg.map(str::to_string),
            grundtextnr: grundtextnr.to_string(),
            ftnr,
            digit_count: digits.len(),
        })
    }
}

impl TryFrom<&str> for Identifier {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}
