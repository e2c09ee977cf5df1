use std::{fmt, str::FromStr};

use crate::domain::Variant;

const PREFIX: &str = "pos-ulg-";

/// The flat-item id of a position: `pos-ulg-{lg}.{ulg}-{grundtextnr}-{suffix}`.
///
/// The suffix is the Folgeposition letter, or `U` for the Ungeteilteposition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionAddress {
    lg: String,
    ulg: String,
    grundtextnr: String,
    variant: Variant,
}

/// Ways a position id can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The id does not start with `pos-ulg-`.
    #[error("position id '{0}' does not start with 'pos-ulg-'")]
    Prefix(String),

    /// The id does not have five dash-separated components.
    #[error("position id '{0}' must have the form 'pos-ulg-{{lg}}.{{ulg}}-{{grundtextnr}}-{{suffix}}'")]
    Shape(String),

    /// A hierarchy number is not two ASCII digits.
    #[error("position id '{id}': '{number}' is not a two-digit number")]
    Number {
        /// The rejected id.
        id: String,
        /// The offending component.
        number: String,
    },

    /// The suffix is not a single letter.
    #[error("position id '{id}': '{suffix}' is not a single letter")]
    Suffix {
        /// The rejected id.
        id: String,
        /// The offending suffix.
        suffix: String,
    },
}

/// Whether `nr` is exactly two ASCII digits.
pub(crate) fn is_two_digits(nr: &str) -> bool {
    nr.len() == 2 && nr.bytes().all(|b| b.is_ascii_digit())
}

impl PositionAddress {
    /// Creates the address of a position below the given base text.
    pub fn new(
        lg: impl Into<String>,
        ulg: impl Into<String>,
        grundtextnr: impl Into<String>,
        variant: Variant,
    ) -> Self {
        Self {
            lg: lg.into(),
            ulg: ulg.into(),
            grundtextnr: grundtextnr.into(),
            variant,
        }
    }

    /// The main group number.
    #[must_use]
    pub fn lg(&self) -> &str {
        &self.lg
    }

    /// The sub-group suffix.
    #[must_use]
    pub fn ulg(&self) -> &str {
        &self.ulg
    }

    /// The base-text number.
    #[must_use]
    pub fn grundtextnr(&self) -> &str {
        &self.grundtextnr
    }

    /// Which position of the base text is addressed.
    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    /// The compact identifier of the position, e.g. `010203A`.
    ///
    /// Undivided positions have no letter.
    #[must_use]
    pub fn compact(&self) -> String {
        let mut compact = format!("{}{}{}", self.lg, self.ulg, self.grundtextnr);
        if let Some(letter) = self.variant.letter() {
            compact.push(letter);
        }
        compact
    }
}

impl fmt::Display for PositionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PREFIX}{}.{}-{}-{}",
            self.lg, self.ulg, self.grundtextnr, self.variant
        )
    }
}

impl FromStr for PositionAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(PREFIX)
            .ok_or_else(|| AddressError::Prefix(s.to_string()))?;

        let shape = || AddressError::Shape(s.to_string());

        let parts: Vec<&str> = rest.split('-').collect();
        let &[ulg_full, grundtextnr, suffix] = parts.as_slice() else {
            return Err(shape());
        };
        let (lg, ulg) = ulg_full.split_once('.').ok_or_else(shape)?;

        for number in [lg, ulg, grundtextnr] {
            if !is_two_digits(number) {
                return Err(AddressError::Number {
                    id: s.to_string(),
                    number: number.to_string(),
                });
            }
        }

        let mut chars = suffix.chars();
        let variant = match (chars.next(), chars.next()) {
            (Some('U'), None) => Variant::Undivided,
            (Some(letter), None) if letter.is_ascii_alphabetic() => Variant::FollowUp(letter),
            _ => {
                return Err(AddressError::Suffix {
                    id: s.to_string(),
                    suffix: suffix.to_string(),
                });
            }
        };

        Ok(Self::new(lg, ulg, grundtextnr, variant))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("pos-ulg-01.02-03-A", Variant::FollowUp('A'); "follow-up")]
    #[test_case("pos-ulg-01.02-03-U", Variant::Undivided; "undivided")]
    #[test_case("pos-ulg-01.02-03-b", Variant::FollowUp('b'); "lowercase letter")]
    fn parses(id: &str, variant: Variant) {
        let address: PositionAddress = id.parse().unwrap();
        assert_eq!(address.lg(), "01");
        assert_eq!(address.ulg(), "02");
        assert_eq!(address.grundtextnr(), "03");
        assert_eq!(address.variant(), variant);
        assert_eq!(address.to_string(), id);
    }

    #[test_case("ulg-01.02-03-A"; "missing prefix")]
    #[test_case("pos-ulg-01.02-03"; "missing suffix")]
    #[test_case("pos-ulg-01-03-A"; "missing ulg")]
    #[test_case("pos-ulg-01.02-03-A-B"; "too many parts")]
    #[test_case("pos-ulg-1.02-03-A"; "short lg")]
    #[test_case("pos-ulg-01.02-3x-A"; "non-digit base text")]
    #[test_case("pos-ulg-01.02-03-AB"; "two letters")]
    #[test_case("pos-ulg-01.02-03-1"; "digit suffix")]
    #[test_case("pos-ulg-01.02-03-"; "empty suffix")]
    fn rejects_malformed_ids(id: &str) {
        assert!(id.parse::<PositionAddress>().is_err(), "{id}");
    }

    #[test]
    fn errors_name_the_problem() {
        assert_eq!(
            "pos-ulg-01.2-03-A".parse::<PositionAddress>().unwrap_err(),
            AddressError::Number {
                id: "pos-ulg-01.2-03-A".into(),
                number: "2".into()
            }
        );
        assert_eq!(
            "lg-01".parse::<PositionAddress>().unwrap_err(),
            AddressError::Prefix("lg-01".into())
        );
    }

    #[test]
    fn compact_form() {
        let follow_up = PositionAddress::new("01", "02", "03", Variant::FollowUp('C'));
        assert_eq!(follow_up.compact(), "010203C");

        let undivided = PositionAddress::new("01", "02", "03", Variant::Undivided);
        assert_eq!(undivided.compact(), "010203");
    }
}
