//! The ONLV document tree.
//!
//! Mirrors the JSON produced from ONLV XML exports: attributes are prefixed
//! with `@_`, and any level holding exactly one child may store it as a bare
//! object instead of a one-element list. That ambiguity is resolved once, at
//! deserialization, by [`OneOrMany`].
//!
//! Keys this model does not name are kept in each node's `extra` map, so a
//! load, edit, save cycle preserves them.

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{DeserializeOwned, Error as _},
};
use serde_json::{Map, Number, Value, json};

/// File name recorded in documents created from scratch.
pub const DEFAULT_FILE_NAME: &str = "Generated Onlv";

/// A list that may be stored as a bare object when it has a single entry.
///
/// Always deserializes to a list and always serializes as a JSON array.
/// `null` and blank text count as no entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOrMany<T>(Vec<T>);

impl<T> OneOrMany<T> {
    /// Whether the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Deref for OneOrMany<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for OneOrMany<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

/// A node that appears in lists, named by its key in deserialization errors.
pub trait Element: DeserializeOwned {
    /// The JSON key holding the node or the list of nodes.
    const KEY: &'static str;
}

impl<'de, T: Element> Deserialize<'de> for OneOrMany<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = match Value::deserialize(deserializer)? {
            Value::Array(entries) => entries,
            entry => vec![entry],
        };

        entries
            .into_iter()
            .filter(|entry| !is_blank(entry))
            .map(|entry| {
                if !entry.is_object() {
                    return Err(D::Error::custom(format_args!(
                        "`{}`: expected an object, found {}",
                        T::KEY,
                        kind(&entry)
                    )));
                }
                serde_json::from_value(entry)
                    .map_err(|e| D::Error::custom(format_args!("`{}`: {e}", T::KEY)))
            })
            .collect::<Result<Vec<T>, _>>()
            .map(Self)
    }
}

impl<T: Serialize> Serialize for OneOrMany<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Reads an `@_nr` attribute, which exports write either as a string or as
/// an integer. Integers are rendered with two digits.
fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Integer(n) => format!("{n:02}"),
    }))
}

/// Reads a text element. Converters write numeric text as a number, and an
/// element with attributes as an object carrying `#text`.
fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Object(map) => match map.get("#text") {
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            _ => Err(D::Error::custom("expected text, found an object")),
        },
        Value::Array(_) => Err(D::Error::custom("expected text, found a list")),
    }
}

/// Reads a container element. Converters write empty elements as `""`, so
/// anything but an object counts as absent.
fn element<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value)
            .map(Some)
            .map_err(D::Error::custom),
        _ => Ok(None),
    }
}

/// Like [`element`], for property blocks that default when absent.
fn properties<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    element(deserializer).map(Option::unwrap_or_default)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// A non-empty hierarchy number.
fn non_empty(nr: Option<&String>) -> Option<&str> {
    nr.map(String::as_str).filter(|nr| !nr.is_empty())
}

/// Rich text that is present, i.e. neither missing nor `null`.
fn present(text: Option<&Value>) -> Option<&Value> {
    text.filter(|value| !value.is_null())
}

/// A complete ONLV document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The document root.
    pub onlv: Onlv,
}

/// The `onlv` root element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Onlv {
    /// File-level metadata.
    #[serde(
        default,
        deserialize_with = "element",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadaten: Option<Metadaten>,

    /// The tender bill of quantities.
    #[serde(
        rename = "ausschreibungs-lv",
        default,
        deserialize_with = "element",
        skip_serializing_if = "Option::is_none"
    )]
    pub ausschreibungs_lv: Option<AusschreibungsLv>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// File-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadaten {
    /// Creation timestamp, refreshed on every edit.
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub erstelltam: Option<String>,

    /// Original file name.
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub dateiname: Option<String>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The tender bill of quantities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AusschreibungsLv {
    /// Project key data (code, title, client).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kenndaten: Option<Value>,

    /// The LG hierarchy.
    #[serde(
        rename = "gliederung-lg",
        default,
        deserialize_with = "element",
        skip_serializing_if = "Option::is_none"
    )]
    pub gliederung_lg: Option<GliederungLg>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The LG hierarchy together with the document-wide standing remarks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GliederungLg {
    /// Document-level preliminary remark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vorbemerkung: Option<Value>,

    /// Document-level base text.
    #[serde(
        default,
        deserialize_with = "element",
        skip_serializing_if = "Option::is_none"
    )]
    pub grundtext: Option<GrundtextBody>,

    /// The main groups.
    #[serde(
        rename = "lg-liste",
        default,
        deserialize_with = "element",
        skip_serializing_if = "Option::is_none"
    )]
    pub lg_liste: Option<LgListe>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Container of main groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LgListe {
    /// The main groups, in document order.
    #[serde(default)]
    pub lg: OneOrMany<Lg>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Heading properties shared by LG and ULG.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupProperties {
    /// Title.
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub ueberschrift: Option<String>,

    /// Preliminary remark for the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vorbemerkung: Option<Value>,

    /// Origin flag.
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub herkunftskennzeichen: Option<String>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A main group (Leistungsgruppe).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lg {
    /// Heading properties.
    #[serde(rename = "lg-eigenschaften", default, deserialize_with = "properties")]
    pub lg_eigenschaften: GroupProperties,

    /// The sub-groups.
    #[serde(
        rename = "ulg-liste",
        default,
        deserialize_with = "element",
        skip_serializing_if = "Option::is_none"
    )]
    pub ulg_liste: Option<UlgListe>,

    /// Two-digit number.
    #[serde(
        rename = "@_nr",
        default,
        deserialize_with = "number",
        skip_serializing_if = "Option::is_none"
    )]
    pub nr: Option<String>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element for Lg {
    const KEY: &'static str = "lg";
}

impl Lg {
    /// The number, if present and non-empty.
    #[must_use]
    pub fn nr(&self) -> Option<&str> {
        non_empty(self.nr.as_ref())
    }

    /// The preliminary remark, if present.
    #[must_use]
    pub fn vorbemerkung(&self) -> Option<&Value> {
        present(self.lg_eigenschaften.vorbemerkung.as_ref())
    }

    /// The sub-groups, in document order.
    #[must_use]
    pub fn ulgs(&self) -> &[Ulg] {
        self.ulg_liste.as_ref().map_or(&[][..], |list| list.ulg.as_slice())
    }

    /// The sub-group list, created if missing.
    pub fn ulgs_mut(&mut self) -> &mut OneOrMany<Ulg> {
        &mut self.ulg_liste.get_or_insert_with(UlgListe::default).ulg
    }

    /// Finds a sub-group by its two-digit suffix.
    #[must_use]
    pub fn find_ulg_mut(&mut self, nr: &str) -> Option<&mut Ulg> {
        self.ulg_liste
            .as_mut()?
            .ulg
            .iter_mut()
            .find(|ulg| ulg.nr() == Some(nr))
    }
}

/// Container of sub-groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UlgListe {
    /// The sub-groups, in document order.
    #[serde(default)]
    pub ulg: OneOrMany<Ulg>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A sub-group (Unterleistungsgruppe).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ulg {
    /// Heading properties.
    #[serde(rename = "ulg-eigenschaften", default, deserialize_with = "properties")]
    pub ulg_eigenschaften: GroupProperties,

    /// The base-text slots.
    #[serde(
        default,
        deserialize_with = "element",
        skip_serializing_if = "Option::is_none"
    )]
    pub positionen: Option<Positionen>,

    /// Two-digit suffix.
    #[serde(
        rename = "@_nr",
        default,
        deserialize_with = "number",
        skip_serializing_if = "Option::is_none"
    )]
    pub nr: Option<String>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element for Ulg {
    const KEY: &'static str = "ulg";
}

impl Ulg {
    /// The suffix, if present and non-empty.
    #[must_use]
    pub fn nr(&self) -> Option<&str> {
        non_empty(self.nr.as_ref())
    }

    /// The preliminary remark, if present.
    #[must_use]
    pub fn vorbemerkung(&self) -> Option<&Value> {
        present(self.ulg_eigenschaften.vorbemerkung.as_ref())
    }

    /// The base-text slots, in document order.
    #[must_use]
    pub fn grundtexte(&self) -> &[Grundtext] {
        self.positionen.as_ref().map_or(&[][..], |p| p.grundtextnr.as_slice())
    }

    /// The base-text slot list, created if missing.
    pub fn grundtexte_mut(&mut self) -> &mut OneOrMany<Grundtext> {
        &mut self.positionen.get_or_insert_with(Positionen::default).grundtextnr
    }

    /// Finds a base-text slot by number.
    #[must_use]
    pub fn find_grundtext_mut(&mut self, nr: &str) -> Option<&mut Grundtext> {
        self.positionen
            .as_mut()?
            .grundtextnr
            .iter_mut()
            .find(|gt| gt.nr() == Some(nr))
    }
}

/// Container of base-text slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Positionen {
    /// The base-text slots, in document order.
    #[serde(default)]
    pub grundtextnr: OneOrMany<Grundtext>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A base-text slot with its position variants.
///
/// Lettered Folgepositionen and the Ungeteilteposition are separate
/// addressing spaces; a slot normally uses only one of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grundtext {
    /// Shared description of the variants.
    #[serde(
        default,
        deserialize_with = "element",
        skip_serializing_if = "Option::is_none"
    )]
    pub grundtext: Option<GrundtextBody>,

    /// The undivided position.
    #[serde(
        default,
        deserialize_with = "element",
        skip_serializing_if = "Option::is_none"
    )]
    pub ungeteilteposition: Option<Position>,

    /// The lettered variants.
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub folgeposition: OneOrMany<Position>,

    /// Two-digit number.
    #[serde(
        rename = "@_nr",
        default,
        deserialize_with = "number",
        skip_serializing_if = "Option::is_none"
    )]
    pub nr: Option<String>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element for Grundtext {
    const KEY: &'static str = "grundtextnr";
}

impl Grundtext {
    /// The number, if present and non-empty.
    #[must_use]
    pub fn nr(&self) -> Option<&str> {
        non_empty(self.nr.as_ref())
    }

    /// The shared long description, if present.
    #[must_use]
    pub fn langtext(&self) -> Option<&Value> {
        present(self.grundtext.as_ref()?.langtext.as_ref())
    }

    /// Replaces the shared long description.
    pub fn set_langtext(&mut self, langtext: Value) {
        self.grundtext
            .get_or_insert_with(GrundtextBody::default)
            .langtext = Some(langtext);
    }

    /// Finds a Folgeposition by letter.
    #[must_use]
    pub fn folgeposition_mut(&mut self, letter: char) -> Option<&mut Position> {
        self.folgeposition
            .iter_mut()
            .find(|position| position.letter() == Some(letter))
    }

    /// The letters already used by Folgepositionen.
    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.folgeposition.iter().filter_map(Position::letter)
    }
}

/// A block carrying a long text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrundtextBody {
    /// The long description (rich text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub langtext: Option<Value>,

    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GrundtextBody {
    /// The long description, if present.
    #[must_use]
    pub fn langtext(&self) -> Option<&Value> {
        present(self.langtext.as_ref())
    }
}

/// A Folgeposition or Ungeteilteposition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// The position's properties.
    #[serde(rename = "pos-eigenschaften", default, deserialize_with = "properties")]
    pub pos_eigenschaften: PositionProperties,

    /// Follow-up letter. Absent on undivided positions.
    #[serde(
        rename = "@_ftnr",
        default,
        deserialize_with = "text",
        skip_serializing_if = "Option::is_none"
    )]
    pub ftnr: Option<String>,

    /// Unmodelled keys, including `@_mfv`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element for Position {
    const KEY: &'static str = "folgeposition";
}

impl Position {
    /// The follow-up letter, if it is a single ASCII letter.
    #[must_use]
    pub fn letter(&self) -> Option<char> {
        let ftnr = self.ftnr.as_deref()?;
        let mut chars = ftnr.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) if letter.is_ascii_alphabetic() => Some(letter),
            _ => None,
        }
    }
}

/// Properties of a position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionProperties {
    /// Short keyword, at most 60 characters.
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub stichwort: Option<String>,

    /// Long description (rich text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub langtext: Option<Value>,

    /// Unit of measure.
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub einheit: Option<String>,

    /// Quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lvmenge: Option<Quantity>,

    /// Origin flag.
    #[serde(default, deserialize_with = "text", skip_serializing_if = "Option::is_none")]
    pub herkunftskennzeichen: Option<String>,

    /// Service-part tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leistungsteil: Option<Value>,

    /// Unmodelled keys, including the optional billing flags.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A position quantity: a number, or free text such as "not applicable".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    /// A numeric quantity. Integer and decimal forms are preserved.
    Number(Number),
    /// Anything that is not a number, including the empty string.
    Text(String),
}

impl Quantity {
    /// Converts text that reads as a finite number into a number.
    ///
    /// Other text, including the empty string, is kept as given.
    #[must_use]
    pub fn coerced(self) -> Self {
        match self {
            Self::Text(text) => parse_number(&text).map_or(Self::Text(text), Self::Number),
            number @ Self::Number(_) => number,
        }
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<u64>() {
        return Some(n.into());
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(n.into());
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

impl From<&str> for Quantity {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl Document {
    /// A document without any LG, created at `now`.
    ///
    /// Carries the metadata a fresh export has: creation time, a default file
    /// name, and today's date as price basis and revision date.
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        let date = now.format("%Y-%m-%d").to_string();
        let mut document = Self {
            onlv: Onlv {
                metadaten: Some(Metadaten {
                    dateiname: Some(DEFAULT_FILE_NAME.to_string()),
                    ..Metadaten::default()
                }),
                ausschreibungs_lv: Some(AusschreibungsLv {
                    kenndaten: Some(json!({
                        "preisbasis": date,
                        "bearbeitungsstand": date,
                    })),
                    gliederung_lg: Some(GliederungLg {
                        lg_liste: Some(LgListe::default()),
                        ..GliederungLg::default()
                    }),
                    extra: Map::new(),
                }),
                extra: Map::new(),
            },
        };
        document.touch(now);
        document
    }

    /// The main groups, in document order.
    #[must_use]
    pub fn lgs(&self) -> &[Lg] {
        self.onlv
            .ausschreibungs_lv
            .as_ref()
            .and_then(|lv| lv.gliederung_lg.as_ref())
            .and_then(|gliederung| gliederung.lg_liste.as_ref())
            .map_or(&[][..], |list| list.lg.as_slice())
    }

    /// The main group list, created along with its containers if missing.
    pub fn lgs_mut(&mut self) -> &mut OneOrMany<Lg> {
        &mut self
            .onlv
            .ausschreibungs_lv
            .get_or_insert_with(AusschreibungsLv::default)
            .gliederung_lg
            .get_or_insert_with(GliederungLg::default)
            .lg_liste
            .get_or_insert_with(LgListe::default)
            .lg
    }

    /// Finds a main group by number.
    #[must_use]
    pub fn find_lg_mut(&mut self, nr: &str) -> Option<&mut Lg> {
        self.onlv
            .ausschreibungs_lv
            .as_mut()?
            .gliederung_lg
            .as_mut()?
            .lg_liste
            .as_mut()?
            .lg
            .iter_mut()
            .find(|lg| lg.nr() == Some(nr))
    }

    /// The document-level preliminary remark and base text, if present.
    #[must_use]
    pub fn standing_remarks(&self) -> (Option<&Value>, Option<&Value>) {
        let Some(gliederung) = self
            .onlv
            .ausschreibungs_lv
            .as_ref()
            .and_then(|lv| lv.gliederung_lg.as_ref())
        else {
            return (None, None);
        };

        (
            present(gliederung.vorbemerkung.as_ref()),
            gliederung.grundtext.as_ref().and_then(GrundtextBody::langtext),
        )
    }

    /// Records the time of the last edit in the document metadata.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.onlv
            .metadaten
            .get_or_insert_with(Metadaten::default)
            .erstelltam = Some(now.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
}
