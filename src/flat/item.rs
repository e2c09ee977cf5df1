use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::domain::document::{GroupProperties, Position};

/// The kind of node a flat item stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Document-wide standing preliminary remarks.
    Svb,
    /// A main group.
    Lg,
    /// A sub-group.
    Ulg,
    /// A preliminary remark attached to an LG or ULG.
    Vorbemerkung,
    /// The shared long description of a base text with positions below it.
    GrundtextDesc,
    /// The long description of a base text without positions.
    GrundtextStaticDesc,
    /// A Folgeposition or Ungeteilteposition.
    Position,
}

impl ItemKind {
    /// The serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Svb => "svb",
            Self::Lg => "lg",
            Self::Ulg => "ulg",
            Self::Vorbemerkung => "vorbemerkung",
            Self::GrundtextDesc => "grundtext_desc",
            Self::GrundtextStaticDesc => "grundtext_static_desc",
            Self::Position => "position",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload of a flat item, copied out of the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum ItemData {
    /// The document-level remark and base text.
    StandingRemarks {
        /// Document-level preliminary remark.
        vorbemerkung: Option<Value>,
        /// Document-level base text.
        grundtext: Option<Value>,
    },

    /// Heading properties of an LG or ULG.
    Group(GroupProperties),

    /// A preliminary remark.
    Remark(Value),

    /// A base-text long description.
    Description {
        /// The long description.
        langtext: Value,
        /// Number of positions reparented below the description. Absent for
        /// static descriptions.
        #[serde(skip_serializing_if = "Option::is_none")]
        position_count: Option<usize>,
    },

    /// A position node.
    Position(Position),
}

/// One entry of the flat projection.
///
/// `id` is derived from the node's path, so the same node maps to the same id
/// across re-flattenings. Parents always precede their children.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatItem {
    /// Stable path-derived id.
    pub id: String,

    /// The id of the enclosing item, `None` at level 0.
    pub parent_id: Option<String>,

    /// Depth in the flat hierarchy.
    pub level: usize,

    /// The kind of node.
    #[serde(rename = "type")]
    pub kind: ItemKind,

    /// The hierarchy number shown to users.
    pub nr: String,

    /// The node's content.
    pub data: ItemData,

    /// Lower-cased, whitespace-collapsed text used for substring search.
    pub searchable_text: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_for_ui_consumers() {
        let item = FlatItem {
            id: "ulg-01.02-gt-03-desc-0".into(),
            parent_id: Some("ulg-01.02".into()),
            level: 2,
            kind: ItemKind::GrundtextDesc,
            nr: "010203".into(),
            data: ItemData::Description {
                langtext: json!("Fliesen"),
                position_count: Some(2),
            },
            searchable_text: "010203 fliesen".into(),
        };

        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({
                "id": "ulg-01.02-gt-03-desc-0",
                "parentId": "ulg-01.02",
                "level": 2,
                "type": "grundtext_desc",
                "nr": "010203",
                "data": { "langtext": "Fliesen", "positionCount": 2 },
                "searchableText": "010203 fliesen"
            })
        );
    }

    #[test]
    fn kind_display_matches_serialized_name() {
        for kind in [
            ItemKind::Svb,
            ItemKind::Lg,
            ItemKind::Ulg,
            ItemKind::Vorbemerkung,
            ItemKind::GrundtextDesc,
            ItemKind::GrundtextStaticDesc,
            ItemKind::Position,
        ] {
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                Value::String(kind.to_string())
            );
        }
    }
}
