use tracing::{debug, instrument, warn};

use super::{FlatItem, ItemData, ItemKind};
use crate::{
    domain::{
        JsonText, PlainText, Variant,
        document::{Document, Grundtext, Lg, Position, Ulg},
    },
    editor::PositionAddress,
};

/// Id of the standing preliminary remarks item.
const SVB_ID: &str = "svb";

/// Walks a [`Document`] into its ordered flat projection.
///
/// Generic over the rich-text reducer used to build search text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flattener<R = JsonText> {
    reducer: R,
}

/// Flattens a document using the default rich-text reducer.
#[must_use]
pub fn flatten(document: &Document) -> Vec<FlatItem> {
    Flattener::new(JsonText).flatten(document)
}

/// A position collected from a base-text slot, not yet parented.
struct Pending<'a> {
    address: PositionAddress,
    position: &'a Position,
}

impl<R: PlainText> Flattener<R> {
    /// Creates a flattener using the given reducer.
    pub const fn new(reducer: R) -> Self {
        Self { reducer }
    }

    /// Produces the flat items of `document` in document order.
    ///
    /// Nodes without a number are skipped together with everything below
    /// them.
    #[instrument(level = "debug", skip_all)]
    pub fn flatten(&self, document: &Document) -> Vec<FlatItem> {
        let mut items = Vec::new();

        self.standing_remarks(document, &mut items);
        for lg in document.lgs() {
            self.lg(lg, &mut items);
        }

        debug!(count = items.len(), "flattened document");
        items
    }

    fn text(&self, node: &serde_json::Value) -> String {
        self.reducer.plain_text(node)
    }

    fn standing_remarks(&self, document: &Document, out: &mut Vec<FlatItem>) {
        let (vorbemerkung, grundtext) = document.standing_remarks();
        if vorbemerkung.is_none() && grundtext.is_none() {
            return;
        }

        let texts: Vec<String> = vorbemerkung
            .into_iter()
            .chain(grundtext)
            .map(|node| self.text(node))
            .collect();

        out.push(FlatItem {
            id: SVB_ID.to_string(),
            parent_id: None,
            level: 0,
            kind: ItemKind::Svb,
            nr: String::new(),
            data: ItemData::StandingRemarks {
                vorbemerkung: vorbemerkung.cloned(),
                grundtext: grundtext.cloned(),
            },
            searchable_text: searchable(texts.iter().map(String::as_str)),
        });
    }

    fn lg(&self, lg: &Lg, out: &mut Vec<FlatItem>) {
        let Some(lg_nr) = lg.nr() else {
            debug!("skipping LG without number");
            return;
        };

        let id = format!("lg-{lg_nr}");
        let properties = &lg.lg_eigenschaften;
        out.push(FlatItem {
            id: id.clone(),
            parent_id: None,
            level: 0,
            kind: ItemKind::Lg,
            nr: lg_nr.to_string(),
            data: ItemData::Group(properties.clone()),
            searchable_text: searchable([
                lg_nr,
                properties.ueberschrift.as_deref().unwrap_or_default(),
            ]),
        });

        if let Some(remark) = lg.vorbemerkung() {
            out.push(self.remark(format!("{id}-vorbemerkung"), &id, 1, lg_nr, remark));
        }

        for ulg in lg.ulgs() {
            self.ulg(lg_nr, &id, ulg, out);
        }
    }

    fn ulg(&self, lg_nr: &str, lg_id: &str, ulg: &Ulg, out: &mut Vec<FlatItem>) {
        let Some(ulg_nr) = ulg.nr() else {
            debug!(lg = lg_nr, "skipping ULG without number");
            return;
        };

        let full_nr = format!("{lg_nr}.{ulg_nr}");
        let id = format!("ulg-{full_nr}");
        let properties = &ulg.ulg_eigenschaften;
        out.push(FlatItem {
            id: id.clone(),
            parent_id: Some(lg_id.to_string()),
            level: 1,
            kind: ItemKind::Ulg,
            nr: full_nr.clone(),
            data: ItemData::Group(properties.clone()),
            searchable_text: searchable([
                full_nr.as_str(),
                properties.ueberschrift.as_deref().unwrap_or_default(),
            ]),
        });

        if let Some(remark) = ulg.vorbemerkung() {
            out.push(self.remark(format!("{id}-vorbemerkung"), &id, 2, &full_nr, remark));
        }

        for (index, grundtext) in ulg.grundtexte().iter().enumerate() {
            self.grundtext(lg_nr, ulg_nr, &id, index, grundtext, out);
        }
    }

    fn remark(
        &self,
        id: String,
        parent_id: &str,
        level: usize,
        nr: &str,
        remark: &serde_json::Value,
    ) -> FlatItem {
        let text = self.text(remark);
        FlatItem {
            id,
            parent_id: Some(parent_id.to_string()),
            level,
            kind: ItemKind::Vorbemerkung,
            nr: nr.to_string(),
            data: ItemData::Remark(remark.clone()),
            searchable_text: searchable([nr, text.as_str()]),
        }
    }

    fn grundtext(
        &self,
        lg_nr: &str,
        ulg_nr: &str,
        ulg_id: &str,
        index: usize,
        grundtext: &Grundtext,
        out: &mut Vec<FlatItem>,
    ) {
        let Some(gt_nr) = grundtext.nr() else {
            debug!(lg = lg_nr, ulg = ulg_nr, "skipping base text without number");
            return;
        };

        let positions = pending_positions(lg_nr, ulg_nr, gt_nr, grundtext);
        let nr = format!("{lg_nr}{ulg_nr}{gt_nr}");

        match (grundtext.langtext(), positions.is_empty()) {
            (Some(langtext), false) => {
                let id = format!("{ulg_id}-gt-{gt_nr}-desc-{index}");
                out.push(self.description(
                    id.clone(),
                    ulg_id,
                    ItemKind::GrundtextDesc,
                    &nr,
                    langtext,
                    Some(positions.len()),
                ));
                out.extend(positions.into_iter().map(|p| self.position(p, &id, 3)));
            }
            (Some(langtext), true) => {
                out.push(self.description(
                    format!("{ulg_id}-gt-{gt_nr}-staticdesc"),
                    ulg_id,
                    ItemKind::GrundtextStaticDesc,
                    &nr,
                    langtext,
                    None,
                ));
            }
            (None, false) => {
                out.extend(positions.into_iter().map(|p| self.position(p, ulg_id, 2)));
            }
            (None, true) => {}
        }
    }

    fn description(
        &self,
        id: String,
        parent_id: &str,
        kind: ItemKind,
        nr: &str,
        langtext: &serde_json::Value,
        position_count: Option<usize>,
    ) -> FlatItem {
        let text = self.text(langtext);
        FlatItem {
            id,
            parent_id: Some(parent_id.to_string()),
            level: 2,
            kind,
            nr: nr.to_string(),
            data: ItemData::Description {
                langtext: langtext.clone(),
                position_count,
            },
            searchable_text: searchable([nr, text.as_str()]),
        }
    }

    fn position(&self, pending: Pending<'_>, parent_id: &str, level: usize) -> FlatItem {
        let properties = &pending.position.pos_eigenschaften;
        let nr = pending.address.compact();
        let langtext = properties
            .langtext
            .as_ref()
            .map(|node| self.text(node))
            .unwrap_or_default();

        FlatItem {
            id: pending.address.to_string(),
            parent_id: Some(parent_id.to_string()),
            level,
            kind: ItemKind::Position,
            searchable_text: searchable([
                nr.as_str(),
                properties.stichwort.as_deref().unwrap_or_default(),
                langtext.as_str(),
            ]),
            nr,
            data: ItemData::Position(pending.position.clone()),
        }
    }
}

/// Collects the positions of a base-text slot, undivided first.
fn pending_positions<'a>(
    lg_nr: &str,
    ulg_nr: &str,
    gt_nr: &str,
    grundtext: &'a Grundtext,
) -> Vec<Pending<'a>> {
    let address = |variant| PositionAddress::new(lg_nr, ulg_nr, gt_nr, variant);

    let undivided = grundtext
        .ungeteilteposition
        .iter()
        .map(|position| (Variant::Undivided, position));

    let follow_ups = grundtext.folgeposition.iter().filter_map(|position| {
        match position.letter() {
            Some('U') => {
                warn!(
                    lg = lg_nr,
                    ulg = ulg_nr,
                    grundtext = gt_nr,
                    "skipping Folgeposition with reserved letter 'U'"
                );
                None
            }
            Some(letter) => Some((Variant::FollowUp(letter), position)),
            None => {
                debug!(
                    lg = lg_nr,
                    ulg = ulg_nr,
                    grundtext = gt_nr,
                    "skipping Folgeposition without letter"
                );
                None
            }
        }
    });

    undivided
        .chain(follow_ups)
        .map(|(variant, position)| Pending {
            address: address(variant),
            position,
        })
        .collect()
}

/// Lower-cases the parts and joins their words with single spaces.
fn searchable<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(str::split_whitespace)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::{Value, json};

    use super::*;

    fn document(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    /// LG 01 > ULG 02 > base text 03 with a single Folgeposition `A`.
    fn single_position(langtext: Option<&str>) -> Document {
        let mut grundtext = json!({
            "folgeposition": {
                "pos-eigenschaften": { "stichwort": "Fliesen verlegen" },
                "@_ftnr": "A"
            },
            "@_nr": "03"
        });
        if let Some(text) = langtext {
            grundtext["grundtext"] = json!({ "langtext": text });
        }

        document(json!({
            "onlv": { "ausschreibungs-lv": { "gliederung-lg": { "lg-liste": { "lg": {
                "lg-eigenschaften": { "ueberschrift": "Fliesenarbeiten" },
                "ulg-liste": { "ulg": {
                    "ulg-eigenschaften": { "ueberschrift": "Wandfliesen" },
                    "positionen": { "grundtextnr": grundtext },
                    "@_nr": "02"
                }},
                "@_nr": "01"
            }}}}}
        }))
    }

    fn find<'a>(items: &'a [FlatItem], id: &str) -> &'a FlatItem {
        items
            .iter()
            .find(|item| item.id == id)
            .unwrap_or_else(|| panic!("no item {id}"))
    }

    #[test]
    fn position_without_description_hangs_off_ulg() {
        let items = flatten(&single_position(None));

        let ids: Vec<_> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["lg-01", "ulg-01.02", "pos-ulg-01.02-03-A"]);

        let position = find(&items, "pos-ulg-01.02-03-A");
        assert_eq!(position.level, 2);
        assert_eq!(position.parent_id.as_deref(), Some("ulg-01.02"));
        assert_eq!(position.nr, "010203A");
        assert_eq!(position.kind, ItemKind::Position);
    }

    #[test]
    fn position_with_description_hangs_off_description() {
        let items = flatten(&single_position(Some("Wandfliesen im Bad")));

        let description = find(&items, "ulg-01.02-gt-03-desc-0");
        assert_eq!(description.kind, ItemKind::GrundtextDesc);
        assert_eq!(description.level, 2);
        assert_eq!(description.nr, "010203");
        assert_eq!(
            description.data,
            ItemData::Description {
                langtext: json!("Wandfliesen im Bad"),
                position_count: Some(1),
            }
        );

        let position = find(&items, "pos-ulg-01.02-03-A");
        assert_eq!(position.level, 3);
        assert_eq!(position.parent_id.as_deref(), Some("ulg-01.02-gt-03-desc-0"));
    }

    #[test]
    fn description_without_positions_is_static() {
        let doc = document(json!({
            "onlv": { "ausschreibungs-lv": { "gliederung-lg": { "lg-liste": { "lg": {
                "ulg-liste": { "ulg": {
                    "positionen": { "grundtextnr": [
                        { "@_nr": "01" },
                        { "grundtext": { "langtext": "Hinweis" }, "@_nr": "02" }
                    ]},
                    "@_nr": "02"
                }},
                "@_nr": "01"
            }}}}}
        }));

        let items = flatten(&doc);
        let last = items.last().unwrap();
        assert_eq!(last.id, "ulg-01.02-gt-02-staticdesc");
        assert_eq!(last.kind, ItemKind::GrundtextStaticDesc);
        assert_eq!(last.level, 2);
        assert_eq!(
            last.data,
            ItemData::Description {
                langtext: json!("Hinweis"),
                position_count: None,
            }
        );
    }

    #[test]
    fn empty_slot_contributes_nothing() {
        let doc = document(json!({
            "onlv": { "ausschreibungs-lv": { "gliederung-lg": { "lg-liste": { "lg": {
                "ulg-liste": { "ulg": {
                    "positionen": { "grundtextnr": { "@_nr": "01" } },
                    "@_nr": "02"
                }},
                "@_nr": "01"
            }}}}}
        }));

        let ids: Vec<_> = flatten(&doc).into_iter().map(|item| item.id).collect();
        assert_eq!(ids, ["lg-01", "ulg-01.02"]);
    }

    #[test]
    fn undivided_precedes_follow_ups() {
        let doc = document(json!({
            "onlv": { "ausschreibungs-lv": { "gliederung-lg": { "lg-liste": { "lg": {
                "ulg-liste": { "ulg": {
                    "positionen": { "grundtextnr": {
                        "ungeteilteposition": { "pos-eigenschaften": { "stichwort": "Pauschal" } },
                        "folgeposition": [
                            { "pos-eigenschaften": { "stichwort": "Variante B" }, "@_ftnr": "B" },
                            { "pos-eigenschaften": { "stichwort": "ohne Buchstabe" } }
                        ],
                        "@_nr": "05"
                    }},
                    "@_nr": "01"
                }},
                "@_nr": "07"
            }}}}}
        }));

        let positions: Vec<_> = flatten(&doc)
            .into_iter()
            .filter(|item| item.kind == ItemKind::Position)
            .map(|item| (item.id, item.nr))
            .collect();

        assert_eq!(
            positions,
            [
                ("pos-ulg-07.01-05-U".to_string(), "070105".to_string()),
                ("pos-ulg-07.01-05-B".to_string(), "070105B".to_string()),
            ]
        );
    }

    #[test]
    fn nodes_without_numbers_are_skipped() {
        let doc = document(json!({
            "onlv": { "ausschreibungs-lv": { "gliederung-lg": { "lg-liste": { "lg": [
                { "lg-eigenschaften": { "ueberschrift": "ohne Nummer" },
                  "ulg-liste": { "ulg": { "@_nr": "01" } } },
                { "ulg-liste": { "ulg": [
                    { "ulg-eigenschaften": { "ueberschrift": "ohne Nummer" } },
                    { "@_nr": "03" }
                  ]},
                  "@_nr": "02" }
            ]}}}}
        }));

        let ids: Vec<_> = flatten(&doc).into_iter().map(|item| item.id).collect();
        assert_eq!(ids, ["lg-02", "ulg-02.03"]);
    }

    #[test]
    fn standing_remarks_and_vorbemerkungen() {
        let doc = document(json!({
            "onlv": { "ausschreibungs-lv": { "gliederung-lg": {
                "vorbemerkung": { "p": "Allgemeine Vorbemerkung" },
                "grundtext": { "langtext": { "p": { "#text": "Ständige Vorbemerkungen" } } },
                "lg-liste": { "lg": {
                    "lg-eigenschaften": { "ueberschrift": "Baustelle", "vorbemerkung": "LG Hinweis" },
                    "ulg-liste": { "ulg": {
                        "ulg-eigenschaften": { "vorbemerkung": "ULG Hinweis" },
                        "@_nr": "01"
                    }},
                    "@_nr": "01"
                }}
            }}}
        }));

        let items = flatten(&doc);
        let summary: Vec<_> = items
            .iter()
            .map(|item| (item.id.as_str(), item.level, item.parent_id.as_deref()))
            .collect();

        assert_eq!(
            summary,
            [
                ("svb", 0, None),
                ("lg-01", 0, None),
                ("lg-01-vorbemerkung", 1, Some("lg-01")),
                ("ulg-01.01", 1, Some("lg-01")),
                ("ulg-01.01-vorbemerkung", 2, Some("ulg-01.01")),
            ]
        );
        assert_eq!(
            items[0].searchable_text,
            "allgemeine vorbemerkung ständige vorbemerkungen"
        );
    }

    #[test]
    fn searchable_text_is_lowercased_and_collapsed() {
        let doc = single_position(Some("  Wand-  \n Fliesen\tim   BAD "));
        let items = flatten(&doc);

        assert_eq!(find(&items, "lg-01").searchable_text, "01 fliesenarbeiten");
        assert_eq!(
            find(&items, "ulg-01.02").searchable_text,
            "01.02 wandfliesen"
        );
        assert_eq!(
            find(&items, "ulg-01.02-gt-03-desc-0").searchable_text,
            "010203 wand- fliesen im bad"
        );
        assert_eq!(
            find(&items, "pos-ulg-01.02-03-A").searchable_text,
            "010203a fliesen verlegen"
        );
    }

    #[test]
    fn searchable_text_leaves_out_attributes() {
        let mut doc = single_position(None);
        doc.lgs_mut()[0].ulgs_mut()[0].grundtexte_mut()[0].folgeposition[0]
            .pos_eigenschaften
            .langtext = Some(json!({ "p": { "@_style": "fett", "span": "Beton" } }));

        let items = flatten(&doc);
        assert_eq!(
            find(&items, "pos-ulg-01.02-03-A").searchable_text,
            "010203a fliesen verlegen beton"
        );
    }

    #[test]
    fn parents_precede_children_and_levels_follow_edges() {
        let items = flatten(&single_position(Some("Beschreibung")));

        let mut depth: HashMap<&str, usize> = HashMap::new();
        for item in &items {
            let level = match item.parent_id.as_deref() {
                None => 0,
                Some(parent) => depth
                    .get(parent)
                    .map(|d| d + 1)
                    .unwrap_or_else(|| panic!("{} precedes its parent {parent}", item.id)),
            };
            assert_eq!(level, item.level, "{}", item.id);
            depth.insert(&item.id, level);
        }
    }

    #[test]
    fn reconstructed_tree_matches_direct_walk() {
        let doc = document(json!({
            "onlv": { "ausschreibungs-lv": { "gliederung-lg": { "lg-liste": { "lg": [
                { "ulg-liste": { "ulg": [
                    { "positionen": { "grundtextnr": [
                        { "grundtext": { "langtext": "GT" },
                          "folgeposition": [{ "@_ftnr": "A" }, { "@_ftnr": "B" }],
                          "@_nr": "01" },
                        { "ungeteilteposition": {}, "@_nr": "02" }
                      ]},
                      "@_nr": "01" }
                  ]},
                  "@_nr": "01" },
                { "@_nr": "02" }
            ]}}}}
        }));

        // direct recursive walk of the typed tree
        let mut expected = Vec::new();
        for lg in doc.lgs() {
            let lg_nr = lg.nr().unwrap();
            expected.push((0, ItemKind::Lg, lg_nr.to_string()));
            for ulg in lg.ulgs() {
                let ulg_nr = ulg.nr().unwrap();
                expected.push((1, ItemKind::Ulg, format!("{lg_nr}.{ulg_nr}")));
                for gt in ulg.grundtexte() {
                    let base = format!("{lg_nr}{ulg_nr}{}", gt.nr().unwrap());
                    let level = if gt.langtext().is_some() {
                        expected.push((2, ItemKind::GrundtextDesc, base.clone()));
                        3
                    } else {
                        2
                    };
                    if gt.ungeteilteposition.is_some() {
                        expected.push((level, ItemKind::Position, base.clone()));
                    }
                    for position in gt.folgeposition.iter() {
                        let letter = position.letter().unwrap();
                        expected.push((level, ItemKind::Position, format!("{base}{letter}")));
                    }
                }
            }
        }

        let actual: Vec<_> = flatten(&doc)
            .into_iter()
            .map(|item| (item.level, item.kind, item.nr))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn ids_are_stable_across_flattenings() {
        let doc = single_position(Some("Beschreibung"));
        assert_eq!(flatten(&doc), flatten(&doc.clone()));
    }

    struct Shouting;

    impl PlainText for Shouting {
        fn plain_text(&self, _node: &Value) -> String {
            "LOUD".to_string()
        }
    }

    #[test]
    fn reducer_is_pluggable() {
        let items = Flattener::new(Shouting).flatten(&single_position(Some("leise")));
        assert_eq!(
            find(&items, "ulg-01.02-gt-03-desc-0").searchable_text,
            "010203 loud"
        );
    }
}
