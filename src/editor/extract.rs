use tracing::{debug, instrument, warn};

use crate::domain::{
    Identifier,
    document::{Document, Grundtext, Lg, Ulg},
};

/// Returns a copy of `document` reduced to the given positions and their
/// ancestors.
///
/// A six-digit identifier without a letter keeps its whole base-text slot; a
/// letter narrows the slot's Folgepositionen to the ones named, matched
/// exactly, and leaves the rest of the slot alone. Identifiers that do not
/// address a ULG, or that match nothing, are skipped with a warning.
/// Everything outside the LG list is kept as is.
#[must_use]
#[instrument(level = "debug", skip_all, fields(count = identifiers.len()))]
pub fn extract(document: &Document, identifiers: &[Identifier]) -> Document {
    let targets: Vec<&Identifier> = identifiers
        .iter()
        .filter(|id| {
            let addressable = id.ulg().is_some();
            if !addressable {
                warn!("Skipping identifier '{id}': extraction needs LG, ULG and base text");
            }
            addressable
        })
        .filter(|id| {
            let found = resolves(document, id);
            if !found {
                warn!("Skipping identifier '{id}': no such position");
            }
            found
        })
        .collect();

    let mut extracted = document.clone();
    if !document.lgs().is_empty() {
        extracted.lgs_mut().retain_mut(|lg| keep_lg(lg, &targets));
    }

    debug!(positions = targets.len(), "extracted positions");
    extracted
}

fn resolves(document: &Document, id: &Identifier) -> bool {
    document
        .lgs()
        .iter()
        .filter(|lg| lg.nr() == id.lg())
        .flat_map(Lg::ulgs)
        .filter(|ulg| ulg.nr() == id.ulg())
        .flat_map(Ulg::grundtexte)
        .filter(|gt| gt.nr() == Some(id.grundtextnr()))
        .any(|gt| match id.ftnr() {
            None => true,
            Some(letter) => gt.letters().any(|l| l == letter),
        })
}

fn keep_lg(lg: &mut Lg, targets: &[&Identifier]) -> bool {
    let targets: Vec<&Identifier> = targets
        .iter()
        .copied()
        .filter(|id| lg.nr().is_some() && id.lg() == lg.nr())
        .collect();
    if targets.is_empty() {
        return false;
    }

    if let Some(list) = lg.ulg_liste.as_mut() {
        list.ulg.retain_mut(|ulg| keep_ulg(ulg, &targets));
    }
    true
}

fn keep_ulg(ulg: &mut Ulg, targets: &[&Identifier]) -> bool {
    let targets: Vec<&Identifier> = targets
        .iter()
        .copied()
        .filter(|id| ulg.nr().is_some() && id.ulg() == ulg.nr())
        .collect();
    if targets.is_empty() {
        return false;
    }

    if let Some(positionen) = ulg.positionen.as_mut() {
        positionen
            .grundtextnr
            .retain_mut(|gt| keep_grundtext(gt, &targets));
    }
    true
}

fn keep_grundtext(grundtext: &mut Grundtext, targets: &[&Identifier]) -> bool {
    let targets: Vec<&Identifier> = targets
        .iter()
        .copied()
        .filter(|id| grundtext.nr() == Some(id.grundtextnr()))
        .collect();
    if targets.is_empty() {
        return false;
    }
    if targets.iter().any(|id| id.is_standalone()) {
        return true;
    }

    grundtext.folgeposition.retain(|position| {
        position
            .letter()
            .is_some_and(|letter| targets.iter().any(|id| id.ftnr() == Some(letter)))
    });
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{domain::document::Position, flat::flatten};

    fn document() -> Document {
        serde_json::from_value(json!({
            "onlv": {
                "metadaten": { "dateiname": "lv.onlv" },
                "ausschreibungs-lv": {
                    "kenndaten": { "vorhaben": "Neubau" },
                    "gliederung-lg": { "lg-liste": { "lg": [
                        {
                            "lg-eigenschaften": { "ueberschrift": "Fliesen" },
                            "ulg-liste": { "ulg": [
                                {
                                    "ulg-eigenschaften": { "vorbemerkung": "Hinweis" },
                                    "positionen": { "grundtextnr": [
                                        { "folgeposition": [{ "@_ftnr": "A" }, { "@_ftnr": "B" }], "@_nr": "01" },
                                        { "ungeteilteposition": {}, "@_nr": "02" }
                                    ]},
                                    "@_nr": "01"
                                },
                                { "positionen": { "grundtextnr": { "ungeteilteposition": {}, "@_nr": "01" } }, "@_nr": "02" }
                            ]},
                            "@_nr": "24"
                        },
                        { "ulg-liste": { "ulg": { "@_nr": "01" } }, "@_nr": "25" }
                    ]}}
                }
            }
        }))
        .unwrap()
    }

    fn ids(document: &Document) -> Vec<String> {
        flatten(document).into_iter().map(|item| item.id).collect()
    }

    fn identifiers(raw: &[&str]) -> Vec<Identifier> {
        raw.iter().map(|id| id.parse().unwrap()).collect()
    }

    #[test]
    fn keeps_single_folgeposition_and_ancestors() {
        let extracted = extract(&document(), &identifiers(&["240101B"]));
        assert_eq!(
            ids(&extracted),
            [
                "lg-24",
                "ulg-24.01",
                "ulg-24.01-vorbemerkung",
                "pos-ulg-24.01-01-B"
            ]
        );
    }

    #[test]
    fn identifier_without_letter_keeps_whole_slot() {
        let extracted = extract(&document(), &identifiers(&["240101", "240201"]));
        assert_eq!(
            ids(&extracted),
            [
                "lg-24",
                "ulg-24.01",
                "ulg-24.01-vorbemerkung",
                "pos-ulg-24.01-01-A",
                "pos-ulg-24.01-01-B",
                "ulg-24.02",
                "pos-ulg-24.02-01-U"
            ]
        );
    }

    #[test]
    fn document_order_wins_over_request_order() {
        let forward = extract(&document(), &identifiers(&["240102", "240101A"]));
        let backward = extract(&document(), &identifiers(&["240101A", "240102"]));
        assert_eq!(forward, backward);
    }

    #[test]
    fn unaddressable_and_unknown_identifiers_are_skipped() {
        let extracted = extract(&document(), &identifiers(&["2401", "01", "240109", "240101Z"]));
        assert!(extracted.lgs().is_empty());
    }

    #[test]
    fn keeps_everything_outside_the_lg_list() {
        let original = document();
        let extracted = extract(&original, &identifiers(&["240101A"]));

        assert_eq!(original, document());
        assert_eq!(extracted.onlv.metadaten, original.onlv.metadaten);
        assert_eq!(
            extracted.onlv.ausschreibungs_lv.as_ref().unwrap().kenndaten,
            Some(json!({ "vorhaben": "Neubau" }))
        );
    }

    #[test]
    fn letters_match_exactly() {
        let extracted = extract(&document(), &identifiers(&["240101a"]));
        assert!(extracted.lgs().is_empty());
    }

    #[test]
    fn letter_keeps_rest_of_slot() {
        let mut original = document();
        let slot = &mut original.lgs_mut()[0].ulgs_mut()[0].grundtexte_mut()[0];
        slot.ungeteilteposition = Some(Position::default());
        slot.set_langtext(json!("Wandfliesen"));

        let extracted = extract(&original, &identifiers(&["240101B"]));
        let slot = &extracted.lgs()[0].ulgs()[0].grundtexte()[0];
        assert!(slot.ungeteilteposition.is_some());
        assert_eq!(slot.langtext(), Some(&json!("Wandfliesen")));
        assert_eq!(slot.letters().collect::<Vec<_>>(), ['B']);
    }

    #[test]
    fn empty_document_stays_empty() {
        let extracted = extract(&Document::default(), &identifiers(&["240101"]));
        assert_eq!(extracted, Document::default());
    }
}
