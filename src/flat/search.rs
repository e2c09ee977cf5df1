use super::FlatItem;

/// Returns the items whose search text contains every term of `query`.
///
/// Matching is case-insensitive. A query without terms matches everything.
#[must_use]
pub fn search<'a>(items: &'a [FlatItem], query: &str) -> Vec<&'a FlatItem> {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();

    items
        .iter()
        .filter(|item| {
            terms
                .iter()
                .all(|term| item.searchable_text.contains(term.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::flat::flatten;

    fn items() -> Vec<FlatItem> {
        let doc = serde_json::from_value(json!({
            "onlv": { "ausschreibungs-lv": { "gliederung-lg": { "lg-liste": { "lg": {
                "lg-eigenschaften": { "ueberschrift": "Fliesenarbeiten" },
                "ulg-liste": { "ulg": {
                    "positionen": { "grundtextnr": {
                        "folgeposition": [
                            { "pos-eigenschaften": { "stichwort": "Wandfliesen Bad" }, "@_ftnr": "A" },
                            { "pos-eigenschaften": { "stichwort": "Bodenfliesen Küche" }, "@_ftnr": "B" }
                        ],
                        "@_nr": "01"
                    }},
                    "@_nr": "01"
                }},
                "@_nr": "24"
            }}}}}
        }))
        .unwrap();
        flatten(&doc)
    }

    #[test_case("fliesen", &["lg-24", "pos-ulg-24.01-01-A", "pos-ulg-24.01-01-B"]; "shared word")]
    #[test_case("BAD", &["pos-ulg-24.01-01-A"]; "case insensitive")]
    #[test_case("fliesen küche", &["pos-ulg-24.01-01-B"]; "all terms must match")]
    #[test_case("240101b", &["pos-ulg-24.01-01-B"]; "by number")]
    #[test_case("dach", &[]; "no match")]
    fn finds_matching_items(query: &str, expected: &[&str]) {
        let items = items();
        let ids: Vec<_> = search(&items, query)
            .into_iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn empty_query_matches_everything() {
        let items = items();
        assert_eq!(search(&items, "  ").len(), items.len());
    }
}
