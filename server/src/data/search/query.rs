//! Search request bodies.
//!
//! Pure builders so the query contract is testable without a live index.
//! Title matches are weighted over description; fuzziness is AUTO; a date
//! filter selects one calendar day in the index's timezone. Without a text
//! query, ordering falls back to id ascending so pagination is
//! deterministic.

use serde_json::{Value, json};

/// Full `_search` request body
pub fn search_body(query: &str, date: &str, page: u32, page_size: u32) -> Value {
    let from = page.saturating_sub(1) * page_size;
    json!({
        "query": search_query(query, date),
        "sort": sort_order(query),
        "from": from,
        "size": page_size,
    })
}

/// Boolean query combining the text match and the date filter
pub fn search_query(query: &str, date: &str) -> Value {
    let mut must: Vec<Value> = Vec::new();

    if !query.is_empty() {
        must.push(json!({
            "multi_match": {
                "query": query,
                "fields": ["title^2", "description"],
                "analyzer": "russian_analyzer",
                "fuzziness": "AUTO",
            }
        }));
    }

    if !date.is_empty() {
        must.push(json!({
            "range": {
                "datetime_start": {
                    "gte": format!("{date}T00:00:00"),
                    "lte": format!("{date}T23:59:59"),
                }
            }
        }));
    }

    if must.is_empty() {
        json!({ "match_all": {} })
    } else {
        json!({ "bool": { "must": must } })
    }
}

/// Relevance order when there is a text query, id order otherwise
pub fn sort_order(query: &str) -> Value {
    if query.is_empty() {
        json!([{ "id": { "order": "asc" } }])
    } else {
        json!([
            { "_score": { "order": "desc" } },
            { "id": { "order": "asc" } }
        ])
    }
}

/// Index settings and mappings: Russian analyzer with stemming over the text
/// fields, keyword metadata, date field for the day filter.
pub fn index_mapping() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "analysis": {
                "analyzer": {
                    "russian_analyzer": {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", "russian_stop", "russian_stemmer"],
                    }
                },
                "filter": {
                    "russian_stop": {
                        "type": "stop",
                        "stopwords": "_russian_",
                    },
                    "russian_stemmer": {
                        "type": "stemmer",
                        "language": "russian",
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "id": { "type": "long" },
                "title": {
                    "type": "text",
                    "analyzer": "russian_analyzer",
                    "fields": {
                        "keyword": { "type": "keyword", "ignore_above": 256 }
                    }
                },
                "description": {
                    "type": "text",
                    "analyzer": "russian_analyzer",
                },
                "type": { "type": "keyword" },
                "datetime_start": {
                    "type": "date",
                    "format": "strict_date_optional_time||epoch_millis",
                },
                "provider": { "type": "keyword" },
                "external": { "type": "boolean" },
                "total_seats": { "type": "integer" },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_and_date_is_match_all() {
        assert_eq!(search_query("", ""), json!({ "match_all": {} }));
    }

    #[test]
    fn text_query_weights_title_over_description() {
        let q = search_query("концерт", "");
        let multi = &q["bool"]["must"][0]["multi_match"];
        assert_eq!(multi["query"], "концерт");
        assert_eq!(multi["fields"][0], "title^2");
        assert_eq!(multi["fuzziness"], "AUTO");
    }

    #[test]
    fn date_filter_covers_the_whole_day() {
        let q = search_query("", "2026-08-01");
        let range = &q["bool"]["must"][0]["range"]["datetime_start"];
        assert_eq!(range["gte"], "2026-08-01T00:00:00");
        assert_eq!(range["lte"], "2026-08-01T23:59:59");
    }

    #[test]
    fn sort_is_deterministic_without_text_query() {
        assert_eq!(sort_order(""), json!([{ "id": { "order": "asc" } }]));

        let relevance = sort_order("opera");
        assert_eq!(relevance[0]["_score"]["order"], "desc");
        assert_eq!(relevance[1]["id"]["order"], "asc");
    }

    #[test]
    fn pagination_offsets_from_one_based_pages() {
        let body = search_body("", "", 3, 20);
        assert_eq!(body["from"], 40);
        assert_eq!(body["size"], 20);

        let first = search_body("", "", 1, 5);
        assert_eq!(first["from"], 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_from_is_page_offset(page in 1u32..1000, size in 1u32..=20) {
                let body = search_body("", "", page, size);
                prop_assert_eq!(&body["from"], (page - 1) * size);
                prop_assert_eq!(&body["size"], size);
            }

            // Identical inputs always produce identical request bodies, so
            // cached listing responses stay comparable across processes
            #[test]
            fn prop_body_is_deterministic(
                query in "[a-zа-я ]{0,20}",
                page in 1u32..100,
                size in 1u32..=20,
            ) {
                let a = search_body(&query, "", page, size);
                let b = search_body(&query, "", page, size);
                prop_assert_eq!(a, b);
            }
        }
    }
}
