//! Turns a raw ranked-keywords payload into scored keywords plus aggregate
//! counters.
//!
//! Parsing never fails. A payload without the expected nesting is an empty
//! result (logged at `warn`), and a missing field inside an item takes its
//! default: `"Unknown"` for the keyword text, zero for numbers, informational
//! for intent.

use aioscan_core::{KeywordStats, ScoredKeyword, SearchIntent};

use crate::types::{RankedItem, RankedKeywordsResponse, SerpItem};

/// The SERP feature tag that marks an AI overview on the results page.
pub const AI_OVERVIEW_FEATURE: &str = "ai_overview";

const UNKNOWN_KEYWORD: &str = "Unknown";
const TASK_OK: i64 = 20_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedKeywords {
    pub keywords: Vec<ScoredKeyword>,
    pub stats: KeywordStats,
}

/// Parse every ranked item of the first task's first result.
#[must_use]
pub fn parse_ranked_keywords(payload: &serde_json::Value) -> ParsedKeywords {
    let response: RankedKeywordsResponse = match serde_json::from_value(payload.clone()) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "provider payload has unexpected shape; treating as empty");
            return ParsedKeywords::default();
        }
    };

    let Some(task) = response.tasks.and_then(|tasks| tasks.into_iter().next()) else {
        tracing::warn!("provider payload has no tasks; treating as empty");
        return ParsedKeywords::default();
    };

    if let Some(code) = task.status_code.filter(|&code| code != TASK_OK) {
        tracing::warn!(
            status_code = code,
            status_message = task.status_message.as_deref().unwrap_or(""),
            "provider task reported a non-success status"
        );
    }

    let items = task
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.items)
        .unwrap_or_default();

    let keywords: Vec<ScoredKeyword> = items.into_iter().map(parse_item).collect();
    let stats = KeywordStats::from_keywords(&keywords);

    ParsedKeywords { keywords, stats }
}

fn parse_item(raw: serde_json::Value) -> ScoredKeyword {
    let item: RankedItem = serde_json::from_value(raw).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "ranked item has unexpected shape; using defaults");
        RankedItem::default()
    });

    let keyword_data = item.keyword_data.unwrap_or_default();
    let serp_item: SerpItem = item
        .ranked_serp_element
        .and_then(|element| element.serp_item)
        .unwrap_or_default();

    let has_ai_overview = keyword_data
        .serp_info
        .and_then(|info| info.serp_item_types)
        .is_some_and(|types| types.iter().any(|t| t == AI_OVERVIEW_FEATURE));

    let search_volume = keyword_data
        .keyword_info
        .and_then(|info| info.search_volume)
        .unwrap_or(0);

    let position = serp_item
        .rank_absolute
        .map_or(0, |rank| i32::try_from(rank.max(0)).unwrap_or(i32::MAX));

    let intent = SearchIntent::from_raw(
        keyword_data
            .search_intent_info
            .as_ref()
            .and_then(|info| info.main_intent.as_deref()),
    );

    ScoredKeyword::new(
        keyword_data
            .keyword
            .unwrap_or_else(|| UNKNOWN_KEYWORD.to_string()),
        search_volume,
        position,
        intent,
        round_etv(serp_item.etv),
        has_ai_overview,
    )
}

#[allow(clippy::cast_possible_truncation)]
fn round_etv(etv: Option<f64>) -> i64 {
    match etv {
        Some(value) if value.is_finite() => value.round() as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(items: serde_json::Value) -> serde_json::Value {
        json!({
            "status_code": 20000,
            "status_message": "Ok.",
            "tasks": [{
                "status_code": 20000,
                "status_message": "Ok.",
                "result": [{ "target": "example.com", "items_count": 1, "items": items }]
            }]
        })
    }

    fn item(keyword: &str, volume: i64, rank: i64, intent: &str, overview: bool) -> serde_json::Value {
        let types: Vec<&str> = if overview {
            vec!["organic", "ai_overview"]
        } else {
            vec!["organic", "people_also_ask"]
        };
        json!({
            "keyword_data": {
                "keyword": keyword,
                "keyword_info": { "search_volume": volume },
                "search_intent_info": { "main_intent": intent },
                "serp_info": { "serp_item_types": types }
            },
            "ranked_serp_element": {
                "serp_item": { "rank_absolute": rank, "etv": 12.6 }
            }
        })
    }

    #[test]
    fn single_item_first_position_scores_2000() {
        let parsed = parse_ranked_keywords(&payload(json!([item(
            "what is rust",
            1000,
            1,
            "informational",
            true
        )])));
        assert_eq!(parsed.keywords.len(), 1);
        let kw = &parsed.keywords[0];
        assert_eq!(kw.keyword, "what is rust");
        assert_eq!(kw.position, 1);
        assert_eq!(kw.etv, 13);
        assert!(kw.has_ai_overview);
        assert!((kw.risk_score - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fourth_position_scores_1000() {
        let parsed = parse_ranked_keywords(&payload(json!([item(
            "rust book",
            1000,
            4,
            "commercial",
            true
        )])));
        assert!((parsed.keywords[0].risk_score - 1000.0).abs() < f64::EPSILON);
        assert_eq!(parsed.keywords[0].intent, SearchIntent::Commercial);
    }

    #[test]
    fn overview_flag_requires_exact_feature_tag() {
        let mut raw = item("k", 10, 1, "informational", false);
        raw["keyword_data"]["serp_info"]["serp_item_types"] = json!(["ai_overview_reference"]);
        let parsed = parse_ranked_keywords(&payload(json!([raw])));
        assert!(!parsed.keywords[0].has_ai_overview);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let parsed = parse_ranked_keywords(&payload(json!([{}])));
        let kw = &parsed.keywords[0];
        assert_eq!(kw.keyword, "Unknown");
        assert_eq!(kw.search_volume, 0);
        assert_eq!(kw.position, 0);
        assert_eq!(kw.etv, 0);
        assert_eq!(kw.intent, SearchIntent::Informational);
        assert!(!kw.has_ai_overview);
    }

    #[test]
    fn null_fields_take_defaults() {
        let parsed = parse_ranked_keywords(&payload(json!([{
            "keyword_data": {
                "keyword": null,
                "keyword_info": { "search_volume": null },
                "search_intent_info": null,
                "serp_info": { "serp_item_types": null }
            },
            "ranked_serp_element": null
        }])));
        assert_eq!(parsed.keywords[0].keyword, "Unknown");
        assert_eq!(parsed.stats.total, 1);
    }

    #[test]
    fn malformed_item_does_not_drop_siblings() {
        let parsed = parse_ranked_keywords(&payload(json!([
            "not an object",
            item("kept", 50, 2, "navigational", false)
        ])));
        assert_eq!(parsed.keywords.len(), 2);
        assert_eq!(parsed.keywords[0].keyword, "Unknown");
        assert_eq!(parsed.keywords[1].intent, SearchIntent::Navigational);
    }

    #[test]
    fn absent_structure_is_empty_not_error() {
        for raw in [
            json!({}),
            json!({"tasks": []}),
            json!({"tasks": [{"result": null}]}),
            json!({"tasks": [{"result": [{"items": null}]}]}),
            json!({"tasks": "garbage"}),
            json!(null),
        ] {
            let parsed = parse_ranked_keywords(&raw);
            assert!(parsed.keywords.is_empty(), "payload {raw} should parse empty");
            assert_eq!(parsed.stats, KeywordStats::default());
        }
    }

    #[test]
    fn stats_cover_the_full_list() {
        let parsed = parse_ranked_keywords(&payload(json!([
            item("a", 100, 1, "informational", true),
            item("b", 200, 2, "transactional", false),
            item("c", 300, 3, "weird", true),
        ])));
        let stats = parsed.stats;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_overview, 2);
        assert_eq!(stats.without_overview, 1);
        assert_eq!(stats.by_intent.informational, 2);
        assert_eq!(stats.by_intent.transactional, 1);
        assert_eq!(stats.total_search_volume, 600);
        assert_eq!(stats.overview_search_volume, 400);
    }
}
