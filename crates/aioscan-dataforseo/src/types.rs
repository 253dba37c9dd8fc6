//! Tolerant model of the ranked-keywords response.
//!
//! Every field is optional or defaulted: the provider omits, nulls, or
//! reshapes parts of the payload often enough that absence must never be a
//! deserialization error. Only the fields the parser reads are modelled.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct RankedKeywordsResponse {
    #[serde(default)]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub tasks: Option<Vec<Task>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub result: Option<Vec<TaskResult>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub total_count: Option<i64>,
    #[serde(default)]
    pub items_count: Option<i64>,
    /// Items are kept raw and decoded one at a time so a single odd item
    /// cannot discard the rest of the list.
    #[serde(default)]
    pub items: Option<Vec<serde_json::Value>>,
}

// ---------------------------------------------------------------------------
// Ranked item
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RankedItem {
    #[serde(default)]
    pub keyword_data: Option<KeywordData>,
    #[serde(default)]
    pub ranked_serp_element: Option<RankedSerpElement>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KeywordData {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub keyword_info: Option<KeywordInfo>,
    #[serde(default)]
    pub search_intent_info: Option<SearchIntentInfo>,
    #[serde(default)]
    pub serp_info: Option<SerpInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KeywordInfo {
    #[serde(default)]
    pub search_volume: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchIntentInfo {
    #[serde(default)]
    pub main_intent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SerpInfo {
    #[serde(default)]
    pub serp_item_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RankedSerpElement {
    #[serde(default)]
    pub serp_item: Option<SerpItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SerpItem {
    #[serde(default)]
    pub rank_absolute: Option<i64>,
    #[serde(default)]
    pub etv: Option<f64>,
}
